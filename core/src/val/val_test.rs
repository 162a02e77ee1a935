#[cfg(test)]
mod tests {
    use crate::val::{ClosureValue, FunctionProto, TableRef, Upvalue, Val};
    use crate::vm::VmContext;
    use anyhow::Result;
    use std::sync::Arc;

    fn noop(_args: &[Val], _ctx: &mut VmContext) -> Result<Val> {
        Ok(Val::Nil)
    }

    fn other_noop(_args: &[Val], _ctx: &mut VmContext) -> Result<Val> {
        Ok(Val::Bool(true))
    }

    fn proto(upvalues: &[&str]) -> Arc<FunctionProto> {
        FunctionProto::new("f", upvalues, |_ctx, _args| Ok(Val::Nil))
    }

    #[test]
    fn test_scalar_equality() {
        assert_eq!(Val::Int(1), Val::Int(1));
        assert_ne!(Val::Int(1), Val::Float(1.0));
        assert_eq!(Val::from("a"), Val::Str("a".into()));
        assert_eq!(Val::Nil, Val::default());
        assert_ne!(Val::Nil, Val::Bool(false));
    }

    #[test]
    fn test_reference_equality_is_identity() -> Result<()> {
        let t = TableRef::new();
        assert_eq!(Val::Table(t.clone()), Val::Table(t));
        assert_ne!(Val::Table(TableRef::new()), Val::Table(TableRef::new()));

        let p = proto(&[]);
        let a = ClosureValue::new(p.clone(), vec![])?;
        let b = ClosureValue::new(p, vec![])?;
        assert_eq!(Val::Closure(a.clone()), Val::Closure(a.clone()));
        assert_ne!(Val::Closure(a), Val::Closure(b));

        assert_eq!(Val::RustFunction(noop), Val::RustFunction(noop));
        assert_ne!(Val::RustFunction(noop), Val::RustFunction(other_noop));
        Ok(())
    }

    #[test]
    fn test_as_integer_coercion() {
        assert_eq!(Val::Int(-3).as_integer(), Some(-3));
        assert_eq!(Val::Float(4.0).as_integer(), Some(4));
        assert_eq!(Val::Float(4.5).as_integer(), None);
        assert_eq!(Val::Float(f64::NAN).as_integer(), None);
        assert_eq!(Val::Float(1e300).as_integer(), None);
        assert_eq!(Val::from("4").as_integer(), None);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Val::Nil.type_name(), "Nil");
        assert_eq!(Val::Table(TableRef::new()).type_name(), "Table");
        assert_eq!(Val::RustFunction(noop).type_name(), "Function");
        assert!(Val::RustFunction(noop).is_native_function());
        assert!(!Val::Int(1).is_function());
    }

    #[test]
    fn test_vec_converts_to_sequence_table() {
        let v: Val = vec![1i64, 2, 3].into();
        let table = v.as_table().expect("sequence table");
        assert_eq!(table.len(), 3);
        assert_eq!(table.geti(2), Val::Int(2));
    }

    #[test]
    fn test_closure_rejects_mismatched_cell_count() {
        let err = ClosureValue::new(proto(&["a", "b"]), vec![Upvalue::default()]).unwrap_err();
        assert!(err.to_string().contains("declares 2 upvalues"));
    }

    #[test]
    fn test_enumerate_captures_in_declaration_order() -> Result<()> {
        let closure = ClosureValue::new(
            proto(&["x", "_ENV", "y"]),
            vec![Upvalue::new(Val::Int(1)), Upvalue::default(), Upvalue::new(Val::Int(3))],
        )?;
        let names: Vec<String> = closure
            .enumerate_captures()
            .into_iter()
            .map(|(name, _)| name.to_string())
            .collect();
        assert_eq!(names, vec!["x", "_ENV", "y"]);
        assert_eq!(closure.upvalue_count(), 3);
        assert_eq!(closure.upvalue_name(1), Some("_ENV"));
        assert_eq!(closure.upvalue_name(3), None);
        assert_eq!(closure.get_upvalue(2), Some(Val::Int(3)));
        Ok(())
    }

    #[test]
    fn test_set_upvalue_is_visible_to_every_sharer() -> Result<()> {
        let cell = Upvalue::new(Val::Int(1));
        let a = ClosureValue::new(proto(&["x"]), vec![cell.clone()])?;
        let b = ClosureValue::new(proto(&["x"]), vec![cell.clone()])?;
        assert!(a.shares_upvalue(0, &b, 0));

        assert!(a.set_upvalue(0, Val::Int(2)));
        assert_eq!(b.get_upvalue(0), Some(Val::Int(2)));
        assert_eq!(cell.get(), Val::Int(2));
        assert!(!a.set_upvalue(5, Val::Nil));
        Ok(())
    }

    #[test]
    fn test_join_upvalue_redirects_only_one_slot() -> Result<()> {
        let shared = Upvalue::new(Val::Int(1));
        let a = ClosureValue::new(proto(&["x"]), vec![shared.clone()])?;
        let b = ClosureValue::new(proto(&["x"]), vec![shared.clone()])?;

        let private = Upvalue::new(Val::Int(99));
        assert!(a.join_upvalue(0, private.clone()));

        assert_eq!(a.get_upvalue(0), Some(Val::Int(99)));
        assert_eq!(b.get_upvalue(0), Some(Val::Int(1)));
        assert!(!a.shares_upvalue(0, &b, 0));
        assert!(a.upvalue(0).is_some_and(|cell| cell.ptr_eq(&private)));

        // The old cell is still live for `b` and writes through it no longer reach `a`
        b.set_upvalue(0, Val::Int(2));
        assert_eq!(shared.get(), Val::Int(2));
        assert_eq!(a.get_upvalue(0), Some(Val::Int(99)));

        assert!(!a.join_upvalue(1, Upvalue::default()));
        Ok(())
    }
}
