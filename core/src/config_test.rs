#[cfg(test)]
mod tests {
    use crate::config::{MAX_CALL_DEPTH_ENV, RuntimeConfig};
    use anyhow::Result;

    #[test]
    fn test_default_call_depth() {
        assert_eq!(RuntimeConfig::default().max_call_depth, 200);
    }

    #[test]
    fn test_from_toml_overrides_depth() -> Result<()> {
        let config = RuntimeConfig::from_toml_str("max_call_depth = 16\n")?;
        assert_eq!(config.max_call_depth, 16);
        Ok(())
    }

    #[test]
    fn test_from_toml_empty_keeps_defaults() -> Result<()> {
        assert_eq!(RuntimeConfig::from_toml_str("")?, RuntimeConfig::default());
        Ok(())
    }

    #[test]
    fn test_from_toml_rejects_zero_depth() {
        let err = RuntimeConfig::from_toml_str("max_call_depth = 0").unwrap_err();
        assert!(err.to_string().contains("max_call_depth"));
    }

    #[test]
    fn test_from_toml_rejects_wrong_type() {
        assert!(RuntimeConfig::from_toml_str("max_call_depth = \"deep\"").is_err());
    }

    fn depth_from(value: Option<&str>) -> usize {
        RuntimeConfig::from_lookup(|key| {
            assert_eq!(key, MAX_CALL_DEPTH_ENV);
            value.map(str::to_string)
        })
        .max_call_depth
    }

    #[test]
    fn test_env_override_sets_depth() {
        assert_eq!(depth_from(Some("7")), 7);
        assert_eq!(depth_from(Some(" 32\n")), 32);
    }

    #[test]
    fn test_env_override_ignores_bad_values() {
        assert_eq!(depth_from(None), 200);
        assert_eq!(depth_from(Some("zzz")), 200);
        assert_eq!(depth_from(Some("0")), 200);
        assert_eq!(depth_from(Some("-5")), 200);
    }
}
