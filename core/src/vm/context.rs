use std::sync::Arc;

use anyhow::{Result, anyhow};

use crate::config::RuntimeConfig;
use crate::module::ModuleRegistry;
use crate::util::fast_map::{FastHashMap, fast_hash_map_new};
use crate::val::{ClosureValue, ENV_UPVALUE, FunctionProto, RustFunction, ScriptBody, TableRef, Upvalue, Val};

/// VM 运行期上下文。
///
/// - 持有唯一的全局作用域表，`load` 时注入每个闭包的 `_ENV`；
/// - 维护调用栈，供按层级查询正在执行的函数；
/// - 持有共享的模块注册表与本上下文的已加载模块缓存。
#[derive(Debug, Clone)]
pub struct VmContext {
    globals: TableRef,
    call_stack: Vec<CallFrameInfo>,
    registry: Arc<ModuleRegistry>,
    // Namespaces handed out by `require`, keyed by module name
    loaded: FastHashMap<String, Val>,
    config: RuntimeConfig,
}

impl Default for VmContext {
    fn default() -> Self {
        Self::new()
    }
}

/// 调用帧信息。
#[derive(Debug, Clone)]
pub struct CallFrameInfo {
    pub function: Val,
    pub function_name: Arc<str>,
    pub depth: usize,
}

impl VmContext {
    /// 创建一个空上下文。
    pub fn new() -> Self {
        Self {
            globals: TableRef::new(),
            call_stack: Vec::new(),
            registry: Arc::new(ModuleRegistry::new()),
            loaded: fast_hash_map_new(),
            config: RuntimeConfig::default(),
        }
    }

    /// 使用给定注册表；注册表中的内建函数写入全局表（不覆盖已有名字）。
    pub fn with_registry(mut self, registry: Arc<ModuleRegistry>) -> Self {
        for (name, val) in registry.builtin_iter() {
            if self.globals.get_field(name).is_nil() {
                self.globals.set_field(name, val.clone());
            }
        }
        self.registry = registry;
        self
    }

    /// 设置运行期配置。
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[inline]
    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// 全局作用域表（所有闭包默认的 `_ENV`）。
    #[inline]
    pub fn globals(&self) -> &TableRef {
        &self.globals
    }

    pub fn get_global(&self, name: &str) -> Val {
        self.globals.get_field(name)
    }

    pub fn set_global(&mut self, name: &str, value: Val) {
        self.globals.set_field(name, value);
    }

    /// 由原型创建闭包：`_ENV` 绑定到全局表的新单元，其余上值为新的 nil 单元。
    pub fn load(&self, proto: Arc<FunctionProto>) -> Result<Val> {
        let cells = proto
            .upvalue_names()
            .iter()
            .map(|name| {
                if name.as_ref() == ENV_UPVALUE {
                    Upvalue::new(Val::Table(self.globals.clone()))
                } else {
                    Upvalue::default()
                }
            })
            .collect();
        Ok(Val::Closure(ClosureValue::new(proto, cells)?))
    }

    /// 调用函数：压入调用帧，执行，无论成功与否都恢复调用栈深度。
    pub fn call(&mut self, func: &Val, args: &[Val]) -> Result<Val> {
        let callee = match func {
            Val::RustFunction(f) => Callee::Native(*f),
            Val::Closure(closure) => Callee::Script(closure.body()),
            other => return Err(anyhow!("attempt to call a {} value", other.type_name())),
        };

        let depth = self.call_stack.len();
        if depth >= self.config.max_call_depth {
            return Err(anyhow!("stack overflow (max call depth {})", self.config.max_call_depth));
        }
        self.push_call_frame(func.clone());
        let result = match callee {
            Callee::Native(f) => f(args, self),
            Callee::Script(body) => body(self, args),
        };
        self.truncate_call_stack(depth);
        result
    }

    #[inline]
    pub fn call_stack_depth(&self) -> usize {
        self.call_stack.len()
    }

    #[inline]
    pub fn truncate_call_stack(&mut self, depth: usize) {
        if depth < self.call_stack.len() {
            self.call_stack.truncate(depth);
        }
    }

    /// 调用栈管理：进入函数调用
    pub fn push_call_frame(&mut self, function: Val) {
        self.call_stack.push(CallFrameInfo {
            function_name: function.debug_name(),
            function,
            depth: self.call_stack.len(),
        });
    }

    pub fn call_stack(&self) -> &[CallFrameInfo] {
        &self.call_stack
    }

    /// 按层级取调用帧：0 为当前正在执行的函数，1 为其调用者，依此类推。
    pub fn frame(&self, level: usize) -> Option<&CallFrameInfo> {
        let idx = self.call_stack.len().checked_sub(level.checked_add(1)?)?;
        self.call_stack.get(idx)
    }

    /// 获取当前函数
    pub fn current_function(&self) -> Option<&Val> {
        self.call_stack.last().map(|frame| &frame.function)
    }

    /// 返回当前调用栈的格式化字符串。
    pub fn call_stack_report(&self) -> Option<String> {
        if self.call_stack.is_empty() {
            return None;
        }
        let mut msg = String::from("Call stack:\n");
        for frame in self.call_stack.iter().rev() {
            msg.push_str("  [");
            msg.push_str(&frame.depth.to_string());
            msg.push_str("] ");
            msg.push_str(frame.function_name.as_ref());
            msg.push('\n');
        }
        Some(msg)
    }

    /// 当前执行函数解析自由变量所用的作用域表。
    /// 原生函数（以及栈为空时）只看全局表；闭包经由自己的 `_ENV` 上值。
    pub fn current_scope(&self) -> Result<TableRef> {
        let closure = match self.current_function() {
            Some(Val::Closure(closure)) => closure,
            _ => return Ok(self.globals.clone()),
        };
        let slot = env_slot(closure).ok_or_else(|| anyhow!("function '{}' has no {} upvalue", closure.name(), ENV_UPVALUE))?;
        match closure.get_upvalue(slot) {
            Some(Val::Table(scope)) => Ok(scope),
            Some(other) => Err(anyhow!(
                "attempt to index a {} value (upvalue '{}')",
                other.type_name(),
                ENV_UPVALUE
            )),
            None => Err(anyhow!("function '{}' has no {} upvalue", closure.name(), ENV_UPVALUE)),
        }
    }

    /// 读取自由变量。
    pub fn resolve_free(&self, name: &str) -> Result<Val> {
        Ok(self.current_scope()?.get_field(name))
    }

    /// 写入自由变量。
    pub fn assign_free(&mut self, name: &str, value: Val) -> Result<()> {
        self.current_scope()?.set_field(name, value);
        Ok(())
    }

    /// 类 Lua `require`：首次加载时由模块导出构建命名空间表，之后返回同一张表。
    pub fn require(&mut self, name: &str) -> Result<Val> {
        if let Some(module) = self.loaded.get(name) {
            return Ok(module.clone());
        }

        let module = self.registry.get_module(name)?;
        if !module.enabled() {
            return Err(anyhow!("Module '{}' is disabled", name));
        }
        let namespace = TableRef::new();
        for (export, value) in module.exports() {
            namespace.set_field(&export, value);
        }
        tracing::trace!(target: "ldk::vm", module = name, version = module.version(), "loaded module");

        let value = Val::Table(namespace);
        self.loaded.insert(name.to_string(), value.clone());
        Ok(value)
    }
}

enum Callee {
    Native(RustFunction),
    Script(ScriptBody),
}

fn env_slot(closure: &ClosureValue) -> Option<usize> {
    closure
        .proto()
        .upvalue_names()
        .iter()
        .position(|name| name.as_ref() == ENV_UPVALUE)
}
