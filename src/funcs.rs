//! Host function table contract.
//!
//! The parser only asks whether a name exists (unless func checking is
//! skipped); the runtime looks the callable up at execution time.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A host-supplied template function over dynamic values.
pub type TemplateFn = Arc<dyn Fn(&[Value]) -> miette::Result<Value> + Send + Sync>;

/// Capability required to act as a template function provider.
pub trait TemplateFuncs {
    /// Reports whether a template function with this name exists.
    fn has(&self, name: &str) -> bool;

    /// Returns the template function with this name.
    fn get_by_name(&self, name: &str) -> Option<TemplateFn>;
}

/// Map-backed function table: the mapping from names to functions.
#[derive(Default, Clone)]
pub struct FuncMap {
    funcs: HashMap<String, TemplateFn>,
}

impl FuncMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function under a name, replacing any previous entry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        func: impl Fn(&[Value]) -> miette::Result<Value> + Send + Sync + 'static,
    ) {
        self.funcs.insert(name.into(), Arc::new(func));
    }
}

impl TemplateFuncs for FuncMap {
    fn has(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    fn get_by_name(&self, name: &str) -> Option<TemplateFn> {
        self.funcs.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_func_map() {
        let mut funcs = FuncMap::new();
        funcs.register("upper", |args| {
            let s = args.first().and_then(Value::as_str).unwrap_or_default();
            Ok(Value::String(s.to_uppercase()))
        });
        assert!(funcs.has("upper"));
        assert!(!funcs.has("lower"));

        let upper = funcs.get_by_name("upper").expect("missing function");
        let out = (*upper)(&[Value::String("hi".into())]).expect("call failed");
        assert_eq!(out, Value::String("HI".into()));
    }
}
