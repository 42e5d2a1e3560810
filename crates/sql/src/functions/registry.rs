//! Registry of user-defined scalar functions
//!
//! User functions are plain callables over evaluated arguments. The planner
//! resolves a call against the registry once; execution calls the resolved
//! function directly.

use super::{AggregateKind, Arity, ScalarFunction};
use crate::error::{Error, Result};
use crate::types::{DataType, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Callable = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// A user function: a name, the arguments it accepts and the callable.
pub struct UserFunction {
    pub name: String,
    pub arity: Arity,
    /// The type reported for output columns computed by this function.
    pub return_type: DataType,
    callable: Box<Callable>,
}

impl UserFunction {
    pub fn new(
        name: impl Into<String>,
        arity: Arity,
        callable: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into().to_uppercase(),
            arity,
            return_type: DataType::Null,
            callable: Box::new(callable),
        }
    }

    pub fn with_return_type(mut self, return_type: DataType) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.callable)(args)
    }
}

impl fmt::Debug for UserFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

/// Name to function map, keyed by upper-case name.
#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<UserFunction>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function, replacing an earlier one of the same name.
    /// Built-in and aggregate names cannot be taken.
    pub fn register(&mut self, function: UserFunction) -> Result<()> {
        if ScalarFunction::lookup(&function.name).is_some()
            || AggregateKind::lookup(&function.name).is_some()
        {
            return Err(Error::Usage(format!(
                "{} is a built-in function and cannot be redefined",
                function.name
            )));
        }
        tracing::debug!(name = %function.name, "registered user function");
        self.functions.insert(function.name.clone(), Arc::new(function));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<UserFunction>> {
        self.functions.get(&name.to_uppercase()).cloned()
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.functions.remove(&name.to_uppercase()).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double() -> UserFunction {
        UserFunction::new("double", Arity::exact(1), |args| match &args[0] {
            Value::Null => Ok(Value::Null),
            v => Ok(Value::I64(v.to_i64().unwrap_or_default() * 2)),
        })
        .with_return_type(DataType::I64)
    }

    #[test]
    fn test_register_and_call() {
        let mut registry = FunctionRegistry::new();
        registry.register(double()).unwrap();
        let function = registry.get("Double").unwrap();
        assert_eq!(function.name, "DOUBLE");
        assert_eq!(function.call(&[Value::I32(4)]), Ok(Value::I64(8)));
        assert_eq!(registry.names(), vec!["DOUBLE"]);
        assert!(registry.unregister("double"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_builtin_names_are_reserved() {
        let mut registry = FunctionRegistry::new();
        let upper = UserFunction::new("upper", Arity::exact(1), |args| Ok(args[0].clone()));
        assert!(matches!(registry.register(upper), Err(Error::Usage(_))));
        let count = UserFunction::new("count", Arity::exact(1), |args| Ok(args[0].clone()));
        assert!(registry.register(count).is_err());
    }
}
