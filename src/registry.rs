//! Function handlers and the name-to-handler registry.
//!
//! Handlers are collected in a mutable [`RegistryBuilder`] while the server is
//! being configured, then frozen into an immutable [`Registry`] when it starts
//! listening. Workers share the frozen registry through an `Arc`; it offers no
//! way to add or replace entries.

use std::{collections::HashMap, fmt, sync::Arc};

use log::{info, warn};
use serde_json::Value;
use thiserror::Error;

/// Typed failure returned by a handler.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// The arguments have the wrong count or types.
    #[error("{0}")]
    InvalidArguments(String),
    /// The arguments were acceptable but the computation failed.
    #[error("{0}")]
    ExecutionFailed(String),
}

impl HandlerError {
    /// Reject the call's arguments.
    #[must_use]
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    /// Report a failure during an otherwise valid call.
    #[must_use]
    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed(message.into())
    }
}

/// Result alias returned by handlers.
pub type HandlerResult = Result<Value, HandlerError>;

/// A callable registered under a function name.
///
/// Any `Fn(&[Value]) -> HandlerResult` that is `Send + Sync + 'static`
/// implements this trait.
///
/// ```
/// use serde_json::{Value, json};
/// use wirecall::registry::{Handler, HandlerError};
///
/// fn negate(args: &[Value]) -> Result<Value, HandlerError> {
///     match args {
///         [Value::Bool(b)] => Ok(json!(!b)),
///         _ => Err(HandlerError::invalid_arguments("negate requires one boolean")),
///     }
/// }
///
/// assert_eq!(Handler::call(&negate, &[json!(true)]), Ok(json!(false)));
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Invoke the handler with positional arguments.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] if the arguments are rejected or the call fails.
    fn call(&self, args: &[Value]) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
{
    fn call(&self, args: &[Value]) -> HandlerResult { self(args) }
}

/// Outcome of a registration attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    /// The handler was stored under the new name.
    Added,
    /// The name was taken; the existing handler was kept and the new one dropped.
    AlreadyRegistered,
}

/// Mutable collection of handlers used before the server starts.
#[derive(Default)]
pub struct RegistryBuilder {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl RegistryBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Store `handler` under `name` unless the name is already registered.
    ///
    /// A duplicate keeps the first handler and logs a warning.
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H) -> Registration
    where
        H: Handler,
    {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            warn!("function already registered; keeping existing handler: name={name}");
            return Registration::AlreadyRegistered;
        }
        info!("registered function: name={name}");
        self.handlers.insert(name, Arc::new(handler));
        Registration::Added
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize { self.handlers.len() }

    /// Whether no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.handlers.is_empty() }

    /// Freeze the collected handlers into a read-only [`Registry`].
    #[must_use]
    pub fn freeze(self) -> Registry {
        Registry {
            handlers: self.handlers,
        }
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("functions", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Read-only mapping from function name to handler.
#[derive(Clone, Default)]
pub struct Registry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl Registry {
    /// Look up the handler registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Handler> {
        self.handlers.get(name).map(|handler| &**handler)
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool { self.handlers.contains_key(name) }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize { self.handlers.len() }

    /// Whether no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.handlers.is_empty() }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("functions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn constant(value: i64) -> impl Fn(&[Value]) -> HandlerResult + Send + Sync + 'static {
        move |_args: &[Value]| Ok(json!(value))
    }

    #[test]
    fn duplicate_registration_keeps_first_handler() {
        let mut builder = RegistryBuilder::new();
        assert_eq!(builder.register("answer", constant(42)), Registration::Added);
        assert_eq!(
            builder.register("answer", constant(7)),
            Registration::AlreadyRegistered
        );
        assert_eq!(builder.len(), 1);

        let registry = builder.freeze();
        let handler = registry.get("answer").expect("answer registered");
        assert_eq!(handler.call(&[]), Ok(json!(42)));
    }

    #[test]
    fn frozen_registry_exposes_registered_names() {
        let mut builder = RegistryBuilder::new();
        builder.register("zeta", constant(1));
        builder.register("alpha", constant(2));

        let registry = builder.freeze();

        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
        assert!(registry.contains("zeta"));
        assert!(!registry.contains("missing"));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn closures_and_fns_are_handlers() {
        fn first(args: &[Value]) -> HandlerResult {
            args.first()
                .cloned()
                .ok_or_else(|| HandlerError::invalid_arguments("need one argument"))
        }

        let mut builder = RegistryBuilder::new();
        builder.register("first", first);
        let registry = builder.freeze();
        let handler = registry.get("first").expect("first registered");

        assert_eq!(handler.call(&[json!("a"), json!("b")]), Ok(json!("a")));
        assert_eq!(
            handler.call(&[]),
            Err(HandlerError::InvalidArguments("need one argument".into()))
        );
    }
}
