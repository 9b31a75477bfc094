//! Per-tool-family operation registry.
//!
//! A [`HandlerRegistry`] maps operation names (case-insensitive) to
//! [`OperationHandler`]s for one document type. Registries are filled once
//! at startup, either handler by handler or by discovery over a catalog of
//! [`HandlerDescriptor`]s, and are read-only afterwards.
//!
//! # Discovery
//!
//! Rust has no runtime type scanning, so each tool family exports a
//! catalog: a function returning the descriptors of every handler it
//! ships. [`HandlerRegistry::from_namespace`] instantiates the descriptors
//! whose namespace matches and that are not excluded from discovery.
//! Handlers built with [`HandlerDescriptor::of`] must implement `Default`,
//! which the compiler checks.
//!
//! ```
//! use async_trait::async_trait;
//! use docmcp::handlers::{
//!     HandlerDescriptor, HandlerRegistry, OperationContext, OperationHandler,
//!     OperationParameters,
//! };
//! use docmcp::Result;
//! use serde_json::{json, Value};
//!
//! #[derive(Default)]
//! struct WordCount;
//!
//! #[async_trait]
//! impl OperationHandler<String> for WordCount {
//!     fn operation(&self) -> &str {
//!         "word_count"
//!     }
//!
//!     async fn handle(
//!         &self,
//!         ctx: &mut OperationContext<String>,
//!         _params: &OperationParameters,
//!     ) -> Result<Value> {
//!         Ok(json!(ctx.document().split_whitespace().count()))
//!     }
//! }
//!
//! fn text_handlers() -> Vec<HandlerDescriptor<String>> {
//!     vec![HandlerDescriptor::of::<WordCount>("text")]
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = HandlerRegistry::from_namespace("text", &text_handlers()).unwrap();
//! let mut ctx = OperationContext::new("one two three".to_string());
//! let count = registry
//!     .execute("WORD_COUNT", &mut ctx, &OperationParameters::new())
//!     .await
//!     .unwrap();
//! assert_eq!(count, json!(3));
//! # }
//! ```

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use super::context::OperationContext;
use super::parameters::OperationParameters;
use crate::error::{Error, Result};

/// A stateless operation on documents of type `D`.
#[async_trait]
pub trait OperationHandler<D: Send + 'static>: Send + Sync {
    /// The operation name. Matched case-insensitively and unique within a
    /// registry.
    fn operation(&self) -> &str;

    /// Runs the operation.
    async fn handle(
        &self,
        context: &mut OperationContext<D>,
        parameters: &OperationParameters,
    ) -> Result<Value>;
}

/// Builds a handler instance for discovery.
pub type HandlerFactory<D> = fn() -> Result<Arc<dyn OperationHandler<D>>>;

/// Catalog entry describing a discoverable handler.
pub struct HandlerDescriptor<D: Send + 'static> {
    type_name: &'static str,
    namespace: &'static str,
    excluded: bool,
    factory: HandlerFactory<D>,
}

fn instantiate<D, H>() -> Result<Arc<dyn OperationHandler<D>>>
where
    D: Send + 'static,
    H: OperationHandler<D> + Default + 'static,
{
    Ok(Arc::new(H::default()))
}

impl<D: Send + 'static> HandlerDescriptor<D> {
    /// Describes `H`, instantiated through its `Default` impl.
    pub fn of<H>(namespace: &'static str) -> Self
    where
        H: OperationHandler<D> + Default + 'static,
    {
        Self {
            type_name: type_name::<H>(),
            namespace,
            excluded: false,
            factory: instantiate::<D, H>,
        }
    }

    /// Describes a handler built by a custom, possibly failing, factory.
    pub fn with_factory(
        type_name: &'static str,
        namespace: &'static str,
        factory: HandlerFactory<D>,
    ) -> Self {
        Self {
            type_name,
            namespace,
            excluded: false,
            factory,
        }
    }

    /// Keeps the handler out of namespace discovery. It can still be
    /// registered explicitly.
    pub fn exclude_from_discovery(mut self) -> Self {
        self.excluded = true;
        self
    }

    /// Name of the handler type, used in factory errors.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Namespace the handler is discovered under.
    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Returns `true` if discovery skips this handler.
    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// Runs the factory.
    pub fn instantiate(&self) -> Result<Arc<dyn OperationHandler<D>>> {
        (self.factory)()
    }
}

impl<D: Send + 'static> Clone for HandlerDescriptor<D> {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name,
            namespace: self.namespace,
            excluded: self.excluded,
            factory: self.factory,
        }
    }
}

impl<D: Send + 'static> fmt::Debug for HandlerDescriptor<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("type_name", &self.type_name)
            .field("namespace", &self.namespace)
            .field("excluded", &self.excluded)
            .finish_non_exhaustive()
    }
}

/// Operation handlers for one document type, keyed by case-insensitive
/// operation name.
pub struct HandlerRegistry<D: Send + 'static> {
    handlers: IndexMap<String, Arc<dyn OperationHandler<D>>>,
}

impl<D: Send + 'static> HandlerRegistry<D> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: IndexMap::new(),
        }
    }

    /// Builds a registry from every descriptor in `scope` whose namespace
    /// equals `namespace` and that is not excluded from discovery.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `namespace` is empty.
    /// - [`Error::InvalidOperation`] if a factory fails (naming the handler
    ///   type) or two discovered handlers share an operation name.
    pub fn from_namespace(namespace: &str, scope: &[HandlerDescriptor<D>]) -> Result<Self> {
        if namespace.trim().is_empty() {
            return Err(Error::invalid_argument("namespace must not be empty"));
        }

        let mut registry = Self::new();
        for descriptor in scope
            .iter()
            .filter(|d| d.namespace == namespace && !d.excluded)
        {
            let handler = descriptor.instantiate().map_err(|err| {
                Error::invalid_operation(format!(
                    "failed to create handler {}: {err}",
                    descriptor.type_name
                ))
            })?;
            registry.register_arc(handler)?;
        }

        debug!(
            namespace,
            discovered = registry.len(),
            "handler registry built"
        );
        Ok(registry)
    }

    /// Registers a handler.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the handler's operation name is empty.
    /// - [`Error::InvalidOperation`] if the name is already registered, in
    ///   any case.
    pub fn register<H>(&mut self, handler: H) -> Result<()>
    where
        H: OperationHandler<D> + 'static,
    {
        self.register_arc(Arc::new(handler))
    }

    /// Registers a shared handler. See [`register`](Self::register).
    pub fn register_arc(&mut self, handler: Arc<dyn OperationHandler<D>>) -> Result<()> {
        let key = handler.operation().to_lowercase();
        if key.is_empty() {
            return Err(Error::invalid_argument("operation name must not be empty"));
        }
        match self.handlers.entry(key) {
            Entry::Occupied(existing) => Err(Error::invalid_operation(format!(
                "operation '{}' is already registered as '{}'",
                handler.operation(),
                existing.get().operation()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(handler);
                Ok(())
            }
        }
    }

    /// Looks up the handler for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] listing every registered
    /// operation when `name` is unknown.
    pub fn get_handler(&self, name: &str) -> Result<Arc<dyn OperationHandler<D>>> {
        self.try_get_handler(name).ok_or_else(|| {
            let available = if self.handlers.is_empty() {
                "(none)".to_string()
            } else {
                self.operations().join(", ")
            };
            Error::invalid_argument(format!(
                "unknown operation '{name}'. Available operations: {available}"
            ))
        })
    }

    /// Like [`get_handler`](Self::get_handler), returning `None` for an
    /// unknown name.
    pub fn try_get_handler(&self, name: &str) -> Option<Arc<dyn OperationHandler<D>>> {
        self.handlers.get(&name.to_lowercase()).cloned()
    }

    /// Returns `true` if `name` is registered, ignoring case.
    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(&name.to_lowercase())
    }

    /// Registered operation names, in registration order.
    pub fn operations(&self) -> Vec<&str> {
        self.handlers.values().map(|h| h.operation()).collect()
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Looks up `name` and runs its handler.
    pub async fn execute(
        &self,
        name: &str,
        context: &mut OperationContext<D>,
        parameters: &OperationParameters,
    ) -> Result<Value> {
        let handler = self.get_handler(name)?;
        debug!(operation = handler.operation(), "executing operation");
        handler.handle(context, parameters).await
    }
}

impl<D: Send + 'static> Default for HandlerRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Send + 'static> fmt::Debug for HandlerRegistry<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("operations", &self.operations())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl OperationHandler<()> for Named {
        fn operation(&self) -> &str {
            self.0
        }

        async fn handle(
            &self,
            _context: &mut OperationContext<()>,
            _parameters: &OperationParameters,
        ) -> Result<Value> {
            Ok(Value::from(self.0))
        }
    }

    #[test]
    fn empty_operation_name_is_rejected() {
        let mut registry = HandlerRegistry::new();
        let err = registry.register(Named("")).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn unknown_operation_on_empty_registry() {
        let registry = HandlerRegistry::<()>::new();
        let err = registry.get_handler("anything").err().unwrap();
        assert!(err.to_string().contains("(none)"));
    }

    #[test]
    fn descriptor_of_records_type_name() {
        #[derive(Default)]
        struct Probe;

        #[async_trait]
        impl OperationHandler<()> for Probe {
            fn operation(&self) -> &str {
                "probe"
            }

            async fn handle(
                &self,
                _context: &mut OperationContext<()>,
                _parameters: &OperationParameters,
            ) -> Result<Value> {
                Ok(Value::Null)
            }
        }

        let descriptor = HandlerDescriptor::<()>::of::<Probe>("diag");
        assert!(descriptor.type_name().ends_with("Probe"));
        assert_eq!(descriptor.namespace(), "diag");
        assert!(!descriptor.is_excluded());
        assert!(descriptor.clone().exclude_from_discovery().is_excluded());
        assert_eq!(descriptor.instantiate().unwrap().operation(), "probe");
    }
}
