//! The built-in handler table.

use crate::handler::{Handler, Trigger};
use crate::handlers;
use lpg_ast::Annotation;
use lpg_options::TransformOptions;

pub struct HandlerRegistry {
    handlers: Vec<Box<dyn Handler>>,
}

impl HandlerRegistry {
    /// A registry with no handlers.
    pub fn empty() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Every built-in handler except those named in `disabledHandlers`.
    pub fn new(options: &TransformOptions) -> Self {
        let mut registry = Self::empty();
        for handler in handlers::builtin() {
            if options.is_handler_disabled(handler.name()) {
                tracing::debug!(handler = handler.name(), "handler disabled");
                continue;
            }
            registry.register(handler);
        }
        registry
    }

    pub fn with_defaults() -> Self {
        Self::new(&TransformOptions::default())
    }

    pub fn register(&mut self, handler: Box<dyn Handler>) {
        self.handlers.push(handler);
    }

    /// The handler triggered by `annotation`, if any.
    pub fn for_annotation(&self, annotation: &Annotation) -> Option<&dyn Handler> {
        self.handlers
            .iter()
            .find(|h| h.trigger().matches(annotation))
            .map(|h| h.as_ref())
    }

    pub fn yield_handler(&self) -> Option<&dyn Handler> {
        self.handlers
            .iter()
            .find(|h| h.trigger() == Trigger::YieldCall)
            .map(|h| h.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.iter().map(|h| h.name())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpg_ast::factory::*;

    #[test]
    fn test_lookup_by_simple_and_qualified_name() {
        let registry = HandlerRegistry::with_defaults();
        let builder = registry.for_annotation(&annotation(ty("lombok.Builder"))).unwrap();
        assert_eq!(builder.name(), "Builder");
        let ext = registry.for_annotation(&annotation(ty("Builder.Extension"))).unwrap();
        assert_eq!(ext.name(), "Builder.Extension");
        assert!(registry.for_annotation(&annotation(ty("Override"))).is_none());
        assert_eq!(registry.yield_handler().unwrap().name(), "Yield");
    }

    #[test]
    fn test_disabled_handlers_are_left_out() {
        let options: TransformOptions =
            serde_json::from_str(r#"{"disabledHandlers": ["singleton", "Yield"]}"#).unwrap();
        let registry = HandlerRegistry::new(&options);
        assert!(registry.for_annotation(&annotation(ty("Singleton"))).is_none());
        assert!(registry.yield_handler().is_none());
        assert_eq!(registry.len(), HandlerRegistry::with_defaults().len() - 2);
    }
}
