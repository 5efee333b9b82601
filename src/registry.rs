//! Custom conversion handlers.
//!
//! A [`HandlerRegistry`] owns the [`MimeClassifier`] and a map of custom
//! [`PreviewHandler`]s. Registering a handler does two things: it appends the
//! pattern to the eligibility list, and it stores the handler under the
//! pattern string. Dispatch looks handlers up by exact MIME value only, so a
//! wildcard registration such as `text/*` makes the whole family eligible but
//! overrides dispatch for none of it.
//!
//! The registry is built mutably at startup and then shared read-only,
//! typically behind an `Arc`:
//!
//! ```rust
//! use file_preview::{HandlerRegistry, InputFile, PreviewError, PreviewOutput};
//! use std::sync::Arc;
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register("text/plain", |file: &InputFile| -> Result<PreviewOutput, PreviewError> {
//!     Ok(PreviewOutput::new("text/plain", file.read()?))
//! });
//! let registry = Arc::new(registry);
//! assert!(registry.classifier().is_eligible("text/plain"));
//! ```

use crate::config::PreviewConfig;
use crate::error::PreviewError;
use crate::file::InputFile;
use crate::mime::{MimeClassifier, OfficeFamily};
use crate::output::PreviewOutput;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A caller-supplied conversion that fully replaces the built-in route for
/// one exact MIME value.
///
/// The returned output is passed back to the caller unmodified.
pub trait PreviewHandler: Send + Sync {
    fn convert(&self, file: &InputFile) -> Result<PreviewOutput, PreviewError>;
}

impl<F> PreviewHandler for F
where
    F: Fn(&InputFile) -> Result<PreviewOutput, PreviewError> + Send + Sync,
{
    fn convert(&self, file: &InputFile) -> Result<PreviewOutput, PreviewError> {
        self(file)
    }
}

/// Eligibility patterns plus exact-match custom handlers.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    classifier: MimeClassifier,
    handlers: HashMap<String, Arc<dyn PreviewHandler>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.handlers.keys().collect();
        keys.sort();
        f.debug_struct("HandlerRegistry")
            .field("classifier", &self.classifier)
            .field("handlers", &keys)
            .finish()
    }
}

impl HandlerRegistry {
    /// A registry holding only the built-in eligibility patterns.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in patterns plus `config.extra_eligible`.
    pub fn from_config(config: &PreviewConfig) -> Self {
        let mut registry = Self::new();
        for pattern in &config.extra_eligible {
            registry.allow(pattern);
        }
        registry
    }

    /// Register `handler` for `pattern`.
    ///
    /// Re-registering a pattern replaces the handler; the earlier eligibility
    /// entry stays in the list.
    pub fn register(&mut self, pattern: impl Into<String>, handler: impl PreviewHandler + 'static) {
        self.register_arc(pattern, Arc::new(handler));
    }

    pub fn register_arc(&mut self, pattern: impl Into<String>, handler: Arc<dyn PreviewHandler>) {
        let pattern = pattern.into();
        debug!("Registering preview handler for {}", pattern);
        self.classifier.allow(&pattern);
        self.handlers.insert(pattern, handler);
    }

    /// Declare a pattern previewable without supplying a handler.
    pub fn allow(&mut self, pattern: &str) {
        self.classifier.allow(pattern);
    }

    pub fn allow_family(&mut self, family: OfficeFamily) {
        self.classifier.allow_family(family);
    }

    /// Handler registered verbatim for `mime`.
    pub fn resolve(&self, mime: &str) -> Option<Arc<dyn PreviewHandler>> {
        self.handlers.get(mime).cloned()
    }

    pub fn classifier(&self) -> &MimeClassifier {
        &self.classifier
    }

    pub fn is_eligible(&self, mime: &str) -> bool {
        self.classifier.is_eligible(mime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::MimePattern;

    fn fixed(content_type: &'static str) -> impl PreviewHandler {
        move |_: &InputFile| -> Result<PreviewOutput, PreviewError> {
            Ok(PreviewOutput::new(content_type, vec![1, 2, 3]))
        }
    }

    #[test]
    fn register_makes_pattern_eligible() {
        let mut registry = HandlerRegistry::new();
        assert!(!registry.is_eligible("application/x-custom"));

        registry.register("application/x-custom", fixed("text/plain"));
        assert!(registry.is_eligible("application/x-custom"));
        assert!(!registry.is_eligible("application/other"));
        assert!(registry.resolve("application/x-custom").is_some());
    }

    #[test]
    fn wildcard_registration_does_not_dispatch() {
        let mut registry = HandlerRegistry::new();
        registry.register("text/*", fixed("text/plain"));

        assert!(registry.is_eligible("text/markdown"));
        assert!(registry.resolve("text/markdown").is_none());
        assert!(registry.resolve("text/*").is_some());
    }

    #[test]
    fn reregistering_overwrites_handler_but_keeps_both_patterns() {
        let mut registry = HandlerRegistry::new();
        registry.register("application/x-custom", fixed("first/one"));
        registry.register("application/x-custom", fixed("second/one"));

        let count = registry
            .classifier()
            .patterns()
            .iter()
            .filter(|p| **p == MimePattern::Exact("application/x-custom".into()))
            .count();
        assert_eq!(count, 2);

        let file = InputFile::new("/unused");
        let out = registry
            .resolve("application/x-custom")
            .unwrap()
            .convert(&file)
            .unwrap();
        assert_eq!(out.content_type(), "second/one");
    }

    #[test]
    fn every_handler_key_is_eligible() {
        let mut registry = HandlerRegistry::new();
        registry.register("application/pdf", fixed("a/b"));
        registry.register("image/(.*)", fixed("a/b"));
        registry.register("application/x-thing", fixed("a/b"));

        for key in registry.handlers.keys() {
            let pattern = MimePattern::parse(key);
            assert!(registry.classifier().patterns().contains(&pattern), "{key}");
        }
    }

    #[test]
    fn allow_without_handler() {
        let mut registry = HandlerRegistry::new();
        registry.allow_family(OfficeFamily::Presentation);
        assert!(registry.is_eligible("application/vnd.ms-powerpoint"));
        assert!(registry.resolve("application/vnd.ms-powerpoint").is_none());
    }
}
