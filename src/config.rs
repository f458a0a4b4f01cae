//! Parser configuration.
//!
//! A single [`ParserConfig`] record is passed into every reader and
//! resolver entry point. The process-wide default is initialized lazily and
//! used wherever a caller does not supply its own.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::urdf::UrdfTranslation;

/// Severity applied to a class of diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnforcementPolicy {
    /// Suppress entirely.
    Ignore,
    /// Log through `tracing` and continue.
    #[default]
    Warn,
    /// Record an error in the load's error vector.
    Err,
}

/// Callback mapping a URI to an absolute path, or `None` when the URI
/// cannot be resolved.
pub type UriLookup = Arc<dyn Fn(&str) -> Option<PathBuf> + Send + Sync>;

/// Callback consulted when an `<include>` URI resolves to something other
/// than an SDF file; returns the model's SDF document as a string.
pub type CustomModelParser = Arc<dyn Fn(&Path) -> Option<String> + Send + Sync>;

/// Configuration knobs for a load.
#[derive(Clone)]
pub struct ParserConfig {
    /// Handling of elements and attributes not in the schema (the
    /// namespaced `*:*` bypass is exempt).
    pub unrecognized_elements: EnforcementPolicy,
    /// Handling of elements the schema marks deprecated.
    pub deprecated_elements: EnforcementPolicy,
    /// Global severity of warnings (duplicate sibling names, permissive
    /// root layouts, and similar).
    pub warnings: EnforcementPolicy,
    uri_lookup: Option<UriLookup>,
    custom_model_parsers: Vec<CustomModelParser>,
    urdf_translator: Option<Arc<dyn UrdfTranslation>>,
    /// Convert older documents forward to the current schema version.
    pub convert_versions: bool,
}

impl std::fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserConfig")
            .field("unrecognized_elements", &self.unrecognized_elements)
            .field("deprecated_elements", &self.deprecated_elements)
            .field("warnings", &self.warnings)
            .field("uri_lookup", &self.uri_lookup.is_some())
            .field("custom_model_parsers", &self.custom_model_parsers.len())
            .field("urdf_translator", &self.urdf_translator.is_some())
            .field("convert_versions", &self.convert_versions)
            .finish()
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            unrecognized_elements: EnforcementPolicy::Warn,
            deprecated_elements: EnforcementPolicy::Warn,
            warnings: EnforcementPolicy::Warn,
            uri_lookup: None,
            custom_model_parsers: Vec::new(),
            urdf_translator: None,
            convert_versions: true,
        }
    }
}

impl ParserConfig {
    /// Create a config with default policies (warn, convert enabled).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default configuration.
    pub fn global() -> &'static ParserConfig {
        static GLOBAL: OnceLock<ParserConfig> = OnceLock::new();
        GLOBAL.get_or_init(ParserConfig::new)
    }

    /// Set the policy for unrecognized elements and attributes.
    #[must_use]
    pub fn with_unrecognized_elements(mut self, policy: EnforcementPolicy) -> Self {
        self.unrecognized_elements = policy;
        self
    }

    /// Set the policy for deprecated elements.
    #[must_use]
    pub fn with_deprecated_elements(mut self, policy: EnforcementPolicy) -> Self {
        self.deprecated_elements = policy;
        self
    }

    /// Set the global warning severity.
    #[must_use]
    pub fn with_warnings(mut self, policy: EnforcementPolicy) -> Self {
        self.warnings = policy;
        self
    }

    /// Install a URI lookup callback.
    #[must_use]
    pub fn with_uri_lookup(mut self, lookup: UriLookup) -> Self {
        self.uri_lookup = Some(lookup);
        self
    }

    /// Append a custom model parser.
    #[must_use]
    pub fn with_custom_model_parser(mut self, parser: CustomModelParser) -> Self {
        self.custom_model_parsers.push(parser);
        self
    }

    /// Install the external URDF translator.
    #[must_use]
    pub fn with_urdf_translator(mut self, translator: Arc<dyn UrdfTranslation>) -> Self {
        self.urdf_translator = Some(translator);
        self
    }

    /// Disable forward version conversion.
    #[must_use]
    pub fn without_version_conversion(mut self) -> Self {
        self.convert_versions = false;
        self
    }

    /// Custom model parsers, in registration order.
    #[must_use]
    pub fn custom_model_parsers(&self) -> &[CustomModelParser] {
        &self.custom_model_parsers
    }

    /// The installed URDF translator, if any.
    #[must_use]
    pub fn urdf_translator(&self) -> Option<&Arc<dyn UrdfTranslation>> {
        self.urdf_translator.as_ref()
    }

    /// Resolve a URI to an absolute path. The installed lookup callback is
    /// consulted first; plain filesystem paths are accepted as-is when
    /// they exist relative to `base_dir`.
    #[must_use]
    pub fn find_file(&self, uri: &str, base_dir: Option<&Path>) -> Option<PathBuf> {
        if let Some(ref lookup) = self.uri_lookup {
            if let Some(path) = lookup(uri) {
                return Some(path);
            }
        }
        let stripped = uri.strip_prefix("file://").unwrap_or(uri);
        if stripped.contains("://") {
            // Unresolvable scheme without a lookup callback.
            return None;
        }
        let path = Path::new(stripped);
        if path.is_absolute() {
            return path.exists().then(|| path.to_path_buf());
        }
        let joined = match base_dir {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        };
        joined.exists().then_some(joined)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policies() {
        let config = ParserConfig::new();
        assert_eq!(config.unrecognized_elements, EnforcementPolicy::Warn);
        assert_eq!(config.warnings, EnforcementPolicy::Warn);
        assert!(config.convert_versions);
    }

    #[test]
    fn test_global_is_stable() {
        let a = ParserConfig::global();
        let b = ParserConfig::global();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_uri_lookup_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("resolved.sdf");
        std::fs::write(&target, "<sdf/>").unwrap();
        let target_clone = target.clone();
        let config = ParserConfig::new().with_uri_lookup(Arc::new(move |uri: &str| {
            (uri == "model://box").then(|| target_clone.clone())
        }));
        assert_eq!(config.find_file("model://box", None), Some(target));
        assert_eq!(config.find_file("model://missing", None), None);
    }

    #[test]
    fn test_find_file_relative_to_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.sdf"), "<sdf/>").unwrap();
        let config = ParserConfig::new();
        assert!(config.find_file("a.sdf", Some(dir.path())).is_some());
        assert!(config.find_file("missing.sdf", Some(dir.path())).is_none());
    }
}
