//! Error types for SDF parsing and loading.

use thiserror::Error;

/// Machine-readable classification of an [`SdfError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[non_exhaustive]
pub enum ErrorCode {
    /// A file could not be read from disk.
    #[error("file read")]
    FileRead,
    /// The input was not well-formed XML, or not an SDF document.
    #[error("parsing error")]
    Parsing,
    /// A required element is missing.
    #[error("element missing")]
    ElementMissing,
    /// An element is present but invalid.
    #[error("element invalid")]
    ElementInvalid,
    /// An element's value does not match its declared type.
    #[error("element incorrect type")]
    ElementIncorrectType,
    /// An element is deprecated in the current schema.
    #[error("element deprecated")]
    ElementDeprecated,
    /// A required attribute is missing.
    #[error("attribute missing")]
    AttributeMissing,
    /// An attribute is present but invalid.
    #[error("attribute invalid")]
    AttributeInvalid,
    /// An attribute's value does not match its declared type.
    #[error("attribute incorrect type")]
    AttributeIncorrectType,
    /// A URI could not be resolved to a file.
    #[error("uri lookup")]
    UriLookup,
    /// A merge-include was requested in an unsupported position.
    #[error("merge include unsupported")]
    MergeIncludeUnsupported,
    /// A model's placement frame declaration is invalid.
    #[error("model placement frame invalid")]
    ModelPlacementFrameInvalid,
    /// A model's canonical link could not be resolved.
    #[error("model canonical link invalid")]
    ModelCanonicalLinkInvalid,
    /// A link's inertia is not physically valid.
    #[error("link inertia invalid")]
    LinkInertiaInvalid,
    /// A joint's parent link could not be resolved.
    #[error("joint parent link invalid")]
    JointParentLinkInvalid,
    /// A joint's child link could not be resolved.
    #[error("joint child link invalid")]
    JointChildLinkInvalid,
    /// A joint's parent and child resolve to the same link.
    #[error("joint parent same as child")]
    JointParentSameAsChild,
    /// A frame's attached_to target could not be resolved.
    #[error("frame attached_to invalid")]
    FrameAttachedToInvalid,
    /// The frame-attached-to graph contains a cycle.
    #[error("frame attached_to cycle")]
    FrameAttachedToCycle,
    /// A pose's relative_to target could not be resolved.
    #[error("pose relative_to invalid")]
    PoseRelativeToInvalid,
    /// The pose-relative-to graph contains a cycle.
    #[error("pose relative_to cycle")]
    PoseRelativeToCycle,
    /// A reserved identifier was used as a user-assigned name or
    /// frame reference.
    #[error("reserved name")]
    ReservedName,
    /// The name of a frame is unknown to the scope's graphs.
    #[error("frame unknown")]
    FrameUnknown,
    /// A non-fatal diagnostic promoted to an error by policy.
    #[error("warning")]
    Warning,
}

/// A single diagnostic produced while loading an SDF document.
///
/// Errors accumulate in an [`Errors`] vector passed through the load path;
/// most are recoverable so that a single pass reports as many problems as
/// possible. Each error carries its classification, a human-readable
/// message, and whatever source location could be derived.
#[derive(Debug, Clone, PartialEq)]
pub struct SdfError {
    code: ErrorCode,
    message: String,
    file_path: Option<String>,
    xml_path: Option<String>,
    line_number: Option<u64>,
}

impl SdfError {
    /// Create an error with a code and message but no source location.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            file_path: None,
            xml_path: None,
            line_number: None,
        }
    }

    /// Attach the source file path.
    #[must_use]
    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Attach the XML path, e.g. `/sdf/world/model[@name="m"]`.
    #[must_use]
    pub fn with_xml_path(mut self, path: impl Into<String>) -> Self {
        self.xml_path = Some(path.into());
        self
    }

    /// Attach the line number in the source file.
    #[must_use]
    pub fn with_line_number(mut self, line: u64) -> Self {
        self.line_number = Some(line);
        self
    }

    /// The error classification.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The source file path, if known.
    #[must_use]
    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    /// The XML path, if known.
    #[must_use]
    pub fn xml_path(&self) -> Option<&str> {
        self.xml_path.as_deref()
    }

    /// The line number, if known.
    #[must_use]
    pub fn line_number(&self) -> Option<u64> {
        self.line_number
    }
}

impl std::fmt::Display for SdfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref path) = self.file_path {
            write!(f, " (file: {path}")?;
            if let Some(line) = self.line_number {
                write!(f, ":{line}")?;
            }
            write!(f, ")")?;
        } else if let Some(line) = self.line_number {
            write!(f, " (line {line})")?;
        }
        if let Some(ref xml) = self.xml_path {
            write!(f, " [{xml}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for SdfError {}

/// Accumulated diagnostics from a load.
pub type Errors = Vec<SdfError>;

/// Location in an SDF source, threaded through the reader so every error
/// it emits can point back at the offending XML.
#[derive(Debug, Clone, Default)]
pub(crate) struct SourceLocation {
    pub file_path: Option<String>,
    pub xml_path: Option<String>,
    pub line_number: Option<u64>,
}

impl SourceLocation {
    pub fn apply(&self, mut error: SdfError) -> SdfError {
        if let Some(ref f) = self.file_path {
            error = error.with_file_path(f.clone());
        }
        if let Some(ref x) = self.xml_path {
            error = error.with_xml_path(x.clone());
        }
        if let Some(l) = self.line_number {
            error = error.with_line_number(l);
        }
        error
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SdfError::new(ErrorCode::AttributeMissing, "missing name on frame")
            .with_file_path("model.sdf")
            .with_line_number(12)
            .with_xml_path("/sdf/model/frame");
        let rendered = err.to_string();
        assert!(rendered.contains("attribute missing"));
        assert!(rendered.contains("model.sdf:12"));
        assert!(rendered.contains("/sdf/model/frame"));
    }

    #[test]
    fn test_error_accessors() {
        let err = SdfError::new(ErrorCode::ReservedName, "'__model__' is reserved");
        assert_eq!(err.code(), ErrorCode::ReservedName);
        assert!(err.file_path().is_none());
        assert!(err.line_number().is_none());
    }

    #[test]
    fn test_source_location_apply() {
        let loc = SourceLocation {
            file_path: Some("world.sdf".into()),
            xml_path: Some("/sdf/world".into()),
            line_number: Some(3),
        };
        let err = loc.apply(SdfError::new(ErrorCode::ElementInvalid, "bad"));
        assert_eq!(err.file_path(), Some("world.sdf"));
        assert_eq!(err.xml_path(), Some("/sdf/world"));
        assert_eq!(err.line_number(), Some(3));
    }
}
