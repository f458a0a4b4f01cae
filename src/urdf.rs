//! Interface to the external URDF translator.
//!
//! URDF documents are translated to SDF XML by an external collaborator
//! before parsing; this crate only defines the boundary. Install an
//! implementation through
//! [`ParserConfig::with_urdf_translator`](crate::ParserConfig::with_urdf_translator);
//! the reader consults it when the input's root element is `<robot>`.

/// Translates a URDF document into SDF XML.
pub trait UrdfTranslation: Send + Sync {
    /// Translate `urdf_xml` into an SDF document string at the current
    /// schema version.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message when the input cannot be
    /// translated.
    fn translate(&self, urdf_xml: &str) -> Result<String, String>;
}

impl<F> UrdfTranslation for F
where
    F: Fn(&str) -> Result<String, String> + Send + Sync,
{
    fn translate(&self, urdf_xml: &str) -> Result<String, String> {
        self(urdf_xml)
    }
}

/// Whether a parsed root element name marks a URDF document.
#[must_use]
pub fn is_urdf_root(root_name: &str) -> bool {
    root_name == "robot"
}
