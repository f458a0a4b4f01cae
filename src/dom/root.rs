//! Root: entry point to a loaded SDF document.

use std::path::Path;

use crate::config::{EnforcementPolicy, ParserConfig};
use crate::element::{Element, ElementPtr};
use crate::error::{ErrorCode, Errors, SdfError};
use crate::frames;
use crate::reader;
use crate::schema::{self, SDF_VERSION};

use super::{Light, Model, World};

/// Error codes that invalidate the document's frame semantics; a load
/// that produces any of these exposes no domain tree.
const FATAL_GRAPH_CODES: &[ErrorCode] = &[
    ErrorCode::FrameAttachedToCycle,
    ErrorCode::FrameAttachedToInvalid,
    ErrorCode::PoseRelativeToCycle,
    ErrorCode::PoseRelativeToInvalid,
    ErrorCode::ModelCanonicalLinkInvalid,
    ErrorCode::ModelPlacementFrameInvalid,
    ErrorCode::JointParentLinkInvalid,
    ErrorCode::JointChildLinkInvalid,
    ErrorCode::JointParentSameAsChild,
];

/// The root of a loaded document: zero or more worlds and an optional
/// top-level model or light. Owns the element tree and, per scope, the
/// frame graphs.
#[derive(Debug, Default)]
pub struct Root {
    element: Option<ElementPtr>,
    version: String,
    original_version: String,
    worlds: Vec<World>,
    model: Option<Model>,
    light: Option<Light>,
}

impl Root {
    /// Create an empty root.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a file, resetting any previous contents first.
    ///
    /// A failed load leaves the root empty and returns at least one
    /// error; a successful load may still return recoverable
    /// diagnostics.
    pub fn load_file(&mut self, path: impl AsRef<Path>, config: &ParserConfig) -> Errors {
        *self = Self::default();
        let mut errors = Errors::new();
        let Some(doc) = reader::read_file(path.as_ref(), config, &mut errors) else {
            return errors;
        };
        self.load_document(doc, config, &mut errors);
        errors
    }

    /// Load from an SDF XML string, resetting any previous contents
    /// first.
    pub fn load_string(&mut self, sdf_string: &str, config: &ParserConfig) -> Errors {
        *self = Self::default();
        let mut errors = Errors::new();
        let Some(doc) = reader::read_string(sdf_string, config, &mut errors) else {
            return errors;
        };
        self.load_document(doc, config, &mut errors);
        errors
    }

    fn load_document(
        &mut self,
        doc: reader::Document,
        config: &ParserConfig,
        errors: &mut Errors,
    ) {
        self.original_version = doc.original_version.clone();
        self.version = SDF_VERSION.to_string();
        self.element = Some(doc.root.clone());

        let root_elem = doc.root.borrow();
        for world_elem in root_elem.find_elements("world") {
            let world = World::load(&world_elem, errors);
            if self.worlds.iter().any(|w| w.name() == world.name()) {
                errors.push(SdfError::new(
                    ErrorCode::ElementInvalid,
                    format!("world name '{}' is not unique", world.name()),
                ));
                continue;
            }
            self.worlds.push(world);
        }
        if let Some(model_elem) = root_elem.find_element("model") {
            self.model = Some(Model::load(&model_elem, errors));
        }
        if let Some(light_elem) = root_elem.find_element("light") {
            self.light = Some(Light::load(&light_elem, errors));
        }
        drop(root_elem);

        // The reader is permissive about a document carrying both a
        // top-level model and worlds; downstream consumers usually are
        // not.
        if self.model.is_some() && !self.worlds.is_empty() {
            let message = "document has both a top-level model and worlds".to_string();
            match config.warnings {
                EnforcementPolicy::Ignore => {}
                EnforcementPolicy::Warn => tracing::warn!("{message}"),
                EnforcementPolicy::Err => {
                    errors.push(SdfError::new(ErrorCode::Warning, message));
                }
            }
        }

        self.build_graphs(errors);

        if errors
            .iter()
            .any(|e| FATAL_GRAPH_CODES.contains(&e.code()))
        {
            // Frame semantics are unusable; expose no domain tree.
            self.worlds.clear();
            self.model = None;
            self.light = None;
            self.element = None;
        }
    }

    fn build_graphs(&mut self, errors: &mut Errors) {
        if let Some(ref mut model) = self.model {
            let graphs = frames::build_model_scope(model, errors);
            model.attach_scope(&graphs, "");
        }
        for world in &mut self.worlds {
            let graphs = frames::build_world_scope(world, errors);
            world.attach_scope(&graphs);
        }
    }

    /// Rebuild the frame and pose graphs after programmatic edits to the
    /// domain tree. Existing graph handles held by entities are replaced.
    pub fn update_graphs(&mut self) -> Errors {
        let mut errors = Errors::new();
        self.build_graphs(&mut errors);
        errors
    }

    /// The schema version of the loaded document (after conversion).
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The version the document was authored in.
    #[must_use]
    pub fn original_version(&self) -> &str {
        &self.original_version
    }

    /// Number of worlds.
    #[must_use]
    pub fn world_count(&self) -> usize {
        self.worlds.len()
    }

    /// World by index.
    #[must_use]
    pub fn world_by_index(&self, index: usize) -> Option<&World> {
        self.worlds.get(index)
    }

    /// Mutable world by index.
    pub fn world_by_index_mut(&mut self, index: usize) -> Option<&mut World> {
        self.worlds.get_mut(index)
    }

    /// Whether a world with the given name exists.
    #[must_use]
    pub fn world_name_exists(&self, name: &str) -> bool {
        self.worlds.iter().any(|w| w.name() == name)
    }

    /// The top-level model, if any.
    #[must_use]
    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    /// The top-level light, if any.
    #[must_use]
    pub fn light(&self) -> Option<&Light> {
        self.light.as_ref()
    }

    /// The element tree produced by the load, if any.
    #[must_use]
    pub fn element(&self) -> Option<&ElementPtr> {
        self.element.as_ref()
    }

    /// Add a world. Fails with `ElementInvalid` when the name collides.
    pub fn add_world(&mut self, world: World) -> Errors {
        if self.world_name_exists(world.name()) {
            return vec![SdfError::new(
                ErrorCode::ElementInvalid,
                format!("world name '{}' is not unique", world.name()),
            )];
        }
        self.worlds.push(world);
        Errors::new()
    }

    /// Remove all worlds.
    pub fn clear_worlds(&mut self) {
        self.worlds.clear();
    }

    /// Set the top-level model.
    pub fn set_model(&mut self, model: Model) {
        self.model = Some(model);
    }

    /// Reconstruct a schema-valid `<sdf>` element from the domain tree.
    #[must_use]
    pub fn to_element(&self) -> ElementPtr {
        let elem = Element::from_description(&schema::root_description()).into_ptr();
        super::store_attribute(&elem, "version", SDF_VERSION);
        for world in &self.worlds {
            elem.borrow_mut().insert_element(world.to_element());
        }
        if let Some(ref model) = self.model {
            elem.borrow_mut().insert_element(model.to_element());
        }
        if let Some(ref light) = self.light {
            elem.borrow_mut().insert_element(light.to_element());
        }
        elem
    }
}
