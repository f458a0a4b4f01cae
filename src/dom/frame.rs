//! Explicit named coordinate frames.

use std::rc::Rc;

use crate::element::{Element, ElementPtr};
use crate::error::{Errors, SdfError};
use crate::frames::{FrameAttachedToGraph, SemanticPose};
use crate::schema;

/// An explicit frame: a named pose rigidly attached to another entity.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    name: String,
    attached_to: String,
    semantic_pose: SemanticPose,
    attached_to_graph: Option<Rc<FrameAttachedToGraph>>,
    /// Qualified vertex name in the scope graphs.
    graph_name: String,
    element: Option<ElementPtr>,
}

impl Frame {
    /// Load from a `<frame>` element.
    pub fn load(elem: &ElementPtr, _errors: &mut Errors) -> Self {
        let e = elem.borrow();
        let (raw, relative_to) = super::load_pose(&e);
        let frame = Self {
            name: super::name_of(&e),
            attached_to: e.attribute_text("attached_to").unwrap_or_default(),
            semantic_pose: SemanticPose::new(raw, relative_to),
            ..Self::default()
        };
        drop(e);
        Self {
            element: Some(elem.clone()),
            ..frame
        }
    }

    /// Frame name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the frame name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The authored `attached_to` value; empty means the enclosing
    /// scope's frame.
    #[must_use]
    pub fn attached_to(&self) -> &str {
        &self.attached_to
    }

    /// Set the `attached_to` target.
    pub fn set_attached_to(&mut self, attached_to: impl Into<String>) {
        self.attached_to = attached_to.into();
    }

    /// Authored pose with graph context.
    #[must_use]
    pub fn semantic_pose(&self) -> &SemanticPose {
        &self.semantic_pose
    }

    pub(crate) fn semantic_pose_mut(&mut self) -> &mut SemanticPose {
        &mut self.semantic_pose
    }

    pub(crate) fn attach_graph(&mut self, graph: Rc<FrameAttachedToGraph>, graph_name: String) {
        self.attached_to_graph = Some(graph);
        self.graph_name = graph_name;
    }

    /// Walk the frame-attached-to graph to the body this frame is
    /// ultimately attached to.
    ///
    /// # Errors
    ///
    /// Graph-walk failures, or `FrameAttachedToInvalid` when no graph has
    /// been attached yet.
    pub fn resolve_attached_to_body(&self) -> Result<String, SdfError> {
        let Some(ref graph) = self.attached_to_graph else {
            return Err(SdfError::new(
                crate::error::ErrorCode::FrameAttachedToInvalid,
                "attachment cannot be resolved: no frame graph is attached",
            ));
        };
        graph.resolve_attached_to(&self.graph_name)
    }

    /// The element this frame was loaded from.
    #[must_use]
    pub fn element(&self) -> Option<&ElementPtr> {
        self.element.as_ref()
    }

    /// Reconstruct a schema-valid `<frame>` element.
    #[must_use]
    pub fn to_element(&self) -> ElementPtr {
        let elem = Element::from_description(&schema::cache().file("frame.sdf")).into_ptr();
        super::store_attribute(&elem, "name", &self.name);
        if !self.attached_to.is_empty() {
            super::store_attribute(&elem, "attached_to", &self.attached_to);
        }
        super::store_pose(
            &elem,
            self.semantic_pose.raw_pose(),
            self.semantic_pose.relative_to(),
        );
        elem
    }
}
