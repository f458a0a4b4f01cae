//! Collision geometry attached to a link.

use crate::element::{Element, ElementPtr};
use crate::error::Errors;
use crate::frames::SemanticPose;
use crate::schema;

/// A collision: named geometry used for contact, posed in its link.
#[derive(Debug, Clone, Default)]
pub struct Collision {
    name: String,
    semantic_pose: SemanticPose,
    laser_retro: f64,
    max_contacts: i64,
    geometry: Option<ElementPtr>,
    surface: Option<ElementPtr>,
    element: Option<ElementPtr>,
}

impl Collision {
    /// Load from a `<collision>` element.
    pub fn load(elem: &ElementPtr, _errors: &mut Errors) -> Self {
        let e = elem.borrow();
        let (raw, relative_to) = super::load_pose(&e);
        let collision = Self {
            name: super::name_of(&e),
            semantic_pose: SemanticPose::new(raw, relative_to),
            laser_retro: e.get("laser_retro", 0.0).0,
            max_contacts: e.get("max_contacts", 10).0,
            geometry: e.find_element("geometry"),
            surface: e.find_element("surface"),
            element: None,
        };
        drop(e);
        Self {
            element: Some(elem.clone()),
            ..collision
        }
    }

    /// Collision name (unique within the link).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the collision name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Authored pose with graph context; defaults to the owning link
    /// frame.
    #[must_use]
    pub fn semantic_pose(&self) -> &SemanticPose {
        &self.semantic_pose
    }

    pub(crate) fn semantic_pose_mut(&mut self) -> &mut SemanticPose {
        &mut self.semantic_pose
    }

    /// Laser retro-reflectivity value.
    #[must_use]
    pub fn laser_retro(&self) -> f64 {
        self.laser_retro
    }

    /// Maximum simultaneous contacts.
    #[must_use]
    pub fn max_contacts(&self) -> i64 {
        self.max_contacts
    }

    /// The `<geometry>` subtree.
    #[must_use]
    pub fn geometry(&self) -> Option<&ElementPtr> {
        self.geometry.as_ref()
    }

    /// The `<surface>` subtree, if declared.
    #[must_use]
    pub fn surface(&self) -> Option<&ElementPtr> {
        self.surface.as_ref()
    }

    /// The element this collision was loaded from.
    #[must_use]
    pub fn element(&self) -> Option<&ElementPtr> {
        self.element.as_ref()
    }

    /// Reconstruct a schema-valid `<collision>` element.
    #[must_use]
    pub fn to_element(&self) -> ElementPtr {
        let elem = Element::from_description(&schema::cache().file("collision.sdf")).into_ptr();
        super::store_attribute(&elem, "name", &self.name);
        super::store_pose(
            &elem,
            self.semantic_pose.raw_pose(),
            self.semantic_pose.relative_to(),
        );
        if self.laser_retro != 0.0 {
            super::store_child(&elem, "laser_retro", self.laser_retro);
        }
        if let Some(ref geometry) = self.geometry {
            let copy = geometry.borrow().deep_clone().into_ptr();
            elem.borrow_mut().clear_elements("geometry");
            elem.borrow_mut().insert_element(copy);
        }
        if let Some(ref surface) = self.surface {
            elem.borrow_mut()
                .insert_element(surface.borrow().deep_clone().into_ptr());
        }
        elem
    }
}
