//! Rendered geometry attached to a link.

use crate::element::{Element, ElementPtr};
use crate::error::Errors;
use crate::frames::SemanticPose;
use crate::schema;

use super::Material;

/// A visual: named geometry with appearance, posed in its link.
#[derive(Debug, Clone)]
pub struct Visual {
    name: String,
    semantic_pose: SemanticPose,
    cast_shadows: bool,
    transparency: f64,
    laser_retro: f64,
    visibility_flags: u64,
    geometry: Option<ElementPtr>,
    material: Option<Material>,
    element: Option<ElementPtr>,
}

impl Default for Visual {
    fn default() -> Self {
        Self {
            name: String::new(),
            semantic_pose: SemanticPose::default(),
            cast_shadows: true,
            transparency: 0.0,
            laser_retro: 0.0,
            visibility_flags: u64::from(u32::MAX),
            geometry: None,
            material: None,
            element: None,
        }
    }
}

impl Visual {
    /// Load from a `<visual>` element.
    pub fn load(elem: &ElementPtr, errors: &mut Errors) -> Self {
        let e = elem.borrow();
        let mut visual = Self {
            name: super::name_of(&e),
            ..Self::default()
        };
        let (raw, relative_to) = super::load_pose(&e);
        visual.semantic_pose = SemanticPose::new(raw, relative_to);
        visual.cast_shadows = e.get("cast_shadows", true).0;
        visual.transparency = e.get("transparency", 0.0).0;
        visual.laser_retro = e.get("laser_retro", 0.0).0;
        visual.visibility_flags = e.get("visibility_flags", visual.visibility_flags).0;
        visual.geometry = e.find_element("geometry");
        visual.material = e
            .find_element("material")
            .map(|m| Material::load(&m, errors));
        drop(e);
        visual.element = Some(elem.clone());
        visual
    }

    /// Visual name (unique within the link).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the visual name.
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

    /// Whether this visual casts shadows.
    #[must_use]
    pub fn cast_shadows(&self) -> bool {
        self.cast_shadows
    }

    /// Transparency in [0, 1]; 0 is opaque.
    #[must_use]
    pub fn transparency(&self) -> f64 {
        self.transparency
    }

    /// Laser retro-reflectivity value.
    #[must_use]
    pub fn laser_retro(&self) -> f64 {
        self.laser_retro
    }

    /// Visibility bitmask.
    #[must_use]
    pub fn visibility_flags(&self) -> u64 {
        self.visibility_flags
    }

    /// The `<geometry>` subtree.
    #[must_use]
    pub fn geometry(&self) -> Option<&ElementPtr> {
        self.geometry.as_ref()
    }

    /// The material, if declared.
    #[must_use]
    pub fn material(&self) -> Option<&Material> {
        self.material.as_ref()
    }

    /// The element this visual was loaded from.
    #[must_use]
    pub fn element(&self) -> Option<&ElementPtr> {
        self.element.as_ref()
    }

    /// Reconstruct a schema-valid `<visual>` element.
    #[must_use]
    pub fn to_element(&self) -> ElementPtr {
        let elem = Element::from_description(&schema::cache().file("visual.sdf")).into_ptr();
        super::store_attribute(&elem, "name", &self.name);
        super::store_pose(
            &elem,
            self.semantic_pose.raw_pose(),
            self.semantic_pose.relative_to(),
        );
        super::store_child(&elem, "cast_shadows", self.cast_shadows);
        super::store_child(&elem, "transparency", self.transparency);
        if let Some(ref geometry) = self.geometry {
            let copy = geometry.borrow().deep_clone().into_ptr();
            elem.borrow_mut().clear_elements("geometry");
            elem.borrow_mut().insert_element(copy);
        }
        if let Some(ref material) = self.material {
            elem.borrow_mut().insert_element(material.to_element());
        }
        elem
    }
}
