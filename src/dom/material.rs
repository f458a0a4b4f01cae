//! Surface appearance of a visual.

use nalgebra::Vector4;

use crate::element::ElementPtr;
use crate::error::Errors;
use crate::schema;

/// Material colors and shading flags.
#[derive(Debug, Clone)]
pub struct Material {
    ambient: Vector4<f64>,
    diffuse: Vector4<f64>,
    specular: Vector4<f64>,
    emissive: Vector4<f64>,
    lighting: bool,
    double_sided: bool,
    shininess: f64,
    element: Option<ElementPtr>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vector4::new(0.0, 0.0, 0.0, 1.0),
            diffuse: Vector4::new(0.0, 0.0, 0.0, 1.0),
            specular: Vector4::new(0.0, 0.0, 0.0, 1.0),
            emissive: Vector4::new(0.0, 0.0, 0.0, 1.0),
            lighting: true,
            double_sided: false,
            shininess: 0.0,
            element: None,
        }
    }
}

impl Material {
    /// Load from a `<material>` element.
    pub fn load(elem: &ElementPtr, _errors: &mut Errors) -> Self {
        let e = elem.borrow();
        let mut material = Self::default();
        material.ambient = e.get("ambient", material.ambient).0;
        material.diffuse = e.get("diffuse", material.diffuse).0;
        material.specular = e.get("specular", material.specular).0;
        material.emissive = e.get("emissive", material.emissive).0;
        material.lighting = e.get("lighting", true).0;
        material.double_sided = e.get("double_sided", false).0;
        material.shininess = e.get("shininess", 0.0).0;
        drop(e);
        material.element = Some(elem.clone());
        material
    }

    /// Ambient color.
    #[must_use]
    pub fn ambient(&self) -> Vector4<f64> {
        self.ambient
    }

    /// Set the ambient color.
    pub fn set_ambient(&mut self, color: Vector4<f64>) {
        self.ambient = color;
    }

    /// Diffuse color.
    #[must_use]
    pub fn diffuse(&self) -> Vector4<f64> {
        self.diffuse
    }

    /// Set the diffuse color.
    pub fn set_diffuse(&mut self, color: Vector4<f64>) {
        self.diffuse = color;
    }

    /// Specular color.
    #[must_use]
    pub fn specular(&self) -> Vector4<f64> {
        self.specular
    }

    /// Set the specular color.
    pub fn set_specular(&mut self, color: Vector4<f64>) {
        self.specular = color;
    }

    /// Emissive color.
    #[must_use]
    pub fn emissive(&self) -> Vector4<f64> {
        self.emissive
    }

    /// Set the emissive color.
    pub fn set_emissive(&mut self, color: Vector4<f64>) {
        self.emissive = color;
    }

    /// Whether dynamic lighting applies.
    #[must_use]
    pub fn lighting(&self) -> bool {
        self.lighting
    }

    /// Whether both faces are rendered.
    #[must_use]
    pub fn double_sided(&self) -> bool {
        self.double_sided
    }

    /// Shininess exponent.
    #[must_use]
    pub fn shininess(&self) -> f64 {
        self.shininess
    }

    /// The element this material was loaded from.
    #[must_use]
    pub fn element(&self) -> Option<&ElementPtr> {
        self.element.as_ref()
    }

    /// Reconstruct a schema-valid `<material>` element.
    #[must_use]
    pub fn to_element(&self) -> ElementPtr {
        let elem =
            crate::element::Element::from_description(&schema::cache().file("material.sdf"))
                .into_ptr();
        super::store_child(&elem, "ambient", self.ambient);
        super::store_child(&elem, "diffuse", self.diffuse);
        super::store_child(&elem, "specular", self.specular);
        super::store_child(&elem, "emissive", self.emissive);
        super::store_child(&elem, "lighting", self.lighting);
        super::store_child(&elem, "double_sided", self.double_sided);
        super::store_child(&elem, "shininess", self.shininess);
        elem
    }
}
