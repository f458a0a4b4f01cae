//! Light sources attached to worlds and links.

use nalgebra::{Vector3, Vector4};

use crate::element::{Element, ElementPtr};
use crate::error::{ErrorCode, Errors, SdfError};
use crate::frames::SemanticPose;
use crate::schema;

/// Kind of light source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightType {
    /// Omnidirectional point light.
    #[default]
    Point,
    /// Cone-shaped spot light.
    Spot,
    /// Parallel directional light.
    Directional,
}

impl LightType {
    /// Parse the `type` attribute value.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "point" => Some(Self::Point),
            "spot" => Some(Self::Spot),
            "directional" => Some(Self::Directional),
            _ => None,
        }
    }

    /// The attribute value for this type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Spot => "spot",
            Self::Directional => "directional",
        }
    }
}

/// Spot-light cone parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpotCone {
    /// Inner cone angle in radians.
    pub inner_angle: f64,
    /// Outer cone angle in radians.
    pub outer_angle: f64,
    /// Falloff exponent between inner and outer cone.
    pub falloff: f64,
}

/// A light source.
#[derive(Debug, Clone)]
pub struct Light {
    name: String,
    light_type: LightType,
    semantic_pose: SemanticPose,
    cast_shadows: bool,
    intensity: f64,
    diffuse: Vector4<f64>,
    specular: Vector4<f64>,
    direction: Vector3<f64>,
    attenuation_range: f64,
    attenuation_constant: f64,
    attenuation_linear: f64,
    attenuation_quadratic: f64,
    spot: Option<SpotCone>,
    element: Option<ElementPtr>,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            name: String::new(),
            light_type: LightType::Point,
            semantic_pose: SemanticPose::default(),
            cast_shadows: false,
            intensity: 1.0,
            diffuse: Vector4::new(1.0, 1.0, 1.0, 1.0),
            specular: Vector4::new(0.1, 0.1, 0.1, 1.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
            attenuation_range: 10.0,
            attenuation_constant: 1.0,
            attenuation_linear: 1.0,
            attenuation_quadratic: 0.0,
            spot: None,
            element: None,
        }
    }
}

impl Light {
    /// Load from a `<light>` element.
    pub fn load(elem: &ElementPtr, errors: &mut Errors) -> Self {
        let e = elem.borrow();
        let mut light = Self {
            name: super::name_of(&e),
            ..Self::default()
        };

        let type_text = e.attribute_text("type").unwrap_or_default();
        match LightType::from_str(&type_text) {
            Some(t) => light.light_type = t,
            None => errors.push(
                SdfError::new(
                    ErrorCode::AttributeInvalid,
                    format!("unknown light type '{type_text}' on light '{}'", light.name),
                )
                .with_xml_path(e.xml_path().to_string()),
            ),
        }

        let (raw, relative_to) = super::load_pose(&e);
        light.semantic_pose = SemanticPose::new(raw, relative_to);

        light.cast_shadows = e.get("cast_shadows", false).0;
        light.intensity = e.get("intensity", 1.0).0;
        light.diffuse = e.get("diffuse", light.diffuse).0;
        light.specular = e.get("specular", light.specular).0;
        light.direction = e.get("direction", light.direction).0;

        if let Some(att) = e.find_element("attenuation") {
            let att = att.borrow();
            light.attenuation_range = att.get("range", 10.0).0;
            light.attenuation_constant = att.get("constant", 1.0).0;
            light.attenuation_linear = att.get("linear", 1.0).0;
            light.attenuation_quadratic = att.get("quadratic", 0.0).0;
        }
        if let Some(spot) = e.find_element("spot") {
            let spot = spot.borrow();
            light.spot = Some(SpotCone {
                inner_angle: spot.get("inner_angle", 0.0).0,
                outer_angle: spot.get("outer_angle", 0.0).0,
                falloff: spot.get("falloff", 0.0).0,
            });
        }
        drop(e);
        light.element = Some(elem.clone());
        light
    }

    /// Light name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the light name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Light kind.
    #[must_use]
    pub fn light_type(&self) -> LightType {
        self.light_type
    }

    /// Authored pose with graph context.
    #[must_use]
    pub fn semantic_pose(&self) -> &SemanticPose {
        &self.semantic_pose
    }

    pub(crate) fn semantic_pose_mut(&mut self) -> &mut SemanticPose {
        &mut self.semantic_pose
    }

    /// Whether this light casts shadows.
    #[must_use]
    pub fn cast_shadows(&self) -> bool {
        self.cast_shadows
    }

    /// Luminous intensity scale.
    #[must_use]
    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    /// Diffuse color.
    #[must_use]
    pub fn diffuse(&self) -> Vector4<f64> {
        self.diffuse
    }

    /// Specular color.
    #[must_use]
    pub fn specular(&self) -> Vector4<f64> {
        self.specular
    }

    /// Direction of spot and directional lights.
    #[must_use]
    pub fn direction(&self) -> Vector3<f64> {
        self.direction
    }

    /// Attenuation (range, constant, linear, quadratic).
    #[must_use]
    pub fn attenuation(&self) -> (f64, f64, f64, f64) {
        (
            self.attenuation_range,
            self.attenuation_constant,
            self.attenuation_linear,
            self.attenuation_quadratic,
        )
    }

    /// Spot cone parameters for spot lights.
    #[must_use]
    pub fn spot(&self) -> Option<&SpotCone> {
        self.spot.as_ref()
    }

    /// The element this light was loaded from.
    #[must_use]
    pub fn element(&self) -> Option<&ElementPtr> {
        self.element.as_ref()
    }

    /// Reconstruct a schema-valid `<light>` element.
    #[must_use]
    pub fn to_element(&self) -> ElementPtr {
        let elem = Element::from_description(&schema::cache().file("light.sdf")).into_ptr();
        super::store_attribute(&elem, "name", &self.name);
        super::store_attribute(&elem, "type", self.light_type.as_str());
        super::store_pose(
            &elem,
            self.semantic_pose.raw_pose(),
            self.semantic_pose.relative_to(),
        );
        super::store_child(&elem, "cast_shadows", self.cast_shadows);
        super::store_child(&elem, "intensity", self.intensity);
        super::store_child(&elem, "diffuse", self.diffuse);
        super::store_child(&elem, "specular", self.specular);
        super::store_child(&elem, "direction", self.direction);
        let att = elem.borrow_mut().get_element("attenuation");
        super::store_child(&att, "range", self.attenuation_range);
        super::store_child(&att, "constant", self.attenuation_constant);
        super::store_child(&att, "linear", self.attenuation_linear);
        super::store_child(&att, "quadratic", self.attenuation_quadratic);
        if let Some(spot) = self.spot {
            let spot_elem = elem.borrow_mut().get_element("spot");
            super::store_child(&spot_elem, "inner_angle", spot.inner_angle);
            super::store_child(&spot_elem, "outer_angle", spot.outer_angle);
            super::store_child(&spot_elem, "falloff", spot.falloff);
        }
        elem
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::reader;

    #[test]
    fn test_load_spot_light() {
        let mut errors = Errors::new();
        let doc = reader::read_string(
            r#"<sdf version="1.9"><world name="w">
                 <light name="lamp" type="spot">
                   <intensity>2.5</intensity>
                   <spot><inner_angle>0.2</inner_angle><outer_angle>0.6</outer_angle><falloff>1</falloff></spot>
                 </light>
               </world></sdf>"#,
            &ParserConfig::new(),
            &mut errors,
        )
        .unwrap();
        assert!(errors.is_empty(), "{errors:?}");
        let root = doc.root.borrow();
        let world = root.find_element("world").unwrap();
        let light_elem = world.borrow().find_element("light").unwrap();
        let light = Light::load(&light_elem, &mut errors);
        assert_eq!(light.name(), "lamp");
        assert_eq!(light.light_type(), LightType::Spot);
        assert!((light.intensity() - 2.5).abs() < 1e-12);
        assert!((light.spot().unwrap().outer_angle - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_type_reported() {
        let mut light_elem =
            Element::from_description(&schema::cache().file("light.sdf"));
        if let Some(attr) = light_elem.attribute_mut("name") {
            attr.set_from_string("x").unwrap();
        }
        if let Some(attr) = light_elem.attribute_mut("type") {
            attr.set_from_string("laser").unwrap();
        }
        let mut errors = Errors::new();
        let light = Light::load(&light_elem.into_ptr(), &mut errors);
        assert_eq!(light.light_type(), LightType::Point);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), ErrorCode::AttributeInvalid);
    }

    #[test]
    fn test_round_trip() {
        let mut errors = Errors::new();
        let mut light = Light::default();
        light.set_name("sun");
        let reloaded = Light::load(&light.to_element(), &mut errors);
        assert_eq!(reloaded.name(), "sun");
        assert_eq!(reloaded.light_type(), LightType::Point);
    }
}
