//! Particle emitters attached to links.

use nalgebra::{Vector3, Vector4};

use crate::element::{Element, ElementPtr};
use crate::error::{ErrorCode, Errors, SdfError};
use crate::frames::SemanticPose;
use crate::schema;

/// Shape of the emission region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParticleEmitterType {
    /// Emit from a single point.
    #[default]
    Point,
    /// Emit from a box volume.
    Box,
    /// Emit from a cylindrical volume.
    Cylinder,
    /// Emit from an ellipsoidal volume.
    Ellipsoid,
}

impl ParticleEmitterType {
    /// Parse the `type` attribute value.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "point" => Some(Self::Point),
            "box" => Some(Self::Box),
            "cylinder" => Some(Self::Cylinder),
            "ellipsoid" => Some(Self::Ellipsoid),
            _ => None,
        }
    }

    /// The attribute value for this type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Box => "box",
            Self::Cylinder => "cylinder",
            Self::Ellipsoid => "ellipsoid",
        }
    }
}

/// A particle emitter.
#[derive(Debug, Clone)]
pub struct ParticleEmitter {
    name: String,
    emitter_type: ParticleEmitterType,
    semantic_pose: SemanticPose,
    emitting: bool,
    duration: f64,
    lifetime: f64,
    rate: f64,
    scale_rate: f64,
    min_velocity: f64,
    max_velocity: f64,
    size: Vector3<f64>,
    particle_size: Vector3<f64>,
    color_start: Vector4<f64>,
    color_end: Vector4<f64>,
    topic: String,
    element: Option<ElementPtr>,
}

impl Default for ParticleEmitter {
    fn default() -> Self {
        Self {
            name: String::new(),
            emitter_type: ParticleEmitterType::Point,
            semantic_pose: SemanticPose::default(),
            emitting: true,
            duration: 0.0,
            lifetime: 5.0,
            rate: 10.0,
            scale_rate: 0.0,
            min_velocity: 1.0,
            max_velocity: 1.0,
            size: Vector3::new(1.0, 1.0, 1.0),
            particle_size: Vector3::new(1.0, 1.0, 1.0),
            color_start: Vector4::new(1.0, 1.0, 1.0, 1.0),
            color_end: Vector4::new(1.0, 1.0, 1.0, 1.0),
            topic: String::new(),
            element: None,
        }
    }
}

impl ParticleEmitter {
    /// Load from a `<particle_emitter>` element.
    pub fn load(elem: &ElementPtr, errors: &mut Errors) -> Self {
        let e = elem.borrow();
        let mut emitter = Self {
            name: super::name_of(&e),
            ..Self::default()
        };

        let type_text = e.attribute_text("type").unwrap_or_default();
        match ParticleEmitterType::from_str(&type_text) {
            Some(t) => emitter.emitter_type = t,
            None => errors.push(
                SdfError::new(
                    ErrorCode::AttributeInvalid,
                    format!(
                        "unknown particle emitter type '{type_text}' on emitter '{}'",
                        emitter.name
                    ),
                )
                .with_xml_path(e.xml_path().to_string()),
            ),
        }

        let (raw, relative_to) = super::load_pose(&e);
        emitter.semantic_pose = SemanticPose::new(raw, relative_to);
        emitter.emitting = e.get("emitting", true).0;
        emitter.duration = e.get("duration", 0.0).0;
        emitter.lifetime = e.get("lifetime", 5.0).0;
        emitter.rate = e.get("rate", 10.0).0;
        emitter.scale_rate = e.get("scale_rate", 0.0).0;
        emitter.min_velocity = e.get("min_velocity", 1.0).0;
        emitter.max_velocity = e.get("max_velocity", 1.0).0;
        emitter.size = e.get("size", emitter.size).0;
        emitter.particle_size = e.get("particle_size", emitter.particle_size).0;
        emitter.color_start = e.get("color_start", emitter.color_start).0;
        emitter.color_end = e.get("color_end", emitter.color_end).0;
        emitter.topic = e.get("topic", String::new()).0;
        drop(e);
        emitter.element = Some(elem.clone());
        emitter
    }

    /// Emitter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the emitter name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Emission region shape.
    #[must_use]
    pub fn emitter_type(&self) -> ParticleEmitterType {
        self.emitter_type
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

    /// Whether the emitter starts active.
    #[must_use]
    pub fn emitting(&self) -> bool {
        self.emitting
    }

    /// Emission duration in seconds; 0 means forever.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Particle lifetime in seconds.
    #[must_use]
    pub fn lifetime(&self) -> f64 {
        self.lifetime
    }

    /// Particles emitted per second.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Particle growth rate.
    #[must_use]
    pub fn scale_rate(&self) -> f64 {
        self.scale_rate
    }

    /// Velocity bounds (min, max).
    #[must_use]
    pub fn velocity_range(&self) -> (f64, f64) {
        (self.min_velocity, self.max_velocity)
    }

    /// Emission region size.
    #[must_use]
    pub fn size(&self) -> Vector3<f64> {
        self.size
    }

    /// Size of individual particles.
    #[must_use]
    pub fn particle_size(&self) -> Vector3<f64> {
        self.particle_size
    }

    /// Color gradient (start, end).
    #[must_use]
    pub fn color_range(&self) -> (Vector4<f64>, Vector4<f64>) {
        (self.color_start, self.color_end)
    }

    /// Control topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The element this emitter was loaded from.
    #[must_use]
    pub fn element(&self) -> Option<&ElementPtr> {
        self.element.as_ref()
    }

    /// Reconstruct a schema-valid `<particle_emitter>` element.
    #[must_use]
    pub fn to_element(&self) -> ElementPtr {
        let elem =
            Element::from_description(&schema::cache().file("particle_emitter.sdf")).into_ptr();
        super::store_attribute(&elem, "name", &self.name);
        super::store_attribute(&elem, "type", self.emitter_type.as_str());
        super::store_pose(
            &elem,
            self.semantic_pose.raw_pose(),
            self.semantic_pose.relative_to(),
        );
        super::store_child(&elem, "emitting", self.emitting);
        super::store_child(&elem, "duration", self.duration);
        super::store_child(&elem, "lifetime", self.lifetime);
        super::store_child(&elem, "rate", self.rate);
        super::store_child(&elem, "size", self.size);
        super::store_child(&elem, "particle_size", self.particle_size);
        super::store_child(&elem, "color_start", self.color_start);
        super::store_child(&elem, "color_end", self.color_end);
        elem
    }
}
