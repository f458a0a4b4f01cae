//! Links: rigid bodies with mass properties and attached payloads.

use nalgebra::Matrix3;

use crate::element::{Element, ElementPtr};
use crate::error::{ErrorCode, Errors, SdfError};
use crate::frames::SemanticPose;
use crate::pose::Pose;
use crate::schema;

use super::{Collision, Light, ParticleEmitter, Sensor, Visual};

/// Mass properties of a link: mass, a symmetric 3×3 mass matrix, and the
/// pose of the inertial frame in the link frame.
///
/// The `<inertial>/<pose>` is treated as link-local regardless of any
/// `relative_to` attribute (legacy behavior).
#[derive(Debug, Clone, PartialEq)]
pub struct Inertial {
    mass: f64,
    moi: Matrix3<f64>,
    pose: Pose,
}

impl Default for Inertial {
    fn default() -> Self {
        Self {
            mass: 1.0,
            moi: Matrix3::identity(),
            pose: Pose::identity(),
        }
    }
}

impl Inertial {
    /// Construct from mass, moment-of-inertia matrix, and inertial pose.
    #[must_use]
    pub fn new(mass: f64, moi: Matrix3<f64>, pose: Pose) -> Self {
        Self { mass, moi, pose }
    }

    /// Mass in kilograms.
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Moment-of-inertia matrix about the inertial frame origin.
    #[must_use]
    pub fn moi(&self) -> &Matrix3<f64> {
        &self.moi
    }

    /// Pose of the inertial frame in the link frame.
    #[must_use]
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Whether the mass matrix is physically valid: positive mass,
    /// non-negative principal moments satisfying the triangle inequality.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        const TOL: f64 = 1e-9;
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return false;
        }
        if self.moi.iter().any(|v| !v.is_finite()) {
            return false;
        }
        let eigen = self.moi.symmetric_eigen();
        let mut moments = [
            eigen.eigenvalues[0],
            eigen.eigenvalues[1],
            eigen.eigenvalues[2],
        ];
        moments.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        if moments[0] < -TOL {
            return false;
        }
        moments[0] + moments[1] + TOL >= moments[2]
    }
}

/// A link: a rigid body owning visuals, collisions, sensors, lights, and
/// particle emitters.
#[derive(Debug, Clone, Default)]
pub struct Link {
    name: String,
    semantic_pose: SemanticPose,
    inertial: Inertial,
    enable_wind: bool,
    kinematic: bool,
    gravity: bool,
    visuals: Vec<Visual>,
    collisions: Vec<Collision>,
    sensors: Vec<Sensor>,
    lights: Vec<Light>,
    particle_emitters: Vec<ParticleEmitter>,
    element: Option<ElementPtr>,
}

impl Link {
    /// Load from a `<link>` element. An invalid inertia is reported but
    /// does not abort the load.
    pub fn load(elem: &ElementPtr, errors: &mut Errors) -> Self {
        let e = elem.borrow();
        let (raw, relative_to) = super::load_pose(&e);
        let mut link = Self {
            name: super::name_of(&e),
            semantic_pose: SemanticPose::new(raw, relative_to),
            gravity: true,
            ..Self::default()
        };

        link.inertial = load_inertial(&e);
        if !link.inertial.is_valid() {
            errors.push(
                SdfError::new(
                    ErrorCode::LinkInertiaInvalid,
                    format!("link '{}' has invalid inertia", link.name),
                )
                .with_xml_path(e.xml_path().to_string()),
            );
        }

        link.enable_wind = e.get("enable_wind", false).0;
        link.kinematic = e.get("kinematic", false).0;
        link.gravity = e.get("gravity", true).0;

        for visual in e.find_elements("visual") {
            link.visuals.push(Visual::load(&visual, errors));
        }
        for collision in e.find_elements("collision") {
            link.collisions.push(Collision::load(&collision, errors));
        }
        for sensor in e.find_elements("sensor") {
            link.sensors.push(Sensor::load(&sensor, errors));
        }
        for light in e.find_elements("light") {
            link.lights.push(Light::load(&light, errors));
        }
        for emitter in e.find_elements("particle_emitter") {
            link.particle_emitters
                .push(ParticleEmitter::load(&emitter, errors));
        }
        drop(e);
        link.element = Some(elem.clone());
        link
    }

    /// Link name (unique within the model scope).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the link name. The scope graphs are not rebuilt.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Authored pose with graph context.
    #[must_use]
    pub fn semantic_pose(&self) -> &SemanticPose {
        &self.semantic_pose
    }

    pub(crate) fn semantic_pose_mut(&mut self) -> &mut SemanticPose {
        &mut self.semantic_pose
    }

    /// Mass properties.
    #[must_use]
    pub fn inertial(&self) -> &Inertial {
        &self.inertial
    }

    /// Replace the mass properties, reporting whether they are valid.
    pub fn set_inertial(&mut self, inertial: Inertial) -> bool {
        let valid = inertial.is_valid();
        self.inertial = inertial;
        valid
    }

    /// Whether wind affects this link.
    #[must_use]
    pub fn enable_wind(&self) -> bool {
        self.enable_wind
    }

    /// Set the wind flag.
    pub fn set_enable_wind(&mut self, enable: bool) {
        self.enable_wind = enable;
    }

    /// Whether the link is kinematic (unaffected by forces).
    #[must_use]
    pub fn kinematic(&self) -> bool {
        self.kinematic
    }

    /// Whether gravity affects this link.
    #[must_use]
    pub fn gravity(&self) -> bool {
        self.gravity
    }

    /// Visuals in document order.
    #[must_use]
    pub fn visuals(&self) -> &[Visual] {
        &self.visuals
    }

    /// Collisions in document order.
    #[must_use]
    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }

    /// Sensors in document order.
    #[must_use]
    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    /// Lights in document order.
    #[must_use]
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Particle emitters in document order.
    #[must_use]
    pub fn particle_emitters(&self) -> &[ParticleEmitter] {
        &self.particle_emitters
    }

    pub(crate) fn payloads_mut(
        &mut self,
    ) -> (
        &mut Vec<Visual>,
        &mut Vec<Collision>,
        &mut Vec<Sensor>,
        &mut Vec<Light>,
        &mut Vec<ParticleEmitter>,
    ) {
        (
            &mut self.visuals,
            &mut self.collisions,
            &mut self.sensors,
            &mut self.lights,
            &mut self.particle_emitters,
        )
    }

    /// Visual by name.
    #[must_use]
    pub fn visual_by_name(&self, name: &str) -> Option<&Visual> {
        self.visuals.iter().find(|v| v.name() == name)
    }

    /// Collision by name.
    #[must_use]
    pub fn collision_by_name(&self, name: &str) -> Option<&Collision> {
        self.collisions.iter().find(|c| c.name() == name)
    }

    /// The element this link was loaded from.
    #[must_use]
    pub fn element(&self) -> Option<&ElementPtr> {
        self.element.as_ref()
    }

    /// Reconstruct a schema-valid `<link>` element.
    #[must_use]
    pub fn to_element(&self) -> ElementPtr {
        let elem = Element::from_description(&schema::cache().file("link.sdf")).into_ptr();
        super::store_attribute(&elem, "name", &self.name);
        super::store_pose(
            &elem,
            self.semantic_pose.raw_pose(),
            self.semantic_pose.relative_to(),
        );
        if self.enable_wind {
            super::store_child(&elem, "enable_wind", true);
        }
        store_inertial(&elem, &self.inertial);
        for visual in &self.visuals {
            elem.borrow_mut().insert_element(visual.to_element());
        }
        for collision in &self.collisions {
            elem.borrow_mut().insert_element(collision.to_element());
        }
        for sensor in &self.sensors {
            elem.borrow_mut().insert_element(sensor.to_element());
        }
        for light in &self.lights {
            elem.borrow_mut().insert_element(light.to_element());
        }
        for emitter in &self.particle_emitters {
            elem.borrow_mut().insert_element(emitter.to_element());
        }
        elem
    }
}

fn load_inertial(link_elem: &Element) -> Inertial {
    let Some(inertial_elem) = link_elem.find_element("inertial") else {
        return Inertial::default();
    };
    let inertial_elem = inertial_elem.borrow();
    let mass = inertial_elem.get("mass", 1.0).0;
    let (pose, _relative_to) = super::load_pose(&inertial_elem);
    let mut moi = Matrix3::identity();
    if let Some(inertia) = inertial_elem.find_element("inertia") {
        let inertia = inertia.borrow();
        let ixx = inertia.get("ixx", 1.0).0;
        let iyy = inertia.get("iyy", 1.0).0;
        let izz = inertia.get("izz", 1.0).0;
        let ixy = inertia.get("ixy", 0.0).0;
        let ixz = inertia.get("ixz", 0.0).0;
        let iyz = inertia.get("iyz", 0.0).0;
        moi = Matrix3::new(ixx, ixy, ixz, ixy, iyy, iyz, ixz, iyz, izz);
    }
    Inertial::new(mass, moi, pose)
}

fn store_inertial(link_elem: &ElementPtr, inertial: &Inertial) {
    if *inertial == Inertial::default() {
        return;
    }
    let inertial_elem = link_elem.borrow_mut().get_element("inertial");
    super::store_child(&inertial_elem, "mass", inertial.mass());
    super::store_pose(&inertial_elem, inertial.pose(), "");
    let inertia = inertial_elem.borrow_mut().get_element("inertia");
    let moi = inertial.moi();
    super::store_child(&inertia, "ixx", moi[(0, 0)]);
    super::store_child(&inertia, "ixy", moi[(0, 1)]);
    super::store_child(&inertia, "ixz", moi[(0, 2)]);
    super::store_child(&inertia, "iyy", moi[(1, 1)]);
    super::store_child(&inertia, "iyz", moi[(1, 2)]);
    super::store_child(&inertia, "izz", moi[(2, 2)]);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::reader;

    fn load_first_link(xml: &str) -> (Link, Errors) {
        let mut errors = Errors::new();
        let doc = reader::read_string(xml, &ParserConfig::new(), &mut errors).unwrap();
        let root = doc.root.borrow();
        let model = root.find_element("model").unwrap();
        let link_elem = model.borrow().find_element("link").unwrap();
        let link = Link::load(&link_elem, &mut errors);
        (link, errors)
    }

    #[test]
    fn test_load_link_with_inertial() {
        let (link, errors) = load_first_link(
            r#"<sdf version="1.9"><model name="m"><link name="base">
                 <inertial>
                   <mass>5.0</mass>
                   <inertia><ixx>0.5</ixx><iyy>0.5</iyy><izz>0.3</izz></inertia>
                 </inertial>
               </link></model></sdf>"#,
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(link.name(), "base");
        assert!((link.inertial().mass() - 5.0).abs() < 1e-12);
        assert!(link.inertial().is_valid());
    }

    #[test]
    fn test_invalid_inertia_reported_not_fatal() {
        let (link, errors) = load_first_link(
            r#"<sdf version="1.9"><model name="m"><link name="bad">
                 <inertial>
                   <mass>1.0</mass>
                   <inertia><ixx>1</ixx><iyy>1</iyy><izz>5</izz></inertia>
                 </inertial>
               </link></model></sdf>"#,
        );
        // izz > ixx + iyy violates the triangle inequality.
        assert!(errors
            .iter()
            .any(|e| e.code() == ErrorCode::LinkInertiaInvalid));
        assert_eq!(link.name(), "bad");
    }

    #[test]
    fn test_negative_mass_invalid() {
        let inertial = Inertial::new(-1.0, Matrix3::identity(), Pose::identity());
        assert!(!inertial.is_valid());
    }

    #[test]
    fn test_inertial_pose_is_link_local() {
        let (link, _) = load_first_link(
            r#"<sdf version="1.9"><model name="m"><link name="l">
                 <inertial><pose relative_to="ignored_frame">0 0 0.5 0 0 0</pose></inertial>
               </link></model></sdf>"#,
        );
        assert!((link.inertial().pose().translation.vector.z - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_link_payloads() {
        let (link, errors) = load_first_link(
            r#"<sdf version="1.9"><model name="m"><link name="l">
                 <visual name="v"><geometry><sphere><radius>0.1</radius></sphere></geometry></visual>
                 <collision name="c"><geometry><sphere><radius>0.1</radius></sphere></geometry></collision>
                 <sensor name="s" type="imu"/>
                 <light name="beacon" type="point"/>
                 <particle_emitter name="p" type="point"/>
               </link></model></sdf>"#,
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(link.visuals().len(), 1);
        assert_eq!(link.collisions().len(), 1);
        assert_eq!(link.sensors().len(), 1);
        assert_eq!(link.lights().len(), 1);
        assert_eq!(link.particle_emitters().len(), 1);
        assert!(link.visual_by_name("v").is_some());
        assert!(link.collision_by_name("missing").is_none());
    }

    #[test]
    fn test_round_trip() {
        let (link, _) = load_first_link(
            r#"<sdf version="1.9"><model name="m"><link name="l">
                 <enable_wind>true</enable_wind>
                 <inertial><mass>2.5</mass></inertial>
               </link></model></sdf>"#,
        );
        let mut errors = Errors::new();
        let reloaded = Link::load(&link.to_element(), &mut errors);
        assert_eq!(reloaded.name(), "l");
        assert!(reloaded.enable_wind());
        assert!((reloaded.inertial().mass() - 2.5).abs() < 1e-12);
    }
}
