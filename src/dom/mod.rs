//! Typed domain object model loaded from the element tree.
//!
//! Each entity exposes `load` (validate and extract from an [`Element`]),
//! accessors and mutators, and `to_element` (reconstruct a schema-valid
//! element subtree). Entities keep a non-owning handle to the element they
//! were loaded from for line-number-preserving diagnostics; pose-bearing
//! entities receive their scope's pose-graph handle from the containing
//! loader after construction.

mod collision;
mod frame;
mod joint;
mod light;
mod link;
mod material;
mod model;
mod particle_emitter;
mod root;
mod sensor;
mod visual;
mod world;

pub use collision::Collision;
pub use frame::Frame;
pub use joint::{Joint, JointAxis, JointType};
pub use light::{Light, LightType, SpotCone};
pub use link::{Inertial, Link};
pub use material::Material;
pub use model::Model;
pub use particle_emitter::{ParticleEmitter, ParticleEmitterType};
pub use root::Root;
pub use sensor::{Sensor, SensorType};
pub use visual::Visual;
pub use world::World;

use crate::element::{Element, ElementPtr};
use crate::pose::Pose;

/// Read an entity's `name` attribute.
pub(crate) fn name_of(elem: &Element) -> String {
    elem.attribute_text("name").unwrap_or_default()
}

/// Read the raw pose and `relative_to` from an element's `<pose>` child.
pub(crate) fn load_pose(elem: &Element) -> (Pose, String) {
    match elem.find_element("pose") {
        Some(pose_elem) => {
            let pose_elem = pose_elem.borrow();
            let (raw, _) = pose_elem.get::<Pose>("", Pose::identity());
            let relative_to = pose_elem.attribute_text("relative_to").unwrap_or_default();
            (raw, relative_to)
        }
        None => (Pose::identity(), String::new()),
    }
}

/// Write a pose child (value plus `relative_to`) onto an element being
/// reconstructed, omitted entirely for an identity pose with no frame.
pub(crate) fn store_pose(elem: &ElementPtr, raw: &Pose, relative_to: &str) {
    if *raw == Pose::identity() && relative_to.is_empty() {
        return;
    }
    let pose_elem = elem.borrow_mut().get_element("pose");
    let mut pose_elem = pose_elem.borrow_mut();
    pose_elem.set(*raw);
    if !relative_to.is_empty() {
        if let Some(attr) = pose_elem.attribute_mut("relative_to") {
            let _ = attr.set_from_string(relative_to);
        }
    }
}

/// Set a string attribute on a reconstructed element.
pub(crate) fn store_attribute(elem: &ElementPtr, name: &str, value: &str) {
    if let Some(attr) = elem.borrow_mut().attribute_mut(name) {
        let _ = attr.set_from_string(value);
    }
}

/// Set a typed child value on a reconstructed element.
pub(crate) fn store_child<T: crate::value::FromValue>(elem: &ElementPtr, name: &str, value: T) {
    let child = elem.borrow_mut().get_element(name);
    child.borrow_mut().set(value);
}
