//! Joints connecting parent and child links.

use nalgebra::Vector3;

use crate::element::{Element, ElementPtr};
use crate::error::{ErrorCode, Errors, SdfError};
use crate::frames::SemanticPose;
use crate::schema;

/// Joint kind, from the `type` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JointType {
    /// Unrecognized type; an error is recorded at load.
    #[default]
    Invalid,
    /// Single-axis rotation with limits.
    Revolute,
    /// Two-axis rotation.
    Revolute2,
    /// Single-axis translation.
    Prismatic,
    /// Ball-and-socket.
    Ball,
    /// Universal (two perpendicular rotation axes).
    Universal,
    /// Rigid connection.
    Fixed,
    /// Geared rotation between two links.
    Gearbox,
    /// Coupled rotation and translation.
    Screw,
    /// Single-axis rotation without limits.
    Continuous,
}

impl JointType {
    /// Parse the `type` attribute value.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "revolute" => Some(Self::Revolute),
            "revolute2" => Some(Self::Revolute2),
            "prismatic" => Some(Self::Prismatic),
            "ball" => Some(Self::Ball),
            "universal" => Some(Self::Universal),
            "fixed" => Some(Self::Fixed),
            "gearbox" => Some(Self::Gearbox),
            "screw" => Some(Self::Screw),
            "continuous" => Some(Self::Continuous),
            _ => None,
        }
    }

    /// The attribute value for this type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Revolute => "revolute",
            Self::Revolute2 => "revolute2",
            Self::Prismatic => "prismatic",
            Self::Ball => "ball",
            Self::Universal => "universal",
            Self::Fixed => "fixed",
            Self::Gearbox => "gearbox",
            Self::Screw => "screw",
            Self::Continuous => "continuous",
        }
    }
}

/// One motion axis of a joint.
#[derive(Debug, Clone, PartialEq)]
pub struct JointAxis {
    /// Direction of the axis.
    pub xyz: Vector3<f64>,
    /// Frame the direction is expressed in; empty means the joint frame.
    pub expressed_in: String,
    /// Lower position limit.
    pub lower: f64,
    /// Upper position limit.
    pub upper: f64,
    /// Maximum effort; negative means unlimited.
    pub effort: f64,
    /// Maximum velocity; negative means unlimited.
    pub velocity: f64,
    /// Viscous damping coefficient.
    pub damping: f64,
    /// Static friction.
    pub friction: f64,
    /// Spring equilibrium position.
    pub spring_reference: f64,
    /// Spring stiffness.
    pub spring_stiffness: f64,
}

impl Default for JointAxis {
    fn default() -> Self {
        Self {
            xyz: Vector3::z(),
            expressed_in: String::new(),
            lower: -1e16,
            upper: 1e16,
            effort: -1.0,
            velocity: -1.0,
            damping: 0.0,
            friction: 0.0,
            spring_reference: 0.0,
            spring_stiffness: 0.0,
        }
    }
}

impl JointAxis {
    fn load(elem: &ElementPtr) -> Self {
        let e = elem.borrow();
        let mut axis = Self::default();
        if let Some(xyz) = e.find_element("xyz") {
            let xyz = xyz.borrow();
            axis.xyz = xyz.get("", axis.xyz).0;
            axis.expressed_in = xyz.attribute_text("expressed_in").unwrap_or_default();
        }
        if let Some(limit) = e.find_element("limit") {
            let limit = limit.borrow();
            axis.lower = limit.get("lower", axis.lower).0;
            axis.upper = limit.get("upper", axis.upper).0;
            axis.effort = limit.get("effort", axis.effort).0;
            axis.velocity = limit.get("velocity", axis.velocity).0;
        }
        if let Some(dynamics) = e.find_element("dynamics") {
            let dynamics = dynamics.borrow();
            axis.damping = dynamics.get("damping", 0.0).0;
            axis.friction = dynamics.get("friction", 0.0).0;
            axis.spring_reference = dynamics.get("spring_reference", 0.0).0;
            axis.spring_stiffness = dynamics.get("spring_stiffness", 0.0).0;
        }
        axis
    }

    fn store(&self, elem: &ElementPtr) {
        let xyz = elem.borrow_mut().get_element("xyz");
        xyz.borrow_mut().set(self.xyz);
        if !self.expressed_in.is_empty() {
            super::store_attribute(&xyz, "expressed_in", &self.expressed_in);
        }
        let limit = elem.borrow_mut().get_element("limit");
        super::store_child(&limit, "lower", self.lower);
        super::store_child(&limit, "upper", self.upper);
        if self.damping != 0.0 || self.friction != 0.0 || self.spring_stiffness != 0.0 {
            let dynamics = elem.borrow_mut().get_element("dynamics");
            super::store_child(&dynamics, "damping", self.damping);
            super::store_child(&dynamics, "friction", self.friction);
            super::store_child(&dynamics, "spring_reference", self.spring_reference);
            super::store_child(&dynamics, "spring_stiffness", self.spring_stiffness);
        }
    }
}

/// A joint: a kinematic constraint between a parent and a child link.
#[derive(Debug, Clone, Default)]
pub struct Joint {
    name: String,
    joint_type: JointType,
    parent: String,
    child: String,
    semantic_pose: SemanticPose,
    axis: Option<JointAxis>,
    axis2: Option<JointAxis>,
    thread_pitch: f64,
    gear_ratio: f64,
    element: Option<ElementPtr>,
}

impl Joint {
    /// Load from a `<joint>` element.
    pub fn load(elem: &ElementPtr, errors: &mut Errors) -> Self {
        let e = elem.borrow();
        let mut joint = Self {
            name: super::name_of(&e),
            thread_pitch: 1.0,
            gear_ratio: 1.0,
            ..Self::default()
        };

        let type_text = e.attribute_text("type").unwrap_or_default();
        match JointType::from_str(&type_text) {
            Some(t) => joint.joint_type = t,
            None => errors.push(
                SdfError::new(
                    ErrorCode::AttributeInvalid,
                    format!("unknown joint type '{type_text}' on joint '{}'", joint.name),
                )
                .with_xml_path(e.xml_path().to_string()),
            ),
        }

        joint.parent = e.get("parent", String::new()).0;
        joint.child = e.get("child", String::new()).0;
        let (raw, relative_to) = super::load_pose(&e);
        joint.semantic_pose = SemanticPose::new(raw, relative_to);
        joint.axis = e.find_element("axis").map(|a| JointAxis::load(&a));
        joint.axis2 = e.find_element("axis2").map(|a| JointAxis::load(&a));
        joint.thread_pitch = e.get("thread_pitch", 1.0).0;
        joint.gear_ratio = e.get("gear_ratio", 1.0).0;
        drop(e);
        joint.element = Some(elem.clone());
        joint
    }

    /// Joint name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the joint name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Joint kind.
    #[must_use]
    pub fn joint_type(&self) -> JointType {
        self.joint_type
    }

    /// Parent frame name (`world` anchors the joint to the world).
    #[must_use]
    pub fn parent_name(&self) -> &str {
        &self.parent
    }

    /// Set the parent frame name.
    pub fn set_parent_name(&mut self, parent: impl Into<String>) {
        self.parent = parent.into();
    }

    /// Child frame name.
    #[must_use]
    pub fn child_name(&self) -> &str {
        &self.child
    }

    /// Set the child frame name.
    pub fn set_child_name(&mut self, child: impl Into<String>) {
        self.child = child.into();
    }

    /// Authored pose with graph context; defaults to the child frame.
    #[must_use]
    pub fn semantic_pose(&self) -> &SemanticPose {
        &self.semantic_pose
    }

    pub(crate) fn semantic_pose_mut(&mut self) -> &mut SemanticPose {
        &mut self.semantic_pose
    }

    /// Primary axis descriptor.
    #[must_use]
    pub fn axis(&self) -> Option<&JointAxis> {
        self.axis.as_ref()
    }

    /// Secondary axis descriptor (revolute2, universal, gearbox).
    #[must_use]
    pub fn axis2(&self) -> Option<&JointAxis> {
        self.axis2.as_ref()
    }

    /// Thread pitch of screw joints.
    #[must_use]
    pub fn thread_pitch(&self) -> f64 {
        self.thread_pitch
    }

    /// Gear ratio of gearbox joints.
    #[must_use]
    pub fn gear_ratio(&self) -> f64 {
        self.gear_ratio
    }

    /// The element this joint was loaded from.
    #[must_use]
    pub fn element(&self) -> Option<&ElementPtr> {
        self.element.as_ref()
    }

    /// Reconstruct a schema-valid `<joint>` element.
    #[must_use]
    pub fn to_element(&self) -> ElementPtr {
        let elem = Element::from_description(&schema::cache().file("joint.sdf")).into_ptr();
        super::store_attribute(&elem, "name", &self.name);
        super::store_attribute(&elem, "type", self.joint_type.as_str());
        super::store_child(&elem, "parent", self.parent.clone());
        super::store_child(&elem, "child", self.child.clone());
        super::store_pose(
            &elem,
            self.semantic_pose.raw_pose(),
            self.semantic_pose.relative_to(),
        );
        if let Some(ref axis) = self.axis {
            let axis_elem = elem.borrow_mut().get_element("axis");
            axis.store(&axis_elem);
        }
        if let Some(ref axis2) = self.axis2 {
            let axis_elem = elem.borrow_mut().get_element("axis2");
            axis2.store(&axis_elem);
        }
        if self.joint_type == JointType::Screw {
            super::store_child(&elem, "thread_pitch", self.thread_pitch);
        }
        if self.joint_type == JointType::Gearbox {
            super::store_child(&elem, "gear_ratio", self.gear_ratio);
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

    fn load_first_joint(xml: &str) -> (Joint, Errors) {
        let mut errors = Errors::new();
        let doc = reader::read_string(xml, &ParserConfig::new(), &mut errors).unwrap();
        let root = doc.root.borrow();
        let model = root.find_element("model").unwrap();
        let joint_elem = model.borrow().find_element("joint").unwrap();
        let joint = Joint::load(&joint_elem, &mut errors);
        (joint, errors)
    }

    #[test]
    fn test_load_revolute_joint() {
        let (joint, errors) = load_first_joint(
            r#"<sdf version="1.9"><model name="m">
                 <link name="base"/><link name="arm"/>
                 <joint name="shoulder" type="revolute">
                   <parent>base</parent><child>arm</child>
                   <axis>
                     <xyz expressed_in="__model__">0 1 0</xyz>
                     <limit><lower>-1.5</lower><upper>1.5</upper></limit>
                     <dynamics><damping>0.2</damping></dynamics>
                   </axis>
                 </joint>
               </model></sdf>"#,
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(joint.joint_type(), JointType::Revolute);
        assert_eq!(joint.parent_name(), "base");
        assert_eq!(joint.child_name(), "arm");
        let axis = joint.axis().unwrap();
        assert!((axis.xyz.y - 1.0).abs() < 1e-12);
        assert_eq!(axis.expressed_in, "__model__");
        assert!((axis.lower - -1.5).abs() < 1e-12);
        assert!((axis.damping - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_joint_type_reported() {
        let mut joint_elem = Element::from_description(&schema::cache().file("joint.sdf"));
        if let Some(attr) = joint_elem.attribute_mut("type") {
            attr.set_from_string("helicoidal").unwrap();
        }
        let mut errors = Errors::new();
        let joint = Joint::load(&joint_elem.into_ptr(), &mut errors);
        assert_eq!(joint.joint_type(), JointType::Invalid);
        assert!(errors
            .iter()
            .any(|e| e.code() == ErrorCode::AttributeInvalid));
    }

    #[test]
    fn test_round_trip() {
        let (joint, _) = load_first_joint(
            r#"<sdf version="1.9"><model name="m">
                 <link name="a"/><link name="b"/>
                 <joint name="j" type="prismatic">
                   <parent>a</parent><child>b</child>
                   <axis><xyz>1 0 0</xyz></axis>
                 </joint>
               </model></sdf>"#,
        );
        let mut errors = Errors::new();
        let reloaded = Joint::load(&joint.to_element(), &mut errors);
        assert_eq!(reloaded.name(), "j");
        assert_eq!(reloaded.joint_type(), JointType::Prismatic);
        assert_eq!(reloaded.parent_name(), "a");
        assert_eq!(reloaded.child_name(), "b");
        assert!((reloaded.axis().unwrap().xyz.x - 1.0).abs() < 1e-12);
    }
}
