//! Sensors attached to links and joints.

use crate::element::{Element, ElementPtr};
use crate::error::{ErrorCode, Errors, SdfError};
use crate::frames::SemanticPose;
use crate::schema;

/// Sensor kind, from the `type` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum SensorType {
    /// Unrecognized type; an error is recorded at load.
    #[default]
    Unknown,
    /// Barometric air pressure.
    AirPressure,
    /// Altitude above a reference.
    Altimeter,
    /// Monocular camera.
    Camera,
    /// Contact/touch sensing.
    Contact,
    /// Six-axis force-torque at a joint.
    ForceTorque,
    /// Inertial measurement unit.
    Imu,
    /// Scanning range finder.
    Lidar,
    /// GPU-accelerated scanning range finder.
    GpuLidar,
    /// Magnetic field strength.
    Magnetometer,
    /// Satellite positioning.
    Navsat,
    /// Color-plus-depth camera.
    RgbdCamera,
    /// Thermal camera.
    ThermalCamera,
    /// Wide-angle camera.
    WideAngleCamera,
}

impl SensorType {
    /// Parse the `type` attribute value.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "air_pressure" => Some(Self::AirPressure),
            "altimeter" => Some(Self::Altimeter),
            "camera" => Some(Self::Camera),
            "contact" => Some(Self::Contact),
            "force_torque" => Some(Self::ForceTorque),
            "imu" => Some(Self::Imu),
            "lidar" | "ray" => Some(Self::Lidar),
            "gpu_lidar" | "gpu_ray" => Some(Self::GpuLidar),
            "magnetometer" => Some(Self::Magnetometer),
            "navsat" | "gps" => Some(Self::Navsat),
            "rgbd_camera" => Some(Self::RgbdCamera),
            "thermal_camera" => Some(Self::ThermalCamera),
            "wide_angle_camera" => Some(Self::WideAngleCamera),
            _ => None,
        }
    }

    /// The attribute value for this type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::AirPressure => "air_pressure",
            Self::Altimeter => "altimeter",
            Self::Camera => "camera",
            Self::Contact => "contact",
            Self::ForceTorque => "force_torque",
            Self::Imu => "imu",
            Self::Lidar => "lidar",
            Self::GpuLidar => "gpu_lidar",
            Self::Magnetometer => "magnetometer",
            Self::Navsat => "navsat",
            Self::RgbdCamera => "rgbd_camera",
            Self::ThermalCamera => "thermal_camera",
            Self::WideAngleCamera => "wide_angle_camera",
        }
    }
}

/// A sensor: type, pose, update policy, and a type-specific payload kept
/// as an element subtree.
#[derive(Debug, Clone, Default)]
pub struct Sensor {
    name: String,
    sensor_type: SensorType,
    semantic_pose: SemanticPose,
    always_on: bool,
    update_rate: f64,
    visualize: bool,
    enable_metrics: bool,
    topic: String,
    payload: Option<ElementPtr>,
    plugins: Vec<ElementPtr>,
    element: Option<ElementPtr>,
}

impl Sensor {
    /// Load from a `<sensor>` element.
    pub fn load(elem: &ElementPtr, errors: &mut Errors) -> Self {
        let e = elem.borrow();
        let mut sensor = Self {
            name: super::name_of(&e),
            ..Self::default()
        };

        let type_text = e.attribute_text("type").unwrap_or_default();
        match SensorType::from_str(&type_text) {
            Some(t) => sensor.sensor_type = t,
            None => errors.push(
                SdfError::new(
                    ErrorCode::AttributeInvalid,
                    format!(
                        "attempting to load sensor '{}' of unknown type '{type_text}'",
                        sensor.name
                    ),
                )
                .with_xml_path(e.xml_path().to_string()),
            ),
        }

        let (raw, relative_to) = super::load_pose(&e);
        sensor.semantic_pose = SemanticPose::new(raw, relative_to);
        sensor.always_on = e.get("always_on", false).0;
        sensor.update_rate = e.get("update_rate", 0.0).0;
        sensor.visualize = e.get("visualize", false).0;
        sensor.enable_metrics = e.get("enable_metrics", false).0;
        sensor.topic = e.get("topic", "__default__".to_string()).0;
        // The type-specific payload (e.g. <imu>, <camera>) rides along as
        // an element subtree.
        if sensor.sensor_type != SensorType::Unknown {
            sensor.payload = e.find_element(sensor.sensor_type.as_str());
        }
        sensor.plugins = e.find_elements("plugin");
        drop(e);
        sensor.element = Some(elem.clone());
        sensor
    }

    /// Sensor name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sensor name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Sensor kind.
    #[must_use]
    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
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

    /// Whether the sensor ignores update-rate throttling.
    #[must_use]
    pub fn always_on(&self) -> bool {
        self.always_on
    }

    /// Update frequency in Hz; 0 means unthrottled.
    #[must_use]
    pub fn update_rate(&self) -> f64 {
        self.update_rate
    }

    /// Whether the sensor is visualized.
    #[must_use]
    pub fn visualize(&self) -> bool {
        self.visualize
    }

    /// Whether metrics publication is enabled.
    #[must_use]
    pub fn enable_metrics(&self) -> bool {
        self.enable_metrics
    }

    /// Topic the sensor publishes on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Type-specific payload subtree, when present.
    #[must_use]
    pub fn payload(&self) -> Option<&ElementPtr> {
        self.payload.as_ref()
    }

    /// Plugin subtrees.
    #[must_use]
    pub fn plugins(&self) -> &[ElementPtr] {
        &self.plugins
    }

    /// The element this sensor was loaded from.
    #[must_use]
    pub fn element(&self) -> Option<&ElementPtr> {
        self.element.as_ref()
    }

    /// Reconstruct a schema-valid `<sensor>` element.
    #[must_use]
    pub fn to_element(&self) -> ElementPtr {
        let elem = Element::from_description(&schema::cache().file("sensor.sdf")).into_ptr();
        super::store_attribute(&elem, "name", &self.name);
        super::store_attribute(&elem, "type", self.sensor_type.as_str());
        super::store_pose(
            &elem,
            self.semantic_pose.raw_pose(),
            self.semantic_pose.relative_to(),
        );
        super::store_child(&elem, "always_on", self.always_on);
        super::store_child(&elem, "update_rate", self.update_rate);
        super::store_child(&elem, "visualize", self.visualize);
        if self.topic != "__default__" {
            super::store_child(&elem, "topic", self.topic.clone());
        }
        if let Some(ref payload) = self.payload {
            elem.borrow_mut()
                .insert_element(payload.borrow().deep_clone().into_ptr());
        }
        for plugin in &self.plugins {
            elem.borrow_mut()
                .insert_element(plugin.borrow().deep_clone().into_ptr());
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
    fn test_load_imu_sensor() {
        let mut errors = Errors::new();
        let doc = reader::read_string(
            r#"<sdf version="1.9"><model name="m"><link name="l">
                 <sensor name="imu_sensor" type="imu">
                   <update_rate>100</update_rate>
                   <imu><angular_velocity/></imu>
                 </sensor>
               </link></model></sdf>"#,
            &ParserConfig::new(),
            &mut errors,
        )
        .unwrap();
        let root = doc.root.borrow();
        let model = root.find_element("model").unwrap();
        let link = model.borrow().find_element("link").unwrap();
        let sensor_elem = link.borrow().find_element("sensor").unwrap();
        let sensor = Sensor::load(&sensor_elem, &mut errors);
        assert_eq!(sensor.sensor_type(), SensorType::Imu);
        assert!((sensor.update_rate() - 100.0).abs() < 1e-12);
        assert!(sensor.payload().is_some());
    }

    #[test]
    fn test_legacy_type_aliases() {
        assert_eq!(SensorType::from_str("ray"), Some(SensorType::Lidar));
        assert_eq!(SensorType::from_str("gps"), Some(SensorType::Navsat));
        assert!(SensorType::from_str("telepathy").is_none());
    }

    #[test]
    fn test_unknown_type_reported() {
        let mut sensor_elem = Element::from_description(&schema::cache().file("sensor.sdf"));
        if let Some(attr) = sensor_elem.attribute_mut("name") {
            attr.set_from_string("s").unwrap();
        }
        if let Some(attr) = sensor_elem.attribute_mut("type") {
            attr.set_from_string("telepathy").unwrap();
        }
        let mut errors = Errors::new();
        let sensor = Sensor::load(&sensor_elem.into_ptr(), &mut errors);
        assert_eq!(sensor.sensor_type(), SensorType::Unknown);
        assert_eq!(errors.len(), 1);
    }
}
