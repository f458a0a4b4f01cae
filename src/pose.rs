//! Pose text parsing and SE(3) helpers.
//!
//! An SDF `<pose>` is authored as six numbers `x y z roll pitch yaw`
//! (radians), or as seven numbers `x y z qx qy qz qw` when
//! `rotation_format="quat_xyzw"`. The `degrees` attribute switches the
//! Euler angles to degrees.

use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};

/// Rigid transform used for all pose arithmetic.
pub type Pose = Isometry3<f64>;

/// How the rotation portion of a `<pose>` value is authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationFormat {
    /// `roll pitch yaw` Euler angles (extrinsic x-y-z).
    #[default]
    EulerRpy,
    /// `qx qy qz qw` quaternion.
    QuatXyzw,
}

impl RotationFormat {
    /// Parse the `rotation_format` attribute value.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "euler_rpy" => Some(Self::EulerRpy),
            "quat_xyzw" => Some(Self::QuatXyzw),
            _ => None,
        }
    }

    /// The attribute value for this format.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EulerRpy => "euler_rpy",
            Self::QuatXyzw => "quat_xyzw",
        }
    }
}

/// Parse a pose from its collapsed text content.
///
/// An empty string yields the identity pose (the schema default).
///
/// # Errors
///
/// Returns a message describing the expected arity or the offending token.
pub fn parse_pose(text: &str, degrees: bool, format: RotationFormat) -> Result<Pose, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Pose::identity());
    }

    let values: Vec<f64> = trimmed
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f64>()
                .map_err(|_| format!("invalid number '{tok}' in pose"))
        })
        .collect::<Result<_, _>>()?;

    match format {
        RotationFormat::EulerRpy => {
            if values.len() != 6 {
                return Err(format!(
                    "pose expects 6 values (x y z roll pitch yaw), got {}",
                    values.len()
                ));
            }
            let factor = if degrees {
                std::f64::consts::PI / 180.0
            } else {
                1.0
            };
            let rotation = UnitQuaternion::from_euler_angles(
                values[3] * factor,
                values[4] * factor,
                values[5] * factor,
            );
            Ok(Pose::from_parts(
                Translation3::new(values[0], values[1], values[2]),
                rotation,
            ))
        }
        RotationFormat::QuatXyzw => {
            if values.len() != 7 {
                return Err(format!(
                    "pose expects 7 values (x y z qx qy qz qw), got {}",
                    values.len()
                ));
            }
            if degrees {
                return Err("degrees cannot be combined with quat_xyzw".to_string());
            }
            let quat = Quaternion::new(values[6], values[3], values[4], values[5]);
            Ok(Pose::from_parts(
                Translation3::new(values[0], values[1], values[2]),
                UnitQuaternion::from_quaternion(quat),
            ))
        }
    }
}

/// Render a pose as `x y z roll pitch yaw` text (radians).
#[must_use]
pub fn pose_to_string(pose: &Pose) -> String {
    let t = pose.translation.vector;
    let (roll, pitch, yaw) = pose.rotation.euler_angles();
    format!("{} {} {} {} {} {}", t.x, t.y, t.z, roll, pitch, yaw)
}

/// Parse a whitespace-separated 3-vector.
///
/// # Errors
///
/// Returns a message when the arity or a token is wrong.
pub fn parse_vector3(text: &str) -> Result<Vector3<f64>, String> {
    let values: Vec<f64> = text
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f64>()
                .map_err(|_| format!("invalid number '{tok}' in vector"))
        })
        .collect::<Result<_, _>>()?;
    if values.len() != 3 {
        return Err(format!("expected 3 values, got {}", values.len()));
    }
    Ok(Vector3::new(values[0], values[1], values[2]))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_identity() {
        let pose = parse_pose("", false, RotationFormat::EulerRpy).unwrap();
        assert_eq!(pose, Pose::identity());
        let pose = parse_pose("0 0 0 0 0 0", false, RotationFormat::EulerRpy).unwrap();
        assert_relative_eq!(pose.translation.vector.norm(), 0.0);
    }

    #[test]
    fn test_parse_translation_rotation() {
        let pose = parse_pose("1 2 3 0 0 1.5707963267948966", false, RotationFormat::EulerRpy)
            .unwrap();
        assert_relative_eq!(pose.translation.vector.x, 1.0);
        let (_, _, yaw) = pose.rotation.euler_angles();
        assert_relative_eq!(yaw, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_parse_degrees() {
        let pose = parse_pose("0 0 0 0 0 90", true, RotationFormat::EulerRpy).unwrap();
        let (_, _, yaw) = pose.rotation.euler_angles();
        assert_relative_eq!(yaw, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_parse_quat_xyzw() {
        let pose = parse_pose("1 0 0 0 0 0 1", false, RotationFormat::QuatXyzw).unwrap();
        assert_relative_eq!(pose.rotation.angle(), 0.0, epsilon = 1e-12);
        assert!(parse_pose("1 0 0 0 0 0 1", true, RotationFormat::QuatXyzw).is_err());
    }

    #[test]
    fn test_bad_arity() {
        assert!(parse_pose("1 2 3", false, RotationFormat::EulerRpy).is_err());
        assert!(parse_pose("1 2 3 0 0 0 1", false, RotationFormat::EulerRpy).is_err());
        assert!(parse_pose("1 2 x 0 0 0", false, RotationFormat::EulerRpy).is_err());
    }

    #[test]
    fn test_round_trip_text() {
        let pose = parse_pose("1 -2 3.5 0.1 0.2 0.3", false, RotationFormat::EulerRpy).unwrap();
        let text = pose_to_string(&pose);
        let back = parse_pose(&text, false, RotationFormat::EulerRpy).unwrap();
        assert_relative_eq!(
            (pose.inverse() * back).translation.vector.norm(),
            0.0,
            epsilon = 1e-9
        );
        assert_relative_eq!((pose.inverse() * back).rotation.angle(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_parse_vector3() {
        let v = parse_vector3("0 0 -9.8").unwrap();
        assert_relative_eq!(v.z, -9.8);
        assert!(parse_vector3("1 2").is_err());
    }
}
