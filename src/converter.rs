//! Forward version conversion of SDF documents.
//!
//! Older documents are rewritten in place to the current schema version by
//! a chain of declarative migration steps, applied in ascending version
//! order before schema matching. Each step is a table of operations over
//! the raw XML tree; steps with no delta relevant to the supported subset
//! carry an empty table so the chain stays explicit.

use crate::error::{ErrorCode, Errors, SdfError};
use crate::schema::SDF_VERSION;
use crate::xml::XmlElement;

/// One declarative rewrite applied to every matching site in the tree.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Rename every element with the given name.
    RenameElement {
        /// Current element name.
        from: &'static str,
        /// New element name.
        to: &'static str,
    },
    /// Rename an attribute on every element with the given name.
    RenameAttribute {
        /// Element carrying the attribute.
        element: &'static str,
        /// Current attribute name.
        from: &'static str,
        /// New attribute name.
        to: &'static str,
    },
    /// Move children found along `path` below every element named
    /// `context` so that they become direct children of the context.
    MoveElement {
        /// Element under which the path is searched.
        context: &'static str,
        /// Path from the context to the children to hoist.
        path: &'static [&'static str],
    },
    /// Insert a child with default text into every element with the given
    /// name, when no such child exists yet.
    InsertDefault {
        /// Element receiving the child.
        element: &'static str,
        /// Child name.
        child: &'static str,
        /// Child text value.
        value: &'static str,
    },
    /// Delete every child with the given name below elements named
    /// `element`.
    DeleteElement {
        /// Parent element name.
        element: &'static str,
        /// Child name to remove.
        child: &'static str,
    },
    /// Copy the text value of one child to another (creating it) within
    /// every element named `element`.
    CopyValue {
        /// Parent element name.
        element: &'static str,
        /// Child whose text is copied.
        from: &'static str,
        /// Child receiving the text.
        to: &'static str,
    },
    /// Replace an enumerated attribute value (or the element text when
    /// `attribute` is `None`) on every element with the given name.
    RemapValue {
        /// Element carrying the value.
        element: &'static str,
        /// Attribute name, or `None` for the element text.
        attribute: Option<&'static str>,
        /// Value to replace.
        from: &'static str,
        /// Replacement value.
        to: &'static str,
    },
}

/// A migration step from one version to the next.
#[derive(Debug, Clone)]
pub struct MigrationStep {
    /// Version the step upgrades from.
    pub from: &'static str,
    /// Version the step produces.
    pub to: &'static str,
    /// Operations applied in order.
    pub operations: &'static [Operation],
}

/// The migration chain, ascending. Documents older than the first entry
/// are rejected; documents at `SDF_VERSION` skip conversion entirely.
pub const MIGRATIONS: &[MigrationStep] = &[
    MigrationStep {
        from: "1.0",
        to: "1.1",
        operations: &[],
    },
    MigrationStep {
        from: "1.1",
        to: "1.2",
        operations: &[],
    },
    MigrationStep {
        from: "1.2",
        to: "1.3",
        operations: &[],
    },
    MigrationStep {
        from: "1.3",
        to: "1.4",
        operations: &[],
    },
    MigrationStep {
        from: "1.4",
        to: "1.5",
        operations: &[],
    },
    MigrationStep {
        from: "1.5",
        to: "1.6",
        // Gravity and magnetic field moved from <physics> up to <world>.
        operations: &[
            Operation::MoveElement {
                context: "world",
                path: &["physics", "gravity"],
            },
            Operation::MoveElement {
                context: "world",
                path: &["physics", "magnetic_field"],
            },
        ],
    },
    MigrationStep {
        from: "1.6",
        to: "1.7",
        // Pose reference frames renamed; the axis frame flag is replaced
        // by //axis/xyz/@expressed_in semantics.
        operations: &[
            Operation::RenameAttribute {
                element: "pose",
                from: "frame",
                to: "relative_to",
            },
            Operation::DeleteElement {
                element: "axis",
                child: "use_parent_model_frame",
            },
            Operation::DeleteElement {
                element: "axis2",
                child: "use_parent_model_frame",
            },
        ],
    },
    MigrationStep {
        from: "1.7",
        to: "1.8",
        operations: &[],
    },
    MigrationStep {
        from: "1.8",
        to: "1.9",
        // Ray sensors renamed to lidar.
        operations: &[
            Operation::RemapValue {
                element: "sensor",
                attribute: Some("type"),
                from: "ray",
                to: "lidar",
            },
            Operation::RemapValue {
                element: "sensor",
                attribute: Some("type"),
                from: "gpu_ray",
                to: "gpu_lidar",
            },
            Operation::RenameElement {
                from: "ray",
                to: "lidar",
            },
        ],
    },
];

/// Convert a raw document tree from `version` to [`SDF_VERSION`] in place,
/// updating the root's `version` attribute.
///
/// Returns `false` (with an error recorded) if the version is unknown or
/// newer than this build supports.
pub fn convert(root: &mut XmlElement, version: &str, errors: &mut Errors) -> bool {
    if version == SDF_VERSION {
        return true;
    }
    let Some(start) = MIGRATIONS.iter().position(|s| s.from == version) else {
        errors.push(SdfError::new(
            ErrorCode::Parsing,
            format!("unsupported SDF version '{version}' (supported: 1.0 through {SDF_VERSION})"),
        ));
        return false;
    };

    for step in &MIGRATIONS[start..] {
        tracing::debug!(from = step.from, to = step.to, "applying migration step");
        for op in step.operations {
            apply(root, op);
        }
    }
    root.set_attribute("version", SDF_VERSION);
    true
}

fn apply(root: &mut XmlElement, op: &Operation) {
    match op {
        Operation::RenameElement { from, to } => {
            visit(root, &mut |elem| {
                if elem.name == *from {
                    elem.name = (*to).to_string();
                }
            });
        }
        Operation::RenameAttribute { element, from, to } => {
            visit(root, &mut |elem| {
                if elem.name == *element {
                    if let Some(value) = elem.remove_attribute(from) {
                        elem.set_attribute(to, value);
                    }
                }
            });
        }
        Operation::MoveElement { context, path } => {
            visit(root, &mut |elem| {
                if elem.name == *context {
                    let moved = take_at_path(elem, path);
                    elem.children.extend(moved);
                }
            });
        }
        Operation::InsertDefault {
            element,
            child,
            value,
        } => {
            visit(root, &mut |elem| {
                if elem.name == *element && elem.child(child).is_none() {
                    let mut node = XmlElement::new(*child);
                    node.text = Some((*value).to_string());
                    elem.children.push(node);
                }
            });
        }
        Operation::DeleteElement { element, child } => {
            visit(root, &mut |elem| {
                if elem.name == *element {
                    elem.children.retain(|c| c.name != *child);
                }
            });
        }
        Operation::CopyValue { element, from, to } => {
            visit(root, &mut |elem| {
                if elem.name == *element {
                    let text = elem.child(from).and_then(|c| c.text.clone());
                    if let Some(text) = text {
                        if let Some(target) = elem.child_mut(to) {
                            target.text = Some(text);
                        } else {
                            let mut node = XmlElement::new(*to);
                            node.text = Some(text);
                            elem.children.push(node);
                        }
                    }
                }
            });
        }
        Operation::RemapValue {
            element,
            attribute,
            from,
            to,
        } => {
            visit(root, &mut |elem| {
                if elem.name == *element {
                    match attribute {
                        Some(attr) => {
                            if elem.attribute(attr) == Some(*from) {
                                elem.set_attribute(attr, *to);
                            }
                        }
                        None => {
                            if elem.text.as_deref() == Some(*from) {
                                elem.text = Some((*to).to_string());
                            }
                        }
                    }
                }
            });
        }
    }
}

fn visit(elem: &mut XmlElement, f: &mut impl FnMut(&mut XmlElement)) {
    f(elem);
    for child in &mut elem.children {
        visit(child, f);
    }
}

/// Remove and return the elements found at `path` below `elem`, pruning
/// the intermediate parents only of the taken children.
fn take_at_path(elem: &mut XmlElement, path: &[&str]) -> Vec<XmlElement> {
    match path {
        [] => Vec::new(),
        [leaf] => elem.take_children_named(leaf),
        [head, rest @ ..] => {
            let mut taken = Vec::new();
            for child in &mut elem.children {
                if child.name == *head {
                    taken.extend(take_at_path(child, rest));
                }
            }
            taken
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::xml;

    #[test]
    fn test_pose_frame_renamed_at_1_7() {
        let mut root = xml::parse_str(
            r#"<sdf version="1.6"><model name="m"><pose frame="f">1 0 0 0 0 0</pose></model></sdf>"#,
        )
        .unwrap();
        let mut errors = Errors::new();
        assert!(convert(&mut root, "1.6", &mut errors));
        assert!(errors.is_empty());
        let pose = root.child("model").unwrap().child("pose").unwrap();
        assert_eq!(pose.attribute("relative_to"), Some("f"));
        assert!(pose.attribute("frame").is_none());
        assert_eq!(root.attribute("version"), Some(SDF_VERSION));
    }

    #[test]
    fn test_gravity_hoisted_at_1_6() {
        let mut root = xml::parse_str(
            r#"<sdf version="1.5"><world name="w"><physics><gravity>0 0 -9.8</gravity></physics></world></sdf>"#,
        )
        .unwrap();
        let mut errors = Errors::new();
        assert!(convert(&mut root, "1.5", &mut errors));
        let world = root.child("world").unwrap();
        assert!(world.child("gravity").is_some());
        assert!(world.child("physics").unwrap().child("gravity").is_none());
    }

    #[test]
    fn test_ray_sensor_remapped_at_1_9() {
        let mut root = xml::parse_str(
            r#"<sdf version="1.8"><model name="m"><link name="l"><sensor name="s" type="gpu_ray"><ray/></sensor></link></model></sdf>"#,
        )
        .unwrap();
        let mut errors = Errors::new();
        assert!(convert(&mut root, "1.8", &mut errors));
        let sensor = root
            .child("model")
            .unwrap()
            .child("link")
            .unwrap()
            .child("sensor")
            .unwrap();
        assert_eq!(sensor.attribute("type"), Some("gpu_lidar"));
        assert!(sensor.child("lidar").is_some());
    }

    #[test]
    fn test_use_parent_model_frame_dropped() {
        let mut root = xml::parse_str(
            "<sdf version=\"1.6\"><model name=\"m\"><joint name=\"j\" type=\"revolute\">\
             <axis><xyz>0 0 1</xyz><use_parent_model_frame>1</use_parent_model_frame></axis>\
             </joint></model></sdf>",
        )
        .unwrap();
        let mut errors = Errors::new();
        assert!(convert(&mut root, "1.6", &mut errors));
        let axis = root
            .child("model")
            .unwrap()
            .child("joint")
            .unwrap()
            .child("axis")
            .unwrap();
        assert!(axis.child("use_parent_model_frame").is_none());
        assert!(axis.child("xyz").is_some());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut root = xml::parse_str(r#"<sdf version="2.4"/>"#).unwrap();
        let mut errors = Errors::new();
        assert!(!convert(&mut root, "2.4", &mut errors));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), ErrorCode::Parsing);
    }

    #[test]
    fn test_current_version_is_a_no_op() {
        let mut root = xml::parse_str(r#"<sdf version="1.9"><world name="w"/></sdf>"#).unwrap();
        let before = root.clone();
        let mut errors = Errors::new();
        assert!(convert(&mut root, "1.9", &mut errors));
        assert_eq!(root, before);
    }

    #[test]
    fn test_insert_default_and_copy_value_ops() {
        let mut root = xml::parse_str("<world name=\"w\"/>").unwrap();
        apply(
            &mut root,
            &Operation::InsertDefault {
                element: "world",
                child: "gravity",
                value: "0 0 -9.8",
            },
        );
        assert_eq!(
            root.child("gravity").unwrap().text.as_deref(),
            Some("0 0 -9.8")
        );
        // Inserting again is a no-op.
        apply(
            &mut root,
            &Operation::InsertDefault {
                element: "world",
                child: "gravity",
                value: "1 1 1",
            },
        );
        assert_eq!(root.children_named("gravity").count(), 1);

        apply(
            &mut root,
            &Operation::CopyValue {
                element: "world",
                from: "gravity",
                to: "wind_hint",
            },
        );
        assert_eq!(
            root.child("wind_hint").unwrap().text.as_deref(),
            Some("0 0 -9.8")
        );
    }

    #[test]
    fn test_chain_is_ascending() {
        for pair in MIGRATIONS.windows(2) {
            assert_eq!(pair[0].to, pair[1].from, "chain must be contiguous");
        }
        assert_eq!(MIGRATIONS.last().unwrap().to, SDF_VERSION);
    }
}
