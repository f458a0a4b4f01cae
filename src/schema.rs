//! Schema descriptions for the current SDF version.
//!
//! The schema is authored as XSD-like `.sdf` description files embedded in
//! the binary (see `schema/1.9/`). Each file holds one `<element>` tree:
//! `name`/`type`/`default`/`required` attributes, `<attribute>` children,
//! and `<include filename="..."/>` references to other description files.
//! Instance elements are cloned from these descriptions at read time.
//!
//! The parsed descriptions live in a process-wide cache initialized lazily
//! on first use. Includes are resolved through the cache by file name, so
//! self-referencing descriptions (a model containing nested models) need no
//! special casing.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::value::ValueType;
use crate::xml::{self, XmlElement};

/// The schema version this build parses natively.
pub const SDF_VERSION: &str = "1.9";

/// Embedded description files for the current version.
const EMBEDDED: &[(&str, &str)] = &[
    ("root.sdf", include_str!("../schema/1.9/root.sdf")),
    ("world.sdf", include_str!("../schema/1.9/world.sdf")),
    ("model.sdf", include_str!("../schema/1.9/model.sdf")),
    ("link.sdf", include_str!("../schema/1.9/link.sdf")),
    ("joint.sdf", include_str!("../schema/1.9/joint.sdf")),
    ("frame.sdf", include_str!("../schema/1.9/frame.sdf")),
    ("light.sdf", include_str!("../schema/1.9/light.sdf")),
    ("visual.sdf", include_str!("../schema/1.9/visual.sdf")),
    ("collision.sdf", include_str!("../schema/1.9/collision.sdf")),
    ("geometry.sdf", include_str!("../schema/1.9/geometry.sdf")),
    ("material.sdf", include_str!("../schema/1.9/material.sdf")),
    ("sensor.sdf", include_str!("../schema/1.9/sensor.sdf")),
    (
        "particle_emitter.sdf",
        include_str!("../schema/1.9/particle_emitter.sdf"),
    ),
    ("pose.sdf", include_str!("../schema/1.9/pose.sdf")),
    ("include.sdf", include_str!("../schema/1.9/include.sdf")),
    ("plugin.sdf", include_str!("../schema/1.9/plugin.sdf")),
];

/// How many instances of a child element the schema allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    /// Optional, at most one.
    #[default]
    ZeroOrOne,
    /// Required, exactly one.
    ExactlyOne,
    /// Required, one or more.
    OneOrMore,
    /// Optional, any number.
    ZeroOrMore,
    /// Deprecated; presence is policy-dependent.
    Deprecated,
}

impl Cardinality {
    /// Parse the `required` schema attribute.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "0" => Some(Self::ZeroOrOne),
            "1" => Some(Self::ExactlyOne),
            "+" => Some(Self::OneOrMore),
            "*" => Some(Self::ZeroOrMore),
            "-1" => Some(Self::Deprecated),
            _ => None,
        }
    }

    /// Whether at least one instance must be present.
    #[must_use]
    pub fn is_required(&self) -> bool {
        matches!(self, Self::ExactlyOne | Self::OneOrMore)
    }

    /// Whether more than one instance is allowed.
    #[must_use]
    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::OneOrMore | Self::ZeroOrMore)
    }
}

/// Description of a single attribute.
#[derive(Debug, Clone)]
pub struct AttributeDescription {
    /// Attribute name.
    pub name: String,
    /// Declared value type.
    pub value_type: ValueType,
    /// Default value text.
    pub default: String,
    /// Whether the attribute must be set by the document.
    pub required: bool,
}

/// A child slot in a description: either an inline `<element>` or an
/// `<include filename=.../>` reference resolved through the cache.
#[derive(Debug, Clone)]
pub struct ChildDescription {
    /// Cardinality of this child (an include's `required` overrides the
    /// referenced file's own).
    pub required: Cardinality,
    node: ChildNode,
}

#[derive(Debug, Clone)]
enum ChildNode {
    Inline(Arc<ElementDescription>),
    File(String),
}

impl ChildDescription {
    /// The described element, resolving file references lazily.
    #[must_use]
    pub fn description(&self) -> Arc<ElementDescription> {
        match &self.node {
            ChildNode::Inline(d) => Arc::clone(d),
            ChildNode::File(f) => cache().file(f),
        }
    }

    /// The element name this slot accepts.
    #[must_use]
    pub fn element_name(&self) -> String {
        match &self.node {
            ChildNode::Inline(d) => d.name.clone(),
            ChildNode::File(f) => cache().file(f).name.clone(),
        }
    }
}

/// Description of an element: value type, attributes, and child slots.
#[derive(Debug, Clone, Default)]
pub struct ElementDescription {
    /// Element name.
    pub name: String,
    /// Declared value, if the element carries text content.
    pub value: Option<(ValueType, String)>,
    /// Attribute descriptions.
    pub attributes: Vec<AttributeDescription>,
    /// Child element slots.
    pub children: Vec<ChildDescription>,
    /// Accept arbitrary children verbatim (plugin-style passthrough).
    pub copy_data: bool,
    /// Human-readable description text.
    pub description: String,
}

impl ElementDescription {
    /// Find the child slot accepting elements named `name`.
    #[must_use]
    pub fn find_child(&self, name: &str) -> Option<&ChildDescription> {
        self.children.iter().find(|c| c.element_name() == name)
    }

    /// Find an attribute description by name.
    #[must_use]
    pub fn find_attribute(&self, name: &str) -> Option<&AttributeDescription> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Parsed descriptions, keyed by file name.
#[derive(Debug)]
pub struct SchemaCache {
    files: HashMap<String, Arc<ElementDescription>>,
}

impl SchemaCache {
    fn build() -> Self {
        let mut files = HashMap::new();
        for (name, content) in EMBEDDED {
            let root = match xml::parse_str(content) {
                Ok(root) => root,
                Err(e) => panic!("embedded schema file '{name}' is malformed: {e}"),
            };
            files.insert((*name).to_string(), Arc::new(parse_description(&root, name)));
        }
        Self { files }
    }

    /// Look up a description file by name.
    ///
    /// # Panics
    ///
    /// Panics if a description references a file absent from the embedded
    /// set, which indicates a broken schema build.
    #[must_use]
    pub fn file(&self, name: &str) -> Arc<ElementDescription> {
        match self.files.get(name) {
            Some(d) => Arc::clone(d),
            None => panic!("schema references unknown description file '{name}'"),
        }
    }
}

/// The process-wide schema cache, initialized on first use.
pub fn cache() -> &'static SchemaCache {
    static CACHE: OnceLock<SchemaCache> = OnceLock::new();
    CACHE.get_or_init(SchemaCache::build)
}

/// Description of the `<sdf>` root element.
#[must_use]
pub fn root_description() -> Arc<ElementDescription> {
    cache().file("root.sdf")
}

fn parse_description(xml: &XmlElement, file: &str) -> ElementDescription {
    let name = xml.attribute("name").unwrap_or_default().to_string();
    let mut descr = ElementDescription {
        name,
        ..ElementDescription::default()
    };

    if let Some(ty) = xml.attribute("type") {
        let value_type = match ValueType::from_str(ty) {
            Some(v) => v,
            None => panic!("schema file '{file}': unknown type '{ty}'"),
        };
        let default = xml.attribute("default").unwrap_or_default().to_string();
        descr.value = Some((value_type, default));
    }

    descr.copy_data = matches!(xml.attribute("copy_data"), Some("1" | "true"));

    for child in &xml.children {
        match child.name.as_str() {
            "description" => {
                descr.description = child.text.clone().unwrap_or_default();
            }
            "attribute" => {
                let attr_name = child.attribute("name").unwrap_or_default().to_string();
                let ty = child.attribute("type").unwrap_or("string");
                let value_type = match ValueType::from_str(ty) {
                    Some(v) => v,
                    None => panic!("schema file '{file}': attribute '{attr_name}' has unknown type '{ty}'"),
                };
                descr.attributes.push(AttributeDescription {
                    name: attr_name,
                    value_type,
                    default: child.attribute("default").unwrap_or_default().to_string(),
                    required: child.attribute("required") == Some("1"),
                });
            }
            "element" => {
                let required = child
                    .attribute("required")
                    .and_then(Cardinality::from_str)
                    .unwrap_or_default();
                descr.children.push(ChildDescription {
                    required,
                    node: ChildNode::Inline(Arc::new(parse_description(child, file))),
                });
            }
            "include" => {
                let filename = child.attribute("filename").unwrap_or_default().to_string();
                let required = child
                    .attribute("required")
                    .and_then(Cardinality::from_str)
                    .unwrap_or_default();
                descr.children.push(ChildDescription {
                    required,
                    node: ChildNode::File(filename),
                });
            }
            other => panic!("schema file '{file}': unexpected node '{other}'"),
        }
    }

    descr
}
