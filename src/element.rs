//! The schema-backed instance tree.
//!
//! An [`Element`] is one node of a loaded SDF document: a name, typed
//! attributes, an optional typed value, ordered children, a back-reference
//! to its schema description, and source-location metadata. Nodes are
//! shared single-threaded (`Rc<RefCell<..>>`): the domain model keeps
//! non-owning handles into the tree owned by `Root` for error reporting
//! and round-tripping.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::schema::{AttributeDescription, ElementDescription};
use crate::value::{FromValue, Value, ValueType};

/// Shared handle to an element node.
pub type ElementPtr = Rc<RefCell<Element>>;

/// A typed parameter: an attribute or an element value.
#[derive(Debug, Clone)]
pub struct Param {
    key: String,
    value_type: ValueType,
    default: String,
    required: bool,
    value: Option<Value>,
}

impl Param {
    /// Create a parameter from its schema description.
    #[must_use]
    pub fn from_description(descr: &AttributeDescription) -> Self {
        Self {
            key: descr.name.clone(),
            value_type: descr.value_type,
            default: descr.default.clone(),
            required: descr.required,
            value: None,
        }
    }

    /// Create an untyped (string) parameter, used for namespaced
    /// passthrough attributes.
    #[must_use]
    pub fn passthrough(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value_type: ValueType::String,
            default: String::new(),
            required: false,
            value: None,
        }
    }

    /// Parameter name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Declared type.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Whether the document must set this parameter.
    #[must_use]
    pub fn required(&self) -> bool {
        self.required
    }

    /// Whether the document explicitly set this parameter.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Parse and store a value from text.
    ///
    /// # Errors
    ///
    /// Returns a type-mismatch message; the previous value is kept.
    pub fn set_from_string(&mut self, text: &str) -> Result<(), String> {
        self.value = Some(Value::parse(self.value_type, text)?);
        Ok(())
    }

    /// Store a typed value directly.
    pub fn set<T: FromValue>(&mut self, value: T) {
        self.value = Some(value.into_value());
    }

    /// Clear back to the schema default.
    pub fn reset(&mut self) {
        self.value = None;
    }

    /// Current value as text (set value, or the schema default).
    #[must_use]
    pub fn as_text(&self) -> String {
        match &self.value {
            Some(v) => v.to_text(),
            None => self.default.clone(),
        }
    }

    /// Typed read: the set value if its type matches, else the parsed
    /// schema default, else `None`. The bool reports whether the document
    /// explicitly set the value.
    #[must_use]
    pub fn get<T: FromValue>(&self) -> Option<(T, bool)> {
        if let Some(ref v) = self.value {
            if let Some(t) = T::from_value(v) {
                return Some((t, true));
            }
        }
        Value::parse(self.value_type, &self.default)
            .ok()
            .and_then(|v| T::from_value(&v))
            .map(|t| (t, false))
    }
}

/// One node of the instance tree. See the module docs.
#[derive(Debug)]
pub struct Element {
    name: String,
    attributes: Vec<Param>,
    value: Option<Param>,
    children: Vec<ElementPtr>,
    description: Option<Arc<ElementDescription>>,
    /// Set for elements not described by the schema (namespaced bypass).
    passthrough: bool,
    /// False for children materialized from schema defaults.
    explicitly_set: bool,
    file_path: Option<String>,
    xml_path: String,
    line_number: Option<u64>,
}

impl Element {
    /// Create an instance node from a schema description, with attributes
    /// and value cloned from the description's defaults.
    #[must_use]
    pub fn from_description(descr: &Arc<ElementDescription>) -> Self {
        let attributes = descr
            .attributes
            .iter()
            .map(Param::from_description)
            .collect();
        let value = descr.value.as_ref().map(|(ty, default)| Param {
            key: String::new(),
            value_type: *ty,
            default: default.clone(),
            required: false,
            value: None,
        });
        Self {
            name: descr.name.clone(),
            attributes,
            value,
            children: Vec::new(),
            description: Some(Arc::clone(descr)),
            passthrough: false,
            explicitly_set: true,
            file_path: None,
            xml_path: String::new(),
            line_number: None,
        }
    }

    /// Create an unknown-element passthrough node (string-valued).
    #[must_use]
    pub fn passthrough(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            value: Some(Param {
                key: String::new(),
                value_type: ValueType::String,
                default: String::new(),
                required: false,
                value: None,
            }),
            children: Vec::new(),
            description: None,
            passthrough: true,
            explicitly_set: true,
            file_path: None,
            xml_path: String::new(),
            line_number: None,
        }
    }

    /// Wrap into a shared handle.
    #[must_use]
    pub fn into_ptr(self) -> ElementPtr {
        Rc::new(RefCell::new(self))
    }

    /// Element name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema description backing this node, if any.
    #[must_use]
    pub fn description(&self) -> Option<&Arc<ElementDescription>> {
        self.description.as_ref()
    }

    /// Whether this node is an unknown-element passthrough.
    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    /// Whether the document explicitly declared this node (false for
    /// required children materialized from schema defaults).
    #[must_use]
    pub fn explicitly_set(&self) -> bool {
        self.explicitly_set
    }

    /// Mark this node as materialized rather than authored.
    pub fn set_explicitly_set(&mut self, explicit: bool) {
        self.explicitly_set = explicit;
    }

    /// Source file path, if the document came from a file.
    #[must_use]
    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    /// Set the source file path.
    pub fn set_file_path(&mut self, path: impl Into<String>) {
        self.file_path = Some(path.into());
    }

    /// XML path of this node, e.g. `/sdf/world/model[@name="m"]`.
    #[must_use]
    pub fn xml_path(&self) -> &str {
        &self.xml_path
    }

    /// Set the XML path.
    pub fn set_xml_path(&mut self, path: impl Into<String>) {
        self.xml_path = path.into();
    }

    /// Line number of the opening tag in the source.
    #[must_use]
    pub fn line_number(&self) -> Option<u64> {
        self.line_number
    }

    /// Set the source line number.
    pub fn set_line_number(&mut self, line: u64) {
        self.line_number = Some(line);
    }

    /// Attribute parameters.
    #[must_use]
    pub fn attributes(&self) -> &[Param] {
        &self.attributes
    }

    /// Attribute parameter by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Param> {
        self.attributes.iter().find(|p| p.key == name)
    }

    /// Mutable attribute parameter by name.
    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Param> {
        self.attributes.iter_mut().find(|p| p.key == name)
    }

    /// Add a passthrough attribute (namespaced bypass) and set its value.
    pub fn add_passthrough_attribute(&mut self, name: &str, value: &str) {
        let mut param = Param::passthrough(name);
        param.set(value.to_string());
        self.attributes.push(param);
    }

    /// Attribute value as text, or `None` if the attribute does not exist.
    #[must_use]
    pub fn attribute_text(&self, name: &str) -> Option<String> {
        self.attribute(name).map(Param::as_text)
    }

    /// The element's own value parameter, if the schema declares one.
    #[must_use]
    pub fn value(&self) -> Option<&Param> {
        self.value.as_ref()
    }

    /// Mutable access to the element's own value parameter.
    pub fn value_mut(&mut self) -> Option<&mut Param> {
        self.value.as_mut()
    }

    /// Child handles in document order.
    #[must_use]
    pub fn children(&self) -> &[ElementPtr] {
        &self.children
    }

    /// Whether a child element with the given name exists.
    #[must_use]
    pub fn has_element(&self, name: &str) -> bool {
        self.find_element(name).is_some()
    }

    /// Read-only lookup: first child with the given name.
    #[must_use]
    pub fn find_element(&self, name: &str) -> Option<ElementPtr> {
        self.children
            .iter()
            .find(|c| c.borrow().name == name)
            .map(Rc::clone)
    }

    /// All children with the given name.
    #[must_use]
    pub fn find_elements(&self, name: &str) -> Vec<ElementPtr> {
        self.children
            .iter()
            .filter(|c| c.borrow().name == name)
            .map(Rc::clone)
            .collect()
    }

    /// Write-path lookup: first child with the given name, created from
    /// the schema (with defaults) if absent.
    pub fn get_element(&mut self, name: &str) -> ElementPtr {
        if let Some(existing) = self.find_element(name) {
            return existing;
        }
        let child = self.make_child(name);
        self.children.push(Rc::clone(&child));
        child
    }

    /// Append a new child with the given name, cloned from the schema
    /// description (or a passthrough node for namespaced names).
    pub fn add_element(&mut self, name: &str) -> ElementPtr {
        let child = self.make_child(name);
        self.children.push(Rc::clone(&child));
        child
    }

    /// Append an existing child handle.
    pub fn insert_element(&mut self, child: ElementPtr) {
        self.children.push(child);
    }

    /// Remove all children with the given name.
    pub fn clear_elements(&mut self, name: &str) {
        self.children.retain(|c| c.borrow().name != name);
    }

    fn make_child(&self, name: &str) -> ElementPtr {
        let from_schema = self
            .description
            .as_ref()
            .and_then(|d| d.find_child(name))
            .map(|slot| Element::from_description(&slot.description()));
        let mut child = match from_schema {
            Some(elem) => elem,
            None => Element::passthrough(name),
        };
        child.xml_path = format!("{}/{}", self.xml_path, name);
        child.file_path.clone_from(&self.file_path);
        child.into_ptr()
    }

    /// Typed read of a child element's value. An empty `name` reads this
    /// element's own value. A schema mismatch or a missing child is
    /// recoverable: the given default is returned with `false`.
    #[must_use]
    pub fn get<T: FromValue + Clone>(&self, name: &str, default: T) -> (T, bool) {
        if name.is_empty() {
            return match self.value.as_ref().and_then(Param::get::<T>) {
                Some(pair) => pair,
                None => (default, false),
            };
        }
        let Some(child) = self.find_element(name) else {
            return (default, false);
        };
        let borrowed = child.borrow();
        match borrowed.value.as_ref().and_then(Param::get::<T>) {
            Some(pair) => pair,
            None => (default, false),
        }
    }

    /// Typed write of this element's own value.
    pub fn set<T: FromValue>(&mut self, value: T) {
        if let Some(ref mut param) = self.value {
            param.set(value);
        } else {
            let mut param = Param::passthrough("");
            param.set(value);
            self.value = Some(param);
        }
    }

    /// Deep copy this subtree into fresh handles.
    #[must_use]
    pub fn deep_clone(&self) -> Element {
        Element {
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            value: self.value.clone(),
            children: self
                .children
                .iter()
                .map(|c| c.borrow().deep_clone().into_ptr())
                .collect(),
            description: self.description.clone(),
            passthrough: self.passthrough,
            explicitly_set: self.explicitly_set,
            file_path: self.file_path.clone(),
            xml_path: self.xml_path.clone(),
            line_number: self.line_number,
        }
    }

    /// Serialize this subtree back to XML text. Only explicitly-set and
    /// required attributes are printed; materialized default children are
    /// skipped. The output is structurally equivalent to the input, not
    /// byte-identical.
    #[must_use]
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out, 0);
        out
    }

    fn write_xml(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&indent);
        out.push('<');
        out.push_str(&self.name);
        for attr in &self.attributes {
            if attr.is_set() || attr.required() {
                out.push_str(&format!(
                    " {}=\"{}\"",
                    attr.key(),
                    escape_xml(&attr.as_text())
                ));
            }
        }

        let value_text = self
            .value
            .as_ref()
            .filter(|p| p.is_set())
            .map(Param::as_text);
        let printable_children: Vec<_> = self
            .children
            .iter()
            .filter(|c| c.borrow().explicitly_set)
            .collect();

        if value_text.is_none() && printable_children.is_empty() {
            out.push_str("/>\n");
            return;
        }
        out.push('>');
        if let Some(text) = value_text {
            out.push_str(&escape_xml(&text));
            if printable_children.is_empty() {
                out.push_str(&format!("</{}>\n", self.name));
                return;
            }
        }
        out.push('\n');
        for child in printable_children {
            child.borrow().write_xml(out, depth + 1);
        }
        out.push_str(&format!("{indent}</{}>\n", self.name));
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::pose::Pose;
    use crate::schema;

    fn model_element() -> Element {
        Element::from_description(&schema::cache().file("model.sdf"))
    }

    #[test]
    fn test_attributes_cloned_from_description() {
        let model = model_element();
        assert!(model.attribute("name").is_some());
        assert!(model.attribute("name").unwrap().required());
        assert!(!model.attribute("name").unwrap().is_set());
        assert_eq!(model.attribute_text("canonical_link").as_deref(), Some(""));
    }

    #[test]
    fn test_get_element_creates_with_defaults() {
        let mut model = model_element();
        assert!(!model.has_element("static"));
        let is_static = model.get_element("static");
        assert!(model.has_element("static"));
        let (value, set) = is_static.borrow().get::<bool>("", true);
        assert!(!value, "schema default is false");
        assert!(!set);
    }

    #[test]
    fn test_find_element_is_read_only() {
        let model = model_element();
        assert!(model.find_element("static").is_none());
    }

    #[test]
    fn test_typed_get_mismatch_recovers() {
        let mut model = model_element();
        let is_static = model.get_element("static");
        is_static
            .borrow_mut()
            .value_mut()
            .unwrap()
            .set_from_string("true")
            .unwrap();
        // Asking for a pose from a bool-typed value returns the caller's
        // default with set=false.
        let (pose, set) = is_static.borrow().get::<Pose>("", Pose::identity());
        assert_eq!(pose, Pose::identity());
        assert!(!set);
        let (value, set) = model.get::<bool>("static", false);
        assert!(value);
        assert!(set);
    }

    #[test]
    fn test_namespaced_passthrough_child() {
        let mut model = model_element();
        let custom = model.add_element("mysim:settings");
        assert!(custom.borrow().is_passthrough());
        assert!(custom.borrow().description().is_none());
    }

    #[test]
    fn test_xml_round_trip_skips_defaults() {
        let mut model = model_element();
        if let Some(p) = model.attribute_mut("name") {
            p.set_from_string("box").unwrap();
        }
        let pose = model.get_element("pose");
        pose.borrow_mut().set_explicitly_set(false);
        let xml = model.to_xml_string();
        assert!(xml.contains("name=\"box\""));
        assert!(!xml.contains("<pose"), "materialized child not printed: {xml}");
    }

    #[test]
    fn test_deep_clone_detaches() {
        let mut model = model_element();
        let pose = model.get_element("pose");
        let copy = model.deep_clone();
        pose.borrow_mut()
            .value_mut()
            .unwrap()
            .set_from_string("1 0 0 0 0 0")
            .unwrap();
        let copied_pose = copy.find_element("pose").unwrap();
        assert!(!copied_pose.borrow().value().unwrap().is_set());
    }
}
