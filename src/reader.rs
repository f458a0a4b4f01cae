//! Schema-validated reading of SDF documents.
//!
//! `read_string`/`read_file` parse raw XML, convert older documents forward,
//! then recursively match every element against the embedded schema
//! descriptions, producing an [`Element`] tree annotated with source
//! locations. Recoverable problems are recorded and reading continues so a
//! single pass reports as many diagnostics as possible; structural failures
//! abort the offending branch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{EnforcementPolicy, ParserConfig};
use crate::converter;
use crate::element::{Element, ElementPtr};
use crate::error::{ErrorCode, Errors, SdfError};
use crate::include;
use crate::schema::{self, Cardinality, ElementDescription, SDF_VERSION};
use crate::urdf;
use crate::xml::{self, XmlElement};

/// Attribute positions whose value is a frame name and therefore subject
/// to the reserved-identifier rule.
const FRAME_REFERENCE_ATTRIBUTES: &[(&str, &str)] = &[
    ("frame", "attached_to"),
    ("pose", "relative_to"),
    ("model", "placement_frame"),
    ("model", "canonical_link"),
    ("custom_rpy", "parent_frame"),
];

/// Joint types that require an `<axis>` child.
const AXIS_JOINT_TYPES: &[&str] = &[
    "revolute",
    "revolute2",
    "prismatic",
    "universal",
    "screw",
    "gearbox",
    "continuous",
];

/// A successfully read document: the `<sdf>` element tree plus the version
/// the document was authored in (before conversion).
#[derive(Debug)]
pub struct Document {
    /// The `<sdf>` root element.
    pub root: ElementPtr,
    /// Version string from the source document.
    pub original_version: String,
}

/// Whether a name may be used as the value of a frame-reference attribute.
/// `__model__` and `world` are legal references; all other double-underscore
/// names are reserved.
#[must_use]
pub fn is_valid_frame_reference(name: &str) -> bool {
    !name.starts_with("__") || name == "__model__"
}

/// Whether a name is reserved and may not be assigned by the user.
#[must_use]
pub fn is_reserved_name(name: &str) -> bool {
    name == "world" || name.starts_with("__")
}

/// State threaded through a single read, including nested include reads.
pub(crate) struct ReadContext<'a> {
    pub config: &'a ParserConfig,
    pub file_path: Option<String>,
    pub base_dir: Option<PathBuf>,
    /// Canonicalized paths of files currently being read, for include
    /// cycle detection.
    pub include_stack: Vec<PathBuf>,
}

impl<'a> ReadContext<'a> {
    fn new(config: &'a ParserConfig) -> Self {
        Self {
            config,
            file_path: None,
            base_dir: None,
            include_stack: Vec::new(),
        }
    }
}

/// Read an SDF document from a string.
///
/// Returns `None` when the document could not be read; `errors` then holds
/// at least one diagnostic. A `Some` result may still be accompanied by
/// recoverable diagnostics.
pub fn read_string(
    sdf_string: &str,
    config: &ParserConfig,
    errors: &mut Errors,
) -> Option<Document> {
    let mut ctx = ReadContext::new(config);
    read_string_internal(sdf_string, &mut ctx, errors)
}

/// Read an SDF document from a file.
pub fn read_file(path: &Path, config: &ParserConfig, errors: &mut Errors) -> Option<Document> {
    let mut ctx = ReadContext::new(config);
    read_file_internal(path, &mut ctx, errors)
}

pub(crate) fn read_file_internal(
    path: &Path,
    ctx: &mut ReadContext,
    errors: &mut Errors,
) -> Option<Document> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            errors.push(SdfError::new(
                ErrorCode::FileRead,
                format!("unable to read file '{}': {e}", path.display()),
            ));
            return None;
        }
    };

    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if ctx.include_stack.contains(&canonical) {
        errors.push(SdfError::new(
            ErrorCode::FileRead,
            format!("include cycle detected at '{}'", path.display()),
        ));
        return None;
    }

    let prev_file = ctx.file_path.take();
    let prev_base = ctx.base_dir.take();
    ctx.file_path = Some(path.display().to_string());
    ctx.base_dir = path.parent().map(Path::to_path_buf);
    ctx.include_stack.push(canonical);

    let result = read_string_internal(&content, ctx, errors);

    ctx.include_stack.pop();
    ctx.file_path = prev_file;
    ctx.base_dir = prev_base;
    result
}

pub(crate) fn read_string_internal(
    sdf_string: &str,
    ctx: &mut ReadContext,
    errors: &mut Errors,
) -> Option<Document> {
    let mut raw = match xml::parse_str(sdf_string) {
        Ok(raw) => raw,
        Err(e) => {
            errors.push(location(ctx, None).apply(e));
            return None;
        }
    };

    // A well-formed document with a <robot> root is URDF; hand it to the
    // installed translator before giving up.
    if urdf::is_urdf_root(&raw.name) {
        let Some(translator) = ctx.config.urdf_translator() else {
            errors.push(location(ctx, raw.line).apply(SdfError::new(
                ErrorCode::Parsing,
                "document is URDF and no URDF translator is configured",
            )));
            return None;
        };
        let translated = match translator.translate(sdf_string) {
            Ok(translated) => translated,
            Err(msg) => {
                errors.push(location(ctx, raw.line).apply(SdfError::new(
                    ErrorCode::Parsing,
                    format!("URDF translation failed: {msg}"),
                )));
                return None;
            }
        };
        raw = match xml::parse_str(&translated) {
            Ok(raw) => raw,
            Err(e) => {
                errors.push(location(ctx, None).apply(e));
                return None;
            }
        };
    }

    if raw.name != "sdf" {
        errors.push(location(ctx, raw.line).apply(SdfError::new(
            ErrorCode::Parsing,
            format!("expected <sdf> root element, found <{}>", raw.name),
        )));
        return None;
    }

    let Some(original_version) = raw.attribute("version").map(str::to_string) else {
        errors.push(location(ctx, raw.line).apply(SdfError::new(
            ErrorCode::AttributeMissing,
            "<sdf> element has no version attribute",
        )));
        return None;
    };

    if original_version != SDF_VERSION {
        if !ctx.config.convert_versions {
            errors.push(location(ctx, raw.line).apply(SdfError::new(
                ErrorCode::Parsing,
                format!(
                    "document version '{original_version}' differs from {SDF_VERSION} \
                     and conversion is disabled"
                ),
            )));
            return None;
        }
        tracing::debug!(version = %original_version, "converting document to {SDF_VERSION}");
        if !converter::convert(&mut raw, &original_version, errors) {
            return None;
        }
    }

    if !check_from_root(&raw, ctx, errors) {
        return None;
    }

    let root = read_element_tree(&raw, &schema::root_description(), "", ctx, errors)?;

    if version_at_least(&original_version, 1, 8) && !check_no_double_colon_names(&raw, ctx, errors)
    {
        return None;
    }

    check_sibling_names(&raw, ctx, errors);

    Some(Document {
        root,
        original_version,
    })
}

/// Document-level pre-checks on the raw tree.
fn check_from_root(raw: &XmlElement, ctx: &ReadContext, errors: &mut Errors) -> bool {
    let mut ok = true;
    for model in raw.children_named("model") {
        if let Some(pose) = model.child("pose") {
            if pose.attribute("relative_to").is_some_and(|v| !v.is_empty()) {
                errors.push(location(ctx, pose.line).apply(SdfError::new(
                    ErrorCode::ElementInvalid,
                    "a top-level <model> pose cannot have a relative_to attribute",
                )));
                ok = false;
            }
        }
    }
    ok
}

/// SDFormat 1.8 retired `::` as a nesting delimiter inside names.
fn check_no_double_colon_names(raw: &XmlElement, ctx: &ReadContext, errors: &mut Errors) -> bool {
    let mut ok = true;
    visit_raw(raw, &mut |elem| {
        if let Some(name) = elem.attribute("name") {
            if name.contains("::") {
                errors.push(location(ctx, elem.line).apply(SdfError::new(
                    ErrorCode::ReservedName,
                    format!(
                        "delimiter '::' found in name '{name}', \
                         which is not allowed in SDFormat >= 1.8"
                    ),
                )));
                ok = false;
            }
        }
    });
    ok
}

/// Same-typed siblings sharing a name are almost always authoring
/// mistakes; plugins are the documented exception.
fn check_sibling_names(raw: &XmlElement, ctx: &ReadContext, errors: &mut Errors) {
    visit_raw(raw, &mut |elem| {
        let mut seen: Vec<(&str, &str)> = Vec::new();
        for child in &elem.children {
            if child.name == "plugin" {
                continue;
            }
            let Some(name) = child.attribute("name") else {
                continue;
            };
            if seen.contains(&(child.name.as_str(), name)) {
                let message = format!(
                    "non-unique name '{name}' detected among sibling <{}> elements",
                    child.name
                );
                match ctx.config.warnings {
                    EnforcementPolicy::Ignore => {}
                    EnforcementPolicy::Warn => tracing::warn!("{message}"),
                    EnforcementPolicy::Err => {
                        errors
                            .push(location(ctx, child.line)
                                .apply(SdfError::new(ErrorCode::Warning, message)));
                    }
                }
            } else {
                seen.push((child.name.as_str(), name));
            }
        }
    });
}

fn visit_raw(elem: &XmlElement, f: &mut impl FnMut(&XmlElement)) {
    f(elem);
    for child in &elem.children {
        visit_raw(child, f);
    }
}

fn version_at_least(version: &str, major: u32, minor: u32) -> bool {
    let mut parts = version.split('.');
    let maj: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let min: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    (maj, min) >= (major, minor)
}

fn location(ctx: &ReadContext, line: Option<u64>) -> crate::error::SourceLocation {
    crate::error::SourceLocation {
        file_path: ctx.file_path.clone(),
        xml_path: None,
        line_number: line,
    }
}

/// Recursively match a raw element against its schema description,
/// producing the typed instance node. Returns `None` when the branch had
/// to be abandoned.
pub(crate) fn read_element_tree(
    raw: &XmlElement,
    descr: &Arc<ElementDescription>,
    parent_xml_path: &str,
    ctx: &mut ReadContext,
    errors: &mut Errors,
) -> Option<ElementPtr> {
    let mut elem = Element::from_description(descr);
    if let Some(ref file) = ctx.file_path {
        elem.set_file_path(file.clone());
    }
    if let Some(line) = raw.line {
        elem.set_line_number(line);
    }

    let mut xml_path = format!("{parent_xml_path}/{}", raw.name);
    if let Some(name) = raw.attribute("name") {
        xml_path.push_str(&format!("[@name=\"{name}\"]"));
    }
    elem.set_xml_path(xml_path.clone());

    read_attributes(raw, descr, &mut elem, &xml_path, ctx, errors);

    // Typed text content. Pose values honor their `degrees` and
    // `rotation_format` attributes, which the plain value parser cannot
    // see.
    if let Some(ref text) = raw.text {
        if raw.name == "pose" {
            if let Err(msg) = set_pose_value(&mut elem, text) {
                let mut err = SdfError::new(
                    ErrorCode::ElementIncorrectType,
                    format!("unable to read value of <pose>: {msg}"),
                )
                .with_xml_path(xml_path.clone());
                err = location(ctx, raw.line).apply(err);
                errors.push(err);
            }
        } else if let Some(param) = elem.value_mut() {
            if let Err(msg) = param.set_from_string(text) {
                let mut err = SdfError::new(
                    ErrorCode::ElementIncorrectType,
                    format!("unable to read value of <{}>: {msg}", raw.name),
                )
                .with_xml_path(xml_path.clone());
                err = location(ctx, raw.line).apply(err);
                errors.push(err);
            }
        }
    }

    let elem_ptr = elem.into_ptr();

    for child_raw in &raw.children {
        if child_raw.name == "include" && (raw.name == "world" || raw.name == "model") {
            include::resolve_include(child_raw, &elem_ptr, &xml_path, ctx, errors);
            continue;
        }

        if descr.copy_data {
            elem_ptr
                .borrow_mut()
                .insert_element(raw_to_passthrough(child_raw, &xml_path, ctx));
            continue;
        }

        match descr.find_child(&child_raw.name) {
            Some(slot) => {
                if slot.required == Cardinality::Deprecated {
                    let message = format!(
                        "element <{}> is deprecated in SDFormat {SDF_VERSION}",
                        child_raw.name
                    );
                    match ctx.config.deprecated_elements {
                        EnforcementPolicy::Ignore => {}
                        EnforcementPolicy::Warn => tracing::warn!("{message}"),
                        EnforcementPolicy::Err => {
                            errors.push(location(ctx, child_raw.line).apply(
                                SdfError::new(ErrorCode::ElementDeprecated, message)
                                    .with_xml_path(xml_path.clone()),
                            ));
                            continue;
                        }
                    }
                }
                if let Some(child) =
                    read_element_tree(child_raw, &slot.description(), &xml_path, ctx, errors)
                {
                    elem_ptr.borrow_mut().insert_element(child);
                }
            }
            None if child_raw.name.contains(':') => {
                // Namespaced bypass: preserved verbatim.
                elem_ptr
                    .borrow_mut()
                    .insert_element(raw_to_passthrough(child_raw, &xml_path, ctx));
            }
            None => {
                let message = format!(
                    "XML element <{}>, child of <{}>, not defined in SDF",
                    child_raw.name, raw.name
                );
                match ctx.config.unrecognized_elements {
                    EnforcementPolicy::Ignore => {}
                    EnforcementPolicy::Warn => tracing::warn!("{message}"),
                    EnforcementPolicy::Err => {
                        errors.push(location(ctx, child_raw.line).apply(
                            SdfError::new(ErrorCode::ElementInvalid, message)
                                .with_xml_path(xml_path.clone()),
                        ));
                    }
                }
            }
        }
    }

    if raw.name == "joint" && !check_joint_children(raw, &xml_path, ctx, errors) {
        return None;
    }

    materialize_required_children(&elem_ptr, descr);

    Some(elem_ptr)
}

fn read_attributes(
    raw: &XmlElement,
    descr: &Arc<ElementDescription>,
    elem: &mut Element,
    xml_path: &str,
    ctx: &ReadContext,
    errors: &mut Errors,
) {
    for (key, value) in &raw.attributes {
        if key.contains(':') {
            elem.add_passthrough_attribute(key, value);
            continue;
        }
        let attr_path = format!("{xml_path}[@{key}=\"{value}\"]");
        match elem.attribute_mut(key) {
            Some(param) => {
                if FRAME_REFERENCE_ATTRIBUTES.contains(&(raw.name.as_str(), key.as_str()))
                    && !is_valid_frame_reference(value)
                {
                    errors.push(location(ctx, raw.line).apply(
                        SdfError::new(
                            ErrorCode::ReservedName,
                            format!(
                                "'{value}' is reserved; it cannot be used as a value \
                                 of attribute [{key}]"
                            ),
                        )
                        .with_xml_path(attr_path.clone()),
                    ));
                }
                if let Err(msg) = param.set_from_string(value) {
                    errors.push(location(ctx, raw.line).apply(
                        SdfError::new(
                            ErrorCode::AttributeIncorrectType,
                            format!("unable to read attribute [{key}]: {msg}"),
                        )
                        .with_xml_path(attr_path),
                    ));
                }
            }
            None => {
                let message = format!(
                    "XML attribute [{key}] on element <{}> not defined in SDF",
                    raw.name
                );
                match ctx.config.unrecognized_elements {
                    EnforcementPolicy::Ignore => {}
                    EnforcementPolicy::Warn => tracing::warn!("{message}"),
                    EnforcementPolicy::Err => {
                        errors.push(location(ctx, raw.line).apply(
                            SdfError::new(ErrorCode::AttributeInvalid, message)
                                .with_xml_path(attr_path),
                        ));
                    }
                }
            }
        }
    }

    // Required attributes must be set by the document.
    for param in elem.attributes() {
        if param.required() && !param.is_set() {
            errors.push(location(ctx, raw.line).apply(
                SdfError::new(
                    ErrorCode::AttributeMissing,
                    format!(
                        "required attribute [{}] missing on element <{}>",
                        param.key(),
                        raw.name
                    ),
                )
                .with_xml_path(xml_path.to_string()),
            ));
        }
    }

    // Reserved identifiers may not be assigned as entity names. Worlds are
    // exempt: the `world` keyword refers to the world frame, not the
    // world's own name.
    if raw.name != "world" {
        if let Some(name) = raw.attribute("name") {
            if descr.find_attribute("name").is_some() && is_reserved_name(name) {
                errors.push(location(ctx, raw.line).apply(
                    SdfError::new(
                        ErrorCode::ReservedName,
                        format!("'{name}' is reserved; it cannot be used as an entity name"),
                    )
                    .with_xml_path(xml_path.to_string()),
                ));
            }
        }
    }
}

/// Joints must declare their topology explicitly; defaults would silently
/// produce a degenerate kinematic chain.
fn check_joint_children(
    raw: &XmlElement,
    xml_path: &str,
    ctx: &ReadContext,
    errors: &mut Errors,
) -> bool {
    let joint_type = raw.attribute("type").unwrap_or_default();
    let mut required: Vec<&str> = vec!["parent", "child"];
    if joint_type == "ball" {
        // Ball joints have no axis.
    } else if AXIS_JOINT_TYPES.contains(&joint_type) {
        required.push("axis");
        if joint_type == "revolute2" || joint_type == "universal" {
            required.push("axis2");
        }
    }
    for name in required {
        if raw.child(name).is_none() {
            errors.push(location(ctx, raw.line).apply(
                SdfError::new(
                    ErrorCode::ElementMissing,
                    format!(
                        "joint '{}' of type '{joint_type}' is missing required child <{name}>",
                        raw.attribute("name").unwrap_or_default()
                    ),
                )
                .with_xml_path(xml_path.to_string()),
            ));
            return false;
        }
    }
    true
}

/// Materialize schema defaults for required children the document left
/// unspecified, recursively.
fn materialize_required_children(elem_ptr: &ElementPtr, descr: &Arc<ElementDescription>) {
    for slot in &descr.children {
        if !slot.required.is_required() {
            continue;
        }
        let name = slot.element_name();
        let mut elem = elem_ptr.borrow_mut();
        if !elem.has_element(&name) {
            let child = elem.get_element(&name);
            child.borrow_mut().set_explicitly_set(false);
            drop(elem);
            materialize_required_children(&child, &slot.description());
        }
    }
}

/// Parse a `<pose>` element's text using its own `degrees` and
/// `rotation_format` attributes.
pub(crate) fn set_pose_value(elem: &mut Element, text: &str) -> Result<(), String> {
    let degrees = elem
        .attribute("degrees")
        .and_then(crate::element::Param::get::<bool>)
        .map_or(false, |(v, _)| v);
    let format_text = elem
        .attribute_text("rotation_format")
        .unwrap_or_else(|| "euler_rpy".to_string());
    let format = crate::pose::RotationFormat::from_str(&format_text)
        .ok_or_else(|| format!("unknown rotation_format '{format_text}'"))?;
    let pose = crate::pose::parse_pose(text, degrees, format)?;
    elem.set(pose);
    Ok(())
}

/// Clone a raw subtree into passthrough instance nodes (plugin content,
/// namespaced custom elements).
pub(crate) fn raw_to_passthrough(
    raw: &XmlElement,
    parent_xml_path: &str,
    ctx: &ReadContext,
) -> ElementPtr {
    let mut elem = Element::passthrough(&raw.name);
    if let Some(ref file) = ctx.file_path {
        elem.set_file_path(file.clone());
    }
    if let Some(line) = raw.line {
        elem.set_line_number(line);
    }
    let xml_path = format!("{parent_xml_path}/{}", raw.name);
    elem.set_xml_path(xml_path.clone());
    for (key, value) in &raw.attributes {
        elem.add_passthrough_attribute(key, value);
    }
    if let Some(ref text) = raw.text {
        elem.set(text.clone());
    }
    let ptr = elem.into_ptr();
    for child in &raw.children {
        ptr.borrow_mut()
            .insert_element(raw_to_passthrough(child, &xml_path, ctx));
    }
    ptr
}
