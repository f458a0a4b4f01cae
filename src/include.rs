//! `<include>` resolution and merge-include composition.
//!
//! An include splices another model file into the current scope. The URI
//! resolves to an SDF file directly, to a model directory carrying a
//! `model.config` (or legacy `manifest.xml`), or through a custom model
//! parser. Overrides from the include element are applied to the spliced
//! entity. With `merge="true"` the included model's children are hoisted
//! into the including model behind a synthetic proxy frame, with frame
//! references rewritten to keep the semantics intact.

use std::path::{Path, PathBuf};

use crate::dom::Model;
use crate::element::ElementPtr;
use crate::error::{ErrorCode, Errors, SdfError};
use crate::frames;
use crate::reader::{self, is_valid_frame_reference, ReadContext};
use crate::xml::{self, XmlElement};

/// Entity kinds hoisted by a merge-include; scalar model properties such
/// as `static` are dropped.
const MERGEABLE: &[&str] = &["link", "model", "joint", "frame", "gripper", "plugin"];

/// Name of the synthetic frame standing in for a merged model's frame.
#[must_use]
pub fn merged_model_proxy_frame_name(model_name: &str) -> String {
    format!("_merged__{model_name}__model__")
}

/// Resolve one raw `<include>` element, splicing the result into
/// `parent`. Failures are recorded and the include is skipped; the
/// enclosing read continues.
pub(crate) fn resolve_include(
    include_raw: &XmlElement,
    parent: &ElementPtr,
    parent_xml_path: &str,
    ctx: &mut ReadContext,
    errors: &mut Errors,
) {
    let xml_path = format!("{parent_xml_path}/include");
    let source_file = ctx.file_path.clone();
    let location = move |line: Option<u64>, mut err: SdfError| -> SdfError {
        err = err.with_xml_path(xml_path.clone());
        if let Some(ref file) = source_file {
            err = err.with_file_path(file.clone());
        }
        if let Some(line) = line {
            err = err.with_line_number(line);
        }
        err
    };

    let Some(uri) = include_raw
        .child("uri")
        .and_then(|u| u.text.clone())
        .filter(|u| !u.is_empty())
    else {
        errors.push(location(
            include_raw.line,
            SdfError::new(
                ErrorCode::ElementMissing,
                "<include> requires a non-empty <uri> child",
            ),
        ));
        return;
    };

    let Some(model_file) = resolve_uri(&uri, ctx, errors, &|e| location(include_raw.line, e))
    else {
        return;
    };

    let doc = if is_sdf_file(&model_file) {
        reader::read_file_internal(&model_file, ctx, errors)
    } else {
        read_via_custom_parser(&model_file, ctx, errors, &|e| location(include_raw.line, e))
    };
    let Some(doc) = doc else {
        return;
    };

    // The included file contributes its single top-level entity, models
    // preferred over lights.
    let root = doc.root.borrow();
    let entities: Vec<ElementPtr> = root
        .children()
        .iter()
        .filter(|c| {
            let name = c.borrow().name().to_string();
            name == "model" || name == "light"
        })
        .cloned()
        .collect();
    drop(root);
    if entities.len() > 1 {
        errors.push(location(
            include_raw.line,
            SdfError::new(
                ErrorCode::ElementInvalid,
                format!("included file '{uri}' has more than one top-level entity"),
            ),
        ));
        return;
    }
    let Some(entity) = entities
        .iter()
        .find(|c| c.borrow().name() == "model")
        .or_else(|| entities.first())
        .cloned()
    else {
        errors.push(location(
            include_raw.line,
            SdfError::new(
                ErrorCode::FileRead,
                format!("included file '{uri}' is invalid; skipping"),
            ),
        ));
        return;
    };

    if !apply_overrides(include_raw, &entity, errors, &|e| {
        location(include_raw.line, e)
    }) {
        return;
    }

    let merge = matches!(include_raw.attribute("merge"), Some("true" | "1"));
    if !merge {
        parent.borrow_mut().insert_element(entity);
        return;
    }

    if entity.borrow().name() != "model" {
        errors.push(location(
            include_raw.line,
            SdfError::new(
                ErrorCode::MergeIncludeUnsupported,
                "merge-include is only supported for included models",
            ),
        ));
        return;
    }
    if parent.borrow().name() != "model" {
        errors.push(location(
            include_raw.line,
            SdfError::new(
                ErrorCode::MergeIncludeUnsupported,
                format!(
                    "merge-include does not support a parent element of type <{}>",
                    parent.borrow().name()
                ),
            ),
        ));
        return;
    }

    merge_model(&entity, parent, errors, &|e| location(include_raw.line, e));
}

fn is_sdf_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("sdf" | "world")
    )
}

/// Resolve an include URI to a model file: directly, or through a model
/// directory's `model.config`/`manifest.xml`.
fn resolve_uri(
    uri: &str,
    ctx: &ReadContext,
    errors: &mut Errors,
    location: &dyn Fn(SdfError) -> SdfError,
) -> Option<PathBuf> {
    let Some(resolved) = ctx.config.find_file(uri, ctx.base_dir.as_deref()) else {
        errors.push(location(SdfError::new(
            ErrorCode::UriLookup,
            format!("unable to resolve include uri '{uri}'"),
        )));
        return None;
    };
    if !resolved.is_dir() {
        return Some(resolved);
    }

    let config_path = ["model.config", "manifest.xml"]
        .iter()
        .map(|name| resolved.join(name))
        .find(|p| p.exists());
    let Some(config_path) = config_path else {
        errors.push(location(SdfError::new(
            ErrorCode::UriLookup,
            format!(
                "model directory '{}' has no model.config or manifest.xml",
                resolved.display()
            ),
        )));
        return None;
    };

    let content = match std::fs::read_to_string(&config_path) {
        Ok(content) => content,
        Err(e) => {
            errors.push(location(SdfError::new(
                ErrorCode::FileRead,
                format!("unable to read '{}': {e}", config_path.display()),
            )));
            return None;
        }
    };
    let config_xml = match xml::parse_str(&content) {
        Ok(root) => root,
        Err(e) => {
            errors.push(location(e));
            return None;
        }
    };
    let model_file = config_xml
        .child("sdf")
        .and_then(|s| s.text.clone())
        .filter(|t| !t.is_empty());
    let Some(model_file) = model_file else {
        errors.push(location(SdfError::new(
            ErrorCode::UriLookup,
            format!("'{}' does not name an sdf file", config_path.display()),
        )));
        return None;
    };
    Some(resolved.join(model_file))
}

/// Non-SDF include targets go through the configured custom model
/// parsers, first success wins.
fn read_via_custom_parser(
    path: &Path,
    ctx: &mut ReadContext,
    errors: &mut Errors,
    location: &dyn Fn(SdfError) -> SdfError,
) -> Option<reader::Document> {
    for parser in ctx.config.custom_model_parsers() {
        if let Some(sdf_string) = parser(path) {
            return reader::read_string_internal(&sdf_string, ctx, errors);
        }
    }
    errors.push(location(SdfError::new(
        ErrorCode::UriLookup,
        format!(
            "no custom model parser accepted non-sdf include '{}'",
            path.display()
        ),
    )));
    None
}

/// Apply `<include>` overrides to the spliced entity. Returns `false`
/// when the include must be abandoned.
fn apply_overrides(
    include_raw: &XmlElement,
    entity: &ElementPtr,
    errors: &mut Errors,
    location: &dyn Fn(SdfError) -> SdfError,
) -> bool {
    if let Some(name) = include_raw.child("name").and_then(|n| n.text.clone()) {
        if let Some(attr) = entity.borrow_mut().attribute_mut("name") {
            let _ = attr.set_from_string(&name);
        }
    }

    let is_model = entity.borrow().name() == "model";

    if let Some(static_override) = include_raw.child("static").and_then(|s| s.text.clone()) {
        if is_model {
            let static_elem = entity.borrow_mut().get_element("static");
            let mut static_elem = static_elem.borrow_mut();
            if let Some(param) = static_elem.value_mut() {
                if let Err(msg) = param.set_from_string(&static_override) {
                    errors.push(location(SdfError::new(
                        ErrorCode::ElementIncorrectType,
                        format!("invalid <static> override: {msg}"),
                    )));
                }
            }
        }
    }

    if let Some(pose_raw) = include_raw.child("pose") {
        let pose_elem = entity.borrow_mut().get_element("pose");
        let mut pose_elem = pose_elem.borrow_mut();
        // The override replaces value and reference attributes wholesale.
        for attr_name in ["relative_to", "degrees", "rotation_format"] {
            if let Some(param) = pose_elem.attribute_mut(attr_name) {
                match pose_raw.attribute(attr_name) {
                    Some(value) => {
                        let _ = param.set_from_string(value);
                    }
                    None => param.reset(),
                }
            }
        }
        match pose_raw.text {
            Some(ref text) => {
                if let Err(msg) = reader::set_pose_value(&mut pose_elem, text) {
                    errors.push(location(SdfError::new(
                        ErrorCode::ElementIncorrectType,
                        format!("invalid <pose> override: {msg}"),
                    )));
                }
            }
            None => {
                if let Some(param) = pose_elem.value_mut() {
                    param.reset();
                }
            }
        }
    }

    if let Some(placement) = include_raw
        .child("placement_frame")
        .and_then(|p| p.text.clone())
    {
        if include_raw.child("pose").is_none() {
            errors.push(location(SdfError::new(
                ErrorCode::ModelPlacementFrameInvalid,
                "<pose> is required when specifying the placement_frame element",
            )));
            return false;
        }
        if !is_valid_frame_reference(&placement) {
            errors.push(location(SdfError::new(
                ErrorCode::ReservedName,
                format!(
                    "'{placement}' is reserved; it cannot be used as a value of \
                     element [placement_frame]"
                ),
            )));
        }
        if is_model {
            if let Some(attr) = entity.borrow_mut().attribute_mut("placement_frame") {
                let _ = attr.set_from_string(&placement);
            }
        }
    }

    // Plugins accumulate rather than replace.
    for plugin_raw in include_raw.children_named("plugin") {
        let plugin = raw_plugin_to_element(plugin_raw);
        entity.borrow_mut().insert_element(plugin);
    }

    true
}

fn raw_plugin_to_element(raw: &XmlElement) -> ElementPtr {
    let mut elem = crate::element::Element::passthrough(&raw.name);
    for (key, value) in &raw.attributes {
        elem.add_passthrough_attribute(key, value);
    }
    if let Some(ref text) = raw.text {
        elem.set(text.clone());
    }
    let ptr = elem.into_ptr();
    for child in &raw.children {
        ptr.borrow_mut().insert_element(raw_plugin_to_element(child));
    }
    ptr
}

/// Hoist a merged model's children into `parent` behind a synthetic
/// proxy frame attached to the merged model's canonical link.
fn merge_model(
    entity: &ElementPtr,
    parent: &ElementPtr,
    errors: &mut Errors,
    location: &dyn Fn(SdfError) -> SdfError,
) {
    // A throwaway domain load validates the included model and gives us
    // its canonical link and placement-frame-resolved pose.
    let mut model_errors = Errors::new();
    let model = Model::load(entity, &mut model_errors);
    errors.extend(model_errors);

    let Some((_, canonical_name)) = model.canonical_link_and_relative_name() else {
        errors.push(location(SdfError::new(
            ErrorCode::MergeIncludeUnsupported,
            format!(
                "merged model '{}' has no canonical link; skipping",
                model.name()
            ),
        )));
        return;
    };

    let resolved_pose = frames::resolve_model_pose_with_placement(&model, errors);
    let proxy_name = merged_model_proxy_frame_name(model.name());

    let mut pose_relative_to = model.semantic_pose().relative_to().to_string();
    if pose_relative_to.is_empty() {
        // Leaving it empty would resolve against the proxy's attached-to
        // link rather than the including model frame.
        pose_relative_to = "__model__".to_string();
    }

    {
        let proxy = parent.borrow_mut().add_element("frame");
        let mut proxy_mut = proxy.borrow_mut();
        if let Some(attr) = proxy_mut.attribute_mut("name") {
            let _ = attr.set_from_string(&proxy_name);
        }
        if let Some(attr) = proxy_mut.attribute_mut("attached_to") {
            let _ = attr.set_from_string(&canonical_name);
        }
        drop(proxy_mut);
        let pose_elem = proxy.borrow_mut().get_element("pose");
        let mut pose_mut = pose_elem.borrow_mut();
        pose_mut.set(resolved_pose);
        if let Some(attr) = pose_mut.attribute_mut("relative_to") {
            let _ = attr.set_from_string(&pose_relative_to);
        }
    }

    let rewrite_to_proxy =
        |elem: &ElementPtr, attr_name: &str, update_if_empty: bool, proxy_name: &str| {
            let mut borrowed = elem.borrow_mut();
            let Some(attr) = borrowed.attribute_mut(attr_name) else {
                return;
            };
            let current = attr.as_text();
            if current == "__model__" || (update_if_empty && current.is_empty()) {
                let _ = attr.set_from_string(proxy_name);
            }
        };

    let children: Vec<ElementPtr> = entity.borrow().children().to_vec();
    for child in children {
        let child_name = child.borrow().name().to_string();
        match child_name.as_str() {
            "link" | "model" => {
                // Hoisted bodies re-anchor onto the proxy frame even when
                // they had no pose element.
                let pose = child.borrow_mut().get_element("pose");
                rewrite_to_proxy(&pose, "relative_to", true, &proxy_name);
            }
            "frame" => {
                rewrite_to_proxy(&child, "attached_to", true, &proxy_name);
                if let Some(pose) = child.borrow().find_element("pose") {
                    rewrite_to_proxy(&pose, "relative_to", false, &proxy_name);
                }
            }
            "joint" => {
                if let Some(pose) = child.borrow().find_element("pose") {
                    rewrite_to_proxy(&pose, "relative_to", false, &proxy_name);
                }
                for endpoint in ["parent", "child"] {
                    if let Some(end_elem) = child.borrow().find_element(endpoint) {
                        let mut end_mut = end_elem.borrow_mut();
                        let (value, _) = end_mut.get::<String>("", String::new());
                        if value == "__model__" {
                            end_mut.set(proxy_name.clone());
                        }
                    }
                }
                for axis_name in ["axis", "axis2"] {
                    if let Some(axis) = child.borrow().find_element(axis_name) {
                        if let Some(xyz) = axis.borrow().find_element("xyz") {
                            rewrite_to_proxy(&xyz, "expressed_in", false, &proxy_name);
                        }
                    }
                }
            }
            _ => {}
        }

        if MERGEABLE.contains(&child_name.as_str()) || child_name.contains(':') {
            parent.borrow_mut().insert_element(child);
        }
        // Scalar model properties (static, self_collide, enable_wind) are
        // dropped.
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::error::ErrorCode;
    use std::fs;
    use std::path::Path;

    fn write_files(dir: &Path, files: &[(&str, &str)]) {
        for (name, content) in files {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, content).unwrap();
        }
    }

    fn read_in(dir: &Path, main: &str) -> (Option<reader::Document>, Errors) {
        let mut errors = Errors::new();
        let doc = reader::read_file(&dir.join(main), &ParserConfig::new(), &mut errors);
        (doc, errors)
    }

    const BOX_MODEL: &str = r#"<sdf version="1.9">
        <model name="box">
          <link name="body"><pose>0 0 0.5 0 0 0</pose></link>
        </model>
      </sdf>"#;

    #[test]
    fn test_include_sdf_file() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[
                ("box.sdf", BOX_MODEL),
                (
                    "world.sdf",
                    r#"<sdf version="1.9"><world name="w">
                        <include><uri>box.sdf</uri></include>
                      </world></sdf>"#,
                ),
            ],
        );
        let (doc, errors) = read_in(dir.path(), "world.sdf");
        assert!(errors.is_empty(), "{errors:?}");
        let doc = doc.unwrap();
        let root = doc.root.borrow();
        let world = root.find_element("world").unwrap();
        let model = world.borrow().find_element("model").unwrap();
        assert_eq!(model.borrow().attribute_text("name").as_deref(), Some("box"));
    }

    #[test]
    fn test_include_model_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[
                (
                    "box/model.config",
                    r#"<model><name>box</name><sdf version="1.9">box.sdf</sdf></model>"#,
                ),
                ("box/box.sdf", BOX_MODEL),
                (
                    "world.sdf",
                    r#"<sdf version="1.9"><world name="w">
                        <include><uri>box</uri><name>crate_a</name></include>
                      </world></sdf>"#,
                ),
            ],
        );
        let (doc, errors) = read_in(dir.path(), "world.sdf");
        assert!(errors.is_empty(), "{errors:?}");
        let doc = doc.unwrap();
        let root = doc.root.borrow();
        let world = root.find_element("world").unwrap();
        let model = world.borrow().find_element("model").unwrap();
        assert_eq!(
            model.borrow().attribute_text("name").as_deref(),
            Some("crate_a"),
            "name override applies"
        );
    }

    #[test]
    fn test_include_overrides_pose_and_static() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[
                ("box.sdf", BOX_MODEL),
                (
                    "world.sdf",
                    r#"<sdf version="1.9"><world name="w">
                        <include>
                          <uri>box.sdf</uri>
                          <pose relative_to="anchor">1 2 3 0 0 0</pose>
                          <static>true</static>
                        </include>
                        <frame name="anchor"/>
                      </world></sdf>"#,
                ),
            ],
        );
        let (doc, errors) = read_in(dir.path(), "world.sdf");
        assert!(errors.is_empty(), "{errors:?}");
        let doc = doc.unwrap();
        let root = doc.root.borrow();
        let world = root.find_element("world").unwrap();
        let model = world.borrow().find_element("model").unwrap();
        let pose = model.borrow().find_element("pose").unwrap();
        assert_eq!(
            pose.borrow().attribute_text("relative_to").as_deref(),
            Some("anchor")
        );
        let (is_static, set) = model.borrow().get::<bool>("static", false);
        assert!(is_static);
        assert!(set);
    }

    #[test]
    fn test_missing_uri_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[(
                "world.sdf",
                r#"<sdf version="1.9"><world name="w"><include/></world></sdf>"#,
            )],
        );
        let (_, errors) = read_in(dir.path(), "world.sdf");
        assert!(errors.iter().any(|e| e.code() == ErrorCode::ElementMissing));
    }

    #[test]
    fn test_unresolvable_uri_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[(
                "world.sdf",
                r#"<sdf version="1.9"><world name="w">
                    <include><uri>model://missing</uri></include>
                  </world></sdf>"#,
            )],
        );
        let (_, errors) = read_in(dir.path(), "world.sdf");
        assert!(errors.iter().any(|e| e.code() == ErrorCode::UriLookup));
    }

    #[test]
    fn test_include_cycle_detected() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[(
                "a.sdf",
                r#"<sdf version="1.9"><model name="a">
                    <link name="l"/>
                    <include><uri>a.sdf</uri></include>
                  </model></sdf>"#,
            )],
        );
        let (_, errors) = read_in(dir.path(), "a.sdf");
        assert!(
            errors
                .iter()
                .any(|e| e.code() == ErrorCode::FileRead && e.message().contains("cycle")),
            "{errors:?}"
        );
    }

    #[test]
    fn test_placement_frame_requires_pose() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[
                ("box.sdf", BOX_MODEL),
                (
                    "world.sdf",
                    r#"<sdf version="1.9"><world name="w">
                        <include>
                          <uri>box.sdf</uri>
                          <placement_frame>body</placement_frame>
                        </include>
                      </world></sdf>"#,
                ),
            ],
        );
        let (_, errors) = read_in(dir.path(), "world.sdf");
        assert!(errors
            .iter()
            .any(|e| e.code() == ErrorCode::ModelPlacementFrameInvalid));
    }

    #[test]
    fn test_merge_include_into_world_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[
                ("box.sdf", BOX_MODEL),
                (
                    "world.sdf",
                    r#"<sdf version="1.9"><world name="w">
                        <include merge="true"><uri>box.sdf</uri></include>
                      </world></sdf>"#,
                ),
            ],
        );
        let (_, errors) = read_in(dir.path(), "world.sdf");
        assert!(errors
            .iter()
            .any(|e| e.code() == ErrorCode::MergeIncludeUnsupported));
    }

    #[test]
    fn test_merge_include_hoists_and_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[
                (
                    "child.sdf",
                    r#"<sdf version="1.9">
                        <model name="child">
                          <link name="body"><pose>0 0 0.5 0 0 0</pose></link>
                          <link name="arm"/>
                          <frame name="tip"/>
                          <joint name="j" type="fixed">
                            <parent>__model__</parent><child>arm</child>
                          </joint>
                        </model>
                      </sdf>"#,
                ),
                (
                    "parent.sdf",
                    r#"<sdf version="1.9">
                        <model name="parent">
                          <link name="base"/>
                          <include merge="true">
                            <uri>child.sdf</uri>
                            <pose>1 0 0 0 0 0</pose>
                          </include>
                        </model>
                      </sdf>"#,
                ),
            ],
        );
        let (doc, errors) = read_in(dir.path(), "parent.sdf");
        assert!(errors.is_empty(), "{errors:?}");
        let doc = doc.unwrap();
        let root = doc.root.borrow();
        let parent = root.find_element("model").unwrap();
        let parent = parent.borrow();

        // Hoisted link is a direct child; no nested model remains.
        let link_names: Vec<String> = parent
            .find_elements("link")
            .iter()
            .map(|l| l.borrow().attribute_text("name").unwrap_or_default())
            .collect();
        assert!(link_names.contains(&"base".to_string()));
        assert!(link_names.contains(&"body".to_string()));
        assert!(parent.find_element("model").is_none());

        let proxy_name = merged_model_proxy_frame_name("child");
        let frames = parent.find_elements("frame");
        let proxy = frames
            .iter()
            .find(|f| f.borrow().attribute_text("name").as_deref() == Some(proxy_name.as_str()))
            .expect("proxy frame inserted");
        assert_eq!(
            proxy.borrow().attribute_text("attached_to").as_deref(),
            Some("body")
        );
        let proxy_pose = proxy.borrow().find_element("pose").unwrap();
        assert_eq!(
            proxy_pose.borrow().attribute_text("relative_to").as_deref(),
            Some("__model__")
        );

        // The hoisted link's pose was re-anchored on the proxy frame.
        let body = parent
            .find_elements("link")
            .iter()
            .find(|l| l.borrow().attribute_text("name").as_deref() == Some("body"))
            .cloned()
            .unwrap();
        let body_pose = body.borrow().find_element("pose").unwrap();
        assert_eq!(
            body_pose.borrow().attribute_text("relative_to").as_deref(),
            Some(proxy_name.as_str())
        );

        // The hoisted frame's empty attached_to now names the proxy.
        let tip = frames
            .iter()
            .find(|f| f.borrow().attribute_text("name").as_deref() == Some("tip"))
            .unwrap();
        assert_eq!(
            tip.borrow().attribute_text("attached_to").as_deref(),
            Some(proxy_name.as_str())
        );

        // The hoisted joint's __model__ parent was rewritten.
        let joint = parent.find_element("joint").unwrap();
        let joint_parent = joint.borrow().find_element("parent").unwrap();
        assert_eq!(
            joint_parent.borrow().get::<String>("", String::new()).0,
            proxy_name
        );
    }
}
