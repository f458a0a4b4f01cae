//! Models: named collections of links, joints, frames, and nested models.

use std::rc::Rc;

use crate::element::{Element, ElementPtr};
use crate::error::Errors;
use crate::frames::{ScopeGraphs, SemanticPose};
use crate::schema;

use super::{Frame, Joint, Link};

/// A model. Owns its members exclusively; shares its scope's graphs with
/// them by handle after load.
#[derive(Debug, Clone, Default)]
pub struct Model {
    name: String,
    semantic_pose: SemanticPose,
    canonical_link: String,
    placement_frame: String,
    is_static: bool,
    self_collide: bool,
    allow_auto_disable: bool,
    enable_wind: bool,
    links: Vec<Link>,
    joints: Vec<Joint>,
    frames: Vec<Frame>,
    models: Vec<Model>,
    plugins: Vec<ElementPtr>,
    element: Option<ElementPtr>,
    scope: Option<ScopeGraphs>,
}

impl Model {
    /// Load from a `<model>` element, recursing into nested models.
    pub fn load(elem: &ElementPtr, errors: &mut Errors) -> Self {
        let e = elem.borrow();
        let (raw, relative_to) = super::load_pose(&e);
        let mut model = Self {
            name: super::name_of(&e),
            semantic_pose: SemanticPose::new(raw, relative_to),
            canonical_link: e.attribute_text("canonical_link").unwrap_or_default(),
            placement_frame: e.attribute_text("placement_frame").unwrap_or_default(),
            is_static: e.get("static", false).0,
            self_collide: e.get("self_collide", false).0,
            allow_auto_disable: e.get("allow_auto_disable", true).0,
            enable_wind: e.get("enable_wind", false).0,
            ..Self::default()
        };

        for link in e.find_elements("link") {
            model.links.push(Link::load(&link, errors));
        }
        for joint in e.find_elements("joint") {
            model.joints.push(Joint::load(&joint, errors));
        }
        for frame in e.find_elements("frame") {
            model.frames.push(Frame::load(&frame, errors));
        }
        for nested in e.find_elements("model") {
            model.models.push(Model::load(&nested, errors));
        }
        model.plugins = e.find_elements("plugin");
        drop(e);
        model.element = Some(elem.clone());
        model
    }

    /// Model name (unique within the enclosing scope).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the model name. The scope graphs are not rebuilt; rebuild via
    /// `Root::update_graphs` after renaming.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Authored pose with graph context (in the enclosing scope).
    #[must_use]
    pub fn semantic_pose(&self) -> &SemanticPose {
        &self.semantic_pose
    }

    pub(crate) fn semantic_pose_mut(&mut self) -> &mut SemanticPose {
        &mut self.semantic_pose
    }

    /// The `canonical_link` attribute as authored (may be empty).
    #[must_use]
    pub fn canonical_link(&self) -> &str {
        &self.canonical_link
    }

    /// The `placement_frame` attribute as authored (may be empty).
    #[must_use]
    pub fn placement_frame_name(&self) -> &str {
        &self.placement_frame
    }

    /// Whether the model is static.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Set the static flag.
    pub fn set_static(&mut self, is_static: bool) {
        self.is_static = is_static;
    }

    /// Whether self-collision is enabled.
    #[must_use]
    pub fn self_collide(&self) -> bool {
        self.self_collide
    }

    /// Whether the model may be auto-disabled at rest.
    #[must_use]
    pub fn allow_auto_disable(&self) -> bool {
        self.allow_auto_disable
    }

    /// Whether wind affects the model.
    #[must_use]
    pub fn enable_wind(&self) -> bool {
        self.enable_wind
    }

    /// Links in document order.
    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Joints in document order.
    #[must_use]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Frames in document order.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Nested models in document order.
    #[must_use]
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    /// Plugin subtrees.
    #[must_use]
    pub fn plugins(&self) -> &[ElementPtr] {
        &self.plugins
    }

    /// Link by name within this model (no `::` traversal).
    #[must_use]
    pub fn link_by_name(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.name() == name)
    }

    /// Joint by name.
    #[must_use]
    pub fn joint_by_name(&self, name: &str) -> Option<&Joint> {
        self.joints.iter().find(|j| j.name() == name)
    }

    /// Frame by name.
    #[must_use]
    pub fn frame_by_name(&self, name: &str) -> Option<&Frame> {
        self.frames.iter().find(|f| f.name() == name)
    }

    /// Nested model by name.
    #[must_use]
    pub fn model_by_name(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name() == name)
    }

    /// The canonical link's name relative to this model (`link` or
    /// `nested::link`): the explicit `canonical_link` attribute when set,
    /// otherwise the first link in document order, descending into nested
    /// models. `None` when the model has no links at all.
    #[must_use]
    pub fn canonical_link_relative_name(&self) -> Option<String> {
        if !self.canonical_link.is_empty() {
            return Some(self.canonical_link.clone());
        }
        if let Some(link) = self.links.first() {
            return Some(link.name().to_string());
        }
        for nested in &self.models {
            if let Some(inner) = nested.canonical_link_relative_name() {
                return Some(format!("{}::{inner}", nested.name()));
            }
        }
        None
    }

    /// The canonical link itself plus its relative name, traversing `::`
    /// paths into nested models.
    #[must_use]
    pub fn canonical_link_and_relative_name(&self) -> Option<(&Link, String)> {
        let name = self.canonical_link_relative_name()?;
        let link = self.link_by_scoped_name(&name)?;
        Some((link, name))
    }

    /// Look up a link by a `::`-scoped relative name.
    #[must_use]
    pub fn link_by_scoped_name(&self, scoped: &str) -> Option<&Link> {
        match scoped.split_once("::") {
            None => self.link_by_name(scoped),
            Some((head, rest)) => self.model_by_name(head)?.link_by_scoped_name(rest),
        }
    }

    /// The scope graphs this model participates in, once loaded.
    #[must_use]
    pub fn scope_graphs(&self) -> Option<&ScopeGraphs> {
        self.scope.as_ref()
    }

    pub(crate) fn set_scope(&mut self, graphs: ScopeGraphs) {
        self.scope = Some(graphs);
    }

    /// The element this model was loaded from.
    #[must_use]
    pub fn element(&self) -> Option<&ElementPtr> {
        self.element.as_ref()
    }

    /// Hand scope graph handles to every member, recursively. `prefix` is
    /// the members' qualification prefix within the graphs.
    pub(crate) fn attach_scope(&mut self, graphs: &ScopeGraphs, prefix: &str) {
        self.set_scope(graphs.clone());
        let poses = Rc::clone(&graphs.poses);
        let attached = Rc::clone(&graphs.attached_to);

        for link in &mut self.links {
            let qualified = format!("{prefix}{}", link.name());
            link.semantic_pose_mut().attach_graph(
                Rc::clone(&poses),
                Some(qualified.clone()),
                String::new(),
                prefix.to_string(),
            );
            let (visuals, collisions, sensors, lights, emitters) = link.payloads_mut();
            for visual in visuals {
                visual.semantic_pose_mut().attach_graph(
                    Rc::clone(&poses),
                    None,
                    qualified.clone(),
                    prefix.to_string(),
                );
            }
            for collision in collisions {
                collision.semantic_pose_mut().attach_graph(
                    Rc::clone(&poses),
                    None,
                    qualified.clone(),
                    prefix.to_string(),
                );
            }
            for sensor in sensors {
                sensor.semantic_pose_mut().attach_graph(
                    Rc::clone(&poses),
                    None,
                    qualified.clone(),
                    prefix.to_string(),
                );
            }
            for light in lights {
                light.semantic_pose_mut().attach_graph(
                    Rc::clone(&poses),
                    None,
                    qualified.clone(),
                    prefix.to_string(),
                );
            }
            for emitter in emitters {
                emitter.semantic_pose_mut().attach_graph(
                    Rc::clone(&poses),
                    None,
                    qualified.clone(),
                    prefix.to_string(),
                );
            }
        }

        for joint in &mut self.joints {
            let qualified = format!("{prefix}{}", joint.name());
            joint.semantic_pose_mut().attach_graph(
                Rc::clone(&poses),
                Some(qualified),
                String::new(),
                prefix.to_string(),
            );
        }

        for frame in &mut self.frames {
            let qualified = format!("{prefix}{}", frame.name());
            frame.semantic_pose_mut().attach_graph(
                Rc::clone(&poses),
                Some(qualified.clone()),
                String::new(),
                prefix.to_string(),
            );
            frame.attach_graph(Rc::clone(&attached), qualified);
        }

        for nested in &mut self.models {
            let qualified = format!("{prefix}{}", nested.name());
            nested.semantic_pose_mut().attach_graph(
                Rc::clone(&poses),
                Some(qualified.clone()),
                String::new(),
                prefix.to_string(),
            );
            nested.attach_scope(graphs, &format!("{qualified}::"));
        }
    }

    /// Reconstruct a schema-valid `<model>` element.
    #[must_use]
    pub fn to_element(&self) -> ElementPtr {
        let elem = Element::from_description(&schema::cache().file("model.sdf")).into_ptr();
        super::store_attribute(&elem, "name", &self.name);
        if !self.canonical_link.is_empty() {
            super::store_attribute(&elem, "canonical_link", &self.canonical_link);
        }
        if !self.placement_frame.is_empty() {
            super::store_attribute(&elem, "placement_frame", &self.placement_frame);
        }
        if self.is_static {
            super::store_child(&elem, "static", true);
        }
        if self.self_collide {
            super::store_child(&elem, "self_collide", true);
        }
        if self.enable_wind {
            super::store_child(&elem, "enable_wind", true);
        }
        super::store_pose(
            &elem,
            self.semantic_pose.raw_pose(),
            self.semantic_pose.relative_to(),
        );
        for link in &self.links {
            elem.borrow_mut().insert_element(link.to_element());
        }
        for joint in &self.joints {
            elem.borrow_mut().insert_element(joint.to_element());
        }
        for frame in &self.frames {
            elem.borrow_mut().insert_element(frame.to_element());
        }
        for nested in &self.models {
            elem.borrow_mut().insert_element(nested.to_element());
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

    fn load_model(xml: &str) -> (Model, Errors) {
        let mut errors = Errors::new();
        let doc = reader::read_string(xml, &ParserConfig::new(), &mut errors).unwrap();
        let root = doc.root.borrow();
        let model_elem = root.find_element("model").unwrap();
        let model = Model::load(&model_elem, &mut errors);
        (model, errors)
    }

    #[test]
    fn test_load_model_members() {
        let (model, errors) = load_model(
            r#"<sdf version="1.9"><model name="robot" canonical_link="chassis">
                 <static>false</static>
                 <link name="chassis"/>
                 <link name="wheel"/>
                 <joint name="axle" type="revolute">
                   <parent>chassis</parent><child>wheel</child>
                   <axis><xyz>0 1 0</xyz></axis>
                 </joint>
                 <frame name="mount" attached_to="chassis"/>
                 <model name="arm"><link name="upper"/></model>
               </model></sdf>"#,
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(model.name(), "robot");
        assert_eq!(model.links().len(), 2);
        assert_eq!(model.joints().len(), 1);
        assert_eq!(model.frames().len(), 1);
        assert_eq!(model.models().len(), 1);
        assert_eq!(model.canonical_link(), "chassis");
        assert!(model.link_by_name("wheel").is_some());
        assert!(model.model_by_name("arm").is_some());
    }

    #[test]
    fn test_canonical_link_defaults_to_first_link() {
        let (model, _) = load_model(
            r#"<sdf version="1.9"><model name="m">
                 <link name="first"/><link name="second"/>
               </model></sdf>"#,
        );
        assert_eq!(model.canonical_link_relative_name().as_deref(), Some("first"));
        let (link, name) = model.canonical_link_and_relative_name().unwrap();
        assert_eq!(link.name(), "first");
        assert_eq!(name, "first");
    }

    #[test]
    fn test_canonical_link_descends_into_nested() {
        let (model, _) = load_model(
            r#"<sdf version="1.9"><model name="outer">
                 <model name="inner"><link name="deep"/></model>
               </model></sdf>"#,
        );
        assert_eq!(
            model.canonical_link_relative_name().as_deref(),
            Some("inner::deep")
        );
        let (link, _) = model.canonical_link_and_relative_name().unwrap();
        assert_eq!(link.name(), "deep");
    }

    #[test]
    fn test_no_links_no_canonical() {
        let (model, _) = load_model(
            r#"<sdf version="1.9"><model name="empty"><static>true</static><frame name="f"/></model></sdf>"#,
        );
        assert!(model.canonical_link_relative_name().is_none());
        assert!(model.is_static());
    }

    #[test]
    fn test_scoped_link_lookup() {
        let (model, _) = load_model(
            r#"<sdf version="1.9"><model name="a">
                 <link name="l0"/>
                 <model name="b"><model name="c"><link name="l2"/></model></model>
               </model></sdf>"#,
        );
        assert!(model.link_by_scoped_name("l0").is_some());
        assert_eq!(model.link_by_scoped_name("b::c::l2").unwrap().name(), "l2");
        assert!(model.link_by_scoped_name("b::l2").is_none());
    }

    #[test]
    fn test_round_trip() {
        let (model, _) = load_model(
            r#"<sdf version="1.9"><model name="m" placement_frame="p">
                 <pose>1 2 3 0 0 0</pose>
                 <link name="l"/>
                 <frame name="p" attached_to="l"/>
               </model></sdf>"#,
        );
        let mut errors = Errors::new();
        let reloaded = Model::load(&model.to_element(), &mut errors);
        assert_eq!(reloaded.name(), "m");
        assert_eq!(reloaded.placement_frame_name(), "p");
        assert_eq!(reloaded.links().len(), 1);
        assert_eq!(reloaded.frames().len(), 1);
        assert!(
            (reloaded.semantic_pose().raw_pose().translation.vector
                - model.semantic_pose().raw_pose().translation.vector)
                .norm()
                < 1e-12
        );
    }
}
