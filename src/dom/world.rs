//! Worlds: complete simulation environments.

use std::rc::Rc;

use nalgebra::Vector3;

use crate::element::{Element, ElementPtr};
use crate::error::Errors;
use crate::frames::ScopeGraphs;
use crate::schema;

use super::{Frame, Light, Model};

/// A world: an ordered set of models, frames, and lights plus ambient
/// physics properties.
#[derive(Debug, Clone)]
pub struct World {
    name: String,
    gravity: Vector3<f64>,
    magnetic_field: Vector3<f64>,
    wind_linear_velocity: Vector3<f64>,
    audio_device: String,
    models: Vec<Model>,
    frames: Vec<Frame>,
    lights: Vec<Light>,
    plugins: Vec<ElementPtr>,
    element: Option<ElementPtr>,
    scope: Option<ScopeGraphs>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            name: String::new(),
            gravity: Vector3::new(0.0, 0.0, -9.8),
            magnetic_field: Vector3::new(5.5645e-6, 22.8758e-6, -42.3884e-6),
            wind_linear_velocity: Vector3::zeros(),
            audio_device: "default".to_string(),
            models: Vec::new(),
            frames: Vec::new(),
            lights: Vec::new(),
            plugins: Vec::new(),
            element: None,
            scope: None,
        }
    }
}

impl World {
    /// Load from a `<world>` element.
    pub fn load(elem: &ElementPtr, errors: &mut Errors) -> Self {
        let e = elem.borrow();
        let mut world = Self {
            name: super::name_of(&e),
            ..Self::default()
        };
        world.gravity = e.get("gravity", world.gravity).0;
        world.magnetic_field = e.get("magnetic_field", world.magnetic_field).0;
        if let Some(wind) = e.find_element("wind") {
            world.wind_linear_velocity =
                wind.borrow().get("linear_velocity", Vector3::zeros()).0;
        }
        if let Some(audio) = e.find_element("audio") {
            world.audio_device = audio.borrow().get("device", "default".to_string()).0;
        }
        for model in e.find_elements("model") {
            world.models.push(Model::load(&model, errors));
        }
        for frame in e.find_elements("frame") {
            world.frames.push(Frame::load(&frame, errors));
        }
        for light in e.find_elements("light") {
            world.lights.push(Light::load(&light, errors));
        }
        world.plugins = e.find_elements("plugin");
        drop(e);
        world.element = Some(elem.clone());
        world
    }

    /// World name (unique among sibling worlds).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the world name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Gravitational acceleration.
    #[must_use]
    pub fn gravity(&self) -> Vector3<f64> {
        self.gravity
    }

    /// Set the gravity vector.
    pub fn set_gravity(&mut self, gravity: Vector3<f64>) {
        self.gravity = gravity;
    }

    /// Ambient magnetic field.
    #[must_use]
    pub fn magnetic_field(&self) -> Vector3<f64> {
        self.magnetic_field
    }

    /// Mean wind velocity.
    #[must_use]
    pub fn wind_linear_velocity(&self) -> Vector3<f64> {
        self.wind_linear_velocity
    }

    /// Audio output device name.
    #[must_use]
    pub fn audio_device(&self) -> &str {
        &self.audio_device
    }

    /// Models in document order.
    #[must_use]
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    /// Frames in document order.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Lights in document order.
    #[must_use]
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Plugin subtrees.
    #[must_use]
    pub fn plugins(&self) -> &[ElementPtr] {
        &self.plugins
    }

    /// Model by name.
    #[must_use]
    pub fn model_by_name(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name() == name)
    }

    /// Frame by name.
    #[must_use]
    pub fn frame_by_name(&self, name: &str) -> Option<&Frame> {
        self.frames.iter().find(|f| f.name() == name)
    }

    /// Light by name.
    #[must_use]
    pub fn light_by_name(&self, name: &str) -> Option<&Light> {
        self.lights.iter().find(|l| l.name() == name)
    }

    /// The world scope's graphs, once loaded.
    #[must_use]
    pub fn scope_graphs(&self) -> Option<&ScopeGraphs> {
        self.scope.as_ref()
    }

    /// The element this world was loaded from.
    #[must_use]
    pub fn element(&self) -> Option<&ElementPtr> {
        self.element.as_ref()
    }

    /// Hand scope graph handles to every member.
    pub(crate) fn attach_scope(&mut self, graphs: &ScopeGraphs) {
        self.scope = Some(graphs.clone());
        let poses = Rc::clone(&graphs.poses);
        let attached = Rc::clone(&graphs.attached_to);

        for model in &mut self.models {
            let name = model.name().to_string();
            model.semantic_pose_mut().attach_graph(
                Rc::clone(&poses),
                Some(name.clone()),
                String::new(),
                String::new(),
            );
            model.attach_scope(graphs, &format!("{name}::"));
        }
        for frame in &mut self.frames {
            let name = frame.name().to_string();
            frame.semantic_pose_mut().attach_graph(
                Rc::clone(&poses),
                Some(name.clone()),
                String::new(),
                String::new(),
            );
            frame.attach_graph(Rc::clone(&attached), name);
        }
        for light in &mut self.lights {
            light.semantic_pose_mut().attach_graph(
                Rc::clone(&poses),
                None,
                String::new(),
                String::new(),
            );
        }
    }

    /// Reconstruct a schema-valid `<world>` element.
    #[must_use]
    pub fn to_element(&self) -> ElementPtr {
        let elem = Element::from_description(&schema::cache().file("world.sdf")).into_ptr();
        super::store_attribute(&elem, "name", &self.name);
        super::store_child(&elem, "gravity", self.gravity);
        for model in &self.models {
            elem.borrow_mut().insert_element(model.to_element());
        }
        for frame in &self.frames {
            elem.borrow_mut().insert_element(frame.to_element());
        }
        for light in &self.lights {
            elem.borrow_mut().insert_element(light.to_element());
        }
        for plugin in &self.plugins {
            elem.borrow_mut()
                .insert_element(plugin.borrow().deep_clone().into_ptr());
        }
        elem
    }
}
