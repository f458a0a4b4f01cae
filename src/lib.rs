//! SDF (Simulation Description Format) parser, validator, and object model.
//!
//! This crate loads the XML-based SDF scene-description format used to
//! describe robotic simulation worlds and answers coordinate-frame
//! queries against the loaded document.
//!
//! # Features
//!
//! - Schema-checked parsing driven by embedded element descriptions
//! - Forward conversion of documents authored in older schema versions
//! - `<include>` composition with merge semantics and frame-reference
//!   rewriting
//! - A typed domain model (worlds, models, links, joints, frames, lights,
//!   sensors, particle emitters) with XML round-tripping
//! - Frame semantics: per-scope attached-to and pose graphs, validated
//!   for acyclicity and sink uniqueness, with a semantic pose resolver
//!
//! # Example
//!
//! ```
//! use sdformat::{ParserConfig, Root};
//!
//! let sdf = r#"
//!     <sdf version="1.9">
//!       <model name="robot">
//!         <link name="base"/>
//!         <link name="arm"><pose>0 0 1 0 0 0</pose></link>
//!         <frame name="tool" attached_to="arm">
//!           <pose relative_to="arm">0.1 0 0 0 0 0</pose>
//!         </frame>
//!       </model>
//!     </sdf>
//! "#;
//!
//! let mut root = Root::new();
//! let errors = root.load_string(sdf, ParserConfig::global());
//! assert!(errors.is_empty());
//!
//! let model = root.model().expect("top-level model");
//! assert_eq!(model.name(), "robot");
//!
//! // Pose of the tool frame expressed in the model frame.
//! let frame = model.frame_by_name("tool").expect("frame");
//! let pose = frame.semantic_pose().resolve_default().expect("resolves");
//! assert!((pose.translation.vector.z - 1.0).abs() < 1e-12);
//! ```
//!
//! # Scope
//!
//! No physics, no rendering, no persistence beyond XML round-tripping.
//! The URDF translator is an injectable collaborator (see [`urdf`]); USD
//! interop and CLI bindings live elsewhere.

#![doc(html_root_url = "https://docs.rs/sdformat/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::should_implement_trait,
    clippy::items_after_statements,
    clippy::needless_pass_by_value,
    clippy::map_unwrap_or,
    clippy::option_if_let_else,
    clippy::redundant_closure_for_method_calls,
    clippy::field_reassign_with_default,
    clippy::doc_markdown,
    clippy::too_many_lines,
    clippy::use_self
)]

mod include;

pub mod config;
pub mod converter;
pub mod dom;
pub mod element;
pub mod error;
pub mod frames;
pub mod pose;
pub mod reader;
pub mod schema;
pub mod urdf;
pub mod value;
pub mod xml;

pub use config::{CustomModelParser, EnforcementPolicy, ParserConfig, UriLookup};
pub use dom::{
    Collision, Frame, Inertial, Joint, JointAxis, JointType, Light, LightType, Link, Material,
    Model, ParticleEmitter, ParticleEmitterType, Root, Sensor, SensorType, SpotCone, Visual,
    World,
};
pub use element::{Element, ElementPtr, Param};
pub use error::{ErrorCode, Errors, SdfError};
pub use frames::{
    FrameAttachedToGraph, PoseRelativeToGraph, ScopeGraphs, ScopeVertex, SemanticPose, VertexKind,
};
pub use include::merged_model_proxy_frame_name;
pub use pose::{Pose, RotationFormat};
pub use reader::{is_reserved_name, is_valid_frame_reference, read_file, read_string, Document};
pub use schema::SDF_VERSION;
pub use value::{Value, ValueType};
