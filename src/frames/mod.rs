//! Frame semantics: the two entity-name graphs and the pose resolver.
//!
//! Each Model and World scope owns one [`FrameAttachedToGraph`] and one
//! [`PoseRelativeToGraph`]. Vertices live in an arena indexed by stable
//! ids; entities hold graph handles (`Rc`) plus their vertex name, never
//! references to each other. Nested-model members are registered under
//! `::`-qualified names, so one arena per scope covers the whole subtree.

mod attached_to;
mod pose_graph;
mod scope;

pub use attached_to::FrameAttachedToGraph;
pub use pose_graph::PoseRelativeToGraph;
pub(crate) use scope::{build_model_scope, build_world_scope, resolve_model_pose_with_placement};

use std::rc::Rc;

use crate::error::{ErrorCode, SdfError};
use crate::pose::Pose;

/// What a graph vertex stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKind {
    /// The scope root: `__model__` or `world`.
    ScopeRoot,
    /// A link.
    Link,
    /// A joint.
    Joint,
    /// An explicit frame.
    Frame,
    /// A nested model's implicit frame.
    Model,
}

/// A named vertex in a scope graph.
#[derive(Debug, Clone)]
pub struct ScopeVertex {
    /// Qualified name within the scope (e.g. `nested::link`).
    pub name: String,
    /// Entity kind.
    pub kind: VertexKind,
}

/// Both graphs of one scope, shared among the scope's entities.
#[derive(Debug, Clone)]
pub struct ScopeGraphs {
    /// The frame-attached-to graph.
    pub attached_to: Rc<FrameAttachedToGraph>,
    /// The pose-relative-to graph.
    pub poses: Rc<PoseRelativeToGraph>,
}

/// An entity's authored pose plus the graph context needed to resolve it
/// against any frame of the scope.
///
/// The graph handle is attached by the containing scope's loader after
/// construction; until then only the raw pose is available.
#[derive(Debug, Clone)]
pub struct SemanticPose {
    raw: Pose,
    relative_to: String,
    /// Vertex name when this entity is itself a graph vertex.
    graph_name: Option<String>,
    /// Qualified frame poses default-resolve against when `relative_to`
    /// is empty and the entity is not a vertex (e.g. a visual's link).
    /// Empty means the scope root.
    default_relative_to: String,
    /// Scope prefix for qualifying relative names (`""` at the scope
    /// root, `"m::"` inside nested model `m`).
    prefix: String,
    graph: Option<Rc<PoseRelativeToGraph>>,
}

impl Default for SemanticPose {
    fn default() -> Self {
        Self {
            raw: Pose::identity(),
            relative_to: String::new(),
            graph_name: None,
            default_relative_to: String::new(),
            prefix: String::new(),
            graph: None,
        }
    }
}

impl SemanticPose {
    /// Create from the authored pose.
    #[must_use]
    pub fn new(raw: Pose, relative_to: impl Into<String>) -> Self {
        Self {
            raw,
            relative_to: relative_to.into(),
            ..Self::default()
        }
    }

    /// The pose as authored, before any graph resolution.
    #[must_use]
    pub fn raw_pose(&self) -> &Pose {
        &self.raw
    }

    /// Replace the raw pose. The graphs are not rebuilt; callers that
    /// mutate a loaded document must rebuild via `Root::update_graphs`.
    pub fn set_raw_pose(&mut self, pose: Pose) {
        self.raw = pose;
    }

    /// The authored `relative_to` frame name (may be empty).
    #[must_use]
    pub fn relative_to(&self) -> &str {
        &self.relative_to
    }

    /// Replace the `relative_to` frame name.
    pub fn set_relative_to(&mut self, relative_to: impl Into<String>) {
        self.relative_to = relative_to.into();
    }

    /// Attach the scope graph after load. `graph_name` is the entity's
    /// qualified vertex name when it has one; `default_relative_to` the
    /// qualified fallback frame; `prefix` the entity's scope prefix.
    pub(crate) fn attach_graph(
        &mut self,
        graph: Rc<PoseRelativeToGraph>,
        graph_name: Option<String>,
        default_relative_to: String,
        prefix: String,
    ) {
        self.graph = Some(graph);
        self.graph_name = graph_name;
        self.default_relative_to = default_relative_to;
        self.prefix = prefix;
    }

    /// Whether a graph handle has been attached.
    #[must_use]
    pub fn has_graph(&self) -> bool {
        self.graph.is_some()
    }

    /// Resolve this entity's pose expressed in `to`. An empty `to` means
    /// the scope root (`__model__` or `world`).
    ///
    /// # Errors
    ///
    /// `PoseRelativeToInvalid` when no graph is attached, `FrameUnknown`
    /// for unknown frame names, cycle errors if the graph is malformed.
    pub fn resolve(&self, to: &str) -> Result<Pose, SdfError> {
        let Some(ref graph) = self.graph else {
            return Err(SdfError::new(
                ErrorCode::PoseRelativeToInvalid,
                "pose cannot be resolved: no pose graph is attached",
            ));
        };

        let to_id = lookup_frame(graph, to, &self.prefix)?;

        let x_root_entity = match self.graph_name {
            Some(ref name) => {
                let id = graph.vertex(name).ok_or_else(|| {
                    SdfError::new(
                        ErrorCode::FrameUnknown,
                        format!("frame '{name}' is not known in this scope"),
                    )
                })?;
                graph.pose_in_root(id)?
            }
            None => {
                let base = if self.relative_to.is_empty() {
                    self.default_relative_to.clone()
                } else {
                    qualify(&self.relative_to, &self.prefix)
                };
                let x_root_base = if base.is_empty() {
                    Pose::identity()
                } else {
                    let id = lookup_frame(graph, &base, "")?;
                    graph.pose_in_root(id)?
                };
                x_root_base * self.raw
            }
        };

        let x_root_to = graph.pose_in_root(to_id)?;
        Ok(x_root_to.inverse() * x_root_entity)
    }

    /// Resolve against the scope root.
    ///
    /// # Errors
    ///
    /// As for [`Self::resolve`].
    pub fn resolve_default(&self) -> Result<Pose, SdfError> {
        self.resolve("")
    }
}

/// Qualify a scope-relative frame name. The keywords `__model__` and
/// `world` are left for [`lookup_frame`] to interpret.
fn qualify(name: &str, prefix: &str) -> String {
    if name.is_empty() || name == "__model__" || name == "world" || prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{name}")
    }
}

/// Resolve a (possibly keyword) frame name to a vertex id. Empty names
/// mean the scope root; `__model__` means the enclosing model frame
/// (the root in a model scope, the prefix vertex inside a nested model);
/// `world` is only valid in a world scope.
fn lookup_frame(
    graph: &PoseRelativeToGraph,
    name: &str,
    prefix: &str,
) -> Result<usize, SdfError> {
    if name.is_empty() {
        return Ok(graph.root());
    }
    if name == "__model__" {
        if !prefix.is_empty() {
            let model_vertex = prefix.trim_end_matches(':');
            return graph.vertex(model_vertex).ok_or_else(|| {
                SdfError::new(
                    ErrorCode::FrameUnknown,
                    format!("no model frame for scope prefix '{prefix}'"),
                )
            });
        }
        if graph.root_name() == "__model__" {
            return Ok(graph.root());
        }
        return Err(SdfError::new(
            ErrorCode::FrameUnknown,
            "'__model__' cannot be referenced from a world scope",
        ));
    }
    if name == "world" {
        if graph.root_name() == "world" {
            return Ok(graph.root());
        }
        return Err(SdfError::new(
            ErrorCode::FrameUnknown,
            "'world' cannot be referenced from a model scope",
        ));
    }
    let qualified = qualify(name, prefix);
    graph.vertex(&qualified).ok_or_else(|| {
        SdfError::new(
            ErrorCode::FrameUnknown,
            format!("frame '{name}' is not known in this scope"),
        )
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Translation3;

    fn translation(x: f64, y: f64, z: f64) -> Pose {
        Pose::from_parts(
            Translation3::new(x, y, z),
            nalgebra::UnitQuaternion::identity(),
        )
    }

    fn graph() -> Rc<PoseRelativeToGraph> {
        let mut g = PoseRelativeToGraph::new("__model__", VertexKind::ScopeRoot);
        let l1 = g.add_vertex("l1", VertexKind::Link);
        let f = g.add_vertex("f", VertexKind::Frame);
        g.set_edge(l1, g.root(), translation(1.0, 0.0, 0.0));
        g.set_edge(f, l1, translation(0.0, 1.0, 0.0));
        Rc::new(g)
    }

    #[test]
    fn test_unattached_resolve_errors() {
        let pose = SemanticPose::new(Pose::identity(), "");
        let err = pose.resolve("").unwrap_err();
        assert_eq!(err.code(), ErrorCode::PoseRelativeToInvalid);
    }

    #[test]
    fn test_vertex_entity_resolves() {
        let mut pose = SemanticPose::new(translation(0.0, 1.0, 0.0), "l1");
        pose.attach_graph(graph(), Some("f".to_string()), String::new(), String::new());
        let resolved = pose.resolve("").unwrap();
        assert_relative_eq!(resolved.translation.vector.x, 1.0);
        assert_relative_eq!(resolved.translation.vector.y, 1.0);
    }

    #[test]
    fn test_invariant_resolve_to_relative_to_is_raw() {
        let raw = translation(0.0, 1.0, 0.0);
        let mut pose = SemanticPose::new(raw, "l1");
        pose.attach_graph(graph(), Some("f".to_string()), String::new(), String::new());
        let resolved = pose.resolve("l1").unwrap();
        assert_relative_eq!(
            (resolved.inverse() * raw).translation.vector.norm(),
            0.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_non_vertex_entity_default_base() {
        // A visual-like entity: not a vertex, defaults to its link frame.
        let mut pose = SemanticPose::new(translation(0.0, 0.0, 2.0), "");
        pose.attach_graph(graph(), None, "l1".to_string(), String::new());
        let resolved = pose.resolve("").unwrap();
        assert_relative_eq!(resolved.translation.vector.x, 1.0);
        assert_relative_eq!(resolved.translation.vector.z, 2.0);
    }

    #[test]
    fn test_world_keyword_rejected_in_model_scope() {
        let mut pose = SemanticPose::new(Pose::identity(), "");
        pose.attach_graph(graph(), Some("f".to_string()), String::new(), String::new());
        let err = pose.resolve("world").unwrap_err();
        assert_eq!(err.code(), ErrorCode::FrameUnknown);
    }

    #[test]
    fn test_model_keyword_is_scope_root() {
        let mut pose = SemanticPose::new(Pose::identity(), "");
        pose.attach_graph(graph(), Some("l1".to_string()), String::new(), String::new());
        let via_keyword = pose.resolve("__model__").unwrap();
        let via_default = pose.resolve("").unwrap();
        assert_eq!(via_keyword, via_default);
    }
}
