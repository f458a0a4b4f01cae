//! The pose-relative-to graph.
//!
//! One graph per scope. Vertices are the scope's named entities plus the
//! scope root (`__model__` or `world`); nested-model members appear under
//! `::`-qualified names so cross-scope references resolve in one arena. An
//! edge X → Y labeled with pose P means "X's origin expressed in Y is P".
//! Every vertex except the root has exactly one outgoing edge; validation
//! checks the graph is acyclic and that every vertex reaches the root.

use std::collections::HashMap;

use crate::error::{ErrorCode, Errors, SdfError};
use crate::pose::Pose;

use super::{ScopeVertex, VertexKind};

/// Directed pose graph over a scope's named entities.
#[derive(Debug, Default)]
pub struct PoseRelativeToGraph {
    vertices: Vec<ScopeVertex>,
    names: HashMap<String, usize>,
    edges: Vec<Option<(usize, Pose)>>,
    root: usize,
}

impl PoseRelativeToGraph {
    /// Create a graph whose root vertex carries the given name
    /// (`__model__` or `world`).
    #[must_use]
    pub fn new(root_name: &str, root_kind: VertexKind) -> Self {
        let mut graph = Self::default();
        graph.root = graph.add_vertex(root_name, root_kind);
        graph
    }

    /// The scope-root vertex id.
    #[must_use]
    pub fn root(&self) -> usize {
        self.root
    }

    /// The scope-root vertex name.
    #[must_use]
    pub fn root_name(&self) -> &str {
        &self.vertices[self.root].name
    }

    /// Add a vertex, returning its stable index.
    pub fn add_vertex(&mut self, name: &str, kind: VertexKind) -> usize {
        let id = self.vertices.len();
        self.vertices.push(ScopeVertex {
            name: name.to_string(),
            kind,
        });
        self.edges.push(None);
        self.names.insert(name.to_string(), id);
        id
    }

    /// Install the single outgoing edge of `from`: its pose expressed in
    /// `to`.
    pub fn set_edge(&mut self, from: usize, to: usize, pose: Pose) {
        self.edges[from] = Some((to, pose));
    }

    /// Vertex id by (qualified) name.
    #[must_use]
    pub fn vertex(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Vertex data by id.
    #[must_use]
    pub fn vertex_data(&self, id: usize) -> &ScopeVertex {
        &self.vertices[id]
    }

    /// All vertex ids.
    pub fn vertex_ids(&self) -> impl Iterator<Item = usize> {
        0..self.vertices.len()
    }

    /// Pose of `id` expressed in the scope root, walking the edge chain.
    ///
    /// # Errors
    ///
    /// `PoseRelativeToCycle` if the walk revisits a vertex;
    /// `PoseRelativeToInvalid` if the chain dead-ends before the root.
    pub fn pose_in_root(&self, id: usize) -> Result<Pose, SdfError> {
        let mut result = Pose::identity();
        let mut current = id;
        let mut hops = 0usize;
        while current != self.root {
            let Some((target, pose)) = self.edges[current] else {
                return Err(SdfError::new(
                    ErrorCode::PoseRelativeToInvalid,
                    format!(
                        "vertex '{}' does not reach the scope root '{}'",
                        self.vertices[id].name,
                        self.root_name()
                    ),
                ));
            };
            result = pose * result;
            current = target;
            hops += 1;
            if hops > self.vertices.len() {
                return Err(SdfError::new(
                    ErrorCode::PoseRelativeToCycle,
                    format!(
                        "cycle detected resolving pose of '{}'",
                        self.vertices[id].name
                    ),
                ));
            }
        }
        Ok(result)
    }

    /// Pose of `from` expressed in `ancestor`, walking only the portion of
    /// the chain between them. Used for placement-frame composition, where
    /// the ancestor's own outgoing edge may not exist yet.
    ///
    /// # Errors
    ///
    /// `PoseRelativeToInvalid` if `ancestor` is not on `from`'s chain to
    /// the root.
    pub fn pose_relative_to_ancestor(
        &self,
        from: usize,
        ancestor: usize,
    ) -> Result<Pose, SdfError> {
        let mut result = Pose::identity();
        let mut current = from;
        let mut hops = 0usize;
        while current != ancestor {
            let Some((target, pose)) = self.edges[current] else {
                return Err(SdfError::new(
                    ErrorCode::PoseRelativeToInvalid,
                    format!(
                        "'{}' is not in the subtree of '{}'",
                        self.vertices[from].name, self.vertices[ancestor].name
                    ),
                ));
            };
            result = pose * result;
            current = target;
            hops += 1;
            if hops > self.vertices.len() {
                return Err(SdfError::new(
                    ErrorCode::PoseRelativeToCycle,
                    format!(
                        "cycle detected resolving pose of '{}'",
                        self.vertices[from].name
                    ),
                ));
            }
        }
        Ok(result)
    }

    /// Pose of `from` expressed in `to`. Empty `to` means the scope root.
    ///
    /// # Errors
    ///
    /// `FrameUnknown` when either name has no vertex; cycle and
    /// reachability failures as in [`Self::pose_in_root`].
    pub fn resolve(&self, from: &str, to: &str) -> Result<Pose, SdfError> {
        let from_id = self.vertex(from).ok_or_else(|| {
            SdfError::new(
                ErrorCode::FrameUnknown,
                format!("frame '{from}' is not known in this scope"),
            )
        })?;
        let to_id = if to.is_empty() {
            self.root
        } else {
            self.vertex(to).ok_or_else(|| {
                SdfError::new(
                    ErrorCode::FrameUnknown,
                    format!("frame '{to}' is not known in this scope"),
                )
            })?
        };
        if from_id == to_id {
            return Ok(Pose::identity());
        }
        let x_root_from = self.pose_in_root(from_id)?;
        let x_root_to = self.pose_in_root(to_id)?;
        Ok(x_root_to.inverse() * x_root_from)
    }

    /// Check acyclicity and root-reachability for every vertex.
    pub fn validate(&self, errors: &mut Errors) {
        for id in self.vertex_ids() {
            if id == self.root {
                continue;
            }
            if let Err(e) = self.pose_in_root(id) {
                errors.push(e);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Translation3;

    fn translation(x: f64, y: f64, z: f64) -> Pose {
        Pose::from_parts(Translation3::new(x, y, z), nalgebra::UnitQuaternion::identity())
    }

    fn chain_graph() -> PoseRelativeToGraph {
        // root <- a (1,0,0) <- b (0,2,0); c (0,0,3) -> root
        let mut g = PoseRelativeToGraph::new("__model__", VertexKind::ScopeRoot);
        let a = g.add_vertex("a", VertexKind::Link);
        let b = g.add_vertex("b", VertexKind::Frame);
        let c = g.add_vertex("c", VertexKind::Frame);
        g.set_edge(a, g.root(), translation(1.0, 0.0, 0.0));
        g.set_edge(b, a, translation(0.0, 2.0, 0.0));
        g.set_edge(c, g.root(), translation(0.0, 0.0, 3.0));
        g
    }

    #[test]
    fn test_pose_in_root_composes() {
        let g = chain_graph();
        let b = g.vertex("b").unwrap();
        let pose = g.pose_in_root(b).unwrap();
        assert_relative_eq!(pose.translation.vector.x, 1.0);
        assert_relative_eq!(pose.translation.vector.y, 2.0);
    }

    #[test]
    fn test_resolve_between_vertices() {
        let g = chain_graph();
        // b in c = X_root_c^-1 * X_root_b = (1, 2, -3)
        let pose = g.resolve("b", "c").unwrap();
        assert_relative_eq!(pose.translation.vector.x, 1.0);
        assert_relative_eq!(pose.translation.vector.y, 2.0);
        assert_relative_eq!(pose.translation.vector.z, -3.0);
    }

    #[test]
    fn test_resolve_round_trip_is_identity() {
        let g = chain_graph();
        let ab = g.resolve("a", "b").unwrap();
        let ba = g.resolve("b", "a").unwrap();
        let composed = ab * ba;
        assert_relative_eq!(composed.translation.vector.norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(composed.rotation.angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_resolve_same_vertex_identity() {
        let g = chain_graph();
        assert_eq!(g.resolve("a", "a").unwrap(), Pose::identity());
    }

    #[test]
    fn test_unknown_frame() {
        let g = chain_graph();
        let err = g.resolve("nope", "").unwrap_err();
        assert_eq!(err.code(), ErrorCode::FrameUnknown);
    }

    #[test]
    fn test_cycle_detected() {
        let mut g = PoseRelativeToGraph::new("__model__", VertexKind::ScopeRoot);
        let a = g.add_vertex("a", VertexKind::Frame);
        let b = g.add_vertex("b", VertexKind::Frame);
        g.set_edge(a, b, Pose::identity());
        g.set_edge(b, a, Pose::identity());
        let mut errors = Errors::new();
        g.validate(&mut errors);
        assert!(errors
            .iter()
            .any(|e| e.code() == ErrorCode::PoseRelativeToCycle));
    }

    #[test]
    fn test_unreachable_vertex() {
        let mut g = PoseRelativeToGraph::new("world", VertexKind::ScopeRoot);
        g.add_vertex("floating", VertexKind::Frame);
        let mut errors = Errors::new();
        g.validate(&mut errors);
        assert!(errors
            .iter()
            .any(|e| e.code() == ErrorCode::PoseRelativeToInvalid));
    }

    #[test]
    fn test_pose_relative_to_ancestor_skips_missing_root_edge() {
        // m has no outgoing edge yet (two-pass placement build); resolving
        // p relative to m must still work.
        let mut g = PoseRelativeToGraph::new("world", VertexKind::ScopeRoot);
        let m = g.add_vertex("m", VertexKind::Model);
        let p = g.add_vertex("m::p", VertexKind::Frame);
        g.set_edge(p, m, translation(1.0, 0.0, 0.0));
        let pose = g.pose_relative_to_ancestor(p, m).unwrap();
        assert_relative_eq!(pose.translation.vector.x, 1.0);
        assert!(g.pose_relative_to_ancestor(m, p).is_err());
    }
}
