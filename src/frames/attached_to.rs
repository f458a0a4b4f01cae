//! The frame-attached-to graph.
//!
//! One graph per scope, over the same vertex arena layout as the pose
//! graph. An edge X → Y means "X is attached to Y". Attachment is
//! functional (each vertex has at most one outgoing edge), so validation
//! amounts to: the walk from every vertex terminates (no cycle) and
//! terminates at a permitted sink. Links are always permitted sinks; the
//! builder additionally permits the world root and the model frame of a
//! static model with no links.

use std::collections::HashMap;

use crate::error::{ErrorCode, Errors, SdfError};

use super::{ScopeVertex, VertexKind};

/// Directed attachment graph over a scope's named entities.
#[derive(Debug, Default)]
pub struct FrameAttachedToGraph {
    vertices: Vec<ScopeVertex>,
    names: HashMap<String, usize>,
    edges: Vec<Option<usize>>,
    sink_allowed: Vec<bool>,
    root: usize,
}

impl FrameAttachedToGraph {
    /// Create a graph whose root vertex carries the given name.
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

    /// Add a vertex, returning its stable index.
    pub fn add_vertex(&mut self, name: &str, kind: VertexKind) -> usize {
        let id = self.vertices.len();
        self.vertices.push(ScopeVertex {
            name: name.to_string(),
            kind,
        });
        self.edges.push(None);
        self.sink_allowed.push(matches!(kind, VertexKind::Link));
        self.names.insert(name.to_string(), id);
        id
    }

    /// Install the attachment edge of `from`.
    pub fn set_edge(&mut self, from: usize, to: usize) {
        self.edges[from] = Some(to);
    }

    /// Permit walks to legally terminate at this vertex even though it is
    /// not a link (world root; static model frames).
    pub fn allow_sink(&mut self, id: usize) {
        self.sink_allowed[id] = true;
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

    /// Walk the attachment chain from `name` to its sink, returning the
    /// sink's name. For a link this is the link itself.
    ///
    /// # Errors
    ///
    /// `FrameUnknown` for an unknown name, `FrameAttachedToCycle` when the
    /// walk revisits a vertex.
    pub fn resolve_attached_to(&self, name: &str) -> Result<String, SdfError> {
        let start = self.vertex(name).ok_or_else(|| {
            SdfError::new(
                ErrorCode::FrameUnknown,
                format!("frame '{name}' is not known in this scope"),
            )
        })?;
        let sink = self.walk_to_sink(start)?;
        Ok(self.vertices[sink].name.clone())
    }

    pub(crate) fn walk_to_sink(&self, start: usize) -> Result<usize, SdfError> {
        let mut current = start;
        let mut hops = 0usize;
        while let Some(next) = self.edges[current] {
            current = next;
            hops += 1;
            if hops > self.vertices.len() {
                return Err(SdfError::new(
                    ErrorCode::FrameAttachedToCycle,
                    format!(
                        "cycle detected in frame-attached-to chain of '{}'",
                        self.vertices[start].name
                    ),
                ));
            }
        }
        Ok(current)
    }

    /// Check that every vertex's walk terminates at a permitted sink.
    pub fn validate(&self, errors: &mut Errors) {
        for id in 0..self.vertices.len() {
            match self.walk_to_sink(id) {
                Err(e) => errors.push(e),
                Ok(sink) => {
                    if !self.sink_allowed[sink] {
                        errors.push(SdfError::new(
                            ErrorCode::FrameAttachedToInvalid,
                            format!(
                                "the attachment chain of '{}' ends at '{}', which is not a link",
                                self.vertices[id].name, self.vertices[sink].name
                            ),
                        ));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn model_graph() -> FrameAttachedToGraph {
        let mut g = FrameAttachedToGraph::new("__model__", VertexKind::ScopeRoot);
        let l1 = g.add_vertex("l1", VertexKind::Link);
        let f1 = g.add_vertex("f1", VertexKind::Frame);
        let f2 = g.add_vertex("f2", VertexKind::Frame);
        let j = g.add_vertex("j", VertexKind::Joint);
        g.set_edge(g.root(), l1);
        g.set_edge(f1, g.root());
        g.set_edge(f2, f1);
        g.set_edge(j, l1);
        g
    }

    #[test]
    fn test_chain_resolves_to_link() {
        let g = model_graph();
        assert_eq!(g.resolve_attached_to("f2").unwrap(), "l1");
        assert_eq!(g.resolve_attached_to("j").unwrap(), "l1");
        assert_eq!(g.resolve_attached_to("l1").unwrap(), "l1");
        assert_eq!(g.resolve_attached_to("__model__").unwrap(), "l1");
    }

    #[test]
    fn test_valid_graph_passes() {
        let g = model_graph();
        let mut errors = Errors::new();
        g.validate(&mut errors);
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_cycle_reported() {
        let mut g = FrameAttachedToGraph::new("__model__", VertexKind::ScopeRoot);
        let l = g.add_vertex("l", VertexKind::Link);
        let f1 = g.add_vertex("f1", VertexKind::Frame);
        let f2 = g.add_vertex("f2", VertexKind::Frame);
        g.set_edge(g.root(), l);
        g.set_edge(f1, f2);
        g.set_edge(f2, f1);
        let mut errors = Errors::new();
        g.validate(&mut errors);
        assert!(errors
            .iter()
            .any(|e| e.code() == ErrorCode::FrameAttachedToCycle));
    }

    #[test]
    fn test_non_link_sink_reported() {
        let mut g = FrameAttachedToGraph::new("__model__", VertexKind::ScopeRoot);
        let l = g.add_vertex("l", VertexKind::Link);
        g.set_edge(g.root(), l);
        // dangling frame with no edge: its own sink, but not a link
        g.add_vertex("floating", VertexKind::Frame);
        let mut errors = Errors::new();
        g.validate(&mut errors);
        assert!(errors
            .iter()
            .any(|e| e.code() == ErrorCode::FrameAttachedToInvalid));
    }

    #[test]
    fn test_static_model_frame_as_sink() {
        let mut g = FrameAttachedToGraph::new("__model__", VertexKind::ScopeRoot);
        g.allow_sink(g.root());
        let f = g.add_vertex("f", VertexKind::Frame);
        g.set_edge(f, g.root());
        let mut errors = Errors::new();
        g.validate(&mut errors);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(g.resolve_attached_to("f").unwrap(), "__model__");
    }

    #[test]
    fn test_unknown_name() {
        let g = model_graph();
        assert_eq!(
            g.resolve_attached_to("ghost").unwrap_err().code(),
            ErrorCode::FrameUnknown
        );
    }
}
