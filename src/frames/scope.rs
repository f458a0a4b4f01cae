//! Scope graph construction from the domain object model.
//!
//! A scope covers one Model or World and everything nested below it;
//! nested-model members are registered under `::`-qualified vertex names.
//! The pose graph is built in two passes: all edges except those of models
//! with a placement frame first, then each deferred model edge is composed
//! from the placement frame's chain inside the model, so that moving the
//! model by setting a new raw pose keeps the placement frame coincident.

use std::rc::Rc;

use crate::dom::{Model, World};
use crate::error::{ErrorCode, Errors, SdfError};
use crate::pose::Pose;

use super::{FrameAttachedToGraph, PoseRelativeToGraph, ScopeGraphs, VertexKind};

/// A model vertex whose pose edge awaits placement-frame composition.
struct DeferredPlacement {
    model_vertex: usize,
    nested_prefix: String,
    placement_frame: String,
    target: Option<usize>,
    raw: Pose,
    model_name: String,
}

/// Build and validate the graphs for a root-level model scope.
pub(crate) fn build_model_scope(model: &Model, errors: &mut Errors) -> ScopeGraphs {
    let mut attached = FrameAttachedToGraph::new("__model__", VertexKind::ScopeRoot);
    let mut poses = PoseRelativeToGraph::new("__model__", VertexKind::ScopeRoot);
    add_vertices(model, "", &mut attached, &mut poses);

    let mut deferred = Vec::new();
    add_model_edges(model, "", &mut attached, &mut poses, &mut deferred, errors);
    resolve_deferred(&mut poses, deferred, errors);

    attached.validate(errors);
    poses.validate(errors);
    validate_joints(model, "", &attached, errors);

    ScopeGraphs {
        attached_to: Rc::new(attached),
        poses: Rc::new(poses),
    }
}

/// Build and validate the graphs for a world scope.
pub(crate) fn build_world_scope(world: &World, errors: &mut Errors) -> ScopeGraphs {
    let mut attached = FrameAttachedToGraph::new("world", VertexKind::ScopeRoot);
    let root = attached.root();
    attached.allow_sink(root);
    let mut poses = PoseRelativeToGraph::new("world", VertexKind::ScopeRoot);

    for frame in world.frames() {
        if frame.name().is_empty() || attached.vertex(frame.name()).is_some() {
            continue;
        }
        attached.add_vertex(frame.name(), VertexKind::Frame);
        poses.add_vertex(frame.name(), VertexKind::Frame);
    }
    for model in world.models() {
        if model.name().is_empty() || attached.vertex(model.name()).is_some() {
            continue;
        }
        attached.add_vertex(model.name(), VertexKind::Model);
        poses.add_vertex(model.name(), VertexKind::Model);
        add_vertices(model, &format!("{}::", model.name()), &mut attached, &mut poses);
    }

    let mut deferred = Vec::new();
    let pose_root = poses.root();
    let attached_root = attached.root();

    for frame in world.frames() {
        let Some(v) = attached.vertex(frame.name()) else {
            continue;
        };
        match resolve_attached_target(&attached, frame.attached_to(), "", attached_root, errors, frame.name())
        {
            Some(target) => attached.set_edge(v, target),
            None => attached.set_edge(v, attached_root),
        }
        let pv = match poses.vertex(frame.name()) {
            Some(pv) => pv,
            None => continue,
        };
        let target = resolve_pose_target(
            &poses,
            frame.semantic_pose().relative_to(),
            "",
            pose_root,
            errors,
            frame.name(),
        )
        .unwrap_or(pose_root);
        poses.set_edge(pv, target, *frame.semantic_pose().raw_pose());
    }

    for model in world.models() {
        let Some(mv) = poses.vertex(model.name()) else {
            continue;
        };
        let prefix = format!("{}::", model.name());
        install_model_pose_edge(
            model,
            mv,
            &prefix,
            "",
            pose_root,
            &mut poses,
            &mut deferred,
            errors,
        );
        add_model_edges(model, &prefix, &mut attached, &mut poses, &mut deferred, errors);
    }

    resolve_deferred(&mut poses, deferred, errors);

    attached.validate(errors);
    poses.validate(errors);
    for model in world.models() {
        validate_joints(model, &format!("{}::", model.name()), &attached, errors);
    }

    ScopeGraphs {
        attached_to: Rc::new(attached),
        poses: Rc::new(poses),
    }
}

/// Resolve the pose a merged or placed model contributes to its parent:
/// the raw pose reinterpreted as "placement frame expressed in the pose
/// target" when a placement frame is declared.
pub(crate) fn resolve_model_pose_with_placement(model: &Model, errors: &mut Errors) -> Pose {
    let raw = *model.semantic_pose().raw_pose();
    if model.placement_frame_name().is_empty() {
        return raw;
    }
    let mut scope_errors = Errors::new();
    let graphs = build_model_scope(model, &mut scope_errors);
    errors.append(&mut scope_errors);
    match graphs.poses.resolve(model.placement_frame_name(), "") {
        Ok(x_m_p) => raw * x_m_p.inverse(),
        Err(e) => {
            errors.push(SdfError::new(
                ErrorCode::ModelPlacementFrameInvalid,
                format!(
                    "unable to resolve placement frame '{}' of model '{}': {e}",
                    model.placement_frame_name(),
                    model.name()
                ),
            ));
            raw
        }
    }
}

fn add_vertices(
    model: &Model,
    prefix: &str,
    attached: &mut FrameAttachedToGraph,
    poses: &mut PoseRelativeToGraph,
) {
    let mut add = |name: &str, kind: VertexKind| {
        if name.is_empty() {
            return;
        }
        let qualified = format!("{prefix}{name}");
        if attached.vertex(&qualified).is_none() {
            attached.add_vertex(&qualified, kind);
            poses.add_vertex(&qualified, kind);
        }
    };
    for link in model.links() {
        add(link.name(), VertexKind::Link);
    }
    for joint in model.joints() {
        add(joint.name(), VertexKind::Joint);
    }
    for frame in model.frames() {
        add(frame.name(), VertexKind::Frame);
    }
    drop(add);
    for nested in model.models() {
        if nested.name().is_empty() {
            continue;
        }
        let qualified = format!("{prefix}{}", nested.name());
        if attached.vertex(&qualified).is_none() {
            attached.add_vertex(&qualified, VertexKind::Model);
            poses.add_vertex(&qualified, VertexKind::Model);
        }
        add_vertices(nested, &format!("{qualified}::"), attached, poses);
    }
}

/// Install all edges contributed by `model`'s members. `prefix` is the
/// scope prefix of the members (`""` for the scope's own model, `"m::"`
/// inside nested model `m`); the model's own frame vertex is the graph
/// root when the prefix is empty.
fn add_model_edges(
    model: &Model,
    prefix: &str,
    attached: &mut FrameAttachedToGraph,
    poses: &mut PoseRelativeToGraph,
    deferred: &mut Vec<DeferredPlacement>,
    errors: &mut Errors,
) {
    let self_attached = scope_vertex(attached.vertex(prefix.trim_end_matches(':')), attached.root(), prefix);
    let self_pose = scope_vertex(poses.vertex(prefix.trim_end_matches(':')), poses.root(), prefix);

    // The model frame attaches to the canonical link.
    match model.canonical_link_relative_name() {
        Some(canonical) => {
            let qualified = format!("{prefix}{canonical}");
            match attached.vertex(&qualified) {
                Some(id) if attached.vertex_data(id).kind == VertexKind::Link => {
                    attached.set_edge(self_attached, id);
                }
                _ => errors.push(SdfError::new(
                    ErrorCode::ModelCanonicalLinkInvalid,
                    format!(
                        "canonical link '{canonical}' of model '{}' does not resolve to a link",
                        model.name()
                    ),
                )),
            }
        }
        None if model.is_static() => attached.allow_sink(self_attached),
        None => errors.push(SdfError::new(
            ErrorCode::ModelCanonicalLinkInvalid,
            format!(
                "non-static model '{}' must have at least one link to serve as canonical link",
                model.name()
            ),
        )),
    }

    for link in model.links() {
        let Some(v) = poses.vertex(&format!("{prefix}{}", link.name())) else {
            continue;
        };
        let target = resolve_pose_target(
            poses,
            link.semantic_pose().relative_to(),
            prefix,
            self_pose,
            errors,
            link.name(),
        )
        .unwrap_or(self_pose);
        poses.set_edge(v, target, *link.semantic_pose().raw_pose());
    }

    for frame in model.frames() {
        let qualified = format!("{prefix}{}", frame.name());
        if let Some(v) = attached.vertex(&qualified) {
            match resolve_attached_target(
                attached,
                frame.attached_to(),
                prefix,
                self_attached,
                errors,
                frame.name(),
            ) {
                Some(target) => attached.set_edge(v, target),
                None => attached.set_edge(v, self_attached),
            }
        }
        if let Some(v) = poses.vertex(&qualified) {
            let target = resolve_pose_target(
                poses,
                frame.semantic_pose().relative_to(),
                prefix,
                self_pose,
                errors,
                frame.name(),
            )
            .unwrap_or(self_pose);
            poses.set_edge(v, target, *frame.semantic_pose().raw_pose());
        }
    }

    for joint in model.joints() {
        let qualified = format!("{prefix}{}", joint.name());
        let child_vertex = if joint.child_name() == "world" {
            errors.push(SdfError::new(
                ErrorCode::JointChildLinkInvalid,
                format!("joint '{}' cannot have 'world' as its child", joint.name()),
            ));
            None
        } else {
            let child_qualified = format!("{prefix}{}", joint.child_name());
            let found = attached.vertex(&child_qualified);
            if found.is_none() {
                errors.push(SdfError::new(
                    ErrorCode::JointChildLinkInvalid,
                    format!(
                        "child '{}' of joint '{}' not found in scope",
                        joint.child_name(),
                        joint.name()
                    ),
                ));
            }
            found
        };
        if let Some(v) = attached.vertex(&qualified) {
            attached.set_edge(v, child_vertex.unwrap_or(self_attached));
        }
        if let Some(v) = poses.vertex(&qualified) {
            let relative_to = joint.semantic_pose().relative_to();
            let target = if relative_to.is_empty() {
                // Joint poses default to the child frame.
                poses
                    .vertex(&format!("{prefix}{}", joint.child_name()))
                    .unwrap_or(self_pose)
            } else {
                resolve_pose_target(poses, relative_to, prefix, self_pose, errors, joint.name())
                    .unwrap_or(self_pose)
            };
            poses.set_edge(v, target, *joint.semantic_pose().raw_pose());
        }
    }

    for nested in model.models() {
        let qualified = format!("{prefix}{}", nested.name());
        let Some(mv) = poses.vertex(&qualified) else {
            continue;
        };
        let nested_prefix = format!("{qualified}::");
        install_model_pose_edge(
            nested,
            mv,
            &nested_prefix,
            prefix,
            self_pose,
            poses,
            deferred,
            errors,
        );
        add_model_edges(nested, &nested_prefix, attached, poses, deferred, errors);
    }
}

/// Install (or defer) the pose edge of a model vertex in its parent scope.
#[allow(clippy::too_many_arguments)]
fn install_model_pose_edge(
    model: &Model,
    model_vertex: usize,
    nested_prefix: &str,
    parent_prefix: &str,
    parent_root: usize,
    poses: &mut PoseRelativeToGraph,
    deferred: &mut Vec<DeferredPlacement>,
    errors: &mut Errors,
) {
    let target = resolve_pose_target(
        poses,
        model.semantic_pose().relative_to(),
        parent_prefix,
        parent_root,
        errors,
        model.name(),
    );
    let raw = *model.semantic_pose().raw_pose();
    if model.placement_frame_name().is_empty() {
        poses.set_edge(model_vertex, target.unwrap_or(parent_root), raw);
    } else {
        deferred.push(DeferredPlacement {
            model_vertex,
            nested_prefix: nested_prefix.to_string(),
            placement_frame: model.placement_frame_name().to_string(),
            target,
            raw,
            model_name: model.name().to_string(),
        });
    }
}

/// Second pass: compose deferred model edges through their placement
/// frames. Deferrals are registered outermost-first, and an ancestor's
/// placement chain may run through a nested model's own deferred edge, so
/// they resolve in reverse registration order.
fn resolve_deferred(
    poses: &mut PoseRelativeToGraph,
    deferred: Vec<DeferredPlacement>,
    errors: &mut Errors,
) {
    for d in deferred.into_iter().rev() {
        let target = d.target.unwrap_or(poses.root());
        let placement = format!("{}{}", d.nested_prefix, d.placement_frame);
        let pose = match poses.vertex(&placement) {
            None => {
                errors.push(SdfError::new(
                    ErrorCode::ModelPlacementFrameInvalid,
                    format!(
                        "placement frame '{}' of model '{}' not found",
                        d.placement_frame, d.model_name
                    ),
                ));
                d.raw
            }
            Some(p) => match poses.pose_relative_to_ancestor(p, d.model_vertex) {
                Ok(x_m_p) => d.raw * x_m_p.inverse(),
                Err(e) => {
                    errors.push(e);
                    d.raw
                }
            },
        };
        poses.set_edge(d.model_vertex, target, pose);
    }
}

/// Joint endpoints must resolve to two distinct links.
fn validate_joints(
    model: &Model,
    prefix: &str,
    attached: &FrameAttachedToGraph,
    errors: &mut Errors,
) {
    for joint in model.joints() {
        let child_sink = attached
            .vertex(&format!("{prefix}{}", joint.child_name()))
            .map(|v| attached.walk_to_sink(v));

        if joint.parent_name() == "world" {
            // Anchored to the world: never coincides with a child link.
            continue;
        }
        let parent_vertex = if joint.parent_name() == "__model__" {
            if prefix.is_empty() {
                Some(attached.root())
            } else {
                attached.vertex(prefix.trim_end_matches(':'))
            }
        } else {
            attached.vertex(&format!("{prefix}{}", joint.parent_name()))
        };
        let Some(parent_vertex) = parent_vertex else {
            errors.push(SdfError::new(
                ErrorCode::JointParentLinkInvalid,
                format!(
                    "parent '{}' of joint '{}' not found in scope",
                    joint.parent_name(),
                    joint.name()
                ),
            ));
            continue;
        };
        let parent_sink = attached.walk_to_sink(parent_vertex);
        if let (Some(Ok(child)), Ok(parent)) = (child_sink, parent_sink) {
            if child == parent {
                errors.push(SdfError::new(
                    ErrorCode::JointParentSameAsChild,
                    format!(
                        "joint '{}': parent and child both resolve to link '{}'",
                        joint.name(),
                        attached.vertex_data(child).name
                    ),
                ));
            }
        }
    }
    for nested in model.models() {
        validate_joints(nested, &format!("{prefix}{}::", nested.name()), attached, errors);
    }
}

/// The vertex representing a scope's own model frame: the graph root at
/// the top, the model vertex inside a nested prefix.
fn scope_vertex(found: Option<usize>, root: usize, prefix: &str) -> usize {
    if prefix.is_empty() {
        root
    } else {
        found.unwrap_or(root)
    }
}

fn resolve_pose_target(
    poses: &PoseRelativeToGraph,
    name: &str,
    prefix: &str,
    scope_root: usize,
    errors: &mut Errors,
    owner: &str,
) -> Option<usize> {
    if name.is_empty() || name == "__model__" {
        if name == "__model__" && prefix.is_empty() && poses.root_name() != "__model__" {
            errors.push(SdfError::new(
                ErrorCode::PoseRelativeToInvalid,
                format!("'{owner}' uses relative_to='__model__' outside a model scope"),
            ));
            return None;
        }
        return Some(scope_root);
    }
    if name == "world" {
        if poses.root_name() == "world" {
            return Some(poses.root());
        }
        errors.push(SdfError::new(
            ErrorCode::PoseRelativeToInvalid,
            format!("'{owner}' uses relative_to='world' inside a model scope"),
        ));
        return None;
    }
    match poses.vertex(&format!("{prefix}{name}")) {
        Some(id) => Some(id),
        None => {
            errors.push(SdfError::new(
                ErrorCode::PoseRelativeToInvalid,
                format!("relative_to frame '{name}' of '{owner}' not found in scope"),
            ));
            None
        }
    }
}

fn resolve_attached_target(
    attached: &FrameAttachedToGraph,
    name: &str,
    prefix: &str,
    scope_vertex: usize,
    errors: &mut Errors,
    owner: &str,
) -> Option<usize> {
    if name.is_empty() || name == "__model__" {
        if name == "__model__" && prefix.is_empty() {
            let root_data = attached.vertex_data(attached.root());
            if root_data.name != "__model__" {
                errors.push(SdfError::new(
                    ErrorCode::FrameAttachedToInvalid,
                    format!("frame '{owner}' uses attached_to='__model__' outside a model scope"),
                ));
                return None;
            }
        }
        return Some(scope_vertex);
    }
    if name == "world" {
        let root_data = attached.vertex_data(attached.root());
        if root_data.name == "world" {
            return Some(attached.root());
        }
        errors.push(SdfError::new(
            ErrorCode::FrameAttachedToInvalid,
            format!("frame '{owner}' uses attached_to='world' inside a model scope"),
        ));
        return None;
    }
    match attached.vertex(&format!("{prefix}{name}")) {
        Some(id) => Some(id),
        None => {
            errors.push(SdfError::new(
                ErrorCode::FrameAttachedToInvalid,
                format!("attached_to frame '{name}' of frame '{owner}' not found in scope"),
            ));
            None
        }
    }
}
