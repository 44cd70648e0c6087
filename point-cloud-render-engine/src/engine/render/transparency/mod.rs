//! Weighted-blended order-independent transparency for point splats.
//!
//! Every splat fragment adds `(rgb * a, a) * w` to a colour target and
//! multiplies a reveal target by `1 - a`. Neither combine depends on draw
//! order, so point clouds are never sorted per fragment. A full-screen
//! resolve then writes `rgb / max(sum_a, 1e-5)` with alpha `1 - reveal` over
//! the view target.
//!
//! The weight favours near fragments:
//! `max(min(1, max(rgb) * a), a) * clamp(0.03 / (1e-5 + (z / 200)^4), 1e-2, 3e3)`
//! with `z` the positive view depth.
//!
//! ## Render Graph Position
//!
//! `MainTransparentPass → OitResolveLabel → EndMainPass`. The node loads the
//! opaque depth buffer read-only, so splats hidden behind opaque geometry are
//! rejected while splats never occlude each other.

use bevy::core_pipeline::core_3d::graph::{Core3d, Node3d};
use bevy::prelude::*;
use bevy::render::render_graph::{RenderGraphApp, ViewNodeRunner};
use bevy::render::render_phase::DrawFunctions;
use bevy::render::render_resource::SpecializedRenderPipelines;
use bevy::render::{Render, RenderApp, RenderSet};

pub mod phase;
pub mod resolve;
pub mod textures;

use phase::OitPhase;
use resolve::{OitResolveLabel, OitResolveNode, OitResolvePipeline, prepare_oit_resolve_pipelines};
use textures::prepare_oit_textures;

pub struct OrderIndependentTransparencyPlugin;

impl Plugin for OrderIndependentTransparencyPlugin {
    fn build(&self, app: &mut App) {
        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app
            .init_resource::<DrawFunctions<OitPhase>>()
            .init_resource::<SpecializedRenderPipelines<OitResolvePipeline>>()
            .add_systems(
                Render,
                (
                    prepare_oit_textures.in_set(RenderSet::PrepareResources),
                    prepare_oit_resolve_pipelines.in_set(RenderSet::Prepare),
                ),
            )
            .add_render_graph_node::<ViewNodeRunner<OitResolveNode>>(Core3d, OitResolveLabel)
            .add_render_graph_edges(
                Core3d,
                (
                    Node3d::MainTransparentPass,
                    OitResolveLabel,
                    Node3d::EndMainPass,
                ),
            );
    }

    fn finish(&self, app: &mut App) {
        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app.init_resource::<OitResolvePipeline>();
    }
}
