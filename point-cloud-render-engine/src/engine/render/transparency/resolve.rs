use bevy::core_pipeline::fullscreen_vertex_shader::fullscreen_shader_vertex_state;
use bevy::ecs::query::QueryItem;
use bevy::image::BevyDefault;
use bevy::prelude::*;
use bevy::render::camera::ExtractedCamera;
use bevy::render::render_graph::{NodeRunError, RenderGraphContext, RenderLabel, ViewNode};
use bevy::render::render_phase::ViewSortedRenderPhases;
use bevy::render::render_resource::{
    binding_types::{texture_2d, texture_2d_multisampled},
    *,
};
use bevy::render::renderer::{RenderContext, RenderDevice};
use bevy::render::view::{ExtractedView, ViewDepthTexture, ViewTarget};
use constants::path::OIT_RESOLVE_SHADER_PATH;

use super::phase::OitPhase;
use super::textures::OitAccumulationTextures;

#[derive(Debug, Hash, PartialEq, Eq, Clone, RenderLabel)]
pub struct OitResolveLabel;

#[derive(Resource)]
pub struct OitResolvePipeline {
    layout: BindGroupLayout,
    multisampled_layout: BindGroupLayout,
    shader: Handle<Shader>,
}

impl OitResolvePipeline {
    fn layout_for(&self, msaa_samples: u32) -> &BindGroupLayout {
        if msaa_samples > 1 {
            &self.multisampled_layout
        } else {
            &self.layout
        }
    }
}

impl FromWorld for OitResolvePipeline {
    fn from_world(world: &mut World) -> Self {
        let render_device = world.resource::<RenderDevice>();
        let sample_type = TextureSampleType::Float { filterable: false };

        let layout = render_device.create_bind_group_layout(
            "oit_resolve_layout",
            &BindGroupLayoutEntries::sequential(
                ShaderStages::FRAGMENT,
                (texture_2d(sample_type), texture_2d(sample_type)),
            ),
        );

        let multisampled_layout = render_device.create_bind_group_layout(
            "oit_resolve_multisampled_layout",
            &BindGroupLayoutEntries::sequential(
                ShaderStages::FRAGMENT,
                (
                    texture_2d_multisampled(sample_type),
                    texture_2d_multisampled(sample_type),
                ),
            ),
        );

        Self {
            layout,
            multisampled_layout,
            shader: world.load_asset(OIT_RESOLVE_SHADER_PATH),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OitResolvePipelineKey {
    pub msaa_samples: u32,
    pub hdr: bool,
}

impl SpecializedRenderPipeline for OitResolvePipeline {
    type Key = OitResolvePipelineKey;

    fn specialize(&self, key: Self::Key) -> RenderPipelineDescriptor {
        let mut shader_defs = Vec::new();
        if key.msaa_samples > 1 {
            shader_defs.push("MULTISAMPLED".into());
        }

        let format = if key.hdr {
            ViewTarget::TEXTURE_FORMAT_HDR
        } else {
            TextureFormat::bevy_default()
        };

        RenderPipelineDescriptor {
            label: Some("oit_resolve_pipeline".into()),
            layout: vec![self.layout_for(key.msaa_samples).clone()],
            push_constant_ranges: vec![],
            vertex: fullscreen_shader_vertex_state(),
            fragment: Some(FragmentState {
                shader: self.shader.clone(),
                shader_defs,
                entry_point: "fragment".into(),
                // Resolved colour is straight alpha over the opaque result.
                targets: vec![Some(ColorTargetState {
                    format,
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: PrimitiveState::default(),
            depth_stencil: None,
            multisample: MultisampleState {
                count: key.msaa_samples,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            zero_initialize_workgroup_memory: false,
        }
    }
}

#[derive(Component)]
pub struct OitResolvePipelineId(pub CachedRenderPipelineId);

pub fn prepare_oit_resolve_pipelines(
    mut commands: Commands,
    pipeline_cache: Res<PipelineCache>,
    mut pipelines: ResMut<SpecializedRenderPipelines<OitResolvePipeline>>,
    resolve_pipeline: Res<OitResolvePipeline>,
    views: Query<(Entity, &ExtractedView, &Msaa)>,
) {
    for (entity, view, msaa) in &views {
        let pipeline_id = pipelines.specialize(
            &pipeline_cache,
            &resolve_pipeline,
            OitResolvePipelineKey {
                msaa_samples: msaa.samples(),
                hdr: view.hdr,
            },
        );
        commands
            .entity(entity)
            .insert(OitResolvePipelineId(pipeline_id));
    }
}

/// Runs the accumulation pass, then the resolve pass over the view target.
///
/// The two are separate render passes, so every accumulation write has
/// landed before the resolve samples the targets.
#[derive(Default)]
pub struct OitResolveNode;

impl ViewNode for OitResolveNode {
    type ViewQuery = (
        &'static ExtractedCamera,
        &'static ExtractedView,
        &'static ViewTarget,
        &'static ViewDepthTexture,
        &'static OitAccumulationTextures,
        &'static OitResolvePipelineId,
        &'static Msaa,
    );

    fn run(
        &self,
        graph: &mut RenderGraphContext,
        render_context: &mut RenderContext,
        (camera, view, target, depth, accumulation, resolve_pipeline_id, msaa): QueryItem<
            Self::ViewQuery,
        >,
        world: &World,
    ) -> Result<(), NodeRunError> {
        let Some(oit_phases) = world.get_resource::<ViewSortedRenderPhases<OitPhase>>() else {
            return Ok(());
        };

        let Some(oit_phase) = oit_phases.get(&view.retained_view_entity) else {
            return Ok(());
        };

        // Nothing accumulated means a resolve of zero coverage everywhere.
        if oit_phase.items.is_empty() {
            return Ok(());
        }

        let pipeline_cache = world.resource::<PipelineCache>();
        let Some(resolve_pipeline) = pipeline_cache.get_render_pipeline(resolve_pipeline_id.0)
        else {
            return Ok(());
        };

        let view_entity = graph.view_entity();

        {
            let mut accumulation_pass =
                render_context.begin_tracked_render_pass(RenderPassDescriptor {
                    label: Some("oit_accumulation_pass"),
                    color_attachments: &[
                        Some(accumulation.colour.get_attachment()),
                        Some(accumulation.reveal.get_attachment()),
                    ],
                    depth_stencil_attachment: Some(depth.get_attachment(StoreOp::Store)),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });

            if let Some(viewport) = camera.viewport.as_ref() {
                accumulation_pass.set_camera_viewport(viewport);
            }

            if let Err(err) = oit_phase.render(&mut accumulation_pass, world, view_entity) {
                error!("Error encountered while accumulating point splats {err:?}");
            }
        }

        let resolve = world.resource::<OitResolvePipeline>();
        let bind_group = render_context.render_device().create_bind_group(
            "oit_resolve_bind_group",
            resolve.layout_for(msaa.samples()),
            &BindGroupEntries::sequential((
                &accumulation.colour.texture.default_view,
                &accumulation.reveal.texture.default_view,
            )),
        );

        let mut resolve_pass = render_context.begin_tracked_render_pass(RenderPassDescriptor {
            label: Some("oit_resolve_pass"),
            color_attachments: &[Some(target.get_color_attachment())],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Some(viewport) = camera.viewport.as_ref() {
            resolve_pass.set_camera_viewport(viewport);
        }

        resolve_pass.set_render_pipeline(resolve_pipeline);
        resolve_pass.set_bind_group(0, &bind_group, &[]);
        resolve_pass.draw(0..3, 0..1);

        Ok(())
    }
}
