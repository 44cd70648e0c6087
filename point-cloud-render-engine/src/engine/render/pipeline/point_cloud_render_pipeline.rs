use crate::engine::render::extraction::camera_phases::extract_camera_phases;
use crate::engine::render::extraction::point_clouds::{
    PendingPointClouds, PointCloudGpuData, RenderPointClouds, extract_point_clouds,
};
use crate::engine::render::extraction::splat_view::{ExtractedSplatView, extract_splat_views};
use crate::engine::render::transparency::phase::OitPhase;
use bevy::core_pipeline::core_3d::CORE_3D_DEPTH_FORMAT;
use bevy::ecs::system::{SystemParamItem, lifetimeless::SRes};
use bevy::prelude::*;
use bevy::render::render_phase::{
    PhaseItem, RenderCommand, RenderCommandResult, TrackedRenderPass, ViewSortedRenderPhases,
    sort_phase_system,
};
use bevy::render::render_resource::{
    BindGroup, BindGroupEntries, BindGroupLayout, BindGroupLayoutEntries, BlendComponent,
    BlendFactor, BlendOperation, BlendState, BufferInitDescriptor, BufferUsages, ColorTargetState,
    ColorWrites, CompareFunction, DepthBiasState, DepthStencilState, FragmentState, FrontFace,
    MultisampleState, PolygonMode, PrimitiveState, RenderPipelineDescriptor, ShaderStages,
    ShaderType, SpecializedRenderPipeline, StencilState, TextureFormat, VertexState,
    binding_types::{storage_buffer_read_only_sized, uniform_buffer_sized},
};
use bevy::render::{
    ExtractSchedule, Render, RenderApp, RenderSet,
    renderer::{RenderDevice, RenderQueue},
    view::ExtractedView,
};
use constants::path::{POINT_CLOUD_SHADER_PATH, POINT_CLOUD_TYPES_SHADER_PATH};
use point_cloud_splat::{PointCloudUniform, SplatViewUniform, validate_points, vertex_count};
use std::num::NonZeroU64;

/// Colour accumulation target: `sum((rgb * a, a) * w)`.
pub const COLOUR_ACCUMULATION_FORMAT: TextureFormat = TextureFormat::Rgba16Float;

/// Reveal target: `prod(1 - a)`.
pub const REVEAL_ACCUMULATION_FORMAT: TextureFormat = TextureFormat::R16Float;

pub struct PointCloudRenderPlugin;

impl Plugin for PointCloudRenderPlugin {
    fn build(&self, app: &mut App) {
        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app
            .init_resource::<RenderPointClouds>()
            .init_resource::<PendingPointClouds>()
            .init_resource::<ViewSortedRenderPhases<OitPhase>>()
            .add_systems(
                ExtractSchedule,
                (
                    extract_camera_phases,
                    extract_point_clouds,
                    extract_splat_views,
                ),
            )
            .add_systems(
                Render,
                (
                    upload_point_clouds.in_set(RenderSet::PrepareResources),
                    write_point_cloud_uniforms
                        .in_set(RenderSet::PrepareResources)
                        .after(upload_point_clouds),
                    prepare_splat_view_bind_groups.in_set(RenderSet::PrepareBindGroups),
                    sort_phase_system::<OitPhase>.in_set(RenderSet::PhaseSort),
                ),
            );
    }

    fn finish(&self, app: &mut App) {
        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app.init_resource::<PointCloudPipeline>();
    }
}

/// Accumulation pipeline shared by every point cloud material.
///
/// Materials reuse the layouts and vertex stage and only swap the fragment
/// shader and the `@group(2)` layout.
#[derive(Resource, Clone)]
pub struct PointCloudPipeline {
    /// `@group(0)`: per-frame camera context.
    pub view_layout: BindGroupLayout,
    /// `@group(1)`: instance uniform and point storage buffer.
    pub point_cloud_layout: BindGroupLayout,
    pub shader: Handle<Shader>,
    /// Held so the `point_cloud::types` import stays registered.
    pub types_shader: Handle<Shader>,
}

impl FromWorld for PointCloudPipeline {
    fn from_world(world: &mut World) -> Self {
        let render_device = world.resource::<RenderDevice>();

        let view_layout = render_device.create_bind_group_layout(
            "splat_view_layout",
            &BindGroupLayoutEntries::single(
                ShaderStages::VERTEX_FRAGMENT,
                uniform_buffer_sized(false, NonZeroU64::new(size_of::<SplatViewUniform>() as u64)),
            ),
        );

        let point_cloud_layout = render_device.create_bind_group_layout(
            "point_cloud_layout",
            &BindGroupLayoutEntries::sequential(
                ShaderStages::VERTEX,
                (
                    uniform_buffer_sized(
                        false,
                        NonZeroU64::new(size_of::<PointCloudUniform>() as u64),
                    ),
                    storage_buffer_read_only_sized(false, Some(Vec4::min_size())),
                ),
            ),
        );

        Self {
            view_layout,
            point_cloud_layout,
            shader: world.load_asset(POINT_CLOUD_SHADER_PATH),
            types_shader: world.load_asset(POINT_CLOUD_TYPES_SHADER_PATH),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PointCloudPipelineKey {
    pub msaa_samples: u32,
}

impl SpecializedRenderPipeline for PointCloudPipeline {
    type Key = PointCloudPipelineKey;

    fn specialize(&self, key: Self::Key) -> RenderPipelineDescriptor {
        RenderPipelineDescriptor {
            label: Some("point_cloud_accumulation_pipeline".into()),
            layout: vec![self.view_layout.clone(), self.point_cloud_layout.clone()],
            push_constant_ranges: vec![],
            // No vertex buffers: points are fetched from storage by vertex_index / 6.
            vertex: VertexState {
                shader: self.shader.clone(),
                entry_point: "vertex".into(),
                shader_defs: vec![],
                buffers: vec![],
            },
            fragment: Some(FragmentState {
                shader: self.shader.clone(),
                entry_point: "fragment".into(),
                shader_defs: vec![],
                targets: vec![
                    Some(ColorTargetState {
                        format: COLOUR_ACCUMULATION_FORMAT,
                        blend: Some(BlendState {
                            color: additive(),
                            alpha: additive(),
                        }),
                        write_mask: ColorWrites::ALL,
                    }),
                    Some(ColorTargetState {
                        format: REVEAL_ACCUMULATION_FORMAT,
                        blend: Some(BlendState {
                            color: transmittance(),
                            alpha: transmittance(),
                        }),
                        write_mask: ColorWrites::ALL,
                    }),
                ],
            }),
            primitive: PrimitiveState {
                front_face: FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: PolygonMode::Fill,
                ..default()
            },
            // Reversed-Z: test against opaque depth without writing it.
            depth_stencil: Some(DepthStencilState {
                format: CORE_3D_DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: CompareFunction::GreaterEqual,
                stencil: StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: MultisampleState {
                count: key.msaa_samples,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            zero_initialize_workgroup_memory: false,
        }
    }
}

fn additive() -> BlendComponent {
    BlendComponent {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Add,
    }
}

/// `dst * (1 - src)`.
fn transmittance() -> BlendComponent {
    BlendComponent {
        src_factor: BlendFactor::Zero,
        dst_factor: BlendFactor::OneMinusSrc,
        operation: BlendOperation::Add,
    }
}

/// Validates and uploads point data that changed since the last frame.
fn upload_point_clouds(
    mut pending: ResMut<PendingPointClouds>,
    mut render_point_clouds: ResMut<RenderPointClouds>,
    render_device: Res<RenderDevice>,
    pipeline: Res<PointCloudPipeline>,
) {
    for (main_entity, points) in pending.0.drain(..) {
        let Some(cloud) = render_point_clouds.get_mut(&main_entity) else {
            continue;
        };

        let instance_index = main_entity.id().index() as usize;
        if let Err(err) = validate_points(instance_index, &points) {
            error!("Point cloud {:?} rejected: {}", main_entity, err);
            cloud.gpu = None;
            continue;
        }

        let vertices = match vertex_count(points.len()) {
            Ok(count) => count,
            Err(err) => {
                error!("Point cloud {:?} rejected: {}", main_entity, err);
                cloud.gpu = None;
                continue;
            }
        };

        // Empty storage bindings are invalid; an empty cloud simply draws nothing.
        if vertices == 0 {
            cloud.gpu = None;
            continue;
        }

        let point_buffer = render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("point_cloud_points"),
            contents: bytemuck::cast_slice(points.as_slice()),
            usage: BufferUsages::STORAGE,
        });

        let uniform_buffer = render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("point_cloud_uniform"),
            contents: bytemuck::bytes_of(&cloud.instance.uniform()),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });

        let bind_group = render_device.create_bind_group(
            "point_cloud_bind_group",
            &pipeline.point_cloud_layout,
            &BindGroupEntries::sequential((
                uniform_buffer.as_entire_binding(),
                point_buffer.as_entire_binding(),
            )),
        );

        info!(
            "Uploaded point cloud {:?}: {} points",
            main_entity,
            points.len()
        );

        cloud.gpu = Some(PointCloudGpuData {
            points: point_buffer,
            uniform: uniform_buffer,
            bind_group,
            vertex_count: vertices,
        });
    }
}

/// Instance transforms change every frame; point data rarely does.
fn write_point_cloud_uniforms(
    render_point_clouds: Res<RenderPointClouds>,
    render_queue: Res<RenderQueue>,
) {
    for cloud in render_point_clouds.values() {
        if let Some(gpu) = &cloud.gpu {
            render_queue.write_buffer(&gpu.uniform, 0, bytemuck::bytes_of(&cloud.instance.uniform()));
        }
    }
}

/// Camera context bind group of one view.
#[derive(Component)]
pub struct SplatViewBindGroup(pub BindGroup);

fn prepare_splat_view_bind_groups(
    mut commands: Commands,
    render_device: Res<RenderDevice>,
    pipeline: Res<PointCloudPipeline>,
    views: Query<(Entity, &ExtractedSplatView), With<ExtractedView>>,
) {
    for (entity, splat_view) in &views {
        let buffer = render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("splat_view_uniform"),
            contents: bytemuck::bytes_of(&splat_view.uniform()),
            usage: BufferUsages::UNIFORM,
        });

        let bind_group = render_device.create_bind_group(
            "splat_view_bind_group",
            &pipeline.view_layout,
            &BindGroupEntries::single(buffer.as_entire_binding()),
        );

        commands.entity(entity).insert(SplatViewBindGroup(bind_group));
    }
}

pub struct SetSplatViewBindGroup<const I: usize>;

impl<P: PhaseItem, const I: usize> RenderCommand<P> for SetSplatViewBindGroup<I> {
    type Param = ();
    type ViewQuery = Option<&'static SplatViewBindGroup>;
    type ItemQuery = ();

    #[inline]
    fn render<'w>(
        _item: &P,
        view_bind_group: Option<&'w SplatViewBindGroup>,
        _entity: Option<()>,
        _param: SystemParamItem<'w, '_, Self::Param>,
        pass: &mut TrackedRenderPass<'w>,
    ) -> RenderCommandResult {
        let Some(view_bind_group) = view_bind_group else {
            return RenderCommandResult::Failure("missing splat view bind group");
        };
        pass.set_bind_group(I, &view_bind_group.0, &[]);
        RenderCommandResult::Success
    }
}

pub struct SetPointCloudBindGroup<const I: usize>;

impl<P: PhaseItem, const I: usize> RenderCommand<P> for SetPointCloudBindGroup<I> {
    type Param = SRes<RenderPointClouds>;
    type ViewQuery = ();
    type ItemQuery = ();

    #[inline]
    fn render<'w>(
        item: &P,
        _view: (),
        _entity: Option<()>,
        point_clouds: SystemParamItem<'w, '_, Self::Param>,
        pass: &mut TrackedRenderPass<'w>,
    ) -> RenderCommandResult {
        let point_clouds = point_clouds.into_inner();
        let Some(gpu) = point_clouds
            .get(&item.main_entity())
            .and_then(|cloud| cloud.gpu.as_ref())
        else {
            return RenderCommandResult::Skip;
        };
        pass.set_bind_group(I, &gpu.bind_group, &[]);
        RenderCommandResult::Success
    }
}

/// Six vertices per point, no vertex or index buffer.
pub struct DrawPointCloudSplats;

impl<P: PhaseItem> RenderCommand<P> for DrawPointCloudSplats {
    type Param = SRes<RenderPointClouds>;
    type ViewQuery = ();
    type ItemQuery = ();

    #[inline]
    fn render<'w>(
        item: &P,
        _view: (),
        _entity: Option<()>,
        point_clouds: SystemParamItem<'w, '_, Self::Param>,
        pass: &mut TrackedRenderPass<'w>,
    ) -> RenderCommandResult {
        let point_clouds = point_clouds.into_inner();
        let Some(gpu) = point_clouds
            .get(&item.main_entity())
            .and_then(|cloud| cloud.gpu.as_ref())
        else {
            return RenderCommandResult::Skip;
        };
        pass.draw(0..gpu.vertex_count, 0..1);
        RenderCommandResult::Success
    }
}
