//! Point cloud materials.
//!
//! A material decides the colour of each splat fragment. The choice is made
//! once per draw by specialising the accumulation pipeline with the
//! material's fragment shader and `@group(2)` layout, never by branching per
//! fragment. Adding a material means implementing [`PointCloudMaterial`] and
//! registering a [`PointCloudMaterialPlugin`] for it.

use std::marker::PhantomData;

use bevy::ecs::system::{SystemParamItem, lifetimeless::SRes};
use bevy::math::FloatOrd;
use bevy::prelude::*;
use bevy::render::render_asset::{
    PrepareAssetError, RenderAsset, RenderAssetPlugin, RenderAssets,
};
use bevy::render::render_phase::{
    AddRenderCommand, DrawFunctions, PhaseItem, PhaseItemExtraIndex, RenderCommand,
    RenderCommandResult, SetItemPipeline, TrackedRenderPass, ViewSortedRenderPhases,
};
use bevy::render::render_resource::{
    AsBindGroup, AsBindGroupError, BindGroup, BindGroupLayout, PipelineCache,
    RenderPipelineDescriptor, ShaderRef, SpecializedRenderPipeline, SpecializedRenderPipelines,
};
use bevy::render::renderer::RenderDevice;
use bevy::render::sync_world::MainEntityHashMap;
use bevy::render::texture::GpuImage;
use bevy::render::view::{ExtractedView, RenderVisibleEntities};
use bevy::render::{Extract, ExtractSchedule, Render, RenderApp, RenderSet};

use crate::engine::point_cloud::PointCloud;
use crate::engine::render::extraction::point_clouds::RenderPointClouds;
use crate::engine::render::pipeline::point_cloud_render_pipeline::{
    DrawPointCloudSplats, PointCloudPipeline, PointCloudPipelineKey, SetPointCloudBindGroup,
    SetSplatViewBindGroup,
};
use crate::engine::render::transparency::phase::OitPhase;

pub mod distance_material;
pub mod uniform_material;

/// Colour policy of a point cloud draw.
///
/// `ShaderRef::Default` keeps the fragment entry point of the shared
/// `point_cloud.wgsl`, which reads a single uniform colour.
pub trait PointCloudMaterial: Asset + AsBindGroup + Clone + Sized {
    fn fragment_shader() -> ShaderRef {
        ShaderRef::Default
    }
}

/// Selects the material a point cloud is drawn with. Clouds without one are
/// not drawn.
#[derive(Component, Clone, Deref, DerefMut)]
pub struct PointCloudMaterial3d<M: PointCloudMaterial>(pub Handle<M>);

pub struct PointCloudMaterialPlugin<M: PointCloudMaterial>(PhantomData<M>);

impl<M: PointCloudMaterial> Default for PointCloudMaterialPlugin<M> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<M: PointCloudMaterial> Plugin for PointCloudMaterialPlugin<M> {
    fn build(&self, app: &mut App) {
        app.init_asset::<M>()
            .add_plugins(RenderAssetPlugin::<PreparedPointCloudMaterial<M>, GpuImage>::default());

        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app
            .init_resource::<DrawFunctions<OitPhase>>()
            .add_render_command::<OitPhase, DrawPointCloudMaterial<M>>()
            .init_resource::<RenderPointCloudMaterialInstances<M>>()
            .init_resource::<SpecializedRenderPipelines<PointCloudMaterialPipeline<M>>>()
            .add_systems(ExtractSchedule, extract_point_cloud_materials::<M>)
            .add_systems(
                Render,
                queue_point_clouds::<M>.in_set(RenderSet::QueueMeshes),
            );
    }

    fn finish(&self, app: &mut App) {
        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app.init_resource::<PointCloudMaterialPipeline<M>>();
    }
}

/// Accumulation pipeline with the material's layout and fragment shader.
#[derive(Resource)]
pub struct PointCloudMaterialPipeline<M: PointCloudMaterial> {
    pub point_cloud_pipeline: PointCloudPipeline,
    pub material_layout: BindGroupLayout,
    pub fragment_shader: Option<Handle<Shader>>,
    marker: PhantomData<M>,
}

impl<M: PointCloudMaterial> FromWorld for PointCloudMaterialPipeline<M> {
    fn from_world(world: &mut World) -> Self {
        let point_cloud_pipeline = world.get_resource_or_init::<PointCloudPipeline>().clone();
        let material_layout = M::bind_group_layout(world.resource::<RenderDevice>());

        let fragment_shader = match M::fragment_shader() {
            ShaderRef::Default => None,
            ShaderRef::Handle(handle) => Some(handle),
            ShaderRef::Path(path) => Some(world.load_asset(path)),
        };

        Self {
            point_cloud_pipeline,
            material_layout,
            fragment_shader,
            marker: PhantomData,
        }
    }
}

impl<M: PointCloudMaterial> SpecializedRenderPipeline for PointCloudMaterialPipeline<M> {
    type Key = PointCloudPipelineKey;

    fn specialize(&self, key: Self::Key) -> RenderPipelineDescriptor {
        let mut descriptor = self.point_cloud_pipeline.specialize(key);
        descriptor.label = Some("point_cloud_material_pipeline".into());
        descriptor.layout.push(self.material_layout.clone());

        if let (Some(shader), Some(fragment)) =
            (self.fragment_shader.as_ref(), descriptor.fragment.as_mut())
        {
            fragment.shader = shader.clone();
        }

        descriptor
    }
}

/// GPU bind group of one material asset.
pub struct PreparedPointCloudMaterial<M: PointCloudMaterial> {
    pub bind_group: BindGroup,
    marker: PhantomData<M>,
}

impl<M: PointCloudMaterial> RenderAsset for PreparedPointCloudMaterial<M> {
    type SourceAsset = M;

    type Param = (
        SRes<RenderDevice>,
        SRes<PointCloudMaterialPipeline<M>>,
        M::Param,
    );

    fn prepare_asset(
        material: Self::SourceAsset,
        _asset_id: AssetId<Self::SourceAsset>,
        (render_device, pipeline, material_param): &mut SystemParamItem<Self::Param>,
    ) -> Result<Self, PrepareAssetError<Self::SourceAsset>> {
        match material.as_bind_group(&pipeline.material_layout, render_device, material_param) {
            Ok(prepared) => Ok(PreparedPointCloudMaterial {
                bind_group: prepared.bind_group,
                marker: PhantomData,
            }),
            // Usually a texture that has not reached the GPU yet.
            Err(AsBindGroupError::RetryNextUpdate) => {
                Err(PrepareAssetError::RetryNextUpdate(material))
            }
            Err(other) => Err(PrepareAssetError::AsBindGroupError(other)),
        }
    }
}

/// Material asset of every extracted point cloud using `M`.
#[derive(Resource, Deref, DerefMut)]
pub struct RenderPointCloudMaterialInstances<M: PointCloudMaterial>(
    pub MainEntityHashMap<AssetId<M>>,
);

impl<M: PointCloudMaterial> Default for RenderPointCloudMaterialInstances<M> {
    fn default() -> Self {
        Self(MainEntityHashMap::default())
    }
}

fn extract_point_cloud_materials<M: PointCloudMaterial>(
    mut material_instances: ResMut<RenderPointCloudMaterialInstances<M>>,
    point_clouds: Extract<Query<(Entity, &ViewVisibility, &PointCloudMaterial3d<M>)>>,
) {
    material_instances.clear();
    for (entity, view_visibility, material) in &point_clouds {
        if view_visibility.get() {
            material_instances.insert(entity.into(), material.id());
        }
    }
}

/// Adds one phase item per visible cloud using `M` to every view's phase.
fn queue_point_clouds<M: PointCloudMaterial>(
    draw_functions: Res<DrawFunctions<OitPhase>>,
    material_pipeline: Res<PointCloudMaterialPipeline<M>>,
    mut pipelines: ResMut<SpecializedRenderPipelines<PointCloudMaterialPipeline<M>>>,
    pipeline_cache: Res<PipelineCache>,
    render_materials: Res<RenderAssets<PreparedPointCloudMaterial<M>>>,
    material_instances: Res<RenderPointCloudMaterialInstances<M>>,
    render_point_clouds: Res<RenderPointClouds>,
    mut oit_phases: ResMut<ViewSortedRenderPhases<OitPhase>>,
    views: Query<(&ExtractedView, &RenderVisibleEntities, &Msaa)>,
) {
    let draw_function = draw_functions.read().id::<DrawPointCloudMaterial<M>>();

    for (view, visible_entities, msaa) in &views {
        let Some(oit_phase) = oit_phases.get_mut(&view.retained_view_entity) else {
            continue;
        };

        let pipeline_id = pipelines.specialize(
            &pipeline_cache,
            &material_pipeline,
            PointCloudPipelineKey {
                msaa_samples: msaa.samples(),
            },
        );
        let rangefinder = view.rangefinder3d();

        for (render_entity, main_entity) in visible_entities.iter::<PointCloud>() {
            let Some(material_id) = material_instances.get(main_entity) else {
                continue;
            };
            if render_materials.get(*material_id).is_none() {
                continue;
            }
            let Some(cloud) = render_point_clouds.get(main_entity) else {
                continue;
            };
            if !cloud.visible || cloud.gpu.is_none() {
                continue;
            }

            let translation = Vec3::from(cloud.instance.world_from_local.translation);
            let distance = rangefinder.distance_translation(&translation);

            oit_phase.add(OitPhase {
                sort_key: FloatOrd(distance),
                entity: (*render_entity, *main_entity),
                pipeline: pipeline_id,
                draw_function,
                batch_range: 0..1,
                extra_index: PhaseItemExtraIndex::None,
            });
        }
    }
}

pub struct SetPointCloudMaterialBindGroup<M: PointCloudMaterial, const I: usize>(PhantomData<M>);

impl<P: PhaseItem, M: PointCloudMaterial, const I: usize> RenderCommand<P>
    for SetPointCloudMaterialBindGroup<M, I>
{
    type Param = (
        SRes<RenderAssets<PreparedPointCloudMaterial<M>>>,
        SRes<RenderPointCloudMaterialInstances<M>>,
    );
    type ViewQuery = ();
    type ItemQuery = ();

    #[inline]
    fn render<'w>(
        item: &P,
        _view: (),
        _entity: Option<()>,
        (materials, material_instances): SystemParamItem<'w, '_, Self::Param>,
        pass: &mut TrackedRenderPass<'w>,
    ) -> RenderCommandResult {
        let materials = materials.into_inner();
        let material_instances = material_instances.into_inner();

        let Some(material_id) = material_instances.get(&item.main_entity()) else {
            return RenderCommandResult::Skip;
        };
        let Some(material) = materials.get(*material_id) else {
            return RenderCommandResult::Skip;
        };
        pass.set_bind_group(I, &material.bind_group, &[]);
        RenderCommandResult::Success
    }
}

pub type DrawPointCloudMaterial<M> = (
    SetItemPipeline,
    SetSplatViewBindGroup<0>,
    SetPointCloudBindGroup<1>,
    SetPointCloudMaterialBindGroup<M, 2>,
    DrawPointCloudSplats,
);
