use bevy::math::FloatOrd;
use bevy::prelude::*;
use bevy::render::render_phase::{
    CachedRenderPipelinePhaseItem, DrawFunctionId, PhaseItem, PhaseItemExtraIndex,
    SortedPhaseItem,
};
use bevy::render::render_resource::CachedRenderPipelineId;
use bevy::render::sync_world::MainEntity;
use std::ops::Range;

/// Phase item for point clouds drawn into the accumulation targets.
///
/// Accumulation is order independent, so the sort only groups draws front to
/// back for early depth rejection; it has no effect on the result.
pub struct OitPhase {
    pub sort_key: FloatOrd,
    pub entity: (Entity, MainEntity),
    pub pipeline: CachedRenderPipelineId,
    pub draw_function: DrawFunctionId,
    pub batch_range: Range<u32>,
    pub extra_index: PhaseItemExtraIndex,
}

impl PhaseItem for OitPhase {
    fn entity(&self) -> Entity {
        self.entity.0
    }

    fn main_entity(&self) -> MainEntity {
        self.entity.1
    }

    fn draw_function(&self) -> DrawFunctionId {
        self.draw_function
    }

    fn batch_range(&self) -> &Range<u32> {
        &self.batch_range
    }

    fn batch_range_mut(&mut self) -> &mut Range<u32> {
        &mut self.batch_range
    }

    fn extra_index(&self) -> PhaseItemExtraIndex {
        self.extra_index.clone()
    }

    fn batch_range_and_extra_index_mut(&mut self) -> (&mut Range<u32>, &mut PhaseItemExtraIndex) {
        (&mut self.batch_range, &mut self.extra_index)
    }
}

impl SortedPhaseItem for OitPhase {
    type SortKey = FloatOrd;

    fn sort_key(&self) -> Self::SortKey {
        self.sort_key
    }

    fn sort(items: &mut [Self]) {
        items.sort_by_key(SortedPhaseItem::sort_key);
    }

    fn indexed(&self) -> bool {
        false
    }
}

impl CachedRenderPipelinePhaseItem for OitPhase {
    fn cached_pipeline(&self) -> CachedRenderPipelineId {
        self.pipeline
    }
}
