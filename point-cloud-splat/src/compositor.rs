//! Software rasteriser that runs a whole frame on the CPU.
//!
//! Mirrors what the GPU does with the accumulation pipeline: every point is
//! expanded into two triangles, each multisample position covered by a
//! triangle becomes a fragment, and the fragment's material colour is
//! accumulated. Rows are rasterised in parallel; a sample is only ever
//! written by the thread owning its row.

use std::ops::Range;

use bevy::math::{Vec2, Vec3, Vec4};
use constants::render_settings::SUPPORTED_SAMPLE_COUNTS;
use rayon::prelude::*;

use crate::accumulate::AccumulationTarget;
use crate::billboard::{BillboardVertex, generate_quad};
use crate::camera::SplatView;
use crate::error::{SplatError, SplatResult};
use crate::material::{MaterialColor, SplatFragment};
use crate::point::{Point, PointCloudStore};
use crate::resolve::{ResolvedFrame, resolve_target};
use crate::validation::{validate_instance, validate_points, vertex_count};

/// Standard multisample positions in sixteenths of a pixel, relative to the
/// pixel centre.
fn standard_sample_offsets(sample_count: u32) -> Vec<Vec2> {
    let sixteenths: &[(i8, i8)] = match sample_count {
        1 => &[(0, 0)],
        2 => &[(4, 4), (-4, -4)],
        4 => &[(-2, -6), (6, -2), (-6, 2), (2, 6)],
        _ => &[
            (1, -3),
            (-1, 3),
            (5, 1),
            (-3, -5),
            (-5, 5),
            (-7, -1),
            (3, 7),
            (7, -7),
        ],
    };
    sixteenths
        .iter()
        .map(|&(x, y)| Vec2::new(0.5 + x as f32 / 16.0, 0.5 + y as f32 / 16.0))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoftwareCompositor {
    width: u32,
    height: u32,
    sample_count: u32,
    sample_positions: Vec<Vec2>,
}

impl SoftwareCompositor {
    pub fn new(width: u32, height: u32, sample_count: u32) -> SplatResult<Self> {
        if !SUPPORTED_SAMPLE_COUNTS.contains(&sample_count) {
            return Err(SplatError::Config(format!(
                "unsupported sample count {sample_count}, expected one of {SUPPORTED_SAMPLE_COUNTS:?}"
            )));
        }
        if width == 0 || height == 0 {
            return Err(SplatError::Config(format!(
                "viewport must not be empty ({width}x{height})"
            )));
        }

        Ok(Self {
            width,
            height,
            sample_count,
            sample_positions: standard_sample_offsets(sample_count),
        })
    }

    pub fn new_target(&self) -> SplatResult<AccumulationTarget> {
        AccumulationTarget::new(self.width, self.height, self.sample_count)
    }

    /// Accumulates every instance of `store` into `target` using one material.
    /// Multiple draws may land in the same target in any order before it is
    /// resolved.
    pub fn draw<S, M>(
        &self,
        target: &mut AccumulationTarget,
        view: &SplatView,
        store: &S,
        material: &M,
    ) -> SplatResult<()>
    where
        S: PointCloudStore + ?Sized,
        M: MaterialColor + ?Sized,
    {
        if target.width() != self.width
            || target.height() != self.height
            || target.sample_count() != self.sample_count
        {
            return Err(SplatError::Config(format!(
                "target is {}x{}x{}, compositor expects {}x{}x{}",
                target.width(),
                target.height(),
                target.sample_count(),
                self.width,
                self.height,
                self.sample_count
            )));
        }

        let mut triangles = Vec::new();
        for index in 0..store.instance_count() {
            let instance = store.instance(index);
            let points = store.points(index);
            validate_instance(index, instance)?;
            validate_points(index, points)?;
            vertex_count(points.len())?;

            for packed in points {
                let quad = generate_quad(view, instance, Point::from_packed(*packed));
                triangles.extend(self.setup_triangle([&quad[0], &quad[1], &quad[2]]));
                triangles.extend(self.setup_triangle([&quad[3], &quad[4], &quad[5]]));
            }
        }

        if triangles.is_empty() {
            return Ok(());
        }

        // Bin triangles by the rows their bounds touch so each row only walks
        // its own triangles.
        let mut rows: Vec<Vec<&ScreenTriangle>> = vec![Vec::new(); self.height as usize];
        for triangle in &triangles {
            if let Some(span) = triangle.row_span(self.height) {
                for row_triangles in &mut rows[span] {
                    row_triangles.push(triangle);
                }
            }
        }

        let row_stride = target.row_stride();
        target
            .samples_mut()
            .par_chunks_mut(row_stride)
            .zip(rows.par_iter())
            .enumerate()
            .for_each(|(y, (row, row_triangles))| {
                for triangle in row_triangles {
                    let x_start = (triangle.min.x.floor().max(0.0)) as u32;
                    let x_end = (triangle.max.x.ceil().min(self.width as f32)) as u32;
                    for x in x_start..x_end {
                        for (s, offset) in self.sample_positions.iter().enumerate() {
                            let position = Vec2::new(x as f32, y as f32) + *offset;
                            let Some(fragment) = triangle.fragment_at(view, position) else {
                                continue;
                            };
                            let color = material.color(view, &fragment);
                            row[x as usize * self.sample_count as usize + s]
                                .accumulate(color, fragment.view_depth);
                        }
                    }
                }
            });

        Ok(())
    }

    /// Clears a fresh target, draws `store` and resolves it.
    pub fn render<S, M>(&self, view: &SplatView, store: &S, material: &M) -> SplatResult<ResolvedFrame>
    where
        S: PointCloudStore + ?Sized,
        M: MaterialColor + ?Sized,
    {
        let mut target = self.new_target()?;
        self.draw(&mut target, view, store, material)?;
        Ok(resolve_target(&target))
    }

    fn setup_triangle(&self, vertices: [&BillboardVertex; 3]) -> Option<ScreenTriangle> {
        // No near-plane clipping: anything reaching behind the eye is dropped.
        if vertices.iter().any(|v| v.clip_position.w <= 0.0) {
            return None;
        }

        let size = Vec2::new(self.width as f32, self.height as f32);
        let mut screen = [Vec2::ZERO; 3];
        let mut depth = [0.0; 3];
        let mut inv_w = [0.0; 3];
        for (i, vertex) in vertices.iter().enumerate() {
            let clip = vertex.clip_position;
            let ndc = clip.truncate() / clip.w;
            screen[i] = Vec2::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5) * size;
            depth[i] = ndc.z;
            inv_w[i] = 1.0 / clip.w;
        }

        let mut order = [0, 1, 2];
        let mut area = edge(screen[0], screen[1], screen[2]);
        if area == 0.0 || !area.is_finite() {
            return None;
        }
        if area < 0.0 {
            order.swap(1, 2);
            area = -area;
        }

        let pick = |i: usize| order[i];
        Some(ScreenTriangle {
            screen: [screen[pick(0)], screen[pick(1)], screen[pick(2)]],
            depth: [depth[pick(0)], depth[pick(1)], depth[pick(2)]],
            inv_w: [inv_w[pick(0)], inv_w[pick(1)], inv_w[pick(2)]],
            world: [
                vertices[pick(0)].world_position,
                vertices[pick(1)].world_position,
                vertices[pick(2)].world_position,
            ],
            uv: [vertices[pick(0)].uv, vertices[pick(1)].uv, vertices[pick(2)].uv],
            area,
            min: screen[0].min(screen[1]).min(screen[2]),
            max: screen[0].max(screen[1]).max(screen[2]),
        })
    }
}

/// Twice the signed area of `(a, b, p)`. Endpoints are put in a fixed order
/// first so that `edge(a, b, p) == -edge(b, a, p)` holds exactly, which keeps
/// samples on a shared diagonal from being counted by both triangles.
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    let raw = |a: Vec2, b: Vec2| (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if (a.y, a.x) <= (b.y, b.x) {
        raw(a, b)
    } else {
        -raw(b, a)
    }
}

/// Tie-break for samples exactly on an edge. Antisymmetric in the edge
/// direction, so of two triangles sharing an edge exactly one owns it.
fn owns_edge(a: Vec2, b: Vec2) -> bool {
    let d = b - a;
    d.y > 0.0 || (d.y == 0.0 && d.x < 0.0)
}

fn inside(e: f32, a: Vec2, b: Vec2) -> bool {
    e > 0.0 || (e == 0.0 && owns_edge(a, b))
}

struct ScreenTriangle {
    screen: [Vec2; 3],
    depth: [f32; 3],
    inv_w: [f32; 3],
    world: [Vec3; 3],
    uv: [Vec2; 3],
    area: f32,
    min: Vec2,
    max: Vec2,
}

impl ScreenTriangle {
    /// Rows whose samples can fall inside the bounds, clamped to the target.
    fn row_span(&self, height: u32) -> Option<Range<usize>> {
        let first = (self.min.y - 1.0).ceil().max(0.0);
        let last = self.max.y.floor().min(height as f32 - 1.0);
        (first <= last).then(|| first as usize..last as usize + 1)
    }

    fn fragment_at(&self, view: &SplatView, p: Vec2) -> Option<SplatFragment> {
        let [s0, s1, s2] = self.screen;
        let e0 = edge(s1, s2, p);
        let e1 = edge(s2, s0, p);
        let e2 = edge(s0, s1, p);
        if !(inside(e0, s1, s2) && inside(e1, s2, s0) && inside(e2, s0, s1)) {
            return None;
        }

        let b = Vec3::new(e0, e1, e2) / self.area;
        let depth = b.x * self.depth[0] + b.y * self.depth[1] + b.z * self.depth[2];
        if !(0.0..=1.0).contains(&depth) {
            return None;
        }

        let perspective = b * Vec3::from_array(self.inv_w);
        let norm = perspective.x + perspective.y + perspective.z;
        if norm <= 0.0 {
            return None;
        }
        let weights = perspective / norm;

        let world_position =
            self.world[0] * weights.x + self.world[1] * weights.y + self.world[2] * weights.z;
        let uv = self.uv[0] * weights.x + self.uv[1] * weights.y + self.uv[2] * weights.z;

        Some(SplatFragment {
            world_position,
            uv,
            view_depth: view.view_depth(world_position),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulate::oit_weight;
    use crate::material::UniformColor;
    use crate::point::{PointCloudFrame, PointCloudInstance};

    fn front_view() -> SplatView {
        SplatView::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 0.5, 1.0)
    }

    #[test]
    fn rejects_bad_sample_counts() {
        assert!(SoftwareCompositor::new(8, 8, 3).is_err());
        assert!(SoftwareCompositor::new(0, 8, 1).is_err());
        assert_eq!(standard_sample_offsets(8).len(), 8);
    }

    #[test]
    fn edge_is_exactly_antisymmetric() {
        let a = Vec2::new(0.3, 7.1);
        let b = Vec2::new(5.9, 1.7);
        let p = Vec2::new(3.3, 3.3);
        assert_eq!(edge(a, b, p), -edge(b, a, p));
        assert_ne!(owns_edge(a, b), owns_edge(b, a));
    }

    #[test]
    fn shared_diagonal_is_counted_once() {
        // Odd viewport so the centre sample sits exactly on the quad diagonal.
        let compositor = SoftwareCompositor::new(33, 33, 1).unwrap();
        let frame = PointCloudFrame::new()
            .with_instance(PointCloudInstance::default(), vec![Vec4::new(0.0, 0.0, 0.0, 1.0)]);
        let mut target = compositor.new_target().unwrap();
        compositor
            .draw(&mut target, &front_view(), &frame, &UniformColor { color: Vec4::new(1.0, 1.0, 1.0, 0.5) })
            .unwrap();
        let centre = target.sample(16, 16, 0);
        assert_eq!(centre.reveal, 0.5);
    }

    #[test]
    fn mismatched_target_is_rejected() {
        let compositor = SoftwareCompositor::new(4, 4, 1).unwrap();
        let mut target = AccumulationTarget::new(4, 4, 4).unwrap();
        let result = compositor.draw(&mut target, &front_view(), &PointCloudFrame::new(), &UniformColor::default());
        assert!(matches!(result, Err(SplatError::Config(_))));
    }

    #[test]
    fn invalid_points_abort_the_draw() {
        let compositor = SoftwareCompositor::new(4, 4, 1).unwrap();
        let frame = PointCloudFrame::new()
            .with_instance(PointCloudInstance::default(), vec![Vec4::new(0.0, 0.0, 0.0, -1.0)]);
        let result = compositor.render(&front_view(), &frame, &UniformColor::default());
        assert!(matches!(result, Err(SplatError::NegativeSize { .. })));
    }

    fn triangle_spanning(min_y: f32, max_y: f32) -> ScreenTriangle {
        ScreenTriangle {
            screen: [Vec2::ZERO; 3],
            depth: [0.0; 3],
            inv_w: [1.0; 3],
            world: [Vec3::ZERO; 3],
            uv: [Vec2::ZERO; 3],
            area: 1.0,
            min: Vec2::new(0.0, min_y),
            max: Vec2::new(4.0, max_y),
        }
    }

    #[test]
    fn row_span_covers_touched_rows_only() {
        assert_eq!(triangle_spanning(2.5, 4.2).row_span(16), Some(2..5));
        assert_eq!(triangle_spanning(3.0, 3.0).row_span(16), Some(2..4));
        assert_eq!(triangle_spanning(-40.0, 100.0).row_span(16), Some(0..16));
        assert_eq!(triangle_spanning(-5.0, -0.5).row_span(16), None);
        assert_eq!(triangle_spanning(17.5, 20.0).row_span(16), None);
    }

    #[test]
    fn many_small_points_land_in_their_own_rows() {
        let view = front_view();
        let points: Vec<Vec4> = (0..64)
            .map(|i| {
                let y = -1.5 + 3.0 * i as f32 / 63.0;
                Vec4::new(0.0, y, 0.0, 0.5)
            })
            .collect();
        let frame = PointCloudFrame::new().with_instance(PointCloudInstance::default(), points);
        let compositor = SoftwareCompositor::new(8, 64, 1).unwrap();
        let resolved = compositor.render(&view, &frame, &UniformColor::default()).unwrap();
        let image = resolved.to_image(Vec4::ZERO);
        let lit_rows = (0..64)
            .filter(|y| (0..8).any(|x| image[y * 8 + x].w > 0.0))
            .count();
        assert!(lit_rows > 8);
        assert!(image.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn weight_uses_linear_view_depth() {
        let compositor = SoftwareCompositor::new(16, 16, 1).unwrap();
        let mut target = compositor.new_target().unwrap();
        let frame = PointCloudFrame::new()
            .with_instance(PointCloudInstance::default(), vec![Vec4::new(0.0, 0.0, 0.0, 0.5)]);
        compositor
            .draw(&mut target, &front_view(), &frame, &UniformColor::default())
            .unwrap();

        let sample = target.sample(8, 8, 0);
        let expected = oit_weight(Vec4::ONE, 5.0);
        assert!((sample.color_accum.w - expected).abs() <= expected * 1e-4);
        assert_eq!(sample.reveal, 0.0);
    }

    #[test]
    fn points_behind_camera_are_dropped() {
        let compositor = SoftwareCompositor::new(16, 16, 1).unwrap();
        let frame = PointCloudFrame::new()
            .with_instance(PointCloudInstance::default(), vec![Vec4::new(0.0, 0.0, 10.0, 1.0)]);
        let resolved = compositor.render(&front_view(), &frame, &UniformColor::default()).unwrap();
        assert!(resolved.to_image(Vec4::ZERO).iter().all(|c| *c == Vec4::ZERO));
    }
}
