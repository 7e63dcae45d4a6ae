//! Scanline triangle rasterizer with depth testing
//!
//! Triangles are transformed by the shader, divided by `w`, mapped into the
//! viewport, culled by winding, then filled span by span. Every attribute in
//! [`VertexAttributes`] is interpolated linearly in screen space.

use crate::geometry::GeometryStore;
use crate::shader::{ShaderProgram, VertexAttributes};
use nalgebra::{Vector3, Vector4};

/// Maps normalized device coordinates onto the pixel grid.
///
/// Y is flipped so row 0 is the top of the text grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
}

impl Viewport {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Perspective-divide a clip-space position and map it to screen space.
    /// Returns `None` for `w == 0` or non-finite results.
    pub fn project(&self, clip: Vector4<f32>) -> Option<Vector4<f32>> {
        if clip.w == 0.0 {
            return None;
        }
        let ndc = clip / clip.w;
        let half_w = self.width as f32 * 0.5;
        let half_h = self.height as f32 * 0.5;
        let screen = Vector4::new(ndc.x * half_w + half_w, -ndc.y * half_h + half_h, ndc.z, ndc.w);
        if screen.iter().all(|c| c.is_finite()) {
            Some(screen)
        } else {
            None
        }
    }
}

/// Color, depth and coverage buffers for one frame, row-major
#[derive(Debug, Clone)]
pub struct FrameContext {
    width: usize,
    height: usize,
    color: Vec<Vector4<f32>>,
    depth: Vec<f32>,
    written: Vec<bool>,
}

impl FrameContext {
    pub fn new(width: usize, height: usize) -> Self {
        let len = width * height;
        Self {
            width,
            height,
            color: vec![Vector4::zeros(); len],
            depth: vec![0.0; len],
            written: vec![false; len],
        }
    }

    /// Zero every buffer
    pub fn clear(&mut self) {
        self.color.fill(Vector4::zeros());
        self.depth.fill(0.0);
        self.written.fill(false);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        x + y * self.width
    }

    pub fn color_at(&self, x: usize, y: usize) -> Vector4<f32> {
        self.color[self.index(x, y)]
    }

    pub fn depth_at(&self, x: usize, y: usize) -> f32 {
        self.depth[self.index(x, y)]
    }

    /// True once any fragment has landed on this pixel this frame
    pub fn is_written(&self, x: usize, y: usize) -> bool {
        self.written[self.index(x, y)]
    }

    pub fn color_buffer(&self) -> &[Vector4<f32>] {
        &self.color
    }

    pub fn depth_buffer(&self) -> &[f32] {
        &self.depth
    }

    pub fn written_count(&self) -> usize {
        self.written.iter().filter(|w| **w).count()
    }

    /// True when a fragment at `z` should replace the stored one. The stored
    /// fragment survives when it is nearer than or as near as `z`.
    fn depth_test(&self, idx: usize, z: f32) -> bool {
        !(self.written[idx] && self.depth[idx] <= z)
    }

    fn write(&mut self, idx: usize, color: Vector4<f32>, z: f32) {
        self.color[idx] = color;
        self.depth[idx] = z;
        self.written[idx] = true;
    }
}

/// Per-call counters, useful for logging and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterStats {
    pub triangles: usize,
    pub culled: usize,
    /// Triangles dropped because a vertex had `w == 0` or blew up
    pub degenerate: usize,
    /// Triangles referencing vertices that don't exist
    pub invalid: usize,
    pub fragments: usize,
    pub depth_rejected: usize,
}

/// Twice the signed area of the screen-space triangle `abc`
#[inline]
pub fn signed_area(a: &Vector4<f32>, b: &Vector4<f32>, c: &Vector4<f32>) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
}

/// Fill one triangle whose positions are already in screen space.
///
/// Triangles with positive signed area face away (the viewport flips Y, so
/// front faces come out clockwise) and are dropped.
pub fn rasterize_triangle(
    ctx: &mut FrameContext,
    shader: &ShaderProgram,
    mut v: [VertexAttributes; 3],
    stats: &mut RasterStats,
) {
    stats.triangles += 1;

    if signed_area(&v[0].position, &v[1].position, &v[2].position) > 0.0 {
        stats.culled += 1;
        return;
    }

    // Sort by ascending Y
    if v[0].position.y > v[1].position.y {
        v.swap(0, 1);
    }
    if v[1].position.y > v[2].position.y {
        v.swap(1, 2);
    }
    if v[0].position.y > v[1].position.y {
        v.swap(0, 1);
    }
    let [top, mid, bottom] = v;

    // Clamping the bounds keeps off-screen triangles from spinning through
    // empty scanlines. Zero-height triangles yield an empty range here,
    // before any division by the edge height can happen.
    let y_start = top.position.y.ceil().max(0.0) as usize;
    let y_end = bottom.position.y.ceil().min(ctx.height as f32).max(0.0) as usize;

    for y in y_start..y_end {
        let fy = y as f32;

        let long = top.lerp(&bottom, edge_t(&top, &bottom, fy));
        let short = if fy < mid.position.y {
            top.lerp(&mid, edge_t(&top, &mid, fy))
        } else {
            mid.lerp(&bottom, edge_t(&mid, &bottom, fy))
        };
        let (left, right) = if long.position.x <= short.position.x {
            (long, short)
        } else {
            (short, long)
        };

        let x_start = left.position.x.ceil().max(0.0) as usize;
        let x_end = right.position.x.ceil().min(ctx.width as f32).max(0.0) as usize;
        let span = right.position.x - left.position.x;

        for x in x_start..x_end {
            let fragment = left.lerp(&right, (x as f32 - left.position.x) / span);
            let z = fragment.position.z;
            let idx = ctx.index(x, y);

            if !ctx.depth_test(idx, z) {
                stats.depth_rejected += 1;
                continue;
            }

            let color = shader.fragment(&fragment);
            ctx.write(idx, color, z);
            stats.fragments += 1;
        }
    }
}

#[inline]
fn edge_t(from: &VertexAttributes, to: &VertexAttributes, y: f32) -> f32 {
    (y - from.position.y) / (to.position.y - from.position.y)
}

/// Run every indexed triangle in `geometry` through the pipeline
pub fn draw_geometry(
    ctx: &mut FrameContext,
    geometry: &GeometryStore,
    shader: &ShaderProgram,
    base_color: Vector4<f32>,
) -> RasterStats {
    let mut stats = RasterStats::default();
    let viewport = ctx.viewport();

    'triangles: for triangle in geometry.indices().chunks_exact(3) {
        let mut screen = [VertexAttributes::new(Vector3::zeros(), Vector3::zeros(), base_color); 3];

        for (slot, &index) in screen.iter_mut().zip(triangle) {
            let (Some(position), Some(normal)) = (geometry.position(index), geometry.normal(index)) else {
                stats.invalid += 1;
                continue 'triangles;
            };

            let mut out = shader.vertex(&VertexAttributes::new(position, normal, base_color));
            match viewport.project(out.position) {
                Some(p) => out.position = p,
                None => {
                    tracing::trace!(index, "Dropping triangle with degenerate projection");
                    stats.degenerate += 1;
                    continue 'triangles;
                }
            }
            *slot = out;
        }

        rasterize_triangle(ctx, shader, screen, &mut stats);
    }

    if stats.invalid > 0 {
        tracing::warn!(
            skipped = stats.invalid,
            "Skipped triangles referencing missing vertices"
        );
    }

    stats
}
