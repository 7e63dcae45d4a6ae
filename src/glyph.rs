//! Luminance to glyph quantization

use crate::config::ConfigError;
use crate::raster::FrameContext;
use std::fmt;

/// Terminates the last row in place of a line break
pub const END_MARKER: char = '\0';

/// Ordered characters from empty/dark to dense/bright
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphRamp {
    glyphs: Vec<char>,
}

impl GlyphRamp {
    pub fn new(ramp: &str) -> Result<Self, ConfigError> {
        let glyphs: Vec<char> = ramp.chars().collect();
        if glyphs.len() < 3 {
            return Err(ConfigError::Validation(format!(
                "glyph ramp '{}' needs at least 3 characters",
                ramp
            )));
        }
        Ok(Self { glyphs })
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Ramp index for an average channel intensity.
    ///
    /// `ceil(intensity * (len + 1)) - 2`, clamped to the ramp. Dim pixels
    /// round down to the blank glyph and anything at or above full intensity
    /// lands on the densest one.
    pub fn index_for(&self, intensity: f32) -> usize {
        let n = self.glyphs.len() as f32;
        let raw = (intensity * (n + 1.0)).ceil() - 2.0;
        // NaN survives the clamp and casts to 0
        raw.clamp(0.0, n - 1.0) as usize
    }

    pub fn glyph_for(&self, intensity: f32) -> char {
        self.glyphs[self.index_for(intensity)]
    }
}

impl Default for GlyphRamp {
    fn default() -> Self {
        Self {
            glyphs: crate::config::DEFAULT_GLYPH_RAMP.chars().collect(),
        }
    }
}

/// Fixed-width character grid, one row per pixel row plus a terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextGrid {
    width: usize,
    height: usize,
    cells: Vec<char>,
}

impl TextGrid {
    pub fn new(width: usize, height: usize) -> Self {
        let mut grid = Self {
            width,
            height,
            cells: vec![' '; (width + 1) * height],
        };
        for y in 0..height {
            grid.cells[y * (width + 1) + width] = grid.terminator(y);
        }
        grid
    }

    fn terminator(&self, y: usize) -> char {
        if y + 1 < self.height {
            '\n'
        } else {
            END_MARKER
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw cells including terminators, `(width + 1) * height` long
    pub fn cells(&self) -> &[char] {
        &self.cells
    }

    pub fn get(&self, x: usize, y: usize) -> char {
        self.cells[y * (self.width + 1) + x]
    }

    /// Row `y` without its terminator
    pub fn row(&self, y: usize) -> String {
        let start = y * (self.width + 1);
        self.cells[start..start + self.width].iter().collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.height).map(|y| self.row(y))
    }
}

impl fmt::Display for TextGrid {
    /// Rows joined by line breaks; the end marker is not emitted
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &c in &self.cells {
            if c != END_MARKER {
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}

/// Map every pixel of `ctx` to a glyph, reusing `grid`'s allocation
pub fn quantize_into(ctx: &FrameContext, ramp: &GlyphRamp, grid: &mut TextGrid) {
    if grid.width != ctx.width() || grid.height != ctx.height() {
        *grid = TextGrid::new(ctx.width(), ctx.height());
    }
    let stride = grid.width + 1;

    for (y, row) in ctx.color_buffer().chunks_exact(ctx.width()).enumerate() {
        for (x, color) in row.iter().enumerate() {
            let intensity = (color.x + color.y + color.z) / 3.0;
            grid.cells[y * stride + x] = ramp.glyph_for(intensity);
        }
        grid.cells[y * stride + grid.width] = grid.terminator(y);
    }
}

/// Map every pixel of `ctx` to a glyph
pub fn quantize(ctx: &FrameContext, ramp: &GlyphRamp) -> TextGrid {
    let mut grid = TextGrid::new(ctx.width(), ctx.height());
    quantize_into(ctx, ramp, &mut grid);
    grid
}
