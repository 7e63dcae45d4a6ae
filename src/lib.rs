//! ASCII software rasterizer
//!
//! Renders a triangle mesh through a small fixed-function pipeline (vertex
//! transform, scanline fill, Phong shading, depth test) into a color buffer,
//! then quantizes it into a grid of glyphs for terminal display.

pub mod config;
pub mod driver;
pub mod error;
pub mod geometry;
pub mod glyph;
pub mod mesh;
pub mod raster;
pub mod shader;
pub mod terminal;

pub use config::{RenderConfig, DEFAULT_GLYPH_RAMP};
pub use driver::{run, DriverState, FrameDriver};
pub use error::{DriverError, LoadError};
pub use geometry::GeometryStore;
pub use glyph::{GlyphRamp, TextGrid};
pub use raster::FrameContext;
pub use shader::{ShaderProgram, VertexAttributes};
pub use terminal::{FrameSink, TerminalDisplay};
