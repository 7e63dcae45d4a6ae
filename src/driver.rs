//! Per-frame orchestration: animation clock, transforms, raster, glyphs

use crate::config::{ClockMode, RenderConfig};
use crate::error::{DriverError, LoadError};
use crate::geometry::GeometryStore;
use crate::glyph::{quantize_into, GlyphRamp, TextGrid};
use crate::mesh::{load_obj, Mesh};
use crate::raster::{draw_geometry, FrameContext, RasterStats};
use crate::shader::ShaderProgram;
use crate::terminal::{Action, FrameSink};
use nalgebra::{Matrix4, Perspective3, Rotation3, Vector3, Vector4};
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Lifecycle of the driver. There is no way back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Rendering,
}

/// Source of elapsed time between frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameClock {
    Fixed(f32),
    Wall(Option<Instant>),
}

impl FrameClock {
    pub fn from_config(config: &RenderConfig) -> Self {
        match config.animation.clock {
            ClockMode::Fixed => FrameClock::Fixed(config.animation.time_step),
            ClockMode::Wall => FrameClock::Wall(None),
        }
    }

    /// Seconds to advance for the next frame
    pub fn tick(&mut self) -> f32 {
        match self {
            FrameClock::Fixed(step) => *step,
            FrameClock::Wall(last) => {
                let now = Instant::now();
                let dt = last.map(|l| now.duration_since(l).as_secs_f32()).unwrap_or(0.0);
                *last = Some(now);
                dt
            }
        }
    }
}

/// Owns the geometry, transforms and frame buffers for one render loop
pub struct FrameDriver {
    config: RenderConfig,
    state: DriverState,
    geometry: GeometryStore,
    shader: ShaderProgram,
    ctx: FrameContext,
    ramp: GlyphRamp,
    grid: TextGrid,
    clock: FrameClock,
    base_color: Vector4<f32>,
    elapsed: f32,
    frame: u64,
    last_stats: RasterStats,
}

impl FrameDriver {
    pub fn new(config: RenderConfig) -> Result<Self, DriverError> {
        config.validate()?;
        let ramp = GlyphRamp::new(&config.glyph_ramp)?;
        let base_color = Vector3::from(config.lighting.base_color).push(1.0);

        Ok(Self {
            state: DriverState::Idle,
            geometry: GeometryStore::new(),
            shader: ShaderProgram::from_lighting(&config.lighting),
            ctx: FrameContext::new(config.width, config.height),
            grid: TextGrid::new(config.width, config.height),
            clock: FrameClock::from_config(&config),
            ramp,
            base_color,
            elapsed: 0.0,
            frame: 0,
            last_stats: RasterStats::default(),
            config,
        })
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Swap in new geometry. On failure the previous geometry (if any) and
    /// state are kept.
    pub fn load_meshes(&mut self, meshes: &[Mesh]) -> Result<(), LoadError> {
        let geometry = GeometryStore::from_meshes(meshes, self.config.geometry.index_mode)?;
        self.geometry = geometry;
        if self.state == DriverState::Idle {
            tracing::debug!("Driver entering rendering state");
        }
        self.state = DriverState::Rendering;
        Ok(())
    }

    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), LoadError> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "Loading model");
        let meshes = load_obj(path)?;
        self.load_meshes(&meshes)
    }

    pub fn geometry(&self) -> &GeometryStore {
        &self.geometry
    }

    pub fn shader(&self) -> &ShaderProgram {
        &self.shader
    }

    pub fn frame_context(&self) -> &FrameContext {
        &self.ctx
    }

    pub fn grid(&self) -> &TextGrid {
        &self.grid
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn last_stats(&self) -> RasterStats {
        self.last_stats
    }

    /// Restart the animation from time zero
    pub fn reset_clock(&mut self) {
        self.elapsed = 0.0;
        self.clock = FrameClock::from_config(&self.config);
    }

    /// Recompute world and projection for the current elapsed time
    pub fn update_transforms(&mut self) -> Result<(), DriverError> {
        let normalization = self.geometry.normalization().ok_or(DriverError::NotLoaded)?;
        let camera = &self.config.camera;

        let placement = Matrix4::new_translation(&Vector3::from(camera.offset));
        let spin = self.elapsed * self.config.animation.spin_rate;
        let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), camera.tilt)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), spin)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), spin);

        self.shader.world = placement * rotation.to_homogeneous() * normalization.matrix();
        self.shader.view = Matrix4::identity();
        self.shader.projection = Perspective3::new(
            self.config.aspect(),
            camera.fov_degrees.to_radians(),
            camera.near,
            camera.far,
        )
        .to_homogeneous();
        Ok(())
    }

    /// Advance the clock and produce the next text frame
    pub fn render_frame(&mut self) -> Result<&TextGrid, DriverError> {
        if self.state != DriverState::Rendering {
            return Err(DriverError::NotLoaded);
        }

        self.elapsed += self.clock.tick();
        self.update_transforms()?;

        self.ctx.clear();
        let stats = draw_geometry(&mut self.ctx, &self.geometry, &self.shader, self.base_color);
        quantize_into(&self.ctx, &self.ramp, &mut self.grid);

        if stats.degenerate > 0 {
            tracing::debug!(dropped = stats.degenerate, "Triangles dropped at w == 0");
        }
        tracing::debug!(
            frame = self.frame,
            elapsed = self.elapsed,
            triangles = stats.triangles,
            culled = stats.culled,
            fragments = stats.fragments,
            "Frame rendered"
        );

        self.last_stats = stats;
        self.frame += 1;
        Ok(&self.grid)
    }
}

/// Drive frames into `sink` until `stop` is set, the sink asks to quit, or
/// `max_frames` have been presented. `stop` is only checked between frames.
pub fn run<S: FrameSink>(
    driver: &mut FrameDriver,
    sink: &mut S,
    stop: &AtomicBool,
    max_frames: Option<u64>,
) -> ExitCode {
    let frame_interval = Duration::from_millis(driver.config().animation.frame_interval_ms);
    let mut paused = false;
    let mut presented = 0u64;

    while !stop.load(Ordering::Relaxed) {
        match sink.poll_action(Duration::from_millis(1)) {
            Ok(Action::Quit) => stop.store(true, Ordering::Relaxed),
            Ok(Action::Pause) => paused = !paused,
            Ok(Action::Reset) => driver.reset_clock(),
            Ok(Action::None) => {}
            Err(e) => tracing::warn!(error = %e, "Input error"),
        }
        if stop.load(Ordering::Relaxed) {
            break;
        }
        if paused {
            std::thread::sleep(Duration::from_millis(16));
            continue;
        }

        let started = Instant::now();
        let status = match driver.render_frame() {
            Ok(_) => {
                let stats = driver.last_stats();
                format!(
                    "frame {} | t {:.2} | {} tris, {} culled, {} px | [SPACE] Pause  [R]eset  [Q]uit",
                    driver.frame_count(),
                    driver.elapsed(),
                    stats.triangles,
                    stats.culled,
                    stats.fragments
                )
            }
            Err(e) => {
                tracing::error!(error = %e, "Render failed");
                return ExitCode::FAILURE;
            }
        };

        if let Err(e) = sink.present(driver.grid(), &status) {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                break;
            }
            tracing::error!(error = %e, "Display sink failed");
            return ExitCode::FAILURE;
        }

        presented += 1;
        if max_frames.is_some_and(|max| presented >= max) {
            break;
        }

        let spent = started.elapsed();
        if spent < frame_interval {
            std::thread::sleep(frame_interval - spent);
        }
    }

    tracing::info!(frames = presented, "Render loop finished");
    ExitCode::SUCCESS
}
