//! ascii-raster - spin a mesh in the terminal with a software rasterizer
//!
//! Controls (interactive mode):
//! - Space: Pause
//! - R: Restart the animation
//! - Q, Escape or Ctrl-C: Quit
//!
//! Usage:
//!   ascii-raster model.obj                     - Render in the terminal
//!   ascii-raster model.obj --frames 10 -o out  - Write frames to out/frame_XXX.txt

use anyhow::Context;
use ascii_raster::config::RenderConfig;
use ascii_raster::driver::{run, FrameDriver};
use ascii_raster::terminal::{DirectorySink, TerminalDisplay, WriterSink};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Parser)]
#[command(name = "ascii-raster")]
#[command(version)]
#[command(about = "Software rasterizer that renders a mesh as text")]
struct Cli {
    /// Wavefront OBJ file to render
    model: Option<PathBuf>,

    /// Path to YAML config file (defaults to ./ascii-raster.yaml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Set logging level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Override raster width in characters
    #[arg(long)]
    width: Option<usize>,

    /// Override raster height in characters
    #[arg(long)]
    height: Option<usize>,

    /// Size the raster to the current terminal
    #[arg(long, conflicts_with_all = ["width", "height"])]
    fit: bool,

    /// Override the glyph ramp (dark to bright)
    #[arg(long)]
    ramp: Option<String>,

    /// Stop after this many frames
    #[arg(short, long)]
    frames: Option<u64>,

    /// Write frames as text files into this directory instead of the terminal
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Print frames to stdout without taking over the terminal
    #[arg(long, conflicts_with = "output")]
    plain: bool,
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level_filter = if let Some(level) = cli.log_level {
        level.to_string()
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            .to_string()
    };
    let builder = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::new(&level_filter));

    match &cli.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn build_config(cli: &Cli) -> anyhow::Result<RenderConfig> {
    let mut config = RenderConfig::load_or_default(cli.config.as_deref())
        .context("loading configuration")?;

    if cli.fit {
        let (width, height) = TerminalDisplay::get_size().context("querying terminal size")?;
        config.width = width.max(10);
        config.height = height.max(10);
    }
    if let Some(width) = cli.width {
        config.width = width;
    }
    if let Some(height) = cli.height {
        config.height = height;
    }
    if let Some(ramp) = &cli.ramp {
        config.glyph_ramp = ramp.clone();
    }
    config.validate().context("validating configuration")?;
    Ok(config)
}

#[cfg(feature = "file-dialog")]
fn pick_model() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Wavefront OBJ", &["obj"])
        .set_title("Choose a model to render")
        .pick_file()
}

#[cfg(not(feature = "file-dialog"))]
fn pick_model() -> Option<PathBuf> {
    None
}

fn startup(cli: &Cli) -> anyhow::Result<FrameDriver> {
    let config = build_config(cli)?;

    let model = match cli.model.clone().or_else(pick_model) {
        Some(path) => path,
        None => anyhow::bail!("no model selected"),
    };

    let mut driver = FrameDriver::new(config)?;
    driver
        .load_file(&model)
        .with_context(|| format!("loading {}", model.display()))?;
    Ok(driver)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    let mut driver = match startup(&cli) {
        Ok(driver) => driver,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let stop = AtomicBool::new(false);

    if let Some(dir) = &cli.output {
        let mut sink = match DirectorySink::new(dir) {
            Ok(sink) => sink,
            Err(e) => {
                eprintln!("Failed to create output directory {}: {}", dir.display(), e);
                return ExitCode::FAILURE;
            }
        };
        return run(&mut driver, &mut sink, &stop, Some(cli.frames.unwrap_or(10)));
    }

    if cli.plain {
        let mut sink = WriterSink::new(std::io::stdout().lock(), true);
        return run(&mut driver, &mut sink, &stop, cli.frames);
    }

    let mut terminal = match TerminalDisplay::new() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Failed to initialize terminal: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let code = run(&mut driver, &mut terminal, &stop, cli.frames);
    drop(terminal);
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from(["ascii-raster", "model.obj", "--width", "40", "--height", "20", "--ramp", " .:#"]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.width, 40);
        assert_eq!(config.height, 20);
        assert_eq!(config.glyph_ramp, " .:#");
    }

    #[test]
    fn test_cli_rejects_bad_ramp() {
        let cli = Cli::parse_from(["ascii-raster", "--ramp", "#"]);
        assert!(build_config(&cli).is_err());
    }

    #[test]
    fn test_missing_model_fails_startup() {
        let cli = Cli::parse_from(["ascii-raster", "/nonexistent/model.obj", "--width", "10", "--height", "10"]);
        assert!(startup(&cli).is_err());
    }
}
