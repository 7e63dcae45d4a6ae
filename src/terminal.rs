//! Display sinks and keyboard handling

use crate::glyph::TextGrid;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::fs;
use std::io::{self, BufWriter, Stdout, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Something that accepts one finished text frame at a time
pub trait FrameSink {
    /// Show `grid`. Cursor/position reset between frames is the sink's job.
    fn present(&mut self, grid: &TextGrid, status: &str) -> io::Result<()>;

    /// Pending user action, if the sink has an input side
    fn poll_action(&mut self, _timeout: Duration) -> io::Result<Action> {
        Ok(Action::None)
    }
}

/// Terminal display handler with buffered output
pub struct TerminalDisplay {
    buffer: BufWriter<Stdout>,
}

impl TerminalDisplay {
    pub fn new() -> io::Result<Self> {
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;
        terminal::enable_raw_mode()?;
        execute!(stdout, terminal::Clear(terminal::ClearType::All))?;

        Ok(Self {
            buffer: BufWriter::new(stdout),
        })
    }

    /// Current terminal size in cells, minus the status line
    pub fn get_size() -> io::Result<(usize, usize)> {
        let (width, height) = terminal::size()?;
        Ok((width as usize, height.saturating_sub(1) as usize))
    }
}

impl FrameSink for TerminalDisplay {
    /// Writes line by line with explicit positioning so a row wider than
    /// the terminal can't push the rest of the frame down
    fn present(&mut self, grid: &TextGrid, status: &str) -> io::Result<()> {
        // Hide cursor, disable line wrap
        write!(self.buffer, "\x1b[?25l\x1b[?7l")?;

        for (i, line) in grid.rows().enumerate() {
            write!(self.buffer, "\x1b[{};1H{}", i + 1, line)?;
        }

        // Clear leftovers from a larger previous frame
        write!(self.buffer, "\x1b[J")?;

        let status_row = grid.height() + 1;
        write!(self.buffer, "\x1b[{};1H\x1b[K{}", status_row, status)?;

        write!(self.buffer, "\x1b[?25h\x1b[?7h")?;
        self.buffer.flush()
    }

    fn poll_action(&mut self, timeout: Duration) -> io::Result<Action> {
        if event::poll(timeout)? {
            if let Event::Key(key_event) = event::read()? {
                return Ok(parse_key_event(key_event));
            }
        }
        Ok(Action::None)
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let _ = self.buffer.flush();
        let _ = execute!(stdout(), LeaveAlternateScreen);
    }
}

/// Writes each frame to any `Write`, prefixed with a cursor-home sequence
/// when `home_cursor` is set
pub struct WriterSink<W: Write> {
    writer: W,
    home_cursor: bool,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, home_cursor: bool) -> Self {
        Self { writer, home_cursor }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FrameSink for WriterSink<W> {
    fn present(&mut self, grid: &TextGrid, _status: &str) -> io::Result<()> {
        if self.home_cursor {
            write!(self.writer, "\x1b[H")?;
        }
        writeln!(self.writer, "{}", grid)?;
        self.writer.flush()
    }
}

/// Dumps frames to `dir/frame_XXX.txt`
pub struct DirectorySink {
    dir: PathBuf,
    next: usize,
}

impl DirectorySink {
    pub fn new<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, next: 0 })
    }

    pub fn frames_written(&self) -> usize {
        self.next
    }
}

impl FrameSink for DirectorySink {
    fn present(&mut self, grid: &TextGrid, _status: &str) -> io::Result<()> {
        let path = self.dir.join(format!("frame_{:03}.txt", self.next));
        fs::write(&path, grid.to_string())?;
        tracing::info!(path = %path.display(), "Wrote frame");
        self.next += 1;
        Ok(())
    }
}

/// Key actions for the render loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    None,
    Quit,
    Pause,
    Reset,
}

/// Parse keyboard input into actions
pub fn parse_key_event(event: KeyEvent) -> Action {
    match event.code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        // Raw mode swallows SIGINT, so Ctrl-C arrives as a key
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        KeyCode::Char('r') => Action::Reset,
        KeyCode::Char(' ') => Action::Pause,
        _ => Action::None,
    }
}
