use crate::framebuffer::FrameBuffer;
use crate::scheduler::SchedulerState;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use log::error;
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// Display is used to show the frame buffer's render grid. It should abstract
/// the implementation details, so a variety of kinds of screen would work.
pub trait Display {
    /// draw the visible part of the frame buffer
    fn draw(&mut self, frame: &FrameBuffer, state: SchedulerState) -> Result<(), io::Error>;
}

// store useful metadata about the frame being drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Resolution(usize, usize);

/// canvas coordinates, split by how they should be coloured
#[derive(Debug, Default, PartialEq)]
struct Plot {
    lit: Vec<(f64, f64)>,
    fading: Vec<(f64, f64)>,
}

impl Resolution {
    fn of(frame: &FrameBuffer) -> Self {
        Resolution(frame.width(), frame.height())
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// braille packs 2x4 pixels into a cell, which is the only way 128x64
    /// fits in a normal terminal
    fn marker(&self) -> Marker {
        if self.0 > 64 {
            Marker::Braille
        } else {
            Marker::Block
        }
    }

    /// terminal cells needed, including the border
    fn cells(&self) -> (u16, u16) {
        let (w, h) = match self.marker() {
            Marker::Braille => (self.0 / 2, self.1 / 4),
            _ => (self.0, self.1),
        };
        (2 + w as u16, 2 + h as u16)
    }

    fn plot(&self, frame: &FrameBuffer) -> Plot {
        let w = self.0;
        let mut plot = Plot::default();
        let cells = frame.render_data().iter().zip(frame.decay_timers());
        for (count, (&render, timer)) in cells.enumerate() {
            if render == 0 {
                continue;
            }
            let point = (
                (count % w) as f64,        // x
                -1.0 * (count / w) as f64, // y
            );
            match timer {
                Some(_) => plot.fading.push(point),
                None => plot.lit.push(point),
            }
        }
        plot
    }
}

fn title(state: SchedulerState) -> &'static str {
    match state {
        SchedulerState::Running => "SUPER-CHIP",
        SchedulerState::Paused => "SUPER-CHIP [paused]",
        SchedulerState::Halted => "SUPER-CHIP [halted]",
    }
}

/// monochrome display in a terminal, rendered using TUI and Crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl MonoTermDisplay {
    pub fn new() -> Result<MonoTermDisplay, io::Error> {
        let mut stdout = io::stdout();
        crossterm::execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;
        terminal.clear()?;
        Ok(MonoTermDisplay { terminal })
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        let restored = self
            .terminal
            .show_cursor()
            .and_then(|_| crossterm::execute!(io::stdout(), LeaveAlternateScreen));
        if let Err(e) = restored {
            error!("couldn't restore the terminal: {}", e);
        }
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, frame: &FrameBuffer, state: SchedulerState) -> Result<(), io::Error> {
        let resolution = Resolution::of(frame);
        let plot = resolution.plot(frame);
        let (w, h) = resolution.cells();

        self.terminal.draw(|f| {
            let size = Rect::new(0, 0, w, h).intersection(f.size());

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title(title(state))
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(resolution.x_bounds())
                .y_bounds(resolution.y_bounds())
                .marker(resolution.marker())
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &plot.fading,
                        color: Color::DarkGray,
                    });
                    ctx.draw(&Points {
                        coords: &plot.lit,
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// useful for testing non-display routines
#[derive(Debug, Default)]
pub struct DummyDisplay {
    frames: usize,
    lit: usize,
}

impl DummyDisplay {
    pub fn new() -> DummyDisplay {
        DummyDisplay::default()
    }

    /// how many times draw was called
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// rendered pixels in the last frame
    pub fn lit(&self) -> usize {
        self.lit
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, frame: &FrameBuffer, _state: SchedulerState) -> Result<(), io::Error> {
        self.frames += 1;
        self.lit = frame.render_data().iter().filter(|&&p| p == 1).count();
        Ok(())
    }
}
