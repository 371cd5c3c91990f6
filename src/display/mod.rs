//! Terminal surface: frame preparation, grid rendering, key input and the
//! render loop.

pub mod app;
pub mod frame;
pub mod input;
pub mod renderer;

use ratatui::DefaultTerminal;

use crate::errors::Result;

pub use app::{DisplayConfig, Screen, run};
pub use frame::{DepthFrame, prepare_frame};
pub use renderer::{render, render_paused};

/// Restores the terminal when dropped, including during unwinding.
pub struct TerminalGuard;

impl TerminalGuard {
    /// Enters raw mode and the alternate screen.
    pub fn enter() -> Result<(Self, DefaultTerminal)> {
        let terminal = ratatui::try_init()?;
        Ok((Self, terminal))
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        ratatui::restore();
    }
}
