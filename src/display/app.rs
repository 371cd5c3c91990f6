//! Render loop: timer ticks, key events and cancellation in one `select!`.

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use ratatui::DefaultTerminal;
use ratatui::buffer::Buffer;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::aggregator::display_rows;
use crate::book::BookStore;
use crate::display::frame::{DepthFrame, prepare_frame};
use crate::display::input::{Command, InputState};
use crate::display::renderer::{render, render_paused, render_prompt};
use crate::errors::Result;

#[derive(Debug, Clone, Copy)]
pub struct DisplayConfig {
    pub refresh: Duration,
    pub group: u32,
}

/// Everything the loop remembers between frames.
#[derive(Debug)]
pub struct Screen {
    group: u32,
    paused: bool,
    last_frame: Option<DepthFrame>,
    input: InputState,
}

impl Screen {
    pub fn new(group: u32) -> Self {
        Self {
            group,
            paused: false,
            last_frame: None,
            input: InputState::default(),
        }
    }

    pub fn group(&self) -> u32 {
        self.group
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Applies a command; returns `true` when the user asked to quit.
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::Quit => return true,
            Command::TogglePause => {
                self.paused = !self.paused;
                info!(paused = self.paused, "[UI] pause toggled");
            }
            Command::SetGroup(group) => {
                self.group = group;
                info!(group, "[UI] grouping changed");
            }
        }
        false
    }

    pub fn input(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Builds the next frame from the store for a grid `height` rows tall.
    ///
    /// While paused the store is not read and the cached frame is kept; the
    /// banner is always drawn. Returns whether there is anything to draw.
    pub fn refresh(&mut self, store: &BookStore, height: u16) -> bool {
        if self.paused {
            return true;
        }
        let view = store.read();
        match prepare_frame(&view, self.group, display_rows(height)) {
            Some(frame) => {
                self.last_frame = Some(frame);
                true
            }
            None => {
                debug!("[UI] book not ready; frame skipped");
                false
            }
        }
    }

    pub fn paint(&self, buf: &mut Buffer) {
        if let Some(frame) = &self.last_frame {
            render(buf, frame);
        }
        if self.paused {
            render_paused(buf);
        }
        if let Some(digits) = self.input.prompt() {
            render_prompt(buf, digits);
        }
    }
}

/// Runs until the user quits, the input stream ends, or `cancel` fires.
/// Quitting cancels `cancel` so the rest of the pipeline stops too.
pub async fn run(
    terminal: &mut DefaultTerminal,
    store: BookStore,
    config: DisplayConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let mut ticker = tokio::time::interval(config.refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut events = EventStream::new();
    let mut screen = Screen::new(config.group);

    info!(refresh = ?config.refresh, group = config.group, "[UI] render loop started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let height = terminal.size()?.height;
                if screen.refresh(&store, height) {
                    terminal.draw(|f| screen.paint(f.buffer_mut()))?;
                }
            }
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) => {
                    if let Some(command) = screen.input().handle(key)
                        && screen.apply(command)
                    {
                        info!("[UI] quit requested");
                        cancel.cancel();
                        break;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
        }
    }
    info!("[UI] render loop stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Reconciler;
    use crate::models::{BookSnapshot, PriceLevel, Price, Quantity};
    use ratatui::layout::Rect;

    fn level(price: i64, qty: i64) -> PriceLevel {
        PriceLevel::new(Price::from(price), Quantity::from(qty))
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width).map(|x| buf[(x, y)].symbol()).collect()
    }

    fn seeded_store() -> BookStore {
        let store = BookStore::new();
        Reconciler::new(store.clone()).apply_snapshot(&BookSnapshot {
            bids: vec![level(99, 1)],
            asks: vec![level(100, 1)],
            mid_price: None,
        });
        store
    }

    #[test]
    fn nothing_to_draw_before_the_book_fills() {
        let mut screen = Screen::new(1);
        assert!(!screen.refresh(&BookStore::new(), 20));
    }

    #[test]
    fn pause_keeps_last_frame_and_ignores_store() {
        let store = seeded_store();
        let mut screen = Screen::new(1);
        assert!(screen.refresh(&store, 20));

        assert!(!screen.apply(Command::TogglePause));
        assert!(screen.is_paused());
        Reconciler::new(store.clone()).apply_snapshot(&BookSnapshot {
            bids: vec![level(50, 1)],
            asks: vec![level(60, 1)],
            mid_price: None,
        });
        assert!(screen.refresh(&store, 20));

        let mut buf = Buffer::empty(Rect::new(0, 0, 60, 20));
        screen.paint(&mut buf);
        assert!(row_text(&buf, 9).contains("100"));
        assert!(row_text(&buf, 10).contains("Pause"));
    }

    #[test]
    fn pause_before_first_frame_still_shows_banner() {
        let mut screen = Screen::new(1);
        assert!(!screen.apply(Command::TogglePause));
        assert!(screen.refresh(&BookStore::new(), 20));

        let mut buf = Buffer::empty(Rect::new(0, 0, 60, 20));
        screen.paint(&mut buf);
        assert!(row_text(&buf, 10).contains("Pause"));
        assert!(!row_text(&buf, 9).contains("100"));
    }

    #[test]
    fn group_command_applies_to_next_frame() {
        let mut screen = Screen::new(1);
        assert!(!screen.apply(Command::SetGroup(10)));
        assert_eq!(screen.group(), 10);
        assert!(screen.apply(Command::Quit));

        assert!(screen.refresh(&seeded_store(), 20));
        let mut buf = Buffer::empty(Rect::new(0, 0, 60, 20));
        screen.paint(&mut buf);
        // 99 rounds down to 90, 100 stays on its multiple.
        assert!(row_text(&buf, 11).contains("90"));
        assert!(row_text(&buf, 9).contains("100"));
    }
}
