//! Key handling.
//!
//! | key                | action                  |
//! |--------------------|-------------------------|
//! | `space`            | pause / resume          |
//! | `g` digits `enter` | change grouping unit    |
//! | `esc`              | abandon group entry     |
//! | `q`, `ctrl+c`      | quit                    |

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Longest group the prompt accepts; keeps the value inside `u32`.
const MAX_DIGITS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    TogglePause,
    SetGroup(u32),
}

/// Tracks a partially typed `g <digits>` entry.
#[derive(Debug, Default)]
pub struct InputState {
    prompt: Option<String>,
}

impl InputState {
    /// Digits typed so far while a group entry is open.
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn handle(&mut self, key: KeyEvent) -> Option<Command> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Command::Quit);
        }

        if let Some(digits) = self.prompt.as_mut() {
            match key.code {
                KeyCode::Char(c) if c.is_ascii_digit() && digits.len() < MAX_DIGITS => {
                    digits.push(c);
                }
                KeyCode::Backspace => {
                    digits.pop();
                }
                KeyCode::Esc => self.prompt = None,
                KeyCode::Enter => {
                    let group = self.prompt.take().and_then(|d| d.parse::<u32>().ok());
                    return group.filter(|g| *g >= 1).map(Command::SetGroup);
                }
                _ => {}
            }
            return None;
        }

        match key.code {
            KeyCode::Char(' ') => Some(Command::TogglePause),
            KeyCode::Char('q') => Some(Command::Quit),
            KeyCode::Char('g') => {
                self.prompt = Some(String::new());
                None
            }
            _ => None,
        }
    }
}
