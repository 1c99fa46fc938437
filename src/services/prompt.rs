//! Interactive key disambiguation.
//!
//! [`PromptState`] holds the filtering logic shared by every picker: the
//! operator's input narrows the candidate set on each keystroke and a
//! highlighted suggestion is confirmed with Enter. [`TerminalPicker`] drives
//! it from the terminal, [`ScriptedPicker`] from a fixed key sequence.

use crate::services::resolver::CandidateSet;
use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{execute, queue};
use std::collections::VecDeque;
use std::io::{self, IsTerminal, Write};

/// Suggestions drawn below the input line.
const MAX_VISIBLE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKey {
    Char(char),
    Backspace,
    Up,
    Down,
    Tab,
    Enter,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptStep {
    Continue,
    Confirmed(String),
    Cancelled,
}

/// Capability used by the resolver to turn an ambiguous listing into one key.
pub trait KeyPicker {
    /// Returns the confirmed key, or `None` if the operator cancelled.
    fn pick(&mut self, candidates: &CandidateSet) -> io::Result<Option<String>>;
}

pub struct PromptState<'c> {
    candidates: &'c CandidateSet,
    input: String,
    highlighted: usize,
}

impl<'c> PromptState<'c> {
    pub fn new(candidates: &'c CandidateSet) -> Self {
        Self {
            candidates,
            input: String::new(),
            highlighted: 0,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn suggestions(&self) -> Vec<&'c str> {
        self.candidates.filter(&self.input)
    }

    /// Index into [`PromptState::suggestions`], if there are any.
    pub fn highlighted(&self) -> Option<usize> {
        let len = self.suggestions().len();
        (len > 0).then(|| self.highlighted.min(len - 1))
    }

    pub fn apply(&mut self, key: PromptKey) -> PromptStep {
        match key {
            PromptKey::Char(c) => {
                self.input.push(c);
                self.highlighted = 0;
            }
            PromptKey::Backspace => {
                self.input.pop();
                self.highlighted = 0;
            }
            PromptKey::Up => {
                self.highlighted = self.highlighted().unwrap_or(0).saturating_sub(1);
            }
            PromptKey::Down => {
                if let Some(current) = self.highlighted() {
                    let last = self.suggestions().len() - 1;
                    self.highlighted = (current + 1).min(last);
                }
            }
            PromptKey::Tab => {
                if let Some(index) = self.highlighted() {
                    self.input = self.suggestions()[index].to_string();
                    self.highlighted = 0;
                }
            }
            PromptKey::Enter => {
                if let Some(index) = self.highlighted() {
                    return PromptStep::Confirmed(self.suggestions()[index].to_string());
                }
            }
            PromptKey::Cancel => return PromptStep::Cancelled,
        }
        PromptStep::Continue
    }
}

/// Replays a fixed key sequence. Running out of keys counts as cancellation.
#[derive(Debug, Default)]
pub struct ScriptedPicker {
    keys: VecDeque<PromptKey>,
    prompts: usize,
    shown: Vec<Vec<String>>,
}

impl ScriptedPicker {
    pub fn new(keys: impl IntoIterator<Item = PromptKey>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Types `text` and presses Enter.
    pub fn typing(text: &str) -> Self {
        Self::new(
            text.chars()
                .map(PromptKey::Char)
                .chain(std::iter::once(PromptKey::Enter)),
        )
    }

    /// Number of times a selection was requested.
    pub fn prompts(&self) -> usize {
        self.prompts
    }

    /// Suggestions visible before each key was applied.
    pub fn shown(&self) -> &[Vec<String>] {
        &self.shown
    }
}

impl KeyPicker for ScriptedPicker {
    fn pick(&mut self, candidates: &CandidateSet) -> io::Result<Option<String>> {
        self.prompts += 1;
        let mut state = PromptState::new(candidates);
        while let Some(key) = self.keys.pop_front() {
            self.shown
                .push(state.suggestions().into_iter().map(str::to_owned).collect());
            match state.apply(key) {
                PromptStep::Continue => {}
                PromptStep::Confirmed(selected) => return Ok(Some(selected)),
                PromptStep::Cancelled => return Ok(None),
            }
        }
        Ok(None)
    }
}

/// Inline picker on the operator's terminal, drawn on stderr.
#[derive(Debug, Default)]
pub struct TerminalPicker;

impl TerminalPicker {
    pub fn new() -> Self {
        Self
    }
}

impl KeyPicker for TerminalPicker {
    fn pick(&mut self, candidates: &CandidateSet) -> io::Result<Option<String>> {
        if !io::stdin().is_terminal() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "selecting between several keys requires an interactive terminal",
            ));
        }

        let mut out = io::stderr();
        writeln!(out, "Please start typing key")?;

        let _raw = RawModeGuard::enable()?;
        let mut state = PromptState::new(candidates);
        render(&mut out, &state)?;

        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            let Some(key) = map_key(key) else {
                continue;
            };
            match state.apply(key) {
                // The cursor sits on the input line, so clearing downwards wipes the old list
                PromptStep::Continue => {
                    render(&mut out, &state)?;
                }
                PromptStep::Confirmed(selected) => {
                    finish(&mut out, &selected)?;
                    return Ok(Some(selected));
                }
                PromptStep::Cancelled => {
                    finish(&mut out, "")?;
                    return Ok(None);
                }
            }
        }
    }
}

fn map_key(key: KeyEvent) -> Option<PromptKey> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(PromptKey::Cancel)
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(PromptKey::Char(c))
        }
        KeyCode::Backspace => Some(PromptKey::Backspace),
        KeyCode::Up => Some(PromptKey::Up),
        KeyCode::Down => Some(PromptKey::Down),
        KeyCode::Tab => Some(PromptKey::Tab),
        KeyCode::Enter => Some(PromptKey::Enter),
        KeyCode::Esc => Some(PromptKey::Cancel),
        _ => None,
    }
}

/// Draws the input line and suggestions, leaving the cursor after the input.
/// Returns the number of suggestion lines below the input line.
fn render(out: &mut impl Write, state: &PromptState<'_>) -> io::Result<u16> {
    let suggestions = state.suggestions();
    let highlighted = state.highlighted();

    queue!(
        out,
        MoveToColumn(0),
        Clear(ClearType::FromCursorDown),
        Print("> "),
        Print(state.input())
    )?;

    // Keep the highlighted entry inside the visible window
    let start = highlighted
        .map(|h| (h + 1).saturating_sub(MAX_VISIBLE))
        .unwrap_or(0);
    let visible = suggestions.iter().enumerate().skip(start).take(MAX_VISIBLE);
    let mut lines = 0u16;
    for (index, key) in visible {
        queue!(out, Print("\r\n"))?;
        if Some(index) == highlighted {
            queue!(
                out,
                SetAttribute(Attribute::Reverse),
                Print(format!("  {}", key)),
                SetAttribute(Attribute::Reset)
            )?;
        } else {
            queue!(out, Print(format!("  {}", key)))?;
        }
        lines += 1;
    }
    if suggestions.len() > start + MAX_VISIBLE {
        queue!(
            out,
            Print(format!("\r\n  ... {} more", suggestions.len() - start - MAX_VISIBLE))
        )?;
        lines += 1;
    }

    if lines > 0 {
        queue!(out, MoveUp(lines))?;
    }
    let column = 2 + state.input().chars().count();
    queue!(out, MoveToColumn(u16::try_from(column).unwrap_or(u16::MAX)))?;
    out.flush()?;
    Ok(lines)
}

fn finish(out: &mut impl Write, selected: &str) -> io::Result<()> {
    execute!(
        out,
        MoveToColumn(0),
        Clear(ClearType::FromCursorDown),
        Print("> "),
        Print(selected),
        Print("\r\n")
    )
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
