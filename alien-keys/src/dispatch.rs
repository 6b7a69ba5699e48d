//! Scan code to key event dispatch

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::action::{Action, MacroAction};
use crate::error::InjectionError;
use crate::inject::{KeyEvent, KeyInjector};
use crate::layout::{KeyStroke, KeyboardLayout, UsLayout};
use crate::vk::VK_LSHIFT;

/// Scan code: the decoded usage that identifies a macro key
pub type ScanCode = u16;

/// Scan code → action bindings
///
/// Built once from configuration and read-only afterwards; share it with
/// `Arc` when more than one dispatcher needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroTable {
    entries: HashMap<ScanCode, MacroAction>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an action, returning the one it replaces
    pub fn insert(&mut self, scan_code: ScanCode, action: MacroAction) -> Option<MacroAction> {
        self.entries.insert(scan_code, action)
    }

    pub fn get(&self, scan_code: ScanCode) -> Option<&MacroAction> {
        self.entries.get(&scan_code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by scan code
    pub fn sorted(&self) -> Vec<(ScanCode, &MacroAction)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(k, v)| (*k, v)).collect();
        entries.sort_by_key(|(k, _)| *k);
        entries
    }
}

impl FromIterator<(ScanCode, MacroAction)> for MacroTable {
    fn from_iter<T: IntoIterator<Item = (ScanCode, MacroAction)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Outcome of processing one scan code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// No binding (or an invalid one); nothing was injected
    Ignored,
    /// Events accepted by the injector, in order
    Sent { events: Vec<KeyEvent> },
}

/// Key events typing one resolved character
fn stroke_events(stroke: KeyStroke, out: &mut Vec<KeyEvent>) {
    if stroke.shift {
        out.push(KeyEvent::down(VK_LSHIFT));
    }
    out.push(KeyEvent::down(stroke.vk));
    out.push(KeyEvent::up(stroke.vk));
    if stroke.shift {
        out.push(KeyEvent::up(VK_LSHIFT));
    }
}

/// Turns scan codes into injected key sequences
pub struct MacroDispatcher<I: KeyInjector> {
    table: Arc<MacroTable>,
    layout: Box<dyn KeyboardLayout>,
    injector: I,
    char_delay: Option<Duration>,
}

impl<I: KeyInjector> MacroDispatcher<I> {
    /// Dispatcher using the US layout and single-batch strings
    pub fn new(table: Arc<MacroTable>, injector: I) -> Self {
        Self {
            table,
            layout: Box::new(UsLayout),
            injector,
            char_delay: None,
        }
    }

    pub fn with_layout(mut self, layout: Box<dyn KeyboardLayout>) -> Self {
        self.layout = layout;
        self
    }

    /// Submit strings one character per batch, pausing `delay` between
    ///
    /// Some applications drop characters from a single large batch.
    /// `None` submits the whole string at once.
    pub fn with_char_delay(mut self, delay: Option<Duration>) -> Self {
        self.char_delay = delay;
        self
    }

    pub fn table(&self) -> &MacroTable {
        &self.table
    }

    pub fn injector(&self) -> &I {
        &self.injector
    }

    pub fn injector_mut(&mut self) -> &mut I {
        &mut self.injector
    }

    /// Look up `scan_code` and inject its action
    ///
    /// Unbound scan codes are not an error. A batch the injector only
    /// partially accepts fails the whole call.
    pub fn process(&mut self, scan_code: ScanCode) -> Result<Dispatch, InjectionError> {
        let table = Arc::clone(&self.table);
        let Some(action) = table.get(scan_code) else {
            debug!("No macro bound to scan code {:#06x}", scan_code);
            return Ok(Dispatch::Ignored);
        };

        debug!("Scan code {:#06x}: {}", scan_code, action);
        let events = match action.action() {
            Action::Invalid => return Ok(Dispatch::Ignored),
            Action::VirtualKey(vk) => {
                self.submit(&[KeyEvent::down(*vk), KeyEvent::up(*vk)])?
            }
            Action::Char(c) => {
                let mut batch = Vec::with_capacity(4);
                stroke_events(self.resolve(*c)?, &mut batch);
                self.submit(&batch)?
            }
            Action::String(text) => self.send_text(text.as_bytes())?,
        };
        Ok(Dispatch::Sent { events })
    }

    fn resolve(&self, c: u8) -> Result<KeyStroke, InjectionError> {
        self.layout
            .resolve(c)
            .ok_or(InjectionError::Unresolvable(c))
    }

    fn send_text(&mut self, text: &[u8]) -> Result<Vec<KeyEvent>, InjectionError> {
        // Resolve everything first so a bad character sends nothing
        let strokes = text
            .iter()
            .map(|&c| self.resolve(c))
            .collect::<Result<Vec<_>, _>>()?;

        match self.char_delay {
            None => {
                let mut batch = Vec::with_capacity(strokes.len() * 4);
                for stroke in strokes {
                    stroke_events(stroke, &mut batch);
                }
                self.submit(&batch)
            }
            Some(delay) => {
                let mut sent = Vec::with_capacity(strokes.len() * 4);
                for (i, stroke) in strokes.into_iter().enumerate() {
                    if i > 0 {
                        thread::sleep(delay);
                    }
                    let mut batch = Vec::with_capacity(4);
                    stroke_events(stroke, &mut batch);
                    sent.extend(self.submit(&batch)?);
                }
                Ok(sent)
            }
        }
    }

    fn submit(&mut self, events: &[KeyEvent]) -> Result<Vec<KeyEvent>, InjectionError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        let accepted = self.injector.send(events)?;
        if accepted != events.len() {
            return Err(InjectionError::ShortSubmission {
                accepted,
                submitted: events.len(),
            });
        }
        Ok(events.to_vec())
    }
}
