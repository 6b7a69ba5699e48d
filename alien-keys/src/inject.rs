//! Key event injection

use std::fmt;

use tracing::debug;

use crate::error::InjectionError;
use crate::vk::{self, VkCode};

/// Direction of a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Down,
    Up,
}

/// One synthesized key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub vk: VkCode,
    pub state: KeyState,
}

impl KeyEvent {
    pub const fn down(vk: VkCode) -> Self {
        Self {
            vk,
            state: KeyState::Down,
        }
    }

    pub const fn up(vk: VkCode) -> Self {
        Self {
            vk,
            state: KeyState::Up,
        }
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self.state {
            KeyState::Down => '↓',
            KeyState::Up => '↑',
        };
        write!(f, "{}{}", vk::display_key(self.vk), arrow)
    }
}

/// Submits key events to the system
pub trait KeyInjector: Send {
    /// Submit a batch in order and return how many events were accepted
    ///
    /// A count below `events.len()` means the batch was only partially
    /// delivered; callers treat that as a failed submission.
    fn send(&mut self, events: &[KeyEvent]) -> Result<usize, InjectionError>;
}

impl<T: KeyInjector + ?Sized> KeyInjector for Box<T> {
    fn send(&mut self, events: &[KeyEvent]) -> Result<usize, InjectionError> {
        (**self).send(events)
    }
}

/// In-memory injector that keeps every submitted batch
///
/// Used for dry runs and tests. `with_accept_limit` makes it accept fewer
/// events than submitted, like a system injector refusing input.
#[derive(Debug, Default)]
pub struct RecordingInjector {
    batches: Vec<Vec<KeyEvent>>,
    accept_limit: Option<usize>,
}

impl RecordingInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept at most `limit` events per batch
    pub fn with_accept_limit(limit: usize) -> Self {
        Self {
            batches: Vec::new(),
            accept_limit: Some(limit),
        }
    }

    /// Batches in submission order
    pub fn batches(&self) -> &[Vec<KeyEvent>] {
        &self.batches
    }

    /// All accepted events, flattened
    pub fn events(&self) -> Vec<KeyEvent> {
        self.batches.iter().flatten().copied().collect()
    }

    pub fn clear(&mut self) {
        self.batches.clear();
    }
}

impl KeyInjector for RecordingInjector {
    fn send(&mut self, events: &[KeyEvent]) -> Result<usize, InjectionError> {
        let accepted = self
            .accept_limit
            .map_or(events.len(), |limit| limit.min(events.len()));
        self.batches.push(events[..accepted].to_vec());
        Ok(accepted)
    }
}

/// Injector for dry runs: logs each batch and keeps only a count
#[derive(Debug, Default)]
pub struct LoggingInjector {
    events_sent: u64,
}

impl LoggingInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events accepted since creation
    pub fn events_sent(&self) -> u64 {
        self.events_sent
    }
}

impl KeyInjector for LoggingInjector {
    fn send(&mut self, events: &[KeyEvent]) -> Result<usize, InjectionError> {
        let keys: Vec<_> = events.iter().map(ToString::to_string).collect();
        debug!("Dry run batch: {}", keys.join(" "));
        self.events_sent += events.len() as u64;
        Ok(events.len())
    }
}
