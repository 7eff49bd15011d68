// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! In-memory relay

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::debug;

use super::RelayDriver;
use crate::error::RelayError;
use crate::relay::RelayState;

/// Relay keeping its state in memory and counting hardware writes.
///
/// Clones share the same state, so a test can keep a handle on the relay owned by
/// the control loop.
#[derive(Debug, Clone)]
pub struct MockRelay {
    state: Arc<Mutex<RelayState>>,
    writes: Arc<AtomicUsize>,
}

impl MockRelay {
    pub fn new(initial: RelayState) -> Self {
        Self {
            state: Arc::new(Mutex::new(initial)),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Current state, as seen from outside the control loop
    pub fn state(&self) -> RelayState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Number of writes issued to the relay
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Change the state behind the controller's back, like a manual override
    pub fn force(&self, state: RelayState) {
        match self.state.lock() {
            Ok(mut guard) => *guard = state,
            Err(poisoned) => *poisoned.into_inner() = state,
        }
    }
}

impl Default for MockRelay {
    fn default() -> Self {
        Self::new(RelayState::Off)
    }
}

impl RelayDriver for MockRelay {
    fn read_state(&mut self) -> Result<RelayState, RelayError> {
        Ok(self.state())
    }

    fn write_state(&mut self, state: RelayState) -> Result<(), RelayError> {
        debug!("Mock relay switched {}", state);
        self.force(state);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "mock relay".to_string()
    }
}
