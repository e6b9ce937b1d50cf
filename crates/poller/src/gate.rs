use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollState {
    #[default]
    Active,
    Paused,
}

/// Runtime switch for the poll loop, toggled over the admin socket.
#[derive(Clone, Default)]
pub struct PollGate {
    state: Arc<RwLock<PollState>>,
}

impl PollGate {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(PollState::Active)),
        }
    }

    pub fn pause(&self) {
        if let Ok(mut guard) = self.state.write() {
            *guard = PollState::Paused;
        }
    }

    pub fn resume(&self) {
        if let Ok(mut guard) = self.state.write() {
            *guard = PollState::Active;
        }
    }

    pub fn status(&self) -> PollState {
        self.state.read().map(|g| *g).unwrap_or(PollState::Paused)
    }
}
