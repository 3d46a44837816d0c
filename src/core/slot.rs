use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::runner::RunnerExit;

/// The single active-epic slot of a middleware instance.
pub(super) struct Slot {
    /// Activation counter; bumped by every `run` and `shutdown`.
    pub generation: u64,

    /// Currently running epic, if any.
    pub active: Option<ActiveEpic>,
}

/// Handle to the running epic subscription.
pub(super) struct ActiveEpic {
    pub name: Arc<str>,
    pub generation: u64,
    pub cancel: CancellationToken,
    pub join: JoinHandle<RunnerExit>,
}

impl ActiveEpic {
    /// True while the runner task has not exited.
    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }
}

impl Slot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self {
            generation: 0,
            active: None,
        }
    }

    /// Removes the active epic only if it still belongs to `generation`.
    pub fn clear_if(&mut self, generation: u64) {
        if self.active.as_ref().is_some_and(|a| a.generation == generation) {
            self.active = None;
        }
    }
}

pub(super) type SharedSlot = Arc<RwLock<Slot>>;

pub(super) fn read(slot: &RwLock<Slot>) -> RwLockReadGuard<'_, Slot> {
    slot.read().unwrap_or_else(PoisonError::into_inner)
}

pub(super) fn write(slot: &RwLock<Slot>) -> RwLockWriteGuard<'_, Slot> {
    slot.write().unwrap_or_else(PoisonError::into_inner)
}
