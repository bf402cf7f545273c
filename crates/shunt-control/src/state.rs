//! Shared controller state.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use shunt_core::Controller;

use crate::southbound::OfHandle;

/// State shared by the REST handlers, the monitor, and the reply dispatcher.
///
/// One mutex carries the whole concurrency discipline: admissions serialize
/// against each other, displacement rewrites of the registry are atomic with
/// respect to admission reads, and a stats batch holds the lock only while
/// its deltas are applied.
#[derive(Debug, Clone)]
pub struct AppState {
    controller: Arc<Mutex<Controller<OfHandle>>>,
}

impl AppState {
    pub fn new(controller: Controller<OfHandle>) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
        }
    }

    /// Locks the controller for one operation.
    pub async fn controller(&self) -> MutexGuard<'_, Controller<OfHandle>> {
        self.controller.lock().await
    }
}
