use std::sync::Arc;
use tokio::sync::RwLock;

use crate::sensor::Reading;

/// The latest known reading, shared between the clocks.
///
/// Only the sensor clock writes; a replacement swaps the whole [`Reading`]
/// so readers never see half of one.
#[derive(Clone, Default)]
pub struct SharedState {
    reading: Arc<RwLock<Option<Reading>>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn replace_reading(&self, reading: Reading) {
        *self.reading.write().await = Some(reading);
    }

    pub async fn reading(&self) -> Option<Reading> {
        *self.reading.read().await
    }
}
