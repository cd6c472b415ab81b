use tokio::sync::RwLock;

/// Latest noisy range measurement. The sensor loop is the single
/// writer; router handlers are readers.
#[derive(Debug, Default)]
pub struct SensorReading {
    value: RwLock<Option<f64>>,
}

impl SensorReading {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn store(&self, distance: f64) {
        *self.value.write().await = Some(distance);
    }

    /// `None` until the first successful target poll.
    pub async fn latest(&self) -> Option<f64> {
        *self.value.read().await
    }
}
