//! Resource collectors
//!
//! Each collector samples one resource category on its own supervised
//! periodic task and publishes the latest reading into a shared slot the
//! coordinator reads on its tick. Sampling failures are absorbed: counted,
//! logged, and the previous good reading is carried forward with its status
//! downgraded to an error state.

pub mod memory;
pub mod thread;

pub use memory::MemoryCollector;
pub use thread::ThreadCollector;

use crate::error::Result;
use crate::models::{MemoryMetrics, MemoryStatus, ResourceCategory, ThreadMetrics, ThreadStatus};
use crate::observability::{EngineMetrics, EventLogger};
use crate::runtime::{self, WorkerHandle};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

/// Bound on a single sampling call
const SAMPLE_TIMEOUT: Duration = Duration::from_secs(5);

/// One category's metrics as produced by its collector
#[derive(Debug, Clone)]
pub enum CategorySample {
    Memory(MemoryMetrics),
    Thread(ThreadMetrics),
}

impl CategorySample {
    pub fn category(&self) -> ResourceCategory {
        match self {
            CategorySample::Memory(_) => ResourceCategory::Memory,
            CategorySample::Thread(_) => ResourceCategory::Thread,
        }
    }

    /// Downgrade the reading's status to the error state, keeping values
    fn mark_degraded(&mut self) {
        match self {
            CategorySample::Memory(m) => m.status = MemoryStatus::Error,
            CategorySample::Thread(t) => t.status = ThreadStatus::Error,
        }
    }
}

/// A source of periodic readings for one resource category
#[async_trait]
pub trait ResourceCollector: Send + 'static {
    fn category(&self) -> ResourceCategory;

    /// Take one reading. Must not block indefinitely.
    async fn sample(&mut self) -> Result<CategorySample>;
}

#[async_trait]
impl ResourceCollector for Box<dyn ResourceCollector> {
    fn category(&self) -> ResourceCategory {
        (**self).category()
    }

    async fn sample(&mut self) -> Result<CategorySample> {
        (**self).sample().await
    }
}

/// Latest reading published by a running collector
pub type SharedReading = Arc<Mutex<Option<CategorySample>>>;

/// A collector running on its own supervised worker
pub struct CollectorHandle {
    category: ResourceCategory,
    reading: SharedReading,
    worker: WorkerHandle,
}

impl CollectorHandle {
    /// Spawn the collector's sampling loop at the given interval
    pub fn start(
        collector: impl ResourceCollector,
        interval: Duration,
        metrics: EngineMetrics,
    ) -> Self {
        let category = collector.category();
        let logger = EventLogger::new(format!("collector.{}", category));
        let reading: SharedReading = Arc::new(Mutex::new(None));

        let collector = Arc::new(AsyncMutex::new(collector));
        let slot = reading.clone();
        let worker = runtime::spawn_periodic(
            format!("collector.{}", category),
            interval,
            move || {
                let collector = collector.clone();
                let slot = slot.clone();
                let metrics = metrics.clone();
                let logger = logger.clone();
                async move {
                    let mut collector = collector.lock().await;
                    let outcome =
                        tokio::time::timeout(SAMPLE_TIMEOUT, collector.sample()).await;
                    drop(collector);
                    match outcome {
                        Ok(Ok(sample)) => {
                            *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(sample);
                        }
                        Ok(Err(e)) => {
                            metrics.inc_collection_errors();
                            logger.log_collection_degraded(&category.to_string(), &e.to_string());
                            degrade(&slot);
                        }
                        Err(_) => {
                            metrics.inc_collection_errors();
                            logger.log_collection_degraded(&category.to_string(), "sample timed out");
                            degrade(&slot);
                        }
                    }
                }
            },
        );

        Self {
            category,
            reading,
            worker,
        }
    }

    pub fn category(&self) -> ResourceCategory {
        self.category
    }

    /// The most recent published reading, if any
    pub fn latest(&self) -> Option<CategorySample> {
        self.reading
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub async fn stop(&self) {
        self.worker.stop().await;
    }
}

fn degrade(slot: &SharedReading) {
    if let Some(sample) = slot.lock().unwrap_or_else(|e| e.into_inner()).as_mut() {
        sample.mark_degraded();
    }
}
