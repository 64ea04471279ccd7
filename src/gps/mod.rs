//! # GPS Simulator Module
//!
//! Background periodic position source. The sleigh has no real GNSS
//! receiver; a worker perturbs a retained lat/lon on every tick and
//! hands the new coordinates to a callback. The update policy is part of
//! the demo's observable behavior (the dashboard track depends on it)
//! and is reproduced exactly:
//!
//! - even UTC second: latitude drifts north by up to 0.001 degrees
//! - odd UTC second: longitude drifts west by up to 0.001 degrees
//! - every tenth second: longitude additionally jumps east by up to
//!   0.002 degrees

use chrono::{Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::sleep;

use crate::config::GpsConfig;
use crate::worker::WorkerHandle;

/// Bounded wait for the worker to exit on stop
const SHUTDOWN_WAIT: Duration = Duration::from_millis(1000);

/// Future returned by a position callback
pub type PositionFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Callback invoked with each new (latitude, longitude)
pub type PositionCallback = Box<dyn Fn(f64, f64) -> PositionFuture + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    latitude: f64,
    longitude: f64,
}

/// Simulated position source
///
/// Same worker lifecycle as the delivery queue: cooperative stop with a
/// bounded wait, then abort. The retained position survives stop/start
/// so a restarted track continues where it left off.
pub struct GpsSimulator {
    interval: Duration,
    position: Arc<Mutex<Position>>,
    worker: AsyncMutex<Option<WorkerHandle>>,
}

impl GpsSimulator {
    pub fn new(config: &GpsConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms),
            position: Arc::new(Mutex::new(Position {
                latitude: config.start_latitude,
                longitude: config.start_longitude,
            })),
            worker: AsyncMutex::new(None),
        }
    }

    /// Latest simulated coordinates
    pub fn position(&self) -> (f64, f64) {
        let position = lock_position(&self.position);
        (position.latitude, position.longitude)
    }

    pub async fn is_running(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .map(|w| w.is_running())
            .unwrap_or(false)
    }

    /// Start the position worker
    ///
    /// A worker that is already running is stopped first. Every interval
    /// the position is perturbed and the callback invoked with the new
    /// coordinates.
    pub async fn start(&self, callback: PositionCallback) {
        let mut slot = self.worker.lock().await;

        if let Some(previous) = slot.take() {
            previous.shutdown(SHUTDOWN_WAIT).await;
        }

        let interval = self.interval;
        let position = Arc::clone(&self.position);

        *slot = Some(WorkerHandle::spawn("gps-simulator", move |running| {
            async move {
                let mut rng = StdRng::from_os_rng();

                loop {
                    sleep(interval).await;

                    if !running.load(Ordering::SeqCst) {
                        break;
                    }

                    let second = Utc::now().second();
                    let (latitude, longitude) = {
                        let mut position = lock_position(&position);
                        increment_position(&mut position, second, &mut rng);
                        (position.latitude, position.longitude)
                    };

                    callback(latitude, longitude).await;
                }
            }
        }));
    }

    /// Stop the position worker
    pub async fn stop(&self) {
        let mut slot = self.worker.lock().await;

        if let Some(worker) = slot.take() {
            worker.shutdown(SHUTDOWN_WAIT).await;
        }
    }
}

fn lock_position(position: &Mutex<Position>) -> std::sync::MutexGuard<'_, Position> {
    position.lock().unwrap_or_else(|e| e.into_inner())
}

/// Perturb the retained position for one tick
fn increment_position(position: &mut Position, second: u32, rng: &mut impl Rng) {
    if second % 2 == 0 {
        position.latitude += rng.random_range(0..100) as f64 * 0.00001;
    } else {
        position.longitude -= rng.random_range(0..100) as f64 * 0.00001;
    }

    if second % 10 == 0 {
        position.longitude += rng.random_range(0..200) as f64 * 0.00001;
    }
}
