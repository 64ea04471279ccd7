//! # Application Orchestrator
//!
//! Ties the pipeline together: fixed-rate sensor sampling into the
//! orientation filter, position updates into telemetry records, records
//! into the delivery queue, and the ready indicator tracking
//! connectivity. One context object, built once at startup and handed
//! everything it needs; there is no ambient global state.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::device::ReadyIndicator;
use crate::error::Result;
use crate::fusion::{OrientationFilter, TiltAngles};
use crate::gps::GpsSimulator;
use crate::sensor::ImuReader;
use crate::telemetry::{SleighTelemetry, TelemetryClient};

/// Latest quantized tilt angles, shared across tasks
///
/// Single writer (the sampling tick); the GPS worker reads whatever is
/// current when it assembles a record. Staleness of one tick is
/// immaterial, so plain relaxed atomics carry the channels.
#[derive(Default)]
pub struct SharedTilt {
    x: AtomicI32,
    y: AtomicI32,
    z: AtomicI32,
}

impl SharedTilt {
    pub fn store(&self, tilt: TiltAngles) {
        self.x.store(tilt.x, Ordering::Relaxed);
        self.y.store(tilt.y, Ordering::Relaxed);
        self.z.store(tilt.z, Ordering::Relaxed);
    }

    pub fn load(&self) -> TiltAngles {
        TiltAngles {
            x: self.x.load(Ordering::Relaxed),
            y: self.y.load(Ordering::Relaxed),
            z: self.z.load(Ordering::Relaxed),
        }
    }
}

/// The device application
pub struct Application {
    config: Config,
    client: Arc<TelemetryClient>,
    imu: Box<dyn ImuReader>,
    filter: OrientationFilter,
    gps: GpsSimulator,
    indicator: Box<dyn ReadyIndicator>,
    tilt: Arc<SharedTilt>,
    gift_count: Arc<AtomicU32>,
    ready: Arc<AtomicBool>,
}

impl Application {
    /// Build the application context
    ///
    /// `ready` must be the same flag handed to the telemetry client so
    /// remote status probes see what the indicator shows.
    pub fn new(
        config: Config,
        client: Arc<TelemetryClient>,
        imu: Box<dyn ImuReader>,
        indicator: Box<dyn ReadyIndicator>,
        ready: Arc<AtomicBool>,
    ) -> Self {
        Self {
            filter: OrientationFilter::new(&config.fusion),
            gps: GpsSimulator::new(&config.gps),
            client,
            imu,
            indicator,
            tilt: Arc::new(SharedTilt::default()),
            gift_count: Arc::new(AtomicU32::new(0)),
            ready,
            config,
        }
    }

    /// Run the control loop until Ctrl+C
    pub async fn run(mut self, mut gift_events: mpsc::Receiver<()>) -> Result<()> {
        info!(">>> Application run <<<");

        self.client.connect().await;

        let connected = self.client.is_connected();
        self.ready.store(connected, Ordering::SeqCst);
        self.indicator.set_ready(connected);

        // Position updates drive telemetry assembly on the GPS worker
        let client = Arc::clone(&self.client);
        let tilt = Arc::clone(&self.tilt);
        let gift_count = Arc::clone(&self.gift_count);
        self.gps
            .start(Box::new(move |latitude, longitude| {
                let client = Arc::clone(&client);
                let tilt = Arc::clone(&tilt);
                let gift_count = Arc::clone(&gift_count);
                Box::pin(async move {
                    send_telemetry(&client, &tilt, &gift_count, latitude, longitude).await;
                })
            }))
            .await;

        let mut tick = interval(Duration::from_millis(self.config.app.tick_ms));
        let mut index: u64 = 0;
        let mut gift_button_alive = true;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    index += 1;
                    if index % self.config.app.status_check_ticks == 0 {
                        index = 0;
                        self.refresh_ready();
                    }

                    self.poll_sensor();
                }

                event = gift_events.recv(), if gift_button_alive => {
                    match event {
                        Some(()) => self.record_gift(),
                        None => gift_button_alive = false,
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down...");
                    break;
                }
            }
        }

        self.gps.stop().await;
        self.client.disconnect().await;

        info!("<<< Application run");
        Ok(())
    }

    /// Pull one raw sample through the filter and publish the angles
    ///
    /// A failed read is logged and the tick skipped; the previous
    /// estimate stands.
    fn poll_sensor(&mut self) {
        match self.imu.read() {
            Ok(sample) => {
                self.filter.update(&sample);
                self.tilt.store(self.filter.tilt_angles());
            }
            Err(e) => warn!("Sensor read failed: {}", e),
        }
    }

    /// Re-poll connectivity and converge the ready indicator
    fn refresh_ready(&self) {
        let connected = self.client.is_connected();

        if self.ready.load(Ordering::SeqCst) != connected {
            self.ready.store(connected, Ordering::SeqCst);
            self.indicator.set_ready(connected);
            info!("Connectivity changed, ready = {}", connected);
        }
    }

    /// Count one gift-button falling edge
    fn record_gift(&self) {
        let count = self.gift_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!("GiftCount: {}", count);
    }
}

/// Assemble and enqueue one telemetry record
///
/// Runs on the GPS worker. Skips with a log when the uplink is down;
/// assembly or enqueue problems are logged and never propagate.
async fn send_telemetry(
    client: &TelemetryClient,
    tilt: &SharedTilt,
    gift_count: &AtomicU32,
    latitude: f64,
    longitude: f64,
) {
    if !client.is_connected() {
        info!("Skip telemetry for connection broken reason");
        return;
    }

    let record = SleighTelemetry::new(
        latitude,
        longitude,
        &tilt.load(),
        gift_count.load(Ordering::SeqCst),
    );

    match record.to_json() {
        Ok(payload) => {
            if !client.enqueue(payload).await {
                info!("Skip telemetry for connection broken reason");
            }
        }
        Err(e) => error!("Failed to serialize telemetry: {}", e),
    }
}
