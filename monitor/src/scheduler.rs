//! Fixed-interval run loop.

use std::sync::Arc;
use std::time::Duration;

use kursmon_common::{KursmonError, Result};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, instrument};

use crate::service::MonitorService;
use crate::state::SchedulerState;

/// Runs scheduled cycles until stopped.
///
/// The first cycle starts immediately. Missed ticks are skipped rather than
/// replayed. Shutdown is only observed between cycles, so an in-flight
/// cycle always completes.
pub struct Scheduler {
    service: Arc<MonitorService>,
    interval: Duration,
    destination: String,
    state: Arc<RwLock<SchedulerState>>,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

impl Scheduler {
    /// Create a scheduler notifying the service's default destination.
    pub fn new(service: Arc<MonitorService>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(KursmonError::Configuration(
                "schedule interval must be positive".to_string(),
            ));
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let destination = service.default_destination().to_string();

        Ok(Self {
            service,
            interval,
            destination,
            state: Arc::new(RwLock::new(SchedulerState::Starting)),
            shutdown_tx,
            shutdown_rx: Mutex::new(Some(shutdown_rx)),
        })
    }

    /// Get the current scheduler state.
    pub fn state(&self) -> SchedulerState {
        *self.state.read()
    }

    /// Run until `stop` is called. Can only be entered once.
    #[instrument(skip(self), fields(interval_secs = self.interval.as_secs()))]
    pub async fn run(&self) -> Result<()> {
        let mut shutdown_rx = self.shutdown_rx.lock().take().ok_or_else(|| {
            KursmonError::Configuration("scheduler already started".to_string())
        })?;

        {
            let mut state = self.state.write();
            if *state != SchedulerState::Starting {
                *state = SchedulerState::Stopped;
                info!("Scheduler stopped before first cycle");
                return Ok(());
            }
            *state = SchedulerState::Running;
        }
        info!("Scheduler running");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => {
                    if !self.state().accepts_cycles() {
                        break;
                    }
                    self.service.run_scheduled(&self.destination).await;
                }
            }
        }

        *self.state.write() = SchedulerState::Stopped;
        info!("Scheduler stopped");
        Ok(())
    }

    /// Request shutdown. The loop exits once the in-flight cycle, if any,
    /// has finished.
    pub async fn stop(&self) {
        {
            let mut state = self.state.write();
            if state.is_terminal() {
                return;
            }
            *state = SchedulerState::ShuttingDown;
        }
        info!("Scheduler shutdown requested");
        let _ = self.shutdown_tx.try_send(());
    }
}
