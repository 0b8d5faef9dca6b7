use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::events::SessionComplete;
use crate::models::{TimerConfig, TimerMode};
use crate::timer::{TimerEngine, TimerSnapshot};

const TICK: Duration = Duration::from_secs(1);

/// Owns the ticking task; dropping it stops the countdown cadence.
struct Ticker(JoinHandle<()>);

impl Drop for Ticker {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Drives a [`TimerEngine`] on a one-second cadence while it is running.
///
/// Must be used from within a tokio runtime. Completed sessions are delivered
/// on the receiver returned by [`TimerDriver::new`].
pub struct TimerDriver {
    engine: Arc<Mutex<TimerEngine>>,
    events: UnboundedSender<SessionComplete>,
    ticker: Option<Ticker>,
}

impl TimerDriver {
    pub fn new(config: TimerConfig) -> (Self, UnboundedReceiver<SessionComplete>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let driver = Self {
            engine: Arc::new(Mutex::new(TimerEngine::new(config))),
            events,
            ticker: None,
        };
        (driver, receiver)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.engine.lock().expect("timer poisoned").snapshot()
    }

    pub fn start(&mut self) {
        let started = self.engine.lock().expect("timer poisoned").start();
        if started {
            log::debug!("timer started");
            self.ticker = Some(spawn_ticker(self.engine.clone(), self.events.clone()));
        }
    }

    pub fn pause(&mut self) {
        self.ticker = None;
        self.engine.lock().expect("timer poisoned").pause();
    }

    pub fn reset(&mut self) {
        self.ticker = None;
        self.engine.lock().expect("timer poisoned").reset();
    }

    pub fn switch_mode(&mut self, mode: TimerMode) {
        self.ticker = None;
        self.engine.lock().expect("timer poisoned").switch_mode(mode);
    }

    pub fn set_config(&mut self, config: TimerConfig) {
        self.engine.lock().expect("timer poisoned").set_config(config);
    }
}

fn spawn_ticker(engine: Arc<Mutex<TimerEngine>>, events: UnboundedSender<SessionComplete>) -> Ticker {
    Ticker(tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick resolves immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let outcome = {
                let mut guard = engine.lock().expect("timer poisoned");
                if !guard.is_running() {
                    break;
                }
                guard.tick()
            };
            if let Some(event) = outcome {
                if events.send(event).is_err() {
                    log::warn!("session complete dropped, receiver closed");
                }
                break;
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerStatus;
    use tokio::sync::mpsc::error::TryRecvError;

    fn config(work: u32) -> TimerConfig {
        TimerConfig {
            work,
            short: 1,
            long: 2,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn running_timer_completes_and_emits_once() {
        let (mut driver, mut rx) = TimerDriver::new(config(1));
        driver.start();

        tokio::time::sleep(Duration::from_millis(30_500)).await;
        assert_eq!(driver.snapshot().remaining_secs, 30);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionComplete {
                duration_minutes: 1,
                mode: TimerMode::Work
            }
        );
        let snapshot = driver.snapshot();
        assert_eq!(snapshot.status, TimerStatus::Paused);
        assert_eq!(snapshot.remaining_secs, 60);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_ticking_and_start_resumes() {
        let (mut driver, mut rx) = TimerDriver::new(config(1));
        driver.start();
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        driver.pause();
        assert_eq!(driver.snapshot().remaining_secs, 50);

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(driver.snapshot().remaining_secs, 50);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        driver.start();
        tokio::time::sleep(Duration::from_millis(50_500)).await;
        assert_eq!(rx.try_recv().unwrap().duration_minutes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn switch_mode_and_reset_cancel_the_countdown() {
        let (mut driver, mut rx) = TimerDriver::new(config(1));
        driver.start();
        tokio::time::sleep(Duration::from_millis(5_500)).await;
        driver.switch_mode(TimerMode::LongBreak);
        let snapshot = driver.snapshot();
        assert_eq!(snapshot.mode, TimerMode::LongBreak);
        assert_eq!(snapshot.status, TimerStatus::Paused);
        assert_eq!(snapshot.remaining_secs, 120);

        driver.start();
        tokio::time::sleep(Duration::from_millis(5_500)).await;
        driver.reset();
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(driver.snapshot().remaining_secs, 120);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_driver_releases_the_ticker() {
        let (mut driver, mut rx) = TimerDriver::new(config(1));
        driver.start();
        drop(driver);
        tokio::time::sleep(Duration::from_secs(120)).await;
        // Sender is gone with the driver and the aborted task.
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
    }
}
