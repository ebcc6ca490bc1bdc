//! Simulated upload progress.
//!
//! The remote service reports no real progress, so while an upload is in
//! flight a background ticker nudges the value upward by random steps. The
//! value approaches the cap but never reaches it until `stop` sets the final
//! value.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use pdfchat_core::config::SessionConfig;

/// Smallest increment applied on a tick.
const MIN_STEP: f64 = 0.1;

/// Tuning for a [`ProgressSimulator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSettings {
    pub tick: Duration,
    pub cap: f64,
    pub max_step: f64,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

impl ProgressSettings {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            tick: config.progress_tick(),
            cap: config.progress_cap,
            max_step: config.progress_max_step,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Progress {
    value: f64,
    running: bool,
}

/// A running (or stopped) progress estimate for one upload attempt.
#[derive(Debug)]
pub struct ProgressSimulator {
    state: Arc<watch::Sender<Progress>>,
    ticker: Option<JoinHandle<()>>,
}

impl ProgressSimulator {
    /// Start ticking from zero. Must be called within a tokio runtime.
    pub fn start(settings: ProgressSettings) -> Self {
        let (tx, _rx) = watch::channel(Progress {
            value: 0.0,
            running: true,
        });
        let state = Arc::new(tx);

        let ticker_state = Arc::clone(&state);
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(settings.tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                interval.tick().await;
                let step = random_step(settings.max_step);
                ticker_state.send_if_modified(|progress| {
                    if !progress.running {
                        return false;
                    }
                    match advance(progress.value, step, settings.cap) {
                        Some(next) => {
                            progress.value = next;
                            true
                        }
                        None => false,
                    }
                });
            }
        });

        tracing::trace!(tick_ms = settings.tick.as_millis() as u64, "Progress simulator started");
        Self {
            state,
            ticker: Some(ticker),
        }
    }

    /// Halt ticking and pin the value to `final_value`.
    pub fn stop(&mut self, final_value: f64) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.state.send_modify(|progress| {
            progress.running = false;
            progress.value = final_value;
        });
    }

    pub fn value(&self) -> f64 {
        self.state.borrow().value
    }

    /// Current value as a whole percentage in `0..=100`. Truncated while
    /// running so the display never reaches the cap early.
    pub fn percent(&self) -> u8 {
        let progress = *self.state.borrow();
        let shown = if progress.running {
            progress.value.floor()
        } else {
            progress.value.round()
        };
        shown.clamp(0.0, 100.0) as u8
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }
}

impl Drop for ProgressSimulator {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

fn random_step(max_step: f64) -> f64 {
    if max_step > MIN_STEP {
        rand::rng().random_range(MIN_STEP..=max_step)
    } else {
        MIN_STEP
    }
}

/// Next value after applying `step`, or `None` if the value must hold.
///
/// At most half the remaining distance to `cap` is covered per tick, so the
/// value never reaches the cap.
fn advance(value: f64, step: f64, cap: f64) -> Option<f64> {
    let remaining = cap - value;
    if remaining <= 0.0 {
        return None;
    }
    let next = value + step.min(remaining / 2.0);
    (next > value && next < cap).then_some(next)
}

// =============================================================================
// Tests
// =============================================================================
