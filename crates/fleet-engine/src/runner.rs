//! Background engine thread with an explicit start/stop lifecycle.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};
use fleet_core::{FleetConfig, Tick, TrafficEvent};
use fleet_store::{KvBackend, MemoryBackend, SharedFleetStore};
use parking_lot::Mutex;
use tracing::{error, info};

use crate::{EngineError, EngineObserver, EngineResult, MovementEngine, ObserverSet};

/// Sleep durations of the runner loop.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct RunnerTiming {
    /// Pause after every successful tick.
    pub tick_period:      Duration,
    /// Pause after a failed tick before retrying the same step.
    pub failure_cooldown: Duration,
}

impl RunnerTiming {
    pub fn from_config(config: &FleetConfig) -> Self {
        Self {
            tick_period:      config.tick_period(),
            failure_cooldown: config.failure_cooldown(),
        }
    }
}

/// State shared between the runner handle and its worker thread.
///
/// The worker holds the lock for exactly one tick pass at a time, never while
/// sleeping.
struct Shared<B: KvBackend> {
    engine:    MovementEngine<B>,
    observers: ObserverSet,
}

struct Worker {
    /// Never sent on; dropping it wakes and stops the worker.
    shutdown: Sender<()>,
    handle:   JoinHandle<()>,
}

/// Runs a [`MovementEngine`] on one background thread.
///
/// # Loop
///
/// ```text
/// loop:
///     step()
///     ok    → sleep tick_period + report.congestion
///     err   → notify observers, sleep failure_cooldown, retry the same step
///     panic → same as err, with EngineError::TickPanicked
/// ```
///
/// Every sleep returns early when [`stop`](Self::stop) is called, and a pass
/// in progress is abandoned between vehicles.
pub struct EngineRunner<B: KvBackend = MemoryBackend> {
    shared: Arc<Mutex<Shared<B>>>,
    timing: RunnerTiming,
    worker: Mutex<Option<Worker>>,
}

impl<B: KvBackend> EngineRunner<B> {
    pub fn new(engine: MovementEngine<B>, timing: RunnerTiming) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared { engine, observers: ObserverSet::new() })),
            timing,
            worker: Mutex::new(None),
        }
    }

    /// Register an observer.  Takes effect from the next tick.
    pub fn add_observer(&self, observer: impl EngineObserver + 'static) {
        self.shared.lock().observers.push(observer);
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// The step the engine will process next.
    pub fn current_step(&self) -> Tick {
        self.shared.lock().engine.current_step()
    }

    /// Run `f` against the engine between ticks.
    pub fn with_engine<R>(&self, f: impl FnOnce(&MovementEngine<B>) -> R) -> R {
        f(&self.shared.lock().engine)
    }

    /// Spawn the engine thread.
    ///
    /// Fails with [`EngineError::AlreadyRunning`] if a thread is already
    /// running; at most one is ever active per runner.
    pub fn start(&self) -> EngineResult<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Err(EngineError::AlreadyRunning);
        }

        let (shutdown, signal) = bounded::<()>(0);
        let shared = Arc::clone(&self.shared);
        let timing = self.timing;
        let handle = thread::Builder::new()
            .name("fleet-engine".into())
            .spawn(move || run_loop(&shared, timing, &signal))
            .map_err(EngineError::Spawn)?;

        info!(step = self.shared.lock().engine.current_step().0, "engine started");
        *worker = Some(Worker { shutdown, handle });
        Ok(())
    }

    /// Signal the engine thread, wait for it to exit and return the next step
    /// it would have processed.
    ///
    /// Stopping a runner that is not running does nothing.
    pub fn stop(&self) -> EngineResult<Tick> {
        let Some(Worker { shutdown, handle }) = self.worker.lock().take() else {
            return Ok(self.current_step());
        };
        drop(shutdown);
        handle.join().map_err(|_| EngineError::WorkerPanicked)?;

        let mut shared = self.shared.lock();
        let final_tick = shared.engine.current_step();
        shared.observers.on_stopped(final_tick);
        info!(step = final_tick.0, "engine stopped");
        Ok(final_tick)
    }
}

impl EngineRunner<MemoryBackend> {
    /// Convenience constructor over the default backend.
    pub fn from_config(
        config:  &FleetConfig,
        store:   SharedFleetStore,
        traffic: TrafficEvent,
    ) -> Self {
        Self::new(MovementEngine::new(config, store, traffic), RunnerTiming::from_config(config))
    }
}

impl<B: KvBackend> Drop for EngineRunner<B> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!(error = %e, "engine did not stop cleanly");
        }
    }
}

// ── Worker loop ───────────────────────────────────────────────────────────────

fn run_loop<B: KvBackend>(shared: &Mutex<Shared<B>>, timing: RunnerTiming, signal: &Receiver<()>) {
    let cancelled = || matches!(signal.try_recv(), Err(TryRecvError::Disconnected));

    loop {
        let outcome = {
            let mut guard = shared.lock();
            let Shared { engine, observers } = &mut *guard;
            let tick = engine.current_step();
            match panic::catch_unwind(AssertUnwindSafe(|| engine.step_with(observers, &cancelled))) {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let err = EngineError::TickPanicked { tick, message: panic_message(&*payload) };
                    // The step did not advance; observers hear about it like any failed tick.
                    if panic::catch_unwind(AssertUnwindSafe(|| observers.on_tick_failed(tick, &err))).is_err() {
                        error!(tick = tick.0, "observer panicked while handling a failed tick");
                    }
                    Err(err)
                }
            }
        };

        let pause = match outcome {
            Ok(report) => timing.tick_period.saturating_add(report.congestion),
            Err(EngineError::Cancelled) => return,
            Err(e) => {
                error!(error = %e, cooldown_ms = timing.failure_cooldown.as_millis() as u64, "tick failed; retrying");
                timing.failure_cooldown
            }
        };

        match signal.recv_timeout(pause) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
