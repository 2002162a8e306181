//! Controller — owns the registry and drives the periodic control task.
//!
//! `start()` enumerates online cores and spawns the control task;
//! `stop()` ends it and wakes every parked core before returning, so the
//! machine is never left short of cores while the controller is inactive.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use corepark_core::config::ControllerConfig;
use corepark_core::{CoreId, CpuControl, Direction, TaskCounter, TopologyEvent, UsageCounters};
use corepark_load::update_loads;
use corepark_registry::{ManagedCore, Registry};

use crate::decision::{decide, Decision, DecisionInputs};
use crate::error::ControlResult;
use crate::reconciler::Reconciler;
use crate::selector::{pick_park_candidate, pick_wake_candidate};
use crate::tunables::Tunables;

/// Platform collaborators the controller drives.
#[derive(Clone)]
pub struct Platform {
    pub cpus: Arc<dyn CpuControl>,
    pub counters: Arc<dyn UsageCounters>,
    pub tasks: Arc<dyn TaskCounter>,
}

/// Sending half of the topology event queue.
pub type TopologySender = mpsc::UnboundedSender<TopologyEvent>;

/// The structural change a pass ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CycleAction {
    Hold,
    Parked { core: CoreId },
    Woken { core: CoreId },
    /// The platform refused the request; membership is unchanged.
    Failed { core: CoreId, direction: Direction },
}

/// Summary of one control pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub nr_cores: u32,
    pub sum_smoothed_load: u32,
    pub running_tasks: u32,
    pub action: CycleAction,
}

/// Result of waking parked cores on `stop()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StopReport {
    pub woken: Vec<CoreId>,
    /// Cores whose wake failed; they stay parked.
    pub failed: Vec<CoreId>,
}

/// Readout for the admin surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerStatus {
    pub active: bool,
    pub online_count: u32,
    pub parked_count: u32,
    pub sum_smoothed_load: u32,
    pub running_tasks: u32,
    pub target_qof: u32,
    pub period_ms: u32,
    pub smoothing_coefficient: u32,
}

/// Handle to the running control task.
struct LoopSlot {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

pub struct Controller {
    registry: Mutex<Registry>,
    tunables: Tunables,
    reconciler: Reconciler,
    platform: Platform,
    events_tx: TopologySender,
    events_rx: Mutex<mpsc::UnboundedReceiver<TopologyEvent>>,
    /// Serializes start/stop; `Some` while the control task runs.
    lifecycle: tokio::sync::Mutex<Option<LoopSlot>>,
    active: AtomicBool,
    running_tasks: AtomicU32,
    sum_smoothed_load: AtomicU32,
}

impl Controller {
    /// Build a stopped controller. Fails if the configured tunables are out
    /// of range.
    pub fn new(config: &ControllerConfig, platform: Platform) -> ControlResult<Arc<Self>> {
        let tunables = Tunables::from_config(config)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Ok(Arc::new(Self {
            registry: Mutex::new(Registry::new(config.primary_core)),
            tunables,
            reconciler: Reconciler::new(config.quarantine_after),
            platform,
            events_tx,
            events_rx: Mutex::new(events_rx),
            lifecycle: tokio::sync::Mutex::new(None),
            active: AtomicBool::new(false),
            running_tasks: AtomicU32::new(0),
            sum_smoothed_load: AtomicU32::new(0),
        }))
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    /// A sender for topology events; they are applied at the start of the
    /// next pass (or on `start()`).
    pub fn topology_sender(&self) -> TopologySender {
        self.events_tx.clone()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn parked_count(&self) -> u32 {
        self.registry().parked_count() as u32
    }

    /// Copy of every managed core.
    pub fn cores(&self) -> Vec<ManagedCore> {
        self.registry().snapshot()
    }

    pub fn status(&self) -> ControllerStatus {
        let (online_count, parked_count) = {
            let registry = self.registry();
            (registry.online_count() as u32, registry.parked_count() as u32)
        };
        let tunables = self.tunables.snapshot();
        ControllerStatus {
            active: self.is_active(),
            online_count,
            parked_count,
            sum_smoothed_load: self.sum_smoothed_load.load(Ordering::Relaxed),
            running_tasks: self.running_tasks.load(Ordering::Relaxed),
            target_qof: tunables.target_qof,
            period_ms: tunables.period_ms,
            smoothing_coefficient: tunables.smoothing_coefficient,
        }
    }

    /// Apply a topology event immediately, under the registry lock.
    pub fn reconcile(&self, event: TopologyEvent) -> ControlResult<()> {
        let mut registry = self.registry();
        self.reconciler.apply(&mut registry, event)?;
        Ok(())
    }

    fn drain_events(&self, registry: &mut Registry) {
        let events: Vec<TopologyEvent> = {
            let mut rx = self.events_rx.lock().unwrap_or_else(PoisonError::into_inner);
            std::iter::from_fn(|| rx.try_recv().ok()).collect()
        };
        for event in events {
            if let Err(e) = self.reconciler.apply(registry, event) {
                warn!(?event, error = %e, "topology event rejected");
            }
        }
    }

    /// Run one pass: drain events, sample, smooth, decide, act.
    pub fn run_cycle(&self) -> ControlResult<CycleReport> {
        let tunables = self.tunables.snapshot();
        let mut registry = self.registry();

        self.drain_events(&mut registry);

        let loads = update_loads(
            &mut registry,
            self.platform.counters.as_ref(),
            tunables.smoothing_coefficient,
        );

        let running_tasks = match self.platform.tasks.running_tasks() {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "failed to read running task count, reusing last value");
                self.running_tasks.load(Ordering::Relaxed)
            }
        };
        self.running_tasks.store(running_tasks, Ordering::Relaxed);
        self.sum_smoothed_load.store(loads.sum_smoothed_load, Ordering::Relaxed);

        let inputs = DecisionInputs {
            nr_cores: loads.nr_cores,
            sum_smoothed_load: loads.sum_smoothed_load,
            running_tasks,
            target_qof: tunables.target_qof,
            parked_count: registry.parked_count() as u32,
        };
        let decision = decide(
            &inputs,
            pick_park_candidate(&registry, self.reconciler.quarantine_after()),
            pick_wake_candidate(&registry),
        );

        let action = match decision {
            Decision::Hold => CycleAction::Hold,
            Decision::Park(core) => self.park(&mut registry, core)?,
            Decision::Wake(core) => self.wake(&mut registry, core)?,
        };

        debug!(
            nr_cores = inputs.nr_cores,
            sum_smoothed_load = inputs.sum_smoothed_load,
            running_tasks,
            parked = registry.parked_count(),
            ?action,
            "control pass"
        );

        Ok(CycleReport {
            nr_cores: inputs.nr_cores,
            sum_smoothed_load: inputs.sum_smoothed_load,
            running_tasks,
            action,
        })
    }

    fn park(&self, registry: &mut Registry, core: CoreId) -> ControlResult<CycleAction> {
        if let Err(e) = self.platform.cpus.request_offline(core) {
            warn!(core, error = %e, "park request failed");
            self.reconciler.record_failure(registry, core);
            return Ok(CycleAction::Failed {
                core,
                direction: Direction::Offline,
            });
        }
        registry.move_to_parked(core)?;
        self.reconciler.record_success(registry, core, Direction::Offline);
        info!(core, parked = registry.parked_count(), "core parked");
        Ok(CycleAction::Parked { core })
    }

    fn wake(&self, registry: &mut Registry, core: CoreId) -> ControlResult<CycleAction> {
        if let Err(e) = self.platform.cpus.request_online(core) {
            warn!(core, error = %e, "wake request failed");
            self.reconciler.record_failure(registry, core);
            return Ok(CycleAction::Failed {
                core,
                direction: Direction::Online,
            });
        }
        registry.move_to_online(core)?;
        self.reconciler.record_success(registry, core, Direction::Online);
        info!(core, parked = registry.parked_count(), "core woken");
        Ok(CycleAction::Woken { core })
    }

    /// Wake every parked core, earliest-parked first. Failures are logged
    /// and the core stays parked.
    fn wake_all(&self, registry: &mut Registry) -> StopReport {
        let mut report = StopReport::default();
        for core in registry.parked_ids() {
            match self.wake(registry, core) {
                Ok(CycleAction::Woken { .. }) => report.woken.push(core),
                Ok(_) => report.failed.push(core),
                Err(e) => {
                    warn!(core, error = %e, "could not restore parked core");
                    report.failed.push(core);
                }
            }
        }
        report
    }

    /// Bring the registry in line with the cores the platform reports
    /// online, then retry any core left parked by an earlier stop.
    fn enumerate(&self) -> ControlResult<()> {
        let online = self.platform.cpus.online_cores()?;
        let mut registry = self.registry();

        self.drain_events(&mut registry);

        for core in online {
            match registry.get(core).map(|c| c.is_parked()) {
                None => registry.register(core)?,
                // Someone else brought it back while we were stopped.
                Some(true) => registry.move_to_online(core)?,
                Some(false) => {}
            }
        }

        let leftover = self.wake_all(&mut registry);
        if !leftover.woken.is_empty() {
            info!(cores = ?leftover.woken, "restored cores left parked by previous stop");
        }
        if !leftover.failed.is_empty() {
            warn!(cores = ?leftover.failed, "cores remain parked");
        }
        Ok(())
    }

    /// Start the control task. Returns `false` if it was already running.
    pub async fn start(self: &Arc<Self>) -> ControlResult<bool> {
        let mut slot = self.lifecycle.lock().await;
        if slot.is_some() {
            return Ok(false);
        }

        let this = Arc::clone(self);
        tokio::task::spawn_blocking(move || this.enumerate()).await??;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.active.store(true, Ordering::SeqCst);
        let this = Arc::clone(self);
        let handle = tokio::spawn(this.run(shutdown_rx));
        *slot = Some(LoopSlot {
            handle,
            shutdown_tx,
        });

        info!(
            online = self.registry().online_count(),
            target_qof = self.tunables.target_qof(),
            period_ms = self.tunables.period_ms(),
            "controller activated"
        );
        Ok(true)
    }

    /// Stop the control task and wake every parked core. The controller is
    /// stopped even if some wakes fail; those cores are reported and stay
    /// parked until the next `start()`.
    pub async fn stop(self: &Arc<Self>) -> StopReport {
        let mut slot = self.lifecycle.lock().await;
        let Some(running) = slot.take() else {
            return StopReport::default();
        };

        self.active.store(false, Ordering::SeqCst);
        let _ = running.shutdown_tx.send(true);
        if let Err(e) = running.handle.await {
            warn!(error = %e, "control task ended abnormally");
        }

        let this = Arc::clone(self);
        let report = match tokio::task::spawn_blocking(move || {
            let mut registry = this.registry();
            this.wake_all(&mut registry)
        })
        .await
        {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "waking parked cores failed");
                StopReport {
                    woken: Vec::new(),
                    failed: self.registry().parked_ids(),
                }
            }
        };
        if report.failed.is_empty() {
            info!(woken = report.woken.len(), "controller deactivated");
        } else {
            warn!(
                woken = report.woken.len(),
                still_parked = ?report.failed,
                "controller deactivated with cores still parked"
            );
        }
        report
    }

    /// Start or stop to match `active`. Returns whether anything changed.
    pub async fn set_active(self: &Arc<Self>, active: bool) -> ControlResult<bool> {
        if active {
            self.start().await
        } else {
            let was_active = self.is_active();
            self.stop().await;
            Ok(was_active)
        }
    }

    /// The control task: one pass, then sleep for the current period or
    /// until shutdown. Passes run on the blocking pool since hotplug writes
    /// can stall for a long time.
    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        debug!("control loop starting");
        loop {
            if *shutdown.borrow() {
                break;
            }
            let this = Arc::clone(&self);
            match tokio::task::spawn_blocking(move || this.run_cycle()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(error = %e, "control pass failed"),
                Err(e) => warn!(error = %e, "control pass aborted"),
            }

            let period = Duration::from_millis(self.tunables.period_ms() as u64);
            tokio::select! {
                _ = tokio::time::sleep(period) => {}
                _ = shutdown.changed() => {
                    debug!("control loop interrupted");
                    break;
                }
            }
        }
        debug!("control loop stopped");
    }
}
