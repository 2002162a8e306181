//! Topology watcher — polls `present` and `online` and turns differences
//! into [`TopologyEvent`]s for the controller.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use corepark_core::config::PlatformConfig;
use corepark_core::{CoreId, PlatformResult, TopologyEvent};

use crate::cpulist::parse_cpu_list;
use crate::platform::cpu_dir;

/// One observation of the machine's cores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologySnapshot {
    pub present: BTreeSet<CoreId>,
    pub online: BTreeSet<CoreId>,
}

impl TopologySnapshot {
    pub fn new(
        present: impl IntoIterator<Item = CoreId>,
        online: impl IntoIterator<Item = CoreId>,
    ) -> Self {
        Self {
            present: present.into_iter().collect(),
            online: online.into_iter().collect(),
        }
    }
}

/// Events that explain the move from `prev` to `next`.
///
/// Removals come first, then cores that went offline, then cores that
/// came online; each group is in ascending core order.
pub fn diff(prev: &TopologySnapshot, next: &TopologySnapshot) -> Vec<TopologyEvent> {
    let mut events = Vec::new();

    for &core in prev.present.difference(&next.present) {
        events.push(TopologyEvent::CoreRemoved { core });
    }
    for &core in prev.online.difference(&next.online) {
        if next.present.contains(&core) {
            events.push(TopologyEvent::CoreOffline { core });
        }
    }
    for &core in next.online.difference(&prev.online) {
        events.push(TopologyEvent::CoreAdded { core });
    }

    events
}

/// Polls the sysfs cpu directory at a fixed interval.
#[derive(Debug, Clone)]
pub struct TopologyWatcher {
    cpu_dir: PathBuf,
    interval: Duration,
}

impl TopologyWatcher {
    pub fn new(sysfs_root: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            cpu_dir: cpu_dir(&sysfs_root.into()),
            interval,
        }
    }

    pub fn from_config(config: &PlatformConfig) -> Self {
        Self::new(
            config.sysfs_root.clone(),
            Duration::from_millis(config.watch_interval_ms),
        )
    }

    /// Read the current `present` and `online` lists.
    pub fn snapshot(&self) -> PlatformResult<TopologySnapshot> {
        let present = std::fs::read_to_string(self.cpu_dir.join("present"))?;
        let online = std::fs::read_to_string(self.cpu_dir.join("online"))?;
        Ok(TopologySnapshot::new(
            parse_cpu_list(&present)?,
            parse_cpu_list(&online)?,
        ))
    }

    /// Poll until `shutdown` flips or the receiving side goes away.
    ///
    /// The first successful read is the baseline and produces no events.
    pub async fn run(
        self,
        tx: mpsc::UnboundedSender<TopologyEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut last: Option<TopologySnapshot> = None;
        info!(
            dir = %self.cpu_dir.display(),
            interval_ms = self.interval.as_millis() as u64,
            "topology watcher starting"
        );

        loop {
            match self.snapshot() {
                Ok(next) => {
                    if let Some(prev) = &last {
                        for event in diff(prev, &next) {
                            debug!(?event, "topology change");
                            if tx.send(event).is_err() {
                                debug!("topology receiver dropped, watcher stopping");
                                return;
                            }
                        }
                    }
                    last = Some(next);
                }
                Err(e) => warn!(error = %e, "failed to read cpu topology"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    debug!("topology watcher shutting down");
                    break;
                }
            }
        }
    }
}
