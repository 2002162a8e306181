//! Daemon assembly: platform, controller, topology watcher, admin API.

use std::sync::Arc;

use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::{info, warn};

use corepark_control::{Controller, Platform};
use corepark_core::CoreparkConfig;
use corepark_sysfs::{LinuxPlatform, TopologyWatcher};

pub async fn run(config: CoreparkConfig) -> anyhow::Result<()> {
    info!(
        sysfs = %config.platform.sysfs_root.display(),
        procfs = %config.platform.procfs_root.display(),
        "corepark daemon starting"
    );

    // ── Platform and controller ────────────────────────────────

    let linux = Arc::new(LinuxPlatform::from_config(&config.platform));
    info!(clk_tck = linux.clk_tck(), "linux platform initialized");

    let platform = Platform {
        cpus: linux.clone(),
        counters: linux.clone(),
        tasks: linux,
    };
    let controller = Controller::new(&config.controller, platform)?;

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Background tasks ───────────────────────────────────────

    let watcher = TopologyWatcher::from_config(&config.platform);
    let events = controller.topology_sender();
    let watcher_handle = tokio::spawn(async move {
        watcher.run(events, shutdown_rx).await;
    });

    if config.controller.start_active {
        controller.start().await?;
    }

    // ── Admin API ──────────────────────────────────────────────

    let router = corepark_api::build_router(Arc::clone(&controller));
    let addr = config.admin.listen;

    info!(%addr, "admin API starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let mut terminate = signal(SignalKind::terminate())?;
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!(error = %e, "failed to listen for ctrl-c");
                }
            }
            _ = terminate.recv() => {}
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Leave every core online on the way out.
    let report = controller.stop().await;
    if !report.failed.is_empty() {
        warn!(cores = ?report.failed, "exiting with cores still parked");
    }
    let _ = watcher_handle.await;

    info!("corepark daemon stopped");
    Ok(())
}
