//! Admin API tests against a controller driving a fixture sysfs/procfs tree.
//!
//! Exercises the same assembly the daemon builds: `LinuxPlatform` rooted
//! in a temp directory, the controller, and the axum router.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use corepark_api::build_router;
use corepark_control::{Controller, Platform};
use corepark_core::config::ControllerConfig;
use corepark_sysfs::LinuxPlatform;

const CORES: u32 = 4;

struct Fixture {
    _dir: tempfile::TempDir,
    cpu_dir: PathBuf,
    controller: Arc<Controller>,
    router: Router,
}

fn write_tree(root: &Path) -> PathBuf {
    let cpus = root.join("sys/devices/system/cpu");
    for id in 0..CORES {
        let cpu = cpus.join(format!("cpu{id}"));
        fs::create_dir_all(&cpu).unwrap();
        if id != 0 {
            fs::write(cpu.join("online"), "1\n").unwrap();
        }
    }
    fs::write(cpus.join("online"), "0-3\n").unwrap();
    fs::write(cpus.join("present"), "0-3\n").unwrap();

    let proc_root = root.join("proc");
    fs::create_dir_all(&proc_root).unwrap();
    let mut stat = String::from("cpu  40 0 40 400 0 0 0 0 0 0\n");
    for id in 0..CORES {
        stat.push_str(&format!("cpu{id} 10 0 10 100 0 0 0 0 0 0\n"));
    }
    fs::write(proc_root.join("stat"), stat).unwrap();
    fs::write(proc_root.join("loadavg"), "0.10 0.10 0.10 1/90 4242\n").unwrap();

    cpus
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let cpu_dir = write_tree(dir.path());

    let linux = Arc::new(LinuxPlatform::new(
        dir.path().join("sys"),
        dir.path().join("proc"),
    ));
    let platform = Platform {
        cpus: linux.clone(),
        counters: linux.clone(),
        tasks: linux,
    };
    let config = ControllerConfig {
        // Only the pass run on activation matters here.
        period_ms: 60_000,
        ..ControllerConfig::default()
    };
    let controller = Controller::new(&config, platform).unwrap();
    let router = build_router(Arc::clone(&controller));

    Fixture {
        _dir: dir,
        cpu_dir,
        controller,
        router,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn put_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn offline_files(cpu_dir: &Path) -> Vec<u32> {
    (1..CORES)
        .filter(|id| {
            let value = fs::read_to_string(cpu_dir.join(format!("cpu{id}/online"))).unwrap();
            value.trim() == "0"
        })
        .collect()
}

async fn wait_for_parked(router: &Router, expected: u64) {
    for _ in 0..200 {
        let (_, body) = send(router, get("/api/v1/parked")).await;
        if body["data"]["parked_count"] == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("parked_count never reached {expected}");
}

#[tokio::test]
async fn admin_api_reports_defaults() {
    let f = fixture();

    let (status, body) = send(&f.router, get("/api/v1/active")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active"], false);

    let (_, body) = send(&f.router, get("/api/v1/tunables")).await;
    assert_eq!(body["data"]["target_qof"], 1000);
    assert_eq!(body["data"]["period_ms"], 60_000);
    assert_eq!(body["data"]["smoothing_coefficient"], 4);
}

#[tokio::test]
async fn admin_api_rejects_qof_above_max() {
    let f = fixture();

    let (status, body) = send(&f.router, put_json("/api/v1/qof", serde_json::json!({ "target_qof": 2000 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(&f.router, put_json("/api/v1/qof", serde_json::json!({ "target_qof": 700 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(f.controller.tunables().target_qof(), 700);
}

#[tokio::test]
async fn admin_api_rejects_malformed_body() {
    let f = fixture();
    let resp = f
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/v1/active")
                .header("content-type", "application/json")
                .body(Body::from("{\"active\": \"yes\"}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
    assert!(!f.controller.is_active());
}

#[tokio::test]
async fn activation_parks_through_sysfs_and_deactivation_restores() {
    let f = fixture();

    let (status, body) = send(&f.router, put_json("/api/v1/active", serde_json::json!({ "active": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["changed"], true);

    // Idle machine: the first pass parks one non-primary core.
    wait_for_parked(&f.router, 1).await;
    assert_eq!(offline_files(&f.cpu_dir).len(), 1);

    let (_, body) = send(&f.router, get("/api/v1/cores")).await;
    let cores = body["data"].as_array().unwrap();
    assert_eq!(cores.len(), CORES as usize);
    let parked: Vec<_> = cores.iter().filter(|c| c["membership"] == "parked").collect();
    assert_eq!(parked.len(), 1);
    assert_ne!(parked[0]["id"], 0);

    let (status, body) = send(&f.router, put_json("/api/v1/active", serde_json::json!({ "active": false }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["woken"].as_array().unwrap().len(), 1);
    assert!(body["data"]["still_parked"].as_array().unwrap().is_empty());

    assert!(offline_files(&f.cpu_dir).is_empty());
    let (_, body) = send(&f.router, get("/api/v1/parked")).await;
    assert_eq!(body["data"]["parked_count"], 0);
}
