use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::ServiceResponse;
use actix_web::{App, test, web};
use async_trait::async_trait;
use ravenwatch::{
    AlertRequest, AlertSink, Check, CheckResult, CheckRunner, Config, ConfigFile, DeliveryError, DeviceRegistry,
    MonitoringEngine, MonitoringScheduler,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

struct AlwaysUp;

#[async_trait]
impl CheckRunner for AlwaysUp {
    async fn run(&self, check: &Check, _timeout: Duration) -> CheckResult {
        CheckResult::new(check.check_type(), check.target()).success("ok", 1.0)
    }
}

struct Discard;

#[async_trait]
impl AlertSink for Discard {
    async fn send(&self, _url: &str, _alert: &AlertRequest) -> Result<(), DeliveryError> {
        Ok(())
    }
}

fn state(dir: &tempfile::TempDir) -> web::Data<AppState> {
    let file = ConfigFile::new(dir.path().join("config.toml"));
    let config = Config::default();
    let registry = DeviceRegistry::new(Arc::new(file), config);
    let engine = Arc::new(MonitoringEngine::new(registry, Arc::new(AlwaysUp), Arc::new(Discard)));
    let scheduler = MonitoringScheduler::new(engine.clone(), CancellationToken::new()).handle();
    web::Data::new(AppState { engine, scheduler })
}

async fn body(resp: ServiceResponse) -> Value {
    test::read_body_json(resp).await
}

#[actix_web::test]
async fn test_health_and_empty_status() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(state(&dir)).configure(super::routes)).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert!(resp.status().is_success());
    assert_eq!(body(resp).await["status"], "ok");

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/status").to_request()).await;
    let status = body(resp).await;
    assert_eq!(status["cycle"], 0);
    assert_eq!(status["devices"], json!([]));
}

#[actix_web::test]
async fn test_device_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(state(&dir)).configure(super::routes)).await;
    let new_device = json!({ "name": "Mixer", "host": "10.0.0.7", "ports": [80, 443] });

    let req = test::TestRequest::post().uri("/api/devices").set_json(&new_device).to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    assert_eq!(body(resp).await["device"]["name"], "Mixer");

    let req = test::TestRequest::post().uri("/api/devices").set_json(&new_device).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    assert!(body(resp).await["detail"].is_string());

    let bad_port = json!({ "name": "Stagebox", "host": "10.0.0.8", "ports": [70000] });
    let req = test::TestRequest::post().uri("/api/devices").set_json(&bad_port).to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);

    let update = json!({ "new_name": "FOH Mixer", "host": "10.0.0.9", "ports": [554], "notifications_enabled": false });
    let req = test::TestRequest::put().uri("/api/devices/Mixer").set_json(&update).to_request();
    assert!(test::call_service(&app, req).await.status().is_success());

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/devices").to_request()).await;
    assert_eq!(body(resp).await, json!(["FOH Mixer"]));

    let saved = ConfigFile::new(dir.path().join("config.toml")).load().unwrap();
    assert_eq!(saved.devices.len(), 1);
    assert!(!saved.devices[0].notifications_enabled);

    let req = test::TestRequest::delete().uri("/api/devices/FOH%20Mixer").to_request();
    assert!(test::call_service(&app, req).await.status().is_success());
    let req = test::TestRequest::delete().uri("/api/devices/FOH%20Mixer").to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 404);
}

#[actix_web::test]
async fn test_run_now_publishes_a_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);
    let app = test::init_service(App::new().app_data(state.clone()).configure(super::routes)).await;

    let device = json!({ "name": "Core", "host": "10.0.0.1", "ports": [80] });
    let req = test::TestRequest::post().uri("/api/devices").set_json(&device).to_request();
    assert!(test::call_service(&app, req).await.status().is_success());

    let resp = test::call_service(&app, test::TestRequest::post().uri("/api/test").to_request()).await;
    assert_eq!(body(resp).await["status"], "started");

    for _ in 0..100 {
        if state.engine.snapshot().cycle == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/device/Core").to_request()).await;
    assert!(resp.status().is_success());
    assert_eq!(body(resp).await["status"], "up");

    let req = test::TestRequest::get().uri("/api/device/Missing").to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 404);
}

#[actix_web::test]
async fn test_settings_and_troubleshooting() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(state(&dir)).configure(super::routes)).await;

    let resp = test::call_service(&app, test::TestRequest::post().uri("/api/settings/test").to_request()).await;
    assert_eq!(resp.status().as_u16(), 400);

    let settings = json!({ "webhook_url": "https://example.test/hook", "enabled": false });
    let req = test::TestRequest::post().uri("/api/settings").set_json(&settings).to_request();
    assert!(test::call_service(&app, req).await.status().is_success());

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/settings").to_request()).await;
    assert_eq!(body(resp).await, settings);

    let resp = test::call_service(&app, test::TestRequest::post().uri("/api/settings/test").to_request()).await;
    assert!(resp.status().is_success());

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/troubleshoot/options").to_request()).await;
    assert!(body(resp).await.is_array());

    let req = test::TestRequest::post().uri("/api/troubleshoot/app").to_request();
    let run = body(test::call_service(&app, req).await).await;
    assert_eq!(run["category"]["id"], "app");
    assert_eq!(run["results"]["tags"], json!(["app"]));
    assert_eq!(run["results"]["devices"], json!([]));

    let req = test::TestRequest::post().uri("/api/troubleshoot/nope").to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 404);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/ravenna/status").to_request()).await;
    assert_eq!(body(resp).await["total_ravenna_devices"], 0);
}
