//! KubeStore against a mock API server that enforces resourceVersion
//! preconditions the way the real one does.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use ingress_challenge::config::StoreConfig;
use ingress_challenge::resilience::NoBackoff;
use ingress_challenge::resource::{ResourceRef, ServicePort, VersionStamp};
use ingress_challenge::rollout::{Orchestrator, ProbeVerdict};
use ingress_challenge::store::{KubeStore, ResourceStore, StoreError};

mod common;
use common::{prober, resource, target, ScriptedProbe};

const INGRESS_PATH: &str = "/apis/networking.k8s.io/v1/namespaces/shop/ingresses/storefront";

#[derive(Default)]
struct MockApi {
    ingress: Mutex<Value>,
    pending_conflicts: Mutex<u32>,
    patches: Mutex<u32>,
    last_authorization: Mutex<Option<String>>,
}

impl MockApi {
    fn version(&self) -> String {
        self.ingress.lock().unwrap()["metadata"]["resourceVersion"]
            .as_str()
            .unwrap()
            .to_string()
    }

    fn bump(ingress: &mut Value) {
        let next = ingress["metadata"]["resourceVersion"]
            .as_str()
            .unwrap()
            .parse::<u64>()
            .unwrap()
            + 1;
        ingress["metadata"]["resourceVersion"] = json!(next.to_string());
    }
}

fn storefront() -> Value {
    json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "Ingress",
        "metadata": {
            "name": "storefront",
            "namespace": "shop",
            "resourceVersion": "4107",
            "annotations": { "kubernetes.io/ingress.class": "nginx" }
        },
        "spec": {
            "tls": [{ "hosts": ["shop.example.com"], "secretName": "shop-tls" }],
            "rules": [
                {
                    "host": "shop.example.com",
                    "http": { "paths": [
                        { "path": "/", "pathType": "Prefix",
                          "backend": { "service": { "name": "web", "port": { "number": 80 } } } }
                    ] }
                },
                {
                    "host": "admin.example.com",
                    "http": { "paths": [
                        { "path": "/", "pathType": "Prefix",
                          "backend": { "service": { "name": "admin", "port": { "name": "https" } } } }
                    ] }
                }
            ]
        }
    })
}

async fn get_ingress(State(api): State<Arc<MockApi>>, headers: HeaderMap) -> impl IntoResponse {
    *api.last_authorization.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(api.ingress.lock().unwrap().clone())
}

async fn patch_ingress(State(api): State<Arc<MockApi>>, body: Bytes) -> impl IntoResponse {
    *api.patches.lock().unwrap() += 1;
    let patch: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return (StatusCode::BAD_REQUEST, Json(json!({ "message": e.to_string() }))),
    };

    let mut ingress = api.ingress.lock().unwrap();

    {
        let mut pending = api.pending_conflicts.lock().unwrap();
        if *pending > 0 {
            *pending -= 1;
            MockApi::bump(&mut ingress);
            return (StatusCode::CONFLICT, Json(json!({ "reason": "Conflict" })));
        }
    }

    if patch["metadata"]["resourceVersion"] != ingress["metadata"]["resourceVersion"] {
        return (StatusCode::CONFLICT, Json(json!({ "reason": "Conflict" })));
    }

    ingress["spec"]["rules"] = patch["spec"]["rules"].clone();
    MockApi::bump(&mut ingress);
    (StatusCode::OK, Json(ingress.clone()))
}

async fn start_mock_api() -> (SocketAddr, Arc<MockApi>) {
    let api = Arc::new(MockApi {
        ingress: Mutex::new(storefront()),
        ..Default::default()
    });
    let app = Router::new()
        .route(INGRESS_PATH, get(get_ingress).patch(patch_ingress))
        .with_state(api.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, api)
}

fn store_config(addr: SocketAddr) -> StoreConfig {
    StoreConfig {
        api_server: format!("http://{}", addr),
        token_path: None,
        ca_path: None,
        ..StoreConfig::default()
    }
}

#[tokio::test]
async fn test_get_decodes_rule_groups() {
    let (addr, _api) = start_mock_api().await;
    let store = KubeStore::new(&store_config(addr)).unwrap();

    let ingress = store.get(&resource()).await.unwrap();

    assert_eq!(ingress.version, VersionStamp::from("4107"));
    assert_eq!(ingress.rule_groups.len(), 2);
    let primary = ingress.primary_paths().unwrap();
    assert_eq!(primary[0].to_string(), "/ -> web:80");
    assert_eq!(
        ingress.rule_groups[1].paths[0].backend.port,
        ServicePort::Name("https".into())
    );
}

#[tokio::test]
async fn test_get_missing_ingress() {
    let (addr, _api) = start_mock_api().await;
    let store = KubeStore::new(&store_config(addr)).unwrap();

    let missing = ResourceRef::new("shop", "gone");
    let err = store.get(&missing).await.unwrap_err();
    assert_eq!(err, StoreError::NotFound(missing));
}

#[tokio::test]
async fn test_update_returns_new_version() {
    let (addr, api) = start_mock_api().await;
    let store = KubeStore::new(&store_config(addr)).unwrap();

    let mut ingress = store.get(&resource()).await.unwrap();
    assert!(ingress.replace_primary_paths(Vec::new()));

    let version = ingress.version.clone();
    let next = store.update(&resource(), &ingress, &version).await.unwrap();

    assert_eq!(next, VersionStamp::from("4108"));
    assert_eq!(api.version(), "4108");
    // An empty group keeps its host but loses the http block.
    let stored = api.ingress.lock().unwrap().clone();
    assert_eq!(stored["spec"]["rules"][0]["host"], "shop.example.com");
    assert!(stored["spec"]["rules"][0].get("http").is_none());
    assert_eq!(stored["spec"]["tls"][0]["secretName"], "shop-tls");
}

#[tokio::test]
async fn test_stale_version_is_a_conflict() {
    let (addr, _api) = start_mock_api().await;
    let store = KubeStore::new(&store_config(addr)).unwrap();

    let ingress = store.get(&resource()).await.unwrap();
    let err = store
        .update(&resource(), &ingress, &VersionStamp::from("4000"))
        .await
        .unwrap_err();

    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_token_is_sent_as_bearer() {
    let (addr, api) = start_mock_api().await;
    let token_path =
        std::env::temp_dir().join(format!("ingress-challenge-{}.token", uuid::Uuid::new_v4()));
    std::fs::write(&token_path, "s3cr3t\n").unwrap();

    let config = StoreConfig {
        token_path: Some(token_path.to_string_lossy().into_owned()),
        ..store_config(addr)
    };
    let store = KubeStore::new(&config).unwrap();
    store.get(&resource()).await.unwrap();
    let _ = std::fs::remove_file(&token_path);

    assert_eq!(
        api.last_authorization.lock().unwrap().as_deref(),
        Some("Bearer s3cr3t")
    );
}

#[tokio::test]
async fn test_full_cycle_through_the_api() {
    let (addr, api) = start_mock_api().await;
    *api.pending_conflicts.lock().unwrap() = 2;
    let store = Arc::new(KubeStore::new(&store_config(addr)).unwrap());

    let live = Arc::new(Mutex::new(Value::Null));
    let probe = {
        let api = api.clone();
        let live = live.clone();
        ScriptedProbe::reachable_after(0).with_hook(move |_| {
            *live.lock().unwrap() = api.ingress.lock().unwrap()["spec"]["rules"].clone();
        })
    };

    let report = Orchestrator::new(
        store,
        prober(probe),
        target("http://shop.example.com/.well-known/ping"),
    )
    .with_backoff(NoBackoff)
    .run()
    .await
    .unwrap();

    assert_eq!(report.verdict, ProbeVerdict::Confirmed);
    assert_eq!(report.activation_attempts, 3);
    assert_eq!(report.restore_attempts, 1);
    assert_eq!(*api.patches.lock().unwrap(), 4);

    let during = live.lock().unwrap().clone();
    let added = &during[0]["http"]["paths"][1];
    assert_eq!(added["path"], "/.well-known/*");
    assert_eq!(added["pathType"], "ImplementationSpecific");
    assert_eq!(added["backend"]["service"]["name"], "svc-validate");
    assert_eq!(added["backend"]["service"]["port"]["number"], 8080);

    let restored = api.ingress.lock().unwrap().clone();
    assert_eq!(restored["spec"]["rules"], storefront()["spec"]["rules"]);
    assert_eq!(restored["metadata"]["annotations"], storefront()["metadata"]["annotations"]);
}

#[tokio::test]
async fn test_restore_retries_through_api_conflicts() {
    let (addr, api) = start_mock_api().await;
    let store = Arc::new(KubeStore::new(&store_config(addr)).unwrap());

    let probe = {
        let api = api.clone();
        ScriptedProbe::reachable_after(0).with_hook(move |_| {
            let mut ingress = api.ingress.lock().unwrap();
            ingress["spec"]["rules"][0]["http"]["paths"] = json!([]);
            MockApi::bump(&mut ingress);
            *api.pending_conflicts.lock().unwrap() = 3;
        })
    };

    let report = Orchestrator::new(
        store,
        prober(probe),
        target("http://shop.example.com/.well-known/ping"),
    )
    .with_backoff(NoBackoff)
    .run()
    .await
    .unwrap();

    assert_eq!(report.activation_attempts, 1);
    assert_eq!(report.restore_attempts, 4);
    assert_eq!(*api.patches.lock().unwrap(), 5);
    let restored = api.ingress.lock().unwrap().clone();
    assert_eq!(restored["spec"]["rules"], storefront()["spec"]["rules"]);
}
