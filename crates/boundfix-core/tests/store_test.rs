#![allow(clippy::unwrap_used)]
// Integration tests for `Store` against a wiremock boundary service.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use url::Url;
use wiremock::matchers::{body_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use boundfix_core::{CoreError, FeatureRef, Fields, Store, StoreConfig, StoreState};

const WAIT: Duration = Duration::from_secs(5);

// ── Helpers ─────────────────────────────────────────────────────────

/// Route store logs to the test harness; `RUST_LOG=boundfix_core=debug`
/// shows commits and derivations.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn setup() -> (MockServer, Store) {
    init_tracing();
    let server = MockServer::start().await;
    let config = StoreConfig::new(Url::parse(&server.uri()).unwrap())
        .with_poll_interval(Duration::from_millis(50));
    let store = Store::new(config).unwrap();
    (server, store)
}

fn status_body(missing: i64) -> Value {
    json!({
        "running": false,
        "initialized": true,
        "missing": missing,
        "export": { "running": false, "error": "" },
        "config": {
            "layers": [
                { "id": "country", "name": "Country", "admin_levels": [2] },
                { "id": "region", "name": "Region", "admin_levels": [4, 6, 8] }
            ],
            "rules": [
                { "match": { "country": 1 }, "restrict": { "region": [4, 6] } }
            ]
        }
    })
}

fn coordinate_body() -> Value {
    json!({
        "coordinate": { "id": "c1", "lat": 50.85, "lon": 4.35 },
        "suggestions": {
            "region": [
                { "id": 7, "name": "Arrondissement", "admin_level": 8 },
                { "id": 8, "name": "Province", "admin_level": 4 }
            ]
        },
        "matched": { "country": false },
        "matchnames": null,
        "matchids": null
    })
}

fn topology_body() -> Value {
    json!({
        "type": "Topology",
        "bbox": [4.2, 50.7, 4.5, 50.9],
        "objects": { "feature": { "type": "GeometryCollection", "geometries": [] } },
        "arcs": []
    })
}

async fn mount_status(server: &MockServer, missing: i64) {
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(missing)))
        .mount(server)
        .await;
}

async fn mount_topologies(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/topo/[^/]+/[0-9]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topology_body()))
        .mount(server)
        .await;
}

async fn wait_until(store: &Store, predicate: impl FnMut(&StoreState) -> bool) -> StoreState {
    let mut stream = store.subscribe();
    tokio::time::timeout(WAIT, stream.wait_for(predicate))
        .await
        .unwrap()
        .unwrap()
}

async fn loaded(store: &Store) -> StoreState {
    wait_until(store, |s| s.coordinate.is_some() && !s.loading).await
}

fn region_disabled(state: &StoreState) -> Vec<bool> {
    state
        .coordinate
        .as_ref()
        .unwrap()
        .suggestions_for("region")
        .iter()
        .map(|s| s.disabled)
        .collect()
}

// ── Rules ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_matching_rule_disables_suggestions() {
    let (server, store) = setup().await;
    mount_status(&server, 1).await;
    mount_topologies(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/coordinate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(coordinate_body()))
        .mount(&server)
        .await;

    store.poll_status().await.unwrap();
    let state = loaded(&store).await;
    assert_eq!(region_disabled(&state), vec![false, false]);

    store.select("country", 1).unwrap();
    let state = store.state();
    assert!(state.changed.contains(Fields::SELECTION | Fields::SUGGESTIONS));
    assert_eq!(region_disabled(&state), vec![true, false]);

    // A different country no longer matches the rule.
    store.select("country", 2).unwrap();
    assert_eq!(region_disabled(&store.state()), vec![false, false]);

    store.shutdown().await;
}

// ── Status ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_no_pending_work_means_no_load() {
    let (server, store) = setup().await;
    mount_status(&server, 0).await;
    Mock::given(method("GET"))
        .and(path("/api/coordinate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(coordinate_body()))
        .expect(0)
        .mount(&server)
        .await;

    store.poll_status().await.unwrap();

    let state = store.state();
    assert!(state.status.initialized);
    assert!(state.coordinate.is_none());
    assert!(!state.loading);

    store.shutdown().await;
}

#[tokio::test]
async fn test_second_config_replaces_first() {
    let (server, store) = setup().await;

    let mut first = status_body(0);
    first["config"]["layers"] = json!([
        { "id": "country", "name": "Country", "admin_levels": [2] },
        { "id": "city", "name": "City", "admin_levels": [8] }
    ]);
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_status(&server, 0).await;

    store.poll_status().await.unwrap();
    assert!(store.state().status.config.has_layer("city"));

    store.poll_status().await.unwrap();
    let state = store.state();
    let layers: Vec<&str> = state
        .status
        .config
        .layers
        .iter()
        .map(|l| l.id.as_str())
        .collect();
    assert_eq!(layers, vec!["country", "region"]);
    assert_eq!(state.status.config.rules.len(), 1);
    assert!(state.changed.contains(Fields::CONFIG));
}

#[tokio::test]
async fn test_poller_runs_until_shutdown() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(0)))
        .expect(2..)
        .mount(&server)
        .await;

    store.start();
    store.start();
    wait_until(&store, |s| s.status.initialized).await;
    tokio::time::sleep(Duration::from_millis(120)).await;
    store.shutdown().await;

    assert!(store.data_age().is_some());
}

// ── Coordinate loading ──────────────────────────────────────────────

#[tokio::test]
async fn test_failed_load_resets_loading() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/coordinate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = store.load_coordinate().await.unwrap_err();
    assert_eq!(err.status(), Some(500));

    let state = store.state();
    assert!(!state.loading);
    assert!(state.coordinate.is_none());
}

#[tokio::test]
async fn test_background_load_failure_is_reported_once() {
    let (server, store) = setup().await;
    mount_status(&server, 3).await;
    Mock::given(method("GET"))
        .and(path("/api/coordinate"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let mut failures = store.failures();
    store.poll_status().await.unwrap();

    let failure = tokio::time::timeout(WAIT, failures.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failure.operation, "load coordinate");
    assert_eq!(failure.error.status(), Some(503));
    wait_until(&store, |s| !s.loading).await;

    // An unchanged status does not retry the load.
    store.poll_status().await.unwrap();
    assert!(!store.state().loading);

    store.shutdown().await;
}

#[tokio::test]
async fn test_empty_queue_loads_nothing() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/coordinate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    let revision = store.state().revision;
    store.load_coordinate().await.unwrap();

    let state = store.state();
    assert!(state.coordinate.is_none());
    assert!(!state.loading);
    // Only the busy flag toggled.
    assert_eq!(state.revision, revision + 2);
}

#[tokio::test]
async fn test_superseded_load_is_dropped() {
    let (server, store) = setup().await;
    mount_topologies(&server).await;

    let mut old = coordinate_body();
    old["coordinate"]["id"] = json!("old");
    Mock::given(method("GET"))
        .and(path("/api/coordinate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(old)
                .set_delay(Duration::from_millis(300)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    let mut new = coordinate_body();
    new["coordinate"]["id"] = json!("new");
    Mock::given(method("GET"))
        .and(path("/api/coordinate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(new))
        .mount(&server)
        .await;

    let slow = tokio::spawn({
        let store = store.clone();
        async move { store.load_coordinate().await }
    });
    wait_until(&store, |s| s.loading).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    store.load_coordinate().await.unwrap();
    assert_eq!(
        store.state().coordinate.unwrap().coordinate.id.as_deref(),
        Some("new")
    );

    // The older response lands afterwards and must not replace the newer item.
    slow.await.unwrap().unwrap();
    let state = store.state();
    assert_eq!(state.coordinate.unwrap().coordinate.id.as_deref(), Some("new"));
    assert!(!state.loading);

    store.shutdown().await;
}

// ── Topology cache ──────────────────────────────────────────────────

#[tokio::test]
async fn test_topology_fetched_once() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/topo/region/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topology_body()))
        .expect(1)
        .mount(&server)
        .await;

    let (a, b) = tokio::join!(
        store.ensure_topology("region", 7),
        store.ensure_topology("region", 7)
    );
    a.unwrap();
    b.unwrap();
    store.ensure_topology("region", 7).await.unwrap();

    assert_eq!(store.topology_count(), 1);
    let topo = store.topology(&FeatureRef::new("region", 7)).unwrap();
    assert!(topo.bbox.unwrap().contains(50.85, 4.35));
    assert!(topo.extra.contains_key("arcs"));
}

#[tokio::test]
async fn test_failed_topology_can_be_retried() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/topo/region/7"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_topologies(&server).await;

    let err = store.ensure_topology("region", 7).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(store.topology_count(), 0);

    store.ensure_topology("region", 7).await.unwrap();
    assert_eq!(store.topology_count(), 1);
}

#[tokio::test]
async fn test_new_coordinate_resets_topology_cache() {
    let (server, store) = setup().await;
    mount_topologies(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/coordinate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(coordinate_body()))
        .mount(&server)
        .await;

    let stale = FeatureRef::new("region", 99);
    store.ensure_topology(&stale.layer, stale.id).await.unwrap();
    assert!(store.topology(&stale).is_some());

    store.load_coordinate().await.unwrap();
    assert!(store.topology(&stale).is_none());

    let fresh = [FeatureRef::new("region", 7), FeatureRef::new("region", 8)];
    let mut versions = store.subscribe_topologies();
    tokio::time::timeout(
        WAIT,
        versions.wait_for(|_| fresh.iter().all(|f| store.topology(f).is_some())),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(store.topology_count(), 2);

    store.shutdown().await;
}

// ── Selection ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_save_posts_selection_and_reloads() {
    let (server, store) = setup().await;
    mount_status(&server, 2).await;
    mount_topologies(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/coordinate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(coordinate_body()))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/add"))
        .and(body_json(json!({ "country": 5 })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    store.poll_status().await.unwrap();
    let before = loaded(&store).await;

    store.select("country", 5).unwrap();
    assert_eq!(store.selection_count(), 1);
    store.save().await.unwrap();

    let state = store.state();
    assert_eq!(state.selection_count(), 0);
    assert!(!state.loading);
    assert!(state.coordinate.is_some());
    assert!(state.coordinate_epoch() > before.coordinate_epoch());

    store.shutdown().await;
}

#[tokio::test]
async fn test_empty_save_is_noop() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/add"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    store.save().await.unwrap();
    assert!(!store.state().loading);
}

#[tokio::test]
async fn test_failed_save_keeps_selection() {
    let (server, store) = setup().await;
    mount_status(&server, 0).await;
    Mock::given(method("POST"))
        .and(path("/api/add"))
        .respond_with(ResponseTemplate::new(500).set_body_string("write failed"))
        .mount(&server)
        .await;

    store.poll_status().await.unwrap();
    store.select("region", 8).unwrap();

    let err = store.save().await.unwrap_err();
    assert!(matches!(err, CoreError::Http { status: 500, .. }));

    let state = store.state();
    assert_eq!(state.selected.get("region"), Some(8));
    assert!(!state.loading);
}

#[tokio::test]
async fn test_delete_clears_selection_and_reloads() {
    let (server, store) = setup().await;
    mount_status(&server, 2).await;
    mount_topologies(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/coordinate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(coordinate_body()))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/delete"))
        .and(body_json(json!({ "id": "c1", "lat": 50.85, "lon": 4.35 })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    store.poll_status().await.unwrap();
    loaded(&store).await;
    store.select("country", 1).unwrap();

    store.delete_current().await.unwrap();

    let state = store.state();
    assert_eq!(state.selection_count(), 0);
    assert!(!state.loading);
    assert_eq!(region_disabled(&state), vec![false, false]);

    store.shutdown().await;
}

#[tokio::test]
async fn test_delete_without_coordinate_is_noop() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/delete"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    store.delete_current().await.unwrap();
}

#[tokio::test]
async fn test_unknown_layer_is_rejected() {
    let (server, store) = setup().await;
    mount_status(&server, 0).await;
    store.poll_status().await.unwrap();

    let err = store.select("city", 3).unwrap_err();
    assert!(matches!(err, CoreError::UnknownLayer { ref layer } if layer == "city"));
    assert_eq!(store.selection_count(), 0);

    store.select("country", 3).unwrap();
    assert!(store.deselect("country"));
    assert!(!store.deselect("country"));
}

// ── Hover, export, import ───────────────────────────────────────────

#[tokio::test]
async fn test_hover_caches_topology() {
    let (server, store) = setup().await;
    mount_status(&server, 1).await;
    mount_topologies(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/coordinate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(coordinate_body()))
        .mount(&server)
        .await;

    store.poll_status().await.unwrap();
    loaded(&store).await;

    let feature = FeatureRef::new("region", 8);
    store.hover_feature(Some(feature.clone()));
    let state = store.state();
    assert_eq!(state.hovered.as_ref(), Some(&feature));
    assert!(state.changed.contains(Fields::HOVER));

    let mut versions = store.subscribe_topologies();
    tokio::time::timeout(WAIT, versions.wait_for(|_| store.topology(&feature).is_some()))
        .await
        .unwrap()
        .unwrap();

    store.hover_feature(None);
    assert_eq!(store.state().hovered, None);

    store.shutdown().await;
}

#[tokio::test]
async fn test_export_and_import_refresh_status() {
    let (server, store) = setup().await;
    mount_status(&server, 0).await;
    Mock::given(method("POST"))
        .and(path("/api/export"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/missing"))
        .and(body_json(json!([{ "lat": 1.5, "lon": 2.5 }])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    store.start_export().await.unwrap();
    assert!(store.state().status.initialized);

    let point = boundfix_core::Coordinate {
        id: None,
        lat: 1.5,
        lon: 2.5,
    };
    store.import_missing(&[point]).await.unwrap();
    store.import_missing(&[]).await.unwrap();
}
