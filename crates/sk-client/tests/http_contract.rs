use axum::body::Body;
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use sk_client::{ApiClient, ClientConfig, HttpError, API_KEY_HEADER};
use sk_core::{
    reduce_results, CreateJobRequest, Decision, ExportFormat, JobStatus, SnippetEntry, SnippetKey,
    WebhookRequest,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const KEY: &str = "test-key";

#[derive(Clone, Default)]
struct Seen {
    requests: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl Seen {
    fn record(&self, route: &str, headers: &HeaderMap) {
        let key = headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.requests
            .lock()
            .expect("lock")
            .push((route.to_string(), key));
    }

    fn key_for(&self, route: &str) -> Option<Option<String>> {
        self.requests
            .lock()
            .expect("lock")
            .iter()
            .find(|(seen, _)| seen == route)
            .map(|(_, key)| key.clone())
    }
}

fn router(seen: Seen) -> Router {
    let create = {
        let seen = seen.clone();
        move |headers: HeaderMap, Json(body): Json<Value>| {
            let seen = seen.clone();
            async move {
                seen.record("create", &headers);
                if headers.get(API_KEY_HEADER).is_none() {
                    return (StatusCode::UNAUTHORIZED, "missing api key").into_response();
                }
                assert_eq!(body["target_path"], "/workspace/demo");
                assert_eq!(body["ruleset"], "rulesets/owasp-llm-top10.yml");
                assert_eq!(body["ai_review"], true);
                Json(json!({"job_id": "abc123"})).into_response()
            }
        }
    };
    let list = {
        let seen = seen.clone();
        move |headers: HeaderMap, Query(query): Query<HashMap<String, String>>| {
            let seen = seen.clone();
            async move {
                seen.record("list", &headers);
                let limit = query.get("limit").cloned().unwrap_or_default();
                Json(json!([
                    {"id": "abc123", "status": "running", "decision": null,
                     "created_at": "2026-03-01 11:59:18+00:00", "ruleset": limit}
                ]))
            }
        }
    };
    let results = {
        let seen = seen.clone();
        move |headers: HeaderMap, Path(id): Path<String>| {
            let seen = seen.clone();
            async move {
                seen.record("results", &headers);
                if id != "abc123" {
                    return (StatusCode::NOT_FOUND, "job not found").into_response();
                }
                Json(json!({
                    "job": {"id": "abc123", "status": "queued", "decision": null},
                    "findings": [],
                    "model_calls": []
                }))
                .into_response()
            }
        }
    };
    let unsuppress = {
        let seen = seen.clone();
        move |headers: HeaderMap, Path(fingerprint): Path<String>| {
            let seen = seen.clone();
            async move {
                seen.record("unsuppress", &headers);
                Json(json!({"fingerprint": fingerprint, "status": "unsuppressed"}))
            }
        }
    };
    let add_webhook = {
        let seen = seen.clone();
        move |headers: HeaderMap, Json(body): Json<Value>| {
            let seen = seen.clone();
            async move {
                seen.record("add_webhook", &headers);
                Json(json!({"id": 7, "url": body["url"], "events": body["events"]}))
            }
        }
    };
    let list_webhooks = {
        let seen = seen.clone();
        move |headers: HeaderMap| {
            let seen = seen.clone();
            async move {
                seen.record("list_webhooks", &headers);
                Json(json!([
                    {"id": 7, "url": "https://hooks.example.com/sk", "events": ["policy.block"],
                     "active": true, "created_at": "2026-03-01 11:59:18"}
                ]))
            }
        }
    };
    let remove_webhook = {
        let seen = seen.clone();
        move |headers: HeaderMap, Path(id): Path<u64>| {
            let seen = seen.clone();
            async move {
                seen.record("remove_webhook", &headers);
                if id != 7 {
                    return (StatusCode::NOT_FOUND, "webhook not found").into_response();
                }
                Json(json!({"status": "deleted"})).into_response()
            }
        }
    };

    Router::new()
        .route("/jobs", post(create).get(list))
        .route(
            "/jobs/:id",
            get(|Path(id): Path<String>| async move {
                Json(json!({"id": id, "status": "judging", "decision": "block",
                            "target_path": "/workspace/demo"}))
            }),
        )
        .route("/health", get(|| async { Json(json!({"status": "ok"})) }))
        .route("/webhooks", post(add_webhook).get(list_webhooks))
        .route("/webhooks/:id", axum::routing::delete(remove_webhook))
        .route("/jobs/:id/results", get(results))
        .route(
            "/jobs/:id/export",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                let format = query.get("format").cloned().unwrap_or_default();
                Json(json!({"content_type": "text/csv", "data": format!("format={format}")}))
            }),
        )
        .route(
            "/jobs/findings/:fingerprint/suppress",
            axum::routing::delete(unsuppress),
        )
        .route(
            "/stats",
            get(|| async {
                Json(json!({
                    "total_jobs": 12,
                    "total_findings": 40,
                    "total_model_calls": 9,
                    "total_estimated_cost_usd": 1.23449,
                    "by_severity": {"critical": 2, "high": 5},
                    "by_decision": {"block": 3, "allow": 7},
                    "top_rules": [{"rule_id": "sk-001", "count": 4}]
                }))
            }),
        )
        .route(
            "/snippets/:language/:name",
            get(|Path((language, name)): Path<(String, String)>| async move {
                Json(json!({
                    "meta": {"title": format!("{language}:{name}"), "description": "d"},
                    "content": "print('ok')"
                }))
            }),
        )
        .route(
            "/broken",
            get(|| async { Response::new(Body::from("not json")) }),
        )
}

async fn spawn_server(seen: Seen) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = router(seen);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn client(base: &str, auth_reads: bool) -> ApiClient {
    let config = ClientConfig::new(base, KEY)
        .expect("config")
        .with_auth_reads(auth_reads);
    ApiClient::new(config).expect("client")
}

#[tokio::test]
async fn create_then_poll_queued_job() {
    let seen = Seen::default();
    let base = spawn_server(seen.clone()).await;
    let api = client(&base, false);

    let created = api
        .create_job(&CreateJobRequest::for_target("/workspace/demo"))
        .await
        .expect("create");
    assert_eq!(created.job_id, "abc123");

    let view = reduce_results(api.job_results(&created.job_id).await.expect("results"));
    assert_eq!(view.status(), Some(&JobStatus::Queued));
    assert!(view.findings.is_empty());
    assert!(view.model_calls.is_empty());
    assert_eq!(
        view.header.as_ref().map(|job| job.decision_label()),
        Some("pending")
    );
}

#[tokio::test]
async fn key_is_sent_on_writes_but_not_on_reads() {
    let seen = Seen::default();
    let base = spawn_server(seen.clone()).await;
    let api = client(&base, false);

    api.create_job(&CreateJobRequest::for_target("/workspace/demo"))
        .await
        .expect("create");
    api.job_results("abc123").await.expect("results");
    api.unsuppress("fp-1").await.expect("unsuppress");

    assert_eq!(seen.key_for("create"), Some(Some(KEY.to_string())));
    assert_eq!(seen.key_for("unsuppress"), Some(Some(KEY.to_string())));
    assert_eq!(seen.key_for("results"), Some(None));
}

#[tokio::test]
async fn auth_reads_attaches_key_to_gets() {
    let seen = Seen::default();
    let base = spawn_server(seen.clone()).await;
    let api = client(&base, true);

    let jobs = api.list_jobs(Some(20)).await.expect("list");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Running);
    assert_eq!(jobs[0].ruleset.as_deref(), Some("20"));
    assert_eq!(seen.key_for("list"), Some(Some(KEY.to_string())));
}

#[tokio::test]
async fn non_success_status_surfaces_body_text() {
    let base = spawn_server(Seen::default()).await;
    let api = client(&base, false);

    let err = api.job_results("missing").await.expect_err("404");
    assert_eq!(err.http_status(), Some(404));
    assert_eq!(err.to_string(), "job not found");
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
    let base = spawn_server(Seen::default()).await;
    let api = client(&base, false);

    let err = api
        .get_json::<Value>(&["broken"], &[])
        .await
        .expect_err("not json");
    assert!(matches!(err, HttpError::Decode(_)));
}

#[tokio::test]
async fn stats_and_export_decode() {
    let base = spawn_server(Seen::default()).await;
    let api = client(&base, false);

    let stats = api.stats().await.expect("stats");
    assert_eq!(stats.total_jobs, 12);
    assert_eq!(stats.by_severity.get("high"), Some(&5));
    assert_eq!(sk_core::format_cost_usd(stats.total_estimated_cost_usd), "$1.2345");
    assert_eq!(stats.top_rules[0].rule_id, "sk-001");

    let export = api.export("abc123", ExportFormat::Md).await.expect("export");
    assert_eq!(export.render(), "format=md");
}

#[tokio::test]
async fn snippet_detail_uses_language_and_path_name() {
    let base = spawn_server(Seen::default()).await;
    let api = client(&base, false);

    let entry = SnippetEntry {
        language: "python".to_string(),
        path: "python/structured-output".to_string(),
        ..SnippetEntry::default()
    };
    let key = SnippetKey::from_entry(&entry).expect("key");
    let detail = api.snippet(&key).await.expect("detail");
    assert_eq!(detail.meta.title, "python:structured-output");
    assert_eq!(detail.content, "print('ok')");
}

#[tokio::test]
async fn transport_failure_is_reported() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let api = client(&format!("http://{addr}"), false);
    let err = api.stats().await.expect_err("refused");
    assert!(matches!(err, HttpError::Transport(_)));
}

#[tokio::test]
async fn job_header_decodes_without_results() {
    let base = spawn_server(Seen::default()).await;
    let api = client(&base, false);

    let job = api.job("abc123").await.expect("job");
    assert_eq!(job.status, JobStatus::Judging);
    assert_eq!(job.decision_kind(), Some(Decision::Block));
}

#[tokio::test]
async fn webhook_administration_always_carries_key() {
    let seen = Seen::default();
    let base = spawn_server(seen.clone()).await;
    let api = client(&base, false);

    assert_eq!(api.health().await.expect("health").status, "ok");

    let created = api
        .create_webhook(&WebhookRequest::new(
            "https://hooks.example.com/sk",
            vec!["policy.block".to_string()],
            "s3cret",
        ))
        .await
        .expect("create");
    assert_eq!(created.id, 7);
    assert_eq!(created.events, vec!["policy.block".to_string()]);

    let hooks = api.webhooks().await.expect("list");
    assert_eq!(hooks.len(), 1);
    assert_eq!(hooks[0].state_label(), "active");

    assert_eq!(api.delete_webhook(7).await.expect("delete").status, "deleted");
    let err = api.delete_webhook(9).await.expect_err("unknown id");
    assert_eq!(err.to_string(), "webhook not found");

    assert_eq!(seen.key_for("add_webhook"), Some(Some(KEY.to_string())));
    assert_eq!(seen.key_for("list_webhooks"), Some(Some(KEY.to_string())));
    assert_eq!(seen.key_for("remove_webhook"), Some(Some(KEY.to_string())));
}
