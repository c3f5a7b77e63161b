// tests/providers_http.rs
//
// Wire-level behaviour of every HTTP upstream against a local axum stub.

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{Map, Value};

use vm_briefing::home::{EntityState, HomeAssistantClient, StateStore};
use vm_briefing::ingest::fetcher::HttpFeedFetcher;
use vm_briefing::ingest::types::FeedFetcher;
use vm_briefing::summarize::{
    CompletionProvider, GeminiProvider, OpenAiProvider, PartOfDay, PromptSummarizer,
    SummarizationContext, Summarizer,
};
use vm_briefing::weather::openweather::OpenWeatherMap;
use vm_briefing::weather::ForecastApi;

#[derive(Debug, Clone)]
struct Seen {
    method: Method,
    path: String,
    query: HashMap<String, String>,
    auth: Option<String>,
    body: String,
}

#[derive(Clone)]
struct Stub {
    seen: Arc<Mutex<Vec<Seen>>>,
    // "METHOD /path" -> (status, body)
    routes: Arc<HashMap<String, (u16, String)>>,
}

async fn answer(
    State(stub): State<Stub>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let key = format!("{} {}", method, uri.path());
    stub.seen.lock().unwrap().push(Seen {
        method,
        path: uri.path().to_string(),
        query,
        auth: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    match stub.routes.get(&key) {
        Some((status, body)) => (StatusCode::from_u16(*status).unwrap(), body.clone()),
        None => (StatusCode::NOT_FOUND, String::new()),
    }
}

async fn serve(routes: &[(&str, u16, &str)]) -> (String, Arc<Mutex<Vec<Seen>>>) {
    let stub = Stub {
        seen: Arc::new(Mutex::new(Vec::new())),
        routes: Arc::new(
            routes
                .iter()
                .map(|(k, s, b)| (k.to_string(), (*s, b.to_string())))
                .collect(),
        ),
    };
    let seen = stub.seen.clone();
    let app = Router::new().fallback(answer).with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), seen)
}

fn seen(log: &Arc<Mutex<Vec<Seen>>>) -> Vec<Seen> {
    log.lock().unwrap().clone()
}

const CHAT_OK: &str =
    r#"{"choices":[{"index":0,"message":{"role":"assistant","content":" Jó reggelt! Ma 2024-05-01 van. "}}]}"#;

#[tokio::test]
async fn openai_sends_bearer_and_chat_messages() {
    let (base, log) = serve(&[("POST /v1/chat/completions", 200, CHAT_OK)]).await;
    let p = OpenAiProvider::new(reqwest::Client::new(), "sk-test".into(), "gpt-4o-mini".into())
        .with_url(format!("{base}/v1/chat/completions"));

    let text = p.complete("rendszer", "kérés").await.unwrap();
    assert_eq!(text, "Jó reggelt! Ma 2024-05-01 van.");

    let reqs = seen(&log);
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].method, Method::POST);
    assert_eq!(reqs[0].auth.as_deref(), Some("Bearer sk-test"));
    let body: Value = serde_json::from_str(&reqs[0].body).unwrap();
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "rendszer");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "kérés");
}

#[tokio::test]
async fn openai_error_status_counts_failure_and_yields_none() {
    let (base, _log) = serve(&[(
        "POST /v1/chat/completions",
        429,
        r#"{"error":{"message":"quota exceeded"}}"#,
    )])
    .await;
    let url = format!("{base}/v1/chat/completions");

    let p = OpenAiProvider::new(reqwest::Client::new(), "sk-test".into(), "gpt-4o-mini".into())
        .with_url(url.clone());
    let err = p.complete("s", "p").await.unwrap_err();
    assert!(format!("{err:#}").contains("429"), "got: {err:#}");

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    let _guard = metrics::set_default_local_recorder(&recorder);

    let summarizer = PromptSummarizer::new(
        OpenAiProvider::new(reqwest::Client::new(), "sk-test".into(), "gpt-4o-mini".into())
            .with_url(url),
        "magyarul",
    );
    let ctx = SummarizationContext {
        current_date: "2024-05-01".into(),
        part_of_day: PartOfDay::Reggel,
    };
    assert!(summarizer.summarize(&[], &ctx).await.is_none());

    let text = handle.render();
    assert!(
        text.contains(r#"summarizer_failures_total{provider="openai"} 1"#),
        "got:\n{text}"
    );
}

#[tokio::test]
async fn gemini_posts_generate_content_with_key() {
    let (base, log) = serve(&[(
        "POST /v1beta/models/gemini-1.5-flash:generateContent",
        200,
        r#"{"candidates":[{"content":{"parts":[{"text":"Jó estét!"}]}}]}"#,
    )])
    .await;
    let p = GeminiProvider::new(
        reqwest::Client::new(),
        "g-key".into(),
        "models/gemini-1.5-flash".into(),
    )
    .with_base_url(format!("{base}/v1beta/"));

    assert_eq!(p.complete("rendszer", "kérés").await.unwrap(), "Jó estét!");

    let reqs = seen(&log);
    assert_eq!(reqs.len(), 1, "no model listing after success");
    assert_eq!(reqs[0].query.get("key").map(String::as_str), Some("g-key"));
    assert!(reqs[0].auth.is_none());
    let body: Value = serde_json::from_str(&reqs[0].body).unwrap();
    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "rendszer");
    assert_eq!(body["contents"][0]["role"], "user");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "kérés");
}

#[tokio::test]
async fn gemini_failure_lists_available_models() {
    let (base, log) = serve(&[
        (
            "POST /v1beta/models/gemini-1.5-flash:generateContent",
            404,
            r#"{"error":{"message":"model not found"}}"#,
        ),
        (
            "GET /v1beta/models",
            200,
            r#"{"models":[{"name":"models/gemini-1.5-pro","supportedGenerationMethods":["generateContent"]}]}"#,
        ),
    ])
    .await;
    let p = GeminiProvider::new(reqwest::Client::new(), "g-key".into(), "gemini-1.5-flash".into())
        .with_base_url(format!("{base}/v1beta"));

    assert!(p.complete("s", "p").await.is_err());

    let reqs = seen(&log);
    assert_eq!(reqs.len(), 2);
    assert_eq!(reqs[1].method, Method::GET);
    assert_eq!(reqs[1].path, "/v1beta/models");
    assert_eq!(reqs[1].query.get("key").map(String::as_str), Some("g-key"));
}

#[tokio::test]
async fn openweather_sends_metric_hungarian_query() {
    let (base, log) = serve(&[(
        "GET /data/2.5/forecast",
        200,
        r#"{"cod":"200","list":[
            {"dt":1714550400,"main":{"temp":14.2},"weather":[{"description":"tiszta égbolt"}]},
            {"dt":1714561200,"main":{"temp":17.9},"weather":[{"description":"szeles"}]}]}"#,
    )])
    .await;
    let owm = OpenWeatherMap::new(reqwest::Client::new())
        .with_url(format!("{base}/data/2.5/forecast"));

    let entries = owm.forecast("owm-key", 47.5, 19.04).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].description, "szeles");

    let q = &seen(&log)[0].query;
    assert_eq!(q.get("lat").map(String::as_str), Some("47.5"));
    assert_eq!(q.get("lon").map(String::as_str), Some("19.04"));
    assert_eq!(q.get("appid").map(String::as_str), Some("owm-key"));
    assert_eq!(q.get("units").map(String::as_str), Some("metric"));
    assert_eq!(q.get("lang").map(String::as_str), Some("hu"));
}

#[tokio::test]
async fn openweather_error_status_is_an_error() {
    let (base, _log) = serve(&[("GET /data/2.5/forecast", 401, r#"{"cod":401}"#)]).await;
    let owm = OpenWeatherMap::new(reqwest::Client::new())
        .with_url(format!("{base}/data/2.5/forecast"));
    assert!(owm.forecast("bad", 47.5, 19.04).await.is_err());
}

#[tokio::test]
async fn home_assistant_reads_and_upserts_with_bearer() {
    let (base, log) = serve(&[
        (
            "GET /api/states/sensor.nappali",
            200,
            r#"{"entity_id":"sensor.nappali","state":"21.5","attributes":{"unit_of_measurement":"°C"}}"#,
        ),
        ("POST /api/states/sensor.vm_briefing", 201, "{}"),
    ])
    .await;
    let ha = HomeAssistantClient::new(reqwest::Client::new(), format!("{base}/api/"), Some("tok".into()));

    let st = ha.get_state("sensor.nappali").await.unwrap().unwrap();
    assert_eq!(st.state, "21.5");
    assert_eq!(ha.get_state("sensor.nincs").await.unwrap(), None);

    let mut attributes = Map::new();
    attributes.insert("friendly_name".into(), Value::from("VM Briefing"));
    let out = EntityState {
        state: "OK".into(),
        attributes,
    };
    ha.set_state("sensor.vm_briefing", &out).await.unwrap();

    let reqs = seen(&log);
    assert_eq!(reqs.len(), 3);
    assert!(reqs.iter().all(|r| r.auth.as_deref() == Some("Bearer tok")));
    let posted: EntityState = serde_json::from_str(&reqs[2].body).unwrap();
    assert_eq!(posted, out);
}

#[tokio::test]
async fn home_assistant_server_error_is_an_error() {
    let (base, _log) = serve(&[("POST /api/states/sensor.vm_briefing", 500, "boom")]).await;
    let ha = HomeAssistantClient::new(reqwest::Client::new(), format!("{base}/api"), Some("tok".into()));
    let out = EntityState {
        state: "OK".into(),
        attributes: Map::new(),
    };
    assert!(ha.set_state("sensor.vm_briefing", &out).await.is_err());
}

#[tokio::test]
async fn feed_fetcher_parses_served_body_and_rejects_error_status() {
    let xml = common::fixture("rss_sample.xml");
    let (base, _log) = serve(&[("GET /rss", 200, xml.as_str()), ("GET /down", 503, "")]).await;
    let fetcher = HttpFeedFetcher::new(reqwest::Client::new());

    let doc = fetcher.fetch(&format!("{base}/rss")).await.unwrap();
    assert_eq!(doc.title.as_deref(), Some("Telex & Friends"));
    assert_eq!(doc.entries.len(), 4);

    assert!(fetcher.fetch(&format!("{base}/down")).await.is_err());
}
