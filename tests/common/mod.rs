//! Local mock of the GitHub and Hugging Face listing endpoints.
//!
//! GitHub routes live under `/gh`, Hub routes under `/hf`. Each listing can
//! be forced to answer with an error status, and every request is counted.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

pub const USER: &str = "octocat";

#[derive(Default)]
pub struct MockHub {
    listings: Mutex<HashMap<&'static str, Vec<Value>>>,
    failures: Mutex<HashMap<&'static str, u16>>,
    hits: Mutex<HashMap<&'static str, usize>>,
    ignore_page: Mutex<bool>,
}

impl MockHub {
    pub fn set(&self, listing: &'static str, items: Vec<Value>) {
        self.listings.lock().unwrap().insert(listing, items);
    }

    /// Answer every request to `listing` with `status`.
    pub fn fail(&self, listing: &'static str, status: u16) {
        self.failures.lock().unwrap().insert(listing, status);
    }

    pub fn recover(&self, listing: &'static str) {
        self.failures.lock().unwrap().remove(listing);
    }

    /// Serve the first page whatever `page` is requested.
    pub fn ignore_page(&self) {
        *self.ignore_page.lock().unwrap() = true;
    }

    pub fn hits(&self, listing: &'static str) -> usize {
        self.hits.lock().unwrap().get(listing).copied().unwrap_or(0)
    }

    /// Count the request and answer with the injected failure, if any.
    fn intercept(&self, listing: &'static str) -> Option<Response> {
        *self.hits.lock().unwrap().entry(listing).or_default() += 1;

        let failures = self.failures.lock().unwrap();
        let status = StatusCode::from_u16(*failures.get(listing)?).unwrap();
        Some((status, Json(json!({ "message": "mock failure" }))).into_response())
    }

    fn respond(&self, listing: &'static str, page: Option<(usize, usize)>) -> Response {
        if let Some(failure) = self.intercept(listing) {
            return failure;
        }

        let items = self
            .listings
            .lock()
            .unwrap()
            .get(listing)
            .cloned()
            .unwrap_or_default();
        let items: Vec<Value> = match page {
            Some((per_page, page)) => {
                let page = if *self.ignore_page.lock().unwrap() { 1 } else { page };
                items
                    .into_iter()
                    .skip(per_page * (page.saturating_sub(1)))
                    .take(per_page)
                    .collect()
            }
            None => items,
        };
        Json(Value::Array(items)).into_response()
    }
}

pub struct MockServer {
    pub addr: SocketAddr,
    pub hub: Arc<MockHub>,
}

impl MockServer {
    pub fn github_url(&self) -> String {
        format!("http://{}/gh", self.addr)
    }

    pub fn hub_api_url(&self) -> String {
        format!("http://{}/hf/api", self.addr)
    }
}

type Params = Query<HashMap<String, String>>;

fn paging(params: &HashMap<String, String>) -> (usize, usize) {
    let per_page = params
        .get("per_page")
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);
    let page = params.get("page").and_then(|v| v.parse().ok()).unwrap_or(1);
    (per_page, page)
}

async fn gh_user() -> Json<Value> {
    Json(json!({ "login": USER }))
}

async fn gh_rate_limit(State(hub): State<Arc<MockHub>>) -> Response {
    if let Some(failure) = hub.intercept("rate_limit") {
        return failure;
    }
    Json(json!({
        "resources": { "core": { "limit": 60, "remaining": 42, "reset": 1700000000 } },
        "rate": { "limit": 60, "remaining": 42, "reset": 1700000000 }
    }))
    .into_response()
}

async fn gh_repos(
    State(hub): State<Arc<MockHub>>,
    Path(user): Path<String>,
    Query(params): Params,
) -> Response {
    if user != USER {
        return StatusCode::NOT_FOUND.into_response();
    }
    hub.respond("repos", Some(paging(&params)))
}

async fn gh_gists(
    State(hub): State<Arc<MockHub>>,
    Path(user): Path<String>,
    Query(params): Params,
) -> Response {
    if user != USER {
        return StatusCode::NOT_FOUND.into_response();
    }
    hub.respond("gists", Some(paging(&params)))
}

fn hub_listing(hub: &MockHub, listing: &'static str, params: &HashMap<String, String>) -> Response {
    if params.get("author").map(String::as_str) != Some(USER) {
        return Json(json!([])).into_response();
    }
    hub.respond(listing, None)
}

async fn hf_models(State(hub): State<Arc<MockHub>>, Query(params): Params) -> Response {
    hub_listing(&hub, "models", &params)
}

async fn hf_datasets(State(hub): State<Arc<MockHub>>, Query(params): Params) -> Response {
    hub_listing(&hub, "datasets", &params)
}

async fn hf_spaces(State(hub): State<Arc<MockHub>>, Query(params): Params) -> Response {
    hub_listing(&hub, "spaces", &params)
}

/// Start the mock on an ephemeral port of the current runtime.
pub async fn start() -> MockServer {
    let hub = Arc::new(MockHub::default());
    let app = Router::new()
        .route("/gh/user", get(gh_user))
        .route("/gh/rate_limit", get(gh_rate_limit))
        .route("/gh/users/{user}/repos", get(gh_repos))
        .route("/gh/users/{user}/gists", get(gh_gists))
        .route("/hf/api/models", get(hf_models))
        .route("/hf/api/datasets", get(hf_datasets))
        .route("/hf/api/spaces", get(hf_spaces))
        .with_state(hub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockServer { addr, hub }
}

pub fn repo(name: &str, created: &str) -> Value {
    json!({
        "name": name,
        "full_name": format!("{}/{}", USER, name),
        "description": format!("{} description", name),
        "html_url": format!("https://github.com/{}/{}", USER, name),
        "created_at": created,
        "updated_at": created,
        "language": "Rust",
        "topics": [],
        "private": false,
        "stargazers_count": 1,
        "forks_count": 0
    })
}

pub fn gist(id: &str, created: &str) -> Value {
    json!({
        "id": id,
        "description": null,
        "html_url": format!("https://gist.github.com/{}", id),
        "created_at": created,
        "updated_at": created,
        "public": true,
        "files": { "notes.md": { "language": "Markdown" } }
    })
}

pub fn hub_item(name: &str, created: &str) -> Value {
    json!({
        "id": format!("{}/{}", USER, name),
        "private": false,
        "createdAt": created,
        "lastModified": created,
        "tags": ["test"],
        "likes": 2,
        "downloads": 10
    })
}

/// `[http]` section with instant retries.
pub fn fast_http() -> &'static str {
    "[http]\ntimeout_secs = 5\nmax_retries = 2\nretry_base_ms = 1\n"
}
