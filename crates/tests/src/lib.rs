//! # Integration Tests
//!
//! End-to-end tests against fake render servers.
//!
//! Covers:
//! - Routing, grouping and partial failure over real HTTP
//! - Deadlines, undecodable bodies and dropped ids
//! - The inbound `/batch` endpoint

#[cfg(test)]
mod fake {
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;
    use axum::{Json, Router};
    use contracts::{BatchRequest, BatchResponse, JobId, ViewJobResult};
    use tokio::net::TcpListener;

    /// How a fake render server answers
    #[derive(Debug, Clone, Default)]
    pub enum Mode {
        #[default]
        Render,
        Delay(Duration),
        Drop(Vec<JobId>),
        Garbage,
        Status(StatusCode),
    }

    struct Inner {
        mode: Mode,
        requests: AtomicUsize,
        received: Mutex<Vec<Vec<JobId>>>,
    }

    /// A render server on `127.0.0.1:0` that records what it was sent
    pub struct FakeRenderServer {
        pub url: String,
        inner: Arc<Inner>,
    }

    impl FakeRenderServer {
        pub async fn start(mode: Mode) -> Self {
            let inner = Arc::new(Inner {
                mode,
                requests: AtomicUsize::new(0),
                received: Mutex::new(Vec::new()),
            });
            let app = Router::new()
                .route("/batch", post(handle))
                .with_state(Arc::clone(&inner));

            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.ok();
            });

            Self {
                url: format!("http://{addr}/batch"),
                inner,
            }
        }

        pub fn requests(&self) -> usize {
            self.inner.requests.load(Ordering::SeqCst)
        }

        /// Job ids of each request, sorted
        pub fn received(&self) -> Vec<Vec<JobId>> {
            self.inner.received.lock().unwrap().clone()
        }
    }

    async fn handle(State(inner): State<Arc<Inner>>, Json(batch): Json<BatchRequest>) -> Response {
        inner.requests.fetch_add(1, Ordering::SeqCst);
        let mut ids: Vec<JobId> = batch.keys().cloned().collect();
        ids.sort();
        inner.received.lock().unwrap().push(ids);

        let dropped = match &inner.mode {
            Mode::Delay(delay) => {
                tokio::time::sleep(*delay).await;
                Vec::new()
            }
            Mode::Drop(ids) => ids.clone(),
            Mode::Garbage => return "<html>oops</html>".into_response(),
            Mode::Status(status) => return (*status, "render server error").into_response(),
            Mode::Render => Vec::new(),
        };

        let results = batch
            .into_iter()
            .filter(|(id, _)| !dropped.contains(id))
            .map(|(id, job)| {
                let html = format!("<section>{}</section>", job.name);
                (id, ViewJobResult::rendered(job.name, html, 2.5))
            })
            .collect();

        Json(BatchResponse { results }).into_response()
    }

    /// Address that refuses connections
    pub async fn unreachable_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/batch")
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use contracts::{BatchRequest, Registry, ViewErrorKind, ViewJob};
    use multiplexer::{HttpDestination, Multiplexer, MultiplexerBuilder};
    use serde_json::json;

    use crate::fake::{unreachable_url, FakeRenderServer, Mode};

    fn mux(registry: Registry, timeout: Option<Duration>) -> Multiplexer<HttpDestination> {
        MultiplexerBuilder::new(Arc::new(registry))
            .request_timeout(timeout)
            .build_http()
            .unwrap()
    }

    fn batch(jobs: &[(&str, &str)]) -> BatchRequest {
        jobs.iter()
            .map(|(id, view)| (id.to_string(), ViewJob::new(*view, json!({ "id": id }))))
            .collect()
    }

    /// Two views on one server, one combined request
    #[tokio::test]
    async fn test_same_server_single_request() {
        let s1 = FakeRenderServer::start(Mode::Render).await;
        let mux = mux(
            Registry::from_pairs([("Foo", s1.url.as_str()), ("Bar", s1.url.as_str())]),
            None,
        );

        let response = mux.render(batch(&[("a", "Foo"), ("b", "Bar")])).await;

        assert_eq!(response.len(), 2);
        assert!(response.get("a").unwrap().success);
        assert_eq!(response.get("a").unwrap().html, "<section>Foo</section>");
        assert!(response.get("b").unwrap().success);
        assert_eq!(s1.requests(), 1);
        assert_eq!(s1.received(), vec![vec!["a".to_string(), "b".to_string()]]);
    }

    #[tokio::test]
    async fn test_unknown_view_makes_no_call() {
        let s1 = FakeRenderServer::start(Mode::Render).await;
        let mux = mux(Registry::from_pairs([("Foo", s1.url.as_str())]), None);

        let response = mux.render(batch(&[("a", "Unknown")])).await;

        let result = response.get("a").unwrap();
        assert!(!result.success);
        assert_eq!(result.error_kind(), Some(ViewErrorKind::ReferenceError));
        assert_eq!(result.error.message, "Component \"Unknown\" not registered in cluster");
        assert_eq!(s1.requests(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_server_isolated() {
        let s1 = FakeRenderServer::start(Mode::Render).await;
        let s2 = unreachable_url().await;
        let mux = mux(
            Registry::from_pairs([("Foo", s1.url.as_str()), ("Baz", s2.as_str())]),
            None,
        );

        let response = mux.render(batch(&[("a", "Foo"), ("b", "Baz")])).await;

        assert!(response.get("a").unwrap().success);
        let b = response.get("b").unwrap();
        assert!(!b.success);
        assert_eq!(b.error_kind(), Some(ViewErrorKind::ConnectionRefused));
        assert_eq!(b.name, "Baz");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let s1 = FakeRenderServer::start(Mode::Render).await;
        let mux = mux(Registry::from_pairs([("Foo", s1.url.as_str())]), None);

        let response = mux.render(BatchRequest::new()).await;

        assert!(response.is_empty());
        assert_eq!(serde_json::to_value(&response).unwrap(), json!({ "results": {} }));
        assert_eq!(s1.requests(), 0);
    }

    #[tokio::test]
    async fn test_destinations_run_concurrently() {
        let slow = Mode::Delay(Duration::from_millis(300));
        let s1 = FakeRenderServer::start(slow.clone()).await;
        let s2 = FakeRenderServer::start(slow.clone()).await;
        let s3 = FakeRenderServer::start(slow).await;
        let mux = mux(
            Registry::from_pairs([
                ("A", s1.url.as_str()),
                ("B", s2.url.as_str()),
                ("C", s3.url.as_str()),
            ]),
            None,
        );

        let started = Instant::now();
        let response = mux.render(batch(&[("a", "A"), ("b", "B"), ("c", "C")])).await;

        assert_eq!(response.success_count(), 3);
        assert!(started.elapsed() < Duration::from_millis(850));
    }

    #[tokio::test]
    async fn test_deadline_fails_only_slow_server() {
        let fast = FakeRenderServer::start(Mode::Render).await;
        let slow = FakeRenderServer::start(Mode::Delay(Duration::from_secs(5))).await;
        let mux = mux(
            Registry::from_pairs([("Fast", fast.url.as_str()), ("Slow", slow.url.as_str())]),
            Some(Duration::from_millis(200)),
        );

        let started = Instant::now();
        let response = mux.render(batch(&[("a", "Fast"), ("b", "Slow")])).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(response.get("a").unwrap().success);
        assert_eq!(
            response.get("b").unwrap().error_kind(),
            Some(ViewErrorKind::ConnectionRefused)
        );
    }

    #[tokio::test]
    async fn test_undecodable_response() {
        let good = FakeRenderServer::start(Mode::Render).await;
        let bad = FakeRenderServer::start(Mode::Garbage).await;
        let mux = mux(
            Registry::from_pairs([("Foo", good.url.as_str()), ("Baz", bad.url.as_str())]),
            None,
        );

        let response = mux
            .render(batch(&[("a", "Foo"), ("b", "Baz"), ("c", "Baz")]))
            .await;

        assert!(response.get("a").unwrap().success);
        for id in ["b", "c"] {
            assert_eq!(
                response.get(id).unwrap().error_kind(),
                Some(ViewErrorKind::DecodeError)
            );
        }
        assert_eq!(bad.requests(), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_connection_refused() {
        let bad = FakeRenderServer::start(Mode::Status(axum::http::StatusCode::BAD_GATEWAY)).await;
        let mux = mux(Registry::from_pairs([("Foo", bad.url.as_str())]), None);

        let response = mux.render(batch(&[("a", "Foo")])).await;

        assert_eq!(
            response.get("a").unwrap().error_kind(),
            Some(ViewErrorKind::ConnectionRefused)
        );
    }

    #[tokio::test]
    async fn test_dropped_id_is_reconciled() {
        let s1 = FakeRenderServer::start(Mode::Drop(vec!["b".to_string()])).await;
        let mux = mux(
            Registry::from_pairs([("Foo", s1.url.as_str()), ("Bar", s1.url.as_str())]),
            None,
        );

        let response = mux.render(batch(&[("a", "Foo"), ("b", "Bar")])).await;

        assert_eq!(response.len(), 2);
        assert!(response.get("a").unwrap().success);
        let b = response.get("b").unwrap();
        assert_eq!(b.error_kind(), Some(ViewErrorKind::MissingResult));
        assert_eq!(b.name, "Bar");
        assert_eq!(mux.metrics().snapshot().missing_results, 1);
    }

    #[tokio::test]
    async fn test_every_id_answered_exactly_once() {
        let s1 = FakeRenderServer::start(Mode::Render).await;
        let s2 = FakeRenderServer::start(Mode::Drop(vec!["j6".to_string()])).await;
        let s3 = FakeRenderServer::start(Mode::Garbage).await;
        let down = unreachable_url().await;
        let mux = mux(
            Registry::from_pairs([
                ("A", s1.url.as_str()),
                ("B", s2.url.as_str()),
                ("C", s3.url.as_str()),
                ("D", down.as_str()),
            ]),
            None,
        );

        let views = ["A", "B", "C", "D", "Missing"];
        let input: BatchRequest = (0..25)
            .map(|i| (format!("j{i}"), ViewJob::new(views[i % views.len()], json!(i))))
            .collect();
        let ids: Vec<String> = input.keys().cloned().collect();

        let response = mux.render(input).await;

        assert_eq!(response.len(), ids.len());
        for id in &ids {
            assert!(response.get(id).is_some(), "no result for {id}");
        }
        assert_eq!(s1.requests(), 1);
        assert_eq!(s2.requests(), 1);
        assert_eq!(s3.requests(), 1);
        assert_eq!(response.success_count(), 5 + 4);
    }
}

#[cfg(test)]
mod endpoint_tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use contracts::{BatchResponse, Registry, ViewErrorKind};
    use multiplexer::MultiplexerBuilder;
    use server::AppState;
    use tokio::net::TcpListener;

    use crate::fake::{unreachable_url, FakeRenderServer, Mode};

    async fn spawn_cluster(registry: Registry) -> SocketAddr {
        let mux = MultiplexerBuilder::new(Arc::new(registry))
            .build_http()
            .unwrap();
        let state = Arc::new(AppState::new(mux));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server::serve(listener, state, std::future::pending()));
        addr
    }

    #[tokio::test]
    async fn test_batch_over_http() {
        let s1 = FakeRenderServer::start(Mode::Render).await;
        let down = unreachable_url().await;
        let addr = spawn_cluster(Registry::from_pairs([
            ("Foo", s1.url.as_str()),
            ("Bar", s1.url.as_str()),
            ("Baz", down.as_str()),
        ]))
        .await;

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/batch"))
            .header("Origin", "http://app.example")
            .json(&serde_json::json!({
                "a": { "name": "Foo", "data": {} },
                "b": { "name": "Bar", "data": { "n": 1 } },
                "c": { "name": "Baz" },
                "d": { "name": "Unknown", "data": null }
            }))
            .send()
            .await
            .unwrap();

        assert!(response.status().is_success());
        assert_eq!(response.headers()["access-control-allow-origin"], "*");

        let body: BatchResponse = response.json().await.unwrap();
        assert_eq!(body.len(), 4);
        assert!(body.get("a").unwrap().success);
        assert!(body.get("b").unwrap().success);
        assert_eq!(
            body.get("c").unwrap().error_kind(),
            Some(ViewErrorKind::ConnectionRefused)
        );
        assert_eq!(
            body.get("d").unwrap().error_kind(),
            Some(ViewErrorKind::ReferenceError)
        );
        assert_eq!(s1.requests(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let s1 = FakeRenderServer::start(Mode::Render).await;
        let addr = spawn_cluster(Registry::from_pairs([("Foo", s1.url.as_str())])).await;

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/batch"))
            .body(r#"{"a": "#)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
        assert_eq!(s1.requests(), 0);
    }

    #[tokio::test]
    async fn test_registry_file_to_endpoint() {
        let s1 = FakeRenderServer::start(Mode::Render).await;
        let toml = format!("[Foo]\nServer = \"{}\"\n", s1.url);
        let registry =
            config_loader::RegistryLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        let addr = spawn_cluster(registry).await;

        let body: BatchResponse = reqwest::Client::new()
            .post(format!("http://{addr}/batch"))
            .body(r#"{"x": {"name": "Foo", "data": {}}}"#)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert!(body.get("x").unwrap().success);
    }
}
