//! An in-process stand-in for the Netlify API that records every request it receives.

use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Bytes},
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, task::JoinHandle};

/// A canned response for one of the mocked endpoints.
#[derive(Clone, Debug)]
pub(crate) struct MockResponse {
    /// The response status.
    pub(crate) status: StatusCode,

    /// The JSON response body.
    pub(crate) body: Value,
}

impl MockResponse {
    /// A `200 OK` response with the specified body.
    pub(crate) fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    /// A failed response with the specified status and body.
    pub(crate) fn error(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }
}

/// A request received by a [`MockNetlify`].
#[derive(Clone, Debug)]
pub(crate) struct RecordedRequest {
    /// The request method.
    pub(crate) method: Method,

    /// The request path.
    pub(crate) path: String,

    /// The `Authorization` header, if present.
    pub(crate) authorization: Option<String>,

    /// The `Content-Type` header, if present.
    pub(crate) content_type: Option<String>,

    /// The raw request body.
    pub(crate) body: Bytes,
}

/// The state shared by the mock's request handler.
#[derive(Clone, Debug)]
struct MockState {
    /// The response to `POST /api/v1/sites`.
    create_site: MockResponse,

    /// The response to `POST /api/v1/sites/{id}/deploys`.
    deploy: MockResponse,

    /// Every request received so far, in order.
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// A mock Netlify API listening on an ephemeral local port.
#[derive(Debug)]
pub(crate) struct MockNetlify {
    /// The mock's origin, e.g. `http://127.0.0.1:12345`.
    origin: String,

    /// Every request received so far, in order.
    requests: Arc<Mutex<Vec<RecordedRequest>>>,

    /// The server task, aborted when the mock is dropped.
    server: JoinHandle<()>,
}

impl MockNetlify {
    /// Starts a mock that answers site creation and deploy uploads with the specified responses.
    /// Site deletion always succeeds with `204 No Content`.
    pub(crate) async fn start(create_site: MockResponse, deploy: MockResponse) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));

        let state = MockState {
            create_site,
            deploy,
            requests: Arc::clone(&requests),
        };

        let router = Router::new().fallback(handle).with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("mock listener should bind");
        let address = listener
            .local_addr()
            .expect("mock listener should have an address");

        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("mock server should run");
        });

        Self {
            origin: format!("http://{address}"),
            requests,
            server,
        }
    }

    /// Starts a mock where site creation and deploy uploads both succeed, creating site `abc`.
    pub(crate) async fn succeeding() -> Self {
        Self::start(
            MockResponse::ok(json!({
                "id": "abc",
                "name": "abc",
                "url": "https://abc.netlify.app",
            })),
            MockResponse::ok(json!({ "id": "deploy-1", "state": "uploaded" })),
        )
        .await
    }

    /// Gets the mock's origin.
    pub(crate) fn origin(&self) -> &str {
        &self.origin
    }

    /// Gets every request received so far, in order.
    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .expect("request log shouldn't be poisoned")
            .clone()
    }
}

impl Drop for MockNetlify {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Records a request and answers it according to its route.
async fn handle(State(state): State<MockState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, usize::MAX)
        .await
        .expect("mock request body should be readable");

    let header = |name: HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };

    let recorded = RecordedRequest {
        method: parts.method.clone(),
        path: parts.uri.path().to_owned(),
        authorization: header(AUTHORIZATION),
        content_type: header(CONTENT_TYPE),
        body,
    };

    state
        .requests
        .lock()
        .expect("request log shouldn't be poisoned")
        .push(recorded);

    let path = parts.uri.path();
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    let response = match (&parts.method, segments.as_slice()) {
        (&Method::POST, ["api", "v1", "sites"]) => state.create_site,
        (&Method::POST, ["api", "v1", "sites", _, "deploys"]) => state.deploy,
        (&Method::DELETE, ["api", "v1", "sites", _]) => {
            return StatusCode::NO_CONTENT.into_response();
        }
        _ => MockResponse::error(
            StatusCode::NOT_FOUND,
            json!({ "code": 404, "message": "Not Found" }),
        ),
    };

    (response.status, Json(response.body)).into_response()
}
