//! Local HTTP stub for exercising the HTTP clients in tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::IntoResponse;
use tokio::task::JoinHandle;

/// One request as the stub saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: String,
}

impl Recorded {
    /// First decoded value of query parameter `name`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

type Responder = dyn Fn(&Recorded) -> (u16, String) + Send + Sync;

struct Stub {
    requests: Mutex<Vec<Recorded>>,
    respond: Box<Responder>,
}

/// Answers every request with whatever `respond` returns (status, JSON body).
pub struct StubServer {
    stub: Arc<Stub>,
}

impl StubServer {
    pub fn new(respond: impl Fn(&Recorded) -> (u16, String) + Send + Sync + 'static) -> Self {
        StubServer {
            stub: Arc::new(Stub {
                requests: Mutex::new(Vec::new()),
                respond: Box::new(respond),
            }),
        }
    }

    pub async fn spawn(self) -> RunningStub {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = Router::new().fallback(record).with_state(self.stub.clone());
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        RunningStub {
            addr,
            stub: self.stub,
            task,
        }
    }
}

async fn record(
    State(stub): State<Arc<Stub>>,
    method: Method,
    uri: Uri,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let request = Recorded {
        method,
        path: uri.path().to_string(),
        params,
        headers,
        body,
    };

    let (status, body) = (stub.respond)(&request);
    stub.requests.lock().unwrap().push(request);

    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
}

pub struct RunningStub {
    addr: SocketAddr,
    stub: Arc<Stub>,
    task: JoinHandle<()>,
}

impl RunningStub {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.stub.requests.lock().unwrap().clone()
    }
}

impl Drop for RunningStub {
    fn drop(&mut self) {
        self.task.abort();
    }
}
