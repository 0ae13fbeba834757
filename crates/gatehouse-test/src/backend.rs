//! An in-process stub backend.
//!
//! Binds an ephemeral port, answers every request with a canned status
//! and body, and records what it received so tests can assert on the
//! relayed method, path, headers and body.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One request as observed by the stub.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    /// Request method.
    pub method: String,
    /// Path plus query string as received.
    pub path_and_query: String,
    /// All request headers.
    pub headers: HeaderMap,
    /// Buffered request body.
    pub body: Bytes,
}

impl ReceivedRequest {
    /// Returns a header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A stub backend answering with a fixed status and body.
pub struct StubBackend {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
    accept_task: JoinHandle<()>,
}

impl StubBackend {
    /// Starts a stub that answers every request with `status` and `body`.
    ///
    /// # Panics
    ///
    /// Panics if no ephemeral port can be bound; tests cannot proceed
    /// without one.
    pub async fn start(status: StatusCode, body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let received: Arc<Mutex<Vec<ReceivedRequest>>> = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&received);
        let accept_task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let service = service_fn(move |req: http::Request<Incoming>| {
                        let log = Arc::clone(&log);
                        async move {
                            let method = req.method().to_string();
                            let path_and_query = req
                                .uri()
                                .path_and_query()
                                .map_or_else(|| "/".to_string(), ToString::to_string);
                            let headers = req.headers().clone();
                            let body_bytes = req
                                .into_body()
                                .collect()
                                .await
                                .map(http_body_util::Collected::to_bytes)
                                .unwrap_or_default();

                            log.lock().push(ReceivedRequest {
                                method,
                                path_and_query,
                                headers,
                                body: body_bytes,
                            });

                            let mut response =
                                http::Response::new(Full::new(Bytes::from_static(body.as_bytes())));
                            *response.status_mut() = status;
                            Ok::<_, Infallible>(response)
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self {
            addr,
            received,
            accept_task,
        }
    }

    /// Base URL of the stub, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Everything the stub has received so far, in arrival order.
    #[must_use]
    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.received.lock().clone()
    }

    /// Number of requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.received.lock().len()
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}
