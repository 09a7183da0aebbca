//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;

use signed_dispatch::busy::BusyIndicator;
use signed_dispatch::platform::StaticPlatform;
use signed_dispatch::resilience::BackoffPolicy;
use signed_dispatch::session::{MemorySessionStore, SessionStore};
use signed_dispatch::signing::Sha256Signer;
use signed_dispatch::transport::{OutgoingRequest, Transport, TransportError, TransportResponse};
use signed_dispatch::{DispatcherBuilder, RequestDescriptor, RequestTracker};

pub const SECRET: &str = "test-secret";
pub const TOKEN: &str = "tok-123";
pub const PLATFORM: &str = "test-os";

/// What the scripted transport does for one attempt.
#[derive(Clone)]
pub enum Step {
    Respond(u16, Value),
    /// No response: the attempt fails at the transport level.
    Fail,
    /// Respond once the gate is notified.
    Wait(Arc<Notify>, u16, Value),
    /// Never complete.
    Hang,
}

/// Transport that plays back a queue of steps and records every attempt.
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    requests: Mutex<Vec<OutgoingRequest>>,
    attempts: AtomicU32,
}

impl ScriptedTransport {
    /// Play `steps` in order, then answer 200 with a null body.
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Self::with_fallback(steps, Step::Respond(200, Value::Null))
    }

    /// Do `step` for every attempt.
    pub fn repeat(step: Step) -> Arc<Self> {
        Self::with_fallback(Vec::new(), step)
    }

    pub fn with_fallback(steps: Vec<Step>, fallback: Step) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
            attempts: AtomicU32::new(0),
        })
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<OutgoingRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_step(&self) -> Step {
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn issue(&self, request: &OutgoingRequest) -> Result<TransportResponse, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        match self.next_step() {
            Step::Respond(status, body) => Ok(TransportResponse { status, body }),
            Step::Fail => Err(TransportError::Connect("connection refused".into())),
            Step::Wait(gate, status, body) => {
                gate.notified().await;
                Ok(TransportResponse { status, body })
            }
            Step::Hang => std::future::pending().await,
        }
    }
}

/// Busy indicator that counts signals.
#[derive(Default)]
pub struct RecordingBusy {
    begins: AtomicUsize,
    ends: AtomicUsize,
    messages: Mutex<Vec<String>>,
}

impl RecordingBusy {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn ends(&self) -> usize {
        self.ends.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl BusyIndicator for RecordingBusy {
    fn begin(&self, message: &str) {
        self.begins.fetch_add(1, Ordering::SeqCst);
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn end(&self) {
        self.ends.fetch_add(1, Ordering::SeqCst);
    }
}

/// Builder with a logged-in session, fixed platform, test secret and no
/// backoff delay.
pub fn builder(transport: Arc<dyn Transport>, busy: Arc<RecordingBusy>) -> DispatcherBuilder {
    let session = Arc::new(MemorySessionStore::new());
    session.set_token(TOKEN).unwrap();

    DispatcherBuilder::new(transport)
        .session(session)
        .platform(StaticPlatform::new(PLATFORM))
        .signer(Sha256Signer::new(SECRET))
        .busy_indicator(busy)
        .backoff(BackoffPolicy::Fixed(Duration::ZERO))
}

/// Yield until `descriptor` is registered as in flight.
pub async fn wait_until_in_flight(tracker: &RequestTracker, descriptor: &RequestDescriptor) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !tracker.contains(descriptor) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("request never became in flight");
}

/// A raw HTTP request as captured by the mock backend.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub head: String,
    pub body: String,
}

impl CapturedRequest {
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    /// Value of header `name`, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` maps each captured request to a status and body. Every request is
/// also pushed into the returned log.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, Arc<Mutex<Vec<CapturedRequest>>>)
where
    F: Fn(CapturedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let captured = log.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let captured = captured.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        captured.lock().unwrap().push(request.clone());

                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            401 => "401 Unauthorized",
                            404 => "404 Not Found",
                            418 => "418 I'm a teapot",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, log)
}

/// An address nothing listens on.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    let body_start = head_end + 4;
    while buf.len() < body_start + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_end = buf.len().min(body_start + content_length);
    let body = String::from_utf8_lossy(&buf[body_start..body_end]).to_string();
    Some(CapturedRequest { head, body })
}
