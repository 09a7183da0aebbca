//! Request dispatcher.
//!
//! # Responsibilities
//! - Reject calls whose identical twin is already in flight
//! - Sign requests and attach `token`, `signature` and `platform` headers
//! - Issue attempts through the transport and classify the response
//! - Retry transport failures with backoff, within the call's retry budget
//! - Release the in-flight entry and end the busy signal exactly once
//!
//! # Design Decisions
//! - Single-flight by rejection: a duplicate fails immediately and never
//!   waits for the running call
//! - Retries reuse the call group's registration; no re-check, no re-add
//! - Cleanup lives in a drop guard, so it also runs when the caller drops
//!   the future before it settles

use std::sync::Arc;
use std::time::Instant;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::Instrument;
use uuid::Uuid;

use crate::busy::{BusyIndicator, TracingBusyIndicator};
use crate::config::DispatchConfig;
use crate::dispatch::outcome::{classify, outcome_label, DispatchError, DispatchResult, Outcome};
use crate::dispatch::request::{DispatchRequest, Method, RequestData};
use crate::dispatch::tracker::{InFlightGuard, RequestTracker};
use crate::observability::{metrics, spans};
use crate::platform::{HostPlatform, PlatformInfo};
use crate::resilience::BackoffPolicy;
use crate::session::{MemorySessionStore, SessionStore};
use crate::signing::{Sha256Signer, Signer};
use crate::transport::{OutgoingRequest, ReqwestTransport, Transport, TransportError};

pub const TOKEN_HEADER: &str = "token";
pub const SIGNATURE_HEADER: &str = "signature";
pub const PLATFORM_HEADER: &str = "platform";

/// Client-side dispatch core. Cheap to clone; clones share every collaborator
/// and the in-flight set.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    session: Arc<dyn SessionStore>,
    platform: Arc<dyn PlatformInfo>,
    busy: Arc<dyn BusyIndicator>,
    signer: Arc<dyn Signer>,
    tracker: RequestTracker,
    backoff: BackoffPolicy,
    busy_message: String,
    default_max_retries: u32,
}

impl Dispatcher {
    /// Start building a dispatcher around `transport`.
    pub fn builder(transport: impl Transport + 'static) -> DispatcherBuilder {
        DispatcherBuilder::new(Arc::new(transport))
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    pub async fn get(&self, url: impl Into<String>) -> Outcome {
        self.send(DispatchRequest::new(Method::GET, url)).await
    }

    pub async fn post(&self, url: impl Into<String>, data: RequestData) -> Outcome {
        self.send(DispatchRequest::new(Method::POST, url).data(data)).await
    }

    pub async fn put(&self, url: impl Into<String>, data: RequestData) -> Outcome {
        self.send(DispatchRequest::new(Method::PUT, url).data(data)).await
    }

    pub async fn delete(&self, url: impl Into<String>) -> Outcome {
        self.send(DispatchRequest::new(Method::DELETE, url)).await
    }

    /// Run one call group to its terminal outcome.
    pub async fn send(&self, request: DispatchRequest) -> Outcome {
        let descriptor = request.descriptor();

        let Some(in_flight) = self.tracker.try_register(&descriptor) else {
            tracing::warn!(
                method = %descriptor.method(),
                url = %descriptor.url(),
                "Duplicate request rejected"
            );
            metrics::record_duplicate(descriptor.method().as_str());
            return Err(DispatchError::DuplicateRejected(descriptor.fingerprint()));
        };
        let group = CallGroup::begin(in_flight, self.tracker.clone(), self.busy.clone(), &self.busy_message);

        let start = Instant::now();
        let max_retries = request.max_retries.unwrap_or(self.default_max_retries);
        let span = spans::call_group_span(Uuid::new_v4(), &descriptor);

        let outcome = self.run(&request, max_retries).instrument(span).await;

        metrics::record_outcome(request.method.as_str(), outcome_label(&outcome), start);
        drop(group);
        outcome
    }

    async fn run(&self, request: &DispatchRequest, max_retries: u32) -> Outcome {
        let signature = self.signer.sign(request.data.as_ref());
        let mut remaining = max_retries;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let outgoing = OutgoingRequest {
                method: request.method.clone(),
                url: request.url.clone(),
                data: request.data.clone(),
                headers: self.merge_headers(&request.headers, &signature)?,
            };

            metrics::record_attempt(request.method.as_str());
            let error = match self.transport.issue(&outgoing).await {
                Ok(response) => {
                    let status = response.status;
                    let outcome = classify(response);
                    match &outcome {
                        Ok(_) => tracing::debug!(status, attempts, "Request succeeded"),
                        Err(e) => tracing::warn!(status, attempts, error = %e, "Request rejected by server"),
                    }
                    return outcome;
                }
                Err(error) => error,
            };

            if remaining == 0 {
                tracing::error!(attempts, error = %error, "Request failed, retries exhausted");
                return Err(transport_failure(attempts, error));
            }
            remaining -= 1;

            let delay = self.backoff.delay(attempts);
            tracing::warn!(
                attempt = attempts,
                remaining,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transport failure, retrying"
            );
            metrics::record_retry(request.method.as_str());
            tokio::time::sleep(delay).await;
        }
    }

    /// Caller headers first; the fixed headers replace same-named entries.
    fn merge_headers(&self, caller: &[(String, String)], signature: &str) -> DispatchResult<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(caller.len() + 3);
        for (name, value) in caller {
            headers.append(header_name(name)?, header_value(name, value)?);
        }

        let token = self.session.token().unwrap_or_default();
        let platform = self.platform.current_platform();
        headers.insert(
            HeaderName::from_static(TOKEN_HEADER),
            header_value(TOKEN_HEADER, &token)?,
        );
        headers.insert(
            HeaderName::from_static(SIGNATURE_HEADER),
            header_value(SIGNATURE_HEADER, signature)?,
        );
        headers.insert(
            HeaderName::from_static(PLATFORM_HEADER),
            header_value(PLATFORM_HEADER, &platform)?,
        );
        Ok(headers)
    }
}

fn transport_failure(attempts: u32, source: TransportError) -> DispatchError {
    DispatchError::TransportFailure { attempts, source }
}

fn header_name(name: &str) -> DispatchResult<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| DispatchError::InvalidHeader(format!("invalid header name '{}': {}", name, e)))
}

fn header_value(name: &str, value: &str) -> DispatchResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| DispatchError::InvalidHeader(format!("invalid value for '{}': {}", name, e)))
}

/// An accepted call group. Dropping it ends the busy signal and releases the
/// in-flight entry.
struct CallGroup {
    in_flight: Option<InFlightGuard>,
    tracker: RequestTracker,
    busy: Arc<dyn BusyIndicator>,
}

impl CallGroup {
    fn begin(
        in_flight: InFlightGuard,
        tracker: RequestTracker,
        busy: Arc<dyn BusyIndicator>,
        message: &str,
    ) -> Self {
        tracing::debug!(fingerprint = %in_flight.fingerprint(), "Call group accepted");
        busy.begin(message);
        metrics::set_in_flight(tracker.len());
        Self {
            in_flight: Some(in_flight),
            tracker,
            busy,
        }
    }
}

impl Drop for CallGroup {
    fn drop(&mut self) {
        self.busy.end();
        self.in_flight.take();
        metrics::set_in_flight(self.tracker.len());
    }
}

/// Wires collaborators into a [`Dispatcher`].
///
/// Defaults: in-memory session store, host platform, tracing busy indicator,
/// placeholder-secret signer, fixed one-second backoff, three retries.
pub struct DispatcherBuilder {
    transport: Arc<dyn Transport>,
    session: Arc<dyn SessionStore>,
    platform: Arc<dyn PlatformInfo>,
    busy: Arc<dyn BusyIndicator>,
    signer: Arc<dyn Signer>,
    tracker: RequestTracker,
    backoff: BackoffPolicy,
    busy_message: String,
    default_max_retries: u32,
}

impl DispatcherBuilder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let defaults = DispatchConfig::default();
        Self {
            transport,
            session: Arc::new(MemorySessionStore::new()),
            platform: Arc::new(HostPlatform),
            busy: Arc::new(TracingBusyIndicator::new()),
            signer: Arc::new(Sha256Signer::new(defaults.signing.secret_key)),
            tracker: RequestTracker::new(),
            backoff: BackoffPolicy::from(&defaults.retry),
            busy_message: defaults.busy.message,
            default_max_retries: defaults.retry.max_retries,
        }
    }

    /// Builder with a reqwest transport, signer, backoff and busy message
    /// taken from `config`.
    pub fn from_config(config: &DispatchConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(&config.transport)?;
        Ok(Self::new(Arc::new(transport))
            .signer(Sha256Signer::new(config.signing.secret_key.clone()))
            .backoff(BackoffPolicy::from(&config.retry))
            .max_retries(config.retry.max_retries)
            .busy_message(config.busy.message.clone()))
    }

    #[must_use]
    pub fn session(mut self, session: Arc<dyn SessionStore>) -> Self {
        self.session = session;
        self
    }

    #[must_use]
    pub fn platform(mut self, platform: impl PlatformInfo + 'static) -> Self {
        self.platform = Arc::new(platform);
        self
    }

    #[must_use]
    pub fn busy_indicator(mut self, busy: Arc<dyn BusyIndicator>) -> Self {
        self.busy = busy;
        self
    }

    #[must_use]
    pub fn signer(mut self, signer: impl Signer + 'static) -> Self {
        self.signer = Arc::new(signer);
        self
    }

    /// Share an in-flight set with other dispatchers.
    #[must_use]
    pub fn tracker(mut self, tracker: RequestTracker) -> Self {
        self.tracker = tracker;
        self
    }

    #[must_use]
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn busy_message(mut self, message: impl Into<String>) -> Self {
        self.busy_message = message.into();
        self
    }

    /// Retries for requests that do not set their own.
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.default_max_retries = max_retries;
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            transport: self.transport,
            session: self.session,
            platform: self.platform,
            busy: self.busy,
            signer: self.signer,
            tracker: self.tracker,
            backoff: self.backoff,
            busy_message: self.busy_message,
            default_max_retries: self.default_max_retries,
        }
    }
}
