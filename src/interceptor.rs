//! # Call Interceptors
//!
//! Tower layers that put every remote call inside a span. [`ServerTraceLayer`]
//! wraps inbound services (tonic and axum alike) and installs a [`CallContext`]
//! in the request extensions; [`ClientTraceLayer`] wraps an outbound channel and
//! turns the `CallContext` attached to a request into a child span plus the
//! carrier headers the next hop reads.

use crate::trace::{
    decode_grpc_timeout, encode_grpc_timeout, extract, inject, CallContext, HeaderExtractor,
    HeaderInjector, Span, SpanKind, Tracer, GRPC_TIMEOUT_HEADER,
};
use futures::future::BoxFuture;
use http::{HeaderMap, HeaderValue, Request, Response};
use std::fmt;
use std::task::{Context, Poll};
use tokio::time::Instant;
use tower::{Layer, Service};
use tracing::debug;

const GRPC_STATUS_HEADER: &str = "grpc-status";
const GRPC_MESSAGE_HEADER: &str = "grpc-message";

#[derive(Debug, Clone)]
pub struct ServerTraceLayer {
    tracer: Tracer,
}

impl ServerTraceLayer {
    pub fn new(tracer: Tracer) -> Self {
        Self { tracer }
    }
}

impl<S> Layer<S> for ServerTraceLayer {
    type Service = ServerTrace<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ServerTrace {
            inner,
            tracer: self.tracer.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerTrace<S> {
    inner: S,
    tracer: Tracer,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for ServerTrace<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let parent = extract(&HeaderExtractor(request.headers()));
        let deadline = request
            .headers()
            .get(GRPC_TIMEOUT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(decode_grpc_timeout)
            .map(|timeout| Instant::now() + timeout);
        let span = self
            .tracer
            .start_span(request.uri().path(), parent.as_ref())
            .with_kind(SpanKind::Server);
        request
            .extensions_mut()
            .insert(CallContext::new(*span.context(), deadline));

        Box::pin(async move {
            let mut span = span;
            let result = inner.call(request).await;
            tag_outcome(&mut span, &result);
            span.finish();
            result
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClientTraceLayer {
    tracer: Tracer,
}

impl ClientTraceLayer {
    pub fn new(tracer: Tracer) -> Self {
        Self { tracer }
    }
}

impl<S> Layer<S> for ClientTraceLayer {
    type Service = ClientTrace<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ClientTrace {
            inner,
            tracer: self.tracer.clone(),
        }
    }
}

/// Outbound side of the trace layer. Every call gets a client span whose
/// parent is the [`CallContext`] attached to the request; without one, the
/// span roots a new trace.
#[derive(Debug, Clone)]
pub struct ClientTrace<S> {
    inner: S,
    tracer: Tracer,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for ClientTrace<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let call = request.extensions_mut().remove::<CallContext>();
        let span = self
            .tracer
            .start_span(request.uri().path(), call.as_ref().map(CallContext::span))
            .with_kind(SpanKind::Client);
        inject(span.context(), &mut HeaderInjector(request.headers_mut()));
        if let Some(deadline) = call.and_then(|call| call.deadline()) {
            apply_deadline(request.headers_mut(), deadline);
        }

        Box::pin(async move {
            let mut span = span;
            let result = inner.call(request).await;
            tag_outcome(&mut span, &result);
            span.finish();
            result
        })
    }
}

/// Set `grpc-timeout` to the time left until `deadline`, keeping any shorter
/// timeout already on the request.
fn apply_deadline(headers: &mut HeaderMap, deadline: Instant) {
    let remaining = deadline.saturating_duration_since(Instant::now());
    let existing = headers
        .get(GRPC_TIMEOUT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(decode_grpc_timeout);
    if existing.is_some_and(|existing| existing <= remaining) {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&encode_grpc_timeout(remaining)) {
        headers.insert(GRPC_TIMEOUT_HEADER, value);
    }
}

fn tag_outcome<B, E: fmt::Display>(span: &mut Span, result: &Result<Response<B>, E>) {
    match result {
        Ok(response) => {
            if let Some(message) = failure_of(response) {
                debug!(operation = span.operation(), error = %message, "call failed");
                span.set_error(message);
            }
        }
        Err(err) => span.set_error(err.to_string()),
    }
}

/// Error carried by a response: a non-OK trailers-only gRPC status, or an HTTP
/// server error.
fn failure_of<B>(response: &Response<B>) -> Option<String> {
    let headers = response.headers();
    if let Some(code) = headers
        .get(GRPC_STATUS_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        if code != "0" {
            let message = headers
                .get(GRPC_MESSAGE_HEADER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default();
            return Some(format!("grpc-status {code}: {message}"));
        }
        return None;
    }
    let status = response.status();
    (status.is_server_error() || status.is_client_error()).then(|| format!("http {status}"))
}
