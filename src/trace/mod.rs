//! # Trace Module
//!
//! Span creation and per-call context for distributed traces. A [`Tracer`] mints
//! spans for one service; [`CallContext`] carries the active span of an inbound
//! call to the outbound requests its handler makes.

mod propagation;
mod reporter;

pub use propagation::{
    decode_grpc_timeout, encode_grpc_timeout, extract, inject, HeaderExtractor, HeaderInjector,
    MetadataExtractor, MetadataInjector, GRPC_TIMEOUT_HEADER, TRACE_HEADER,
};
pub use reporter::{FinishedSpan, LogReporter, MemoryReporter, OtlpReporter, Reporter};

pub use opentelemetry::trace::{SpanId, SpanKind, TraceId};

use crate::config::TracingConfig;
use opentelemetry::trace::{SpanContext as RemoteSpanContext, TraceFlags, TraceState};
use opentelemetry_sdk::trace::{IdGenerator, RandomIdGenerator};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to build span exporter for {endpoint}: {source}")]
    Exporter {
        endpoint: String,
        #[source]
        source: opentelemetry_otlp::ExporterBuildError,
    },
}

/// The propagated identity of one span, plus the parent link the wire format
/// does not carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub sampled: bool,
}

impl SpanContext {
    /// This span as the remote parent of the next hop.
    pub fn to_remote(&self) -> RemoteSpanContext {
        let flags = if self.sampled {
            TraceFlags::SAMPLED
        } else {
            TraceFlags::default()
        };
        RemoteSpanContext::new(
            self.trace_id,
            self.span_id,
            flags,
            true,
            TraceState::default(),
        )
    }

    /// Context read off the wire. Invalid contexts (all-zero ids) yield `None`.
    pub fn from_remote(remote: &RemoteSpanContext) -> Option<Self> {
        remote.is_valid().then(|| Self {
            trace_id: remote.trace_id(),
            span_id: remote.span_id(),
            parent_span_id: None,
            sampled: remote.is_sampled(),
        })
    }
}

/// Sampling decision for root spans. Child spans inherit their parent's flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampler {
    Always,
    Never,
}

#[derive(Debug)]
struct TracerInner {
    service: String,
    sampler: Sampler,
    ids: RandomIdGenerator,
    reporter: Arc<dyn Reporter>,
}

/// Span factory for one service.
#[derive(Debug, Clone)]
pub struct Tracer {
    inner: Arc<TracerInner>,
}

impl Tracer {
    pub fn new(service: impl Into<String>, sampler: Sampler, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            inner: Arc::new(TracerInner {
                service: service.into(),
                sampler,
                ids: RandomIdGenerator::default(),
                reporter,
            }),
        }
    }

    /// Tracer that reports finished spans as log events.
    pub fn with_log_reporter(service: impl Into<String>) -> Self {
        Self::new(service, Sampler::Always, Arc::new(LogReporter))
    }

    /// Build the tracer a role runs with: OTLP export when a collector is
    /// configured, log reporting otherwise. Must be called inside a tokio
    /// runtime.
    pub async fn from_config(
        service: impl Into<String>,
        config: &TracingConfig,
    ) -> Result<Self, TraceError> {
        let sampler = if config.sampled {
            Sampler::Always
        } else {
            Sampler::Never
        };
        let service = service.into();
        let reporter: Arc<dyn Reporter> = match &config.collector {
            Some(endpoint) => Arc::new(OtlpReporter::connect(
                endpoint,
                &service,
                Duration::from_millis(config.flush_interval_ms),
            )?),
            None => Arc::new(LogReporter),
        };
        Ok(Self::new(service, sampler, reporter))
    }

    pub fn service_name(&self) -> &str {
        &self.inner.service
    }

    /// Start a span. With a parent the span joins the parent's trace; without
    /// one it roots a new trace.
    pub fn start_span(&self, operation: impl Into<String>, parent: Option<&SpanContext>) -> Span {
        let ids = &self.inner.ids;
        let context = match parent {
            Some(parent) => SpanContext {
                trace_id: parent.trace_id,
                span_id: ids.new_span_id(),
                parent_span_id: Some(parent.span_id),
                sampled: parent.sampled,
            },
            None => SpanContext {
                trace_id: ids.new_trace_id(),
                span_id: ids.new_span_id(),
                parent_span_id: None,
                sampled: self.inner.sampler == Sampler::Always,
            },
        };

        Span {
            context,
            tracer: self.clone(),
            operation: operation.into(),
            kind: SpanKind::Internal,
            start: SystemTime::now(),
            started: std::time::Instant::now(),
            error: None,
            closed: false,
        }
    }
}

/// An open span. Closed exactly once, by [`Span::finish`] or on drop.
#[derive(Debug)]
pub struct Span {
    context: SpanContext,
    tracer: Tracer,
    operation: String,
    kind: SpanKind,
    start: SystemTime,
    started: std::time::Instant,
    error: Option<String>,
    closed: bool,
}

impl Span {
    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn context(&self) -> &SpanContext {
        &self.context
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn finish(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if !self.context.sampled {
            return;
        }

        self.tracer.inner.reporter.report(FinishedSpan {
            context: self.context,
            service: self.tracer.inner.service.clone(),
            operation: std::mem::take(&mut self.operation),
            kind: self.kind.clone(),
            start: self.start,
            duration: self.started.elapsed(),
            error: self.error.take(),
        });
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if !self.closed && self.error.is_none() {
            // Dropped without finish: the call was abandoned.
            self.error = Some("cancelled".to_string());
        }
        self.close();
    }
}

/// Context of the inbound call a handler is serving.
///
/// Installed in request extensions by the server trace layer and read back by
/// the client trace layer, so an outbound request built with
/// [`CallContext::request`] becomes a child of the inbound span and inherits its
/// deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    span: SpanContext,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new(span: SpanContext, deadline: Option<Instant>) -> Self {
        Self { span, deadline }
    }

    pub fn span(&self) -> &SpanContext {
        &self.span
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The context installed on an inbound request, if any.
    pub fn of<T>(request: &tonic::Request<T>) -> Option<Self> {
        request.extensions().get::<Self>().copied()
    }

    /// Outbound request carrying this context.
    pub fn request<T>(&self, message: T) -> tonic::Request<T> {
        let mut request = tonic::Request::new(message);
        request.extensions_mut().insert(*self);
        request
    }
}

/// Outbound request for `message`, derived from the caller's context when there
/// is one. Without a context the client layer roots a new trace.
pub fn outbound<T>(call: Option<&CallContext>, message: T) -> tonic::Request<T> {
    match call {
        Some(call) => call.request(message),
        None => tonic::Request::new(message),
    }
}
