//! Sinks for finished spans. Reporting is best-effort and never blocks a call.

use super::{SpanContext, SpanKind, TraceError};
use opentelemetry::trace::{
    Span as _, SpanBuilder, Status, TraceContextExt, TracerProvider as _,
};
use opentelemetry::{Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{
    BatchConfigBuilder, BatchSpanProcessor, Sampler, SdkTracer, SdkTracerProvider,
};
use opentelemetry_sdk::Resource;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// A closed span, as handed to a [`Reporter`].
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedSpan {
    pub context: SpanContext,
    pub service: String,
    pub operation: String,
    pub kind: SpanKind,
    pub start: SystemTime,
    pub duration: Duration,
    pub error: Option<String>,
}

pub trait Reporter: Send + Sync + fmt::Debug + 'static {
    fn report(&self, span: FinishedSpan);
}

/// Emits each finished span as a structured log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, span: FinishedSpan) {
        info!(
            target: "stayfinder::span",
            trace_id = %span.context.trace_id,
            span_id = %span.context.span_id,
            parent_span_id = ?span.context.parent_span_id.map(|id| id.to_string()),
            service = %span.service,
            operation = %span.operation,
            kind = ?span.kind,
            duration_us = span.duration.as_micros() as u64,
            error = span.error.as_deref(),
            "span finished"
        );
    }
}

/// Keeps finished spans in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryReporter {
    spans: Arc<Mutex<Vec<FinishedSpan>>>,
}

impl MemoryReporter {
    pub fn spans(&self) -> Vec<FinishedSpan> {
        self.spans.lock().clone()
    }

    pub fn clear(&self) {
        self.spans.lock().clear();
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, span: FinishedSpan) {
        self.spans.lock().push(span);
    }
}

/// Exports finished spans to an OTLP/gRPC collector. Spans are queued and sent
/// in batches every `flush_interval`; a full queue drops spans.
#[derive(Debug)]
pub struct OtlpReporter {
    provider: SdkTracerProvider,
    tracer: SdkTracer,
}

impl OtlpReporter {
    /// Build the exporter towards `endpoint` (`host:port` or a full URL).
    /// Must be called inside a tokio runtime.
    pub fn connect(
        endpoint: &str,
        service: &str,
        flush_interval: Duration,
    ) -> Result<Self, TraceError> {
        let endpoint = collector_url(endpoint);
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint.clone())
            .build()
            .map_err(|source| TraceError::Exporter {
                endpoint: endpoint.clone(),
                source,
            })?;
        let processor = BatchSpanProcessor::builder(exporter)
            .with_batch_config(
                BatchConfigBuilder::default()
                    .with_scheduled_delay(flush_interval)
                    .build(),
            )
            .build();
        let provider = SdkTracerProvider::builder()
            .with_sampler(Sampler::AlwaysOn)
            .with_resource(
                Resource::builder()
                    .with_service_name(service.to_string())
                    .build(),
            )
            .with_span_processor(processor)
            .build();
        let tracer = provider.tracer("stayfinder");
        debug!(collector = %endpoint, "span exporter ready");
        Ok(Self { provider, tracer })
    }

    /// Flush queued spans and stop the exporter.
    pub fn shutdown(&self) {
        if let Err(err) = self.provider.shutdown() {
            warn!(error = %err, "span exporter shutdown failed");
        }
    }
}

impl Reporter for OtlpReporter {
    fn report(&self, span: FinishedSpan) {
        let mut builder = SpanBuilder::from_name(span.operation)
            .with_kind(span.kind)
            .with_span_id(span.context.span_id)
            .with_start_time(span.start)
            .with_attributes(vec![KeyValue::new("stayfinder.role", span.service)]);
        let parent = match span.context.parent_span_id {
            Some(parent_span_id) => {
                let parent = SpanContext {
                    span_id: parent_span_id,
                    parent_span_id: None,
                    ..span.context
                };
                Context::new().with_remote_span_context(parent.to_remote())
            }
            None => {
                builder = builder.with_trace_id(span.context.trace_id);
                Context::new()
            }
        };
        if let Some(error) = span.error {
            builder = builder.with_status(Status::error(error));
        }

        let mut exported = builder.start_with_context(&self.tracer, &parent);
        exported.end_with_timestamp(span.start + span.duration);
    }
}

fn collector_url(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}
