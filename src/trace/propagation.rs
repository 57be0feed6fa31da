//! Carrier encoding of span contexts and call deadlines.
//!
//! Span contexts travel as W3C `traceparent` entries through the
//! `opentelemetry` propagator; these are the carriers it reads and writes.

use super::SpanContext;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use std::time::Duration;
use tonic::metadata::{KeyRef, MetadataKey, MetadataMap, MetadataValue};

/// Key carrying `{version}-{trace}-{span}-{flags}`.
pub const TRACE_HEADER: &str = "traceparent";

/// gRPC deadline header.
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

pub struct HeaderInjector<'a>(pub &'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}

pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

pub struct MetadataInjector<'a>(pub &'a mut MetadataMap);

impl Injector for MetadataInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(key), Ok(value)) = (
            MetadataKey::from_bytes(key.as_bytes()),
            MetadataValue::try_from(value.as_str()),
        ) {
            self.0.insert(key, value);
        }
    }
}

pub struct MetadataExtractor<'a>(pub &'a MetadataMap);

impl Extractor for MetadataExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0
            .keys()
            .map(|key| match key {
                KeyRef::Ascii(key) => key.as_str(),
                KeyRef::Binary(key) => key.as_str(),
            })
            .collect()
    }
}

/// Write `context` into `carrier`.
pub fn inject(context: &SpanContext, carrier: &mut dyn Injector) {
    let cx = Context::new().with_remote_span_context(context.to_remote());
    TraceContextPropagator::new().inject_context(&cx, carrier);
}

/// Read a span context from `carrier`. Missing or malformed entries yield `None`.
pub fn extract(carrier: &dyn Extractor) -> Option<SpanContext> {
    let cx = TraceContextPropagator::new().extract(carrier);
    let span = cx.span();
    SpanContext::from_remote(span.span_context())
}

/// Parse a `grpc-timeout` value (up to eight digits plus a unit).
pub fn decode_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 || value.len() > 9 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    let amount: u64 = digits.parse().ok()?;
    let duration = match unit {
        "H" => Duration::from_secs(amount.checked_mul(3600)?),
        "M" => Duration::from_secs(amount.checked_mul(60)?),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(duration)
}

/// Encode a duration as a `grpc-timeout` value, rounding up to the unit used.
pub fn encode_grpc_timeout(timeout: Duration) -> String {
    const MAX: u128 = 99_999_999;
    let millis = timeout.as_nanos().div_ceil(1_000_000).max(1);
    if millis <= MAX {
        return format!("{millis}m");
    }
    let secs = millis.div_ceil(1000);
    if secs <= MAX {
        return format!("{secs}S");
    }
    let hours = secs.div_ceil(3600).min(MAX);
    format!("{hours}H")
}
