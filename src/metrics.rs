use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::{
    opts, register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Requests by matched route, method and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "threadline_http_requests_total",
            "Total number of HTTP requests handled"
        ),
        &["route", "method", "status_code"]
    )
    .expect("Failed to register HTTP_REQUESTS_TOTAL metric")
});

pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "threadline_http_request_duration_seconds",
        "Request duration in seconds",
        &["route"]
    )
    .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS metric")
});

// ============================================================================
// Messaging Metrics
// ============================================================================

pub static THREADS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "threadline_threads_created_total",
        "Total number of conversation threads created"
    ))
    .unwrap()
});

pub static MESSAGES_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "threadline_messages_sent_total",
        "Total number of messages persisted"
    ))
    .unwrap()
});

pub static PUSH_DELIVERED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "threadline_push_delivered_total",
        "Push notifications accepted by the transport"
    ))
    .unwrap()
});

pub static PUSH_FAILED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "threadline_push_failed_total",
        "Push notifications rejected by the transport or timed out"
    ))
    .unwrap()
});

pub static PUSH_TOKENS_PRUNED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "threadline_push_tokens_pruned_total",
        "Device tokens removed after a stale registration report"
    ))
    .unwrap()
});

pub fn gather_metrics() -> Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode(&metric_families, &mut buffer)?;

    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        MESSAGES_SENT_TOTAL.inc();
        let text = gather_metrics().unwrap();
        assert!(text.contains("threadline_messages_sent_total"));
    }

    #[test]
    fn http_counters_are_labelled() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["/health", "GET", "200"])
            .inc();
        let text = gather_metrics().unwrap();
        assert!(text.contains(r#"route="/health""#));
    }
}
