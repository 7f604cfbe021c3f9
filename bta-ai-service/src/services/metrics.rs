//! Prometheus metrics for bta-ai-service.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Registry and every collector registered in it, published together.
struct Metrics {
    registry: Registry,
    // Pipeline metrics
    requests_total: IntCounterVec,
    reports_total: IntCounterVec,
    // Provider metrics
    provider_latency_seconds: HistogramVec,
    provider_errors_total: IntCounterVec,
    tokens_total: IntCounterVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize all metrics. Later calls are no-ops.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    if METRICS.get().is_some() {
        return Ok(());
    }

    let metrics = build_metrics()?;

    // A concurrent caller may have published first; its set is the one in use
    // and this one is discarded whole.
    if METRICS.set(metrics).is_ok() {
        tracing::info!("Prometheus metrics initialized");
    }
    Ok(())
}

fn build_metrics() -> Result<Metrics, prometheus::Error> {
    let registry = Registry::new();

    // Every analysis-route request, by outcome (ok, preflight, or error kind)
    let requests_total = IntCounterVec::new(
        Opts::new("bta_requests_total", "Total analysis endpoint requests"),
        &["outcome"],
    )?;

    // Successfully generated reports
    let reports_total = IntCounterVec::new(
        Opts::new("bta_reports_total", "Total reports generated"),
        &["mode"],
    )?;

    let provider_latency_seconds = HistogramVec::new(
        HistogramOpts::new(
            "genai_provider_latency_seconds",
            "AI provider API latency in seconds",
        )
        .buckets(vec![1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 90.0, 120.0, 180.0]),
        &["provider", "model"],
    )?;

    let provider_errors_total = IntCounterVec::new(
        Opts::new("genai_provider_errors_total", "Total AI provider errors"),
        &["provider", "error_type"],
    )?;

    let tokens_total = IntCounterVec::new(
        Opts::new("genai_tokens_total", "Total tokens processed"),
        &["model", "type"], // type: input, output
    )?;

    registry.register(Box::new(requests_total.clone()))?;
    registry.register(Box::new(reports_total.clone()))?;
    registry.register(Box::new(provider_latency_seconds.clone()))?;
    registry.register(Box::new(provider_errors_total.clone()))?;
    registry.register(Box::new(tokens_total.clone()))?;

    Ok(Metrics {
        registry,
        requests_total,
        reports_total,
        provider_latency_seconds,
        provider_errors_total,
        tokens_total,
    })
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match METRICS.get() {
        Some(m) => &m.registry,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

// Helper functions for recording metrics

pub fn record_request(outcome: &str) {
    if let Some(m) = METRICS.get() {
        m.requests_total.with_label_values(&[outcome]).inc();
    }
}

pub fn record_report(mode: &str) {
    if let Some(m) = METRICS.get() {
        m.reports_total.with_label_values(&[mode]).inc();
    }
}

pub fn record_provider_latency(provider: &str, model: &str, duration_secs: f64) {
    if let Some(m) = METRICS.get() {
        m.provider_latency_seconds
            .with_label_values(&[provider, model])
            .observe(duration_secs);
    }
}

pub fn record_provider_error(provider: &str, error_type: &str) {
    if let Some(m) = METRICS.get() {
        m.provider_errors_total.with_label_values(&[provider, error_type]).inc();
    }
}

/// Record token usage. Providers that do not report usage are skipped.
pub fn record_tokens(model: &str, input_tokens: Option<u64>, output_tokens: Option<u64>) {
    if let Some(m) = METRICS.get() {
        let counter = &m.tokens_total;
        if let Some(input) = input_tokens {
            counter.with_label_values(&[model, "input"]).inc_by(input);
        }
        if let Some(output) = output_tokens {
            counter.with_label_values(&[model, "output"]).inc_by(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrent_init_publishes_one_registry() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(init_metrics))
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        record_provider_error("openai", "rate_limited");
        let text = get_metrics();
        assert!(text
            .lines()
            .any(|line| line.starts_with("genai_provider_errors_total{")
                && line.contains("error_type=\"rate_limited\"")));
    }

    #[test]
    fn recorded_values_show_up_in_exposition() {
        init_metrics().unwrap();
        init_metrics().unwrap();

        record_request("forbidden_origin");
        record_report("full_report");
        record_tokens("gpt-5", Some(10), None);

        let text = get_metrics();
        assert!(text.contains("bta_requests_total{outcome=\"forbidden_origin\"}"));
        assert!(text.contains("bta_reports_total{mode=\"full_report\"}"));
        assert!(text.contains("genai_tokens_total{model=\"gpt-5\",type=\"input\"}"));
    }
}
