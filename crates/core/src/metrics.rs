//! Prometheus metrics for conversions and probes.

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::time::Duration;

use crate::converter::ConverterError;

/// Conversions total by result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ffconduit_conversions_total", "Total ffmpeg conversions"),
        &["result"], // "success", "failed", "cancelled"
    )
    .unwrap()
});

/// Classified conversion failures by kind.
pub static CONVERSION_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ffconduit_conversion_failures_total",
            "Failed conversions by failure kind",
        ),
        &["kind"],
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "ffconduit_conversion_duration_seconds",
            "Wall-clock duration of ffmpeg conversions",
        )
        .buckets(vec![
            0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0,
        ]),
        &["result"],
    )
    .unwrap()
});

/// Probes total by result.
pub static PROBES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ffconduit_probes_total", "Total ffprobe invocations"),
        &["result"], // "success", "failed", "cancelled"
    )
    .unwrap()
});

/// Probe duration in seconds.
pub static PROBE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "ffconduit_probe_duration_seconds",
            "Duration of ffprobe invocations",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .unwrap()
});

fn result_label<T>(result: &Result<T, ConverterError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) if e.is_cancelled() => "cancelled",
        Err(_) => "failed",
    }
}

/// Records the outcome of one conversion.
pub fn record_conversion<T>(result: &Result<T, ConverterError>, elapsed: Duration) {
    let label = result_label(result);
    CONVERSIONS_TOTAL.with_label_values(&[label]).inc();
    CONVERSION_DURATION
        .with_label_values(&[label])
        .observe(elapsed.as_secs_f64());
    if let Err(e) = result {
        if let Some(kind) = e.failure_kind() {
            CONVERSION_FAILURES.with_label_values(&[kind.as_str()]).inc();
        }
    }
}

/// Records the outcome of one probe.
pub fn record_probe<T>(result: &Result<T, ConverterError>, elapsed: Duration) {
    PROBES_TOTAL.with_label_values(&[result_label(result)]).inc();
    PROBE_DURATION.observe(elapsed.as_secs_f64());
}

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_FAILURES.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(PROBES_TOTAL.clone()),
        Box::new(PROBE_DURATION.clone()),
    ]
}

/// A registry holding every core metric.
pub fn registry() -> Result<Registry, prometheus::Error> {
    let registry = Registry::new();
    for metric in all_metrics() {
        registry.register(metric)?;
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_conversion_failure_kind() {
        let before = CONVERSION_FAILURES
            .with_label_values(&["unknown_decoder"])
            .get();
        let result: Result<(), _> = Err(ConverterError::UnknownDecoder {
            output: String::new(),
            arguments: String::new(),
        });
        record_conversion(&result, Duration::from_millis(10));
        assert_eq!(
            CONVERSION_FAILURES
                .with_label_values(&["unknown_decoder"])
                .get(),
            before + 1
        );
    }

    #[test]
    fn test_cancelled_is_not_a_failure() {
        let before = CONVERSIONS_TOTAL.with_label_values(&["cancelled"]).get();
        let result: Result<(), _> = Err(ConverterError::Cancelled);
        record_conversion(&result, Duration::ZERO);
        assert_eq!(
            CONVERSIONS_TOTAL.with_label_values(&["cancelled"]).get(),
            before + 1
        );
    }

    #[test]
    fn test_registry_contains_all_metrics() {
        let registry = registry().unwrap();
        PROBES_TOTAL.with_label_values(&["success"]).inc();
        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"ffconduit_probes_total".to_string()));
    }
}
