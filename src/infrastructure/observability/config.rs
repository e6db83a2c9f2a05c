//! Observability settings, read from the `[observability]` config section

use serde::Deserialize;

use crate::domain::DomainError;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub tracing: TracingConfig,
    pub metrics: MetricsConfig,
}

impl ObservabilityConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(0.0..=1.0).contains(&self.tracing.sampling_ratio) {
            return Err(DomainError::configuration(format!(
                "observability.tracing.sampling_ratio must be between 0 and 1, got {}",
                self.tracing.sampling_ratio
            )));
        }

        if !self.metrics.path.starts_with('/') {
            return Err(DomainError::configuration(format!(
                "observability.metrics.path must start with '/', got '{}'",
                self.metrics.path
            )));
        }

        if !self.metrics.latency_buckets.windows(2).all(|w| w[0] < w[1]) {
            return Err(DomainError::configuration(
                "observability.metrics.latency_buckets must be strictly increasing",
            ));
        }

        Ok(())
    }
}

/// OTLP span export
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    /// gRPC collector address
    pub otlp_endpoint: String,
    pub service_name: String,
    /// Fraction of traces kept, 0.0 to 1.0
    pub sampling_ratio: f64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: "http://localhost:4317".into(),
            service_name: env!("CARGO_PKG_NAME").into(),
            sampling_ratio: 1.0,
        }
    }
}

/// Prometheus exporter
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
    /// Bucket bounds in seconds for `ats_analysis_duration_seconds`
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".into(),
            latency_buckets: vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ObservabilityConfig::default();

        assert!(!config.tracing.enabled);
        assert_eq!(config.tracing.service_name, "resume-ats-scorer");
        assert_eq!(config.metrics.path, "/metrics");
        assert_eq!(config.metrics.latency_buckets.len(), 11);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: MetricsConfig = serde_json::from_str(r#"{"enabled": false}"#).unwrap();

        assert!(!config.enabled);
        assert_eq!(config.path, "/metrics");
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = ObservabilityConfig::default();
        config.tracing.sampling_ratio = 1.5;
        assert!(config.validate().is_err());

        let mut config = ObservabilityConfig::default();
        config.metrics.path = "metrics".into();
        assert!(config.validate().is_err());

        let mut config = ObservabilityConfig::default();
        config.metrics.latency_buckets = vec![1.0, 0.5];
        assert!(config.validate().is_err());
    }
}
