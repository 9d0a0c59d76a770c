//! Metrics recorder initialization.

use {anyhow::Result, tracing::info};

/// Handle to the installed recorder, used by the `/metrics` endpoint.
#[derive(Clone)]
pub struct MetricsHandle {
    #[cfg(feature = "prometheus")]
    prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
}

impl MetricsHandle {
    /// Render metrics in Prometheus text format (empty without the
    /// `prometheus` feature).
    #[must_use]
    pub fn render(&self) -> String {
        #[cfg(feature = "prometheus")]
        {
            self.prometheus_handle.render()
        }
        #[cfg(not(feature = "prometheus"))]
        {
            String::new()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsRecorderConfig {
    pub enabled: bool,
    /// Labels added to every metric
    pub global_labels: Vec<(String, String)>,
}

/// Install the global recorder. Call once at startup.
///
/// Returns `None` when metrics are disabled in config or the `prometheus`
/// feature was not compiled in.
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<Option<MetricsHandle>> {
    if !config.enabled {
        info!("metrics collection is disabled");
        return Ok(None);
    }

    #[cfg(feature = "prometheus")]
    {
        use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

        let mut builder = PrometheusBuilder::new().set_buckets_for_metric(
            Matcher::Full(crate::dispatch::DURATION_SECONDS.to_string()),
            &crate::buckets::DISPATCH_DURATION,
        )?;
        for (key, value) in config.global_labels {
            builder = builder.add_global_label(key, value);
        }
        let prometheus_handle = builder.install_recorder()?;
        info!("prometheus metrics exporter initialized");
        Ok(Some(MetricsHandle { prometheus_handle }))
    }

    #[cfg(not(feature = "prometheus"))]
    {
        info!("metrics requested but the prometheus feature is not compiled in");
        Ok(None)
    }
}
