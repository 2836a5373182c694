//! Failures while wiring logging or pipeline metrics.
//!
//! Messages stay constant; the metric name and stage travel as fields so a
//! failing registration can be traced without parsing strings.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::string::FromUtf8Error;

use prometheus::Error as PrometheusError;
use tracing_subscriber::util::TryInitError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Where in its lifecycle a metric failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricStage {
    /// Building the collector from its options.
    Build,
    /// Adding the collector to the registry.
    Register,
}

impl MetricStage {
    /// Stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Register => "register",
        }
    }
}

/// Errors raised by telemetry helpers.
#[derive(Debug)]
pub enum TelemetryError {
    /// A global tracing subscriber was already installed, or installing one failed.
    LoggingInstall {
        /// Underlying subscriber error.
        source: TryInitError,
    },
    /// A pipeline metric could not be set up.
    Metric {
        /// Metric name.
        name: &'static str,
        /// Step that failed.
        stage: MetricStage,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// The text exposition could not be produced.
    Render {
        /// Underlying encoder error.
        source: PrometheusError,
    },
    /// The text exposition was not UTF-8.
    RenderUtf8 {
        /// Underlying conversion error.
        source: FromUtf8Error,
    },
}

impl TelemetryError {
    pub(crate) const fn metric(
        name: &'static str,
        stage: MetricStage,
        source: PrometheusError,
    ) -> Self {
        Self::Metric {
            name,
            stage,
            source,
        }
    }
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::LoggingInstall { .. } => "logging already initialised",
            Self::Metric { .. } => "pipeline metric setup failed",
            Self::Render { .. } | Self::RenderUtf8 { .. } => "metrics render failed",
        };
        formatter.write_str(message)
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::LoggingInstall { source } => Some(source),
            Self::Metric { source, .. } | Self::Render { source } => Some(source),
            Self::RenderUtf8 { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_errors_carry_name_and_stage() {
        let err = TelemetryError::metric(
            "pipeline_runs_total",
            MetricStage::Register,
            PrometheusError::AlreadyReg,
        );
        assert_eq!(err.to_string(), "pipeline metric setup failed");
        assert!(err.source().is_some());
        assert!(matches!(
            err,
            TelemetryError::Metric {
                name: "pipeline_runs_total",
                stage: MetricStage::Register,
                ..
            }
        ));
        assert_eq!(MetricStage::Build.as_str(), "build");
    }

    #[test]
    fn render_failures_share_a_message() -> std::result::Result<(), Box<dyn Error>> {
        let utf8 = String::from_utf8(vec![0xff])
            .err()
            .ok_or_else(|| std::io::Error::other("expected invalid utf-8"))?;
        let cases = [
            TelemetryError::Render {
                source: PrometheusError::Msg("encode".to_string()),
            },
            TelemetryError::RenderUtf8 { source: utf8 },
        ];
        for err in cases {
            assert_eq!(err.to_string(), "metrics render failed");
            assert!(err.source().is_some());
        }
        Ok(())
    }
}
