// src/report.rs

//! Typed sink for transform results.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info};

use crate::transform::{Transform, TransformError, WriteReport};

pub trait Reporter: Send + Sync + fmt::Debug {
    fn transform_started(&self, _transform: &Transform) {}

    /// Called after every write of the invocation has returned.
    fn transform_succeeded(&self, transform: &Transform, report: &WriteReport);

    fn transform_failed(&self, error: &TransformError);
}

/// Reports to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn transform_started(&self, transform: &Transform) {
        info!(transform = %transform.name(), "transform started");
    }

    fn transform_succeeded(&self, transform: &Transform, report: &WriteReport) {
        info!(
            transform = %transform.name(),
            written = report.written.len(),
            "transform finished"
        );
    }

    fn transform_failed(&self, error: &TransformError) {
        error!(transform = %error.name, cause = %error.cause, "transform failed");
    }
}

/// Forwards every notification to each inner reporter in order.
#[derive(Debug, Default)]
pub struct FanoutReporter {
    reporters: Vec<Arc<dyn Reporter>>,
}

impl FanoutReporter {
    pub fn new(reporters: Vec<Arc<dyn Reporter>>) -> Self {
        Self { reporters }
    }
}

impl Reporter for FanoutReporter {
    fn transform_started(&self, transform: &Transform) {
        for r in &self.reporters {
            r.transform_started(transform);
        }
    }

    fn transform_succeeded(&self, transform: &Transform, report: &WriteReport) {
        for r in &self.reporters {
            r.transform_succeeded(transform, report);
        }
    }

    fn transform_failed(&self, error: &TransformError) {
        for r in &self.reporters {
            r.transform_failed(error);
        }
    }
}
