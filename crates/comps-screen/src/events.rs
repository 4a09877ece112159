//! Progress and diagnostic events
//!
//! Listing and batch runs report what they are doing through a
//! [`ScreenObserver`] instead of printing. [`TracingObserver`] forwards events
//! to `tracing`; any `Fn(&ScreenEvent)` closure works as an observer too.

use crate::multiples::{Multiple, MultipleFailure};
use tracing::{debug, info, warn};

/// Structured event emitted during listing or multiple calculation
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenEvent {
    /// One screener page was received
    PageFetched {
        offset: usize,
        received: usize,
        total: usize,
    },
    /// A requested multiple resolved to absence
    MetricUnavailable {
        symbol: String,
        metric: Multiple,
        failure: MultipleFailure,
    },
    /// A batch row finished; `position` is 1-based
    RowProcessed {
        position: usize,
        total: usize,
        symbol: String,
    },
}

/// Receiver for [`ScreenEvent`]s
pub trait ScreenObserver: Send + Sync {
    fn on_event(&self, event: &ScreenEvent);
}

impl<F> ScreenObserver for F
where
    F: Fn(&ScreenEvent) + Send + Sync,
{
    fn on_event(&self, event: &ScreenEvent) {
        self(event);
    }
}

/// Logs every event through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ScreenObserver for TracingObserver {
    fn on_event(&self, event: &ScreenEvent) {
        match event {
            ScreenEvent::PageFetched {
                offset,
                received,
                total,
            } => debug!(offset, received, total, "Fetched screener page"),
            ScreenEvent::MetricUnavailable {
                symbol,
                metric,
                failure,
            } => warn!(
                symbol = %symbol,
                metric = metric.name(),
                "Could not resolve {}: {}",
                metric.name(),
                failure
            ),
            ScreenEvent::RowProcessed {
                position,
                total,
                symbol,
            } => info!(symbol = %symbol, "Processed {}/{} symbols", position, total),
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ScreenObserver for NoopObserver {
    fn on_event(&self, _event: &ScreenEvent) {}
}
