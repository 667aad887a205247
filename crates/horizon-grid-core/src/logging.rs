//! Logging and tracing facilities for Horizon Grid.
//!
//! Horizon Grid uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in the host application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_grid=debug,horizon_grid::selection=trace")
//!     .init();
//! ```
//!
//! Every subsystem logs under one of the [`targets`], so filters can isolate
//! selection, editing, scrolling or data-source traffic.

/// Span names used throughout Horizon Grid for tracing.
pub mod span_names {
    /// A full layout pass.
    pub const LAYOUT: &str = "horizon_grid::layout";
    /// Processing of queued collection-change notifications.
    pub const COLLECTION_CHANGE: &str = "horizon_grid::collection_change";
    /// A full row refresh after a source reset.
    pub const REFRESH_ROWS: &str = "horizon_grid::refresh_rows";
    /// Keyboard dispatch.
    pub const KEY: &str = "horizon_grid::key";
}

/// Target names for log filtering.
pub mod targets {
    /// Grid facade target.
    pub const GRID: &str = "horizon_grid";
    /// Selection engine.
    pub const SELECTION: &str = "horizon_grid::selection";
    /// Current cell and edit transactions.
    pub const EDITING: &str = "horizon_grid::editing";
    /// Scroll and display window computation.
    pub const SCROLL: &str = "horizon_grid::scroll";
    /// Data connection and source notifications.
    pub const DATA: &str = "horizon_grid::data";
    /// Keyboard and mouse routing.
    pub const INPUT: &str = "horizon_grid::input";
    /// Column collection and drag reordering.
    pub const COLUMNS: &str = "horizon_grid::columns";
    /// Layout passes and row loading.
    pub const LAYOUT: &str = "horizon_grid::layout";
    /// Performance spans.
    pub const PERF: &str = "horizon_grid::perf";
    /// Signal emission.
    pub const SIGNAL: &str = "horizon_grid_core::signal";
}

/// A performance tracing span.
///
/// Entered on creation and exited when dropped.
///
/// ```
/// use horizon_grid_core::PerfSpan;
///
/// fn measure_rows() {
///     let _span = PerfSpan::new("measure_rows");
///     // ... work ...
/// }
/// ```
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create and enter a performance span for `name`.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_grid::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Log at trace level under the grid target.
#[macro_export]
macro_rules! grid_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "horizon_grid", $($arg)*)
    };
}

/// Log at debug level under the grid target.
#[macro_export]
macro_rules! grid_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "horizon_grid", $($arg)*)
    };
}

/// Log at info level under the grid target.
#[macro_export]
macro_rules! grid_info {
    ($($arg:tt)*) => {
        tracing::info!(target: "horizon_grid", $($arg)*)
    };
}

/// Log at warn level under the grid target.
#[macro_export]
macro_rules! grid_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "horizon_grid", $($arg)*)
    };
}

/// Log at error level under the grid target.
#[macro_export]
macro_rules! grid_error {
    ($($arg:tt)*) => {
        tracing::error!(target: "horizon_grid", $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let _span = PerfSpan::new("test_operation");
        crate::grid_debug!(rows = 3, "inside perf span");
    }

    #[test]
    fn test_targets_are_namespaced() {
        for target in [
            targets::SELECTION,
            targets::EDITING,
            targets::SCROLL,
            targets::DATA,
            targets::INPUT,
            targets::COLUMNS,
            targets::LAYOUT,
        ] {
            assert!(target.starts_with(targets::GRID));
        }
    }
}
