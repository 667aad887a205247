//! Core primitives for Horizon Grid.
//!
//! This crate provides the framework-agnostic building blocks the grid engine
//! is assembled from:
//!
//! - **Signal/Slot System**: Type-safe event notification ([`Signal`])
//! - **Nesting Guards**: Scoped suspension counters that flush on release
//!   ([`NestingCounter`], [`NestingGuard`])
//! - **Logging**: `tracing` targets, span names and [`PerfSpan`]
//!
//! # Signal Example
//!
//! ```
//! use horizon_grid_core::Signal;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let current_cell_changed = Signal::<()>::new();
//! let hits = Arc::new(AtomicUsize::new(0));
//!
//! let hits_clone = hits.clone();
//! current_cell_changed.connect(move |_| {
//!     hits_clone.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! current_cell_changed.emit(());
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

pub mod logging;
pub mod nesting;
pub mod signal;

pub use logging::PerfSpan;
pub use nesting::{NestingCounter, NestingGuard, NestingHost};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
