//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use horizon_grid::{DataGrid, ItemList, Record, Size};
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber once. `RUST_LOG` overrides the filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("horizon_grid=debug,horizon_grid_core=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// `count` editable people with a name, an age and an active flag.
pub fn people(count: usize) -> Arc<ItemList> {
    Arc::new(ItemList::from_items((0..count).map(|n| {
        Record::new()
            .with("Name", format!("Person {n}"))
            .with("Age", 20 + n as i64)
            .with("Active", n % 2 == 0)
            .editable()
            .into_item()
    })))
}

/// A grid bound to `count` people and laid out at 400x300.
pub fn bound_grid(count: usize) -> (DataGrid, Arc<ItemList>) {
    init_tracing();
    let list = people(count);
    let mut grid = DataGrid::new();
    grid.set_items_source(Some(list.clone()))
        .expect("binding a fresh list succeeds");
    grid.layout(Size::new(400.0, 300.0))
        .expect("first layout succeeds");
    (grid, list)
}

pub fn selected_slots(grid: &DataGrid) -> Vec<usize> {
    grid.selected_items().slots().collect()
}
