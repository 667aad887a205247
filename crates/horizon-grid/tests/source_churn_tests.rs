//! Tests for a grid tracking a list that churns under it.

mod common;

use horizon_grid::{same_item, IndexedSource, ItemRef, KeyboardModifiers, Record, Size};
use slotmap::{DefaultKey, SlotMap};

fn person(n: usize) -> ItemRef {
    Record::new()
        .with("Name", format!("Late {n}"))
        .with("Age", n as i64)
        .into_item()
}

#[test]
fn test_grid_follows_pushes_and_removals() {
    let (mut grid, list) = common::bound_grid(40);
    let mut live: SlotMap<DefaultKey, ItemRef> = SlotMap::new();
    for index in 0..list.len() {
        if let Some(item) = list.get(index) {
            live.insert(item);
        }
    }

    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = |bound: usize| {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        (seed % bound as u64) as usize
    };

    for round in 0..60 {
        match next(5) {
            0 | 1 => {
                let item = person(round);
                live.insert(item.clone());
                list.push(item);
            }
            2 | 3 if !live.is_empty() => {
                let victim = live.keys().nth(next(live.len()));
                if let Some(item) = victim.and_then(|key| live.remove(key)) {
                    assert!(list.remove_item(&item));
                }
            }
            _ => {
                let rows = grid.row_count();
                if rows > 0 {
                    grid.handle_cell_mouse_down(Some(0), next(rows), KeyboardModifiers::SHIFT);
                }
            }
        }
        grid.process_collection_changes().unwrap();
        grid.layout(Size::new(400.0, 300.0)).unwrap();

        assert_eq!(grid.row_count(), live.len(), "round {round}");
        for row in 0..grid.row_count() {
            let item = grid.item_at_row(row).unwrap();
            assert!(live.values().any(|candidate| same_item(candidate, &item)));
        }
        for selected in grid.selected_items().iter() {
            assert!(live.values().any(|candidate| same_item(candidate, &selected)));
        }
        if let Some(slot) = grid.current_slot() {
            assert!(slot < grid.slot_count());
        }
    }
}

#[test]
fn test_reset_clears_selection_and_editing() {
    let (mut grid, list) = common::bound_grid(12);
    grid.select_all();
    grid.set_current_column(1).unwrap();
    assert!(grid.begin_edit());

    list.reset((0..3).map(person));
    grid.process_collection_changes().unwrap();

    assert_eq!(grid.row_count(), 3);
    assert_eq!(grid.editing_row(), None);
    assert!(grid.selected_items().len() <= 1);
    assert!(
        grid.selected_items()
            .iter()
            .all(|item| (0..3).any(|row| grid.item_at_row(row).is_some_and(|r| same_item(&r, &item))))
    );
}
