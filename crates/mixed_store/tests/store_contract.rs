//! # Store Contract Tests
//!
//! End-to-end checks of the public store API: layout, insertion, growth,
//! swap-delete, column resolution and both row views.
//!
//! Run with: cargo test -p mixed_store --test store_contract

use std::any::Any;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use mixed_store::{IndexKind, LayoutBuilder, MixedStore, StoreConfig, StoreError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Position {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Velocity {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Clone, Debug, PartialEq)]
struct Name(String);

fn pos(x: f64, y: f64, z: f64) -> Position {
    Position { x, y, z }
}

fn vel(x: f64, y: f64, z: f64) -> Velocity {
    Velocity { x, y, z }
}

fn physics_store() -> MixedStore {
    LayoutBuilder::new()
        .add_plain_field::<Position>()
        .add_plain_field::<Velocity>()
        .build()
        .unwrap()
}

fn tagged_store() -> MixedStore {
    LayoutBuilder::new()
        .add_field::<u64>()
        .add_field::<Name>()
        .add_field::<Rc<u32>>()
        .build()
        .unwrap()
}

// ============================================================================
// END-TO-END SCENARIO
// ============================================================================

#[test]
fn position_velocity_round_trip_through_views() {
    let mut store = physics_store();
    let row = store.add((pos(1.0, 2.0, 3.0), vel(4.0, 5.0, 6.0))).unwrap();
    assert_eq!(row, 0);

    let mut view = store.row_view_mut();
    view.set_index(0).unwrap();
    assert_eq!(*view.get_ref::<Position>(0).unwrap(), pos(1.0, 2.0, 3.0));
    assert_eq!(*view.get_ref::<Velocity>(1).unwrap(), vel(4.0, 5.0, 6.0));

    view.get::<Position>(0).unwrap().x = 11.0;

    assert_eq!(
        *store.index_row_col::<Position>(0, 0).unwrap(),
        pos(11.0, 2.0, 3.0)
    );
}

#[test]
fn view_can_hold_two_columns_at_once() {
    let mut store = physics_store();
    store.add((pos(1.0, 2.0, 3.0), vel(4.0, 5.0, 6.0))).unwrap();

    let mut view = store.row_view_mut();
    let (p, v) = view.get_pair::<Position, Velocity>(0, 1).unwrap();
    p.x += 10.0;
    v.y += 30.0;

    assert_eq!(store.index::<Position>(0).unwrap().x, 11.0);
    assert_eq!(store.index::<Velocity>(0).unwrap().y, 35.0);
}

// ============================================================================
// LENGTH, COLUMNS, ROUND-TRIP
// ============================================================================

#[test]
fn len_counts_adds() {
    let mut store = tagged_store();
    let shared = Rc::new(0u32);
    for i in 0..37u64 {
        let row = store
            .add((i, Name(format!("e{i}")), Rc::clone(&shared)))
            .unwrap();
        assert_eq!(row as u64, i);
    }
    assert_eq!(store.len(), 37);
    assert!(store.capacity() >= 37);
}

#[test]
fn col_of_follows_registration_order() {
    let store = LayoutBuilder::new()
        .add_field::<u8>()
        .add_field::<Name>()
        .add_field::<f32>()
        .add_field::<u8>()
        .build()
        .unwrap();

    assert_eq!(store.col_of::<u8>(), Some(0));
    assert_eq!(store.col_of::<Name>(), Some(1));
    assert_eq!(store.col_of::<f32>(), Some(2));
    assert_eq!(store.col_of::<i128>(), None);
}

#[test]
fn round_trip_keeps_referent_identity() {
    let mut store = tagged_store();
    let referent = Rc::new(99u32);
    let row = store
        .add((7u64, Name("seven".into()), Rc::clone(&referent)))
        .unwrap();

    assert_eq!(*store.index_row_col::<u64>(row, 0).unwrap(), 7);
    assert_eq!(
        *store.index_row_col::<Name>(row, 1).unwrap(),
        Name("seven".into())
    );
    let stored = store.index_row_col::<Rc<u32>>(row, 2).unwrap();
    assert!(Rc::ptr_eq(stored, &referent));
    assert_eq!(Rc::strong_count(&referent), 2);
}

#[test]
fn index_by_type_finds_first_column() {
    let mut store = LayoutBuilder::new()
        .add_field::<u32>()
        .add_field::<u32>()
        .build()
        .unwrap();
    store.add((1u32, 2u32)).unwrap();

    assert_eq!(*store.index::<u32>(0).unwrap(), 1);
    *store.index_mut::<u32>(0).unwrap() = 10;
    assert_eq!(*store.index_row_col::<u32>(0, 0).unwrap(), 10);
    assert_eq!(*store.index_row_col::<u32>(0, 1).unwrap(), 2);
    assert_eq!(
        store.index::<u64>(0).unwrap_err(),
        StoreError::FieldNotFound("u64")
    );
}

// ============================================================================
// SWAP DELETE
// ============================================================================

#[test]
fn swap_delete_moves_last_row_into_hole() {
    let mut store = tagged_store();
    let marker = Rc::new(0u32);
    for i in 0..4u64 {
        store
            .add((i, Name(format!("row{i}")), Rc::clone(&marker)))
            .unwrap();
    }

    store.swap_delete(1).unwrap();

    assert_eq!(store.len(), 3);
    assert_eq!(*store.index_row_col::<u64>(1, 0).unwrap(), 3);
    assert_eq!(
        *store.index_row_col::<Name>(1, 1).unwrap(),
        Name("row3".into())
    );
    assert!(store.index_row_col::<u64>(3, 0).is_err());
    assert_eq!(Rc::strong_count(&marker), 4);
}

#[test]
fn swap_delete_of_last_row_leaves_others_untouched() {
    let mut store = physics_store();
    for i in 0..5u32 {
        let f = f64::from(i);
        store.add((pos(f, f, f), vel(-f, -f, -f))).unwrap();
    }

    store.swap_delete(4).unwrap();

    assert_eq!(store.len(), 4);
    for i in 0..4 {
        let f = f64::from(u32::try_from(i).unwrap());
        assert_eq!(*store.index_row_col::<Position>(i, 0).unwrap(), pos(f, f, f));
        assert_eq!(*store.index_row_col::<Velocity>(i, 1).unwrap(), vel(-f, -f, -f));
    }
}

#[test]
fn swap_delete_out_of_range_changes_nothing() {
    let mut store = physics_store();
    store.add((pos(1.0, 1.0, 1.0), vel(0.0, 0.0, 0.0))).unwrap();

    assert_eq!(
        store.swap_delete(1).unwrap_err(),
        StoreError::IndexOutOfRange {
            kind: IndexKind::Row,
            index: 1,
            len: 1
        }
    );
    assert_eq!(store.len(), 1);

    store.swap_delete(0).unwrap();
    assert!(store.is_empty());
    assert!(store.swap_delete(0).is_err());
}

// ============================================================================
// GROWTH
// ============================================================================

#[test]
fn growth_preserves_every_row() {
    let mut store = tagged_store();
    let referents: Vec<Rc<u32>> = (0..300).map(Rc::new).collect();
    assert_eq!(store.capacity(), 1);

    for (i, r) in referents.iter().enumerate() {
        store
            .add((i as u64, Name(format!("n{i}")), Rc::clone(r)))
            .unwrap();
    }
    // 1 -> 2 -> 4 -> ... -> 256 -> 512
    assert_eq!(store.capacity(), 512);

    for (i, r) in referents.iter().enumerate() {
        assert_eq!(*store.index_row_col::<u64>(i, 0).unwrap(), i as u64);
        assert_eq!(
            *store.index_row_col::<Name>(i, 1).unwrap(),
            Name(format!("n{i}"))
        );
        assert!(Rc::ptr_eq(store.index_row_col::<Rc<u32>>(i, 2).unwrap(), r));
        assert_eq!(Rc::strong_count(r), 2);
    }

    drop(store);
    assert!(referents.iter().all(|r| Rc::strong_count(r) == 1));
}

#[test]
fn configured_initial_capacity() {
    let config = StoreConfig::from_toml_str("initial_capacity = 64").unwrap();
    let mut store = LayoutBuilder::new()
        .add_field::<u16>()
        .build_with(&config)
        .unwrap();
    assert_eq!(store.capacity(), 64);

    for i in 0..64u16 {
        store.add((i,)).unwrap();
    }
    assert_eq!(store.capacity(), 64);
    store.add((64u16,)).unwrap();
    assert_eq!(store.capacity(), 128);
}

// ============================================================================
// CONTRACT VIOLATIONS
// ============================================================================

#[test]
fn add_with_wrong_arity_is_rejected() {
    let mut store = physics_store();

    assert_eq!(
        store.add((pos(0.0, 0.0, 0.0),)).unwrap_err(),
        StoreError::ArityMismatch {
            expected: 2,
            given: 1
        }
    );
    assert_eq!(
        store
            .add((pos(0.0, 0.0, 0.0), vel(0.0, 0.0, 0.0), 1u8))
            .unwrap_err(),
        StoreError::ArityMismatch {
            expected: 2,
            given: 3
        }
    );
    assert!(store
        .add_boxed(vec![Box::new(pos(0.0, 0.0, 0.0)) as Box<dyn Any>])
        .is_err());
    assert_eq!(store.len(), 0);
}

#[test]
fn add_with_wrong_types_is_rejected() {
    let mut store = physics_store();
    let err = store
        .add((vel(0.0, 0.0, 0.0), pos(0.0, 0.0, 0.0)))
        .unwrap_err();
    assert!(matches!(err, StoreError::TypeMismatch { column: 0, .. }));
    assert_eq!(store.len(), 0);
}

#[test]
fn out_of_range_access_is_rejected() {
    let mut store = physics_store();
    store.add((pos(0.0, 0.0, 0.0), vel(0.0, 0.0, 0.0))).unwrap();

    assert!(matches!(
        store.index_row_col::<Position>(1, 0),
        Err(StoreError::IndexOutOfRange {
            kind: IndexKind::Row,
            ..
        })
    ));
    assert!(matches!(
        store.index_row_col::<Position>(0, 2),
        Err(StoreError::IndexOutOfRange {
            kind: IndexKind::Column,
            ..
        })
    ));

    let mut view = store.row_view_mut();
    assert!(view.set_index(1).is_err());
    assert_eq!(view.row(), 0);
}

#[test]
fn mismatched_read_type_is_rejected() {
    let mut store = physics_store();
    store.add((pos(0.0, 0.0, 0.0), vel(0.0, 0.0, 0.0))).unwrap();

    let err = store.index_row_col::<Velocity>(0, 0).unwrap_err();
    assert!(matches!(err, StoreError::TypeMismatch { column: 0, .. }));
}

#[test]
fn building_without_fields_is_rejected() {
    assert!(matches!(
        LayoutBuilder::new().build(),
        Err(StoreError::BuildOrderViolation(_))
    ));
}

// ============================================================================
// COPY VIEW
// ============================================================================

#[test]
fn copy_view_reads_by_value() {
    let mut store = physics_store();
    store.add((pos(1.0, 2.0, 3.0), vel(4.0, 5.0, 6.0))).unwrap();
    store.add((pos(7.0, 8.0, 9.0), vel(0.0, 0.0, 0.0))).unwrap();

    let mut view = store.row_view_copy();
    let mut p = view.get::<Position>(0).unwrap();
    p.x = 100.0;
    assert_eq!(p, pos(100.0, 2.0, 3.0));
    assert_eq!(view.get::<Position>(0).unwrap(), pos(1.0, 2.0, 3.0));

    assert!(view.next());
    assert_eq!(view.get::<Position>(0).unwrap(), pos(7.0, 8.0, 9.0));
    assert!(!view.next());
    assert_eq!(view.row(), 1);

    view.set_index(0).unwrap();
    assert_eq!(view.get::<Velocity>(1).unwrap(), vel(4.0, 5.0, 6.0));
}

#[test]
fn snapshot_is_decoupled_from_later_mutation() {
    let mut store = tagged_store();
    let referent = Rc::new(1u32);
    store
        .add((1u64, Name("before".into()), Rc::clone(&referent)))
        .unwrap();

    let snapshot = store.row_view_copy().snapshot().unwrap();

    *store.index_row_col_mut::<Name>(0, 1).unwrap() = Name("after".into());
    for i in 2..100u64 {
        store
            .add((i, Name(String::new()), Rc::clone(&referent)))
            .unwrap();
    }
    store.swap_delete(0).unwrap();

    assert_eq!(snapshot.get::<u64>(0).unwrap(), 1);
    assert_eq!(*snapshot.get_ref::<Name>(1).unwrap(), Name("before".into()));
    assert!(Rc::ptr_eq(snapshot.get_ref::<Rc<u32>>(2).unwrap(), &referent));
    assert!(matches!(
        snapshot.get::<u32>(0),
        Err(StoreError::TypeMismatch { .. })
    ));
}
