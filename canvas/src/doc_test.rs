#![allow(clippy::float_cmp)]

use super::*;

fn make_stroke(id: StrokeId) -> Stroke {
    Stroke {
        id,
        path: vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)],
        color: "#000".to_owned(),
    }
}

fn make_stroke_colored(id: StrokeId, color: &str) -> Stroke {
    Stroke { color: color.to_owned(), ..make_stroke(id) }
}

// =============================================================
// Stroke serde
// =============================================================

#[test]
fn stroke_serializes_with_wire_field_names() {
    let stroke = make_stroke(7);
    let json = serde_json::to_value(&stroke).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "id": 7,
            "path": [{"x": 0.0, "y": 0.0}, {"x": 10.0, "y": 10.0}],
            "color": "#000",
        })
    );
}

#[test]
fn stroke_deserializes_from_wire() {
    let raw = r##"{"id":3,"path":[{"x":1.5,"y":2}],"color":"#ff0000"}"##;
    let stroke: Stroke = serde_json::from_str(raw).unwrap();
    assert_eq!(stroke.id, 3);
    assert_eq!(stroke.path, vec![Point::new(1.5, 2.0)]);
    assert_eq!(stroke.color, "#ff0000");
}

// =============================================================
// BoardId
// =============================================================

#[test]
fn board_id_accepts_allowed_alphabet() {
    for raw in ["abcdEFGH", "a1-b2_c3", "________", "12345678901234567890"] {
        let id = BoardId::parse(raw).unwrap();
        assert_eq!(id.as_str(), raw);
    }
}

#[test]
fn board_id_rejects_short_codes() {
    assert!(BoardId::parse("abc1234").is_err());
    assert!(BoardId::parse("").is_err());
}

#[test]
fn board_id_rejects_foreign_characters() {
    for raw in ["abcd efgh", "abcd/efgh", "abcd.efgh", "ábcdefgh", "abcd%20efgh"] {
        assert_eq!(BoardId::parse(raw), Err(InvalidBoardId(raw.to_owned())), "{raw} should be rejected");
    }
}

#[test]
fn board_id_from_str_and_display() {
    let id: BoardId = "Zx9-_q2W".parse().unwrap();
    assert_eq!(id.to_string(), "Zx9-_q2W");
    assert_eq!(String::from(id), "Zx9-_q2W");
}

#[test]
fn board_id_serde_is_transparent_and_validated() {
    let id = BoardId::parse("boardcode").unwrap();
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"boardcode\"");
    let back: BoardId = serde_json::from_str("\"boardcode\"").unwrap();
    assert_eq!(back, id);
    assert!(serde_json::from_str::<BoardId>("\"bad id!\"").is_err());
}

// =============================================================
// ProvisionalIds
// =============================================================

#[test]
fn provisional_ids_are_negated_timestamps() {
    let mut ids = ProvisionalIds::new();
    assert_eq!(ids.next(1_700_000_000_000), -1_700_000_000_000);
    assert!(is_provisional(-1_700_000_000_000));
}

#[test]
fn provisional_ids_strictly_decrease_within_one_millisecond() {
    let mut ids = ProvisionalIds::new();
    let a = ids.next(5_000);
    let b = ids.next(5_000);
    let c = ids.next(4_999);
    assert_eq!(a, -5_000);
    assert_eq!(b, -5_001);
    assert_eq!(c, -5_002);
}

#[test]
fn provisional_ids_stay_negative_for_a_zero_clock() {
    let mut ids = ProvisionalIds::new();
    assert!(ids.next(0) < 0);
    assert!(ids.next(-42) < 0);
}

#[test]
fn server_ids_are_not_provisional() {
    assert!(!is_provisional(0));
    assert!(!is_provisional(1));
}

// =============================================================
// StrokeStore basics
// =============================================================

#[test]
fn store_new_is_empty() {
    let store = StrokeStore::new();
    assert!(store.is_empty());
    assert_eq!(store.len(), 0);
}

#[test]
fn store_insert_appends_in_order() {
    let mut store = StrokeStore::new();
    assert!(store.insert(make_stroke(3)));
    assert!(store.insert(make_stroke(1)));
    assert!(store.insert(make_stroke(2)));
    assert_eq!(store.ids(), vec![3, 1, 2]);
}

#[test]
fn store_insert_drops_duplicate_id() {
    let mut store = StrokeStore::new();
    assert!(store.insert(make_stroke_colored(1, "#111")));
    assert!(!store.insert(make_stroke_colored(1, "#222")));
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(1).map(|s| s.color.as_str()), Some("#111"));
}

#[test]
fn store_insert_same_stroke_twice_is_idempotent() {
    let mut store = StrokeStore::new();
    store.insert(make_stroke(1));
    let before = store.clone();
    store.insert(make_stroke(1));
    assert_eq!(store.strokes(), before.strokes());
}

#[test]
fn store_remove_returns_stroke_and_keeps_order() {
    let mut store = StrokeStore::new();
    store.insert(make_stroke(1));
    store.insert(make_stroke(2));
    store.insert(make_stroke(3));
    let removed = store.remove(2).unwrap();
    assert_eq!(removed.id, 2);
    assert_eq!(store.ids(), vec![1, 3]);
}

#[test]
fn store_remove_missing_is_noop() {
    let mut store = StrokeStore::new();
    store.insert(make_stroke(1));
    assert!(store.remove(99).is_none());
    assert_eq!(store.len(), 1);
}

// =============================================================
// StrokeStore::confirm
// =============================================================

#[test]
fn confirm_replaces_provisional_in_place() {
    let mut store = StrokeStore::new();
    store.insert(make_stroke(1));
    store.insert(make_stroke(-500));
    store.insert(make_stroke(2));

    let outcome = store.confirm(-500, make_stroke_colored(40, "#abc"));
    assert_eq!(outcome, Confirmation::Replaced);
    assert_eq!(store.ids(), vec![1, 40, 2]);
    assert_eq!(store.get(40).map(|s| s.color.as_str()), Some("#abc"));
}

#[test]
fn confirm_drops_provisional_when_broadcast_arrived_first() {
    let mut store = StrokeStore::new();
    store.insert(make_stroke(-500));
    store.insert(make_stroke(40));

    let outcome = store.confirm(-500, make_stroke(40));
    assert_eq!(outcome, Confirmation::Deduplicated);
    assert_eq!(store.ids(), vec![40]);
}

#[test]
fn confirm_after_local_erase_is_orphaned() {
    let mut store = StrokeStore::new();
    store.insert(make_stroke(1));

    let outcome = store.confirm(-500, make_stroke(40));
    assert_eq!(outcome, Confirmation::Orphaned);
    assert_eq!(store.ids(), vec![1]);
}

// =============================================================
// StrokeStore::load_snapshot
// =============================================================

#[test]
fn load_snapshot_replaces_confirmed_strokes() {
    let mut store = StrokeStore::new();
    store.insert(make_stroke(1));
    store.insert(make_stroke(2));
    store.load_snapshot(vec![make_stroke(5), make_stroke(6)]);
    assert_eq!(store.ids(), vec![5, 6]);
}

#[test]
fn load_snapshot_keeps_pending_provisional_strokes_last() {
    let mut store = StrokeStore::new();
    store.insert(make_stroke(-10));
    store.insert(make_stroke(1));
    store.insert(make_stroke(-11));
    store.load_snapshot(vec![make_stroke(1), make_stroke(2)]);
    assert_eq!(store.ids(), vec![1, 2, -10, -11]);
}

#[test]
fn load_snapshot_deduplicates_ids() {
    let mut store = StrokeStore::new();
    store.load_snapshot(vec![make_stroke_colored(1, "#111"), make_stroke_colored(1, "#222"), make_stroke(2)]);
    assert_eq!(store.ids(), vec![1, 2]);
    assert_eq!(store.get(1).map(|s| s.color.as_str()), Some("#111"));
}
