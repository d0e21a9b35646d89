//! Buffer splitter / joiner.
//!
//! [`split_buffers`] walks a state tree depth-first and moves every binary
//! leaf into a positional side list, recording the path it was removed from.
//! Map entries holding a buffer are deleted; sequence entries are replaced
//! with `null` so the peer can splice buffers back in without reindexing.
//!
//! The walk never deep-copies: untouched subtrees are moved into the plain
//! output, string allocations survive intact, and the extracted
//! [`Bytes`] payloads share the original allocation.
//!
//! [`join_buffers`] is the inverse and mutates the plain state in place,
//! which is safe because it only ever runs on state that arrived off the
//! wire.

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::errors::StateError;
use crate::path::{BufferPath, PathSegment};
use crate::state::{StateDict, StateValue};

/// Extract every binary leaf from `state`.
///
/// Returns the JSON-safe plain state, the paths the buffers were removed
/// from (encounter order, depth-first), and the buffers themselves,
/// positionally aligned with the paths.
#[must_use]
pub fn split_buffers(state: StateDict) -> (Map<String, Value>, Vec<BufferPath>, Vec<Bytes>) {
    let mut paths = Vec::new();
    let mut buffers = Vec::new();
    let plain = separate_object(state, &BufferPath::new(), &mut paths, &mut buffers);
    (plain, paths, buffers)
}

fn separate_object(
    dict: StateDict,
    path: &BufferPath,
    paths: &mut Vec<BufferPath>,
    buffers: &mut Vec<Bytes>,
) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in dict {
        let child = path.child(PathSegment::Key(key.clone()));
        if let StateValue::Bytes(payload) = value {
            // Removed from the map entirely; the path records where it was.
            paths.push(child);
            buffers.push(payload);
        } else {
            let _ = out.insert(key, separate_value(value, &child, paths, buffers));
        }
    }
    out
}

fn separate_value(
    value: StateValue,
    path: &BufferPath,
    paths: &mut Vec<BufferPath>,
    buffers: &mut Vec<Bytes>,
) -> Value {
    match value {
        StateValue::Null => Value::Null,
        StateValue::Bool(b) => Value::Bool(b),
        StateValue::Number(n) => Value::Number(n),
        StateValue::String(s) => Value::String(s),
        StateValue::Bytes(payload) => {
            // Sequence slot: leave a null placeholder so positions hold.
            paths.push(path.clone());
            buffers.push(payload);
            Value::Null
        }
        StateValue::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    let child = path.child(PathSegment::Index(i));
                    separate_value(item, &child, paths, buffers)
                })
                .collect(),
        ),
        StateValue::Object(dict) => Value::Object(separate_object(dict, path, paths, buffers)),
    }
}

/// Re-insert `buffers` into `state` at `paths`, mutating in place.
///
/// Inverse of [`split_buffers`]. Fails with
/// [`StateError::BufferCountMismatch`] when the lists are not aligned and
/// [`StateError::BadBufferPath`] when a path does not resolve to a container
/// slot — peer messages must not be trusted to be well-formed.
pub fn join_buffers(
    state: &mut StateDict,
    paths: &[BufferPath],
    buffers: Vec<Bytes>,
) -> Result<(), StateError> {
    if paths.len() != buffers.len() {
        return Err(StateError::BufferCountMismatch {
            paths: paths.len(),
            buffers: buffers.len(),
        });
    }
    for (path, buffer) in paths.iter().zip(buffers) {
        assign_at(state, path, buffer)?;
    }
    Ok(())
}

fn assign_at(root: &mut StateDict, path: &BufferPath, buffer: Bytes) -> Result<(), StateError> {
    let bad = || StateError::BadBufferPath { path: path.clone() };
    let (last, init) = path.segments().split_last().ok_or_else(bad)?;

    let Some((first, mid)) = init.split_first() else {
        // Single-segment path: the slot lives in the root dict itself.
        let PathSegment::Key(key) = last else {
            return Err(bad());
        };
        let _ = root.insert(key.clone(), StateValue::Bytes(buffer));
        return Ok(());
    };

    let PathSegment::Key(first_key) = first else {
        return Err(bad());
    };
    let mut current = root.get_mut(first_key).ok_or_else(bad)?;
    for segment in mid {
        current = match (current, segment) {
            (StateValue::Object(dict), PathSegment::Key(key)) => {
                dict.get_mut(key).ok_or_else(bad)?
            }
            (StateValue::Array(items), PathSegment::Index(index)) => {
                items.get_mut(*index).ok_or_else(bad)?
            }
            _ => return Err(bad()),
        };
    }
    match (current, last) {
        (StateValue::Object(dict), PathSegment::Key(key)) => {
            let _ = dict.insert(key.clone(), StateValue::Bytes(buffer));
        }
        (StateValue::Array(items), PathSegment::Index(index)) => {
            *items.get_mut(*index).ok_or_else(bad)? = StateValue::Bytes(buffer);
        }
        _ => return Err(bad()),
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use serde_json::json;

    fn dict(value: serde_json::Value) -> StateDict {
        let Value::Object(map) = value else {
            panic!("expected object literal");
        };
        StateDict::from_json_map(map)
    }

    #[test]
    fn splits_nested_buffer_out_of_map() {
        // {"plain": [0, "text"], "x": {"ar": b"01"}}
        let mut state = dict(json!({"plain": [0, "text"]}));
        let mut x = StateDict::new();
        let _ = x.insert("ar", Bytes::from_static(b"01"));
        let _ = state.insert("x", StateValue::Object(x));

        let (plain, paths, buffers) = split_buffers(state);

        assert_eq!(
            Value::Object(plain),
            json!({"plain": [0, "text"], "x": {}})
        );
        assert_eq!(paths, vec![serde_json::from_value(json!(["x", "ar"])).unwrap()]);
        assert_eq!(buffers, vec![Bytes::from_static(b"01")]);
    }

    #[test]
    fn sequence_slots_become_null_placeholders() {
        let mut state = StateDict::new();
        let _ = state.insert(
            "y",
            StateValue::Array(vec![
                StateValue::Bytes(Bytes::from_static(b"a")),
                StateValue::from(1i64),
                StateValue::Bytes(Bytes::from_static(b"b")),
            ]),
        );

        let (plain, paths, buffers) = split_buffers(state);

        assert_eq!(Value::Object(plain), json!({"y": [null, 1, null]}));
        assert_eq!(
            paths,
            vec![
                serde_json::from_value(json!(["y", 0])).unwrap(),
                serde_json::from_value(json!(["y", 2])).unwrap(),
            ]
        );
        assert_eq!(buffers.len(), 2);
    }

    #[test]
    fn encounter_order_is_depth_first() {
        let mut inner = StateDict::new();
        let _ = inner.insert("b", Bytes::from_static(b"inner"));
        let mut state = StateDict::new();
        let _ = state.insert("a", StateValue::Object(inner));
        let _ = state.insert("c", Bytes::from_static(b"outer"));

        let (_, paths, buffers) = split_buffers(state);

        assert_eq!(paths[0].to_string(), "a/b");
        assert_eq!(paths[1].to_string(), "c");
        assert_eq!(buffers[0], Bytes::from_static(b"inner"));
    }

    #[test]
    fn extraction_shares_the_payload_allocation() {
        let payload = Bytes::from(vec![1u8, 2, 3, 4]);
        let payload_ptr = payload.as_ptr();
        let mut state = StateDict::new();
        let _ = state.insert("buf", payload);

        let (_, _, buffers) = split_buffers(state);

        assert_eq!(buffers[0].as_ptr(), payload_ptr, "buffer must not be copied");
    }

    #[test]
    fn untouched_strings_are_moved_not_cloned() {
        let text = "a long enough string to be heap allocated".to_string();
        let text_ptr = text.as_ptr();
        let mut state = StateDict::new();
        let _ = state.insert("plain", StateValue::String(text));
        let _ = state.insert("buf", Bytes::from_static(b"x"));

        let (plain, _, _) = split_buffers(state);

        let Some(Value::String(out)) = plain.get("plain") else {
            panic!("plain key missing");
        };
        assert_eq!(out.as_ptr(), text_ptr, "untouched leaf must keep its allocation");
    }

    #[test]
    fn join_restores_map_and_sequence_slots() {
        let mut state = dict(json!({"x": {}, "y": [null, 1]}));
        let paths: Vec<BufferPath> = serde_json::from_value(json!([["x", "ar"], ["y", 0]])).unwrap();
        let buffers = vec![Bytes::from_static(b"01"), Bytes::from_static(b"02")];

        join_buffers(&mut state, &paths, buffers).unwrap();

        let Some(StateValue::Object(x)) = state.get("x") else {
            panic!("x missing");
        };
        assert_eq!(x.get("ar"), Some(&StateValue::Bytes(Bytes::from_static(b"01"))));
        let Some(StateValue::Array(y)) = state.get("y") else {
            panic!("y missing");
        };
        assert_eq!(y[0], StateValue::Bytes(Bytes::from_static(b"02")));
        assert_eq!(y[1], StateValue::from(1i64));
    }

    #[test]
    fn join_round_trips_split() {
        let mut inner = StateDict::new();
        let _ = inner.insert("ar", Bytes::from_static(b"01"));
        let mut original = dict(json!({"plain": [0, "text"]}));
        let _ = original.insert("x", StateValue::Object(inner));

        let (plain, paths, buffers) = split_buffers(original.clone());
        let mut rejoined = StateDict::from_json_map(plain);
        join_buffers(&mut rejoined, &paths, buffers).unwrap();

        assert_eq!(rejoined, original);
    }

    #[test]
    fn join_rejects_misaligned_lists() {
        let mut state = dict(json!({}));
        let paths: Vec<BufferPath> = serde_json::from_value(json!([["a"]])).unwrap();
        assert_matches!(
            join_buffers(&mut state, &paths, vec![]),
            Err(StateError::BufferCountMismatch { paths: 1, buffers: 0 })
        );
    }

    #[test]
    fn join_rejects_unresolvable_path() {
        let mut state = dict(json!({"x": 1}));
        let paths: Vec<BufferPath> =
            serde_json::from_value(json!([["missing", "deep"]])).unwrap();
        assert_matches!(
            join_buffers(&mut state, &paths, vec![Bytes::from_static(b"01")]),
            Err(StateError::BadBufferPath { .. })
        );
    }

    #[test]
    fn join_rejects_empty_path() {
        let mut state = dict(json!({}));
        let paths = vec![BufferPath::new()];
        assert_matches!(
            join_buffers(&mut state, &paths, vec![Bytes::from_static(b"01")]),
            Err(StateError::BadBufferPath { .. })
        );
    }

    // ── property: join(split(state)) == state ───────────────────────

    fn leaf_strategy() -> impl Strategy<Value = StateValue> {
        prop_oneof![
            Just(StateValue::Null),
            any::<bool>().prop_map(StateValue::from),
            any::<i64>().prop_map(StateValue::from),
            "[a-z]{0,8}".prop_map(StateValue::String),
            proptest::collection::vec(any::<u8>(), 1..16)
                .prop_map(|b| StateValue::Bytes(Bytes::from(b))),
        ]
    }

    fn value_strategy() -> impl Strategy<Value = StateValue> {
        leaf_strategy().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(StateValue::Array),
                proptest::collection::vec(("[a-z]{1,6}", inner), 0..4).prop_map(|entries| {
                    StateValue::Object(entries.into_iter().collect::<StateDict>())
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn round_trip_law(entries in proptest::collection::vec(("[a-z]{1,6}", value_strategy()), 0..5)) {
            let original: StateDict = entries.into_iter().collect();
            let (plain, paths, buffers) = split_buffers(original.clone());
            let mut rejoined = StateDict::from_json_map(plain);
            join_buffers(&mut rejoined, &paths, buffers).unwrap();
            prop_assert_eq!(rejoined, original);
        }
    }
}
