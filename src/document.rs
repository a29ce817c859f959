//! Helpers over the semi-structured documents stored in `coreData` and `customFields`.
//!
//! A document is an ordered string-keyed map of JSON values. These functions
//! are what the store applies inside its per-row transactions.

use serde_json::{Map, Number, Value};

use crate::error::{RecordFoldError, RecordFoldResult};

pub type Document = Map<String, Value>;

/// Deepest container nesting a stored document may reach. Stored rows wrap
/// the document in a few more levels and serde_json refuses to read past 128.
pub const MAX_DOCUMENT_DEPTH: usize = 100;

/// Container nesting of `value`: scalars are 0, `{}` and `[]` are 1.
pub fn depth(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(depth).max().unwrap_or(0),
        Value::Array(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

/// Nesting of a whole document, counting the document itself.
pub fn document_depth(doc: &Document) -> usize {
    1 + doc.values().map(depth).max().unwrap_or(0)
}

/// Reject documents that could not be read back once stored.
pub fn check_depth(doc: &Document, what: &str) -> RecordFoldResult<()> {
    let found = document_depth(doc);
    if found > MAX_DOCUMENT_DEPTH {
        return Err(RecordFoldError::Validation(format!(
            "{} is nested {} levels deep (max {})",
            what, found, MAX_DOCUMENT_DEPTH
        )));
    }
    Ok(())
}

/// Set `value` at `segments` inside `doc`.
///
/// Missing (or null) intermediate segments become empty objects. The terminal
/// segment is replaced wholesale. A numeric segment indexes into an existing
/// array; an index equal to the array length appends. A write that would nest
/// the document deeper than [`MAX_DOCUMENT_DEPTH`] is rejected up front.
pub fn deep_set(doc: &mut Document, segments: &[String], value: Value) -> RecordFoldResult<()> {
    if segments.is_empty() {
        return Err(RecordFoldError::Validation("field path must not be empty".into()));
    }
    let resulting = segments.len() + depth(&value);
    if resulting > MAX_DOCUMENT_DEPTH {
        return Err(RecordFoldError::Validation(format!(
            "setting a {}-segment path would nest the document {} levels deep (max {})",
            segments.len(),
            resulting,
            MAX_DOCUMENT_DEPTH
        )));
    }
    let mut root = Value::Object(std::mem::take(doc));
    let result = set_in(&mut root, segments, value, 0);
    if let Value::Object(map) = root {
        *doc = map;
    }
    result
}

fn set_in(target: &mut Value, segments: &[String], value: Value, depth: usize) -> RecordFoldResult<()> {
    let (head, rest) = match segments.split_first() {
        Some(split) => split,
        None => return Ok(()),
    };

    match target {
        Value::Object(map) => {
            if rest.is_empty() {
                map.insert(head.clone(), value);
                return Ok(());
            }
            let child = map
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if child.is_null() {
                *child = Value::Object(Map::new());
            }
            set_in(child, rest, value, depth + 1)
        }
        Value::Array(items) => {
            let index: usize = head.parse().map_err(|_| {
                RecordFoldError::Validation(format!(
                    "segment '{}' at depth {} must be an array index",
                    head, depth
                ))
            })?;
            if index > items.len() {
                return Err(RecordFoldError::Validation(format!(
                    "index {} at depth {} is out of bounds (len {})",
                    index,
                    depth,
                    items.len()
                )));
            }
            if index == items.len() {
                items.push(if rest.is_empty() {
                    Value::Null
                } else {
                    Value::Object(Map::new())
                });
            }
            if rest.is_empty() {
                items[index] = value;
                return Ok(());
            }
            if items[index].is_null() {
                items[index] = Value::Object(Map::new());
            }
            set_in(&mut items[index], rest, value, depth + 1)
        }
        other => Err(RecordFoldError::Validation(format!(
            "segment '{}' at depth {} traverses a {} value",
            head,
            depth,
            type_name(other)
        ))),
    }
}

/// Remove a top-level key. Returns whether the key was present.
pub fn remove_key(doc: &mut Document, key: &str) -> bool {
    doc.shift_remove(key).is_some()
}

/// Document containment: every part of `pattern` appears in `target`.
///
/// Objects match key by key, arrays match when every pattern element is
/// contained in some target element, numbers compare by value.
pub fn contains(target: &Value, pattern: &Value) -> bool {
    match (target, pattern) {
        (Value::Object(t), Value::Object(p)) => p
            .iter()
            .all(|(key, pv)| t.get(key).is_some_and(|tv| contains(tv, pv))),
        (Value::Array(t), Value::Array(p)) => {
            p.iter().all(|pv| t.iter().any(|tv| contains(tv, pv)))
        }
        (Value::Number(t), Value::Number(p)) => numbers_equal(t, p),
        _ => target == pattern,
    }
}

/// Integers compare exactly; floats only when either side is one, so `1`
/// matches `1.0` but 2^53 never matches 2^53 + 1.
fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    if a.is_f64() || b.is_f64() {
        return matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y);
    }
    false
}

/// True when every criteria key is contained in either document.
pub fn matches_criteria(core_data: &Document, custom_fields: &Document, criteria: &Document) -> bool {
    criteria.iter().all(|(key, expected)| {
        [core_data, custom_fields]
            .iter()
            .any(|doc| doc.get(key).is_some_and(|actual| contains(actual, expected)))
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
