//! JSON merge patch (RFC 7386) helpers.
//!
//! The catalog manager only owns a handful of fields on each resource. It
//! computes a merge patch covering exactly those fields, so anything else on
//! the object (set by Rancher or by users) is left as it is.

use serde_json::{Map, Value};

/// Apply `patch` to `target` with merge-patch semantics: objects merge
/// recursively, `null` removes a key, everything else replaces.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                merge_patch(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// The smallest merge patch that makes `current` agree with `desired` on
/// every field `desired` sets. Fields absent from `desired` are not touched.
///
/// Returns `None` when nothing needs to change.
pub fn diff(current: &Value, desired: &Value) -> Option<Value> {
    match (current, desired) {
        (Value::Object(current), Value::Object(desired)) => {
            let mut patch = Map::new();
            for (key, want) in desired {
                match current.get(key) {
                    Some(have) => {
                        if let Some(change) = diff(have, want) {
                            patch.insert(key.clone(), change);
                        }
                    }
                    None if want.is_null() => {}
                    None => {
                        patch.insert(key.clone(), want.clone());
                    }
                }
            }
            (!patch.is_empty()).then_some(Value::Object(patch))
        }
        (have, want) if have == want => None,
        (_, want) => Some(want.clone()),
    }
}

/// Add `null` entries to `patch` for keys of the map at `pointer` in
/// `current` that `desired` no longer has, so the owned map is replaced
/// rather than merged.
pub fn remove_stale_keys(
    patch: Option<Value>,
    current: &Value,
    desired: &Value,
    path: &[&str],
) -> Option<Value> {
    let pointer = format!("/{}", path.join("/"));
    let Some(Value::Object(have)) = current.pointer(&pointer) else {
        return patch;
    };
    let want = desired.pointer(&pointer).and_then(Value::as_object);

    let stale: Vec<&String> = have
        .keys()
        .filter(|key| !want.is_some_and(|want| want.contains_key(*key)))
        .collect();
    if stale.is_empty() {
        return patch;
    }

    let mut patch = patch.unwrap_or_else(|| Value::Object(Map::new()));
    let mut node = &mut patch;
    for segment in path {
        // Every level of the patch is an object built by `diff` or here.
        let Value::Object(map) = node else {
            return Some(patch);
        };
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if let Value::Object(map) = node {
        for key in stale {
            map.insert(key.clone(), Value::Null);
        }
    }
    Some(patch)
}
