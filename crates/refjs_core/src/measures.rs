//! Ghost measures.
//!
//! Pure observations of values used by contracts and test oracles. Nothing
//! in this module is part of the runtime: a measure never allocates, never
//! mutates, and has no address at run time.

use crate::heap::Heap;
use crate::value::{Tag, Value};

/// `ttag v`: the runtime tag, total over all values.
pub fn ttag(v: &Value) -> Tag {
    v.tag()
}

/// `Prop v`: truthiness.
pub fn prop(v: &Value) -> bool {
    v.truthy()
}

/// `len v`: number of elements, defined on arrays only.
pub fn len(heap: &Heap, v: &Value) -> Option<usize> {
    match v {
        Value::Array(id) => Some(heap.array_len(*id)),
        _ => None,
    }
}

/// `hasProperty(name, o)`: the name resolves on `o`, own or inherited. On
/// arrays a numeric name resolves exactly when it is a valid index.
pub fn has_property(heap: &Heap, name: &str, v: &Value) -> bool {
    match v {
        Value::Object(id) => heap.get_property(*id, name).is_some(),
        Value::Array(id) => match name.parse::<usize>() {
            Ok(i) => i < heap.array_len(*id),
            Err(_) => name == "length",
        },
        _ => false,
    }
}

/// `hasDirectProperty(name, o)`: the name is stored on `o` itself, with no
/// prototype walk.
pub fn has_direct_property(heap: &Heap, name: &str, v: &Value) -> bool {
    match v {
        Value::Object(id) => heap.object(*id).slot(name).is_some(),
        Value::Array(id) => match name.parse::<usize>() {
            Ok(i) => i < heap.array_len(*id),
            Err(_) => false,
        },
        _ => false,
    }
}

/// `enumProp(name, o)`: the name is visited by for-in enumeration.
pub fn enum_prop(heap: &Heap, name: &str, v: &Value) -> bool {
    for_in_keys(heap, v).iter().any(|k| k == name)
}

/// The `hasOwnProperty` observation: direct presence, which also implies
/// resolvability.
pub fn has_own_property(heap: &Heap, name: &str, v: &Value) -> bool {
    has_direct_property(heap, name, v) && has_property(heap, name, v)
}

/// `offset(o, "f")`: projection of a stored field, own or inherited.
pub fn offset(heap: &Heap, v: &Value, field: &str) -> Option<Value> {
    match v {
        Value::Object(id) => heap.get_property(*id, field).cloned(),
        Value::Array(id) => match field.parse::<usize>() {
            Ok(i) => Some(heap.array_get(*id, &Value::Number(i as f64))),
            Err(_) if field == "length" => Some(Value::Number(heap.array_len(*id) as f64)),
            Err(_) => Some(Value::Undefined),
        },
        _ => None,
    }
}

/// The key sequence a for-in loop visits: for arrays, the valid indices in
/// order; for objects, own enumerable keys in insertion order followed by
/// inherited enumerable keys that are not shadowed.
pub fn for_in_keys(heap: &Heap, v: &Value) -> Vec<String> {
    match v {
        Value::Array(id) => (0..heap.array_len(*id)).map(|i| i.to_string()).collect(),
        Value::Object(id) => {
            let mut keys: Vec<String> = Vec::new();
            let mut seen: Vec<String> = Vec::new();
            let mut current = Some(*id);
            while let Some(oid) = current {
                let data = heap.object(oid);
                for (name, slot) in data.slots() {
                    if seen.iter().any(|k| k == name) {
                        continue;
                    }
                    seen.push(name.clone());
                    // A shadowing slot hides the inherited one even when it
                    // is itself not enumerable.
                    if slot.flags.contains(crate::heap::SlotFlags::ENUMERABLE) {
                        keys.push(name.clone());
                    }
                }
                current = data.proto;
            }
            keys
        }
        _ => Vec::new(),
    }
}
