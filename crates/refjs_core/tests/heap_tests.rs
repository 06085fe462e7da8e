//! Heap and measure tests.

use refjs_core::measures;
use refjs_core::{Heap, HeapError, SlotFlags, Value};
use refjs_types::Mutability;

fn num(n: f64) -> Value {
    Value::Number(n)
}

fn numbers(heap: &mut Heap, ns: &[f64]) -> refjs_core::ArrayId {
    heap.array_literal(ns.iter().copied().map(Value::Number).collect())
}

// ============================================================================
// Array storage
// ============================================================================

#[test]
fn literal_length_matches_argument_count() {
    let mut heap = Heap::new();
    let a = numbers(&mut heap, &[1.0, 2.0, 3.0]);
    assert_eq!(heap.array_len(a), 3);
    assert_eq!(heap.array_qualifier(a), Mutability::UniqueMutable);
}

#[test]
fn push_then_pop_returns_the_pushed_value() {
    let mut heap = Heap::new();
    let a = numbers(&mut heap, &[1.0]);
    assert_eq!(heap.push(a, num(2.0)), Ok(2));
    assert_eq!(heap.pop(a), Ok(num(2.0)));
    assert_eq!(heap.array_len(a), 1);
}

#[test]
fn pop_on_empty_array_faults() {
    let mut heap = Heap::new();
    let a = heap.array_literal(vec![]);
    assert_eq!(heap.pop(a), Err(HeapError::EmptyPop));
}

#[test]
fn out_of_range_and_undefined_reads_yield_undefined() {
    let mut heap = Heap::new();
    let a = numbers(&mut heap, &[1.0, 2.0]);
    assert_eq!(heap.array_get(a, &num(5.0)), Value::Undefined);
    assert_eq!(heap.array_get(a, &num(-1.0)), Value::Undefined);
    assert_eq!(heap.array_get(a, &num(0.5)), Value::Undefined);
    assert_eq!(heap.array_get(a, &Value::Undefined), Value::Undefined);
    assert_eq!(heap.array_get(a, &num(1.0)), num(2.0));
}

#[test]
fn write_past_the_end_extends_with_holes() {
    let mut heap = Heap::new();
    let a = numbers(&mut heap, &[1.0]);
    heap.array_set(a, 3, num(9.0)).unwrap();
    assert_eq!(heap.array_len(a), 4);
    assert_eq!(heap.array_get(a, &num(2.0)), Value::Undefined);
    assert_eq!(heap.array_get(a, &num(3.0)), num(9.0));
}

// ============================================================================
// Mutability enforcement
// ============================================================================

#[test]
fn frozen_arrays_reject_all_writes() {
    let mut heap = Heap::new();
    let a = numbers(&mut heap, &[1.0, 2.0]);
    heap.freeze_array(a).unwrap();
    assert!(matches!(
        heap.push(a, num(3.0)),
        Err(HeapError::WriteToReadOnly(Mutability::Immutable))
    ));
    assert!(heap.pop(a).is_err());
    assert!(heap.array_set(a, 0, num(0.0)).is_err());
    assert!(heap.reverse(a).is_err());
    // Reads are unaffected.
    assert_eq!(heap.array_get(a, &num(0.0)), num(1.0));
}

#[test]
fn aliasing_downgrades_unique_to_mutable() {
    let mut heap = Heap::new();
    let a = numbers(&mut heap, &[1.0]);
    assert_eq!(heap.array_qualifier(a), Mutability::UniqueMutable);
    let b = heap.alias_array(a);
    assert_eq!(b, a);
    assert_eq!(heap.array_qualifier(a), Mutability::Mutable);
    // Still writable; only uniqueness is lost.
    assert!(heap.push(a, num(2.0)).is_ok());
}

#[test]
fn freezing_an_immutable_array_is_idempotent() {
    let mut heap = Heap::new();
    let a = numbers(&mut heap, &[1.0]);
    heap.freeze_array(a).unwrap();
    assert!(heap.freeze_array(a).is_ok());
    assert_eq!(heap.array_qualifier(a), Mutability::Immutable);
}

#[test]
fn immutable_length_is_stable_across_derived_arrays() {
    let mut heap = Heap::new();
    let a = numbers(&mut heap, &[1.0, 2.0, 3.0]);
    heap.freeze_array(a).unwrap();
    let doubled = heap.map(a, |v, _| num(v.as_number().unwrap() * 2.0));
    let joined = heap.concat(a, doubled);
    let front = heap.slice(a, 0, Some(2));
    assert_eq!(heap.array_len(a), 3);
    assert_eq!(heap.array_len(doubled), 3);
    assert_eq!(heap.array_len(joined), 6);
    assert_eq!(heap.array_len(front), 2);
    assert_eq!(heap.array_get(doubled, &num(2.0)), num(6.0));
}

// ============================================================================
// Higher-order array operations
// ============================================================================

#[test]
fn reduce_folds_left_and_supplies_in_bounds_indices() {
    let mut heap = Heap::new();
    let a = numbers(&mut heap, &[1.0, 2.0, 3.0]);
    heap.freeze_array(a).unwrap();
    let len = heap.array_len(a);
    let sum = heap.reduce(a, 0.0, |acc, v, i| {
        assert!(i < len, "index {i} handed to the callback is out of bounds");
        acc + v.as_number().unwrap()
    });
    assert_eq!(sum, 6.0);
    // Left fold: ((10 - 1) - 2) - 3.
    let folded = heap.reduce(a, 10.0, |acc, v, _| acc - v.as_number().unwrap());
    assert_eq!(folded, 4.0);
}

#[test]
fn filter_never_grows_the_receiver() {
    let mut heap = Heap::new();
    let a = numbers(&mut heap, &[1.0, 2.0, 3.0, 4.0]);
    let evens = heap.filter(a, |v, _| v.as_number().unwrap() % 2.0 == 0.0);
    assert_eq!(heap.array_len(evens), 2);
    assert_eq!(heap.array_len(a), 4);
}

#[test]
fn reverse_preserves_length() {
    let mut heap = Heap::new();
    let a = numbers(&mut heap, &[1.0, 2.0, 3.0]);
    heap.reverse(a).unwrap();
    assert_eq!(heap.array_len(a), 3);
    assert_eq!(heap.array_get(a, &num(0.0)), num(3.0));
}

// ============================================================================
// Objects and property measures
// ============================================================================

#[test]
fn property_reads_walk_the_prototype_chain() {
    let mut heap = Heap::new();
    let proto = heap.alloc_object(None, None);
    heap.define_property(proto, "shared", num(1.0), Mutability::Mutable, SlotFlags::ENUMERABLE);
    let obj = heap.alloc_object(Some(proto), None);
    heap.define_property(obj, "own", num(2.0), Mutability::Mutable, SlotFlags::ENUMERABLE);

    let v = Value::Object(obj);
    assert!(measures::has_property(&heap, "shared", &v));
    assert!(measures::has_property(&heap, "own", &v));
    assert!(!measures::has_direct_property(&heap, "shared", &v));
    assert!(measures::has_direct_property(&heap, "own", &v));
    assert_eq!(measures::offset(&heap, &v, "shared"), Some(num(1.0)));
}

#[test]
fn has_own_property_requires_direct_presence() {
    let mut heap = Heap::new();
    let proto = heap.alloc_object(None, None);
    heap.define_property(proto, "inherited", num(1.0), Mutability::Mutable, SlotFlags::ENUMERABLE);
    let obj = heap.alloc_object(Some(proto), None);
    heap.define_property(obj, "own", num(2.0), Mutability::Mutable, SlotFlags::ENUMERABLE);

    let v = Value::Object(obj);
    assert!(measures::has_own_property(&heap, "own", &v));
    assert!(!measures::has_own_property(&heap, "inherited", &v));
    assert!(!measures::has_own_property(&heap, "absent", &v));
}

#[test]
fn for_in_visits_own_keys_then_unshadowed_inherited_keys() {
    let mut heap = Heap::new();
    let proto = heap.alloc_object(None, None);
    heap.define_property(proto, "a", num(0.0), Mutability::Mutable, SlotFlags::ENUMERABLE);
    heap.define_property(proto, "b", num(0.0), Mutability::Mutable, SlotFlags::ENUMERABLE);
    let obj = heap.alloc_object(Some(proto), None);
    heap.define_property(obj, "b", num(1.0), Mutability::Mutable, SlotFlags::ENUMERABLE);
    heap.define_property(obj, "c", num(2.0), Mutability::Mutable, SlotFlags::empty());

    let keys = measures::for_in_keys(&heap, &Value::Object(obj));
    // "b" is shadowed by the own slot, "c" is not enumerable.
    assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
    assert!(measures::enum_prop(&heap, "a", &Value::Object(obj)));
    assert!(!measures::enum_prop(&heap, "c", &Value::Object(obj)));
}

#[test]
fn for_in_over_an_array_visits_every_index() {
    let mut heap = Heap::new();
    let a = numbers(&mut heap, &[5.0, 6.0]);
    assert_eq!(
        measures::for_in_keys(&heap, &Value::Array(a)),
        vec!["0".to_string(), "1".to_string()]
    );
}

#[test]
fn strong_update_requires_a_unique_receiver() {
    let mut heap = Heap::new();
    let obj = heap.alloc_object(None, None);
    heap.define_property(obj, "fixed", num(1.0), Mutability::ReadOnly, SlotFlags::ENUMERABLE);

    // Unique receiver: even a read-only field can be strongly updated.
    assert!(heap.set_property(obj, "fixed", num(2.0)).is_ok());
    assert!(heap.set_property(obj, "fresh", num(3.0)).is_ok());

    heap.alias_object(obj);
    assert!(matches!(
        heap.set_property(obj, "fixed", num(4.0)),
        Err(HeapError::WriteToReadOnly(Mutability::ReadOnly))
    ));
    // A Mutable field stays writable through an aliased receiver.
    assert!(heap.set_property(obj, "fresh", num(5.0)).is_ok());
}
