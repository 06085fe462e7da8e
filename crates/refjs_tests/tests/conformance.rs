//! End-to-end conformance: contracts resolved at the type level are
//! checked against concrete heap executions through the predicate oracle.

use refjs_contracts::{ContainerMethod, MethodTable, Op, OperatorTable};
use refjs_core::heap::{Heap, SlotFlags};
use refjs_core::measures;
use refjs_core::value::Value;
use refjs_diagnostics::DiagnosticCollection;
use refjs_nominal::ClassTable;
use refjs_tests::{holds, OracleEnv};
use refjs_types::predicate::{Pred, Term};
use refjs_types::rtype::{RType, Refined};
use refjs_types::Mutability;

fn resolve(op: Op, operands: &[Refined]) -> refjs_contracts::Resolution {
    let table = OperatorTable::new();
    let mut diags = DiagnosticCollection::new();
    let res = table.resolve(op, operands, &mut diags);
    assert!(
        !diags.has_errors(),
        "unexpected diagnostics: {:?}",
        diags.codes()
    );
    res.expect("operator should resolve")
}

fn call(method: ContainerMethod, operands: &[Refined]) -> refjs_contracts::Resolution {
    let table = MethodTable::new();
    let mut diags = DiagnosticCollection::new();
    let res = table.resolve(method, operands, &mut diags);
    assert!(
        !diags.has_errors(),
        "unexpected diagnostics: {:?}",
        diags.codes()
    );
    res.expect("method should resolve")
}

fn lit(n: f64) -> Refined {
    Refined::trivial(RType::NumberLit(n))
}

fn number() -> Refined {
    Refined::trivial(RType::Number)
}

fn iarray(elem: RType, len: u64) -> Refined {
    Refined::trivial(RType::iarray(elem, len))
}

// ========================================================================
// Array literals and stable lengths
// ========================================================================

#[test]
fn array_literal_contract_describes_the_allocated_array() {
    let res = resolve(Op::ArrayLiteral, &[lit(1.0), lit(2.0), lit(3.0)]);

    let mut heap = Heap::new();
    let a = heap.array_literal(vec![
        Value::Number(1.0),
        Value::Number(2.0),
        Value::Number(3.0),
    ]);
    let env = OracleEnv::new(&heap).with_value(Value::Array(a));

    assert!(holds(&env, &res.result.pred));
    // The length refinement is exact, not merely an upper bound.
    assert!(!holds(
        &env,
        &Pred::Eq(Term::len(Term::v()), Term::num(4.0))
    ));
}

#[test]
fn length_of_a_frozen_array_is_pinned_to_its_measure() {
    let res = call(ContainerMethod::Length, &[iarray(RType::Number, 3)]);
    assert_eq!(res.result.base, RType::NumberLit(3.0));

    let mut heap = Heap::new();
    let a = heap.array_literal(vec![
        Value::Number(4.0),
        Value::Number(5.0),
        Value::Number(6.0),
    ]);
    heap.freeze_array(a).unwrap();
    let env = OracleEnv::new(&heap)
        .with_value(Value::Number(3.0))
        .with_operands(vec![Value::Array(a)]);
    assert!(holds(&env, &res.result.pred));

    let wrong = OracleEnv::new(&heap)
        .with_value(Value::Number(2.0))
        .with_operands(vec![Value::Array(a)]);
    assert!(!holds(&wrong, &res.result.pred));
}

// ========================================================================
// Arithmetic against stored fields
// ========================================================================

#[test]
fn subtraction_contract_is_exact_over_object_fields() {
    let res = resolve(Op::Sub, &[number(), number()]);

    let mut heap = Heap::new();
    let o = heap.alloc_object(None, None);
    heap.define_property(
        o,
        "a",
        Value::Number(5.0),
        Mutability::Mutable,
        SlotFlags::ENUMERABLE,
    );
    heap.define_property(
        o,
        "b",
        Value::Number(2.0),
        Mutability::Mutable,
        SlotFlags::ENUMERABLE,
    );

    let a = measures::offset(&heap, &Value::Object(o), "a").unwrap();
    let b = measures::offset(&heap, &Value::Object(o), "b").unwrap();
    let env = OracleEnv::new(&heap)
        .with_value(Value::Number(3.0))
        .with_operands(vec![a.clone(), b.clone()]);
    assert!(holds(&env, &res.result.pred));

    let wrong = OracleEnv::new(&heap)
        .with_value(Value::Number(4.0))
        .with_operands(vec![a, b]);
    assert!(!holds(&wrong, &res.result.pred));
}

#[test]
fn division_folds_literals_and_keeps_its_nonzero_obligation() {
    let res = resolve(Op::Div, &[lit(7.0), lit(2.0)]);
    assert_eq!(res.result.base, RType::NumberLit(3.5));
    assert_eq!(res.obligations.len(), 1);

    let heap = Heap::new();
    let env = OracleEnv::new(&heap)
        .with_operands(vec![Value::Number(7.0), Value::Number(2.0)]);
    assert!(holds(&env, &res.obligations[0].pred));
}

#[test]
fn division_by_one_is_the_identity() {
    let res = resolve(Op::Div, &[number(), number()]);

    let heap = Heap::new();
    let env = OracleEnv::new(&heap)
        .with_value(Value::Number(5.0))
        .with_operands(vec![Value::Number(5.0), Value::Number(1.0)]);
    assert!(holds(&env, &res.result.pred));

    let wrong = OracleEnv::new(&heap)
        .with_value(Value::Number(6.0))
        .with_operands(vec![Value::Number(5.0), Value::Number(1.0)]);
    assert!(!holds(&wrong, &res.result.pred));
}

#[test]
fn division_by_a_literal_zero_is_rejected_outright() {
    let table = OperatorTable::new();
    let mut diags = DiagnosticCollection::new();
    let res = table.resolve(Op::Div, &[number(), lit(0.0)], &mut diags);
    assert!(res.is_none());
    assert_eq!(diags.codes(), vec![5202]);
}

// ========================================================================
// Higher-order operations over frozen arrays
// ========================================================================

#[test]
fn reduce_runs_the_seed_type_and_stays_in_bounds() {
    let callback = Refined::trivial(RType::function(
        vec![RType::Number, RType::Number, RType::Number],
        RType::Number,
    ));
    let res = call(
        ContainerMethod::Reduce,
        &[iarray(RType::Number, 3), callback, lit(10.0)],
    );
    assert_eq!(res.result.base, RType::NumberLit(10.0));

    let mut heap = Heap::new();
    let a = heap.array_literal(vec![
        Value::Number(1.0),
        Value::Number(2.0),
        Value::Number(3.0),
    ]);
    heap.freeze_array(a).unwrap();

    let in_bounds = Pred::in_bounds(Term::v(), Term::op(0));
    let total = heap.reduce(a, 10.0, |acc, v, i| {
        let env = OracleEnv::new(&heap)
            .with_value(Value::Number(i as f64))
            .with_operands(vec![Value::Array(a)]);
        assert!(holds(&env, &in_bounds));
        acc - v.as_number().unwrap()
    });
    assert_eq!(total, 4.0);
}

#[test]
fn for_in_binders_are_valid_indices_of_the_receiver() {
    let res = resolve(Op::ForInKeys, &[iarray(RType::Number, 3)]);
    let element = res.element.expect("iteration yields a binder type");
    assert_eq!(element.base, RType::Number);

    let mut heap = Heap::new();
    let a = heap.array_literal(vec![
        Value::Number(7.0),
        Value::Number(8.0),
        Value::Number(9.0),
    ]);
    heap.freeze_array(a).unwrap();

    let keys = measures::for_in_keys(&heap, &Value::Array(a));
    assert_eq!(keys, vec!["0", "1", "2"]);
    for key in keys {
        let index: f64 = key.parse().unwrap();
        let env = OracleEnv::new(&heap)
            .with_value(Value::Number(index))
            .with_operands(vec![Value::Array(a)]);
        assert!(holds(&env, &element.pred));
    }
}

// ========================================================================
// Property membership
// ========================================================================

#[test]
fn has_own_property_separates_direct_from_inherited_keys() {
    let receiver = Refined::trivial(RType::Instance("Point".into()));
    let res = call(
        ContainerMethod::HasOwnProperty,
        &[receiver, Refined::trivial(RType::String)],
    );

    let mut heap = Heap::new();
    let proto = heap.alloc_object(None, None);
    heap.define_property(
        proto,
        "shared",
        Value::Number(0.0),
        Mutability::Mutable,
        SlotFlags::ENUMERABLE,
    );
    let o = heap.alloc_object(Some(proto), Some("Point"));
    heap.define_property(
        o,
        "own",
        Value::Number(1.0),
        Mutability::Mutable,
        SlotFlags::ENUMERABLE,
    );

    for (name, expected) in [("own", true), ("shared", false), ("absent", false)] {
        let env = OracleEnv::new(&heap)
            .with_value(Value::Bool(expected))
            .with_operands(vec![Value::Object(o), Value::Str(name.into())]);
        assert!(holds(&env, &res.result.pred), "hasOwnProperty({name})");
    }
}

// ========================================================================
// Observations and nominal tests
// ========================================================================

#[test]
fn typeof_contract_folds_to_the_runtime_tag() {
    let res = resolve(Op::Typeof, &[Refined::trivial(RType::Null)]);
    assert_eq!(res.result.base, RType::StringLit("object".into()));

    let heap = Heap::new();
    let env = OracleEnv::new(&heap)
        .with_value(Value::Str("object".into()))
        .with_operands(vec![Value::Null]);
    assert!(holds(&env, &res.result.pred));
}

#[test]
fn is_nan_holds_exactly_when_the_argument_is_not_a_number() {
    let nu = Refined::trivial(RType::Union(vec![RType::Number, RType::Undefined]));
    let res = resolve(Op::IsNan, &[nu]);

    let heap = Heap::new();
    for (arg, expected) in [(Value::Undefined, true), (Value::Number(3.0), false)] {
        let env = OracleEnv::new(&heap)
            .with_value(Value::Bool(expected))
            .with_operands(vec![arg]);
        assert!(holds(&env, &res.result.pred));
    }
}

#[test]
fn instanceof_walks_the_registered_hierarchy() {
    let res = resolve(
        Op::Instanceof,
        &[
            Refined::trivial(RType::Instance("Circle".into())),
            Refined::trivial(RType::StringLit("Shape".into())),
        ],
    );

    let mut classes = ClassTable::new();
    classes.register("Shape", None, &[]);
    classes.register("Circle", Some("Shape"), &[]);
    let mut heap = Heap::new();
    let c = classes.construct(&mut heap, "Circle").unwrap();

    let env = OracleEnv::new(&heap)
        .with_classes(&classes)
        .with_value(Value::Bool(true))
        .with_operands(vec![
            Value::Object(c),
            Value::Str("Shape".into()),
        ]);
    assert!(holds(&env, &res.result.pred));

    let lying = OracleEnv::new(&heap)
        .with_classes(&classes)
        .with_value(Value::Bool(false))
        .with_operands(vec![
            Value::Object(c),
            Value::Str("Shape".into()),
        ]);
    assert!(!holds(&lying, &res.result.pred));
}
