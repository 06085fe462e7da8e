//! refjs_tests: Concrete evaluation of refinement predicates.
//!
//! Ghost measures never run in checked programs, but they are executable
//! observations, so a contract's refinement can be evaluated against real
//! heap values. The evaluator here does exactly that: it is the oracle the
//! conformance suite uses to confirm that resolved contracts describe what
//! the runtime operations actually do.

use refjs_core::heap::Heap;
use refjs_core::measures;
use refjs_core::value::Value;
use refjs_nominal::ClassTable;
use refjs_types::predicate::{Pred, Term};

/// A concrete environment binding `v` and the operands of a contract.
pub struct OracleEnv<'a> {
    pub heap: &'a Heap,
    pub classes: Option<&'a ClassTable>,
    /// The value bound to `v`, if any.
    pub value: Option<Value>,
    /// The values bound to `x0, x1, ...`.
    pub operands: Vec<Value>,
}

impl<'a> OracleEnv<'a> {
    pub fn new(heap: &'a Heap) -> Self {
        Self {
            heap,
            classes: None,
            value: None,
            operands: Vec::new(),
        }
    }

    pub fn with_classes(mut self, classes: &'a ClassTable) -> Self {
        self.classes = Some(classes);
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_operands(mut self, operands: Vec<Value>) -> Self {
        self.operands = operands;
        self
    }
}

/// Evaluate a term to a value. `None` when the term is not defined in this
/// environment (an unbound operand, `len` of a non-array, and so on).
pub fn eval_term(env: &OracleEnv<'_>, term: &Term) -> Option<Value> {
    match term {
        Term::Value => env.value.clone(),
        Term::Operand(i) => env.operands.get(*i).cloned(),
        Term::Num(n) => Some(Value::Number(*n)),
        Term::Str(s) => Some(Value::Str(s.clone())),
        Term::Bool(b) => Some(Value::Bool(*b)),
        Term::Bv(b) => Some(Value::BitVec32(*b)),
        Term::Len(t) => {
            let v = eval_term(env, t)?;
            measures::len(env.heap, &v).map(|n| Value::Number(n as f64))
        }
        Term::Ttag(t) => {
            let v = eval_term(env, t)?;
            Some(Value::Str(measures::ttag(&v).as_str().to_owned()))
        }
        Term::Offset(t, field) => {
            let v = eval_term(env, t)?;
            measures::offset(env.heap, &v, field)
        }
        Term::Add(a, b) => numeric(env, a, b, |x, y| x + y),
        Term::Sub(a, b) => numeric(env, a, b, |x, y| x - y),
        Term::Mul(a, b) => numeric(env, a, b, |x, y| x * y),
        Term::BvAnd(a, b) => bitvector(env, a, b, |x, y| x & y),
        Term::BvOr(a, b) => bitvector(env, a, b, |x, y| x | y),
    }
}

/// Evaluate a predicate to a truth value. `None` when some subterm is
/// undefined in this environment.
pub fn eval_pred(env: &OracleEnv<'_>, pred: &Pred) -> Option<bool> {
    match pred {
        Pred::True => Some(true),
        Pred::False => Some(false),
        Pred::Prop(t) => Some(measures::prop(&eval_term(env, t)?)),
        Pred::Not(p) => eval_pred(env, p).map(|b| !b),
        Pred::And(ps) => {
            for p in ps {
                if !eval_pred(env, p)? {
                    return Some(false);
                }
            }
            Some(true)
        }
        Pred::Or(ps) => {
            for p in ps {
                if eval_pred(env, p)? {
                    return Some(true);
                }
            }
            Some(false)
        }
        Pred::Implies(a, b) => Some(!eval_pred(env, a)? || eval_pred(env, b)?),
        Pred::Iff(a, b) => Some(eval_pred(env, a)? == eval_pred(env, b)?),
        Pred::Ite(c, t, e) => {
            if eval_pred(env, c)? {
                eval_pred(env, t)
            } else {
                eval_pred(env, e)
            }
        }
        Pred::Eq(a, b) => compare(env, a, b).map(|c| c == Comparison::Equal),
        Pred::Ne(a, b) => compare(env, a, b).map(|c| c != Comparison::Equal),
        Pred::Lt(a, b) => {
            let (x, y) = numbers(env, a, b)?;
            Some(x < y)
        }
        Pred::Le(a, b) => {
            let (x, y) = numbers(env, a, b)?;
            Some(x <= y)
        }
        Pred::Alias(a, b) => {
            let (va, vb) = (eval_term(env, a)?, eval_term(env, b)?);
            Some(aliases(&va, &vb))
        }
        Pred::HasProperty(name, o) => {
            let (name, o) = (string_term(env, name)?, eval_term(env, o)?);
            Some(measures::has_property(env.heap, &name, &o))
        }
        Pred::HasDirectProperty(name, o) => {
            let (name, o) = (string_term(env, name)?, eval_term(env, o)?);
            Some(measures::has_direct_property(env.heap, &name, &o))
        }
        Pred::EnumProp(name, o) => {
            let (name, o) = (string_term(env, name)?, eval_term(env, o)?);
            Some(measures::enum_prop(env.heap, &name, &o))
        }
        Pred::ExtendsClass(t, class) => {
            let v = eval_term(env, t)?;
            Some(env.classes?.extends_class(env.heap, &v, class))
        }
        Pred::ExtendsInterface(t, iface) => {
            let v = eval_term(env, t)?;
            Some(env.classes?.extends_interface(env.heap, &v, iface))
        }
    }
}

/// Whether the predicate concretely holds; undefined subterms count as a
/// failure, never as vacuous truth.
pub fn holds(env: &OracleEnv<'_>, pred: &Pred) -> bool {
    eval_pred(env, pred) == Some(true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Equal,
    Distinct,
}

fn compare(env: &OracleEnv<'_>, a: &Term, b: &Term) -> Option<Comparison> {
    let (va, vb) = (eval_term(env, a)?, eval_term(env, b)?);
    // Numbers compare through the shared numeric view, so a bit-vector and
    // the equal plain number are one value.
    let equal = match (va.as_number(), vb.as_number()) {
        (Some(x), Some(y)) => x == y,
        _ => va == vb,
    };
    Some(if equal {
        Comparison::Equal
    } else {
        Comparison::Distinct
    })
}

fn aliases(a: &Value, b: &Value) -> bool {
    match (a, b) {
        // Containers alias by identity.
        (Value::Object(x), Value::Object(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => x == y,
        (Value::Object(_) | Value::Array(_), _) | (_, Value::Object(_) | Value::Array(_)) => false,
        // Primitives have no identity beyond their content.
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
    }
}

fn numbers(env: &OracleEnv<'_>, a: &Term, b: &Term) -> Option<(f64, f64)> {
    let (va, vb) = (eval_term(env, a)?, eval_term(env, b)?);
    Some((va.as_number()?, vb.as_number()?))
}

fn numeric(env: &OracleEnv<'_>, a: &Term, b: &Term, f: impl Fn(f64, f64) -> f64) -> Option<Value> {
    let (x, y) = numbers(env, a, b)?;
    Some(Value::Number(f(x, y)))
}

fn bitvector(env: &OracleEnv<'_>, a: &Term, b: &Term, f: impl Fn(u32, u32) -> u32) -> Option<Value> {
    let (va, vb) = (eval_term(env, a)?, eval_term(env, b)?);
    let x = as_bits(&va)?;
    let y = as_bits(&vb)?;
    Some(Value::BitVec32(f(x, y)))
}

fn as_bits(v: &Value) -> Option<u32> {
    match v {
        Value::BitVec32(b) => Some(*b),
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64 => {
            Some(*n as u32)
        }
        _ => None,
    }
}

fn string_term(env: &OracleEnv<'_>, t: &Term) -> Option<String> {
    match eval_term(env, t)? {
        Value::Str(s) => Some(s),
        Value::Number(n) => Some(format!("{n}")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_evaluate_through_the_measures() {
        let mut heap = Heap::new();
        let a = heap.array_literal(vec![Value::Number(1.0), Value::Number(2.0)]);
        let env = OracleEnv::new(&heap).with_operands(vec![Value::Array(a)]);
        assert_eq!(
            eval_term(&env, &Term::len(Term::op(0))),
            Some(Value::Number(2.0))
        );
        assert_eq!(
            eval_term(&env, &Term::ttag(Term::op(0))),
            Some(Value::Str("object".into()))
        );
    }

    #[test]
    fn an_unbound_binder_fails_closed() {
        let heap = Heap::new();
        let env = OracleEnv::new(&heap);
        assert_eq!(eval_pred(&env, &Pred::prop_v()), None);
        assert!(!holds(&env, &Pred::prop_v()));
        assert!(holds(&env, &Pred::True));
    }

    #[test]
    fn aliasing_is_identity_for_containers_and_content_for_primitives() {
        let mut heap = Heap::new();
        let a = heap.array_literal(vec![]);
        let b = heap.array_literal(vec![]);
        assert!(aliases(&Value::Array(a), &Value::Array(a)));
        assert!(!aliases(&Value::Array(a), &Value::Array(b)));
        assert!(aliases(&Value::Number(3.0), &Value::BitVec32(3)));
        assert!(!aliases(&Value::Str("a".into()), &Value::Str("b".into())));
    }
}
