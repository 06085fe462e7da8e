//! Container method contracts.
//!
//! Methods resolve like operators: an ordered list of guarded rules per
//! method, with the receiver as operand 0 and arguments following. Rules
//! that require write capability sit above an explicit rejection rule, so a
//! read-only receiver is reported as a capability violation rather than a
//! missing overload.

use rustc_hash::FxHashMap;

use refjs_diagnostics::{messages, Diagnostic, DiagnosticCollection};
use refjs_types::mutability::Mutability;
use refjs_types::predicate::{Pred, Term};
use refjs_types::rtype::{ArrayType, RType, Refined};

use crate::compat::assignable;
use crate::table::{Overload, Resolution, RuleOutcome};

/// A built-in container method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerMethod {
    Length,
    Push,
    Pop,
    Concat,
    Slice,
    Splice,
    Join,
    IndexOf,
    Reverse,
    Sort,
    Map,
    Filter,
    Reduce,
    ForEach,
    Every,
    Some,
    HasOwnProperty,
    IsArray,
}

impl ContainerMethod {
    pub fn name(self) -> &'static str {
        match self {
            ContainerMethod::Length => "length",
            ContainerMethod::Push => "push",
            ContainerMethod::Pop => "pop",
            ContainerMethod::Concat => "concat",
            ContainerMethod::Slice => "slice",
            ContainerMethod::Splice => "splice",
            ContainerMethod::Join => "join",
            ContainerMethod::IndexOf => "indexOf",
            ContainerMethod::Reverse => "reverse",
            ContainerMethod::Sort => "sort",
            ContainerMethod::Map => "map",
            ContainerMethod::Filter => "filter",
            ContainerMethod::Reduce => "reduce",
            ContainerMethod::ForEach => "forEach",
            ContainerMethod::Every => "every",
            ContainerMethod::Some => "some",
            ContainerMethod::HasOwnProperty => "hasOwnProperty",
            ContainerMethod::IsArray => "isArray",
        }
    }
}

/// The table of method contracts.
pub struct MethodTable {
    rules: FxHashMap<ContainerMethod, Vec<Overload>>,
}

impl MethodTable {
    pub fn new() -> Self {
        let mut table = Self {
            rules: FxHashMap::default(),
        };
        table.install();
        table
    }

    /// Resolve a method call. `operands[0]` is the receiver.
    pub fn resolve(
        &self,
        method: ContainerMethod,
        operands: &[Refined],
        diags: &mut DiagnosticCollection,
    ) -> Option<Resolution> {
        let rules = self.rules.get(&method)?;
        for rule in rules {
            if (rule.guard)(operands) {
                match (rule.apply)(operands) {
                    RuleOutcome::Resolved(resolution) => return Some(resolution),
                    RuleOutcome::Rejected(errors) => {
                        diags.extend_from_slice(&errors);
                        return None;
                    }
                }
            }
        }
        let receiver = operands
            .first()
            .map(|r| r.base.describe())
            .unwrap_or_else(|| "nothing".into());
        diags.add(
            Diagnostic::new(&messages::NO_METHOD_CONTRACT, &[method.name(), &receiver])
                .with_contract(method.name()),
        );
        None
    }

    fn add<G, A>(&mut self, method: ContainerMethod, name: &'static str, guard: G, apply: A)
    where
        G: Fn(&[Refined]) -> bool + 'static,
        A: Fn(&[Refined]) -> RuleOutcome + 'static,
    {
        self.rules.entry(method).or_default().push(Overload {
            name,
            guard: Box::new(guard),
            apply: Box::new(apply),
        });
    }

    fn install(&mut self) {
        self.install_length();
        self.install_mutators();
        self.install_derivations();
        self.install_higher_order();
        self.install_queries();
    }

    // --------------------------------------------------------------------
    // length
    // --------------------------------------------------------------------
    fn install_length(&mut self) {
        self.add(
            ContainerMethod::Length,
            "length of an immutable array",
            |ops| ops.len() == 1 && immutable_array(&ops[0].base).is_some(),
            |ops| {
                let arr = immutable_array(&ops[0].base).unwrap();
                // The length of an immutable array is a stable measure; pin
                // it to a constant when it is statically known.
                let mut conjuncts = vec![
                    Pred::nonneg(Term::v()),
                    Pred::Eq(Term::v(), Term::len(Term::op(0))),
                ];
                let base = match arr.known_len {
                    Some(n) => {
                        conjuncts.push(Pred::Eq(Term::v(), Term::num(n as f64)));
                        RType::NumberLit(n as f64)
                    }
                    None => RType::Number,
                };
                resolved(Refined::new(base, Pred::and(conjuncts)))
            },
        );
        self.add(
            ContainerMethod::Length,
            "length of an array",
            |ops| ops.len() == 1 && as_array(&ops[0].base).is_some(),
            |_| resolved(Refined::new(RType::Number, Pred::nonneg(Term::v()))),
        );
    }

    // --------------------------------------------------------------------
    // push, pop
    // --------------------------------------------------------------------
    fn install_mutators(&mut self) {
        self.add(
            ContainerMethod::Push,
            "push onto a mutable array",
            |ops| {
                ops.len() == 2
                    && writable_array(&ops[0].base).is_some()
                    && writable_array(&ops[0].base)
                        .map(|a| assignable(&ops[1].base, &a.elem))
                        .unwrap_or(false)
            },
            |_| {
                resolved(Refined::new(
                    RType::Number,
                    // The returned length counts the appended element.
                    Pred::Eq(
                        Term::v(),
                        Term::add(Term::len(Term::op(0)), Term::num(1.0)),
                    ),
                ))
            },
        );
        self.add(
            ContainerMethod::Push,
            "push requires write capability",
            |ops| ops.len() == 2 && as_array(&ops[0].base).is_some(),
            |ops| {
                let arr = as_array(&ops[0].base).unwrap();
                if !arr.mutability.can_write() {
                    return rejected(vec![Diagnostic::new(
                        &messages::WRITE_TO_READ_ONLY,
                        &[arr.mutability.as_str()],
                    )
                    .with_contract("push onto a mutable array")]);
                }
                rejected(vec![Diagnostic::new(
                    &messages::ARGUMENT_NOT_ASSIGNABLE,
                    &[&ops[1].base.describe(), &arr.elem.describe()],
                )
                .with_contract("push onto a mutable array")])
            },
        );

        self.add(
            ContainerMethod::Pop,
            "pop from a mutable array",
            |ops| ops.len() == 1 && writable_array(&ops[0].base).is_some(),
            |ops| {
                let arr = writable_array(&ops[0].base).unwrap();
                if arr.known_len == Some(0) {
                    return rejected(vec![Diagnostic::new(&messages::EMPTY_POP, &[])
                        .with_contract("pop: receiver must be non-empty")]);
                }
                RuleOutcome::Resolved(
                    Resolution::of(Refined::trivial((*arr.elem).clone())).with_obligation(
                        "pop: receiver must be non-empty",
                        Pred::Lt(Term::num(0.0), Term::len(Term::op(0))),
                    ),
                )
            },
        );
        self.add(
            ContainerMethod::Pop,
            "pop requires write capability",
            |ops| ops.len() == 1 && as_array(&ops[0].base).is_some(),
            |ops| {
                let arr = as_array(&ops[0].base).unwrap();
                rejected(vec![Diagnostic::new(
                    &messages::WRITE_TO_READ_ONLY,
                    &[arr.mutability.as_str()],
                )
                .with_contract("pop from a mutable array")])
            },
        );
    }

    // --------------------------------------------------------------------
    // concat, slice, splice, join, indexOf, reverse, sort
    // --------------------------------------------------------------------
    fn install_derivations(&mut self) {
        self.add(
            ContainerMethod::Concat,
            "concat of immutable arrays",
            |ops| {
                ops.len() == 2
                    && immutable_array(&ops[0].base).is_some()
                    && immutable_array(&ops[1].base).is_some()
                    && same_elem(&ops[0].base, &ops[1].base)
            },
            |ops| {
                let a = immutable_array(&ops[0].base).unwrap();
                let b = immutable_array(&ops[1].base).unwrap();
                let known_len = match (a.known_len, b.known_len) {
                    (Some(x), Some(y)) => Some(x + y),
                    _ => None,
                };
                resolved(Refined::new(
                    RType::Array(ArrayType {
                        mutability: Mutability::AnyMutability,
                        elem: a.elem.clone(),
                        known_len,
                    }),
                    Pred::Eq(
                        Term::len(Term::v()),
                        Term::add(Term::len(Term::op(0)), Term::len(Term::op(1))),
                    ),
                ))
            },
        );
        self.add(
            ContainerMethod::Concat,
            "concat of arrays",
            |ops| {
                ops.len() == 2
                    && as_array(&ops[0].base).is_some()
                    && as_array(&ops[1].base).is_some()
                    && same_elem(&ops[0].base, &ops[1].base)
            },
            |ops| {
                let a = as_array(&ops[0].base).unwrap();
                resolved(Refined::trivial(RType::array(
                    Mutability::AnyMutability,
                    (*a.elem).clone(),
                )))
            },
        );

        self.add(
            ContainerMethod::Slice,
            "slice",
            |ops| {
                !ops.is_empty()
                    && ops.len() <= 3
                    && as_array(&ops[0].base).is_some()
                    && ops[1..].iter().all(|o| is_number(&o.base))
            },
            |ops| {
                let arr = as_array(&ops[0].base).unwrap();
                resolved(Refined::trivial(RType::array(
                    Mutability::AnyMutability,
                    (*arr.elem).clone(),
                )))
            },
        );
        self.add(
            ContainerMethod::Splice,
            "splice",
            |ops| {
                ops.len() == 2 && as_array(&ops[0].base).is_some() && is_number(&ops[1].base)
            },
            |ops| {
                let arr = as_array(&ops[0].base).unwrap();
                resolved(Refined::trivial(RType::array(
                    Mutability::AnyMutability,
                    (*arr.elem).clone(),
                )))
            },
        );
        self.add(
            ContainerMethod::Join,
            "join",
            |ops| {
                (ops.len() == 1 || (ops.len() == 2 && is_string(&ops[1].base)))
                    && as_array(&ops[0].base).is_some()
            },
            |_| resolved(Refined::trivial(RType::String)),
        );
        self.add(
            ContainerMethod::IndexOf,
            "indexOf",
            |ops| {
                ops.len() == 2
                    && as_array(&ops[0].base)
                        .map(|a| assignable(&ops[1].base, &a.elem))
                        .unwrap_or(false)
            },
            |_| resolved(Refined::trivial(RType::Number)),
        );

        for (method, name) in [
            (ContainerMethod::Reverse, "reverse preserves length"),
            (ContainerMethod::Sort, "sort preserves length"),
        ] {
            self.add(
                method,
                name,
                move |ops| {
                    !ops.is_empty()
                        && as_array(&ops[0].base).is_some()
                        && match method {
                            ContainerMethod::Sort => {
                                ops.len() == 1
                                    || (ops.len() == 2 && comparator(&ops[1].base, &ops[0].base))
                            }
                            _ => ops.len() == 1,
                        }
                },
                |ops| {
                    resolved(Refined::new(
                        ops[0].base.clone(),
                        Pred::Eq(Term::len(Term::v()), Term::len(Term::op(0))),
                    ))
                },
            );
        }
    }

    // --------------------------------------------------------------------
    // map, filter, reduce, forEach, every, some
    // --------------------------------------------------------------------
    fn install_higher_order(&mut self) {
        self.add(
            ContainerMethod::Map,
            "map produces an immutable array of equal length",
            |ops| {
                ops.len() == 2
                    && as_array(&ops[0].base).is_some()
                    && element_callback(&ops[1].base, &ops[0].base).is_some()
            },
            |ops| {
                let arr = as_array(&ops[0].base).unwrap();
                let ret = element_callback(&ops[1].base, &ops[0].base).unwrap();
                resolved(Refined::new(
                    RType::Array(ArrayType {
                        mutability: Mutability::Immutable,
                        elem: Box::new(ret),
                        known_len: arr.known_len,
                    }),
                    Pred::Eq(Term::len(Term::v()), Term::len(Term::op(0))),
                ))
            },
        );
        self.add(
            ContainerMethod::Filter,
            "filter never grows the receiver",
            |ops| {
                ops.len() == 2
                    && as_array(&ops[0].base).is_some()
                    && element_callback(&ops[1].base, &ops[0].base).is_some()
            },
            |ops| {
                let arr = as_array(&ops[0].base).unwrap();
                resolved(Refined::new(
                    RType::array(Mutability::AnyMutability, (*arr.elem).clone()),
                    Pred::Le(Term::len(Term::v()), Term::len(Term::op(0))),
                ))
            },
        );
        self.add(
            ContainerMethod::Reduce,
            "reduce over an immutable array",
            |ops| {
                ops.len() == 3
                    && immutable_array(&ops[0].base).is_some()
                    && matches!(&ops[1].base, RType::Function(f) if (2..=3).contains(&f.params.len()))
            },
            // The result carries the seed's type; the callback sees every
            // index in bounds of the receiver.
            |ops| resolved(Refined::trivial(ops[2].base.clone())),
        );
        self.add(
            ContainerMethod::ForEach,
            "forEach",
            |ops| {
                ops.len() == 2
                    && as_array(&ops[0].base).is_some()
                    && element_callback(&ops[1].base, &ops[0].base).is_some()
            },
            |_| resolved(Refined::trivial(RType::Undefined)),
        );
        for (method, name) in [
            (ContainerMethod::Every, "every"),
            (ContainerMethod::Some, "some"),
        ] {
            self.add(
                method,
                name,
                |ops| {
                    ops.len() == 2
                        && as_array(&ops[0].base).is_some()
                        && element_callback(&ops[1].base, &ops[0].base).is_some()
                },
                |_| resolved(Refined::trivial(RType::Boolean)),
            );
        }
    }

    // --------------------------------------------------------------------
    // hasOwnProperty, isArray
    // --------------------------------------------------------------------
    fn install_queries(&mut self) {
        self.add(
            ContainerMethod::HasOwnProperty,
            "hasOwnProperty",
            |ops| {
                ops.len() == 2
                    && matches!(&ops[0].base, RType::Dict(_) | RType::Instance(_))
                    && is_string(&ops[1].base)
            },
            |_| {
                resolved(Refined::new(
                    RType::Boolean,
                    Pred::iff(
                        Pred::prop_v(),
                        Pred::and(vec![
                            Pred::HasDirectProperty(Term::op(1), Term::op(0)),
                            Pred::HasProperty(Term::op(1), Term::op(0)),
                        ]),
                    ),
                ))
            },
        );
        self.add(
            ContainerMethod::IsArray,
            "isArray on an array",
            |ops| ops.len() == 1 && as_array(&ops[0].base).is_some(),
            |_| resolved(Refined::new(RType::Boolean, Pred::prop_v())),
        );
        self.add(
            ContainerMethod::IsArray,
            "isArray",
            |ops| ops.len() == 1,
            |_| resolved(Refined::trivial(RType::Boolean)),
        );
    }
}

impl Default for MethodTable {
    fn default() -> Self {
        Self::new()
    }
}

// ------------------------------------------------------------------------
// Guard helpers
// ------------------------------------------------------------------------

fn is_number(t: &RType) -> bool {
    matches!(t, RType::Number | RType::NumberLit(_))
}

fn is_string(t: &RType) -> bool {
    matches!(t, RType::String | RType::StringLit(_))
}

fn as_array(t: &RType) -> Option<&ArrayType> {
    match t {
        RType::Array(a) => Some(a),
        _ => None,
    }
}

fn immutable_array(t: &RType) -> Option<&ArrayType> {
    as_array(t).filter(|a| a.mutability == Mutability::Immutable)
}

fn writable_array(t: &RType) -> Option<&ArrayType> {
    as_array(t).filter(|a| a.mutability.can_write())
}

fn same_elem(a: &RType, b: &RType) -> bool {
    match (as_array(a), as_array(b)) {
        (Some(a), Some(b)) => a.elem == b.elem,
        _ => false,
    }
}

/// An element callback `(T[, index[, receiver]]) => U`; returns `U`.
fn element_callback(cb: &RType, receiver: &RType) -> Option<RType> {
    let arr = as_array(receiver)?;
    let f = match cb {
        RType::Function(f) => f,
        _ => return None,
    };
    if f.params.is_empty() || f.params.len() > 3 {
        return None;
    }
    if !assignable(&arr.elem, &f.params[0]) {
        return None;
    }
    if f.params.len() >= 2 && !matches!(f.params[1], RType::Number) {
        return None;
    }
    Some((*f.ret).clone())
}

/// A two-argument comparator over the receiver's element type.
fn comparator(cb: &RType, receiver: &RType) -> bool {
    let Some(arr) = as_array(receiver) else {
        return false;
    };
    match cb {
        RType::Function(f) => {
            f.params.len() == 2
                && f.params.iter().all(|p| assignable(&arr.elem, p))
                && matches!(*f.ret, RType::Number)
        }
        _ => false,
    }
}

fn resolved(result: Refined) -> RuleOutcome {
    RuleOutcome::Resolved(Resolution::of(result))
}

fn rejected(errors: Vec<Diagnostic>) -> RuleOutcome {
    RuleOutcome::Rejected(errors)
}
