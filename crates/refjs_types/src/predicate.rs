//! The predicate language of refinement annotations.
//!
//! Predicates talk about values through ghost measures (`len`, `ttag`,
//! `Prop`, property measures) and never execute at runtime. The binder `v`
//! names the value being refined; `x0, x1, ...` name the operands of the
//! contract the predicate belongs to.

use std::fmt;

/// A first-order term over the value universe.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// The refinement binder `v`.
    Value,
    /// The i-th operand of the enclosing contract.
    Operand(usize),
    Num(f64),
    Str(String),
    Bool(bool),
    /// A 32-bit bit-vector constant.
    Bv(u32),
    /// `len t` for a container-valued term.
    Len(Box<Term>),
    /// `ttag t`, the runtime tag of a value as a string.
    Ttag(Box<Term>),
    /// `offset(t, "f")`, projection of a stored field.
    Offset(Box<Term>, String),
    Add(Box<Term>, Box<Term>),
    Sub(Box<Term>, Box<Term>),
    Mul(Box<Term>, Box<Term>),
    BvAnd(Box<Term>, Box<Term>),
    BvOr(Box<Term>, Box<Term>),
}

impl Term {
    pub fn v() -> Term {
        Term::Value
    }

    pub fn op(i: usize) -> Term {
        Term::Operand(i)
    }

    pub fn num(n: f64) -> Term {
        Term::Num(n)
    }

    pub fn str(s: impl Into<String>) -> Term {
        Term::Str(s.into())
    }

    pub fn len(t: Term) -> Term {
        Term::Len(Box::new(t))
    }

    pub fn ttag(t: Term) -> Term {
        Term::Ttag(Box::new(t))
    }

    pub fn offset(t: Term, field: impl Into<String>) -> Term {
        Term::Offset(Box::new(t), field.into())
    }

    pub fn add(a: Term, b: Term) -> Term {
        Term::Add(Box::new(a), Box::new(b))
    }

    pub fn sub(a: Term, b: Term) -> Term {
        Term::Sub(Box::new(a), Box::new(b))
    }

    pub fn mul(a: Term, b: Term) -> Term {
        Term::Mul(Box::new(a), Box::new(b))
    }

    pub fn bv_and(a: Term, b: Term) -> Term {
        Term::BvAnd(Box::new(a), Box::new(b))
    }

    pub fn bv_or(a: Term, b: Term) -> Term {
        Term::BvOr(Box::new(a), Box::new(b))
    }
}

/// A refinement predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Pred {
    True,
    False,
    /// `Prop t`: the truthiness measure.
    Prop(Term),
    Not(Box<Pred>),
    And(Vec<Pred>),
    Or(Vec<Pred>),
    Implies(Box<Pred>, Box<Pred>),
    Iff(Box<Pred>, Box<Pred>),
    /// `if c then p else q`, branching on another predicate.
    Ite(Box<Pred>, Box<Pred>, Box<Pred>),
    Eq(Term, Term),
    Ne(Term, Term),
    Lt(Term, Term),
    Le(Term, Term),
    /// `a ~~ b`: both sides evaluate to the very same runtime value.
    Alias(Term, Term),
    /// `hasProperty(name, o)`: `name` resolves on `o`, own or inherited.
    HasProperty(Term, Term),
    /// `hasDirectProperty(name, o)`: `name` is stored on `o` itself.
    HasDirectProperty(Term, Term),
    /// `enumProp(name, o)`: `name` is visited by for-in enumeration of `o`.
    EnumProp(Term, Term),
    /// The value is an instance of the named class or one of its subclasses.
    ExtendsClass(Term, String),
    /// The value's class (transitively) implements the named interface.
    ExtendsInterface(Term, String),
}

impl Pred {
    pub fn not(p: Pred) -> Pred {
        Pred::Not(Box::new(p))
    }

    pub fn and(ps: Vec<Pred>) -> Pred {
        Pred::And(ps)
    }

    pub fn or(ps: Vec<Pred>) -> Pred {
        Pred::Or(ps)
    }

    pub fn implies(a: Pred, b: Pred) -> Pred {
        Pred::Implies(Box::new(a), Box::new(b))
    }

    pub fn iff(a: Pred, b: Pred) -> Pred {
        Pred::Iff(Box::new(a), Box::new(b))
    }

    pub fn ite(c: Pred, t: Pred, e: Pred) -> Pred {
        Pred::Ite(Box::new(c), Box::new(t), Box::new(e))
    }

    /// `Prop v`, the truthiness of the refined value itself.
    pub fn prop_v() -> Pred {
        Pred::Prop(Term::Value)
    }

    /// The bounds qualifier `0 <= index && index < len array`.
    pub fn in_bounds(index: Term, array: Term) -> Pred {
        Pred::And(vec![
            Pred::Le(Term::num(0.0), index.clone()),
            Pred::Lt(index, Term::len(array)),
        ])
    }

    /// The zero-comparison qualifier `0 <= t`.
    pub fn nonneg(t: Term) -> Pred {
        Pred::Le(Term::num(0.0), t)
    }

    /// The tag qualifier `ttag t = "<tag>"`.
    pub fn has_tag(t: Term, tag: impl Into<String>) -> Pred {
        Pred::Eq(Term::ttag(t), Term::str(tag))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Value => f.write_str("v"),
            Term::Operand(i) => write!(f, "x{i}"),
            Term::Num(n) => write!(f, "{n}"),
            Term::Str(s) => write!(f, "{s:?}"),
            Term::Bool(b) => write!(f, "{b}"),
            Term::Bv(b) => write!(f, "{b:#010x}"),
            Term::Len(t) => write!(f, "len({t})"),
            Term::Ttag(t) => write!(f, "ttag({t})"),
            Term::Offset(t, field) => write!(f, "offset({t}, {field:?})"),
            Term::Add(a, b) => write!(f, "({a} + {b})"),
            Term::Sub(a, b) => write!(f, "({a} - {b})"),
            Term::Mul(a, b) => write!(f, "({a} * {b})"),
            Term::BvAnd(a, b) => write!(f, "bvand({a}, {b})"),
            Term::BvOr(a, b) => write!(f, "bvor({a}, {b})"),
        }
    }
}

impl fmt::Display for Pred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pred::True => f.write_str("true"),
            Pred::False => f.write_str("false"),
            Pred::Prop(t) => write!(f, "Prop({t})"),
            Pred::Not(p) => write!(f, "!({p})"),
            Pred::And(ps) => write_joined(f, ps, " && "),
            Pred::Or(ps) => write_joined(f, ps, " || "),
            Pred::Implies(a, b) => write!(f, "({a} => {b})"),
            Pred::Iff(a, b) => write!(f, "({a} <=> {b})"),
            Pred::Ite(c, t, e) => write!(f, "(if {c} then {t} else {e})"),
            Pred::Eq(a, b) => write!(f, "{a} = {b}"),
            Pred::Ne(a, b) => write!(f, "{a} != {b}"),
            Pred::Lt(a, b) => write!(f, "{a} < {b}"),
            Pred::Le(a, b) => write!(f, "{a} <= {b}"),
            Pred::Alias(a, b) => write!(f, "{a} ~~ {b}"),
            Pred::HasProperty(n, o) => write!(f, "hasProperty({n}, {o})"),
            Pred::HasDirectProperty(n, o) => write!(f, "hasDirectProperty({n}, {o})"),
            Pred::EnumProp(n, o) => write!(f, "enumProp({n}, {o})"),
            Pred::ExtendsClass(t, c) => write!(f, "extends_class({t}, {c:?})"),
            Pred::ExtendsInterface(t, i) => write!(f, "extends_interface({t}, {i:?})"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, ps: &[Pred], sep: &str) -> fmt::Result {
    if ps.is_empty() {
        return f.write_str("true");
    }
    f.write_str("(")?;
    for (i, p) in ps.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{p}")?;
    }
    f.write_str(")")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_qualifier_shape() {
        let p = Pred::in_bounds(Term::op(1), Term::op(0));
        assert_eq!(
            p,
            Pred::And(vec![
                Pred::Le(Term::num(0.0), Term::op(1)),
                Pred::Lt(Term::op(1), Term::len(Term::op(0))),
            ])
        );
    }

    #[test]
    fn display_reads_like_an_annotation() {
        let p = Pred::iff(
            Pred::prop_v(),
            Pred::Lt(Term::op(0), Term::len(Term::op(1))),
        );
        assert_eq!(p.to_string(), "(Prop(v) <=> x0 < len(x1))");
    }
}
