//! Flow-sensitive narrowing.
//!
//! Branching on a tag test or on truthiness refines the scrutinee's type in
//! each arm. Narrowing only prunes union members; it never invents new
//! refinements, so the original predicate still holds on the result.

use refjs_types::rtype::{RType, Refined};

/// Narrow by a `typeof x === "<tag>"` test. `assume_true` selects the
/// branch: the true branch keeps the members carrying the tag, the false
/// branch keeps the rest.
pub fn narrow_by_typeof(ty: &Refined, tag: &str, assume_true: bool) -> Refined {
    let kept: Vec<RType> = ty
        .base
        .members()
        .into_iter()
        .filter(|m| match m.runtime_tag() {
            Some(t) => (t == tag) == assume_true,
            // A member with an unknown tag can land in either branch.
            None => true,
        })
        .collect();
    rebuild(ty, kept)
}

/// Narrow by a truthiness test. The false branch drops members that are
/// never falsy (containers, instances); the true branch drops members that
/// are never truthy (undefined, null, falsy literal singletons).
pub fn narrow_by_truthiness(ty: &Refined, assume_true: bool) -> Refined {
    let kept: Vec<RType> = ty
        .base
        .members()
        .into_iter()
        .filter(|m| {
            if assume_true {
                can_be_truthy(m)
            } else {
                can_be_falsy(m)
            }
        })
        .collect();
    rebuild(ty, kept)
}

fn can_be_truthy(t: &RType) -> bool {
    match t {
        RType::Undefined | RType::Null => false,
        RType::NumberLit(n) => *n != 0.0,
        RType::StringLit(s) => !s.is_empty(),
        _ => true,
    }
}

fn can_be_falsy(t: &RType) -> bool {
    match t {
        RType::Array(_) | RType::Dict(_) | RType::Instance(_) | RType::Function(_) => false,
        RType::NumberLit(n) => *n == 0.0,
        RType::StringLit(s) => s.is_empty(),
        _ => true,
    }
}

fn rebuild(ty: &Refined, mut kept: Vec<RType>) -> Refined {
    let base = match kept.len() {
        0 => RType::Never,
        1 => kept.pop().unwrap(),
        _ => RType::Union(kept),
    };
    Refined::new(base, ty.pred.clone())
}
