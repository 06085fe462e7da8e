//! Base-type assignability.
//!
//! A deliberately shallow relation: it is used by contract guards to check
//! arguments against declared parameter types, not to decide refinement
//! entailment (which is the back end's job).

use refjs_types::rtype::RType;

/// Whether a value of base type `src` may be supplied where `dst` is
/// expected.
pub fn assignable(src: &RType, dst: &RType) -> bool {
    if src == dst {
        return true;
    }
    match (src, dst) {
        (RType::Never, _) => true,
        (_, RType::Top) => true,
        // Literal singletons flow into their carrier.
        (RType::NumberLit(_), RType::Number) => true,
        (RType::StringLit(_), RType::String) => true,
        // The bit-vector view and the plain number view are the same tag.
        (RType::BitVec32, RType::Number) => true,
        (RType::Number | RType::NumberLit(_), RType::BitVec32) => true,
        // A union source requires every member to fit.
        (RType::Union(members), dst) => members.iter().all(|m| assignable(m, dst)),
        // A union target accepts any member.
        (src, RType::Union(members)) => members.iter().any(|m| assignable(src, m)),
        (RType::Array(a), RType::Array(b)) => {
            assignable(&a.elem, &b.elem)
                && assignable(&b.elem, &a.elem)
                && a.mutability.le(b.mutability)
        }
        (RType::Dict(a), RType::Dict(b)) => {
            a.mutability.le(b.mutability)
                && b.fields.iter().all(|(name, want)| {
                    a.fields
                        .get(name)
                        .map(|have| assignable(&have.ty, &want.ty))
                        .unwrap_or(want.optional)
                })
        }
        (RType::Instance(a), RType::Instance(b)) => a == b,
        (RType::Function(a), RType::Function(b)) => {
            a.params.len() == b.params.len()
                && a.params
                    .iter()
                    .zip(b.params.iter())
                    .all(|(pa, pb)| assignable(pb, pa))
                && assignable(&a.ret, &b.ret)
        }
        _ => false,
    }
}
