//! refjs_types: Type-level representation for the refjs semantic model.
//!
//! Provides the mutability-qualifier lattice, the base type language for a
//! dynamically-tagged value universe, and the predicate language used by
//! refinement annotations on those types.

pub mod mutability;
pub mod predicate;
pub mod rtype;

// Re-export commonly used types
pub use mutability::{Mutability, MutabilityError};
pub use predicate::{Pred, Term};
pub use rtype::{ArrayType, DictType, FieldType, FunctionType, RType, Refined};
