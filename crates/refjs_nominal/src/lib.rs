//! refjs_nominal: The nominal layer of the semantic model.
//!
//! Classes form a single-inheritance hierarchy; interfaces attach to classes
//! and are inherited down the chain. The `extends_class` and
//! `extends_interface` measures observe a value's place in that hierarchy.
//! Flag-word variants map packed `u32` representations back to nominal
//! variants through a single registered conversion point.

pub mod class;
pub mod variant;

// Re-export commonly used types
pub use class::{ClassDef, ClassTable};
pub use variant::{FlagError, VariantDef, VariantTable};
