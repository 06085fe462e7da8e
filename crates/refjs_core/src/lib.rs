//! refjs_core: The runtime value universe of the refjs semantic model.
//!
//! Provides the dynamically-tagged value representation, the heap of
//! container storage with mutability enforcement, and the ghost measures
//! that contracts and test oracles observe values through.

pub mod heap;
pub mod measures;
pub mod value;

// Re-export commonly used types
pub use heap::{ArrayData, Heap, HeapError, ObjectData, PropertySlot, SlotFlags};
pub use value::{ArrayId, ObjectId, Tag, Value};
