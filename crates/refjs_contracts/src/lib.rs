//! refjs_contracts: Operator and method contracts.
//!
//! Every built-in operation is specified as an ordered list of guarded
//! overload rules. Resolution walks the list; the first rule whose guard
//! accepts the operand types decides the outcome, which is either a refined
//! result type (possibly with proof obligations for a back end) or a set of
//! static rejections. A list with no matching rule is itself a rejection.

mod compat;
pub mod methods;
pub mod narrow;
pub mod op;
pub mod table;

// Re-export commonly used types
pub use compat::assignable;
pub use methods::{ContainerMethod, MethodTable};
pub use narrow::{narrow_by_truthiness, narrow_by_typeof};
pub use op::Op;
pub use table::{Obligation, OperatorTable, Resolution};
