//! The mutability-qualifier lattice.
//!
//! Qualifiers are static capabilities attached to container bindings, not
//! runtime state: a value on the heap is just a value, and the qualifier
//! controls which operations the binding that reaches it permits. The order
//! is `UniqueMutable <= Mutable <= ReadOnly` and `Immutable <= ReadOnly`;
//! `Mutable` and `Immutable` are incomparable.

use std::fmt;
use thiserror::Error;

/// A mutability qualifier on a container binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutability {
    /// Read capability only. The binding cannot write, but other bindings to
    /// the same storage may; nothing about stability can be assumed.
    ReadOnly,
    /// No writer exists anywhere for the lifetime of the binding. Measures
    /// over the container (such as `len`) are stable.
    Immutable,
    /// Writable and freely aliasable.
    Mutable,
    /// Writable with a single live reference. Uniqueness is what makes
    /// strong updates sound.
    UniqueMutable,
    /// Generic placeholder standing for an arbitrary qualifier. Used where a
    /// contract is polymorphic over the receiver's mutability.
    AnyMutability,
}

impl Mutability {
    /// The partial order on qualifiers: `self <= other` means a binding with
    /// qualifier `self` may be supplied where `other` is expected.
    pub fn le(self, other: Mutability) -> bool {
        use Mutability::*;
        match (self, other) {
            (a, b) if a == b => true,
            // Everything provides at least read access.
            (_, ReadOnly) => true,
            // The placeholder is instantiable by any qualifier.
            (_, AnyMutability) => true,
            (UniqueMutable, Mutable) => true,
            _ => false,
        }
    }

    /// Every qualifier grants read access.
    pub fn can_read(self) -> bool {
        true
    }

    /// Only the two mutable qualifiers grant write access.
    pub fn can_write(self) -> bool {
        matches!(self, Mutability::Mutable | Mutability::UniqueMutable)
    }

    /// Whether additional bindings to the same storage may be created
    /// without forfeiting anything.
    pub fn can_alias(self) -> bool {
        !matches!(self, Mutability::UniqueMutable)
    }

    /// The qualifier after an aliasing event. Unique ownership is forfeited;
    /// every other qualifier is unaffected.
    pub fn aliased(self) -> Mutability {
        if self == Mutability::UniqueMutable {
            Mutability::Mutable
        } else {
            self
        }
    }

    /// Widen along the lattice. Fails when `target` is not above `self`,
    /// e.g. `Immutable` to `Mutable` or `ReadOnly` back down to anything.
    pub fn widen(self, target: Mutability) -> Result<Mutability, MutabilityError> {
        if self.le(target) {
            Ok(target)
        } else {
            Err(MutabilityError::Mismatch {
                from: self,
                to: target,
            })
        }
    }

    /// Permanently seal a container. Allowed from the writable qualifiers
    /// (the last writer gives up its capability) and idempotent on
    /// `Immutable`; a `ReadOnly` binding has no authority to freeze.
    pub fn frozen(self) -> Result<Mutability, MutabilityError> {
        match self {
            Mutability::Mutable | Mutability::UniqueMutable | Mutability::Immutable => {
                Ok(Mutability::Immutable)
            }
            other => Err(MutabilityError::Mismatch {
                from: other,
                to: Mutability::Immutable,
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mutability::ReadOnly => "ReadOnly",
            Mutability::Immutable => "Immutable",
            Mutability::Mutable => "Mutable",
            Mutability::UniqueMutable => "UniqueMutable",
            Mutability::AnyMutability => "AnyMutability",
        }
    }
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised when a qualifier conversion is not admitted by the lattice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutabilityError {
    #[error("mutability '{from}' cannot be widened to '{to}'")]
    Mismatch { from: Mutability, to: Mutability },
}

#[cfg(test)]
mod tests {
    use super::*;
    use Mutability::*;

    #[test]
    fn order_is_reflexive() {
        for q in [ReadOnly, Immutable, Mutable, UniqueMutable, AnyMutability] {
            assert!(q.le(q), "{q} should be <= itself");
        }
    }

    #[test]
    fn unique_below_mutable_below_read_only() {
        assert!(UniqueMutable.le(Mutable));
        assert!(Mutable.le(ReadOnly));
        assert!(UniqueMutable.le(ReadOnly));
        assert!(!Mutable.le(UniqueMutable));
        assert!(!ReadOnly.le(Mutable));
    }

    #[test]
    fn immutable_and_mutable_are_incomparable() {
        assert!(Immutable.le(ReadOnly));
        assert!(!Immutable.le(Mutable));
        assert!(!Mutable.le(Immutable));
        assert!(!Immutable.le(UniqueMutable));
    }

    #[test]
    fn write_capability() {
        assert!(Mutable.can_write());
        assert!(UniqueMutable.can_write());
        assert!(!Immutable.can_write());
        assert!(!ReadOnly.can_write());
    }

    #[test]
    fn aliasing_forfeits_uniqueness() {
        assert_eq!(UniqueMutable.aliased(), Mutable);
        assert_eq!(Mutable.aliased(), Mutable);
        assert_eq!(Immutable.aliased(), Immutable);
    }

    #[test]
    fn widening_follows_the_lattice() {
        assert_eq!(UniqueMutable.widen(ReadOnly), Ok(ReadOnly));
        assert_eq!(Immutable.widen(ReadOnly), Ok(ReadOnly));
        assert!(Immutable.widen(Mutable).is_err());
        assert!(ReadOnly.widen(Mutable).is_err());
    }

    #[test]
    fn freezing_is_one_way() {
        assert_eq!(Mutable.frozen(), Ok(Immutable));
        assert_eq!(UniqueMutable.frozen(), Ok(Immutable));
        assert_eq!(Immutable.frozen(), Ok(Immutable));
        assert!(ReadOnly.frozen().is_err());
        assert!(Immutable.widen(UniqueMutable).is_err());
    }
}
