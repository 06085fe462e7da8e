//! Flag-word variants.
//!
//! Some values are nominally classified by a packed `u32` of flag bits
//! rather than a constructor. Each variant registers a mask; a flag word
//! selects the variant whose mask it intersects. Conversion between the
//! packed form and the nominal form goes through this table and nowhere
//! else, so the two classifications cannot drift apart.

use rustc_hash::FxHashMap;
use thiserror::Error;

/// A registered flag-word variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDef {
    pub name: String,
    pub mask: u32,
}

/// A fault in flag-word classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagError {
    #[error("flag word {flags:#010x} selects no registered variant")]
    NoVariant { flags: u32 },
    #[error("flag word {flags:#010x} selects both '{first}' and '{second}'")]
    Ambiguous {
        flags: u32,
        first: String,
        second: String,
    },
}

/// All registered variants, in registration order.
#[derive(Debug, Default)]
pub struct VariantTable {
    variants: Vec<VariantDef>,
    by_name: FxHashMap<String, usize>,
}

impl VariantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, mask: u32) {
        debug_assert!(mask != 0, "a variant mask must select at least one bit");
        self.by_name.insert(name.to_owned(), self.variants.len());
        self.variants.push(VariantDef {
            name: name.to_owned(),
            mask,
        });
    }

    pub fn mask_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).map(|&i| self.variants[i].mask)
    }

    /// Classify a flag word. Exactly one variant must match; zero or
    /// several matches are faults, never a silent pick.
    pub fn variant_of_flags(&self, flags: u32) -> Result<&VariantDef, FlagError> {
        let mut found: Option<&VariantDef> = None;
        for v in &self.variants {
            if flags & v.mask != 0 {
                match found {
                    None => found = Some(v),
                    Some(first) => {
                        return Err(FlagError::Ambiguous {
                            flags,
                            first: first.name.clone(),
                            second: v.name.clone(),
                        })
                    }
                }
            }
        }
        found.ok_or(FlagError::NoVariant { flags })
    }

    /// The correspondence law: the named variant matches the flag word
    /// exactly when the word intersects the variant's mask.
    pub fn corresponds(&self, name: &str, flags: u32) -> bool {
        match self.mask_of(name) {
            Some(mask) => flags & mask != 0,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitflags::bitflags;

    bitflags! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        struct Kind: u32 {
            const SCALAR = 1 << 0;
            const VECTOR = 1 << 1;
            const RECORD = 1 << 2;
        }
    }

    fn sample() -> VariantTable {
        let mut variants = VariantTable::new();
        variants.register("scalar", Kind::SCALAR.bits());
        variants.register("vector", Kind::VECTOR.bits());
        variants.register("record", Kind::RECORD.bits());
        variants
    }

    #[test]
    fn each_flag_word_selects_its_variant() {
        let variants = sample();
        let v = variants.variant_of_flags(Kind::VECTOR.bits()).unwrap();
        assert_eq!(v.name, "vector");
    }

    #[test]
    fn zero_matches_is_a_fault() {
        let variants = sample();
        assert_eq!(
            variants.variant_of_flags(1 << 7),
            Err(FlagError::NoVariant { flags: 1 << 7 })
        );
    }

    #[test]
    fn overlapping_matches_are_a_fault_not_a_silent_pick() {
        let variants = sample();
        let both = (Kind::SCALAR | Kind::RECORD).bits();
        assert_eq!(
            variants.variant_of_flags(both),
            Err(FlagError::Ambiguous {
                flags: both,
                first: "scalar".into(),
                second: "record".into(),
            })
        );
    }

    #[test]
    fn correspondence_holds_both_ways() {
        let variants = sample();
        assert!(variants.corresponds("scalar", Kind::SCALAR.bits()));
        assert!(!variants.corresponds("scalar", Kind::VECTOR.bits()));
        assert!(!variants.corresponds("missing", Kind::SCALAR.bits()));
    }
}
