//! Base types and refined types.
//!
//! The base language covers the dynamically-tagged value universe: the five
//! runtime tags, literal singletons, the 32-bit bit-vector view of numbers,
//! containers with a mutability qualifier, nominal instances, and unions. A
//! `Refined` pairs a base type with a predicate over the binder `v`.

use indexmap::IndexMap;

use crate::mutability::Mutability;
use crate::predicate::Pred;

/// A base type.
#[derive(Debug, Clone, PartialEq)]
pub enum RType {
    /// Every value. The top of the subtyping order.
    Top,
    /// No value. Produced by narrowing a union down to nothing.
    Never,
    Undefined,
    Null,
    Boolean,
    Number,
    /// A numeric literal singleton.
    NumberLit(f64),
    String,
    /// A string literal singleton.
    StringLit(String),
    /// A number viewed as a 32-bit bit-vector.
    BitVec32,
    Array(ArrayType),
    Dict(DictType),
    Function(FunctionType),
    /// An instance of the named class.
    Instance(String),
    Union(Vec<RType>),
}

/// `Array<M, T>`, a homogeneous container with a qualifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    pub mutability: Mutability,
    pub elem: Box<RType>,
    /// Statically tracked length. Only stable across operations when the
    /// qualifier is `Immutable` or the reference is still unique.
    pub known_len: Option<u64>,
}

/// A string-keyed record with per-field qualifiers and an optional index
/// signature for the dynamic part.
#[derive(Debug, Clone, PartialEq)]
pub struct DictType {
    pub mutability: Mutability,
    pub fields: IndexMap<String, FieldType>,
    pub index: Option<Box<RType>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldType {
    pub ty: RType,
    pub mutability: Mutability,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub params: Vec<RType>,
    pub ret: Box<RType>,
}

impl RType {
    pub fn array(mutability: Mutability, elem: RType) -> RType {
        RType::Array(ArrayType {
            mutability,
            elem: Box::new(elem),
            known_len: None,
        })
    }

    /// An `Immutable` array with a statically known length.
    pub fn iarray(elem: RType, len: u64) -> RType {
        RType::Array(ArrayType {
            mutability: Mutability::Immutable,
            elem: Box::new(elem),
            known_len: Some(len),
        })
    }

    pub fn function(params: Vec<RType>, ret: RType) -> RType {
        RType::Function(FunctionType {
            params,
            ret: Box::new(ret),
        })
    }

    /// The union of two types, flattened and deduplicated.
    pub fn union2(a: RType, b: RType) -> RType {
        if a == b {
            return a;
        }
        let mut members = Vec::new();
        let push = |t: RType, members: &mut Vec<RType>| {
            if !members.contains(&t) {
                members.push(t);
            }
        };
        for t in [a, b] {
            match t {
                RType::Union(ts) => {
                    for t in ts {
                        push(t, &mut members);
                    }
                }
                RType::Never => {}
                t => push(t, &mut members),
            }
        }
        match members.len() {
            0 => RType::Never,
            1 => members.pop().unwrap(),
            _ => RType::Union(members),
        }
    }

    /// The members of this type viewed as a union.
    pub fn members(&self) -> Vec<RType> {
        match self {
            RType::Union(ts) => ts.clone(),
            t => vec![t.clone()],
        }
    }

    pub fn contains_undefined(&self) -> bool {
        match self {
            RType::Undefined => true,
            RType::Union(ts) => ts.iter().any(|t| *t == RType::Undefined),
            _ => false,
        }
    }

    /// The runtime tag of every inhabitant, when all inhabitants share one.
    pub fn runtime_tag(&self) -> Option<&'static str> {
        match self {
            RType::Top | RType::Never => None,
            RType::Undefined => Some("undefined"),
            // null carries the "object" tag.
            RType::Null => Some("object"),
            RType::Boolean => Some("boolean"),
            RType::Number | RType::NumberLit(_) | RType::BitVec32 => Some("number"),
            RType::String | RType::StringLit(_) => Some("string"),
            RType::Array(_) | RType::Dict(_) | RType::Instance(_) => Some("object"),
            RType::Function(_) => Some("function"),
            RType::Union(ts) => {
                let mut tag = None;
                for t in ts {
                    match (tag, t.runtime_tag()?) {
                        (None, t) => tag = Some(t),
                        (Some(a), b) if a == b => {}
                        _ => return None,
                    }
                }
                tag
            }
        }
    }

    /// Drop literal singletons up to their carrier type.
    pub fn widen_literal(&self) -> RType {
        match self {
            RType::NumberLit(_) => RType::Number,
            RType::StringLit(_) => RType::String,
            t => t.clone(),
        }
    }

    /// A human-readable rendering for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            RType::Top => "top".into(),
            RType::Never => "never".into(),
            RType::Undefined => "undefined".into(),
            RType::Null => "null".into(),
            RType::Boolean => "boolean".into(),
            RType::Number => "number".into(),
            RType::NumberLit(n) => format!("{n}"),
            RType::String => "string".into(),
            RType::StringLit(s) => format!("{s:?}"),
            RType::BitVec32 => "bitvector32".into(),
            RType::Array(a) => format!("Array<{}, {}>", a.mutability, a.elem.describe()),
            RType::Dict(d) => {
                let fields: Vec<String> = d
                    .fields
                    .iter()
                    .map(|(name, f)| {
                        format!(
                            "{name}{}: {}",
                            if f.optional { "?" } else { "" },
                            f.ty.describe()
                        )
                    })
                    .collect();
                format!("{{ {} }}", fields.join(", "))
            }
            RType::Function(f) => {
                let params: Vec<String> = f.params.iter().map(|p| p.describe()).collect();
                format!("({}) => {}", params.join(", "), f.ret.describe())
            }
            RType::Instance(name) => name.clone(),
            RType::Union(ts) => {
                let members: Vec<String> = ts.iter().map(|t| t.describe()).collect();
                members.join(" + ")
            }
        }
    }
}

/// A base type together with a refinement over the binder `v`.
#[derive(Debug, Clone, PartialEq)]
pub struct Refined {
    pub base: RType,
    pub pred: Pred,
}

impl Refined {
    pub fn new(base: RType, pred: Pred) -> Refined {
        Refined { base, pred }
    }

    /// The trivially refined type `{ base | true }`.
    pub fn trivial(base: RType) -> Refined {
        Refined {
            base,
            pred: Pred::True,
        }
    }
}
