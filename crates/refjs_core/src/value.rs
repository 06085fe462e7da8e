//! Runtime values and their tags.

use std::fmt;

/// The runtime tag of a value, as reported by `typeof`.
///
/// There are exactly five observable tags. `null` reports `"object"`, and
/// bit-vector views of numbers report `"number"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Undefined,
    Object,
    Boolean,
    Number,
    String,
    Function,
}

impl Tag {
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Undefined => "undefined",
            Tag::Object => "object",
            Tag::Boolean => "boolean",
            Tag::Number => "number",
            Tag::String => "string",
            Tag::Function => "function",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to an object stored on the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u32);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to an array stored on the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayId(pub u32);

impl ArrayId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A runtime value.
///
/// Containers are represented by heap handles so that two bindings can
/// observably alias the same storage.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    /// A number carried in its 32-bit bit-vector view.
    BitVec32(u32),
    Str(String),
    Object(ObjectId),
    Array(ArrayId),
}

impl Value {
    /// The runtime tag. Total: every value has exactly one.
    pub fn tag(&self) -> Tag {
        match self {
            Value::Undefined => Tag::Undefined,
            // The historical quirk, preserved: null tags as "object".
            Value::Null => Tag::Object,
            Value::Bool(_) => Tag::Boolean,
            Value::Number(_) | Value::BitVec32(_) => Tag::Number,
            Value::Str(_) => Tag::String,
            Value::Object(_) | Value::Array(_) => Tag::Object,
        }
    }

    /// The truthiness measure. `undefined`, `null`, `false`, `0`, the empty
    /// string, and the all-zeroes bit-vector are falsy; containers are
    /// always truthy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::BitVec32(b) => *b != 0x0000_0000,
            Value::Str(s) => !s.is_empty(),
            Value::Object(_) | Value::Array(_) => true,
        }
    }

    pub fn falsy(&self) -> bool {
        !self.truthy()
    }

    /// Numeric view shared by `Number` and `BitVec32`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::BitVec32(b) => Some(*b as f64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_falsy_but_tags_as_object() {
        assert_eq!(Value::Null.tag(), Tag::Object);
        assert!(Value::Null.falsy());
    }

    #[test]
    fn truthiness_table() {
        assert!(Value::Str("x".into()).truthy());
        assert!(Value::Str(String::new()).falsy());
        assert!(Value::Number(1.0).truthy());
        assert!(Value::Number(0.0).falsy());
        assert!(Value::BitVec32(0x0000_0001).truthy());
        assert!(Value::BitVec32(0x0000_0000).falsy());
        assert!(Value::Undefined.falsy());
    }
}
