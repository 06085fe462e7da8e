//! The built-in operations covered by the contract table.

use std::fmt;

/// A built-in operator or expression form.
///
/// Name-bearing forms (property writes, `instanceof` against a class name)
/// receive the name as a string-literal operand, so every operation resolves
/// uniformly through an operand list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    // Comparisons
    Lt,
    LtEq,
    Gt,
    GtEq,
    StrictEq,
    StrictNeq,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    PrefixPlus,
    PrefixMinus,
    // Logic
    LogicalAnd,
    LogicalOr,
    LogicalNot,
    // Bit-vector views
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    // Tag and nominal observations
    Typeof,
    Instanceof,
    In,
    IsNan,
    // Container and control forms
    BracketRef,
    BracketAssign,
    SetProp,
    ArrayLiteral,
    ForInKeys,
    Conditional,
    Cast,
    Truthy,
    Falsy,
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Lt => "<",
            Op::LtEq => "<=",
            Op::Gt => ">",
            Op::GtEq => ">=",
            Op::StrictEq => "===",
            Op::StrictNeq => "!==",
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Mod => "%",
            Op::PrefixPlus => "+x",
            Op::PrefixMinus => "-x",
            Op::LogicalAnd => "&&",
            Op::LogicalOr => "||",
            Op::LogicalNot => "!",
            Op::BitAnd => "&",
            Op::BitOr => "|",
            Op::BitXor => "^",
            Op::BitNot => "~",
            Op::LeftShift => "<<",
            Op::RightShift => ">>",
            Op::UnsignedRightShift => ">>>",
            Op::Typeof => "typeof",
            Op::Instanceof => "instanceof",
            Op::In => "in",
            Op::IsNan => "isNaN",
            Op::BracketRef => "[]",
            Op::BracketAssign => "[]=",
            Op::SetProp => ".=",
            Op::ArrayLiteral => "[...]",
            Op::ForInKeys => "for-in",
            Op::Conditional => "?:",
            Op::Cast => "cast",
            Op::Truthy => "truthy",
            Op::Falsy => "falsy",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
