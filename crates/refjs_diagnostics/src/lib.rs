//! refjs_diagnostics: Diagnostic messages and error reporting infrastructure.
//!
//! Every static rejection the model can produce is a named message with a
//! stable code. A realized diagnostic optionally carries the name of the
//! contract whose guard or obligation was violated, so callers can see which
//! overload the decision came from.

use std::fmt;

/// Diagnostic category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    Warning,
    Error,
    Message,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCategory::Warning => write!(f, "warning"),
            DiagnosticCategory::Error => write!(f, "error"),
            DiagnosticCategory::Message => write!(f, "message"),
        }
    }
}

/// A diagnostic message template with a code and category.
#[derive(Debug, Clone)]
pub struct DiagnosticMessage {
    /// The diagnostic code (e.g. 5001).
    pub code: u32,
    /// The category of this diagnostic.
    pub category: DiagnosticCategory,
    /// The message template string. May contain `{0}`, `{1}`, etc. placeholders.
    pub message: &'static str,
}

/// A realized diagnostic with resolved message text.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// The resolved message text.
    pub message_text: String,
    /// The diagnostic code.
    pub code: u32,
    /// The category.
    pub category: DiagnosticCategory,
    /// The contract whose guard or obligation produced this diagnostic.
    pub contract: Option<String>,
    /// Related diagnostics.
    pub related_information: Vec<Diagnostic>,
}

impl Diagnostic {
    pub fn new(message: &DiagnosticMessage, args: &[&str]) -> Self {
        Self {
            message_text: format_message(message.message, args),
            code: message.code,
            category: message.category,
            contract: None,
            related_information: Vec::new(),
        }
    }

    /// Attach the name of the violated contract.
    pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = Some(contract.into());
        self
    }

    /// Add related diagnostic information.
    pub fn with_related(mut self, related: Diagnostic) -> Self {
        self.related_information.push(related);
        self
    }

    /// Whether this is an error diagnostic.
    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} RJ{}: {}", self.category, self.code, self.message_text)?;
        if let Some(ref contract) = self.contract {
            write!(f, " [{contract}]")?;
        }
        Ok(())
    }
}

/// Format a diagnostic message template by replacing `{0}`, `{1}`, etc. with arguments.
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut result = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{}}}", i), arg);
    }
    result
}

/// A collection of diagnostics accumulated during checking.
///
/// One expression may contribute several entries: every applicable rejection
/// is reported, not just the first.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollection {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollection {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.category == DiagnosticCategory::Error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.category == DiagnosticCategory::Error)
            .count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn extend(&mut self, other: DiagnosticCollection) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn extend_from_slice(&mut self, diagnostics: &[Diagnostic]) {
        self.diagnostics.extend_from_slice(diagnostics);
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }

    /// Codes of all accumulated diagnostics, in emission order.
    pub fn codes(&self) -> Vec<u32> {
        self.diagnostics.iter().map(|d| d.code).collect()
    }
}

// ============================================================================
// Diagnostic Messages - the static rejection taxonomy
// ============================================================================

pub mod messages {
    use super::*;

    macro_rules! diag {
        ($code:expr, Error, $msg:expr) => {
            DiagnosticMessage { code: $code, category: DiagnosticCategory::Error, message: $msg }
        };
        ($code:expr, Warning, $msg:expr) => {
            DiagnosticMessage { code: $code, category: DiagnosticCategory::Warning, message: $msg }
        };
        ($code:expr, Message, $msg:expr) => {
            DiagnosticMessage { code: $code, category: DiagnosticCategory::Message, message: $msg }
        };
    }

    // ========================================================================
    // Mutability errors (5000-5099)
    // ========================================================================
    pub const WRITE_TO_READ_ONLY: DiagnosticMessage = diag!(5001, Error, "Cannot write through a '{0}'-qualified binding.");
    pub const MUTABILITY_MISMATCH: DiagnosticMessage = diag!(5002, Error, "Mutability '{0}' cannot be widened to '{1}'.");
    pub const UNIQUE_REFERENCE_ALREADY_ALIASED: DiagnosticMessage = diag!(5003, Error, "Binding is no longer unique; a second reference to the same storage exists.");

    // ========================================================================
    // Contract resolution errors (5100-5199)
    // ========================================================================
    pub const NO_OPERATOR_CONTRACT: DiagnosticMessage = diag!(5101, Error, "Operator '{0}' cannot be applied to operands of type {1}.");
    pub const NO_METHOD_CONTRACT: DiagnosticMessage = diag!(5102, Error, "Method '{0}' cannot be applied to a receiver of type '{1}'.");
    pub const ARGUMENT_NOT_ASSIGNABLE: DiagnosticMessage = diag!(5103, Error, "Argument of type '{0}' is not assignable to parameter of type '{1}'.");

    // ========================================================================
    // Refinement violations (5200-5299)
    // ========================================================================
    pub const OUT_OF_BOUNDS: DiagnosticMessage = diag!(5201, Error, "Index {0} is outside the bounds of an immutable array of length {1}.");
    pub const DIVISION_BY_ZERO: DiagnosticMessage = diag!(5202, Error, "Divisor is provably zero.");
    pub const EMPTY_POP: DiagnosticMessage = diag!(5203, Error, "Cannot pop from an array that is provably empty.");
    pub const PROPERTY_NOT_PRESENT: DiagnosticMessage = diag!(5204, Error, "Property '{0}' does not exist on type '{1}'.");

    // ========================================================================
    // Nominal errors (5300-5399)
    // ========================================================================
    pub const UNKNOWN_CLASS: DiagnosticMessage = diag!(5301, Error, "Cannot find class '{0}'.");
    pub const FLAGS_SELECT_NO_VARIANT: DiagnosticMessage = diag!(5302, Error, "Flag word {0} selects no registered variant.");
    pub const FLAGS_AMBIGUOUS: DiagnosticMessage = diag!(5303, Error, "Flag word {0} selects more than one variant.");
}
