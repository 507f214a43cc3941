// SPDX-License-Identifier: Apache-2.0

/// Recoverable failures surfaced by translation and proving.
///
/// Broken IR invariants (e.g. looking up a node that was never translated)
/// are not represented here; those panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// A caller-supplied argument has the wrong shape, e.g. a predicate
    /// subject that is not bits-typed.
    InvalidArgument(String),
    /// The node kind has no encoding rule.
    Unimplemented(String),
    /// A literal value does not conform to its declared type.
    InvalidOperand(String),
    /// Z3 reported an error while the operation was in progress.
    Solver(String),
}

impl std::fmt::Display for TranslationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslationError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            TranslationError::Unimplemented(msg) => write!(f, "unimplemented: {}", msg),
            TranslationError::InvalidOperand(msg) => write!(f, "invalid operand: {}", msg),
            TranslationError::Solver(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TranslationError {}
