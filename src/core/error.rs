//! Error types for the pack analysis.
//!
//! Only structural failures surface as errors: an instruction whose kind
//! cannot be inferred, a pack that would produce itself, or an
//! instruction fed to the graph twice. Failures to *pack* are not errors;
//! they just leave the pack set smaller.

use thiserror::Error;

/// Fatal errors escaping a block analysis.
#[derive(Error, Debug)]
pub enum SlpError {
    #[error("unknown instruction kind: {inst}")]
    UnknownInstKind { inst: String },

    #[error("pack references itself: {pack}")]
    CyclicPack { pack: String },

    #[error("instruction {inst} is already owned by another pack node")]
    DuplicateInst { inst: String },
}

/// Result type alias for analysis operations.
pub type SlpResult<T> = Result<T, SlpError>;
