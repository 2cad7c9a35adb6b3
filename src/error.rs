//! Error types (spec §7).

use thiserror::Error;

pub type FragmentResult<T> = Result<T, FragmentError>;

/// Every way a fragment construction or compilation can fail.
///
/// `UnknownNode` ("exhaustiveness failure" in the original design) has no
/// variant here: the fragment tree is a closed Rust `enum`, so the compiler
/// rejects any arm that doesn't cover every case, so the failure mode simply
/// cannot occur at runtime.
///
/// `InvalidFragment` is kept for parity with spec §7 but is likewise never
/// constructed by this crate: every entry point that would need it takes a
/// `Fragment` (or `Vec<Fragment>`) by type, so the compiler rejects a
/// non-fragment argument before this code ever runs, in place of the
/// dynamically-typed source's runtime `isFragment` guard.
#[derive(Debug, Error, PartialEq)]
pub enum FragmentError {
    #[error("invalid fragment at {position}: expected a trusted Fragment value")]
    InvalidFragment { position: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("identifier() requires at least one part")]
    EmptyIdentifier,

    #[error("query would require {count} parameters, exceeding the 65535-parameter wire protocol limit")]
    TooManyParameters { count: usize },

    #[error("placeholder has no bound value and no fallback")]
    UnresolvedPlaceholder,

    #[error("symbolAlias: tokens already have differing aliases")]
    ConflictingSymbolAlias,

    #[error("parens() cannot wrap an empty fragment")]
    EmptyParens,

    #[error("symbol substitution chain exceeded {limit} hops (possible cycle)")]
    SubstitutionCycle { limit: usize },

    #[error("symbol substitution maps a token to itself")]
    SelfSubstitution,
}

impl FragmentError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        FragmentError::InvalidArgument {
            message: message.into(),
        }
    }
}
