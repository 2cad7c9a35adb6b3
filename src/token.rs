//! Process-unique opaque identifier tokens.
//!
//! A [`Token`] stands in for an identifier whose final rendered name is not
//! known until compile time (e.g. a generated CTE alias). Identity, not the
//! human-readable hint, governs equality and alias assignment; two tokens
//! built from the same hint are still distinct handles.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// A process-unique identity paired with a safe, once-derived description.
#[derive(Clone, Debug)]
pub struct Token {
    id: u64,
    mangled: String,
}

impl Token {
    /// Mint a new token from a human-readable hint (e.g. `"user_rows"`).
    pub fn new(hint: impl AsRef<str>) -> Self {
        let id = NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed);
        Token {
            id,
            mangled: mangle(hint.as_ref()),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// The normalized, length-limited description derived from the hint.
    pub fn mangled(&self) -> &str {
        &self.mangled
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Token {}

impl std::hash::Hash for Token {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// `fooBar.baz!` -> `foo_bar_baz`, `` -> `local`, capped at 50 characters.
fn mangle(hint: &str) -> String {
    let mut underscored = String::with_capacity(hint.len() + 4);
    for c in hint.chars() {
        if c.is_ascii_uppercase() {
            underscored.push('_');
        }
        underscored.push(c);
    }

    let mut safe = String::with_capacity(underscored.len());
    for c in underscored.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            safe.push(c);
        } else {
            safe.push('_');
        }
    }

    let mut collapsed = String::with_capacity(safe.len());
    let mut prev_underscore = false;
    for c in safe.chars() {
        if c == '_' {
            if !prev_underscore {
                collapsed.push('_');
            }
            prev_underscore = true;
        } else {
            collapsed.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = collapsed.trim_matches('_').to_ascii_lowercase();
    let limited: String = trimmed.chars().take(50).collect();
    if limited.is_empty() {
        "local".to_string()
    } else {
        limited
    }
}
