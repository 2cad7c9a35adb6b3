//! The fragment tree (spec §3, Data Model).

use serde::{Deserialize, Serialize};

use crate::token::Token;
use crate::trust::Trust;

/// A scalar bound through a `$n` placeholder. Mirrors the teacher's
/// `SqlParam`, narrowed to the scalar set this crate actually needs:
/// string, finite number, boolean, null, or a nested ordered sequence of
/// scalars (for `= ANY($1)`-style array binds).
///
/// Derives `Serialize`/`Deserialize` like the teacher's `SqlParam` does.
/// These are the *extracted* bind values `compile()` hands to a driver, not
/// fragments, so serializing them carries no trust mark to strip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Scalar>),
}

/// One segment of an [`Fragment::Identifier`] node.
#[derive(Clone, Debug, PartialEq)]
pub enum IdentPart {
    /// Already escaped and double-quote-wrapped at construction time.
    Quoted(String),
    /// Resolved to a deterministic alias at compile time.
    Token(Token),
}

#[derive(Clone, Debug)]
pub(crate) enum Kind {
    Raw(String),
    Value(Scalar),
    Identifier(Vec<IdentPart>),
    Indent(Box<Fragment>),
    Parens { content: Box<Fragment>, force: bool },
    SymbolAlias(Token, Token),
    Placeholder {
        handle: Token,
        fallback: Option<Box<Fragment>>,
    },
    Query(Vec<Fragment>),
}

/// An immutable node in the composed SQL tree.
///
/// `Fragment` has no public constructor other than the functions in
/// [`crate::constructors`] (plus re-exports at the crate root). The only
/// way to build one is through a path that either validates or is
/// intrinsically safe (a raw string literal passed to `raw()`, a Rust
/// string/number/bool passed to `value()`, etc).
#[derive(Clone, Debug)]
pub struct Fragment {
    #[allow(dead_code)]
    trust: Trust,
    pub(crate) kind: Kind,
}

impl Fragment {
    pub(crate) fn new(kind: Kind) -> Self {
        Fragment {
            trust: Trust::mark(),
            kind,
        }
    }
}

/// Always `true` for any value of type `Fragment`: the type system is the
/// trust check. Kept as a named predicate so call sites that mirror the
/// original dynamically-typed guard ("is this actually a fragment?") have
/// something to call, and so a future dynamic entry point has an obvious
/// place to route through.
pub fn is_fragment(_value: &Fragment) -> bool {
    true
}

/// Pushes `frag` onto `out`, splicing in its children instead of itself
/// when `frag` is a `Query` node. This is what keeps invariant #3 (`Query`
/// never nests another `Query`) true no matter how fragments are combined.
pub(crate) fn flatten_into(frag: Fragment, out: &mut Vec<Fragment>) {
    match frag.kind {
        Kind::Query(nodes) => {
            for node in nodes {
                flatten_into(node, out);
            }
        }
        _ => out.push(frag),
    }
}

/// Builds a `Query` fragment from already-flat nodes (callers are
/// responsible for having flattened via [`flatten_into`] first).
pub(crate) fn query_from_nodes(nodes: Vec<Fragment>) -> Fragment {
    Fragment::new(Kind::Query(nodes))
}
