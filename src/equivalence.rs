//! Structural equivalence over fragments (spec §4.5).

use std::collections::HashMap;

use crate::error::{FragmentError, FragmentResult};
use crate::node::{Fragment, IdentPart, Kind};
use crate::token::Token;

const MAX_SUBSTITUTION_HOPS: usize = 1000;

/// Returns true iff `a` and `b` denote the same fragment, up to a mapping
/// that treats one opaque token as identical to another.
///
/// `substitutions` is consulted asymmetrically: a token encountered while
/// walking `a` is resolved through the map (if present) before being
/// compared against the corresponding token in `b`; `b`'s tokens are never
/// looked up directly. This matches spec §4.5: "if it maps a → x, then a is
/// equivalent to x only."
pub fn is_equivalent(
    a: &Fragment,
    b: &Fragment,
    substitutions: &HashMap<Token, Token>,
) -> FragmentResult<bool> {
    equiv(a, b, substitutions)
}

fn resolve_chain(start: &Token, subs: &HashMap<Token, Token>) -> FragmentResult<Token> {
    let mut current = start.clone();
    for _ in 0..MAX_SUBSTITUTION_HOPS {
        match subs.get(&current) {
            None => return Ok(current),
            Some(next) => {
                if *next == current {
                    return Err(FragmentError::SelfSubstitution);
                }
                current = next.clone();
            }
        }
    }
    Err(FragmentError::SubstitutionCycle {
        limit: MAX_SUBSTITUTION_HOPS,
    })
}

fn tokens_equivalent(
    from_a: &Token,
    from_b: &Token,
    subs: &HashMap<Token, Token>,
) -> FragmentResult<bool> {
    if subs.contains_key(from_a) {
        let resolved = resolve_chain(from_a, subs)?;
        return Ok(resolved == *from_b);
    }
    if from_a == from_b {
        return Ok(true);
    }
    Ok(false)
}

fn equiv(a: &Fragment, b: &Fragment, subs: &HashMap<Token, Token>) -> FragmentResult<bool> {
    match (&a.kind, &b.kind) {
        (Kind::Raw(x), Kind::Raw(y)) => Ok(x == y),
        (Kind::Value(x), Kind::Value(y)) => Ok(x == y),
        (Kind::Indent(x), Kind::Indent(y)) => equiv(x, y, subs),
        (
            Kind::Parens {
                content: xc,
                force: xf,
            },
            Kind::Parens {
                content: yc,
                force: yf,
            },
        ) => {
            if xf != yf {
                return Ok(false);
            }
            equiv(xc, yc, subs)
        }
        (Kind::Identifier(xp), Kind::Identifier(yp)) => {
            if xp.len() != yp.len() {
                return Ok(false);
            }
            for (pa, pb) in xp.iter().zip(yp.iter()) {
                match (pa, pb) {
                    (IdentPart::Quoted(sa), IdentPart::Quoted(sb)) => {
                        if sa != sb {
                            return Ok(false);
                        }
                    }
                    (IdentPart::Token(ta), IdentPart::Token(tb)) => {
                        if ta.mangled() != tb.mangled() {
                            return Ok(false);
                        }
                        if !tokens_equivalent(ta, tb, subs)? {
                            return Ok(false);
                        }
                    }
                    _ => return Ok(false),
                }
            }
            Ok(true)
        }
        (Kind::Placeholder { handle: ha, .. }, Kind::Placeholder { handle: hb, .. }) => {
            tokens_equivalent(ha, hb, subs)
        }
        (Kind::SymbolAlias(..), _) | (_, Kind::SymbolAlias(..)) => Ok(false),
        (Kind::Query(xs), Kind::Query(ys)) => {
            if xs.len() != ys.len() {
                return Ok(false);
            }
            for (xa, yb) in xs.iter().zip(ys.iter()) {
                if !equiv(xa, yb, subs)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}
