//! The symbol rewriter (spec §4.6).

use crate::node::{Fragment, IdentPart, Kind};
use crate::token::Token;

/// Returns a new fragment with every occurrence of `needle` replaced by
/// `replacement`. `Raw` and `Value` nodes are returned unchanged (they
/// carry no token). Subtrees with no occurrence beneath them are cloned
/// back unchanged rather than rebuilt. This crate has no `Rc`-style
/// shared pointers to preserve the identity of, so "unchanged" means
/// value-equal, not pointer-equal.
pub fn replace_symbol(fragment: &Fragment, needle: &Token, replacement: &Token) -> Fragment {
    rewrite(fragment, needle, replacement).unwrap_or_else(|| fragment.clone())
}

fn rewrite(fragment: &Fragment, needle: &Token, replacement: &Token) -> Option<Fragment> {
    match &fragment.kind {
        Kind::Raw(_) | Kind::Value(_) => None,
        Kind::Identifier(parts) => {
            let mut changed = false;
            let new_parts: Vec<IdentPart> = parts
                .iter()
                .map(|part| match part {
                    IdentPart::Token(t) if t == needle => {
                        changed = true;
                        IdentPart::Token(replacement.clone())
                    }
                    other => other.clone(),
                })
                .collect();
            changed.then(|| Fragment::new(Kind::Identifier(new_parts)))
        }
        Kind::Indent(inner) => rewrite(inner, needle, replacement)
            .map(|new_inner| Fragment::new(Kind::Indent(Box::new(new_inner)))),
        Kind::Parens { content, force } => rewrite(content, needle, replacement)
            .map(|new_content| Fragment::new(Kind::Parens {
                content: Box::new(new_content),
                force: *force,
            })),
        Kind::SymbolAlias(a, b) => {
            let new_a = (a == needle).then(|| replacement.clone());
            let new_b = (b == needle).then(|| replacement.clone());
            if new_a.is_none() && new_b.is_none() {
                return None;
            }
            Some(Fragment::new(Kind::SymbolAlias(
                new_a.unwrap_or_else(|| a.clone()),
                new_b.unwrap_or_else(|| b.clone()),
            )))
        }
        Kind::Placeholder { handle, fallback } => {
            let new_handle = (handle == needle).then(|| replacement.clone());
            let new_fallback = fallback
                .as_ref()
                .and_then(|fb| rewrite(fb, needle, replacement));

            if new_handle.is_none() && new_fallback.is_none() {
                return None;
            }

            Some(Fragment::new(Kind::Placeholder {
                handle: new_handle.unwrap_or_else(|| handle.clone()),
                fallback: new_fallback
                    .map(Box::new)
                    .or_else(|| fallback.clone()),
            }))
        }
        Kind::Query(nodes) => {
            let mut changed = false;
            let new_nodes: Vec<Fragment> = nodes
                .iter()
                .map(|node| match rewrite(node, needle, replacement) {
                    Some(new_node) => {
                        changed = true;
                        new_node
                    }
                    None => node.clone(),
                })
                .collect();
            changed.then(|| Fragment::new(Kind::Query(new_nodes)))
        }
    }
}
