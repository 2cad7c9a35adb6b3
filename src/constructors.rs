//! Fragment factories (spec §4.2).

use std::sync::Once;

use crate::error::{FragmentError, FragmentResult};
use crate::identifier::escape_sql_identifier;
use crate::intern::{self, raw_interned};
use crate::node::{self, Fragment, IdentPart, Kind, Scalar};
use crate::token::Token;

static RAW_WARNING: Once = Once::new();

/// Returns an interned `Raw` node and fires a one-time `tracing::warn!` per
/// process the first time it's called. This constructor does not escape or
/// validate `text`; callers are responsible for trusting it.
pub fn raw(text: impl Into<String>) -> Fragment {
    RAW_WARNING.call_once(|| {
        tracing::warn!(
            "pgfrag::raw() called: this constructor does not escape or validate its input; \
             callers are responsible for ensuring `text` is trusted"
        );
    });
    raw_trusted(text)
}

/// Like [`raw`] but without the one-shot warning. Used internally by every
/// other constructor to emit framework-generated text (separators,
/// punctuation, keywords) that never originated from a caller-supplied
/// string.
pub(crate) fn raw_trusted(text: impl Into<String>) -> Fragment {
    raw_interned(&text.into())
}

/// One segment of an `identifier()` call: either a plain name (always
/// quote-escaped) or an opaque token resolved at compile time.
pub enum IdentSegment {
    Name(String),
    Token(Token),
}

impl From<&str> for IdentSegment {
    fn from(s: &str) -> Self {
        IdentSegment::Name(s.to_string())
    }
}

impl From<String> for IdentSegment {
    fn from(s: String) -> Self {
        IdentSegment::Name(s)
    }
}

impl From<Token> for IdentSegment {
    fn from(t: Token) -> Self {
        IdentSegment::Token(t)
    }
}

impl From<&Token> for IdentSegment {
    fn from(t: &Token) -> Self {
        IdentSegment::Token(t.clone())
    }
}

/// Builds an `Identifier` fragment from one or more name/token parts.
/// `identifier("users", "id")` renders as `"users"."id"`.
pub fn identifier(parts: Vec<IdentSegment>) -> FragmentResult<Fragment> {
    if parts.is_empty() {
        return Err(FragmentError::EmptyIdentifier);
    }
    let parts = parts
        .into_iter()
        .map(|part| match part {
            IdentSegment::Name(name) => IdentPart::Quoted(escape_sql_identifier(&name)),
            IdentSegment::Token(token) => IdentPart::Token(token),
        })
        .collect();
    Ok(Fragment::new(Kind::Identifier(parts)))
}

/// Anything convertible to a `Value` scalar. Implemented for native Rust
/// scalar types (infallible) and for `serde_json::Value` (fallible: this
/// is the one constructor that accepts genuinely dynamic, externally
/// sourced data, so it is also the one place `InvalidArgument` fires for a
/// malformed scalar).
pub trait IntoScalar {
    fn into_scalar(self) -> FragmentResult<Scalar>;
}

impl IntoScalar for Scalar {
    fn into_scalar(self) -> FragmentResult<Scalar> {
        Ok(self)
    }
}

impl IntoScalar for bool {
    fn into_scalar(self) -> FragmentResult<Scalar> {
        Ok(Scalar::Bool(self))
    }
}

impl IntoScalar for &str {
    fn into_scalar(self) -> FragmentResult<Scalar> {
        Ok(Scalar::String(self.to_string()))
    }
}

impl IntoScalar for String {
    fn into_scalar(self) -> FragmentResult<Scalar> {
        Ok(Scalar::String(self))
    }
}

macro_rules! impl_into_scalar_for_int {
    ($($t:ty),*) => {
        $(
            impl IntoScalar for $t {
                fn into_scalar(self) -> FragmentResult<Scalar> {
                    Ok(Scalar::Number(self as f64))
                }
            }
        )*
    };
}
impl_into_scalar_for_int!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl IntoScalar for f32 {
    fn into_scalar(self) -> FragmentResult<Scalar> {
        finite_number(self as f64)
    }
}

impl IntoScalar for f64 {
    fn into_scalar(self) -> FragmentResult<Scalar> {
        finite_number(self)
    }
}

fn finite_number(n: f64) -> FragmentResult<Scalar> {
    if n.is_finite() {
        Ok(Scalar::Number(n))
    } else {
        Err(FragmentError::invalid_argument(
            "value() requires a finite number",
        ))
    }
}

impl<T: IntoScalar> IntoScalar for Option<T> {
    fn into_scalar(self) -> FragmentResult<Scalar> {
        match self {
            Some(v) => v.into_scalar(),
            None => Ok(Scalar::Null),
        }
    }
}

impl<T: IntoScalar> IntoScalar for Vec<T> {
    fn into_scalar(self) -> FragmentResult<Scalar> {
        let items = self
            .into_iter()
            .map(IntoScalar::into_scalar)
            .collect::<FragmentResult<Vec<_>>>()?;
        Ok(Scalar::Array(items))
    }
}

impl IntoScalar for serde_json::Value {
    fn into_scalar(self) -> FragmentResult<Scalar> {
        match self {
            serde_json::Value::Null => Ok(Scalar::Null),
            serde_json::Value::Bool(b) => Ok(Scalar::Bool(b)),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) if f.is_finite() => Ok(Scalar::Number(f)),
                _ => Err(FragmentError::invalid_argument(
                    "value() requires a finite number",
                )),
            },
            serde_json::Value::String(s) => Ok(Scalar::String(s)),
            serde_json::Value::Array(items) => {
                let items = items
                    .into_iter()
                    .map(IntoScalar::into_scalar)
                    .collect::<FragmentResult<Vec<_>>>()?;
                Ok(Scalar::Array(items))
            }
            serde_json::Value::Object(_) => Err(FragmentError::invalid_argument(
                "value() does not accept objects",
            )),
        }
    }
}

/// Builds a `Value` fragment. Scalars only (string, finite number, bool,
/// null, or a nested array of scalars); objects and non-finite numbers fail.
pub fn value(v: impl IntoScalar) -> FragmentResult<Fragment> {
    let scalar = v.into_scalar()?;
    Ok(Fragment::new(Kind::Value(scalar)))
}

const INLINE_SAFE_STRING_CHARS: &str = "-_@!$ :\".";

fn is_inline_safe_string(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || INLINE_SAFE_STRING_CHARS.contains(c))
}

/// Returns `Raw` if `v` is inline-safe, otherwise delegates to [`value`].
pub fn literal(v: impl IntoScalar) -> FragmentResult<Fragment> {
    match v.into_scalar()? {
        Scalar::String(s) if is_inline_safe_string(&s) => {
            Ok(raw_trusted(format!("'{}'", s)))
        }
        Scalar::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
            Ok(raw_trusted(format!("{}", n as i64)))
        }
        Scalar::Number(n) => Ok(raw_trusted(format!("'{}'::float", n))),
        Scalar::Bool(true) => Ok(intern::sql_true()),
        Scalar::Bool(false) => Ok(intern::sql_false()),
        Scalar::Null => Ok(intern::sql_null()),
        other => value(other),
    }
}

/// Flattens `items`, inserting an interned `Raw(separator)` between
/// consecutive items when `separator` is non-empty. Empty input yields
/// `BLANK`; a single item is returned unchanged.
pub fn join(items: impl IntoIterator<Item = Fragment>, separator: &str) -> Fragment {
    let items: Vec<Fragment> = items.into_iter().collect();
    match items.len() {
        0 => intern::blank(),
        1 => items.into_iter().next().unwrap(),
        _ => {
            let mut nodes = Vec::new();
            let mut first = true;
            for item in items {
                if !first && !separator.is_empty() {
                    node::flatten_into(raw_trusted(separator), &mut nodes);
                }
                first = false;
                node::flatten_into(item, &mut nodes);
            }
            node::query_from_nodes(nodes)
        }
    }
}

/// Wraps `fragment` in `Indent` when in development mode; transparent in
/// production.
pub fn indent(fragment: Fragment) -> Fragment {
    if crate::config::RenderMode::current() == crate::config::RenderMode::Dev {
        Fragment::new(Kind::Indent(Box::new(fragment)))
    } else {
        fragment
    }
}

/// Like [`indent`] but only when `cond` is also true.
pub fn indent_if(cond: bool, fragment: Fragment) -> Fragment {
    if cond {
        indent(fragment)
    } else {
        fragment
    }
}

/// Wraps `fragment` in parens, applying the simplifications spec.md §4.2
/// describes before constructing a fresh node.
pub fn parens(fragment: Fragment, force: bool) -> FragmentResult<Fragment> {
    if let Kind::Query(nodes) = &fragment.kind {
        if nodes.is_empty() {
            return Err(FragmentError::EmptyParens);
        }
        if nodes.len() == 1 {
            return parens(nodes[0].clone(), force);
        }
    }

    if let Kind::Parens {
        content,
        force: existing_force,
    } = &fragment.kind
    {
        if *existing_force || !force {
            return Ok(fragment);
        }
        return Ok(Fragment::new(Kind::Parens {
            content: content.clone(),
            force: true,
        }));
    }

    if let Kind::Indent(inner) = &fragment.kind {
        if let Kind::Query(nodes) = &inner.kind {
            if nodes.len() == 1 {
                if let Kind::Parens {
                    content,
                    force: existing_force,
                } = &nodes[0].kind
                {
                    if !*existing_force {
                        let rewrapped_inner =
                            Fragment::new(Kind::Indent(Box::new(node::query_from_nodes(vec![
                                (**content).clone(),
                            ]))));
                        return Ok(Fragment::new(Kind::Parens {
                            content: Box::new(rewrapped_inner),
                            force,
                        }));
                    }
                }
            }
        }
    }

    Ok(Fragment::new(Kind::Parens {
        content: Box::new(fragment),
        force,
    }))
}

/// Declares that `a` and `b` must render to the same identifier alias.
pub fn symbol_alias(a: Token, b: Token) -> Fragment {
    Fragment::new(Kind::SymbolAlias(a, b))
}

/// A fragment resolved at compile time by a caller-supplied handle → value
/// mapping, falling back to `fallback` when unmapped.
pub fn placeholder(handle: Token, fallback: Option<Fragment>) -> Fragment {
    Fragment::new(Kind::Placeholder {
        handle,
        fallback: fallback.map(Box::new),
    })
}

/// One piece of a [`template`] call: a trusted-by-origin text literal or an
/// already-built fragment.
pub enum TemplatePart {
    Text(String),
    Frag(Fragment),
}

impl From<&str> for TemplatePart {
    fn from(s: &str) -> Self {
        TemplatePart::Text(s.to_string())
    }
}

impl From<String> for TemplatePart {
    fn from(s: String) -> Self {
        TemplatePart::Text(s)
    }
}

impl From<Fragment> for TemplatePart {
    fn from(f: Fragment) -> Self {
        TemplatePart::Frag(f)
    }
}

/// Composes alternating text pieces and fragments into one fragment,
/// short-circuiting to `BLANK` (no parts) or the cached single-string
/// fragment (one text part), otherwise producing a flattened `Query`.
pub fn template(parts: Vec<TemplatePart>) -> Fragment {
    if parts.is_empty() {
        return intern::blank();
    }
    if parts.len() == 1 {
        return match parts.into_iter().next().unwrap() {
            TemplatePart::Text(s) => intern::simple_template(&s),
            TemplatePart::Frag(f) => f,
        };
    }

    let mut nodes = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            TemplatePart::Text(s) => {
                if !s.is_empty() {
                    node::flatten_into(raw_trusted(s), &mut nodes);
                }
            }
            TemplatePart::Frag(f) => node::flatten_into(f, &mut nodes),
        }
    }
    node::query_from_nodes(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_is_interned_by_text() {
        let a = raw("select 1");
        let b = raw("select 1");
        assert!(matches!((&a.kind, &b.kind), (Kind::Raw(x), Kind::Raw(y)) if x == y));
    }

    #[test]
    fn identifier_rejects_empty_parts() {
        assert!(matches!(identifier(vec![]), Err(FragmentError::EmptyIdentifier)));
    }

    #[test]
    fn identifier_escapes_string_parts() {
        let frag = identifier(vec!["users".into(), "id".into()]).unwrap();
        match &frag.kind {
            Kind::Identifier(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(&parts[0], IdentPart::Quoted(s) if s == "\"users\""));
                assert!(matches!(&parts[1], IdentPart::Quoted(s) if s == "\"id\""));
            }
            _ => panic!("expected Identifier"),
        }
    }

    #[test]
    fn value_rejects_non_finite_numbers() {
        assert!(value(f64::NAN).is_err());
        assert!(value(f64::INFINITY).is_err());
    }

    #[test]
    fn value_rejects_json_objects() {
        let obj = serde_json::json!({ "a": 1 });
        assert!(value(obj).is_err());
    }

    #[test]
    fn value_accepts_nested_arrays() {
        let arr = serde_json::json!([1, 2, [3, 4]]);
        assert!(value(arr).is_ok());
    }

    #[test]
    fn literal_true_false_null_are_raw_constants() {
        assert!(matches!(&literal(true).unwrap().kind, Kind::Raw(t) if t == "TRUE"));
        assert!(matches!(&literal(false).unwrap().kind, Kind::Raw(t) if t == "FALSE"));
    }

    #[test]
    fn literal_inline_safe_string_is_raw() {
        let frag = literal("hello").unwrap();
        assert!(matches!(&frag.kind, Kind::Raw(t) if t == "'hello'"));
    }

    #[test]
    fn literal_with_apostrophe_delegates_to_value() {
        let frag = literal("it's").unwrap();
        assert!(matches!(&frag.kind, Kind::Value(Scalar::String(s)) if s == "it's"));
    }

    #[test]
    fn join_of_empty_list_is_blank() {
        let frag = join(Vec::new(), ", ");
        assert!(matches!(&frag.kind, Kind::Query(nodes) if nodes.is_empty()));
    }

    #[test]
    fn join_single_item_is_unchanged() {
        let v = value(1).unwrap();
        let joined = join(vec![value(1).unwrap()], ", ");
        assert!(matches!((&v.kind, &joined.kind), (Kind::Value(a), Kind::Value(b)) if a == b));
    }

    #[test]
    fn parens_rejects_empty_query() {
        assert!(matches!(parens(intern::blank(), false), Err(FragmentError::EmptyParens)));
    }

    #[test]
    fn parens_idempotent_with_same_force() {
        let v = value(1).unwrap();
        let once = parens(v.clone(), true).unwrap();
        let twice = parens(once.clone(), true).unwrap();
        assert!(matches!(
            (&once.kind, &twice.kind),
            (
                Kind::Parens { force: f1, .. },
                Kind::Parens { force: f2, .. }
            ) if f1 == f2
        ));
    }

    #[test]
    fn parens_unwraps_single_child_query() {
        let v = value(1).unwrap();
        let q = node::query_from_nodes(vec![v.clone()]);
        let wrapped = parens(q, false).unwrap();
        assert!(matches!(wrapped.kind, Kind::Parens { .. }));
    }

    #[test]
    fn template_single_text_part_uses_simple_cache() {
        let a = template(vec!["select 1".into()]);
        let b = template(vec!["select 1".into()]);
        assert!(matches!((&a.kind, &b.kind), (Kind::Raw(x), Kind::Raw(y)) if x == y));
    }

    #[test]
    fn template_flattens_nested_fragments() {
        let frag = template(vec![
            "a".into(),
            value(1).unwrap().into(),
            "b".into(),
        ]);
        match &frag.kind {
            Kind::Query(nodes) => assert_eq!(nodes.len(), 3),
            _ => panic!("expected Query"),
        }
    }
}
