//! The compiler: walks a fragment tree to `(text, values)` (spec §4.3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::RenderMode;
use crate::error::{FragmentError, FragmentResult};
use crate::node::{Fragment, Kind, Scalar};
use crate::token::Token;

const MAX_PARAMETERS: usize = 65535;

/// The result of [`compile`]: rendered text plus the extracted values in
/// `$1`, `$2`, … order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compiled {
    pub text: String,
    pub values: Vec<Scalar>,
}

/// Compiles `fragment` under the process's current [`RenderMode`].
pub fn compile(
    fragment: &Fragment,
    placeholder_values: &HashMap<Token, Fragment>,
) -> FragmentResult<Compiled> {
    compile_with_mode(fragment, placeholder_values, RenderMode::current())
}

/// Compiles `fragment` under an explicit [`RenderMode`], ignoring the
/// process-wide cached mode. Useful for tests and embedders that need
/// deterministic rendering regardless of the environment.
pub fn compile_with_mode(
    fragment: &Fragment,
    placeholder_values: &HashMap<Token, Fragment>,
    mode: RenderMode,
) -> FragmentResult<Compiled> {
    let mut state = State {
        mode,
        out: String::new(),
        values: Vec::new(),
        aliases: HashMap::new(),
        description_counts: HashMap::new(),
        placeholder_values,
    };

    match &fragment.kind {
        Kind::Query(nodes) => {
            let refs: Vec<&Fragment> = nodes.iter().collect();
            state.render_sequence(&refs, 0, true)?;
        }
        _ => {
            state.render_sequence(&[fragment], 0, true)?;
        }
    }

    if state.mode == RenderMode::Dev {
        state.out = collapse_blank_lines(&state.out);
    }

    Ok(Compiled {
        text: state.out,
        values: state.values,
    })
}

struct State<'a> {
    mode: RenderMode,
    out: String,
    values: Vec<Scalar>,
    aliases: HashMap<u64, String>,
    description_counts: HashMap<String, usize>,
    placeholder_values: &'a HashMap<Token, Fragment>,
}

impl<'a> State<'a> {
    fn render_sequence(
        &mut self,
        nodes: &[&Fragment],
        indent: usize,
        top_level: bool,
    ) -> FragmentResult<()> {
        let last_index = nodes.len().checked_sub(1);
        for (i, node) in nodes.iter().enumerate() {
            let is_trailing_semicolon = top_level
                && last_index == Some(i)
                && matches!(&node.kind, Kind::Raw(text) if text == ";");
            if is_trailing_semicolon {
                trim_trailing_newline(&mut self.out);
                self.out.push(';');
                continue;
            }
            self.render_node(node, indent)?;
        }
        Ok(())
    }

    fn render_node(&mut self, node: &Fragment, indent: usize) -> FragmentResult<()> {
        match &node.kind {
            Kind::Raw(text) => {
                if self.mode == RenderMode::Dev && text.contains('\n') {
                    let pad = "  ".repeat(indent);
                    let replacement = format!("\n{}", pad);
                    self.out.push_str(&text.replace('\n', &replacement));
                } else {
                    self.out.push_str(text);
                }
            }
            Kind::Value(scalar) => {
                self.values.push(scalar.clone());
                if self.values.len() > MAX_PARAMETERS {
                    return Err(FragmentError::TooManyParameters {
                        count: self.values.len(),
                    });
                }
                self.out.push('$');
                self.out.push_str(&self.values.len().to_string());
            }
            Kind::Identifier(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        self.out.push('.');
                    }
                    match part {
                        crate::node::IdentPart::Quoted(s) => self.out.push_str(s),
                        crate::node::IdentPart::Token(token) => {
                            let alias = self.resolve_alias(token);
                            self.out.push_str(&alias);
                        }
                    }
                }
            }
            Kind::Indent(inner) => {
                if self.mode == RenderMode::Dev {
                    self.out.push('\n');
                    self.out.push_str(&"  ".repeat(indent + 1));
                    self.render_node(inner, indent + 1)?;
                    self.out.push('\n');
                    self.out.push_str(&"  ".repeat(indent));
                } else {
                    self.render_node(inner, indent)?;
                }
            }
            Kind::Parens { content, force } => {
                let inner_text = self.render_captured(content, indent)?;
                if *force || !is_parens_safe(&inner_text) {
                    self.out.push('(');
                    self.out.push_str(&inner_text);
                    self.out.push(')');
                } else {
                    self.out.push_str(&inner_text);
                }
            }
            Kind::SymbolAlias(a, b) => {
                self.bind_symbol_alias(a, b)?;
            }
            Kind::Placeholder { handle, fallback } => {
                if let Some(resolved) = self.placeholder_values.get(handle) {
                    let resolved = resolved.clone();
                    self.render_node(&resolved, indent)?;
                } else if let Some(fallback) = fallback {
                    let fallback = (**fallback).clone();
                    self.render_node(&fallback, indent)?;
                } else {
                    return Err(FragmentError::UnresolvedPlaceholder);
                }
            }
            Kind::Query(nodes) => {
                let refs: Vec<&Fragment> = nodes.iter().collect();
                self.render_sequence(&refs, indent, false)?;
            }
        }
        Ok(())
    }

    fn render_captured(&mut self, node: &Fragment, indent: usize) -> FragmentResult<String> {
        let saved = std::mem::take(&mut self.out);
        self.render_node(node, indent)?;
        Ok(std::mem::replace(&mut self.out, saved))
    }

    fn resolve_alias(&mut self, token: &Token) -> String {
        if let Some(existing) = self.aliases.get(&token.id()) {
            return existing.clone();
        }
        self.assign_alias(token)
    }

    fn assign_alias(&mut self, token: &Token) -> String {
        let description = token.mangled();
        let count = self
            .description_counts
            .entry(description.to_string())
            .or_insert(0);
        *count += 1;
        let alias = if *count == 1 {
            format!("__{}_", description)
        } else {
            format!("__{}_{}", description, count)
        };
        self.aliases.insert(token.id(), alias.clone());
        alias
    }

    fn bind_symbol_alias(&mut self, a: &Token, b: &Token) -> FragmentResult<()> {
        let a_alias = self.aliases.get(&a.id()).cloned();
        let b_alias = self.aliases.get(&b.id()).cloned();
        match (a_alias, b_alias) {
            (Some(x), Some(y)) => {
                if x != y {
                    return Err(FragmentError::ConflictingSymbolAlias);
                }
            }
            (Some(x), None) => {
                self.aliases.insert(b.id(), x);
            }
            (None, Some(y)) => {
                self.aliases.insert(a.id(), y);
            }
            (None, None) => {
                let alias = self.assign_alias(a);
                self.aliases.insert(b.id(), alias);
            }
        }
        Ok(())
    }
}

/// Removes a preceding newline (and any trailing spaces/newlines run) so a
/// final standalone `;` attaches directly to the line above it instead of
/// dangling on its own line.
fn trim_trailing_newline(out: &mut String) {
    let trimmed = out.trim_end_matches(|c: char| c == ' ' || c == '\n');
    if trimmed.len() != out.len() && out[trimmed.len()..].contains('\n') {
        out.truncate(trimmed.len());
    }
}

/// Collapses every maximal run of `\n\s*\n` down to a single `\n`, i.e. a
/// blank line bounded by content on both sides disappears entirely rather
/// than surviving as one blank line. A blank line at the very start or end
/// of `text` has no bounding `\n` on its outer side, so it is left alone.
fn collapse_blank_lines(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let last = lines.len().saturating_sub(1);
    let mut out_lines: Vec<&str> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let is_interior_blank = i != 0 && i != last && line.trim().is_empty();
        if is_interior_blank {
            continue;
        }
        out_lines.push(line);
    }
    out_lines.join("\n")
}

/// Lexical test for whether rendered text needs no parenthesization when
/// embedded (spec §4.3).
pub(crate) fn is_parens_safe(text: &str) -> bool {
    is_pure_placeholder(text)
        || is_pure_number(text)
        || is_pure_quoted_string(text)
        || is_dotted_identifier_sequence(text)
}

fn is_pure_placeholder(s: &str) -> bool {
    match s.strip_prefix('$') {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

fn is_pure_number(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i;
    if i == bytes.len() {
        return int_digits > 0;
    }
    if bytes[i] != b'.' {
        return false;
    }
    i += 1;
    let frac_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let frac_digits = i - frac_start;
    i == bytes.len() && frac_digits > 0
}

fn is_pure_quoted_string(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2
        && bytes[0] == b'\''
        && bytes[bytes.len() - 1] == b'\''
        && !s[1..s.len() - 1].contains('\'')
}

fn is_dotted_identifier_sequence(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    s.split('.').all(|part| is_quoted_part(part) || is_bare_part(part))
}

fn is_quoted_part(part: &str) -> bool {
    let bytes = part.as_bytes();
    bytes.len() >= 2
        && bytes[0] == b'"'
        && bytes[bytes.len() - 1] == b'"'
        && !part[1..part.len() - 1].contains('"')
}

fn is_bare_part(part: &str) -> bool {
    !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructors::{identifier, join, literal, parens, symbol_alias, template, value};
    use pretty_assertions::assert_eq;

    fn compile_prod(fragment: &Fragment) -> Compiled {
        compile_with_mode(fragment, &HashMap::new(), RenderMode::Production).unwrap()
    }

    #[test]
    fn s1_select_with_identifiers_and_value() {
        let frag = template(vec![
            "select ".into(),
            identifier(vec!["users".into(), "id".into()]).unwrap().into(),
            " from ".into(),
            identifier(vec!["users".into()]).unwrap().into(),
            " where ".into(),
            identifier(vec!["users".into(), "id".into()]).unwrap().into(),
            " = ".into(),
            value(42).unwrap().into(),
        ]);
        let compiled = compile_prod(&frag);
        assert_eq!(
            compiled.text,
            "select \"users\".\"id\" from \"users\" where \"users\".\"id\" = $1"
        );
        assert_eq!(compiled.values, vec![Scalar::Number(42.0)]);
    }

    #[test]
    fn s2_same_token_yields_same_alias_across_independent_compiles() {
        let tok = Token::new("user_rows");
        let frag = template(vec!["from ".into(), identifier(vec![tok.into()]).unwrap().into()]);
        let first = compile_prod(&frag);
        let second = compile_prod(&frag);
        assert_eq!(first.text, "from __user_rows_");
        assert_eq!(second.text, "from __user_rows_");
    }

    #[test]
    fn s3_join_of_values() {
        let frag = join(
            vec![value(1).unwrap(), value(2).unwrap(), value(3).unwrap()],
            ", ",
        );
        let compiled = compile_prod(&frag);
        assert_eq!(compiled.text, "$1, $2, $3");
        assert_eq!(
            compiled.values,
            vec![Scalar::Number(1.0), Scalar::Number(2.0), Scalar::Number(3.0)]
        );
    }

    #[test]
    fn s4_parens_forces_when_inner_unsafe() {
        let inner = template(vec![value(1).unwrap().into(), " = ".into(), value(2).unwrap().into()]);
        let frag = template(vec!["where ".into(), parens(inner, false).unwrap().into()]);
        let compiled = compile_prod(&frag);
        assert_eq!(compiled.text, "where ($1 = $2)");
        assert_eq!(compiled.values, vec![Scalar::Number(1.0), Scalar::Number(2.0)]);
    }

    #[test]
    fn s5_parens_around_value_does_not_wrap() {
        let frag = parens(value(7).unwrap(), false).unwrap();
        let compiled = compile_prod(&frag);
        assert_eq!(compiled.text, "$1");
        assert_eq!(compiled.values, vec![Scalar::Number(7.0)]);
    }

    #[test]
    fn s6_literal_true_false_null() {
        assert_eq!(compile_prod(&literal(true).unwrap()).text, "TRUE");
        assert_eq!(compile_prod(&literal(false).unwrap()).text, "FALSE");
        assert_eq!(compile_prod(&literal(Scalar::Null).unwrap()).text, "NULL");
    }

    #[test]
    fn s7_literal_hello_vs_apostrophe() {
        let hello = compile_prod(&literal("hello").unwrap());
        assert_eq!(hello.text, "'hello'");
        assert!(hello.values.is_empty());

        let apostrophe = compile_prod(&literal("it's").unwrap());
        assert_eq!(apostrophe.text, "$1");
        assert_eq!(apostrophe.values, vec![Scalar::String("it's".to_string())]);
    }

    #[test]
    fn s8_conflicting_symbol_alias_after_independent_binding_errors() {
        let a = Token::new("u");
        let b = Token::new("u");
        let frag = template(vec![
            identifier(vec![a.clone().into()]).unwrap().into(),
            "/".into(),
            identifier(vec![b.clone().into()]).unwrap().into(),
            "/".into(),
            symbol_alias(a, b).into(),
        ]);
        let result = compile_with_mode(&frag, &HashMap::new(), RenderMode::Production);
        assert!(matches!(result, Err(FragmentError::ConflictingSymbolAlias)));
    }

    #[test]
    fn symbol_alias_binds_second_token_to_first_when_unbound() {
        let a = Token::new("u");
        let b = Token::new("u");
        let frag = template(vec![
            symbol_alias(a.clone(), b.clone()).into(),
            identifier(vec![a.into()]).unwrap().into(),
            "/".into(),
            identifier(vec![b.into()]).unwrap().into(),
        ]);
        let compiled = compile_prod(&frag);
        assert_eq!(compiled.text, "__u_/__u_");
    }

    #[test]
    fn distinct_tokens_sharing_description_get_distinct_aliases() {
        let a = Token::new("u");
        let b = Token::new("u");
        let frag = template(vec![
            identifier(vec![a.into()]).unwrap().into(),
            "/".into(),
            identifier(vec![b.into()]).unwrap().into(),
        ]);
        let compiled = compile_prod(&frag);
        assert_eq!(compiled.text, "__u_/__u_2");
    }

    #[test]
    fn value_cap_exceeded_fails() {
        let values: Vec<Fragment> = (0..MAX_PARAMETERS + 1)
            .map(|i| value(i as i64).unwrap())
            .collect();
        let frag = join(values, ", ");
        let result = compile_with_mode(&frag, &HashMap::new(), RenderMode::Production);
        assert!(matches!(result, Err(FragmentError::TooManyParameters { .. })));
    }

    #[test]
    fn unresolved_placeholder_without_fallback_fails() {
        let handle = Token::new("missing");
        let frag = crate::constructors::placeholder(handle, None);
        let result = compile_with_mode(&frag, &HashMap::new(), RenderMode::Production);
        assert!(matches!(result, Err(FragmentError::UnresolvedPlaceholder)));
    }

    #[test]
    fn placeholder_resolves_from_map() {
        let handle = Token::new("filter");
        let frag = crate::constructors::placeholder(handle.clone(), None);
        let mut map = HashMap::new();
        map.insert(handle, value(9).unwrap());
        let compiled = compile_with_mode(&frag, &map, RenderMode::Production).unwrap();
        assert_eq!(compiled.text, "$1");
        assert_eq!(compiled.values, vec![Scalar::Number(9.0)]);
    }

    #[test]
    fn compile_is_deterministic() {
        let frag = template(vec!["a".into(), value(1).unwrap().into(), "b".into()]);
        let first = compile_prod(&frag);
        let second = compile_prod(&frag);
        assert_eq!(first, second);
    }

    #[test]
    fn parens_safety_heuristic_cases() {
        for safe in ["$1", "12", "0.5", ".5", "'abc'", "foo", "\"FoO\".\"bar\"", "schema.table.column"] {
            assert!(is_parens_safe(safe), "{safe} should be parens-safe");
        }
        for unsafe_text in ["a = b", "foo(x)", "a::text"] {
            assert!(!is_parens_safe(unsafe_text), "{unsafe_text} should not be parens-safe");
        }
    }

    #[test]
    fn dev_mode_indents_and_collapses_blank_lines() {
        // Built directly via Kind::Indent rather than the public `indent()`
        // constructor, since `indent()` decides based on the process-wide
        // cached RenderMode rather than the explicit override used here.
        let inner = template(vec!["a".into(), value(1).unwrap().into()]);
        let indented = Fragment::new(Kind::Indent(Box::new(inner)));
        let frag = template(vec!["(".into(), indented.into(), ")".into()]);
        let compiled = compile_with_mode(&frag, &HashMap::new(), RenderMode::Dev).unwrap();
        assert!(compiled.text.contains('\n'));
        assert!(!compiled.text.contains("\n\n"));
    }

    #[test]
    fn collapse_blank_lines_removes_interior_blank_lines_entirely() {
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\nb");
        assert_eq!(collapse_blank_lines("a\n\n\nb"), "a\nb");
        assert_eq!(collapse_blank_lines("a\n  \nb"), "a\nb");
        assert_eq!(collapse_blank_lines("\na"), "\na");
        assert_eq!(collapse_blank_lines("a\n"), "a\n");
        assert_eq!(collapse_blank_lines("a\nb"), "a\nb");
    }
}
