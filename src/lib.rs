//! A safe, composable builder for parameterized SQL statements targeting a
//! PostgreSQL-style wire protocol.
//!
//! Callers assemble SQL from typed fragments (raw text, identifiers, bound
//! values, indentation and parenthesization markers, symbol-keyed identifier
//! aliases, and lazy placeholders) via the constructors in this module, then
//! [`compile`] the composed tree into a `$1`, `$2`, … placeholder query
//! string plus a parallel array of extracted values. Only fragments produced
//! by these constructors may enter the tree, so untrusted strings never flow
//! into emitted SQL unescaped.

mod compiler;
mod config;
mod constructors;
mod equivalence;
mod error;
pub mod identifier;
mod intern;
mod node;
mod rewrite;
mod token;
mod trust;

pub use compiler::{compile, compile_with_mode, Compiled};
pub use config::RenderMode;
pub use constructors::{
    identifier as ident, indent, indent_if, join, literal, parens, placeholder, raw, symbol_alias,
    template, value, IdentSegment, IntoScalar, TemplatePart,
};
pub use equivalence::is_equivalent;
pub use error::{FragmentError, FragmentResult};
pub use identifier::{escape_sql_identifier, quote_sql_literal};
pub use intern::{blank, sql_false, sql_null, sql_true};
pub use node::{is_fragment, Fragment, IdentPart, Scalar};
pub use rewrite::replace_symbol;
pub use token::Token;

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        blank, compile, compile_with_mode, escape_sql_identifier, ident as identifier, indent,
        indent_if, is_equivalent, is_fragment, join, literal, parens, placeholder,
        quote_sql_literal, raw, replace_symbol, sql_false, sql_null, sql_true, symbol_alias,
        template, value, Compiled, Fragment, FragmentError, FragmentResult, IdentPart,
        IdentSegment, IntoScalar, RenderMode, Scalar, TemplatePart, Token,
    };
}
