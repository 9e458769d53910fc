//! Parsing of textual type expressions such as `Map<String, Vec<Item>>`.

use std::{str::FromStr, sync::Arc};

use thiserror::Error;

use super::{ScalarKind, TypeExpr};

/// Error produced when a type expression cannot be parsed.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("invalid type expression `{input}` at offset {offset}: {reason}")]
pub struct TypeParseError {
    input: Arc<str>,
    offset: usize,
    reason: &'static str,
}

impl TypeParseError {
    /// Returns the byte offset at which parsing failed.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns a short description of the failure.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        self.reason
    }
}

impl FromStr for TypeExpr {
    type Err = TypeParseError;

    /// Parses `Name`, `Name<Arg, ...>`, scalar names, the built-in containers
    /// (`Vec`/`List`, `Set`/`HashSet`/`BTreeSet`, `Map`/`HashMap`/`BTreeMap`,
    /// `Option`) and single upper-case letters as type parameters.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser { input, offset: 0 };
        let expr = parser.expr()?;
        parser.skip_whitespace();
        if parser.offset != input.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(expr)
    }
}

struct Parser<'a> {
    input: &'a str,
    offset: usize,
}

impl<'a> Parser<'a> {
    fn expr(&mut self) -> Result<TypeExpr, TypeParseError> {
        self.skip_whitespace();
        let start = self.offset;
        let ident = self.ident()?;
        self.skip_whitespace();
        let args = if self.eat('<') {
            self.args()?
        } else {
            Vec::new()
        };
        build(ident, args).map_err(|reason| TypeParseError {
            input: Arc::from(self.input),
            offset: start,
            reason,
        })
    }

    fn args(&mut self) -> Result<Vec<TypeExpr>, TypeParseError> {
        let mut args = vec![self.expr()?];
        loop {
            self.skip_whitespace();
            if self.eat(',') {
                args.push(self.expr()?);
            } else if self.eat('>') {
                return Ok(args);
            } else {
                return Err(self.error("expected `,` or `>`"));
            }
        }
    }

    fn ident(&mut self) -> Result<&'a str, TypeParseError> {
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, first)) if first.is_ascii_alphabetic() || first == '_' => {}
            _ => return Err(self.error("expected a type name")),
        }
        let len = chars
            .find(|(_, ch)| !(ch.is_ascii_alphanumeric() || *ch == '_'))
            .map_or(rest.len(), |(index, _)| index);
        let start = self.offset;
        self.offset += len;
        Ok(self.input.get(start..self.offset).unwrap_or_default())
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.rest().starts_with(expected) {
            self.offset += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.offset += rest.len() - rest.trim_start().len();
    }

    fn rest(&self) -> &'a str {
        self.input.get(self.offset..).unwrap_or_default()
    }

    fn error(&self, reason: &'static str) -> TypeParseError {
        TypeParseError {
            input: Arc::from(self.input),
            offset: self.offset,
            reason,
        }
    }
}

fn build(ident: &str, mut args: Vec<TypeExpr>) -> Result<TypeExpr, &'static str> {
    if let Some(kind) = ScalarKind::from_name(ident) {
        return if args.is_empty() {
            Ok(TypeExpr::Scalar(kind))
        } else {
            Err("scalar types take no arguments")
        };
    }
    match (ident, args.len()) {
        ("Vec" | "List", 1) => Ok(TypeExpr::seq(args.remove(0))),
        ("Set" | "HashSet" | "BTreeSet", 1) => Ok(TypeExpr::set(args.remove(0))),
        ("Option", 1) => Ok(TypeExpr::optional(args.remove(0))),
        ("Map" | "HashMap" | "BTreeMap", 2) => {
            let value = args.remove(1);
            Ok(TypeExpr::map(args.remove(0), value))
        }
        ("Vec" | "List" | "Set" | "HashSet" | "BTreeSet" | "Option", _) => {
            Err("container expects exactly one argument")
        }
        ("Map" | "HashMap" | "BTreeMap", _) => Err("map expects exactly two arguments"),
        (name, 0) if is_parameter_name(name) => Ok(TypeExpr::param(name)),
        (name, _) => Ok(TypeExpr::generic(name, args)),
    }
}

fn is_parameter_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!((chars.next(), chars.next()), (Some(first), None) if first.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case("i64", TypeExpr::scalar(ScalarKind::I64))]
    #[case("T", TypeExpr::param("T"))]
    #[case("Person", TypeExpr::named("Person"))]
    #[case(" List < Person > ", TypeExpr::seq(TypeExpr::named("Person")))]
    #[case("HashSet<u8>", TypeExpr::set(TypeExpr::scalar(ScalarKind::U8)))]
    #[case(
        "BTreeMap<String, Option<Node>>",
        TypeExpr::map(
            TypeExpr::scalar(ScalarKind::String),
            TypeExpr::optional(TypeExpr::named("Node")),
        )
    )]
    #[case(
        "Pair<K, Vec<V>>",
        TypeExpr::generic("Pair", [TypeExpr::param("K"), TypeExpr::seq(TypeExpr::param("V"))])
    )]
    fn parses_supported_forms(#[case] raw: &str, #[case] expected: TypeExpr) {
        let parsed: TypeExpr = raw.parse().expect("expression must parse");
        assert_eq!(parsed, expected);
    }

    #[rstest]
    #[case("", "expected a type name")]
    #[case("Vec<", "expected a type name")]
    #[case("Pair<A B>", "expected `,` or `>`")]
    #[case("Map<String>", "map expects exactly two arguments")]
    #[case("Vec<A, B>", "container expects exactly one argument")]
    #[case("i32<u8>", "scalar types take no arguments")]
    #[case("Person>", "unexpected trailing input")]
    fn rejects_malformed_input(#[case] raw: &str, #[case] reason: &str) {
        let err = raw.parse::<TypeExpr>().expect_err("expression must be rejected");
        assert_eq!(err.reason(), reason);
    }

    #[test]
    fn display_round_trips_through_parse() {
        let raw = "Map<String, Vec<Option<Pair<i32, T>>>>";
        let parsed: TypeExpr = raw.parse().expect("expression must parse");
        assert_eq!(parsed.to_string(), raw);
    }
}
