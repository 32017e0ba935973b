//! Parse infix expressions and rewrite templates.
//!
//! Terms are single latin letters or digits, operations are drawn from a
//! fixed alphabet of symbol tokens, and every operation is binary,
//! left-associative and without precedence:
//!
//! ```text
//! b :: (a |> (a @ c))
//! (b -< c) <~> (a . c)
//! a ~> b ~> c          same as (a ~> b) ~> c
//! ```
//!
//! Rule templates may also use `$name` pattern variables and are split
//! by `=>` into a left-hand and a right-hand side.

use std::fmt::Display;
use std::sync::Arc;

use thiserror::Error;

use crate::{
    pattern::{Pattern, Rewrite},
    util::Symbol,
};

/// Operation tokens understood by the parser. Tokens sharing a prefix are
/// listed longest first.
pub const OPERATORS: &[&str] = &[
    "<~>", "~~>", "=<<", ">>=", "-<<", ":>", "|>", "-<", ">-", ".=", ".-", "|-", "-|", "~>", "::",
    "?", "!", "~", "@", "#", "$", "&", ".", //
    "⇌", "⥢", "⥤", "⥃", "⥄", "⤝", "⤞", "↫", "↬", "⬸", "⤑", "⤙", "⤚", "⤜", "⥊", "⥐", "↽", "⇀",
    "⤾", "⤿", "⤸", "⤹", "⤻", "∷", "∴", "∵", "⠔", "⠢", "∺", "∻", "≀",
];

/// Separates the two sides of a rule template.
pub const ARROW: &str = "=>";

/// Parses a concrete expression such as a player's answer.
pub fn parse_expr(input: &str) -> Result<Pattern, ParseError> {
    parse(input, false)
}

/// Parses one side of a rule template, where `$name` variables are allowed.
pub fn parse_pattern(input: &str) -> Result<Pattern, ParseError> {
    parse(input, true)
}

/// Parses a template like `$x . $y => $y . $x` into a rewrite.
pub fn parse_rewrite(name: impl Into<String>, template: &str) -> Result<Rewrite, ParseError> {
    let (lhs, rhs) = template
        .split_once(ARROW)
        .ok_or_else(|| ParseError::MissingArrow(template.to_string()))?;
    let lhs = parse_pattern(lhs)?;
    let rhs = parse_pattern(rhs)?;

    let bound = lhs.vars();
    if let Some(unbound) = rhs.vars().into_iter().find(|v| !bound.contains(v)) {
        return Err(ParseError::UnboundVariable(unbound.to_string()));
    }
    Ok(Rewrite::new(name, lhs, rhs))
}

fn parse(input: &str, allow_vars: bool) -> Result<Pattern, ParseError> {
    let (out, rest) = expr(&Context::new(input, allow_vars))?;
    if !rest.is_at_end() {
        return Err(ParseError::UnexpectedTrailing(rest.span_to_end()));
    }
    Ok(out)
}

/// A [`Span`] contains the parsed text and a pair of byte offsets
/// representing the start and the end.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Span(Arc<str>, usize, usize);

impl Span {
    pub fn string(&self) -> &str {
        &self.0[self.1..self.2]
    }

    fn column(&self, offset: usize) -> usize {
        self.0[..offset].chars().count() + 1
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let start = self.column(self.1);
        let end = if self.2 > self.1 {
            self.column(self.2) - 1
        } else {
            start
        };
        write!(f, "At {start}-{end}: {}", &*self.0)
    }
}

#[derive(Clone, Debug)]
struct Context {
    source: Arc<str>,
    index: usize,
    allow_vars: bool,
}

impl Context {
    fn new(contents: &str, allow_vars: bool) -> Context {
        let mut next = Context {
            source: Arc::from(contents),
            index: 0,
            allow_vars,
        };
        next.advance_past_whitespace();
        next
    }

    fn rest(&self) -> &str {
        &self.source[self.index..]
    }

    fn advance_text(&self, s: &str) -> Option<(Span, Context)> {
        if self.rest().starts_with(s) {
            let mut next = self.clone();
            next.index += s.len();
            let span = Span(self.source.clone(), self.index, next.index);
            next.advance_past_whitespace();
            Some((span, next))
        } else {
            None
        }
    }

    fn advance_past_whitespace(&mut self) {
        let skipped = self
            .rest()
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(self.rest().len());
        self.index += skipped;
    }

    fn is_at_end(&self) -> bool {
        self.index == self.source.len()
    }

    fn span(&self) -> Span {
        Span(self.source.clone(), self.index, self.index)
    }

    fn span_to_end(&self) -> Span {
        Span(self.source.clone(), self.index, self.source.len())
    }
}

type Res<T> = Result<(T, Context), ParseError>;

trait Parser<T>: Fn(&Context) -> Res<T> + Clone {}
impl<T, F: Fn(&Context) -> Res<T> + Clone> Parser<T> for F {}

fn text(s: &str) -> impl Parser<Span> + '_ {
    move |ctx| {
        ctx.advance_text(s)
            .ok_or_else(|| ParseError::ExpectedText(ctx.span(), s.to_string()))
    }
}

fn choice<T>(a: impl Parser<T>, b: impl Parser<T>) -> impl Parser<T> {
    move |ctx| a(ctx).or_else(|_| b(ctx))
}

fn map<T, U>(parser: impl Parser<T>, f: impl Fn(T) -> U + Clone) -> impl Parser<U> {
    move |ctx| {
        let (x, next) = parser(ctx)?;
        Ok((f(x), next))
    }
}

fn sequence3<T, U, V>(
    a: impl Parser<T>,
    b: impl Parser<U>,
    c: impl Parser<V>,
) -> impl Parser<(T, U, V)> {
    move |ctx| {
        let (x, next) = a(ctx)?;
        let (y, next) = b(&next)?;
        let (z, next) = c(&next)?;
        Ok(((x, y, z), next))
    }
}

fn parens<T>(f: impl Parser<T>) -> impl Parser<T> {
    map(sequence3(text("("), f, text(")")), |(_, x, _)| x)
}

fn expr(ctx: &Context) -> Res<Pattern> {
    let (mut lhs, mut next) = value(ctx)?;
    // once an operation is consumed, a missing right-hand side is an error
    while let Ok((op, after_op)) = operation(&next) {
        let (rhs, after) = value(&after_op)?;
        lhs = Pattern::op(op, lhs, rhs);
        next = after;
    }
    Ok((lhs, next))
}

fn value(ctx: &Context) -> Res<Pattern> {
    if ctx.rest().starts_with('(') {
        return parens(expr)(ctx);
    }
    choice(term, variable)(ctx).map_err(|err| match err {
        ParseError::UnexpectedVariable(span) => ParseError::UnexpectedVariable(span),
        _ => ParseError::ExpectedExpression(ctx.span_to_end()),
    })
}

fn term(ctx: &Context) -> Res<Pattern> {
    match ctx.rest().chars().next() {
        Some(c) if c.is_ascii_alphanumeric() => {
            let (span, next) = text(&ctx.rest()[..c.len_utf8()])(ctx)?;
            Ok((Pattern::leaf(span.string()), next))
        }
        _ => Err(ParseError::ExpectedExpression(ctx.span())),
    }
}

fn variable(ctx: &Context) -> Res<Pattern> {
    let Some(after_sigil) = ctx.rest().strip_prefix('$') else {
        return Err(ParseError::ExpectedText(ctx.span(), "$".into()));
    };
    let len = after_sigil
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(after_sigil.len());
    if len == 0 {
        return Err(ParseError::ExpectedExpression(ctx.span()));
    }

    let name = Symbol::from(&after_sigil[..len]);
    let mut next = ctx.clone();
    next.index += 1 + len;
    if !ctx.allow_vars {
        let span = Span(ctx.source.clone(), ctx.index, next.index);
        return Err(ParseError::UnexpectedVariable(span));
    }
    next.advance_past_whitespace();
    Ok((Pattern::Var(name), next))
}

fn operation(ctx: &Context) -> Res<Symbol> {
    for op in OPERATORS {
        if let Ok((span, next)) = text(op)(ctx) {
            return Ok((Symbol::from(span.string()), next));
        }
    }
    Err(ParseError::ExpectedText(ctx.span(), "an operation".into()))
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{0}\nexpected {1}, found {}", .0.string())]
    ExpectedText(Span, String),
    #[error("{0}\nexpected a term or a bracket expression")]
    ExpectedExpression(Span),
    #[error("{0}\nunexpected `{}`", .0.string())]
    UnexpectedTrailing(Span),
    #[error("{0}\npattern variables like `{}` are not allowed here", .0.string())]
    UnexpectedVariable(Span),
    #[error("rule template `{0}` has no `=>`")]
    MissingArrow(String),
    #[error("variable ${0} on the right-hand side is not bound on the left")]
    UnboundVariable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(input: &str) -> String {
        parse_expr(input).unwrap().to_string()
    }

    #[test]
    fn parses_nested_brackets() {
        assert_eq!(round_trip("b :: (a |> (a @ c))"), "b :: (a |> (a @ c))");
        assert_eq!(round_trip("(b -< c) <~> (a . c)"), "(b -< c) <~> (a . c)");
        assert_eq!(round_trip("  ((a))  "), "a");
    }

    #[test]
    fn operations_are_left_associative() {
        assert_eq!(round_trip("a ~> b ~> c"), "(a ~> b) ~> c");
        assert_eq!(round_trip("a?b!c"), "(a ? b) ! c");
        assert_eq!(
            parse_expr("a ~> b ~> c").unwrap(),
            parse_expr("(a ~> b) ~> c").unwrap()
        );
    }

    #[test]
    fn longest_operation_wins() {
        assert_eq!(round_trip("a >>= b"), "a >>= b");
        assert_eq!(round_trip("a .= b . c"), "(a .= b) . c");
        assert_eq!(round_trip("a -<< b -< c"), "(a -<< b) -< c");
        assert_eq!(round_trip("a ~~> b"), "a ~~> b");
        assert_eq!(round_trip("a $ b"), "a $ b");
    }

    #[test]
    fn unicode_operations_and_digit_terms() {
        assert_eq!(round_trip("0 ⇌ (a ≀ 7)"), "0 ⇌ (a ≀ 7)");
    }

    #[test]
    fn reports_errors() {
        assert!(matches!(parse_expr(""), Err(ParseError::ExpectedExpression(_))));
        assert!(matches!(parse_expr("a ~>"), Err(ParseError::ExpectedExpression(_))));
        assert!(matches!(parse_expr("(a ~> b"), Err(ParseError::ExpectedText(_, _))));
        assert!(matches!(parse_expr("a b"), Err(ParseError::UnexpectedTrailing(_))));
        assert!(matches!(parse_expr("a + b"), Err(ParseError::UnexpectedTrailing(_))));
        assert!(matches!(parse_expr("$x . a"), Err(ParseError::UnexpectedVariable(_))));

        let err = parse_expr("a b").unwrap_err();
        assert_eq!(err.to_string(), "At 3-3: a b\nunexpected `b`");
    }

    #[test]
    fn parses_templates() {
        let rule = parse_rewrite("comm", "$x . $y => $y . $x").unwrap();
        assert_eq!(rule.lhs, Pattern::op(".", Pattern::var("x"), Pattern::var("y")));
        assert_eq!(rule.to_string(), "$x . $y => $y . $x");

        let rule = parse_rewrite("assoc", "($x . $y) . $z => $x . ($y . $z)").unwrap();
        assert_eq!(rule.rhs.to_string(), "$x . ($y . $z)");

        let rule = parse_rewrite("identity", "$x . I => $x").unwrap();
        assert_eq!(rule.lhs, Pattern::op(".", Pattern::var("x"), Pattern::leaf("I")));
    }

    #[test]
    fn rejects_bad_templates() {
        assert!(matches!(
            parse_rewrite("bad", "$x . $y"),
            Err(ParseError::MissingArrow(_))
        ));
        assert_eq!(
            parse_rewrite("bad", "$x . $y => $z"),
            Err(ParseError::UnboundVariable("z".into()))
        );
    }
}
