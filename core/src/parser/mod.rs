//! PEST-based parser for the catflow workflow language
//!
//! Turns source text into a [`Program`]: the type signatures it declares, its
//! functor table and the single top-level expression. Every node carries a
//! span for error reporting and a [`NodeId`] for the validator's side table.

use std::collections::HashMap;

use indexmap::IndexMap;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use crate::ast::{Node, NodeId, Program, Signature, Span};
use crate::types::Type;


/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "parser/catflow.pest"]
struct CatflowParser;

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// The text does not match the grammar
    #[error("syntax error at {}: {message}", location(.span))]
    Syntax { message: String, span: Option<Span> },
    /// The text matches the grammar but cannot form a valid program
    #[error("{message} at {span}")]
    Build { message: String, span: Span },
}

fn location(span: &Option<Span>) -> String {
    span.map(|s| s.to_string())
        .unwrap_or_else(|| "unknown location".to_string())
}

impl ParseError {
    fn build(message: impl Into<String>, span: Span) -> Self {
        ParseError::Build {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::Syntax { span, .. } => *span,
            ParseError::Build { span, .. } => Some(*span),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::Syntax { message, .. } | ParseError::Build { message, .. } => message,
        }
    }

    /// 1-indexed line of the offending position
    pub fn line(&self) -> Option<usize> {
        self.span().map(|s| s.start_line + 1)
    }

    /// 1-indexed column of the offending position
    pub fn column(&self) -> Option<usize> {
        self.span().map(|s| s.start_col + 1)
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let err = err.renamed_rules(describe_rule);
        let span = match err.line_col {
            pest::error::LineColLocation::Pos((line, col)) => {
                let offset = match err.location {
                    pest::error::InputLocation::Pos(pos) => pos,
                    pest::error::InputLocation::Span((start, _)) => start,
                };
                Some(Span::new(
                    offset,
                    offset,
                    line.saturating_sub(1),
                    col.saturating_sub(1),
                    line.saturating_sub(1),
                    col.saturating_sub(1),
                ))
            }
            pest::error::LineColLocation::Span((start_line, start_col), (end_line, end_col)) => {
                let (start, end) = match err.location {
                    pest::error::InputLocation::Pos(pos) => (pos, pos),
                    pest::error::InputLocation::Span(range) => range,
                };
                Some(Span::new(
                    start,
                    end,
                    start_line.saturating_sub(1),
                    start_col.saturating_sub(1),
                    end_line.saturating_sub(1),
                    end_col.saturating_sub(1),
                ))
            }
        };
        ParseError::Syntax {
            message: err.variant.message().into_owned(),
            span,
        }
    }
}

fn describe_rule(rule: &Rule) -> String {
    match rule {
        Rule::EOI => "end of input",
        Rule::identifier | Rule::type_ident => "name",
        Rule::signature => "type signature",
        Rule::functor_decl => "functor declaration",
        Rule::expression | Rule::product_expr => "expression",
        Rule::op_compose => "'∘'",
        Rule::op_product => "'×'",
        Rule::type_expr | Rule::type_product | Rule::type_name => "type",
        Rule::unit_type => "'()'",
        Rule::type_args => "type arguments",
        other => return format!("{:?}", other),
    }
    .to_string()
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Span Helpers ===================== */

/// Convert a PEST pair's span to our Span type
fn pair_to_span(pair: &Pair<Rule>, source: &str) -> Span {
    let pest_span = pair.as_span();
    let start = pest_span.start();
    let end = pest_span.end();

    let (start_line, start_col) = offset_to_line_col(source, start);
    let (end_line, end_col) = offset_to_line_col(source, end);

    Span::new(start, end, start_line, start_col, end_line, end_col)
}

/// Convert byte offset to (line, column) - 0-indexed, columns in chars
fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 0;
    let mut col = 0;

    for (idx, ch) in source.char_indices() {
        if idx >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }

    (line, col)
}

fn next_pair<'i>(
    pairs: &mut pest::iterators::Pairs<'i, Rule>,
    expected: &str,
    span: Span,
) -> ParseResult<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| ParseError::build(format!("Expected {}", expected), span))
}

/* ===================== Public API ===================== */

/// Parse a complete program
pub fn parse(source: &str) -> ParseResult<Program> {
    let mut pairs = CatflowParser::parse(Rule::program, source)?;
    let program = pairs
        .next()
        .ok_or_else(|| ParseError::build("Empty parse result", Span::default()))?;

    let program = Builder::new(source).build_program(program)?;
    tracing::debug!(
        signatures = program.signatures.len(),
        functors = program.functors.len(),
        "parsed program"
    );
    Ok(program)
}

/// Parse a signature-only file (`name :: Type` lines and comments)
pub fn parse_signatures(source: &str) -> ParseResult<Vec<Signature>> {
    let mut pairs = CatflowParser::parse(Rule::signature_file, source)?;
    let file = pairs
        .next()
        .ok_or_else(|| ParseError::build("Empty parse result", Span::default()))?;

    let builder = Builder::new(source);
    let mut signatures: IndexMap<String, Signature> = IndexMap::new();
    for pair in file.into_inner() {
        if pair.as_rule() == Rule::signature {
            let sig = builder.build_signature(pair)?;
            insert_signature(&mut signatures, sig)?;
        }
    }
    Ok(signatures.into_values().collect())
}

/// Parse a lone expression. Every name becomes a leaf literal.
pub fn parse_expression(source: &str) -> ParseResult<Node> {
    let mut pairs = CatflowParser::parse(Rule::expression_only, source)?;
    let wrapper = pairs
        .next()
        .ok_or_else(|| ParseError::build("Empty parse result", Span::default()))?;
    let span = pair_to_span(&wrapper, source);
    let expr = next_pair(&mut wrapper.into_inner(), "expression", span)?;

    let mut builder = Builder::new(source);
    builder.build_expression(expr)
}

/// Parse a standalone type expression such as `Data -> (A × B)`.
pub fn parse_type(source: &str) -> ParseResult<Type> {
    let sig = format!("_ :: {}", source);
    let mut signatures = parse_signatures(&sig)?;
    signatures
        .pop()
        .map(|sig| sig.ty)
        .ok_or_else(|| ParseError::build("Expected a type", Span::default()))
}

fn insert_signature(
    signatures: &mut IndexMap<String, Signature>,
    sig: Signature,
) -> ParseResult<()> {
    if let Some(previous) = signatures.get(&sig.name) {
        return Err(ParseError::build(
            format!(
                "Duplicate type signature for '{}' (first declared at {})",
                sig.name, previous.span
            ),
            sig.span,
        ));
    }
    signatures.insert(sig.name.clone(), sig);
    Ok(())
}

/* ===================== AST Builder ===================== */

/// Where functors may be referenced from.
#[derive(Debug, Clone, Copy)]
enum Scope {
    /// Item at this position; functors declared at or after it are off limits
    Item(usize),
    /// Standalone expression with no functor table
    Detached,
}

struct Builder<'s> {
    source: &'s str,
    next_id: u32,
    /// Functor name -> (item position, declaration span)
    functor_positions: HashMap<String, (usize, Span)>,
    scope: Scope,
}

impl<'s> Builder<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            next_id: 0,
            functor_positions: HashMap::new(),
            scope: Scope::Detached,
        }
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn span(&self, pair: &Pair<Rule>) -> Span {
        pair_to_span(pair, self.source)
    }

    fn build_program(mut self, pair: Pair<Rule>) -> ParseResult<Program> {
        let program_span = self.span(&pair);
        let items: Vec<Pair<Rule>> = pair
            .into_inner()
            .filter(|p| p.as_rule() != Rule::EOI)
            .collect();

        // First pass: know every functor up front so forward references can
        // be reported as such rather than as unknown tasks.
        for (position, item) in items.iter().enumerate() {
            if item.as_rule() == Rule::functor_decl {
                let name_pair = item
                    .clone()
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::identifier)
                    .ok_or_else(|| {
                        ParseError::build("Functor declaration without a name", self.span(item))
                    })?;
                let name = name_pair.as_str().to_string();
                let span = self.span(&name_pair);
                if let Some((_, first)) = self.functor_positions.get(&name) {
                    return Err(ParseError::build(
                        format!(
                            "Duplicate functor name '{}' (first declared at {})",
                            name, first
                        ),
                        span,
                    ));
                }
                self.functor_positions.insert(name, (position, span));
            }
        }

        let mut signatures = IndexMap::new();
        let mut functors = IndexMap::new();
        let mut root: Option<Node> = None;

        for (position, item) in items.into_iter().enumerate() {
            self.scope = Scope::Item(position);
            match item.as_rule() {
                Rule::signature => {
                    let sig = self.build_signature(item)?;
                    insert_signature(&mut signatures, sig)?;
                }
                Rule::functor_decl => {
                    let functor = self.build_functor(item)?;
                    if let Node::Functor { name, .. } = &functor {
                        functors.insert(name.clone(), functor.clone());
                    }
                }
                Rule::expression => {
                    let span = self.span(&item);
                    if let Some(existing) = &root {
                        return Err(ParseError::build(
                            format!(
                                "Program has more than one top-level expression (first at {})",
                                existing.span()
                            ),
                            span,
                        ));
                    }
                    root = Some(self.build_expression(item)?);
                }
                other => {
                    return Err(ParseError::build(
                        format!("Unexpected program item: {:?}", other),
                        self.span(&item),
                    ))
                }
            }
        }

        let root = root.ok_or_else(|| {
            ParseError::build("Program has no top-level expression", program_span)
        })?;

        Ok(Program {
            signatures,
            functors,
            root,
            span: program_span,
        })
    }

    fn build_signature(&self, pair: Pair<Rule>) -> ParseResult<Signature> {
        let span = self.span(&pair);
        let mut inner = pair.into_inner();
        let name = next_pair(&mut inner, "task name", span)?.as_str().to_string();
        let ty_pair = next_pair(&mut inner, "type", span)?;
        let ty = self.build_type(ty_pair)?;
        Ok(Signature { name, ty, span })
    }

    fn build_functor(&mut self, pair: Pair<Rule>) -> ParseResult<Node> {
        let span = self.span(&pair);
        let mut inner = pair
            .into_inner()
            .filter(|p| p.as_rule() != Rule::kw_functor);

        let name = inner
            .next()
            .ok_or_else(|| ParseError::build("Expected functor name", span))?
            .as_str()
            .to_string();
        let body_pair = inner
            .next()
            .ok_or_else(|| ParseError::build("Expected functor body", span))?;
        let body = self.build_expression(body_pair)?;

        Ok(Node::Functor {
            id: self.fresh_id(),
            name,
            body: Box::new(body),
            span,
        })
    }

    fn build_expression(&mut self, pair: Pair<Rule>) -> ParseResult<Node> {
        let span = self.span(&pair);

        match pair.as_rule() {
            Rule::expression => self.fold_binary(pair, Rule::op_compose),
            Rule::product_expr => self.fold_binary(pair, Rule::op_product),
            Rule::identifier => self.build_literal(pair),
            other => Err(ParseError::build(
                format!("Unexpected expression rule: {:?}", other),
                span,
            )),
        }
    }

    /// Fold `a op b op c` to the left: `(a op b) op c`.
    fn fold_binary(&mut self, pair: Pair<Rule>, op_rule: Rule) -> ParseResult<Node> {
        let span = self.span(&pair);
        let mut operands = pair.into_inner().filter(|p| p.as_rule() != op_rule);

        let first = operands
            .next()
            .ok_or_else(|| ParseError::build("Empty expression", span))?;
        let mut acc = self.build_expression(first)?;

        for operand in operands {
            let right = self.build_expression(operand)?;
            let merged = acc.span().merge(&right.span());
            let id = self.fresh_id();
            acc = match op_rule {
                Rule::op_compose => Node::Composition {
                    id,
                    outer: Box::new(acc),
                    inner: Box::new(right),
                    span: merged,
                },
                _ => Node::Product {
                    id,
                    left: Box::new(acc),
                    right: Box::new(right),
                    span: merged,
                },
            };
        }

        Ok(acc)
    }

    fn build_literal(&mut self, pair: Pair<Rule>) -> ParseResult<Node> {
        let span = self.span(&pair);
        let name = pair.as_str().to_string();

        if let Scope::Item(position) = self.scope {
            if let Some((declared_at, decl_span)) = self.functor_positions.get(&name) {
                if *declared_at == position {
                    return Err(ParseError::build(
                        format!("Functor '{}' cannot reference itself", name),
                        span,
                    ));
                }
                if *declared_at > position {
                    return Err(ParseError::build(
                        format!(
                            "Functor '{}' is used before its declaration at {}",
                            name, decl_span
                        ),
                        span,
                    ));
                }
            }
        }

        Ok(Node::Literal {
            id: self.fresh_id(),
            name,
            span,
        })
    }

    /* ===================== Types ===================== */

    fn build_type(&self, pair: Pair<Rule>) -> ParseResult<Type> {
        let span = self.span(&pair);

        match pair.as_rule() {
            Rule::type_expr => {
                let mut inner = pair.into_inner();
                let domain = self.build_type(next_pair(&mut inner, "type", span)?)?;
                match inner.next() {
                    Some(codomain) => Ok(Type::function(domain, self.build_type(codomain)?)),
                    None => Ok(domain),
                }
            }
            Rule::type_product => {
                let mut atoms = pair.into_inner().filter(|p| p.as_rule() != Rule::op_product);
                let first = atoms
                    .next()
                    .ok_or_else(|| ParseError::build("Expected type", span))?;
                let mut acc = self.build_type(first)?;
                for atom in atoms {
                    acc = Type::product(acc, self.build_type(atom)?);
                }
                Ok(acc)
            }
            Rule::unit_type => Ok(Type::Unit),
            Rule::type_name => self.build_type_name(pair),
            other => Err(ParseError::build(
                format!("Unexpected type rule: {:?}", other),
                span,
            )),
        }
    }

    fn build_type_name(&self, pair: Pair<Rule>) -> ParseResult<Type> {
        let span = self.span(&pair);
        let mut inner = pair.into_inner();
        let name = next_pair(&mut inner, "type name", span)?.as_str();

        match inner.next() {
            // Parameterized constructors are opaque: keep a normalized name.
            Some(args) => {
                let rendered: Vec<String> = args
                    .into_inner()
                    .map(|arg| self.build_type(arg).map(|ty| ty.to_string()))
                    .collect::<ParseResult<_>>()?;
                Ok(Type::mono(format!("{}[{}]", name, rendered.join(", "))))
            }
            None if name == "Unit" => Ok(Type::Unit),
            None if is_type_variable(name) => Ok(Type::var(name)),
            None => Ok(Type::mono(name)),
        }
    }
}

fn is_type_variable(name: &str) -> bool {
    let mut chars = name.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_lowercase())
}
