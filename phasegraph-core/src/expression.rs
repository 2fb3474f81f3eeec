//! Guard expression compiler and evaluator.
//!
//! Guards are boolean expressions evaluated against a node's data. The
//! language supports:
//!
//! - `name` - variable truthiness (missing variables are false)
//! - `properties.name` - property truthiness
//! - `a == b`, `a != b` - equality (ints and floats compare numerically)
//! - `a < b`, `a <= b`, `a > b`, `a >= b` - numeric ordering
//! - `!expr` - logical NOT
//! - `expr && expr` - logical AND (binds tighter than OR)
//! - `expr || expr` - logical OR
//! - `(expr)` - grouping
//!
//! Literals are `true`/`false`, numbers (`42`, `-3.5`) and double-quoted
//! strings. Comparisons do not chain: `a < b < c` is rejected.
//!
//! Examples:
//! - `hp > 0 && !stunned`
//! - `properties.kind == "boss" || rage >= 100`
//! - `(x < 5) || (y > 15)`

use std::borrow::Cow;
use std::fmt;

use crate::error::CoreError;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::value::Value;

const PROPERTY_PREFIX: &str = "properties.";

/// Read access to the data a guard is evaluated against.
pub trait Bindings {
    /// Looks up a runtime variable.
    fn var(&self, name: &str) -> Option<&Value>;

    /// Looks up a static property.
    fn property(&self, name: &str) -> Option<&Value>;
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn from_token(token: &Token) -> Option<Self> {
        if token.kind != TokenKind::Op {
            return None;
        }
        match token.text.as_str() {
            "==" => Some(CmpOp::Eq),
            "!=" => Some(CmpOp::Ne),
            "<" => Some(CmpOp::Lt),
            "<=" => Some(CmpOp::Le),
            ">" => Some(CmpOp::Gt),
            ">=" => Some(CmpOp::Ge),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// Terminal of the expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Ident(String),
    Number(f64),
    Str(String),
    Bool(bool),
}

/// A node of the compiled expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    Leaf(Leaf),
    Not(Box<ExprNode>),
    And(Box<ExprNode>, Box<ExprNode>),
    Or(Box<ExprNode>, Box<ExprNode>),
    Cmp(CmpOp, Box<ExprNode>, Box<ExprNode>),
}

impl ExprNode {
    /// Evaluates this subtree in boolean context.
    pub fn evaluate<B: Bindings + ?Sized>(&self, scope: &B) -> Result<bool, CoreError> {
        match self {
            ExprNode::Leaf(Leaf::Bool(b)) => Ok(*b),
            ExprNode::Leaf(Leaf::Number(n)) => Ok(*n != 0.0),
            ExprNode::Leaf(Leaf::Str(s)) => Ok(!s.is_empty()),
            ExprNode::Leaf(Leaf::Ident(path)) => {
                Ok(lookup(scope, path).is_some_and(Value::is_truthy))
            }
            ExprNode::Not(inner) => Ok(!inner.evaluate(scope)?),
            ExprNode::And(left, right) => Ok(left.evaluate(scope)? && right.evaluate(scope)?),
            ExprNode::Or(left, right) => Ok(left.evaluate(scope)? || right.evaluate(scope)?),
            ExprNode::Cmp(op, left, right) => {
                let lhs = left.operand(scope)?;
                let rhs = right.operand(scope)?;
                compare(*op, &lhs, &rhs)
            }
        }
    }

    /// Resolves this subtree to a concrete value for use as a comparison
    /// operand. Identifiers must exist here.
    fn operand<'a, B: Bindings + ?Sized>(
        &'a self,
        scope: &'a B,
    ) -> Result<Cow<'a, Value>, CoreError> {
        match self {
            ExprNode::Leaf(Leaf::Bool(b)) => Ok(Cow::Owned(Value::Bool(*b))),
            ExprNode::Leaf(Leaf::Number(n)) => Ok(Cow::Owned(Value::Float(*n))),
            ExprNode::Leaf(Leaf::Str(s)) => Ok(Cow::Owned(Value::String(s.clone()))),
            ExprNode::Leaf(Leaf::Ident(path)) => match path.strip_prefix(PROPERTY_PREFIX) {
                Some(name) => scope
                    .property(name)
                    .map(Cow::Borrowed)
                    .ok_or_else(|| CoreError::UnknownProperty {
                        name: name.to_string(),
                    }),
                None => scope
                    .var(path)
                    .map(Cow::Borrowed)
                    .ok_or_else(|| CoreError::UnknownVariable { name: path.clone() }),
            },
            other => Ok(Cow::Owned(Value::Bool(other.evaluate(scope)?))),
        }
    }
}

fn lookup<'a, B: Bindings + ?Sized>(scope: &'a B, path: &str) -> Option<&'a Value> {
    match path.strip_prefix(PROPERTY_PREFIX) {
        Some(name) => scope.property(name),
        None => scope.var(path),
    }
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<bool, CoreError> {
    match op {
        CmpOp::Eq => Ok(lhs.loose_eq(rhs)),
        CmpOp::Ne => Ok(!lhs.loose_eq(rhs)),
        CmpOp::Lt => numeric_pair(op, lhs, rhs).map(|(a, b)| a < b),
        CmpOp::Le => numeric_pair(op, lhs, rhs).map(|(a, b)| a <= b),
        CmpOp::Gt => numeric_pair(op, lhs, rhs).map(|(a, b)| a > b),
        CmpOp::Ge => numeric_pair(op, lhs, rhs).map(|(a, b)| a >= b),
    }
}

fn numeric_pair(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<(f64, f64), CoreError> {
    Ok((
        lhs.numeric_operand(op.as_str())?,
        rhs.numeric_operand(op.as_str())?,
    ))
}

/// A compiled guard expression.
///
/// Compilation happens once; evaluation walks the stored tree and never
/// re-parses. Compiled expressions are immutable and can be shared freely
/// between threads.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: ExprNode,
}

impl Expression {
    /// Compiles a guard expression.
    pub fn compile(source: &str) -> Result<Self, CoreError> {
        if source.trim().is_empty() {
            return Err(CoreError::invalid_expression("empty expression"));
        }

        let root = Parser::new(source)?.parse()?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// Evaluates the expression against the given bindings.
    pub fn evaluate<B: Bindings + ?Sized>(&self, scope: &B) -> Result<bool, CoreError> {
        self.root.evaluate(scope)
    }

    /// Returns the text this expression was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &ExprNode {
        &self.root
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Compiles a guard expression.
pub fn compile(source: &str) -> Result<Expression, CoreError> {
    Expression::compile(source)
}

/// Maximum nesting of parentheses and `!`, and maximum depth of the
/// compiled tree. Evaluation recurses over the tree, so both are bounded.
pub const MAX_DEPTH: usize = 256;

/// A parsed subtree with its depth.
type Parsed = (ExprNode, usize);

/// Recursive descent parser over the token stream.
struct Parser<'a> {
    lexer: Lexer<'a>,
    cur: Token,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self, CoreError> {
        let mut lexer = Lexer::new(input);
        let cur = lexer.next_token()?;
        Ok(Self {
            lexer,
            cur,
            nesting: 0,
        })
    }

    fn parse(mut self) -> Result<ExprNode, CoreError> {
        let (expr, _) = self.parse_or()?;
        if self.cur.kind != TokenKind::End {
            return Err(CoreError::invalid_expression(format!(
                "unexpected token '{}' at position {}",
                self.cur.text, self.cur.pos
            )));
        }
        Ok(expr)
    }

    fn advance(&mut self) -> Result<Token, CoreError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.cur, next))
    }

    fn too_deep(&self) -> CoreError {
        CoreError::invalid_expression(format!(
            "expression nested deeper than {} levels at position {}",
            MAX_DEPTH, self.cur.pos
        ))
    }

    /// Wraps children into a new node, enforcing the depth limit.
    fn build(&self, node: ExprNode, child_depth: usize) -> Result<Parsed, CoreError> {
        let depth = child_depth + 1;
        if depth > MAX_DEPTH {
            return Err(self.too_deep());
        }
        Ok((node, depth))
    }

    fn descend(&mut self) -> Result<(), CoreError> {
        if self.nesting >= MAX_DEPTH {
            return Err(self.too_deep());
        }
        self.nesting += 1;
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Parsed, CoreError> {
        let mut left = self.parse_and()?;
        while self.cur.is_op("||") {
            self.advance()?;
            let right = self.parse_and()?;
            let depth = left.1.max(right.1);
            left = self.build(ExprNode::Or(Box::new(left.0), Box::new(right.0)), depth)?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Parsed, CoreError> {
        let mut left = self.parse_not()?;
        while self.cur.is_op("&&") {
            self.advance()?;
            let right = self.parse_not()?;
            let depth = left.1.max(right.1);
            left = self.build(ExprNode::And(Box::new(left.0), Box::new(right.0)), depth)?;
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Parsed, CoreError> {
        if self.cur.is_op("!") {
            self.advance()?;
            self.descend()?;
            let (inner, depth) = self.parse_not()?; // allows !!x
            self.nesting -= 1;
            return self.build(ExprNode::Not(Box::new(inner)), depth);
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> Result<Parsed, CoreError> {
        let left = self.parse_primary()?;
        match CmpOp::from_token(&self.cur) {
            Some(op) => {
                self.advance()?;
                let right = self.parse_primary()?;
                let depth = left.1.max(right.1);
                self.build(ExprNode::Cmp(op, Box::new(left.0), Box::new(right.0)), depth)
            }
            None => Ok(left),
        }
    }

    fn parse_primary(&mut self) -> Result<Parsed, CoreError> {
        let leaf = match self.cur.kind {
            TokenKind::LParen => {
                self.advance()?;
                self.descend()?;
                let expr = self.parse_or()?;
                if self.cur.kind != TokenKind::RParen {
                    return Err(CoreError::invalid_expression(format!(
                        "expected ')' at position {}",
                        self.cur.pos
                    )));
                }
                self.nesting -= 1;
                self.advance()?;
                return Ok(expr);
            }
            TokenKind::Bool => {
                let token = self.advance()?;
                Leaf::Bool(token.text == "true")
            }
            TokenKind::Number => {
                let token = self.advance()?;
                let n = token.text.parse::<f64>().map_err(|_| {
                    CoreError::invalid_expression(format!("invalid number: '{}'", token.text))
                })?;
                Leaf::Number(n)
            }
            TokenKind::Str => Leaf::Str(self.advance()?.text),
            TokenKind::Ident => Leaf::Ident(self.advance()?.text),
            TokenKind::End => {
                return Err(CoreError::invalid_expression(format!(
                    "unexpected end of expression at position {}",
                    self.cur.pos
                )))
            }
            TokenKind::Op | TokenKind::RParen => {
                return Err(CoreError::invalid_expression(format!(
                    "unexpected token '{}' at position {}",
                    self.cur.text, self.cur.pos
                )))
            }
        };
        Ok((ExprNode::Leaf(leaf), 1))
    }
}
