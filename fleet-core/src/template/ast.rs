//! The parsed template: a sequence of literal text runs and
//! expressions, each expression being a field path, a literal, or a
//! (possibly nested) function call.

use super::value::Value;

#[derive(Debug, Clone)]
pub enum Segment {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    /// A dotted field path into the data value, e.g. `.status.phase`.
    Field(Vec<String>),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    pub source: String,
    pub segments: Vec<Segment>,
}
