//! # Output Templates
//!
//! Turns a nested set of user-authored template strings plus a telemetry record
//! into a tree of rendered strings of the same shape.
//!
//! ## Template strings
//!
//! Text is copied literally, `${...}` segments are evaluated against the current
//! record. The expression language is small:
//!
//! - field paths: `altitude`, `position.lat`
//! - literals: numbers, `'single'` or `"double"` quoted strings, `true`, `false`,
//!   `null`, `undefined`
//! - operators: `* / % + -`, `< <= > >= == !=`, `! && || ??`, `cond ? a : b`
//! - calls to a fixed set of helpers, see [`Function`]
//!
//! Missing fields evaluate to `undefined` instead of failing, so a template such
//! as `${speed ?? 'no fix'}` can provide its own fallback text.
//!
//! ## Nesting
//!
//! A nested mapping under the key `fitnessPointData` is rendered against the
//! record's own `fitnessPointData` field, so its templates refer to
//! `distanceMeters` rather than `fitnessPointData.distanceMeters`.

mod error;
mod expr;
mod format;
mod function;
mod lexer;
mod parser;
mod render;
mod spec;
mod value;

pub use error::TemplateError;
pub use expr::{
    BinaryOp,
    Expr,
    LogicalOp,
    UnaryOp,
};
pub use format::{
    decimal_to_time_string,
    format_number,
    pad_num,
};
pub use function::Function;
pub use render::{
    render,
    CompiledNode,
    CompiledTemplates,
    RenderedNode,
    RenderedOutput,
    Segment,
    Template,
};
pub use spec::{
    TemplateNode,
    TemplateSpec,
};
pub use value::Value;
