//! Module and expression node types.
//!
//! Declaration order is significant everywhere (index assignment walks the
//! `Vec`s in order), so lists stay `Vec`. Sub-modules live in a [`BTreeMap`]
//! instead: embedding iterates the map, and the map's name ordering is what
//! makes re-encoding a module reproduce the same bytes.
//!
//! The profile is deliberately narrow: every parameter, local, global and
//! return value is an `i64`. Only imports declare explicit type names
//! (`"i32"` or `"i64"`).

use std::collections::BTreeMap;

// ══════════════════════════════════════════════════════════════════════════════
// Module
// ══════════════════════════════════════════════════════════════════════════════

/// A complete module: globals, imported functions, defined functions, and
/// named sub-modules to be embedded in the encoded output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub globals: Vec<GlobalDeclaration>,
    pub imports: Vec<FunctionImport>,
    pub functions: Vec<FunctionDefinition>,
    pub sub_modules: BTreeMap<String, Module>,
}

/// A module-level mutable `i64` global, zero-initialised.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalDeclaration {
    pub name: String,
}

impl GlobalDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// An imported function.
///
/// `internal_name` is the name bodies call it by; it shares one namespace
/// with [`FunctionDefinition`] names. `params` and `result` hold type names
/// (`"i32"` / `"i64"`) as declared by the import.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionImport {
    pub module: String,
    pub external_name: String,
    pub internal_name: String,
    pub params: Vec<String>,
    pub result: Option<String>,
}

/// A defined function.
///
/// `params` and `locals` are variable names; all of them are `i64`.
/// `returns` marks a single `i64` return. The body is an ordered expression
/// sequence evaluated for the values it leaves on the operand stack.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub params: Vec<String>,
    pub locals: Vec<String>,
    pub returns: bool,
    pub body: Vec<Expression>,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// A body expression.
///
/// Recursive positions are boxed to keep the enum size down. `StringLiteral`
/// is only meaningful as the first argument of the `dataoffset`/`datasize`
/// builtins; anywhere else it is rejected by the encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A signed 64-bit constant.
    Literal(i64),
    /// A data-name argument to `dataoffset`/`datasize`.
    StringLiteral(String),
    /// Read a parameter or local.
    LocalVariable(String),
    /// Read a global.
    GlobalVariable(String),
    /// Call a builtin by name (the fixed numeric-instruction set plus the
    /// `dataoffset`/`datasize`/`unreachable` specials).
    BuiltinCall {
        name: String,
        arguments: Vec<Expression>,
    },
    /// Call an imported or defined function by name.
    FunctionCall {
        name: String,
        arguments: Vec<Expression>,
    },
    /// Assign to a parameter or local.
    LocalAssignment {
        name: String,
        value: Box<Expression>,
    },
    /// Assign to a global.
    GlobalAssignment {
        name: String,
        value: Box<Expression>,
    },
    /// Structured conditional. Both arms are void blocks.
    If {
        condition: Box<Expression>,
        body: Vec<Expression>,
        else_body: Option<Vec<Expression>>,
    },
    /// A labelled loop. Branching to the label restarts the loop.
    Loop {
        label: String,
        body: Vec<Expression>,
    },
    /// A labelled block. Branching to the label exits the block. The label
    /// may be empty for blocks nothing branches to.
    Block {
        label: String,
        body: Vec<Expression>,
    },
    /// Unconditional branch to an enclosing loop or block label.
    Break { label: String },
    /// Conditional branch: evaluates `condition` (an `i32` on the operand
    /// stack) and branches to the label if it is non-zero.
    BreakIf {
        label: String,
        condition: Box<Expression>,
    },
}
