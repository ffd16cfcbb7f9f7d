//! Shared types for the Skiff WebAssembly back-end.
//!
//! This crate defines the structured module representation the binary
//! encoder consumes: functions, imports, globals, sub-modules, and the
//! expression tree of function bodies. The front-end produces these values
//! fully resolved; the encoder treats them as read-only input.

pub mod module;

pub use module::{
    Expression, FunctionDefinition, FunctionImport, GlobalDeclaration, Module,
};
