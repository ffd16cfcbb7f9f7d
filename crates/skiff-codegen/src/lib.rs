//! Skiff IR to WebAssembly binary encoder.
//!
//! # Architecture
//!
//! The encoder takes a resolved [`skiff_types::Module`] and produces the
//! bytes of a binary `.wasm` module in a single pass:
//!
//! 1. Assign global and function indices (imports first, then definitions)
//! 2. Deduplicate function signatures and emit the type section
//! 3. Emit the import, function, memory, global and export sections
//! 4. Recursively encode each sub-module and embed it as a custom section
//!    named after it, recording where its payload landed in the output
//! 5. Emit the code section; the `dataoffset`/`datasize` pseudo-builtins
//!    fold to the offsets and lengths recorded in step 4
//!
//! # Output contract
//!
//! The result starts with `\0asm` and version 1, followed by the sections
//! in the fixed order type, import, function, memory, global, export, one
//! custom section per sub-module, code. The module always exports its
//! memory as `"memory"` and the function named `"main"`.
//!
//! Encoding is deterministic: the same module always yields the same bytes.

pub mod encoder;
pub mod error;
mod expr;
pub mod leb128;
pub mod opcodes;

pub use encoder::encode;
pub use error::{EncodeError, EncodeResult};
