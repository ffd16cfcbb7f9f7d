//! Module assembler.
//!
//! Drives the encoding pipeline:
//! 1. Assign global and function indices (imports first, then definitions)
//! 2. Deduplicate signatures and emit the type section
//! 3. Emit the import, function, memory, global and export sections
//! 4. Recursively encode sub-modules into named custom sections, recording
//!    each payload's position in the output
//! 5. Emit the code section, lowering every function body
//!
//! Section order is fixed by the binary format (code last among the standard
//! sections); embedding custom sections before the code section is what lets
//! `dataoffset`/`datasize` fold to constants during body lowering.

use std::collections::{BTreeMap, HashMap};

use skiff_types::{FunctionDefinition, FunctionImport, Module};

use crate::error::{EncodeError, EncodeResult};
use crate::expr::emit_sequence;
use crate::leb128;
use crate::opcodes::*;

// ══════════════════════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════════════════════

/// Encode a resolved [`Module`] into a binary `.wasm` module.
///
/// Returns the complete module bytes (magic, version, sections) on success,
/// or the first [`EncodeError`] hit while walking the module. The input is
/// not mutated and no partial output is produced on failure.
pub fn encode(module: &Module) -> EncodeResult<Vec<u8>> {
    Encoder::run(module)
}

// ══════════════════════════════════════════════════════════════════════════════
// Signatures
// ══════════════════════════════════════════════════════════════════════════════

/// Signature dedup key: the encoded parameter and result type bytes.
///
/// `Ord` on the byte pair fixes the type-section order, so equal modules
/// always get equal type indices.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct Signature {
    params: Vec<u8>,
    results: Vec<u8>,
}

impl Signature {
    /// Imports declare their types explicitly.
    fn of_import(import: &FunctionImport) -> EncodeResult<Self> {
        let mut params = Vec::new();
        for name in &import.params {
            params.push(value_type(name)?);
        }
        let mut results = Vec::new();
        if let Some(name) = &import.result {
            results.push(value_type(name)?);
        }
        Ok(Self { params, results })
    }

    /// Definitions are implicitly `i64` throughout.
    fn of_definition(function: &FunctionDefinition) -> Self {
        Self {
            params: vec![TYPE_I64; function.params.len()],
            results: if function.returns {
                vec![TYPE_I64]
            } else {
                Vec::new()
            },
        }
    }
}

/// Value-type byte for a declared type name.
fn value_type(name: &str) -> EncodeResult<u8> {
    match name {
        "i32" => Ok(TYPE_I32),
        "i64" => Ok(TYPE_I64),
        other => Err(EncodeError::UnsupportedType(other.to_string())),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Encoder
// ══════════════════════════════════════════════════════════════════════════════

/// State for one `encode` run. Sub-modules get a fresh encoder each; the
/// parent only keeps the offsets their payloads landed at.
pub(crate) struct Encoder {
    /// Function name to function index (imports first, then definitions).
    functions: HashMap<String, u32>,
    /// Global name to global index, in declaration order.
    globals: HashMap<String, u32>,
    /// Function name to its type-section index.
    function_types: HashMap<String, u32>,
    /// Local name to local index; rebuilt for each function body, parameters
    /// first.
    locals: HashMap<String, u32>,
    /// Enclosing structured-control labels, innermost last. `if` frames push
    /// an anonymous entry so branch depths stay correct.
    labels: Vec<String>,
    /// Sub-module name to (payload offset in the final output, payload
    /// length).
    sub_modules: HashMap<String, (u64, u64)>,
}

impl Encoder {
    fn run(module: &Module) -> EncodeResult<Vec<u8>> {
        let mut encoder = Encoder {
            functions: HashMap::new(),
            globals: HashMap::new(),
            function_types: HashMap::new(),
            locals: HashMap::new(),
            labels: Vec::new(),
            sub_modules: HashMap::new(),
        };

        for (index, global) in module.globals.iter().enumerate() {
            encoder.globals.insert(global.name.clone(), index as u32);
        }
        let mut function_index = 0u32;
        for import in &module.imports {
            encoder
                .functions
                .insert(import.internal_name.clone(), function_index);
            function_index += 1;
        }
        for function in &module.functions {
            encoder.functions.insert(function.name.clone(), function_index);
            function_index += 1;
        }

        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&VERSION);
        encoder.type_section(module, &mut out)?;
        encoder.import_section(&module.imports, &mut out)?;
        encoder.function_section(&module.functions, &mut out)?;
        encoder.memory_section(&mut out);
        encoder.global_section(module.globals.len(), &mut out);
        encoder.export_section(&mut out)?;
        for (name, sub_module) in &module.sub_modules {
            let data = Encoder::run(sub_module)?;
            let length = data.len() as u64;
            custom_section(&mut out, name, &data);
            // The recorded offset is where the payload begins, not the
            // section header.
            encoder
                .sub_modules
                .insert(name.clone(), (out.len() as u64 - length, length));
        }
        encoder.code_section(&module.functions, &mut out)?;
        Ok(out)
    }

    // ── Type section ─────────────────────────────────────────────────────

    /// Emit one entry per distinct signature and record every function's
    /// type index along the way.
    fn type_section(&mut self, module: &Module, out: &mut Vec<u8>) -> EncodeResult<()> {
        let mut signatures: BTreeMap<Signature, Vec<&str>> = BTreeMap::new();
        for import in &module.imports {
            signatures
                .entry(Signature::of_import(import)?)
                .or_default()
                .push(&import.internal_name);
        }
        for function in &module.functions {
            signatures
                .entry(Signature::of_definition(function))
                .or_default()
                .push(&function.name);
        }

        let mut payload = Vec::new();
        leb128::write_unsigned(&mut payload, signatures.len() as u64);
        for (index, (signature, names)) in signatures.iter().enumerate() {
            for name in names {
                self.function_types.insert((*name).to_string(), index as u32);
            }
            payload.push(TYPE_FUNCTION);
            leb128::write_unsigned(&mut payload, signature.params.len() as u64);
            payload.extend_from_slice(&signature.params);
            leb128::write_unsigned(&mut payload, signature.results.len() as u64);
            payload.extend_from_slice(&signature.results);
        }
        section(out, SECTION_TYPE, &payload);
        Ok(())
    }

    // ── Import section ───────────────────────────────────────────────────

    fn import_section(&self, imports: &[FunctionImport], out: &mut Vec<u8>) -> EncodeResult<()> {
        let mut payload = Vec::new();
        leb128::write_unsigned(&mut payload, imports.len() as u64);
        for import in imports {
            write_name(&mut payload, &import.module);
            write_name(&mut payload, &import.external_name);
            payload.push(IMPORT_FUNCTION);
            let type_index = self.type_index(&import.internal_name)?;
            leb128::write_unsigned(&mut payload, type_index.into());
        }
        section(out, SECTION_IMPORT, &payload);
        Ok(())
    }

    // ── Function section ─────────────────────────────────────────────────

    fn function_section(
        &self,
        functions: &[FunctionDefinition],
        out: &mut Vec<u8>,
    ) -> EncodeResult<()> {
        let mut payload = Vec::new();
        leb128::write_unsigned(&mut payload, functions.len() as u64);
        for function in functions {
            leb128::write_unsigned(&mut payload, self.type_index(&function.name)?.into());
        }
        section(out, SECTION_FUNCTION, &payload);
        Ok(())
    }

    // ── Memory section ───────────────────────────────────────────────────

    /// One memory, no maximum, one initial page.
    fn memory_section(&self, out: &mut Vec<u8>) {
        let mut payload = Vec::new();
        leb128::write_unsigned(&mut payload, 1);
        payload.push(0x00); // flags
        leb128::write_unsigned(&mut payload, 1); // initial pages
        section(out, SECTION_MEMORY, &payload);
    }

    // ── Global section ───────────────────────────────────────────────────

    /// Every global is a mutable `i64` initialised to zero.
    fn global_section(&self, count: usize, out: &mut Vec<u8>) {
        let mut payload = Vec::new();
        leb128::write_unsigned(&mut payload, count as u64);
        for _ in 0..count {
            payload.push(TYPE_I64);
            payload.push(0x01); // mutable
            payload.push(OP_I64_CONST);
            leb128::write_signed(&mut payload, 0);
            payload.push(OP_END);
        }
        section(out, SECTION_GLOBAL, &payload);
    }

    // ── Export section ───────────────────────────────────────────────────

    /// Exports exactly the memory and the `main` function.
    fn export_section(&self, out: &mut Vec<u8>) -> EncodeResult<()> {
        let main_index = *self.functions.get("main").ok_or(EncodeError::MissingMain)?;
        let mut payload = Vec::new();
        leb128::write_unsigned(&mut payload, 2);
        write_name(&mut payload, "memory");
        payload.push(EXPORT_MEMORY);
        leb128::write_unsigned(&mut payload, 0);
        write_name(&mut payload, "main");
        payload.push(EXPORT_FUNCTION);
        leb128::write_unsigned(&mut payload, main_index.into());
        section(out, SECTION_EXPORT, &payload);
        Ok(())
    }

    // ── Code section ─────────────────────────────────────────────────────

    fn code_section(
        &mut self,
        functions: &[FunctionDefinition],
        out: &mut Vec<u8>,
    ) -> EncodeResult<()> {
        let mut payload = Vec::new();
        leb128::write_unsigned(&mut payload, functions.len() as u64);
        for function in functions {
            self.function_body(function, &mut payload)?;
        }
        section(out, SECTION_CODE, &payload);
        Ok(())
    }

    /// Emit one length-prefixed code entry: the local-group list, the
    /// lowered body, and the terminating `end`.
    fn function_body(
        &mut self,
        function: &FunctionDefinition,
        out: &mut Vec<u8>,
    ) -> EncodeResult<()> {
        self.locals.clear();
        let mut index = 0u32;
        for name in &function.params {
            self.locals.insert(name.clone(), index);
            index += 1;
        }
        for name in &function.locals {
            self.locals.insert(name.clone(), index);
            index += 1;
        }

        let mut body = Vec::new();
        // A single run-length group: every declared local is an i64.
        // Parameters are not part of the group.
        leb128::write_unsigned(&mut body, 1);
        leb128::write_unsigned(&mut body, function.locals.len() as u64);
        body.push(TYPE_I64);
        emit_sequence(&function.body, self, &mut body)?;
        body.push(OP_END);

        leb128::write_unsigned(out, body.len() as u64);
        out.extend_from_slice(&body);
        Ok(())
    }

    // ── Lookups used during body emission ────────────────────────────────

    pub(crate) fn function_index(&self, name: &str) -> EncodeResult<u32> {
        self.functions
            .get(name)
            .copied()
            .ok_or_else(|| EncodeError::UnresolvedName(name.to_string()))
    }

    pub(crate) fn global_index(&self, name: &str) -> EncodeResult<u32> {
        self.globals
            .get(name)
            .copied()
            .ok_or_else(|| EncodeError::UnresolvedName(name.to_string()))
    }

    pub(crate) fn local_index(&self, name: &str) -> EncodeResult<u32> {
        self.locals
            .get(name)
            .copied()
            .ok_or_else(|| EncodeError::UnresolvedName(name.to_string()))
    }

    fn type_index(&self, name: &str) -> EncodeResult<u32> {
        self.function_types
            .get(name)
            .copied()
            .ok_or_else(|| EncodeError::UnresolvedName(name.to_string()))
    }

    pub(crate) fn sub_module_range(&self, name: &str) -> EncodeResult<(u64, u64)> {
        self.sub_modules
            .get(name)
            .copied()
            .ok_or_else(|| EncodeError::MissingSubModule(name.to_string()))
    }

    // ── Label stack ──────────────────────────────────────────────────────

    pub(crate) fn push_label(&mut self, label: &str) {
        self.labels.push(label.to_string());
    }

    pub(crate) fn pop_label(&mut self) {
        self.labels.pop();
    }

    /// Branch depth to the innermost enclosing label with this name.
    pub(crate) fn label_depth(&self, label: &str) -> EncodeResult<u32> {
        self.labels
            .iter()
            .rev()
            .position(|candidate| candidate == label)
            .map(|depth| depth as u32)
            .ok_or_else(|| EncodeError::UnresolvedLabel(label.to_string()))
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Byte-level helpers
// ══════════════════════════════════════════════════════════════════════════════

/// Append a section frame: id byte, LEB128 payload length, payload.
fn section(out: &mut Vec<u8>, id: u8, payload: &[u8]) {
    out.push(id);
    leb128::write_unsigned(out, payload.len() as u64);
    out.extend_from_slice(payload);
}

/// Append a length-prefixed UTF-8 name.
fn write_name(out: &mut Vec<u8>, name: &str) {
    leb128::write_unsigned(out, name.len() as u64);
    out.extend_from_slice(name.as_bytes());
}

/// Append a custom section wrapping `data` under `name`.
fn custom_section(out: &mut Vec<u8>, name: &str, data: &[u8]) {
    let mut payload = Vec::new();
    write_name(&mut payload, name);
    payload.extend_from_slice(data);
    section(out, SECTION_CUSTOM, &payload);
}
