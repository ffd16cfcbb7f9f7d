//! Expression lowering.
//!
//! Every expression lowers to a contiguous run of stack-machine bytes.
//! Operands are pushed in left-to-right source order before the consuming
//! opcode, so argument evaluation order is preserved. Structured control
//! (`if`/`loop`/`block`) nests via the encoder's label stack, which is also
//! what branch targets resolve against.

use skiff_types::Expression;

use crate::encoder::Encoder;
use crate::error::{EncodeError, EncodeResult};
use crate::leb128;
use crate::opcodes::*;

/// Lower an ordered expression sequence.
pub(crate) fn emit_sequence(
    expressions: &[Expression],
    encoder: &mut Encoder,
    sink: &mut Vec<u8>,
) -> EncodeResult<()> {
    for expression in expressions {
        emit_expression(expression, encoder, sink)?;
    }
    Ok(())
}

/// Lower a single expression.
pub(crate) fn emit_expression(
    expression: &Expression,
    encoder: &mut Encoder,
    sink: &mut Vec<u8>,
) -> EncodeResult<()> {
    match expression {
        Expression::Literal(value) => {
            sink.push(OP_I64_CONST);
            leb128::write_signed(sink, *value);
        }
        Expression::StringLiteral(_) => {
            return Err(EncodeError::Unsupported(
                "string literal outside dataoffset/datasize".to_string(),
            ));
        }
        Expression::LocalVariable(name) => {
            sink.push(OP_LOCAL_GET);
            leb128::write_unsigned(sink, encoder.local_index(name)?.into());
        }
        Expression::GlobalVariable(name) => {
            sink.push(OP_GLOBAL_GET);
            leb128::write_unsigned(sink, encoder.global_index(name)?.into());
        }
        Expression::LocalAssignment { name, value } => {
            emit_expression(value, encoder, sink)?;
            sink.push(OP_LOCAL_SET);
            leb128::write_unsigned(sink, encoder.local_index(name)?.into());
        }
        Expression::GlobalAssignment { name, value } => {
            emit_expression(value, encoder, sink)?;
            sink.push(OP_GLOBAL_SET);
            leb128::write_unsigned(sink, encoder.global_index(name)?.into());
        }
        Expression::FunctionCall { name, arguments } => {
            emit_sequence(arguments, encoder, sink)?;
            sink.push(OP_CALL);
            leb128::write_unsigned(sink, encoder.function_index(name)?.into());
        }
        Expression::BuiltinCall { name, arguments } => {
            emit_builtin_call(name, arguments, encoder, sink)?;
        }
        Expression::If {
            condition,
            body,
            else_body,
        } => {
            emit_expression(condition, encoder, sink)?;
            sink.push(OP_IF);
            sink.push(TYPE_VOID);
            encoder.push_label("");
            emit_sequence(body, encoder, sink)?;
            if let Some(else_body) = else_body {
                sink.push(OP_ELSE);
                emit_sequence(else_body, encoder, sink)?;
            }
            encoder.pop_label();
            sink.push(OP_END);
        }
        Expression::Loop { label, body } => {
            sink.push(OP_LOOP);
            sink.push(TYPE_VOID);
            encoder.push_label(label);
            emit_sequence(body, encoder, sink)?;
            encoder.pop_label();
            sink.push(OP_END);
        }
        Expression::Block { label, body } => {
            sink.push(OP_BLOCK);
            sink.push(TYPE_VOID);
            encoder.push_label(label);
            emit_sequence(body, encoder, sink)?;
            encoder.pop_label();
            sink.push(OP_END);
        }
        Expression::Break { label } => {
            sink.push(OP_BR);
            leb128::write_unsigned(sink, encoder.label_depth(label)?.into());
        }
        Expression::BreakIf { label, condition } => {
            emit_expression(condition, encoder, sink)?;
            sink.push(OP_BR_IF);
            leb128::write_unsigned(sink, encoder.label_depth(label)?.into());
        }
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// Builtins
// ══════════════════════════════════════════════════════════════════════════════

fn emit_builtin_call(
    name: &str,
    arguments: &[Expression],
    encoder: &mut Encoder,
    sink: &mut Vec<u8>,
) -> EncodeResult<()> {
    match name {
        // The data pseudo-builtins fold to constants. Their argument is a
        // data name, not a runtime value, so nothing is lowered for it.
        "dataoffset" => {
            let (offset, _) = encoder.sub_module_range(data_name(name, arguments)?)?;
            sink.push(OP_I64_CONST);
            leb128::write_signed(sink, offset as i64);
        }
        "datasize" => {
            let (_, length) = encoder.sub_module_range(data_name(name, arguments)?)?;
            sink.push(OP_I64_CONST);
            leb128::write_signed(sink, length as i64);
        }
        "unreachable" => {
            emit_sequence(arguments, encoder, sink)?;
            sink.push(OP_UNREACHABLE);
        }
        _ => {
            let Some(opcode) = builtin(name) else {
                return Err(EncodeError::UnknownBuiltin(name.to_string()));
            };
            emit_sequence(arguments, encoder, sink)?;
            sink.push(opcode);
            if name.contains(".load") || name.contains(".store") {
                sink.extend_from_slice(&MEMARG);
            }
        }
    }
    Ok(())
}

/// The data-name argument of `dataoffset`/`datasize`.
fn data_name<'a>(builtin_name: &str, arguments: &'a [Expression]) -> EncodeResult<&'a str> {
    match arguments.first() {
        Some(Expression::StringLiteral(name)) => Ok(name),
        _ => Err(EncodeError::Unsupported(format!(
            "{builtin_name} expects a data name as its first argument"
        ))),
    }
}
