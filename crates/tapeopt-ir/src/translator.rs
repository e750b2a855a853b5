//! Translation from source text to raw IR.
//!
//! Characters outside `< > + - . , [ ]` are comments and are dropped.

use crate::instruction::Instruction;
use crate::program::Program;
use tapeopt_core::{MalformedSource, Result};
use tracing::debug;

/// Translate source text into one instruction per recognized character.
///
/// Fails with [`MalformedSource::UnbalancedBrackets`] when the bracket
/// counts differ, and with [`MalformedSource::UnmatchedClose`] when the
/// counts agree but a `]` appears before its `[` (e.g. `"]["`).
pub fn translate(source: &str) -> Result<Program> {
    let mut instructions = Vec::with_capacity(source.len());
    let mut depth: usize = 0;
    let mut opens = 0;
    let mut closes = 0;
    let mut first_unmatched_close = None;

    for (offset, c) in source.char_indices() {
        let Some(inst) = Instruction::from_char(c) else {
            continue;
        };

        match inst {
            Instruction::LoopOpen => {
                opens += 1;
                depth += 1;
            }
            Instruction::LoopClose => {
                closes += 1;
                match depth.checked_sub(1) {
                    Some(d) => depth = d,
                    None => {
                        first_unmatched_close.get_or_insert(offset);
                    }
                }
            }
            _ => {}
        }

        instructions.push(inst);
    }

    if opens != closes {
        return Err(MalformedSource::UnbalancedBrackets { opens, closes }.into());
    }
    if let Some(offset) = first_unmatched_close {
        return Err(MalformedSource::UnmatchedClose { offset }.into());
    }

    debug!(
        source_len = source.len(),
        instructions = instructions.len(),
        loops = opens,
        "Translated source"
    );

    Ok(Program::with_instructions(instructions))
}
