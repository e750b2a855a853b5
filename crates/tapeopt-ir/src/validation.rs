//! Validation for IR programs.

use crate::instruction::Instruction;
use crate::program::Program;
use tapeopt_core::{MalformedSource, Result};

/// Validate that a program's loop brackets are well-formed
pub fn validate_program(program: &Program) -> Result<()> {
    let mut depth: usize = 0;
    let mut opens = 0;
    let mut closes = 0;

    for (index, inst) in program.iter().enumerate() {
        match inst {
            Instruction::LoopOpen => {
                opens += 1;
                depth += 1;
            }
            Instruction::LoopClose => {
                closes += 1;
                depth = depth
                    .checked_sub(1)
                    .ok_or(MalformedSource::UnmatchedClose { offset: index })?;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(MalformedSource::UnbalancedBrackets { opens, closes }.into());
    }

    Ok(())
}

/// Pair every `LoopOpen` with its `LoopClose`.
///
/// `pairs[i]` holds the partner index for matched brackets and `None` for
/// everything else, including brackets left unmatched in a malformed
/// program.
pub fn loop_pairs(program: &Program) -> Vec<Option<usize>> {
    let mut pairs = vec![None; program.len()];
    let mut stack = Vec::new();
    for (index, inst) in program.iter().enumerate() {
        match inst {
            Instruction::LoopOpen => stack.push(index),
            Instruction::LoopClose => {
                if let Some(open) = stack.pop() {
                    pairs[open] = Some(index);
                    pairs[index] = Some(open);
                }
            }
            _ => {}
        }
    }

    pairs
}
