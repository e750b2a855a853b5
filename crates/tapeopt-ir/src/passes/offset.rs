//! Fold "move out, operate, move back" into a single offsetted operation.
//!
//! `MoveRight(k), op, MoveLeft(k)` becomes `op` at `offset + k`, and the
//! mirrored form at `offset - k`. Rewrites cascade, so `>>+<<` folds even
//! when the moves were never coalesced.

use super::Pass;
use crate::instruction::Instruction;
use crate::program::Program;
use tapeopt_core::PassKind;
use tracing::trace;

pub struct OffsetCombine;

impl Pass for OffsetCombine {
    fn kind(&self) -> PassKind {
        PassKind::OffsetCombine
    }

    fn run(&self, program: Program) -> Program {
        let mut out: Vec<Instruction> = Vec::with_capacity(program.len());

        for inst in program {
            match fold(&out, &inst) {
                Some(folded) => {
                    trace!(%folded, "Offset fold");
                    out.truncate(out.len() - 2);
                    out.push(folded);
                }
                None => out.push(inst),
            }
        }

        Program::with_instructions(out)
    }
}

/// The folded operation if `closing` ends a move/op/move-back window
fn fold(out: &[Instruction], closing: &Instruction) -> Option<Instruction> {
    let [.., opening, op] = out else {
        return None;
    };

    let delta = match (*opening, *closing) {
        (Instruction::MoveRight(k), Instruction::MoveLeft(back)) if k == back => {
            i32::try_from(k).ok()?
        }
        (Instruction::MoveLeft(k), Instruction::MoveRight(back)) if k == back => {
            i32::try_from(k).ok()?.checked_neg()?
        }
        _ => return None,
    };

    op.shifted(delta)
}
