//! Replace clear loops (`[-]` and `[+]`) with a single `ClearCell`.

use super::Pass;
use crate::instruction::Instruction;
use crate::program::Program;
use tapeopt_core::PassKind;
use tracing::trace;

pub struct ClearLoop;

impl Pass for ClearLoop {
    fn kind(&self) -> PassKind {
        PassKind::ClearLoop
    }

    fn run(&self, program: Program) -> Program {
        let mut out: Vec<Instruction> = Vec::with_capacity(program.len());

        for inst in program {
            out.push(inst);
            let is_clear = matches!(
                out.as_slice(),
                [.., Instruction::LoopOpen, body, Instruction::LoopClose] if is_unit_step(body)
            );
            if is_clear {
                trace!(at = out.len() - 3, "Clear loop");
                out.truncate(out.len() - 3);
                out.push(Instruction::ClearCell { offset: 0 });
            }
        }

        Program::with_instructions(out)
    }
}

/// In-place increment or decrement by exactly one
fn is_unit_step(inst: &Instruction) -> bool {
    matches!(
        inst,
        Instruction::Add { count: 1, offset: 0 } | Instruction::Sub { count: 1, offset: 0 }
    )
}
