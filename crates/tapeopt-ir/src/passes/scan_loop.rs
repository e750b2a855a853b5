//! Replace scan loops (`[<]` and `[>]`) with `ScanLeft` / `ScanRight`.

use super::Pass;
use crate::instruction::Instruction;
use crate::program::Program;
use tapeopt_core::PassKind;
use tracing::trace;

pub struct ScanLoop;

impl Pass for ScanLoop {
    fn kind(&self) -> PassKind {
        PassKind::ScanLoop
    }

    fn run(&self, program: Program) -> Program {
        let mut out: Vec<Instruction> = Vec::with_capacity(program.len());

        for inst in program {
            out.push(inst);
            let scan = match out.as_slice() {
                [.., Instruction::LoopOpen, Instruction::MoveLeft(1), Instruction::LoopClose] => {
                    Instruction::ScanLeft
                }
                [.., Instruction::LoopOpen, Instruction::MoveRight(1), Instruction::LoopClose] => {
                    Instruction::ScanRight
                }
                _ => continue,
            };
            trace!(%scan, "Scan loop");
            out.truncate(out.len() - 3);
            out.push(scan);
        }

        Program::with_instructions(out)
    }
}
