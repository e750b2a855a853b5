//! Contract multiply/copy loops into straight-line arithmetic.
//!
//! A loop qualifies when its body is only `Add`/`Sub` (any offset) and
//! pointer motion that returns to the start, and the net change to the
//! controlling cell is exactly -1. Each iteration then adds the same delta
//! to every other touched cell, so the loop runs `mem[p]` times and is
//! equivalent to one `MultiplyAdd` per target followed by `ClearCell(0)`.
//!
//! `[->++>+++<<]` becomes `MultiplyAdd(1, 2), MultiplyAdd(2, 3), ClearCell(0)`.

use super::{innermost_open, Pass};
use crate::instruction::Instruction;
use crate::program::Program;
use std::collections::BTreeMap;
use tapeopt_core::PassKind;
use tracing::trace;

pub struct Contract;

impl Pass for Contract {
    fn kind(&self) -> PassKind {
        PassKind::Contract
    }

    fn run(&self, program: Program) -> Program {
        let mut out: Vec<Instruction> = Vec::with_capacity(program.len());

        for inst in program {
            if inst == Instruction::LoopClose {
                if let Some(open) = innermost_open(&out) {
                    if let Some(replacement) = contract_loop(&out[open + 1..]) {
                        trace!(at = open, ops = replacement.len(), "Contracted loop");
                        out.truncate(open);
                        out.extend(replacement);
                        continue;
                    }
                }
            }
            out.push(inst);
        }

        Program::with_instructions(out)
    }
}

/// Straight-line replacement for a loop body, or `None` if the loop cannot
/// be proven to be a multiply loop.
fn contract_loop(body: &[Instruction]) -> Option<Vec<Instruction>> {
    let mut position: i64 = 0;
    let mut deltas: BTreeMap<i64, i64> = BTreeMap::new();

    for inst in body {
        match *inst {
            Instruction::Add { count, offset } => {
                *deltas.entry(position + offset as i64).or_insert(0) += count as i64;
            }
            Instruction::Sub { count, offset } => {
                *deltas.entry(position + offset as i64).or_insert(0) -= count as i64;
            }
            Instruction::MoveRight(_) | Instruction::MoveLeft(_) => {
                position += inst.pointer_delta()?;
            }
            _ => return None,
        }
    }

    if position != 0 || deltas.get(&0) != Some(&-1) {
        return None;
    }

    let mut replacement = Vec::with_capacity(deltas.len());
    for (offset, delta) in deltas {
        if offset == 0 || delta == 0 {
            continue;
        }
        let offset = i32::try_from(offset).ok()?;
        let inst = match delta {
            1 => Instruction::CopyCell { offset },
            factor => Instruction::MultiplyAdd {
                offset,
                factor: i32::try_from(factor).ok()?,
            },
        };
        replacement.push(inst);
    }
    replacement.push(Instruction::ClearCell { offset: 0 });

    Some(replacement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::{Cancel, OffsetCombine};
    use crate::translator::translate;
    use Instruction::*;

    fn contract(source: &str) -> Vec<Instruction> {
        let program = Cancel.run(translate(source).unwrap());
        Contract.run(program).into_instructions()
    }

    #[test]
    fn test_copy_loop() {
        assert_eq!(
            contract("[->+<]"),
            vec![CopyCell { offset: 1 }, ClearCell { offset: 0 }]
        );
    }

    #[test]
    fn test_multiply_loop_with_several_targets() {
        assert_eq!(
            contract("[->++>+++<<]"),
            vec![
                MultiplyAdd { offset: 1, factor: 2 },
                MultiplyAdd { offset: 2, factor: 3 },
                ClearCell { offset: 0 },
            ]
        );
    }

    #[test]
    fn test_decrement_position_does_not_matter() {
        assert_eq!(
            contract("[<++++>-]"),
            vec![MultiplyAdd { offset: -1, factor: 4 }, ClearCell { offset: 0 }]
        );
    }

    #[test]
    fn test_negative_factor() {
        assert_eq!(
            contract("[->--<]"),
            vec![MultiplyAdd { offset: 1, factor: -2 }, ClearCell { offset: 0 }]
        );
    }

    #[test]
    fn test_offsetted_body() {
        let program = OffsetCombine.run(Cancel.run(translate("[>+++<-]").unwrap()));
        assert_eq!(
            Contract.run(program).into_instructions(),
            vec![MultiplyAdd { offset: 1, factor: 3 }, ClearCell { offset: 0 }]
        );
    }

    #[test]
    fn test_plain_clear_loop() {
        assert_eq!(contract("[-]"), vec![ClearCell { offset: 0 }]);
    }

    #[test]
    fn test_unsafe_loops_untouched() {
        // decrement by two
        assert_eq!(contract("[-->+<]").len(), 6);
        // increment of the controlling cell
        assert_eq!(contract("[+>+<]").len(), 6);
        // pointer does not return
        assert_eq!(contract("[->+]").len(), 5);
        // I/O in the body
        assert_eq!(contract("[->.<]").len(), 6);
        // empty body
        assert_eq!(contract("[]").len(), 2);
    }

    #[test]
    fn test_nested_loops() {
        // the inner loop contracts; the outer one now holds extended instructions
        assert_eq!(
            contract("[>[->+<]<-]"),
            vec![
                LoopOpen,
                MoveRight(1),
                CopyCell { offset: 1 },
                ClearCell { offset: 0 },
                MoveLeft(1),
                Instruction::sub(1),
                LoopClose,
            ]
        );
    }
}
