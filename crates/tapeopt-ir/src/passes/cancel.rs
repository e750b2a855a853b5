//! Coalesce adjacent identical instructions and annihilate adjacent opposites.
//!
//! `++++-->>+-<<<` becomes `++<`. Only neighbours are considered; an
//! unrelated instruction in between blocks the rewrite.

use super::Pass;
use crate::instruction::Instruction;
use crate::program::Program;
use tapeopt_core::PassKind;
use tracing::trace;

pub struct Cancel;

enum Merge {
    Replaced(Instruction),
    Annihilated,
}

impl Pass for Cancel {
    fn kind(&self) -> PassKind {
        PassKind::Cancel
    }

    fn run(&self, program: Program) -> Program {
        let mut out: Vec<Instruction> = Vec::with_capacity(program.len());

        for inst in program {
            // zero-count arithmetic and motion are no-ops
            if inst.count() == Some(0) {
                continue;
            }

            match out.last().and_then(|prev| merge(prev, &inst)) {
                Some(Merge::Replaced(merged)) => {
                    trace!(%inst, %merged, "Coalesced");
                    if let Some(last) = out.last_mut() {
                        *last = merged;
                    }
                }
                Some(Merge::Annihilated) => {
                    trace!(%inst, "Annihilated");
                    out.pop();
                }
                None => out.push(inst),
            }
        }

        Program::with_instructions(out)
    }
}

/// Same variant and, where present, same offset
fn same_shape(a: &Instruction, b: &Instruction) -> bool {
    match (a, b) {
        (Instruction::Add { offset: x, .. }, Instruction::Add { offset: y, .. })
        | (Instruction::Sub { offset: x, .. }, Instruction::Sub { offset: y, .. }) => x == y,
        (Instruction::MoveRight(_), Instruction::MoveRight(_))
        | (Instruction::MoveLeft(_), Instruction::MoveLeft(_)) => true,
        _ => false,
    }
}

fn merge(prev: &Instruction, next: &Instruction) -> Option<Merge> {
    let prev_count = prev.count()?;
    let next_count = next.count()?;

    if same_shape(prev, next) {
        let total = prev_count.checked_add(next_count)?;
        return prev.with_count(total).map(Merge::Replaced);
    }

    let opposite = prev.opposite()?;
    if !same_shape(&opposite, next) {
        return None;
    }

    match prev_count.cmp(&next_count) {
        std::cmp::Ordering::Equal => Some(Merge::Annihilated),
        std::cmp::Ordering::Greater => prev.with_count(prev_count - next_count).map(Merge::Replaced),
        std::cmp::Ordering::Less => next.with_count(next_count - prev_count).map(Merge::Replaced),
    }
}
