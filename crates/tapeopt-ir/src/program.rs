//! Program structure: an ordered sequence of IR instructions.

use crate::instruction::Instruction;
use serde::{Deserialize, Serialize};
use tapeopt_core::Error;

/// A complete program. Loop brackets carry no jump targets; pairing is
/// recovered on demand from nesting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
        }
    }

    pub fn with_instructions(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn push(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Count instructions satisfying a predicate
    pub fn count_matching(&self, predicate: impl Fn(&Instruction) -> bool) -> usize {
        self.instructions.iter().filter(|inst| predicate(inst)).count()
    }

    /// Number of loops (opening brackets) left in the program
    pub fn loop_count(&self) -> usize {
        self.count_matching(|inst| matches!(inst, Instruction::LoopOpen))
    }

    /// True when every prefix has at least as many opens as closes and the
    /// totals are equal.
    pub fn is_balanced(&self) -> bool {
        let mut depth: usize = 0;
        for inst in &self.instructions {
            match inst {
                Instruction::LoopOpen => depth += 1,
                Instruction::LoopClose => match depth.checked_sub(1) {
                    Some(d) => depth = d,
                    None => return false,
                },
                _ => {}
            }
        }
        depth == 0
    }

    /// Index of the `LoopClose` matching the `LoopOpen` at `open_index`.
    ///
    /// Returns `None` when `open_index` is not a `LoopOpen` or the loop is
    /// never closed.
    pub fn matching_close(&self, open_index: usize) -> Option<usize> {
        if self.instructions.get(open_index) != Some(&Instruction::LoopOpen) {
            return None;
        }

        let mut depth = 0usize;
        for (index, inst) in self.instructions.iter().enumerate().skip(open_index) {
            match inst {
                Instruction::LoopOpen => depth += 1,
                Instruction::LoopClose => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(index);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Render the program as source text.
    ///
    /// Offsetted operations, clears and scans are spelled out as their
    /// source idioms. `CopyCell` and `MultiplyAdd` cannot be written without
    /// clobbering the current cell, so their presence yields `None`.
    pub fn to_source(&self) -> Option<String> {
        fn around(out: &mut String, offset: i32, body: &str) {
            let (there, back) = if offset >= 0 { ('>', '<') } else { ('<', '>') };
            let distance = offset.unsigned_abs() as usize;
            out.extend(std::iter::repeat(there).take(distance));
            out.push_str(body);
            out.extend(std::iter::repeat(back).take(distance));
        }

        let mut out = String::with_capacity(self.instructions.len());
        for inst in &self.instructions {
            match *inst {
                Instruction::Add { count, offset } => {
                    around(&mut out, offset, &"+".repeat(count as usize))
                }
                Instruction::Sub { count, offset } => {
                    around(&mut out, offset, &"-".repeat(count as usize))
                }
                Instruction::MoveRight(count) => out.push_str(&">".repeat(count as usize)),
                Instruction::MoveLeft(count) => out.push_str(&"<".repeat(count as usize)),
                Instruction::Input { offset } => around(&mut out, offset, ","),
                Instruction::Output { offset } => around(&mut out, offset, "."),
                Instruction::LoopOpen => out.push('['),
                Instruction::LoopClose => out.push(']'),
                Instruction::ClearCell { offset } => around(&mut out, offset, "[-]"),
                Instruction::ScanLeft => out.push_str("[<]"),
                Instruction::ScanRight => out.push_str("[>]"),
                Instruction::CopyCell { .. } | Instruction::MultiplyAdd { .. } => return None,
            }
        }
        Some(out)
    }

    /// Serialize the program to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a program from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        bincode::deserialize(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self::with_instructions(instructions)
    }
}

impl FromIterator<Instruction> for Program {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Self::with_instructions(iter.into_iter().collect())
    }
}

impl IntoIterator for Program {
    type Item = Instruction;
    type IntoIter = std::vec::IntoIter<Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.into_iter()
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Instruction::*;

    fn program(instructions: Vec<Instruction>) -> Program {
        Program::with_instructions(instructions)
    }

    #[test]
    fn test_is_balanced() {
        assert!(Program::new().is_balanced());
        assert!(program(vec![LoopOpen, LoopOpen, LoopClose, LoopClose]).is_balanced());
        assert!(!program(vec![LoopOpen, LoopOpen]).is_balanced());
        assert!(!program(vec![LoopClose]).is_balanced());
        // equal counts, but the prefix "]" goes negative
        assert!(!program(vec![LoopClose, LoopOpen]).is_balanced());
    }

    #[test]
    fn test_matching_close() {
        let p = program(vec![
            LoopOpen,
            Instruction::add(1),
            LoopOpen,
            MoveRight(1),
            LoopClose,
            LoopClose,
            LoopOpen,
        ]);
        assert_eq!(p.matching_close(0), Some(5));
        assert_eq!(p.matching_close(2), Some(4));
        assert_eq!(p.matching_close(1), None);
        assert_eq!(p.matching_close(6), None);
        assert_eq!(p.matching_close(42), None);
    }

    #[test]
    fn test_counts() {
        let p = program(vec![
            Instruction::add(4),
            LoopOpen,
            Instruction::sub(1),
            LoopClose,
            ClearCell { offset: 0 },
        ]);
        assert_eq!(p.len(), 5);
        assert_eq!(p.loop_count(), 1);
        assert_eq!(p.count_matching(|i| i.is_extended()), 1);
    }

    #[test]
    fn test_to_source() {
        let p = program(vec![
            Instruction::Add { count: 2, offset: 1 },
            Output { offset: -1 },
            ClearCell { offset: 0 },
            ScanLeft,
        ]);
        assert_eq!(p.to_source().as_deref(), Some(">++<<.>[-][<]"));

        let p = program(vec![CopyCell { offset: 1 }]);
        assert_eq!(p.to_source(), None);
    }

    #[test]
    fn test_program_serialization() {
        let p = program(vec![
            Instruction::add(3),
            MultiplyAdd { offset: -2, factor: 7 },
            ScanRight,
        ]);
        let bytes = p.to_bytes().unwrap();
        let deserialized = Program::from_bytes(&bytes).unwrap();
        assert_eq!(deserialized, p);
    }
}
