//! Instruction set for the tape IR.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single IR instruction.
///
/// The first eight variants map onto the source alphabet; `offset` is 0 for
/// freshly translated code and becomes non-zero once an operation has been
/// folded away from its surrounding pointer motion. The remaining variants
/// only appear after optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    Add { count: u32, offset: i32 },
    Sub { count: u32, offset: i32 },
    MoveRight(u32),
    MoveLeft(u32),
    Input { offset: i32 },
    Output { offset: i32 },
    LoopOpen,
    LoopClose,

    /// Set the target cell to zero
    ClearCell { offset: i32 },
    /// Add the current cell to the target cell
    CopyCell { offset: i32 },
    /// Add `factor` times the current cell to the target cell
    MultiplyAdd { offset: i32, factor: i32 },
    /// Move left until the current cell is zero
    ScanLeft,
    /// Move right until the current cell is zero
    ScanRight,
}

impl Instruction {
    /// Translate a single source character, or `None` for comment characters
    pub fn from_char(c: char) -> Option<Self> {
        let inst = match c {
            '+' => Instruction::add(1),
            '-' => Instruction::sub(1),
            '>' => Instruction::MoveRight(1),
            '<' => Instruction::MoveLeft(1),
            ',' => Instruction::Input { offset: 0 },
            '.' => Instruction::Output { offset: 0 },
            '[' => Instruction::LoopOpen,
            ']' => Instruction::LoopClose,
            _ => return None,
        };
        Some(inst)
    }

    pub fn add(count: u32) -> Self {
        Instruction::Add { count, offset: 0 }
    }

    pub fn sub(count: u32) -> Self {
        Instruction::Sub { count, offset: 0 }
    }

    /// Repetition count of arithmetic and pointer motion
    pub fn count(&self) -> Option<u32> {
        match *self {
            Instruction::Add { count, .. }
            | Instruction::Sub { count, .. }
            | Instruction::MoveRight(count)
            | Instruction::MoveLeft(count) => Some(count),
            _ => None,
        }
    }

    /// Same instruction with a different count; `None` if it has no count
    pub fn with_count(&self, count: u32) -> Option<Self> {
        match *self {
            Instruction::Add { offset, .. } => Some(Instruction::Add { count, offset }),
            Instruction::Sub { offset, .. } => Some(Instruction::Sub { count, offset }),
            Instruction::MoveRight(_) => Some(Instruction::MoveRight(count)),
            Instruction::MoveLeft(_) => Some(Instruction::MoveLeft(count)),
            _ => None,
        }
    }

    /// The instruction that undoes this one (`Add`/`Sub`, `MoveRight`/`MoveLeft`)
    pub fn opposite(&self) -> Option<Self> {
        match *self {
            Instruction::Add { count, offset } => Some(Instruction::Sub { count, offset }),
            Instruction::Sub { count, offset } => Some(Instruction::Add { count, offset }),
            Instruction::MoveRight(count) => Some(Instruction::MoveLeft(count)),
            Instruction::MoveLeft(count) => Some(Instruction::MoveRight(count)),
            _ => None,
        }
    }

    /// Cell displacement the instruction operates on, if it targets a cell
    pub fn offset(&self) -> Option<i32> {
        match *self {
            Instruction::Add { offset, .. }
            | Instruction::Sub { offset, .. }
            | Instruction::Input { offset }
            | Instruction::Output { offset }
            | Instruction::ClearCell { offset }
            | Instruction::CopyCell { offset }
            | Instruction::MultiplyAdd { offset, .. } => Some(offset),
            _ => None,
        }
    }

    /// Re-target an operation that only touches the cell at its offset.
    ///
    /// `CopyCell` and `MultiplyAdd` also read the current cell, so moving
    /// them would change their source; they return `None` like every
    /// instruction without an offset.
    pub fn shifted(&self, delta: i32) -> Option<Self> {
        let inst = match *self {
            Instruction::Add { count, offset } => Instruction::Add {
                count,
                offset: offset.checked_add(delta)?,
            },
            Instruction::Sub { count, offset } => Instruction::Sub {
                count,
                offset: offset.checked_add(delta)?,
            },
            Instruction::Input { offset } => Instruction::Input {
                offset: offset.checked_add(delta)?,
            },
            Instruction::Output { offset } => Instruction::Output {
                offset: offset.checked_add(delta)?,
            },
            Instruction::ClearCell { offset } => Instruction::ClearCell {
                offset: offset.checked_add(delta)?,
            },
            _ => return None,
        };
        Some(inst)
    }

    /// Signed pointer displacement of `MoveRight`/`MoveLeft`
    pub fn pointer_delta(&self) -> Option<i64> {
        match *self {
            Instruction::MoveRight(count) => Some(count as i64),
            Instruction::MoveLeft(count) => Some(-(count as i64)),
            _ => None,
        }
    }

    pub fn is_loop_marker(&self) -> bool {
        matches!(self, Instruction::LoopOpen | Instruction::LoopClose)
    }

    /// Returns true for instructions produced only by the optimizer
    pub fn is_extended(&self) -> bool {
        matches!(
            self,
            Instruction::ClearCell { .. }
                | Instruction::CopyCell { .. }
                | Instruction::MultiplyAdd { .. }
                | Instruction::ScanLeft
                | Instruction::ScanRight
        )
    }

    /// Returns true if the instruction performs I/O
    pub fn is_io(&self) -> bool {
        matches!(self, Instruction::Input { .. } | Instruction::Output { .. })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Add { count, offset } => write!(f, "add {} @{}", count, offset),
            Instruction::Sub { count, offset } => write!(f, "sub {} @{}", count, offset),
            Instruction::MoveRight(count) => write!(f, "right {}", count),
            Instruction::MoveLeft(count) => write!(f, "left {}", count),
            Instruction::Input { offset } => write!(f, "in @{}", offset),
            Instruction::Output { offset } => write!(f, "out @{}", offset),
            Instruction::LoopOpen => f.write_str("open"),
            Instruction::LoopClose => f.write_str("close"),
            Instruction::ClearCell { offset } => write!(f, "clear @{}", offset),
            Instruction::CopyCell { offset } => write!(f, "copy @{}", offset),
            Instruction::MultiplyAdd { offset, factor } => {
                write!(f, "mul {} @{}", factor, offset)
            }
            Instruction::ScanLeft => f.write_str("scan-left"),
            Instruction::ScanRight => f.write_str("scan-right"),
        }
    }
}
