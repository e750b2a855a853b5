//! Rewrite passes over IR programs.
//!
//! Every pass is a pure `Program -> Program` function behind the [`Pass`]
//! trait. Passes never require a previous pass to have run; each one only
//! rewrites the idiom it can prove equivalent and leaves everything else in
//! place.

pub mod cancel;
pub mod clear_loop;
pub mod contract;
pub mod offset;
pub mod scan_loop;

pub use cancel::Cancel;
pub use clear_loop::ClearLoop;
pub use contract::Contract;
pub use offset::OffsetCombine;
pub use scan_loop::ScanLoop;

use crate::instruction::Instruction;
use crate::program::Program;
use tapeopt_core::{PassKind, PipelineConfig};
use tracing::{debug, info, instrument};

/// A single semantics-preserving rewrite
pub trait Pass: Send + Sync {
    fn kind(&self) -> PassKind;

    fn run(&self, program: Program) -> Program;
}

/// Instantiate the pass registered under `kind`
pub fn pass_for(kind: PassKind) -> Box<dyn Pass> {
    match kind {
        PassKind::Cancel => Box::new(Cancel),
        PassKind::ClearLoop => Box::new(ClearLoop),
        PassKind::ScanLoop => Box::new(ScanLoop),
        PassKind::OffsetCombine => Box::new(OffsetCombine),
        PassKind::Contract => Box::new(Contract),
    }
}

/// An ordered list of passes applied front to back
pub struct Pipeline {
    passes: Vec<Box<dyn Pass>>,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            passes: config.passes.iter().copied().map(pass_for).collect(),
        }
    }

    pub fn with_passes(passes: Vec<Box<dyn Pass>>) -> Self {
        Self { passes }
    }

    pub fn kinds(&self) -> Vec<PassKind> {
        self.passes.iter().map(|pass| pass.kind()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Apply the passes in order, repeating the whole list until a round
    /// leaves the program unchanged.
    ///
    /// A later pass can expose an idiom for an earlier one (a contracted
    /// loop leaves a `ClearCell` between two moves that `OffsetCombine`
    /// would fold). Every rewrite shrinks the program, so an unchanged
    /// length means nothing fired and the loop terminates.
    #[instrument(skip_all, fields(passes = self.passes.len()))]
    pub fn run(&self, program: Program) -> Program {
        let initial = program.len();
        let mut program = program;
        let mut rounds = 0;

        loop {
            rounds += 1;
            let round_start = program.len();
            for pass in &self.passes {
                let before = program.len();
                program = pass.run(program);
                debug!(
                    pass = %pass.kind(),
                    round = rounds,
                    before,
                    after = program.len(),
                    "Pass finished"
                );
            }
            if program.len() == round_start {
                break;
            }
        }

        info!(
            initial,
            optimized = program.len(),
            loops = program.loop_count(),
            rounds,
            "Optimization pipeline complete"
        );
        program
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

/// Run every pass in the default order
pub fn optimize(program: Program) -> Program {
    Pipeline::default().run(program)
}

/// Index of the innermost open loop at the end of `out`, if its body so far
/// contains no nested brackets.
pub(crate) fn innermost_open(out: &[Instruction]) -> Option<usize> {
    out.iter()
        .rposition(|inst| inst.is_loop_marker())
        .filter(|&index| out[index] == Instruction::LoopOpen)
}
