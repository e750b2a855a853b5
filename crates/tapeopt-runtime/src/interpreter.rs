//! Direct execution of IR against a memory tape.

use crate::input::InputSource;
use tapeopt_core::{Error, InterpreterConfig, MalformedSource, Result};
use tapeopt_ir::{loop_pairs, Instruction, Program};
use tracing::{info, instrument, trace};

/// Fixed-size memory tape and its pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<u8>,
    pointer: usize,
}

impl Tape {
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![0; size],
            pointer: 0,
        }
    }

    /// Start from existing cell contents with the pointer at cell 0
    pub fn from_cells(cells: Vec<u8>) -> Self {
        Self { cells, pointer: 0 }
    }

    pub fn with_pointer(mut self, pointer: usize) -> Result<Self> {
        if pointer >= self.cells.len() {
            return Err(self.out_of_bounds(pointer as i64));
        }
        self.pointer = pointer;
        Ok(self)
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn current(&self) -> u8 {
        self.cells.get(self.pointer).copied().unwrap_or(0)
    }

    fn out_of_bounds(&self, pointer: i64) -> Error {
        Error::OutOfBounds {
            pointer,
            tape_size: self.cells.len(),
        }
    }

    /// Absolute index of `pointer + offset`
    fn address(&self, offset: i64) -> Result<usize> {
        let target = self.pointer as i64 + offset;
        if target < 0 || target >= self.cells.len() as i64 {
            return Err(self.out_of_bounds(target));
        }
        Ok(target as usize)
    }

    fn cell_mut(&mut self, offset: i32) -> Result<&mut u8> {
        let index = self.address(offset as i64)?;
        Ok(&mut self.cells[index])
    }

    fn shift(&mut self, delta: i64) -> Result<()> {
        self.pointer = self.address(delta)?;
        Ok(())
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct Execution {
    pub output: Vec<u8>,
    /// Instructions executed, counting every cell a scan visits
    pub steps: u64,
    pub pointer: usize,
    tape: Tape,
}

impl Execution {
    /// Output decoded as one character per byte
    pub fn output_string(&self) -> String {
        self.output.iter().map(|&b| b as char).collect()
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn into_tape(self) -> Tape {
        self.tape
    }
}

pub struct Interpreter {
    config: InterpreterConfig,
}

impl Interpreter {
    pub fn new(config: InterpreterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Run `program` on a fresh zeroed tape
    pub fn run(&self, program: &Program, input: &mut dyn InputSource) -> Result<Execution> {
        self.run_on(program, Tape::new(self.config.tape_size), input)
    }

    /// Run `program` starting from an existing tape state.
    ///
    /// Loop pairing is resolved before the first instruction executes, so a
    /// malformed program fails without touching the tape or the input.
    #[instrument(skip_all, fields(instructions = program.len(), tape_size = tape.len()))]
    pub fn run_on(
        &self,
        program: &Program,
        tape: Tape,
        input: &mut dyn InputSource,
    ) -> Result<Execution> {
        let jumps = resolve_jumps(program)?;
        let mut machine = Machine {
            tape,
            output: Vec::new(),
            steps: 0,
            limit: self.config.max_steps,
        };

        let instructions = program.instructions();
        let mut pc = 0;

        while pc < instructions.len() {
            machine.tick(1)?;
            match instructions[pc] {
                Instruction::LoopOpen if machine.tape.current() == 0 => pc = jumps[pc],
                Instruction::LoopClose if machine.tape.current() != 0 => pc = jumps[pc],
                Instruction::LoopOpen | Instruction::LoopClose => {}
                inst => machine.execute(inst, input)?,
            }
            pc += 1;
        }

        info!(
            steps = machine.steps,
            output_len = machine.output.len(),
            "Execution finished"
        );
        Ok(Execution {
            output: machine.output,
            steps: machine.steps,
            pointer: machine.tape.pointer,
            tape: machine.tape,
        })
    }
}

/// Jump table mapping every bracket to its partner.
///
/// Stray closes and opens that never close are rejected here, so every
/// bracket index in the returned table is a valid jump target. Entries for
/// other instructions are unused.
fn resolve_jumps(program: &Program) -> Result<Vec<usize>> {
    loop_pairs(program)
        .into_iter()
        .zip(program.iter())
        .enumerate()
        .map(|(index, (partner, inst))| match (partner, inst) {
            (Some(partner), _) => Ok(partner),
            (None, Instruction::LoopClose) => {
                Err(MalformedSource::UnmatchedClose { offset: index }.into())
            }
            (None, Instruction::LoopOpen) => Err(Error::UnterminatedLoop { position: index }),
            (None, _) => Ok(index),
        })
        .collect()
}

struct Machine {
    tape: Tape,
    output: Vec<u8>,
    steps: u64,
    limit: Option<u64>,
}

impl Machine {
    fn tick(&mut self, n: u64) -> Result<()> {
        self.steps += n;
        match self.limit {
            Some(limit) if self.steps > limit => Err(Error::StepBudgetExceeded { limit }),
            _ => Ok(()),
        }
    }

    fn execute(&mut self, inst: Instruction, input: &mut dyn InputSource) -> Result<()> {
        match inst {
            Instruction::Add { count, offset } => {
                let cell = self.tape.cell_mut(offset)?;
                *cell = cell.wrapping_add((count % 256) as u8);
            }
            Instruction::Sub { count, offset } => {
                let cell = self.tape.cell_mut(offset)?;
                *cell = cell.wrapping_sub((count % 256) as u8);
            }
            Instruction::MoveRight(count) => self.tape.shift(count as i64)?,
            Instruction::MoveLeft(count) => self.tape.shift(-(count as i64))?,
            Instruction::Input { offset } => {
                let index = self.tape.address(offset as i64)?;
                self.tape.cells[index] = input.read_char()?;
            }
            Instruction::Output { offset } => {
                let index = self.tape.address(offset as i64)?;
                self.output.push(self.tape.cells[index]);
            }
            Instruction::ClearCell { offset } => *self.tape.cell_mut(offset)? = 0,
            Instruction::CopyCell { offset } => self.multiply_add(offset, 1)?,
            Instruction::MultiplyAdd { offset, factor } => self.multiply_add(offset, factor)?,
            Instruction::ScanLeft => self.scan(-1)?,
            Instruction::ScanRight => self.scan(1)?,
            Instruction::LoopOpen | Instruction::LoopClose => {}
        }
        Ok(())
    }

    /// A zero controlling cell means the contracted loop never ran, so the
    /// target is not touched (or bounds-checked) at all.
    fn multiply_add(&mut self, offset: i32, factor: i32) -> Result<()> {
        let value = self.tape.current();
        if value == 0 {
            return Ok(());
        }
        let product = (value as i64 * factor as i64).rem_euclid(256) as u8;
        let cell = self.tape.cell_mut(offset)?;
        *cell = cell.wrapping_add(product);
        Ok(())
    }

    fn scan(&mut self, direction: i64) -> Result<()> {
        let start = self.tape.pointer;
        while self.tape.current() != 0 {
            self.tape.shift(direction)?;
            self.tick(1)?;
        }
        trace!(from = start, to = self.tape.pointer, "Scan finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::BufferedInput;
    use tapeopt_core::{PassKind, PipelineConfig};
    use tapeopt_ir::{optimize, translate, Pipeline};

    fn interpreter() -> Interpreter {
        Interpreter::new(InterpreterConfig::default())
    }

    fn run(source: &str) -> Result<Execution> {
        let program = translate(source)?;
        interpreter().run(&program, &mut BufferedInput::empty())
    }

    #[test]
    fn test_multiply_scenario() {
        let plain = run("++++[>++++<-]>.").unwrap();
        assert_eq!(plain.output, vec![16]);
        assert_eq!(plain.output_string(), "\u{10}");

        let contracted = Pipeline::with_passes(vec![tapeopt_ir::passes::pass_for(
            PassKind::Contract,
        )])
        .run(translate("++++[>++++<-]>.").unwrap());
        assert!(contracted
            .iter()
            .any(|inst| matches!(inst, Instruction::MultiplyAdd { .. })));
        let fast = interpreter()
            .run(&contracted, &mut BufferedInput::empty())
            .unwrap();
        assert_eq!(fast.output, plain.output);
        assert_eq!(fast.tape().cells()[..2], plain.tape().cells()[..2]);
    }

    #[test]
    fn test_clear_loop_scenario() {
        let execution = run("+[-]").unwrap();
        assert_eq!(execution.tape().cells()[0], 0);
    }

    #[test]
    fn test_cells_wrap() {
        let execution = run("-.").unwrap();
        assert_eq!(execution.output, vec![255]);
        let execution = run(&"+".repeat(257)).unwrap();
        assert_eq!(execution.tape().cells()[0], 1);
    }

    #[test]
    fn test_clear_cell_equivalence() {
        let looped = translate("[-]").unwrap();
        let cleared = optimize(looped.clone());
        assert_eq!(cleared.instructions(), &[Instruction::ClearCell { offset: 0 }]);

        for value in 0..=255u8 {
            for program in [&looped, &cleared] {
                let tape = Tape::from_cells(vec![value, 7]);
                let execution = interpreter()
                    .run_on(program, tape, &mut BufferedInput::empty())
                    .unwrap();
                assert_eq!(execution.tape().cells(), &[0, 7]);
            }
        }
    }

    #[test]
    fn test_scan_equivalence() {
        let cells = vec![3, 0, 5, 9, 0, 2, 4, 1];
        for (source, start) in [("[<]", 6), ("[>]", 2), ("[<]", 1)] {
            let looped = translate(source).unwrap();
            let scanned = optimize(looped.clone());
            assert!(scanned.loop_count() == 0);

            let mut pointers = Vec::new();
            for program in [&looped, &scanned] {
                let tape = Tape::from_cells(cells.clone()).with_pointer(start).unwrap();
                let execution = interpreter()
                    .run_on(program, tape, &mut BufferedInput::empty())
                    .unwrap();
                pointers.push(execution.pointer);
            }
            assert_eq!(pointers[0], pointers[1], "source {}", source);
        }
    }

    #[test]
    fn test_scan_off_the_tape() {
        let program = optimize(translate("+[<]").unwrap());
        let result = interpreter().run(&program, &mut BufferedInput::empty());
        assert!(matches!(result, Err(Error::OutOfBounds { pointer: -1, .. })));
    }

    #[test]
    fn test_move_left_of_origin() {
        assert!(matches!(
            run("<"),
            Err(Error::OutOfBounds { pointer: -1, tape_size: 65_536 })
        ));
    }

    #[test]
    fn test_move_past_tape_end() {
        let config = InterpreterConfig {
            tape_size: 4,
            ..Default::default()
        };
        let program = translate(">>>>").unwrap();
        let result = Interpreter::new(config).run(&program, &mut BufferedInput::empty());
        assert!(matches!(
            result,
            Err(Error::OutOfBounds { pointer: 4, tape_size: 4 })
        ));
    }

    #[test]
    fn test_input_echo() {
        let program = translate(",[.,]").unwrap();
        let mut input = BufferedInput::new("hi\0");
        let execution = interpreter().run(&program, &mut input).unwrap();
        assert_eq!(execution.output_string(), "hi");
    }

    #[test]
    fn test_input_exhausted() {
        let program = translate(",,").unwrap();
        let result = interpreter().run(&program, &mut BufferedInput::new("a"));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_unterminated_loop() {
        let program = Program::with_instructions(vec![
            Instruction::add(1),
            Instruction::LoopOpen,
            Instruction::sub(1),
        ]);
        let result = interpreter().run(&program, &mut BufferedInput::empty());
        assert!(matches!(result, Err(Error::UnterminatedLoop { position: 1 })));
    }

    #[test]
    fn test_stray_close_rejected_before_running() {
        let program = Program::with_instructions(vec![
            Instruction::Output { offset: 0 },
            Instruction::LoopClose,
        ]);
        let result = interpreter().run(&program, &mut BufferedInput::empty());
        assert!(matches!(
            result,
            Err(Error::MalformedSource(MalformedSource::UnmatchedClose { offset: 1 }))
        ));
    }

    #[test]
    fn test_jump_table_links_nested_brackets() {
        let program = translate("+[>[-]<-]").unwrap();
        let jumps = resolve_jumps(&program).unwrap();
        assert_eq!((jumps[1], jumps[8]), (8, 1));
        assert_eq!((jumps[3], jumps[5]), (5, 3));
        assert_eq!(jumps[0], 0);
    }

    #[test]
    fn test_unterminated_inner_loop_reports_its_position() {
        let program = Program::with_instructions(vec![
            Instruction::LoopOpen,
            Instruction::LoopOpen,
            Instruction::LoopClose,
        ]);
        assert!(matches!(
            resolve_jumps(&program),
            Err(Error::UnterminatedLoop { position: 0 })
        ));
    }

    #[test]
    fn test_step_budget() {
        let config = InterpreterConfig {
            max_steps: Some(1_000),
            ..Default::default()
        };
        let program = translate("+[]").unwrap();
        let result = Interpreter::new(config).run(&program, &mut BufferedInput::empty());
        assert!(matches!(result, Err(Error::StepBudgetExceeded { limit: 1_000 })));
    }

    #[test]
    fn test_step_budget_disabled() {
        let config = InterpreterConfig {
            max_steps: None,
            ..Default::default()
        };
        let program = translate("++[>+++[>++<-]<-]").unwrap();
        let execution = Interpreter::new(config)
            .run(&program, &mut BufferedInput::empty())
            .unwrap();
        assert_eq!(execution.tape().cells()[2], 12);
    }

    #[test]
    fn test_scan_counts_visited_cells() {
        let program = Program::with_instructions(vec![Instruction::ScanRight]);
        let tape = Tape::from_cells(vec![1, 1, 1, 0]);
        let execution = interpreter()
            .run_on(&program, tape, &mut BufferedInput::empty())
            .unwrap();
        assert_eq!(execution.pointer, 3);
        assert_eq!(execution.steps, 4);
    }

    #[test]
    fn test_contracted_loop_skips_out_of_range_target() {
        // `[<+>-]` at the origin never runs when the cell is zero
        let plain = translate("[<+>-]").unwrap();
        let contracted = Pipeline::new(&PipelineConfig::default()).run(plain.clone());
        for program in [&plain, &contracted] {
            assert!(interpreter()
                .run(program, &mut BufferedInput::empty())
                .is_ok());
        }
    }

    #[test]
    fn test_negative_factor() {
        let program = optimize(translate("+++[->-<]").unwrap());
        assert!(program
            .iter()
            .any(|inst| matches!(inst, Instruction::MultiplyAdd { offset: 1, factor: -1 })));
        let execution = interpreter()
            .run(&program, &mut BufferedInput::empty())
            .unwrap();
        assert_eq!(execution.tape().cells()[1], 253);
    }
}
