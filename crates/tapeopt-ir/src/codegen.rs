//! Code generation from IR to a structured target program.

use crate::instruction::Instruction;
use crate::program::Program;
use crate::validation::validate_program;
use tapeopt_core::{CodegenConfig, Result, Target};
use tracing::{debug, instrument};

pub struct CodeGenerator {
    config: CodegenConfig,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(CodegenConfig::default())
    }
}

impl CodeGenerator {
    pub fn new(config: CodegenConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    /// Emit the complete target program for `program`.
    ///
    /// Nothing is produced for a program with unbalanced brackets.
    #[instrument(skip_all, fields(target = ?self.config.target, instructions = program.len()))]
    pub fn generate(&self, program: &Program) -> Result<String> {
        validate_program(program)?;

        let mut emitter = Emitter::new(&self.config);
        emitter.preamble();
        for inst in program {
            emitter.instruction(inst);
        }
        emitter.epilogue();

        debug!(lines = emitter.lines.len(), "Generated program");
        Ok(emitter.finish())
    }
}

/// Render `mem[p]`, `mem[p + 3]` or `mem[p - 2]`
fn cell(offset: i32) -> String {
    match offset {
        0 => "mem[p]".to_string(),
        o if o > 0 => format!("mem[p + {}]", o),
        o => format!("mem[p - {}]", o.unsigned_abs()),
    }
}

struct Emitter<'a> {
    config: &'a CodegenConfig,
    lines: Vec<String>,
    depth: usize,
    /// The last emitted line opened a block that has no statement yet
    open_block: bool,
}

impl<'a> Emitter<'a> {
    fn new(config: &'a CodegenConfig) -> Self {
        Self {
            config,
            lines: Vec::new(),
            depth: 0,
            open_block: false,
        }
    }

    fn line(&mut self, text: impl AsRef<str>) {
        let indent = self.config.indent.repeat(self.depth);
        self.lines.push(format!("{}{}", indent, text.as_ref()));
        self.open_block = false;
    }

    fn preamble(&mut self) {
        let size = self.config.tape_size;
        match self.config.target {
            Target::Python => {
                self.line(format!("mem = [0] * {}", size));
                self.line("p = 0");
            }
            Target::C => {
                self.line("#include <stdio.h>");
                self.line("");
                self.line(format!("static unsigned char mem[{}];", size));
                self.line("");
                self.line("int main(void) {");
                self.depth = 1;
                self.line("long p = 0;");
            }
        }
    }

    fn epilogue(&mut self) {
        if self.config.target == Target::C {
            self.line("return 0;");
            self.depth = 0;
            self.line("}");
        }
    }

    fn instruction(&mut self, inst: &Instruction) {
        match self.config.target {
            Target::Python => self.python(inst),
            Target::C => self.c(inst),
        }
    }

    fn python(&mut self, inst: &Instruction) {
        match *inst {
            Instruction::Add { count, offset } => self.line(format!("{} += {}", cell(offset), count)),
            Instruction::Sub { count, offset } => self.line(format!("{} -= {}", cell(offset), count)),
            Instruction::MoveRight(count) => self.line(format!("p += {}", count)),
            Instruction::MoveLeft(count) => self.line(format!("p -= {}", count)),
            Instruction::Input { offset } => {
                self.line(format!("{} = ord(input()[0]) % 256", cell(offset)))
            }
            Instruction::Output { offset } => {
                self.line(format!("print(chr({}), end=\"\")", cell(offset)))
            }
            Instruction::LoopOpen => {
                self.line("while mem[p]:");
                self.depth += 1;
                self.open_block = true;
            }
            Instruction::LoopClose => {
                if self.open_block {
                    self.line("pass");
                }
                self.depth -= 1;
            }
            Instruction::ClearCell { offset } => self.line(format!("{} = 0", cell(offset))),
            Instruction::CopyCell { offset } => self.line(format!("{} += mem[p]", cell(offset))),
            Instruction::MultiplyAdd { offset, factor: -1 } => {
                self.line(format!("{} -= mem[p]", cell(offset)))
            }
            Instruction::MultiplyAdd { offset, factor } if factor < 0 => self.line(format!(
                "{} -= mem[p] * {}",
                cell(offset),
                factor.unsigned_abs()
            )),
            Instruction::MultiplyAdd { offset, factor } => {
                self.line(format!("{} += mem[p] * {}", cell(offset), factor))
            }
            Instruction::ScanLeft => self.line("while mem[p] != 0: p -= 1"),
            Instruction::ScanRight => self.line("while mem[p] != 0: p += 1"),
        }
    }

    fn c(&mut self, inst: &Instruction) {
        match *inst {
            Instruction::Add { count, offset } => {
                self.line(format!("{} += {};", cell(offset), count % 256))
            }
            Instruction::Sub { count, offset } => {
                self.line(format!("{} -= {};", cell(offset), count % 256))
            }
            Instruction::MoveRight(count) => self.line(format!("p += {};", count)),
            Instruction::MoveLeft(count) => self.line(format!("p -= {};", count)),
            Instruction::Input { offset } => {
                self.line(format!("{} = (unsigned char)getchar();", cell(offset)))
            }
            Instruction::Output { offset } => self.line(format!("putchar({});", cell(offset))),
            Instruction::LoopOpen => {
                self.line("while (mem[p]) {");
                self.depth += 1;
            }
            Instruction::LoopClose => {
                self.depth -= 1;
                self.line("}");
            }
            Instruction::ClearCell { offset } => self.line(format!("{} = 0;", cell(offset))),
            Instruction::CopyCell { offset } => self.line(format!("{} += mem[p];", cell(offset))),
            Instruction::MultiplyAdd { offset, factor: -1 } => {
                self.line(format!("{} -= mem[p];", cell(offset)))
            }
            Instruction::MultiplyAdd { offset, factor } => {
                self.line(format!("{} += mem[p] * {};", cell(offset), factor))
            }
            Instruction::ScanLeft => self.line("while (mem[p]) p--;"),
            Instruction::ScanRight => self.line("while (mem[p]) p++;"),
        }
    }

    fn finish(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::optimize;
    use crate::translator::translate;
    use tapeopt_core::{Error, MalformedSource};

    fn python(source: &str) -> String {
        CodeGenerator::default()
            .generate(&translate(source).unwrap())
            .unwrap()
    }

    #[test]
    fn test_preamble() {
        let text = python("");
        assert_eq!(text, "mem = [0] * 65536\np = 0\n");
    }

    #[test]
    fn test_loop_nesting_and_indentation() {
        let text = python("+[>[-]<-].");
        let expected = "\
mem = [0] * 65536
p = 0
mem[p] += 1
while mem[p]:
    p += 1
    while mem[p]:
        mem[p] -= 1
    p -= 1
    mem[p] -= 1
print(chr(mem[p]), end=\"\")
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_empty_loop_body_gets_pass() {
        let text = python("[]");
        assert!(text.ends_with("while mem[p]:\n    pass\n"));
    }

    #[test]
    fn test_extended_instructions_are_single_statements() {
        let program = optimize(translate("++[->+++>-<<]>>[<]").unwrap());
        let text = CodeGenerator::default().generate(&program).unwrap();
        assert!(text.contains("mem[p + 1] += mem[p] * 3"));
        assert!(text.contains("mem[p + 2] -= mem[p]\n"));
        assert!(!text.contains("* 1\n"));
        assert!(text.contains("mem[p] = 0"));
        assert!(text.contains("while mem[p] != 0: p -= 1"));
        assert!(!text.contains("while mem[p]:"));
    }

    #[test]
    fn test_offsetted_operations() {
        let program = optimize(translate("<<.>>+>+<").unwrap());
        let text = CodeGenerator::default().generate(&program).unwrap();
        assert!(text.contains("print(chr(mem[p - 2]), end=\"\")"));
        assert!(text.contains("mem[p + 1] += 1"));
    }

    #[test]
    fn test_c_target() {
        let generator = CodeGenerator::new(CodegenConfig {
            target: Target::C,
            tape_size: 30_000,
            ..Default::default()
        });
        let program = optimize(translate("++++[>++++<-]>.").unwrap());
        let text = generator.generate(&program).unwrap();
        assert!(text.starts_with("#include <stdio.h>\n"));
        assert!(text.contains("static unsigned char mem[30000];"));
        assert!(text.contains("    mem[p + 1] += mem[p] * 4;"));
        assert!(text.contains("    putchar(mem[p]);"));
        assert!(text.ends_with("    return 0;\n}\n"));
    }

    #[test]
    fn test_negative_factors() {
        let program = optimize(translate("+[->->--<<]").unwrap());
        let python = CodeGenerator::default().generate(&program).unwrap();
        assert!(python.contains("mem[p + 1] -= mem[p]\n"));
        assert!(python.contains("mem[p + 2] -= mem[p] * 2\n"));

        let c = CodeGenerator::new(CodegenConfig {
            target: Target::C,
            ..Default::default()
        })
        .generate(&program)
        .unwrap();
        assert!(c.contains("mem[p + 1] -= mem[p];"));
        assert!(c.contains("mem[p + 2] += mem[p] * -2;"));
    }

    #[test]
    fn test_c_blocks_are_closed() {
        let generator = CodeGenerator::new(CodegenConfig {
            target: Target::C,
            ..Default::default()
        });
        let text = generator.generate(&translate(",[.,]").unwrap()).unwrap();
        assert!(text.contains("    while (mem[p]) {\n        putchar(mem[p]);\n"));
        assert!(text.contains("        mem[p] = (unsigned char)getchar();\n    }\n"));
    }

    #[test]
    fn test_unbalanced_program_produces_nothing() {
        let program = Program::with_instructions(vec![Instruction::LoopOpen]);
        let result = CodeGenerator::default().generate(&program);
        assert!(matches!(
            result,
            Err(Error::MalformedSource(MalformedSource::UnbalancedBrackets { .. }))
        ));
    }
}
