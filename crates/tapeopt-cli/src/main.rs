//! Command-line front end: compile, run and fuzz tape programs.

mod telemetry;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::future::Future;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tapeopt_core::{PassKind, PipelineConfig, Target, ToolConfig};
use tapeopt_ir::{translate, CodeGenerator, Pipeline, Program, SourceGenConfig, SourceGenerator};
use tapeopt_runtime::{spawn_interactive, BufferedInput, Execution, Runtime};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Parser)]
#[command(name = "tapeopt")]
#[command(about = "Optimizing translator and interpreter for tape programs", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON configuration file; flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct PipelineArgs {
    /// Comma-separated passes to run, in order
    #[arg(long, value_delimiter = ',')]
    passes: Option<Vec<PassKind>>,

    /// Skip optimization entirely
    #[arg(long, conflicts_with = "passes")]
    no_opt: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate, optimize and emit a target program
    Compile {
        /// Source file
        file: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Target language (python or c)
        #[arg(short, long)]
        target: Option<Target>,
        /// Cells in the emitted memory declaration
        #[arg(long)]
        tape_size: Option<usize>,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Execute a program with the direct interpreter
    Run {
        /// Source file
        file: PathBuf,
        /// Input characters; when omitted each read asks for a line on stdin
        #[arg(short, long)]
        input: Option<String>,
        /// Instruction budget
        #[arg(long)]
        max_steps: Option<u64>,
        /// Run without an instruction budget
        #[arg(long, conflicts_with = "max_steps")]
        unlimited: bool,
        /// Cells on the tape
        #[arg(long)]
        tape_size: Option<usize>,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Compare optimized and unoptimized runs of random programs
    Fuzz {
        /// Seed for the program generator
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Number of programs to try
        #[arg(long, default_value_t = 1000)]
        count: usize,
        /// Generation steps per program
        #[arg(long)]
        length: Option<usize>,
        /// Instruction budget for the unoptimized run
        #[arg(long, default_value_t = 1_000_000)]
        max_steps: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = telemetry::init_telemetry(cli.log_json) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => ToolConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ToolConfig::default(),
    };

    match cli.command {
        Commands::Compile {
            file,
            output,
            target,
            tape_size,
            pipeline,
        } => {
            apply_pipeline_args(&mut config, &pipeline);
            if let Some(target) = target {
                config.codegen.target = target;
            }
            if let Some(size) = tape_size {
                config.codegen.tape_size = size;
            }
            config.validate()?;
            compile(&config, &file, output.as_deref(), &mut std::io::stdout())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run {
            file,
            input,
            max_steps,
            unlimited,
            tape_size,
            pipeline,
        } => {
            apply_pipeline_args(&mut config, &pipeline);
            if max_steps.is_some() {
                config.interpreter.max_steps = max_steps;
            }
            if unlimited {
                config.interpreter.max_steps = None;
            }
            if let Some(size) = tape_size {
                config.interpreter.tape_size = size;
            }
            config.validate()?;
            run(&config, &file, input, &mut std::io::stdout()).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Fuzz {
            seed,
            count,
            length,
            max_steps,
        } => {
            config.interpreter.max_steps = Some(max_steps);
            config.validate()?;
            let mut gen_config = SourceGenConfig::default();
            if let Some(length) = length {
                gen_config.length = length;
            }
            let divergences = fuzz(&config, gen_config, seed, count)?;
            Ok(if divergences == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn apply_pipeline_args(config: &mut ToolConfig, args: &PipelineArgs) {
    if args.no_opt {
        config.pipeline = PipelineConfig::none();
    } else if let Some(passes) = &args.passes {
        config.pipeline = PipelineConfig::with_passes(passes.clone());
    }
}

fn load_program(config: &ToolConfig, file: &Path) -> Result<Program> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let program = translate(&source)?;
    Ok(Pipeline::new(&config.pipeline).run(program))
}

/// Emit the target program to `output`, or to `stdout` when no path is
/// given. Nothing is written unless generation succeeds.
fn compile(
    config: &ToolConfig,
    file: &Path,
    output: Option<&Path>,
    stdout: &mut dyn Write,
) -> Result<()> {
    let program = load_program(config, file)?;
    let text = CodeGenerator::new(config.codegen.clone()).generate(&program)?;

    match output {
        Some(path) => {
            std::fs::write(path, &text).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), instructions = program.len(), "Wrote program");
        }
        None => stdout.write_all(text.as_bytes())?,
    }
    Ok(())
}

/// Interpret `file` and write its output to `stdout` once the run has
/// finished successfully.
async fn run(
    config: &ToolConfig,
    file: &Path,
    input: Option<String>,
    stdout: &mut dyn Write,
) -> Result<()> {
    let program = load_program(config, file)?;
    let runtime = Runtime::new(config.interpreter.clone())?;

    let execution = match input {
        Some(text) => runtime.execute(&program, &mut BufferedInput::new(text))?,
        None => {
            let interrupt = async {
                if let Err(e) = signal::ctrl_c().await {
                    warn!("Cannot listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            };
            run_interactive(&runtime, program, stdin_lines()?, interrupt).await?
        }
    };

    info!(steps = execution.steps, pointer = execution.pointer, "Run complete");
    stdout.write_all(&execution.output)?;
    stdout.flush()?;
    Ok(())
}

/// Stdin lines read on a dedicated thread; a blocked read never holds up
/// the async runtime.
fn stdin_lines() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(1);
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })
        .context("starting stdin reader")?;
    Ok(rx)
}

/// Answer each input request with the next line from `lines`.
///
/// `interrupt` is watched both while waiting for a request and while
/// waiting for the line that answers it; when it fires the run is
/// cancelled and reported as an error.
async fn run_interactive(
    runtime: &Runtime,
    program: Program,
    mut lines: mpsc::Receiver<String>,
    interrupt: impl Future<Output = ()>,
) -> Result<Execution> {
    let mut session = spawn_interactive(runtime, program)?;
    let cancel = session.cancel_token();
    tokio::pin!(interrupt);
    let mut interrupted = false;

    loop {
        let request = tokio::select! {
            request = session.requests.recv() => request,
            _ = &mut interrupt => {
                interrupted = true;
                break;
            }
        };
        let Some(request) = request else { break };

        tokio::select! {
            line = lines.recv() => match line {
                Some(line) => {
                    if !request.respond(line) {
                        debug!("Interpreter stopped waiting before the answer arrived");
                    }
                }
                None => {
                    warn!("Standard input closed while the program was reading");
                    break;
                }
            },
            _ = &mut interrupt => {
                interrupted = true;
                break;
            }
        }
    }

    if interrupted {
        warn!("Interrupted, cancelling run");
        cancel.cancel();
    }
    let result = session.finish().await;
    if interrupted {
        bail!("run interrupted");
    }
    Ok(result?)
}

/// Returns the number of programs whose optimized run diverged
fn fuzz(config: &ToolConfig, gen_config: SourceGenConfig, seed: u64, count: usize) -> Result<usize> {
    if count == 0 {
        bail!("fuzz count must be positive");
    }

    let generator = SourceGenerator::new(gen_config);
    let pipeline = Pipeline::new(&config.pipeline);
    let plain_runtime = Runtime::new(config.interpreter.clone())?;
    // Contracted loops can cost more steps than a loop that never ran
    let mut optimized_config = config.interpreter.clone();
    optimized_config.max_steps = optimized_config.max_steps.map(|n| n.saturating_mul(10));
    let optimized_runtime = Runtime::new(optimized_config)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut compared = 0;
    let mut divergences = 0;
    for index in 0..count {
        let source = generator.generate(&mut rng);
        let input = source.as_bytes();
        let plain = translate(&source)?;
        let optimized = pipeline.run(plain.clone());

        let Ok(expected) = plain_runtime.execute(&plain, &mut BufferedInput::new(input)) else {
            continue;
        };
        compared += 1;

        let actual = optimized_runtime.execute(&optimized, &mut BufferedInput::new(input));
        let agrees = matches!(&actual, Ok(actual)
            if actual.output == expected.output && actual.tape() == expected.tape());
        if !agrees {
            divergences += 1;
            let shown = plain.to_source().unwrap_or_else(|| source.clone());
            error!(index, source = %shown, "Optimized program diverged");
        }
    }

    info!(seed, count, compared, divergences, "Fuzzing finished");
    Ok(divergences)
}
