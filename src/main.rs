use anyhow::{bail, Context, Result};
use chordpro_transform::models::{ChordLineStrategy, ChordProPayload, ParserConfig, SongPayload};
use chordpro_transform::progress::{format_duration, init_logging, BatchProgress};
use chordpro_transform::safety::validate_output_path;
use chordpro_transform::serialize::{generate_chordpro, render_chord_sheet};
use chordpro_transform::validate::validate_original_format;
use chordpro_transform::SongParser;
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

const OUTPUT_EXTENSION: &str = "cho";

#[derive(Parser)]
#[command(name = "chordpro-transform")]
#[command(about = "Convert loosely formatted song text into canonical ChordPro")]
struct Args {
    /// Debug logging for dropped lines and parse summaries
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transform one song (use "-" for stdin)
    Transform {
        input: PathBuf,

        /// Write here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "chordpro")]
        format: OutputFormat,

        #[arg(long, value_enum, default_value = "character-class")]
        strategy: ChordLineStrategy,

        /// Refuse input that fails validation
        #[arg(long)]
        strict: bool,
    },

    /// Check songs for title, artist and content
    Validate {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Transform many songs in parallel into OUT_DIR/<stem>.cho
    Batch {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[arg(long)]
        out_dir: PathBuf,

        #[arg(long, default_value = "0")]
        workers: usize,

        #[arg(long, value_enum, default_value = "character-class")]
        strategy: ChordLineStrategy,

        /// Hide the progress bar and print tail-friendly progress lines
        #[arg(long)]
        log_only: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Canonical ChordPro text
    Chordpro,
    /// The parsed song structure
    Json,
    /// Song create/update request bodies
    Payload,
    /// Chords above lyrics
    Sheet,
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
}

fn parser_for(strategy: ChordLineStrategy) -> SongParser {
    SongParser::new(ParserConfig {
        chord_line_strategy: strategy,
        ..ParserConfig::default()
    })
}

fn render(parser: &SongParser, text: &str, format: OutputFormat) -> Result<String> {
    let song = parser.parse(text);
    let out = match format {
        OutputFormat::Chordpro => generate_chordpro(&song),
        OutputFormat::Sheet => render_chord_sheet(&song),
        OutputFormat::Json => serde_json::to_string_pretty(&song)?,
        OutputFormat::Payload => {
            let chord_pro = ChordProPayload {
                chord_pro_text: generate_chordpro(&song),
            };
            let payloads = serde_json::json!({
                "song": SongPayload::from(&song),
                "chordPro": chord_pro,
            });
            serde_json::to_string_pretty(&payloads)?
        }
    };
    Ok(out)
}

fn run_transform(
    input: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    strategy: ChordLineStrategy,
    strict: bool,
) -> Result<()> {
    let text = read_input(input)?;

    if strict {
        let report = validate_original_format(&text);
        if !report.is_valid {
            bail!("{:?} is not valid: {}", input, report.messages().join(", "));
        }
    }

    let out = render(&parser_for(strategy), &text, format)?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", out))
                .with_context(|| format!("Failed to write {:?}", path))?;
            info!(output = ?path, "wrote song");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", out)?;
        }
    }
    Ok(())
}

fn run_validate(inputs: &[PathBuf]) -> Result<()> {
    let mut invalid = 0;

    for input in inputs {
        let report = validate_original_format(&read_input(input)?);
        if report.is_valid {
            println!("{}: ok", input.display());
        } else {
            invalid += 1;
            println!("{}: {}", input.display(), report.messages().join(", "));
        }
    }

    if invalid > 0 {
        bail!("{} of {} songs failed validation", invalid, inputs.len());
    }
    Ok(())
}

fn output_path_for(input: &Path, out_dir: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("Cannot derive an output name from {:?}", input))?;
    Ok(out_dir.join(format!("{}.{}", stem, OUTPUT_EXTENSION)))
}

/// Pair every input with its output path. Runs before anything is written:
/// each output must pass the safety check, and no two inputs may share one.
fn plan_jobs(inputs: &[PathBuf], out_dir: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
    let sources: Vec<&Path> = inputs.iter().map(PathBuf::as_path).collect();
    let mut planned: FxHashMap<PathBuf, &Path> = FxHashMap::default();
    let mut jobs = Vec::with_capacity(inputs.len());

    for input in inputs {
        let output = output_path_for(input, out_dir)?;
        validate_output_path(&output, OUTPUT_EXTENSION, &sources)?;
        if let Some(previous) = planned.insert(output.clone(), input.as_path()) {
            bail!(
                "Safety check failed: {:?} and {:?} would both write '{}'",
                previous,
                input,
                output.display()
            );
        }
        jobs.push((input.clone(), output));
    }

    Ok(jobs)
}

struct BatchResult {
    input: PathBuf,
    outcome: Result<usize>,
}

fn transform_file(parser: &SongParser, input: &Path, output: &Path) -> Result<usize> {
    let text = read_input(input)?;
    let song = parser.parse(&text);
    std::fs::write(output, format!("{}\n", generate_chordpro(&song)))
        .with_context(|| format!("Failed to write {:?}", output))?;
    Ok(song.line_count())
}

fn run_batch(
    inputs: &[PathBuf],
    out_dir: &Path,
    workers: usize,
    strategy: ChordLineStrategy,
    log_only: bool,
) -> Result<()> {
    if workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let start = Instant::now();

    let jobs = plan_jobs(inputs, out_dir)?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {:?}", out_dir))?;

    let parser = parser_for(strategy);
    let progress = BatchProgress::new("transform", jobs.len() as u64, log_only);

    let results: Vec<BatchResult> = jobs
        .into_par_iter()
        .map(|(input, output)| {
            let outcome = transform_file(&parser, &input, &output);
            progress.inc();
            BatchResult { input, outcome }
        })
        .collect();

    progress.finish(format!("Transformed {} songs", results.len()));

    let mut lines = 0;
    let mut failed = 0;
    for result in &results {
        match &result.outcome {
            Ok(count) => lines += count,
            Err(e) => {
                failed += 1;
                warn!(input = ?result.input, "{:#}", e);
            }
        }
    }

    println!("\n{:=<60}", "");
    println!("Batch complete!");
    println!("  Songs: {}", results.len() - failed);
    println!("  Failed: {}", failed);
    println!("  Lyric lines: {}", lines);
    println!("  Output: {}", out_dir.display());
    println!("  Elapsed: {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    if failed > 0 {
        bail!("{} songs could not be transformed", failed);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Transform {
            input,
            output,
            format,
            strategy,
            strict,
        } => run_transform(&input, output.as_deref(), format, strategy, strict),
        Command::Validate { inputs } => run_validate(&inputs),
        Command::Batch {
            inputs,
            out_dir,
            workers,
            strategy,
            log_only,
        } => run_batch(&inputs, &out_dir, workers, strategy, log_only),
    }
}
