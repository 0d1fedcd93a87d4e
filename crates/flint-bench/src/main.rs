use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{ArgAction, Parser};
use serde::Serialize;

use flint_codegen::Generator;
use flint_lexer::Lexer;
use flint_parser::Parser as FlintParser;
use flint_syntax::error::{Error, Result};

#[derive(Parser, Debug)]
#[command(name = "flint-bench", about = "Time the Flint compilation phases")]
struct Cli {
    /// Specific test(s) to run (by name, e.g. factorial). If omitted, runs all discovered scripts.
    #[arg(short = 't', long = "test", action = ArgAction::Append)]
    tests: Vec<String>,

    /// Iterations per test (measured)
    #[arg(short = 'n', long = "iterations", default_value_t = 10)]
    iterations: u32,

    /// Warmup iterations (not measured)
    #[arg(short = 'w', long = "warmup", default_value_t = 2)]
    warmup: u32,

    /// Output JSON file path; default: benchmark/results/<timestamp>.json
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// List discovered tests and exit
    #[arg(long = "list", default_value_t = false)]
    list: bool,
}

/// Wall-clock milliseconds spent in each phase for one compilation.
struct PhaseMillis {
    lex: f64,
    parse: f64,
    gen: f64,
}

impl PhaseMillis {
    fn total(&self) -> f64 {
        self.lex + self.parse + self.gen
    }
}

#[derive(Debug, Serialize)]
struct BenchResult {
    name: String,
    iterations: u32,
    avg_total_ms: f64,
    min_total_ms: f64,
    max_total_ms: f64,
    avg_lex_ms: f64,
    avg_parse_ms: f64,
    avg_gen_ms: f64,
    asm_bytes: usize,
}

impl BenchResult {
    fn from_runs(name: &str, iterations: u32, runs: &[PhaseMillis], asm_bytes: usize) -> Self {
        let mut min_total = f64::INFINITY;
        let mut max_total: f64 = 0.0;
        let mut sums = PhaseMillis {
            lex: 0.0,
            parse: 0.0,
            gen: 0.0,
        };
        let mut sum_total = 0.0;
        for run in runs {
            let total = run.total();
            min_total = min_total.min(total);
            max_total = max_total.max(total);
            sum_total += total;
            sums.lex += run.lex;
            sums.parse += run.parse;
            sums.gen += run.gen;
        }
        if runs.is_empty() {
            min_total = 0.0;
        }
        let count = runs.len().max(1) as f64;
        Self {
            name: name.to_string(),
            iterations,
            avg_total_ms: sum_total / count,
            min_total_ms: min_total,
            max_total_ms: max_total,
            avg_lex_ms: sums.lex / count,
            avg_parse_ms: sums.parse / count,
            avg_gen_ms: sums.gen / count,
            asm_bytes,
        }
    }
}

#[derive(Debug, Serialize)]
struct OutputDoc {
    timestamp: String,
    flint_version: String,
    benchmarks: Vec<BenchResult>,
}

#[derive(Debug, Clone)]
struct ScriptCase {
    name: String,
    path: PathBuf,
}

fn workspace_root() -> PathBuf {
    // crates/flint-bench sits two levels below the workspace root
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf()
}

fn discover_scripts() -> Vec<ScriptCase> {
    let dir = workspace_root().join("demos");
    let mut out = Vec::new();

    if let Ok(entries) = fs::read_dir(&dir) {
        for e in entries.flatten() {
            let p = e.path();
            if p.extension().and_then(|s| s.to_str()) == Some("flint") {
                let name = p.file_stem().and_then(|s| s.to_str()).unwrap_or("").to_string();
                out.push(ScriptCase { name, path: p });
            }
        }
    }

    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

fn compile_once(src: &str) -> Result<(PhaseMillis, usize)> {
    let clock = Instant::now();
    let tokens = Lexer::new(src).tokenize()?;
    let lex = clock.elapsed().as_secs_f64() * 1000.0;

    let clock = Instant::now();
    let program = FlintParser::new(tokens).parse_program()?;
    let parse = clock.elapsed().as_secs_f64() * 1000.0;

    let clock = Instant::now();
    let asm = Generator::new().generate(&program)?;
    let gen = clock.elapsed().as_secs_f64() * 1000.0;

    Ok((PhaseMillis { lex, parse, gen }, asm.len()))
}

fn measure_script(src: &str, iterations: u32, warmup: u32) -> Result<(Vec<PhaseMillis>, usize)> {
    for _ in 0..warmup {
        compile_once(src)?;
    }

    let mut runs = Vec::with_capacity(iterations as usize);
    let mut asm_bytes = 0;
    for _ in 0..iterations {
        let (times, bytes) = compile_once(src)?;
        asm_bytes = bytes;
        runs.push(times);
    }

    Ok((runs, asm_bytes))
}

fn run(cli: &Cli) -> Result<()> {
    let mut scripts = discover_scripts();

    if cli.list {
        println!("Discovered tests:");
        for s in &scripts {
            println!("- {} ({})", s.name, s.path.display());
        }
        return Ok(());
    }

    if !cli.tests.is_empty() {
        let wanted: std::collections::HashSet<_> =
            cli.tests.iter().map(|s| s.to_lowercase()).collect();
        scripts.retain(|s| wanted.contains(&s.name.to_lowercase()));
        if scripts.is_empty() {
            return Err(Error::driver(
                "No matching tests. Use --list to see available.",
            ));
        }
    }

    if scripts.is_empty() {
        return Err(Error::driver("No .flint scripts found in demos/."));
    }

    let mut results = Vec::new();

    for case in &scripts {
        let src = fs::read_to_string(&case.path)
            .map_err(|e| Error::driver(format!("failed to read {}: {e}", case.path.display())))?;
        let (runs, asm_bytes) = measure_script(&src, cli.iterations, cli.warmup)
            .map_err(|e| Error::driver(format!("{}: {e}", case.name)))?;
        let result = BenchResult::from_runs(&case.name, cli.iterations, &runs, asm_bytes);

        println!(
            "{:>12}: total avg={:.3}ms min={:.3}ms max={:.3}ms | lex={:.3}ms parse={:.3}ms gen={:.3}ms | asm={}B",
            result.name,
            result.avg_total_ms,
            result.min_total_ms,
            result.max_total_ms,
            result.avg_lex_ms,
            result.avg_parse_ms,
            result.avg_gen_ms,
            result.asm_bytes
        );

        results.push(result);
    }

    let out_path = match &cli.output {
        Some(p) => p.clone(),
        None => {
            let stamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%SZ");
            workspace_root().join(format!("benchmark/results/{stamp}.json"))
        }
    };
    if let Some(dir) = out_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .map_err(|e| Error::driver(format!("failed to create {}: {e}", dir.display())))?;
    }

    let doc = OutputDoc {
        timestamp: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        flint_version: env!("CARGO_PKG_VERSION").to_string(),
        benchmarks: results,
    };
    let json = serde_json::to_string_pretty(&doc)
        .map_err(|e| Error::driver(format!("failed to serialize results: {e}")))?;
    fs::write(&out_path, json)
        .map_err(|e| Error::driver(format!("failed to write {}: {e}", out_path.display())))?;

    println!("\nSaved results to {}", out_path.display());
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
