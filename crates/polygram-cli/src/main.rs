use std::{
    env::args,
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
    time::{Duration, Instant},
};

use anyhow::{bail, Context};
use polygram_backend::{
    check::find_left_recursion, compile_with, optimize::first::FirstSets, validate,
    CompileOptions, Grammar, Optimizer, OptimizerOptions,
};
use polygram_runtime::{Error, ParseMode, Tree, Visitor};

fn main() {
    if let Err(e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn init_logger() -> anyhow::Result<()> {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "WARN".to_owned());
    let level = log::LevelFilter::from_str(&level).unwrap_or(log::LevelFilter::Warn);

    simplelog::TermLogger::init(
        level,
        simplelog::ConfigBuilder::new()
            .set_time_format_custom(&[])
            .build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Never,
    )
    .context("Failed to initialize logger")
}

/// Average duration of a phase and the input throughput it amounts to.
struct Timing {
    elapsed: Duration,
    bytes: usize,
}

impl Display for Timing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let seconds = self.elapsed.as_secs_f64();
        let mebibytes = self.bytes as f64 / (1024.0 * 1024.0);
        write!(
            f,
            "{:.3} ms\t {:.2} MiB/s",
            seconds * 1000.0,
            mebibytes / seconds.max(f64::EPSILON)
        )
    }
}

/// Runs each phase `iters` times when benchmarking and reports the average.
pub struct PhaseRunner {
    do_bench: bool,
    bytes: usize,
    iters: u32,
}

impl PhaseRunner {
    pub fn new(bytes: usize, do_bench: bool, iters: u32) -> PhaseRunner {
        PhaseRunner {
            do_bench,
            bytes,
            iters: match do_bench {
                true => iters.max(1),
                false => 1,
            },
        }
    }
    pub fn run<F: FnMut() -> T, T>(&self, name: &str, mut fun: F) -> T {
        let start = Instant::now();
        let mut output = fun();
        for _ in 1..self.iters {
            output = fun();
        }

        if self.do_bench {
            let timing = Timing {
                elapsed: start.elapsed() / self.iters,
                bytes: self.bytes,
            };
            eprintln!("{name}\t {timing}");
        }

        output
    }
}

fn read(path: &Path, what: &str) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what} `{}`", path.display()))
}

fn run() -> anyhow::Result<()> {
    init_logger()?;

    let args = args().skip(1).collect::<Vec<_>>();

    let mut do_check = false;
    let mut do_dump = false;
    let mut no_optimize = false;
    let mut flat = false;
    let mut mode = ParseMode::Full;

    let mut do_bench = false;
    let mut bench_iters = 1;
    let mut input_repeat_count = 1;

    let mut files = Vec::new();
    let mut iter = args.iter().map(String::as_str);

    while let Some(arg) = iter.next() {
        match arg {
            "--check" => do_check = true,
            "--dump" => do_dump = true,
            "--no-optimize" => no_optimize = true,
            "--flat" => flat = true,
            "--prefix" => mode = ParseMode::Prefix,
            "--bench" => do_bench = true,
            "--iters" => {
                bench_iters = iter
                    .next()
                    .context("Expected argument to --iters")?
                    .parse::<u32>()
                    .context("Expected number")?;
            }
            "--repeats" => {
                input_repeat_count = iter
                    .next()
                    .context("Expected argument to --repeats")?
                    .parse::<u32>()
                    .context("Expected number")?;
            }
            _ if arg.starts_with("--") => bail!("Unknown flag `{arg}`"),
            _ => files.push(arg),
        }
    }

    let (grammar_path, input_path): (PathBuf, Option<PathBuf>) = match files.as_slice() {
        [] => bail!(
            "Usage: polygram-cli <grammar.json> [input] [--check] [--dump] [--no-optimize] [--flat] [--prefix] [--bench] [--iters N] [--repeats N]"
        ),
        &[grammar] => (grammar.into(), None),
        &[grammar, input] => (grammar.into(), Some(input.into())),
        _ => bail!("Expected at most a grammar and one input file"),
    };

    let source = read(&grammar_path, "grammar")?;
    let grammar: Grammar = serde_json::from_str(&source)
        .with_context(|| format!("Failed to load grammar `{}`", grammar_path.display()))?;

    let mut input = match &input_path {
        Some(path) => Some(read(path, "input")?),
        None => None,
    };
    if input_repeat_count != 1 {
        input = input.map(|input| input.repeat(input_repeat_count as usize));
    }

    let runner = PhaseRunner::new(
        input.as_ref().map_or(source.len(), String::len),
        do_bench,
        bench_iters,
    );

    if do_check {
        validate(&grammar)?;
        let first = FirstSets::compute(&grammar);
        for name in find_left_recursion(&grammar, &first) {
            println!("warning: rule `{name}` is left recursive");
        }
        println!("{}: {} rules, ok", grammar_path.display(), grammar.len());
    }

    // every rule becomes a tree node unless asked otherwise, which also keeps them from being inlined
    let visitor = match flat {
        true => Visitor::<Tree>::new(),
        false => Visitor::<Tree>::tree(
            grammar
                .rules()
                .filter(|rule| rule.attributes.is_empty())
                .map(|rule| rule.name.as_str()),
        ),
    };

    let options = CompileOptions {
        optimize: !no_optimize,
        optimizer: OptimizerOptions::default(),
        predictive: !no_optimize,
    };

    if do_dump {
        validate(&grammar)?;
        let dumped = match options.optimize {
            true => runner.run("optimize", || {
                Optimizer::with_options(options.optimizer.clone())
                    .preserve(visitor.rule_names())
                    .run(&grammar)
            }),
            false => grammar.clone(),
        };
        print!("{dumped}");
    }

    let runtime = runner.run("compile", || compile_with(&grammar, &visitor, &options))?;

    let Some(input) = input else {
        return Ok(());
    };

    match runner.run("parse", || runtime.parse(&input, mode)) {
        Ok(parsed) => {
            if mode == ParseMode::Prefix {
                println!("consumed {} of {} bytes", parsed.consumed, input.len());
            }
            print!("{}", parsed.value);
            Ok(())
        }
        Err(Error::Parse(e)) => {
            let path = input_path.as_deref().unwrap_or(Path::new("<input>"));
            bail!("{}: {}", path.display(), e.display_in(&input))
        }
        Err(e @ Error::Recursion(_)) => Err(e.into()),
    }
}

#[test]
fn test_timing() {
    let timing = Timing {
        elapsed: Duration::from_millis(500),
        bytes: 3 * 1024 * 1024,
    };
    assert_eq!(timing.to_string(), "500.000 ms\t 6.00 MiB/s");

    let instant = Timing {
        elapsed: Duration::ZERO,
        bytes: 0,
    };
    assert_eq!(instant.to_string(), "0.000 ms\t 0.00 MiB/s");
}

#[test]
fn test_logger_init_twice() {
    let _ = init_logger();
    let err = init_logger().unwrap_err();
    assert_eq!(err.to_string(), "Failed to initialize logger");
}
