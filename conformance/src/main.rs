//! Pickle unpickler conformance runner.
//!
//! # Usage
//!
//! Run the whole corpus against Pyrolite:
//! ```bash
//! pyrolite-conformance --oracle java --oracle-arg=-cp \
//!     --oracle-arg=build/pyrolite.jar --oracle-arg=net.razorvine.pickle.Unpickler
//! ```
//!
//! List the corpus:
//! ```bash
//! pyrolite-conformance --list
//! ```
//!
//! # Exit Codes
//!
//! - 0: Run completed
//! - 1: `--strict` and at least one case failed
//! - 2: Run aborted (encoder failure, hand-off I/O, oracle could not start)

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use facet::Facet;
use pyrolite_conformance::{Corpus, Driver, HarnessConfig, HarnessError, ProcessOracle};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pyrolite-conformance")]
#[command(about = "Check a pickle unpickler against the reference corpus")]
struct Args {
    /// Unpickler executable, invoked as `<oracle> [args...] <stream> <report>`
    #[arg(long, env = "PYROLITE_ORACLE")]
    oracle: Option<PathBuf>,

    /// Extra argument passed to the oracle before the two paths (repeatable)
    #[arg(long = "oracle-arg", allow_hyphen_values = true)]
    oracle_args: Vec<String>,

    /// Directory holding pickledata.txt and resultdata.txt
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Lowest protocol to test
    #[arg(long, default_value_t = pickle_ref::LOWEST_PROTOCOL)]
    min_protocol: u8,

    /// Highest protocol to test
    #[arg(long, default_value_t = pickle_ref::HIGHEST_PROTOCOL)]
    max_protocol: u8,

    /// Only run this corpus group, e.g. "java.util.HashMap" (repeatable)
    #[arg(long)]
    group: Vec<String>,

    /// Kill the oracle after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Hex-dump the stream of every failing case
    #[arg(long)]
    dump: bool,

    /// List the corpus and exit
    #[arg(long)]
    list: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Exit with status 1 if any case failed
    #[arg(long)]
    strict: bool,
}

/// JSON output for one corpus case.
#[derive(Facet)]
struct CaseJson {
    group: String,
    value: String,
    expected: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<ExitCode, HarnessError> {
    let mut corpus = Corpus::reference()?;
    if let Some(unknown) = corpus.retain_groups(&args.group).into_iter().next() {
        return Err(HarnessError::UnknownGroup(unknown));
    }

    if args.list {
        list_corpus(&corpus, args)?;
        return Ok(ExitCode::SUCCESS);
    }

    let program = args.oracle.clone().ok_or(HarnessError::MissingOracle)?;
    let oracle = ProcessOracle::new(program)
        .with_args(&args.oracle_args)
        .with_timeout(args.timeout.map(Duration::from_secs));
    let config = HarnessConfig::new(&args.work_dir)
        .with_protocols(args.min_protocol, args.max_protocol)?
        .with_dump_failures(args.dump);

    tracing::info!(
        oracle = %oracle.program().display(),
        cases = corpus.len(),
        protocols = ?config.protocols(),
        "starting run"
    );

    let mut driver = Driver::new(config, oracle);
    let summary = if args.format == "json" {
        // The transcript moves to stderr so stdout is only the summary.
        let summary = driver.run(&corpus, &mut io::stderr().lock())?;
        println!("{}", facet_json::to_string(&summary));
        summary
    } else {
        let mut stdout = io::stdout().lock();
        let summary = driver.run(&corpus, &mut stdout)?;
        stdout.flush().map_err(HarnessError::Report)?;
        summary
    };

    if args.strict && !summary.passed() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn list_corpus(corpus: &Corpus, args: &Args) -> Result<(), HarnessError> {
    if args.format == "json" {
        let output: Vec<CaseJson> = corpus
            .groups()
            .iter()
            .flat_map(|group| {
                group.cases.iter().map(|case| CaseJson {
                    group: group.label.clone(),
                    value: case.describe(),
                    expected: case.expected_string.clone(),
                })
            })
            .collect();
        println!("{}", facet_json::to_string(&output));
        return Ok(());
    }

    let mut out = io::stdout().lock();
    for group in corpus.groups() {
        writeln!(out, "## {}", group.label).map_err(HarnessError::Report)?;
        for case in &group.cases {
            writeln!(out, "  {} -> {:?}", case.describe(), case.expected_string)
                .map_err(HarnessError::Report)?;
        }
        writeln!(out).map_err(HarnessError::Report)?;
    }
    writeln!(out, "Total: {} cases in {} groups", corpus.len(), corpus.groups().len())
        .map_err(HarnessError::Report)?;
    Ok(())
}
