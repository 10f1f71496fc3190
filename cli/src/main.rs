//! Sonar CLI - static type inference for a Python subset
//!
//! Usage:
//!   sonar-cli <SCRIPT>           Check a source file
//!   sonar-cli -e <CODE>          Check inline source
//!   sonar-cli -o <FORMAT>        Output format: text (default), json, jsonl
//!   sonar-cli --errors-only      Only report faults
//!   cat file | sonar-cli         Read source from stdin

mod output;

use clap::Parser;
use output::{format_error_json, format_report_json, format_text_entry, JsonlWriter, OutputMode};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use sonar_lang::error::SonarError;
use sonar_lang::runner::{Report, Runner, RunnerConfig};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!(
        r#"sonar {}

USAGE:
    sonar-cli <SCRIPT>              Check a source file
    sonar-cli -e <CODE>             Check inline source
    sonar-cli -o <FORMAT>           Output format (text, json, jsonl)
    sonar-cli -h                    Show this help
    cat file | sonar-cli            Read from stdin

OPTIONS:
    -e, --eval <CODE>       Check inline source
    -o, --output <FORMAT>   Output format: text (default), json, jsonl
        --errors-only       Only report nodes with faults
        --verbose           Log analysis progress to stderr
    -h, --help              Show this help message
    -v, --version           Display version information

EXIT CODES:
    0    No faults found
    1    Usage or input error
    2    Lex, parse or analysis error
    3    Analysis finished with faults

ENVIRONMENT:
    SONAR_LOG    Log filter, e.g. `sonar_lang=trace`"#,
        VERSION
    );
}

fn print_version() {
    println!("sonar {}", VERSION);
}

/// Static type inference for a Python subset
#[derive(Parser, Debug)]
#[command(name = "sonar-cli")]
#[command(version, about = "Static type inference for a Python subset", long_about = None)]
#[command(disable_version_flag = true, disable_help_flag = true)]
struct Args {
    /// Print version
    #[arg(short = 'v', long = "version")]
    version: bool,

    /// Show help message
    #[arg(short = 'h', long = "help")]
    help: bool,

    /// The file to check (optional if using -e or stdin)
    script: Option<PathBuf>,

    /// Check inline source
    #[arg(short = 'e', long = "eval")]
    eval: Option<String>,

    /// Output format: text (default), json, jsonl
    #[arg(short = 'o', long = "output", value_name = "FORMAT")]
    output: Option<String>,

    /// Only report nodes with faults
    #[arg(long = "errors-only")]
    errors_only: bool,

    /// Log analysis progress to stderr
    #[arg(long = "verbose")]
    verbose: bool,
}

/// Parse the output mode from CLI args.
fn parse_output_mode(args: &Args) -> Result<OutputMode, String> {
    match args.output.as_deref() {
        None | Some("text") => Ok(OutputMode::Text),
        Some("json") => Ok(OutputMode::Json),
        Some("jsonl") => Ok(OutputMode::Jsonl),
        Some(other) => Err(format!("Invalid output format: '{}'. Use: text, json, jsonl", other)),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("SONAR_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.help {
        print_help();
        return ExitCode::SUCCESS;
    }

    if args.version {
        print_version();
        return ExitCode::SUCCESS;
    }

    init_tracing(args.verbose);

    let output_mode = match parse_output_mode(&args) {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    // Determine source: -e flag > file argument > stdin
    let source = match get_source(&args) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    let runner = Runner::with_config(RunnerConfig {
        errors_only: args.errors_only,
        include_builtins: false,
    });

    debug!(bytes = source.len(), mode = ?output_mode, "checking source");
    match runner.check_source(&source) {
        Ok(report) => {
            if let Err(e) = print_report(output_mode, &report) {
                eprintln!("Error writing output: {}", e);
                return ExitCode::from(1);
            }
            if report.has_faults() {
                ExitCode::from(3)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(error) => {
            print_error(output_mode, &error);
            ExitCode::from(2)
        }
    }
}

fn get_source(args: &Args) -> Result<String, String> {
    if let Some(ref eval_script) = args.eval {
        return Ok(eval_script.clone());
    }

    if let Some(ref script_path) = args.script {
        return std::fs::read_to_string(script_path)
            .map_err(|e| format!("Error reading file {:?}: {}", script_path, e));
    }

    // Try stdin if not a TTY
    if !atty::is(atty::Stream::Stdin) {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| format!("Error reading from stdin: {}", e))?;
        return Ok(content);
    }

    Err("No input provided. Use: sonar-cli <SCRIPT>, sonar-cli -e <CODE>, or pipe to stdin".to_string())
}

fn print_report(mode: OutputMode, report: &Report) -> io::Result<()> {
    match mode {
        OutputMode::Text => {
            let colour = atty::is(atty::Stream::Stdout);
            let stdout = io::stdout();
            let mut out = stdout.lock();
            for entry in &report.entries {
                writeln!(out, "{}", format_text_entry(entry, colour))?;
            }
            writeln!(out, "result: {}", report.result)
        }
        OutputMode::Json => {
            let json = format_report_json(report)?;
            println!("{}", json);
            Ok(())
        }
        OutputMode::Jsonl => JsonlWriter::new(io::stdout()).write_report(report),
    }
}

fn print_error(mode: OutputMode, error: &SonarError) {
    match mode {
        OutputMode::Text => eprintln!("{}", error),
        OutputMode::Json | OutputMode::Jsonl => match format_error_json(error) {
            Ok(json) => println!("{}", json),
            Err(_) => eprintln!("{}", error),
        },
    }
}
