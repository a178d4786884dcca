mod debug_report;

use skriptum::{EmptyContext, Environment, Options, Registry, load_verbose_with};
use std::io::{self, IsTerminal, Read};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SKRIPTUM_LOG";

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    init_logging();

    let registry = match Registry::with_core() {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    let opts = Options { fold_constants: config.fold, ..Options::default() };
    let res = match load_verbose_with(&registry, &config.source, &opts) {
        Ok(res) => res,
        Err(err) => {
            debug_report::print_parse_error(&config.source, &err, config.color);
            std::process::exit(1);
        }
    };
    debug_report::print_load(&config.name, &res.details, config.color);

    if let Some(event) = &config.event {
        let env = Environment::new();
        let outcomes = res.script.dispatch(event, &env, &EmptyContext);
        debug_report::print_dispatch(event, &outcomes, &env.snapshot(), config.color);
        if outcomes.iter().any(Result::is_err) {
            std::process::exit(1);
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).with_target(false).try_init();
}

struct CliConfig {
    name: String,
    source: String,
    event: Option<String>,
    fold: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut path: Option<String> = None;
    let mut event: Option<String> = None;
    let mut fold = true;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("skriptum {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--no-fold" => fold = false,
            "--run" | "-r" => {
                let value = args.next().ok_or_else(|| "error: --run expects an event name".to_string())?;
                event = Some(value);
            }
            "--" => {
                if let Some(value) = args.next() {
                    set_path(&mut path, value)?;
                }
                break;
            }
            _ if arg.starts_with("--run=") => {
                event = Some(arg.trim_start_matches("--run=").to_string());
            }
            _ if arg.starts_with('-') && arg != "-" => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => set_path(&mut path, arg)?,
        }
    }

    let (name, source) = match path.as_deref() {
        None | Some("-") => ("<stdin>".to_string(), read_stdin_input()?),
        Some(file) => {
            let source = std::fs::read_to_string(file).map_err(|err| format!("error: failed to read '{file}': {err}"))?;
            (file.to_string(), source)
        }
    };

    if source.trim().is_empty() {
        return Err(format!("error: no script provided\n\n{}", help_text()));
    }

    Ok(CliConfig { name, source, event, fold, color })
}

fn set_path(path: &mut Option<String>, value: String) -> Result<(), String> {
    if path.is_some() {
        return Err("error: script provided multiple times".to_string());
    }
    *path = Some(value);
    Ok(())
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "skriptum {version}

Load a script, show its execution trees and optionally run one event.

Usage:
  skriptum [OPTIONS] [--] <script>
  skriptum [OPTIONS] < script.sk

Options:
  -r, --run <event>          Dispatch <event> once after loading, with fresh
                             variables and no event values.
  --no-fold                  Keep constant sub-expressions live.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  {log_env}               tracing filter, e.g. skriptum=debug (default: warn)

Exit codes:
  0  Success.
  1  The script failed to load or a trigger failed.
  2  Invalid arguments or missing input.
",
        version = env!("CARGO_PKG_VERSION"),
        log_env = LOG_ENV,
    )
}
