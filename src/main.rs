//! `vdisk` is the line-oriented front end of the virtual disk system: it
//! executes command scripts against disk image files, or prompts
//! interactively.
//!
//! Environment: `LOG_FILE` names the log sink (stderr when unset);
//! `PORT` and `ALLOW_ORIGIN` are read for the HTTP collaborator that
//! wraps this core.

mod logger;

use cmd::{run_script, Adapter};
use std::env;
use std::path::PathBuf;
use std::process::exit;
use utils::prompt::prompt;

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
    /// The name of the current program used in command line.
    prog: String,

    /// If true, print command line help.
    help: bool,
    /// If true, print script results as JSON.
    json: bool,

    /// Script files to execute; empty means interactive mode.
    scripts: Vec<PathBuf>,
}

fn parse_args() -> Args {
    let mut args: Args = Default::default();

    let mut iter = env::args();
    args.prog = iter.next().unwrap_or("vdisk".to_owned());

    for arg in iter {
        match arg.as_str() {
            "-h" | "--help" => args.help = true,
            "-j" | "--json" => args.json = true,
            _ => args.scripts.push(arg.into()),
        }
    }

    args
}

/// Prints command help.
fn print_help(prog: &str) {
    println!();
    println!("Usage:");
    println!(" {} [options] [scripts...]", prog);
    println!();
    println!("Executes virtual disk command scripts, or prompts when no script is given.");
    println!();
    println!("Options:");
    println!(" -h, --help\tPrints help.");
    println!(" -j, --json\tPrints script results as JSON.");
    println!();
    println!("Environment:");
    println!(" LOG_FILE\tAppend logs to this file instead of stderr.");
    println!(" PORT, ALLOW_ORIGIN\tRead for the HTTP front end wrapping this core.");
}

fn run_scripts(adapter: &Adapter, args: &Args) -> i32 {
    let mut status = 0;

    for path in &args.scripts {
        let script = match std::fs::read_to_string(path) {
            Ok(script) => script,
            Err(e) => {
                eprintln!("{}: cannot read {}: {}", args.prog, path.display(), e);
                status = 1;
                continue;
            }
        };

        let outcome = run_script(adapter, &script);
        if args.json {
            match serde_json::to_string_pretty(&outcome) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("{}: {}", args.prog, e),
            }
        } else {
            for result in &outcome.results {
                println!("> {}", result.input);
                if result.success {
                    println!("{}", result.output);
                } else if let Some(error) = &result.error {
                    println!("{}", error);
                }
            }
            println!(
                "{} comandos: {} correctos, {} fallidos",
                outcome.total, outcome.succeeded, outcome.failed
            );
        }
        if !outcome.ok {
            status = 1;
        }
    }

    status
}

/// Tells whether the line is a `login` without its `-pass` flag, so the
/// REPL can ask for the password without echoing it.
fn wants_password(line: &str) -> bool {
    match cmd::parser::parse_line(line) {
        Ok(parsed) => parsed.name == "login" && !parsed.args.has("pass"),
        Err(_) => false,
    }
}

fn repl(adapter: &Adapter) {
    while let Some(line) = prompt(Some("vdisk> "), false) {
        let mut line = line.trim().to_owned();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        if wants_password(&line) {
            let Some(pass) = prompt(Some("Password: "), true) else {
                break;
            };
            line.push_str(&format!(" -pass \"{}\"", pass));
        }

        let outcome = adapter.run_outcome(&line);
        if outcome.ok {
            println!("{}", outcome.output);
        } else if let Some(error) = &outcome.error {
            println!("{}", error);
        }
    }
}

fn main() {
    let args = parse_args();
    if args.help {
        print_help(&args.prog);
        exit(0);
    }

    logger::init();
    if let Ok(port) = env::var("PORT") {
        log::info!("PORT={} (consumido por la fachada HTTP)", port);
    }
    if let Ok(origin) = env::var("ALLOW_ORIGIN") {
        log::info!("ALLOW_ORIGIN={} (consumido por la fachada HTTP)", origin);
    }

    let adapter = Adapter::new();
    if args.scripts.is_empty() {
        repl(&adapter);
    } else {
        exit(run_scripts(&adapter, &args));
    }
}
