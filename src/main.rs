// Точка входа relc: компилирует сериализованное дерево и печатает IR

use std::env;
use std::fs;
use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use rel_syntax::{evaluate, Compiler, NO_PATH};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!("relc - arr.ai syntax tree lowering");
    println!();
    println!("Usage:");
    println!("  relc tree.json             # Compile and print the expression IR");
    println!("  relc tree.json --eval      # Compile and evaluate the expression");
    println!("  relc -                     # Read the tree document from stdin");
    println!("  relc --help                # Show this help");
    println!("  relc --version             # Show version");
    println!();
    println!("Options:");
    println!("  --path <p>   Source path for local imports (default: input file)");
    println!("  --no-path    Source has no directory; local imports are rejected");
    println!("  --eval       Evaluate the compiled expression with the reference evaluator");
    println!("  --debug      Verbose logging (overrides RUST_LOG)");
    println!();
    println!("Input document: {{\"source\": \"<program text>\", \"tree\": <syntax tree>}}");
}

fn print_version() {
    println!("relc v{}", VERSION);
}

struct Options {
    input: String,
    path: Option<String>,
    eval: bool,
    debug: bool,
}

enum Command {
    Run(Options),
    Help,
    Version,
}

fn parse_args(args: &[String]) -> Result<Command> {
    let mut input = None;
    let mut path = None;
    let mut eval = false;
    let mut debug = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-v" | "--version" => return Ok(Command::Version),
            "--eval" => eval = true,
            "--debug" => debug = true,
            "--no-path" => path = Some(NO_PATH.to_string()),
            "--path" => {
                i += 1;
                match args.get(i) {
                    Some(p) => path = Some(p.clone()),
                    None => bail!("--path requires a value"),
                }
            }
            "-" => input = Some("-".to_string()),
            arg if arg.starts_with('-') => bail!("unknown option: {} (see --help)", arg),
            arg => {
                if input.is_some() {
                    bail!("only one input file is accepted, got extra {:?}", arg);
                }
                input = Some(arg.to_string());
            }
        }
        i += 1;
    }

    match input {
        Some(input) => Ok(Command::Run(Options {
            input,
            path,
            eval,
            debug,
        })),
        None => bail!("no input file (see --help)"),
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("reading tree document from stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(input).with_context(|| format!("reading {}", input))
}

fn run(options: Options) -> Result<()> {
    let document = read_input(&options.input)?;
    let path = match (&options.path, options.input.as_str()) {
        (Some(path), _) => path.clone(),
        (None, "-") => String::new(),
        (None, input) => input.to_string(),
    };

    let expr = Compiler::new()
        .compile(&path, &document)
        .with_context(|| format!("compiling {}", options.input))?;

    if options.eval {
        let value = evaluate(&expr).with_context(|| format!("evaluating {}", expr))?;
        println!("{}", value);
    } else {
        println!("{}", expr);
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let options = match parse_args(&args) {
        Ok(Command::Help) => {
            print_help();
            return;
        }
        Ok(Command::Version) => {
            print_version();
            return;
        }
        Ok(Command::Run(options)) => options,
        Err(err) => {
            eprintln!("Ошибка: {}", err);
            std::process::exit(2);
        }
    };

    init_logging(options.debug);

    if let Err(err) = run(options) {
        eprintln!("Ошибка: {:#}", err);
        std::process::exit(1);
    }
}
