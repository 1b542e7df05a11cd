//! Punto de entrada ("driver").
//!
//! Este módulo lee el archivo fuente, orquesta la compilación y expone
//! una CLI. Ante cualquier falla no se escribe salida parcial. Con
//! `-o -` la salida estándar lleva únicamente el código C, de modo que
//! el reporte de fases se desvía a la salida de errores.

use anyhow::{bail, Context};
use clap::{crate_version, Arg, ArgMatches, Command};
use py2c::{error::Diagnostics, BlockClosing, Options, Passes, UntypedPrint};
use tracing::Level;

use std::{
    fs,
    io::{self, Write},
    process,
};

fn main() {
    let args = cli().get_matches();

    let level = match args.occurrences_of("verbose") {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    if let Err(error) = run(&args, &mut io::stdout(), &mut io::stderr()) {
        eprintln!("error: {:#}", error);
        process::exit(1);
    }
}

fn cli() -> Command<'static> {
    Command::new("py2c")
        .version(crate_version!())
        .about("Python to C compiler with compilation phases")
        .arg(
            Arg::new("input")
                .required(true)
                .value_name("INPUT")
                .help("Path to Python (.py) source file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .value_name("FILE")
                .default_value("output.c")
                .help("Output C file path ('-' for stdout)"),
        )
        .arg(
            Arg::new("dedent")
                .long("dedent")
                .help("Close blocks by indentation level instead of at top-level lines"),
        )
        .arg(
            Arg::new("strict-print")
                .long("strict-print")
                .help("Reject printing names whose type is unknown"),
        )
        .arg(
            Arg::new("no-hoist")
                .long("no-hoist")
                .help("Disable loop-invariant hoisting heuristic"),
        )
        .arg(
            Arg::new("no-prune")
                .long("no-prune")
                .help("Disable blank line elimination"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Do not print the phase report"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .multiple_occurrences(true)
                .help("Increase log verbosity and show the source line of a failure"),
        )
}

fn run(args: &ArgMatches, stdout: &mut dyn Write, stderr: &mut dyn Write) -> anyhow::Result<()> {
    // Ambos tienen valor: uno es requerido y el otro tiene valor por omisión
    let (input, output) = match (args.value_of("input"), args.value_of("output")) {
        (Some(input), Some(output)) => (input, output),
        _ => bail!("Missing input or output path"),
    };

    let quiet = args.is_present("quiet");
    let verbose = args.occurrences_of("verbose") > 0;
    let options = options(args, input);

    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read source file: {}", input))?;

    let compilation = match py2c::compile(&text, &options) {
        Ok(compilation) => compilation,
        Err(error) => {
            // El mensaje de una línea basta; `-v` agrega la línea señalada
            let message = error.to_string();
            if verbose {
                write!(stderr, "{}", error.diagnostics())?;
            }

            bail!(message);
        }
    };

    if !quiet {
        let report: &mut dyn Write = match output {
            "-" => &mut *stderr,
            _ => &mut *stdout,
        };

        write!(report, "{}", compilation.report)?;

        let warnings = Diagnostics::from(compilation.report.warnings.clone()).warnings();
        if !warnings.is_empty() {
            write!(stderr, "{}", warnings)?;
        }
    }

    let mut code = compilation.code;
    code.push('\n');

    match output {
        "-" => stdout
            .write_all(code.as_bytes())
            .context("Failed to write to stdout")?,

        path => {
            fs::write(path, code).with_context(|| format!("Failed to write output file: {}", path))?;
            if !quiet {
                writeln!(stdout, "C code written to {}", path)?;
            }
        }
    }

    Ok(())
}

fn options(args: &ArgMatches, input: &str) -> Options {
    let mut passes = Passes::all();
    if args.is_present("no-hoist") {
        passes.remove(Passes::HOIST);
    }

    if args.is_present("no-prune") {
        passes.remove(Passes::PRUNE);
    }

    let block_closing = if args.is_present("dedent") {
        BlockClosing::Indentation
    } else {
        BlockClosing::TopLevelLine
    };

    let untyped_print = if args.is_present("strict-print") {
        UntypedPrint::Reject
    } else {
        UntypedPrint::Float
    };

    Options {
        name: input.to_owned(),
        block_closing,
        untyped_print,
        passes,
    }
}
