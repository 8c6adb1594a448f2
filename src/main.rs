//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases del proceso de
//! compilación y expone una CLI.

use anyhow::Context;
use clap::{crate_version, Arg, ArgAction, ArgGroup, ArgMatches, Command};
use ganymede::{
    codegen::{self, Options},
    dump,
    error::{CompileError, Diagnostics},
    lex, parse,
    source::Source,
};

use std::{
    fs,
    io::{self, Write},
    process,
    rc::Rc,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = cli().get_matches();
    let source = read_source(&args)?;

    let mut options = Options::default();
    if let Some(&registers) = args.get_one::<u32>("registers") {
        options.registers = registers;
    }

    let assembly = match compile(&source, &args, &options) {
        Ok(assembly) => assembly,
        Err(error) => {
            let kind = error.kind();
            eprint!("{}", Diagnostics::from(error).kind(kind));

            process::exit(1);
        }
    };

    match args.get_one::<String>("output").map(String::as_str) {
        None | Some("-") => io::stdout()
            .write_all(assembly.as_bytes())
            .context("Failed to write to stdout")?,

        Some(path) => fs::write(path, assembly)
            .with_context(|| format!("Failed to write output file: {}", path))?,
    }

    Ok(())
}

/// Parsing de CLI.
fn cli() -> Command<'static> {
    Command::new("Ganymede C compiler")
        .version(crate_version!())
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .takes_value(true)
                .help("Source file"),
        )
        .arg(
            Arg::new("expr")
                .short('e')
                .long("expr")
                .value_name("SOURCE")
                .takes_value(true)
                .help("Compile the given source text instead of a file"),
        )
        .group(
            ArgGroup::new("source")
                .args(&["input", "expr"])
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .takes_value(true)
                .default_value("-")
                .help("Output file ('-' for stdout)"),
        )
        .arg(
            Arg::new("tokens")
                .long("tokens")
                .action(ArgAction::SetTrue)
                .help("Dump tokens to stderr"),
        )
        .arg(
            Arg::new("ast")
                .long("ast")
                .action(ArgAction::SetTrue)
                .help("Dump the syntax tree to stderr"),
        )
        .arg(
            Arg::new("registers")
                .long("registers")
                .value_name("N")
                .takes_value(true)
                .value_parser(clap::value_parser!(u32))
                .help("Maximum number of scratch registers in use"),
        )
}

fn read_source(args: &ArgMatches) -> anyhow::Result<Rc<Source>> {
    if let Some(text) = args.get_one::<String>("expr") {
        return Ok(Source::new("<expr>", text.as_str()));
    }

    let path = args
        .get_one::<String>("input")
        .context("No input was given")?;

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read source file: {}", path))?;

    Ok(Source::new(path.as_str(), text))
}

fn compile(source: &Rc<Source>, args: &ArgMatches, options: &Options) -> Result<String, CompileError> {
    let tokens = lex::scan(source)?;
    if args.get_flag("tokens") {
        eprint!("{}", dump::Tokens(&tokens));
    }

    let program = parse::parse(&tokens)?;
    if args.get_flag("ast") {
        eprint!("{}", dump::Ast(&program));
    }

    Ok(codegen::generate(&program, options)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn cli_reports_package_version() {
        assert_eq!(cli().get_version(), Some(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn source_is_required_and_exclusive() {
        assert!(cli().try_get_matches_from(["ganymede"]).is_err());
        assert!(cli().try_get_matches_from(["ganymede", "in.c", "-e", "int f() {}"]).is_err());

        let args = cli()
            .try_get_matches_from(["ganymede", "-e", "int f() {}", "--registers", "4"])
            .unwrap();

        assert_eq!(args.get_one::<u32>("registers"), Some(&4));
        assert_eq!(args.get_one::<String>("output").map(String::as_str), Some("-"));
        assert!(!args.get_flag("tokens"));
    }
}
