use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use inipp::{ErrorHandler, IniParser};

/// Convert extended INI files into a flat format, resolving includes,
/// templates, generators and expressions.
#[derive(Parser)]
#[command(
    name = "inipp",
    version,
    about = "Convert extended INI FILEs into a flat format, resolving includes,\nreplacing templates and so on.",
    after_help = "If no files are given, reads from STDIN and prints the flattened result\nto STDOUT, looking for included files in the current directory.\n\nExit status:\n 0  if OK,\n 1  if there are any warnings,\n 2  if there are any parsing errors,\n 3  if serious trouble (e.g. an internal failure)."
)]
struct Cli {
    /// Input files
    files: Vec<PathBuf>,

    /// Postfix for new files in batch processing
    #[arg(short = 'p', long = "postfix", value_name = "TEXT")]
    postfix: Option<String>,

    /// Destination file for the combined output
    #[arg(short = 'd', long = "destination", value_name = "FILE")]
    destination: Option<PathBuf>,

    /// Directory to look included files in (repeatable)
    #[arg(short = 'i', long = "include", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Output in INI format instead of JSON
    #[arg(short = 'o', long = "output-ini")]
    output_ini: bool,

    /// Format resulting JSON
    #[arg(short = 'f', long = "format")]
    format: bool,

    /// Print warnings to STDERR
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Do not report any errors
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Disable includes support
    #[arg(long = "no-include")]
    no_include: bool,

    /// Disable calculations support
    #[arg(long = "no-maths")]
    no_maths: bool,
}

struct CliHandler {
    quiet: bool,
    verbose: bool,
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

impl ErrorHandler for CliHandler {
    fn on_warning(&self, path: &Path, message: &str) {
        if self.verbose && !self.quiet {
            eprintln!("Warning in {}: {}", display_name(path), message);
        }
    }

    fn on_error(&self, path: &Path, message: &str) {
        if !self.quiet {
            eprintln!("Error in {}: {}", display_name(path), message);
        }
    }
}

fn new_parser(cli: &Cli) -> IniParser {
    let mut dirs = vec![PathBuf::from(".")];
    dirs.extend(cli.include.iter().cloned());
    IniParser::with_search_dirs(dirs)
        .allow_includes(!cli.no_include)
        .allow_expressions(!cli.no_maths)
        .with_error_handler(CliHandler {
            quiet: cli.quiet,
            verbose: cli.verbose,
        })
}

fn serialize(parser: &IniParser, cli: &Cli) -> String {
    if cli.output_ini {
        parser.to_ini()
    } else {
        parser.to_json(cli.format)
    }
}

fn run() -> u8 {
    let cli = Cli::parse();

    let mut warnings = 0u32;
    let mut errors = 0u32;

    if cli.files.is_empty() {
        let mut input = String::new();
        if std::io::stdin().read_to_string(&mut input).is_err() {
            return 3;
        }
        let mut parser = new_parser(&cli);
        parser.parse(&input).finalize();
        warnings += parser.warnings();
        errors += parser.errors();

        let output = serialize(&parser, &cli);
        match &cli.destination {
            Some(dest) => {
                if fs::write(dest, output).is_err() {
                    return 3;
                }
            }
            None => print!("{output}"),
        }
    } else {
        let mut outputs = Vec::new();
        for file in &cli.files {
            let mut parser = new_parser(&cli);
            parser.parse_file(file).finalize();
            warnings += parser.warnings();
            errors += parser.errors();

            let output = serialize(&parser, &cli);
            if let Some(postfix) = &cli.postfix {
                let mut name = file.as_os_str().to_os_string();
                name.push(postfix);
                if fs::write(&name, output).is_err() {
                    return 3;
                }
            } else {
                outputs.push(output);
            }
        }

        if cli.postfix.is_none() {
            let combined = outputs.join("\n\n");
            match &cli.destination {
                Some(dest) => {
                    if fs::write(dest, combined).is_err() {
                        return 3;
                    }
                }
                None => print!("{combined}"),
            }
        }
    }

    if errors > 0 {
        2
    } else if warnings > 0 {
        1
    } else {
        0
    }
}

fn main() -> ExitCode {
    let code = std::panic::catch_unwind(run).unwrap_or(3);
    ExitCode::from(code)
}
