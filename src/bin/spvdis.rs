use spvdis::disassemble::Disassembler;
use std::error::Error;
use std::io::{self, Read, Write};
use std::{fs, path::PathBuf};

/// Disassemble a SPIR-V binary module into assembly text.
#[derive(argh::FromArgs, Debug)]
struct Args {
    /// color the output with ANSI escapes
    #[argh(switch)]
    highlight: bool,

    /// print `<id>`s by name (from `OpName` or inferred from types) when possible
    #[argh(switch)]
    inline_names: bool,

    /// don't right-align the `%id = ` prefixes
    #[argh(switch)]
    no_indent: bool,

    /// separate the logical sections of the module with blank lines
    #[argh(switch)]
    group: bool,

    /// don't print the `; SPIR-V` header comment
    #[argh(switch)]
    no_header: bool,

    /// warn about (instead of rejecting) unsupported extended instruction sets
    #[argh(switch)]
    allow_unknown_ext_inst_sets: bool,

    /// output file (stdout if not specified)
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// input file (stdin if not specified, or `-`)
    #[argh(positional)]
    input: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> spvdis::Config {
        spvdis::Config {
            decode: spvdis::DecodeOptions {
                allow_unknown_ext_inst_sets: self.allow_unknown_ext_inst_sets,
            },
            print: spvdis::PrintOptions {
                highlight: self.highlight,
                inline_names: self.inline_names,
                no_indent: self.no_indent,
                group: self.group,
                no_header: self.no_header,
            },
        }
    }
}

fn print_err(error: &dyn Error) {
    eprint!("error: {error}");

    let mut e = error.source();
    if e.is_some() {
        eprintln!(": ");
    } else {
        eprintln!();
    }

    while let Some(source) = e {
        eprintln!("\t{source}");
        e = source.source();
    }
}

fn main() {
    if let Err(e) = run() {
        print_err(e.as_ref());
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Args = argh::from_env();
    let config = args.config();

    let input: Box<dyn Read> = match &args.input {
        Some(path) if path.as_os_str() != "-" => Box::new(fs::File::open(path)?),
        _ => Box::new(io::stdin().lock()),
    };

    // The output is only opened once decoding succeeded, so that a failed
    // decode doesn't leave an empty (or truncated) file behind.
    let text = Disassembler::new(io::BufReader::new(input), &config).run()?;

    match &args.output {
        Some(path) => fs::write(path, text)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
