//! nclusterbox - dense n-sets in fuzzy tensors
//!
//! Usage: nclusterbox [OPTIONS] [FILE]
//!
//! Reads the tensor in FILE (stdin by default), hill-climbs from initial
//! patterns and writes the selected patterns, one per line.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use nclusterbox::config::{Config, Criterion, DedupMode, ShiftMode};
use nclusterbox::error::{Error, Result};
use nclusterbox::logging;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!("nclusterbox v{} - dense n-sets in fuzzy tensors", VERSION);
    println!();
    println!("Usage: nclusterbox [OPTIONS] [FILE]");
    println!();
    println!("Generic options:");
    println!("  -h, --help             Show this help message");
    println!("  -V, --version          Show version");
    println!("  -v, --verbose SECONDS  Report progress every SECONDS and log phases");
    println!("  -o, --out FILE         Output file (default: stdout)");
    println!("  -b, --boolean          Input lines have no membership degree");
    println!("  -j, --jobs N           Number of worker threads (default: all cores)");
    println!("  -d, --density X        Storage threshold in [0, 1]; 0 forces dense storage (default: 1)");
    println!();
    println!("Modification:");
    println!("  -p, --patterns FILE    Initial patterns (default: one per positive tuple)");
    println!("  -m, --max N            Maximal number of initial patterns");
    println!("  -s, --shift X          Constant shift in [0, 1) (default: mean membership)");
    println!("  -e, --expectation      Shift every tuple by its max slice average");
    println!("  -g, --grow             Never erase an element of the initial pattern");
    println!("  -i, --intermediary     Keep the patterns met during the climbs");
    println!("      --no-dedup         Do not remember visited patterns");
    println!("      --dedup-trie       Remember visited patterns in tries");
    println!();
    println!("Selection:");
    println!("      --msc rss|aic|bic  Model selection criterion (default: bic)");
    println!("      --mss N            Maximal number of selected patterns");
    println!("      --ns               No selection, output every local optimum");
    println!();
    println!("Input format:");
    println!("      --tds CHARS        Tensor dimension separators (default: \" \")");
    println!("      --tes CHARS        Tensor element separators (default: \",\")");
    println!("      --pds CHARS        Pattern dimension separators (default: \" \")");
    println!("      --pes CHARS        Pattern element separators (default: \",\")");
    println!();
    println!("Output format:");
    println!("      --ods STRING       Dimension separator (default: \" \")");
    println!("      --oes STRING       Element separator (default: \",\")");
    println!("      --pl               Print densities in the shifted tensor");
    println!("      --ps               Print sizes");
    println!("      --sp STRING        Prefix of the sizes (default: \" : \")");
    println!("      --ss STRING        Size separator (default: \" \")");
    println!("      --pa               Print areas");
    println!("      --ap STRING        Prefix of the area (default: \" : \")");
    println!("      --pr               Print the RSS of the model ending with each pattern");
    println!("      --rp STRING        Prefix of the RSS (default: \" : \")");
}

/// Value following the option at `args[*i]`
fn value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
    let option = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| Error::usage(format!("{option} requires an argument!")))
}

fn number<T: std::str::FromStr>(args: &[String], i: &mut usize) -> Result<T> {
    let option = args[*i].clone();
    let text = value(args, i)?;
    text.parse()
        .map_err(|_| Error::usage(format!("{option} should provide a number, not \"{text}\"!")))
}

/// Parses the command line. `None` if help or version was printed.
fn parse_args(args: &[String]) -> Result<Option<Config>> {
    let mut config = Config::default();
    let mut tensor_path = None;
    let mut shift = None;
    let mut expectation = false;
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(None);
            }
            "-V" | "--version" => {
                println!("nclusterbox v{}", VERSION);
                return Ok(None);
            }
            "-v" | "--verbose" => {
                let seconds: f64 = number(args, &mut i)?;
                if !(seconds > 0.0 && seconds.is_finite()) {
                    return Err(Error::usage("verbose option should provide a positive number of seconds!"));
                }
                config.progress = Some(Duration::from_secs_f64(seconds));
            }
            "-o" | "--out" => config.output_path = PathBuf::from(value(args, &mut i)?),
            "-b" | "--boolean" => config.boolean = true,
            "-j" | "--jobs" => config.jobs = number(args, &mut i)?,
            "-d" | "--density" => config.density_threshold = number(args, &mut i)?,
            "-p" | "--patterns" => config.pattern_path = Some(PathBuf::from(value(args, &mut i)?)),
            "-m" | "--max" => config.max_patterns = Some(number(args, &mut i)?),
            "-s" | "--shift" => shift = Some(number::<f64>(args, &mut i)?),
            "-e" | "--expectation" => expectation = true,
            "-g" | "--grow" => config.grow = true,
            "-i" | "--intermediary" => config.intermediary = true,
            "--no-dedup" => config.dedup = DedupMode::Disabled,
            "--dedup-trie" => config.dedup = DedupMode::Trie,
            "--msc" => config.criterion = Criterion::parse(value(args, &mut i)?)?,
            "--mss" => config.max_selection_size = Some(number(args, &mut i)?),
            "--ns" => config.no_selection = true,
            "--tds" => config.separators.tensor_dimension = value(args, &mut i)?.to_string(),
            "--tes" => config.separators.tensor_element = value(args, &mut i)?.to_string(),
            "--pds" => config.separators.pattern_dimension = value(args, &mut i)?.to_string(),
            "--pes" => config.separators.pattern_element = value(args, &mut i)?.to_string(),
            "--ods" => config.output.dimension_separator = value(args, &mut i)?.to_string(),
            "--oes" => config.output.element_separator = value(args, &mut i)?.to_string(),
            "--pl" => config.output.print_shifted = true,
            "--ps" => config.output.print_sizes = true,
            "--sp" => config.output.size_prefix = value(args, &mut i)?.to_string(),
            "--ss" => config.output.size_separator = value(args, &mut i)?.to_string(),
            "--pa" => config.output.print_area = true,
            "--ap" => config.output.area_prefix = value(args, &mut i)?.to_string(),
            "--pr" => config.output.print_rss = true,
            "--rp" => config.output.rss_prefix = value(args, &mut i)?.to_string(),
            _ if arg.starts_with('-') && arg.len() > 1 => {
                return Err(Error::usage(format!("Unknown option '{}'!", arg)));
            }
            _ => {
                if tensor_path.replace(PathBuf::from(arg)).is_some() {
                    return Err(Error::usage("only one tensor file can be given!"));
                }
            }
        }
        i += 1;
    }

    config.shift = match (shift, expectation) {
        (Some(_), true) => {
            return Err(Error::usage("shift and expectation options are mutually exclusive!"));
        }
        (Some(shift), false) => ShiftMode::Constant(shift),
        (None, true) => ShiftMode::Expectation,
        (None, false) => ShiftMode::Mean,
    };
    if let Some(path) = tensor_path {
        config.tensor_path = path;
    }
    config.validate()?;
    Ok(Some(config))
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match parse_args(&args) {
        Ok(Some(config)) => config,
        Ok(None) => return ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", error);
            eprintln!("Try 'nclusterbox --help' for usage information");
            return ExitCode::from(error.exit_code() as u8);
        }
    };
    if let Err(error) = logging::init_tracing(config.progress.is_some()) {
        eprintln!("Warning: {}", error);
    }
    match nclusterbox::run(&config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", error);
            ExitCode::from(error.exit_code() as u8)
        }
    }
}
