use std::io::{self, Read};

use anyhow::{Context, Result, bail};
use clap::{Parser as _, Subcommand};
use phf::{Map, phf_map};
use tracing::{Level, debug};
use tracing_subscriber::EnvFilter;

use skein::{Binary, Config, Forward, Grammar, OperatorTable, Parse, Parser, Pattern, RegexFlags, Unary};

const BUILTIN_PATTERNS: Map<&'static str, &'static str> = phf_map! {
    "int" => r"[+-]?[0-9]+",
    "real" => r"[+-]?(?:[0-9]+(?:\.[0-9]+)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?",
    "ident" => r"[A-Za-z_][A-Za-z0-9_]*",
    "word" => r"\w+",
    "space" => r"\s+",
};

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// More log output (repeat for more)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every match of a pattern
    Scan {
        /// Pattern to look for
        #[arg(value_name = "PATTERN")]
        pattern: String,

        /// Text to scan; stdin when absent
        #[arg(value_name = "TEXT")]
        text: Option<String>,

        /// Read PATTERN as a regular expression
        #[arg(short = 'r', long)]
        regex: bool,

        /// Read PATTERN as the name of a built-in pattern
        #[arg(short = 'b', long, conflicts_with = "regex")]
        builtin: bool,

        /// Match case-insensitively
        #[arg(short = 'i', long)]
        ignore_case: bool,

        /// Stop after the first match
        #[arg(short = '1', long)]
        first: bool,
    },

    /// Evaluate arithmetic expressions
    Calc {
        /// Expression; one per line from stdin when absent
        #[arg(value_name = "EXPR")]
        expr: Option<String>,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_env("SKEIN_LOG").unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn read_input(text: Option<String>) -> Result<String> {
    match text {
        Some(text) => Ok(text),
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}

fn scan_pattern(pattern: &str, is_regex: bool, builtin: bool, ignore_case: bool) -> Result<Pattern<String>> {
    let flags = RegexFlags {
        case_insensitive: ignore_case,
        ..RegexFlags::default()
    };
    let source = if builtin {
        match BUILTIN_PATTERNS.get(pattern) {
            Some(source) => source.to_string(),
            None => {
                let mut names: Vec<_> = BUILTIN_PATTERNS.keys().copied().collect();
                names.sort_unstable();
                bail!("Unknown built-in pattern {:?} (expected one of {})", pattern, names.join(", "));
            }
        }
    } else if is_regex {
        pattern.to_string()
    } else if ignore_case {
        regex::escape(pattern)
    } else {
        return Ok(Pattern::from(pattern));
    };
    Pattern::regex_with(&source, flags).with_context(|| format!("Invalid pattern {:?}", source))
}

fn scan(pattern: Pattern<String>, text: &str, first: bool) {
    let grammar: Grammar<String> = Grammar::new().then(pattern);
    let print = |start: usize, end: usize, matched: &str| println!("{}..{}\t{}", start, end, matched);
    if first {
        if let Some(r) = grammar.parse_part(text, None) {
            print(r.start_index.unwrap_or_default(), r.last_index, &r.matched);
        }
        return;
    }
    let count = grammar.parse_part_global(text, 0usize, |count, r| {
        print(r.start_index.unwrap_or_default(), r.last_index, &r.matched);
        count + 1
    });
    debug!(count, "scan finished");
}

/// `+ - * /` left-associative, unary minus, `^` right-associative.
fn calculator() -> Result<Parser<f64>> {
    let config: Config<f64> = Config::new().with_ignore(Pattern::regex(r"\s+")?);
    let primary = config.clone();
    let parser = OperatorTable::<f64>::new()
        .left(vec![Binary::new("+", |l: f64, r: f64| l + r), Binary::new("-", |l: f64, r: f64| l - r)])
        .left(vec![Binary::new("*", |l: f64, r: f64| l * r), Binary::new("/", |l: f64, r: f64| l / r)])
        .prefix(vec![Unary::new("-", |v: f64| -v)])
        .right(vec![Binary::new("^", |l: f64, r: f64| l.powf(r))])
        .primary(move |levels: &[Forward<f64>]| {
            primary.grammar().or([
                Pattern::from(primary.grammar().real(false)),
                Pattern::from(primary.grammar().then("(").then(&levels[0]).then(")")),
            ])
        })
        .build(&config)?;
    Ok(parser)
}

fn calc(expr: Option<String>) -> Result<()> {
    let parser = calculator()?;
    let lines: Vec<String> = match expr {
        Some(expr) => vec![expr],
        None => read_input(None)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect(),
    };
    for line in lines {
        match parser.parse(&line, None).and_then(|r| r.attribute) {
            Some(value) => println!("{}", value),
            None => bail!("Cannot evaluate {:?}", line),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Scan {
            pattern,
            text,
            regex,
            builtin,
            ignore_case,
            first,
        } => {
            let pattern = scan_pattern(&pattern, regex, builtin, ignore_case)?;
            let text = read_input(text)?;
            scan(pattern, &text, first);
            Ok(())
        }
        Command::Calc { expr } => calc(expr),
    }
}
