use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use clap::{Parser, ValueEnum};
use regex::Regex;

use crate::errors::AppError;
use crate::model::{EmitKind, MtimePredicate, NamePredicate, ScanOptions};
use crate::output::PrintFormat;
use crate::platform::error_log_path;

#[derive(Debug, Parser)]
#[command(name = "pfind")]
#[command(about = "Parallel recursive file finder with filtering and scan statistics")]
pub struct Cli {
    /// Root directories to scan (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub dirs: Vec<PathBuf>,

    /// Regex applied to the filename
    #[arg(short = 'r', long = "rname")]
    pub pattern: Option<String>,

    /// Write matched lines to this file as well as stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Print a progress line on stderr while scanning
    #[arg(short, long)]
    pub progress: bool,

    /// Maximum depth below each root (0 lists the root's entries only)
    #[arg(short = 't', long = "depth")]
    pub max_depth: Option<usize>,

    /// Follow junctions/symlinks into directories. There is no cycle
    /// guard beyond --depth; a junction pointing at an ancestor recurses
    /// until the depth limit.
    #[arg(short = 'j', long)]
    pub follow_junctions: bool,

    /// Read root directories line by line from a file
    #[arg(short = 'd', long = "dirs-file")]
    pub dirs_file: Option<PathBuf>,

    /// Which entry kinds to report
    #[arg(long, value_enum, default_value_t = EmitArg::Files)]
    pub emit: EmitArg,

    /// Output line format
    #[arg(short = 'f', long, value_enum, default_value_t = FormatArg::Long)]
    pub format: FormatArg,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Only report entries modified within this duration.
    /// A bare number is days; "12h", "30m" and "90s" also work.
    #[arg(long, value_name = "DURATION")]
    pub newer_than: Option<String>,

    /// Track and report the longest filename seen
    #[arg(long)]
    pub longest_name: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EmitArg {
    Files,
    Dirs,
    Both,
}

impl EmitArg {
    pub fn into_emit(self) -> EmitKind {
        match self {
            Self::Files => EmitKind::Files,
            Self::Dirs => EmitKind::Dirs,
            Self::Both => EmitKind::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Name,
    Long,
    Full,
    Tsv,
}

impl FormatArg {
    pub fn into_format(self) -> PrintFormat {
        match self {
            Self::Name => PrintFormat::Name,
            Self::Long => PrintFormat::Long,
            Self::Full => PrintFormat::Full,
            Self::Tsv => PrintFormat::Tsv,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub roots: Vec<PathBuf>,
    pub scan: ScanOptions,
    pub out_file: Option<PathBuf>,
    pub error_log: PathBuf,
    pub progress: bool,
    pub print_format: PrintFormat,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, AppError> {
        let roots = resolve_roots(&cli)?;

        let match_name: Option<NamePredicate> = match &cli.pattern {
            Some(pattern) => {
                let regex = Regex::new(pattern)?;
                Some(Arc::new(move |name: &str| regex.is_match(name)))
            }
            None => None,
        };

        let match_mtime: Option<MtimePredicate> = match &cli.newer_than {
            Some(input) => {
                let window = parse_duration(input)?;
                // Fixed at configuration time; "recently modified" means
                // relative to scan start, not to each entry's visit.
                let cutoff = SystemTime::now()
                    .checked_sub(window)
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                Some(Arc::new(move |mtime: SystemTime| mtime >= cutoff))
            }
            None => None,
        };

        Ok(Self {
            roots,
            scan: ScanOptions {
                max_depth: cli.max_depth,
                follow_junctions: cli.follow_junctions,
                emit: cli.emit.into_emit(),
                worker_count: cli.threads.unwrap_or_else(num_cpus::get).max(1),
                match_name,
                match_mtime,
                track_longest_name: cli.longest_name,
            },
            out_file: cli.out.clone(),
            error_log: error_log_path(),
            progress: cli.progress,
            print_format: cli.format.into_format(),
        })
    }
}

fn resolve_roots(cli: &Cli) -> Result<Vec<PathBuf>, AppError> {
    if let Some(file) = &cli.dirs_file {
        if !file.is_file() {
            return Err(AppError::RootsFile(file.clone()));
        }
        let content = fs::read_to_string(file)?;
        let roots: Vec<PathBuf> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect();
        return Ok(roots);
    }
    if cli.dirs.is_empty() {
        return Ok(vec![std::env::current_dir()?]);
    }
    Ok(cli.dirs.clone())
}

/// Duration syntax: a bare number counts as days (matching the original
/// tool), with optional `d`/`h`/`m`/`s` suffixes.
pub fn parse_duration(input: &str) -> Result<Duration, AppError> {
    let trimmed = input.trim();
    let bad = |reason: &str| AppError::Duration {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(bad("empty"));
    }

    let (digits, unit) = match trimmed.chars().last() {
        Some(suffix) if suffix.is_ascii_alphabetic() => {
            (&trimmed[..trimmed.len() - 1], Some(suffix))
        }
        _ => (trimmed, None),
    };
    let value: u64 = digits
        .parse()
        .map_err(|_| bad("expected a whole number"))?;

    let seconds = match unit {
        None | Some('d') => value.saturating_mul(24 * 60 * 60),
        Some('h') => value.saturating_mul(60 * 60),
        Some('m') => value.saturating_mul(60),
        Some('s') => value,
        Some(_) => return Err(bad("unknown unit, expected d/h/m/s")),
    };
    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_number_parses_as_days() {
        assert_eq!(
            parse_duration("3").expect("parse"),
            Duration::from_secs(3 * 24 * 60 * 60)
        );
    }

    #[test]
    fn unit_suffixes_parse() {
        assert_eq!(parse_duration("12h").expect("parse"), Duration::from_secs(12 * 3600));
        assert_eq!(parse_duration("30m").expect("parse"), Duration::from_secs(1800));
        assert_eq!(parse_duration("90s").expect("parse"), Duration::from_secs(90));
        assert_eq!(
            parse_duration("2d").expect("parse"),
            Duration::from_secs(2 * 24 * 3600)
        );
    }

    #[test]
    fn bad_durations_are_rejected() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("x").is_err());
        assert!(parse_duration("3w").is_err());
        assert!(parse_duration("-5").is_err());
    }

    #[test]
    fn cli_defaults_map_into_scan_options() {
        let cli = Cli::parse_from(["pfind", "/tmp"]);
        let config = Config::from_cli(cli).expect("config");
        assert_eq!(config.roots, vec![PathBuf::from("/tmp")]);
        assert_eq!(config.scan.emit, EmitKind::Files);
        assert_eq!(config.print_format, PrintFormat::Long);
        assert!(config.scan.max_depth.is_none());
        assert!(!config.scan.follow_junctions);
        assert!(config.scan.worker_count >= 1);
    }

    #[test]
    fn pattern_becomes_a_name_predicate() {
        let cli = Cli::parse_from(["pfind", "-r", r"\.txt$", "/tmp"]);
        let config = Config::from_cli(cli).expect("config");
        let matches = config.scan.match_name.expect("predicate");
        assert!(matches("note.txt"));
        assert!(!matches("note.log"));
    }

    #[test]
    fn missing_dirs_file_is_an_error() {
        let cli = Cli::parse_from(["pfind", "-d", "/definitely/not/here.txt"]);
        assert!(matches!(
            Config::from_cli(cli),
            Err(AppError::RootsFile(_))
        ));
    }
}
