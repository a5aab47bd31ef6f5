//! Command line arguments and the validated run configuration built from them.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use thiserror::Error;

use crate::aggregate::{Category, RecordFilter};
use crate::record::Tier;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{tier} stations only serve companies; `{tier} {category}` is not a valid combination")]
    UnsupportedCombination { tier: Tier, category: Category },
}

#[derive(Parser, Debug, Clone)]
#[command(name = "cwire")]
#[command(version)]
#[command(about = "Sum consumer load per station of a tier and report it by station id")]
pub struct Args {
    /// Input file: a header line, then `plant;hvb;hva;lv;company;individual;capacity;load` records
    pub input: PathBuf,

    /// Station tier to group by
    #[arg(value_enum)]
    pub tier: Tier,

    /// Consumer category to aggregate
    #[arg(value_enum)]
    pub category: Category,

    /// Only aggregate records of this power plant (0 means every plant)
    pub plant: Option<u32>,

    /// Directory the report file is written into
    #[arg(short, long, default_value = "tests")]
    pub output_dir: PathBuf,

    /// Write the report to standard output instead of a file
    #[arg(long, default_value_t = false)]
    pub stdout: bool,

    /// More logging (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Default `tracing` filter directive for the chosen verbosity.
    pub fn log_directive(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    Stdout,
    Directory(PathBuf),
}

/// Everything a run needs, after validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub input: PathBuf,
    pub tier: Tier,
    pub category: Category,
    pub plant: Option<u32>,
    pub output: Output,
}

impl RunConfig {
    pub fn filter(&self) -> RecordFilter {
        RecordFilter::new(self.tier, self.category).with_plant(self.plant)
    }
}

impl TryFrom<Args> for RunConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        check_combination(args.tier, args.category)?;
        Ok(Self {
            input: args.input,
            tier: args.tier,
            category: args.category,
            plant: args.plant.filter(|&p| p != 0),
            output: if args.stdout {
                Output::Stdout
            } else {
                Output::Directory(args.output_dir)
            },
        })
    }
}

/// High-voltage stations feed companies only; low-voltage posts serve every
/// category.
pub fn check_combination(tier: Tier, category: Category) -> Result<(), ConfigError> {
    match (tier, category) {
        (Tier::Hvb | Tier::Hva, Category::Indiv | Category::All) => {
            Err(ConfigError::UnsupportedCombination { tier, category })
        }
        _ => Ok(()),
    }
}
