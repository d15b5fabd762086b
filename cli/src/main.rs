use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{command_show, command_strings};

mod commands;

#[derive(Parser)]
#[command(version, about, arg_required_else_help(true))]
struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,
}

#[derive(clap::Args)]
struct Limits {
    #[arg(long, value_name = "BYTES", help = "Reject files bigger than this")]
    max_size: Option<u64>,

    #[arg(
        long,
        value_name = "UNITS",
        help = "Omit strings declaring more UTF-16 code units than this"
    )]
    max_string_len: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show hashes, urls, shell commands and matched signatures of dex files
    Show {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(long, default_value_t = false, help = "Print results as json")]
        json: bool,

        #[arg(short, long, value_name = "FILE", help = "Json catalog of custom signatures")]
        signatures: Option<PathBuf>,

        #[arg(short = 'j', long, default_value_t = 1, help = "Number of files parsed in parallel")]
        jobs: usize,

        #[command(flatten)]
        limits: Limits,
    },
    /// Print decoded string pool, one string per line
    Strings {
        #[arg(required = true)]
        path: PathBuf,

        #[command(flatten)]
        limits: Limits,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match &cli.commands {
        Some(Commands::Show {
            paths,
            json,
            signatures,
            jobs,
            limits,
        }) => command_show(paths, *json, signatures.as_deref(), *jobs, &limits.into()),
        Some(Commands::Strings { path, limits }) => command_strings(path, &limits.into()),
        None => Ok(()),
    };

    if let Err(err) = result {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

impl From<&Limits> for dex_intel::DexOptions {
    fn from(limits: &Limits) -> Self {
        let mut options = dex_intel::DexOptions::default();
        if let Some(size) = limits.max_size {
            options = options.with_max_file_size(size);
        }
        if let Some(units) = limits.max_string_len {
            options = options.with_max_string_code_units(units);
        }
        options
    }
}
