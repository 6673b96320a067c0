//! Command-line surface for the `qbank` binary.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, error::ErrorKind};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::debug;

use crate::bank::load_bank;
use crate::emit::EmitSinks;
use crate::errors::QbankError;
use crate::index::SeenIndex;
use crate::metrics::draw_profile;
use crate::sampler::{SampleRequest, Sampler, check_capacity, reference_overlap};

#[derive(Debug, Parser)]
#[command(
    name = "qbank",
    disable_help_subcommand = true,
    about = "Sample unique random questions from a question bank",
    long_about = "Sample a fixed number of unique questions at random from a `<q ... q>` \
                  record file, optionally bounding overlap against a previously recorded \
                  skip log and appending fresh emissions to it.",
    after_help = "Sampling is seeded once per process and is deliberately not reproducible \
                  across runs."
)]
struct Cli {
    #[arg(
        short = 'f',
        long = "count",
        value_name = "N",
        value_parser = parse_positive_usize,
        required_unless_present = "bank_size",
        conflicts_with = "bank_size",
        help = "Number of questions to emit"
    )]
    count: Option<usize>,
    #[arg(
        long = "bank-size",
        help = "Print the number of questions in the bank and exit"
    )]
    bank_size: bool,
    #[arg(
        short = 'n',
        long = "skip-new",
        value_name = "PATH",
        conflicts_with = "skip_old",
        help = "Write every emission to a fresh skip log at PATH"
    )]
    skip_new: Option<PathBuf>,
    #[arg(
        short = 'o',
        long = "skip-old",
        value_name = "PATH",
        help = "Existing skip log whose questions should not be re-emitted"
    )]
    skip_old: Option<PathBuf>,
    #[arg(
        short = 'l',
        long = "duplicate-limit",
        value_name = "N",
        default_value_t = 0,
        requires = "skip_old",
        help = "Tolerate up to N emissions already present in the old skip log"
    )]
    duplicate_limit: usize,
    #[arg(
        short = 'u',
        long = "update",
        requires = "skip_old",
        help = "Append fresh emissions to the old skip log"
    )]
    update: bool,
    #[arg(value_name = "BANK", help = "Question bank in `<q ... q>` record format")]
    bank: PathBuf,
}

/// Run the full command-line flow, printing questions to stdout.
pub fn run<I>(args: I) -> Result<(), QbankError>
where
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    let stdout = io::stdout();
    run_with_output(args, &mut stdout.lock())
}

/// [`run`] with the pretty destination supplied by the caller.
pub fn run_with_output<I>(args: I, pretty: &mut dyn Write) -> Result<(), QbankError>
where
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    let Some(cli) = parse_cli(args)? else {
        return Ok(());
    };

    let questions = load_bank(&cli.bank)?;

    if cli.bank_size {
        writeln!(pretty, "{}", questions.len())?;
        return Ok(());
    }
    let Some(count) = cli.count else {
        return Err(QbankError::Configuration(
            "either --count or --bank-size is required".into(),
        ));
    };

    let request = SampleRequest {
        count,
        duplicate_limit: cli.duplicate_limit,
        update_mode: cli.update,
    };
    let mut sampler = Sampler::new(SmallRng::seed_from_u64(u64::from(process::id())));

    if let Some(skip_old) = &cli.skip_old {
        let reference = load_bank(skip_old)?;
        let mut index = SeenIndex::new();
        for question in &reference {
            index.mark_seen(question);
        }
        let overlap = reference_overlap(&questions, &index);
        debug!(
            reference = reference.len(),
            distinct = index.len(),
            overlap,
            "loaded old skip log"
        );
        check_capacity(questions.len(), overlap, cli.duplicate_limit, count)?;

        let mut append_log = if cli.update {
            Some(OpenOptions::new().append(true).open(skip_old)?)
        } else {
            None
        };
        let stats = {
            let log = append_log.as_mut().map(|file| file as &mut dyn Write);
            let mut sinks = EmitSinks::new(Some(pretty), log);
            sampler.run(&questions, &request, Some(&mut index), &mut sinks)?
        };
        if let Some(log) = append_log.as_mut() {
            log.flush()?;
        }
        if let Some(profile) = draw_profile(&stats) {
            debug!(
                draws_per_emission = profile.draws_per_emission,
                duplicate_ratio = profile.duplicate_ratio,
                rejection_ratio = profile.rejection_ratio,
                "sampling finished"
            );
        }
        return Ok(());
    }

    let mut new_log = match &cli.skip_new {
        Some(path) => Some(File::create(path)?),
        None => None,
    };
    let stats = {
        let log = new_log.as_mut().map(|file| file as &mut dyn Write);
        let mut sinks = EmitSinks::new(Some(pretty), log);
        sampler.run(&questions, &request, None, &mut sinks)?
    };
    if let Some(log) = new_log.as_mut() {
        log.flush()?;
    }
    if let Some(profile) = draw_profile(&stats) {
        debug!(
            draws_per_emission = profile.draws_per_emission,
            "sampling finished"
        );
    }
    Ok(())
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse --count value '{raw}' as a positive integer"))?;
    if parsed == 0 {
        return Err("--count must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_cli<I>(args: I) -> Result<Option<Cli>, QbankError>
where
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print().map_err(QbankError::Io)?;
                Ok(None)
            }
            _ => Err(QbankError::Configuration(err.to_string())),
        },
    }
}
