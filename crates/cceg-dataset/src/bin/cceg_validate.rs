//! Dataset validator CLI.
//!
//! Checks every layer file in a dataset directory against its layer schema
//! and prints a report per file. Exits non-zero when a file is missing or
//! holds an invalid record.

use std::io::{self, BufReader, Write};
use std::process::ExitCode;

use camino::Utf8PathBuf;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use cceg_dataset::{FileReport, Layer, LayerSchema, validate_jsonl};
use clap::Parser;
use thiserror::Error;

/// Validate a generated compliance dataset.
#[derive(Debug, Parser)]
#[command(name = "cceg-validate", version)]
struct Cli {
    /// Directory holding the layer files.
    #[arg(long, default_value = "dataset")]
    dataset_dir: Utf8PathBuf,
    /// Most failing records to list per file.
    #[arg(long, default_value_t = 10)]
    max_reported: usize,
}

#[derive(Debug, Error)]
enum ValidateError {
    #[error("cannot open dataset directory '{path}': {source}")]
    OpenDir { path: Utf8PathBuf, source: io::Error },
    #[error("failed to read '{file}': {source}")]
    Read { file: &'static str, source: io::Error },
    #[error("failed to write report: {0}")]
    Output(#[from] io::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            if let Err(write_err) = writeln!(io::stderr().lock(), "{err}") {
                drop(write_err);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<bool, ValidateError> {
    let dir = Dir::open_ambient_dir(&cli.dataset_dir, ambient_authority()).map_err(|source| {
        ValidateError::OpenDir {
            path: cli.dataset_dir.clone(),
            source,
        }
    })?;
    let mut out = io::stdout().lock();
    let mut all_valid = true;

    for layer in Layer::ALL {
        let file_name = layer.file_name();
        writeln!(out, "validating {file_name}")?;
        match check_layer(&dir, layer)? {
            Some(report) => {
                write!(out, "{}", report.render(cli.max_reported))?;
                all_valid &= report.is_valid();
            }
            None => {
                writeln!(out, "file not found")?;
                all_valid = false;
            }
        }
        writeln!(out)?;
    }

    if all_valid {
        writeln!(out, "all files valid")?;
    } else {
        writeln!(out, "validation failed")?;
    }
    Ok(all_valid)
}

fn check_layer(dir: &Dir, layer: Layer) -> Result<Option<FileReport>, ValidateError> {
    let file_name = layer.file_name();
    let read_error = |source| ValidateError::Read {
        file: file_name,
        source,
    };
    let file = match dir.open(file_name) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(read_error(err)),
    };
    validate_jsonl(BufReader::new(file), &LayerSchema::for_layer(layer))
        .map(Some)
        .map_err(read_error)
}
