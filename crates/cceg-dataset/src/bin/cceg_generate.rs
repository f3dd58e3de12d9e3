//! Dataset generator CLI.
//!
//! Settings are layered from CLI flags, `CCEG_*` environment variables and
//! defaults (see `GeneratorSettings`). The dataset is written into the
//! configured output directory and a per-layer summary goes to stdout.

use std::io::{self, Write};
use std::process::ExitCode;

use cceg_dataset::{
    ConfigurationError, Dataset, DatasetGenerator, GenerationError, GeneratorSettings,
    SCHEMA_FILE_NAME, open_output_dir,
};
use ortho_config::OrthoConfig;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> ExitCode {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "dataset generation failed");
            if let Err(write_err) = writeln!(io::stderr().lock(), "{err}") {
                drop(write_err);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), GenerationError> {
    let settings = GeneratorSettings::load_from_iter(std::env::args_os()).map_err(|err| {
        ConfigurationError::Settings {
            message: err.to_string(),
        }
    })?;
    let request = settings.request()?;
    let output_dir = settings.output_dir()?;
    let generator = DatasetGenerator::new(settings.options()?)?;

    let dataset = generator.generate(&request)?;
    let dir = open_output_dir(&output_dir)?;
    dataset.write_to_dir(&dir)?;

    write_summary(&dataset, output_dir.as_str());
    Ok(())
}

fn write_summary(dataset: &Dataset, output_dir: &str) {
    let mut out = io::stdout().lock();
    let mut total = 0_usize;
    for output in dataset.layers() {
        total = total.saturating_add(output.record_count);
        let line = if output.rejected.is_empty() {
            format!(
                "{}: {} records -> {}/{}",
                output.layer,
                output.record_count,
                output_dir,
                output.layer.file_name()
            )
        } else {
            format!(
                "{}: {} records ({} dropped) -> {}/{}",
                output.layer,
                output.record_count,
                output.rejected.len(),
                output_dir,
                output.layer.file_name()
            )
        };
        if let Err(err) = writeln!(out, "{line}") {
            drop(err);
            return;
        }
    }
    if let Err(err) = writeln!(
        out,
        "total records: {total}\nschema: {output_dir}/{SCHEMA_FILE_NAME}"
    ) {
        drop(err);
    }
}
