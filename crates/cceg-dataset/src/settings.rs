//! Generator settings loaded via OrthoConfig.
//!
//! Values are layered from CLI flags, `CCEG_*` environment variables and
//! defaults. A request file, when configured, replaces the seed and count
//! settings entirely.

use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::dataset::{GenerationOptions, ValidationPolicy};
use crate::distribution::DistributionPolicy;
use crate::error::ConfigurationError;
use crate::request::{GenerationRequest, LayerCounts};

const DEFAULT_OUTPUT_DIR: &str = "dataset";

/// Configuration values for a generation run.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CCEG")]
pub struct GeneratorSettings {
    /// Global seed.
    #[ortho_config(default = 42)]
    pub seed: u64,
    /// Intent layer record count.
    #[ortho_config(default = 2000)]
    pub intent_count: usize,
    /// Execution layer record count.
    #[ortho_config(default = 5000)]
    pub execution_count: usize,
    /// Remediation layer record count.
    #[ortho_config(default = 3000)]
    pub remediation_count: usize,
    /// Directory the dataset is written into.
    pub output_dir: Option<PathBuf>,
    /// JSON generation request; overrides the seed and counts.
    pub request_path: Option<PathBuf>,
    /// `quota-exact` or `expectation-only`.
    pub distribution_policy: Option<String>,
    /// `abort` or `drop`.
    pub validation_policy: Option<String>,
}

impl GeneratorSettings {
    /// Return the configured per-layer counts.
    #[must_use]
    pub const fn counts(&self) -> LayerCounts {
        LayerCounts {
            intent: self.intent_count,
            execution: self.execution_count,
            remediation: self.remediation_count,
        }
    }

    /// Return the output directory as a UTF-8 path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NonUtf8Path`] for a non-UTF-8 path.
    pub fn output_dir(&self) -> Result<Utf8PathBuf, ConfigurationError> {
        self.output_dir
            .as_deref()
            .map_or_else(|| Ok(Utf8PathBuf::from(DEFAULT_OUTPUT_DIR)), utf8_path)
    }

    /// Parse the configured policies.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownDistributionPolicy`] or
    /// [`ConfigurationError::UnknownValidationPolicy`] for unrecognised
    /// names.
    pub fn options(&self) -> Result<GenerationOptions, ConfigurationError> {
        let distribution = self
            .distribution_policy
            .as_deref()
            .map_or_else(|| Ok(DistributionPolicy::default()), str::parse)?;
        let validation = self
            .validation_policy
            .as_deref()
            .map_or_else(|| Ok(ValidationPolicy::default()), str::parse)?;
        Ok(GenerationOptions {
            distribution,
            validation,
        })
    }

    /// Build the generation request from the request file or the flags.
    ///
    /// # Errors
    ///
    /// Returns any [`ConfigurationError`] raised while reading or validating
    /// the request.
    pub fn request(&self) -> Result<GenerationRequest, ConfigurationError> {
        match self.request_path.as_deref() {
            Some(path) => load_request_file(path),
            None => GenerationRequest::new(self.seed, self.counts()),
        }
    }
}

fn utf8_path(path: &Path) -> Result<Utf8PathBuf, ConfigurationError> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|original| ConfigurationError::NonUtf8Path { path: original })
}

fn load_request_file(path: &Path) -> Result<GenerationRequest, ConfigurationError> {
    let io_error = |message: String| ConfigurationError::IoError {
        path: path.to_path_buf(),
        message,
    };
    let utf8 = utf8_path(path)?;
    let file_name = utf8
        .file_name()
        .ok_or_else(|| io_error("request path has no file name".to_owned()))?;
    let parent = utf8
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|err| io_error(err.to_string()))?;
    GenerationRequest::from_file(&dir, Utf8Path::new(file_name))
}
