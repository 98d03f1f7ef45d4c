//! On-disk model artifacts
//!
//! An artifact is a directory `<name>/` holding the serialized model
//! (`<name>.json`) and the feature table it was trained from
//! (`features.csv`). Saving stages both files in a temporary directory next to
//! the destination and renames it into place, so readers never observe a
//! half-written artifact. The model records a fingerprint of the feature file
//! so a reader can detect a model and feature table from different saves.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{ForecastError, Result};
use crate::timeseries::{TimeSeriesTable, MONTH_COLUMN};
use crate::training::TrainedModel;
use crate::utils::{load_table, save_table, table_from_csv_bytes};

/// Extension of the serialized model file
pub const MODEL_EXTENSION: &str = "json";
/// File name of the stored feature table
pub const FEATURES_FILE: &str = "features.csv";

/// A saved model directory
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    name: String,
    dir: PathBuf,
    model_path: PathBuf,
    features_path: PathBuf,
}

fn model_file_name(name: &str) -> String {
    format!("{}.{}", name, MODEL_EXTENSION)
}

/// Fingerprint of a stored feature file's content
pub fn features_fingerprint(content: &[u8]) -> u64 {
    xxh3_64(content)
}

fn check_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.trim() != name;
    if invalid {
        return Err(ForecastError::InvalidConfiguration(format!(
            "invalid artifact name {:?}",
            name
        )));
    }
    Ok(())
}

/// Rename `staged` to `target`, parking an existing `target` at `previous`
/// first. Returns whether an artifact was replaced.
///
/// If the final rename fails, the parked artifact is moved back. When that
/// also fails it stays at `previous` and the error reports both failures.
fn swap_into_place(staged: &Path, target: &Path, previous: &Path) -> Result<bool> {
    let replaced = target.exists();
    if replaced {
        std::fs::rename(target, previous)?;
    }

    let Err(e) = std::fs::rename(staged, target) else {
        return Ok(replaced);
    };
    if replaced {
        if let Err(restore) = std::fs::rename(previous, target) {
            return Err(ForecastError::Io(swap_error(target, previous, &e, &restore)));
        }
    }
    Err(e.into())
}

fn swap_error(target: &Path, previous: &Path, swap: &std::io::Error, restore: &std::io::Error) -> std::io::Error {
    std::io::Error::new(
        swap.kind(),
        format!(
            "moving new artifact into {} failed: {}; restoring the previous artifact also failed: {}; it remains at {}",
            target.display(),
            swap,
            restore,
            previous.display()
        ),
    )
}

impl ModelArtifact {
    /// Write `trained` and `features` as artifact `name` under `dir`,
    /// replacing any artifact of the same name. Returns the artifact path.
    pub fn save<M: Serialize>(
        trained: &TrainedModel<M>,
        features: &TimeSeriesTable,
        dir: impl AsRef<Path>,
        name: &str,
    ) -> Result<PathBuf> {
        check_name(name)?;
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let staging = tempfile::Builder::new()
            .prefix(&format!(".{}-staging-", name))
            .tempdir_in(dir)?;

        let features_path = staging.path().join(FEATURES_FILE);
        save_table(features, &features_path)?;
        let fingerprint = features_fingerprint(&std::fs::read(&features_path)?);

        let mut stored = serde_json::to_value(trained)?;
        if let Some(fields) = stored.as_object_mut() {
            fields.insert("features_fingerprint".to_string(), fingerprint.into());
        }
        let json = serde_json::to_string_pretty(&stored)?;
        std::fs::write(staging.path().join(model_file_name(name)), json)?;

        let target = dir.join(name);
        // Holds the previous artifact until the swap succeeds; removed on drop.
        let retired = tempfile::Builder::new()
            .prefix(&format!(".{}-retired-", name))
            .tempdir_in(dir)?;
        let previous = retired.path().join(name);

        let staged = staging.keep();
        let replaced = match swap_into_place(&staged, &target, &previous) {
            Ok(replaced) => replaced,
            Err(e) => {
                let _ = std::fs::remove_dir_all(&staged);
                if previous.exists() {
                    // still parked, so it must outlive `retired`
                    let kept = retired.keep();
                    warn!(previous = %kept.display(), "previous artifact could not be restored");
                }
                return Err(e);
            }
        };
        drop(retired);

        let path = std::fs::canonicalize(&target)?;
        info!(
            artifact = %path.display(),
            features = trained.feature_names.len(),
            rows = trained.n_samples,
            replaced,
            "model artifact saved"
        );
        Ok(path)
    }

    /// Open the artifact directory at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let dir = path.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(ForecastError::FileNotFound(dir));
        }

        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ForecastError::InvalidConfiguration(format!(
                    "cannot derive artifact name from {}",
                    dir.display()
                ))
            })?;

        let model_path = dir.join(model_file_name(&name));
        let features_path = dir.join(FEATURES_FILE);
        for file in [&model_path, &features_path] {
            if !file.is_file() {
                return Err(ForecastError::FileNotFound(file.clone()));
            }
        }

        debug!(artifact = %dir.display(), "model artifact opened");
        Ok(Self {
            name,
            dir,
            model_path,
            features_path,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn features_path(&self) -> &Path {
        &self.features_path
    }

    /// Deserialize the stored model.
    pub fn load_model<M: DeserializeOwned>(&self) -> Result<TrainedModel<M>> {
        let json = std::fs::read_to_string(&self.model_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ForecastError::FileNotFound(self.model_path.clone()),
            _ => e.into(),
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load the model and feature table, checking that both come from the
    /// same save.
    ///
    /// Returns [`ForecastError::ArtifactChanged`] when the feature file does
    /// not match the fingerprint recorded in the model.
    pub fn load<M: DeserializeOwned>(&self) -> Result<(TrainedModel<M>, TimeSeriesTable)> {
        let model: TrainedModel<M> = self.load_model()?;
        let content = std::fs::read(&self.features_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ForecastError::FileNotFound(self.features_path.clone()),
            _ => e.into(),
        })?;

        if let Some(expected) = model.features_fingerprint {
            let actual = features_fingerprint(&content);
            if actual != expected {
                debug!(expected, actual, artifact = %self.dir.display(), "feature fingerprint mismatch");
                return Err(ForecastError::ArtifactChanged(self.dir.clone()));
            }
        }
        let features = table_from_csv_bytes(content, Some(MONTH_COLUMN))?;
        Ok((model, features))
    }

    /// Load the stored feature table, including its next-month row.
    pub fn load_features(&self) -> Result<TimeSeriesTable> {
        if !self.features_path.is_file() {
            return Err(ForecastError::FileNotFound(self.features_path.clone()));
        }
        load_table(&self.features_path, Some(MONTH_COLUMN))
    }
}
