// Configuration loading and parsing (draft.toml, model.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub draft: DraftParams,
    pub features: FeatureConfig,
    pub players: PlayersConfig,
    pub data_paths: DataPaths,
    pub db_path: String,
    pub refresh_interval_secs: u64,
    pub top_n: usize,
    pub model: ModelConfig,
}

// ---------------------------------------------------------------------------
// draft.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire draft.toml file.
#[derive(Debug, Clone, Deserialize)]
struct DraftFile {
    draft: DraftParams,
    #[serde(default)]
    features: FeatureConfig,
    #[serde(default)]
    players: PlayersConfig,
    data: DataPaths,
    database: DatabaseSection,
    refresh: RefreshSection,
    #[serde(default)]
    display: DisplaySection,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RefreshSection {
    interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct DisplaySection {
    top_n: usize,
}

impl Default for DisplaySection {
    fn default() -> Self {
        DisplaySection { top_n: 25 }
    }
}

/// Where a draft currently is in its lifecycle on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    /// Entries are still joining; the pick order is not final.
    Filling,
    Drafting,
    Complete,
}

/// Identifies one draft and the participant the assistant works for.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DraftParams {
    pub draft_id: String,
    /// The entry whose next turn defines every pick window.
    pub observer_entry_id: String,
    pub rounds: u32,
    pub status: DraftStatus,
    #[serde(default)]
    pub slate_id: Option<String>,
    #[serde(default)]
    pub scoring_type_id: Option<String>,
}

/// What to do with rows whose pick has no downstream observer pick to
/// compare against (everything after the observer's final turn).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingWindowPolicy {
    /// Leave those rows out of the feature matrix.
    Drop,
    /// Keep them, with window features marked unknown.
    Propagate,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeatureConfig {
    /// Highest round with its own indicator column. Later rounds share it.
    pub max_round: u32,
    /// Width of the coarse round buckets.
    pub round_bucket_size: u32,
    pub missing_window: MissingWindowPolicy,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            max_round: 17,
            round_bucket_size: 3,
            missing_window: MissingWindowPolicy::Drop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayersConfig {
    /// ADP assigned to players the platform has not ranked.
    pub missing_adp: f64,
}

impl Default for PlayersConfig {
    fn default() -> Self {
        PlayersConfig { missing_adp: 216.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub players: String,
    pub entries: String,
    pub selections: String,
}

// ---------------------------------------------------------------------------
// model.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct ModelFile {
    model: ModelConfig,
}

/// A fitted linear model: metadata plus one coefficient per feature column.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub data_number: String,
    pub model_number: String,
    #[serde(default)]
    pub description: String,
    pub features: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/draft.toml` and
/// `config/model.toml` relative to the given `base_dir`.
///
/// This does not auto-copy defaults. Prefer `load_config()` which handles
/// default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let draft_path = config_dir.join("draft.toml");
    let draft_text = read_file(&draft_path)?;
    let draft_file: DraftFile =
        toml::from_str(&draft_text).map_err(|e| ConfigError::ParseError {
            path: draft_path.clone(),
            source: e,
        })?;

    let model_path = config_dir.join("model.toml");
    let model_text = read_file(&model_path)?;
    let model_file: ModelFile =
        toml::from_str(&model_text).map_err(|e| ConfigError::ParseError {
            path: model_path.clone(),
            source: e,
        })?;

    let config = Config {
        draft: draft_file.draft,
        features: draft_file.features,
        players: draft_file.players,
        data_paths: draft_file.data,
        db_path: draft_file.database.path,
        refresh_interval_secs: draft_file.refresh.interval_secs,
        top_n: draft_file.display.top_n,
        model: model_file.model,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Existing files are never
/// overwritten.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| !n.ends_with(".toml")) {
            continue;
        }

        let target = config_dir.join(file_name);
        if target.exists() {
            continue;
        }
        std::fs::copy(&path, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {} to {}: {e}", path.display(), target.display()),
        })?;
        copied.push(target);
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.draft.rounds == 0 {
        return Err(invalid("draft.rounds", "must be greater than 0"));
    }
    if config.draft.draft_id.trim().is_empty() {
        return Err(invalid("draft.draft_id", "must not be empty"));
    }
    if config.draft.observer_entry_id.trim().is_empty() {
        return Err(invalid("draft.observer_entry_id", "must not be empty"));
    }

    if config.features.max_round == 0 {
        return Err(invalid("features.max_round", "must be greater than 0"));
    }
    if config.features.round_bucket_size == 0 {
        return Err(invalid("features.round_bucket_size", "must be greater than 0"));
    }

    if !config.players.missing_adp.is_finite() || config.players.missing_adp <= 0.0 {
        return Err(invalid(
            "players.missing_adp",
            format!("must be a positive number, got {}", config.players.missing_adp),
        ));
    }

    if config.refresh_interval_secs == 0 {
        return Err(invalid("refresh.interval_secs", "must be greater than 0"));
    }

    let model = &config.model;
    if model.features.is_empty() {
        return Err(invalid("model.features", "must name at least one column"));
    }
    if model.features.len() != model.coefficients.len() {
        return Err(invalid(
            "model.coefficients",
            format!(
                "expected {} coefficients (one per feature), got {}",
                model.features.len(),
                model.coefficients.len()
            ),
        ));
    }
    if let Some(pos) = model.coefficients.iter().position(|c| !c.is_finite()) {
        return Err(invalid(
            "model.coefficients",
            format!("coefficient for `{}` is not finite", model.features[pos]),
        ));
    }
    if !model.intercept.is_finite() {
        return Err(invalid("model.intercept", "must be finite"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
