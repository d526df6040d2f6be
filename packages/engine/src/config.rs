use std::path::PathBuf;

use thiserror::Error;

use wordcat_algo::{AlgoConfig, ConfigError};

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid algorithm config: {0}")]
    Algo(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Assessment,
    Practice,
}

impl RunMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "assessment" | "assess" | "quiz" => Some(RunMode::Assessment),
            "practice" => Some(RunMode::Practice),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub file_logs: bool,
    pub log_dir: PathBuf,
    pub store: StoreLocation,
    pub catalog_path: PathBuf,
    pub grade: u32,
    pub question_seconds: u64,
    pub session_size: Option<usize>,
    pub seed: Option<u64>,
    pub algo_config_path: Option<PathBuf>,
    pub mode: RunMode,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unparsable values fall back to
    /// their defaults.
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_level = get("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let file_logs = get("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let log_dir = get("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./logs"));

        let store = match get("WORDCAT_DB_PATH") {
            Some(path) if path.trim() == ":memory:" => StoreLocation::Memory,
            Some(path) if !path.trim().is_empty() => StoreLocation::File(PathBuf::from(path)),
            _ => StoreLocation::File(PathBuf::from("./wordcat.db")),
        };

        let catalog_path = get("WORDCAT_CATALOG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./words.json"));

        let grade = get("WORDCAT_GRADE")
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(1);

        let question_seconds = get("WORDCAT_QUESTION_SECONDS")
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|seconds| *seconds > 0)
            .unwrap_or(15);

        let session_size = get("WORDCAT_SESSION_SIZE")
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|size| *size > 0);

        let seed = get("WORDCAT_SEED").and_then(|value| value.parse::<u64>().ok());

        let algo_config_path = get("WORDCAT_ALGO_CONFIG")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let mode = get("WORDCAT_MODE")
            .and_then(|value| RunMode::parse(&value))
            .unwrap_or(RunMode::Assessment);

        Self {
            log_level,
            file_logs,
            log_dir,
            store,
            catalog_path,
            grade,
            question_seconds,
            session_size,
            seed,
            algo_config_path,
            mode,
        }
    }

    /// Built-in algorithm table, overlaid with `WORDCAT_ALGO_CONFIG` and the
    /// session size override, then validated.
    pub fn load_algo_config(&self) -> Result<AlgoConfig, ConfigLoadError> {
        let mut config = match &self.algo_config_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
                    path: path.clone(),
                    source,
                })?;
                AlgoConfig::from_json_str(&raw)?
            }
            None => AlgoConfig::default(),
        };

        if let Some(size) = self.session_size {
            config.selection.assessment_size = size;
        }
        config.validate()?;
        Ok(config)
    }
}
