use color_eyre::eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::PathBuf,
    sync::{OnceLock, RwLock},
};

/// Globally accessible application configuration values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Rough question count a generated level assessment aims for.
    #[serde(default = "default_assessment_target_value")]
    pub assessment_target: usize,
    /// Below this many questions the assessment is padded from the mixed pool.
    #[serde(default = "default_assessment_min_value")]
    pub assessment_min: usize,
    /// Default size of a mixed practice test.
    #[serde(default = "default_mixed_test_size_value")]
    pub mixed_test_size: usize,
    /// Session snapshot cadence, in timer ticks.
    #[serde(default = "default_snapshot_interval_value")]
    pub snapshot_interval_secs: u64,
    /// How many questions one AI generation request asks for.
    #[serde(default = "default_generation_batch_size_value")]
    pub generation_batch_size: usize,
    /// How long a cached AI generation stays usable.
    #[serde(default = "default_generation_ttl_value")]
    pub generation_ttl_minutes: i64,
    /// Field partition used when the caller has no field of their own.
    #[serde(default = "default_field_value")]
    pub default_field: String,
    #[serde(default = "default_openai_model_value")]
    pub openai_model: String,
    #[serde(default)]
    pub openai_api_key: String,
}

impl AppConfig {
    fn normalize(&mut self) {
        if self.assessment_target == 0 {
            self.assessment_target = DEFAULT_ASSESSMENT_TARGET;
        }
        if self.assessment_min == 0 {
            self.assessment_min = DEFAULT_ASSESSMENT_MIN;
        }
        if self.mixed_test_size == 0 {
            self.mixed_test_size = DEFAULT_MIXED_TEST_SIZE;
        }
        if self.generation_batch_size == 0 {
            self.generation_batch_size = DEFAULT_GENERATION_BATCH_SIZE;
        }
        if self.default_field.trim().is_empty() {
            self.default_field = DEFAULT_FIELD.to_string();
        }
    }

    pub fn system_prompt(&self) -> String {
        SYSTEM_PROMPT_TEMPLATE.replace("{BATCH_SIZE}", &self.generation_batch_size.to_string())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            assessment_target: DEFAULT_ASSESSMENT_TARGET,
            assessment_min: DEFAULT_ASSESSMENT_MIN,
            mixed_test_size: DEFAULT_MIXED_TEST_SIZE,
            snapshot_interval_secs: DEFAULT_SNAPSHOT_INTERVAL,
            generation_batch_size: DEFAULT_GENERATION_BATCH_SIZE,
            generation_ttl_minutes: DEFAULT_GENERATION_TTL_MINUTES,
            default_field: DEFAULT_FIELD.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openai_api_key: String::new(),
        }
    }
}

const DEFAULT_ASSESSMENT_TARGET: usize = 20;
const DEFAULT_ASSESSMENT_MIN: usize = 10;
const DEFAULT_MIXED_TEST_SIZE: usize = 12;
const DEFAULT_SNAPSHOT_INTERVAL: u64 = 10;
const DEFAULT_GENERATION_BATCH_SIZE: usize = 10;
const DEFAULT_GENERATION_TTL_MINUTES: i64 = 1440;
const DEFAULT_FIELD: &str = "genel";
const DEFAULT_OPENAI_MODEL: &str = "gpt-5-mini";

const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are a precise question author for a university-entrance study app.
You will produce multiple-choice practice questions for the requested subject.
Each question has between two and five choices, exactly one of which is correct,
and a short explanation a student can learn from.
Write the questions in the language the subject name is given in.
You should return a minimum of {BATCH_SIZE} questions.
Return JSON that strictly matches the provided schema."#;

const CONFIG_FILE_PATH: &str = "config/studyprep.toml";

static APP_CONFIG: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn config_lock() -> &'static RwLock<AppConfig> {
    APP_CONFIG.get_or_init(|| RwLock::new(AppConfig::default()))
}

/// Attempt to load configuration from disk. If loading fails, the in-memory
/// config will be reset to defaults and the error will be returned for the
/// caller to surface if desired.
pub fn initialize() -> Result<()> {
    match load_config_from_disk() {
        Ok(config) => {
            let lock = config_lock();
            *lock.write().expect("config lock poisoned") = config;
            Ok(())
        }
        Err(err) => {
            let lock = config_lock();
            *lock.write().expect("config lock poisoned") = AppConfig::default();
            Err(err)
        }
    }
}

/// Retrieve a clone of the current configuration.
pub fn current() -> AppConfig {
    config_lock().read().expect("config lock poisoned").clone()
}

/// Convenience accessor for the configured system prompt.
pub fn system_prompt() -> String {
    config_lock()
        .read()
        .expect("config lock poisoned")
        .system_prompt()
}

/// Apply the provided mutation to the in-memory configuration and persist the
/// result to disk.
pub fn update<F>(mutator: F) -> Result<AppConfig>
where
    F: FnOnce(&mut AppConfig),
{
    let lock = config_lock();
    let mut config = lock.write().expect("config lock poisoned");
    mutator(&mut config);
    config.normalize();
    save_config_to_disk(&config)?;
    Ok(config.clone())
}

/// Absolute path to the configuration file used for persistence.
pub fn config_file_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_PATH)
}

fn load_config_from_disk() -> Result<AppConfig> {
    let path = config_file_path();
    match fs::read_to_string(&path) {
        Ok(contents) => {
            let mut config: AppConfig = toml::from_str(&contents)
                .wrap_err_with(|| format!("failed to parse configuration at {}", path.display()))?;
            config.normalize();
            Ok(config)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(err) => Err(eyre!(format!(
            "failed to read configuration at {}: {}",
            path.display(),
            err
        ))),
    }
}

fn save_config_to_disk(config: &AppConfig) -> Result<()> {
    let path = config_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).wrap_err_with(|| {
            format!(
                "failed to create configuration directory {}",
                parent.display()
            )
        })?;
    }
    let serialized =
        toml::to_string_pretty(config).wrap_err("failed to serialize configuration to TOML")?;
    fs::write(&path, serialized)
        .wrap_err_with(|| format!("failed to write configuration to {}", path.display()))
}

const fn default_assessment_target_value() -> usize {
    DEFAULT_ASSESSMENT_TARGET
}

const fn default_assessment_min_value() -> usize {
    DEFAULT_ASSESSMENT_MIN
}

const fn default_mixed_test_size_value() -> usize {
    DEFAULT_MIXED_TEST_SIZE
}

const fn default_snapshot_interval_value() -> u64 {
    DEFAULT_SNAPSHOT_INTERVAL
}

const fn default_generation_batch_size_value() -> usize {
    DEFAULT_GENERATION_BATCH_SIZE
}

const fn default_generation_ttl_value() -> i64 {
    DEFAULT_GENERATION_TTL_MINUTES
}

fn default_field_value() -> String {
    DEFAULT_FIELD.to_string()
}

fn default_openai_model_value() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}
