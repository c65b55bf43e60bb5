use anyhow::{Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub const DEFAULT_PING_PROGRAM: &str = "ping";
pub const DEFAULT_PING_COUNT: u32 = 2;
pub const DEFAULT_PING_TIMEOUT_SECS: u64 = 10;

const CONFIG_DIR_NAME: &str = "netops-sentinel";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub program: String,
    pub count: u32,
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PING_PROGRAM.to_string(),
            count: DEFAULT_PING_COUNT,
            timeout_secs: DEFAULT_PING_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFileConfig {
    gemini_model: Option<String>,
    gemini_base_url: Option<String>,
    probe: Option<RawProbeConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProbeConfig {
    program: Option<String>,
    count: Option<u32>,
    timeout_secs: Option<u64>,
}

/// The API credential lives only in the process environment (or a `.env`
/// file already merged into it), never in the config file.
pub fn api_key_from_env() -> Option<String> {
    env_non_empty(API_KEY_ENV)
}

impl AppConfig {
    #[cfg(test)]
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    pub fn load_with_path(explicit_path: Option<&Path>) -> Result<Self> {
        let config_path = match explicit_path {
            Some(path) => {
                if !path.is_file() {
                    bail!("Failed to load config {}: file not found", path.display());
                }
                path.to_path_buf()
            }
            None => discover_config_path()?,
        };
        let file_config = load_file_config(&config_path)?;

        let file_model = file_config
            .as_ref()
            .and_then(|cfg| cfg.gemini_model.as_deref())
            .and_then(non_empty)
            .map(ToOwned::to_owned);
        let file_base_url = file_config
            .as_ref()
            .and_then(|cfg| cfg.gemini_base_url.as_deref())
            .and_then(non_empty)
            .map(ToOwned::to_owned);
        let probe = validate_probe(
            file_config.as_ref().and_then(|cfg| cfg.probe.as_ref()),
            &config_path,
        )?;

        Ok(Self {
            gemini_model: env_non_empty("GEMINI_MODEL")
                .or(file_model)
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: env_non_empty("GEMINI_BASE_URL")
                .or(file_base_url)
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            probe,
        })
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let trimmed = xdg.trim();
        if trimmed.is_empty() {
            bail!("Failed to resolve config path: XDG_CONFIG_HOME is set but empty");
        }

        return Ok(PathBuf::from(trimmed)
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME));
    }

    let home = dirs::home_dir()
        .ok_or_else(|| anyhow!("Failed to resolve config path: HOME directory is unavailable"))?;

    Ok(home
        .join(".config")
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME))
}

fn load_file_config(config_path: &Path) -> Result<Option<RawFileConfig>> {
    if !config_path.is_file() {
        return Ok(None);
    }

    let config_text = fs::read_to_string(config_path).map_err(|err| {
        anyhow!(
            "Failed to load config {}: unable to read file: {err}",
            config_path.display()
        )
    })?;

    toml::from_str(&config_text)
        .map(Some)
        .map_err(|err| anyhow!("Failed to load config {}: {err}", config_path.display()))
}

fn validate_probe(raw: Option<&RawProbeConfig>, config_path: &Path) -> Result<ProbeConfig> {
    let mut probe = ProbeConfig::default();
    let Some(raw) = raw else {
        return Ok(probe);
    };

    if let Some(program) = &raw.program {
        probe.program = non_empty(program)
            .ok_or_else(|| config_error(config_path, "probe.program", "must not be empty"))?
            .to_string();
    }
    if let Some(count) = raw.count {
        if count == 0 {
            return Err(config_error(config_path, "probe.count", "must be at least 1"));
        }
        probe.count = count;
    }
    if let Some(timeout_secs) = raw.timeout_secs {
        if timeout_secs == 0 {
            return Err(config_error(
                config_path,
                "probe.timeout_secs",
                "must be at least 1",
            ));
        }
        probe.timeout_secs = timeout_secs;
    }

    Ok(probe)
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|value| non_empty(&value).map(ToOwned::to_owned))
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn config_error(config_path: &Path, key_path: &str, reason: &str) -> anyhow::Error {
    anyhow!(
        "Failed to load config {}: {key_path}: {reason}",
        config_path.display()
    )
}
