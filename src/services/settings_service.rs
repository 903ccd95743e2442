use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::settings::{AiSettings, UserPreferences};
use crate::services::schedule_utils::parse_clock_time;

pub const ENV_API_KEY: &str = "DAYBOOK_AI_API_KEY";
pub const ENV_BASE_URL: &str = "DAYBOOK_AI_BASE_URL";
pub const ENV_MODEL: &str = "DAYBOOK_AI_MODEL";
pub const ENV_TIMEOUT_SECS: &str = "DAYBOOK_AI_TIMEOUT_SECS";

const PREFERENCES_KEY: &str = "preferences";

/// Everything read from `daybook.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub ai: AiSettings,
    pub preferences: UserPreferences,
}

/// Defaults, then the optional YAML file, then `DAYBOOK_AI_*` variables.
pub fn load_settings<F>(path: Option<&Path>, env: F) -> AppResult<AppSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = match path {
        Some(path) if path.exists() => {
            let raw = fs::read_to_string(path)?;
            if raw.trim().is_empty() {
                AppSettings::default()
            } else {
                serde_yaml::from_str(&raw).map_err(|err| {
                    AppError::config(format!("配置文件解析失败 {}: {err}", path.display()))
                })?
            }
        }
        Some(path) => {
            debug!(target: "app::config", path = %path.display(), "no settings file, using defaults");
            AppSettings::default()
        }
        None => AppSettings::default(),
    };

    apply_env_overrides(&mut settings.ai, env)?;
    settings.ai.api_key = normalize_key(settings.ai.api_key.take());
    validate_preferences(&settings.preferences)?;

    Ok(settings)
}

pub fn apply_env_overrides<F>(ai: &mut AiSettings, env: F) -> AppResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = env(ENV_API_KEY) {
        ai.api_key = Some(key);
    }
    if let Some(base_url) = env(ENV_BASE_URL).filter(|value| !value.trim().is_empty()) {
        ai.base_url = base_url.trim().to_string();
    }
    if let Some(model) = env(ENV_MODEL).filter(|value| !value.trim().is_empty()) {
        ai.model = model.trim().to_string();
    }
    if let Some(raw) = env(ENV_TIMEOUT_SECS) {
        ai.request_timeout_secs = raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| AppError::config(format!("{ENV_TIMEOUT_SECS} 必须是正整数")))?;
    }
    Ok(())
}

pub fn validate_preferences(preferences: &UserPreferences) -> AppResult<()> {
    for (field, value) in [
        ("wake_time", &preferences.wake_time),
        ("sleep_time", &preferences.sleep_time),
    ] {
        if parse_clock_time(value).is_none() {
            return Err(AppError::validation_with_details(
                "时间格式应为 HH:mm",
                json!({ "field": field, "value": value }),
            ));
        }
    }

    if preferences.focus_duration == 0 {
        return Err(AppError::validation_with_details(
            "专注时长必须大于 0",
            json!({ "field": "focus_duration" }),
        ));
    }

    Ok(())
}

fn normalize_key(key: Option<String>) -> Option<String> {
    key.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Cached access to the settings file.
pub struct SettingsService {
    path: Option<PathBuf>,
    cache: RwLock<Option<AppSettings>>,
}

impl SettingsService {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            cache: RwLock::new(None),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self) -> AppResult<AppSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.as_ref() {
                return Ok(settings.clone());
            }
        }

        let settings = load_settings(self.path.as_deref(), |key| std::env::var(key).ok())?;
        info!(
            target: "app::config",
            base_url = %settings.ai.base_url,
            model = %settings.ai.model,
            has_api_key = settings.ai.has_api_key(),
            "settings loaded"
        );

        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(settings.clone());
        }
        Ok(settings)
    }

    pub fn ai_settings(&self) -> AppResult<AiSettings> {
        Ok(self.get()?.ai)
    }

    pub fn preferences(&self) -> AppResult<UserPreferences> {
        Ok(self.get()?.preferences)
    }

    /// Validate and store new preferences. Other keys in the file, including
    /// the API key, are left as they are.
    pub fn update_preferences(&self, preferences: UserPreferences) -> AppResult<UserPreferences> {
        validate_preferences(&preferences)?;
        let mut current = self.get()?;

        if let Some(path) = self.path.as_deref() {
            write_preferences(path, &preferences)?;
        }

        current.preferences = preferences.clone();
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(current);
        }
        Ok(preferences)
    }

    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.cache.write() {
            *guard = None;
        }
    }
}

fn write_preferences(path: &Path, preferences: &UserPreferences) -> AppResult<()> {
    let mut document = if path.exists() {
        let raw = fs::read_to_string(path)?;
        serde_yaml::from_str::<serde_yaml::Value>(&raw)
            .map_err(|err| AppError::config(format!("配置文件解析失败: {err}")))?
    } else {
        serde_yaml::Value::Mapping(serde_yaml::Mapping::new())
    };

    if !document.is_mapping() {
        document = serde_yaml::Value::Mapping(serde_yaml::Mapping::new());
    }
    let mapping = document
        .as_mapping_mut()
        .ok_or_else(|| AppError::other("无法创建配置文件内容"))?;

    let value = serde_yaml::to_value(preferences)
        .map_err(|err| AppError::config(format!("偏好设置序列化失败: {err}")))?;
    mapping.insert(serde_yaml::Value::from(PREFERENCES_KEY), value);

    let output = serde_yaml::to_string(&document)
        .map_err(|err| AppError::config(format!("配置文件序列化失败: {err}")))?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, output)?;
    Ok(())
}
