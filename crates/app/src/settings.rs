use log::LevelFilter;
use overload_domain::SortOrder;
use serde::{Deserialize, Serialize};

pub const API_KEY_VARIABLE: &str = "OVERLOAD_API_KEY";

#[allow(async_fn_in_trait)]
pub trait SettingsService {
    async fn get_settings(&self) -> Result<Settings, String>;
    async fn set_settings(&self, settings: Settings) -> Result<(), String>;
}

#[allow(async_fn_in_trait)]
pub trait SettingsRepository {
    async fn read_settings(&self) -> Result<Settings, String>;
    async fn write_settings(&self, settings: Settings) -> Result<(), String>;
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub backend: Backend,
    pub collections: Collections,
    pub log_level: LevelFilter,
    pub log_capacity: usize,
    #[serde(with = "SortOrderDef")]
    pub sort_order: SortOrder,
}

impl Settings {
    /// Parse settings from JSON. Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a valid settings object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let settings = serde_json::from_str::<Settings>(json)?;
        Ok(settings.with_api_key(std::env::var(API_KEY_VARIABLE).ok()))
    }

    /// Override the API key if one is given.
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        if let Some(api_key) = api_key.filter(|key| !key.trim().is_empty()) {
            self.backend.api_key = api_key;
        }
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            collections: Collections::default(),
            log_level: LevelFilter::Info,
            log_capacity: 100,
            sort_order: SortOrder::Ascending,
        }
    }
}

/// Connection parameters of the hosted backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Backend {
    pub project_id: String,
    pub auth_domain: String,
    pub storage_bucket: String,
    pub api_key: String,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            project_id: "overload".to_string(),
            auth_domain: "overload.localhost".to_string(),
            storage_bucket: "overload.localhost".to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Collections {
    pub progress: String,
    pub exercises: String,
    pub training_plans: String,
    pub users: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            progress: "progress".to_string(),
            exercises: "exercises".to_string(),
            training_plans: "workouts".to_string(),
            users: "users".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(remote = "SortOrder")]
enum SortOrderDef {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}
