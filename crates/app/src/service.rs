use std::collections::VecDeque;

use overload_domain::{TrainingPlan, search_training_plans};

use crate::{Settings, SettingsRepository, SettingsService, log};

/// Application services on top of the log and settings storage.
pub struct Service<R> {
    repository: R,
}

impl<R> Service<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }
}

impl<R: log::Repository> log::Service for Service<R> {
    fn get_log_entries(&self) -> Result<VecDeque<log::Entry>, log::Error> {
        self.repository.read_entries()
    }

    fn add_log_entry(&self, entry: log::Entry) -> Result<(), log::Error> {
        self.repository.write_entry(entry)
    }
}

impl<R: SettingsRepository> SettingsService for Service<R> {
    async fn get_settings(&self) -> Result<Settings, String> {
        self.repository.read_settings().await
    }

    async fn set_settings(&self, settings: Settings) -> Result<(), String> {
        self.repository.write_settings(settings).await
    }
}

impl<R: SettingsRepository> Service<R> {
    /// Plans whose name contains `search`, in the configured sort order.
    pub async fn search_training_plans(
        &self,
        plans: &[TrainingPlan],
        search: &str,
    ) -> Result<Vec<TrainingPlan>, String> {
        let settings = self.get_settings().await?;
        Ok(search_training_plans(plans, search, settings.sort_order))
    }
}
