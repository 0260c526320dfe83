use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use derive_more::Deref;
use uuid::Uuid;

use crate::{
    CreateError, DeleteError, ExerciseID, Name, ReadError, UpdateError, UserID, ValidationError,
};

#[allow(async_fn_in_trait)]
pub trait TrainingPlanService {
    async fn get_training_plans(&self) -> Result<Vec<TrainingPlan>, ReadError>;
    async fn get_training_plan(&self, id: TrainingPlanID) -> Result<TrainingPlan, ReadError>;
    async fn create_training_plan(
        &self,
        creator: UserID,
        name: Name,
        description: String,
        exercises: Vec<PlanExercise>,
    ) -> Result<TrainingPlan, CreateError>;
    /// Only the creator may change a plan. Creator and creation time are kept.
    async fn replace_training_plan(
        &self,
        actor: UserID,
        plan: TrainingPlan,
    ) -> Result<TrainingPlan, UpdateError>;
    /// Only the creator may delete a plan. Favorites pointing to it are not touched.
    async fn delete_training_plan(
        &self,
        actor: UserID,
        id: TrainingPlanID,
    ) -> Result<TrainingPlanID, DeleteError>;

    fn validate_training_plan_name(&self, name: &str) -> Result<Name, ValidationError> {
        Name::parse("name", name)
    }

    fn validate_plan_exercises(
        &self,
        exercises: Vec<PlanExercise>,
    ) -> Result<Vec<PlanExercise>, ValidationError> {
        if exercises.is_empty() {
            return Err(ValidationError::Empty("exercises".to_string()));
        }
        Ok(exercises)
    }

    #[must_use]
    fn search_training_plans(
        &self,
        plans: &[TrainingPlan],
        search: &str,
        order: SortOrder,
    ) -> Vec<TrainingPlan> {
        search_training_plans(plans, search, order)
    }
}

#[allow(async_fn_in_trait)]
pub trait TrainingPlanRepository {
    async fn read_training_plans(&self) -> Result<Vec<TrainingPlan>, ReadError>;
    async fn read_training_plan(&self, id: TrainingPlanID) -> Result<TrainingPlan, ReadError>;
    async fn create_training_plan(
        &self,
        creator: UserID,
        name: Name,
        description: String,
        exercises: Vec<PlanExercise>,
    ) -> Result<TrainingPlan, CreateError>;
    async fn replace_training_plan(
        &self,
        plan: TrainingPlan,
    ) -> Result<TrainingPlan, UpdateError>;
    async fn delete_training_plan(
        &self,
        id: TrainingPlanID,
    ) -> Result<TrainingPlanID, DeleteError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingPlan {
    pub id: TrainingPlanID,
    pub name: Name,
    pub description: String,
    pub exercises: Vec<PlanExercise>,
    pub created_at: DateTime<Utc>,
    pub creator: UserID,
}

impl TrainingPlan {
    #[must_use]
    pub fn is_created_by(&self, user: UserID) -> bool {
        self.creator == user
    }

    #[must_use]
    pub fn short_description(&self) -> String {
        truncate_description(&self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanExercise {
    pub exercise_id: ExerciseID,
    pub name: Name,
    pub sets: u32,
    pub reps: u32,
}

#[derive(Deref, Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TrainingPlanID(Uuid);

impl TrainingPlanID {
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for TrainingPlanID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for TrainingPlanID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[must_use]
pub fn search_training_plans(
    plans: &[TrainingPlan],
    search: &str,
    order: SortOrder,
) -> Vec<TrainingPlan> {
    let mut result = plans
        .iter()
        .filter(|p| p.name.contains(search))
        .cloned()
        .collect::<Vec<_>>();
    result.sort_by(|a, b| {
        let ordering = compare_names(&a.name, &b.name);
        match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
    result
}

fn compare_names(a: &Name, b: &Name) -> Ordering {
    a.as_ref()
        .to_lowercase()
        .cmp(&b.as_ref().to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Shorten a description to its first six words.
#[must_use]
pub fn truncate_description(text: &str) -> String {
    let words = text.split(' ').collect::<Vec<_>>();
    if words.len() > 6 {
        format!("{}...", words[..6].join(" "))
    } else {
        text.to_string()
    }
}
