use crate::{ReadError, TrainingPlan, TrainingPlanID, UpdateError, UserID};

#[allow(async_fn_in_trait)]
pub trait FavoriteService {
    /// Add the plan to the favorites of the user if it is missing, remove it otherwise.
    ///
    /// Returns whether the plan is a favorite afterwards.
    async fn toggle_favorite(&self, user: UserID, plan: TrainingPlanID)
    -> Result<bool, UpdateError>;
    /// Favorite plans of the user. Favorites of deleted plans are skipped.
    async fn get_favorite_plans(&self, user: UserID) -> Result<Vec<TrainingPlan>, ReadError>;
    async fn favorites_count(&self, user: UserID) -> Result<usize, ReadError>;
}
