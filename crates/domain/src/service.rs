use std::collections::BTreeSet;

use chrono::Utc;
use futures_util::future::join_all;
use log::{debug, error, warn};

use crate::{
    CreateError, DeleteError, Email, Exercise, ExerciseDetails, ExerciseID, ExerciseRepository,
    ExerciseService, FavoriteService, Identity, Listener, Name, Password, PlanExercise,
    ProgressLogEntry, ProgressLogID, ProgressRepository, ProgressService, ReadError, Role,
    SessionRepository, SessionService, StorageError, Subscription, TrainingPlan, TrainingPlanID,
    TrainingPlanRepository, TrainingPlanService, UpdateError, User, UserID, UserRepository,
    UserService,
};

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

macro_rules! log_on_error {
    ($func: expr, $error: ident, $action: literal, $entity: literal) => {{
        let result = $func.await;
        match result {
            Ok(_) => {}
            Err(ref err) => match err {
                $error::Storage(crate::StorageError::NoConnection) => {
                    debug!("failed to {} {}: {err}", $action, $entity);
                }
                _ => {
                    error!("failed to {} {}: {err}", $action, $entity);
                }
            },
        }
        result
    }};
}

fn require_admin(actor: &User, action: &str) -> Result<(), StorageError> {
    if actor.is_admin() {
        Ok(())
    } else {
        warn!("user {} is not permitted to {action}", actor.id);
        Err(StorageError::PermissionDenied)
    }
}

fn require_creator(plan: &TrainingPlan, actor: UserID, action: &str) -> Result<(), StorageError> {
    if plan.is_created_by(actor) {
        Ok(())
    } else {
        warn!("user {actor} is not permitted to {action} training plan {}", *plan.id);
        Err(StorageError::PermissionDenied)
    }
}

impl<R: SessionRepository + UserRepository> SessionService for Service<R> {
    async fn register(
        &self,
        email: Email,
        password: Password,
        name: Name,
    ) -> Result<User, CreateError> {
        let identity = log_on_error!(
            self.repository.sign_up(&email, &password),
            CreateError,
            "sign up",
            "user"
        )?;
        log_on_error!(
            self.repository.create_user(User {
                id: identity.uid,
                email: identity.email,
                name,
                role: Role::User,
                favorites: BTreeSet::new(),
                created_at: Utc::now(),
            }),
            CreateError,
            "create",
            "user"
        )
    }

    async fn login(&self, email: Email, password: Password) -> Result<Identity, ReadError> {
        log_on_error!(
            self.repository.sign_in(&email, &password),
            ReadError,
            "sign in",
            "user"
        )
    }

    async fn logout(&self) -> Result<(), DeleteError> {
        log_on_error!(
            self.repository.sign_out(),
            DeleteError,
            "delete",
            "session"
        )
    }

    async fn reset_password(&self, email: Email) -> Result<(), ReadError> {
        log_on_error!(
            self.repository.send_password_reset(&email),
            ReadError,
            "reset",
            "password"
        )
    }

    fn current_identity(&self) -> Option<Identity> {
        self.repository.current_identity()
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.repository.subscribe(listener)
    }
}

impl<R: UserRepository> UserService for Service<R> {
    async fn get_users(&self, actor: &User) -> Result<Vec<User>, ReadError> {
        require_admin(actor, "list users")?;
        log_on_error!(self.repository.read_users(), ReadError, "get", "users")
    }

    async fn get_user(&self, id: UserID) -> Result<User, ReadError> {
        log_on_error!(self.repository.read_user(id), ReadError, "get", "user")
    }

    async fn rename_user(&self, id: UserID, name: Name) -> Result<User, UpdateError> {
        log_on_error!(
            self.repository.rename_user(id, name),
            UpdateError,
            "rename",
            "user"
        )
    }

    async fn delete_user(&self, actor: &User, id: UserID) -> Result<UserID, DeleteError> {
        require_admin(actor, "delete users")?;
        log_on_error!(
            self.repository.delete_user(id),
            DeleteError,
            "delete",
            "user"
        )
    }
}

impl<R: UserRepository + TrainingPlanRepository> FavoriteService for Service<R> {
    async fn toggle_favorite(
        &self,
        user: UserID,
        plan: TrainingPlanID,
    ) -> Result<bool, UpdateError> {
        let favorites = self.get_user(user).await?.favorites;
        if favorites.contains(&plan) {
            log_on_error!(
                self.repository.remove_favorite(user, plan),
                UpdateError,
                "remove",
                "favorite"
            )?;
            Ok(false)
        } else {
            log_on_error!(
                self.repository.add_favorite(user, plan),
                UpdateError,
                "add",
                "favorite"
            )?;
            Ok(true)
        }
    }

    async fn get_favorite_plans(&self, user: UserID) -> Result<Vec<TrainingPlan>, ReadError> {
        let favorites = self.get_user(user).await?.favorites;
        let results = join_all(
            favorites
                .iter()
                .map(|id| self.repository.read_training_plan(*id)),
        )
        .await;
        let mut plans = vec![];
        for (id, result) in favorites.iter().zip(results) {
            match result {
                Ok(plan) => plans.push(plan),
                Err(ReadError::NotFound) => {
                    debug!("skipping favorite of missing training plan {}", **id);
                }
                Err(err) => {
                    error!("failed to get training plan: {err}");
                    return Err(err);
                }
            }
        }
        Ok(plans)
    }

    async fn favorites_count(&self, user: UserID) -> Result<usize, ReadError> {
        Ok(self.get_user(user).await?.favorites.len())
    }
}

impl<R: ExerciseRepository> ExerciseService for Service<R> {
    async fn get_exercises(&self) -> Result<Vec<Exercise>, ReadError> {
        log_on_error!(
            self.repository.read_exercises(),
            ReadError,
            "get",
            "exercises"
        )
    }

    async fn get_exercise(&self, id: ExerciseID) -> Result<Exercise, ReadError> {
        log_on_error!(
            self.repository.read_exercise(id),
            ReadError,
            "get",
            "exercise"
        )
    }

    async fn create_exercise(
        &self,
        actor: &User,
        name: Name,
        details: ExerciseDetails,
        image: Option<Vec<u8>>,
    ) -> Result<Exercise, CreateError> {
        require_admin(actor, "create exercises")?;
        let details = self.validate_exercise_details(
            &details.difficulty,
            &details.muscle_group,
            &details.description,
        )?;
        let image_url = match image {
            Some(image) => Some(log_on_error!(
                self.repository.upload_image(image),
                CreateError,
                "upload",
                "image"
            )?),
            None => None,
        };
        log_on_error!(
            self.repository.create_exercise(name, details, image_url),
            CreateError,
            "create",
            "exercise"
        )
    }

    async fn replace_exercise(
        &self,
        actor: &User,
        exercise: Exercise,
        image: Option<Vec<u8>>,
    ) -> Result<Exercise, UpdateError> {
        require_admin(actor, "replace exercises")?;
        let details = self.validate_exercise_details(
            &exercise.details.difficulty,
            &exercise.details.muscle_group,
            &exercise.details.description,
        )?;
        let image_url = match image {
            Some(image) => Some(log_on_error!(
                self.repository.upload_image(image),
                CreateError,
                "upload",
                "image"
            )?),
            None => exercise.image_url,
        };
        log_on_error!(
            self.repository.replace_exercise(Exercise {
                details,
                image_url,
                ..exercise
            }),
            UpdateError,
            "replace",
            "exercise"
        )
    }

    async fn delete_exercise(
        &self,
        actor: &User,
        id: ExerciseID,
    ) -> Result<ExerciseID, DeleteError> {
        require_admin(actor, "delete exercises")?;
        log_on_error!(
            self.repository.delete_exercise(id),
            DeleteError,
            "delete",
            "exercise"
        )
    }
}

impl<R: TrainingPlanRepository> TrainingPlanService for Service<R> {
    async fn get_training_plans(&self) -> Result<Vec<TrainingPlan>, ReadError> {
        log_on_error!(
            self.repository.read_training_plans(),
            ReadError,
            "get",
            "training plans"
        )
    }

    async fn get_training_plan(&self, id: TrainingPlanID) -> Result<TrainingPlan, ReadError> {
        log_on_error!(
            self.repository.read_training_plan(id),
            ReadError,
            "get",
            "training plan"
        )
    }

    async fn create_training_plan(
        &self,
        creator: UserID,
        name: Name,
        description: String,
        exercises: Vec<PlanExercise>,
    ) -> Result<TrainingPlan, CreateError> {
        let exercises = self.validate_plan_exercises(exercises)?;
        log_on_error!(
            self.repository
                .create_training_plan(creator, name, description, exercises),
            CreateError,
            "create",
            "training plan"
        )
    }

    async fn replace_training_plan(
        &self,
        actor: UserID,
        plan: TrainingPlan,
    ) -> Result<TrainingPlan, UpdateError> {
        let exercises = self.validate_plan_exercises(plan.exercises)?;
        let stored = self.get_training_plan(plan.id).await?;
        require_creator(&stored, actor, "replace")?;
        log_on_error!(
            self.repository.replace_training_plan(TrainingPlan {
                exercises,
                creator: stored.creator,
                created_at: stored.created_at,
                ..plan
            }),
            UpdateError,
            "replace",
            "training plan"
        )
    }

    async fn delete_training_plan(
        &self,
        actor: UserID,
        id: TrainingPlanID,
    ) -> Result<TrainingPlanID, DeleteError> {
        let stored = self.get_training_plan(id).await?;
        require_creator(&stored, actor, "delete")?;
        log_on_error!(
            self.repository.delete_training_plan(id),
            DeleteError,
            "delete",
            "training plan"
        )
    }
}

impl<R: ProgressRepository> ProgressService for Service<R> {
    async fn get_progress_logs(&self, owner: UserID) -> Result<Vec<ProgressLogEntry>, ReadError> {
        log_on_error!(
            self.repository.read_progress_logs(owner),
            ReadError,
            "get",
            "progress logs"
        )
    }

    async fn create_progress_log(
        &self,
        entry: ProgressLogEntry,
    ) -> Result<ProgressLogEntry, CreateError> {
        log_on_error!(
            self.repository.create_progress_log(entry),
            CreateError,
            "create",
            "progress log"
        )
    }

    async fn replace_progress_log(
        &self,
        entry: ProgressLogEntry,
    ) -> Result<ProgressLogEntry, UpdateError> {
        log_on_error!(
            self.repository.replace_progress_log(entry),
            UpdateError,
            "replace",
            "progress log"
        )
    }

    async fn delete_progress_log(
        &self,
        owner: UserID,
        id: ProgressLogID,
    ) -> Result<ProgressLogID, DeleteError> {
        debug!("deleting progress log {} of user {owner}", *id);
        log_on_error!(
            self.repository.delete_progress_log(id),
            DeleteError,
            "delete",
            "progress log"
        )
    }
}
