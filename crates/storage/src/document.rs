use std::collections::BTreeSet;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use overload_app::Collections;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    BackendError, BlobStore, Change, Document, DocumentStore, Filter, domain, set_fields,
};

/// Domain repositories on top of a document store, a blob store and an identity provider.
pub struct DocumentRepository<D, B, I> {
    documents: D,
    blobs: B,
    identity: I,
    collections: Collections,
}

impl<D, B, I> DocumentRepository<D, B, I> {
    pub fn new(documents: D, blobs: B, identity: I, collections: Collections) -> Self {
        Self {
            documents,
            blobs,
            identity,
            collections,
        }
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn identity(&self) -> &I {
        &self.identity
    }
}

impl<D: DocumentStore, B, I> DocumentRepository<D, B, I> {
    async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Stored<T>, BackendError> {
        let document = self
            .documents
            .get(collection, id)
            .await?
            .ok_or(BackendError::NotFound)?;
        Stored::parse(collection, id, document)
    }

    async fn query<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Stored<T>>, BackendError> {
        self.documents
            .query(collection, filter)
            .await?
            .into_iter()
            .map(|(id, document)| Stored::parse(collection, &id, document))
            .collect()
    }
}

/// Document together with the identifier it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub id: Uuid,
    pub document: T,
}

impl<T: DeserializeOwned> Stored<T> {
    fn parse(collection: &str, id: &str, document: Document) -> Result<Self, BackendError> {
        Ok(Self {
            id: Uuid::parse_str(id)
                .with_context(|| format!("invalid document id {collection}/{id}"))?,
            document: serde_json::from_value(Value::Object(document))
                .with_context(|| format!("invalid document {collection}/{id}"))?,
        })
    }
}

fn to_document(value: impl Serialize) -> Result<Document, BackendError> {
    match serde_json::to_value(value)? {
        Value::Object(document) => Ok(document),
        value => Err(anyhow::anyhow!("expected object, got {value}").into()),
    }
}

fn convert<T, U>(stored: Stored<T>, collection: &str) -> Result<U, BackendError>
where
    U: TryFrom<Stored<T>>,
    <U as TryFrom<Stored<T>>>::Error: std::error::Error + Send + Sync + 'static,
{
    let id = stored.id;
    Ok(U::try_from(stored).with_context(|| format!("invalid document {collection}/{id}"))?)
}

impl<D, B, I: domain::SessionRepository> domain::SessionRepository
    for DocumentRepository<D, B, I>
{
    async fn sign_up(
        &self,
        email: &domain::Email,
        password: &domain::Password,
    ) -> Result<domain::Identity, domain::CreateError> {
        self.identity.sign_up(email, password).await
    }

    async fn sign_in(
        &self,
        email: &domain::Email,
        password: &domain::Password,
    ) -> Result<domain::Identity, domain::ReadError> {
        self.identity.sign_in(email, password).await
    }

    async fn sign_out(&self) -> Result<(), domain::DeleteError> {
        self.identity.sign_out().await
    }

    async fn send_password_reset(&self, email: &domain::Email) -> Result<(), domain::ReadError> {
        self.identity.send_password_reset(email).await
    }

    fn current_identity(&self) -> Option<domain::Identity> {
        self.identity.current_identity()
    }

    fn subscribe(&self, listener: domain::Listener) -> domain::Subscription {
        self.identity.subscribe(listener)
    }
}

impl<D: DocumentStore, B, I> domain::UserRepository for DocumentRepository<D, B, I> {
    async fn read_users(&self) -> Result<Vec<domain::User>, domain::ReadError> {
        let collection = &self.collections.users;
        Ok(self
            .query::<User>(collection, &Filter::All)
            .await?
            .into_iter()
            .map(|stored| convert(stored, collection))
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn read_user(&self, id: domain::UserID) -> Result<domain::User, domain::ReadError> {
        let collection = &self.collections.users;
        let stored = self.get::<User>(collection, &id.to_string()).await?;
        Ok(convert(stored, collection)?)
    }

    async fn create_user(&self, user: domain::User) -> Result<domain::User, domain::CreateError> {
        self.documents
            .set(
                &self.collections.users,
                &user.id.to_string(),
                to_document(User::from(&user))?,
            )
            .await?;
        Ok(user)
    }

    async fn rename_user(
        &self,
        id: domain::UserID,
        name: domain::Name,
    ) -> Result<domain::User, domain::UpdateError> {
        self.documents
            .update(
                &self.collections.users,
                &id.to_string(),
                vec![("name".to_string(), Change::Set(name.to_string().into()))],
            )
            .await?;
        Ok(domain::UserRepository::read_user(self, id).await?)
    }

    async fn add_favorite(
        &self,
        id: domain::UserID,
        plan: domain::TrainingPlanID,
    ) -> Result<(), domain::UpdateError> {
        Ok(self
            .documents
            .update(
                &self.collections.users,
                &id.to_string(),
                vec![(
                    "favorites".to_string(),
                    Change::ArrayUnion(plan.to_string().into()),
                )],
            )
            .await?)
    }

    async fn remove_favorite(
        &self,
        id: domain::UserID,
        plan: domain::TrainingPlanID,
    ) -> Result<(), domain::UpdateError> {
        Ok(self
            .documents
            .update(
                &self.collections.users,
                &id.to_string(),
                vec![(
                    "favorites".to_string(),
                    Change::ArrayRemove(plan.to_string().into()),
                )],
            )
            .await?)
    }

    async fn delete_user(
        &self,
        id: domain::UserID,
    ) -> Result<domain::UserID, domain::DeleteError> {
        self.documents
            .delete(&self.collections.users, &id.to_string())
            .await?;
        Ok(id)
    }
}

impl<D: DocumentStore, B: BlobStore, I> domain::ExerciseRepository
    for DocumentRepository<D, B, I>
{
    async fn read_exercises(&self) -> Result<Vec<domain::Exercise>, domain::ReadError> {
        let collection = &self.collections.exercises;
        Ok(self
            .query::<Exercise>(collection, &Filter::All)
            .await?
            .into_iter()
            .map(|stored| convert(stored, collection))
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn read_exercise(
        &self,
        id: domain::ExerciseID,
    ) -> Result<domain::Exercise, domain::ReadError> {
        let collection = &self.collections.exercises;
        let stored = self.get::<Exercise>(collection, &id.to_string()).await?;
        Ok(convert(stored, collection)?)
    }

    async fn create_exercise(
        &self,
        name: domain::Name,
        details: domain::ExerciseDetails,
        image_url: Option<String>,
    ) -> Result<domain::Exercise, domain::CreateError> {
        let mut exercise = domain::Exercise {
            id: domain::ExerciseID::nil(),
            name,
            details,
            image_url,
        };
        let id = self
            .documents
            .create(
                &self.collections.exercises,
                to_document(Exercise::from(&exercise))?,
            )
            .await?;
        exercise.id = parse_id(&self.collections.exercises, &id)?.into();
        Ok(exercise)
    }

    async fn replace_exercise(
        &self,
        exercise: domain::Exercise,
    ) -> Result<domain::Exercise, domain::UpdateError> {
        self.documents
            .update(
                &self.collections.exercises,
                &exercise.id.to_string(),
                set_fields(to_document(Exercise::from(&exercise))?),
            )
            .await?;
        Ok(exercise)
    }

    async fn delete_exercise(
        &self,
        id: domain::ExerciseID,
    ) -> Result<domain::ExerciseID, domain::DeleteError> {
        self.documents
            .delete(&self.collections.exercises, &id.to_string())
            .await?;
        Ok(id)
    }

    async fn upload_image(&self, image: Vec<u8>) -> Result<String, domain::CreateError> {
        let key = format!("images/{}", Uuid::new_v4());
        debug!("uploading image of {} bytes to {key}", image.len());
        self.blobs.put(&key, image).await?;
        Ok(self.blobs.url(&key))
    }
}

impl<D: DocumentStore, B, I> domain::TrainingPlanRepository for DocumentRepository<D, B, I> {
    async fn read_training_plans(&self) -> Result<Vec<domain::TrainingPlan>, domain::ReadError> {
        let collection = &self.collections.training_plans;
        Ok(self
            .query::<TrainingPlan>(collection, &Filter::All)
            .await?
            .into_iter()
            .map(|stored| convert(stored, collection))
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn read_training_plan(
        &self,
        id: domain::TrainingPlanID,
    ) -> Result<domain::TrainingPlan, domain::ReadError> {
        let collection = &self.collections.training_plans;
        let stored = self
            .get::<TrainingPlan>(collection, &id.to_string())
            .await?;
        Ok(convert(stored, collection)?)
    }

    async fn create_training_plan(
        &self,
        creator: domain::UserID,
        name: domain::Name,
        description: String,
        exercises: Vec<domain::PlanExercise>,
    ) -> Result<domain::TrainingPlan, domain::CreateError> {
        let mut plan = domain::TrainingPlan {
            id: domain::TrainingPlanID::nil(),
            name,
            description,
            exercises,
            created_at: Utc::now(),
            creator,
        };
        let id = self
            .documents
            .create(
                &self.collections.training_plans,
                to_document(TrainingPlan::from(&plan))?,
            )
            .await?;
        plan.id = parse_id(&self.collections.training_plans, &id)?.into();
        Ok(plan)
    }

    async fn replace_training_plan(
        &self,
        plan: domain::TrainingPlan,
    ) -> Result<domain::TrainingPlan, domain::UpdateError> {
        self.documents
            .update(
                &self.collections.training_plans,
                &plan.id.to_string(),
                set_fields(to_document(TrainingPlan::from(&plan))?),
            )
            .await?;
        Ok(plan)
    }

    async fn delete_training_plan(
        &self,
        id: domain::TrainingPlanID,
    ) -> Result<domain::TrainingPlanID, domain::DeleteError> {
        self.documents
            .delete(&self.collections.training_plans, &id.to_string())
            .await?;
        Ok(id)
    }
}

impl<D: DocumentStore, B, I> domain::ProgressRepository for DocumentRepository<D, B, I> {
    async fn read_progress_logs(
        &self,
        owner: domain::UserID,
    ) -> Result<Vec<domain::ProgressLogEntry>, domain::ReadError> {
        let collection = &self.collections.progress;
        Ok(self
            .query::<ProgressLog>(collection, &Filter::equal("uid", owner.to_string()))
            .await?
            .into_iter()
            .map(|stored| convert(stored, collection))
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn create_progress_log(
        &self,
        entry: domain::ProgressLogEntry,
    ) -> Result<domain::ProgressLogEntry, domain::CreateError> {
        let id = self
            .documents
            .create(
                &self.collections.progress,
                to_document(ProgressLog::from(&entry))?,
            )
            .await?;
        Ok(domain::ProgressLogEntry {
            id: parse_id(&self.collections.progress, &id)?.into(),
            ..entry
        })
    }

    async fn replace_progress_log(
        &self,
        entry: domain::ProgressLogEntry,
    ) -> Result<domain::ProgressLogEntry, domain::UpdateError> {
        self.documents
            .update(
                &self.collections.progress,
                &entry.id.to_string(),
                set_fields(to_document(ProgressLogUpdate::from(&entry))?),
            )
            .await?;
        Ok(entry)
    }

    async fn delete_progress_log(
        &self,
        id: domain::ProgressLogID,
    ) -> Result<domain::ProgressLogID, domain::DeleteError> {
        self.documents
            .delete(&self.collections.progress, &id.to_string())
            .await?;
        Ok(id)
    }
}

fn parse_id(collection: &str, id: &str) -> Result<Uuid, BackendError> {
    Ok(Uuid::parse_str(id).with_context(|| format!("invalid document id {collection}/{id}"))?)
}

#[derive(thiserror::Error, Debug)]
pub enum DocumentError {
    #[error(transparent)]
    InvalidName(#[from] domain::NameError),
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    #[error(transparent)]
    InvalidReps(#[from] domain::RepsError),
    #[error(transparent)]
    InvalidWeight(#[from] domain::WeightError),
    #[error("invalid increase: {0}")]
    InvalidIncrease(#[from] std::num::ParseFloatError),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub favorites: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<&domain::User> for User {
    fn from(value: &domain::User) -> Self {
        Self {
            uid: *value.id,
            email: value.email.to_string(),
            name: value.name.to_string(),
            role: value.role.to_string(),
            favorites: value.favorites.iter().map(|id| **id).collect(),
            created_at: value.created_at,
        }
    }
}

impl TryFrom<Stored<User>> for domain::User {
    type Error = DocumentError;

    fn try_from(value: Stored<User>) -> Result<Self, Self::Error> {
        let user = value.document;
        Ok(Self {
            id: value.id.into(),
            email: domain::Email::new(&user.email)
                .map_err(|_| DocumentError::InvalidEmail(user.email.clone()))?,
            name: domain::Name::new(&user.name)?,
            role: domain::Role::from(user.role.as_str()),
            favorites: user
                .favorites
                .into_iter()
                .map(domain::TrainingPlanID::from)
                .collect::<BTreeSet<_>>(),
            created_at: user.created_at,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Exercise {
    pub name: String,
    pub difficulty: String,
    pub muscle_group: String,
    pub description: String,
    #[serde(default)]
    pub img_url: String,
}

impl From<&domain::Exercise> for Exercise {
    fn from(value: &domain::Exercise) -> Self {
        Self {
            name: value.name.to_string(),
            difficulty: value.details.difficulty.clone(),
            muscle_group: value.details.muscle_group.clone(),
            description: value.details.description.clone(),
            img_url: value.image_url.clone().unwrap_or_default(),
        }
    }
}

impl TryFrom<Stored<Exercise>> for domain::Exercise {
    type Error = DocumentError;

    fn try_from(value: Stored<Exercise>) -> Result<Self, Self::Error> {
        let exercise = value.document;
        Ok(Self {
            id: value.id.into(),
            name: domain::Name::new(&exercise.name)?,
            details: domain::ExerciseDetails {
                difficulty: exercise.difficulty,
                muscle_group: exercise.muscle_group,
                description: exercise.description,
            },
            image_url: Some(exercise.img_url).filter(|url| !url.is_empty()),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrainingPlan {
    pub name: String,
    pub description: String,
    pub exercises: Vec<PlanExercise>,
    pub created_at: DateTime<Utc>,
    pub creator_uid: Uuid,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlanExercise {
    pub id: Uuid,
    pub name: String,
    pub sets: u32,
    pub reps: u32,
}

impl From<&domain::TrainingPlan> for TrainingPlan {
    fn from(value: &domain::TrainingPlan) -> Self {
        Self {
            name: value.name.to_string(),
            description: value.description.clone(),
            exercises: value
                .exercises
                .iter()
                .map(|e| PlanExercise {
                    id: *e.exercise_id,
                    name: e.name.to_string(),
                    sets: e.sets,
                    reps: e.reps,
                })
                .collect(),
            created_at: value.created_at,
            creator_uid: *value.creator,
        }
    }
}

impl TryFrom<Stored<TrainingPlan>> for domain::TrainingPlan {
    type Error = DocumentError;

    fn try_from(value: Stored<TrainingPlan>) -> Result<Self, Self::Error> {
        let plan = value.document;
        Ok(Self {
            id: value.id.into(),
            name: domain::Name::new(&plan.name)?,
            description: plan.description,
            exercises: plan
                .exercises
                .into_iter()
                .map(|e| {
                    Ok(domain::PlanExercise {
                        exercise_id: e.id.into(),
                        name: domain::Name::new(&e.name)?,
                        sets: e.sets,
                        reps: e.reps,
                    })
                })
                .collect::<Result<Vec<_>, DocumentError>>()?,
            created_at: plan.created_at,
            creator: plan.creator_uid.into(),
        })
    }
}

/// Stored load, either a weight in kilograms or the bodyweight marker.
///
/// A previous weight of `0` marks an entry that has never been overwritten.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum StoredLoad {
    Weight(f64),
    Bodyweight(Bodyweight),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bodyweight {
    Bodyweight,
}

impl From<domain::Load> for StoredLoad {
    fn from(value: domain::Load) -> Self {
        match value {
            domain::Load::Weighted(weight) => StoredLoad::Weight(weight.into()),
            domain::Load::Bodyweight => StoredLoad::Bodyweight(Bodyweight::Bodyweight),
        }
    }
}

impl From<Option<domain::Load>> for StoredLoad {
    fn from(value: Option<domain::Load>) -> Self {
        value.map_or(StoredLoad::Weight(0.0), StoredLoad::from)
    }
}

impl TryFrom<StoredLoad> for domain::Load {
    type Error = domain::WeightError;

    fn try_from(value: StoredLoad) -> Result<Self, Self::Error> {
        match value {
            StoredLoad::Weight(weight) => Ok(domain::Load::Weighted(domain::Weight::new(weight)?)),
            StoredLoad::Bodyweight(_) => Ok(domain::Load::Bodyweight),
        }
    }
}

impl TryFrom<StoredLoad> for Option<domain::Load> {
    type Error = domain::WeightError;

    fn try_from(value: StoredLoad) -> Result<Self, Self::Error> {
        match value {
            StoredLoad::Weight(weight) if weight == 0.0 => Ok(None),
            load => Ok(Some(domain::Load::try_from(load)?)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressLog {
    pub uid: Uuid,
    pub exercise: String,
    pub previous_weight: StoredLoad,
    pub current_weight: StoredLoad,
    pub repetitions: u32,
    pub increase: String,
    pub date: NaiveDate,
}

impl From<&domain::ProgressLogEntry> for ProgressLog {
    fn from(value: &domain::ProgressLogEntry) -> Self {
        Self {
            uid: *value.owner,
            exercise: value.exercise.to_string(),
            previous_weight: value.previous_load.into(),
            current_weight: value.current_load.into(),
            repetitions: value.repetitions.into(),
            increase: value.percent_change.to_string(),
            date: value.recorded_at,
        }
    }
}

impl TryFrom<Stored<ProgressLog>> for domain::ProgressLogEntry {
    type Error = DocumentError;

    fn try_from(value: Stored<ProgressLog>) -> Result<Self, Self::Error> {
        let log = value.document;
        Ok(Self {
            id: value.id.into(),
            owner: log.uid.into(),
            exercise: domain::Name::new(&log.exercise)?,
            previous_load: log.previous_weight.try_into()?,
            current_load: log.current_weight.try_into()?,
            repetitions: domain::Reps::new(log.repetitions)?,
            percent_change: domain::PercentChange::try_from(log.increase.as_str())?,
            recorded_at: log.date,
        })
    }
}

/// Fields of a progress log that change when a newer attempt is recorded.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ProgressLogUpdate {
    previous_weight: StoredLoad,
    current_weight: StoredLoad,
    repetitions: u32,
    increase: String,
    date: NaiveDate,
}

impl From<&domain::ProgressLogEntry> for ProgressLogUpdate {
    fn from(value: &domain::ProgressLogEntry) -> Self {
        Self {
            previous_weight: value.previous_load.into(),
            current_weight: value.current_load.into(),
            repetitions: value.repetitions.into(),
            increase: value.percent_change.to_string(),
            date: value.recorded_at,
        }
    }
}
