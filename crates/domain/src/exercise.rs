use derive_more::Deref;
use uuid::Uuid;

use crate::{CreateError, DeleteError, Name, ReadError, UpdateError, User, ValidationError};

#[allow(async_fn_in_trait)]
pub trait ExerciseService {
    async fn get_exercises(&self) -> Result<Vec<Exercise>, ReadError>;
    async fn get_exercise(&self, id: ExerciseID) -> Result<Exercise, ReadError>;
    /// Add an exercise to the catalog. Requires an administrator.
    async fn create_exercise(
        &self,
        actor: &User,
        name: Name,
        details: ExerciseDetails,
        image: Option<Vec<u8>>,
    ) -> Result<Exercise, CreateError>;
    /// Requires an administrator. The stored image is kept unless a new one is given.
    async fn replace_exercise(
        &self,
        actor: &User,
        exercise: Exercise,
        image: Option<Vec<u8>>,
    ) -> Result<Exercise, UpdateError>;
    /// Requires an administrator. Progress logs naming the exercise are left untouched.
    async fn delete_exercise(
        &self,
        actor: &User,
        id: ExerciseID,
    ) -> Result<ExerciseID, DeleteError>;

    fn validate_exercise_name(&self, name: &str) -> Result<Name, ValidationError> {
        Name::parse("name", name)
    }

    fn validate_exercise_details(
        &self,
        difficulty: &str,
        muscle_group: &str,
        description: &str,
    ) -> Result<ExerciseDetails, ValidationError> {
        Ok(ExerciseDetails {
            difficulty: required("difficulty", difficulty)?,
            muscle_group: required("muscle_group", muscle_group)?,
            description: required("description", description)?,
        })
    }

    #[must_use]
    fn filter_exercises(&self, exercises: &[Exercise], search: &str) -> Vec<Exercise> {
        filter_exercises(exercises, search)
    }
}

#[allow(async_fn_in_trait)]
pub trait ExerciseRepository {
    async fn read_exercises(&self) -> Result<Vec<Exercise>, ReadError>;
    async fn read_exercise(&self, id: ExerciseID) -> Result<Exercise, ReadError>;
    async fn create_exercise(
        &self,
        name: Name,
        details: ExerciseDetails,
        image_url: Option<String>,
    ) -> Result<Exercise, CreateError>;
    async fn replace_exercise(&self, exercise: Exercise) -> Result<Exercise, UpdateError>;
    async fn delete_exercise(&self, id: ExerciseID) -> Result<ExerciseID, DeleteError>;
    /// Store an image and return the URL it can be retrieved from.
    async fn upload_image(&self, image: Vec<u8>) -> Result<String, CreateError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exercise {
    pub id: ExerciseID,
    pub name: Name,
    pub details: ExerciseDetails,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseDetails {
    pub difficulty: String,
    pub muscle_group: String,
    pub description: String,
}

#[derive(Deref, Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExerciseID(Uuid);

impl ExerciseID {
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for ExerciseID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for ExerciseID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

#[must_use]
pub fn filter_exercises(exercises: &[Exercise], search: &str) -> Vec<Exercise> {
    exercises
        .iter()
        .filter(|e| e.name.contains(search))
        .cloned()
        .collect()
}

fn required(field: &str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Empty(field.to_string()));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    static EXERCISES: std::sync::LazyLock<Vec<Exercise>> = std::sync::LazyLock::new(|| {
        vec![
            exercise(1, "Back Squat"),
            exercise(2, "Bench Press"),
            exercise(3, "Front Squat"),
        ]
    });

    struct Catalog;

    impl ExerciseService for Catalog {
        async fn get_exercises(&self) -> Result<Vec<Exercise>, ReadError> {
            Ok(EXERCISES.clone())
        }

        async fn get_exercise(&self, _: ExerciseID) -> Result<Exercise, ReadError> {
            Err(ReadError::NotFound)
        }

        async fn create_exercise(
            &self,
            _: &User,
            _: Name,
            _: ExerciseDetails,
            _: Option<Vec<u8>>,
        ) -> Result<Exercise, CreateError> {
            Err(CreateError::Conflict)
        }

        async fn replace_exercise(
            &self,
            _: &User,
            _: Exercise,
            _: Option<Vec<u8>>,
        ) -> Result<Exercise, UpdateError> {
            Err(UpdateError::NotFound)
        }

        async fn delete_exercise(
            &self,
            _: &User,
            id: ExerciseID,
        ) -> Result<ExerciseID, DeleteError> {
            Ok(id)
        }
    }

    #[rstest]
    #[case("squat", vec![1, 3])]
    #[case("BENCH", vec![2])]
    #[case("", vec![1, 2, 3])]
    #[case("deadlift", vec![])]
    fn test_filter_exercises(#[case] search: &str, #[case] expected: Vec<u128>) {
        assert_eq!(
            filter_exercises(&EXERCISES, search)
                .iter()
                .map(|e| e.id)
                .collect::<Vec<_>>(),
            expected
                .into_iter()
                .map(ExerciseID::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_validate_exercise_details() {
        assert_eq!(
            Catalog
                .validate_exercise_details(" Beginner ", "Legs", "Squat down.")
                .unwrap(),
            ExerciseDetails {
                difficulty: "Beginner".to_string(),
                muscle_group: "Legs".to_string(),
                description: "Squat down.".to_string(),
            }
        );
        assert_eq!(
            Catalog
                .validate_exercise_details("Beginner", " ", "Squat down.")
                .unwrap_err()
                .field(),
            Some("muscle_group")
        );
        assert_eq!(
            Catalog
                .validate_exercise_name("")
                .unwrap_err()
                .field(),
            Some("name")
        );
    }

    #[test]
    fn test_exercise_id_nil() {
        assert!(ExerciseID::nil().is_nil());
        assert_eq!(ExerciseID::nil(), ExerciseID::default());
    }

    fn exercise(id: u128, name: &str) -> Exercise {
        Exercise {
            id: id.into(),
            name: Name::new(name).unwrap(),
            details: ExerciseDetails {
                difficulty: "Intermediate".to_string(),
                muscle_group: "Legs".to_string(),
                description: format!("How to perform a {}.", name.to_lowercase()),
            },
            image_url: None,
        }
    }
}
