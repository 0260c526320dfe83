use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use overload_domain as domain;

pub static CREATED_AT: std::sync::LazyLock<DateTime<Utc>> = std::sync::LazyLock::new(|| {
    DateTime::parse_from_rfc3339("2024-03-01T08:30:00Z")
        .unwrap()
        .with_timezone(&Utc)
});

pub static USERS: std::sync::LazyLock<Vec<domain::User>> =
    std::sync::LazyLock::new(|| vec![USER.clone(), ADMIN.clone()]);

pub static USER: std::sync::LazyLock<domain::User> = std::sync::LazyLock::new(|| domain::User {
    id: 1.into(),
    email: domain::Email::new("alice@example.com").unwrap(),
    name: domain::Name::new("Alice").unwrap(),
    role: domain::Role::User,
    favorites: BTreeSet::from([TRAINING_PLAN.id]),
    created_at: *CREATED_AT,
});

pub static ADMIN: std::sync::LazyLock<domain::User> = std::sync::LazyLock::new(|| domain::User {
    id: 2.into(),
    email: domain::Email::new("bob@example.com").unwrap(),
    name: domain::Name::new("Bob").unwrap(),
    role: domain::Role::Admin,
    favorites: BTreeSet::new(),
    created_at: *CREATED_AT,
});

pub static EXERCISES: std::sync::LazyLock<Vec<domain::Exercise>> =
    std::sync::LazyLock::new(|| vec![EXERCISE.clone(), EXERCISE_2.clone()]);

pub static EXERCISE: std::sync::LazyLock<domain::Exercise> =
    std::sync::LazyLock::new(|| domain::Exercise {
        id: 10.into(),
        name: domain::Name::new("Bench Press").unwrap(),
        details: domain::ExerciseDetails {
            difficulty: "Intermediate".to_string(),
            muscle_group: "Chest".to_string(),
            description: "Press the bar from the chest.".to_string(),
        },
        image_url: Some("https://overload.localhost/images/bench".to_string()),
    });

pub static EXERCISE_2: std::sync::LazyLock<domain::Exercise> =
    std::sync::LazyLock::new(|| domain::Exercise {
        id: 11.into(),
        name: domain::Name::new("Pull Up").unwrap(),
        details: domain::ExerciseDetails {
            difficulty: "Beginner".to_string(),
            muscle_group: "Back".to_string(),
            description: "Pull the chin over the bar.".to_string(),
        },
        image_url: None,
    });

pub static TRAINING_PLAN: std::sync::LazyLock<domain::TrainingPlan> =
    std::sync::LazyLock::new(|| domain::TrainingPlan {
        id: 20.into(),
        name: domain::Name::new("Upper Body").unwrap(),
        description: "Push and pull on alternating days".to_string(),
        exercises: vec![
            domain::PlanExercise {
                exercise_id: EXERCISE.id,
                name: EXERCISE.name.clone(),
                sets: 3,
                reps: 8,
            },
            domain::PlanExercise {
                exercise_id: EXERCISE_2.id,
                name: EXERCISE_2.name.clone(),
                sets: 4,
                reps: 6,
            },
        ],
        created_at: *CREATED_AT,
        creator: 2.into(),
    });

pub static PROGRESS_LOG: std::sync::LazyLock<domain::ProgressLogEntry> =
    std::sync::LazyLock::new(|| domain::ProgressLogEntry {
        id: 30.into(),
        owner: 1.into(),
        exercise: domain::Name::new("Squat").unwrap(),
        previous_load: None,
        current_load: domain::Load::Weighted(domain::Weight::new(10.0).unwrap()),
        repetitions: domain::Reps::new(10).unwrap(),
        percent_change: domain::PercentChange::INITIAL,
        recorded_at: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
    });

pub static PROGRESS_LOG_2: std::sync::LazyLock<domain::ProgressLogEntry> =
    std::sync::LazyLock::new(|| domain::ProgressLogEntry {
        id: 31.into(),
        owner: 1.into(),
        exercise: domain::Name::new("Push Up").unwrap(),
        previous_load: Some(domain::Load::Bodyweight),
        current_load: domain::Load::Bodyweight,
        repetitions: domain::Reps::new(12).unwrap(),
        percent_change: domain::PercentChange::new(20.0),
        recorded_at: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
    });
