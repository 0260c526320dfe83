//! Progress log
//!
//! Every user keeps at most one entry per exercise. Recording an attempt for an exercise that
//! already has an entry overwrites that entry in place: the previous load is replaced by the
//! load of the overwritten attempt and the percent change is computed from the volume loads of
//! both attempts. Older attempts are not kept.
//!
//! Recording is a read followed by a separate write. Two concurrent recordings for the same
//! exercise race and the later write wins.

use std::fmt;

use chrono::{Local, NaiveDate};
use derive_more::{Deref, Display, Into};
use uuid::Uuid;

use crate::{CreateError, DeleteError, Name, ReadError, UpdateError, UserID, ValidationError};

#[allow(async_fn_in_trait)]
pub trait ProgressService {
    /// All entries of `owner` in unspecified order.
    async fn get_progress_logs(&self, owner: UserID) -> Result<Vec<ProgressLogEntry>, ReadError>;
    async fn create_progress_log(
        &self,
        entry: ProgressLogEntry,
    ) -> Result<ProgressLogEntry, CreateError>;
    async fn replace_progress_log(
        &self,
        entry: ProgressLogEntry,
    ) -> Result<ProgressLogEntry, UpdateError>;
    /// Deleting an entry that does not exist succeeds.
    async fn delete_progress_log(
        &self,
        owner: UserID,
        id: ProgressLogID,
    ) -> Result<ProgressLogID, DeleteError>;

    /// Create or overwrite the entry of `owner` for `exercise`.
    ///
    /// `weight` is ignored in bodyweight mode. All input is validated before the store is
    /// accessed.
    async fn record_attempt(
        &self,
        owner: UserID,
        exercise: &str,
        repetitions: u32,
        bodyweight: bool,
        weight: Option<f64>,
    ) -> Result<ProgressLogEntry, RecordError> {
        let attempt = self.validate_attempt(exercise, repetitions, bodyweight, weight)?;
        let today = Local::now().date_naive();

        let existing = self
            .get_progress_logs(owner)
            .await?
            .into_iter()
            .find(|entry| entry.exercise == attempt.exercise);

        Ok(match existing {
            None => {
                self.create_progress_log(ProgressLogEntry::first(owner, attempt, today))
                    .await?
            }
            Some(entry) => {
                self.replace_progress_log(entry.advance(attempt, today))
                    .await?
            }
        })
    }

    fn validate_attempt(
        &self,
        exercise: &str,
        repetitions: u32,
        bodyweight: bool,
        weight: Option<f64>,
    ) -> Result<Attempt, ValidationError> {
        let exercise = Name::parse("exercise", exercise)?;
        let repetitions =
            Reps::new(repetitions).map_err(|err| ValidationError::invalid("repetitions", err))?;
        let load = if bodyweight {
            Load::Bodyweight
        } else {
            match weight {
                Some(weight) => Load::Weighted(
                    Weight::new(weight).map_err(|err| ValidationError::invalid("weight", err))?,
                ),
                None => return Err(ValidationError::Empty("weight".to_string())),
            }
        };
        if !load.volume_load(repetitions).is_finite() {
            return Err(ValidationError::invalid(
                "weight",
                "Weight times repetitions is too large",
            ));
        }
        Ok(Attempt {
            exercise,
            load,
            repetitions,
        })
    }
}

#[allow(async_fn_in_trait)]
pub trait ProgressRepository {
    async fn read_progress_logs(&self, owner: UserID)
    -> Result<Vec<ProgressLogEntry>, ReadError>;
    /// Store a new entry. The identifier of the given entry is ignored and replaced by the one
    /// assigned by the store.
    async fn create_progress_log(
        &self,
        entry: ProgressLogEntry,
    ) -> Result<ProgressLogEntry, CreateError>;
    /// Overwrite the mutable fields of the entry with the same identifier.
    async fn replace_progress_log(
        &self,
        entry: ProgressLogEntry,
    ) -> Result<ProgressLogEntry, UpdateError>;
    async fn delete_progress_log(&self, id: ProgressLogID) -> Result<ProgressLogID, DeleteError>;
}

#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Create(#[from] CreateError),
    #[error(transparent)]
    Update(#[from] UpdateError),
}

/// Validated input of a single logged set.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub exercise: Name,
    pub load: Load,
    pub repetitions: Reps,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressLogEntry {
    pub id: ProgressLogID,
    pub owner: UserID,
    pub exercise: Name,
    /// `None` until the entry has been overwritten once.
    pub previous_load: Option<Load>,
    pub current_load: Load,
    pub repetitions: Reps,
    pub percent_change: PercentChange,
    pub recorded_at: NaiveDate,
}

impl ProgressLogEntry {
    #[must_use]
    pub fn first(owner: UserID, attempt: Attempt, today: NaiveDate) -> Self {
        Self {
            id: ProgressLogID::nil(),
            owner,
            exercise: attempt.exercise,
            previous_load: None,
            current_load: attempt.load,
            repetitions: attempt.repetitions,
            percent_change: PercentChange::INITIAL,
            recorded_at: today,
        }
    }

    /// Overwrite this entry with a newer attempt.
    ///
    /// The previous volume load is derived from the stored load of this entry, independent of
    /// the mode of the new attempt.
    #[must_use]
    pub fn advance(self, attempt: Attempt, today: NaiveDate) -> Self {
        let percent_change = PercentChange::between(
            self.volume_load(),
            attempt.load.volume_load(attempt.repetitions),
        );
        Self {
            previous_load: Some(self.current_load),
            current_load: attempt.load,
            repetitions: attempt.repetitions,
            percent_change,
            recorded_at: today,
            ..self
        }
    }

    #[must_use]
    pub fn volume_load(&self) -> f64 {
        self.current_load.volume_load(self.repetitions)
    }

    /// Previous load as displayed, `0` before the first overwrite.
    #[must_use]
    pub fn previous_load_label(&self) -> String {
        self.previous_load
            .map_or_else(|| "0".to_string(), |load| load.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Load {
    Weighted(Weight),
    Bodyweight,
}

impl Load {
    /// Weight times repetitions, or the repetitions alone for bodyweight sets.
    #[must_use]
    pub fn volume_load(self, repetitions: Reps) -> f64 {
        match self {
            Load::Weighted(weight) => f64::from(weight) * f64::from(u32::from(repetitions)),
            Load::Bodyweight => f64::from(u32::from(repetitions)),
        }
    }
}

impl fmt::Display for Load {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Load::Weighted(weight) => write!(f, "{weight}"),
            Load::Bodyweight => write!(f, "Bodyweight"),
        }
    }
}

/// Positive number of repetitions.
#[derive(Debug, Display, Clone, Copy, Into, PartialEq, Eq, PartialOrd, Ord)]
pub struct Reps(u32);

impl Reps {
    pub fn new(value: u32) -> Result<Self, RepsError> {
        if value == 0 {
            return Err(RepsError::NotPositive);
        }

        Ok(Self(value))
    }
}

impl TryFrom<&str> for Reps {
    type Error = RepsError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().parse::<u32>() {
            Ok(parsed_value) => Reps::new(parsed_value),
            Err(_) => Err(RepsError::ParseError),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RepsError {
    #[error("Repetitions must be a positive integer")]
    NotPositive,
    #[error("Repetitions must be an integer")]
    ParseError,
}

/// Positive weight in kilograms.
#[derive(Debug, Display, Clone, Copy, Into, PartialEq, PartialOrd)]
pub struct Weight(f64);

impl Weight {
    pub fn new(value: f64) -> Result<Self, WeightError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(WeightError::NotPositive);
        }

        Ok(Self(value))
    }
}

impl TryFrom<&str> for Weight {
    type Error = WeightError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.replace(',', ".").trim().parse::<f64>() {
            Ok(parsed_value) => Weight::new(parsed_value),
            Err(_) => Err(WeightError::ParseError),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum WeightError {
    #[error("Weight must be a positive decimal number")]
    NotPositive,
    #[error("Weight must be a decimal number")]
    ParseError,
}

/// Change of volume load in percent, rounded to two decimal places.
#[derive(Debug, Clone, Copy, Deref, PartialEq, PartialOrd)]
pub struct PercentChange(f64);

impl PercentChange {
    /// Value of an entry that has never been overwritten.
    pub const INITIAL: PercentChange = PercentChange(100.0);

    /// A previous volume load of zero has no defined change and yields `INITIAL`.
    #[must_use]
    pub fn between(previous_volume_load: f64, volume_load: f64) -> Self {
        if previous_volume_load == 0.0 {
            return Self::INITIAL;
        }
        Self::new(
            ((volume_load - previous_volume_load) / previous_volume_load * 100.0).min(f64::MAX),
        )
    }

    #[must_use]
    pub fn new(value: f64) -> Self {
        let scaled = value * 100.0;
        if !scaled.is_finite() {
            return Self(value);
        }
        // adding zero turns a rounded -0.0 into 0.0
        Self(scaled.round() / 100.0 + 0.0)
    }
}

impl fmt::Display for PercentChange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<&str> for PercentChange {
    type Error = std::num::ParseFloatError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(Self::new(value.trim().parse::<f64>()?))
    }
}

#[derive(Deref, Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProgressLogID(Uuid);

impl ProgressLogID {
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for ProgressLogID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for ProgressLogID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::BTreeMap};

    use assert_approx_eq::assert_approx_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    static TODAY: std::sync::LazyLock<NaiveDate> =
        std::sync::LazyLock::new(|| Local::now().date_naive());

    const ALICE: u128 = 1;
    const BOB: u128 = 2;

    #[derive(Default)]
    struct Ledger {
        entries: RefCell<BTreeMap<ProgressLogID, ProgressLogEntry>>,
        next_id: RefCell<u128>,
        writes: RefCell<usize>,
    }

    impl ProgressService for Ledger {
        async fn get_progress_logs(
            &self,
            owner: UserID,
        ) -> Result<Vec<ProgressLogEntry>, ReadError> {
            Ok(self
                .entries
                .borrow()
                .values()
                .filter(|e| e.owner == owner)
                .cloned()
                .collect())
        }

        async fn create_progress_log(
            &self,
            entry: ProgressLogEntry,
        ) -> Result<ProgressLogEntry, CreateError> {
            *self.next_id.borrow_mut() += 1;
            *self.writes.borrow_mut() += 1;
            let entry = ProgressLogEntry {
                id: (*self.next_id.borrow()).into(),
                ..entry
            };
            self.entries.borrow_mut().insert(entry.id, entry.clone());
            Ok(entry)
        }

        async fn replace_progress_log(
            &self,
            entry: ProgressLogEntry,
        ) -> Result<ProgressLogEntry, UpdateError> {
            *self.writes.borrow_mut() += 1;
            match self.entries.borrow_mut().get_mut(&entry.id) {
                Some(stored) => {
                    *stored = entry.clone();
                    Ok(entry)
                }
                None => Err(UpdateError::NotFound),
            }
        }

        async fn delete_progress_log(
            &self,
            _: UserID,
            id: ProgressLogID,
        ) -> Result<ProgressLogID, DeleteError> {
            self.entries.borrow_mut().remove(&id);
            Ok(id)
        }
    }

    #[rstest]
    #[case(Load::Bodyweight, 10, 10.0)]
    #[case(Load::Weighted(Weight(50.0)), 8, 400.0)]
    #[case(Load::Weighted(Weight(62.5)), 3, 187.5)]
    #[case(Load::Weighted(Weight(0.1)), 3, 0.1 * 3.0)]
    fn test_load_volume_load(#[case] load: Load, #[case] reps: u32, #[case] expected: f64) {
        assert_eq!(load.volume_load(Reps(reps)), expected);
    }

    #[rstest]
    #[case(10.0, 400.0, "3900.00")]
    #[case(400.0, 400.0, "0.00")]
    #[case(400.0, 300.0, "-25.00")]
    #[case(300.0, 400.0, "33.33")]
    #[case(3.0, 2.0, "-33.33")]
    #[case(0.0, 50.0, "100.00")]
    #[case(100_000.0, 99_999.999, "0.00")]
    fn test_percent_change_between(
        #[case] previous: f64,
        #[case] current: f64,
        #[case] expected: &str,
    ) {
        assert_eq!(PercentChange::between(previous, current).to_string(), expected);
    }

    #[test]
    fn test_percent_change_initial() {
        assert_eq!(PercentChange::INITIAL.to_string(), "100.00");
        assert_approx_eq!(*PercentChange::new(12.3456), 12.35);
        assert_eq!(
            PercentChange::try_from("3900.00").unwrap(),
            PercentChange(3900.0)
        );
        assert!(PercentChange::try_from("x").is_err());
    }

    #[rstest]
    #[case("8", Ok(Reps(8)))]
    #[case(" 12 ", Ok(Reps(12)))]
    #[case("0", Err(RepsError::NotPositive))]
    #[case("-1", Err(RepsError::ParseError))]
    #[case("1.5", Err(RepsError::ParseError))]
    fn test_reps_try_from(#[case] value: &str, #[case] expected: Result<Reps, RepsError>) {
        assert_eq!(Reps::try_from(value), expected);
    }

    #[rstest]
    #[case("50", Ok(Weight(50.0)))]
    #[case("62,5", Ok(Weight(62.5)))]
    #[case("0", Err(WeightError::NotPositive))]
    #[case("-5", Err(WeightError::NotPositive))]
    #[case("inf", Err(WeightError::NotPositive))]
    #[case("heavy", Err(WeightError::ParseError))]
    fn test_weight_try_from(#[case] value: &str, #[case] expected: Result<Weight, WeightError>) {
        assert_eq!(Weight::try_from(value), expected);
    }

    #[test]
    fn test_load_display() {
        assert_eq!(Load::Bodyweight.to_string(), "Bodyweight");
        assert_eq!(Load::Weighted(Weight(62.5)).to_string(), "62.5");
    }

    #[rstest]
    #[case::empty_exercise("", 10, false, Some(50.0), "exercise")]
    #[case::blank_exercise("  ", 10, true, None, "exercise")]
    #[case::zero_repetitions("Squat", 0, true, None, "repetitions")]
    #[case::missing_weight("Squat", 10, false, None, "weight")]
    #[case::zero_weight("Squat", 10, false, Some(0.0), "weight")]
    #[case::negative_weight("Squat", 10, false, Some(-20.0), "weight")]
    #[case::infinite_volume_load("Squat", 10, false, Some(1e308), "weight")]
    #[tokio::test]
    async fn test_record_attempt_validation(
        #[case] exercise: &str,
        #[case] repetitions: u32,
        #[case] bodyweight: bool,
        #[case] weight: Option<f64>,
        #[case] field: &str,
    ) {
        let ledger = Ledger::default();

        let result = ledger
            .record_attempt(ALICE.into(), exercise, repetitions, bodyweight, weight)
            .await;

        assert!(matches!(
            result,
            Err(RecordError::Validation(ref err)) if err.field() == Some(field)
        ));
        assert_eq!(*ledger.writes.borrow(), 0);
        assert!(ledger.entries.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_record_attempt_bodyweight_ignores_weight() {
        let ledger = Ledger::default();

        let entry = ledger
            .record_attempt(ALICE.into(), "Pull-up", 5, true, Some(-1.0))
            .await
            .unwrap();

        assert_eq!(entry.current_load, Load::Bodyweight);
    }

    #[tokio::test]
    async fn test_record_attempt_first() {
        let ledger = Ledger::default();

        let entry = ledger
            .record_attempt(ALICE.into(), " Squat ", 5, false, Some(100.0))
            .await
            .unwrap();

        assert_eq!(
            entry,
            ProgressLogEntry {
                id: 1.into(),
                owner: ALICE.into(),
                exercise: Name::new("Squat").unwrap(),
                previous_load: None,
                current_load: Load::Weighted(Weight(100.0)),
                repetitions: Reps(5),
                percent_change: PercentChange::INITIAL,
                recorded_at: *TODAY,
            }
        );
        assert_eq!(entry.previous_load_label(), "0");
        assert_eq!(entry.percent_change.to_string(), "100.00");
    }

    #[tokio::test]
    async fn test_record_attempt_identical_inputs() {
        let ledger = Ledger::default();

        ledger
            .record_attempt(ALICE.into(), "Deadlift", 5, false, Some(120.0))
            .await
            .unwrap();
        let entry = ledger
            .record_attempt(ALICE.into(), "Deadlift", 5, false, Some(120.0))
            .await
            .unwrap();

        assert_eq!(entry.id, 1.into());
        assert_eq!(entry.previous_load, Some(Load::Weighted(Weight(120.0))));
        assert_eq!(entry.previous_load_label(), "120");
        assert_eq!(entry.percent_change.to_string(), "0.00");
        assert_eq!(ledger.entries.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_record_attempt_huge_weight() {
        let ledger = Ledger::default();

        ledger
            .record_attempt(ALICE.into(), "Squat", 10, false, Some(1e307))
            .await
            .unwrap();
        let entry = ledger
            .record_attempt(ALICE.into(), "Squat", 10, false, Some(1e307))
            .await
            .unwrap();

        assert_eq!(entry.percent_change.to_string(), "0.00");
    }

    #[test]
    fn test_percent_change_between_saturates() {
        let change = PercentChange::between(0.1, 1e308);

        assert!(change.is_finite());
        assert_eq!(*change, f64::MAX);
    }

    #[tokio::test]
    async fn test_record_attempt_bodyweight_then_weighted() {
        let ledger = Ledger::default();

        let first = ledger
            .record_attempt(ALICE.into(), "Squat", 10, true, None)
            .await
            .unwrap();

        assert_eq!(first.previous_load_label(), "0");
        assert_eq!(first.current_load.to_string(), "Bodyweight");
        assert_eq!(first.repetitions, Reps(10));
        assert_eq!(first.percent_change.to_string(), "100.00");

        let second = ledger
            .record_attempt(ALICE.into(), "Squat", 8, false, Some(50.0))
            .await
            .unwrap();

        assert_eq!(second.volume_load(), 400.0);
        assert_eq!(second.previous_load, Some(Load::Bodyweight));
        assert_eq!(second.current_load, Load::Weighted(Weight(50.0)));
        assert_eq!(second.repetitions, Reps(8));
        assert_eq!(second.percent_change.to_string(), "3900.00");
        assert_eq!(ledger.entries.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_record_attempt_weighted_then_bodyweight() {
        let ledger = Ledger::default();

        ledger
            .record_attempt(ALICE.into(), "Dip", 10, false, Some(20.0))
            .await
            .unwrap();
        let entry = ledger
            .record_attempt(ALICE.into(), "Dip", 20, true, None)
            .await
            .unwrap();

        assert_eq!(entry.previous_load, Some(Load::Weighted(Weight(20.0))));
        assert_eq!(entry.percent_change.to_string(), "-90.00");
    }

    #[tokio::test]
    async fn test_record_attempt_is_isolated_per_owner_and_exercise() {
        let ledger = Ledger::default();

        ledger
            .record_attempt(ALICE.into(), "Squat", 5, false, Some(100.0))
            .await
            .unwrap();
        let bob = ledger
            .record_attempt(BOB.into(), "Squat", 5, false, Some(60.0))
            .await
            .unwrap();
        let bench = ledger
            .record_attempt(ALICE.into(), "Bench Press", 5, false, Some(80.0))
            .await
            .unwrap();

        assert_eq!(bob.percent_change, PercentChange::INITIAL);
        assert_eq!(bench.percent_change, PercentChange::INITIAL);
        assert_eq!(ledger.get_progress_logs(ALICE.into()).await.unwrap().len(), 2);
        assert!(
            ledger
                .get_progress_logs(BOB.into())
                .await
                .unwrap()
                .iter()
                .all(|e| e.owner == BOB.into())
        );
    }

    #[tokio::test]
    async fn test_record_attempt_after_delete_starts_over() {
        let ledger = Ledger::default();

        let entry = ledger
            .record_attempt(ALICE.into(), "Squat", 5, false, Some(100.0))
            .await
            .unwrap();
        ledger
            .delete_progress_log(ALICE.into(), entry.id)
            .await
            .unwrap();

        assert!(ledger.get_progress_logs(ALICE.into()).await.unwrap().is_empty());

        let entry = ledger
            .record_attempt(ALICE.into(), "Squat", 5, false, Some(110.0))
            .await
            .unwrap();

        assert_eq!(entry.previous_load, None);
        assert_eq!(entry.percent_change, PercentChange::INITIAL);
    }

    #[test]
    fn test_advance_keeps_identity() {
        let entry = ProgressLogEntry {
            id: 3.into(),
            ..ProgressLogEntry::first(
                ALICE.into(),
                Attempt {
                    exercise: Name::new("Row").unwrap(),
                    load: Load::Weighted(Weight(40.0)),
                    repetitions: Reps(10),
                },
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            )
        };

        let advanced = entry.advance(
            Attempt {
                exercise: Name::new("Row").unwrap(),
                load: Load::Weighted(Weight(45.0)),
                repetitions: Reps(10),
            },
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
        );

        assert_eq!(advanced.id, 3.into());
        assert_eq!(advanced.owner, ALICE.into());
        assert_eq!(advanced.percent_change.to_string(), "12.50");
        assert_eq!(
            advanced.recorded_at,
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
        );
    }
}
