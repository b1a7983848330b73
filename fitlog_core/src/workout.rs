//! Workout logging.
//!
//! One submission becomes a parent [`Workout`], one [`Exercise`] row per
//! exercise, and a [`PersonalRecord`] row per exercise taken from its
//! heaviest set. Writes happen in that order; if any of them fails the rows
//! already written for the submission are deleted again before the error is
//! returned.

use crate::store::{self, Order, Query, Record, TableStore};
use crate::{Error, Exercise, ExerciseSet, PersonalRecord, RecordId, Result, User, Workout};
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// One exercise as entered: a name and its sets in order
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseInput {
    pub name: String,
    pub sets: Vec<ExerciseSet>,
}

impl ExerciseInput {
    pub fn new(name: impl Into<String>, sets: Vec<ExerciseSet>) -> Self {
        Self {
            name: name.into(),
            sets,
        }
    }
}

/// A complete workout form submission
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkoutSubmission {
    pub notes: Option<String>,
    pub exercises: Vec<ExerciseInput>,
}

impl WorkoutSubmission {
    /// Check every exercise before anything is written
    pub fn validate(&self) -> Result<()> {
        if self.exercises.is_empty() {
            return Err(Error::Validation("Add at least one exercise".into()));
        }

        for exercise in &self.exercises {
            if exercise.name.trim().is_empty() || exercise.sets.is_empty() {
                return Err(Error::Validation(
                    "All exercises must have a name and valid sets".into(),
                ));
            }
            for set in &exercise.sets {
                if set.reps <= 0 {
                    return Err(Error::Validation(
                        "All exercises must have a name and valid sets".into(),
                    ));
                }
                if !set.weight.is_finite() || set.weight < 0.0 {
                    return Err(Error::Validation(format!(
                        "Weight for {} must be zero or more",
                        exercise.name.trim()
                    )));
                }
            }
        }

        Ok(())
    }
}

/// The set with the greatest weight; the first one wins ties
pub fn heaviest_set(sets: &[ExerciseSet]) -> Option<ExerciseSet> {
    sets.iter().copied().fold(None, |best, set| match best {
        Some(b) if set.weight <= b.weight => Some(b),
        _ => Some(set),
    })
}

/// Rows a submission turns into, before any ids exist
#[derive(Clone, Debug, PartialEq)]
pub struct WorkoutPlan {
    pub workout: Workout,
    pub exercises: Vec<ExerciseInput>,
    pub records: Vec<PersonalRecord>,
}

impl WorkoutPlan {
    /// Exercise rows attached to a stored workout
    pub fn exercise_rows(&self, workout_id: RecordId) -> Vec<Exercise> {
        self.exercises
            .iter()
            .map(|e| Exercise {
                id: None,
                workout_id,
                name: e.name.clone(),
                sets: e.sets.clone(),
            })
            .collect()
    }
}

/// Validate a submission and split it into workout, exercise and PR rows
pub fn decompose(user: &User, today: NaiveDate, submission: &WorkoutSubmission) -> Result<WorkoutPlan> {
    submission.validate()?;

    let notes = submission
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from);

    let exercises: Vec<ExerciseInput> = submission
        .exercises
        .iter()
        .map(|e| ExerciseInput::new(e.name.trim(), e.sets.clone()))
        .collect();

    let records = exercises
        .iter()
        .filter_map(|e| {
            heaviest_set(&e.sets)
                .filter(|s| s.weight > 0.0)
                .map(|s| PersonalRecord {
                    id: None,
                    user_id: user.id.clone(),
                    exercise_name: e.name.clone(),
                    weight: s.weight,
                    reps: s.reps,
                    date: today,
                })
        })
        .collect();

    Ok(WorkoutPlan {
        workout: Workout {
            id: None,
            user_id: user.id.clone(),
            date: today,
            notes,
        },
        exercises,
        records,
    })
}

/// Everything written for one submission
#[derive(Clone, Debug, PartialEq)]
pub struct LoggedWorkout {
    pub workout: Workout,
    pub exercises: Vec<Exercise>,
    pub records: Vec<PersonalRecord>,
}

/// Rows written so far, so a failed submission can be undone
#[derive(Default)]
struct WriteLog {
    written: Vec<(&'static str, RecordId)>,
}

impl WriteLog {
    fn track<T: Record>(&mut self, record: &T) -> Result<RecordId> {
        let id = record
            .id()
            .ok_or_else(|| Error::Store(format!("{} insert returned no id", T::TABLE)))?;
        self.written.push((T::TABLE, id));
        Ok(id)
    }

    /// Delete tracked rows newest first; failures are logged and skipped
    fn undo<S: TableStore + ?Sized>(self, store: &mut S) {
        for (table, id) in self.written.into_iter().rev() {
            match store.delete(table, &Query::new().eq("id", id)) {
                Ok(_) => tracing::debug!("Rolled back {} row {}", table, id),
                Err(e) => tracing::warn!("Failed to roll back {} row {}: {}", table, id, e),
            }
        }
    }
}

fn write_plan<S: TableStore + ?Sized>(
    store: &mut S,
    plan: &WorkoutPlan,
    log: &mut WriteLog,
) -> Result<LoggedWorkout> {
    let workout = store::insert(store, &plan.workout)?;
    let workout_id = log.track(&workout)?;

    let mut exercises = Vec::with_capacity(plan.exercises.len());
    for row in plan.exercise_rows(workout_id) {
        let stored = store::insert(store, &row)?;
        log.track(&stored)?;
        exercises.push(stored);
    }

    let mut records = Vec::with_capacity(plan.records.len());
    for row in &plan.records {
        let stored = store::insert(store, row)?;
        log.track(&stored)?;
        records.push(stored);
    }

    Ok(LoggedWorkout {
        workout,
        exercises,
        records,
    })
}

/// Validate and persist a workout submission for `today`
pub fn log_workout<S: TableStore + ?Sized>(
    store: &mut S,
    user: &User,
    submission: &WorkoutSubmission,
    today: NaiveDate,
) -> Result<LoggedWorkout> {
    let plan = decompose(user, today, submission)?;

    let mut log = WriteLog::default();
    match write_plan(store, &plan, &mut log) {
        Ok(logged) => {
            tracing::info!(
                "Logged workout {:?} for {}: {} exercises, {} PR rows",
                logged.workout.id,
                user.id,
                logged.exercises.len(),
                logged.records.len()
            );
            Ok(logged)
        }
        Err(e) => {
            tracing::error!("Workout submission failed for {}: {}", user.id, e);
            log.undo(store);
            Err(e)
        }
    }
}

/// Most recent workouts, newest first; same-day sessions by id
pub fn recent_workouts<S: TableStore + ?Sized>(
    store: &S,
    user: &User,
    limit: usize,
) -> Result<Vec<Workout>> {
    store::select(
        store,
        &Query::new()
            .eq("user_id", user.id.as_str())
            .order_by("date", Order::Desc)
            .then_by("id", Order::Desc)
            .limit(limit),
    )
}

/// One of the user's workouts together with its exercises
pub fn workout_details<S: TableStore + ?Sized>(
    store: &S,
    user: &User,
    workout_id: RecordId,
) -> Result<(Workout, Vec<Exercise>)> {
    let workout = store::select::<Workout, _>(
        store,
        &Query::new()
            .eq("id", workout_id)
            .eq("user_id", user.id.as_str()),
    )?
    .into_iter()
    .next()
    .ok_or(Error::NotFound {
        table: Workout::TABLE,
        id: workout_id,
    })?;

    let exercises = store::select(
        store,
        &Query::new()
            .eq("workout_id", workout_id)
            .order_by("id", Order::Asc),
    )?;

    Ok((workout, exercises))
}

// ============================================================================
// Set notation
// ============================================================================

impl FromStr for ExerciseSet {
    type Err = Error;

    /// `REPSxWEIGHT` (e.g. `8x60`, `5x102.5`); bare `REPS` means bodyweight
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (reps, weight) = match s.split_once(|c: char| c == 'x' || c == 'X' || c == '@') {
            Some((reps, weight)) => (reps.trim(), weight.trim()),
            None => (s, "0"),
        };

        let reps = reps
            .parse::<i32>()
            .map_err(|_| Error::Validation(format!("Invalid reps in set {:?}", s)))?;
        let weight = weight
            .parse::<f64>()
            .map_err(|_| Error::Validation(format!("Invalid weight in set {:?}", s)))?;

        Ok(ExerciseSet { reps, weight })
    }
}

/// Parse a comma-separated list of sets, e.g. `8x60,6x70`
pub fn parse_sets(s: &str) -> Result<Vec<ExerciseSet>> {
    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}

// ============================================================================
// Exercise templates
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MuscleGroup {
    Chest,
    Back,
    Legs,
    Shoulders,
    Arms,
}

impl MuscleGroup {
    pub const ALL: [MuscleGroup; 5] = [
        MuscleGroup::Chest,
        MuscleGroup::Back,
        MuscleGroup::Legs,
        MuscleGroup::Shoulders,
        MuscleGroup::Arms,
    ];

    /// Common exercises for the group
    pub fn templates(&self) -> &'static [&'static str] {
        match self {
            MuscleGroup::Chest => &[
                "Bench Press",
                "Incline Bench Press",
                "Chest Fly",
                "Push-Up",
                "Dumbbell Press",
            ],
            MuscleGroup::Back => &[
                "Pull-Up",
                "Lat Pulldown",
                "Barbell Row",
                "Dumbbell Row",
                "Deadlift",
            ],
            MuscleGroup::Legs => &["Squat", "Leg Press", "Leg Extension", "Leg Curl", "Calf Raise"],
            MuscleGroup::Shoulders => &[
                "Overhead Press",
                "Lateral Raise",
                "Front Raise",
                "Face Pull",
                "Shrug",
            ],
            MuscleGroup::Arms => &[
                "Bicep Curl",
                "Tricep Extension",
                "Hammer Curl",
                "Skull Crusher",
                "Chin-Up",
            ],
        }
    }
}

impl fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MuscleGroup::Chest => "chest",
            MuscleGroup::Back => "back",
            MuscleGroup::Legs => "legs",
            MuscleGroup::Shoulders => "shoulders",
            MuscleGroup::Arms => "arms",
        };
        f.write_str(name)
    }
}

impl FromStr for MuscleGroup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MuscleGroup::ALL
            .into_iter()
            .find(|g| g.to_string() == s.trim().to_lowercase())
            .ok_or_else(|| Error::Validation(format!("Unknown muscle group: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Row};
    use serde_json::Value;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 15).unwrap()
    }

    fn user() -> User {
        User::with_id("lifter")
    }

    fn bench_submission() -> WorkoutSubmission {
        WorkoutSubmission {
            notes: Some("Felt strong".into()),
            exercises: vec![ExerciseInput::new(
                "Bench Press",
                vec![ExerciseSet::new(8, 60.0), ExerciseSet::new(6, 70.0)],
            )],
        }
    }

    /// Wraps a store and fails the nth insert into one table
    struct FlakyStore {
        inner: MemoryStore,
        table: &'static str,
        fail_on: usize,
        seen: usize,
        fail_deletes: bool,
    }

    impl FlakyStore {
        fn new(table: &'static str, fail_on: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                table,
                fail_on,
                seen: 0,
                fail_deletes: false,
            }
        }

        /// Every delete fails too, so nothing can be rolled back
        fn without_deletes(mut self) -> Self {
            self.fail_deletes = true;
            self
        }
    }

    impl TableStore for FlakyStore {
        fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
            self.inner.select(table, query)
        }

        fn insert(&mut self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
            if table == self.table {
                self.seen += 1;
                if self.seen == self.fail_on {
                    return Err(Error::Store("simulated outage".into()));
                }
            }
            self.inner.insert(table, rows)
        }

        fn delete(&mut self, table: &str, query: &Query) -> Result<usize> {
            if self.fail_deletes {
                return Err(Error::Store("rollback unavailable".into()));
            }
            self.inner.delete(table, query)
        }
    }

    #[test]
    fn test_single_exercise_submission() {
        crate::logging::init_test();
        let mut db = MemoryStore::new();

        let logged = log_workout(&mut db, &user(), &bench_submission(), today()).unwrap();

        assert_eq!(db.len("workouts"), 1);
        assert_eq!(db.len("exercises"), 1);
        assert_eq!(db.len("personal_records"), 1);

        let workout_id = logged.workout.id.unwrap();
        assert_eq!(logged.workout.notes.as_deref(), Some("Felt strong"));
        assert_eq!(logged.exercises[0].workout_id, workout_id);
        assert_eq!(logged.exercises[0].sets.len(), 2);

        let pr = &logged.records[0];
        assert_eq!(pr.exercise_name, "Bench Press");
        assert_eq!(pr.weight, 70.0);
        assert_eq!(pr.reps, 6);
        assert_eq!(pr.date, today());
    }

    #[test]
    fn test_sets_are_stored_as_structured_list() {
        let mut db = MemoryStore::new();
        log_workout(&mut db, &user(), &bench_submission(), today()).unwrap();

        let rows = db.select("exercises", &Query::new()).unwrap();
        let sets = rows[0]["sets"].as_array().unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[1]["reps"], Value::from(6));
    }

    #[test]
    fn test_heaviest_set_first_occurrence_wins() {
        let sets = vec![
            ExerciseSet::new(5, 100.0),
            ExerciseSet::new(3, 110.0),
            ExerciseSet::new(8, 110.0),
        ];
        assert_eq!(heaviest_set(&sets), Some(ExerciseSet::new(3, 110.0)));
        assert_eq!(heaviest_set(&[]), None);
    }

    #[test]
    fn test_bodyweight_exercise_writes_no_record() {
        let mut db = MemoryStore::new();
        let submission = WorkoutSubmission {
            notes: Some("   ".into()),
            exercises: vec![
                ExerciseInput::new("Pull-Up", vec![ExerciseSet::new(10, 0.0)]),
                ExerciseInput::new("Squat", vec![ExerciseSet::new(5, 100.0)]),
            ],
        };

        let logged = log_workout(&mut db, &user(), &submission, today()).unwrap();
        assert_eq!(logged.workout.notes, None);
        assert_eq!(logged.exercises.len(), 2);
        assert_eq!(logged.records.len(), 1);
        assert_eq!(logged.records[0].exercise_name, "Squat");
    }

    #[test]
    fn test_invalid_submissions_write_nothing() {
        let invalid = vec![
            WorkoutSubmission::default(),
            WorkoutSubmission {
                notes: None,
                exercises: vec![ExerciseInput::new("", vec![ExerciseSet::new(5, 50.0)])],
            },
            WorkoutSubmission {
                notes: None,
                exercises: vec![
                    ExerciseInput::new("Squat", vec![ExerciseSet::new(5, 100.0)]),
                    ExerciseInput::new("Row", vec![ExerciseSet::new(0, 50.0)]),
                ],
            },
            WorkoutSubmission {
                notes: None,
                exercises: vec![ExerciseInput::new("Row", vec![ExerciseSet::new(-2, 50.0)])],
            },
            WorkoutSubmission {
                notes: None,
                exercises: vec![ExerciseInput::new("Row", vec![])],
            },
            WorkoutSubmission {
                notes: None,
                exercises: vec![ExerciseInput::new("Row", vec![ExerciseSet::new(5, -10.0)])],
            },
        ];

        for submission in invalid {
            let mut db = MemoryStore::new();
            let err = log_workout(&mut db, &user(), &submission, today()).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{:?}", submission);
            assert!(db.is_empty("workouts"));
            assert!(db.is_empty("exercises"));
            assert!(db.is_empty("personal_records"));
        }
    }

    #[test]
    fn test_failed_exercise_insert_rolls_back_workout() {
        let mut db = FlakyStore::new("exercises", 2);
        let mut submission = bench_submission();
        submission
            .exercises
            .push(ExerciseInput::new("Squat", vec![ExerciseSet::new(5, 100.0)]));

        let err = log_workout(&mut db, &user(), &submission, today()).unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert!(db.inner.is_empty("workouts"));
        assert!(db.inner.is_empty("exercises"));
        assert!(db.inner.is_empty("personal_records"));
    }

    #[test]
    fn test_failed_record_insert_rolls_back_everything() {
        let mut db = FlakyStore::new("personal_records", 1);

        let err = log_workout(&mut db, &user(), &bench_submission(), today()).unwrap_err();
        assert_eq!(err.user_message(), "Something went wrong. Please try again.");
        assert!(db.inner.is_empty("workouts"));
        assert!(db.inner.is_empty("exercises"));
        assert!(db.inner.is_empty("personal_records"));
    }

    #[test]
    fn test_failed_rollback_surfaces_original_error() {
        crate::logging::init_test();
        let mut db = FlakyStore::new("exercises", 1).without_deletes();

        let err = log_workout(&mut db, &user(), &bench_submission(), today()).unwrap_err();
        match err {
            Error::Store(msg) => assert_eq!(msg, "simulated outage"),
            other => panic!("unexpected error: {:?}", other),
        }
        // The workout row could not be removed and is left behind
        assert_eq!(db.inner.len("workouts"), 1);
        assert!(db.inner.is_empty("exercises"));
    }

    #[test]
    fn test_recent_workouts_newest_first() {
        let mut db = MemoryStore::new();
        for day in [3, 9, 1, 7] {
            let date = NaiveDate::from_ymd_opt(2024, 4, day).unwrap();
            log_workout(&mut db, &user(), &bench_submission(), date).unwrap();
        }
        log_workout(&mut db, &User::with_id("someone-else"), &bench_submission(), today()).unwrap();

        let recent = recent_workouts(&db, &user(), 3).unwrap();
        let days: Vec<_> = recent.iter().map(|w| w.date.to_string()).collect();
        assert_eq!(days, vec!["2024-04-09", "2024-04-07", "2024-04-03"]);
    }

    #[test]
    fn test_recent_workouts_same_day_latest_first() {
        let mut db = MemoryStore::new();
        let morning = log_workout(&mut db, &user(), &bench_submission(), today()).unwrap();
        let evening = log_workout(&mut db, &user(), &bench_submission(), today()).unwrap();

        let recent = recent_workouts(&db, &user(), 2).unwrap();
        let ids: Vec<_> = recent.iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![evening.workout.id, morning.workout.id]);
    }

    #[test]
    fn test_workout_details_scoped_to_owner() {
        let mut db = MemoryStore::new();
        let logged = log_workout(&mut db, &user(), &bench_submission(), today()).unwrap();
        let id = logged.workout.id.unwrap();

        let (workout, exercises) = workout_details(&db, &user(), id).unwrap();
        assert_eq!(workout, logged.workout);
        assert_eq!(exercises, logged.exercises);

        assert!(matches!(
            workout_details(&db, &User::with_id("intruder"), id),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_parse_sets() {
        let sets = parse_sets("8x60, 6X70,5@102.5,12").unwrap();
        assert_eq!(
            sets,
            vec![
                ExerciseSet::new(8, 60.0),
                ExerciseSet::new(6, 70.0),
                ExerciseSet::new(5, 102.5),
                ExerciseSet::new(12, 0.0),
            ]
        );
        assert!(parse_sets("eightx60").is_err());
        assert!(parse_sets("8xheavy").is_err());
    }

    #[test]
    fn test_muscle_group_templates() {
        let legs: MuscleGroup = "Legs".parse().unwrap();
        assert_eq!(legs.templates()[0], "Squat");
        assert!(MuscleGroup::ALL.iter().all(|g| g.templates().len() == 5));
        assert!("glutes".parse::<MuscleGroup>().is_err());
    }
}
