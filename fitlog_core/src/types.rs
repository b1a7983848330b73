//! Core domain types for fitlog.
//!
//! Every persisted record is a flat row owned by a user. Dates are plain
//! calendar days; ids are generated by the table store on insert and are
//! `None` until then.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::store::Record;
use crate::Error;

/// Store-generated row identifier
pub type RecordId = i64;

// ============================================================================
// Session Types
// ============================================================================

/// The authenticated user as handed over by the auth collaborator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// A user known only by id
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
            created_at: None,
        }
    }

    /// Name to greet the user with: their name, else the local part of
    /// their email, else their id.
    pub fn display_name(&self) -> &str {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name;
        }
        if let Some(email) = self.email.as_deref() {
            if let Some(local) = email.split('@').next().filter(|l| !l.is_empty()) {
                return local;
            }
        }
        &self.id
    }
}

/// An authenticated session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user: User,
}

/// Authentication state of the current view
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewState {
    /// Session lookup still in flight
    Pending,
    /// No signed-in user
    Anonymous,
    Authenticated(User),
}

impl ViewState {
    pub fn from_session(session: Option<Session>) -> Self {
        match session {
            Some(s) => ViewState::Authenticated(s.user),
            None => ViewState::Anonymous,
        }
    }

    /// The signed-in user, or `Error::MissingSession`
    pub fn require_user(&self) -> Result<&User, Error> {
        match self {
            ViewState::Authenticated(user) => Ok(user),
            ViewState::Pending | ViewState::Anonymous => Err(Error::MissingSession),
        }
    }
}

// ============================================================================
// Nutrition
// ============================================================================

/// One logged food item
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FoodEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub user_id: String,
    pub name: String,
    pub calories: i32,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub date: NaiveDate,
}

// ============================================================================
// Strength Training
// ============================================================================

/// A logged training session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Workout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub user_id: String,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

/// A single set: repetitions at a given load
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSet {
    pub reps: i32,
    pub weight: f64,
}

impl ExerciseSet {
    pub fn new(reps: i32, weight: f64) -> Self {
        Self { reps, weight }
    }
}

impl fmt::Display for ExerciseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.reps, self.weight)
    }
}

/// An exercise performed within a workout, with all of its sets
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub workout_id: RecordId,
    pub name: String,
    pub sets: Vec<ExerciseSet>,
}

/// Heaviest set of one exercise in one workout
///
/// Rows accumulate over time; the current best per exercise is derived by
/// [`crate::records::best_per_exercise`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PersonalRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub user_id: String,
    pub exercise_name: String,
    pub weight: f64,
    pub reps: i32,
    pub date: NaiveDate,
}

// ============================================================================
// Profile
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FitnessGoal {
    LoseFat,
    GainMuscle,
    Maintain,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrainingPreference {
    Strength,
    Cardio,
    Hiit,
    Yoga,
    Calisthenics,
    Crossfit,
    Other,
}

/// Implements `FromStr`/`Display` over the snake_case names used on disk
macro_rules! snake_case_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Error> {
                let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
                match normalized.as_str() {
                    $($name => Ok($ty::$variant),)+
                    other => Err(Error::Validation(format!(
                        "Unknown {}: {}",
                        stringify!($ty),
                        other
                    ))),
                }
            }
        }
    };
}

snake_case_enum!(FitnessGoal {
    LoseFat => "lose_fat",
    GainMuscle => "gain_muscle",
    Maintain => "maintain",
});

snake_case_enum!(ActivityLevel {
    Sedentary => "sedentary",
    Light => "light",
    Moderate => "moderate",
    Active => "active",
    VeryActive => "very_active",
});

snake_case_enum!(TrainingPreference {
    Strength => "strength",
    Cardio => "cardio",
    Hiit => "hiit",
    Yoga => "yoga",
    Calisthenics => "calisthenics",
    Crossfit => "crossfit",
    Other => "other",
});

/// Answers collected by onboarding; one per user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub user_id: String,
    pub goal: FitnessGoal,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub target_weight: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub preferred_training: Option<TrainingPreference>,
    #[serde(default)]
    pub onboarding_completed: bool,
}

// ============================================================================
// Simple Logs
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeightLog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub user_id: String,
    pub weight: f64,
    pub body_fat_percentage: Option<f64>,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CardioLog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub user_id: String,
    /// running, cycling, swimming, ...
    pub kind: String,
    /// Minutes
    pub duration: i32,
    pub distance: Option<f64>,
    pub calories_burned: Option<i32>,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SupplementLog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub user_id: String,
    pub name: String,
    pub dosage: Option<String>,
    pub time_taken: NaiveTime,
    pub date: NaiveDate,
}

/// Daily sleep and mood check-in
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WellbeingLog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub user_id: String,
    pub date: NaiveDate,
    pub sleep_hours: Option<f64>,
    /// 1-5
    pub sleep_quality: Option<u8>,
    /// 1-5
    pub mood: u8,
    /// 1-5
    pub energy: u8,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub user_id: String,
    /// workout, meal, supplement, sleep, ...
    pub kind: String,
    pub title: String,
    pub message: Option<String>,
    pub time: NaiveTime,
    /// Days of week, 0 = Sunday
    pub days: Vec<u8>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

// ============================================================================
// Table bindings
// ============================================================================

macro_rules! impl_record {
    ($($ty:ty => $table:literal),+ $(,)?) => {
        $(
            impl Record for $ty {
                const TABLE: &'static str = $table;

                fn id(&self) -> Option<RecordId> {
                    self.id
                }
            }
        )+
    };
}

impl_record!(
    FoodEntry => "food_entries",
    Workout => "workouts",
    Exercise => "exercises",
    PersonalRecord => "personal_records",
    UserProfile => "user_profiles",
    WeightLog => "weight_logs",
    CardioLog => "cardio_logs",
    SupplementLog => "supplement_logs",
    WellbeingLog => "wellbeing_logs",
    Reminder => "reminders",
);
