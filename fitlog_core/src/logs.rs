//! Simple dated logs: weigh-ins, cardio, supplements and daily wellbeing.
//!
//! These are plain create/list/delete records with required-field and
//! range checks; no derived state.

use crate::store::{self, Order, Query, Record, TableStore};
use crate::{
    CardioLog, Error, RecordId, Result, SupplementLog, User, WeightLog, WellbeingLog,
};
use chrono::{NaiveDate, NaiveTime};
use std::str::FromStr;

/// A user's rows of one log table, newest day first
pub fn list<T, S>(store: &S, user: &User) -> Result<Vec<T>>
where
    T: Record,
    S: TableStore + ?Sized,
{
    store::select(
        store,
        &Query::new()
            .eq("user_id", user.id.as_str())
            .order_by("date", Order::Desc)
            .then_by("id", Order::Desc),
    )
}

/// Delete one of the user's log rows
pub fn delete<T, S>(store: &mut S, user: &User, id: RecordId) -> Result<()>
where
    T: Record,
    S: TableStore + ?Sized,
{
    store::delete_owned::<T, S>(store, &user.id, id)?;
    tracing::info!("Deleted {} row {} for {}", T::TABLE, id, user.id);
    Ok(())
}

fn blank_to_none(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

// ============================================================================
// Weight
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct WeightInput {
    pub weight: f64,
    pub body_fat_percentage: Option<f64>,
    pub notes: Option<String>,
}

pub fn log_weight<S: TableStore + ?Sized>(
    store: &mut S,
    user: &User,
    input: &WeightInput,
    today: NaiveDate,
) -> Result<WeightLog> {
    if !input.weight.is_finite() || input.weight <= 0.0 {
        return Err(Error::Validation("Weight must be positive".into()));
    }
    if let Some(bf) = input.body_fat_percentage {
        if !(0.0..=100.0).contains(&bf) {
            return Err(Error::Validation(
                "Body fat percentage must be between 0 and 100".into(),
            ));
        }
    }

    let log = store::insert(
        store,
        &WeightLog {
            id: None,
            user_id: user.id.clone(),
            weight: input.weight,
            body_fat_percentage: input.body_fat_percentage,
            date: today,
            notes: blank_to_none(&input.notes),
        },
    )?;
    tracing::info!("Logged weight {} for {}", log.weight, user.id);
    Ok(log)
}

// ============================================================================
// Cardio
// ============================================================================

/// Effort level used for the calorie estimate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    /// Metabolic equivalent of task
    pub fn met(&self) -> f64 {
        match self {
            Intensity::Low => 3.5,
            Intensity::Medium => 7.0,
            Intensity::High => 10.0,
        }
    }
}

impl FromStr for Intensity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Intensity::Low),
            "medium" | "moderate" => Ok(Intensity::Medium),
            "high" => Ok(Intensity::High),
            other => Err(Error::Validation(format!("Unknown intensity: {}", other))),
        }
    }
}

/// Estimated calories: MET x body weight (kg) x hours, rounded
pub fn calories_burned(duration_minutes: i32, intensity: Intensity, weight_kg: f64) -> i32 {
    (intensity.met() * weight_kg * (f64::from(duration_minutes) / 60.0)).round() as i32
}

#[derive(Clone, Debug)]
pub struct CardioInput {
    pub kind: String,
    pub duration: Option<i32>,
    pub distance: Option<f64>,
    pub calories_burned: Option<i32>,
    pub notes: Option<String>,
}

impl Default for CardioInput {
    fn default() -> Self {
        Self {
            kind: "running".into(),
            duration: None,
            distance: None,
            calories_burned: None,
            notes: None,
        }
    }
}

pub fn log_cardio<S: TableStore + ?Sized>(
    store: &mut S,
    user: &User,
    input: &CardioInput,
    today: NaiveDate,
) -> Result<CardioLog> {
    let kind = input.kind.trim();
    let duration = match input.duration {
        Some(d) if !kind.is_empty() => d,
        _ => {
            return Err(Error::Validation(
                "Cardio type and duration are required".into(),
            ))
        }
    };
    if duration <= 0 {
        return Err(Error::Validation("Duration must be positive".into()));
    }
    if input.distance.is_some_and(|d| !d.is_finite() || d < 0.0) {
        return Err(Error::Validation("Distance cannot be negative".into()));
    }
    if input.calories_burned.is_some_and(|c| c < 0) {
        return Err(Error::Validation("Calories burned cannot be negative".into()));
    }

    let log = store::insert(
        store,
        &CardioLog {
            id: None,
            user_id: user.id.clone(),
            kind: kind.to_lowercase(),
            duration,
            distance: input.distance,
            calories_burned: input.calories_burned,
            date: today,
            notes: blank_to_none(&input.notes),
        },
    )?;
    tracing::info!("Logged {} min of {} for {}", log.duration, log.kind, user.id);
    Ok(log)
}

// ============================================================================
// Supplements
// ============================================================================

#[derive(Clone, Debug)]
pub struct SupplementInput {
    pub name: String,
    pub dosage: Option<String>,
    pub time_taken: NaiveTime,
}

pub fn log_supplement<S: TableStore + ?Sized>(
    store: &mut S,
    user: &User,
    input: &SupplementInput,
    today: NaiveDate,
) -> Result<SupplementLog> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Supplement name is required".into()));
    }

    let log = store::insert(
        store,
        &SupplementLog {
            id: None,
            user_id: user.id.clone(),
            name: name.to_string(),
            dosage: blank_to_none(&input.dosage),
            time_taken: input.time_taken,
            date: today,
        },
    )?;
    tracing::info!("Logged supplement {:?} for {}", log.name, user.id);
    Ok(log)
}

// ============================================================================
// Sleep & mood
// ============================================================================

#[derive(Clone, Debug)]
pub struct WellbeingInput {
    pub sleep_hours: Option<f64>,
    pub sleep_quality: Option<u8>,
    pub mood: u8,
    pub energy: u8,
    pub notes: Option<String>,
}

impl Default for WellbeingInput {
    fn default() -> Self {
        Self {
            sleep_hours: None,
            sleep_quality: None,
            mood: 4,
            energy: 3,
            notes: None,
        }
    }
}

fn check_scale(label: &str, value: u8) -> Result<()> {
    if (1..=5).contains(&value) {
        Ok(())
    } else {
        Err(Error::Validation(format!("{} must be between 1 and 5", label)))
    }
}

pub fn log_wellbeing<S: TableStore + ?Sized>(
    store: &mut S,
    user: &User,
    input: &WellbeingInput,
    today: NaiveDate,
) -> Result<WellbeingLog> {
    check_scale("Mood", input.mood)?;
    check_scale("Energy", input.energy)?;
    if let Some(q) = input.sleep_quality {
        check_scale("Sleep quality", q)?;
    }
    if let Some(h) = input.sleep_hours {
        if !(0.0..=24.0).contains(&h) {
            return Err(Error::Validation(
                "Sleep hours must be between 0 and 24".into(),
            ));
        }
    }

    let log = store::insert(
        store,
        &WellbeingLog {
            id: None,
            user_id: user.id.clone(),
            date: today,
            sleep_hours: input.sleep_hours,
            sleep_quality: input.sleep_quality,
            mood: input.mood,
            energy: input.energy,
            notes: blank_to_none(&input.notes),
        },
    )?;
    tracing::info!("Logged wellbeing check-in for {}", user.id);
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    #[test]
    fn test_calories_burned_formula() {
        // 7 MET * 70 kg * 0.5 h
        assert_eq!(calories_burned(30, Intensity::Medium, 70.0), 245);
        assert_eq!(calories_burned(45, Intensity::Low, 80.0), 210);
        assert_eq!(calories_burned(0, Intensity::High, 80.0), 0);
        assert_eq!("moderate".parse::<Intensity>().unwrap(), Intensity::Medium);
    }

    #[test]
    fn test_cardio_requires_kind_and_duration() {
        let mut db = MemoryStore::new();
        let user = User::with_id("u1");

        let no_duration = CardioInput::default();
        let no_kind = CardioInput {
            kind: " ".into(),
            duration: Some(20),
            ..Default::default()
        };
        let zero = CardioInput {
            duration: Some(0),
            ..Default::default()
        };
        for input in [no_duration, no_kind, zero] {
            assert!(matches!(
                log_cardio(&mut db, &user, &input, day(1)),
                Err(Error::Validation(_))
            ));
        }
        assert!(db.is_empty("cardio_logs"));

        let ok = CardioInput {
            kind: "Cycling".into(),
            duration: Some(40),
            distance: Some(15.2),
            notes: Some(String::new()),
            ..Default::default()
        };
        let log = log_cardio(&mut db, &user, &ok, day(1)).unwrap();
        assert_eq!(log.kind, "cycling");
        assert_eq!(log.notes, None);
    }

    #[test]
    fn test_weight_validation_and_listing() {
        let mut db = MemoryStore::new();
        let user = User::with_id("u1");

        assert!(log_weight(&mut db, &user, &WeightInput::default(), day(1)).is_err());
        let bad_bf = WeightInput {
            weight: 80.0,
            body_fat_percentage: Some(120.0),
            notes: None,
        };
        assert!(log_weight(&mut db, &user, &bad_bf, day(1)).is_err());

        for (d, w) in [(1, 81.0), (3, 80.4), (2, 80.9)] {
            let input = WeightInput {
                weight: w,
                ..Default::default()
            };
            log_weight(&mut db, &user, &input, day(d)).unwrap();
        }

        let logs: Vec<WeightLog> = list(&db, &user).unwrap();
        let weights: Vec<_> = logs.iter().map(|l| l.weight).collect();
        assert_eq!(weights, vec![80.4, 80.9, 81.0]);
    }

    #[test]
    fn test_supplement_requires_name() {
        let mut db = MemoryStore::new();
        let user = User::with_id("u1");
        let time = NaiveTime::from_hms_opt(7, 30, 0).unwrap();

        let unnamed = SupplementInput {
            name: "".into(),
            dosage: None,
            time_taken: time,
        };
        assert!(log_supplement(&mut db, &user, &unnamed, day(1)).is_err());

        let creatine = SupplementInput {
            name: "Creatine".into(),
            dosage: Some("5g".into()),
            time_taken: time,
        };
        let log = log_supplement(&mut db, &user, &creatine, day(1)).unwrap();
        assert_eq!(log.dosage.as_deref(), Some("5g"));
    }

    #[test]
    fn test_wellbeing_scales() {
        let mut db = MemoryStore::new();
        let user = User::with_id("u1");

        let bad_mood = WellbeingInput {
            mood: 6,
            ..Default::default()
        };
        let bad_sleep = WellbeingInput {
            sleep_hours: Some(25.0),
            ..Default::default()
        };
        let bad_quality = WellbeingInput {
            sleep_quality: Some(0),
            ..Default::default()
        };
        for input in [bad_mood, bad_sleep, bad_quality] {
            assert!(log_wellbeing(&mut db, &user, &input, day(2)).is_err());
        }

        let good = WellbeingInput {
            sleep_hours: Some(7.5),
            sleep_quality: Some(4),
            ..Default::default()
        };
        let log = log_wellbeing(&mut db, &user, &good, day(2)).unwrap();
        assert_eq!(log.mood, 4);
        assert_eq!(log.energy, 3);
    }

    #[test]
    fn test_delete_scoped_to_owner() {
        let mut db = MemoryStore::new();
        let user = User::with_id("u1");
        let input = WeightInput {
            weight: 70.0,
            ..Default::default()
        };
        let log = log_weight(&mut db, &user, &input, day(1)).unwrap();
        let id = log.id.unwrap();

        assert!(delete::<WeightLog, _>(&mut db, &User::with_id("u2"), id).is_err());
        delete::<WeightLog, _>(&mut db, &user, id).unwrap();
        assert!(db.is_empty("weight_logs"));
    }
}
