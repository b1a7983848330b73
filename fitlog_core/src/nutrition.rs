//! Food logging and the daily macro summary.
//!
//! Entries are logged either manually or from the built-in quick-add
//! catalog, and summed per day by [`summarize`].

use crate::config::NutritionGoals;
use crate::store::{self, Query, TableStore};
use crate::{Error, FoodEntry, RecordId, Result, User};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::ops::Add;

/// Totals of calories and macros over a set of food entries
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MacroSummary {
    pub calories: i64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Add for MacroSummary {
    type Output = MacroSummary;

    fn add(self, rhs: MacroSummary) -> MacroSummary {
        MacroSummary {
            calories: self.calories + rhs.calories,
            protein: self.protein + rhs.protein,
            carbs: self.carbs + rhs.carbs,
            fat: self.fat + rhs.fat,
        }
    }
}

impl From<&FoodEntry> for MacroSummary {
    fn from(entry: &FoodEntry) -> Self {
        MacroSummary {
            calories: i64::from(entry.calories),
            protein: entry.protein.unwrap_or(0.0),
            carbs: entry.carbs.unwrap_or(0.0),
            fat: entry.fat.unwrap_or(0.0),
        }
    }
}

/// Percentage of each daily goal consumed
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MacroProgress {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

fn percent(value: f64, goal: f64) -> f64 {
    if goal > 0.0 {
        value / goal * 100.0
    } else {
        0.0
    }
}

impl MacroSummary {
    pub fn progress(&self, goals: &NutritionGoals) -> MacroProgress {
        MacroProgress {
            calories: percent(self.calories as f64, f64::from(goals.calories)),
            protein: percent(self.protein, goals.protein),
            carbs: percent(self.carbs, goals.carbs),
            fat: percent(self.fat, goals.fat),
        }
    }
}

/// Sum calories and macros across entries; missing macros count as zero
pub fn summarize<'a, I>(entries: I) -> MacroSummary
where
    I: IntoIterator<Item = &'a FoodEntry>,
{
    entries
        .into_iter()
        .map(MacroSummary::from)
        .fold(MacroSummary::default(), Add::add)
}

// ============================================================================
// Quick-add catalog
// ============================================================================

/// A predefined food with fixed nutritional values
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuickAddFood {
    pub name: &'static str,
    pub calories: i32,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

fn food(name: &'static str, calories: i32, protein: f64, carbs: f64, fat: f64) -> QuickAddFood {
    QuickAddFood {
        name,
        calories,
        protein,
        carbs,
        fat,
    }
}

static QUICK_ADD_FOODS: Lazy<Vec<QuickAddFood>> = Lazy::new(|| {
    vec![
        food("Chicken Breast (100g)", 165, 31.0, 0.0, 3.6),
        food("Brown Rice (100g)", 112, 2.6, 24.0, 0.8),
        food("Egg", 78, 6.3, 0.6, 5.3),
        food("Whey Protein (1 scoop)", 120, 24.0, 3.0, 1.5),
        food("Banana", 105, 1.3, 27.0, 0.4),
        food("Oatmeal (100g)", 389, 16.9, 66.3, 6.9),
        food("Greek Yogurt (100g)", 59, 10.0, 3.6, 0.4),
        food("Salmon (100g)", 208, 20.0, 0.0, 13.0),
        food("Broccoli (100g)", 34, 2.8, 6.6, 0.4),
        food("Almonds (28g)", 164, 6.0, 6.0, 14.0),
        food("Avocado (100g)", 160, 2.0, 8.5, 14.7),
        food("Sweet Potato (100g)", 86, 1.6, 20.1, 0.1),
    ]
});

/// The full quick-add catalog
pub fn quick_add_foods() -> &'static [QuickAddFood] {
    &QUICK_ADD_FOODS
}

/// Catalog items whose name contains `term`, case-insensitively
pub fn search_quick_add(term: &str) -> Vec<&'static QuickAddFood> {
    let needle = term.trim().to_lowercase();
    quick_add_foods()
        .iter()
        .filter(|f| f.name.to_lowercase().contains(&needle))
        .collect()
}

/// Look up a catalog item by exact name (case-insensitive)
pub fn find_quick_add(name: &str) -> Option<&'static QuickAddFood> {
    let name = name.trim();
    quick_add_foods()
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case(name))
}

impl QuickAddFood {
    /// The entry this item produces for a user on a given day
    pub fn to_entry(&self, user_id: &str, date: NaiveDate) -> FoodEntry {
        FoodEntry {
            id: None,
            user_id: user_id.to_string(),
            name: self.name.to_string(),
            calories: self.calories,
            protein: Some(self.protein),
            carbs: Some(self.carbs),
            fat: Some(self.fat),
            date,
        }
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Manually entered food; name and calories are required
#[derive(Clone, Debug, Default)]
pub struct ManualFoodInput {
    pub name: String,
    pub calories: Option<i32>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
}

impl ManualFoodInput {
    pub fn validate(&self) -> Result<()> {
        let calories = match self.calories {
            Some(c) if !self.name.trim().is_empty() => c,
            _ => {
                return Err(Error::Validation(
                    "Food name and calories are required".into(),
                ))
            }
        };
        if calories < 0 {
            return Err(Error::Validation("Calories cannot be negative".into()));
        }
        for (label, value) in [
            ("Protein", self.protein),
            ("Carbs", self.carbs),
            ("Fat", self.fat),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(Error::Validation(format!(
                        "{} must be a non-negative number",
                        label
                    )));
                }
            }
        }
        Ok(())
    }

    fn to_entry(&self, user_id: &str, date: NaiveDate) -> FoodEntry {
        FoodEntry {
            id: None,
            user_id: user_id.to_string(),
            name: self.name.trim().to_string(),
            calories: self.calories.unwrap_or(0),
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            date,
        }
    }
}

/// Validate and store a manual entry for `today`
pub fn log_manual_entry<S: TableStore + ?Sized>(
    store: &mut S,
    user: &User,
    input: &ManualFoodInput,
    today: NaiveDate,
) -> Result<FoodEntry> {
    input.validate()?;
    let entry = store::insert(store, &input.to_entry(&user.id, today))?;
    tracing::info!("Logged food entry {:?} for {}", entry.name, user.id);
    Ok(entry)
}

/// Store a catalog item as today's entry
pub fn quick_add<S: TableStore + ?Sized>(
    store: &mut S,
    user: &User,
    item: &QuickAddFood,
    today: NaiveDate,
) -> Result<FoodEntry> {
    let entry = store::insert(store, &item.to_entry(&user.id, today))?;
    tracing::info!("Quick-added {:?} for {}", item.name, user.id);
    Ok(entry)
}

/// All of a user's entries for one day, in the order they were logged
pub fn entries_for_day<S: TableStore + ?Sized>(
    store: &S,
    user: &User,
    date: NaiveDate,
) -> Result<Vec<FoodEntry>> {
    store::select(
        store,
        &Query::new()
            .eq("user_id", user.id.as_str())
            .eq("date", date.to_string()),
    )
}

/// Delete one of the user's entries
pub fn delete_entry<S: TableStore + ?Sized>(
    store: &mut S,
    user: &User,
    id: RecordId,
) -> Result<()> {
    store::delete_owned::<FoodEntry, _>(store, &user.id, id)?;
    tracing::info!("Deleted food entry {} for {}", id, user.id);
    Ok(())
}

/// Entries and their totals for one day
pub fn day_summary<S: TableStore + ?Sized>(
    store: &S,
    user: &User,
    date: NaiveDate,
) -> Result<(Vec<FoodEntry>, MacroSummary)> {
    let entries = entries_for_day(store, user, date)?;
    let summary = summarize(&entries);
    Ok((entries, summary))
}
