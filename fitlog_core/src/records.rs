//! Personal records.
//!
//! A PR row is appended for every exercise of every logged workout, so the
//! table holds the full history. The "current" record per exercise is
//! derived here at read time.

use crate::store::{self, Order, Query, TableStore};
use crate::{PersonalRecord, Result, User};
use std::collections::HashMap;

/// Whether `candidate` beats `current`: heavier, or same weight for more reps
fn dominates(candidate: &PersonalRecord, current: &PersonalRecord) -> bool {
    candidate.weight > current.weight
        || (candidate.weight == current.weight && candidate.reps > current.reps)
}

/// Reduce PR history to one best record per exercise, heaviest first.
///
/// Single pass over `records` keeping the current best per exercise name;
/// an entry is replaced only when strictly dominated, so among exact
/// weight-and-reps ties the first one seen wins. Ties in the final weight
/// ordering keep first-seen order of the exercises.
pub fn best_per_exercise<I>(records: I) -> Vec<PersonalRecord>
where
    I: IntoIterator<Item = PersonalRecord>,
{
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, PersonalRecord> = HashMap::new();

    for record in records {
        let replace = match best.get(&record.exercise_name) {
            Some(current) => dominates(&record, current),
            None => {
                order.push(record.exercise_name.clone());
                true
            }
        };
        if replace {
            best.insert(record.exercise_name.clone(), record);
        }
    }

    let mut winners: Vec<PersonalRecord> = order
        .iter()
        .filter_map(|name| best.remove(name))
        .collect();
    winners.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    winners
}

/// Distinct exercise names in first-seen order
pub fn exercise_names(records: &[PersonalRecord]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for record in records {
        if !names.contains(&record.exercise_name) {
            names.push(record.exercise_name.clone());
        }
    }
    names
}

/// History of one exercise, oldest first
pub fn progress_series(records: &[PersonalRecord], exercise: &str) -> Vec<PersonalRecord> {
    let mut series: Vec<PersonalRecord> = records
        .iter()
        .filter(|r| r.exercise_name == exercise)
        .cloned()
        .collect();
    series.sort_by_key(|r| r.date);
    series
}

/// All PR rows for a user in insertion order
pub fn history<S: TableStore + ?Sized>(store: &S, user: &User) -> Result<Vec<PersonalRecord>> {
    // Ordering by id pins down which of two identical rows wins a tie
    store::select(
        store,
        &Query::new()
            .eq("user_id", user.id.as_str())
            .order_by("id", Order::Asc),
    )
}

/// The user's current best per exercise
pub fn personal_records<S: TableStore + ?Sized>(
    store: &S,
    user: &User,
) -> Result<Vec<PersonalRecord>> {
    let rows = history(store, user)?;
    let total = rows.len();
    let best = best_per_exercise(rows);
    tracing::debug!(
        "Reduced {} PR rows to {} exercises for {}",
        total,
        best.len(),
        user.id
    );
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn pr(name: &str, weight: f64, reps: i32, day: u32) -> PersonalRecord {
        PersonalRecord {
            id: None,
            user_id: "u1".into(),
            exercise_name: name.into(),
            weight,
            reps,
            date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
        }
    }

    #[test]
    fn test_heaviest_wins_then_most_reps() {
        let records = vec![
            pr("Squat", 100.0, 5, 1),
            pr("Squat", 120.0, 3, 2),
            pr("Squat", 120.0, 5, 3),
        ];
        let best = best_per_exercise(records);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].weight, 120.0);
        assert_eq!(best[0].reps, 5);
    }

    #[test]
    fn test_lighter_with_more_reps_does_not_win() {
        let best = best_per_exercise(vec![pr("Deadlift", 140.0, 1, 1), pr("Deadlift", 130.0, 8, 2)]);
        assert_eq!(best[0].weight, 140.0);
        assert_eq!(best[0].reps, 1);
    }

    #[test]
    fn test_first_seen_wins_exact_tie() {
        let best = best_per_exercise(vec![pr("Row", 80.0, 6, 1), pr("Row", 80.0, 6, 9)]);
        assert_eq!(best[0].date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn test_sorted_by_weight_descending() {
        let records = vec![
            pr("Curl", 20.0, 10, 1),
            pr("Squat", 140.0, 3, 1),
            pr("Bench Press", 100.0, 5, 1),
            pr("Curl", 25.0, 8, 2),
        ];
        let best = best_per_exercise(records);
        let names: Vec<_> = best.iter().map(|r| r.exercise_name.as_str()).collect();
        assert_eq!(names, vec!["Squat", "Bench Press", "Curl"]);
        assert_eq!(best[2].weight, 25.0);
    }

    #[test]
    fn test_reduction_is_idempotent() {
        let records = vec![
            pr("Squat", 100.0, 5, 1),
            pr("Bench Press", 80.0, 8, 1),
            pr("Squat", 110.0, 2, 2),
            pr("Bench Press", 80.0, 10, 3),
            pr("Press", 50.0, 5, 3),
        ];
        let once = best_per_exercise(records);
        let twice = best_per_exercise(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_winner_dominates_all_same_name_rows() {
        let records = vec![
            pr("Squat", 100.0, 5, 1),
            pr("Squat", 120.0, 3, 2),
            pr("Squat", 90.0, 12, 3),
            pr("Squat", 120.0, 4, 4),
            pr("Squat", 115.0, 6, 5),
        ];
        let winner = best_per_exercise(records.clone()).remove(0);
        for r in &records {
            assert!(winner.weight >= r.weight);
            if r.weight == winner.weight {
                assert!(winner.reps >= r.reps);
            }
        }
    }

    #[test]
    fn test_empty_history() {
        assert!(best_per_exercise(Vec::new()).is_empty());
    }

    #[test]
    fn test_progress_series_oldest_first() {
        let records = vec![
            pr("Squat", 110.0, 3, 20),
            pr("Bench Press", 80.0, 5, 1),
            pr("Squat", 100.0, 5, 3),
            pr("Squat", 105.0, 5, 10),
        ];
        let series = progress_series(&records, "Squat");
        let weights: Vec<_> = series.iter().map(|r| r.weight).collect();
        assert_eq!(weights, vec![100.0, 105.0, 110.0]);
        assert!(progress_series(&records, "Press").is_empty());
        assert_eq!(exercise_names(&records), vec!["Squat", "Bench Press"]);
    }

    #[test]
    fn test_personal_records_reads_only_own_rows() {
        let mut db = MemoryStore::new();
        store::insert(&mut db, &pr("Squat", 100.0, 5, 1)).unwrap();
        let mut other = pr("Squat", 200.0, 1, 1);
        other.user_id = "u2".into();
        store::insert(&mut db, &other).unwrap();

        let best = personal_records(&db, &User::with_id("u1")).unwrap();
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].weight, 100.0);
        assert_eq!(best[0].id, Some(1));
    }
}
