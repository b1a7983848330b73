//! CSV export of a user's rows.
//!
//! Any table can be exported; columns are the union of the row keys in
//! first-seen order. The CSV is written to a temp file beside the target,
//! synced, then renamed into place.

use crate::store::{Order, Query, Record, Row, TableStore};
use crate::{
    CardioLog, Error, Exercise, ExerciseSet, FoodEntry, PersonalRecord, Reminder, Result,
    SupplementLog, User, UserProfile, WeightLog, WellbeingLog, Workout,
};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// Tables that can be exported
pub const EXPORT_TABLES: &[&str] = &[
    FoodEntry::TABLE,
    Workout::TABLE,
    Exercise::TABLE,
    PersonalRecord::TABLE,
    UserProfile::TABLE,
    WeightLog::TABLE,
    CardioLog::TABLE,
    SupplementLog::TABLE,
    WellbeingLog::TABLE,
    Reminder::TABLE,
];

/// The user's rows of `table`, oldest first
fn user_rows<S: TableStore + ?Sized>(store: &S, user: &User, table: &str) -> Result<Vec<Row>> {
    let by_id = Query::new().order_by("id", Order::Asc);

    // Exercises are owned through their workout
    if table == Exercise::TABLE {
        let workout_ids: HashSet<i64> = store
            .select(Workout::TABLE, &Query::new().eq("user_id", user.id.as_str()))?
            .iter()
            .filter_map(|r| r.get("id").and_then(Value::as_i64))
            .collect();
        let mut rows = store.select(table, &by_id)?;
        rows.retain(|r| {
            r.get("workout_id")
                .and_then(Value::as_i64)
                .is_some_and(|id| workout_ids.contains(&id))
        });
        return Ok(rows);
    }

    store.select(table, &by_id.eq("user_id", user.id.as_str()))
}

fn columns(rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    // id leads when present
    if let Some(pos) = columns.iter().position(|c| c == "id") {
        let id = columns.remove(pos);
        columns.insert(0, id);
    }
    columns
}

fn cell(column: &str, value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(v @ Value::Array(items)) => {
            if column == "sets" {
                if let Ok(sets) = serde_json::from_value::<Vec<ExerciseSet>>(v.clone()) {
                    return sets
                        .iter()
                        .map(ExerciseSet::to_string)
                        .collect::<Vec<_>>()
                        .join(",");
                }
            }
            if items.iter().all(|i| !i.is_array() && !i.is_object()) {
                items
                    .iter()
                    .map(|i| cell(column, Some(i)))
                    .collect::<Vec<_>>()
                    .join(";")
            } else {
                v.to_string()
            }
        }
        Some(v @ Value::Object(_)) => v.to_string(),
    }
}

/// Export the user's rows of `table` to `path`, replacing any existing file.
///
/// Returns the number of rows written; nothing is written when there are
/// no rows.
pub fn export_csv<S: TableStore + ?Sized>(
    store: &S,
    user: &User,
    table: &str,
    path: &Path,
) -> Result<usize> {
    if !EXPORT_TABLES.contains(&table) {
        return Err(Error::Validation(format!(
            "Unknown table {:?}; expected one of: {}",
            table,
            EXPORT_TABLES.join(", ")
        )));
    }

    let rows = user_rows(store, user, table)?;
    if rows.is_empty() {
        tracing::info!("No {} rows to export for {}", table, user.id);
        return Ok(0);
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let columns = columns(&rows);
    let tmp = tempfile::NamedTempFile::new_in(parent)?;
    let mut writer = csv::WriterBuilder::new().from_writer(tmp);

    writer.write_record(&columns)?;
    for row in &rows {
        writer.write_record(columns.iter().map(|c| cell(c, row.get(c))))?;
    }

    // Flush and sync to disk before the rename
    writer.flush()?;
    let tmp = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    tracing::info!("Exported {} {} rows to {:?}", rows.len(), table, path);
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{self, MemoryStore};
    use crate::workout::{self, ExerciseInput, WorkoutSubmission};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn food(user: &str, name: &str, protein: Option<f64>) -> FoodEntry {
        FoodEntry {
            id: None,
            user_id: user.into(),
            name: name.into(),
            calories: 200,
            protein,
            carbs: None,
            fat: None,
            date: day(),
        }
    }

    #[test]
    fn test_exports_only_own_rows_with_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/food.csv");
        let mut db = MemoryStore::new();
        store::insert(&mut db, &food("u1", "Toast, buttered", Some(4.0))).unwrap();
        store::insert(&mut db, &food("u2", "Soup", None)).unwrap();
        store::insert(&mut db, &food("u1", "Apple", None)).unwrap();

        let n = export_csv(&db, &User::with_id("u1"), "food_entries", &path).unwrap();
        assert_eq!(n, 2);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "id");
        let name_col = headers.iter().position(|h| h == "name").unwrap();
        let protein_col = headers.iter().position(|h| h == "protein").unwrap();

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][name_col], "Toast, buttered");
        assert_eq!(&records[0][protein_col], "4.0");
        assert_eq!(&records[1][protein_col], "");
    }

    #[test]
    fn test_exercise_sets_are_flattened() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exercises.csv");
        let mut db = MemoryStore::new();
        let user = User::with_id("u1");
        let submission = WorkoutSubmission {
            notes: None,
            exercises: vec![ExerciseInput::new(
                "Squat",
                vec![ExerciseSet::new(8, 60.0), ExerciseSet::new(6, 70.0)],
            )],
        };
        workout::log_workout(&mut db, &user, &submission, day()).unwrap();
        workout::log_workout(&mut db, &User::with_id("u2"), &submission, day()).unwrap();

        let n = export_csv(&db, &user, "exercises", &path).unwrap();
        assert_eq!(n, 1);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"8x60,6x70\""), "{}", contents);
    }

    #[test]
    fn test_unknown_table_and_empty_export() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.csv");
        let db = MemoryStore::new();
        let user = User::with_id("u1");

        assert!(matches!(
            export_csv(&db, &user, "sessions", &path),
            Err(Error::Validation(_))
        ));
        assert_eq!(export_csv(&db, &user, "weight_logs", &path).unwrap(), 0);
        assert!(!path.exists());
    }
}
