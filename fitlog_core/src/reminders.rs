//! Recurring reminders.

use crate::store::{self, Order, Query, TableStore};
use crate::{Error, RecordId, Reminder, Result, User};
use chrono::NaiveTime;

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Clone, Debug)]
pub struct ReminderInput {
    pub kind: String,
    pub title: String,
    pub message: Option<String>,
    /// `HH:MM`
    pub time: String,
    /// 0 = Sunday
    pub days: Vec<u8>,
    pub enabled: bool,
}

impl Default for ReminderInput {
    fn default() -> Self {
        Self {
            kind: "workout".into(),
            title: String::new(),
            message: None,
            time: "08:00".into(),
            days: vec![1, 3, 5],
            enabled: true,
        }
    }
}

impl ReminderInput {
    fn parse_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.time.trim(), "%H:%M")
            .map_err(|_| Error::Validation(format!("Invalid time {:?}, expected HH:MM", self.time)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() || self.time.trim().is_empty() || self.days.is_empty() {
            return Err(Error::Validation(
                "Title, time, and at least one day are required".into(),
            ));
        }
        self.parse_time()?;
        if let Some(day) = self.days.iter().find(|d| **d > 6) {
            return Err(Error::Validation(format!("Invalid day of week: {}", day)));
        }
        Ok(())
    }
}

/// Short weekday names for a reminder's days
pub fn day_names(days: &[u8]) -> Vec<&'static str> {
    days.iter()
        .filter_map(|d| WEEKDAY_NAMES.get(usize::from(*d)).copied())
        .collect()
}

pub fn create_reminder<S: TableStore + ?Sized>(
    store: &mut S,
    user: &User,
    input: &ReminderInput,
) -> Result<Reminder> {
    input.validate()?;

    let mut days = input.days.clone();
    days.sort_unstable();
    days.dedup();

    let message = input
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from);

    let reminder = store::insert(
        store,
        &Reminder {
            id: None,
            user_id: user.id.clone(),
            kind: input.kind.trim().to_lowercase(),
            title: input.title.trim().to_string(),
            message,
            time: input.parse_time()?,
            days,
            enabled: input.enabled,
        },
    )?;
    tracing::info!("Created reminder {:?} for {}", reminder.title, user.id);
    Ok(reminder)
}

/// The user's reminders by time of day
pub fn list_reminders<S: TableStore + ?Sized>(store: &S, user: &User) -> Result<Vec<Reminder>> {
    store::select(
        store,
        &Query::new()
            .eq("user_id", user.id.as_str())
            .order_by("time", Order::Asc),
    )
}

pub fn delete_reminder<S: TableStore + ?Sized>(
    store: &mut S,
    user: &User,
    id: RecordId,
) -> Result<()> {
    store::delete_owned::<Reminder, _>(store, &user.id, id)?;
    tracing::info!("Deleted reminder {} for {}", id, user.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_defaults_need_only_a_title() {
        let mut db = MemoryStore::new();
        let user = User::with_id("u1");
        let input = ReminderInput {
            title: "Leg day".into(),
            ..Default::default()
        };

        let reminder = create_reminder(&mut db, &user, &input).unwrap();
        assert_eq!(reminder.kind, "workout");
        assert_eq!(reminder.time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(day_names(&reminder.days), vec!["Mon", "Wed", "Fri"]);
        assert!(reminder.enabled);
    }

    #[test]
    fn test_rejects_missing_fields() {
        let mut db = MemoryStore::new();
        let user = User::with_id("u1");

        let no_days = ReminderInput {
            title: "Stretch".into(),
            days: vec![],
            ..Default::default()
        };
        let bad_time = ReminderInput {
            title: "Stretch".into(),
            time: "25:00".into(),
            ..Default::default()
        };
        let bad_day = ReminderInput {
            title: "Stretch".into(),
            days: vec![7],
            ..Default::default()
        };
        let untitled = ReminderInput::default();

        for input in [no_days, bad_time, bad_day, untitled] {
            assert!(matches!(
                create_reminder(&mut db, &user, &input),
                Err(Error::Validation(_))
            ));
        }
        assert!(db.is_empty("reminders"));
    }

    #[test]
    fn test_listed_by_time_and_deduplicated_days() {
        let mut db = MemoryStore::new();
        let user = User::with_id("u1");

        let evening = ReminderInput {
            title: "Magnesium".into(),
            kind: "Supplement".into(),
            time: "21:30".into(),
            days: vec![5, 0, 5],
            ..Default::default()
        };
        let morning = ReminderInput {
            title: "Weigh in".into(),
            time: "06:45".into(),
            ..Default::default()
        };
        create_reminder(&mut db, &user, &evening).unwrap();
        create_reminder(&mut db, &user, &morning).unwrap();

        let reminders = list_reminders(&db, &user).unwrap();
        assert_eq!(reminders[0].title, "Weigh in");
        assert_eq!(reminders[1].days, vec![0, 5]);
        assert_eq!(reminders[1].kind, "supplement");

        let id = reminders[0].id.unwrap();
        delete_reminder(&mut db, &user, id).unwrap();
        assert_eq!(list_reminders(&db, &user).unwrap().len(), 1);
    }
}
