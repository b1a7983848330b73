//! Dashboard view: today's nutrition, recent training and current PRs.

use crate::config::Config;
use crate::nutrition::{self, MacroProgress, MacroSummary};
use crate::profile;
use crate::store::TableStore;
use crate::workout;
use crate::{Error, PersonalRecord, Result, User, UserProfile, Workout};
use chrono::NaiveDate;

#[derive(Clone, Debug, PartialEq)]
pub struct Dashboard {
    pub greeting: String,
    pub profile: UserProfile,
    pub date: NaiveDate,
    pub summary: MacroSummary,
    pub progress: MacroProgress,
    pub recent_workouts: Vec<Workout>,
    pub records: Vec<PersonalRecord>,
}

/// Assemble the dashboard for an onboarded user.
///
/// Users who have not finished onboarding get a validation error pointing
/// them there.
pub fn load_dashboard<S: TableStore + ?Sized>(
    store: &S,
    user: &User,
    config: &Config,
    today: NaiveDate,
) -> Result<Dashboard> {
    let profile = match profile::load_profile(store, user)? {
        Some(p) if p.onboarding_completed => p,
        _ => {
            tracing::info!("Dashboard for {} redirected to onboarding", user.id);
            return Err(Error::Validation(
                "Please complete onboarding first".into(),
            ));
        }
    };

    let (_, summary) = nutrition::day_summary(store, user, today)?;
    let recent_workouts =
        workout::recent_workouts(store, user, config.dashboard.recent_workouts)?;
    let records = crate::records::personal_records(store, user)?;

    Ok(Dashboard {
        greeting: format!("Welcome back, {}", user.display_name()),
        profile,
        date: today,
        progress: summary.progress(&config.goals),
        summary,
        recent_workouts,
        records,
    })
}
