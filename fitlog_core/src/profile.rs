//! User profile and onboarding.
//!
//! Onboarding is a one-time setup that writes the user's profile; until it
//! is done, every route other than onboarding itself redirects there.

use crate::store::{self, Query, TableStore};
use crate::{
    ActivityLevel, Error, FitnessGoal, Result, TrainingPreference, User, UserProfile, ViewState,
    WeightLog,
};
use chrono::NaiveDate;

/// Answers collected by the onboarding flow
#[derive(Clone, Debug, PartialEq)]
pub struct OnboardingAnswers {
    pub goal: FitnessGoal,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub target_weight: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub preferred_training: Option<TrainingPreference>,
}

impl Default for OnboardingAnswers {
    fn default() -> Self {
        Self {
            goal: FitnessGoal::Maintain,
            height: None,
            weight: None,
            target_weight: None,
            activity_level: Some(ActivityLevel::Moderate),
            preferred_training: Some(TrainingPreference::Strength),
        }
    }
}

impl OnboardingAnswers {
    pub fn validate(&self) -> Result<()> {
        for (label, value) in [
            ("Height", self.height),
            ("Weight", self.weight),
            ("Target weight", self.target_weight),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(Error::Validation(format!("{} must be positive", label)));
                }
            }
        }
        Ok(())
    }
}

/// Where a view should send the user
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Session still resolving
    Loading,
    SignIn,
    Onboarding,
    Dashboard,
}

/// Decide the route for a protected view
///
/// `onboarding_completed` is only consulted for an authenticated user.
pub fn gate(state: &ViewState, onboarding_completed: bool) -> Route {
    match state {
        ViewState::Pending => Route::Loading,
        ViewState::Anonymous => Route::SignIn,
        ViewState::Authenticated(_) if onboarding_completed => Route::Dashboard,
        ViewState::Authenticated(_) => Route::Onboarding,
    }
}

/// The user's profile, if onboarding created one
pub fn load_profile<S: TableStore + ?Sized>(store: &S, user: &User) -> Result<Option<UserProfile>> {
    let profiles: Vec<UserProfile> =
        store::select(store, &Query::new().eq("user_id", user.id.as_str()))?;
    if profiles.len() > 1 {
        tracing::warn!(
            "Found {} profiles for {}, using the first",
            profiles.len(),
            user.id
        );
    }
    Ok(profiles.into_iter().next())
}

pub fn has_completed_onboarding<S: TableStore + ?Sized>(store: &S, user: &User) -> Result<bool> {
    Ok(load_profile(store, user)?.is_some_and(|p| p.onboarding_completed))
}

/// Resolve the route for the current view state against the store
pub fn route_for<S: TableStore + ?Sized>(store: &S, state: &ViewState) -> Result<Route> {
    let completed = match state {
        ViewState::Authenticated(user) => has_completed_onboarding(store, user)?,
        ViewState::Pending | ViewState::Anonymous => false,
    };
    Ok(gate(state, completed))
}

/// Save the onboarding answers as the user's profile.
///
/// A starting weight is also logged as today's weigh-in.
pub fn complete_onboarding<S: TableStore + ?Sized>(
    store: &mut S,
    user: &User,
    answers: &OnboardingAnswers,
    today: NaiveDate,
) -> Result<UserProfile> {
    answers.validate()?;

    if has_completed_onboarding(store, user)? {
        return Err(Error::Validation("Onboarding is already complete".into()));
    }

    let profile = store::insert(
        store,
        &UserProfile {
            id: None,
            user_id: user.id.clone(),
            goal: answers.goal,
            height: answers.height,
            weight: answers.weight,
            target_weight: answers.target_weight,
            activity_level: answers.activity_level,
            preferred_training: answers.preferred_training,
            onboarding_completed: true,
        },
    )?;

    if let Some(weight) = answers.weight {
        store::insert(
            store,
            &WeightLog {
                id: None,
                user_id: user.id.clone(),
                weight,
                body_fat_percentage: None,
                date: today,
                notes: None,
            },
        )?;
    }

    tracing::info!("Completed onboarding for {} (goal: {})", user.id, profile.goal);
    Ok(profile)
}
