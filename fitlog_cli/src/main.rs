use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};
use fitlog_core::logs::{CardioInput, Intensity, SupplementInput, WeightInput, WellbeingInput};
use fitlog_core::nutrition::{self, ManualFoodInput};
use fitlog_core::profile::{self, OnboardingAnswers};
use fitlog_core::reminders::{self, ReminderInput};
use fitlog_core::workout::{self, ExerciseInput, MuscleGroup};
use fitlog_core::*;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "fitlog")]
#[command(about = "Log food, workouts and daily health metrics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Act as this user id (defaults to the configured session)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Log storage and service activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Food diary
    #[command(subcommand)]
    Food(FoodCommand),

    /// Strength workouts
    #[command(subcommand)]
    Workout(WorkoutCommand),

    /// Personal records
    #[command(subcommand)]
    Pr(PrCommand),

    /// One-time profile setup
    Onboard(OnboardArgs),

    /// Body weight log
    #[command(subcommand)]
    Weight(WeightCommand),

    /// Cardio log
    #[command(subcommand)]
    Cardio(CardioCommand),

    /// Supplement log
    #[command(subcommand)]
    Supplement(SupplementCommand),

    /// Sleep and mood check-ins
    #[command(subcommand)]
    Wellbeing(WellbeingCommand),

    /// Recurring reminders
    #[command(subcommand)]
    Reminder(ReminderCommand),

    /// Today's overview
    Dashboard,

    /// Export one table to CSV
    Export {
        /// Table name, e.g. food_entries or workouts
        table: String,

        /// Output file (defaults to <table>.csv)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum FoodCommand {
    /// Log a food manually
    Add {
        name: String,
        #[arg(long)]
        calories: Option<i32>,
        #[arg(long)]
        protein: Option<f64>,
        #[arg(long)]
        carbs: Option<f64>,
        #[arg(long)]
        fat: Option<f64>,
    },
    /// Log a food from the quick-add list
    Quick { name: String },
    /// Search the quick-add list
    Search {
        #[arg(default_value = "")]
        term: String,
    },
    /// List a day's entries
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete an entry
    Delete { id: RecordId },
    /// A day's totals against your goals
    Summary {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum WorkoutCommand {
    /// Log today's workout
    Log {
        /// NAME:SETS, e.g. "Squat:8x60,6x70"; repeat per exercise
        #[arg(long = "exercise", short = 'e', required = true)]
        exercises: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Most recent workouts
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// One workout with its exercises
    Show { id: RecordId },
    /// Suggested exercises per muscle group
    Templates { group: Option<MuscleGroup> },
}

#[derive(Subcommand)]
enum PrCommand {
    /// Current best per exercise
    List,
    /// Every recorded top set for one exercise
    History { exercise: String },
}

#[derive(Args)]
struct OnboardArgs {
    /// lose_fat, gain_muscle or maintain
    #[arg(long, default_value = "maintain")]
    goal: FitnessGoal,
    /// cm
    #[arg(long)]
    height: Option<f64>,
    /// kg
    #[arg(long)]
    weight: Option<f64>,
    #[arg(long)]
    target_weight: Option<f64>,
    #[arg(long, default_value = "moderate")]
    activity_level: ActivityLevel,
    #[arg(long, default_value = "strength")]
    training: TrainingPreference,
}

#[derive(Subcommand)]
enum WeightCommand {
    Log {
        weight: f64,
        #[arg(long)]
        body_fat: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
    },
    List,
}

#[derive(Subcommand)]
enum CardioCommand {
    Log {
        /// running, cycling, swimming, ...
        #[arg(long, default_value = "running")]
        kind: String,
        /// Minutes
        #[arg(long)]
        duration: Option<i32>,
        /// km
        #[arg(long)]
        distance: Option<f64>,
        #[arg(long)]
        calories: Option<i32>,
        /// Estimate calories from low/medium/high effort and body weight
        #[arg(long, requires = "body_weight", conflicts_with = "calories")]
        intensity: Option<Intensity>,
        #[arg(long)]
        body_weight: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
    },
    List,
}

#[derive(Subcommand)]
enum SupplementCommand {
    Log {
        name: String,
        #[arg(long)]
        dosage: Option<String>,
        /// HH:MM, defaults to now
        #[arg(long)]
        time: Option<String>,
    },
    List,
}

#[derive(Subcommand)]
enum WellbeingCommand {
    Log {
        /// 1-5
        #[arg(long, default_value_t = 4)]
        mood: u8,
        /// 1-5
        #[arg(long, default_value_t = 3)]
        energy: u8,
        #[arg(long)]
        sleep_hours: Option<f64>,
        /// 1-5
        #[arg(long)]
        sleep_quality: Option<u8>,
        #[arg(long)]
        notes: Option<String>,
    },
    List,
}

#[derive(Subcommand)]
enum ReminderCommand {
    Add {
        title: String,
        #[arg(long, default_value = "workout")]
        kind: String,
        #[arg(long)]
        message: Option<String>,
        /// HH:MM
        #[arg(long, default_value = "08:00")]
        time: String,
        /// Comma-separated days of week, 0 = Sunday
        #[arg(long, value_delimiter = ',', default_value = "1,3,5")]
        days: Vec<u8>,
        #[arg(long)]
        disabled: bool,
    },
    List,
    Delete { id: RecordId },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    fitlog_core::logging::init(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let mut store = JsonlStore::new(data_dir);
    let state = view_state(cli.user, &config);
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::Food(cmd) => cmd_food(&mut store, &state, &config, cmd, today),
        Commands::Workout(cmd) => cmd_workout(&mut store, &state, cmd, today),
        Commands::Pr(cmd) => cmd_pr(&store, state.require_user()?, cmd),
        Commands::Onboard(args) => cmd_onboard(&mut store, state.require_user()?, args, today),
        Commands::Weight(cmd) => cmd_weight(&mut store, state.require_user()?, cmd, today),
        Commands::Cardio(cmd) => cmd_cardio(&mut store, state.require_user()?, cmd, today),
        Commands::Supplement(cmd) => {
            cmd_supplement(&mut store, state.require_user()?, cmd, today)
        }
        Commands::Wellbeing(cmd) => cmd_wellbeing(&mut store, state.require_user()?, cmd, today),
        Commands::Reminder(cmd) => cmd_reminder(&mut store, state.require_user()?, cmd),
        Commands::Dashboard => cmd_dashboard(&store, &state, &config, today),
        Commands::Export { table, output } => {
            let path = output.unwrap_or_else(|| PathBuf::from(format!("{}.csv", table)));
            let count = export_csv(&store, state.require_user()?, &table, &path)?;
            if count == 0 {
                println!("No {} rows to export.", table);
            } else {
                println!("✓ Exported {} rows to {}", count, path.display());
            }
            Ok(())
        }
    }
}

/// The signed-in user: `--user` wins over the configured session
fn view_state(user_flag: Option<String>, config: &Config) -> ViewState {
    let session = &config.session;
    let user = match (user_flag, &session.user_id) {
        (Some(id), configured) if configured.as_deref() != Some(id.as_str()) => {
            Some(User::with_id(id))
        }
        (_, Some(id)) => Some(User {
            id: id.clone(),
            name: session.name.clone(),
            email: session.email.clone(),
            created_at: None,
        }),
        (flag, None) => flag.map(User::with_id),
    };
    ViewState::from_session(user.map(|user| Session { user }))
}

fn fmt_macro(value: Option<f64>) -> String {
    value.map_or_else(|| "-".into(), |v| format!("{:.1}g", v))
}

fn cmd_food(
    store: &mut JsonlStore,
    state: &ViewState,
    config: &Config,
    cmd: FoodCommand,
    today: NaiveDate,
) -> Result<()> {
    // The catalog is browsable without a session
    if let FoodCommand::Search { term } = &cmd {
        let matches = nutrition::search_quick_add(term);
        if matches.is_empty() {
            println!("No quick-add foods match {:?}.", term);
        }
        for food in matches {
            println!(
                "  {:<26} {:>4} kcal  P {:>5.1}g  C {:>5.1}g  F {:>5.1}g",
                food.name, food.calories, food.protein, food.carbs, food.fat
            );
        }
        return Ok(());
    }

    let user = state.require_user()?;
    match cmd {
        FoodCommand::Add {
            name,
            calories,
            protein,
            carbs,
            fat,
        } => {
            let input = ManualFoodInput {
                name,
                calories,
                protein,
                carbs,
                fat,
            };
            let entry = nutrition::log_manual_entry(store, user, &input, today)?;
            println!("✓ Logged {} ({} kcal)", entry.name, entry.calories);
        }
        FoodCommand::Quick { name } => {
            let item = nutrition::find_quick_add(&name).ok_or_else(|| {
                Error::Validation(format!(
                    "{:?} is not a quick-add food; try `fitlog food search`",
                    name
                ))
            })?;
            let entry = nutrition::quick_add(store, user, item, today)?;
            println!("✓ Logged {} ({} kcal)", entry.name, entry.calories);
        }
        FoodCommand::List { date } => {
            let date = date.unwrap_or(today);
            let entries = nutrition::entries_for_day(store, user, date)?;
            if entries.is_empty() {
                println!("No food logged on {}.", date);
            }
            for e in entries {
                println!(
                    "  [{}] {:<26} {:>4} kcal  P {}  C {}  F {}",
                    e.id.unwrap_or_default(),
                    e.name,
                    e.calories,
                    fmt_macro(e.protein),
                    fmt_macro(e.carbs),
                    fmt_macro(e.fat)
                );
            }
        }
        FoodCommand::Delete { id } => {
            nutrition::delete_entry(store, user, id)?;
            println!("✓ Deleted entry {}", id);
        }
        FoodCommand::Summary { date } => {
            let date = date.unwrap_or(today);
            let (entries, summary) = nutrition::day_summary(store, user, date)?;
            println!("Nutrition for {} ({} entries)", date, entries.len());
            print_summary(&summary, &config.goals);
        }
        FoodCommand::Search { .. } => {}
    }
    Ok(())
}

fn print_summary(summary: &MacroSummary, goals: &fitlog_core::config::NutritionGoals) {
    let progress = summary.progress(goals);
    println!(
        "  Calories: {} / {} ({:.0}%)",
        summary.calories, goals.calories, progress.calories
    );
    println!(
        "  Protein:  {:.1}g / {:.0}g ({:.0}%)",
        summary.protein, goals.protein, progress.protein
    );
    println!(
        "  Carbs:    {:.1}g / {:.0}g ({:.0}%)",
        summary.carbs, goals.carbs, progress.carbs
    );
    println!(
        "  Fat:      {:.1}g / {:.0}g ({:.0}%)",
        summary.fat, goals.fat, progress.fat
    );
}

/// `NAME:SETS` as accepted by `workout log --exercise`
fn parse_exercise_arg(arg: &str) -> Result<ExerciseInput> {
    let (name, sets) = arg.rsplit_once(':').ok_or_else(|| {
        Error::Validation(format!(
            "Invalid exercise {:?}, expected NAME:SETS like \"Squat:8x60,6x70\"",
            arg
        ))
    })?;
    Ok(ExerciseInput::new(name, workout::parse_sets(sets)?))
}

fn cmd_workout(
    store: &mut JsonlStore,
    state: &ViewState,
    cmd: WorkoutCommand,
    today: NaiveDate,
) -> Result<()> {
    if let WorkoutCommand::Templates { group } = &cmd {
        let groups = match group {
            Some(g) => vec![*g],
            None => MuscleGroup::ALL.to_vec(),
        };
        for g in groups {
            println!("{}:", g);
            for name in g.templates() {
                println!("  {}", name);
            }
        }
        return Ok(());
    }

    let user = state.require_user()?;
    match cmd {
        WorkoutCommand::Log { exercises, notes } => {
            let submission = WorkoutSubmission {
                notes,
                exercises: exercises
                    .iter()
                    .map(|e| parse_exercise_arg(e))
                    .collect::<Result<Vec<_>>>()?,
            };
            let logged = log_workout(store, user, &submission, today)?;
            println!(
                "✓ Workout {} logged: {} exercises",
                logged.workout.id.unwrap_or_default(),
                logged.exercises.len()
            );
            for record in &logged.records {
                println!(
                    "  {} top set: {} x {}kg",
                    record.exercise_name, record.reps, record.weight
                );
            }
        }
        WorkoutCommand::Recent { limit } => {
            let workouts = workout::recent_workouts(store, user, limit)?;
            if workouts.is_empty() {
                println!("No workouts logged yet.");
            }
            for w in workouts {
                println!(
                    "  [{}] {}  {}",
                    w.id.unwrap_or_default(),
                    w.date,
                    w.notes.as_deref().unwrap_or("")
                );
            }
        }
        WorkoutCommand::Show { id } => {
            let (w, exercises) = workout::workout_details(store, user, id)?;
            println!("Workout {} on {}", id, w.date);
            if let Some(notes) = &w.notes {
                println!("  {}", notes);
            }
            for e in exercises {
                let sets: Vec<String> = e.sets.iter().map(ExerciseSet::to_string).collect();
                println!("  {:<22} {}", e.name, sets.join(", "));
            }
        }
        WorkoutCommand::Templates { .. } => {}
    }
    Ok(())
}

fn cmd_pr(store: &JsonlStore, user: &User, cmd: PrCommand) -> Result<()> {
    match cmd {
        PrCommand::List => {
            let records = fitlog_core::records::personal_records(store, user)?;
            if records.is_empty() {
                println!("No personal records yet. Log a workout to set some.");
            }
            for r in records {
                println!(
                    "  {:<22} {:>6}kg x {:<3} ({})",
                    r.exercise_name, r.weight, r.reps, r.date
                );
            }
        }
        PrCommand::History { exercise } => {
            let history = fitlog_core::records::history(store, user)?;
            let series = fitlog_core::records::progress_series(&history, &exercise);
            if series.is_empty() {
                let known = fitlog_core::records::exercise_names(&history);
                println!("No records for {:?}.", exercise);
                if !known.is_empty() {
                    println!("Known exercises: {}", known.join(", "));
                }
            }
            for r in series {
                println!("  {}  {:>6}kg x {}", r.date, r.weight, r.reps);
            }
        }
    }
    Ok(())
}

fn cmd_onboard(
    store: &mut JsonlStore,
    user: &User,
    args: OnboardArgs,
    today: NaiveDate,
) -> Result<()> {
    let answers = OnboardingAnswers {
        goal: args.goal,
        height: args.height,
        weight: args.weight,
        target_weight: args.target_weight,
        activity_level: Some(args.activity_level),
        preferred_training: Some(args.training),
    };
    let profile = profile::complete_onboarding(store, user, &answers, today)?;
    println!("✓ Profile saved (goal: {})", profile.goal);
    println!("  Run `fitlog dashboard` to see your overview.");
    Ok(())
}

fn cmd_weight(
    store: &mut JsonlStore,
    user: &User,
    cmd: WeightCommand,
    today: NaiveDate,
) -> Result<()> {
    match cmd {
        WeightCommand::Log {
            weight,
            body_fat,
            notes,
        } => {
            let input = WeightInput {
                weight,
                body_fat_percentage: body_fat,
                notes,
            };
            let log = fitlog_core::logs::log_weight(store, user, &input, today)?;
            println!("✓ Logged {}kg", log.weight);
        }
        WeightCommand::List => {
            let logs: Vec<WeightLog> = fitlog_core::logs::list(store, user)?;
            for l in logs {
                let bf = l
                    .body_fat_percentage
                    .map(|b| format!("  {:.1}% bf", b))
                    .unwrap_or_default();
                println!("  [{}] {}  {}kg{}", l.id.unwrap_or_default(), l.date, l.weight, bf);
            }
        }
    }
    Ok(())
}

fn cmd_cardio(
    store: &mut JsonlStore,
    user: &User,
    cmd: CardioCommand,
    today: NaiveDate,
) -> Result<()> {
    match cmd {
        CardioCommand::Log {
            kind,
            duration,
            distance,
            calories,
            intensity,
            body_weight,
            notes,
        } => {
            let estimated = match (intensity, body_weight, duration) {
                (Some(i), Some(kg), Some(minutes)) => {
                    Some(fitlog_core::logs::calories_burned(minutes, i, kg))
                }
                _ => None,
            };
            let input = CardioInput {
                kind,
                duration,
                distance,
                calories_burned: calories.or(estimated),
                notes,
            };
            let log = fitlog_core::logs::log_cardio(store, user, &input, today)?;
            match log.calories_burned {
                Some(kcal) => println!("✓ Logged {} min of {} ({} kcal)", log.duration, log.kind, kcal),
                None => println!("✓ Logged {} min of {}", log.duration, log.kind),
            }
        }
        CardioCommand::List => {
            let logs: Vec<CardioLog> = fitlog_core::logs::list(store, user)?;
            for l in logs {
                let distance = l.distance.map(|d| format!("  {}km", d)).unwrap_or_default();
                println!(
                    "  [{}] {}  {} {} min{}",
                    l.id.unwrap_or_default(),
                    l.date,
                    l.kind,
                    l.duration,
                    distance
                );
            }
        }
    }
    Ok(())
}

fn cmd_supplement(
    store: &mut JsonlStore,
    user: &User,
    cmd: SupplementCommand,
    today: NaiveDate,
) -> Result<()> {
    match cmd {
        SupplementCommand::Log { name, dosage, time } => {
            let time_taken = match time {
                Some(t) => NaiveTime::parse_from_str(t.trim(), "%H:%M").map_err(|_| {
                    Error::Validation(format!("Invalid time {:?}, expected HH:MM", t))
                })?,
                None => Utc::now().time(),
            };
            let input = SupplementInput {
                name,
                dosage,
                time_taken,
            };
            let log = fitlog_core::logs::log_supplement(store, user, &input, today)?;
            println!("✓ Logged {} at {}", log.name, log.time_taken.format("%H:%M"));
        }
        SupplementCommand::List => {
            let logs: Vec<SupplementLog> = fitlog_core::logs::list(store, user)?;
            for l in logs {
                println!(
                    "  [{}] {} {}  {} {}",
                    l.id.unwrap_or_default(),
                    l.date,
                    l.time_taken.format("%H:%M"),
                    l.name,
                    l.dosage.as_deref().unwrap_or("")
                );
            }
        }
    }
    Ok(())
}

fn cmd_wellbeing(
    store: &mut JsonlStore,
    user: &User,
    cmd: WellbeingCommand,
    today: NaiveDate,
) -> Result<()> {
    match cmd {
        WellbeingCommand::Log {
            mood,
            energy,
            sleep_hours,
            sleep_quality,
            notes,
        } => {
            let input = WellbeingInput {
                sleep_hours,
                sleep_quality,
                mood,
                energy,
                notes,
            };
            fitlog_core::logs::log_wellbeing(store, user, &input, today)?;
            println!("✓ Logged check-in (mood {}/5, energy {}/5)", mood, energy);
        }
        WellbeingCommand::List => {
            let logs: Vec<WellbeingLog> = fitlog_core::logs::list(store, user)?;
            for l in logs {
                let sleep = l
                    .sleep_hours
                    .map(|h| format!("  sleep {}h", h))
                    .unwrap_or_default();
                println!(
                    "  [{}] {}  mood {}/5  energy {}/5{}",
                    l.id.unwrap_or_default(),
                    l.date,
                    l.mood,
                    l.energy,
                    sleep
                );
            }
        }
    }
    Ok(())
}

fn cmd_reminder(store: &mut JsonlStore, user: &User, cmd: ReminderCommand) -> Result<()> {
    match cmd {
        ReminderCommand::Add {
            title,
            kind,
            message,
            time,
            days,
            disabled,
        } => {
            let input = ReminderInput {
                kind,
                title,
                message,
                time,
                days,
                enabled: !disabled,
            };
            let reminder = reminders::create_reminder(store, user, &input)?;
            println!(
                "✓ Reminder {:?} at {} on {}",
                reminder.title,
                reminder.time.format("%H:%M"),
                reminders::day_names(&reminder.days).join(", ")
            );
        }
        ReminderCommand::List => {
            let all = reminders::list_reminders(store, user)?;
            if all.is_empty() {
                println!("No reminders.");
            }
            for r in all {
                println!(
                    "  [{}] {} {:<24} {:<10} {}{}",
                    r.id.unwrap_or_default(),
                    r.time.format("%H:%M"),
                    r.title,
                    r.kind,
                    reminders::day_names(&r.days).join(","),
                    if r.enabled { "" } else { "  (disabled)" }
                );
            }
        }
        ReminderCommand::Delete { id } => {
            reminders::delete_reminder(store, user, id)?;
            println!("✓ Deleted reminder {}", id);
        }
    }
    Ok(())
}

fn cmd_dashboard(
    store: &JsonlStore,
    state: &ViewState,
    config: &Config,
    today: NaiveDate,
) -> Result<()> {
    match profile::route_for(store, state)? {
        Route::Dashboard => {}
        Route::Onboarding => {
            println!("Finish setting up your profile first: run `fitlog onboard`.");
            return Ok(());
        }
        Route::SignIn | Route::Loading => return Err(Error::MissingSession),
    }

    let dash = load_dashboard(store, state.require_user()?, config, today)?;
    println!("{}", dash.greeting);
    println!("Goal: {}", dash.profile.goal);
    println!();
    println!("Today ({})", dash.date);
    print_summary(&dash.summary, &config.goals);

    println!();
    println!("Recent workouts:");
    if dash.recent_workouts.is_empty() {
        println!("  none yet");
    }
    for w in &dash.recent_workouts {
        println!("  [{}] {}", w.id.unwrap_or_default(), w.date);
    }

    println!();
    println!("Personal records:");
    if dash.records.is_empty() {
        println!("  none yet");
    }
    for r in &dash.records {
        println!("  {:<22} {}kg x {}", r.exercise_name, r.weight, r.reps);
    }
    Ok(())
}
