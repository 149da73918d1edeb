use chrono::{DateTime, Utc, Weekday};
use clap::Subcommand;
use kidschores_core::model::{
    ApprovalResetPolicy, Chore, CompletionMode, Frequency, IntervalUnit, OverdueHandling,
};
use kidschores_core::EntityKind;

use super::{kid_ids, open, parse_instant, parse_snake, print_json, print_report, CmdResult};

#[derive(Subcommand)]
pub enum ChoreAction {
    /// Define a chore
    Add {
        name: String,
        /// Points per approval (default: defaults.chore_points)
        #[arg(long)]
        points: Option<f64>,
        /// Assigned kid (repeatable)
        #[arg(long = "kid")]
        kids: Vec<String>,
        #[arg(long, default_value = "")]
        description: String,
        /// independent, shared_first or shared_all
        #[arg(long, value_parser = parse_snake::<CompletionMode>, default_value = "independent")]
        mode: CompletionMode,
        /// none, daily, weekly, biweekly, monthly or custom
        #[arg(long, default_value = "none")]
        frequency: String,
        /// Interval for a custom frequency
        #[arg(long)]
        every: Option<u32>,
        /// Unit for a custom frequency: days, weeks or months
        #[arg(long, value_parser = parse_snake::<IntervalUnit>)]
        unit: Option<IntervalUnit>,
        /// Applicable weekday (repeatable: mon, tue, ...)
        #[arg(long = "day")]
        days: Vec<Weekday>,
        /// First due date (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_instant)]
        due: Option<DateTime<Utc>>,
        #[arg(long)]
        auto_approve: bool,
        /// at_midnight_once, at_midnight_multiple, at_due_date_once or at_due_date_multiple
        #[arg(long, value_parser = parse_snake::<ApprovalResetPolicy>, default_value = "at_midnight_once")]
        reset_policy: ApprovalResetPolicy,
        /// mark_overdue, never_overdue or auto_reset
        #[arg(long, value_parser = parse_snake::<OverdueHandling>, default_value = "mark_overdue")]
        overdue_handling: OverdueHandling,
        /// Free-form label (repeatable)
        #[arg(long = "label")]
        labels: Vec<String>,
    },
    /// List chores with their global state
    List,
    /// Show one chore in full
    Show { name: String },
    /// Kid claims a chore
    Claim { kid: String, chore: String },
    /// Parent approves a claimed chore
    Approve {
        parent: String,
        kid: String,
        chore: String,
        /// Award this many points instead of the chore default
        #[arg(long)]
        points: Option<f64>,
    },
    /// Parent disapproves a claimed chore
    Disapprove {
        parent: String,
        kid: String,
        chore: String,
    },
    /// Set or clear a chore's due date
    Due {
        chore: String,
        /// New due date (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_instant, conflicts_with = "clear")]
        date: Option<DateTime<Utc>>,
        #[arg(long)]
        clear: bool,
    },
    /// Skip to the next occurrence
    Skip { chore: String },
    /// Reset overdue chores to pending
    ResetOverdue {
        #[arg(long)]
        chore: Option<String>,
        #[arg(long)]
        kid: Option<String>,
    },
    /// Reset every chore to pending
    ResetAll,
    /// Rename a chore
    Rename { name: String, new_name: String },
    /// Remove a chore
    Remove { name: String },
}

fn frequency(kind: &str, every: Option<u32>, unit: Option<IntervalUnit>) -> Result<Frequency, String> {
    let freq = match kind.to_ascii_lowercase().as_str() {
        "none" => Frequency::None,
        "daily" => Frequency::Daily,
        "weekly" => Frequency::Weekly,
        "biweekly" => Frequency::Biweekly,
        "monthly" => Frequency::Monthly,
        "custom" => {
            let interval = every.ok_or("--every is required for a custom frequency")?;
            let unit = unit.ok_or("--unit is required for a custom frequency")?;
            Frequency::Custom { interval, unit }
        }
        other => return Err(format!("unknown frequency '{other}'")),
    };
    Ok(freq)
}

pub fn run(action: ChoreAction) -> CmdResult {
    let mut coordinator = open()?;

    match action {
        ChoreAction::Add {
            name,
            points,
            kids,
            description,
            mode,
            frequency: kind,
            every,
            unit,
            days,
            due,
            auto_approve,
            reset_policy,
            overdue_handling,
            labels,
        } => {
            let points = points.unwrap_or(coordinator.config().defaults.chore_points);
            let mut chore = Chore::new(name, points);
            chore.description = description;
            chore.assigned_kids = kid_ids(&coordinator, &kids)?;
            chore.completion_mode = mode;
            chore.recurrence.frequency = frequency(&kind, every, unit)?;
            chore.recurrence.applicable_days = days;
            chore.due_date = due;
            chore.auto_approve = auto_approve;
            chore.approval_reset = reset_policy;
            chore.overdue_handling = overdue_handling;
            chore.labels = labels;
            let id = coordinator.add_chore(chore)?;
            println!("Chore created: {id}");
        }
        ChoreAction::List => {
            print_json(&coordinator.status().chores)?;
        }
        ChoreAction::Show { name } => {
            print_json(coordinator.chore(&name)?)?;
        }
        ChoreAction::Claim { kid, chore } => {
            print_report(&coordinator.claim_chore(&kid, &chore)?)?;
        }
        ChoreAction::Approve {
            parent,
            kid,
            chore,
            points,
        } => {
            print_report(&coordinator.approve_chore(&parent, &kid, &chore, points)?)?;
        }
        ChoreAction::Disapprove { parent, kid, chore } => {
            print_report(&coordinator.disapprove_chore(&parent, &kid, &chore)?)?;
        }
        ChoreAction::Due { chore, date, clear } => {
            if date.is_none() && !clear {
                return Err("either --date or --clear is required".into());
            }
            print_report(&coordinator.set_chore_due_date(&chore, date)?)?;
        }
        ChoreAction::Skip { chore } => {
            print_report(&coordinator.skip_chore_due_date(&chore)?)?;
        }
        ChoreAction::ResetOverdue { chore, kid } => {
            print_report(&coordinator.reset_overdue_chores(chore.as_deref(), kid.as_deref())?)?;
        }
        ChoreAction::ResetAll => {
            print_report(&coordinator.reset_all_chores()?)?;
        }
        ChoreAction::Rename { name, new_name } => {
            let id = coordinator.rename(EntityKind::Chore, &name, &new_name)?;
            println!("Chore renamed: {id}");
        }
        ChoreAction::Remove { name } => {
            let id = coordinator.remove(EntityKind::Chore, &name)?;
            println!("Chore removed: {id}");
        }
    }
    Ok(())
}
