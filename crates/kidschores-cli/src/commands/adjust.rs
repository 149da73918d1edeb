//! Penalties, bonuses and manual point adjustments.

use clap::Subcommand;
use kidschores_core::model::{Bonus, Penalty};
use kidschores_core::EntityKind;

use super::{open, print_json, print_report, CmdResult};

#[derive(Subcommand)]
pub enum PenaltyAction {
    /// Define a penalty
    Add {
        name: String,
        /// Points deducted (default: defaults.penalty_points)
        #[arg(long)]
        points: Option<f64>,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List penalties
    List,
    /// Apply a penalty to a kid
    Apply {
        parent: String,
        kid: String,
        penalty: String,
    },
    /// Clear application counters
    Reset {
        #[arg(long)]
        penalty: Option<String>,
        #[arg(long)]
        kid: Option<String>,
    },
    Rename { name: String, new_name: String },
    Remove { name: String },
}

#[derive(Subcommand)]
pub enum BonusAction {
    /// Define a bonus
    Add {
        name: String,
        /// Points granted (default: defaults.bonus_points)
        #[arg(long)]
        points: Option<f64>,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List bonuses
    List,
    /// Apply a bonus to a kid
    Apply {
        parent: String,
        kid: String,
        bonus: String,
    },
    /// Clear application counters
    Reset {
        #[arg(long)]
        bonus: Option<String>,
        #[arg(long)]
        kid: Option<String>,
    },
    Rename { name: String, new_name: String },
    Remove { name: String },
}

#[derive(Subcommand)]
pub enum PointsAction {
    /// Add (or with a negative value, remove) points
    Adjust {
        parent: String,
        kid: String,
        #[arg(allow_hyphen_values = true)]
        delta: f64,
    },
    /// Show a kid's ledger, oldest first
    History { kid: String },
}

pub fn run_penalty(action: PenaltyAction) -> CmdResult {
    let mut coordinator = open()?;

    match action {
        PenaltyAction::Add {
            name,
            points,
            description,
        } => {
            let points = points.unwrap_or(coordinator.config().defaults.penalty_points);
            let mut penalty = Penalty::new(name, points);
            penalty.description = description;
            let id = coordinator.add_penalty(penalty)?;
            println!("Penalty created: {id}");
        }
        PenaltyAction::List => {
            let penalties: Vec<&Penalty> = coordinator.store().penalties.values().collect();
            print_json(&penalties)?;
        }
        PenaltyAction::Apply {
            parent,
            kid,
            penalty,
        } => {
            print_report(&coordinator.apply_penalty(&parent, &kid, &penalty)?)?;
        }
        PenaltyAction::Reset { penalty, kid } => {
            print_report(&coordinator.reset_penalties(penalty.as_deref(), kid.as_deref())?)?;
        }
        PenaltyAction::Rename { name, new_name } => {
            let id = coordinator.rename(EntityKind::Penalty, &name, &new_name)?;
            println!("Penalty renamed: {id}");
        }
        PenaltyAction::Remove { name } => {
            let id = coordinator.remove(EntityKind::Penalty, &name)?;
            println!("Penalty removed: {id}");
        }
    }
    Ok(())
}

pub fn run_bonus(action: BonusAction) -> CmdResult {
    let mut coordinator = open()?;

    match action {
        BonusAction::Add {
            name,
            points,
            description,
        } => {
            let points = points.unwrap_or(coordinator.config().defaults.bonus_points);
            let mut bonus = Bonus::new(name, points);
            bonus.description = description;
            let id = coordinator.add_bonus(bonus)?;
            println!("Bonus created: {id}");
        }
        BonusAction::List => {
            let bonuses: Vec<&Bonus> = coordinator.store().bonuses.values().collect();
            print_json(&bonuses)?;
        }
        BonusAction::Apply { parent, kid, bonus } => {
            print_report(&coordinator.apply_bonus(&parent, &kid, &bonus)?)?;
        }
        BonusAction::Reset { bonus, kid } => {
            print_report(&coordinator.reset_bonuses(bonus.as_deref(), kid.as_deref())?)?;
        }
        BonusAction::Rename { name, new_name } => {
            let id = coordinator.rename(EntityKind::Bonus, &name, &new_name)?;
            println!("Bonus renamed: {id}");
        }
        BonusAction::Remove { name } => {
            let id = coordinator.remove(EntityKind::Bonus, &name)?;
            println!("Bonus removed: {id}");
        }
    }
    Ok(())
}

pub fn run_points(action: PointsAction) -> CmdResult {
    let mut coordinator = open()?;

    match action {
        PointsAction::Adjust { parent, kid, delta } => {
            print_report(&coordinator.adjust_points(&parent, &kid, delta)?)?;
        }
        PointsAction::History { kid } => {
            print_json(&coordinator.history(&kid)?)?;
        }
    }
    Ok(())
}
