//! Badge, achievement and challenge definitions.

use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use kidschores_core::model::{
    Achievement, AchievementKind, Badge, BadgeKind, BadgePeriod, Challenge, ChallengeKind,
    PeriodicCriteria,
};
use kidschores_core::{Coordinator, EntityKind};

use super::{kid_ids, open, parse_date, parse_instant, parse_snake, print_json, CmdResult};

#[derive(Subcommand)]
pub enum BadgeAction {
    /// Define a badge
    Add {
        name: String,
        /// cumulative, daily, periodic, achievement, challenge or special
        #[arg(long = "type", default_value = "cumulative")]
        kind: String,
        /// Points or chore count that triggers the badge
        #[arg(long)]
        threshold: Option<f64>,
        /// weekly or monthly (periodic badges)
        #[arg(long)]
        period: Option<String>,
        /// Window start for a periodic badge (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date, requires = "until")]
        from: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date)]
        until: Option<NaiveDate>,
        /// points or chore_count (periodic badges)
        #[arg(long, value_parser = parse_snake::<PeriodicCriteria>, default_value = "points")]
        criteria: PeriodicCriteria,
        /// Linked achievement or challenge name
        #[arg(long)]
        target: Option<String>,
        /// Date of a special badge (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Award a special badge every year
        #[arg(long)]
        recurring: bool,
        /// Bonus points granted on award (default: defaults.badge_award_points)
        #[arg(long)]
        award_points: Option<f64>,
        #[arg(long, default_value_t = 1.0)]
        multiplier: f64,
        /// Reward granted free on award
        #[arg(long)]
        reward: Option<String>,
        /// Restrict to a kid (repeatable)
        #[arg(long = "kid")]
        kids: Vec<String>,
    },
    /// List badges
    List,
    /// Remove a badge
    Remove { name: String },
}

#[derive(Subcommand)]
pub enum AchievementAction {
    /// Define an achievement
    Add {
        name: String,
        /// streak, total or daily_minimum
        #[arg(long = "type", default_value = "total")]
        kind: String,
        /// Target days or approvals
        #[arg(long)]
        count: u32,
        /// Only count approvals of this chore
        #[arg(long)]
        chore: Option<String>,
        #[arg(long, default_value_t = 0.0)]
        points: f64,
        #[arg(long = "kid")]
        kids: Vec<String>,
    },
    /// List achievements
    List,
    /// Remove an achievement
    Remove { name: String },
}

#[derive(Subcommand)]
pub enum ChallengeAction {
    /// Define a challenge
    Add {
        name: String,
        /// total or daily_minimum
        #[arg(long = "type", default_value = "total")]
        kind: String,
        #[arg(long)]
        count: u32,
        #[arg(long)]
        chore: Option<String>,
        /// Window start (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_instant)]
        start: DateTime<Utc>,
        /// Window end (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_instant)]
        end: DateTime<Utc>,
        #[arg(long, default_value_t = 0.0)]
        points: f64,
        #[arg(long = "kid")]
        kids: Vec<String>,
    },
    /// List challenges
    List,
    /// Remove a challenge
    Remove { name: String },
}

fn resolve_opt(
    coordinator: &Coordinator,
    kind: EntityKind,
    name: Option<&str>,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    Ok(match name {
        Some(n) => Some(coordinator.resolve(kind, n)?),
        None => None,
    })
}

pub fn run_badge(action: BadgeAction) -> CmdResult {
    let mut coordinator = open()?;

    match action {
        BadgeAction::Add {
            name,
            kind,
            threshold,
            period,
            from,
            until,
            criteria,
            target,
            date,
            recurring,
            award_points,
            multiplier,
            reward,
            kids,
        } => {
            let defaults = coordinator.config().defaults.clone();
            let kind = match kind.as_str() {
                "cumulative" => BadgeKind::Cumulative {
                    threshold: threshold.unwrap_or(defaults.badge_threshold_value),
                },
                "daily" => BadgeKind::Daily {
                    threshold: threshold
                        .map(|t| t.max(1.0) as u32)
                        .unwrap_or(defaults.badge_daily_threshold),
                },
                "periodic" => {
                    let period = match (period.as_deref(), from, until) {
                        (_, Some(start), Some(end)) => BadgePeriod::Window { start, end },
                        (Some("weekly") | None, _, _) => BadgePeriod::Weekly,
                        (Some("monthly"), _, _) => BadgePeriod::Monthly,
                        (Some(other), _, _) => {
                            return Err(format!("unknown period '{other}'").into())
                        }
                    };
                    BadgeKind::Periodic {
                        period,
                        criteria,
                        threshold: threshold.unwrap_or(defaults.badge_threshold_value),
                    }
                }
                "achievement" => {
                    let target = target.as_deref().ok_or("--target is required")?;
                    BadgeKind::Achievement {
                        achievement_id: coordinator.resolve(EntityKind::Achievement, target)?,
                    }
                }
                "challenge" => {
                    let target = target.as_deref().ok_or("--target is required")?;
                    BadgeKind::Challenge {
                        challenge_id: coordinator.resolve(EntityKind::Challenge, target)?,
                    }
                }
                "special" => BadgeKind::Special {
                    date: date.ok_or("--date is required for a special badge")?,
                    recurring,
                },
                other => return Err(format!("unknown badge type '{other}'").into()),
            };

            let mut badge = Badge::new(name, kind);
            badge.award_points = award_points.unwrap_or(defaults.badge_award_points);
            badge.multiplier = multiplier;
            badge.reward_id = resolve_opt(&coordinator, EntityKind::Reward, reward.as_deref())?;
            badge.assigned_kids = kid_ids(&coordinator, &kids)?;
            let id = coordinator.add_badge(badge)?;
            println!("Badge created: {id}");
        }
        BadgeAction::List => {
            let badges: Vec<&Badge> = coordinator.store().badges.values().collect();
            print_json(&badges)?;
        }
        BadgeAction::Remove { name } => {
            let id = coordinator.remove(EntityKind::Badge, &name)?;
            println!("Badge removed: {id}");
        }
    }
    Ok(())
}

pub fn run_achievement(action: AchievementAction) -> CmdResult {
    let mut coordinator = open()?;

    match action {
        AchievementAction::Add {
            name,
            kind,
            count,
            chore,
            points,
            kids,
        } => {
            let chore_id = resolve_opt(&coordinator, EntityKind::Chore, chore.as_deref())?;
            let kind = match kind.replace('-', "_").as_str() {
                "streak" => AchievementKind::Streak {
                    chore_id,
                    days: count,
                },
                "total" => AchievementKind::Total { chore_id, count },
                "daily_minimum" => AchievementKind::DailyMinimum { count },
                other => return Err(format!("unknown achievement type '{other}'").into()),
            };
            let mut achievement = Achievement::new(name, kind);
            achievement.reward_points = points;
            achievement.assigned_kids = kid_ids(&coordinator, &kids)?;
            let id = coordinator.add_achievement(achievement)?;
            println!("Achievement created: {id}");
        }
        AchievementAction::List => {
            let achievements: Vec<&Achievement> =
                coordinator.store().achievements.values().collect();
            print_json(&achievements)?;
        }
        AchievementAction::Remove { name } => {
            let id = coordinator.remove(EntityKind::Achievement, &name)?;
            println!("Achievement removed: {id}");
        }
    }
    Ok(())
}

pub fn run_challenge(action: ChallengeAction) -> CmdResult {
    let mut coordinator = open()?;

    match action {
        ChallengeAction::Add {
            name,
            kind,
            count,
            chore,
            start,
            end,
            points,
            kids,
        } => {
            if end < start {
                return Err("--end must not be before --start".into());
            }
            let kind = match kind.replace('-', "_").as_str() {
                "total" => ChallengeKind::TotalWithinWindow {
                    chore_id: resolve_opt(&coordinator, EntityKind::Chore, chore.as_deref())?,
                    count,
                },
                "daily_minimum" => ChallengeKind::DailyMinimum { count },
                other => return Err(format!("unknown challenge type '{other}'").into()),
            };
            let mut challenge = Challenge::new(name, kind, start, end);
            challenge.reward_points = points;
            challenge.assigned_kids = kid_ids(&coordinator, &kids)?;
            let id = coordinator.add_challenge(challenge)?;
            println!("Challenge created: {id}");
        }
        ChallengeAction::List => {
            let challenges: Vec<&Challenge> = coordinator.store().challenges.values().collect();
            print_json(&challenges)?;
        }
        ChallengeAction::Remove { name } => {
            let id = coordinator.remove(EntityKind::Challenge, &name)?;
            println!("Challenge removed: {id}");
        }
    }
    Ok(())
}
