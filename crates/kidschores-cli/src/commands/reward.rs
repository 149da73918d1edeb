use clap::Subcommand;
use kidschores_core::model::Reward;
use kidschores_core::EntityKind;

use super::{open, print_json, print_report, CmdResult};

#[derive(Subcommand)]
pub enum RewardAction {
    /// Define a reward
    Add {
        name: String,
        /// Cost in points (default: defaults.reward_cost)
        #[arg(long)]
        cost: Option<f64>,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List rewards
    List,
    /// Request a reward for a kid
    Redeem {
        parent: String,
        kid: String,
        reward: String,
    },
    /// Approve the oldest pending request and debit the cost
    Approve {
        parent: String,
        kid: String,
        reward: String,
    },
    /// Reject the oldest pending request
    Disapprove {
        parent: String,
        kid: String,
        reward: String,
    },
    /// Clear claim and approval counters and pending requests
    Reset {
        #[arg(long)]
        reward: Option<String>,
        #[arg(long)]
        kid: Option<String>,
    },
    /// Rename a reward
    Rename { name: String, new_name: String },
    /// Remove a reward
    Remove { name: String },
}

pub fn run(action: RewardAction) -> CmdResult {
    let mut coordinator = open()?;

    match action {
        RewardAction::Add {
            name,
            cost,
            description,
        } => {
            let cost = cost.unwrap_or(coordinator.config().defaults.reward_cost);
            let mut reward = Reward::new(name, cost);
            reward.description = description;
            let id = coordinator.add_reward(reward)?;
            println!("Reward created: {id}");
        }
        RewardAction::List => {
            let rewards: Vec<&Reward> = coordinator.store().rewards.values().collect();
            print_json(&rewards)?;
        }
        RewardAction::Redeem {
            parent,
            kid,
            reward,
        } => {
            print_report(&coordinator.redeem_reward(&parent, &kid, &reward)?)?;
        }
        RewardAction::Approve {
            parent,
            kid,
            reward,
        } => {
            print_report(&coordinator.approve_reward(&parent, &kid, &reward)?)?;
        }
        RewardAction::Disapprove {
            parent,
            kid,
            reward,
        } => {
            print_report(&coordinator.disapprove_reward(&parent, &kid, &reward)?)?;
        }
        RewardAction::Reset { reward, kid } => {
            print_report(&coordinator.reset_rewards(reward.as_deref(), kid.as_deref())?)?;
        }
        RewardAction::Rename { name, new_name } => {
            let id = coordinator.rename(EntityKind::Reward, &name, &new_name)?;
            println!("Reward renamed: {id}");
        }
        RewardAction::Remove { name } => {
            let id = coordinator.remove(EntityKind::Reward, &name)?;
            println!("Reward removed: {id}");
        }
    }
    Ok(())
}
