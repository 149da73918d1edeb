//! Kid and parent management commands.

use clap::Subcommand;
use kidschores_core::model::{Kid, Parent};
use kidschores_core::EntityKind;

use super::{kid_ids, open, print_json, CmdResult};

#[derive(Subcommand)]
pub enum KidAction {
    /// Add a kid
    Add {
        name: String,
        /// Linked user account
        #[arg(long)]
        user: Option<String>,
        /// Suppress notifications for this kid
        #[arg(long)]
        no_notifications: bool,
    },
    /// List kids with balances and chore states
    List,
    /// Show one kid in full
    Show { name: String },
    /// Rename a kid
    Rename { name: String, new_name: String },
    /// Remove a kid and every reference to it
    Remove { name: String },
}

#[derive(Subcommand)]
pub enum ParentAction {
    /// Add a parent
    Add {
        name: String,
        /// Kid the parent may act for (repeatable; none means all kids)
        #[arg(long = "kid")]
        kids: Vec<String>,
        #[arg(long)]
        user: Option<String>,
    },
    /// List parents
    List,
    /// Rename a parent
    Rename { name: String, new_name: String },
    /// Remove a parent
    Remove { name: String },
}

pub fn run(action: KidAction) -> CmdResult {
    let mut coordinator = open()?;

    match action {
        KidAction::Add {
            name,
            user,
            no_notifications,
        } => {
            let mut kid = Kid::new(name);
            kid.linked_user = user;
            kid.enable_notifications = !no_notifications;
            let id = coordinator.add_kid(kid)?;
            println!("Kid created: {id}");
        }
        KidAction::List => {
            print_json(&coordinator.status().kids)?;
        }
        KidAction::Show { name } => {
            print_json(coordinator.kid(&name)?)?;
        }
        KidAction::Rename { name, new_name } => {
            let id = coordinator.rename(EntityKind::Kid, &name, &new_name)?;
            println!("Kid renamed: {id}");
        }
        KidAction::Remove { name } => {
            let id = coordinator.remove(EntityKind::Kid, &name)?;
            println!("Kid removed: {id}");
        }
    }
    Ok(())
}

pub fn run_parent(action: ParentAction) -> CmdResult {
    let mut coordinator = open()?;

    match action {
        ParentAction::Add { name, kids, user } => {
            let mut parent = Parent::new(name);
            parent.associated_kids = kid_ids(&coordinator, &kids)?;
            parent.linked_user = user;
            let id = coordinator.add_parent(parent)?;
            println!("Parent created: {id}");
        }
        ParentAction::List => {
            let parents: Vec<&Parent> = coordinator.store().parents.values().collect();
            print_json(&parents)?;
        }
        ParentAction::Rename { name, new_name } => {
            let id = coordinator.rename(EntityKind::Parent, &name, &new_name)?;
            println!("Parent renamed: {id}");
        }
        ParentAction::Remove { name } => {
            let id = coordinator.remove(EntityKind::Parent, &name)?;
            println!("Parent removed: {id}");
        }
    }
    Ok(())
}
