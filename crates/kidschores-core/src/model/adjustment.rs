//! Penalties and bonuses: named, immediate point adjustments.

use serde::{Deserialize, Serialize};

use super::new_id;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Penalty {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Magnitude; always applied as a debit.
    pub points: f64,
}

impl Penalty {
    pub fn new(name: impl Into<String>, points: f64) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: String::new(),
            points: points.abs(),
        }
    }

    pub fn delta(&self) -> f64 {
        -self.points.abs()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bonus {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub points: f64,
}

impl Bonus {
    pub fn new(name: impl Into<String>, points: f64) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: String::new(),
            points: points.abs(),
        }
    }

    pub fn delta(&self) -> f64 {
        self.points.abs()
    }
}
