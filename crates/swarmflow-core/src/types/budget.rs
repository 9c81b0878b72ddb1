//! Budget tracking for cost gating
//!
//! The core does no cost accounting of its own; hosts record spend through
//! this helper and surface overruns as approval pauses.

use serde::{Deserialize, Serialize};

/// Spending limit and running total for one workflow instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Maximum allowed spend
    pub limit: f64,
    /// Amount spent so far
    pub spent: f64,
}

impl Budget {
    /// Create a budget with nothing spent yet
    pub fn new(limit: f64) -> Self {
        Self { limit, spent: 0.0 }
    }

    /// Check if an additional amount still fits within the limit
    pub fn has_remaining(&self, amount: f64) -> bool {
        self.spent + amount <= self.limit
    }

    /// Remaining headroom
    pub fn remaining(&self) -> f64 {
        self.limit - self.spent
    }

    /// Record additional spend
    pub fn add_spent(self, amount: f64) -> Self {
        Self {
            limit: self.limit,
            spent: self.spent + amount,
        }
    }

    /// Audit line summarizing the spend, e.g. `BUDGET: Spent $2.50 of $10.00`
    pub fn summary_line(&self) -> String {
        format!("BUDGET: Spent ${:.2} of ${:.2}", self.spent, self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_gating() {
        let budget = Budget::new(10.0).add_spent(7.5);
        assert!(budget.has_remaining(2.5));
        assert!(!budget.has_remaining(2.51));
        assert!((budget.remaining() - 2.5).abs() < f64::EPSILON);
        assert_eq!(budget.summary_line(), "BUDGET: Spent $7.50 of $10.00");
    }
}
