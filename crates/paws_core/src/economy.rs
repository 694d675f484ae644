//! Paw Points economy.
//!
//! Implements the wallet, sell refunds and the income-tower payout system.
//! All amounts are whole Paw Points; spending is checked before any state
//! change so a rejected purchase leaves the match untouched.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::events::{GameEvent, IncomeSource, TickEvents};
use crate::progression::TowerRole;
use crate::status::StatusKind;
use crate::world::World;

/// The player's Paw Points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Wallet {
    /// Current balance.
    pub balance: u32,
    /// Total ever credited.
    pub earned: u64,
    /// Total ever spent.
    pub spent: u64,
}

impl Wallet {
    /// Wallet with a starting balance.
    #[must_use]
    pub const fn new(balance: u32) -> Self {
        Self {
            balance,
            earned: 0,
            spent: 0,
        }
    }

    /// Check if the player can afford a cost.
    #[must_use]
    pub const fn can_afford(&self, cost: u32) -> bool {
        self.balance >= cost
    }

    /// Fail with [`GameError::InsufficientFunds`] unless `cost` is affordable.
    pub fn ensure(&self, cost: u32) -> Result<()> {
        if self.can_afford(cost) {
            Ok(())
        } else {
            Err(GameError::InsufficientFunds {
                required: cost,
                available: self.balance,
            })
        }
    }

    /// Spend Paw Points, or fail without changing the balance.
    pub fn spend(&mut self, cost: u32) -> Result<()> {
        self.ensure(cost)?;
        self.balance -= cost;
        self.spent += u64::from(cost);
        Ok(())
    }

    /// Credit Paw Points.
    pub fn earn(&mut self, amount: u32) {
        self.balance = self.balance.saturating_add(amount);
        self.earned += u64::from(amount);
    }
}

/// Refund for selling a tower: `floor(invested × percent / 100)`.
#[must_use]
pub fn sell_refund(invested: u32, refund_percent: u32) -> u32 {
    let refund = u64::from(invested) * u64::from(refund_percent.min(100)) / 100;
    refund as u32
}

/// Pay out income towers whose interval elapsed.
///
/// A payout moves `last_income` forward by whole intervals, so long ticks
/// never lose income and never pay twice for the same interval.
pub fn income_system(world: &mut World, events: &mut TickEvents) {
    let now = world.now;
    for id in world.towers.sorted_ids() {
        let Some(tower) = world.towers.get_mut(id) else {
            continue;
        };
        if tower.kind.role() != TowerRole::Income || tower.debuffs.has(StatusKind::Disable, now) {
            continue;
        }
        let (Some(amount), Some(interval)) = (tower.stats.income, tower.stats.income_interval_ms)
        else {
            continue;
        };
        let interval = u64::from(interval.max(1));
        let mut paid = 0;
        while now.saturating_sub(tower.last_income) >= interval {
            tower.last_income += interval;
            paid += amount;
        }
        if paid > 0 {
            world.wallet.earn(paid);
            events.push(GameEvent::IncomeEarned {
                amount: paid,
                source: IncomeSource::Tower(id),
            });
        }
    }
}
