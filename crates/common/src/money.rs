//! Money amounts in integer cents.

use serde::{Deserialize, Serialize};

/// Money amount represented in cents to avoid floating point issues.
///
/// Serialized as a bare integer number of cents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents * i64::from(quantity),
        }
    }

    /// Multiplies by a quantity, returning None on overflow.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    /// Adds two amounts, returning None on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.cents.checked_add(other.cents).map(Money::from_cents)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}
