//! Money represented in integer cents.
//!
//! Storing cents keeps line subtotals exact: `price * quantity` never needs
//! rounding when the unit price already has at most two fractional digits.
//! Rounding (half away from zero) only happens when parsing decimal text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error parsing a decimal string into [`Money`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyParseError {
    /// The input was empty or contained no digits.
    #[error("empty amount")]
    Empty,
    /// The input contained characters other than digits, one leading minus,
    /// and one decimal point.
    #[error("invalid amount: {0:?}")]
    Invalid(String),
    /// The amount does not fit in 64-bit cents.
    #[error("amount out of range: {0:?}")]
    OutOfRange(String),
}

/// Money amount in cents (e.g. 1000 = 10.00).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates an amount from cents.
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

    /// Returns true if the amount is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies a unit price by a line quantity.
    ///
    /// Exact in cents, so the two-decimal rounding required for subtotals is
    /// a no-op here. `None` when the product does not fit in 64-bit cents.
    pub fn times(&self, quantity: i64) -> Option<Money> {
        self.cents
            .checked_mul(quantity)
            .map(|cents| Money { cents })
    }

    /// Parses a decimal string (`"12.34"`, `"-0.5"`, `"7"`) into cents,
    /// rounding any digits beyond the second fractional place half away
    /// from zero.
    pub fn parse(input: &str) -> Result<Money, MoneyParseError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(MoneyParseError::Empty);
        }

        let (negative, unsigned) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = match unsigned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (unsigned, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(MoneyParseError::Empty);
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(MoneyParseError::Invalid(input.to_string()));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| MoneyParseError::OutOfRange(input.to_string()))?
        };

        let mut digits = frac.bytes().map(|b| i64::from(b - b'0'));
        let mut frac_cents = digits.next().unwrap_or(0) * 10 + digits.next().unwrap_or(0);
        // Half away from zero: the third fractional digit decides.
        if digits.next().unwrap_or(0) >= 5 {
            frac_cents += 1;
        }

        let magnitude = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .ok_or_else(|| MoneyParseError::OutOfRange(input.to_string()))?;

        Ok(Money {
            cents: if negative { -magnitude } else { magnitude },
        })
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.cents.abs() / 100, self.cents.abs() % 100)
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

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.cents -= rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}
