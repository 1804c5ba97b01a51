//! Rupee amounts.
//!
//! Catalog and order data carry prices as display strings (`"₹120"`,
//! `"₹48.50"`). They are parsed once, leniently, into [`Money`] and only
//! formatted again for display.

use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};
use std::str::FromStr;
use std::sync::LazyLock;

/// Leading decimal number of a cleaned price string: `12`, `12.`, `12.5` or `.5`
static LEADING_AMOUNT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(?:\d+(?:\.\d*)?|\.\d+)").ok());

/// Currency symbol used for display
pub const RUPEE: &str = "₹";

/// An amount in rupees
///
/// Serialized as its display string, so stored records read like
/// `"total": "₹140.00"`. Arithmetic saturates at [`Money::MAX`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Money(Decimal);

impl Money {
    /// Zero rupees
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest representable amount
    pub const MAX: Self = Self(Decimal::MAX);

    /// Wrap a decimal amount
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Whole rupees
    #[must_use]
    pub fn from_rupees(rupees: i64) -> Self {
        Self(Decimal::from(rupees))
    }

    /// Rupees and paise, e.g. `from_paise(4850)` is ₹48.50
    #[must_use]
    pub fn from_paise(paise: i64) -> Self {
        Self(Decimal::new(paise, 2))
    }

    /// Parse a display price the forgiving way
    ///
    /// Every character other than ASCII digits and `.` is dropped, then the
    /// longest leading decimal number is read (`"12."` and `".5"` included).
    /// Text with no leading number is zero; numbers too large to represent
    /// become [`Money::MAX`].
    ///
    /// ```
    /// use freshcart::money::Money;
    ///
    /// assert_eq!(Money::parse_lenient("₹1,299.50"), Money::from_paise(129_950));
    /// assert_eq!(Money::parse_lenient("Rs. 75"), Money::from_paise(75));
    /// assert_eq!(Money::parse_lenient("free"), Money::ZERO);
    /// ```
    #[must_use]
    pub fn parse_lenient(text: &str) -> Self {
        let cleaned: String = text
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        let Some(amount) = LEADING_AMOUNT
            .as_ref()
            .and_then(|pattern| pattern.find(&cleaned))
        else {
            return Self::ZERO;
        };

        let digits = amount.as_str().trim_end_matches('.');
        let normalized = if digits.starts_with('.') {
            format!("0{digits}")
        } else {
            digits.to_string()
        };
        // The pattern only admits well-formed numbers, so a failed parse is an overflow.
        Decimal::from_str(&normalized).map_or(Self::MAX, Self)
    }

    /// The underlying decimal
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Whether this is zero rupees
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        write!(f, "{RUPEE}{rounded:.2}")
    }
}

impl FromStr for Money {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_lenient(s))
    }
}

impl From<String> for Money {
    fn from(text: String) -> Self {
        Self::parse_lenient(&text)
    }
}

impl From<Money> for String {
    fn from(money: Money) -> Self {
        money.to_string()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}
