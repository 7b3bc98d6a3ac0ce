//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With floats:                                                           │
//! │    10.00 × 2 + 6.90 = 26.900000000000002  ❌ WRONG!                     │
//! │                                                                         │
//! │  Payment processors want integer minor units anyway:                    │
//! │    Stripe unit_amount = 1000 (not 10.0)                                 │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    1000 × 2 + 690 = 2690 cents = €26.90, exactly                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use comptoir_core::money::Money;
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(1099); // €10.99
//!
//! // Arithmetic operations
//! let doubled = price * 2;                    // €21.98
//! let total = price + Money::from_cents(500); // €15.99
//! assert_eq!(total.cents(), 1599);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents for EUR).
///
/// ## Where Money Flows
/// ```text
/// Product.price_cents ──► CartItemDetail.line_total ──► CartDetails.total
///                                                           │
/// Carrier.price_cents ──────────────────────────────────────┤
///                                                           ▼
///                                   OrderTotals.total ──► Order.total_cents
///                                                           │
///                                                           ▼
///                                   PaymentSessionRequest.amount (gateway)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use comptoir_core::money::Money;
    ///
    /// let price = Money::from_cents(690); // Represents €6.90
    /// assert_eq!(price.cents(), 690);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (euros and cents).
    ///
    /// ## Example
    /// ```rust
    /// use comptoir_core::money::Money;
    ///
    /// let price = Money::from_major_minor(12, 90); // €12.90
    /// assert_eq!(price.cents(), 1290);
    ///
    /// let negative = Money::from_major_minor(-5, 50); // -€5.50 (refund)
    /// assert_eq!(negative.cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (euros) portion.
    ///
    /// ## Example
    /// ```rust
    /// use comptoir_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).major(), 10);
    /// assert_eq!(Money::from_cents(-550).major(), -5);
    /// ```
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates tax on this amount, rounding half up on the cent.
    ///
    /// ## Implementation
    /// Integer math only: `(amount * bps + 5000) / 10000`
    ///
    /// ## Example
    /// ```rust
    /// use comptoir_core::money::Money;
    /// use comptoir_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_cents(2000);   // €20.00
    /// let vat = TaxRate::from_bps(2000);        // 20%
    /// assert_eq!(subtotal.calculate_tax(vat).cents(), 400);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 keeps large carts from overflowing before the division
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use comptoir_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(1000);
    /// assert_eq!(unit_price.multiply_quantity(2).cents(), 2000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Formats the amount as a plain decimal string ("26.90").
    ///
    /// PayPal expects amounts in this shape rather than in minor units.
    ///
    /// ## Example
    /// ```rust
    /// use comptoir_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(2690).to_decimal_string(), "26.90");
    /// assert_eq!(Money::from_cents(5).to_decimal_string(), "0.05");
    /// assert_eq!(Money::from_cents(-550).to_decimal_string(), "-5.50");
    /// ```
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.major().abs(), self.cents_part())
    }

    /// Parses a decimal string ("26.90", "26.9", "26") into Money.
    ///
    /// Used for amounts that come back from PayPal. Returns `None` for
    /// anything that isn't a plain decimal with at most two fraction digits.
    ///
    /// ## Example
    /// ```rust
    /// use comptoir_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("26.90"), Some(Money::from_cents(2690)));
    /// assert_eq!(Money::parse_decimal("26.9"), Some(Money::from_cents(2690)));
    /// assert_eq!(Money::parse_decimal("26"), Some(Money::from_cents(2600)));
    /// assert_eq!(Money::parse_decimal("26.999"), None);
    /// assert_eq!(Money::parse_decimal("abc"), None);
    /// ```
    pub fn parse_decimal(value: &str) -> Option<Money> {
        let value = value.trim();
        let (negative, digits) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value),
        };

        let (major_str, minor_str) = match digits.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (digits, ""),
        };

        if major_str.is_empty()
            || minor_str.len() > 2
            || !major_str.chars().all(|c| c.is_ascii_digit())
            || !minor_str.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }

        let major: i64 = major_str.parse().ok()?;
        let minor: i64 = match minor_str.len() {
            0 => 0,
            1 => minor_str.parse::<i64>().ok()? * 10,
            _ => minor_str.parse().ok()?,
        };

        let cents = major.checked_mul(100)?.checked_add(minor)?;
        Some(Money(if negative { -cents } else { cents }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the amount with a euro sign, e.g. "€26.90".
///
/// ## Note
/// Storefront templates do their own locale formatting; this is for logs
/// and for messages built on the server.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}€{}.{:02}", sign, self.major().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Summing line totals.
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
