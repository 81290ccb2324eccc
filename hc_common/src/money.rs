use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const RUB_CURRENCY_CODE: &str = "RUB";
pub const RUB_CURRENCY_CODE_LOWER: &str = "rub";

//--------------------------------------       Money         ---------------------------------------------------------
/// An amount of money, stored as a whole number of kopecks (1/100 of a rouble).
///
/// Order totals, line-item prices and shift profits are all `Money`. Using an integer representation keeps the
/// arithmetic exact, and the transparent sqlx derive means the value is stored as a plain INTEGER column.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as Money: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {} is too large to convert to Money", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let roubles = self.0 / 100;
        let kopecks = (self.0 % 100).abs();
        write!(f, "{roubles}.{kopecks:02}₽")
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_roubles(roubles: i64) -> Self {
        Self(roubles * 100)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn money_arithmetic() {
        let a = Money::from(10_050);
        let b = Money::from(4_950);
        assert_eq!(a + b, Money::from(15_000));
        assert_eq!(a - b, Money::from(5_100));
        assert_eq!(a * 3, Money::from(30_150));
        assert_eq!(-b, Money::from(-4_950));
        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total, Money::from(19_950));
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::from(25_000).to_string(), "250.00₽");
        assert_eq!(Money::from(10_005).to_string(), "100.05₽");
        assert_eq!(Money::from_roubles(99).to_string(), "99.00₽");
    }
}
