use std::fmt::{self, Display};
use std::io::prelude::*;
use std::str::FromStr;

use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::BigInt;
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

const CENTS_IN_DOLLAR: i64 = 100;

/// Monetary amount in cents of the booking currency.
///
/// Amounts are never negative: deserialization and database reads reject
/// negative values, and the arithmetic is checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, FromSqlRow, AsExpression)]
#[sql_type = "BigInt"]
pub struct Amount(i64);

#[derive(Debug, Clone, Fail)]
#[fail(display = "failed to parse amount")]
pub struct ParseAmountError;

impl Amount {
    pub fn zero() -> Self {
        Amount(0)
    }

    /// Returns `None` for negative values
    pub fn new(cents: i64) -> Option<Self> {
        if cents < 0 {
            None
        } else {
            Some(Amount(cents))
        }
    }

    pub fn from_dollars(dollars: u32) -> Self {
        Amount(i64::from(dollars) * CENTS_IN_DOLLAR)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn checked_add(&self, other: Amount) -> Option<Self> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(&self, other: Amount) -> Option<Self> {
        self.0.checked_sub(other.0).and_then(Amount::new)
    }

    pub fn checked_mul(&self, factor: u32) -> Option<Self> {
        self.0.checked_mul(i64::from(factor)).map(Amount)
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        i64::from_str(s).ok().and_then(Amount::new).ok_or(ParseAmountError)
    }
}

/// Renders dollars with two decimals, e.g. `$12.50`
impl Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / CENTS_IN_DOLLAR, self.0 % CENTS_IN_DOLLAR)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cents = i64::deserialize(deserializer)?;
        Amount::new(cents).ok_or_else(|| de::Error::custom(format!("amount must not be negative, got {}", cents)))
    }
}

impl ToSql<BigInt, Pg> for Amount {
    fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
        ToSql::<BigInt, Pg>::to_sql(&self.0, out)
    }
}

impl FromSql<BigInt, Pg> for Amount {
    fn from_sql(bytes: Option<&[u8]>) -> deserialize::Result<Self> {
        let cents: i64 = FromSql::<BigInt, Pg>::from_sql(bytes)?;
        Amount::new(cents).ok_or_else(|| format!("Negative amount in database: {}", cents).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json;

    #[test]
    fn test_display_as_dollars() {
        assert_eq!(Amount(0).to_string(), "$0.00");
        assert_eq!(Amount(5).to_string(), "$0.05");
        assert_eq!(Amount(1250).to_string(), "$12.50");
        assert_eq!(Amount::from_dollars(10).to_string(), "$10.00");
    }

    #[test]
    fn test_serde_conversions() {
        let parsed: Amount = serde_json::from_str("1500").unwrap();
        assert_eq!(parsed, Amount(1500));
        assert_eq!(serde_json::to_string(&Amount(1500)).unwrap(), "1500");
    }

    #[test]
    fn test_serde_error_conversions() {
        for case in ["-1", "1.5", "\"10\"", "null"].iter() {
            assert!(serde_json::from_str::<Amount>(case).is_err(), "Case: {}", case);
        }
    }

    #[test]
    fn test_checked_ops() {
        assert_eq!(Amount(100).checked_add(Amount(50)), Some(Amount(150)));
        assert_eq!(Amount(100).checked_sub(Amount(150)), None);
        assert_eq!(Amount(100).checked_mul(3), Some(Amount(300)));
        assert_eq!(Amount(::std::i64::MAX).checked_add(Amount(1)), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("250".parse::<Amount>().unwrap(), Amount(250));
        assert!("-250".parse::<Amount>().is_err());
        assert!("abc".parse::<Amount>().is_err());
    }
}
