// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};

/// 2015-01-01
const EPOCH: i64 = 1420070400000;

/// Unique identifier including a timestamp.
///
/// # Reference
/// See <https://discord.com/developers/docs/reference#snowflakes>
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Snowflake(pub u64);

impl Snowflake {
    /// Returns the snowflake's timestamp
    pub fn timestamp(self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt((self.0 >> 22) as i64 + EPOCH)
            .unwrap()
    }

    /// The last four decimal digits, used for fallback display names when a
    /// user's real name is not known yet.
    pub fn short_tag(self) -> String {
        let digits = self.0.to_string();
        let start = digits.len().saturating_sub(4);
        digits[start..].to_string()
    }
}

impl Display for Snowflake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Snowflake {
    fn from(item: u64) -> Self {
        Self(item)
    }
}

impl From<Snowflake> for u64 {
    fn from(item: Snowflake) -> Self {
        item.0
    }
}

impl serde::Serialize for Snowflake {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Snowflake {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct SnowflakeVisitor;
        impl<'de> serde::de::Visitor<'de> for SnowflakeVisitor {
            type Value = Snowflake;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("snowflake: a string or number")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Snowflake(value))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map(Snowflake).map_err(serde::de::Error::custom)
            }
        }
        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::Snowflake;

    #[test]
    fn short_tag() {
        assert_eq!(Snowflake(1234567890).short_tag(), "7890");
        assert_eq!(Snowflake(42).short_tag(), "42");
    }

    #[test]
    fn serde_string_representation() {
        let flake = Snowflake(107118578684101632);
        let json = serde_json::to_string(&flake).unwrap();
        assert_eq!(json, "\"107118578684101632\"");
        let back: Snowflake = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flake);
    }
}
