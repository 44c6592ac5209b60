use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Single-character quality grade as published by product databases.
///
/// Upstream sources disagree wildly on grade vocabulary ("a", "B", "4",
/// "unknown", "not-applicable"), so parsing is lenient: anything that is not
/// exactly one ASCII alphanumeric character collapses to [`Grade::UNKNOWN`],
/// rendered as `"?"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Grade(char);

impl Grade {
    pub const UNKNOWN: Self = Self('?');

    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if ch.is_ascii_alphanumeric() => Self(ch.to_ascii_uppercase()),
            _ => Self::UNKNOWN,
        }
    }

    pub const fn is_known(self) -> bool {
        self.0 != '?'
    }

    pub const fn as_char(self) -> char {
        self.0
    }
}

impl Default for Grade {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl Display for Grade {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Grade {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        if value == "?" {
            return Ok(Self::UNKNOWN);
        }
        let grade = Self::parse(&value);
        if !grade.is_known() {
            return Err(D::Error::custom(format!("invalid grade '{value}'")));
        }
        Ok(grade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_letter_grades_to_uppercase() {
        assert_eq!(Grade::parse("a").as_char(), 'A');
        assert_eq!(Grade::parse(" b ").as_char(), 'B');
        assert_eq!(Grade::parse("4").as_char(), '4');
    }

    #[test]
    fn collapses_sentinel_vocabulary_to_unknown() {
        assert_eq!(Grade::parse("unknown"), Grade::UNKNOWN);
        assert_eq!(Grade::parse("not-applicable"), Grade::UNKNOWN);
        assert_eq!(Grade::parse(""), Grade::UNKNOWN);
        assert_eq!(Grade::parse("?"), Grade::UNKNOWN);
    }

    #[test]
    fn renders_unknown_as_question_mark() {
        assert_eq!(Grade::UNKNOWN.to_string(), "?");
    }
}
