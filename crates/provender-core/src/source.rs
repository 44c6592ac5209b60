use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in resolutions and envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Catalog,
    Regulatory,
    Websearch,
    Synthesis,
}

impl ProviderId {
    pub const ALL: [Self; 4] = [
        Self::Catalog,
        Self::Regulatory,
        Self::Websearch,
        Self::Synthesis,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Regulatory => "regulatory",
            Self::Websearch => "websearch",
            Self::Synthesis => "synthesis",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "catalog" => Ok(Self::Catalog),
            "regulatory" => Ok(Self::Regulatory),
            "websearch" => Ok(Self::Websearch),
            "synthesis" => Ok(Self::Synthesis),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for provider in ProviderId::ALL {
            let parsed: ProviderId = provider.as_str().parse().expect("must parse");
            assert_eq!(parsed, provider);
        }
    }

    #[test]
    fn rejects_unknown_source() {
        let err = "wikipedia".parse::<ProviderId>().expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidSource { .. }));
    }
}
