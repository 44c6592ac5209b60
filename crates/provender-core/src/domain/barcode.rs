use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MIN_BARCODE_LEN: usize = 8;
const MAX_BARCODE_LEN: usize = 14;

/// Validated product barcode (EAN-8 up to GTIN-14).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Barcode(String);

impl Barcode {
    /// Parse and normalize a barcode, trimming surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyBarcode);
        }

        let len = trimmed.chars().count();
        if !(MIN_BARCODE_LEN..=MAX_BARCODE_LEN).contains(&len) {
            return Err(ValidationError::BarcodeInvalidLength {
                len,
                min: MIN_BARCODE_LEN,
                max: MAX_BARCODE_LEN,
            });
        }

        for (index, ch) in trimmed.chars().enumerate() {
            if !ch.is_ascii_digit() {
                return Err(ValidationError::BarcodeInvalidChar { ch, index });
            }
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Barcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Barcode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Barcode {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Barcode> for String {
    fn from(value: Barcode) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_trims_barcode() {
        let parsed = Barcode::parse(" 3017620422003 ").expect("barcode should parse");
        assert_eq!(parsed.as_str(), "3017620422003");
    }

    #[test]
    fn rejects_short_barcode() {
        let err = Barcode::parse("1234567").expect_err("must fail");
        assert!(matches!(err, ValidationError::BarcodeInvalidLength { .. }));
    }

    #[test]
    fn rejects_non_digit_barcode() {
        let err = Barcode::parse("30176204X2003").expect_err("must fail");
        assert!(matches!(err, ValidationError::BarcodeInvalidChar { .. }));
    }
}
