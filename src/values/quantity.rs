//! Kubernetes resource quantities (`500m`, `2`, `4Gi`, `1.5G`).
//!
//! Only the comparison matters here, so quantities are normalized to
//! thousandths of the base unit.
use std::fmt;
use std::str::FromStr;

const MAX_FRACTION_DIGITS: u32 = 9;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    #[error("empty quantity")]
    Empty,
    #[error("invalid quantity {0:?}")]
    Malformed(String),
    #[error("unknown unit suffix {0:?}")]
    UnknownSuffix(String),
    #[error("quantity {0:?} is out of range")]
    Overflow(String),
}

/// A parsed quantity in thousandths of the base unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quantity {
    millis: u128,
}

impl Quantity {
    pub fn is_zero(&self) -> bool {
        self.millis == 0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.millis)
    }
}

fn suffix_multiplier(suffix: &str) -> Option<u128> {
    let value = match suffix {
        "" => 1_000,
        "m" => 1,
        "k" => 1_000 * 1_000,
        "M" => 1_000 * 1_000u128.pow(2),
        "G" => 1_000 * 1_000u128.pow(3),
        "T" => 1_000 * 1_000u128.pow(4),
        "P" => 1_000 * 1_000u128.pow(5),
        "E" => 1_000 * 1_000u128.pow(6),
        "Ki" => 1_000 * (1u128 << 10),
        "Mi" => 1_000 * (1u128 << 20),
        "Gi" => 1_000 * (1u128 << 30),
        "Ti" => 1_000 * (1u128 << 40),
        "Pi" => 1_000 * (1u128 << 50),
        "Ei" => 1_000 * (1u128 << 60),
        _ => return None,
    };
    Some(value)
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(QuantityError::Empty);
        }
        let split = text
            .find(|ch: char| !(ch.is_ascii_digit() || ch == '.'))
            .unwrap_or(text.len());
        let (number, suffix) = text.split_at(split);
        let multiplier =
            suffix_multiplier(suffix).ok_or_else(|| QuantityError::UnknownSuffix(suffix.into()))?;

        let (whole, fraction) = match number.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (number, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(QuantityError::Malformed(text.to_string()));
        }
        if fraction.contains('.') || fraction.len() as u32 > MAX_FRACTION_DIGITS {
            return Err(QuantityError::Malformed(text.to_string()));
        }

        let overflow = || QuantityError::Overflow(text.to_string());
        let digits = format!("{whole}{fraction}");
        let mantissa: u128 = digits
            .parse()
            .map_err(|_| QuantityError::Malformed(text.to_string()))?;
        let scale = 10u128.pow(fraction.len() as u32);
        let millis = mantissa.checked_mul(multiplier).ok_or_else(overflow)? / scale;
        Ok(Quantity { millis })
    }
}
