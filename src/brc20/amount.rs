use super::*;

use num_bigint::BigInt;

/// Fixed-point scale: 8 fractional digits, matching the on-chain convention used by every
/// deployed BRC-20 ticker to date.
pub const SCALE: u32 = 8;
/// 38 significant decimal digits is the limit a [`Num`] may carry, matching `NUMERIC(38,8)` at
/// the storage boundary. A scaled `i128` cannot hold that (`i128::MAX` has only ~39 digits total,
/// leaving no room once multiplied by 10^8), so the scaled value is kept as an arbitrary-precision
/// [`BigInt`] instead; only the significant-digit count is bounded, not the machine word size.
const MAX_SIGNIFICANT_DIGITS: u32 = 38;

fn scale_factor() -> BigInt {
  BigInt::from(100_000_000u64)
}

/// A non-negative, fixed-scale (10^-8) amount.
///
/// Internally stored as a [`BigInt`] holding `value * 10^8`, which keeps arithmetic exact at up
/// to 38 significant digits without risking the silent truncation a fixed-width integer would
/// hit on the largest amounts the protocol allows.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Num(BigInt);

impl Num {
  pub fn zero() -> Self {
    Self::default()
  }

  pub fn from_scaled(scaled: i128) -> Self {
    Self(BigInt::from(scaled))
  }

  pub fn scaled(self) -> BigInt {
    self.0
  }

  pub fn is_zero(&self) -> bool {
    self.0 == BigInt::default()
  }

  pub fn checked_add(self, rhs: Self) -> Result<Self, BRC20Error> {
    Ok(Num(self.0 + rhs.0))
  }

  /// Subtracts `rhs` from `self`, failing with `InsufficientBalance` rather than going negative.
  /// This is the safety-net check the processor relies on when debiting a balance.
  pub fn checked_sub(self, rhs: Self) -> Result<Self, BRC20Error> {
    if rhs.0 > self.0 {
      return Err(BRC20Error::InsufficientBalance);
    }
    Ok(Num(self.0 - rhs.0))
  }
}

impl fmt::Display for Num {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let scale = scale_factor();
    let whole = &self.0 / &scale;
    let frac = &self.0 % &scale;
    if frac == BigInt::default() {
      write!(f, "{whole}")
    } else {
      write!(f, "{whole}.{:08}", frac)
    }
  }
}

impl FromStr for Num {
  type Err = BRC20Error;

  /// Parses a decimal string under the rules in the amount-arithmetic component: no leading
  /// `+`, no leading zeros other than a bare `0`/`0.xxx`, at most 38 significant digits, at
  /// most 8 fractional digits, no scientific notation, non-negative.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.is_empty() {
      return Err(BRC20Error::InvalidAmount);
    }
    if s.starts_with('+') || s.starts_with('-') {
      return Err(BRC20Error::InvalidAmount);
    }
    if s.contains(['e', 'E']) {
      return Err(BRC20Error::InvalidAmount);
    }

    let (int_part, frac_part) = match s.split_once('.') {
      Some((i, f)) => (i, Some(f)),
      None => (s, None),
    };

    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
      return Err(BRC20Error::InvalidAmount);
    }
    if int_part.len() > 1 && int_part.starts_with('0') {
      return Err(BRC20Error::InvalidAmount);
    }

    let frac_digits = match frac_part {
      Some(f) => {
        if f.is_empty() || !f.bytes().all(|b| b.is_ascii_digit()) {
          return Err(BRC20Error::InvalidAmount);
        }
        if f.len() as u32 > SCALE {
          return Err(BRC20Error::InvalidAmount);
        }
        f.len() as u32
      }
      None => 0,
    };

    let significant_digits = int_part.trim_start_matches('0').len().max(1) as u32 + frac_digits;
    if significant_digits > MAX_SIGNIFICANT_DIGITS {
      return Err(BRC20Error::InvalidAmount);
    }

    let whole: BigInt = int_part.parse().map_err(|_| BRC20Error::InvalidAmount)?;
    let mut scaled = whole * scale_factor();

    if let Some(f) = frac_part {
      let mut padded = f.to_string();
      while (padded.len() as u32) < SCALE {
        padded.push('0');
      }
      let frac_value: BigInt = padded.parse().map_err(|_| BRC20Error::InvalidAmount)?;
      scaled += frac_value;
    }

    Ok(Num(scaled))
  }
}

impl Serialize for Num {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.to_string())
  }
}

impl<'de> Deserialize<'de> for Num {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = DecimalOrString::deserialize(deserializer)?;
    Num::from_str(&s.0).map_err(serde::de::Error::custom)
  }
}

/// Accepts both a JSON string and a bare JSON number for `amt`/`m`/`l`, since some historical
/// inscribers emitted unquoted numeric literals even though the convention is a string.
struct DecimalOrString(String);

impl<'de> Deserialize<'de> for DecimalOrString {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    use serde_json::Value;
    let value = Value::deserialize(deserializer)?;
    match value {
      Value::String(s) => Ok(DecimalOrString(s)),
      Value::Number(n) => Ok(DecimalOrString(n.to_string())),
      _ => Err(serde::de::Error::custom("expected string or number")),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scaled(whole: i128) -> BigInt {
    BigInt::from(whole) * scale_factor()
  }

  #[test]
  fn parses_whole_numbers() {
    assert_eq!(Num::from_str("1000").unwrap().scaled(), scaled(1000));
    assert_eq!(Num::from_str("0").unwrap().scaled(), BigInt::default());
  }

  #[test]
  fn parses_fractional_numbers() {
    assert_eq!(Num::from_str("1.5").unwrap().scaled(), BigInt::from(150_000_000));
    assert_eq!(Num::from_str("0.00000001").unwrap().scaled(), BigInt::from(1));
  }

  #[test]
  fn rejects_leading_zero() {
    assert!(Num::from_str("01").is_err());
    assert!(Num::from_str("00.5").is_err());
  }

  #[test]
  fn rejects_leading_plus_and_negative() {
    assert!(Num::from_str("+1").is_err());
    assert!(Num::from_str("-1").is_err());
  }

  #[test]
  fn rejects_too_many_fractional_digits() {
    assert!(Num::from_str("1.123456789").is_err());
  }

  #[test]
  fn rejects_too_many_significant_digits() {
    assert!(Num::from_str(&"1".repeat(39)).is_err());
  }

  /// The largest amount `NUMERIC(38,8)` can hold, confirming it parses (a scaled `i128` would
  /// overflow on this input: 38 ones scaled by 10^8 is far past `i128::MAX`).
  #[test]
  fn accepts_maximum_significant_digits() {
    let n = Num::from_str(&"1".repeat(38)).unwrap();
    assert_eq!(n.scaled(), BigInt::from_str(&"1".repeat(38)).unwrap() * scale_factor());
  }

  #[test]
  fn rejects_scientific_notation() {
    assert!(Num::from_str("1e10").is_err());
  }

  #[test]
  fn round_trips_display() {
    let n = Num::from_str("123.45000000").unwrap();
    assert_eq!(n.to_string(), "123.45");
    let n = Num::from_str("0.1").unwrap();
    assert_eq!(n.to_string(), "0.1");
  }

  #[test]
  fn checked_sub_rejects_negative_result() {
    let a = Num::from_str("10").unwrap();
    let b = Num::from_str("11").unwrap();
    assert_eq!(a.checked_sub(b), Err(BRC20Error::InsufficientBalance));
  }

  /// Adding two 38-digit amounts together must not overflow, unlike a scaled `i128`.
  #[test]
  fn checked_add_holds_amounts_past_i128_range() {
    let max = Num::from_str(&"9".repeat(38)).unwrap();
    let sum = max.clone().checked_add(max).unwrap();
    let expected = BigInt::from_str(&"9".repeat(38)).unwrap() * BigInt::from(2) * scale_factor();
    assert_eq!(sum.scaled(), expected);
  }
}
