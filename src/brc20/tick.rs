use super::*;

/// A BRC-20 ticker. Identity is case-insensitive; [`Tick`] always stores the caller's original
/// casing for display while comparing and hashing on the uppercase normalization, mirroring the
/// way the teacher's own `Tick` type lower-cases for storage keys while keeping display casing.
#[derive(Debug, Clone)]
pub struct Tick {
  raw: String,
  normalized: String,
}

impl Tick {
  pub fn new(raw: &str) -> Result<Self, BRC20Error> {
    if raw.is_empty() {
      return Err(BRC20Error::MissingField);
    }
    Ok(Self {
      raw: raw.to_string(),
      normalized: raw.to_uppercase(),
    })
  }

  pub fn as_str(&self) -> &str {
    &self.raw
  }

  /// The canonical, case-normalized form used as the storage and lookup key.
  pub fn normalized(&self) -> &str {
    &self.normalized
  }
}

impl PartialEq for Tick {
  fn eq(&self, other: &Self) -> bool {
    self.normalized == other.normalized
  }
}

impl Eq for Tick {}

impl std::hash::Hash for Tick {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    self.normalized.hash(state);
  }
}

impl fmt::Display for Tick {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.raw)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn case_insensitive_equality() {
    assert_eq!(Tick::new("ordi").unwrap(), Tick::new("ORDI").unwrap());
    assert_eq!(Tick::new("Ordi").unwrap(), Tick::new("oRDI").unwrap());
  }

  #[test]
  fn preserves_original_casing_for_display() {
    let tick = Tick::new("Ordi").unwrap();
    assert_eq!(tick.as_str(), "Ordi");
    assert_eq!(tick.normalized(), "ORDI");
  }

  #[test]
  fn rejects_empty_tick() {
    assert!(Tick::new("").is_err());
  }

  #[test]
  fn numeric_tick_is_legal() {
    assert!(Tick::new("0").is_ok());
  }
}
