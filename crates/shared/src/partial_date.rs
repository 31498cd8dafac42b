use std::cmp::Ordering;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An ISO-8601 date of unknown precision: `YYYY`, `YYYY-MM`, or `YYYY-MM-DD`.
///
/// Facts carry `valid_at`/`invalid_at` at whatever precision the source
/// material actually supports — a birthdate might be a full day, an
/// employment start might be a bare year. Ordering fills missing fields
/// with their earliest possible value (month 1, day 1), so a bare year
/// sorts before any more precise date within that year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartialDate {
  pub year: i32,
  pub month: Option<u32>,
  pub day: Option<u32>,
}

impl PartialDate {
  pub fn year(year: i32) -> Self {
    Self {
      year,
      month: None,
      day: None,
    }
  }

  pub fn year_month(year: i32, month: u32) -> Self {
    Self {
      year,
      month: Some(month),
      day: None,
    }
  }

  pub fn ymd(year: i32, month: u32, day: u32) -> Self {
    Self {
      year,
      month: Some(month),
      day: Some(day),
    }
  }

  fn sort_key(&self) -> (i32, u32, u32) {
    (self.year, self.month.unwrap_or(1), self.day.unwrap_or(1))
  }
}

impl PartialOrd for PartialDate {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for PartialDate {
  fn cmp(&self, other: &Self) -> Ordering {
    self.sort_key().cmp(&other.sort_key())
  }
}

impl Display for PartialDate {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match (self.month, self.day) {
      (Some(m), Some(d)) => write!(f, "{:04}-{:02}-{:02}", self.year, m, d),
      (Some(m), None) => write!(f, "{:04}-{:02}", self.year, m),
      (None, _) => write!(f, "{:04}", self.year),
    }
  }
}

impl FromStr for PartialDate {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let parts: Vec<&str> = s.split('-').collect();
    match parts.as_slice() {
      [y] => Ok(Self::year(y.parse()?)),
      [y, m] => Ok(Self::year_month(y.parse()?, m.parse()?)),
      [y, m, d] => Ok(Self::ymd(y.parse()?, m.parse()?, d.parse()?)),
      _ => Err(anyhow::anyhow!("invalid partial date: {s}")),
    }
  }
}

impl TryFrom<String> for PartialDate {
  type Error = anyhow::Error;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<PartialDate> for String {
  fn from(value: PartialDate) -> Self {
    value.to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_all_precisions() {
    assert_eq!(PartialDate::from_str("2020").unwrap(), PartialDate::year(2020));
    assert_eq!(
      PartialDate::from_str("2020-05").unwrap(),
      PartialDate::year_month(2020, 5)
    );
    assert_eq!(
      PartialDate::from_str("2020-05-14").unwrap(),
      PartialDate::ymd(2020, 5, 14)
    );
  }

  #[test]
  fn bare_year_sorts_before_precise_date_in_same_year() {
    assert!(PartialDate::year(2020) < PartialDate::ymd(2020, 3, 1));
  }

  #[test]
  fn display_round_trips_through_parse() {
    for s in ["2020", "2020-05", "2020-05-14"] {
      let parsed: PartialDate = s.parse().unwrap();
      assert_eq!(parsed.to_string(), s);
    }
  }
}
