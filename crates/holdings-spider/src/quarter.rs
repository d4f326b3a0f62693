use chrono::Datelike;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref QUARTER_FIRST: Regex =
        Regex::new(r"(?i)\bQ([1-4])\s*(\d{4})\b").expect("valid regex");
    static ref YEAR_FIRST: Regex =
        Regex::new(r"(?i)\b(\d{4})\s*Q([1-4])\b").expect("valid regex");
}

/// A calendar quarter, displayed as `Q<1-4> <year>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quarter {
    year: i32,
    q: u8,
}

impl Quarter {
    pub fn new(year: i32, q: u8) -> Option<Self> {
        (1..=4).contains(&q).then_some(Self { year, q })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn number(&self) -> u8 {
        self.q
    }

    /// The quarter a date falls in.
    pub fn containing<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            q: (date.month0() / 3 + 1) as u8,
        }
    }

    /// The most recent quarter that has fully ended on `date`; filings only ever describe
    /// completed quarters.
    pub fn latest_completed<D: Datelike>(date: &D) -> Self {
        Self::containing(date).previous()
    }

    pub fn previous(&self) -> Self {
        self.back(1)
    }

    /// The quarter `offset` quarters before this one.
    pub fn back(&self, offset: usize) -> Self {
        let index = self.year as i64 * 4 + (self.q as i64 - 1) - offset as i64;
        Self {
            year: index.div_euclid(4) as i32,
            q: (index.rem_euclid(4) + 1) as u8,
        }
    }

    /// Search free text for a quarter label in either `Q1 2024` or `2024 Q1` order.
    pub fn find_in(text: &str) -> Option<Self> {
        if let Some(caps) = QUARTER_FIRST.captures(text) {
            return Self::new(caps[2].parse().ok()?, caps[1].parse().ok()?);
        }
        let caps = YEAR_FIRST.captures(text)?;
        Self::new(caps[1].parse().ok()?, caps[2].parse().ok()?)
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{} {}", self.q, self.year)
    }
}

impl FromStr for Quarter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::find_in(s.trim()).ok_or_else(|| format!("not a quarter label: {s:?}"))
    }
}
