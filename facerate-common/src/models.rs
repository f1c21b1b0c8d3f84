//! Domain records shared by the stores and the workflow

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{Error, Result};

/// A validated rating score in `Score::MIN..=Score::MAX`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: i64) -> Result<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Score(value as u8))
        } else {
            Err(Error::InvalidScore(value.to_string()))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Every valid score, lowest first (one button each on the rating screen)
    pub fn all() -> impl Iterator<Item = Score> {
        (Self::MIN..=Self::MAX).map(Score)
    }
}

impl TryFrom<i64> for Score {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Score::new(value)
    }
}

/// Parse a score as submitted by a form field (surrounding blanks ignored)
impl FromStr for Score {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.parse::<i64>() {
            Ok(value) => Score::new(value),
            Err(_) => Err(Error::InvalidScore(s.to_string())),
        }
    }
}

impl From<Score> for i64 {
    fn from(score: Score) -> Self {
        i64::from(score.0)
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user's rating of one image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub user: String,
    pub image: String,
    pub score: Score,
    pub rated_at: DateTime<Utc>,
}

/// How far a user has got through the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Images in the catalog this user has rated
    pub rated: usize,
    /// Images in the catalog
    pub total: usize,
}

impl Progress {
    /// Rated share in `0.0..=1.0`; an empty catalog reports 0.0
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.rated as f64 / self.total as f64
        }
    }

    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0).round() as u32
    }

    pub fn is_complete(&self) -> bool {
        self.rated >= self.total
    }
}
