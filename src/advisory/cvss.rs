//! CVSS v3.0 / v3.1 base scores.
//!
//! Advisories carry a vector string such as
//! `CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H`. Only the eight base
//! metrics feed the score; temporal and environmental metrics are accepted
//! and ignored.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Qualitative severity rating derived from a base score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Rating {
    pub fn from_score(score: f64) -> Self {
        if score <= 0.0 {
            Rating::None
        } else if score < 4.0 {
            Rating::Low
        } else if score < 7.0 {
            Rating::Medium
        } else if score < 9.0 {
            Rating::High
        } else {
            Rating::Critical
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rating::None => "none",
            Rating::Low => "low",
            Rating::Medium => "medium",
            Rating::High => "high",
            Rating::Critical => "critical",
        };
        f.write_str(s)
    }
}

impl FromStr for Rating {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Rating::None),
            "low" => Ok(Rating::Low),
            "medium" => Ok(Rating::Medium),
            "high" => Ok(Rating::High),
            "critical" => Ok(Rating::Critical),
            other => Err(Error::Config(format!("unknown severity: {other}"))),
        }
    }
}

/// A parsed CVSS v3 base vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Cvss {
    vector: String,
    score: f64,
}

impl Cvss {
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn rating(&self) -> Rating {
        Rating::from_score(self.score)
    }

    pub fn vector(&self) -> &str {
        &self.vector
    }
}

impl fmt::Display for Cvss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.vector)
    }
}

impl FromStr for Cvss {
    type Err = Error;

    /// # Examples
    ///
    /// ```
    /// use oxidized_cargo_audit::advisory::cvss::{Cvss, Rating};
    ///
    /// let cvss: Cvss = "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H".parse().unwrap();
    /// assert_eq!(cvss.score(), 9.8);
    /// assert_eq!(cvss.rating(), Rating::Critical);
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('/');
        match parts.next() {
            Some("CVSS:3.0") | Some("CVSS:3.1") => {}
            _ => return Err(Error::Cvss(format!("unsupported CVSS version in {s:?}"))),
        }

        let mut metrics = BaseMetrics::default();
        for part in parts {
            let (key, value) = part
                .split_once(':')
                .ok_or_else(|| Error::Cvss(format!("malformed metric {part:?}")))?;
            metrics.set(key, value)?;
        }

        let score = metrics.base_score()?;
        Ok(Cvss {
            vector: s.to_string(),
            score,
        })
    }
}

impl serde::Serialize for Cvss {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.vector)
    }
}

impl<'de> serde::Deserialize<'de> for Cvss {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Default)]
struct BaseMetrics {
    av: Option<f64>,
    ac: Option<f64>,
    pr: Option<char>,
    ui: Option<f64>,
    scope_changed: Option<bool>,
    c: Option<f64>,
    i: Option<f64>,
    a: Option<f64>,
}

impl BaseMetrics {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let bad = || Error::Cvss(format!("invalid value {value:?} for metric {key}"));
        let cia = |v: &str| match v {
            "H" => Some(0.56),
            "L" => Some(0.22),
            "N" => Some(0.0),
            _ => None,
        };

        match key {
            "AV" => {
                self.av = Some(match value {
                    "N" => 0.85,
                    "A" => 0.62,
                    "L" => 0.55,
                    "P" => 0.2,
                    _ => return Err(bad()),
                })
            }
            "AC" => {
                self.ac = Some(match value {
                    "L" => 0.77,
                    "H" => 0.44,
                    _ => return Err(bad()),
                })
            }
            "PR" => match value {
                "N" | "L" | "H" => self.pr = value.chars().next(),
                _ => return Err(bad()),
            },
            "UI" => {
                self.ui = Some(match value {
                    "N" => 0.85,
                    "R" => 0.62,
                    _ => return Err(bad()),
                })
            }
            "S" => {
                self.scope_changed = Some(match value {
                    "U" => false,
                    "C" => true,
                    _ => return Err(bad()),
                })
            }
            "C" => self.c = Some(cia(value).ok_or_else(bad)?),
            "I" => self.i = Some(cia(value).ok_or_else(bad)?),
            "A" => self.a = Some(cia(value).ok_or_else(bad)?),
            // Temporal and environmental metrics do not affect the base score.
            "E" | "RL" | "RC" | "CR" | "IR" | "AR" | "MAV" | "MAC" | "MPR" | "MUI" | "MS"
            | "MC" | "MI" | "MA" => {}
            _ => return Err(Error::Cvss(format!("unknown metric {key:?}"))),
        }
        Ok(())
    }

    fn base_score(&self) -> Result<f64> {
        let missing = |m: &str| Error::Cvss(format!("missing base metric {m}"));
        let av = self.av.ok_or_else(|| missing("AV"))?;
        let ac = self.ac.ok_or_else(|| missing("AC"))?;
        let ui = self.ui.ok_or_else(|| missing("UI"))?;
        let changed = self.scope_changed.ok_or_else(|| missing("S"))?;
        let c = self.c.ok_or_else(|| missing("C"))?;
        let i = self.i.ok_or_else(|| missing("I"))?;
        let a = self.a.ok_or_else(|| missing("A"))?;
        let pr = match (self.pr.ok_or_else(|| missing("PR"))?, changed) {
            ('N', _) => 0.85,
            ('L', false) => 0.62,
            ('L', true) => 0.68,
            ('H', false) => 0.27,
            _ => 0.5,
        };

        let iss = 1.0 - (1.0 - c) * (1.0 - i) * (1.0 - a);
        let impact = if changed {
            7.52 * (iss - 0.029) - 3.25 * (iss - 0.02).powi(15)
        } else {
            6.42 * iss
        };
        let exploitability = 8.22 * av * ac * pr * ui;

        if impact <= 0.0 {
            return Ok(0.0);
        }
        let raw = if changed {
            1.08 * (impact + exploitability)
        } else {
            impact + exploitability
        };
        Ok(round_up(raw.min(10.0)))
    }
}

/// CVSS v3.1 `Roundup`: smallest one-decimal number >= `value`, robust to
/// floating point noise.
fn round_up(value: f64) -> f64 {
    let int_input = (value * 100_000.0).round() as i64;
    if int_input % 10_000 == 0 {
        int_input as f64 / 100_000.0
    } else {
        ((int_input / 10_000) + 1) as f64 / 10.0
    }
}
