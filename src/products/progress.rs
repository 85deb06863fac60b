use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    configuration::{GLYPH_FAILED, GLYPH_PASSED},
    products::verdict::{Freshness, Verdict},
};


/// Alias Type for Vec<Progress>
pub type Progresses = Vec<Progress>;


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Progress record of one evaluated site
pub struct Progress {
    /// Progress - timestamp
    pub timestamp: String,

    /// Site domain
    pub domain: String,

    /// Site is online
    pub is_online: bool,

    /// Site content freshness
    pub freshness: Freshness,

    /// Verdict wasn't persisted
    pub unsaved: bool,

    /// Error text surfaced to the operator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}


impl Progress {
    /// New progress record from a verdict
    pub fn new(domain: &str, verdict: &Verdict) -> Progress {
        Progress {
            timestamp: Local::now().to_rfc3339(),
            domain: domain.to_string(),
            is_online: verdict.is_online,
            freshness: verdict.freshness,
            unsaved: false,
            error: verdict.reason.clone(),
        }
    }


    /// Mark record as not persisted
    pub fn unsaved(self, error: String) -> Progress {
        Progress {
            unsaved: true,
            error: Some(error),
            ..self
        }
    }


    /// Console line: domain, online glyph, freshness glyph
    pub fn line(&self) -> String {
        format!(
            "{} {} {}",
            self.domain,
            if self.is_online {
                GLYPH_PASSED
            } else {
                GLYPH_FAILED
            },
            self.freshness.glyph()
        )
    }
}


/// Implement JSON serialization on .to_string():
impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "{{\"status\": \"Progress serialization failure\"}}"),
        }
    }
}


#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Counters of one sweep
pub struct SweepReport {
    /// Sites evaluated
    pub evaluated: usize,

    /// Sites found online
    pub online: usize,

    /// Sites found fresh
    pub fresh: usize,

    /// Verdicts that couldn't be persisted
    pub unsaved: usize,
}


impl SweepReport {
    /// Account a single progress record
    pub fn account(mut self, progress: &Progress) -> SweepReport {
        self.evaluated += 1;
        self.online += usize::from(progress.is_online);
        self.fresh += usize::from(progress.freshness.is_updated());
        self.unsaved += usize::from(progress.unsaved);
        self
    }


    /// Sum of two reports
    pub fn merge(self, other: SweepReport) -> SweepReport {
        SweepReport {
            evaluated: self.evaluated + other.evaluated,
            online: self.online + other.online,
            fresh: self.fresh + other.fresh,
            unsaved: self.unsaved + other.unsaved,
        }
    }


    /// Sites found offline
    pub fn offline(&self) -> usize {
        self.evaluated - self.online
    }
}
