use serde::{Deserialize, Serialize};

use crate::{
    checks::site::Site,
    configuration::{GLYPH_FAILED, GLYPH_PASSED, GLYPH_SKIPPED},
};


#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Outcome of the freshness evaluation
pub enum Freshness {
    /// Content date within the staleness window
    Fresh,

    /// Content date too old, or couldn't be determined
    Stale,

    /// Site defines no freshness rule, or wasn't online
    #[default]
    NotChecked,
}


impl Freshness {
    /// Whether this counts as updated when persisted
    pub fn is_updated(self) -> bool {
        self == Freshness::Fresh
    }


    /// Console glyph
    pub fn glyph(self) -> &'static str {
        match self {
            Freshness::Fresh => GLYPH_PASSED,
            Freshness::Stale => GLYPH_FAILED,
            Freshness::NotChecked => GLYPH_SKIPPED,
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Verdict of one site evaluation
pub struct Verdict {
    /// Site is online
    pub is_online: bool,

    /// Freshness of the site content
    pub freshness: Freshness,

    /// Content date extracted in this evaluation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<String>,

    /// Reason of an offline or stale verdict
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}


impl Verdict {
    /// Offline verdict with a reason
    pub fn offline(reason: String) -> Verdict {
        Verdict {
            reason: Some(reason),
            ..Verdict::default()
        }
    }


    /// Apply verdict to the site record. Keeps previous content date when none was extracted.
    pub fn apply_to(&self, site: &mut Site) {
        site.is_online = self.is_online;
        site.is_new = self.freshness.is_updated();
        if let Some(date) = &self.last_updated_at {
            site.last_updated_at = Some(date.clone());
        }
    }
}
