use serde::{Deserialize, Serialize};
use std::fmt;


#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
/// Kind of monitored resource
pub enum SpiderType {
    /// Content page, judged by HTTP code
    #[default]
    #[serde(alias = "spider")]
    Content,

    /// API endpoint, judged by non-empty textual body
    Api,
}


impl fmt::Display for SpiderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpiderType::Content => write!(f, "content"),
            SpiderType::Api => write!(f, "api"),
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Site record: the unit of monitoring
pub struct Site {
    /// Record identifier
    pub id: u64,

    /// Base URL
    pub domain: String,

    /// Kind of site
    #[serde(default)]
    pub spider_type: SpiderType,

    /// Sub-path appended to domain for API requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Selector locating the freshness date in fetched content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_xpath: Option<String>,

    /// Format of the freshness date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,

    /// Substring the fetched body has to contain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need_string: Option<String>,

    /// Last online verdict
    #[serde(default)]
    pub is_online: bool,

    /// Last freshness verdict
    #[serde(default)]
    pub is_new: bool,

    /// Last content date extracted from the site, as found in its content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<String>,
}


/// Sites type
pub type Sites = Vec<Site>;


impl Site {
    /// New content site for given domain
    pub fn new(id: u64, domain: &str) -> Site {
        Site {
            id,
            domain: domain.to_string(),
            ..Site::default()
        }
    }


    /// URL requested for this site
    pub fn url(&self) -> String {
        match (self.spider_type, &self.path) {
            (SpiderType::Api, Some(path)) => format!("{}{}", self.domain, path),
            _ => self.domain.clone(),
        }
    }


    /// Whether freshness of the site content has to be checked
    pub fn need_check_date(&self) -> bool {
        is_set(&self.date_xpath) || is_set(&self.path)
    }


    /// Required substring, if any
    pub fn need_string(&self) -> Option<&str> {
        self.need_string.as_deref().filter(|need| !need.is_empty())
    }
}


fn is_set(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |value| !value.is_empty())
}
