use serde::{Deserialize, Serialize};


#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
/// How the required-substring check combines with the status verdict
pub enum KeywordPolicy {
    /// Keyword presence replaces the status verdict: a missing keyword takes an online site
    /// offline, a present keyword brings an offline one online
    #[default]
    Overwrite,

    /// Keyword presence is required on top of the status verdict
    Require,
}


/// Online verdict after the required-substring check. No required substring keeps the status verdict.
pub fn apply_keyword_policy(
    policy: KeywordPolicy,
    tentative_online: bool,
    body: &str,
    need_string: Option<&str>,
) -> bool {
    match need_string {
        None => tentative_online,
        Some(need) => {
            let contains = body.contains(need);
            match policy {
                KeywordPolicy::Overwrite => contains,
                KeywordPolicy::Require => tentative_online && contains,
            }
        }
    }
}
