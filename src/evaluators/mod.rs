/// HTTP fetch with certificate trust fallback:
pub mod fetcher;

/// Online status evaluation:
pub mod status;

/// Content freshness evaluation:
pub mod freshness;

/// Required substring policy:
pub mod keyword;

/// Date selectors (XPath subset and CSS):
pub mod selector;

/// Date formats:
pub mod date_format;


use chrono::NaiveDateTime;
use scraper::Html;

use crate::{
    checks::site::Site,
    evaluators::{fetcher::Transport, keyword::KeywordPolicy},
    products::verdict::{Freshness, Verdict},
    *,
};


/// Evaluate a single site: fetch, status, freshness, keyword. The site record isn't touched.
#[instrument(skip_all, fields(domain = %site.domain))]
pub fn evaluate_site<T: Transport + ?Sized>(
    transport: &T,
    site: &Site,
    policy: KeywordPolicy,
    now: NaiveDateTime,
) -> Verdict {
    let fetched = match fetcher::fetch(transport, site) {
        Ok(fetched) => fetched,
        Err(err) => return Verdict::offline(err.to_string()),
    };
    let document = Html::parse_document(&fetched.body);
    let mut verdict = Verdict {
        is_online: status::is_online(&fetched, site.spider_type, &document),
        ..Verdict::default()
    };
    if !verdict.is_online {
        verdict.reason = Some(format!(
            "URL: {} failed {} status check with code: {}",
            site.url(),
            site.spider_type,
            fetched.status_code
        ));
    }

    if verdict.is_online && site.need_check_date() {
        match freshness::evaluate(site, &document, now) {
            Ok((freshness, date)) => {
                verdict.freshness = freshness;
                verdict.last_updated_at = Some(date.text);
            }
            Err(err) => {
                debug!("Freshness unknown: {}", err);
                verdict.freshness = Freshness::Stale;
                verdict.reason = Some(err.to_string());
            }
        }
    }

    let need_string = site.need_string();
    let is_online = keyword::apply_keyword_policy(policy, verdict.is_online, &fetched.body, need_string);
    if let Some(need) = need_string {
        verdict.reason = match is_online {
            true if !verdict.is_online => None,
            true => verdict.reason,
            false => Some(format!("URL: {} lacks expected content: \"{}\"", site.url(), need)),
        };
    }
    verdict.is_online = is_online;
    verdict
}
