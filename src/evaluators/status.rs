use scraper::Html;

use crate::{
    checks::site::SpiderType,
    configuration::CHECK_DEFAULT_SUCCESSFUL_HTTP_CODE,
    evaluators::fetcher::Fetched,
    utilities::normalize_whitespace,
};


/// Whole text of a parsed document, whitespace normalized
pub fn document_text(document: &Html) -> String {
    normalize_whitespace(&document.root_element().text().collect::<String>())
}


/// Online status of a fetched site.
/// API sites need a meaningful textual payload, content sites need the successful HTTP code.
pub fn is_online(fetched: &Fetched, spider_type: SpiderType, document: &Html) -> bool {
    match spider_type {
        SpiderType::Api => !document_text(document).is_empty(),
        SpiderType::Content => fetched.status_code == CHECK_DEFAULT_SUCCESSFUL_HTTP_CODE,
    }
}
