use chrono::NaiveDateTime;
use scraper::Html;

use crate::{
    checks::site::Site,
    configuration::{DEFAULT_DATE_FORMAT, MAX_DELAY_UPDATE_DAYS},
    evaluators::{date_format::DateFormat, selector::DateSelector},
    products::{unexpected::ExtractError, verdict::Freshness},
};


/// Content date found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDate {
    /// Text as extracted, whitespace normalized. Persisted.
    pub text: String,

    /// Parsed moment, used for the staleness window only
    pub parsed: NaiveDateTime,
}


/// Freshness of a content date: within the staleness window either way from now
pub fn freshness_of(date: NaiveDateTime, now: NaiveDateTime) -> Freshness {
    if (now - date).num_days().abs() <= MAX_DELAY_UPDATE_DAYS {
        Freshness::Fresh
    } else {
        Freshness::Stale
    }
}


/// Extract the content date of a site from its document
pub fn extract_date(
    site: &Site,
    document: &Html,
    now: NaiveDateTime,
) -> Result<ContentDate, ExtractError> {
    let expression = site.date_xpath.as_deref().ok_or(ExtractError::NoSelector)?;
    let selector = DateSelector::parse(expression)?;
    let text = selector
        .first_text(document)
        .ok_or_else(|| ExtractError::NoMatch(expression.to_string()))?;
    let format = site.date_format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT);
    match DateFormat::new(format).parse(&text, now) {
        Some(parsed) => Ok(ContentDate { text, parsed }),
        None => Err(ExtractError::UnparsableDate(text, format.to_string())),
    }
}


/// Evaluate freshness of an online site's document. Yields the content date on successful extraction.
pub fn evaluate(
    site: &Site,
    document: &Html,
    now: NaiveDateTime,
) -> Result<(Freshness, ContentDate), ExtractError> {
    let date = extract_date(site, document, now)?;
    Ok((freshness_of(date.parsed, now), date))
}
