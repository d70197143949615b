//! Input validation for add-bookmark commands.
//!
//! Stateless checks run before anything is sent to the record store. Only the
//! first failing rule is reported so the form can show a single message.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::errors::{Field, ValidationError};

const TITLE_PATTERN: &str = r"^[A-Za-z\s]+$";
const URL_PATTERN: &str = r"^(https?://)(www\.)?[a-zA-Z0-9-]+\.[a-zA-Z]{2,}(/\S*)?$";

fn title_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TITLE_PATTERN).expect("title pattern compiles"))
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(URL_PATTERN).expect("url pattern compiles"))
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Title rule: non-blank, ASCII letters and whitespace only.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if is_blank(title) {
        return Err(ValidationError::Required(Field::Title));
    }
    if !title_regex().is_match(title) {
        return Err(ValidationError::InvalidTitle);
    }
    Ok(())
}

/// URL rule: non-blank, `http(s)://[www.]domain.tld[/path]`.
pub fn validate_url(url: &str) -> Result<(), ValidationError> {
    if is_blank(url) {
        return Err(ValidationError::Required(Field::Url));
    }
    if !url_regex().is_match(url) {
        return Err(ValidationError::InvalidUrl);
    }
    Ok(())
}

/// Validates a complete add-bookmark form.
///
/// Missing fields are reported before malformed ones, title before URL.
pub fn validate_bookmark(title: &str, url: &str) -> Result<(), ValidationError> {
    if is_blank(title) {
        return Err(ValidationError::Required(Field::Title));
    }
    if is_blank(url) {
        return Err(ValidationError::Required(Field::Url));
    }
    validate_title(title)?;
    validate_url(url)
}
