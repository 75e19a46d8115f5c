//! Shareable links carrying the `saveId` query parameter.

use url::Url;

use crate::{Error, Result};

/// Query parameter that addresses a saved card.
pub const SAVE_ID_PARAM: &str = "saveId";

/// Build `<origin>/?saveId=<id>` from any URL on the share site.
pub fn share_link(base_url: &str, save_id: &str) -> Result<String> {
    let save_id = require_save_id(save_id)?;
    let mut url = parse_http_url(base_url)?;
    url.set_path("/");
    url.set_fragment(None);
    url.query_pairs_mut()
        .clear()
        .append_pair(SAVE_ID_PARAM, save_id);
    Ok(url.into())
}

/// Read the save id from a link, if it carries a non-empty one.
pub fn save_id_from_url(url: &str) -> Option<String> {
    let url = Url::parse(url.trim()).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == SAVE_ID_PARAM)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Set or replace the save id on an existing URL, keeping other parameters.
pub fn with_save_id(url: &str, save_id: &str) -> Result<String> {
    let save_id = require_save_id(save_id)?;
    let mut url = parse_http_url(url)?;
    let retained = retained_pairs(&url);
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        pairs.extend_pairs(retained);
        pairs.append_pair(SAVE_ID_PARAM, save_id);
    }
    Ok(url.into())
}

/// Remove the save id from a URL, keeping other parameters.
pub fn without_save_id(url: &str) -> Result<String> {
    let mut url = parse_http_url(url)?;
    let retained = retained_pairs(&url);
    if retained.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(retained);
    }
    Ok(url.into())
}

fn retained_pairs(url: &Url) -> Vec<(String, String)> {
    url.query_pairs()
        .filter(|(key, _)| key != SAVE_ID_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

fn parse_http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|error| Error::InvalidInput(format!("invalid URL '{}': {error}", raw.trim())))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::InvalidInput(format!(
            "URL must use http:// or https://, got {scheme}://"
        ))),
    }
}

fn require_save_id(save_id: &str) -> Result<&str> {
    let save_id = save_id.trim();
    if save_id.is_empty() {
        Err(Error::InvalidInput("save id must not be empty".to_string()))
    } else {
        Ok(save_id)
    }
}
