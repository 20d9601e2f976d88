//! Bookmark-container association
//!
//! A bookmark URL may pin itself to a container through a reserved query
//! parameter. When a bookmark is opened, the pin takes precedence over rule
//! resolution; it is not a rule and the resolver never consults it.

use std::collections::HashSet;

use url::Url;

/// Reserved query parameter carrying the pinned cookieStoreId.
pub const CONTAINER_PARAM: &str = "silo";

#[derive(Debug, thiserror::Error)]
pub enum BookmarkError {
    #[error("Not a valid URL: {0}")]
    InvalidUrl(String),
}

/// Add, replace, or (with `None`) remove the container pin on a bookmark
/// URL. All other query pairs are preserved in order.
pub fn encode(url: &str, container_id: Option<&str>) -> Result<String, BookmarkError> {
    let mut parsed =
        Url::parse(url).map_err(|err| BookmarkError::InvalidUrl(format!("{url}: {err}")))?;

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| key != CONTAINER_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() && container_id.is_none() {
        parsed.set_query(None);
        return Ok(parsed.into());
    }

    {
        let mut pairs = parsed.query_pairs_mut();
        pairs.clear();
        for (key, value) in &kept {
            pairs.append_pair(key, value);
        }
        if let Some(container_id) = container_id {
            pairs.append_pair(CONTAINER_PARAM, container_id);
        }
    }
    Ok(parsed.into())
}

/// Container pinned on a bookmark URL, if any.
pub fn decode(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == CONTAINER_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// Drop a pin whose container no longer exists. Returns the cleaned URL, or
/// `None` when there is no pin or it is still valid.
pub fn prune(url: &str, live_containers: &HashSet<String>) -> Option<String> {
    let pinned = decode(url)?;
    if live_containers.contains(&pinned) {
        return None;
    }
    encode(url, None).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_adds_the_pin() {
        let url = encode("https://example.com/page", Some("work")).unwrap();
        assert_eq!(url, "https://example.com/page?silo=work");
        assert_eq!(decode(&url), Some("work".into()));
    }

    #[test]
    fn encode_replaces_an_existing_pin() {
        let url = encode("https://example.com/page?silo=old", Some("new")).unwrap();
        assert_eq!(decode(&url), Some("new".into()));
        assert_eq!(url.matches("silo=").count(), 1);
    }

    #[test]
    fn encode_none_removes_the_pin() {
        let url = encode("https://example.com/page?silo=work", None).unwrap();
        assert_eq!(url, "https://example.com/page");
        assert_eq!(decode(&url), None);
    }

    #[test]
    fn other_query_pairs_survive() {
        let url = encode("https://example.com/?a=1&silo=old&b=2", Some("work")).unwrap();
        assert_eq!(url, "https://example.com/?a=1&b=2&silo=work");
        let url = encode(&url, None).unwrap();
        assert_eq!(url, "https://example.com/?a=1&b=2");
    }

    #[test]
    fn decode_without_pin_is_none() {
        assert_eq!(decode("https://example.com/?a=1"), None);
        assert_eq!(decode("https://example.com/"), None);
        assert_eq!(decode("not a url"), None);
    }

    #[test]
    fn prune_drops_dead_pins_only() {
        let live: HashSet<String> = ["work".to_string()].into();
        assert_eq!(
            prune("https://example.com/?silo=gone", &live),
            Some("https://example.com/".to_string())
        );
        assert_eq!(prune("https://example.com/?silo=work", &live), None);
        assert_eq!(prune("https://example.com/", &live), None);
    }
}
