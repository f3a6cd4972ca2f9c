//! `Link` header parsing
//!
//! The directory paginates with RFC 8288 links, one per relation, either in
//! separate `Link` headers or comma-joined in one:
//!
//! ```text
//! Link: <https://example.okta.com/api/v1/users?limit=200>; rel="self"
//! Link: <https://example.okta.com/api/v1/users?after=00u2&limit=200>; rel="next"
//! ```

use dirmirror_domain::{MirrorError, Result};
use reqwest::header::{HeaderMap, LINK};
use url::Url;

/// Find the `rel="next"` target among the `Link` headers of a response.
///
/// Relative targets are resolved against `current`. Headers without a `next`
/// relation, or that are not valid UTF-8, end pagination.
///
/// # Errors
/// Returns `MirrorError::RemoteUnavailable` when a `next` target exists but is
/// not a usable URL.
pub fn next_link(headers: &HeaderMap, current: &Url) -> Result<Option<Url>> {
    for value in headers.get_all(LINK) {
        let Ok(value) = value.to_str() else {
            continue;
        };

        if let Some(target) = find_next(value) {
            return current.join(target).map(Some).map_err(|e| {
                MirrorError::RemoteUnavailable(format!("unusable next page link '{target}': {e}"))
            });
        }
    }
    Ok(None)
}

/// Target of the first link-value whose `rel` includes `next`.
fn find_next(header: &str) -> Option<&str> {
    split_link_values(header).into_iter().find_map(|link| {
        let link = link.trim();
        let rest = link.strip_prefix('<')?;
        let end = rest.find('>')?;
        let (target, params) = (&rest[..end], &rest[end + 1..]);

        params
            .split(';')
            .filter_map(|param| param.trim().split_once('='))
            .filter(|(name, _)| name.trim().eq_ignore_ascii_case("rel"))
            .any(|(_, value)| {
                value
                    .trim()
                    .trim_matches('"')
                    .split_ascii_whitespace()
                    .any(|rel| rel.eq_ignore_ascii_case("next"))
            })
            .then_some(target)
    })
}

/// Split on commas that are not inside `<...>`.
fn split_link_values(header: &str) -> Vec<&str> {
    let mut values = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (idx, ch) in header.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                values.push(&header[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    values.push(&header[start..]);
    values
}
