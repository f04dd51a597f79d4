//! Cache-busting query markers.

use uuid::Uuid;

/// Check if the query string of `full_path` already carries `param`.
pub fn is_marked(full_path: &str, param: &str) -> bool {
    let Some((_, query)) = full_path.split_once('?') else {
        return false;
    };

    query
        .split('&')
        .any(|pair| pair.split_once('=').map_or(pair, |(key, _)| key) == param)
}

/// Append `param=<token>` to `full_path`, keeping any existing query.
pub fn bust_location(full_path: &str, param: &str, token: &str) -> String {
    let separator = if full_path.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", full_path, separator, param, token)
}

/// Append `param=<fresh uuid>` to `full_path`.
pub fn bust(full_path: &str, param: &str) -> String {
    bust_location(full_path, param, &Uuid::new_v4().to_string())
}
