//! Parsed routing locations

use std::fmt;

/// A routing target split into its parts.
///
/// `search` keeps its leading `?` and `hash` its leading `#`, both empty
/// when absent. `request` is the whole location after the base URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub search: String,
    pub hash: String,
    pub request: String,
}

impl Location {
    /// Parse `raw`, stripping `base_url` from the front of the path
    pub fn parse(raw: &str, base_url: &str) -> Self {
        let (rest, hash) = match raw.find('#') {
            Some(i) => (&raw[..i], &raw[i..]),
            None => (raw, ""),
        };
        let (path, search) = match rest.find('?') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };

        let path = strip_base(path, base_url);
        let request = format!("{path}{search}{hash}");
        Self {
            path,
            search: search.to_string(),
            hash: hash.to_string(),
            request,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.request)
    }
}

/// Remove `base_url` from the front of `path`, keeping a leading `/`
fn strip_base(path: &str, base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = if path.is_empty() { "/" } else { path };
    if base.is_empty() {
        return path.to_string();
    }
    match path.strip_prefix(base) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_path() {
        let location = Location::parse("/notebooks/foo.ipynb", "/");
        assert_eq!(location.path, "/notebooks/foo.ipynb");
        assert_eq!(location.search, "");
        assert_eq!(location.hash, "");
        assert_eq!(location.request, "/notebooks/foo.ipynb");
    }

    #[test]
    fn test_parse_search_and_hash() {
        let location = Location::parse("/tree/docs?reset=1#top", "/");
        assert_eq!(location.path, "/tree/docs");
        assert_eq!(location.search, "?reset=1");
        assert_eq!(location.hash, "#top");
        assert_eq!(location.to_string(), "/tree/docs?reset=1#top");
    }

    #[test]
    fn test_hash_may_contain_question_mark() {
        let location = Location::parse("/a#b?c", "/");
        assert_eq!(location.path, "/a");
        assert_eq!(location.search, "");
        assert_eq!(location.hash, "#b?c");
    }

    #[test]
    fn test_base_url_is_stripped() {
        let location = Location::parse("/hearth/notebooks/x?y=1", "/hearth/");
        assert_eq!(location.path, "/notebooks/x");
        assert_eq!(location.request, "/notebooks/x?y=1");

        assert_eq!(Location::parse("/hearth", "/hearth").path, "/");
        // Only whole segments are stripped
        assert_eq!(Location::parse("/hearthstone", "/hearth").path, "/hearthstone");
        assert_eq!(Location::parse("/other/x", "/hearth/").path, "/other/x");
    }

    #[test]
    fn test_empty_path_is_root() {
        assert_eq!(Location::parse("", "/").path, "/");
        assert_eq!(Location::parse("?q=1", "/").path, "/");
    }
}
