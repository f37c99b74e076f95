//! Request path normalisation used by path correction.

/// Returns the canonical form of a URL path.
///
/// Repeated slashes collapse into one, `.` segments are dropped and `..`
/// removes the preceding segment (never climbing above the root). The result
/// always starts with `/` and keeps a trailing slash if the input had one.
///
/// ```rust
/// use daedalus_router::clean_path;
///
/// assert_eq!(clean_path("//users/./42/../7/"), "/users/7/");
/// assert_eq!(clean_path("../../etc"), "/etc");
/// assert_eq!(clean_path(""), "/");
/// ```
#[must_use]
pub fn clean_path(path: &str) -> String {
    let trailing = path.len() > 1 && path.ends_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    for segment in &segments {
        cleaned.push('/');
        cleaned.push_str(segment);
    }
    if cleaned.is_empty() || trailing {
        cleaned.push('/');
    }
    cleaned
}

/// Adds a trailing slash when the path has none, removes it otherwise.
///
/// Returns `None` for the root path, which has no alternative form.
#[must_use]
pub fn toggle_trailing_slash(path: &str) -> Option<String> {
    if path.len() <= 1 {
        return None;
    }
    match path.strip_suffix('/') {
        Some(trimmed) => Some(trimmed.to_owned()),
        None => {
            let mut toggled = String::with_capacity(path.len() + 1);
            toggled.push_str(path);
            toggled.push('/');
            Some(toggled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path() {
        let cases = [
            ("/", "/"),
            ("", "/"),
            ("/users", "/users"),
            ("/users/", "/users/"),
            ("//users//42", "/users/42"),
            ("/a/./b", "/a/b"),
            ("/a/b/..", "/a"),
            ("/a/b/../", "/a/"),
            ("/../a", "/a"),
            ("a/b", "/a/b"),
            ("/a/b/c/../../d", "/a/d"),
            ("/..", "/"),
        ];
        for (input, expected) in cases {
            assert_eq!(clean_path(input), expected, "input: {input:?}");
        }
    }

    #[test]
    fn test_clean_path_is_idempotent() {
        for input in ["//x/../y/./z/", "/a//b", "/..//.."] {
            let once = clean_path(input);
            assert_eq!(clean_path(&once), once);
        }
    }

    #[test]
    fn test_toggle_trailing_slash() {
        assert_eq!(toggle_trailing_slash("/a/b"), Some("/a/b/".to_owned()));
        assert_eq!(toggle_trailing_slash("/a/b/"), Some("/a/b".to_owned()));
        assert_eq!(toggle_trailing_slash("/"), None);
        assert_eq!(toggle_trailing_slash(""), None);
    }
}
