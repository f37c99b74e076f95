//! Routing behaviour switches.

use daedalus_router::MatchOptions;

use crate::proxy::ProxyOptions;

/// Options applied by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterOptions {
    /// Store the matched route pattern on the context.
    pub save_matched_route_path: bool,
    /// Redirect to the other trailing-slash form when only it exists.
    pub redirect_trailing_slash: bool,
    /// Redirect to the cleaned, case-corrected path when it exists.
    pub redirect_fixed_path: bool,
    /// Answer `405 Method Not Allowed` with an `Allow` header.
    pub handle_method_not_allowed: bool,
    /// Answer `OPTIONS` requests automatically.
    pub handle_options: bool,
    /// Client address resolution.
    pub proxy: ProxyOptions,
    base_path: String,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            save_matched_route_path: true,
            redirect_trailing_slash: true,
            redirect_fixed_path: true,
            handle_method_not_allowed: true,
            handle_options: true,
            proxy: ProxyOptions::default(),
            base_path: String::new(),
        }
    }
}

impl RouterOptions {
    /// Returns the subset consumed by the router.
    #[must_use]
    pub const fn match_options(&self) -> MatchOptions {
        MatchOptions {
            redirect_trailing_slash: self.redirect_trailing_slash,
            redirect_fixed_path: self.redirect_fixed_path,
            handle_method_not_allowed: self.handle_method_not_allowed,
            handle_options: self.handle_options,
        }
    }

    /// Returns the base path; empty when routes are mounted at the root.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Mounts every route below `path`.
    ///
    /// The value is normalised to a leading slash and no trailing slash;
    /// `""` and `"/"` both mean the root.
    pub fn set_base_path(&mut self, path: &str) {
        let trimmed = path.trim().trim_end_matches('/');
        self.base_path.clear();
        if !trimmed.is_empty() {
            if !trimmed.starts_with('/') {
                self.base_path.push('/');
            }
            self.base_path.push_str(trimmed);
        }
    }

    /// Builder form of [`RouterOptions::set_base_path`].
    #[must_use]
    pub fn with_base_path(mut self, path: &str) -> Self {
        self.set_base_path(path);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_every_policy() {
        let options = RouterOptions::default();
        assert!(options.save_matched_route_path);
        assert_eq!(options.match_options(), MatchOptions::default());
        assert_eq!(options.base_path(), "");
    }

    #[test]
    fn test_base_path_normalisation() {
        let cases = [("", ""), ("/", ""), ("api", "/api"), ("/api/", "/api"), ("/api/v1", "/api/v1")];
        for (input, expected) in cases {
            let options = RouterOptions::default().with_base_path(input);
            assert_eq!(options.base_path(), expected, "input: {input:?}");
        }
    }
}
