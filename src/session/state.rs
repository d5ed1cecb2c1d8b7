/// Session state definitions shared by the fetch engine and the renderer
///
/// Cookies keep their insertion order so the rendered `Cookie` header is
/// stable; writing an existing name overwrites it in place.
use std::collections::BTreeMap;

/// Cookies, local storage entries and an optional bearer token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    cookies: Vec<(String, String)>,

    /// Local storage entries captured from (and replayed into) the renderer
    pub local_storage: BTreeMap<String, String>,

    /// Bearer token sent as `Authorization` on every request
    pub auth_token: Option<String>,
}

impl SessionState {
    /// Creates an empty session carrying the given auth token
    pub fn with_auth_token(auth_token: Option<String>) -> Self {
        Self {
            auth_token,
            ..Self::default()
        }
    }

    /// Sets a cookie, overwriting any existing value with the same name
    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.cookies.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.cookies.push((name, value)),
        }
    }

    /// Returns the value of a cookie by name
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns all cookies in insertion order
    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    pub fn has_cookies(&self) -> bool {
        !self.cookies.is_empty()
    }

    /// Formats the cookies as an HTTP `Cookie` header value
    ///
    /// Pairs are rendered as `key=value` and joined by `; `. An empty jar
    /// renders as an empty string.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}
