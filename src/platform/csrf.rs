//! Anti-forgery token discovery

use std::collections::HashMap;
use std::sync::RwLock;

/// Cookie names checked after the meta tag, in order
pub const CSRF_COOKIE_NAMES: [&str; 2] = ["XSRF-TOKEN", "csrf_token"];

/// Where anti-forgery tokens can be found on the hosting page
pub trait CsrfTokenSource: Send + Sync {
    /// Token published in the page's `csrf-token` meta tag
    fn meta_token(&self) -> Option<String>;

    /// Value of the named cookie
    fn cookie(&self, name: &str) -> Option<String>;
}

/// Find the anti-forgery token: meta tag first, then the known cookies.
///
/// Empty values are treated as absent.
pub fn discover_csrf_token(source: &dyn CsrfTokenSource) -> Option<String> {
    let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

    non_empty(source.meta_token()).or_else(|| {
        CSRF_COOKIE_NAMES
            .iter()
            .find_map(|name| non_empty(source.cookie(name)))
    })
}

/// Token source for hosts without anti-forgery protection
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCsrf;

impl CsrfTokenSource for NoCsrf {
    fn meta_token(&self) -> Option<String> {
        None
    }

    fn cookie(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Meta-tag token and cookies captured from the hosting page.
///
/// Updated in place as the host observes new values.
#[derive(Debug, Default)]
pub struct PageTokens {
    meta: RwLock<Option<String>>,
    cookies: RwLock<HashMap<String, String>>,
}

impl PageTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a `Cookie` header value (`a=1; XSRF-TOKEN=abc`)
    pub fn from_cookie_header(header: &str) -> Self {
        let tokens = Self::default();
        tokens.set_cookie_header(header);
        tokens
    }

    pub fn set_meta_token(&self, token: Option<String>) {
        if let Ok(mut meta) = self.meta.write() {
            *meta = token;
        }
    }

    /// Replace all cookies with those parsed from a `Cookie` header value
    pub fn set_cookie_header(&self, header: &str) {
        let parsed = parse_cookie_header(header);
        if let Ok(mut cookies) = self.cookies.write() {
            *cookies = parsed;
        }
    }

    pub fn set_cookie(&self, name: &str, value: &str) {
        if let Ok(mut cookies) = self.cookies.write() {
            cookies.insert(name.to_string(), value.to_string());
        }
    }
}

impl CsrfTokenSource for PageTokens {
    fn meta_token(&self) -> Option<String> {
        self.meta.read().ok().and_then(|m| m.clone())
    }

    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.read().ok().and_then(|c| c.get(name).cloned())
    }
}

fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}
