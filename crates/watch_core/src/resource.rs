use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Matched against the raw input: no userinfo, port, case folding or
/// path normalization is tolerated.
static POST_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://(?:www\.)?instagram\.com/p/([A-Za-z0-9_-]+)/?$")
        .expect("post url pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid post reference {reference:?}: {reason}")]
pub struct InvalidReference {
    pub reference: String,
    pub reason: &'static str,
}

/// A validated post reference, reduced to its short code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    url: String,
    code: String,
}

impl ResourceRef {
    /// Accepts exactly `https://[www.]instagram.com/p/<code>[/]` where
    /// `<code>` is `[A-Za-z0-9_-]+`. Surrounding whitespace is ignored.
    pub fn parse(reference: &str) -> Result<Self, InvalidReference> {
        let trimmed = reference.trim();
        let code = POST_URL
            .captures(trimmed)
            .and_then(|captures| captures.get(1))
            .ok_or_else(|| InvalidReference {
                reference: reference.to_string(),
                reason: "expected https://[www.]instagram.com/p/<code>/",
            })?;

        Ok(Self {
            url: trimmed.to_string(),
            code: code.as_str().to_string(),
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}
