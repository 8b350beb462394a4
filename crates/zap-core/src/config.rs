use serde::{Deserialize, Serialize};

/// Controller policy and addressing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZapConfig {
    /// Base of the public short URL; the short code is appended as the last
    /// path segment.
    pub public_base_url: String,
    /// Frontend origin for interactive error redirects
    /// (`<frontend_url>/zaps/<code>?error=<reason>`). Disabled when unset.
    pub frontend_url: Option<String>,
    /// Also delete self-destructing zaps when they are found expired, not
    /// only when their view limit is breached.
    pub self_destruct_on_expiry: bool,
    /// Short codes tried per creation before giving up on collisions.
    pub max_code_attempts: u32,
    /// Gate re-evaluations after losing a view-count race.
    pub max_increment_attempts: u32,
}

impl Default for ZapConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8080/api/zaps".into(),
            frontend_url: None,
            self_destruct_on_expiry: false,
            max_code_attempts: 2,
            max_increment_attempts: 3,
        }
    }
}

impl ZapConfig {
    /// `<public_base_url>/<code>`
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), code)
    }

    /// Error page for an interactive caller, if a frontend is configured.
    pub fn error_page(&self, code: &str, reason: &str) -> Option<String> {
        self.frontend_url
            .as_deref()
            .map(|f| format!("{}/zaps/{}?error={}", f.trim_end_matches('/'), code, reason))
    }
}
