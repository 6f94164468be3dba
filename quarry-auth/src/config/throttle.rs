use serde::Deserialize;

fn default_limit() -> i64 {
    5
}

fn default_timeout() -> i64 {
    300
}

/// Login attempt throttling. A non-positive limit or timeout disables
/// tracking entirely.
#[derive(Debug, Deserialize, Clone)]
pub struct ThrottleConfig {
    /// Failed attempts allowed before a principal is locked (default: 5)
    #[serde(default = "default_limit")]
    pub limit: i64,

    /// Lockout window in seconds (default: 300)
    #[serde(default = "default_timeout")]
    pub timeout_secs: i64,
}

impl ThrottleConfig {
    pub fn enabled(&self) -> bool {
        self.limit > 0 && self.timeout_secs > 0
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            timeout_secs: default_timeout(),
        }
    }
}
