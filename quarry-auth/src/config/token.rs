use serde::Deserialize;

fn default_expires_in() -> i64 {
    3600
}

fn default_refreshable_for() -> i64 {
    43_200
}

fn default_refresh_threshold() -> f64 {
    0.5
}

/// Access token lifetimes and refresh behavior.
#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    /// Issuer claim stamped into every token, if set
    #[serde(default)]
    pub issuer: Option<String>,

    /// Token lifetime in seconds (default: 1 hour)
    #[serde(default = "default_expires_in")]
    pub expires_in_secs: i64,

    /// Refresh window in seconds; zero disables refreshability (default: 12 hours)
    #[serde(default = "default_refreshable_for")]
    pub refreshable_for_secs: i64,

    /// Fraction of the token lifespan after which a refresh is due.
    /// A token is reissued once elapsed / lifespan exceeds this value
    /// strictly (default: 0.5).
    #[serde(default = "default_refresh_threshold")]
    pub refresh_threshold: f64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: None,
            expires_in_secs: default_expires_in(),
            refreshable_for_secs: default_refreshable_for(),
            refresh_threshold: default_refresh_threshold(),
        }
    }
}
