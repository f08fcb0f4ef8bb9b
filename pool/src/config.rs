use serde::Deserialize;

use crate::error::PoolError;

/// Job table settings
#[derive(Deserialize, Clone, Debug)]
pub struct JobSettings {
    /// Number of most recent heights whose jobs stay resolvable for late shares.
    #[serde(default = "default_retained_heights")]
    pub retained_heights: usize,
    /// Capacity of the job notification channel towards sessions.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            retained_heights: default_retained_heights(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

fn default_retained_heights() -> usize { 4 }
fn default_broadcast_capacity() -> usize { 64 }

/// Share grading policy
#[derive(Deserialize, Clone, Debug)]
pub struct PolicySettings {
    /// Treat every valid proof as a block solution (testnet block submission drills).
    #[serde(default)]
    pub accept_all_as_solved: bool,
    /// Credit every valid proof at the highest ladder difficulty (simulator mode).
    #[serde(default)]
    pub accept_all_as_simulated: bool,
    /// Reject shares for superseded jobs instead of grading them.
    #[serde(default)]
    pub reject_stale_jobs: bool,
    /// share/network difficulty ratio at which a share is logged as anomalous.
    #[serde(default = "default_high_diff_ratio")]
    pub high_diff_ratio: u64,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            accept_all_as_solved: false,
            accept_all_as_simulated: false,
            reject_stale_jobs: false,
            high_diff_ratio: default_high_diff_ratio(),
        }
    }
}

fn default_high_diff_ratio() -> u64 { 1024 }

#[derive(Deserialize, Clone, Debug)]
pub struct SessionSettings {
    /// Difficulty offered to a connection before any retarget.
    #[serde(default = "default_session_difficulty")]
    pub default_difficulty: u64,
    /// Live sessions allowed at once; further connections are refused.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_difficulty: default_session_difficulty(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_session_difficulty() -> u64 { 1 }
fn default_max_sessions() -> usize { 10_000 }

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    /// Chain/shard this repository instance serves.
    #[serde(default)]
    pub chain_id: usize,
    pub api_listen: String,
    pub redis_url: String,
    /// Pub/sub channel carrying raw job templates.
    pub template_channel: String,
    /// List key solved-share records are appended to.
    pub solved_share_key: String,
    /// Pub/sub channel notified after each solved-share append.
    pub solved_share_channel: String,
    #[serde(default)]
    pub jobs: JobSettings,
    #[serde(default)]
    pub policy: PolicySettings,
    #[serde(default)]
    pub session: SessionSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_id: 0,
            api_listen: "0.0.0.0:8080".to_string(),
            redis_url: "redis://127.0.0.1/".to_string(),
            template_channel: "grin:jobs".to_string(),
            solved_share_key: "grin:solved_shares".to_string(),
            solved_share_channel: "grin:solved_shares:notify".to_string(),
            jobs: JobSettings::default(),
            policy: PolicySettings::default(),
            session: SessionSettings::default(),
        }
    }
}

impl Config {
    /// Defaults, then an optional JSON file, then environment overrides.
    ///
    /// The file is `GRIN_POOL_CONFIG` if set, otherwise `pool_config.json` in
    /// the working directory. A file that exists but fails to parse is an error.
    /// `GRIN_POOL_*` variables win over values from the file.
    pub fn load() -> Result<Self, PoolError> {
        let path = std::env::var("GRIN_POOL_CONFIG").unwrap_or_else(|_| "pool_config.json".to_string());
        let file = std::fs::read_to_string(&path).ok();
        let cfg = Self::from_sources(file.as_deref().map(|txt| (path.as_str(), txt)), |k| std::env::var(k).ok())?;
        if file.is_some() {
            tracing::info!("Loaded pool config from {}", path);
        }
        Ok(cfg)
    }

    fn from_sources<F>(file: Option<(&str, &str)>, env: F) -> Result<Self, PoolError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match file {
            Some((path, txt)) => serde_json::from_str::<Config>(txt)
                .map_err(|e| PoolError::Config(format!("{}: {}", path, e)))?,
            None => Self::default(),
        };
        cfg.apply_env(env);
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = env("GRIN_POOL_CHAIN_ID") {
            self.chain_id = v.parse().unwrap_or(self.chain_id);
        }
        if let Some(v) = env("GRIN_POOL_API") { self.api_listen = v; }
        if let Some(v) = env("GRIN_POOL_REDIS_URL") {
            self.redis_url = v;
        } else if let Some(v) = env("REDIS_URL") {
            self.redis_url = v;
        }
        if let Some(v) = env("GRIN_POOL_TEMPLATE_CHANNEL") { self.template_channel = v; }
        if let Some(v) = env("GRIN_POOL_SOLVED_SHARE_KEY") { self.solved_share_key = v; }
        if let Some(v) = env("GRIN_POOL_SOLVED_SHARE_CHANNEL") { self.solved_share_channel = v; }
        if let Some(v) = env("GRIN_POOL_RETAINED_HEIGHTS") {
            self.jobs.retained_heights = v.parse().unwrap_or(self.jobs.retained_heights);
        }
        if let Some(v) = env("GRIN_POOL_SUBMIT_INVALID_BLOCK") {
            self.policy.accept_all_as_solved = parse_flag(&v);
        }
        if let Some(v) = env("GRIN_POOL_ENABLE_SIMULATOR") {
            self.policy.accept_all_as_simulated = parse_flag(&v);
        }
        if let Some(v) = env("GRIN_POOL_REJECT_STALE") {
            self.policy.reject_stale_jobs = parse_flag(&v);
        }
        if let Some(v) = env("GRIN_POOL_HIGH_DIFF_RATIO") {
            self.policy.high_diff_ratio = v.parse().unwrap_or(self.policy.high_diff_ratio);
        }
        if let Some(v) = env("GRIN_POOL_DEFAULT_DIFFICULTY") {
            self.session.default_difficulty = v.parse().unwrap_or(self.session.default_difficulty);
        }
        if let Some(v) = env("GRIN_POOL_MAX_SESSIONS") {
            self.session.max_sessions = v.parse().unwrap_or(self.session.max_sessions);
        }
    }

    fn normalize(&mut self) {
        if self.jobs.retained_heights == 0 {
            self.jobs.retained_heights = default_retained_heights();
        }
        if self.jobs.broadcast_capacity == 0 {
            self.jobs.broadcast_capacity = default_broadcast_capacity();
        }
        if self.policy.high_diff_ratio == 0 {
            self.policy.high_diff_ratio = default_high_diff_ratio();
        }
        if self.session.default_difficulty == 0 {
            self.session.default_difficulty = default_session_difficulty();
        }
        if self.session.max_sessions == 0 {
            self.session.max_sessions = default_max_sessions();
        }
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        if self.redis_url.is_empty() {
            return Err(PoolError::Config("redis_url must be set".to_string()));
        }
        if self.template_channel.is_empty() {
            return Err(PoolError::Config("template_channel must be set".to_string()));
        }
        if self.solved_share_key.is_empty() {
            return Err(PoolError::Config("solved_share_key must be set".to_string()));
        }
        if self.policy.accept_all_as_solved {
            tracing::warn!("⚠️  accept_all_as_solved is on: every valid proof is reported as a block");
        }
        if self.policy.accept_all_as_simulated {
            tracing::warn!("⚠️  accept_all_as_simulated is on: share difficulty is not enforced");
        }
        Ok(())
    }
}

fn parse_flag(v: &str) -> bool {
    matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.jobs.retained_heights, 4);
        assert_eq!(cfg.policy.high_diff_ratio, 1024);
        assert!(!cfg.policy.reject_stale_jobs);
    }

    #[test]
    fn test_partial_json_uses_section_defaults() {
        let txt = r#"{
            "api_listen": "127.0.0.1:9000",
            "redis_url": "redis://10.0.0.1/",
            "template_channel": "jobs",
            "solved_share_key": "solved",
            "solved_share_channel": "solved:notify",
            "policy": { "accept_all_as_simulated": true }
        }"#;
        let mut cfg: Config = serde_json::from_str(txt).unwrap();
        cfg.normalize();
        assert!(cfg.policy.accept_all_as_simulated);
        assert!(!cfg.policy.accept_all_as_solved);
        assert_eq!(cfg.policy.high_diff_ratio, 1024);
        assert_eq!(cfg.jobs.retained_heights, 4);
        assert_eq!(cfg.session.default_difficulty, 1);
        assert_eq!(cfg.session.max_sessions, 10_000);
    }

    const FILE: &str = r#"{
        "api_listen": "127.0.0.1:9000",
        "redis_url": "redis://10.0.0.1/",
        "template_channel": "jobs",
        "solved_share_key": "solved",
        "solved_share_channel": "solved:notify",
        "policy": { "high_diff_ratio": 64, "reject_stale_jobs": true }
    }"#;

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| vars.get(k).cloned()
    }

    #[test]
    fn test_env_overrides_file_values() {
        let env = env_of(&[("GRIN_POOL_REDIS_URL", "redis://env/"), ("GRIN_POOL_HIGH_DIFF_RATIO", "8")]);
        let cfg = Config::from_sources(Some(("pool_config.json", FILE)), env).unwrap();

        assert_eq!(cfg.redis_url, "redis://env/");
        assert_eq!(cfg.policy.high_diff_ratio, 8);
        // untouched file values survive
        assert_eq!(cfg.template_channel, "jobs");
        assert!(cfg.policy.reject_stale_jobs);
    }

    #[test]
    fn test_env_without_file() {
        let cfg = Config::from_sources(None, env_of(&[("GRIN_POOL_RETAINED_HEIGHTS", "9")])).unwrap();
        assert_eq!(cfg.jobs.retained_heights, 9);
        assert_eq!(cfg.template_channel, "grin:jobs");
    }

    #[test]
    fn test_unparseable_file_is_error() {
        let err = Config::from_sources(Some(("bad.json", "{")), env_of(&[])).unwrap_err();
        assert!(matches!(err, PoolError::Config(msg) if msg.starts_with("bad.json")));
    }

    #[test]
    fn test_normalize_zero_values() {
        let mut cfg = Config::default();
        cfg.jobs.retained_heights = 0;
        cfg.policy.high_diff_ratio = 0;
        cfg.normalize();
        assert_eq!(cfg.jobs.retained_heights, 4);
        assert_eq!(cfg.policy.high_diff_ratio, 1024);
    }

    #[test]
    fn test_empty_redis_url_rejected() {
        let mut cfg = Config::default();
        cfg.redis_url.clear();
        assert!(matches!(cfg.validate(), Err(PoolError::Config(_))));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("nope"));
    }
}
