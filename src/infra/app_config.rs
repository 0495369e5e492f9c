use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_AGENT: &str = "claude";

/// User-level settings for the generation agent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Executable that reads a prompt on stdin and writes the answer to stdout.
    pub agent_command: String,
    pub agent_args: Vec<String>,
    pub timeout_secs: u64,
    /// Warn when a request is estimated above this many tokens. 0 disables.
    pub token_budget: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            agent_command: DEFAULT_AGENT.to_string(),
            agent_args: vec!["-p".to_string()],
            timeout_secs: 300,
            token_budget: 100_000,
        }
    }
}

impl AppConfig {
    pub fn over_budget(&self, tokens: usize) -> bool {
        self.token_budget > 0 && tokens > self.token_budget
    }
}

pub fn load_config() -> AppConfig {
    let path = config_path();
    let mut config = match std::fs::read_to_string(&path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_else(|err| {
            log::warn!("ignoring invalid config {}: {err}", path.display());
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    };

    if let Ok(agent) = std::env::var("PR_BUILDER_AGENT")
        && !agent.trim().is_empty()
    {
        config.agent_command = agent;
    }
    config
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("PR_BUILDER_CONFIG_PATH") {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pr-builder")
        .join("config.toml")
}

/// Root of the user-wide preset directory, `~/.pr-builder` unless
/// `PR_BUILDER_HOME` points elsewhere.
pub fn global_data_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("PR_BUILDER_HOME") {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".pr-builder"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str("timeout_secs = 30\n").unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.agent_command, DEFAULT_AGENT);
        assert_eq!(config.token_budget, 100_000);
    }

    #[test]
    fn zero_budget_never_warns() {
        let config: AppConfig = toml::from_str("token_budget = 0\n").unwrap();
        assert!(!config.over_budget(usize::MAX));

        let config = AppConfig {
            token_budget: 10,
            ..AppConfig::default()
        };
        assert!(!config.over_budget(10));
        assert!(config.over_budget(11));
    }
}
