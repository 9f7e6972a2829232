use std::env;

use log::LevelFilter;

const DEFAULT_PROMPT: &str = "jobsh> ";
const PROMPT_KEY: &str = "JOBSH_PROMPT";
const LOG_KEY: &str = "JOBSH_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub prompt: String,
	pub log_level: LevelFilter,
}

impl Config {
	pub fn from_env() -> Config {
		Config::from_vars(env::var(PROMPT_KEY).ok(), env::var(LOG_KEY).ok())
	}

	fn from_vars(prompt: Option<String>, log_level: Option<String>) -> Config {
		let log_level = log_level
			.and_then(|level| level.trim().parse().ok())
			.unwrap_or(LevelFilter::Info);
		Config {
			prompt: prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
			log_level: log_level,
		}
	}
}

impl Default for Config {
	fn default() -> Config {
		Config::from_vars(None, None)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn defaults() {
		let config = Config::default();
		assert_eq!(config.prompt, "jobsh> ");
		assert_eq!(config.log_level, LevelFilter::Info);
	}

	#[test]
	fn overrides() {
		let config = Config::from_vars(Some(">> ".to_string()), Some("debug".to_string()));
		assert_eq!(config, Config { prompt: ">> ".to_string(), log_level: LevelFilter::Debug });
	}

	#[test]
	fn unknown_level_falls_back() {
		let config = Config::from_vars(None, Some("loud".to_string()));
		assert_eq!(config.log_level, LevelFilter::Info);
	}
}
