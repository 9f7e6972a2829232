use std::path::PathBuf;

/// One parsed input line.
///
/// `pipeline` holds the consumer stage of `argv | pipeline`. Only a single
/// split point exists, so a command is at most two processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
	pub argv: Vec<String>,
	pub background: bool,
	pub redirect: Option<PathBuf>,
	pub pipeline: Option<Vec<String>>,
}

impl Command {
	pub fn new(argv: Vec<String>) -> Command {
		Command { argv: argv, background: false, redirect: None, pipeline: None }
	}

	pub fn name(&self) -> Option<&str> {
		self.argv.first().map(|name| name.as_str())
	}

	/// Neither redirected nor piped; only these may resolve to builtins.
	pub fn is_simple(&self) -> bool {
		self.redirect.is_none() && self.pipeline.is_none()
	}
}
