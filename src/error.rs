use std::{error, ffi, fmt, io};

use nix::sys::signal::Signal;
use nix::unistd::Pid;

use crate::job::JobError;
use crate::parser::ParseError;

/// Everything a single command can fail with. None of these end the shell.
#[derive(Debug)]
pub enum ShellError {
	InvalidCommand(ParseError),
	Encoding(ffi::NulError),
	Usage(&'static str),
	ProcessCreation(nix::Error),
	PipeCreation(nix::Error),
	Wait(nix::Error),
	/// The job kept running but could not be given a job number.
	TableFull(Pid),
	NoSuchJob(usize),
	InvalidJobNumber(String),
	SignalSetup(Signal, nix::Error),
	Io(io::Error),
}

impl From<ParseError> for ShellError {
	fn from(e: ParseError) -> ShellError {
		ShellError::InvalidCommand(e)
	}
}
impl From<ffi::NulError> for ShellError {
	fn from(e: ffi::NulError) -> ShellError {
		ShellError::Encoding(e)
	}
}
impl From<io::Error> for ShellError {
	fn from(e: io::Error) -> ShellError {
		ShellError::Io(e)
	}
}

impl fmt::Display for ShellError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			ShellError::InvalidCommand(ref e) => write!(f, "invalid command: {}", e),
			ShellError::Encoding(_) => write!(f, "invalid command: argument contains a NUL byte"),
			ShellError::Usage(usage) => write!(f, "usage: {}", usage),
			ShellError::ProcessCreation(ref e) => write!(f, "fork failed: {}", e),
			ShellError::PipeCreation(ref e) => write!(f, "pipe failed: {}", e),
			ShellError::Wait(ref e) => write!(f, "wait failed: {}", e),
			ShellError::TableFull(pid) => write!(f, "{}, process {} keeps running untracked", JobError::TableFull, pid),
			ShellError::NoSuchJob(slot) => write!(f, "{}", JobError::NoSuchJob(slot)),
			ShellError::InvalidJobNumber(ref s) => write!(f, "invalid job number: {} (expected 0..{})", s, crate::job::CAPACITY),
			ShellError::SignalSetup(sig, ref e) => write!(f, "could not bind signal handler for {}: {}", sig, e),
			ShellError::Io(ref e) => write!(f, "{}", e),
		}
	}
}

impl error::Error for ShellError {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match *self {
			ShellError::Encoding(ref e) => Some(e),
			ShellError::ProcessCreation(ref e) => Some(e),
			ShellError::PipeCreation(ref e) => Some(e),
			ShellError::Wait(ref e) => Some(e),
			ShellError::SignalSetup(_, ref e) => Some(e),
			ShellError::Io(ref e) => Some(e),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn job_errors_read_like_the_table() {
		assert_eq!(ShellError::NoSuchJob(3).to_string(), "no such job: 3");
		assert_eq!(ShellError::InvalidJobNumber("2048".to_string()).to_string(), "invalid job number: 2048 (expected 0..1024)");
		assert_eq!(
			ShellError::TableFull(Pid::from_raw(77)).to_string(),
			"job table is full (1024 jobs), process 77 keeps running untracked"
		);
	}

	#[test]
	fn parse_errors_are_invalid_commands() {
		let e: ShellError = ParseError::Empty.into();
		assert_eq!(e.to_string(), "invalid command: empty command");
	}
}
