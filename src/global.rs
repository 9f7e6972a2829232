use std::io;

use crate::config::Config;
use crate::job::{ForegroundCell, JobTable};

/// The instances the signal handlers act on.
pub static JOBS: JobTable = JobTable::new();
pub static FOREGROUND: ForegroundCell = ForegroundCell::new();

pub struct State {
	pub jobs: &'static JobTable,
	pub foreground: &'static ForegroundCell,
	pub config: Config,
	pub out: Box<dyn io::Write>,
}

impl State {
	pub fn new(config: Config) -> State {
		State { jobs: &JOBS, foreground: &FOREGROUND, config: config, out: Box::new(io::stdout()) }
	}
}

#[cfg(test)]
pub mod testing {
	use std::cell::RefCell;
	use std::io;
	use std::rc::Rc;

	use super::State;
	use crate::config::Config;
	use crate::job::{ForegroundCell, JobTable};

	/// Captures what builtins print.
	#[derive(Clone, Default)]
	pub struct Output(Rc<RefCell<Vec<u8>>>);

	impl Output {
		pub fn read(&self) -> String {
			String::from_utf8_lossy(&self.0.borrow()).into_owned()
		}
	}

	impl io::Write for Output {
		fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
			self.0.borrow_mut().extend_from_slice(buf);
			Ok(buf.len())
		}

		fn flush(&mut self) -> io::Result<()> {
			Ok(())
		}
	}

	/// A state with its own job table and foreground cell, so tests never
	/// touch the process-wide ones.
	pub fn scratch_state() -> (State, Output) {
		let output = Output::default();
		let state = State {
			jobs: Box::leak(Box::new(JobTable::new())),
			foreground: Box::leak(Box::new(ForegroundCell::new())),
			config: Config::default(),
			out: Box::new(output.clone()),
		};
		(state, output)
	}
}
