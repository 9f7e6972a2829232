mod builtin;
mod config;
mod error;
mod eval;
mod global;
mod job;
mod logger;
mod parser;
mod signal;
mod types;

use std::io;
use std::io::{BufRead, IsTerminal, Write};
use std::process;

use config::Config;
use error::ShellError;
use eval::EvalResult;
use logger::{user_error, user_info, user_warn, ShellLogger};

fn main() {
	let config = Config::from_env();
	ShellLogger::to_stderr("jobsh: ").into_global_logger(config.log_level);

	if let Err(e) = signal::install() {
		user_error!("{}", e);
		process::exit(1);
	}

	let interactive = io::stdin().is_terminal();
	let mut state = global::State::new(config);
	let stdin = io::stdin();
	let mut stdin_locked = stdin.lock();
	loop {
		if interactive {
			let _ = write!(state.out, "{}", state.config.prompt);
			let _ = state.out.flush();
		}
		let mut line: Vec<u8> = vec![];
		match stdin_locked.read_until(b'\n', &mut line) {
			Ok(0) => process::exit(0),
			Ok(_) => {},
			Err(e) => {
				user_error!("cannot read input: {}", e);
				process::exit(1);
			},
		}

		let result = parser::parse(&line)
			.map_err(ShellError::from)
			.and_then(|command| eval::eval(&mut state, &command));
		debug_assert!(state.foreground.get().is_none());
		match result {
			Ok(EvalResult::Done(status)) => log::trace!("status {}", status),
			Ok(EvalResult::Running { slot, pid }) => user_info!("[{}] {}", slot, pid),
			Ok(EvalResult::Exit(code)) => {
				let _ = state.out.flush();
				process::exit(code);
			},
			Err(e @ ShellError::TableFull(_)) => user_warn!("{}", e),
			Err(e) => user_error!("{}", e),
		}
		let _ = state.out.flush();
	}
}
