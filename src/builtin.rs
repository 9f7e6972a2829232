use std::env;
use std::io::Write;

use crate::error::ShellError;
use crate::eval::{self, EvalResult};
use crate::global::State;
use crate::job::{JobError, CAPACITY};
use crate::signal::ChildSignalBlock;

pub type Builtin = fn(&mut State, &[String]) -> Result<EvalResult, ShellError>;

pub fn builtin_cd(_: &mut State, args: &[String]) -> Result<EvalResult, ShellError> {
	match args {
		[path] => {
			env::set_current_dir(path)?;
			Ok(EvalResult::Done(0))
		},
		_ => Err(ShellError::Usage("cd <path>")),
	}
}

pub fn builtin_pwd(state: &mut State, args: &[String]) -> Result<EvalResult, ShellError> {
	if !args.is_empty() {
		return Err(ShellError::Usage("pwd"));
	}
	writeln!(state.out, "{}", env::current_dir()?.display())?;
	Ok(EvalResult::Done(0))
}

/// Prints only the first word.
pub fn builtin_echo(state: &mut State, args: &[String]) -> Result<EvalResult, ShellError> {
	writeln!(state.out, "{}", args.first().map_or("", |word| word.as_str()))?;
	Ok(EvalResult::Done(0))
}

pub fn builtin_jobs(state: &mut State, args: &[String]) -> Result<EvalResult, ShellError> {
	if !args.is_empty() {
		return Err(ShellError::Usage("jobs"));
	}
	let jobs = {
		let _block = ChildSignalBlock::new()?;
		state.jobs.list()
	};
	for (slot, pid) in jobs {
		writeln!(state.out, "[{}] {}", slot, pid)?;
	}
	Ok(EvalResult::Done(0))
}

pub fn builtin_fg(state: &mut State, args: &[String]) -> Result<EvalResult, ShellError> {
	let arg = match args {
		[arg] => arg,
		_ => return Err(ShellError::Usage("fg <job number>")),
	};
	let slot: usize = match arg.parse() {
		Ok(slot) if slot < CAPACITY => slot,
		_ => return Err(ShellError::InvalidJobNumber(arg.clone())),
	};

	let _block = ChildSignalBlock::new()?;
	let pid = state.jobs.take(slot).map_err(|e| match e {
		JobError::InvalidJobNumber(_) => ShellError::InvalidJobNumber(arg.clone()),
		_ => ShellError::NoSuchJob(slot),
	})?;
	log::debug!("job {} ({}) moved to the foreground", slot, pid);
	let status = eval::wait_in_foreground(state.foreground, pid)?;
	Ok(EvalResult::Done(eval::report(status)))
}

pub fn builtin_exit(_: &mut State, _: &[String]) -> Result<EvalResult, ShellError> {
	Ok(EvalResult::Exit(0))
}

pub fn match_builtin(name: &str) -> Option<Builtin> {
	match name {
		"cd" => Some(builtin_cd as Builtin),
		"pwd" => Some(builtin_pwd as Builtin),
		"echo" => Some(builtin_echo as Builtin),
		"jobs" => Some(builtin_jobs as Builtin),
		"fg" => Some(builtin_fg as Builtin),
		"exit" => Some(builtin_exit as Builtin),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::global::testing::scratch_state;
	use nix::unistd::Pid;
	use pretty_assertions::assert_eq;
	use std::process::Command;

	fn args(ws: &[&str]) -> Vec<String> {
		ws.iter().map(|w| w.to_string()).collect()
	}

	#[test]
	fn lookup() {
		for name in ["cd", "pwd", "echo", "jobs", "fg", "exit"] {
			assert!(match_builtin(name).is_some(), "{}", name);
		}
		assert!(match_builtin("ls").is_none());
		assert!(match_builtin("fg0").is_none());
	}

	#[test]
	fn echo_prints_first_word_only() {
		let (mut state, out) = scratch_state();
		builtin_echo(&mut state, &args(&["hello", "world"])).unwrap();
		builtin_echo(&mut state, &[]).unwrap();
		assert_eq!(out.read(), "hello\n\n");
	}

	#[test]
	fn pwd_prints_current_dir() {
		let (mut state, out) = scratch_state();
		let cwd = env::current_dir().unwrap();
		builtin_pwd(&mut state, &[]).unwrap();
		assert_eq!(out.read(), format!("{}\n", cwd.display()));
		assert!(matches!(builtin_pwd(&mut state, &args(&["x"])), Err(ShellError::Usage(_))));
	}

	#[test]
	fn cd_needs_exactly_one_argument() {
		let (mut state, _) = scratch_state();
		assert!(matches!(builtin_cd(&mut state, &[]), Err(ShellError::Usage(_))));
		assert!(matches!(builtin_cd(&mut state, &args(&["a", "b"])), Err(ShellError::Usage(_))));
		assert!(matches!(builtin_cd(&mut state, &args(&["/jobsh/no/such/dir"])), Err(ShellError::Io(_))));
	}

	#[test]
	fn jobs_lists_slots_in_order() {
		let (mut state, out) = scratch_state();
		state.jobs.allocate(Pid::from_raw(100)).unwrap();
		state.jobs.allocate(Pid::from_raw(200)).unwrap();
		state.jobs.allocate(Pid::from_raw(300)).unwrap();
		state.jobs.release(Pid::from_raw(200));

		builtin_jobs(&mut state, &[]).unwrap();
		assert_eq!(out.read(), "[0] 100\n[2] 300\n");
	}

	#[test]
	fn fg_rejects_bad_job_numbers_without_waiting() {
		let (mut state, _) = scratch_state();
		assert!(matches!(builtin_fg(&mut state, &[]), Err(ShellError::Usage(_))));
		assert!(matches!(builtin_fg(&mut state, &args(&["1", "2"])), Err(ShellError::Usage(_))));
		assert!(matches!(builtin_fg(&mut state, &args(&["1024"])), Err(ShellError::InvalidJobNumber(_))));
		assert!(matches!(builtin_fg(&mut state, &args(&["-1"])), Err(ShellError::InvalidJobNumber(_))));
		assert!(matches!(builtin_fg(&mut state, &args(&["two"])), Err(ShellError::InvalidJobNumber(_))));
		assert!(matches!(builtin_fg(&mut state, &args(&["4"])), Err(ShellError::NoSuchJob(4))));
		assert_eq!(state.foreground.get(), None);
	}

	#[test]
	fn fg_waits_for_the_job_and_frees_its_slot() {
		let (mut state, _) = scratch_state();
		let child = Command::new("sh").args(["-c", "sleep 0.1; exit 5"]).spawn().unwrap();
		let pid = Pid::from_raw(child.id() as i32);
		assert_eq!(state.jobs.allocate(pid), Ok(0));

		let result = builtin_fg(&mut state, &args(&["0"])).unwrap();

		assert_eq!(result, EvalResult::Done(5));
		assert!(state.jobs.list().is_empty());
		assert_eq!(state.foreground.get(), None);
		assert!(matches!(builtin_fg(&mut state, &args(&["0"])), Err(ShellError::NoSuchJob(0))));
	}

	#[test]
	fn exit_stops_the_loop() {
		let (mut state, _) = scratch_state();
		assert_eq!(builtin_exit(&mut state, &[]).unwrap(), EvalResult::Exit(0));
	}
}
