use std::convert::Infallible;
use std::ffi::{CStr, CString};
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::io::{self, Write};
use std::{error, fmt};

use nix::errno::Errno;
use nix::fcntl::{self, FcntlArg, FdFlag, OFlag};
use nix::sys::stat::Mode;
use nix::sys::wait::{self, Id, WaitPidFlag, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};

use crate::builtin;
use crate::error::ShellError;
use crate::global::State;
use crate::job::{ForegroundCell, JobError, WaitStatusExt};
use crate::logger::user_info;
use crate::parser::ParseError;
use crate::signal::{self, ChildSignalBlock};
use crate::types::Command;

/// Failures inside a forked child, reported there before it exits.
#[derive(Debug)]
enum ExecError {
	Redirect(String, Errno),
	Duplicate(Errno),
	Fork(Errno),
	Exec(String, Errno),
}

impl fmt::Display for ExecError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			ExecError::Redirect(ref path, e) => write!(f, "{}: cannot open output location: {}", path, e.desc()),
			ExecError::Duplicate(e) => write!(f, "dup2 failed: {}", e.desc()),
			ExecError::Fork(e) => write!(f, "fork failed: {}", e.desc()),
			ExecError::Exec(ref name, Errno::ENOENT) => write!(f, "{}: command not found", name),
			ExecError::Exec(ref name, e) => write!(f, "{}: {}", name, e.desc()),
		}
	}
}

impl error::Error for ExecError {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match *self {
			ExecError::Redirect(_, ref e) => Some(e),
			ExecError::Duplicate(ref e) => Some(e),
			ExecError::Fork(ref e) => Some(e),
			ExecError::Exec(_, ref e) => Some(e),
		}
	}
}

/// Status a child exits with when it cannot run the requested program.
const EXEC_FAILURE: i32 = 1;

struct Stage {
	name: String,
	argv: Vec<CString>,
}

impl Stage {
	fn new(words: &[String]) -> Result<Stage, ShellError> {
		let name = words.first().ok_or(ShellError::InvalidCommand(ParseError::Empty))?;
		let argv: Result<Vec<CString>, _> = words.iter().map(|w| CString::new(w.as_bytes())).collect();
		Ok(Stage { name: name.clone(), argv: argv? })
	}

	fn exec(&self) -> Result<Infallible, ExecError> {
		unistd::execvp(&self.argv[0], &self.argv).map_err(|e| ExecError::Exec(self.name.clone(), e))
	}
}

/// A command with every string already converted for exec, so nothing in
/// the child needs to fail on encoding.
struct Plan {
	first: Stage,
	second: Option<Stage>,
	redirect: Option<CString>,
	background: bool,
}

impl Plan {
	fn new(command: &Command) -> Result<Plan, ShellError> {
		let second = command.pipeline.as_ref().map(|words| Stage::new(words)).transpose()?;
		let redirect = match (&command.redirect, &second) {
			(Some(path), None) => Some(CString::new(path.as_os_str().as_bytes())?),
			(Some(path), Some(_)) => {
				log::warn!("ignoring redirect to {} on a pipeline", path.display());
				None
			},
			(None, _) => None,
		};
		Ok(Plan { first: Stage::new(&command.argv)?, second: second, redirect: redirect, background: command.background })
	}
}

/// Installs `fd` as `target` for the program about to be exec'd.
fn move_fd(fd: OwnedFd, target: RawFd) -> Result<(), ExecError> {
	if fd.as_raw_fd() == target {
		fcntl::fcntl(target, FcntlArg::F_SETFD(FdFlag::empty())).map_err(ExecError::Duplicate)?;
		let _ = fd.into_raw_fd();
		return Ok(());
	}
	unistd::dup2(fd.as_raw_fd(), target).map_err(ExecError::Duplicate)?;
	Ok(())
}

fn redirect_stdout(path: &CStr) -> Result<(), ExecError> {
	let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IXUSR | Mode::S_IRGRP | Mode::S_IROTH;
	let flags = OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND | OFlag::O_CLOEXEC;
	let fd = fcntl::open(path, flags, mode)
		.map_err(|e| ExecError::Redirect(path.to_string_lossy().into_owned(), e))?;
	move_fd(unsafe { OwnedFd::from_raw_fd(fd) }, libc::STDOUT_FILENO)
}

fn do_exec_command(plan: &Plan, pipe: Option<(OwnedFd, OwnedFd)>) -> Result<Infallible, ExecError> {
	let (second, (read, write)) = match (&plan.second, pipe) {
		(Some(second), Some(pipe)) => (second, pipe),
		_ => {
			if let Some(ref path) = plan.redirect {
				redirect_stdout(path)?;
			}
			return plan.first.exec();
		},
	};
	match unsafe { unistd::fork() }.map_err(ExecError::Fork)? {
		ForkResult::Child => {
			drop(read);
			move_fd(write, libc::STDOUT_FILENO)?;
			plan.first.exec()
		},
		ForkResult::Parent { .. } => {
			drop(write);
			move_fd(read, libc::STDIN_FILENO)?;
			second.exec()
		},
	}
}

/// Runs in the forked child and never returns. With a pipeline this
/// process becomes the consumer and forks the producer.
fn exec_command(plan: &Plan, pipe: Option<(OwnedFd, OwnedFd)>) -> ! {
	// leave the shell's group before SIGINT can reach this process
	if plan.background {
		let _ = unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0));
	}
	signal::restore_child_defaults();
	let e = match do_exec_command(plan, pipe) {
		Ok(never) => match never {},
		Err(e) => e,
	};
	let _ = writeln!(&mut io::stderr(), "jobsh: {}", e);
	unsafe { libc::_exit(EXEC_FAILURE) }
}

/// Makes `pid` the foreground process and blocks until it exits.
///
/// The caller must hold a [`ChildSignalBlock`]. The child is first waited
/// for without being reaped, so the foreground cell is emptied while the pid
/// still belongs to the zombie and an interrupt can never hit a recycled pid.
pub fn wait_in_foreground(foreground: &ForegroundCell, pid: Pid) -> Result<WaitStatus, ShellError> {
	foreground.set(pid);
	let exited = loop {
		match wait::waitid(Id::Pid(pid), WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT) {
			Err(Errno::EINTR) => continue,
			r => break r,
		}
	};
	foreground.clear();
	exited.map_err(ShellError::Wait)?;
	loop {
		match wait::waitpid(pid, None) {
			Err(Errno::EINTR) => continue,
			r => return r.map_err(ShellError::Wait),
		}
	}
}

/// Turns a finished foreground process into the shell's status code.
pub fn report(status: WaitStatus) -> i32 {
	if let WaitStatus::Signaled(pid, sig, _) = status {
		user_info!("process {} terminated by {}", pid, sig);
	}
	status.code()
}

fn spawn_command(state: &State, plan: &Plan) -> Result<EvalResult, ShellError> {
	let pipe = match plan.second {
		Some(_) => Some(unistd::pipe2(OFlag::O_CLOEXEC).map_err(ShellError::PipeCreation)?),
		None => None,
	};

	let _block = ChildSignalBlock::new()?;
	let pid = match unsafe { unistd::fork() } {
		Ok(ForkResult::Parent { child }) => child,
		Ok(ForkResult::Child) => exec_command(plan, pipe),
		Err(e) => return Err(ShellError::ProcessCreation(e)),
	};
	drop(pipe);
	log::debug!("started {} as {}", plan.first.name, pid);

	if plan.background {
		// also done by the child; whichever runs first wins
		let _ = unistd::setpgid(pid, pid);
		match state.jobs.allocate(pid) {
			Ok(slot) | Err(JobError::AlreadyTracked(slot)) => Ok(EvalResult::Running { slot: slot, pid: pid }),
			Err(_) => Err(ShellError::TableFull(pid)),
		}
	} else {
		let status = wait_in_foreground(state.foreground, pid)?;
		log::debug!("{} finished: {:?}", pid, status);
		Ok(EvalResult::Done(report(status)))
	}
}

#[derive(Debug, PartialEq, Eq)]
pub enum EvalResult {
	Done(i32),
	Running { slot: usize, pid: Pid },
	Exit(i32),
}

pub fn eval(state: &mut State, command: &Command) -> Result<EvalResult, ShellError> {
	let name = command.name().ok_or(ShellError::InvalidCommand(ParseError::Empty))?;
	if command.is_simple() {
		if let Some(func) = builtin::match_builtin(name) {
			return func(state, &command.argv[1..]);
		}
	}
	let plan = Plan::new(command)?;
	spawn_command(state, &plan)
}
