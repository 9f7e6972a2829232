//! Process-wide signal handling for the shell.
//!
//! SIGINT terminates the foreground process, SIGTSTP is ignored and SIGCHLD
//! reaps finished children and frees their job slots. The handlers only
//! touch the atomic cells in [`crate::global`] and call `kill`/`waitpid`;
//! they never allocate, lock or log.
use libc::c_int;
use nix::errno::Errno;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal};
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::error::ShellError;
use crate::global::{FOREGROUND, JOBS};
use crate::job::{ForegroundCell, JobTable};

fn child_set() -> SigSet {
	let mut set = SigSet::empty();
	set.add(Signal::SIGCHLD);
	set
}

extern "C" fn on_interrupt(_: c_int) {
	let errno = Errno::last_raw();
	interrupt_foreground(&FOREGROUND);
	Errno::set_raw(errno);
}

extern "C" fn on_child(_: c_int) {
	let errno = Errno::last_raw();
	reap_children(&JOBS);
	Errno::set_raw(errno);
}

/// Registers the shell's handlers. Called once at startup.
pub fn install() -> Result<(), ShellError> {
	let actions = [
		(Signal::SIGINT, SigAction::new(SigHandler::Handler(on_interrupt), SaFlags::SA_RESTART, SigSet::empty())),
		(Signal::SIGTSTP, SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty())),
		(Signal::SIGCHLD, SigAction::new(
			SigHandler::Handler(on_child),
			SaFlags::SA_RESTART | SaFlags::SA_NOCLDSTOP,
			SigSet::empty(),
		)),
	];
	for (sig, action) in actions {
		unsafe { signal::sigaction(sig, &action) }.map_err(|e| ShellError::SignalSetup(sig, e))?;
		log::trace!("installed handler for {}", sig);
	}
	Ok(())
}

/// Sends SIGTERM to the foreground process, if there is one, and empties
/// the cell. Never signals a process group.
pub fn interrupt_foreground(foreground: &ForegroundCell) -> Option<Pid> {
	let pid = foreground.take()?;
	if pid.as_raw() > 0 {
		let _ = signal::kill(pid, Signal::SIGTERM);
		Some(pid)
	} else {
		None
	}
}

/// Reaps every terminated child without blocking and frees its job slot.
pub fn reap_children(jobs: &JobTable) -> usize {
	let mut reaped = 0;
	loop {
		match wait::waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
			Ok(WaitStatus::StillAlive) | Err(_) => break,
			Ok(status) => {
				if let Some(pid) = status.pid() {
					jobs.release(pid);
					reaped += 1;
				}
			},
		}
	}
	reaped
}

/// Keeps SIGCHLD blocked on the current thread while alive.
///
/// Held from before a fork until the child is registered or waited for, so
/// the reaper can neither release a pid before it was allocated nor reap a
/// child the shell loop is waiting on. Pending notifications are delivered
/// when the guard is dropped.
#[must_use]
pub struct ChildSignalBlock {
	previous: SigSet,
}

impl ChildSignalBlock {
	pub fn new() -> Result<ChildSignalBlock, ShellError> {
		let mut previous = SigSet::empty();
		signal::pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&child_set()), Some(&mut previous))
			.map_err(|e| ShellError::SignalSetup(Signal::SIGCHLD, e))?;
		Ok(ChildSignalBlock { previous: previous })
	}
}

impl Drop for ChildSignalBlock {
	fn drop(&mut self) {
		if let Err(e) = signal::pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&self.previous), None) {
			log::warn!("cannot restore signal mask: {}", e);
		}
	}
}

/// Puts a freshly forked child back to the dispositions a program expects.
///
/// SIGTSTP stays ignored: the shell does not forward terminal stops.
pub fn restore_child_defaults() {
	for sig in [Signal::SIGINT, Signal::SIGCHLD, Signal::SIGPIPE] {
		let _ = unsafe { signal::signal(sig, SigHandler::SigDfl) };
	}
	let _ = signal::pthread_sigmask(SigmaskHow::SIG_UNBLOCK, Some(&child_set()), None);
}
