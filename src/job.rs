use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

pub const CAPACITY: usize = 1024;

/// Tag bit marking an occupied cell. The low 32 bits carry the pid, so a
/// pid of any value (0 included) is distinguishable from a free cell.
const OCCUPIED: u64 = 1 << 32;
const FREE: u64 = 0;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Slot { Free, Occupied(Pid) }

impl Slot {
	fn encode(self) -> u64 {
		match self {
			Slot::Free => FREE,
			Slot::Occupied(pid) => OCCUPIED | u64::from(pid.as_raw() as u32),
		}
	}

	fn decode(raw: u64) -> Slot {
		if raw & OCCUPIED == 0 {
			Slot::Free
		} else {
			Slot::Occupied(Pid::from_raw(raw as u32 as i32))
		}
	}
}

/// A `Slot` that can be read and rewritten from a signal handler.
///
/// Every transition is one atomic instruction; nothing here takes a lock
/// or allocates.
#[derive(Debug)]
pub struct AtomicSlot(AtomicU64);

impl AtomicSlot {
	pub const fn free() -> AtomicSlot {
		AtomicSlot(AtomicU64::new(FREE))
	}

	pub fn load(&self) -> Slot {
		Slot::decode(self.0.load(Ordering::Acquire))
	}

	pub fn store(&self, slot: Slot) {
		self.0.store(slot.encode(), Ordering::Release);
	}

	/// Binds `pid` if the cell is free.
	pub fn claim(&self, pid: Pid) -> bool {
		self.0.compare_exchange(FREE, Slot::Occupied(pid).encode(), Ordering::AcqRel, Ordering::Acquire).is_ok()
	}

	/// Frees the cell only if it still holds `pid`.
	pub fn clear_if(&self, pid: Pid) -> bool {
		self.0.compare_exchange(Slot::Occupied(pid).encode(), FREE, Ordering::AcqRel, Ordering::Acquire).is_ok()
	}

	pub fn take(&self) -> Option<Pid> {
		match Slot::decode(self.0.swap(FREE, Ordering::AcqRel)) {
			Slot::Free => None,
			Slot::Occupied(pid) => Some(pid),
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum JobError {
	TableFull,
	/// The pid already holds the given slot.
	AlreadyTracked(usize),
	NoSuchJob(usize),
	InvalidJobNumber(usize),
}

impl fmt::Display for JobError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			JobError::TableFull => write!(f, "job table is full ({} jobs)", CAPACITY),
			JobError::AlreadyTracked(slot) => write!(f, "process is already job {}", slot),
			JobError::NoSuchJob(slot) => write!(f, "no such job: {}", slot),
			JobError::InvalidJobNumber(slot) => write!(f, "invalid job number: {} (expected 0..{})", slot, CAPACITY),
		}
	}
}

/// Background jobs indexed by their user-visible job number.
///
/// Mutated from the shell loop (`allocate`, `take`) and from the SIGCHLD
/// handler (`release`), so each slot is an `AtomicSlot`.
#[derive(Debug)]
pub struct JobTable {
	slots: [AtomicSlot; CAPACITY],
}

impl JobTable {
	pub const fn new() -> JobTable {
		#[allow(clippy::declare_interior_mutable_const)]
		const SLOT: AtomicSlot = AtomicSlot::free();
		JobTable { slots: [SLOT; CAPACITY] }
	}

	/// Binds `pid` to the lowest free slot. A pid holds at most one slot.
	///
	/// Only the shell loop allocates, so the duplicate check and the claim
	/// cannot interleave with another `allocate`; the handler only frees.
	pub fn allocate(&self, pid: Pid) -> Result<usize, JobError> {
		if let Some(i) = self.slots.iter().position(|slot| slot.load() == Slot::Occupied(pid)) {
			return Err(JobError::AlreadyTracked(i));
		}
		for (i, slot) in self.slots.iter().enumerate() {
			if slot.claim(pid) {
				return Ok(i);
			}
		}
		Err(JobError::TableFull)
	}

	/// Frees every slot holding `pid`. Safe to call from a signal handler.
	pub fn release(&self, pid: Pid) -> usize {
		let mut released = 0;
		for slot in self.slots.iter() {
			if slot.clear_if(pid) {
				released += 1;
			}
		}
		released
	}

	pub fn take(&self, slot: usize) -> Result<Pid, JobError> {
		let cell = self.slots.get(slot).ok_or(JobError::InvalidJobNumber(slot))?;
		cell.take().ok_or(JobError::NoSuchJob(slot))
	}

	pub fn list(&self) -> Vec<(usize, Pid)> {
		self.slots.iter().enumerate()
			.filter_map(|(i, slot)| match slot.load() {
				Slot::Occupied(pid) => Some((i, pid)),
				Slot::Free => None,
			})
			.collect()
	}
}

impl Default for JobTable {
	fn default() -> JobTable {
		JobTable::new()
	}
}

/// The process the shell loop is blocked on, if any.
#[derive(Debug)]
pub struct ForegroundCell(AtomicSlot);

impl ForegroundCell {
	pub const fn new() -> ForegroundCell {
		ForegroundCell(AtomicSlot::free())
	}

	pub fn set(&self, pid: Pid) {
		self.0.store(Slot::Occupied(pid));
	}

	pub fn get(&self) -> Option<Pid> {
		match self.0.load() {
			Slot::Occupied(pid) => Some(pid),
			Slot::Free => None,
		}
	}

	pub fn take(&self) -> Option<Pid> {
		self.0.take()
	}

	pub fn clear(&self) {
		self.0.store(Slot::Free);
	}
}

impl Default for ForegroundCell {
	fn default() -> ForegroundCell {
		ForegroundCell::new()
	}
}

pub trait WaitStatusExt {
	fn code(self) -> i32;
}

impl WaitStatusExt for WaitStatus {
	fn code(self) -> i32 {
		match self {
			WaitStatus::Exited(_, code) => code,
			WaitStatus::Signaled(_, sig, _) => 128 + sig as i32,
			WaitStatus::Stopped(_, sig) => 128 + sig as i32,
			_ => 0,
		}
	}
}
