use std::io::{self, Write};
use std::sync::Mutex;

use log::{LevelFilter, Log};

// `$d` smuggles a literal `$` into the generated macro.
macro_rules! user_message {
	($name:ident, $level:ident, $d:tt) => {
		#[allow(unused_macros)]
		macro_rules! $name {
			($d($d arg:tt)+) => (::log::log!(target: "jobsh::user", ::log::Level::$level, $d($d arg)+));
		}

		#[allow(unused_imports)]
		pub(crate) use $name;
	};
	($name:ident, $level:ident) => {
		user_message!($name, $level, $);
	};
}

user_message!(user_error, Error);
user_message!(user_warn, Warn);
user_message!(user_info, Info);

/// Writes every enabled record as one line starting with `prefix`.
pub struct ShellLogger<W: Write + Send> {
	out: Mutex<W>,
	prefix: &'static str,
	level: LevelFilter,
}

impl<W: Write + Send> ShellLogger<W> {
	fn new(out: W, prefix: &'static str, level: LevelFilter) -> ShellLogger<W> {
		ShellLogger { out: Mutex::new(out), prefix: prefix, level: level }
	}
}

impl ShellLogger<io::Stderr> {
	pub fn to_stderr(prefix: &'static str) -> ShellLogger<io::Stderr> {
		ShellLogger::new(io::stderr(), prefix, LevelFilter::Info)
	}
}

impl<W: Write + Send + 'static> ShellLogger<W> {
	pub fn into_global_logger(mut self, level: LevelFilter) {
		self.level = level;
		if log::set_boxed_logger(Box::new(self)).is_ok() {
			log::set_max_level(level);
		}
	}
}

impl<W: Write + Send> Log for ShellLogger<W> {
	fn enabled(&self, metadata: &log::Metadata) -> bool {
		metadata.level() <= self.level
	}

	fn log(&self, record: &log::Record) {
		if !self.enabled(record.metadata()) {
			return;
		}
		if let Ok(mut out) = self.out.lock() {
			let _ = writeln!(out, "{}{}", self.prefix, record.args());
		}
	}

	fn flush(&self) {
		if let Ok(mut out) = self.out.lock() {
			let _ = out.flush();
		}
	}
}
