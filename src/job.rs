use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

pub trait WaitStatusExt {
	fn is_terminated(self) -> bool;
	fn code(self) -> i32;
}

impl WaitStatusExt for WaitStatus {
	fn is_terminated(self) -> bool {
		match self {
			WaitStatus::Exited(..) | WaitStatus::Signaled(..) => true,
			_ => false,
		}
	}
	/// Plain exit code of a terminated child; a signal death maps to 128 + signal.
	fn code(self) -> i32 {
		match self {
			WaitStatus::Exited(_, code) => code,
			WaitStatus::Signaled(_, signal, _) => 128 + signal as i32,
			_ => 0,
		}
	}
}

/// Blocks until `pid` terminates and returns its wait status.
pub fn wait_for(pid: Pid) -> nix::Result<WaitStatus> {
	loop {
		match wait::waitpid(pid, None) {
			Ok(status) if status.is_terminated() => return Ok(status),
			Ok(_) | Err(Errno::EINTR) => continue,
			Err(e) => return Err(e),
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Proccess {
	pub pid: Pid,
	/// Whether this child's exit code becomes the interpreter status once collected.
	pub reports_status: bool,
}

/// Background children whose status collection was handed over to the reaper.
#[derive(Debug, Default)]
pub struct JobSet {
	proccesses: Vec<Proccess>,
}

impl JobSet {
	pub fn new() -> JobSet {
		JobSet { proccesses: vec![] }
	}

	pub fn push(&mut self, pid: Pid, reports_status: bool) {
		self.proccesses.push(Proccess { pid: pid, reports_status: reports_status });
		debug!("[{}] running in background, {} pending", pid, self.len());
	}

	pub fn len(&self) -> usize {
		self.proccesses.len()
	}

	/// Collects every tracked child that has already terminated, without blocking. Returns
	/// the exit code of the last collected child whose status counts, if any.
	pub fn reap(&mut self) -> Option<i32> {
		let mut status = None;
		self.proccesses.retain(|pr| {
			match wait::waitpid(pr.pid, Some(WaitPidFlag::WNOHANG)) {
				Ok(WaitStatus::StillAlive) => true,
				Ok(s) if s.is_terminated() => {
					debug!("[{}] done, status {}", pr.pid, s.code());
					if pr.reports_status {
						status = Some(s.code());
					}
					false
				},
				Ok(_) => true,
				Err(e) => {
					warn!("[{}] lost: {}", pr.pid, e);
					false
				},
			}
		});
		status
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use nix::sys::signal::Signal;
	use nix::unistd::{fork, ForkResult};

	#[test]
	fn exit_and_signal_codes() {
		let pid = Pid::from_raw(42);
		assert_eq!(WaitStatus::Exited(pid, 7).code(), 7);
		assert_eq!(WaitStatus::Signaled(pid, Signal::SIGKILL, false).code(), 137);
		assert!(!WaitStatus::StillAlive.is_terminated());
	}

	fn spawn_exiting(code: i32) -> Pid {
		match unsafe { fork() }.unwrap() {
			ForkResult::Child => unsafe { libc::_exit(code) },
			ForkResult::Parent { child } => child,
		}
	}

	#[test]
	fn reap_collects_a_burst() {
		let mut jobs = JobSet::new();
		jobs.push(spawn_exiting(3), true);
		jobs.push(spawn_exiting(4), true);
		jobs.push(spawn_exiting(5), false);

		let mut last = None;
		for _ in 0..200 {
			if let Some(s) = jobs.reap() {
				last = Some(s);
			}
			if jobs.len() == 0 {
				break;
			}
			std::thread::sleep(std::time::Duration::from_millis(10));
		}
		assert_eq!(jobs.len(), 0);
		assert!(last == Some(3) || last == Some(4));
	}
}
