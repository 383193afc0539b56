use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use log::{debug, warn};
use nix::fcntl::{fcntl, FcntlArg};
use nix::unistd;

use crate::error::ShellError;
use crate::types::{Redirect, RedirectType};

/// rw-r--r--
pub const CREATE_MODE: u32 = 0o644;

pub fn create_truncate<P: AsRef<Path>>(path: P) -> io::Result<File> {
	OpenOptions::new().write(true).create(true).truncate(true).mode(CREATE_MODE).open(path)
}

fn dup_cloexec(fd: RawFd) -> nix::Result<OwnedFd> {
	let dup = fcntl(fd, FcntlArg::F_DUPFD_CLOEXEC(3))?;
	Ok(unsafe { OwnedFd::from_raw_fd(dup) })
}

/// Duplicates of the interpreter's original stdin and stdout, taken once at startup.
#[derive(Debug)]
pub struct SavedStdio {
	stdin: OwnedFd,
	stdout: OwnedFd,
}

impl SavedStdio {
	pub fn new() -> nix::Result<SavedStdio> {
		Ok(SavedStdio {
			stdin: dup_cloexec(libc::STDIN_FILENO)?,
			stdout: dup_cloexec(libc::STDOUT_FILENO)?,
		})
	}
}

/// Active redirection of the standard streams for one command cycle. Dropping it flushes
/// stdout and puts the saved originals back.
#[derive(Debug)]
pub struct Redirection {
	stdin: Option<RawFd>,
	stdout: Option<RawFd>,
}

impl Redirection {
	/// Opens every target and moves it onto its standard stream. A target that cannot be
	/// opened is reported and its errno becomes the status, but the command still runs.
	pub fn apply(saved: &SavedStdio, redirects: &[Redirect], status: &mut i32) -> Redirection {
		let mut this = Redirection { stdin: None, stdout: None };
		for redirect in redirects {
			if let Err(e) = this.apply_one(saved, redirect) {
				eprintln!("redirect: {}", e);
				*status = e.code();
			}
		}
		this
	}

	fn apply_one(&mut self, saved: &SavedStdio, redirect: &Redirect) -> Result<(), ShellError> {
		let file = match redirect.typ {
			RedirectType::Output => create_truncate(redirect.target)?,
			RedirectType::Input => File::open(redirect.target)?,
		};
		match redirect.typ {
			RedirectType::Output => {
				let _ = io::stdout().flush();
				unistd::dup2(file.as_raw_fd(), libc::STDOUT_FILENO)?;
				self.stdout = Some(saved.stdout.as_raw_fd());
			},
			RedirectType::Input => {
				unistd::dup2(file.as_raw_fd(), libc::STDIN_FILENO)?;
				self.stdin = Some(saved.stdin.as_raw_fd());
			},
		}
		debug!("{:?} redirected to {}", redirect.typ, redirect.target);
		Ok(())
	}

	pub fn stdin(&self) -> bool {
		self.stdin.is_some()
	}

	pub fn stdout(&self) -> bool {
		self.stdout.is_some()
	}
}

impl Drop for Redirection {
	fn drop(&mut self) {
		let _ = io::stdout().flush();
		if let Some(fd) = self.stdout.take() {
			if let Err(e) = unistd::dup2(fd, libc::STDOUT_FILENO) {
				warn!("restoring stdout failed: {}", e);
			}
		}
		if let Some(fd) = self.stdin.take() {
			if let Err(e) = unistd::dup2(fd, libc::STDIN_FILENO) {
				warn!("restoring stdin failed: {}", e);
			}
		}
	}
}
