use std::os::fd::{AsRawFd, OwnedFd};

use log::debug;
use nix::fcntl::OFlag;
use nix::unistd::{self, Pid};

use crate::job::Proccess;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Position { Only, First, Middle, Last }

#[derive(Debug)]
struct Pipe {
	read: OwnedFd,
	write: OwnedFd,
}

/// Stages captured by `pipes`, run one per main-loop iteration. Only the pipe between the
/// previous stage and the current one is ever held open on the interpreter side.
#[derive(Debug)]
pub struct Pipeline {
	stages: Vec<String>,
	cursor: usize,
	incoming: Option<Pipe>,
	outgoing: Option<Pipe>,
	launched: Vec<Proccess>,
	pub is_background: bool,
}

impl Pipeline {
	pub fn new(stages: Vec<String>, is_background: bool) -> Pipeline {
		Pipeline {
			stages: stages,
			cursor: 0,
			incoming: None,
			outgoing: None,
			launched: vec![],
			is_background: is_background,
		}
	}

	pub fn len(&self) -> usize {
		self.stages.len()
	}

	pub fn cursor(&self) -> usize {
		self.cursor
	}

	pub fn is_finished(&self) -> bool {
		self.cursor >= self.stages.len()
	}

	/// Raw command line of the current stage.
	pub fn current(&self) -> Option<&str> {
		self.stages.get(self.cursor).map(|s| s.as_str())
	}

	pub fn position(&self) -> Position {
		let last = self.stages.len().saturating_sub(1);
		match self.cursor {
			0 if last == 0 => Position::Only,
			0 => Position::First,
			i if i >= last => Position::Last,
			_ => Position::Middle,
		}
	}

	pub fn is_last(&self) -> bool {
		match self.position() {
			Position::Only | Position::Last => true,
			_ => false,
		}
	}

	/// Allocates the pipe this stage writes into, unless it is the last stage.
	pub fn open_outgoing(&mut self) -> nix::Result<()> {
		if !self.is_last() {
			let (read, write) = unistd::pipe2(OFlag::O_CLOEXEC)?;
			debug!("stage {}: pipe {} <- {}", self.cursor, read.as_raw_fd(), write.as_raw_fd());
			self.outgoing = Some(Pipe { read: read, write: write });
		}
		Ok(())
	}

	/// Child side: moves the pipe ends this stage uses onto stdin/stdout and closes every
	/// pipe descriptor inherited from the interpreter.
	pub fn wire_child(&mut self) -> nix::Result<()> {
		if let Some(ref pipe) = self.incoming {
			unistd::dup2(pipe.read.as_raw_fd(), libc::STDIN_FILENO)?;
		}
		if let Some(ref pipe) = self.outgoing {
			unistd::dup2(pipe.write.as_raw_fd(), libc::STDOUT_FILENO)?;
		}
		self.incoming = None;
		self.outgoing = None;
		Ok(())
	}

	/// Parent side, right after the stage's child exists: the previous pipe now lives in
	/// the child only.
	pub fn spawned(&mut self, pid: Pid, reports_status: bool) {
		self.incoming = None;
		self.launched.push(Proccess { pid: pid, reports_status: reports_status });
	}

	/// Stage children launched so far, oldest first.
	pub fn take_launched(&mut self) -> Vec<Proccess> {
		std::mem::replace(&mut self.launched, vec![])
	}

	/// Moves to the next stage. Returns true once every stage has been processed.
	pub fn advance(&mut self) -> bool {
		self.incoming = self.outgoing.take();
		self.cursor += 1;
		if self.is_finished() {
			self.incoming = None;
		}
		self.is_finished()
	}
}
