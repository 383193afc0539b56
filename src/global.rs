use std::env;
use std::path::PathBuf;

use crate::job;
use crate::pipeline;
use crate::redirect;

pub const DEFAULT_NAME: &str = "mysh";
pub const MAX_NAME_LEN: usize = 63;

/// Everything the interpreter carries from one command cycle to the next.
#[derive(Debug)]
pub struct State {
	pub name: String,
	/// Last exit status, written only from the main loop (including reaping).
	pub status: i32,
	pub cwd: PathBuf,
	pub pipeline: Option<pipeline::Pipeline>,
	pub job_set: job::JobSet,
	pub saved: redirect::SavedStdio,
	pub exit_request: Option<i32>,
}

impl State {
	pub fn new(name: &str) -> nix::Result<State> {
		let saved = redirect::SavedStdio::new()?;
		let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
		let mut state = State {
			name: String::new(),
			status: 0,
			cwd: cwd,
			pipeline: None,
			job_set: job::JobSet::new(),
			saved: saved,
			exit_request: None,
		};
		state.set_name(name);
		Ok(state)
	}

	pub fn set_name(&mut self, name: &str) {
		self.name = name.chars().take(MAX_NAME_LEN).collect();
	}

	/// Runs the reaper and stores the collected status, if any.
	pub fn reap(&mut self) {
		if let Some(status) = self.job_set.reap() {
			self.status = status;
		}
	}
}
