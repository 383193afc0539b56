use std::ffi::CString;
use std::io::{self, Write};

use log::{debug, warn};
use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd::{self, ForkResult, Pid};

use crate::builtin::{self, Builtin, Descriptor, Invocation};
use crate::error::ShellError;
use crate::global::State;
use crate::job::{self, WaitStatusExt};
use crate::pipeline::Pipeline;
use crate::redirect::Redirection;
use crate::types::Command;

/// Exit status of a child whose program could not be found.
pub const NOT_FOUND: i32 = 127;
/// Exit status of a child that could not start its program for any other reason.
pub const CANNOT_EXECUTE: i32 = 126;

#[derive(Debug, Clone, Copy)]
pub enum Target {
	Builtin(&'static Descriptor),
	External,
}

impl Target {
	pub fn resolve(name: &str) -> Target {
		match builtin::match_builtin(name) {
			Some(d) => Target::Builtin(d),
			None => Target::External,
		}
	}

	pub fn updates_status(self) -> bool {
		match self {
			Target::Builtin(d) => d.updates_status,
			Target::External => true,
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Mode { Direct, Foreground, Background, Stage }

/// `&` on a `pipes` line backgrounds the whole pipeline, so the built-in itself stays in the
/// interpreter. Inside a pipeline every stage gets its own child.
pub fn select_mode(target: Target, is_background: bool, in_pipeline: bool) -> Mode {
	if in_pipeline {
		return Mode::Stage;
	}
	match target {
		Target::Builtin(d) if d.builtin == Builtin::Pipes => Mode::Direct,
		_ if is_background => Mode::Background,
		Target::Builtin(d) if !d.requires_own_process => Mode::Direct,
		_ => Mode::Foreground,
	}
}

/// Runs one command cycle: redirect, dispatch, and put the standard streams back.
pub fn eval(state: &mut State, command: &Command, stage: Option<&mut Pipeline>) {
	let target = Target::resolve(command.name);
	let mode = select_mode(target, command.is_background, stage.is_some());
	let synchronous = match mode {
		Mode::Background => false,
		Mode::Stage => !stage.as_ref().map_or(false, |p| p.is_background),
		_ => true,
	};
	debug!("{} as {:?}", command.name, mode);

	let redirection = Redirection::apply(&state.saved, &command.redirects, &mut state.status);
	let inv = Invocation {
		args: &command.arguments,
		stdin_redirected: redirection.stdin(),
		stdout_redirected: redirection.stdout(),
		is_background: command.is_background,
	};

	if synchronous && target.updates_status() {
		state.status = 0;
	}
	match (mode, target) {
		(Mode::Direct, Target::Builtin(d)) => builtin::invoke(d, state, &inv),
		_ => {
			if let Err(e) = launch(state, command, target, &inv, mode, stage) {
				eprintln!("{}: {}", command.name, e);
				state.status = e.code();
			}
		},
	}
	drop(redirection);
}

fn to_argv(command: &Command) -> Result<Vec<CString>, ShellError> {
	let argv: Result<Vec<CString>, _> = command.argv().into_iter().map(CString::new).collect();
	Ok(argv?)
}

fn launch(state: &mut State, command: &Command, target: Target, inv: &Invocation,
          mode: Mode, mut stage: Option<&mut Pipeline>) -> Result<(), ShellError> {
	let argv = match target {
		Target::External => to_argv(command)?,
		Target::Builtin(_) => vec![],
	};
	let _ = io::stdout().flush();

	match unsafe { unistd::fork() }? {
		ForkResult::Child => {
			// The interpreter ignores SIGPIPE; its children must not.
			let _ = unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) };
			if let Some(pipeline) = stage.as_mut() {
				if let Err(e) = pipeline.wire_child() {
					eprintln!("{}: {}", command.name, e.desc());
					exit_child(CANNOT_EXECUTE);
				}
			}
			run_child(state, command, target, inv, &argv)
		},
		ForkResult::Parent { child } => {
			debug!("[{}] forked for {}", child, command.name);
			match (mode, stage) {
				(Mode::Stage, Some(pipeline)) => supervise_stage(state, pipeline, child, target),
				(Mode::Background, _) => {
					state.job_set.push(child, target.updates_status());
					Ok(())
				},
				_ => {
					let status = job::wait_for(child)?;
					if target.updates_status() {
						state.status = status.code();
					}
					Ok(())
				},
			}
		},
	}
}

fn exec(argv: &[CString]) -> ShellError {
	match unistd::execvp(&argv[0], argv) {
		Ok(never) => match never {},
		Err(e) => ShellError::from(e),
	}
}

fn exit_child(code: i32) -> ! {
	let _ = io::stdout().flush();
	unsafe { libc::_exit(code) }
}

/// Body of every forked child. It never returns to the interpreter loop.
fn run_child(state: &mut State, command: &Command, target: Target, inv: &Invocation, argv: &[CString]) -> ! {
	let code = match target {
		Target::Builtin(d) => {
			if d.updates_status {
				state.status = 0;
			}
			builtin::invoke(d, state, inv);
			state.exit_request.unwrap_or(state.status)
		},
		Target::External => {
			let e = exec(argv);
			eprintln!("{}: {}", command.name, e);
			if e.is_not_found() { NOT_FOUND } else { CANNOT_EXECUTE }
		},
	};
	exit_child(code)
}

/// Stages run concurrently: earlier ones are only waited for once the last stage is up.
fn supervise_stage(state: &mut State, pipeline: &mut Pipeline, child: Pid, target: Target) -> Result<(), ShellError> {
	pipeline.spawned(child, target.updates_status());
	debug!("stage {}/{} is [{}]", pipeline.cursor() + 1, pipeline.len(), child);
	if !pipeline.is_last() {
		return Ok(());
	}

	let proccesses = pipeline.take_launched();
	if pipeline.is_background {
		for pr in proccesses {
			state.job_set.push(pr.pid, pr.reports_status);
		}
		return Ok(());
	}
	for pr in proccesses {
		match job::wait_for(pr.pid) {
			Ok(status) if pr.reports_status => state.status = status.code(),
			Ok(_) => {},
			Err(e) if pr.pid == child => return Err(e.into()),
			Err(e) => warn!("[{}] wait failed: {}", pr.pid, e),
		}
	}
	Ok(())
}

/// Collects stage children a pipeline left behind, e.g. when its last stage never started.
pub fn finish_pipeline(state: &mut State, mut pipeline: Pipeline) {
	for pr in pipeline.take_launched() {
		if pipeline.is_background {
			state.job_set.push(pr.pid, pr.reports_status);
			continue;
		}
		match job::wait_for(pr.pid) {
			Ok(status) if pr.reports_status => state.status = status.code(),
			Ok(_) => {},
			Err(e) => warn!("[{}] wait failed: {}", pr.pid, e),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mode_selection() {
		let print = Target::resolve("print");
		let dirmake = Target::resolve("dirmake");
		let pipes = Target::resolve("pipes");
		let external = Target::resolve("sleep");

		assert_eq!(select_mode(print, false, false), Mode::Direct);
		assert_eq!(select_mode(print, true, false), Mode::Background);
		assert_eq!(select_mode(print, false, true), Mode::Stage);
		assert_eq!(select_mode(dirmake, false, false), Mode::Foreground);
		assert_eq!(select_mode(external, false, false), Mode::Foreground);
		assert_eq!(select_mode(external, true, false), Mode::Background);
		assert_eq!(select_mode(pipes, true, false), Mode::Direct);
	}

	#[test]
	fn externals_update_status() {
		assert!(Target::resolve("sleep").updates_status());
		assert!(!Target::resolve("print").updates_status());
	}
}
