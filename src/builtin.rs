use std::io::{self, Write};

use log::debug;
use nix::unistd;

use crate::error::ShellError;
use crate::fs;
use crate::global::State;
use crate::pipeline::Pipeline;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Builtin {
	Help, Name, Status, Exit, Print, Echo, Pid, Ppid,
	Dir, DirWhere, DirMake, DirRemove, DirList,
	LinkHard, LinkSoft, LinkRead, LinkList, Unlink, Rename, CpCat,
	Pipes,
}

#[derive(Debug)]
pub struct Descriptor {
	pub name: &'static str,
	pub description: &'static str,
	pub builtin: Builtin,
	pub requires_own_process: bool,
	pub updates_status: bool,
}

const fn command(name: &'static str, description: &'static str, builtin: Builtin,
                 requires_own_process: bool, updates_status: bool) -> Descriptor {
	Descriptor { name, description, builtin, requires_own_process, updates_status }
}

pub static COMMANDS: [Descriptor; 21] = [
	command("help", "Print short help.", Builtin::Help, false, false),
	command("name", "Print or change shell name.", Builtin::Name, false, false),
	command("status", "Print last command status.", Builtin::Status, false, false),
	command("exit", "Exit from shell.", Builtin::Exit, false, true),
	command("print", "Print arguments.", Builtin::Print, false, false),
	command("echo", "Print arguments with a newline.", Builtin::Echo, false, false),
	command("pid", "Print PID.", Builtin::Pid, false, false),
	command("ppid", "Print PPID.", Builtin::Ppid, false, false),
	command("dir", "Change directory.", Builtin::Dir, false, true),
	command("dirwhere", "Print current working directory.", Builtin::DirWhere, true, false),
	command("dirmake", "Create a directory.", Builtin::DirMake, true, true),
	command("dirremove", "Remove a directory.", Builtin::DirRemove, true, true),
	command("dirlist", "List directory contents.", Builtin::DirList, true, true),
	command("linkhard", "Create a hard link.", Builtin::LinkHard, true, true),
	command("linksoft", "Create a symbolic link.", Builtin::LinkSoft, true, true),
	command("linkread", "Print symbolic link target.", Builtin::LinkRead, true, true),
	command("linklist", "Print hard links to a file.", Builtin::LinkList, true, true),
	command("unlink", "Remove a file.", Builtin::Unlink, true, true),
	command("rename", "Rename a file or a directory.", Builtin::Rename, true, true),
	command("cpcat", "Copy a file.", Builtin::CpCat, false, true),
	command("pipes", "Create a pipeline.", Builtin::Pipes, false, true),
];

pub fn match_builtin(name: &str) -> Option<&'static Descriptor> {
	COMMANDS.iter().find(|d| d.name == name)
}

/// Arguments and stream state a built-in runs with.
#[derive(Debug)]
pub struct Invocation<'a> {
	pub args: &'a [&'a str],
	pub stdin_redirected: bool,
	pub stdout_redirected: bool,
	pub is_background: bool,
}

impl<'a> Invocation<'a> {
	pub fn arg(&self, i: usize) -> Option<&'a str> {
		self.args.get(i).cloned()
	}

	pub fn require(&self, count: usize, usage: &'static str) -> Result<(), ShellError> {
		if self.args.len() < count {
			Err(ShellError::Usage(usage))
		} else {
			Ok(())
		}
	}
}

/// Runs a built-in; a failure is reported as `<name>: <message>` and its code becomes the
/// status.
pub fn invoke(descriptor: &Descriptor, state: &mut State, inv: &Invocation) {
	debug!("builtin {} {:?}", descriptor.name, inv.args);
	let r = run(descriptor.builtin, state, inv);
	let _ = io::stdout().flush();
	if let Err(e) = r {
		eprintln!("{}: {}", descriptor.name, e);
		state.status = e.code();
	}
}

fn run(builtin: Builtin, state: &mut State, inv: &Invocation) -> Result<(), ShellError> {
	match builtin {
		Builtin::Help => builtin_help(),
		Builtin::Name => builtin_name(state, inv),
		Builtin::Status => builtin_status(state),
		Builtin::Exit => builtin_exit(state, inv),
		Builtin::Print => builtin_print(inv, false),
		Builtin::Echo => builtin_print(inv, true),
		Builtin::Pid => builtin_pid(unistd::getpid()),
		Builtin::Ppid => builtin_pid(unistd::getppid()),
		Builtin::Dir => fs::dir(state, inv),
		Builtin::DirWhere => fs::dirwhere(state),
		Builtin::DirMake => fs::dirmake(inv),
		Builtin::DirRemove => fs::dirremove(inv),
		Builtin::DirList => fs::dirlist(inv),
		Builtin::LinkHard => fs::linkhard(inv),
		Builtin::LinkSoft => fs::linksoft(inv),
		Builtin::LinkRead => fs::linkread(inv),
		Builtin::LinkList => fs::linklist(state, inv),
		Builtin::Unlink => fs::unlink(inv),
		Builtin::Rename => fs::rename(inv),
		Builtin::CpCat => fs::cpcat(inv),
		Builtin::Pipes => builtin_pipes(state, inv),
	}
}

fn builtin_help() -> Result<(), ShellError> {
	let mut stdout = io::stdout().lock();
	for d in COMMANDS.iter() {
		writeln!(stdout, "{:>10} - {}", d.name, d.description)?;
	}
	Ok(())
}

fn builtin_name(state: &mut State, inv: &Invocation) -> Result<(), ShellError> {
	match inv.arg(0) {
		Some(name) => state.set_name(name),
		None => writeln!(io::stdout(), "{}", state.name)?,
	}
	Ok(())
}

fn builtin_status(state: &State) -> Result<(), ShellError> {
	writeln!(io::stdout(), "{}", state.status)?;
	Ok(())
}

fn builtin_exit(state: &mut State, inv: &Invocation) -> Result<(), ShellError> {
	let code = match inv.arg(0) {
		Some(s) => s.parse::<i32>().map_err(|_| ShellError::Usage("exit [<code>]"))?,
		None => 0,
	};
	state.exit_request = Some(code);
	Ok(())
}

fn builtin_print(inv: &Invocation, newline: bool) -> Result<(), ShellError> {
	let mut stdout = io::stdout().lock();
	stdout.write_all(inv.args.join(" ").as_bytes())?;
	if newline {
		stdout.write_all(b"\n")?;
	}
	Ok(())
}

fn builtin_pid(pid: unistd::Pid) -> Result<(), ShellError> {
	writeln!(io::stdout(), "{}", pid)?;
	Ok(())
}

fn builtin_pipes(state: &mut State, inv: &Invocation) -> Result<(), ShellError> {
	inv.require(1, "pipes <command> [<command> ...]")?;
	let stages: Vec<String> = inv.args.iter().map(|s| s.to_string()).collect();
	debug!("pipeline of {} stages{}", stages.len(), if inv.is_background { " in background" } else { "" });
	state.pipeline = Some(Pipeline::new(stages, inv.is_background));
	Ok(())
}
