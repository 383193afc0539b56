//! Built-ins that wrap a single filesystem call.

use std::env;
use std::fs::{self, DirBuilder, File};
use std::io::{self, Read, Write};
use std::mem::ManuallyDrop;
use std::os::fd::FromRawFd;
use std::os::unix::fs::{DirBuilderExt, MetadataExt};
use std::path::Path;

use nix::dir::Dir;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;

use crate::builtin::Invocation;
use crate::error::ShellError;
use crate::global::State;
use crate::redirect;

/// rwxr-xr-x
const DIR_MODE: u32 = 0o755;

pub fn dir(state: &mut State, inv: &Invocation) -> Result<(), ShellError> {
	let target = inv.arg(0).unwrap_or("/");
	env::set_current_dir(target)?;
	state.cwd = env::current_dir()?;
	Ok(())
}

pub fn dirwhere(state: &State) -> Result<(), ShellError> {
	writeln!(io::stdout(), "{}", state.cwd.display())?;
	Ok(())
}

pub fn dirmake(inv: &Invocation) -> Result<(), ShellError> {
	inv.require(1, "dirmake <path>")?;
	DirBuilder::new().mode(DIR_MODE).create(inv.args[0])?;
	Ok(())
}

pub fn dirremove(inv: &Invocation) -> Result<(), ShellError> {
	inv.require(1, "dirremove <path>")?;
	fs::remove_dir(inv.args[0])?;
	Ok(())
}

// Raw readdir order, `.` and `..` included.
fn for_each_entry<F>(path: &Path, mut f: F) -> Result<(), ShellError>
	where F: FnMut(&str, u64) -> io::Result<()>
{
	let mut dir = Dir::open(path, OFlag::O_RDONLY | OFlag::O_DIRECTORY, Mode::empty())?;
	for entry in dir.iter() {
		let entry = entry?;
		f(&entry.file_name().to_string_lossy(), entry.ino())?;
	}
	Ok(())
}

pub fn dirlist(inv: &Invocation) -> Result<(), ShellError> {
	let path = Path::new(inv.arg(0).unwrap_or("."));
	let mut stdout = io::stdout().lock();
	for_each_entry(path, |name, _| write!(stdout, "{}  ", name))?;
	writeln!(stdout)?;
	Ok(())
}

pub fn linkhard(inv: &Invocation) -> Result<(), ShellError> {
	inv.require(2, "linkhard <target> <link>")?;
	fs::hard_link(inv.args[0], inv.args[1])?;
	Ok(())
}

pub fn linksoft(inv: &Invocation) -> Result<(), ShellError> {
	inv.require(2, "linksoft <target> <link>")?;
	std::os::unix::fs::symlink(inv.args[0], inv.args[1])?;
	Ok(())
}

pub fn linkread(inv: &Invocation) -> Result<(), ShellError> {
	inv.require(1, "linkread <link>")?;
	let target = fs::read_link(inv.args[0])?;
	writeln!(io::stdout(), "{}", target.display())?;
	Ok(())
}

/// Lists the entries of the working directory that share the target's inode.
pub fn linklist(state: &State, inv: &Invocation) -> Result<(), ShellError> {
	inv.require(1, "linklist <file>")?;
	let ino = fs::metadata(inv.args[0])?.ino();
	let mut stdout = io::stdout().lock();
	for_each_entry(&state.cwd, |name, entry_ino| {
		if entry_ino == ino {
			write!(stdout, "{}  ", name)?;
		}
		Ok(())
	})?;
	writeln!(stdout)?;
	Ok(())
}

pub fn unlink(inv: &Invocation) -> Result<(), ShellError> {
	inv.require(1, "unlink <file>")?;
	fs::remove_file(inv.args[0])?;
	Ok(())
}

pub fn rename(inv: &Invocation) -> Result<(), ShellError> {
	inv.require(2, "rename <from> <to>")?;
	fs::rename(inv.args[0], inv.args[1])?;
	Ok(())
}

fn named(arg: Option<&str>) -> Option<&str> {
	arg.filter(|s| !s.starts_with('-'))
}

/// `cpcat [SRC|-] [DST|-]`. A name is ignored when its stream is already redirected.
pub fn cpcat(inv: &Invocation) -> Result<(), ShellError> {
	// Raw descriptor 0: the interpreter's buffered stdin may hold lines that are not ours.
	let stdin = ManuallyDrop::new(unsafe { File::from_raw_fd(libc::STDIN_FILENO) });

	let mut input: Box<dyn Read + '_> = match named(inv.arg(0)) {
		Some(src) if !inv.stdin_redirected => Box::new(File::open(src)?),
		_ => Box::new(&*stdin),
	};
	let mut output: Box<dyn Write> = match named(inv.arg(1)) {
		Some(dst) if !inv.stdout_redirected => Box::new(redirect::create_truncate(dst)?),
		_ => Box::new(io::stdout().lock()),
	};
	io::copy(&mut input, &mut output)?;
	output.flush()?;
	Ok(())
}
