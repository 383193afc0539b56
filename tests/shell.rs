use std::{env, fs, process, str, thread};
use std::io::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;

struct ShellHandler {
	child: process::Child,
	dir: PathBuf,
}

struct Finished {
	stdout: String,
	stderr: String,
	code: Option<i32>,
	dir: PathBuf,
}

impl Finished {
	fn file(&self, name: &str) -> String {
		fs::read_to_string(self.dir.join(name)).unwrap()
	}
}

fn sleep_little() {
	thread::sleep(Duration::from_millis(800));
}

impl ShellHandler {
	fn new(test: &str) -> ShellHandler {
		let dir = env::temp_dir().join(format!("mysh-{}-{}", test, process::id()));
		let _ = fs::remove_dir_all(&dir);
		fs::create_dir_all(&dir).unwrap();
		let child = process::Command::new(env!("CARGO_BIN_EXE_mysh"))
			.current_dir(&dir)
			.env_remove("RUST_LOG")
			.stdin(process::Stdio::piped())
			.stdout(process::Stdio::piped())
			.stderr(process::Stdio::piped())
			.spawn()
			.unwrap();
		ShellHandler { child: child, dir: dir }
	}

	fn send(&mut self, line: &str) {
		let stdin = self.child.stdin.as_mut().unwrap();
		writeln!(stdin, "{}", line).unwrap();
		stdin.flush().unwrap();
	}

	fn finish(mut self) -> Finished {
		drop(self.child.stdin.take());
		let output = self.child.wait_with_output().unwrap();
		Finished {
			stdout: String::from_utf8(output.stdout).unwrap(),
			stderr: String::from_utf8(output.stderr).unwrap(),
			code: output.status.code(),
			dir: self.dir,
		}
	}
}

fn run(test: &str, script: &[&str]) -> Finished {
	let mut t = ShellHandler::new(test);
	for line in script {
		t.send(line);
	}
	t.finish()
}

#[test]
fn quoted_tokens() {
	let out = run("quoted", &["echo  a   \"b c\"  d"]);
	assert_eq!(out.stdout, "a b c d\n");
}

#[test]
fn blank_and_comment_lines_do_nothing() {
	let out = run("comment", &["", "   ", "# echo no", "print yes"]);
	assert_eq!(out.stdout, "yes");
	assert_eq!(out.stderr, "");
}

#[test]
fn dirmake_status() {
	let out = run("dirmake", &["dirmake X", "status", "dirmake X", "status"]);
	assert_eq!(out.stdout, format!("0\n{}\n", libc::EEXIST));
	assert!(out.stderr.starts_with("dirmake: "));
	assert!(out.dir.join("X").is_dir());
}

#[test]
fn output_redirect_then_cpcat() {
	let out = run("redirect", &["echo hi > out.txt", "cpcat out.txt"]);
	assert_eq!(out.file("out.txt"), "hi\n");
	assert_eq!(out.stdout, "hi\n");
}

#[test]
fn redirect_does_not_leak_into_next_command() {
	let out = run("noleak", &["echo hi >a.txt", "print after", "status"]);
	assert_eq!(out.file("a.txt"), "hi\n");
	assert_eq!(out.stdout, "after0\n");
}

#[test]
fn input_redirect() {
	let out = run("input", &["echo one two >in.txt", "cpcat <in.txt", "cpcat - copy.txt <in.txt", "print done"]);
	assert_eq!(out.stdout, "one two\ndone");
	assert_eq!(out.file("copy.txt"), "one two\n");
}

#[test]
fn redirect_failure_is_fail_soft() {
	let out = run("failsoft", &["print x <missing.txt", "status"]);
	assert_eq!(out.stdout, format!("x{}\n", libc::ENOENT));
	assert!(out.stderr.contains("redirect: "));
}

#[test]
fn forked_builtin_output_redirect() {
	let out = run("forkredir", &["dirmake d", "dirlist d >list.txt", "print ok"]);
	assert_eq!(out.stdout, "ok");
	let list = out.file("list.txt");
	assert!(list.contains(".  "));
	assert!(list.contains("..  "));
}

#[test]
fn pipeline_stage_output_feeds_next_stage() {
	let out = run("pipecat", &["dirwhere", "pipes dirwhere cpcat"]);
	let lines: Vec<&str> = out.stdout.lines().collect();
	assert_eq!(lines.len(), 2);
	assert_eq!(lines[0], lines[1]);
}

#[test]
fn pipeline_last_stage_ignoring_input() {
	let out = run("pipehello", &["pipes dirwhere \"print hello\"", "print !"]);
	assert_eq!(out.stdout, "hello!");
}

#[test]
fn three_stage_pipeline() {
	let out = run("pipe3", &["pipes \"echo abc\" cpcat cpcat", "status"]);
	assert_eq!(out.stdout, "abc\n0\n");
}

#[test]
fn pipeline_with_external_stages() {
	let out = run("pipeext", &["echo \"cat; exit 3\" >s.sh", "pipes \"echo x y\" \"sh s.sh\"", "status"]);
	assert_eq!(out.stdout, "x y\n3\n");
}

#[test]
fn failed_stage_sets_status_when_later_stages_do_not() {
	let out = run("pipestatus", &["dirmake X", "pipes \"dirmake X\" \"print a\"", "status"]);
	assert_eq!(out.stdout, format!("a{}\n", libc::EEXIST));
	assert!(out.stderr.contains("dirmake: "));
}

#[test]
fn command_cycles_leave_descriptors_as_they_were() {
	let out = run("fds", &[
		"ls /proc/self/fd >before.txt",
		"echo x >f.txt",
		"cpcat <f.txt",
		"pipes \"echo a\" cpcat \"sh -c cat\"",
		"ls /proc/self/fd >after.txt",
	]);
	assert_eq!(out.stdout, "x\na\n");
	assert!(!out.file("before.txt").is_empty());
	assert_eq!(out.file("before.txt"), out.file("after.txt"));
}

#[test]
fn background_pipeline() {
	let out = run("pipebg", &["pipes \"echo bg\" cpcat &"]);
	assert_eq!(out.stdout, "bg\n");
}

#[test]
fn exit_code() {
	let out = run("exit", &["exit 7", "print unreachable"]);
	assert_eq!(out.code, Some(7));
	assert_eq!(out.stdout, "");
}

#[test]
fn end_of_input_exits_zero() {
	let out = run("eof", &["dirmake X", "dirmake X"]);
	assert_eq!(out.code, Some(0));
}

#[test]
fn exit_with_bad_code_keeps_running() {
	let out = run("exitbad", &["exit seven", "status"]);
	assert_eq!(out.stdout, format!("{}\n", libc::EINVAL));
	assert!(out.stderr.contains("usage: exit"));
	assert_eq!(out.code, Some(0));
}

#[test]
fn external_commands_report_exit_code() {
	let out = run("external", &["sh -c \"exit 5\"", "status", "no-such-command-mysh", "status"]);
	assert_eq!(out.stdout, "5\n127\n");
	assert!(out.stderr.contains("no-such-command-mysh"));
}

#[test]
fn background_status_arrives_after_reaping() {
	let mut t = ShellHandler::new("background");
	t.send("dirmake X");
	t.send("dirmake X");
	t.send("sh -c \"sleep 0.3; exit 3\" &");
	t.send("status");
	sleep_little();
	t.send("status");
	let out = t.finish();
	assert_eq!(out.stdout, format!("{}\n3\n", libc::EEXIST));
}

#[test]
fn background_builtin_runs_in_child() {
	let mut t = ShellHandler::new("bgbuiltin");
	t.send("dirmake sub");
	t.send("dir sub &");
	sleep_little();
	t.send("dirwhere");
	let out = t.finish();
	assert!(!out.stdout.trim_end().ends_with("/sub"));
}

#[test]
fn name_and_help() {
	let out = run("name", &["name", "name shelly", "name", "help"]);
	assert!(out.stdout.starts_with("mysh\nshelly\n"));
	assert!(out.stdout.contains("   dirmake - Create a directory.\n"));
	assert!(out.stdout.contains("     pipes - Create a pipeline.\n"));
}

#[test]
fn missing_arguments_are_usage_errors() {
	let out = run("usage", &["dirmake", "status", "linkhard a", "status"]);
	assert_eq!(out.stdout, format!("{0}\n{0}\n", libc::EINVAL));
	assert!(out.stderr.contains("usage: dirmake <path>"));
}

#[test]
fn dir_changes_and_caches_working_directory() {
	let out = run("dir", &["dirmake sub", "dir sub", "dirwhere", "dir missing", "status"]);
	let lines: Vec<&str> = out.stdout.lines().collect();
	assert!(lines[0].ends_with("/sub"));
	assert_eq!(lines[1], libc::ENOENT.to_string());
}

#[test]
fn links() {
	let out = run("links", &[
		"echo data >f",
		"linkhard f g",
		"linklist f",
		"linksoft f s",
		"linkread s",
		"rename g h",
		"unlink h",
		"unlink h",
		"status",
	]);
	let lines: Vec<&str> = out.stdout.lines().collect();
	let mut hard: Vec<&str> = lines[0].split_whitespace().collect();
	hard.sort();
	assert_eq!(hard, vec!["f", "g"]);
	assert_eq!(lines[1], "f");
	assert_eq!(lines[2], libc::ENOENT.to_string());
	assert!(!out.dir.join("h").exists());
	assert!(Path::new(&out.dir.join("s")).symlink_metadata().is_ok());
}

#[test]
fn too_many_tokens() {
	let line = format!("print {}", vec!["x"; 40].join(" "));
	let out = run("overflow", &[line.as_str(), "status"]);
	assert_eq!(out.stdout, format!("{}\n", libc::E2BIG));
}

#[test]
fn pid_and_ppid() {
	let out = run("pid", &["pid", "ppid"]);
	let lines: Vec<&str> = out.stdout.lines().collect();
	assert_eq!(lines.len(), 2);
	assert!(lines[0].parse::<u32>().is_ok());
	assert_eq!(lines[1], process::id().to_string());
}

#[test]
fn long_lines_are_truncated() {
	let line = format!("print {}", "y".repeat(400));
	let out = run("longline", &[line.as_str()]);
	assert_eq!(out.stdout.len(), 255 - "print ".len());
	assert!(str::from_utf8(out.stdout.as_bytes()).is_ok());
}
