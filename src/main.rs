mod builtin;
mod error;
mod eval;
mod fs;
mod global;
mod job;
mod parser;
mod pipeline;
mod redirect;
mod types;

use std::io::{self, BufRead, IsTerminal, Write};
use std::{process, str};

use clap::Parser;
use log::{debug, error, warn};

use global::State;
use pipeline::Pipeline;

/// Longest input line kept, in bytes; the remainder of a longer line is dropped. A character
/// straddling the limit is dropped whole.
const MAX_LINE: usize = 255;

#[derive(Parser)]
#[command(name = "mysh", version, about = "A small line-oriented command interpreter")]
struct Cli {
	/// Shell name shown in the prompt
	#[arg(short, long, default_value = global::DEFAULT_NAME)]
	name: String,

	/// Log dispatch, forks and reaped children
	#[arg(short, long)]
	verbose: bool,
}

fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
	let mut line: Vec<u8> = vec![];
	if input.read_until(b'\n', &mut line)? == 0 {
		return Ok(None);
	}
	if line.last() == Some(&b'\n') {
		line.pop();
	}
	if line.len() > MAX_LINE {
		line.truncate(MAX_LINE);
		if let Err(e) = str::from_utf8(&line) {
			if e.error_len().is_none() {
				line.truncate(e.valid_up_to());
			}
		}
	}
	Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

fn handle_line(state: &mut State, line: &str, stage: Option<&mut Pipeline>) {
	match parser::parse(line) {
		Ok(Some(command)) => {
			if command.is_background && stage.is_some() {
				warn!("ignoring '&' on pipeline stage {}", command.name);
			}
			eval::eval(state, &command, stage);
		},
		Ok(None) => {},
		Err(e) => {
			eprintln!("{}: {}", state.name, e);
			state.status = e.code();
		},
	}
}

fn run_stage(state: &mut State, pipeline: &mut Pipeline) {
	let line = pipeline.current().unwrap_or_default().to_string();
	debug!("stage {}/{}: {}", pipeline.cursor() + 1, pipeline.len(), line);
	if let Err(e) = pipeline.open_outgoing() {
		eprintln!("pipes: {}", e.desc());
		state.status = e as i32;
	}
	handle_line(state, &line, Some(pipeline));
}

fn run(state: &mut State) -> i32 {
	let stdin = io::stdin();
	let interactive = stdin.is_terminal();
	let mut input = stdin.lock();
	loop {
		state.reap();
		if let Some(mut pipeline) = state.pipeline.take() {
			run_stage(state, &mut pipeline);
			if pipeline.advance() {
				eval::finish_pipeline(state, pipeline);
			} else {
				state.pipeline = Some(pipeline);
			}
		} else {
			if interactive {
				let mut stdout = io::stdout();
				let _ = write!(stdout, "{}> ", state.name);
				let _ = stdout.flush();
			}
			let line = match read_line(&mut input) {
				Ok(Some(line)) => line,
				Ok(None) => break,
				Err(e) => {
					error!("reading input: {}", e);
					break;
				},
			};
			state.reap();
			handle_line(state, &line, None);
		}
		if let Some(code) = state.exit_request {
			return code;
		}
	}
	0
}

fn main() {
	let cli = Cli::parse();
	let level = if cli.verbose { "debug" } else { "warn" };
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

	let mut state = match State::new(&cli.name) {
		Ok(state) => state,
		Err(e) => {
			eprintln!("{}: {}", cli.name, e.desc());
			process::exit(1);
		},
	};
	let code = run(&mut state);
	let _ = io::stdout().flush();
	process::exit(code);
}
