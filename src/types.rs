#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectType { Input, Output }

#[derive(Debug, PartialEq, Eq)]
pub struct Redirect<'a> {
	pub target: &'a str,
	pub typ: RedirectType,
}

/// One tokenized input line with its trailing `&`, `>file` and `<file` markers stripped.
#[derive(Debug, PartialEq, Eq)]
pub struct Command<'a> {
	pub name: &'a str,
	pub arguments: Vec<&'a str>,
	pub redirects: Vec<Redirect<'a>>,
	pub is_background: bool,
}

impl<'a> Command<'a> {
	/// The name followed by the arguments, as handed to `execvp`.
	pub fn argv(&self) -> Vec<&'a str> {
		let mut argv = Vec::with_capacity(self.arguments.len() + 1);
		argv.push(self.name);
		argv.extend(self.arguments.iter().cloned());
		argv
	}
}
