use crate::error::ShellError;
use crate::types::*;

pub const MAX_TOKENS: usize = 32;

pub type ParseResult<T> = Result<T, ShellError>;

struct Parser<'a> {
	line: &'a str,
	i: usize,
}

impl<'a> Parser<'a> {
	fn peek(&self) -> Option<u8> {
		self.line.as_bytes().get(self.i).cloned()
	}

	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(c) = self.peek() {
			if !f(c) { break; }
			self.i += 1;
		}
	}

	fn is_whitespace(c: u8) -> bool {
		c.is_ascii_whitespace()
	}

	fn skip_whitespaces(&mut self) {
		self.proceed_while(Parser::is_whitespace);
	}

	// A quote opens a segment only at the start of a token; elsewhere it is a literal.
	fn read_quoted(&mut self) -> &'a str {
		self.i += 1;
		let orig = self.i;
		self.proceed_while(|c| c != b'"');
		let token = &self.line[orig .. self.i];
		if self.peek().is_some() {
			self.i += 1;
		}
		token
	}

	fn read_word(&mut self) -> &'a str {
		let orig = self.i;
		self.proceed_while(|c| !Parser::is_whitespace(c));
		&self.line[orig .. self.i]
	}

	fn tokenize(&mut self) -> ParseResult<Vec<&'a str>> {
		let mut tokens: Vec<&'a str> = vec![];

		self.skip_whitespaces();
		if self.peek() == Some(b'#') {
			return Ok(tokens);
		}

		loop {
			self.skip_whitespaces();
			let token = match self.peek() {
				None => { break; },
				Some(b'"') => self.read_quoted(),
				Some(_) => self.read_word(),
			};
			if token.is_empty() {
				continue;
			}
			if tokens.len() == MAX_TOKENS {
				return Err(ShellError::TooManyTokens);
			}
			tokens.push(token);
		}
		Ok(tokens)
	}
}

/// Splits one line into tokens, honouring double-quoted segments. Blank lines and lines whose
/// first non-blank character is `#` produce no tokens.
pub fn tokenize(line: &str) -> ParseResult<Vec<&str>> {
	let mut parser = Parser { line: line, i: 0 };
	parser.tokenize()
}

// Either `>file` as one token, or a lone `>` followed by the file name.
fn strip_redirect<'a>(tokens: &mut Vec<&'a str>, marker: char, typ: RedirectType) -> Option<Redirect<'a>> {
	let len = tokens.len();
	match tokens.last() {
		Some(&last) if last.starts_with(marker) => {
			let target = &last[marker.len_utf8() ..];
			tokens.pop();
			Some(Redirect { target: target, typ: typ })
		},
		Some(&last) if len >= 3 && tokens[len - 2].len() == 1 && tokens[len - 2].starts_with(marker) => {
			tokens.truncate(len - 2);
			Some(Redirect { target: last, typ: typ })
		},
		_ => None,
	}
}

/// Tokenizes a line and strips its trailing markers, right to left: `&`, then `>file`, then
/// `<file`. Returns `None` when nothing is left to dispatch.
pub fn parse(line: &str) -> ParseResult<Option<Command<'_>>> {
	let mut tokens = tokenize(line)?;

	let is_background = match tokens.last() {
		Some(&last) if last.starts_with('&') => {
			tokens.pop();
			true
		},
		_ => false,
	};

	let mut redirects: Vec<Redirect> = vec![];
	if let Some(r) = strip_redirect(&mut tokens, '>', RedirectType::Output) {
		redirects.push(r);
	}
	if let Some(r) = strip_redirect(&mut tokens, '<', RedirectType::Input) {
		redirects.push(r);
	}

	if tokens.is_empty() {
		return Ok(None);
	}
	let name = tokens.remove(0);
	Ok(Some(Command { name: name, arguments: tokens, redirects: redirects, is_background: is_background }))
}
