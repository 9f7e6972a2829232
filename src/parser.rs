use std::fmt;
use std::path::PathBuf;

use crate::types::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
	Empty,
	MissingRedirectTarget,
	DuplicateRedirect,
	MissingStage,
	TooManyStages,
	RedirectWithPipeline,
	TrailingInput(char),
}

impl fmt::Display for ParseError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			ParseError::Empty => write!(f, "empty command"),
			ParseError::MissingRedirectTarget => write!(f, "missing output location after '>'"),
			ParseError::DuplicateRedirect => write!(f, "only one output redirect is supported"),
			ParseError::MissingStage => write!(f, "a pipe needs a command on both sides"),
			ParseError::TooManyStages => write!(f, "only two commands can be piped together"),
			ParseError::RedirectWithPipeline => write!(f, "redirects cannot be combined with a pipe"),
			ParseError::TrailingInput(c) => write!(f, "character after '&': '{}'", c),
		}
	}
}

type ParseResult<T> = Result<T, ParseError>;

struct Parser<'a> {
	line: &'a [u8],
	i: usize,
}

impl<'a> Parser<'a> {
	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(c) = self.line.get(self.i) {
			if !f(*c) { break; }
			self.i += 1;
		}
	}

	fn is_whitespace(c: u8) -> bool {
		matches!(c, b' ' | b'\t' | b'\n' | b'\r')
	}

	fn is_letter(c: u8) -> bool {
		match c {
			b'>' | b'&' | b'|' => false,
			_ => !Parser::is_whitespace(c),
		}
	}

	fn skip_whitespaces(&mut self) {
		self.proceed_while(Parser::is_whitespace);
	}

	fn read_word(&mut self) -> String {
		let orig = self.i;
		self.proceed_while(Parser::is_letter);
		String::from_utf8_lossy(&self.line[orig .. self.i]).into_owned()
	}

	fn parse_redirect(&mut self, redirect: &mut Option<PathBuf>) -> ParseResult<()> {
		self.skip_whitespaces();
		let target = self.read_word();
		if target.is_empty() {
			return Err(ParseError::MissingRedirectTarget);
		}
		if redirect.is_some() {
			return Err(ParseError::DuplicateRedirect);
		}
		*redirect = Some(PathBuf::from(target));
		Ok(())
	}

	fn parse_command(&mut self) -> ParseResult<Command> {
		let mut stages: Vec<Vec<String>> = vec![vec![]];
		let mut redirect: Option<PathBuf> = None;
		let mut background = false;

		loop {
			self.skip_whitespaces();
			match self.line.get(self.i) {
				None => { break; },
				Some(&b'&') => {
					self.i += 1;
					background = true;
					self.skip_whitespaces();
					if let Some(&c) = self.line.get(self.i) {
						return Err(ParseError::TrailingInput(c as char));
					}
					break;
				},
				Some(&b'>') => {
					self.i += 1;
					self.parse_redirect(&mut redirect)?;
				},
				Some(&b'|') => {
					self.i += 1;
					if stages.last().map_or(true, |s| s.is_empty()) {
						return Err(ParseError::MissingStage);
					}
					if stages.len() == 2 {
						return Err(ParseError::TooManyStages);
					}
					stages.push(vec![]);
				},
				Some(_) => {
					let word = self.read_word();
					if let Some(stage) = stages.last_mut() {
						stage.push(word);
					}
				},
			}
		}

		let pipeline = if stages.len() == 2 { stages.pop() } else { None };
		let argv = stages.pop().unwrap_or_default();
		if argv.is_empty() {
			return if pipeline.is_some() {
				Err(ParseError::MissingStage)
			} else {
				Err(ParseError::Empty)
			};
		}
		if pipeline.as_ref().map_or(false, |p| p.is_empty()) {
			return Err(ParseError::MissingStage);
		}
		if pipeline.is_some() && redirect.is_some() {
			return Err(ParseError::RedirectWithPipeline);
		}

		let mut command = Command::new(argv);
		command.background = background;
		command.redirect = redirect;
		command.pipeline = pipeline;
		Ok(command)
	}
}

pub fn parse(line: &[u8]) -> ParseResult<Command> {
	let mut parser = Parser { line: line, i: 0 };
	parser.parse_command()
}
