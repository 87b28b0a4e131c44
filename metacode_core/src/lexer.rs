use regex::Captures;
use regex::Regex;

use crate::MetacodeError;
use crate::MetacodeResult;
use crate::chunker::reduce;
use crate::tokens::Token;

/// Line-anchored markers recognised after the comment prefix.
const DIRECTIVES: &str = concat!(
	r"(^ #metacode)",
	r"|(^ #macro ([A-Za-z0-9_]{1,99})\(([A-Za-z0-9_, ]{0,99})\))",
	r"|(^ #table ([A-Za-z0-9_]{1,99}))",
	r"|(^ #metagen)",
	r"|(^ #metaend)",
	r"|(^   )",
);

/// The compiled patterns for one comment prefix.
#[derive(Debug, Clone)]
pub struct Lexer {
	lines: Regex,
	directives: Regex,
	start_line: Regex,
}

impl Lexer {
	pub fn new(comment_prefix: &str) -> MetacodeResult<Self> {
		let invalid = |reason: String| {
			MetacodeError::InvalidCommentPrefix {
				prefix: comment_prefix.to_string(),
				reason,
			}
		};
		if comment_prefix.is_empty() {
			return Err(invalid("the prefix is empty".to_string()));
		}
		if comment_prefix.contains(['\r', '\n']) {
			return Err(invalid("the prefix spans more than one line".to_string()));
		}

		let escaped = regex::escape(comment_prefix);
		let compile = |pattern: &str| Regex::new(pattern).map_err(|e| invalid(e.to_string()));

		Ok(Self {
			lines: compile(&format!(r"(?m)^({escaped})|(\r?\n)"))?,
			directives: compile(DIRECTIVES)?,
			start_line: compile(&format!(r"(?m)^{escaped} #metacode\r?\n"))?,
		})
	}

	/// Whether the document has a complete `#metacode` line at all.
	pub fn has_start_marker(&self, source: &str) -> bool {
		self.start_line.is_match(source)
	}

	/// Split a document into comment prefixes, line breaks, directive markers
	/// and text. Directive markers are only recognised at the start of the
	/// text that follows a comment prefix or a line break.
	pub fn tokenize(&self, source: &str) -> Vec<Token> {
		let tokens = reduce(
			source,
			&self.lines,
			|captures, _| {
				if let Some(prefix) = captures.get(1) {
					vec![Token::Comment(prefix.as_str().to_string())]
				} else {
					captures
						.get(2)
						.map(|line_break| Token::LineBreak(line_break.as_str().to_string()))
						.into_iter()
						.collect()
				}
			},
			|range| self.tokenize_segment(&source[range]),
		);

		tracing::trace!(count = tokens.len(), "lexed document");
		tokens
	}

	fn tokenize_segment(&self, segment: &str) -> Vec<Token> {
		reduce(
			segment,
			&self.directives,
			|captures, _| vec![directive(&captures)],
			|range| vec![Token::Text(segment[range].to_string())],
		)
	}
}

fn directive(captures: &Captures<'_>) -> Token {
	let text = |group: usize| captures.get(group).map(|m| m.as_str().to_string());

	if let Some(start) = text(1) {
		Token::Start(start)
	} else if let Some(source) = text(2) {
		Token::MacroHeader {
			name: text(3).unwrap_or_default(),
			params: text(4).unwrap_or_default(),
			source,
		}
	} else if let Some(source) = text(5) {
		Token::TableHeader {
			name: text(6).unwrap_or_default(),
			source,
		}
	} else if let Some(generate) = text(7) {
		Token::Generate(generate)
	} else if let Some(end) = text(8) {
		Token::End(end)
	} else if let Some(indent) = text(9) {
		Token::Indent(indent)
	} else {
		Token::Text(text(0).unwrap_or_default())
	}
}
