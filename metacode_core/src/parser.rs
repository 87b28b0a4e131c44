use std::ops::Range;

use crate::MetacodeResult;
use crate::chunker::Pattern;
use crate::chunker::reduce;
use crate::lexer::Lexer;
use crate::tokens::Token;
use crate::tokens::source_of;
use crate::validator::validate;

/// Tokenize, validate and group a document.
pub fn parse(lexer: &Lexer, source: &str) -> MetacodeResult<Vec<Token>> {
	let tokens = lexer.tokenize(source);
	let tokens = validate(tokens)?;
	Ok(group(&tokens))
}

/// Fold declaration regions into macro, table and invocation tokens, then
/// collapse each generated region into a single [`Token::Output`].
pub fn group(tokens: &[Token]) -> Vec<Token> {
	let tokens = group_declarations(tokens);
	collapse_outputs(&tokens)
}

fn group_declarations(tokens: &[Token]) -> Vec<Token> {
	reduce(
		tokens,
		&DeclarationRegion,
		|(), range| {
			let region = &tokens[range];
			reduce(
				region,
				&DeclarationUnit,
				|unit, range| vec![unit.build(&region[range])],
				|range| region[range].to_vec(),
			)
		},
		|range| tokens[range].to_vec(),
	)
}

fn collapse_outputs(tokens: &[Token]) -> Vec<Token> {
	reduce(
		tokens,
		&OutputRegion,
		|close_at, range| {
			let open = source_of(&tokens[range.start..range.start + 3]);
			let body = source_of(&tokens[range.start + 3..close_at]);
			let close = source_of(&tokens[close_at..range.end]);
			vec![Token::Output { open, body, close }]
		},
		|range| tokens[range].to_vec(),
	)
}

/// A full comment line holding one marker: prefix, marker, line break.
fn marker_line(tokens: &[Token], at: usize, is_marker: impl Fn(&Token) -> bool) -> bool {
	matches!(
		tokens.get(at..),
		Some([Token::Comment(_), marker, Token::LineBreak(_), ..]) if is_marker(marker)
	)
}

/// A line belonging to a `#macro` or `#table` body: an indented comment
/// line or a blank comment line.
fn body_line(tokens: &[Token], at: usize) -> Option<usize> {
	match tokens.get(at..)? {
		[Token::Comment(_), Token::Indent(_), Token::Text(_), Token::LineBreak(_), ..] => Some(4),
		[Token::Comment(_), Token::Indent(_), Token::LineBreak(_), ..] => Some(3),
		[Token::Comment(_), Token::LineBreak(_), ..] => Some(2),
		_ => None,
	}
}

/// A plain comment line or a blank comment line.
fn invocation_line(tokens: &[Token], at: usize) -> Option<usize> {
	match tokens.get(at..)? {
		[Token::Comment(_), Token::Text(_), Token::LineBreak(_), ..] => Some(3),
		[Token::Comment(_), Token::LineBreak(_), ..] => Some(2),
		_ => None,
	}
}

/// Greedily consume one or more lines accepted by `line`.
fn repeated(tokens: &[Token], start: usize, line: fn(&[Token], usize) -> Option<usize>) -> Option<usize> {
	let mut end = start;
	while let Some(len) = line(tokens, end) {
		end += len;
	}

	(end > start).then_some(end)
}

/// Leftmost position at or after `start` where `at` matches.
fn leftmost<M>(
	tokens: &[Token],
	start: usize,
	at: impl Fn(usize) -> Option<(usize, M)>,
) -> Option<(Range<usize>, M)> {
	(start..tokens.len()).find_map(|position| at(position).map(|(end, found)| (position..end, found)))
}

/// `#metacode` line up to and including the first `#metagen` line after it.
struct DeclarationRegion;

impl Pattern<[Token]> for DeclarationRegion {
	type Match<'h> = ();

	fn find_at<'h>(&self, haystack: &'h [Token], start: usize) -> Option<(Range<usize>, ())> {
		let open = (start..haystack.len())
			.find(|&at| marker_line(haystack, at, |t| matches!(t, Token::Start(_))))?;
		let close = (open + 3..haystack.len())
			.find(|&at| marker_line(haystack, at, |t| matches!(t, Token::Generate(_))))?;

		Some((open..close + 3, ()))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
	Macro,
	Table,
	Invocation,
}

impl Unit {
	/// Build the aggregate token for the lines in `tokens`.
	fn build(self, tokens: &[Token]) -> Token {
		let source = source_of(tokens);

		match (self, tokens.get(1)) {
			(Self::Macro, Some(Token::MacroHeader { name, params, .. })) => {
				Token::MacroDefinition {
					name: name.clone(),
					params: split_params(params),
					body: body_text(tokens),
					source,
				}
			}
			(Self::Table, Some(Token::TableHeader { name, .. })) => {
				Token::TableDefinition {
					name: name.clone(),
					body: body_text(tokens),
					source,
				}
			}
			_ => {
				Token::Invocation {
					call: call_text(tokens),
					source,
				}
			}
		}
	}
}

/// Lines inside a declaration region: a `#macro` or `#table` header with
/// its body lines, or a run of invocation lines.
struct DeclarationUnit;

impl DeclarationUnit {
	fn match_at(tokens: &[Token], at: usize) -> Option<(usize, Unit)> {
		if marker_line(tokens, at, |t| matches!(t, Token::MacroHeader { .. })) {
			if let Some(end) = repeated(tokens, at + 3, body_line) {
				return Some((end, Unit::Macro));
			}
		}

		if marker_line(tokens, at, |t| matches!(t, Token::TableHeader { .. })) {
			if let Some(end) = repeated(tokens, at + 3, body_line) {
				return Some((end, Unit::Table));
			}
		}

		repeated(tokens, at, invocation_line).map(|end| (end, Unit::Invocation))
	}
}

impl Pattern<[Token]> for DeclarationUnit {
	type Match<'h> = Unit;

	fn find_at<'h>(&self, haystack: &'h [Token], start: usize) -> Option<(Range<usize>, Unit)> {
		leftmost(haystack, start, |at| Self::match_at(haystack, at))
	}
}

/// `#metagen` line up to and including the next `#metaend` marker and its
/// line break, when there is one. The match carries the index of the
/// closing comment prefix.
struct OutputRegion;

impl Pattern<[Token]> for OutputRegion {
	type Match<'h> = usize;

	fn find_at<'h>(&self, haystack: &'h [Token], start: usize) -> Option<(Range<usize>, usize)> {
		let open = (start..haystack.len())
			.find(|&at| marker_line(haystack, at, |t| matches!(t, Token::Generate(_))))?;
		let close = (open + 3..haystack.len()).find(|&at| {
			matches!(
				haystack.get(at..),
				Some([Token::Comment(_), Token::End(_), ..])
			)
		})?;
		let end = if matches!(haystack.get(close + 2), Some(Token::LineBreak(_))) {
			close + 3
		} else {
			close + 2
		};

		Some((open..end, close))
	}
}

/// Body text of a `#macro` / `#table` unit: the header line and the final
/// line break are excluded, comment prefixes and indents are dropped.
fn body_text(tokens: &[Token]) -> String {
	let end = tokens.len().saturating_sub(1);
	tokens
		.get(3..end)
		.unwrap_or_default()
		.iter()
		.filter_map(Token::body_text)
		.collect()
}

/// Invocation lines with the comment prefix and the single space after it
/// removed.
fn call_text(tokens: &[Token]) -> String {
	tokens
		.iter()
		.filter_map(|token| {
			match token {
				Token::LineBreak(text) => Some(text.as_str()),
				Token::Text(text) => Some(text.strip_prefix(' ').unwrap_or(text)),
				_ => None,
			}
		})
		.collect()
}

/// Positional parameter names, trimmed. An empty slot such as the middle
/// of `a,,b` is kept so later names still bind to their own argument.
fn split_params(params: &str) -> Vec<String> {
	if params.trim().is_empty() {
		return Vec::new();
	}

	params.split(',').map(|param| param.trim().to_string()).collect()
}
