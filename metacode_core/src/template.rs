//! Tokenizer for the handlebars-like macro body language.
//!
//! ```text
//! {{~#for i,row of table~}}
//! {{name}}_{{row.key}} = {{i}},
//! {{~/for~}}
//! ```
//!
//! `{{ }}` delimit a directive. A `~` directly inside either delimiter
//! removes the neighbouring whitespace run on that side.

use std::fmt::Display;
use std::ops::Range;
use std::sync::LazyLock;

use logos::Logos;
use regex::Captures;
use regex::Regex;

use crate::chunker::Haystack;
use crate::chunker::Kind;
use crate::chunker::Pattern;
use crate::chunker::reduce;
use crate::chunker::reduce_matches;

/// Which side(s) of a directive request whitespace trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trim {
	/// `{{~ ~}}`
	Both,
	/// `{{~ }}`
	Left,
	/// `{{ ~}}`
	Right,
	/// `{{ }}`
	None,
}

/// The surface form a `for` directive was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopForm {
	/// `#for key,value of table`
	Entry,
	/// `#for key in table`
	Key,
	/// `#for value of table`
	Value,
	/// `#for table`, the row is bound to `this`
	This,
}

/// Loop header: which names receive the row index and the row, and the
/// reference naming the table that is iterated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iteration {
	pub form: LoopForm,
	pub key: Option<String>,
	pub value: Option<String>,
	pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateToken {
	/// Literal text.
	Text(String),
	/// A run of spaces.
	Space(String),
	/// A run of tabs.
	Tab(String),
	/// A run of `\r` / `\n`.
	Newline(String),
	/// A directive before its content has been classified.
	Directive { trim: Trim, content: String },
	/// Start of a loop.
	Loop(Iteration),
	/// `/for`
	EndLoop,
	/// `object.member`
	Member { object: String, member: String },
	/// `#table`, the number of rows.
	Count(String),
	/// `name` or `$name`
	Var(String),
}

impl TemplateToken {
	/// Literal output of text and whitespace tokens.
	pub fn literal(&self) -> Option<&str> {
		match self {
			Self::Text(text) | Self::Space(text) | Self::Tab(text) | Self::Newline(text) => {
				Some(text)
			}
			_ => None,
		}
	}

	fn is_inline_space(&self) -> bool {
		matches!(self, Self::Space(_) | Self::Tab(_))
	}

	fn is_whitespace(&self) -> bool {
		matches!(self, Self::Space(_) | Self::Tab(_) | Self::Newline(_))
	}

	fn has_trim(&self, wanted: &[Trim]) -> bool {
		matches!(self, Self::Directive { trim, .. } if wanted.contains(trim))
	}
}

impl Kind for TemplateToken {
	fn kind(&self) -> char {
		match self {
			Self::Text(_) => 'X',
			Self::Space(_) => 'S',
			Self::Tab(_) => 'T',
			Self::Newline(_) => 'N',
			Self::Directive { trim, .. } => {
				match trim {
					Trim::Both => 'B',
					Trim::Left => 'L',
					Trim::Right => 'R',
					Trim::None => 'H',
				}
			}
			Self::Loop(iteration) => {
				match iteration.form {
					LoopForm::Entry => '2',
					LoopForm::Key => 'K',
					LoopForm::Value => 'V',
					LoopForm::This => '@',
				}
			}
			Self::EndLoop => 'E',
			Self::Member { .. } => '.',
			Self::Count(_) => '#',
			Self::Var(_) => '$',
		}
	}
}

impl Display for TemplateToken {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Text(text) | Self::Space(text) | Self::Tab(text) | Self::Newline(text) => {
				write!(f, "{text}")
			}
			Self::Directive { trim, content } => {
				let (open, close) = match trim {
					Trim::Both => ("{{~", "~}}"),
					Trim::Left => ("{{~", "}}"),
					Trim::Right => ("{{", "~}}"),
					Trim::None => ("{{", "}}"),
				};
				write!(f, "{open}{content}{close}")
			}
			Self::Loop(Iteration {
				form,
				key,
				value,
				table,
			}) => {
				let key = key.as_deref().unwrap_or_default();
				let value = value.as_deref().unwrap_or_default();
				match form {
					LoopForm::Entry => write!(f, "{{{{#for {key},{value} of {table}}}}}"),
					LoopForm::Key => write!(f, "{{{{#for {key} in {table}}}}}"),
					LoopForm::Value => write!(f, "{{{{#for {value} of {table}}}}}"),
					LoopForm::This => write!(f, "{{{{#for {table}}}}}"),
				}
			}
			Self::EndLoop => write!(f, "{{{{/for}}}}"),
			Self::Member { object, member } => write!(f, "{{{{{object}.{member}}}}}"),
			Self::Count(table) => write!(f, "{{{{#{table}}}}}"),
			Self::Var(name) => write!(f, "{{{{{name}}}}}"),
		}
	}
}

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(concat!(
		r"\{\{~([^}\r\n]*?)~\}\}",
		r"|\{\{~([^}\r\n]*?)\}\}",
		r"|\{\{([^}\r\n]*?)~\}\}",
		r"|\{\{([^}\r\n]*?)\}\}",
	))
	.unwrap_or_else(|e| unreachable!("directive pattern is valid: {e}"))
});

static DIRECTIVE_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(concat!(
		r"(#?for (\w+),(\w+) of (\w+))",
		r"|(#?for (\w+) in (\w+))",
		r"|(#?for (\w+) of (\w+))",
		r"|#?for (\w+)",
		r"|(/for)",
		r"|((\w+)\.(\w+))",
		r"|#(\w+)",
		r"|\$?(\w+)",
	))
	.unwrap_or_else(|e| unreachable!("directive grammar is valid: {e}"))
});

/// Whitespace runs inside literal text.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum WhitespaceRun {
	#[regex(" +")]
	Spaces,
	#[regex("\t+")]
	Tabs,
	#[regex("[\r\n]+")]
	Newlines,
}

/// Finds whitespace runs with the [`WhitespaceRun`] lexer.
struct WhitespaceRuns;

impl Pattern<str> for WhitespaceRuns {
	type Match<'h> = WhitespaceRun;

	fn find_at<'h>(&self, haystack: &'h str, start: usize) -> Option<(Range<usize>, WhitespaceRun)> {
		let rest = haystack.get(start..)?;
		WhitespaceRun::lexer(rest)
			.spanned()
			.find_map(|(run, span)| run.ok().map(|run| (start + span.start..start + span.end, run)))
	}
}

/// How a trim match rewrites the tokens it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrimAction {
	/// Whitespace, `{{~ ~}}`, whitespace: drop both whitespace runs.
	Full,
	/// `{{~ ~}}` or `{{ ~}}`, whitespace: drop the trailing run.
	Right,
	/// Whitespace, `{{~ ~}}` or `{{~ }}`: drop the leading run.
	Left,
}

/// Automaton over the token stream for the three trim rules. Alternatives
/// are tried in order at each position and the leftmost position wins.
struct TrimRules;

impl TrimRules {
	fn match_at(tokens: &[TemplateToken], at: usize) -> Option<(usize, TrimAction)> {
		let first = tokens.get(at)?;
		let second = tokens.get(at + 1);
		let third = tokens.get(at + 2);

		if first.is_inline_space()
			&& second.is_some_and(|t| t.has_trim(&[Trim::Both]))
			&& third.is_some_and(TemplateToken::is_whitespace)
		{
			return Some((3, TrimAction::Full));
		}

		if first.has_trim(&[Trim::Both, Trim::Right])
			&& second.is_some_and(TemplateToken::is_whitespace)
		{
			return Some((2, TrimAction::Right));
		}

		if first.is_inline_space() && second.is_some_and(|t| t.has_trim(&[Trim::Both, Trim::Left]))
		{
			return Some((2, TrimAction::Left));
		}

		None
	}
}

impl Pattern<[TemplateToken]> for TrimRules {
	type Match<'h> = TrimAction;

	fn find_at<'h>(
		&self,
		haystack: &'h [TemplateToken],
		start: usize,
	) -> Option<(Range<usize>, TrimAction)> {
		let mut at = start;
		while at < haystack.extent() {
			if let Some((len, action)) = Self::match_at(haystack, at) {
				return Some((at..at + len, action));
			}
			at = haystack.step(at);
		}

		None
	}
}

/// Tokenize a macro body into the flat token stream the interpreter runs.
pub fn parse_template(source: &str) -> Vec<TemplateToken> {
	let tokens = split_directives(source);
	let tokens = split_whitespace(tokens);
	let tokens = trim_whitespace(&tokens);
	let tokens = classify_directives(tokens);
	tracing::trace!(count = tokens.len(), "tokenized template");
	tokens
}

/// First pass: directives versus literal text.
fn split_directives(source: &str) -> Vec<TemplateToken> {
	reduce(
		source,
		&*DIRECTIVE,
		|captures, _| {
			let (trim, group) = [Trim::Both, Trim::Left, Trim::Right, Trim::None]
				.into_iter()
				.zip(1..)
				.find(|(_, group)| captures.get(*group).is_some())
				.unwrap_or((Trim::None, 4));
			let content = captures
				.get(group)
				.map_or_else(String::new, |m| m.as_str().to_string());
			vec![TemplateToken::Directive { trim, content }]
		},
		|range| vec![TemplateToken::Text(source[range].to_string())],
	)
}

/// Second pass: split literal text into whitespace runs and residual text.
fn split_whitespace(tokens: Vec<TemplateToken>) -> Vec<TemplateToken> {
	tokens
		.into_iter()
		.flat_map(|token| {
			let text = match token {
				TemplateToken::Text(text) => text,
				other => return vec![other],
			};

			reduce(
				text.as_str(),
				&WhitespaceRuns,
				|run, range| {
					let run_text = text[range].to_string();
					vec![match run {
						WhitespaceRun::Spaces => TemplateToken::Space(run_text),
						WhitespaceRun::Tabs => TemplateToken::Tab(run_text),
						WhitespaceRun::Newlines => TemplateToken::Newline(run_text),
					}]
				},
				|range| vec![TemplateToken::Text(text[range].to_string())],
			)
		})
		.collect()
}

/// Third pass: drop the whitespace runs that trimming directives ask for.
fn trim_whitespace(tokens: &[TemplateToken]) -> Vec<TemplateToken> {
	reduce(
		tokens,
		&TrimRules,
		|action, range| {
			let kept = match action {
				TrimAction::Full => range.start + 1..range.end - 1,
				TrimAction::Right => range.start..range.end - 1,
				TrimAction::Left => range.start + 1..range.end,
			};
			tokens[kept].to_vec()
		},
		|range| tokens[range].to_vec(),
	)
}

/// Final pass: classify each directive against the directive grammar. Only
/// the first match is kept; content that matches nothing is dropped.
fn classify_directives(tokens: Vec<TemplateToken>) -> Vec<TemplateToken> {
	tokens
		.into_iter()
		.filter_map(|token| {
			let content = match token {
				TemplateToken::Directive { content, .. } => content,
				other => return Some(other),
			};

			let classified = reduce_matches(content.as_str(), &*DIRECTIVE_GRAMMAR, |captures, _| {
				classify(&captures).into_iter().collect()
			})
			.into_iter()
			.next();

			if classified.is_none() {
				tracing::debug!(directive = %content, "dropping unrecognized directive");
			}

			classified
		})
		.collect()
}

fn classify(captures: &Captures<'_>) -> Option<TemplateToken> {
	let text = |group: usize| captures.get(group).map(|m| m.as_str().to_string());
	let iteration = |form, key, value, table: Option<String>| {
		table.map(|table| {
			TemplateToken::Loop(Iteration {
				form,
				key,
				value,
				table,
			})
		})
	};

	if captures.get(1).is_some() {
		iteration(LoopForm::Entry, text(2), text(3), text(4))
	} else if captures.get(5).is_some() {
		iteration(LoopForm::Key, text(6), None, text(7))
	} else if captures.get(8).is_some() {
		iteration(LoopForm::Value, None, text(9), text(10))
	} else if captures.get(11).is_some() {
		iteration(LoopForm::This, None, Some("this".to_string()), text(11))
	} else if captures.get(12).is_some() {
		Some(TemplateToken::EndLoop)
	} else if captures.get(13).is_some() {
		Some(TemplateToken::Member {
			object: text(14)?,
			member: text(15)?,
		})
	} else if let Some(table) = text(16) {
		Some(TemplateToken::Count(table))
	} else {
		text(17).map(TemplateToken::Var)
	}
}
