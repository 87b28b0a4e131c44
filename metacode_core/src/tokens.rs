use std::fmt::Display;

use crate::chunker::Kind;

/// A token of the outer document. The first group is produced by the lexer;
/// the second group by the grouping passes that fold runs of lexer tokens
/// into declarations and generated regions. Every token keeps the exact
/// source text it covers, so printing the stream reproduces the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
	/// The comment prefix at the start of a line, e.g. `//`.
	Comment(String),
	/// `\n` or `\r\n`
	LineBreak(String),
	/// ` #metacode`
	Start(String),
	/// ` #macro NAME(params)`
	MacroHeader {
		name: String,
		params: String,
		source: String,
	},
	/// ` #table NAME`
	TableHeader { name: String, source: String },
	/// ` #metagen`
	Generate(String),
	/// ` #metaend`
	End(String),
	/// The separator space and two-space indent of a body line.
	Indent(String),
	/// Any other text.
	Text(String),
	/// A `#macro` header together with its body lines.
	MacroDefinition {
		name: String,
		params: Vec<String>,
		body: String,
		source: String,
	},
	/// A `#table` header together with its body lines.
	TableDefinition {
		name: String,
		body: String,
		source: String,
	},
	/// Comment lines calling a macro, e.g. `// ENUM(Color, COLORS)`.
	Invocation { call: String, source: String },
	/// A `#metagen` ... `#metaend` region.
	Output {
		open: String,
		body: String,
		close: String,
	},
}

impl Token {
	/// Text that contributes to a declaration body: line breaks and plain
	/// text.
	pub(crate) fn body_text(&self) -> Option<&str> {
		match self {
			Self::LineBreak(text) | Self::Text(text) => Some(text),
			_ => None,
		}
	}
}

impl Kind for Token {
	fn kind(&self) -> char {
		match self {
			Self::Comment(_) => 'C',
			Self::LineBreak(_) => 'R',
			Self::Start(_) => 'S',
			Self::MacroHeader { .. } => 'M',
			Self::TableHeader { .. } => 'T',
			Self::Generate(_) => 'G',
			Self::End(_) => 'E',
			Self::Indent(_) => '2',
			Self::Text(_) => 'X',
			Self::MacroDefinition { .. } => 'F',
			Self::TableDefinition { .. } => 'A',
			Self::Invocation { .. } => '0',
			Self::Output { .. } => 'Z',
		}
	}
}

impl Display for Token {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Comment(text)
			| Self::LineBreak(text)
			| Self::Start(text)
			| Self::Generate(text)
			| Self::End(text)
			| Self::Indent(text)
			| Self::Text(text)
			| Self::MacroHeader { source: text, .. }
			| Self::TableHeader { source: text, .. }
			| Self::MacroDefinition { source: text, .. }
			| Self::TableDefinition { source: text, .. }
			| Self::Invocation { source: text, .. } => write!(f, "{text}"),
			Self::Output { open, body, close } => write!(f, "{open}{body}{close}"),
		}
	}
}

/// Concatenate the source text of a run of tokens.
pub(crate) fn source_of(tokens: &[Token]) -> String {
	tokens.iter().map(ToString::to_string).collect()
}
