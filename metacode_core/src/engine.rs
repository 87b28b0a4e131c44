use std::collections::HashMap;

use crate::MetacodeResult;
use crate::lexer::Lexer;
use crate::parser::parse;
use crate::table::parse_table;
use crate::tokens::Token;
use crate::vm::LoopScope;
use crate::vm::Macro;
use crate::vm::Scope;

/// Settings for a single compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
	/// The single-line comment prefix markers are anchored to, e.g. `//`.
	pub comment_prefix: String,
	pub loop_scope: LoopScope,
}

impl Default for CompileOptions {
	fn default() -> Self {
		Self {
			comment_prefix: "//".to_string(),
			loop_scope: LoopScope::default(),
		}
	}
}

impl CompileOptions {
	pub fn new(comment_prefix: impl Into<String>) -> Self {
		Self {
			comment_prefix: comment_prefix.into(),
			..Self::default()
		}
	}

	#[must_use]
	pub fn with_loop_scope(mut self, loop_scope: LoopScope) -> Self {
		self.loop_scope = loop_scope;
		self
	}
}

/// Result of compiling a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compilation {
	/// The document has no `#metacode` line and was not processed.
	Unchanged,
	/// The full document text with every generated region rewritten. This
	/// may be byte-identical to the input when the regions were already up
	/// to date.
	Rewritten(String),
}

impl Compilation {
	/// Whether writing this result back would change `original`.
	pub fn is_changed(&self, original: &str) -> bool {
		match self {
			Self::Unchanged => false,
			Self::Rewritten(output) => output != original,
		}
	}

	/// The text that should be on disk afterwards.
	pub fn output<'a>(&'a self, original: &'a str) -> &'a str {
		match self {
			Self::Unchanged => original,
			Self::Rewritten(output) => output,
		}
	}
}

/// Compile a document: expand every invocation into the generated region
/// that follows it. Documents without a `#metacode` line are left alone.
pub fn compile(source: &str, options: &CompileOptions) -> MetacodeResult<Compilation> {
	let lexer = Lexer::new(&options.comment_prefix)?;
	if !lexer.has_start_marker(source) {
		tracing::debug!("no #metacode line found");
		return Ok(Compilation::Unchanged);
	}

	let tokens = parse(&lexer, source)?;
	Ok(Compilation::Rewritten(compile_tokens(
		&tokens,
		options.loop_scope,
	)))
}

/// Lex, validate and group a document without compiling it.
pub fn parse_document(source: &str, comment_prefix: &str) -> MetacodeResult<Vec<Token>> {
	parse(&Lexer::new(comment_prefix)?, source)
}

/// Fold a grouped token stream into output text.
pub fn compile_tokens(tokens: &[Token], loop_scope: LoopScope) -> String {
	let mut compiler = Compiler::new(loop_scope);
	for token in tokens {
		compiler.step(token);
	}
	compiler.output
}

/// Split a call such as `ENUM(Color, COLORS)` into the macro name and its
/// positional arguments. Whitespace and `)` are discarded wherever they
/// appear, so a call may span several comment lines.
pub fn parse_call(text: &str) -> (String, Vec<String>) {
	let compact: String = text
		.chars()
		.filter(|ch| *ch != ')' && !ch.is_whitespace())
		.collect();
	let mut parts = compact.split(['(', ',']).map(ToString::to_string);
	let name = parts.next().unwrap_or_default();

	(name, parts.collect())
}

struct Compiler {
	macros: HashMap<String, Macro>,
	scope: Scope,
	loop_scope: LoopScope,
	/// Output of the most recent invocation. It is reused by every
	/// generated region until the next invocation replaces it.
	generated: String,
	output: String,
}

impl Compiler {
	fn new(loop_scope: LoopScope) -> Self {
		Self {
			macros: HashMap::new(),
			scope: Scope::new(),
			loop_scope,
			generated: String::new(),
			output: String::new(),
		}
	}

	fn step(&mut self, token: &Token) {
		match token {
			Token::MacroDefinition {
				name,
				params,
				body,
				source,
			} => {
				self.macros
					.insert(name.clone(), Macro::new(name.clone(), params.clone(), body));
				self.output.push_str(source);
			}
			Token::TableDefinition { name, body, source } => {
				self.scope.insert_table(name.clone(), parse_table(body));
				self.output.push_str(source);
			}
			Token::Invocation { call, source } => {
				self.generated = self.invoke(call);
				self.output.push_str(source);
			}
			Token::Output { open, close, .. } => {
				self.output.push_str(open);
				self.output.push_str(&self.generated);
				self.output.push_str(close);
			}
			other => self.output.push_str(&other.to_string()),
		}
	}

	fn invoke(&mut self, call: &str) -> String {
		let (name, args) = parse_call(call);
		let Some(definition) = self.macros.get(&name) else {
			tracing::warn!(macro_name = %name, "invocation of an undefined macro");
			return String::new();
		};

		tracing::debug!(macro_name = %name, ?args, "expanding macro");
		definition.render(&args, &mut self.scope, self.loop_scope)
	}
}
