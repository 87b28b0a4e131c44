use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum MetacodeError {
	#[error(transparent)]
	#[diagnostic(code(metacode::io_error))]
	Io(#[from] std::io::Error),

	/// The `#metacode` / `#metagen` / `#metaend` markers appear in an order
	/// the directive grammar does not allow.
	#[error("macro syntax error: {0}")]
	#[diagnostic(
		code(metacode::syntax),
		help(
			"every `#metacode` block must be followed by `#metagen`, and every `#metagen` by \
			 `#metaend`"
		)
	)]
	Syntax(String),

	#[error("invalid comment prefix `{prefix}`: {reason}")]
	#[diagnostic(
		code(metacode::invalid_comment_prefix),
		help("the comment prefix must be non-empty and fit on a single line, e.g. `//` or `#`")
	)]
	InvalidCommentPrefix { prefix: String, reason: String },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(metacode::config_parse),
		help("check that metacode.toml is valid TOML")
	)]
	ConfigParse(String),

	#[error("invalid exclude pattern `{pattern}`: {reason}")]
	#[diagnostic(code(metacode::invalid_exclude))]
	InvalidExclude { pattern: String, reason: String },

	#[error("symlink cycle detected at `{path}`")]
	#[diagnostic(
		code(metacode::symlink_cycle),
		help("exclude one of the linked directories in metacode.toml")
	)]
	SymlinkCycle { path: String },
}

pub type MetacodeResult<T> = Result<T, MetacodeError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
