use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use metacode_core::LoopScope;
use metacode_core::Overrides;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Expand table-driven macros written in source comments into generated code.",
	long_about = "metacode expands macros declared inside ordinary line comments.\n\nA \
	              `#metacode` block declares `#macro` templates and `#table` data, invokes \
	              macros by name, and the expansion is written between the `#metagen` and \
	              `#metaend` lines that follow. Only the generated region is ever rewritten, so \
	              files can be recompiled any number of times.\n\nQuick start:\n  metacode \
	              compile src/      Expand every block under src/\n  metacode check           \
	              Fail when a generated region is stale\n  metacode inspect a.c     Show how a \
	              file is tokenized"
)]
pub struct MetacodeCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,

	/// Comment prefix the directive markers follow, e.g. `//` or `#`.
	/// Overrides the prefix chosen from the file extension and
	/// `metacode.toml`.
	#[arg(long, global = true)]
	pub comment: Option<String>,

	/// Where loop variables are bound while a macro expands.
	#[arg(long, global = true, value_enum)]
	pub loop_scope: Option<LoopScopeArg>,
}

impl MetacodeCli {
	/// The command line values that take precedence over `metacode.toml`.
	pub fn overrides(&self) -> Overrides {
		Overrides {
			comment_prefix: self.comment.clone(),
			loop_scope: self.loop_scope.map(Into::into),
		}
	}
}

#[derive(Subcommand)]
pub enum Commands {
	/// Expand every `#metacode` block and write the results back.
	///
	/// Each path may be a file or a directory. Directories are walked for
	/// files with a known comment prefix, honouring `.gitignore` and the
	/// `[exclude]` patterns from `metacode.toml`. Without paths the current
	/// directory is used.
	Compile {
		/// Files or directories to compile.
		paths: Vec<PathBuf>,

		/// Report which files would change without writing them.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// Recompile whenever a watched file changes.
		#[arg(long, default_value_t = false)]
		watch: bool,
	},
	/// Check that every generated region is up to date.
	///
	/// Exits with status 1 when at least one file would change. Ideal for CI
	/// pipelines.
	Check {
		/// Files or directories to check.
		paths: Vec<PathBuf>,

		/// Show a unified diff for each stale file.
		#[arg(long, default_value_t = false)]
		diff: bool,
	},
	/// Print the token stream of a file after lexing, validation and
	/// grouping.
	Inspect {
		/// The file to inspect.
		file: PathBuf,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LoopScopeArg {
	/// Loop variables live in the document scope and stay visible after
	/// the loop.
	Flattened,
	/// Each loop gets its own scope frame.
	PerLevel,
}

impl From<LoopScopeArg> for LoopScope {
	fn from(value: LoopScopeArg) -> Self {
		match value {
			LoopScopeArg::Flattened => Self::Flattened,
			LoopScopeArg::PerLevel => Self::PerLevel,
		}
	}
}
