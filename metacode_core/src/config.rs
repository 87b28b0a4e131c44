use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::CompileOptions;
use crate::LoopScope;
use crate::MetacodeError;
use crate::MetacodeResult;

/// Default maximum file size in bytes (10 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
	"metacode.toml",
	".metacode.toml",
	".config/metacode.toml",
];

/// Comment prefixes for well-known file extensions.
const BUILTIN_COMMENTS: &[(&str, &[&str])] = &[
	(
		"//",
		&[
			"c", "h", "cpp", "hpp", "cc", "cs", "rs", "js", "jsx", "ts", "tsx", "go", "java", "kt",
			"swift", "scala", "dart", "zig",
		],
	),
	(
		"#",
		&[
			"py", "rb", "sh", "bash", "zsh", "toml", "yaml", "yml", "pl", "r", "nim",
		],
	),
	("--", &["sql", "lua", "hs"]),
];

/// Configuration loaded from a `metacode.toml` file.
///
/// ```toml
/// comment = "//"
/// loop_scope = "per_level"
///
/// [comments]
/// glsl = "//"
/// m4 = "dnl"
///
/// [exclude]
/// patterns = ["vendor/", "*.generated.c"]
///
/// disable_gitignore = false
/// ```
#[derive(Debug, Deserialize)]
pub struct MetacodeConfig {
	/// Comment prefix for files whose extension has no entry in
	/// `[comments]` or the built-in table.
	#[serde(default = "default_comment")]
	pub comment: String,
	/// Extension (without the dot) to comment prefix.
	#[serde(default)]
	pub comments: HashMap<String, String>,
	#[serde(default)]
	pub loop_scope: LoopScope,
	#[serde(default)]
	pub exclude: ExcludeConfig,
	/// Files larger than this are skipped during directory walks.
	#[serde(default = "default_max_file_size")]
	pub max_file_size: u64,
	/// When true, `.gitignore` files are not used for filtering.
	#[serde(default)]
	pub disable_gitignore: bool,
}

/// Gitignore-style patterns for files and directories to skip, relative to
/// the project root. Supports negation (`!pattern`) and directory markers
/// (trailing `/`).
#[derive(Debug, Default, Deserialize)]
pub struct ExcludeConfig {
	#[serde(default)]
	pub patterns: Vec<String>,
}

fn default_comment() -> String {
	"//".to_string()
}

fn default_max_file_size() -> u64 {
	DEFAULT_MAX_FILE_SIZE
}

impl Default for MetacodeConfig {
	fn default() -> Self {
		Self {
			comment: default_comment(),
			comments: HashMap::new(),
			loop_scope: LoopScope::default(),
			exclude: ExcludeConfig::default(),
			max_file_size: DEFAULT_MAX_FILE_SIZE,
			disable_gitignore: false,
		}
	}
}

impl MetacodeConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if there is none.
	pub fn load(root: &Path) -> MetacodeResult<Option<MetacodeConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::parse(&content)?;
		tracing::debug!(path = %config_path.display(), "loaded config");

		Ok(Some(config))
	}

	pub fn parse(content: &str) -> MetacodeResult<MetacodeConfig> {
		toml::from_str(content).map_err(|e| MetacodeError::ConfigParse(e.to_string()))
	}

	/// The comment prefix configured for an extension, falling back to the
	/// built-in table. `None` when the extension is unknown.
	pub fn comment_for_extension(&self, extension: &str) -> Option<&str> {
		if let Some(prefix) = self.comments.get(extension) {
			return Some(prefix);
		}

		BUILTIN_COMMENTS
			.iter()
			.find(|(_, extensions)| extensions.contains(&extension))
			.map(|(prefix, _)| *prefix)
	}

	/// Whether a directory walk should pick up `path`.
	pub fn is_supported(&self, path: &Path) -> bool {
		path.extension()
			.and_then(|extension| extension.to_str())
			.is_some_and(|extension| self.comment_for_extension(extension).is_some())
	}

	/// The comment prefix for `path`: by extension, else the `comment` key.
	pub fn comment_prefix_for(&self, path: &Path) -> &str {
		path.extension()
			.and_then(|extension| extension.to_str())
			.and_then(|extension| self.comment_for_extension(extension))
			.unwrap_or(&self.comment)
	}

	pub fn compile_options_for(&self, path: &Path) -> CompileOptions {
		CompileOptions::new(self.comment_prefix_for(path)).with_loop_scope(self.loop_scope)
	}
}
