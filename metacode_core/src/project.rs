use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;

use crate::CompileOptions;
use crate::Compilation;
use crate::LoopScope;
use crate::MetacodeError;
use crate::MetacodeResult;
use crate::compile;
use crate::config::CONFIG_FILE_CANDIDATES;
use crate::config::MetacodeConfig;

/// What compiling a file did, or would do, to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
	/// No `#metacode` line; the file is not a metacode document.
	Unchanged,
	/// Every generated region already matches its expansion.
	UpToDate,
	/// At least one generated region differs from its expansion.
	Updated,
}

/// The result of compiling a single file. Nothing is written until
/// [`FileOutcome::write`] is called.
#[derive(Debug, Clone)]
pub struct FileOutcome {
	pub path: PathBuf,
	pub status: FileStatus,
	/// The file content as read.
	pub original: String,
	/// The content the file should have.
	pub output: String,
}

impl FileOutcome {
	pub fn is_stale(&self) -> bool {
		self.status == FileStatus::Updated
	}

	/// Write the new content back when it differs from the original.
	pub fn write(&self) -> MetacodeResult<bool> {
		if !self.is_stale() {
			return Ok(false);
		}

		std::fs::write(&self.path, &self.output)?;
		tracing::debug!(path = %self.path.display(), "wrote compiled output");
		Ok(true)
	}
}

/// Read and compile one file.
pub fn compile_file(path: &Path, options: &CompileOptions) -> MetacodeResult<FileOutcome> {
	let original = std::fs::read_to_string(path)?;
	let compilation = compile(&original, options)?;
	let status = match &compilation {
		Compilation::Unchanged => FileStatus::Unchanged,
		rewritten if rewritten.is_changed(&original) => FileStatus::Updated,
		Compilation::Rewritten(_) => FileStatus::UpToDate,
	};
	let output = compilation.output(&original).to_string();

	Ok(FileOutcome {
		path: path.to_path_buf(),
		status,
		original,
		output,
	})
}

/// A directory tree plus the configuration found at its root.
#[derive(Debug)]
pub struct Project {
	pub root: PathBuf,
	pub config: MetacodeConfig,
}

impl Project {
	/// Load `metacode.toml` (or one of its alternatives) from `root`, using
	/// defaults when there is none.
	pub fn load(root: &Path) -> MetacodeResult<Self> {
		let config = MetacodeConfig::load(root)?.unwrap_or_default();

		Ok(Self {
			root: root.to_path_buf(),
			config,
		})
	}

	/// Expand the given paths into the files to compile. Files are taken as
	/// given; directories are walked for files with a known comment prefix.
	/// An empty list means the project root.
	pub fn files(&self, paths: &[PathBuf]) -> MetacodeResult<Vec<PathBuf>> {
		if paths.is_empty() {
			return self.collect_files(&self.root);
		}

		let mut files = Vec::new();
		for path in paths {
			if path.is_dir() {
				files.extend(self.collect_files(path)?);
			} else {
				files.push(path.clone());
			}
		}

		Ok(files)
	}

	/// Compile one file with the options its extension maps to. `overrides`
	/// replaces the configured values when set.
	pub fn compile(&self, path: &Path, overrides: &Overrides) -> MetacodeResult<FileOutcome> {
		let mut options = self.config.compile_options_for(path);
		if let Some(comment) = &overrides.comment_prefix {
			options.comment_prefix.clone_from(comment);
		}
		if let Some(loop_scope) = overrides.loop_scope {
			options.loop_scope = loop_scope;
		}

		compile_file(path, &options)
	}

	/// Collect every supported file under `dir`, honouring `.gitignore` and
	/// `[exclude]` patterns.
	pub fn collect_files(&self, dir: &Path) -> MetacodeResult<Vec<PathBuf>> {
		let gitignore = if self.config.disable_gitignore {
			Gitignore::empty()
		} else {
			build_gitignore(&self.root)
		};
		let exclude = build_exclude_matcher(&self.root, &self.config.exclude.patterns)?;
		let walker = Walker {
			config: &self.config,
			gitignore: &gitignore,
			exclude: &exclude,
		};

		let mut files = Vec::new();
		let mut visited = HashSet::new();
		walker.walk(dir, &mut files, &mut visited)?;
		files.sort();
		tracing::debug!(dir = %dir.display(), count = files.len(), "collected files");

		Ok(files)
	}
}

/// Command line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
	pub comment_prefix: Option<String>,
	pub loop_scope: Option<LoopScope>,
}

struct Walker<'a> {
	config: &'a MetacodeConfig,
	gitignore: &'a Gitignore,
	exclude: &'a Gitignore,
}

impl Walker<'_> {
	fn walk(
		&self,
		dir: &Path,
		files: &mut Vec<PathBuf>,
		visited: &mut HashSet<PathBuf>,
	) -> MetacodeResult<()> {
		let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
		if !visited.insert(canonical) {
			return Err(MetacodeError::SymlinkCycle {
				path: dir.display().to_string(),
			});
		}

		for entry in std::fs::read_dir(dir)? {
			let path = entry?.path();
			let is_dir = path.is_dir();

			if self.gitignore.matched(&path, is_dir).is_ignore()
				|| self.exclude.matched(&path, is_dir).is_ignore()
			{
				continue;
			}

			if is_dir {
				let skipped = path
					.file_name()
					.and_then(|name| name.to_str())
					.is_some_and(is_ignored_directory_name);
				// Nested projects are compiled with their own config.
				if skipped || has_project_config(&path) {
					continue;
				}
				self.walk(&path, files, visited)?;
			} else if self.config.is_supported(&path) && self.within_size_limit(&path) {
				files.push(path);
			}
		}

		Ok(())
	}

	fn within_size_limit(&self, path: &Path) -> bool {
		let within = std::fs::metadata(path)
			.map(|metadata| metadata.len() <= self.config.max_file_size)
			.unwrap_or(false);
		if !within {
			tracing::debug!(path = %path.display(), "skipping file over the size limit");
		}
		within
	}
}

fn build_exclude_matcher(root: &Path, patterns: &[String]) -> MetacodeResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder
			.add_line(None, pattern)
			.map_err(|e| {
				MetacodeError::InvalidExclude {
					pattern: pattern.clone(),
					reason: e.to_string(),
				}
			})?;
	}

	builder.build().map_err(|e| {
		MetacodeError::InvalidExclude {
			pattern: patterns.join(", "),
			reason: e.to_string(),
		}
	})
}

fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let gitignore_path = root.join(".gitignore");
	if gitignore_path.exists() {
		if let Some(error) = builder.add(&gitignore_path) {
			tracing::warn!(%error, "could not read .gitignore");
		}
	}

	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

fn is_ignored_directory_name(name: &str) -> bool {
	name.starts_with('.') || name == "node_modules" || name == "target"
}

fn has_project_config(dir: &Path) -> bool {
	CONFIG_FILE_CANDIDATES
		.iter()
		.any(|candidate| dir.join(candidate).is_file())
}
