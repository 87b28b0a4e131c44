use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use metacode_cli::Commands;
use metacode_cli::MetacodeCli;
use metacode_core::FileOutcome;
use metacode_core::FileStatus;
use metacode_core::MetacodeError;
use metacode_core::Project;
use metacode_core::chunker::Kind;
use metacode_core::chunker::symbols;
use metacode_core::parse_document;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,dimmed) => {
		if color_enabled() {
			format!("{}", $text.dimmed())
		} else {
			format!("{}", $text)
		}
	};
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
	let args = MetacodeCli::parse();

	// Disable color when asked to or when stdout cannot show it.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stdout).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	let result = match &args.command {
		Some(Commands::Compile {
			paths,
			dry_run,
			watch,
		}) => run_compile(&args, paths, *dry_run, *watch),
		Some(Commands::Check { paths, diff }) => run_check(&args, paths, *diff),
		Some(Commands::Inspect { file }) => run_inspect(&args, file),
		None => {
			eprintln!("No subcommand specified. Run `metacode --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		report_error(e);
		process::exit(2);
	}
}

/// `RUST_LOG` wins; otherwise warnings, or debug output with `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_level = if verbose {
		"metacode=debug,metacode_core=debug"
	} else {
		"warn"
	};
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.without_time()
		.with_target(false)
		.init();
}

/// Render through miette when the error carries diagnostic codes and help.
fn report_error(error: Box<dyn std::error::Error>) {
	match error.downcast::<MetacodeError>() {
		Ok(metacode_error) => {
			let report: miette::Report = (*metacode_error).into();
			eprintln!("{report:?}");
		}
		Err(e) => {
			eprintln!("{} {e}", colored!("error:", red));
		}
	}
}

fn resolve_root() -> PathBuf {
	std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}

/// Compile every file, calling `visit` with each outcome. Files that fail
/// are reported and skipped so the remaining files still run.
fn for_each_outcome(
	args: &MetacodeCli,
	project: &Project,
	paths: &[PathBuf],
	mut visit: impl FnMut(&FileOutcome) -> CliResult<()>,
) -> CliResult<()> {
	let overrides = args.overrides();
	let mut failures = 0;

	for path in project.files(paths)? {
		match project.compile(&path, &overrides) {
			Ok(outcome) => visit(&outcome)?,
			Err(e) => {
				failures += 1;
				eprintln!(
					"{} {}",
					colored!("failed:", red),
					make_relative(&path, &project.root)
				);
				report_error(Box::new(e));
			}
		}
	}

	if failures > 0 {
		return Err(format!("{failures} file(s) could not be compiled").into());
	}

	Ok(())
}

fn run_compile(args: &MetacodeCli, paths: &[PathBuf], dry_run: bool, watch: bool) -> CliResult<()> {
	run_compile_once(args, paths, dry_run)?;

	if !watch || dry_run {
		return Ok(());
	}

	println!("\nWatching for file changes... (press Ctrl+C to stop)");

	let (tx, rx) = mpsc::channel();
	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				if matches!(
					event.kind,
					notify::EventKind::Modify(_) | notify::EventKind::Create(_)
				) {
					let _ = tx.send(());
				}
			}
		})?;

	use notify::Watcher;
	let watched = if paths.is_empty() {
		vec![resolve_root()]
	} else {
		paths.to_vec()
	};
	for path in &watched {
		tracing::debug!(path = %path.display(), "watching");
		watcher.watch(path, notify::RecursiveMode::Recursive)?;
	}

	loop {
		rx.recv()?;
		// Debounce: drain additional events within 200ms.
		while rx.recv_timeout(Duration::from_millis(200)).is_ok() {}

		println!("\nFile change detected, recompiling...");
		if let Err(e) = run_compile_once(args, paths, false) {
			report_error(e);
		}
	}
}

fn run_compile_once(args: &MetacodeCli, paths: &[PathBuf], dry_run: bool) -> CliResult<()> {
	let project = Project::load(&resolve_root())?;
	let mut updated = 0;
	let mut compiled = 0;

	for_each_outcome(args, &project, paths, |outcome| {
		let rel = make_relative(&outcome.path, &project.root);
		match outcome.status {
			FileStatus::Updated => {
				compiled += 1;
				updated += 1;
				if dry_run {
					println!("Would update {rel}");
				} else {
					outcome.write()?;
					println!("Compiled output injected into {rel}");
				}
			}
			FileStatus::UpToDate => {
				compiled += 1;
				if args.verbose {
					println!("{}", colored!(format!("Up to date: {rel}"), dimmed));
				}
			}
			FileStatus::Unchanged => {
				if args.verbose {
					println!(
						"{}",
						colored!(format!("No metacode block found in {rel}"), dimmed)
					);
				}
			}
		}

		Ok(())
	})?;

	if updated == 0 {
		println!(
			"{}",
			colored!(
				format!("All generated regions are up to date ({compiled} file(s))."),
				green
			)
		);
	} else if dry_run {
		println!("Dry run: {updated} of {compiled} file(s) would change.");
	} else {
		println!("Updated {updated} of {compiled} file(s).");
	}

	Ok(())
}

fn run_check(args: &MetacodeCli, paths: &[PathBuf], show_diff: bool) -> CliResult<()> {
	let project = Project::load(&resolve_root())?;
	let mut stale = 0;

	for_each_outcome(args, &project, paths, |outcome| {
		if outcome.is_stale() {
			stale += 1;
			let rel = make_relative(&outcome.path, &project.root);
			eprintln!("{} {rel}", colored!("stale:", yellow));
			if show_diff {
				print_diff(&outcome.original, &outcome.output);
			}
		}

		Ok(())
	})?;

	if stale > 0 {
		eprintln!(
			"\n{stale} file(s) out of date. Run `metacode compile` to update them."
		);
		process::exit(1);
	}

	println!("{}", colored!("All generated regions are up to date.", green));
	Ok(())
}

fn run_inspect(args: &MetacodeCli, file: &Path) -> CliResult<()> {
	let project = Project::load(&resolve_root())?;
	let prefix = args
		.comment
		.clone()
		.unwrap_or_else(|| project.config.comment_prefix_for(file).to_string());
	let source = std::fs::read_to_string(file)?;
	let tokens = parse_document(&source, &prefix)?;

	println!("comment prefix: {prefix:?}");
	println!("kinds: {}", symbols(&tokens));
	for (index, token) in tokens.iter().enumerate() {
		println!(
			"{index:>4} {} {:?}",
			colored!(token.kind(), yellow),
			token.to_string()
		);
	}

	Ok(())
}

fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
}
