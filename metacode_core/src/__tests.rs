use std::path::Path;

use rstest::rstest;
use similar_asserts::assert_eq;
use tracing_test::traced_test;

use super::__fixtures::*;
use super::*;
use crate::chunker::symbols;
use crate::tokens::source_of;
use crate::vm::LoopTree;

fn render(body: &str, params: &[&str], args: &[&str], scope: &mut Scope, policy: LoopScope) -> String {
	let params = params.iter().map(ToString::to_string).collect();
	let args: Vec<String> = args.iter().map(ToString::to_string).collect();
	Macro::new("TEST", params, body).render(&args, scope, policy)
}

fn numbers_scope() -> Scope {
	let mut scope = Scope::new();
	scope.insert_table("T", numbers_table());
	scope.insert_table("U", letters_table());
	scope
}

#[rstest]
#[case::plain_code("int main(void) { return 0; }\n", "XR")]
#[case::comment_line("// hello\n", "CXR")]
#[case::blank_comment("//\n", "CR")]
#[case::start("// #metacode\n", "CSR")]
#[case::start_with_suffix("// #metacodes\n", "CSXR")]
#[case::macro_header("// #macro A(x, y)\n", "CMR")]
#[case::table_header("// #table COLORS\n", "CTR")]
#[case::indented_body("//   {{x}}\n", "C2XR")]
#[case::generate_and_end("// #metagen\n// #metaend", "CGRCE")]
#[case::prefix_not_at_line_start("x = 1; // #metacode\n", "XR")]
#[case::crlf("// a\r\n// b\r\n", "CXRCXR")]
fn lexer_kinds(#[case] input: &str, #[case] expected: &str) -> MetacodeResult<()> {
	let tokens = Lexer::new("//")?.tokenize(input);
	assert_eq!(symbols(&tokens), expected);
	assert_eq!(source_of(&tokens), input);

	Ok(())
}

#[test]
fn lexer_reads_macro_header_fields() -> MetacodeResult<()> {
	let tokens = Lexer::new("//")?.tokenize("// #macro ENUM(name, t)\n");
	assert_eq!(
		tokens.get(1),
		Some(&Token::MacroHeader {
			name: "ENUM".to_string(),
			params: "name, t".to_string(),
			source: " #macro ENUM(name, t)".to_string(),
		})
	);

	Ok(())
}

#[rstest]
#[case::hash("#")]
#[case::dashes("--")]
#[case::regex_metacharacters("/*+")]
fn lexer_escapes_comment_prefix(#[case] prefix: &str) -> MetacodeResult<()> {
	let input = format!("{prefix} #metacode\n{prefix}   body\nplain\n");
	let tokens = Lexer::new(prefix)?.tokenize(&input);
	assert_eq!(symbols(&tokens), "CSRC2XRXR");

	Ok(())
}

#[rstest]
#[case::empty("", "the prefix is empty")]
#[case::multi_line("//\n", "the prefix spans more than one line")]
fn lexer_rejects_unusable_prefix(#[case] prefix: &str, #[case] reason: &str) {
	let result = Lexer::new(prefix);
	assert!(
		matches!(
			&result,
			Err(MetacodeError::InvalidCommentPrefix { prefix: found, reason: why })
				if found == prefix && why == reason
		),
		"{result:?}"
	);
}

#[test]
fn invalid_comment_prefix_message_names_the_prefix() {
	let error = MetacodeError::InvalidCommentPrefix {
		prefix: String::new(),
		reason: "the prefix is empty".to_string(),
	};
	assert_eq!(
		error.to_string(),
		"invalid comment prefix ``: the prefix is empty"
	);
}

#[rstest]
#[case::generate_without_start(
	"// #metagen\n// #metaend\n",
	"all #metagen should be preceded by #metacode"
)]
#[case::end_without_anything("int x;\n// #metaend\n", "all #metaend should be preceded by #metagen and #metacode")]
#[case::end_without_generate(
	"// #metacode\n// #metaend\n",
	"all #metaend should be preceded by #metagen"
)]
#[case::start_inside_generated(
	"// #metacode\n// #metagen\n// #metacode\n",
	"all #metagen should be followed by #metaend"
)]
#[case::generate_inside_generated(
	"// #metacode\n// #metagen\n// #metagen\n",
	"all #metagen should be followed by #metaend"
)]
fn validator_rejects_out_of_order_markers(#[case] input: &str, #[case] message: &str) {
	let result = parse_document(input, "//");
	assert!(
		matches!(&result, Err(MetacodeError::Syntax(found)) if found == message),
		"{result:?}"
	);
}

#[rstest]
#[case::repeated_start("// #metacode\n// #metacode\n// #metagen\n// #metaend\n")]
#[case::two_blocks("// #metacode\n// #metagen\n// #metaend\n// #metacode\n// #metagen\n// #metaend\n")]
#[case::unterminated_output("// #metacode\n// #metagen\nstale\n")]
fn validator_accepts_well_ordered_markers(#[case] input: &str) -> MetacodeResult<()> {
	let tokens = parse_document(input, "//")?;
	assert_eq!(source_of(&tokens), input);

	Ok(())
}

#[test]
fn syntax_error_message_names_the_pairing() {
	let error = MetacodeError::Syntax("all #metagen should be followed by #metaend".to_string());
	assert_eq!(
		error.to_string(),
		"macro syntax error: all #metagen should be followed by #metaend"
	);
}

#[test]
fn compile_fails_without_output_on_syntax_error() {
	let result = compile(
		"// #metacode\n// #metaend\nint x;\n",
		&CompileOptions::default(),
	);
	assert!(matches!(result, Err(MetacodeError::Syntax(_))), "{result:?}");
}

#[test]
fn grouping_folds_declarations_and_output() -> MetacodeResult<()> {
	let input = "// #metacode\n// #table T\n//   k |\n//   a |\n// #macro M(x, , y )\n//   \
	             {{x}}\n//\n// M(1)\n// #metagen\nold\n// #metaend\n";
	let tokens = parse_document(input, "//")?;

	assert_eq!(symbols(&tokens), "CSRAF0Z");
	assert_eq!(source_of(&tokens), input);
	assert_eq!(
		tokens[3],
		Token::TableDefinition {
			name: "T".to_string(),
			body: "k |\na |".to_string(),
			source: "// #table T\n//   k |\n//   a |\n".to_string(),
		}
	);
	assert_eq!(
		tokens[4],
		Token::MacroDefinition {
			name: "M".to_string(),
			params: vec!["x".to_string(), String::new(), "y".to_string()],
			body: "{{x}}\n".to_string(),
			source: "// #macro M(x, , y )\n//   {{x}}\n//\n".to_string(),
		}
	);
	assert_eq!(
		tokens[5],
		Token::Invocation {
			call: "M(1)\n".to_string(),
			source: "// M(1)\n".to_string(),
		}
	);
	assert_eq!(
		tokens[6],
		Token::Output {
			open: "// #metagen\n".to_string(),
			body: "old\n".to_string(),
			close: "// #metaend\n".to_string(),
		}
	);

	Ok(())
}

#[test]
fn grouping_joins_multi_line_invocations() -> MetacodeResult<()> {
	let input = "// #metacode\n// ENUM(\n// Color,\n// COLORS)\n// #metagen\n// #metaend";
	let tokens = parse_document(input, "//")?;

	assert_eq!(symbols(&tokens), "CSR0Z");
	assert_eq!(
		tokens[3],
		Token::Invocation {
			call: "ENUM(\nColor,\nCOLORS)\n".to_string(),
			source: "// ENUM(\n// Color,\n// COLORS)\n".to_string(),
		}
	);
	assert_eq!(parse_call("ENUM(\nColor,\nCOLORS)\n").1, vec!["Color", "COLORS"]);

	Ok(())
}

#[test]
fn grouping_accepts_indent_only_body_lines() -> MetacodeResult<()> {
	let input = "// #metacode\n// #macro M()\n//   a\n//   \n//   b\n//\n// M()\n// #metagen\n// #metaend\n";
	let tokens = parse_document(input, "//")?;

	assert_eq!(symbols(&tokens), "CSRF0Z");
	assert_eq!(
		tokens[3],
		Token::MacroDefinition {
			name: "M".to_string(),
			params: vec![],
			body: "a\n\nb\n".to_string(),
			source: "// #macro M()\n//   a\n//   \n//   b\n//\n".to_string(),
		}
	);

	let compilation = compile(input, &CompileOptions::default())?;
	assert!(
		compilation
			.output(input)
			.ends_with("// #metagen\na\n\nb\n// #metaend\n")
	);

	Ok(())
}

#[test]
fn grouping_leaves_text_outside_regions_alone() -> MetacodeResult<()> {
	let input = "// intro\n#include <x.h>\n// #metacode\n// #metagen\n// #metaend\nint y;\n";
	let tokens = parse_document(input, "//")?;

	assert_eq!(symbols(&tokens), "CXRXRCSRZXR");
	assert_eq!(source_of(&tokens), input);

	Ok(())
}

#[rstest]
#[case::two_args("ENUM(Color, COLORS)", "ENUM", &["Color", "COLORS"])]
#[case::no_parens("RUN", "RUN", &[])]
#[case::empty_parens("RUN()", "RUN", &[""])]
#[case::spaces_everywhere(" F ( a ,b ) \n", "F", &["a", "b"])]
fn parse_call_is_permissive(#[case] input: &str, #[case] name: &str, #[case] args: &[&str]) {
	let (found_name, found_args) = parse_call(input);
	assert_eq!(found_name, name);
	assert_eq!(found_args, args);
}

#[rstest]
#[case::plain("int main(void) { return 0; }\n")]
#[case::comments_only("// #macro A(x)\n//   {{x}}\n")]
#[case::marker_without_line_break("// #metacode")]
#[case::empty("")]
fn documents_without_start_marker_are_unchanged(#[case] input: &str) -> MetacodeResult<()> {
	let compilation = compile(input, &CompileOptions::default())?;
	assert_eq!(compilation, Compilation::Unchanged);
	assert_eq!(compilation.output(input), input);
	assert!(!compilation.is_changed(input));

	Ok(())
}

#[test]
fn compile_expands_invocation_into_generated_region() -> MetacodeResult<()> {
	let input = greeting_document();
	let compilation = compile(input, &CompileOptions::default())?;

	assert!(compilation.is_changed(input));
	assert_eq!(
		compilation.output(input),
		"// #metacode\n// #macro GREET(who)\n//   hello {{who}}\n//\n// GREET(world)\n// \
		 #metagen\nhello world\n// #metaend\n"
	);

	Ok(())
}

#[test]
fn compile_cat_breeds() -> MetacodeResult<()> {
	let input = cat_breeds_document();
	let compilation = compile(input, &CompileOptions::default())?;

	insta::assert_snapshot!("cat_breed_enum", compilation.output(input));

	Ok(())
}

#[rstest]
#[case::greeting(greeting_document())]
#[case::cat_breeds(cat_breeds_document())]
fn compile_is_idempotent(#[case] input: &str) -> MetacodeResult<()> {
	let options = CompileOptions::default();
	let once = compile(input, &options)?;
	let once = once.output(input);
	let twice = compile(once, &options)?;

	assert_eq!(twice.output(once), once);
	assert!(!twice.is_changed(once));

	Ok(())
}

#[test]
fn compile_preserves_crlf_line_endings() -> MetacodeResult<()> {
	let input = "// #metacode\r\n// #macro A()\r\n//   x\r\n//\r\n// A()\r\n// #metagen\r\n// \
	             #metaend\r\n";
	let compilation = compile(input, &CompileOptions::default())?;

	assert!(
		compilation
			.output(input)
			.ends_with("// #metagen\r\nx\r\n// #metaend\r\n")
	);

	Ok(())
}

#[test]
fn compile_uses_configured_comment_prefix() -> MetacodeResult<()> {
	let input = "# #metacode\n# #macro SAY(x)\n#   print({{x}})\n#\n# SAY(1)\n# #metagen\n# #metaend\n";
	let compilation = compile(input, &CompileOptions::new("#"))?;

	assert!(
		compilation
			.output(input)
			.ends_with("# #metagen\nprint(1)\n# #metaend\n")
	);

	Ok(())
}

#[test]
#[traced_test]
fn undefined_macro_empties_generated_region() -> MetacodeResult<()> {
	let input = "// #metacode\n// NOPE(1)\n// #metagen\nold\n// #metaend\n";
	let compilation = compile(input, &CompileOptions::default())?;

	assert_eq!(
		compilation.output(input),
		"// #metacode\n// NOPE(1)\n// #metagen\n// #metaend\n"
	);
	assert!(logs_contain("invocation of an undefined macro"));

	Ok(())
}

#[test]
fn empty_parameter_slot_keeps_positions() -> MetacodeResult<()> {
	let input = "// #metacode\n// #macro M(a,,b)\n//   {{a}}{{b}}\n// M(1,2,3)\n// #metagen\n// #metaend\n";
	let compilation = compile(input, &CompileOptions::default())?;

	assert!(
		compilation
			.output(input)
			.ends_with("// #metagen\n13// #metaend\n")
	);

	Ok(())
}

#[test]
fn output_without_invocation_is_emptied() -> MetacodeResult<()> {
	let input = "// #metacode\n// #metagen\nold\n// #metaend\n";
	let compilation = compile(input, &CompileOptions::default())?;

	assert_eq!(
		compilation.output(input),
		"// #metacode\n// #metagen\n// #metaend\n"
	);

	Ok(())
}

#[test]
fn output_without_end_marker_is_kept() -> MetacodeResult<()> {
	let input = "// #metacode\n// #macro A()\n//   new\n// A()\n// #metagen\nold\n";
	let compilation = compile(input, &CompileOptions::default())?;

	assert_eq!(compilation, Compilation::Rewritten(input.to_string()));

	Ok(())
}

#[test]
fn latest_invocation_feeds_every_following_region() -> MetacodeResult<()> {
	let input = "// #metacode\n// #macro A(x)\n//   {{x}}\n// A(1)\n// #metagen\n// #metaend\n// \
	             #metacode\n// #metagen\n// #metaend\n";
	let compilation = compile(input, &CompileOptions::default())?;

	assert_eq!(
		compilation.output(input),
		"// #metacode\n// #macro A(x)\n//   {{x}}\n// A(1)\n// #metagen\n1// #metaend\n// \
		 #metacode\n// #metagen\n1// #metaend\n"
	);

	Ok(())
}

#[test]
fn tables_are_shared_between_blocks() -> MetacodeResult<()> {
	let input = "// #metacode\n// #table T\n//   x |\n//   7 |\n// #metagen\n// #metaend\n// \
	             #metacode\n// #macro N()\n//   {{#T}}\n// N()\n// #metagen\n// #metaend\n";
	let compilation = compile(input, &CompileOptions::default())?;

	assert!(
		compilation
			.output(input)
			.ends_with("// N()\n// #metagen\n1// #metaend\n")
	);

	Ok(())
}

#[test]
fn count_of_table() {
	let mut scope = numbers_scope();
	let output = render("{{#T}}", &[], &[], &mut scope, LoopScope::Flattened);
	assert_eq!(output, "3");
}

#[rstest]
#[case::value_of("{{for row of T}}{{row.x}}{{/for}}", "123")]
#[case::hash_value_of("{{#for row of T}}{{row.x}}{{/for}}", "123")]
#[case::this("{{#for T}}{{this.x}}{{/for}}", "123")]
#[case::key_in("{{#for i in T}}{{i}}{{/for}}", "012")]
#[case::key_value("{{#for i,row of T}}{{i}}={{row.x}};{{/for}}", "0=1;1=2;2=3;")]
#[case::text_around_loop("[{{#for r of T}}{{r.x}}{{/for}}]", "[123]")]
#[case::trimmed_lines("{\n  {{~#for r of T~}}\n  {{r.x}},\n  {{~/for~}}\n}", "{\n  1,\n  2,\n  3,\n}")]
#[case::nested_runs_after_parent("{{#for a of T}}<{{a.x}}>{{#for b of U}}{{b.y}}{{/for}}{{/for}}", "<1><2><3>ab")]
#[case::empty_table_loop("{{#for r of MISSING}}x{{/for}}y", "y")]
#[case::stray_end("a{{/for}}b", "ab")]
fn loops(#[case] body: &str, #[case] expected: &str) {
	let mut scope = numbers_scope();
	let output = render(body, &[], &[], &mut scope, LoopScope::Flattened);
	assert_eq!(output, expected);
}

#[rstest]
#[case::unknown_var("a{{missing}}b", "ab")]
#[case::unknown_member("a{{missing.x}}b", "ab")]
#[case::member_of_text("a{{name.x}}b", "ab")]
#[case::unknown_count("a{{#missing}}b", "ab")]
#[case::table_as_value("a{{T}}b", "ab")]
#[case::unknown_cell("{{#for r of T}}{{r.nope}}{{/for}}.", ".")]
#[case::unrecognized_directive("a{{!!}}b", "ab")]
fn unresolved_names_render_empty(#[case] body: &str, #[case] expected: &str) {
	let mut scope = numbers_scope();
	scope.insert("name", Value::Text("n".to_string()));
	let output = render(body, &[], &[], &mut scope, LoopScope::Flattened);
	assert_eq!(output, expected);
}

#[rstest]
#[case::param_names_table("{{#tbl}}", "3")]
#[case::param_as_loop_source("{{#for r of tbl}}{{r.x}}{{/for}}", "123")]
#[case::param_value("<{{tbl}}>", "<T>")]
#[case::missing_arg("<{{extra}}>", "<>")]
fn parameters_shadow_scope(#[case] body: &str, #[case] expected: &str) {
	let mut scope = numbers_scope();
	scope.insert("tbl", Value::Text("shadowed".to_string()));
	let output = render(body, &["tbl", "extra"], &["T"], &mut scope, LoopScope::Flattened);
	assert_eq!(output, expected);
}

#[rstest]
#[case::flattened(LoopScope::Flattened, "3", true)]
#[case::per_level(LoopScope::PerLevel, "", false)]
fn loop_scope_policy(
	#[case] policy: LoopScope,
	#[case] expected: &str,
	#[case] leaks: bool,
) {
	let mut scope = numbers_scope();
	let output = render("{{#for r of T}}{{/for}}{{r.x}}", &[], &[], &mut scope, policy);

	assert_eq!(output, expected);
	assert_eq!(scope.get("r").is_some(), leaks);
	assert_eq!(scope.depth(), 1);
}

#[rstest]
#[case::flattened(LoopScope::Flattened, "")]
#[case::per_level(LoopScope::PerLevel, "3")]
fn nested_loop_reusing_a_name(#[case] policy: LoopScope, #[case] expected: &str) {
	let mut scope = numbers_scope();
	let body = "{{#for r of T}}{{#for r of U}}{{/for}}{{r.x}}{{/for}}";
	let output = render(body, &[], &[], &mut scope, policy);

	assert_eq!(output, expected);
}

#[rstest]
#[case::no_loops("abc", "-:1")]
#[case::one_loop("a{{#for T}}b{{/for}}c", "-:1(T:1,-:1)")]
#[case::nested("{{#for T}}{{#for U}}x{{/for}}y{{/for}}z", "-:0(T:0(U:1,-:1),-:1)")]
#[case::unclosed("a{{#for T}}b", "-:1(T:1)")]
#[case::stray_end("a{{/for}}b", "-:1(-:1)")]
fn loop_tree_shape(#[case] body: &str, #[case] expected: &str) {
	let tokens = parse_template(body);
	let tree = LoopTree::build(&tokens);
	assert_eq!(tree.shape(LoopTree::ROOT), expected);
}

#[test]
fn both_side_trim_removes_one_whitespace_token_per_side() {
	let tokens = parse_template("a {{~#each~}} b");
	assert_eq!(symbols(&tokens), "X#X");
	assert_eq!(tokens[0], TemplateToken::Text("a".to_string()));
	assert_eq!(tokens[2], TemplateToken::Text("b".to_string()));
}

#[test]
fn table_parsing() {
	let table = parse_table("a|b\n1|2\n3|4");
	let expected: Table = [[("a", "1"), ("b", "2")], [("a", "3"), ("b", "4")]]
		.into_iter()
		.map(|cells| {
			cells
				.into_iter()
				.map(|(key, value)| (key.to_string(), value.to_string()))
				.collect::<Row>()
		})
		.collect();

	assert_eq!(table, expected);
}

#[rstest]
#[case::trailing_pipes("k |\nx |\ny |", 2)]
#[case::leading_and_trailing_pipes("| k | v |\n| 1 | 2 |", 1)]
#[case::header_only("k |", 0)]
#[case::blank("  \n ", 0)]
fn table_row_counts(#[case] markdown: &str, #[case] rows: usize) {
	assert_eq!(parse_table(markdown).len(), rows);
}

#[test]
fn table_cells_are_trimmed_and_unnamed_columns_skipped() {
	let table = parse_table("| name | | kind |\n|  Red  | ignored |  warm |");
	let row = &table[0];

	assert_eq!(row.get("name").map(String::as_str), Some("Red"));
	assert_eq!(row.get("kind").map(String::as_str), Some("warm"));
	assert_eq!(row.len(), 2);
}

#[test]
fn config_defaults() -> MetacodeResult<()> {
	let config = MetacodeConfig::parse("")?;

	assert_eq!(config.comment, "//");
	assert_eq!(config.loop_scope, LoopScope::Flattened);
	assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
	assert!(!config.disable_gitignore);

	Ok(())
}

#[test]
fn config_overrides_comment_prefixes() -> MetacodeResult<()> {
	let config = MetacodeConfig::parse(
		"comment = \";\"\nloop_scope = \"per_level\"\n\n[comments]\npy = \"##\"\n",
	)?;

	assert_eq!(config.comment_prefix_for(Path::new("a.py")), "##");
	assert_eq!(config.comment_prefix_for(Path::new("a.rb")), "#");
	assert_eq!(config.comment_prefix_for(Path::new("a.c")), "//");
	assert_eq!(config.comment_prefix_for(Path::new("a.sql")), "--");
	assert_eq!(config.comment_prefix_for(Path::new("a.asm")), ";");
	assert_eq!(
		config.compile_options_for(Path::new("a.py")),
		CompileOptions::new("##").with_loop_scope(LoopScope::PerLevel)
	);
	assert!(config.is_supported(Path::new("a.py")));
	assert!(!config.is_supported(Path::new("a.asm")));

	Ok(())
}

#[test]
fn config_rejects_invalid_toml() {
	let result = MetacodeConfig::parse("loop_scope = \"sideways\"");
	assert!(matches!(result, Err(MetacodeError::ConfigParse(_))), "{result:?}");
}

#[test]
fn config_is_discovered_in_candidate_order() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	assert!(MetacodeConfig::load(tmp.path())?.is_none());

	std::fs::create_dir(tmp.path().join(".config"))?;
	std::fs::write(tmp.path().join(".config/metacode.toml"), "comment = \"a\"\n")?;
	std::fs::write(tmp.path().join(".metacode.toml"), "comment = \"b\"\n")?;

	let config = MetacodeConfig::load(tmp.path())?.ok_or("config not found")?;
	assert_eq!(config.comment, "b");

	Ok(())
}

#[test]
fn compile_file_reports_status() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let stale = tmp.path().join("stale.c");
	let plain = tmp.path().join("plain.c");
	std::fs::write(&stale, greeting_document())?;
	std::fs::write(&plain, "int x;\n")?;

	let options = CompileOptions::default();
	let outcome = compile_file(&stale, &options)?;
	assert_eq!(outcome.status, FileStatus::Updated);
	assert!(outcome.write()?);

	let outcome = compile_file(&stale, &options)?;
	assert_eq!(outcome.status, FileStatus::UpToDate);
	assert!(!outcome.write()?);

	let outcome = compile_file(&plain, &options)?;
	assert_eq!(outcome.status, FileStatus::Unchanged);
	assert_eq!(std::fs::read_to_string(&plain)?, "int x;\n");

	Ok(())
}

#[test]
fn project_collects_supported_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();
	std::fs::write(root.join("metacode.toml"), "[exclude]\npatterns = [\"gen/\"]\n")?;
	std::fs::write(root.join(".gitignore"), "ignored.c\n")?;
	std::fs::create_dir_all(root.join("src/nested"))?;
	std::fs::create_dir_all(root.join("gen"))?;
	std::fs::create_dir_all(root.join("node_modules"))?;
	std::fs::create_dir_all(root.join("sub"))?;
	for file in [
		"a.c",
		"ignored.c",
		"notes.txt",
		"src/b.rs",
		"src/nested/c.py",
		"gen/d.c",
		"node_modules/e.js",
		"sub/f.c",
	] {
		std::fs::write(root.join(file), "")?;
	}
	std::fs::write(root.join("sub/metacode.toml"), "")?;

	let project = Project::load(root)?;
	let files = project.files(&[])?;
	let relative: Vec<_> = files
		.iter()
		.filter_map(|path| path.strip_prefix(root).ok())
		.map(|path| path.to_string_lossy().replace('\\', "/"))
		.collect();

	assert_eq!(
		relative,
		vec!["a.c", "metacode.toml", "src/b.rs", "src/nested/c.py"]
	);

	Ok(())
}

#[test]
fn project_skips_files_over_the_size_limit() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();
	std::fs::write(root.join("metacode.toml"), "max_file_size = 4\n")?;
	std::fs::write(root.join("big.c"), "int x;\n")?;
	std::fs::write(root.join("small.c"), "x\n")?;

	let project = Project::load(root)?;
	assert_eq!(project.config.max_file_size, 4);

	let files = project.files(&[])?;
	let relative: Vec<_> = files
		.iter()
		.filter_map(|path| path.strip_prefix(root).ok())
		.map(|path| path.to_string_lossy().replace('\\', "/"))
		.collect();

	assert_eq!(relative, vec!["small.c"]);

	Ok(())
}

#[test]
fn project_applies_overrides() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let path = tmp.path().join("doc.txt");
	std::fs::write(
		&path,
		"; #metacode\n; #macro A()\n;   a\n; A()\n; #metagen\n; #metaend\n",
	)?;

	let project = Project::load(tmp.path())?;
	let overrides = Overrides {
		comment_prefix: Some(";".to_string()),
		loop_scope: None,
	};
	let outcome = project.compile(&path, &overrides)?;

	assert_eq!(outcome.status, FileStatus::Updated);
	assert!(outcome.output.contains("; #metagen\na; #metaend\n"));

	Ok(())
}

#[test]
fn invalid_exclude_pattern_is_reported() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join("metacode.toml"),
		"[exclude]\npatterns = [\"a/**b/[\"]\n",
	)?;

	let project = Project::load(tmp.path())?;
	let result = project.files(&[]);
	assert!(
		matches!(result, Err(MetacodeError::InvalidExclude { .. })),
		"{result:?}"
	);

	Ok(())
}
