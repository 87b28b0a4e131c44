use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub fn metacode_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("metacode"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("RUST_LOG");
	cmd
}

/// A C file whose generated region is stale.
#[allow(dead_code)]
pub const STALE_C: &str = "// #metacode\n// #table T\n//   name |\n//   Red  |\n//   Blue |\n//\n// \
                           #macro LIST(t)\n//   {{~#for r of t~}}\n//   {{r.name}};\n//   \
                           {{~/for~}}\n//\n// LIST(T)\n// #metagen\nold\n// #metaend\n";

/// The generated region `STALE_C` compiles to.
#[allow(dead_code)]
pub const COMPILED_REGION: &str = "// #metagen\nRed;\nBlue;\n// #metaend\n";
