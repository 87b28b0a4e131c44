use crate::Row;
use crate::Table;

/// A C header generator: an enum plus a matching string table, driven by a
/// markdown table. The generated region holds stale output.
pub fn cat_breeds_document() -> &'static str {
	r#"#include <stdio.h>

// #metacode
// #macro ENUM(name,t)
//   // {{name}}.h
//   typedef enum
//   {
//     {{~#for _i,r of t~}}
//     {{name}}_{{r.k}},
//     {{~/for~}}
//     {{name}}__COUNT
//   } {{name}};
//
//   extern char* {{name}}__STRINGS[{{#t}}];
//
//   // {{name}}.c
//   char* {{name}}__STRINGS[{{#t}}] =
//   {
//     {{~#for r of t~}}
//     "{{r.k}}",
//     {{~/for~}}
//   };
//
// #table T_CAT_BREEDS
//   k          |
//   Persian    |
//   MaineCoon  |
//   Siamese    |
//   Bengal     |
//
// ENUM(CatBreed, T_CAT_BREEDS)
// #metagen
typedef enum { CatBreed_Persian } CatBreed;
// #metaend

int main(void) { return 0; }
"#
}

/// A macro with one parameter and a single line body.
pub fn greeting_document() -> &'static str {
	"// #metacode\n// #macro GREET(who)\n//   hello {{who}}\n//\n// GREET(world)\n// #metagen\n// \
	 #metaend\n"
}

/// `T = [{x: 1}, {x: 2}, {x: 3}]`
pub fn numbers_table() -> Table {
	["1", "2", "3"]
		.into_iter()
		.map(|x| Row::from([("x".to_string(), x.to_string())]))
		.collect()
}

/// `U = [{y: a}, {y: b}]`
pub fn letters_table() -> Table {
	["a", "b"]
		.into_iter()
		.map(|y| Row::from([("y".to_string(), y.to_string())]))
		.collect()
}
