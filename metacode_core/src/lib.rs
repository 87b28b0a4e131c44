//! `metacode_core` expands macros written inside source-code comments.
//!
//! A document declares macros and tables between a `#metacode` line and a
//! `#metagen` line, invokes macros with ordinary comment lines, and receives
//! the expansion between `#metagen` and `#metaend`. Recompiling replaces
//! only the generated region, so the document can be compiled any number of
//! times.
//!
//! ```c
//! // #metacode
//! // #table COLORS
//! //   name  |
//! //   Red   |
//! //   Green |
//! // #macro ENUM(T, TABLE)
//! //   enum {{T}} { {{#for row of TABLE}}{{row.name}}, {{/for}}};
//! //
//! // ENUM(Color, COLORS)
//! // #metagen
//! enum Color { Red, Green, };
//! // #metaend
//! ```
//!
//! ## Processing Pipeline
//!
//! ```text
//! document
//!   → Lexer (comment prefixes, line breaks, directive markers, text)
//!   → Validator (#metacode → #metagen → #metaend ordering)
//!   → Parser (declaration and generated regions folded into aggregate tokens)
//!   → Compiler (registers macros and tables, runs invocations, rewrites output)
//! ```
//!
//! Macro bodies go through their own pipeline:
//!
//! ```text
//! body → template tokens (`{{ }}` directives, whitespace, trim rules) → loop tree → text
//! ```
//!
//! Every pass is a [`chunker::reduce`] over a [`chunker::Pattern`].
//!
//! ## Quick Start
//!
//! ```rust
//! use metacode_core::CompileOptions;
//! use metacode_core::compile;
//!
//! let source = "// #metacode\n// #macro HI(who)\n//   hi {{who}}\n//\n// HI(you)\n// \
//!               #metagen\n// #metaend\n";
//! let compilation = compile(source, &CompileOptions::default())?;
//! assert!(
//! 	compilation
//! 		.output(source)
//! 		.ends_with("// #metagen\nhi you\n// #metaend\n")
//! );
//! # Ok::<(), metacode_core::MetacodeError>(())
//! ```

pub use config::*;
pub use engine::*;
pub use error::*;
pub use parser::group;
pub use parser::parse;
pub use project::*;
pub use table::*;
pub use template::*;
pub use tokens::*;
pub use vm::LoopScope;
pub use vm::Macro;
pub use vm::Scope;
pub use vm::Value;

pub mod chunker;
pub mod config;
mod engine;
#[allow(unused_assignments)]
mod error;
pub mod lexer;
mod parser;
pub mod project;
mod table;
mod template;
mod tokens;
mod validator;
mod vm;

pub use lexer::Lexer;
pub use validator::validate;

#[cfg(test)]
mod __fixtures;
#[cfg(test)]
mod __tests;
