//! Executes a tokenized macro body against the document's data scope.
//!
//! The flat token stream is first folded into a loop tree: every `#for`
//! opens a child node, every `/for` closes it and opens a fresh sibling for
//! the content that follows. The tree is then walked depth first in
//! pre-order; each node runs its own tokens once per row of its table (or
//! exactly once when it has no loop header) before its children run.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Display;

use serde::Deserialize;

use crate::table::Row;
use crate::table::Table;
use crate::template::Iteration;
use crate::template::TemplateToken;
use crate::template::parse_template;

/// A value stored in a scope frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
	Text(String),
	/// A 0-based row index bound by a loop.
	Index(usize),
	Row(Row),
	Table(Table),
}

impl Display for Value {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Text(text) => write!(f, "{text}"),
			Self::Index(index) => write!(f, "{index}"),
			Self::Row(_) | Self::Table(_) => Ok(()),
		}
	}
}

/// Where loop variables are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopScope {
	/// Loop keys and values are written into the outermost frame, the
	/// document scope itself. Nested loops reusing a name overwrite each
	/// other, and the last binding stays visible to later invocations.
	#[default]
	Flattened,
	/// Each loop gets its own frame which lives while the loop and the
	/// nodes nested under it run.
	PerLevel,
}

/// A stack of name to value frames. The first frame is the document scope
/// that `#table` declarations populate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
	frames: Vec<HashMap<String, Value>>,
}

impl Default for Scope {
	fn default() -> Self {
		Self {
			frames: vec![HashMap::new()],
		}
	}
}

impl Scope {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert into the outermost frame.
	pub fn insert(&mut self, name: impl Into<String>, value: Value) {
		if let Some(frame) = self.frames.first_mut() {
			frame.insert(name.into(), value);
		}
	}

	pub fn insert_table(&mut self, name: impl Into<String>, table: Table) {
		self.insert(name, Value::Table(table));
	}

	/// Look a name up, innermost frame first.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.frames.iter().rev().find_map(|frame| frame.get(name))
	}

	pub fn depth(&self) -> usize {
		self.frames.len()
	}

	fn push_frame(&mut self) {
		self.frames.push(HashMap::new());
	}

	fn pop_frame(&mut self) {
		if self.frames.len() > 1 {
			self.frames.pop();
		}
	}

	fn bind(&mut self, policy: LoopScope, name: &str, value: Value) {
		let frame = match policy {
			LoopScope::Flattened => self.frames.first_mut(),
			LoopScope::PerLevel => self.frames.last_mut(),
		};

		if let Some(frame) = frame {
			frame.insert(name.to_string(), value);
		}
	}
}

/// A `#macro` declaration: formal parameters plus the tokenized body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
	pub name: String,
	pub params: Vec<String>,
	pub tokens: Vec<TemplateToken>,
}

impl Macro {
	pub fn new(name: impl Into<String>, params: Vec<String>, body: &str) -> Self {
		Self {
			name: name.into(),
			params,
			tokens: parse_template(body),
		}
	}

	/// Render the macro with positional `args`, reading and writing `scope`.
	pub fn render(&self, args: &[String], scope: &mut Scope, policy: LoopScope) -> String {
		let tree = LoopTree::build(&self.tokens);
		let mut invocation = Invocation {
			definition: self,
			args,
			scope,
			policy,
		};
		let mut output = String::new();
		invocation.run(&tree, LoopTree::ROOT, &mut output);
		output
	}
}

#[derive(Debug)]
struct LoopNode<'t> {
	iteration: Option<&'t Iteration>,
	tokens: Vec<&'t TemplateToken>,
	parent: Option<usize>,
	children: Vec<usize>,
}

/// Nodes live in an arena; children are stored as indexes in creation
/// order.
#[derive(Debug)]
pub(crate) struct LoopTree<'t> {
	nodes: Vec<LoopNode<'t>>,
}

impl<'t> LoopTree<'t> {
	pub(crate) const ROOT: usize = 0;

	pub(crate) fn build(tokens: &'t [TemplateToken]) -> Self {
		let mut tree = Self {
			nodes: vec![LoopNode {
				iteration: None,
				tokens: Vec::new(),
				parent: None,
				children: Vec::new(),
			}],
		};
		// Loop nodes that have been opened and not yet closed.
		let mut open: Vec<usize> = Vec::new();
		let mut cursor = Self::ROOT;

		for token in tokens {
			match token {
				TemplateToken::Loop(iteration) => {
					let node = tree.append(cursor, Some(iteration));
					open.push(node);
					cursor = node;
				}
				TemplateToken::EndLoop => {
					let parent = open
						.pop()
						.and_then(|node| tree.nodes[node].parent)
						.unwrap_or(Self::ROOT);
					cursor = tree.append(parent, None);
				}
				other => tree.nodes[cursor].tokens.push(other),
			}
		}

		tree
	}

	fn append(&mut self, parent: usize, iteration: Option<&'t Iteration>) -> usize {
		let id = self.nodes.len();
		self.nodes.push(LoopNode {
			iteration,
			tokens: Vec::new(),
			parent: Some(parent),
			children: Vec::new(),
		});
		self.nodes[parent].children.push(id);
		id
	}

	/// Compact rendering of the subtree at `id`: loop table (or `-`), leaf
	/// token count, then children.
	#[cfg(test)]
	pub(crate) fn shape(&self, id: usize) -> String {
		let node = &self.nodes[id];
		let head = node.iteration.map_or("-", |iteration| iteration.table.as_str());
		let children: Vec<String> = node.children.iter().map(|&c| self.shape(c)).collect();
		if children.is_empty() {
			format!("{head}:{}", node.tokens.len())
		} else {
			format!("{head}:{}({})", node.tokens.len(), children.join(","))
		}
	}
}

/// State for one macro invocation. Formal parameters shadow every scope
/// frame.
struct Invocation<'a> {
	definition: &'a Macro,
	args: &'a [String],
	scope: &'a mut Scope,
	policy: LoopScope,
}

impl Invocation<'_> {
	fn run(&mut self, tree: &LoopTree<'_>, id: usize, output: &mut String) {
		let node = &tree.nodes[id];
		let own_frame = self.policy == LoopScope::PerLevel && node.iteration.is_some();
		if own_frame {
			self.scope.push_frame();
		}

		if let Some(iteration) = node.iteration {
			let rows = self.resolve_table(&iteration.table).unwrap_or_else(|| {
				tracing::debug!(
					table = %iteration.table,
					macro_name = %self.definition.name,
					"loop table did not resolve"
				);
				Table::default()
			});

			for (index, row) in rows.into_rows().into_iter().enumerate() {
				if let Some(key) = &iteration.key {
					self.scope.bind(self.policy, key, Value::Index(index));
				}
				if let Some(value) = &iteration.value {
					self.scope.bind(self.policy, value, Value::Row(row));
				}
				self.emit(&node.tokens, output);
			}
		} else {
			self.emit(&node.tokens, output);
		}

		for &child in &node.children {
			self.run(tree, child, output);
		}

		if own_frame {
			self.scope.pop_frame();
		}
	}

	fn emit(&self, tokens: &[&TemplateToken], output: &mut String) {
		for token in tokens {
			if let Some(literal) = token.literal() {
				output.push_str(literal);
				continue;
			}

			match token {
				TemplateToken::Member { object, member } => {
					if let Some(Value::Row(row)) = self.resolve(object).as_deref() {
						if let Some(cell) = row.get(member) {
							output.push_str(cell);
						}
					}
				}
				TemplateToken::Count(table) => {
					if let Some(rows) = self.resolve_table(table) {
						output.push_str(&rows.len().to_string());
					}
				}
				TemplateToken::Var(name) => {
					if let Some(value) = self.resolve(name) {
						output.push_str(&value.to_string());
					}
				}
				_ => {}
			}
		}
	}

	/// Formal parameters first, then the scope stack.
	fn resolve(&self, name: &str) -> Option<Cow<'_, Value>> {
		if let Some(position) = self
			.definition
			.params
			.iter()
			.position(|param| param == name)
		{
			return self
				.args
				.get(position)
				.map(|arg| Cow::Owned(Value::Text(arg.clone())));
		}

		self.scope.get(name).map(Cow::Borrowed)
	}

	/// Resolve a table reference. A reference that resolves to text is
	/// resolved once more, so a parameter can carry the name of a table.
	fn resolve_table(&self, name: &str) -> Option<Table> {
		match self.resolve(name)?.as_ref() {
			Value::Table(table) => Some(table.clone()),
			Value::Text(reference) => {
				match self.resolve(reference)?.as_ref() {
					Value::Table(table) => Some(table.clone()),
					_ => None,
				}
			}
			_ => None,
		}
	}
}
