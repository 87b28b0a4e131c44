use std::collections::BTreeMap;

use derive_more::Deref;

/// One table row: column key to trimmed cell text.
pub type Row = BTreeMap<String, String>;

/// The rows of a `#table` declaration, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref)]
pub struct Table(Vec<Row>);

impl Table {
	pub fn into_rows(self) -> Vec<Row> {
		self.0
	}
}

impl FromIterator<Row> for Table {
	fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

/// Parse a pipe-delimited table. The first line names the columns; every
/// following line becomes a row keyed positionally by those names. Cells are
/// trimmed, columns with an empty name are ignored and missing cells are
/// left out of the row.
///
/// ```text
/// name    | value |
/// Persian | 1     |
/// ```
pub fn parse_table(markdown: &str) -> Table {
	let mut lines = markdown
		.trim()
		.lines()
		.map(|line| line.split('|').map(str::trim).collect::<Vec<_>>());

	let Some(keys) = lines.next() else {
		return Table::default();
	};

	lines
		.map(|cells| {
			keys.iter()
				.zip(cells)
				.filter(|(key, _)| !key.is_empty())
				.map(|(key, cell)| ((*key).to_string(), cell.to_string()))
				.collect::<Row>()
		})
		.collect()
}
