//! The pattern-reduce primitive every tokenizer pass is built on.
//!
//! A pass scans a haystack (a string, or a slice of tokens from an earlier
//! pass) for successive leftmost, non-overlapping matches of a [`Pattern`].
//! Each match, and optionally each unmatched gap between matches, is handed
//! to a reducer which returns zero or more output items. The outputs are
//! concatenated in haystack order.

use std::ops::Range;

use regex::Captures;
use regex::Regex;

/// Something a [`Pattern`] can be matched against.
pub trait Haystack {
	/// Total length in the haystack's own units (bytes or tokens).
	fn extent(&self) -> usize;

	/// The position one symbol past `at`. Used to make progress after a
	/// zero-width match.
	fn step(&self, at: usize) -> usize;
}

impl Haystack for str {
	fn extent(&self) -> usize {
		self.len()
	}

	fn step(&self, at: usize) -> usize {
		self.get(at..)
			.and_then(|rest| rest.chars().next())
			.map_or(at + 1, |ch| at + ch.len_utf8())
	}
}

impl<T> Haystack for [T] {
	fn extent(&self) -> usize {
		self.len()
	}

	fn step(&self, at: usize) -> usize {
		at + 1
	}
}

/// A matcher that can locate the leftmost match at or after a position.
pub trait Pattern<H: Haystack + ?Sized> {
	/// Data describing a single match (captures, the alternative that
	/// matched, ...).
	type Match<'h>
	where
		H: 'h;

	/// Find the leftmost match starting at or after `start`.
	fn find_at<'h>(&self, haystack: &'h H, start: usize)
	-> Option<(Range<usize>, Self::Match<'h>)>;
}

impl Pattern<str> for Regex {
	type Match<'h> = Captures<'h>;

	fn find_at<'h>(&self, haystack: &'h str, start: usize) -> Option<(Range<usize>, Captures<'h>)> {
		let captures = self.captures_at(haystack, start)?;
		let range = captures.get(0)?.range();
		Some((range, captures))
	}
}

/// Reduce every match and every gap between matches.
pub fn reduce<'h, H, P, T>(
	haystack: &'h H,
	pattern: &P,
	mut on_match: impl FnMut(P::Match<'h>, Range<usize>) -> Vec<T>,
	mut on_gap: impl FnMut(Range<usize>) -> Vec<T>,
) -> Vec<T>
where
	H: Haystack + ?Sized,
	P: Pattern<H>,
{
	reduce_inner(haystack, pattern, &mut on_match, Some(&mut on_gap))
}

/// Reduce every match. Unmatched regions are dropped.
pub fn reduce_matches<'h, H, P, T>(
	haystack: &'h H,
	pattern: &P,
	mut on_match: impl FnMut(P::Match<'h>, Range<usize>) -> Vec<T>,
) -> Vec<T>
where
	H: Haystack + ?Sized,
	P: Pattern<H>,
{
	reduce_inner(haystack, pattern, &mut on_match, None)
}

#[allow(clippy::type_complexity)]
fn reduce_inner<'h, H, P, T>(
	haystack: &'h H,
	pattern: &P,
	on_match: &mut dyn FnMut(P::Match<'h>, Range<usize>) -> Vec<T>,
	mut on_gap: Option<&mut dyn FnMut(Range<usize>) -> Vec<T>>,
) -> Vec<T>
where
	H: Haystack + ?Sized,
	P: Pattern<H>,
{
	let end = haystack.extent();
	let mut output = Vec::new();
	let mut last = 0;
	let mut cursor = 0;

	while cursor <= end {
		let Some((range, found)) = pattern.find_at(haystack, cursor) else {
			break;
		};

		if last < range.start {
			if let Some(gap) = &mut on_gap {
				output.extend(gap(last..range.start));
			}
		}

		cursor = if range.is_empty() {
			haystack.step(range.end)
		} else {
			range.end
		};
		last = range.end;
		output.extend(on_match(found, range));
	}

	if last < end {
		if let Some(gap) = &mut on_gap {
			output.extend(gap(last..end));
		}
	}

	output
}

/// A token that can be projected onto a single kind character.
pub trait Kind {
	fn kind(&self) -> char;
}

/// The kind projection of a token stream: one character per token.
pub fn symbols<K: Kind>(tokens: &[K]) -> String {
	tokens.iter().map(Kind::kind).collect()
}
