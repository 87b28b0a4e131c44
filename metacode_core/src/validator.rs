use crate::MetacodeError;
use crate::MetacodeResult;
use crate::tokens::Token;

/// Where the validator currently is relative to the directive markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
	/// Outside of any `#metacode` block.
	Outside,
	/// After `#metacode`: declarations and invocations, nothing generated
	/// yet.
	Declaration,
	/// Between `#metagen` and `#metaend`.
	Generated,
}

/// Check that `#metacode`, `#metagen` and `#metaend` appear in the order
/// outside → `#metacode` → `#metagen` → `#metaend` → outside. Repeated
/// `#metacode` markers are allowed before the `#metagen`. Every other token
/// passes through untouched.
pub fn validate(tokens: Vec<Token>) -> MetacodeResult<Vec<Token>> {
	let mut region = Region::Outside;

	for token in &tokens {
		region = match (region, token) {
			(Region::Outside | Region::Declaration, Token::Start(_)) => Region::Declaration,
			(Region::Generated, Token::Start(_) | Token::Generate(_)) => {
				return Err(syntax("all #metagen should be followed by #metaend"));
			}
			(Region::Outside, Token::Generate(_)) => {
				return Err(syntax("all #metagen should be preceded by #metacode"));
			}
			(Region::Declaration, Token::Generate(_)) => Region::Generated,
			(Region::Outside, Token::End(_)) => {
				return Err(syntax(
					"all #metaend should be preceded by #metagen and #metacode",
				));
			}
			(Region::Declaration, Token::End(_)) => {
				return Err(syntax("all #metaend should be preceded by #metagen"));
			}
			(Region::Generated, Token::End(_)) => Region::Outside,
			(region, _) => region,
		};
	}

	tracing::trace!(?region, "validated directive order");
	Ok(tokens)
}

fn syntax(message: &str) -> MetacodeError {
	MetacodeError::Syntax(message.to_string())
}
