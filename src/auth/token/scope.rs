//! Token scopes partitioning credentials by purpose.

// self
use crate::_prelude::*;

/// Purpose a token was minted for; a token never authenticates outside its scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenScope {
	/// One-shot account activation.
	Activation,
	/// Per-request bearer authentication.
	Authentication,
}
impl TokenScope {
	/// Returns the stable storage label.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenScope::Activation => "activation",
			TokenScope::Authentication => "authentication",
		}
	}
}
impl Display for TokenScope {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn scope_labels_are_stable() {
		assert_eq!(TokenScope::Activation.to_string(), "activation");
		assert_eq!(
			serde_json::to_string(&TokenScope::Authentication)
				.expect("TokenScope should serialize to JSON."),
			"\"authentication\""
		);
	}
}
