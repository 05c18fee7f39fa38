use unicode_segmentation::UnicodeSegmentation;

/// Rough token-cost estimate: unicode word count scaled by 4/3. The
/// diversity selector takes an estimator by value, so callers with a
/// real tokenizer can inject an exact count instead.
pub fn estimate_tokens(text: &str) -> u32 {
	let words = text.unicode_words().count() as u32;

	words + words.div_ceil(3)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_text_costs_nothing() {
		assert_eq!(estimate_tokens(""), 0);
		assert_eq!(estimate_tokens("   "), 0);
	}

	#[test]
	fn estimate_scales_with_word_count() {
		assert_eq!(estimate_tokens("reset password"), 3);
		assert_eq!(estimate_tokens("one two three four five six"), 8);
	}

	#[test]
	fn punctuation_does_not_count_as_words() {
		assert_eq!(estimate_tokens("reset, password!"), estimate_tokens("reset password"));
	}
}
