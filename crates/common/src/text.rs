//! Small text helpers shared by catalog matching and product synthesis.

/// Lowercase and trim a free-text hint.
#[must_use]
pub fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Case-insensitive check for `needle` as a whole word of `haystack`.
///
/// Words are split on anything that is not alphanumeric, so `"red-orange"`
/// contains the word `"red"` while `"redwood"` does not.
#[must_use]
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    let needle = normalize(needle);
    if needle.is_empty() {
        return false;
    }
    if needle.contains(' ') {
        return haystack.to_lowercase().contains(&needle);
    }
    haystack
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == needle)
}

/// Upper-case the first letter of every whitespace separated word.
#[must_use]
pub fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keep at most `max_words` words of `input`.
#[must_use]
pub fn truncate_words(input: &str, max_words: usize) -> String {
    input
        .split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_match_respects_boundaries() {
        assert!(contains_word("Red-orange wrap dress", "red"));
        assert!(!contains_word("Redwood side table", "red"));
        assert!(contains_word("Slim Fit Navy Blue Shirt", "navy blue"));
        assert!(!contains_word("anything", "  "));
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("flowy linen  maxi dress"), "Flowy Linen Maxi Dress");
    }

    #[test]
    fn truncates_long_descriptions() {
        assert_eq!(truncate_words("a b c d e f g", 3), "a b c");
    }
}
