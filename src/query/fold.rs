//! Case and diacritic folding for text comparison.

use unicode_normalization::UnicodeNormalization;

/// Lowercase `text`, decompose it and drop combining diacritical marks,
/// so that `"Élève"` and `"eleve"` fold to the same string.
pub fn fold(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_case_and_accents() {
        assert_eq!(fold("Élève"), "eleve");
        assert_eq!(fold("MONTRÉAL"), "montreal");
        assert_eq!(fold("e\u{0301}"), "e");
    }

    #[test]
    fn test_fold_keeps_other_characters() {
        assert_eq!(fold("Paris 2020!"), "paris 2020!");
        assert_eq!(fold(""), "");
    }
}
