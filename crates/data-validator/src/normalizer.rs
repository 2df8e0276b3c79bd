//! Text Normalization

/// Lowercase the text and collapse every run of non-alphanumeric characters
/// into a single space.
pub fn normalize_text(text: &str) -> String {
    tokenize(text).join(" ")
}

/// Split text into lowercase alphanumeric tokens
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Pressure DROP, detected in main-valve!"),
            vec!["pressure", "drop", "detected", "in", "main", "valve"]
        );
    }

    #[test]
    fn test_tokenize_keeps_accented_letters() {
        assert_eq!(tokenize("Fuite détectée"), vec!["fuite", "détectée"]);
    }

    #[test]
    fn test_normalize_punctuation_only() {
        assert_eq!(normalize_text("  ...!!  "), "");
        assert!(tokenize("--").is_empty());
    }
}
