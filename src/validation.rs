use crate::error::{AppError, AppResult};

/// Number of keywords a fortune request must carry.
pub const REQUIRED_KEYWORDS: usize = 3;

/// Maximum length of a single keyword, in characters.
///
/// Keeps prompts small; keywords are words, not paragraphs.
pub const MAX_KEYWORD_LENGTH: usize = 64;

/// Validate fortune keywords and return them trimmed.
///
/// Rules:
/// - Exactly three keywords
/// - Each non-empty after trimming
/// - Each at most 64 characters
/// - No control characters (they would leak into the prompt verbatim)
pub fn validate_keywords(keywords: &[String]) -> AppResult<Vec<String>> {
    if keywords.len() != REQUIRED_KEYWORDS {
        return Err(AppError::BadRequest(
            "Exactly 3 keywords are required.".to_string(),
        ));
    }

    keywords
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let keyword = raw.trim();

            if keyword.is_empty() {
                return Err(AppError::BadRequest(format!(
                    "Keyword {} cannot be empty",
                    i + 1
                )));
            }

            if keyword.chars().count() > MAX_KEYWORD_LENGTH {
                return Err(AppError::BadRequest(format!(
                    "Keyword {} cannot exceed {MAX_KEYWORD_LENGTH} characters",
                    i + 1
                )));
            }

            if keyword.chars().any(char::is_control) {
                return Err(AppError::BadRequest(format!(
                    "Keyword {} contains a control character",
                    i + 1
                )));
            }

            Ok(keyword.to_string())
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn kw(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_three_keywords_accepted_and_trimmed() {
        let result = validate_keywords(&kw(&[" love ", "pizza", "Mars"])).unwrap();
        assert_eq!(result, kw(&["love", "pizza", "Mars"]));
    }

    #[test]
    fn test_wrong_count_rejected() {
        for count in [0, 1, 2, 4] {
            let keywords = vec!["word".to_string(); count];
            let err = validate_keywords(&keywords).unwrap_err();
            assert!(err.to_string().contains("Exactly 3 keywords"));
        }
    }

    #[test]
    fn test_empty_keyword_rejected() {
        let err = validate_keywords(&kw(&["a", "   ", "c"])).unwrap_err();
        assert!(err.to_string().contains("Keyword 2"));
    }

    #[test]
    fn test_long_keyword_rejected() {
        let long = "x".repeat(MAX_KEYWORD_LENGTH + 1);
        assert!(validate_keywords(&kw(&["a", "b", &long])).is_err());

        let max = "x".repeat(MAX_KEYWORD_LENGTH);
        assert!(validate_keywords(&kw(&["a", "b", &max])).is_ok());
    }

    #[test]
    fn test_unicode_length_counts_chars() {
        // 64 emoji are 256 bytes but still within the limit.
        let emoji = "🔮".repeat(MAX_KEYWORD_LENGTH);
        assert!(validate_keywords(&kw(&["a", "b", &emoji])).is_ok());
    }

    #[test]
    fn test_control_character_rejected() {
        let err = validate_keywords(&kw(&["a", "b\nignore previous", "c"])).unwrap_err();
        assert!(err.to_string().contains("control character"));
    }
}
