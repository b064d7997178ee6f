//! Shared helper functions for Rocket route handlers.

use crate::error::ApiError;
use crate::routes::params::MIN_SEARCH_LENGTH;

/// Reject search terms shorter than [`MIN_SEARCH_LENGTH`] characters.
pub fn validate_search_name(name: &str) -> Result<(), ApiError> {
    if name.chars().count() < MIN_SEARCH_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Card name must contain at least {MIN_SEARCH_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Build an `ILIKE` pattern matching `term` anywhere in a value.
///
/// `%`, `_` and the escape character itself are escaped so user input is
/// matched literally.
pub fn substring_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_are_rejected() {
        assert!(matches!(
            validate_search_name("ab"),
            Err(ApiError::BadRequest(_))
        ));
        assert!(validate_search_name("abc").is_ok());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert!(validate_search_name("éé").is_err());
        assert!(validate_search_name("été").is_ok());
    }

    #[test]
    fn wildcards_are_escaped() {
        assert_eq!(substring_pattern("Bolt"), "%Bolt%");
        assert_eq!(substring_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(substring_pattern("a\\b"), "%a\\\\b%");
    }
}
