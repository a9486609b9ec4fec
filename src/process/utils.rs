/// Tokens that load as null, compared after trimming surrounding whitespace.
pub const NULL_TOKENS: &[&str] = &["", "NA", "N/A", "NULL", "null", "NaN", "nan", "None"];

/// True when a raw CSV field should load as a null cell.
pub fn is_null_token(raw: &str) -> bool {
    NULL_TOKENS.contains(&raw.trim())
}

/// Parse `true`/`false` in any case.
pub fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_tokens() {
        assert!(is_null_token(""));
        assert!(is_null_token("  "));
        assert!(is_null_token(" NA "));
        assert!(is_null_token("NaN"));
        assert!(!is_null_token("0"));
        assert!(!is_null_token("none"));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("False"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }
}
