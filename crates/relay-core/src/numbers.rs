//! Validation and canonical rendering of numeric `/input` tokens.

/// First token that is neither an integer nor a float.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("'{token}' is not a number")]
pub struct InvalidNumber {
    pub token: String,
}

/// Normalize every token, stopping at the first one that does not parse.
pub fn normalize_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<String>, InvalidNumber> {
    tokens
        .iter()
        .map(|t| {
            normalize_token(t.as_ref()).ok_or_else(|| InvalidNumber {
                token: t.as_ref().to_string(),
            })
        })
        .collect()
}

/// Integers render canonically (any length), floats via their round-trip form.
pub fn normalize_token(token: &str) -> Option<String> {
    if let Some(int) = canonical_integer(token) {
        return Some(int);
    }
    token.parse::<f64>().ok().map(|f| format!("{f:?}"))
}

/// `[+-]?[0-9]+` with the `+` sign and leading zeros dropped; `-0` becomes `0`.
fn canonical_integer(token: &str) -> Option<String> {
    let (negative, digits) = match token.as_bytes().first()? {
        b'-' => (true, &token[1..]),
        b'+' => (false, &token[1..]),
        _ => (false, token),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        return Some("0".to_string());
    }
    Some(if negative {
        format!("-{trimmed}")
    } else {
        trimmed.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_canonical() {
        assert_eq!(normalize_token("10").as_deref(), Some("10"));
        assert_eq!(normalize_token("+7").as_deref(), Some("7"));
        assert_eq!(normalize_token("007").as_deref(), Some("7"));
        assert_eq!(normalize_token("-0").as_deref(), Some("0"));
        assert_eq!(normalize_token("-0042").as_deref(), Some("-42"));
        assert_eq!(
            normalize_token("123456789012345678901234567890").as_deref(),
            Some("123456789012345678901234567890")
        );
    }

    #[test]
    fn floats_use_round_trip_form() {
        assert_eq!(normalize_token("20.5").as_deref(), Some("20.5"));
        assert_eq!(normalize_token("20.0").as_deref(), Some("20.0"));
        assert_eq!(normalize_token("1.50").as_deref(), Some("1.5"));
        assert_eq!(normalize_token(".5").as_deref(), Some("0.5"));
        assert_eq!(normalize_token("-3.25").as_deref(), Some("-3.25"));
        assert_eq!(normalize_token("1e3").as_deref(), Some("1000.0"));
        assert_eq!(normalize_token("inf").as_deref(), Some("inf"));
    }

    #[test]
    fn junk_is_rejected() {
        for t in ["x", "", "+", "-", "1,5", "10a", "0x10", "--1"] {
            assert_eq!(normalize_token(t), None, "token {t:?}");
        }
    }

    #[test]
    fn first_bad_token_is_reported() {
        let err = normalize_tokens(&["10", "20.5", "x", "y"]).unwrap_err();
        assert_eq!(err.token, "x");
        assert_eq!(err.to_string(), "'x' is not a number");
    }

    #[test]
    fn all_good_tokens_normalize_in_order() {
        let out = normalize_tokens(&["10", "020", "30.0"]).unwrap();
        assert_eq!(out, vec!["10", "20", "30.0"]);
    }
}
