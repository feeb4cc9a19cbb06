//! Small helpers for normalising free text at the boundary.

/// Trim a string; blank input becomes `None`.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Truncate to at most `max` characters (not bytes).
pub(crate) fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Trim and require a value no longer than `max` characters.
pub(crate) fn required(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, crate::MarketError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::MarketError::validation(field, "must not be empty"));
    }
    if trimmed.chars().count() > max {
        return Err(crate::MarketError::validation(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Like [`non_blank`], but rejects values longer than `max` characters.
pub(crate) fn optional(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, crate::MarketError> {
    match non_blank(value) {
        Some(v) if v.chars().count() > max => Err(crate::MarketError::validation(
            field,
            format!("must be at most {max} characters"),
        )),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_is_none() {
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(" Moscow ")), Some("Moscow".to_string()));
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("Барсик", 3), "Бар");
    }

    #[test]
    fn required_rejects_blank_and_long() {
        assert!(required("title", "  ", 10).is_err());
        assert!(required("title", "abcdefghijk", 10).is_err());
        assert_eq!(required("title", " ok ", 10).unwrap(), "ok");
    }
}
