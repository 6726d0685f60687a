//! Phone number normalization.

/// Number of digits a phone must carry to be rewritten.
const CANONICAL_DIGITS: usize = 10;

/// Rewrite a raw phone string into `+1-DDD-DDD-DDDD`.
///
/// Every character that is not a Unicode digit is dropped. When exactly ten
/// digits remain they are formatted into the canonical form; any other count
/// returns `raw` untouched (not the stripped digits).
///
/// Already-canonical input is returned unchanged: the `+1` prefix makes it
/// eleven digits, so a second pass is a no-op.
pub fn normalize_phone(raw: &str) -> String {
    let digits: Vec<char> = raw.chars().filter(|c| c.is_numeric()).collect();

    if digits.len() != CANONICAL_DIGITS {
        return raw.to_string();
    }

    // Digits may be multibyte, so group by char rather than byte offset
    let group = |range: std::ops::Range<usize>| digits[range].iter().collect::<String>();
    format!("+1-{}-{}-{}", group(0..3), group(3..6), group(6..CANONICAL_DIGITS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formats_ten_digits() {
        assert_eq!(normalize_phone("555-123-4567"), "+1-555-123-4567");
        assert_eq!(normalize_phone("(415) 555 1212"), "+1-415-555-1212");
        assert_eq!(normalize_phone("1234567890"), "+1-123-456-7890");
    }

    #[test]
    fn test_keeps_digit_order() {
        assert_eq!(normalize_phone("a9b8c7d6e5f4g3h2i1j0"), "+1-987-654-3210");
    }

    #[test]
    fn test_other_digit_counts_return_input() {
        for raw in ["", "1", "555-1234", "+1 (555) 123-4567", "12345678901", "call me"] {
            assert_eq!(normalize_phone(raw), raw, "input {raw:?} should be unchanged");
        }
    }

    #[test]
    fn test_non_ascii_digits_are_kept_and_grouped() {
        assert_eq!(normalize_phone("٠١٢٣٤٥٦٧٨٩"), "+1-٠١٢-٣٤٥-٦٧٨٩");
        assert_eq!(normalize_phone("(٥٥٥) ١٢٣-٤٥٦٧"), "+1-٥٥٥-١٢٣-٤٥٦٧");
        let once = normalize_phone("٠١٢٣٤٥٦٧٨٩");
        assert_eq!(normalize_phone(&once), once);
    }

    #[test]
    fn test_idempotent() {
        let once = normalize_phone("555.123.4567");
        assert_eq!(normalize_phone(&once), once);
    }
}
