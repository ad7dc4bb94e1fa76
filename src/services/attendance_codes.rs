use sha2::{Digest, Sha256};
use time::Date;

/// Daily attendance code for a class: upper-case hex prefix of
/// `sha256(secret || class_id || date)`.
pub(crate) fn daily_code(secret: &str, class_id: &str, date: Date, length: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(class_id.as_bytes());
    hasher.update(date.to_string().as_bytes());

    let mut code = hex::encode_upper(hasher.finalize());
    code.truncate(length.min(code.len()));
    code
}

pub(crate) fn code_matches(expected: &str, presented: &str) -> bool {
    let presented = presented.trim();
    !presented.is_empty() && expected.eq_ignore_ascii_case(presented)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn code_is_stable_within_a_day() {
        let first = daily_code("secret", "class-1", date!(2025 - 03 - 01), 8);
        let second = daily_code("secret", "class-1", date!(2025 - 03 - 01), 8);

        assert_eq!(first, second);
        assert_eq!(first.len(), 8);
        assert!(first.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn code_rotates_by_day_and_class() {
        let base = daily_code("secret", "class-1", date!(2025 - 03 - 01), 8);

        assert_ne!(base, daily_code("secret", "class-1", date!(2025 - 03 - 02), 8));
        assert_ne!(base, daily_code("secret", "class-2", date!(2025 - 03 - 01), 8));
        assert_ne!(base, daily_code("other", "class-1", date!(2025 - 03 - 01), 8));
    }

    #[test]
    fn length_is_capped_at_digest_size() {
        assert_eq!(daily_code("s", "c", date!(2025 - 03 - 01), 500).len(), 64);
    }

    #[test]
    fn match_ignores_case_and_whitespace() {
        assert!(code_matches("AB12CD34", " ab12cd34 "));
        assert!(!code_matches("AB12CD34", "AB12CD35"));
        assert!(!code_matches("AB12CD34", "  "));
    }
}
