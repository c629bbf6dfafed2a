//! Mention extraction for notification text.
//!
//! A mention is an email address written with one extra leading `@`, for
//! example `@@student@example.com` or `hello @student@example.com`. The address
//! itself follows the permissive "valid email address" grammar used by HTML
//! forms:
//!
//! - local part: `[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+`
//! - domain: dot-separated labels of alphanumerics with inner hyphens,
//!   at most 63 characters each
//!
//! Addresses are scanned left to right and one only counts when the character
//! right before it is `@`, so an address at the very start of the text never
//! does.
//!
//! The pass is purely lexical. Whether an extracted address belongs to a real
//! student is decided later by the query engine.

use regex::Regex;
use std::sync::OnceLock;

/// Email address grammar shared by mention extraction and request validation.
pub(crate) const EMAIL_PATTERN: &str = concat!(
    r"[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+",
    r"@",
    r"[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?",
    r"(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*",
);

static ADDRESS_REGEX: OnceLock<Regex> = OnceLock::new();
static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

fn address_regex() -> &'static Regex {
    ADDRESS_REGEX.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("Invalid address regex"))
}

fn email_regex() -> &'static Regex {
    EMAIL_REGEX
        .get_or_init(|| Regex::new(&format!("^{EMAIL_PATTERN}$")).expect("Invalid email regex"))
}

/// Extract every mentioned address from `text`, in order of occurrence.
///
/// Duplicates are preserved; callers deduplicate.
///
/// ```rust
/// use roster_server::roster::mentions::extract_mentions;
///
/// assert_eq!(
///     extract_mentions("hi @@s1@test.com,@@s2@test.com"),
///     vec!["s1@test.com".to_string(), "s2@test.com".to_string()]
/// );
/// assert!(extract_mentions("s1@test.com").is_empty());
/// ```
pub fn extract_mentions(text: &str) -> Vec<String> {
    // Addresses are found first, then filtered on the byte before them, so a
    // mention never starts inside an address that was already consumed.
    address_regex()
        .find_iter(text)
        .filter(|m| m.start() > 0 && text.as_bytes()[m.start() - 1] == b'@')
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Whether `candidate` is, in its entirety, a syntactically valid address.
pub fn is_valid_email(candidate: &str) -> bool {
    email_regex().is_match(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_at_mentions() {
        let mentions = extract_mentions("hi @@s1@test.com,@@s2@test.com");
        assert_eq!(mentions, vec!["s1@test.com", "s2@test.com"]);
    }

    #[test]
    fn test_plain_address_is_not_a_mention() {
        assert!(extract_mentions("please tell s1@test.com").is_empty());
    }

    #[test]
    fn test_match_at_start_is_ignored() {
        assert!(extract_mentions("s1@test.com is away").is_empty());
    }

    #[test]
    fn test_single_extra_at_is_enough() {
        assert_eq!(extract_mentions("hey @s3@test.com!"), vec!["s3@test.com"]);
    }

    #[test]
    fn test_duplicates_preserved_in_order() {
        let mentions = extract_mentions("@@b@test.com @@a@test.com @@b@test.com");
        assert_eq!(mentions, vec!["b@test.com", "a@test.com", "b@test.com"]);
    }

    #[test]
    fn test_mention_never_starts_inside_consumed_address() {
        // `ab@cd` is scanned first and starts the text; the rest is `@e.com`.
        assert!(extract_mentions("ab@cd@e.com").is_empty());
    }

    #[test]
    fn test_plain_address_next_to_mention() {
        assert_eq!(extract_mentions("x@y @@s1@test.com"), vec!["s1@test.com"]);
        assert_eq!(extract_mentions("hi x@y@@s1@test.com"), vec!["s1@test.com"]);
    }

    #[test]
    fn test_trailing_punctuation_is_not_part_of_domain() {
        assert_eq!(
            extract_mentions("ping @@s1@test.com."),
            vec!["s1@test.com"]
        );
    }

    #[test]
    fn test_empty_text() {
        assert!(extract_mentions("").is_empty());
        assert!(extract_mentions("@@").is_empty());
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("teacherken@gmail.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("@@s1@test.com"));
        assert!(!is_valid_email("a@b.com trailing"));
        assert!(!is_valid_email(""));
    }
}
