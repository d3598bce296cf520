pub const MIN_PASSWORD_LEN: usize = 8;
const MAX_EMAIL_LEN: usize = 255;

/// Trims and lower-cases an address. `None` unless it has a non-empty local
/// part and domain around a single `@`.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return None;
    }

    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }

    Some(email)
}

/// Trims and lower-cases a free-text name. `None` when blank.
pub fn normalize_name(raw: &str) -> Option<String> {
    let name = raw.trim().to_lowercase();
    (!name.is_empty()).then_some(name)
}

pub fn is_strong_enough(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  Jane.Doe@Example.COM "),
            Some("jane.doe@example.com".to_string())
        );
        assert_eq!(normalize_email("no-at-sign"), None);
        assert_eq!(normalize_email("@example.com"), None);
        assert_eq!(normalize_email("jane@"), None);
        assert_eq!(normalize_email("a@b@c"), None);
        assert_eq!(normalize_email("   "), None);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name(" Jane "), Some("jane".to_string()));
        assert_eq!(normalize_name("\t"), None);
    }

    #[test]
    fn test_password_length() {
        assert!(is_strong_enough("Passw0rd"));
        assert!(!is_strong_enough("short"));
    }
}
