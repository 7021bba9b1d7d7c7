/// Validates the characters of a username.
///
/// Letters, digits, underscores, hyphens and dots are allowed. Length is
/// checked separately by the `length` rule.
pub fn username_chars(username: &str, _context: &()) -> garde::Result {
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(garde::Error::new(
            "can only contain letters, numbers, underscores, hyphens and dots",
        ));
    }

    Ok(())
}

/// Rejects names made only of whitespace. Empty names are allowed.
pub fn not_blank_if_present(name: &str, _context: &()) -> garde::Result {
    if !name.is_empty() && name.trim().is_empty() {
        return Err(garde::Error::new("cannot be only whitespace"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(username_chars("ann", &()).is_ok());
        assert!(username_chars("ann.lee_2-x", &()).is_ok());
        assert!(username_chars("ann lee", &()).is_err());
        assert!(username_chars("änn", &()).is_err());
        assert!(username_chars("ann<script>", &()).is_err());
    }

    #[test]
    fn names() {
        assert!(not_blank_if_present("", &()).is_ok());
        assert!(not_blank_if_present("Ann", &()).is_ok());
        assert!(not_blank_if_present("   ", &()).is_err());
    }
}
