use super::GcsError;

/// Checks the bucket naming rules enforced before a bucket is created:
/// letters, digits, `-`, `_` and `.`, starting and ending with a letter or
/// digit, between 3 and 63 characters long.
pub fn validate_bucket_name(name: &str) -> Result<(), GcsError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
    if name.is_empty() || !name.chars().all(allowed) {
        return Err(GcsError::InvalidBucketName(
            "Bucket names can only contain letters, numbers, -, _, or .",
        ));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(GcsError::InvalidBucketName(
            "Bucket names can only start with letters or numbers.",
        ));
    }
    if !name.ends_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(GcsError::InvalidBucketName(
            "Bucket names can only end with letters or numbers.",
        ));
    }
    if !(3..=63).contains(&name.len()) {
        return Err(GcsError::InvalidBucketName(
            "Bucket names must contain 3 to 63 letters.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        for name in ["abc", "my-bucket_01", "logs.example.com", "a".repeat(63).as_str()] {
            assert!(validate_bucket_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_invalid_names() {
        let cases = [
            ("", "contain"),
            ("has space", "contain"),
            ("UPPER!", "contain"),
            ("-leading", "start"),
            ("trailing.", "end"),
            ("ab", "3 to 63"),
        ];
        for (name, needle) in cases {
            let err = validate_bucket_name(name).unwrap_err().to_string();
            assert!(err.contains(needle), "{name}: {err}");
        }
        assert!(validate_bucket_name(&"a".repeat(64)).is_err());
    }
}
