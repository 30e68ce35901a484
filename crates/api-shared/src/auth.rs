/// Header carrying the id of the user an upload belongs to.
///
/// Authentication happens in front of this service; the header is trusted as given.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Normalises a raw owner header value. Blank values count as absent.
pub fn owner_from_header(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_from_header() {
        assert_eq!(owner_from_header(Some(" u1 ")), Some("u1".to_string()));
        assert_eq!(owner_from_header(Some("  ")), None);
        assert_eq!(owner_from_header(None), None);
    }
}
