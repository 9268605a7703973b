//! Input recognition helpers shared by the conversation and the media layer.

/// Host markers a message must contain to be treated as a video link.
pub const SUPPORTED_HOST_MARKERS: &[&str] = &["youtube.com", "youtu.be"];

/// Check whether text looks like a supported video link.
///
/// Recognition is substring based only; malformed URLs surface later as a
/// fetch failure.
pub fn is_supported_url(text: &str) -> bool {
    SUPPORTED_HOST_MARKERS
        .iter()
        .any(|marker| text.contains(marker))
}

/// Parse a number of seconds typed by a user.
///
/// Accepts surrounding whitespace. Thousands separators are not understood,
/// so `"1,000"` is rejected rather than guessed at. Rejects NaN and
/// infinities.
pub fn parse_seconds(text: &str) -> Option<f64> {
    let value: f64 = text.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported_url() {
        assert!(is_supported_url("https://youtube.com/watch?v=abc"));
        assert!(is_supported_url("https://www.youtube.com/shorts/abc"));
        assert!(is_supported_url("https://youtu.be/abc"));
        assert!(is_supported_url("look at this youtu.be/abc please"));
        assert!(!is_supported_url("https://vimeo.com/123"));
        assert!(!is_supported_url("hello"));
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("30"), Some(30.0));
        assert_eq!(parse_seconds(" 12.5 \n"), Some(12.5));
        assert_eq!(parse_seconds("1,000"), None);
        assert_eq!(parse_seconds("12,5"), None);
        assert_eq!(parse_seconds("-3"), Some(-3.0));
        assert_eq!(parse_seconds("abc"), None);
        assert_eq!(parse_seconds(""), None);
        assert_eq!(parse_seconds("inf"), None);
        assert_eq!(parse_seconds("NaN"), None);
    }
}
