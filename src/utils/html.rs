// src/utils/html.rs

/// Sanitizes admin-entered quiz text with ammonia's whitelist.
/// Safe inline markup survives; scripts and event handlers are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input.map(clean_html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_are_removed() {
        assert_eq!(
            clean_html("Đồng bằng <b>sông Hồng</b><script>alert(1)</script>"),
            "Đồng bằng <b>sông Hồng</b>"
        );
        let link = clean_html(r#"<a href="https://gso.gov.vn" onclick="x()">GSO</a>"#);
        assert!(link.contains(r#"href="https://gso.gov.vn""#));
        assert!(!link.contains("onclick"));
    }

    #[test]
    fn missing_text_stays_missing() {
        assert_eq!(clean_optional(None), None);
        assert_eq!(clean_optional(Some("plain")), Some("plain".to_string()));
    }
}
