use reqwest::Url;

pub const LIST_URL: &str = "https://www.kaa.org.tw/law_list.php";

/// Collapse whitespace runs to single spaces and trim.
pub fn clean_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Label cell text with half- and full-width colons stripped.
pub fn normalize_label(value: &str) -> String {
    clean_text(value).replace([':', '：'], "")
}

/// Resolve a possibly relative href against the listing URL.
pub fn absolute_url(href: Option<&str>) -> Option<String> {
    let href = href?.trim();
    if href.is_empty() {
        return None;
    }
    let base = Url::parse(LIST_URL).ok()?;
    base.join(href).ok().map(|url| url.to_string())
}

/// Listing endpoint for a page; page 1 is the bare URL, later pages use `b=`.
pub fn build_list_url(page: u64) -> String {
    if page <= 1 {
        LIST_URL.to_string()
    } else {
        format!("{LIST_URL}?b={page}")
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  內政部 \n\t 國土管理署  "), "內政部 國土管理署");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn normalize_label_strips_colons() {
        assert_eq!(normalize_label("發文日期："), "發文日期");
        assert_eq!(normalize_label(" 發文單位: "), "發文單位");
    }

    #[test]
    fn absolute_url_resolves_relative_hrefs() {
        assert_eq!(
            absolute_url(Some("law_view.php?id=2101")).as_deref(),
            Some("https://www.kaa.org.tw/law_view.php?id=2101")
        );
        assert_eq!(
            absolute_url(Some("/files/rule.pdf")).as_deref(),
            Some("https://www.kaa.org.tw/files/rule.pdf")
        );
        assert_eq!(
            absolute_url(Some("https://example.org/a")).as_deref(),
            Some("https://example.org/a")
        );
    }

    #[test]
    fn absolute_url_rejects_missing_or_empty() {
        assert_eq!(absolute_url(None), None);
        assert_eq!(absolute_url(Some("")), None);
        assert_eq!(absolute_url(Some("   ")), None);
    }

    #[test]
    fn list_url_for_first_and_later_pages() {
        assert_eq!(build_list_url(1), LIST_URL);
        assert_eq!(build_list_url(4), format!("{LIST_URL}?b=4"));
    }
}
