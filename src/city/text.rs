use unicode_normalization::UnicodeNormalization;

/// Offset from an ASCII capital to its regional indicator symbol.
const REGIONAL_INDICATOR_OFFSET: u32 = 0x1F1E6 - 'A' as u32;

/// URL-safe identifier: accents folded, other non-ASCII dropped, every run of
/// non-alphanumerics collapsed to a single `-`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;

    for c in value.nfkd().filter(char::is_ascii) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Emoji flag for a two-letter country code, or an empty string.
pub fn country_flag(country_code: &str) -> String {
    let code = country_code.trim().to_ascii_uppercase();
    if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_alphabetic()) {
        return String::new();
    }

    code.chars()
        .filter_map(|c| char::from_u32(c as u32 + REGIONAL_INDICATOR_OFFSET))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("São Paulo, Brazil"), "sao-paulo-brazil");
        assert_eq!(slugify("New   York!!!"), "new-york");
        assert_eq!(slugify("Zürich-CH"), "zurich-ch");
        assert_eq!(slugify("  --Kraków--  "), "krakow");
        assert_eq!(slugify("東京"), "");
        assert_eq!(slugify("Ho Chi Minh City-VN"), "ho-chi-minh-city-vn");
    }

    #[test]
    fn test_country_flag() {
        assert_eq!(country_flag("es"), "🇪🇸");
        assert_eq!(country_flag(" JP "), "🇯🇵");
        assert_eq!(country_flag("USA"), "");
        assert_eq!(country_flag("1A"), "");
        assert_eq!(country_flag(""), "");
        assert_eq!(country_flag("É1"), "");
    }
}
