use super::links::InvalidLink;
use super::model::TransportType;

/// Most invalid URLs spelled out in a correction before the rest are summarized.
pub const MAX_LISTED_LINKS: usize = 10;

pub fn system_prompt() -> String {
    let transport_types = TransportType::ALL
        .iter()
        .map(TransportType::as_str)
        .collect::<Vec<_>>()
        .join("|");

    format!(
        "You are a transport intelligence analyst for business travelers. \
        Research city transport and return only valid JSON that matches this schema exactly:\n\
        {{\
        \"authorities\":[{{\"name\":\"string\",\"website\":\"string\",\"apps\":[{{\"name\":\"string\",\"ios_url\":\"string|null\",\"android_url\":\"string|null\"}}]}}],\
        \"modes\":[{{\"type\":\"{transport_types}\",\"operator\":\"string\",\"notes\":\"string\"}}],\
        \"payment_methods\":[{{\"method\":\"string\",\"details\":\"string\",\"url\":\"string|null\"}}],\
        \"operating_hours\":{{\"weekday\":\"string\",\"weekend\":\"string\",\"night_service\":\"string|null\"}},\
        \"rideshare\":[{{\"provider\":\"string\",\"available\":true,\"notes\":\"string\"}}],\
        \"airport_connections\":[{{\"mode\":\"string\",\"name\":\"string\",\"duration\":\"string\",\"cost\":\"string\",\"info_url\":\"string|null\"}}],\
        \"delay_info\":[{{\"source\":\"string\",\"url\":\"string\"}}],\
        \"tips\":\"string\"\
        }}\n\
        Rules:\n\
        - Research all transport options in the metropolitan area, not just city proper.\n\
        - Include regional/suburban services a traveler from city center might use.\n\
        - Include only authorities a traveler directly interacts with.\n\
        - Write all text in English.\n\
        - Prefer official English-language pages. If none exists, use the official \"-en\" URL variant when available, \
        otherwise the official page in the local language. Never invent URLs.\n\
        - For each authority app, include direct App Store and Google Play links when known, otherwise null.\n\
        - When a payment method names a specific branded pass or card, include its official product URL.\n\
        - Costs must be in local currency with symbols where possible.\n\
        - No markdown. No explanation. JSON only."
    )
}

pub fn user_prompt(city_name: &str, country: &str) -> String {
    format!(
        "Generate transport intelligence JSON for {city_name}, {country}. \
        Practical guidance for a business traveler staying 2-5 days."
    )
}

pub fn schema_correction(error: &str) -> String {
    format!(
        "Your previous response was invalid JSON or failed schema validation. \
        Error: {error}. Return corrected JSON only, no markdown."
    )
}

pub fn link_correction(invalid: &[InvalidLink]) -> String {
    let mut prompt = String::from(
        "Your previous response contained URLs that could not be verified as live:\n",
    );

    for link in invalid.iter().take(MAX_LISTED_LINKS) {
        prompt.push_str(&format!("- {} ({})\n", link.url, link.reason));
    }
    if invalid.len() > MAX_LISTED_LINKS {
        prompt.push_str(&format!("(+{} more)\n", invalid.len() - MAX_LISTED_LINKS));
    }

    prompt.push_str(
        "Replace each with a working official URL, or use null where the field allows it. \
        Do not invent URLs. Return the full corrected JSON only, no markdown.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid(n: usize) -> Vec<InvalidLink> {
        (0..n)
            .map(|i| InvalidLink {
                url: format!("https://example.com/{i}"),
                reason: "HTTP 404".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_system_prompt_lists_every_transport_type() {
        let prompt = system_prompt();
        assert!(prompt.contains(
            "metro|light_rail|bus|tram|train|ferry|monorail|cable_car|funicular|brt|other"
        ));
        assert!(prompt.contains("\"ios_url\""));
        assert!(prompt.contains("\"info_url\""));
        assert!(prompt.contains("JSON only"));
    }

    #[test]
    fn test_system_prompt_schema_is_valid_json_shape() {
        let prompt = system_prompt();
        let start = prompt.find('{').unwrap();
        let end = prompt.find("}\nRules").unwrap();
        let schema: serde_json::Value = serde_json::from_str(&prompt[start..=end]).unwrap();
        assert!(schema["operating_hours"].is_object());
        assert!(schema["authorities"][0]["apps"].is_array());
    }

    #[test]
    fn test_user_prompt_names_city_and_country() {
        assert_eq!(
            user_prompt("Sydney", "Australia"),
            "Generate transport intelligence JSON for Sydney, Australia. \
            Practical guidance for a business traveler staying 2-5 days."
        );
    }

    #[test]
    fn test_schema_correction_includes_error() {
        let prompt = schema_correction("missing field `tips`");
        assert!(prompt.contains("missing field `tips`"));
        assert!(prompt.contains("corrected JSON only"));
    }

    #[test]
    fn test_link_correction_lists_all_when_short() {
        let prompt = link_correction(&invalid(3));
        assert!(prompt.contains("- https://example.com/2 (HTTP 404)"));
        assert!(!prompt.contains("more)"));
    }

    #[test]
    fn test_link_correction_caps_listing() {
        let prompt = link_correction(&invalid(13));
        assert!(prompt.contains("https://example.com/9 "));
        assert!(!prompt.contains("https://example.com/10 "));
        assert!(prompt.contains("(+3 more)"));
    }
}
