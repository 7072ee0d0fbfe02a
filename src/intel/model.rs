use serde::{Deserialize, Serialize};

/// Transit profile for one metropolitan area.
///
/// Decoding is all-or-nothing: a missing mandatory field or an unknown
/// transport type rejects the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityIntel {
    pub authorities: Vec<Authority>,
    pub modes: Vec<TransportMode>,
    pub payment_methods: Vec<PaymentMethod>,
    pub operating_hours: OperatingHours,
    pub rideshare: Vec<RideshareOption>,
    pub airport_connections: Vec<AirportConnection>,
    pub delay_info: Vec<DelaySource>,
    pub tips: String,
}

impl CityIntel {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn has_mode(&self, kind: TransportType) -> bool {
        self.modes.iter().any(|m| m.kind == kind)
    }

    pub fn accepts_contactless(&self) -> bool {
        self.payment_methods.iter().any(|p| {
            format!("{} {}", p.method, p.details)
                .to_lowercase()
                .contains("contactless")
        })
    }

    pub fn available_rideshare(&self) -> Vec<&str> {
        self.rideshare
            .iter()
            .filter(|r| r.available)
            .map(|r| r.provider.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authority {
    pub name: String,
    pub website: String,
    pub apps: Vec<AuthorityApp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityApp {
    pub name: String,
    #[serde(default)]
    pub ios_url: Option<String>,
    #[serde(default)]
    pub android_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    Metro,
    LightRail,
    Bus,
    Tram,
    Train,
    Ferry,
    Monorail,
    CableCar,
    Funicular,
    Brt,
    Other,
}

impl TransportType {
    pub const ALL: [TransportType; 11] = [
        TransportType::Metro,
        TransportType::LightRail,
        TransportType::Bus,
        TransportType::Tram,
        TransportType::Train,
        TransportType::Ferry,
        TransportType::Monorail,
        TransportType::CableCar,
        TransportType::Funicular,
        TransportType::Brt,
        TransportType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportType::Metro => "metro",
            TransportType::LightRail => "light_rail",
            TransportType::Bus => "bus",
            TransportType::Tram => "tram",
            TransportType::Train => "train",
            TransportType::Ferry => "ferry",
            TransportType::Monorail => "monorail",
            TransportType::CableCar => "cable_car",
            TransportType::Funicular => "funicular",
            TransportType::Brt => "brt",
            TransportType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportMode {
    #[serde(rename = "type")]
    pub kind: TransportType,
    pub operator: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub method: String,
    pub details: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingHours {
    pub weekday: String,
    pub weekend: String,
    #[serde(default)]
    pub night_service: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideshareOption {
    pub provider: String,
    pub available: bool,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportConnection {
    pub mode: String,
    pub name: String,
    pub duration: String,
    pub cost: String,
    #[serde(default)]
    pub info_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelaySource {
    pub source: String,
    pub url: String,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::CityIntel;

    pub(crate) const BARCELONA_JSON: &str = include_str!("../../fixtures/barcelona.json");

    pub(crate) fn barcelona() -> CityIntel {
        CityIntel::from_json(BARCELONA_JSON).expect("fixture must be valid city intel")
    }

    /// Minimal valid document whose only URLs are the ones given.
    pub(crate) fn with_urls(website: &str, delay_url: &str) -> String {
        serde_json::json!({
            "authorities": [{"name": "Transit Authority", "website": website, "apps": []}],
            "modes": [{"type": "metro", "operator": "Metro Co", "notes": "Frequent service"}],
            "payment_methods": [{"method": "Card", "details": "Tap to pay", "url": null}],
            "operating_hours": {"weekday": "05:00-23:00", "weekend": "06:00-23:00", "night_service": null},
            "rideshare": [{"provider": "Uber", "available": true, "notes": "Available"}],
            "airport_connections": [{"mode": "metro", "name": "Airport Line", "duration": "30 min", "cost": "$5", "info_url": null}],
            "delay_info": [{"source": "Status", "url": delay_url}],
            "tips": "Use the metro for business districts."
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> serde_json::Value {
        serde_json::from_str(&fixtures::with_urls(
            "https://example.com",
            "https://example.com/status",
        ))
        .unwrap()
    }

    #[test]
    fn test_fixture_parses() {
        let intel = fixtures::barcelona();
        assert!(!intel.authorities.is_empty());
        assert!(intel.has_mode(TransportType::Metro));
    }

    #[test]
    fn test_accepts_light_rail_mode() {
        let mut doc = minimal();
        doc["modes"][0]["type"] = json!("light_rail");
        let intel: CityIntel = serde_json::from_value(doc).unwrap();
        assert_eq!(intel.modes[0].kind, TransportType::LightRail);
    }

    #[test]
    fn test_rejects_unknown_transport_type() {
        let mut doc = minimal();
        doc["modes"][0]["type"] = json!("hovercraft");
        let err = serde_json::from_value::<CityIntel>(doc).unwrap_err();
        assert!(err.to_string().contains("hovercraft"));
    }

    #[test]
    fn test_rejects_missing_mandatory_field() {
        let mut doc = minimal();
        doc["operating_hours"].as_object_mut().unwrap().remove("weekend");
        assert!(serde_json::from_value::<CityIntel>(doc).is_err());
    }

    #[test]
    fn test_rejects_missing_section() {
        let mut doc = minimal();
        doc.as_object_mut().unwrap().remove("tips");
        assert!(serde_json::from_value::<CityIntel>(doc).is_err());
    }

    #[test]
    fn test_optional_fields_may_be_absent() {
        let mut doc = minimal();
        doc["payment_methods"][0].as_object_mut().unwrap().remove("url");
        doc["operating_hours"]
            .as_object_mut()
            .unwrap()
            .remove("night_service");
        let intel: CityIntel = serde_json::from_value(doc).unwrap();
        assert_eq!(intel.payment_methods[0].url, None);
        assert_eq!(intel.operating_hours.night_service, None);
    }

    #[test]
    fn test_round_trip_is_identity() {
        let intel = fixtures::barcelona();
        let json = serde_json::to_string(&intel).unwrap();
        assert_eq!(CityIntel::from_json(&json).unwrap(), intel);
    }

    #[test]
    fn test_transport_type_names_match_serde() {
        for kind in TransportType::ALL {
            let encoded = serde_json::to_value(kind).unwrap();
            assert_eq!(encoded, json!(kind.as_str()));
        }
    }

    #[test]
    fn test_card_helpers() {
        let intel = fixtures::barcelona();
        assert!(intel.accepts_contactless());
        assert_eq!(intel.available_rideshare(), vec!["Cabify", "Bolt"]);
    }
}
