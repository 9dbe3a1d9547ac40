use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Coarse geographic bucket used to pick a delivery endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Eu,
    Uk,
    Na,
    Asia,
    Other,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Eu => "eu",
            Region::Uk => "uk",
            Region::Na => "na",
            Region::Asia => "asia",
            Region::Other => "other",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// European Union member states
const EU_COUNTRIES: &[&str] = &[
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE", "IT",
    "LV", "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE",
];

// United Kingdom is routed separately from the EU
const UK_COUNTRIES: &[&str] = &["GB", "UK"];

const NA_COUNTRIES: &[&str] = &["US", "CA", "MX"];

// Asia Pacific
const ASIA_COUNTRIES: &[&str] = &[
    "JP", "KR", "CN", "SG", "AU", "NZ", "IN", "MY", "TH", "VN", "PH", "ID",
];

/// Country code to region lookup.
///
/// Keys are stored uppercased; lookups uppercase their input, so `"de"` and
/// `"DE"` resolve identically. Codes that are not present resolve to
/// [`Region::Other`].
#[derive(Debug, Clone)]
pub struct RegionMap {
    countries: HashMap<String, Region>,
}

impl RegionMap {
    /// Builds a map from `(country_code, region)` pairs.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Region)>,
        S: AsRef<str>,
    {
        let countries = entries
            .into_iter()
            .map(|(code, region)| (code.as_ref().trim().to_uppercase(), region))
            .collect();

        Self { countries }
    }

    /// Returns the region for a country code, or [`Region::Other`] when unknown.
    pub fn region_for(&self, country_code: &str) -> Region {
        self.countries
            .get(&country_code.to_uppercase())
            .copied()
            .unwrap_or(Region::Other)
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

impl Default for RegionMap {
    fn default() -> Self {
        let groups: [(&[&str], Region); 4] = [
            (EU_COUNTRIES, Region::Eu),
            (UK_COUNTRIES, Region::Uk),
            (NA_COUNTRIES, Region::Na),
            (ASIA_COUNTRIES, Region::Asia),
        ];

        Self::from_entries(
            groups
                .iter()
                .flat_map(|(codes, region)| codes.iter().map(move |code| (*code, *region))),
        )
    }
}

/// Region to destination endpoint lookup with a mandatory fallback.
#[derive(Debug, Clone)]
pub struct EndpointTable {
    endpoints: HashMap<Region, String>,
    default: String,
}

impl EndpointTable {
    /// Creates a table holding only the fallback endpoint.
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            endpoints: HashMap::new(),
            default: default.into(),
        }
    }

    /// Adds or replaces the endpoint for `region`.
    pub fn with_endpoint(mut self, region: Region, endpoint: impl Into<String>) -> Self {
        self.endpoints.insert(region, endpoint.into());
        self
    }

    /// Returns the endpoint for `region`, or the fallback when none is set.
    pub fn endpoint_for(&self, region: Region) -> &str {
        self.endpoints
            .get(&region)
            .map(String::as_str)
            .unwrap_or(&self.default)
    }
}

impl Default for EndpointTable {
    fn default() -> Self {
        EndpointTable::new("/api/lead")
            .with_endpoint(Region::Eu, "/api/lead/eu")
            .with_endpoint(Region::Uk, "/api/lead/uk")
            .with_endpoint(Region::Na, "/api/lead/na")
            .with_endpoint(Region::Asia, "/api/lead/asia")
            .with_endpoint(Region::Other, "/api/lead/intl")
    }
}

/// Read-only routing configuration shared by every submission.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    pub regions: RegionMap,
    pub endpoints: EndpointTable,
}

impl RoutingTable {
    pub fn new(regions: RegionMap, endpoints: EndpointTable) -> Self {
        Self { regions, endpoints }
    }

    pub fn resolve_region(&self, country_code: &str) -> Region {
        self.regions.region_for(country_code)
    }

    /// Maps a country code to its destination endpoint. Never fails: unknown
    /// codes fall through to the `other` region and then to the default.
    pub fn resolve_endpoint(&self, country_code: &str) -> &str {
        self.endpoints.endpoint_for(self.resolve_region(country_code))
    }
}
