//! Catalogue entities owned by the eSIM provider.

use serde::{Deserialize, Serialize};

/// A country covered by a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// Display name.
    pub name: String,
    /// Region the country belongs to (e.g. `"Europe"`).
    #[serde(default)]
    pub region: String,
    /// ISO 3166 alpha-2 code.
    pub iso: String,
}

/// How the provider bills a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingType {
    /// One-off fixed price.
    FixedCost,
    /// Prepaid balance.
    #[serde(rename = "prepaid")]
    Prepaid,
    /// Billed after use.
    #[serde(rename = "postpaid")]
    Postpaid,
    /// Any tag this crate does not know about.
    #[serde(other)]
    Other,
}

/// A data bundle from the provider catalogue.
///
/// Read-only from this system's point of view; `name` is the primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Unique catalogue name, used as the order `item`.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Catalogue groups the bundle belongs to.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Countries the bundle covers.
    #[serde(default)]
    pub countries: Vec<Country>,
    /// Data allotment in bytes. Meaningless when `unlimited` is set.
    #[serde(default)]
    pub data_amount: i64,
    /// Validity in days.
    #[serde(default)]
    pub duration: u32,
    /// Speed tiers, if the provider publishes them.
    #[serde(default)]
    pub speed: Option<Vec<String>>,
    /// Whether the bundle starts on first network attach.
    #[serde(default)]
    pub autostart: bool,
    /// Whether the data allotment is unlimited.
    #[serde(default)]
    pub unlimited: bool,
    /// Countries where roaming is enabled.
    #[serde(default)]
    pub roaming_enabled: Vec<Country>,
    /// Provider price in USD major units.
    pub price: f64,
    /// Billing model tag.
    #[serde(default = "default_billing_type")]
    pub billing_type: BillingType,
    /// Optional artwork URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

const fn default_billing_type() -> BillingType {
    BillingType::FixedCost
}

/// Filters for a catalogue listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleQuery {
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Page size.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Comma-separated ISO codes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countries: Option<String>,
    /// Region filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Catalogue group filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

const fn default_page() -> u32 {
    1
}

const fn default_per_page() -> u32 {
    50
}

impl Default for BundleQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
            countries: None,
            region: None,
            group: None,
        }
    }
}

impl BundleQuery {
    /// Returns the query as `(key, value)` pairs, skipping unset and empty filters.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("perPage", self.per_page.to_string()),
        ];
        let filters = [
            ("countries", &self.countries),
            ("region", &self.region),
            ("group", &self.group),
        ];
        for (key, value) in filters {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                pairs.push((key, value.to_owned()));
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_deserialize_provider_shape() {
        let json = serde_json::json!({
            "name": "esim_1GB_7D_FR_V2",
            "description": "eSIM, 1GB, 7 Days, France, V2",
            "groups": ["Standard Fixed"],
            "countries": [{"name": "France", "region": "Europe", "iso": "FR"}],
            "dataAmount": 1000,
            "duration": 7,
            "speed": null,
            "autostart": true,
            "unlimited": false,
            "roamingEnabled": [],
            "price": 1.99,
            "billingType": "FixedCost"
        });
        let bundle: Bundle = serde_json::from_value(json).unwrap();
        assert_eq!(bundle.name, "esim_1GB_7D_FR_V2");
        assert_eq!(bundle.countries[0].iso, "FR");
        assert_eq!(bundle.billing_type, BillingType::FixedCost);
        assert!(bundle.speed.is_none());
        assert!((bundle.price - 1.99).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bundle_tolerates_unknown_billing_type_and_missing_fields() {
        let json = serde_json::json!({
            "name": "esim_UL_1D_US",
            "price": 3,
            "unlimited": true,
            "dataAmount": -1,
            "billingType": "subscription"
        });
        let bundle: Bundle = serde_json::from_value(json).unwrap();
        assert_eq!(bundle.billing_type, BillingType::Other);
        assert!(bundle.unlimited);
        assert!(bundle.countries.is_empty());
    }

    #[test]
    fn test_query_pairs_skip_empty_filters() {
        let query = BundleQuery {
            countries: Some("FR,DE".to_owned()),
            region: Some(String::new()),
            ..BundleQuery::default()
        };
        let pairs = query.to_pairs();
        assert_eq!(
            pairs,
            vec![
                ("page", "1".to_owned()),
                ("perPage", "50".to_owned()),
                ("countries", "FR,DE".to_owned()),
            ]
        );
    }
}
