use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::domain::{DecisionOutcome, DelayReason};

/// Contiguous inclusive range of delay minutes mapped to a fixed payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutTier {
    pub id: String,
    pub min_delay_minutes: u32,
    pub max_delay_minutes: u32,
    #[serde(rename = "payoutAmountUSD")]
    pub payout_amount_usd: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityConfig {
    pub claim_window_hours: u32,
    pub max_days_to_file: u32,
}

/// Named delay-reason category that, when enabled, unconditionally denies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exclusion {
    pub id: String,
    pub reason: DelayReason,
    pub label: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonCode {
    pub code: String,
    pub description: String,
    pub outcome: DecisionOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceKind {
    Stub,
    Live,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceConfig {
    pub kind: DataSourceKind,
    pub provider: String,
}

/// Complete rule configuration for one product version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductConfig {
    pub payout_tiers: Vec<PayoutTier>,
    pub eligibility: EligibilityConfig,
    pub exclusions: Vec<Exclusion>,
    pub reason_codes: Vec<ReasonCode>,
    pub data_source: DataSourceConfig,
}

/// Data-integrity faults in a stored configuration. These are fatal and
/// surfaced loudly during resolution, never converted into a denial.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigIntegrityError {
    #[error("configuration has no payout tiers")]
    NoTiers,
    #[error("tier {id} has max delay {max} below min delay {min}")]
    InvertedTier { id: String, min: u32, max: u32 },
    #[error("tiers {first} and {second} overlap; a delay must match exactly one tier")]
    OverlappingTiers { first: String, second: String },
    #[error("gap between tiers {first} and {second} would silently deny valid delays")]
    TierGap { first: String, second: String },
}

impl ProductConfig {
    /// Check the tier-table invariants: non-empty, each range well-formed,
    /// and consecutive ranges contiguous so exactly one tier (or none)
    /// matches any delay.
    pub fn validate(&self) -> Result<(), ConfigIntegrityError> {
        if self.payout_tiers.is_empty() {
            return Err(ConfigIntegrityError::NoTiers);
        }

        for tier in &self.payout_tiers {
            if tier.max_delay_minutes < tier.min_delay_minutes {
                return Err(ConfigIntegrityError::InvertedTier {
                    id: tier.id.clone(),
                    min: tier.min_delay_minutes,
                    max: tier.max_delay_minutes,
                });
            }
        }

        for pair in self.payout_tiers.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.min_delay_minutes <= prev.max_delay_minutes {
                return Err(ConfigIntegrityError::OverlappingTiers {
                    first: prev.id.clone(),
                    second: next.id.clone(),
                });
            }
            if next.min_delay_minutes > prev.max_delay_minutes + 1 {
                return Err(ConfigIntegrityError::TierGap {
                    first: prev.id.clone(),
                    second: next.id.clone(),
                });
            }
        }

        Ok(())
    }

    /// Content fingerprint binding decisions to the exact configuration
    /// used: SHA-256 over the canonical JSON form, truncated to 16 hex
    /// characters. Identical content always hashes identically.
    pub fn content_hash(&self) -> String {
        let canonical =
            serde_json::to_vec(self).expect("product config serializes to canonical JSON");
        let digest = Sha256::digest(&canonical);
        digest[..8].iter().map(|byte| format!("{byte:02x}")).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Draft,
    Published,
}

/// Immutable snapshot of one published or draft configuration revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVersion {
    pub version: String,
    pub hash: String,
    pub config: ProductConfig,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub status: VersionStatus,
}

impl ProductVersion {
    pub fn new(
        version: impl Into<String>,
        config: ProductConfig,
        created_at: DateTime<Utc>,
        published_at: Option<DateTime<Utc>>,
    ) -> Self {
        let status = if published_at.is_some() {
            VersionStatus::Published
        } else {
            VersionStatus::Draft
        };
        Self {
            version: version.into(),
            hash: config.content_hash(),
            config,
            created_at,
            published_at,
            status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Draft,
    Active,
    Archived,
}

/// A claims product and its version history, newest version first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: ProductStatus,
    pub active_version: String,
    pub versions: Vec<ProductVersion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn find_version(&self, label: &str) -> Option<&ProductVersion> {
        self.versions.iter().find(|v| v.version == label)
    }

    pub fn newest_version(&self) -> Option<&ProductVersion> {
        self.versions.first()
    }

    /// Derive a new product value with an additional version prepended.
    /// Existing versions are never edited in place, which keeps the audit
    /// trail of already-issued decisions intact.
    pub fn with_new_version(
        &self,
        config: ProductConfig,
        publish: bool,
        now: DateTime<Utc>,
    ) -> Product {
        let label = next_version_label(self.newest_version().map(|v| v.version.as_str()));
        let published_at = publish.then_some(now);
        let version = ProductVersion::new(label.clone(), config, now, published_at);

        let mut versions = Vec::with_capacity(self.versions.len() + 1);
        versions.push(version);
        versions.extend(self.versions.iter().cloned());

        Product {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            status: if publish {
                ProductStatus::Active
            } else {
                self.status
            },
            active_version: if publish {
                label
            } else {
                self.active_version.clone()
            },
            versions,
            created_at: self.created_at,
            updated_at: now,
        }
    }
}

/// Compute the next `vMAJOR.MINOR` label by bumping the minor component of
/// the newest existing version, starting from `v0.1` for a bare product.
pub(crate) fn next_version_label(current: Option<&str>) -> String {
    let (major, minor) = current
        .and_then(parse_version_label)
        .unwrap_or((0, 0));
    format!("v{major}.{}", minor + 1)
}

fn parse_version_label(label: &str) -> Option<(u32, u32)> {
    let rest = label.strip_prefix('v')?;
    let mut parts = rest.splitn(2, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().unwrap_or("0").parse().ok()?;
    Some((major, minor))
}

/// Reusable starting configurations for minting new products.
pub mod templates {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProductTemplate {
        pub id: String,
        pub name: String,
        pub description: String,
        pub region: String,
        pub config: ProductConfig,
    }

    pub fn all() -> Vec<ProductTemplate> {
        vec![
            ProductTemplate {
                id: "template-flight-delay-standard".to_string(),
                name: "Flight Delay - Standard".to_string(),
                description: "Standard flight delay coverage with 4 payout tiers".to_string(),
                region: "Global".to_string(),
                config: standard_config(),
            },
            ProductTemplate {
                id: "template-flight-delay-premium".to_string(),
                name: "Flight Delay - Premium".to_string(),
                description: "Premium flight delay coverage with higher payouts and fewer exclusions"
                    .to_string(),
                region: "Global".to_string(),
                config: premium_config(),
            },
            ProductTemplate {
                id: "template-flight-delay-budget".to_string(),
                name: "Flight Delay - Budget".to_string(),
                description: "Basic flight delay coverage with lower payouts and standard exclusions"
                    .to_string(),
                region: "Global".to_string(),
                config: budget_config(),
            },
        ]
    }

    pub(crate) fn tier(id: &str, min: u32, max: u32, payout: u32) -> PayoutTier {
        PayoutTier {
            id: id.to_string(),
            min_delay_minutes: min,
            max_delay_minutes: max,
            payout_amount_usd: payout,
        }
    }

    pub(crate) fn exclusion(id: &str, reason: DelayReason, label: &str, enabled: bool) -> Exclusion {
        Exclusion {
            id: id.to_string(),
            reason,
            label: label.to_string(),
            enabled,
        }
    }

    fn reason_code(code: &str, description: &str, outcome: DecisionOutcome) -> ReasonCode {
        ReasonCode {
            code: code.to_string(),
            description: description.to_string(),
            outcome,
        }
    }

    pub(crate) fn standard_exclusions() -> Vec<Exclusion> {
        vec![
            exclusion("exc-1", DelayReason::Weather, "Weather-related delays", false),
            exclusion(
                "exc-2",
                DelayReason::Carrier,
                "Carrier-initiated cancellations",
                false,
            ),
            exclusion(
                "exc-3",
                DelayReason::ForceMajeure,
                "Force majeure / Acts of God",
                true,
            ),
            exclusion("exc-4", DelayReason::CrewStrike, "Crew strikes", true),
        ]
    }

    pub(crate) fn standard_reason_codes() -> Vec<ReasonCode> {
        use DecisionOutcome::{Approved, Denied};
        vec![
            reason_code("APPROVED_TIER_1", "Approved: Delay 1-2 hours", Approved),
            reason_code("APPROVED_TIER_2", "Approved: Delay 2-4 hours", Approved),
            reason_code("APPROVED_TIER_3", "Approved: Delay 4-8 hours", Approved),
            reason_code("APPROVED_TIER_4", "Approved: Delay 8+ hours", Approved),
            reason_code("DENIED_NO_DELAY", "Denied: No qualifying delay", Denied),
            reason_code(
                "DENIED_OUTSIDE_WINDOW",
                "Denied: Claim outside eligibility window",
                Denied,
            ),
            reason_code("DENIED_EXCLUSION", "Denied: Exclusion applies", Denied),
            reason_code(
                "DENIED_INVALID_FLIGHT",
                "Denied: Flight data not found",
                Denied,
            ),
        ]
    }

    pub(crate) fn stub_data_source() -> DataSourceConfig {
        DataSourceConfig {
            kind: DataSourceKind::Stub,
            provider: "FlightAware (Stub)".to_string(),
        }
    }

    pub fn standard_config() -> ProductConfig {
        ProductConfig {
            payout_tiers: vec![
                tier("tier-1", 60, 120, 50),
                tier("tier-2", 121, 240, 100),
                tier("tier-3", 241, 480, 200),
                tier("tier-4", 481, 9999, 400),
            ],
            eligibility: EligibilityConfig {
                claim_window_hours: 72,
                max_days_to_file: 30,
            },
            exclusions: standard_exclusions(),
            reason_codes: standard_reason_codes(),
            data_source: stub_data_source(),
        }
    }

    pub fn premium_config() -> ProductConfig {
        ProductConfig {
            payout_tiers: vec![
                tier("tier-1", 60, 120, 100),
                tier("tier-2", 121, 240, 200),
                tier("tier-3", 241, 480, 400),
                tier("tier-4", 481, 9999, 800),
            ],
            eligibility: EligibilityConfig {
                claim_window_hours: 168,
                max_days_to_file: 60,
            },
            exclusions: vec![
                exclusion("exc-1", DelayReason::Weather, "Weather-related delays", false),
                exclusion(
                    "exc-2",
                    DelayReason::Carrier,
                    "Carrier-initiated cancellations",
                    false,
                ),
                exclusion(
                    "exc-3",
                    DelayReason::ForceMajeure,
                    "Force majeure / Acts of God",
                    true,
                ),
                exclusion("exc-4", DelayReason::CrewStrike, "Crew strikes", false),
            ],
            reason_codes: standard_reason_codes(),
            data_source: stub_data_source(),
        }
    }

    pub fn budget_config() -> ProductConfig {
        ProductConfig {
            payout_tiers: vec![
                tier("tier-1", 120, 240, 25),
                tier("tier-2", 241, 480, 50),
                tier("tier-3", 481, 9999, 100),
            ],
            eligibility: EligibilityConfig {
                claim_window_hours: 48,
                max_days_to_file: 14,
            },
            exclusions: vec![
                exclusion("exc-1", DelayReason::Weather, "Weather-related delays", true),
                exclusion(
                    "exc-2",
                    DelayReason::Carrier,
                    "Carrier-initiated cancellations",
                    true,
                ),
                exclusion(
                    "exc-3",
                    DelayReason::ForceMajeure,
                    "Force majeure / Acts of God",
                    true,
                ),
                exclusion("exc-4", DelayReason::CrewStrike, "Crew strikes", true),
            ],
            reason_codes: standard_reason_codes(),
            data_source: stub_data_source(),
        }
    }
}
