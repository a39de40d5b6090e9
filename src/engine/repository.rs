use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};

use super::catalog::{
    templates, Product, ProductConfig, ProductStatus, ProductVersion,
};

/// Single source of truth for product configurations. The engine only ever
/// reads through this trait and performs no caching of its own; all
/// mutation is modeled as new immutable versions on the repository side.
pub trait ProductRepository: Send + Sync {
    fn get_product(&self, id: &str) -> Result<Option<Product>, RepositoryError>;
    fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;
    fn upsert_product(&self, product: Product) -> Result<(), RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("product store unavailable: {0}")]
    Unavailable(String),
}

/// In-memory repository returning cloned snapshots, so callers can never
/// observe a half-applied update.
#[derive(Default)]
pub struct InMemoryProductRepository {
    products: Mutex<BTreeMap<String, Product>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository seeded with the demo catalog used by the CLI, the HTTP
    /// service default state, and the regression corpus.
    pub fn with_demo_catalog() -> Self {
        let repository = Self::new();
        {
            let mut guard = repository
                .products
                .lock()
                .expect("fresh product store lock");
            for product in demo_products() {
                guard.insert(product.id.clone(), product);
            }
        }
        repository
    }
}

impl ProductRepository for InMemoryProductRepository {
    fn get_product(&self, id: &str) -> Result<Option<Product>, RepositoryError> {
        let guard = self
            .products
            .lock()
            .map_err(|_| RepositoryError::Unavailable("product store poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }

    fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let guard = self
            .products
            .lock()
            .map_err(|_| RepositoryError::Unavailable("product store poisoned".to_string()))?;
        Ok(guard.values().cloned().collect())
    }

    fn upsert_product(&self, product: Product) -> Result<(), RepositoryError> {
        let mut guard = self
            .products
            .lock()
            .map_err(|_| RepositoryError::Unavailable("product store poisoned".to_string()))?;
        guard.insert(product.id.clone(), product);
        Ok(())
    }
}

fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0)
        .single()
        .expect("valid seed timestamp")
}

fn eu_config_v1() -> ProductConfig {
    let mut config = templates::standard_config();
    config.payout_tiers = vec![
        templates::tier("tier-1", 60, 120, 75),
        templates::tier("tier-2", 121, 240, 150),
        templates::tier("tier-3", 241, 480, 300),
        templates::tier("tier-4", 481, 9999, 600),
    ];
    config
}

fn eu_config_v2() -> ProductConfig {
    let mut config = eu_config_v1();
    config.payout_tiers = vec![
        templates::tier("tier-1", 60, 120, 75),
        templates::tier("tier-2", 121, 240, 175),
        templates::tier("tier-3", 241, 480, 350),
        templates::tier("tier-4", 481, 9999, 600),
    ];
    // v1.2 stopped excluding crew strikes.
    for exclusion in &mut config.exclusions {
        if exclusion.id == "exc-4" {
            exclusion.enabled = false;
        }
    }
    config
}

fn apac_config() -> ProductConfig {
    let mut config = templates::standard_config();
    config.payout_tiers = vec![
        templates::tier("tier-1", 90, 180, 40),
        templates::tier("tier-2", 181, 360, 80),
        templates::tier("tier-3", 361, 9999, 150),
    ];
    config
}

/// The demo catalog: three flight-delay products with published version
/// histories, newest version first.
pub fn demo_products() -> Vec<Product> {
    vec![
        Product {
            id: "prod-eu-delay".to_string(),
            name: "Flight Delay Benefit - EU".to_string(),
            description: "Parametric flight arrival delay coverage for European routes"
                .to_string(),
            status: ProductStatus::Active,
            active_version: "v1.2".to_string(),
            versions: vec![
                ProductVersion::new(
                    "v1.2",
                    eu_config_v2(),
                    ts(2024, 12, 15, 10, 30),
                    Some(ts(2024, 12, 15, 14, 0)),
                ),
                ProductVersion::new(
                    "v1.1",
                    eu_config_v1(),
                    ts(2024, 11, 20, 9, 0),
                    Some(ts(2024, 11, 20, 12, 0)),
                ),
                ProductVersion::new(
                    "v1.0",
                    templates::standard_config(),
                    ts(2024, 10, 1, 8, 0),
                    Some(ts(2024, 10, 1, 10, 0)),
                ),
            ],
            created_at: ts(2024, 10, 1, 8, 0),
            updated_at: ts(2024, 12, 15, 14, 0),
        },
        Product {
            id: "prod-us-delay".to_string(),
            name: "Flight Delay Benefit - US".to_string(),
            description: "Parametric flight arrival delay coverage for US domestic routes"
                .to_string(),
            status: ProductStatus::Active,
            active_version: "v1.0".to_string(),
            versions: vec![ProductVersion::new(
                "v1.0",
                templates::standard_config(),
                ts(2024, 11, 1, 8, 0),
                Some(ts(2024, 11, 1, 10, 0)),
            )],
            created_at: ts(2024, 11, 1, 8, 0),
            updated_at: ts(2024, 11, 1, 10, 0),
        },
        Product {
            id: "prod-apac-delay".to_string(),
            name: "Flight Delay Benefit - APAC".to_string(),
            description: "Parametric flight arrival delay coverage for Asia-Pacific routes"
                .to_string(),
            status: ProductStatus::Draft,
            active_version: "v0.1".to_string(),
            versions: vec![ProductVersion::new(
                "v0.1",
                apac_config(),
                ts(2024, 12, 10, 8, 0),
                None,
            )],
            created_at: ts(2024, 12, 10, 8, 0),
            updated_at: ts(2024, 12, 10, 8, 0),
        },
    ]
}
