use super::catalog::{ConfigIntegrityError, ProductConfig};
use super::repository::{ProductRepository, RepositoryError};

/// Immutable configuration snapshot produced by a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProduct {
    pub product_name: String,
    pub version: String,
    pub hash: String,
    pub config: ProductConfig,
}

/// Why a `(product_id, version)` pair failed to resolve. The first two are
/// expected business outcomes that the pipeline converts into denial
/// reasons; the last two are engine faults and propagate as errors.
#[derive(Debug, thiserror::Error)]
pub enum ResolveFailure {
    #[error("product {product_id} not found in catalog")]
    InvalidProduct { product_id: String },
    #[error("product {product_id} has no version {version}")]
    InvalidVersion { product_id: String, version: String },
    #[error("corrupt configuration for {product_id}/{version}: {source}")]
    CorruptConfig {
        product_id: String,
        version: String,
        source: ConfigIntegrityError,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Resolve a product version to its configuration snapshot and content
/// hash. Version matching is strict: an unknown version label fails with
/// [`ResolveFailure::InvalidVersion`] rather than silently falling back to
/// the newest version, so a claim can never be priced against a
/// configuration the caller did not name. Pure read, no side effects.
pub fn resolve<R: ProductRepository + ?Sized>(
    repository: &R,
    product_id: &str,
    version: &str,
) -> Result<ResolvedProduct, ResolveFailure> {
    let product = repository
        .get_product(product_id)?
        .ok_or_else(|| ResolveFailure::InvalidProduct {
            product_id: product_id.to_string(),
        })?;

    let matched = product
        .find_version(version)
        .ok_or_else(|| ResolveFailure::InvalidVersion {
            product_id: product_id.to_string(),
            version: version.to_string(),
        })?;

    matched
        .config
        .validate()
        .map_err(|source| ResolveFailure::CorruptConfig {
            product_id: product_id.to_string(),
            version: version.to_string(),
            source,
        })?;

    Ok(ResolvedProduct {
        product_name: product.name.clone(),
        version: matched.version.clone(),
        hash: matched.hash.clone(),
        config: matched.config.clone(),
    })
}
