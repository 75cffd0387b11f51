//! Seed the hosted backend's catalog from a YAML file.
//!
//! The file is a list of products:
//!
//! ```yaml
//! - name: Wireless Headphones
//!   description: Over-ear, noise cancelling
//!   price: "79.99"
//!   category: Electronics
//!   stock: 25
//!   image_url: https://cdn.example.com/headphones.jpg
//! ```
//!
//! Writes bypass row-level policies, so the backend's service key is
//! required (`BACKEND_SERVICE_KEY`); the storefront itself never holds it.

use std::collections::HashSet;
use std::path::Path;

use shophub_core::NewProduct;
use shophub_storefront::backend::HostedBackend;
use shophub_storefront::config::{BackendConfig, get_validated_secret};
use tracing::{error, info};

/// Problems found in a seed file before anything is written.
#[derive(Debug, thiserror::Error)]
#[error("{0} validation errors found")]
pub struct SeedValidationError(pub usize);

/// Parse a seed file's contents.
///
/// # Errors
///
/// Returns an error if the YAML is malformed or a price is negative.
pub fn parse_products(content: &str) -> Result<Vec<NewProduct>, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

/// Check products for problems the backend would accept silently.
///
/// Returns one message per problem; empty means valid.
#[must_use]
pub fn validate_products(products: &[NewProduct]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, product) in products.iter().enumerate() {
        let position = index + 1;
        let name = product.name.trim();
        if name.is_empty() {
            errors.push(format!("product #{position}: name is empty"));
            continue;
        }
        if !seen.insert(name.to_lowercase()) {
            errors.push(format!("product #{position}: duplicate name '{name}'"));
        }
        if let Some(url) = &product.image_url
            && !(url.starts_with("https://") || url.starts_with("http://") || url.starts_with('/'))
        {
            errors.push(format!("product #{position} ({name}): image_url must be a URL or absolute path"));
        }
    }

    errors
}

/// Seed products from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML file
/// * `clear_existing` - If true, delete all existing products first
///
/// # Errors
///
/// Returns an error if environment variables are missing, the file cannot
/// be read or fails validation, or the backend rejects the writes.
pub async fn products(
    file_path: &str,
    clear_existing: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = BackendConfig::from_env()?;
    let service_key = get_validated_secret("BACKEND_SERVICE_KEY")?;

    // Verify file exists
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");

    // Read and validate YAML before touching the backend
    let content = tokio::fs::read_to_string(path).await?;
    let products = parse_products(&content)?;

    info!(products = products.len(), "Parsed seed file");

    let errors = validate_products(&products);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(SeedValidationError(errors.len()).into());
    }

    let backend = HostedBackend::new(&config)?;

    info!(clear_existing, backend = %config.origin(), "Starting seeding process");
    let inserted = backend
        .seed_products(&service_key, &products, clear_existing)
        .await?;

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    const SAMPLE: &str = r#"
- name: Wireless Headphones
  description: Over-ear, noise cancelling
  price: "79.99"
  category: Electronics
  stock: 25
- name: Yoga Mat
  price: 34.5
"#;

    #[test]
    fn test_parse_products() {
        let products = parse_products(SAMPLE).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].price.amount(), Decimal::new(7999, 2));
        assert_eq!(products[1].stock, 0);
        assert!(products[1].description.is_empty());
        assert!(validate_products(&products).is_empty());
    }

    #[test]
    fn test_parse_rejects_negative_price() {
        assert!(parse_products("- name: Broken\n  price: -1\n").is_err());
    }

    #[test]
    fn test_validate_duplicates_and_blank_names() {
        let mut products = parse_products(SAMPLE).unwrap();
        products.push(products[0].clone());
        products[1].name = "  ".to_string();

        let errors = validate_products(&products);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("name is empty"));
        assert!(errors[1].contains("duplicate name"));
    }

    #[test]
    fn test_validate_image_url() {
        let mut products = parse_products(SAMPLE).unwrap();
        products[0].image_url = Some("headphones.jpg".to_string());
        let errors = validate_products(&products);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("image_url"));
    }

    #[test]
    fn test_bundled_seed_file_is_valid() {
        let content = include_str!("../../../../seed/products.yaml");
        let products = parse_products(content).unwrap();
        assert_eq!(products.len(), 6);
        assert!(validate_products(&products).is_empty());
    }
}
