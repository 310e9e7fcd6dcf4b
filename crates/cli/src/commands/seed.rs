//! Seed the backend catalog from a YAML file.
//!
//! The file is a list of products:
//!
//! ```yaml
//! - name: Paper lamp
//!   category: home_decoration
//!   price: 45.00
//!   details: Washi paper on an oak frame
//!   img_path: img/paper-lamp.jpg
//!   amount: 3
//!   artist_id: 2
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use atelier_storefront::backend::BackendClient;
use atelier_storefront::config::BackendConfig;

/// One product entry of the seed file.
#[derive(Debug, Deserialize, Serialize)]
pub struct SeedProduct {
    pub name: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub img_path: Option<String>,
    #[serde(default)]
    pub amount: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_id: Option<i32>,
}

/// Problems found in a seed file, one message per entry.
fn validate(products: &[SeedProduct]) -> Vec<String> {
    products
        .iter()
        .enumerate()
        .flat_map(|(index, product)| {
            let mut errors = Vec::new();
            if product.name.trim().is_empty() {
                errors.push(format!("entry {index}: name is empty"));
            }
            if product.category.trim().is_empty() {
                errors.push(format!("entry {index}: category is empty"));
            }
            if product.price.is_sign_negative() {
                errors.push(format!("entry {index}: price is negative"));
            }
            errors
        })
        .collect()
}

/// Send every product of `file_path` to the backend in one request.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or the backend rejects the batch.
pub async fn products(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");

    // Read and validate before contacting the backend
    let content = tokio::fs::read_to_string(path).await?;
    let products: Vec<SeedProduct> = serde_yaml::from_str(&content)?;
    info!(products = products.len(), "Parsed seed file");

    let errors = validate(&products);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let payload = products
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;

    let backend = BackendClient::new(&BackendConfig::from_env()?)?;
    backend.seed_products(&payload).await?;

    info!(inserted = payload.len(), "Seeding complete");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SEED: &str = r"
- name: Paper lamp
  category: home_decoration
  price: 45.5
  details: Washi paper
  amount: 3
- name: Bronze cat
  category: statue
  price: 120
";

    #[test]
    fn test_parse_seed_file() {
        let products: Vec<SeedProduct> = serde_yaml::from_str(SEED).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].price, Decimal::new(455, 1));
        assert_eq!(products[1].amount, 0);
        assert!(validate(&products).is_empty());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let products = vec![SeedProduct {
            name: " ".to_string(),
            category: String::new(),
            price: Decimal::new(-1, 0),
            details: String::new(),
            img_path: None,
            amount: 0,
            artist_id: None,
        }];
        assert_eq!(validate(&products).len(), 3);
    }

    #[test]
    fn test_price_serialized_as_number() {
        let products: Vec<SeedProduct> = serde_yaml::from_str(SEED).unwrap();
        let value = serde_json::to_value(&products[0]).unwrap();
        assert_eq!(value["price"], serde_json::json!(45.5));
        assert!(value.get("artist_id").is_none());
    }
}
