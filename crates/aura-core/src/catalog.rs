use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::products::Product;
use crate::ConfigError;

/// Offline catalog used when the catalog service cannot be reached.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<Product>,
}

/// Load and validate a seed catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_catalog(&content)
}

fn parse_catalog(content: &str) -> Result<CatalogFile, ConfigError> {
    let catalog: CatalogFile = serde_yaml::from_str(content)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &CatalogFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for product in &catalog.products {
        if product.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "product {} has an empty name",
                product.id
            )));
        }

        if product.price < Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "product '{}' has negative price {}",
                product.name, product.price
            )));
        }

        if !(0.0..=5.0).contains(&product.rating) {
            return Err(ConfigError::Validation(format!(
                "product '{}' has rating {} outside 0.0-5.0",
                product.name, product.rating
            )));
        }

        if !seen_ids.insert(product.id.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate product id: '{}'",
                product.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::products::Category;

    const SEED: &str = r"
products:
  - id: 1
    name: Premium Face Cream
    price: 3500
    category: skincare
    tags: [moisture, aging-care]
    stock: 50
    rating: 4.5
    is_new: true
    is_popular: true
  - id: '2'
    name: Natural Shampoo
    price: '2800'
    category: shampoo
    stock: 30
    rating: 4.2
";

    #[test]
    fn parses_seed_catalog() {
        let catalog = parse_catalog(SEED).expect("seed should parse");
        assert_eq!(catalog.products.len(), 2);
        assert_eq!(catalog.products[0].id.as_str(), "1");
        assert_eq!(catalog.products[0].category, Category::Skincare);
        assert_eq!(catalog.products[1].price, Decimal::new(2800, 0));
        assert!(catalog.products[1].is_active);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let yaml = r"
products:
  - { id: '1', name: A, price: 1, category: other }
  - { id: '1', name: B, price: 1, category: other }
";
        let err = parse_catalog(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("duplicate")));
    }

    #[test]
    fn rejects_negative_price() {
        let yaml = r"
products:
  - { id: '1', name: A, price: -5, category: other }
";
        let err = parse_catalog(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("negative")));
    }

    #[test]
    fn rejects_out_of_range_rating() {
        let yaml = r"
products:
  - { id: '1', name: A, price: 1, category: other, rating: 7.5 }
";
        assert!(matches!(
            parse_catalog(yaml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_catalog(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::CatalogFileIo { .. }));
    }
}
