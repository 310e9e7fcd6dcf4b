//! Client-side catalog filtering.
//!
//! The backend returns the whole catalog; narrowing it down by text and
//! category happens here. There is no pagination and no server-side search.

use serde::Deserialize;

use crate::types::Product;

/// Query string value meaning "every category".
pub const ALL_CATEGORIES: &str = "all";

/// Image shown when a product has no usable image path.
pub const PLACEHOLDER_IMAGE: &str = "/static/img/placeholder.svg";

/// Category part of a catalog query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    /// Lowercased category key that must match exactly.
    Only(String),
}

impl CategoryFilter {
    /// Parse the `cat` query parameter. Empty or `all` means no restriction.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()) {
            None => Self::All,
            Some(s) if s.is_empty() || s == ALL_CATEGORIES => Self::All,
            Some(s) => Self::Only(s),
        }
    }

    /// The value to put back into a query string.
    #[must_use]
    pub fn as_param(&self) -> &str {
        match self {
            Self::All => ALL_CATEGORIES,
            Self::Only(key) => key,
        }
    }

    fn matches(&self, product: &Product) -> bool {
        match self {
            Self::All => true,
            Self::Only(key) => product.category_key() == *key,
        }
    }
}

/// Raw catalog query string (`?q=...&cat=...`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogParams {
    pub q: Option<String>,
    pub cat: Option<String>,
}

/// A parsed catalog filter: name substring plus category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Lowercased, trimmed search text. Empty matches every name.
    text: String,
    category: CategoryFilter,
}

impl CatalogQuery {
    #[must_use]
    pub fn new(text: &str, category: CategoryFilter) -> Self {
        Self {
            text: text.trim().to_lowercase(),
            category,
        }
    }

    #[must_use]
    pub fn from_params(params: &CatalogParams) -> Self {
        Self::new(
            params.q.as_deref().unwrap_or_default(),
            CategoryFilter::parse(params.cat.as_deref()),
        )
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn category(&self) -> &CategoryFilter {
        &self.category
    }

    /// Whether a product passes both the category and the name predicate.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.category.matches(product)
            && (self.text.is_empty() || product.name.to_lowercase().contains(&self.text))
    }

    /// Products that match, in catalog order.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Sorted unique categories present in the catalog, with [`ALL_CATEGORIES`] first.
#[must_use]
pub fn available_categories(products: &[Product]) -> Vec<String> {
    let mut keys: Vec<String> = products
        .iter()
        .map(Product::category_key)
        .filter(|key| !key.is_empty())
        .collect();
    keys.sort();
    keys.dedup();

    std::iter::once(ALL_CATEGORIES.to_string())
        .chain(keys)
        .collect()
}

/// Human label for a category key.
#[must_use]
pub fn category_label(key: &str) -> String {
    match key {
        ALL_CATEGORIES => "All".to_string(),
        "home_decoration" => "Lamps".to_string(),
        "sculptures" => "Sculptures".to_string(),
        "statue" => "Statues".to_string(),
        other => other.to_string(),
    }
}

/// Normalize an image path from the backend into an absolute site path.
///
/// Leading slashes collapse into one and a missing one is added. An empty
/// path yields the placeholder image.
#[must_use]
pub fn normalize_img_path(path: Option<&str>) -> String {
    let trimmed = path.unwrap_or_default().trim();
    if trimmed.is_empty() {
        return PLACEHOLDER_IMAGE.to_string();
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return trimmed.to_string();
    }
    format!("/{}", trimmed.trim_start_matches('/'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::types::ProductId;

    fn product(id: i32, name: &str, category: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            category: category.to_string(),
            price: Decimal::new(10, 0),
            details: String::new(),
            img_path: None,
            amount: 1,
            artist_id: None,
            discount: None,
        }
    }

    fn catalog() -> Vec<Product> {
        vec![
            product(1, "Moon Lamp", "home_decoration"),
            product(2, "Marble Bust", "sculptures"),
            product(3, "Paper lamp", "HOME_DECORATION"),
            product(4, "Bronze Horse", "statue"),
            product(5, "Untitled", ""),
        ]
    }

    fn names(found: &[&Product]) -> Vec<String> {
        found.iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn test_empty_query_returns_everything() {
        let products = catalog();
        assert_eq!(CatalogQuery::default().apply(&products).len(), 5);
    }

    #[test]
    fn test_text_is_case_insensitive_substring() {
        let products = catalog();
        let query = CatalogQuery::new("  LAMP ", CategoryFilter::All);
        assert_eq!(names(&query.apply(&products)), ["Moon Lamp", "Paper lamp"]);
    }

    #[test]
    fn test_category_matches_lowercased_key() {
        let products = catalog();
        let query = CatalogQuery::new("", CategoryFilter::parse(Some("home_decoration")));
        assert_eq!(names(&query.apply(&products)), ["Moon Lamp", "Paper lamp"]);
    }

    #[test]
    fn test_both_predicates_must_hold() {
        let products = catalog();
        let query = CatalogQuery::new("moon", CategoryFilter::parse(Some("sculptures")));
        assert!(query.apply(&products).is_empty());

        let query = CatalogQuery::new("bust", CategoryFilter::parse(Some("Sculptures")));
        assert_eq!(names(&query.apply(&products)), ["Marble Bust"]);
    }

    #[test]
    fn test_category_filter_parse() {
        assert_eq!(CategoryFilter::parse(None), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse(Some("")), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse(Some("ALL")), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::parse(Some(" Statue ")),
            CategoryFilter::Only("statue".to_string())
        );
    }

    #[test]
    fn test_from_params() {
        let params = CatalogParams {
            q: Some("Horse".to_string()),
            cat: Some("statue".to_string()),
        };
        let query = CatalogQuery::from_params(&params);
        assert_eq!(query.text(), "horse");
        assert_eq!(query.category().as_param(), "statue");
    }

    #[test]
    fn test_available_categories() {
        assert_eq!(
            available_categories(&catalog()),
            ["all", "home_decoration", "sculptures", "statue"]
        );
        assert_eq!(available_categories(&[]), ["all"]);
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(category_label("home_decoration"), "Lamps");
        assert_eq!(category_label("statue"), "Statues");
        assert_eq!(category_label("textiles"), "textiles");
    }

    #[test]
    fn test_normalize_img_path() {
        assert_eq!(normalize_img_path(None), PLACEHOLDER_IMAGE);
        assert_eq!(normalize_img_path(Some("  ")), PLACEHOLDER_IMAGE);
        assert_eq!(normalize_img_path(Some("img/a.jpg")), "/img/a.jpg");
        assert_eq!(normalize_img_path(Some("///img/a.jpg")), "/img/a.jpg");
        assert_eq!(
            normalize_img_path(Some("https://cdn.example.com/a.jpg")),
            "https://cdn.example.com/a.jpg"
        );
    }
}
