//! # Catalog Query Engine
//!
//! Filtering, sorting and pagination over an in-memory product list.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       run_query(products, query)                        │
//! │                                                                         │
//! │   all products ──► filter ──► stable sort ──► slice page ──► Page<T>    │
//! │                    (whole set)  (whole set)   (last step)               │
//! │                                                                         │
//! │   Pagination is always applied last, so concatenating every page      │
//! │   reproduces the filtered, sorted set exactly once.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Filter Grammar
//! | `query` text       | Matches                                          |
//! |--------------------|--------------------------------------------------|
//! | `available`        | `status && stock > 0`                            |
//! | `unavailable`      | anything not available                           |
//! | `category:<x>`     | category equals `x` (case-insensitive)           |
//! | `title:<x>`        | title contains `x` (case-insensitive)            |
//! | anything else      | category equals it OR title contains it          |

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::Product;
use crate::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

// =============================================================================
// Sort Order
// =============================================================================

/// Price ordering for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(ValidationError::NotAllowed {
                field: "sort".to_string(),
                allowed: vec!["asc".to_string(), "desc".to_string()],
            }),
        }
    }
}

// =============================================================================
// Catalog Filter
// =============================================================================

/// A parsed `query` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogFilter {
    /// Enabled and in stock (`true`) or not (`false`).
    Availability(bool),
    /// Exact category, compared case-insensitively.
    Category(String),
    /// Substring of the title, compared case-insensitively.
    Title(String),
    /// Category equality OR title substring.
    Any(String),
}

impl CatalogFilter {
    /// Parses the free-form query text. Blank text yields `None` (no filter).
    pub fn parse(text: &str) -> Option<CatalogFilter> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let lowered = text.to_lowercase();
        match lowered.as_str() {
            "available" => return Some(CatalogFilter::Availability(true)),
            "unavailable" => return Some(CatalogFilter::Availability(false)),
            _ => {}
        }

        if let Some(rest) = lowered.strip_prefix("category:") {
            return Some(CatalogFilter::Category(rest.trim().to_string()));
        }
        if let Some(rest) = lowered.strip_prefix("title:") {
            return Some(CatalogFilter::Title(rest.trim().to_string()));
        }

        Some(CatalogFilter::Any(lowered))
    }

    /// Checks whether a product passes this filter.
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            CatalogFilter::Availability(wanted) => product.is_available() == *wanted,
            CatalogFilter::Category(c) => product.category.to_lowercase() == *c,
            CatalogFilter::Title(t) => product.title.to_lowercase().contains(t.as_str()),
            CatalogFilter::Any(v) => {
                product.category.to_lowercase() == *v
                    || product.title.to_lowercase().contains(v.as_str())
            }
        }
    }
}

// =============================================================================
// List Query
// =============================================================================

/// A validated list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// Page size, in `1..=MAX_PAGE_LIMIT`.
    pub limit: u32,
    /// 1-indexed page number.
    pub page: u32,
    pub sort: Option<SortOrder>,
    /// Raw query text, kept for link construction.
    pub query: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            limit: DEFAULT_PAGE_LIMIT,
            page: 1,
            sort: None,
            query: None,
        }
    }
}

impl ListQuery {
    /// Builds a query from raw request parameters.
    ///
    /// ## Rules
    /// - `limit` defaults to 10, is clamped to 100, and must not be 0
    /// - `page` defaults to 1 and must not be 0
    /// - `sort` must be `asc` or `desc` when present (blank means none)
    pub fn from_params(
        limit: Option<u32>,
        page: Option<u32>,
        sort: Option<&str>,
        query: Option<String>,
    ) -> Result<ListQuery, ValidationError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if limit == 0 {
            return Err(ValidationError::MustBePositive {
                field: "limit".to_string(),
            });
        }

        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(ValidationError::MustBePositive {
                field: "page".to_string(),
            });
        }

        let sort = match sort.map(str::trim) {
            Some(s) if !s.is_empty() => Some(s.parse::<SortOrder>()?),
            _ => None,
        };

        let query = query.filter(|q| !q.trim().is_empty());

        Ok(ListQuery {
            limit: limit.min(MAX_PAGE_LIMIT),
            page,
            sort,
            query,
        })
    }

    /// The parsed filter, if any.
    pub fn filter(&self) -> Option<CatalogFilter> {
        self.query.as_deref().and_then(CatalogFilter::parse)
    }

    /// Builds a navigation link to `page`, preserving limit, sort and query.
    ///
    /// ```rust
    /// use storefront_core::ListQuery;
    ///
    /// let q = ListQuery::from_params(Some(2), Some(1), Some("desc"), None).unwrap();
    /// assert_eq!(q.link("/api/products", 2), "/api/products?limit=2&page=2&sort=desc");
    /// ```
    pub fn link(&self, base: &str, page: u32) -> String {
        let mut link = format!("{}?limit={}&page={}", base, self.limit, page);
        if let Some(sort) = self.sort {
            link.push_str("&sort=");
            link.push_str(sort.as_str());
        }
        if let Some(query) = &self.query {
            link.push_str("&query=");
            link.push_str(&encode_component(query));
        }
        link
    }
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

// =============================================================================
// Page
// =============================================================================

/// One page of results plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub total_pages: u32,
    pub page: u32,
    pub limit: u32,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
}

/// Filters, sorts and slices `products` according to `query`.
pub fn run_query(products: &[Product], query: &ListQuery) -> Page<Product> {
    let filter = query.filter();
    let mut matching: Vec<&Product> = products
        .iter()
        .filter(|p| filter.as_ref().map_or(true, |f| f.matches(p)))
        .collect();

    // Vec::sort_by is stable: equal prices keep catalog order.
    match query.sort {
        Some(SortOrder::Asc) => matching.sort_by(|a, b| a.price.total_cmp(&b.price)),
        Some(SortOrder::Desc) => matching.sort_by(|a, b| b.price.total_cmp(&a.price)),
        None => {}
    }

    let total_items = matching.len() as u64;
    let limit = query.limit.max(1);
    let total_pages = total_items.div_ceil(limit as u64) as u32;
    let page = query.page.max(1);

    let start = (page as usize - 1).saturating_mul(limit as usize);
    let items: Vec<Product> = matching
        .into_iter()
        .skip(start)
        .take(limit as usize)
        .cloned()
        .collect();

    let has_prev = page > 1;
    let has_next = page < total_pages;

    Page {
        items,
        total_items,
        total_pages,
        page,
        limit,
        has_prev,
        has_next,
        prev_page: has_prev.then(|| page - 1),
        next_page: has_next.then(|| page + 1),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: u64, title: &str, category: &str, price: f64, stock: u64) -> Product {
        Product {
            id,
            title: title.to_string(),
            description: "d".to_string(),
            code: format!("C{}", id),
            price,
            status: true,
            stock,
            category: category.to_string(),
            thumbnails: vec![],
        }
    }

    fn catalog() -> Vec<Product> {
        vec![
            product(1, "Green Tea", "drinks", 30.0, 3),
            product(2, "Coffee Beans", "drinks", 10.0, 0),
            product(3, "Tea Pot", "kitchen", 20.0, 1),
            product(4, "Mug", "kitchen", 20.0, 8),
        ]
    }

    fn ids(page: &Page<Product>) -> Vec<u64> {
        page.items.iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(CatalogFilter::parse("  "), None);
        assert_eq!(
            CatalogFilter::parse("Available"),
            Some(CatalogFilter::Availability(true))
        );
        assert_eq!(
            CatalogFilter::parse("category:Drinks"),
            Some(CatalogFilter::Category("drinks".into()))
        );
        assert_eq!(
            CatalogFilter::parse("title: tea"),
            Some(CatalogFilter::Title("tea".into()))
        );
        assert_eq!(CatalogFilter::parse("mug"), Some(CatalogFilter::Any("mug".into())));
    }

    #[test]
    fn test_filter_by_availability() {
        let query = ListQuery {
            query: Some("available".into()),
            ..Default::default()
        };
        assert_eq!(ids(&run_query(&catalog(), &query)), vec![1, 3, 4]);

        let query = ListQuery {
            query: Some("unavailable".into()),
            ..Default::default()
        };
        assert_eq!(ids(&run_query(&catalog(), &query)), vec![2]);
    }

    #[test]
    fn test_any_filter_matches_category_or_title() {
        let query = ListQuery {
            query: Some("tea".into()),
            ..Default::default()
        };
        assert_eq!(ids(&run_query(&catalog(), &query)), vec![1, 3]);

        let query = ListQuery {
            query: Some("KITCHEN".into()),
            ..Default::default()
        };
        assert_eq!(ids(&run_query(&catalog(), &query)), vec![3, 4]);
    }

    #[test]
    fn test_sort_is_stable() {
        let asc = ListQuery {
            sort: Some(SortOrder::Asc),
            ..Default::default()
        };
        assert_eq!(ids(&run_query(&catalog(), &asc)), vec![2, 3, 4, 1]);

        let desc = ListQuery {
            sort: Some(SortOrder::Desc),
            ..Default::default()
        };
        assert_eq!(ids(&run_query(&catalog(), &desc)), vec![1, 3, 4, 2]);
    }

    #[test]
    fn test_second_page_of_three() {
        let products: Vec<Product> = catalog().into_iter().take(3).collect();
        let query = ListQuery::from_params(Some(1), Some(2), Some("asc"), None).unwrap();
        let page = run_query(&products, &query);

        assert_eq!(ids(&page), vec![3]);
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_prev);
        assert!(page.has_next);
        assert_eq!(page.prev_page, Some(1));
        assert_eq!(page.next_page, Some(3));
    }

    #[test]
    fn test_pages_concatenate_to_full_set() {
        let products = catalog();
        for limit in 1..=5 {
            let mut seen = Vec::new();
            let first = run_query(
                &products,
                &ListQuery::from_params(Some(limit), Some(1), Some("desc"), None).unwrap(),
            );
            for page in 1..=first.total_pages.max(1) {
                let query =
                    ListQuery::from_params(Some(limit), Some(page), Some("desc"), None).unwrap();
                seen.extend(ids(&run_query(&products, &query)));
            }
            assert_eq!(seen, vec![1, 3, 4, 2], "limit {}", limit);
        }
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let query = ListQuery::from_params(Some(2), Some(9), None, None).unwrap();
        let page = run_query(&catalog(), &query);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 2);
        assert!(!page.has_next);
        assert_eq!(page.next_page, None);
    }

    #[test]
    fn test_empty_catalog() {
        let page = run_query(&[], &ListQuery::default());
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_prev);
        assert!(!page.has_next);
        assert_eq!(page.prev_page, None);
    }

    #[test]
    fn test_from_params_rules() {
        let q = ListQuery::from_params(None, None, None, None).unwrap();
        assert_eq!(q, ListQuery::default());

        let q = ListQuery::from_params(Some(5000), None, Some(""), Some("  ".into())).unwrap();
        assert_eq!(q.limit, MAX_PAGE_LIMIT);
        assert_eq!(q.sort, None);
        assert_eq!(q.query, None);

        assert!(ListQuery::from_params(Some(0), None, None, None).is_err());
        assert!(ListQuery::from_params(None, Some(0), None, None).is_err());
        assert!(ListQuery::from_params(None, None, Some("price"), None).is_err());
    }

    #[test]
    fn test_link_encodes_query() {
        let q = ListQuery::from_params(Some(3), Some(1), None, Some("title:green tea".into()))
            .unwrap();
        assert_eq!(
            q.link("/api/products", 2),
            "/api/products?limit=3&page=2&query=title%3Agreen%20tea"
        );
    }
}
