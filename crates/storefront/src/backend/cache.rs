//! Cache for catalog reads.

use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use shophub_core::{Product, ProductId};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Products,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
}

/// Time-bounded cache of product reads.
///
/// Only successful lookups are cached; a missing product is asked for again
/// next time.
#[derive(Clone)]
pub struct ProductCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl ProductCache {
    /// Create a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Cached product listing.
    pub async fn products(&self) -> Option<Vec<Product>> {
        match self.cache.get(&CacheKey::Products).await {
            Some(CacheValue::Products(products)) => {
                debug!("Cache hit for products");
                Some(products)
            }
            _ => None,
        }
    }

    /// Store the product listing.
    pub async fn insert_products(&self, products: Vec<Product>) {
        self.cache
            .insert(CacheKey::Products, CacheValue::Products(products))
            .await;
    }

    /// Cached product by id.
    pub async fn product(&self, id: ProductId) -> Option<Product> {
        match self.cache.get(&CacheKey::Product(id)).await {
            Some(CacheValue::Product(product)) => {
                debug!(product_id = %id, "Cache hit for product");
                Some(*product)
            }
            _ => None,
        }
    }

    /// Store a single product.
    pub async fn insert_product(&self, product: Product) {
        self.cache
            .insert(
                CacheKey::Product(product.id),
                CacheValue::Product(Box::new(product)),
            )
            .await;
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use shophub_core::Price;

    use super::*;

    fn product(name: &str) -> Product {
        Product {
            id: ProductId::generate(),
            name: name.to_string(),
            description: String::new(),
            price: Price::new(Decimal::new(1999, 2)).unwrap(),
            image_url: None,
            category: "Accessories".to_string(),
            stock: 5,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_product_round_trip() {
        let cache = ProductCache::new(Duration::from_secs(60));
        let item = product("Yoga Mat");

        assert!(cache.product(item.id).await.is_none());
        cache.insert_product(item.clone()).await;
        assert_eq!(cache.product(item.id).await, Some(item));
    }

    #[tokio::test]
    async fn test_listing_is_separate_from_single_products() {
        let cache = ProductCache::new(Duration::from_secs(60));
        let item = product("Cotton T-Shirt");

        cache.insert_product(item.clone()).await;
        assert!(cache.products().await.is_none());

        cache.insert_products(vec![item.clone()]).await;
        assert_eq!(cache.products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let cache = ProductCache::new(Duration::from_secs(60));
        let item = product("Laptop Backpack");
        cache.insert_product(item.clone()).await;

        cache.invalidate_all();
        cache.cache.run_pending_tasks().await;
        assert!(cache.product(item.id).await.is_none());
    }
}
