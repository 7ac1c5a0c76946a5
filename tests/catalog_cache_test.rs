//! Tests for the load-once catalog cache.

#[cfg(test)]
mod catalog_cache_tests {
    use smilesim::catalog::CatalogCache;
    use smilesim::testing::InMemoryCatalog;
    use smilesim::types::{Procedure, ShadeSwatch};
    use std::sync::Arc;

    fn procedure(id: &str, name: &str, active: bool) -> Procedure {
        Procedure {
            id: id.to_string(),
            display_name: name.to_string(),
            webhook_value: name.to_lowercase(),
            active,
        }
    }

    fn shade(id: &str, name: &str, active: bool) -> ShadeSwatch {
        ShadeSwatch {
            id: id.to_string(),
            display_name: name.to_string(),
            color_hex: "#FFFFFF".to_string(),
            active,
        }
    }

    fn sample_store() -> Arc<InMemoryCatalog> {
        Arc::new(InMemoryCatalog::new(
            vec![
                procedure("p-3", "Lentes", true),
                procedure("p-1", "Clareamento", true),
                procedure("p-2", "Facetas", false),
            ],
            vec![
                shade("s-2", "B1", true),
                shade("s-1", "A1", true),
                shade("s-3", "C2", false),
            ],
        ))
    }

    #[tokio::test]
    async fn test_procedures_fetch_exactly_once() {
        let store = sample_store();
        let cache = CatalogCache::new(store.clone());

        let first = cache.procedures().await.unwrap();
        let second = cache.procedures().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.procedure_fetches(), 1);
        // The shade table is untouched until someone asks for it
        assert_eq!(store.shade_fetches(), 0);
    }

    #[tokio::test]
    async fn test_inactive_rows_are_filtered_and_names_sorted() {
        let store = sample_store();
        let cache = CatalogCache::new(store);

        let procedures = cache.procedures().await.unwrap();
        let names: Vec<&str> = procedures.iter().map(|p| p.display_name.as_str()).collect();
        assert_eq!(names, vec!["Clareamento", "Lentes"]);

        let shades = cache.shades().await.unwrap();
        let names: Vec<&str> = shades.iter().map(|s| s.display_name.as_str()).collect();
        assert_eq!(names, vec!["A1", "B1"]);
    }

    #[tokio::test]
    async fn test_concurrent_first_reads_fetch_once() {
        let store = sample_store();
        let cache = Arc::new(CatalogCache::new(store.clone()));

        let a = cache.clone();
        let b = cache.clone();
        let (left, right) = tokio::join!(a.procedures(), b.procedures());
        assert_eq!(left.unwrap(), right.unwrap());
        assert_eq!(store.procedure_fetches(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let store = Arc::new(
            InMemoryCatalog::new(vec![procedure("p-1", "Clareamento", true)], Vec::new())
                .failing_first(1),
        );
        let cache = CatalogCache::new(store.clone());

        assert!(cache.procedures().await.is_err());

        // The next reader retries and succeeds
        let procedures = cache.procedures().await.unwrap();
        assert_eq!(procedures.len(), 1);
        assert_eq!(store.procedure_fetches(), 2);

        // And from here on the cache serves it
        cache.procedures().await.unwrap();
        assert_eq!(store.procedure_fetches(), 2);
    }

    #[tokio::test]
    async fn test_reset_refetches_both_tables() {
        let store = sample_store();
        let cache = CatalogCache::new(store.clone());

        cache.procedures().await.unwrap();
        cache.shades().await.unwrap();
        assert_eq!(store.procedure_fetches(), 1);
        assert_eq!(store.shade_fetches(), 1);

        cache.reset().await;
        cache.procedures().await.unwrap();
        cache.shades().await.unwrap();
        assert_eq!(store.procedure_fetches(), 2);
        assert_eq!(store.shade_fetches(), 2);
    }
}
