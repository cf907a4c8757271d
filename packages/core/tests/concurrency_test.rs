//! Concurrent Mutation Tests
//!
//! Many writers on the same sibling group, both inside one process (shared
//! role locks) and through independent services on the same database file
//! (serialized by SQLite's write lock), must leave exactly one chain.

#[cfg(test)]
mod concurrency_tests {
    use anyhow::Result;
    use serde_json::json;
    use std::collections::HashSet;
    use tempfile::TempDir;
    use uiroute_core::{MoveTarget, RouteService, RouteStoreConfig};

    async fn create_test_service(temp_dir: &TempDir) -> Result<RouteService> {
        let config = RouteStoreConfig::with_db_path(temp_dir.path().join("routes.db"));
        Ok(RouteService::open(config).await?)
    }

    /// Every admin root appears exactly once and the chain covers the group
    async fn assert_single_chain(service: &RouteService, expected: usize) -> Result<()> {
        let names = service.sibling_names("admin", None).await?;
        assert_eq!(names.len(), expected);
        let unique: HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), expected);
        assert_eq!(service.get_tree("admin").await?.routes.len(), expected);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_head_inserts() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let service = create_test_service(&temp_dir).await?;

        let mut handles = Vec::new();
        for i in 0..20 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .create_node("admin", &format!("N{}", i), None, None, json!({}))
                    .await
            }));
        }
        for handle in handles {
            handle.await??;
        }

        assert_single_chain(&service, 20).await
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_from_separate_services() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let first = create_test_service(&temp_dir).await?;
        let second = create_test_service(&temp_dir).await?;
        first
            .create_node("admin", "Anchor", None, None, json!({}))
            .await?;

        let mut handles = Vec::new();
        for i in 0..10 {
            let service = if i % 2 == 0 { first.clone() } else { second.clone() };
            handles.push(tokio::spawn(async move {
                service
                    .create_node("admin", &format!("N{}", i), None, Some("Anchor"), json!({}))
                    .await
            }));
        }
        for handle in handles {
            handle.await??;
        }

        assert_single_chain(&first, 11).await?;
        assert_eq!(
            second.first_child("admin", None).await?.unwrap().name,
            "Anchor"
        );
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_moves() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let service = create_test_service(&temp_dir).await?;
        for i in (0..8).rev() {
            service
                .create_node("admin", &format!("N{}", i), None, None, json!({}))
                .await?;
        }

        let mut handles = Vec::new();
        for i in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let name = format!("N{}", i);
                for round in 0..5 {
                    let target = match round % 3 {
                        0 => MoveTarget::Index(1),
                        1 => MoveTarget::Tail { parent: None },
                        _ => MoveTarget::Index(4),
                    };
                    service.move_node("admin", &name, target).await?;
                }
                Ok::<_, uiroute_core::RouteServiceError>(())
            }));
        }
        for handle in handles {
            handle.await??;
        }

        assert_single_chain(&service, 8).await
    }
}
