//! Event Emission Tests
//!
//! Every committed mutation emits exactly one event per changed node set,
//! after its transaction commits. Rejected and no-op calls emit nothing.

#[cfg(test)]
mod event_emission_tests {
    use anyhow::Result;
    use serde_json::json;
    use tempfile::TempDir;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::sync::broadcast::Receiver;
    use tokio::time::{timeout, Duration};
    use uiroute_core::{MoveTarget, RouteEvent, RouteService, RouteSpec, RouteStoreConfig};

    /// Helper to create a service with `A, B, C` seeded as admin roots
    async fn create_test_service() -> Result<(RouteService, TempDir)> {
        let temp_dir = TempDir::new()?;
        let config = RouteStoreConfig::with_db_path(temp_dir.path().join("routes.db"));
        let service = RouteService::open(config).await?;
        service
            .seed_defaults(
                "admin",
                &[
                    RouteSpec::new("A", json!({})),
                    RouteSpec::new("B", json!({})),
                    RouteSpec::new("C", json!({})),
                ],
            )
            .await?;
        Ok((service, temp_dir))
    }

    async fn next_event(rx: &mut Receiver<RouteEvent>) -> RouteEvent {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("Event should be emitted within 1 second")
            .expect("Should receive event")
    }

    fn assert_no_event(rx: &mut Receiver<RouteEvent>) {
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_create_emits_node_created() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let mut rx = service.subscribe_to_events();

        let id = service
            .create_node("admin", "D", None, Some("A"), json!({"path": "/d"}))
            .await?;

        match next_event(&mut rx).await {
            RouteEvent::NodeCreated { node } => {
                assert_eq!(node.id, id);
                assert_eq!(node.name, "D");
                assert_eq!(node.payload["path"], "/d");
            }
            other => panic!("Expected NodeCreated, got {:?}", other),
        }
        assert_no_event(&mut rx);
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_create_emits_nothing() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let mut rx = service.subscribe_to_events();

        assert!(service
            .create_node("admin", "A", None, None, json!({}))
            .await
            .is_err());
        assert_no_event(&mut rx);
        Ok(())
    }

    #[tokio::test]
    async fn test_move_emits_only_when_position_changes() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let mut rx = service.subscribe_to_events();

        service.move_node("admin", "A", MoveTarget::Index(1)).await?;
        assert_no_event(&mut rx);

        service.move_node("admin", "A", MoveTarget::Index(2)).await?;
        match next_event(&mut rx).await {
            RouteEvent::NodeMoved { node } => {
                assert_eq!(node.name, "A");
                assert_ne!(node.prev_sibling, 0);
            }
            other => panic!("Expected NodeMoved, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_emits_all_removed_ids() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        service
            .create_node("admin", "B1", Some("B"), None, json!({}))
            .await?;
        let mut rx = service.subscribe_to_events();

        service.delete_node("admin", "B", true).await?;
        match next_event(&mut rx).await {
            RouteEvent::NodesDeleted { role, ids } => {
                assert_eq!(role, "admin");
                assert_eq!(ids.len(), 2);
            }
            other => panic!("Expected NodesDeleted, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_updates_emit_node_updated() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        service
            .seed_defaults("viewer", &[RouteSpec::new("A", json!({}))])
            .await?;
        let mut rx = service.subscribe_to_events();

        service.rename_node("admin", "B", "Beta").await?;
        let event = next_event(&mut rx).await;
        assert_eq!(event.event_type(), "route:updated");
        assert_eq!(event.role(), Some("admin"));

        service
            .patch_payload("admin", "C", json!({"hidden": true}))
            .await?;
        assert_eq!(next_event(&mut rx).await.event_type(), "route:updated");

        // One event per touched node across roles
        assert_eq!(service.set_visibility("A", true).await?, 2);
        let mut roles = vec![
            next_event(&mut rx).await.role().map(str::to_string),
            next_event(&mut rx).await.role().map(str::to_string),
        ];
        roles.sort();
        assert_eq!(roles, vec![Some("admin".to_string()), Some("viewer".to_string())]);
        assert_no_event(&mut rx);
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_emits_only_when_inserting() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let mut rx = service.subscribe_to_events();

        service
            .seed_defaults("admin", &[RouteSpec::new("A", json!({}))])
            .await?;
        assert_no_event(&mut rx);

        service
            .seed_defaults("admin", &[RouteSpec::new("D", json!({}))])
            .await?;
        match next_event(&mut rx).await {
            RouteEvent::Seeded { role, inserted } => {
                assert_eq!(role, "admin");
                assert_eq!(inserted, 1);
            }
            other => panic!("Expected Seeded, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_event_is_visible_after_commit() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let mut rx = service.subscribe_to_events();
        let reader = service.clone();

        let check = tokio::spawn(async move {
            let event = timeout(Duration::from_secs(1), rx.recv()).await??;
            let names = reader.sibling_names("admin", None).await?;
            Ok::<_, anyhow::Error>((event, names))
        });

        service.move_node("admin", "C", MoveTarget::Index(1)).await?;
        let (event, names) = check.await??;

        assert_eq!(event.event_type(), "route:moved");
        assert_eq!(names, vec!["C", "A", "B"]);
        Ok(())
    }
}
