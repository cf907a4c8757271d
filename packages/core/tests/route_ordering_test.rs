//! Sibling Ordering Tests
//!
//! End-to-end checks of the back-pointer chain through the public
//! `RouteService` API: insert positions, every move target, deletes and the
//! materialize/reseed round trip.

#[cfg(test)]
mod route_ordering_tests {
    use anyhow::Result;
    use serde_json::json;
    use tempfile::TempDir;
    use uiroute_core::{MoveTarget, RouteService, RouteServiceError, RouteSpec, RouteStoreConfig};

    /// Helper to create a service on a fresh database
    async fn create_test_service() -> Result<(RouteService, TempDir)> {
        let temp_dir = TempDir::new()?;
        let config = RouteStoreConfig::with_db_path(temp_dir.path().join("routes.db"));
        let service = RouteService::open(config).await?;
        Ok((service, temp_dir))
    }

    fn leaf(name: &str) -> RouteSpec {
        RouteSpec::new(name, json!({ "path": format!("/{}", name.to_lowercase()) }))
    }

    /// Seed `["A", "B", "C"]` as admin roots
    async fn seed_abc(service: &RouteService) -> Result<()> {
        service
            .seed_defaults("admin", &[leaf("A"), leaf("B"), leaf("C")])
            .await?;
        Ok(())
    }

    /// Seed a two-level admin tree:
    ///
    /// ```text
    /// Project
    ///   Issues
    ///   Wiki
    ///   Files
    /// Profile
    /// ```
    async fn seed_project(service: &RouteService) -> Result<()> {
        let specs = vec![
            RouteSpec::new("Project", json!({"path": "/project"})).with_children(vec![
                leaf("Issues"),
                leaf("Wiki"),
                leaf("Files"),
            ]),
            leaf("Profile"),
        ];
        service.seed_defaults("admin", &specs).await?;
        Ok(())
    }

    async fn roots(service: &RouteService) -> Result<Vec<String>> {
        Ok(service.sibling_names("admin", None).await?)
    }

    async fn children(service: &RouteService, parent: &str) -> Result<Vec<String>> {
        Ok(service.sibling_names("admin", Some(parent)).await?)
    }

    /// Walk the chain by hand and check it agrees with the ordered listing
    async fn assert_single_chain(service: &RouteService, parent: Option<&str>) -> Result<()> {
        let listed = service.sibling_names("admin", parent).await?;
        let mut walked = Vec::new();
        let mut current = service.first_child("admin", parent).await?;
        while let Some(node) = current {
            assert!(
                walked.len() <= listed.len(),
                "chain is longer than its group"
            );
            walked.push(node.name.clone());
            current = service.next_sibling("admin", &node.name).await?;
        }
        assert_eq!(walked, listed);
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_scenario_chain() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        seed_abc(&service).await?;

        let first = service.first_child("admin", None).await?.unwrap();
        assert_eq!(first.name, "A");
        assert!(first.is_first());
        assert_eq!(
            service.next_sibling("admin", "A").await?.unwrap().name,
            "B"
        );
        assert_eq!(
            service.next_sibling("admin", "B").await?.unwrap().name,
            "C"
        );
        assert!(service.next_sibling("admin", "C").await?.is_none());
        assert_eq!(
            service.prev_sibling("admin", "B").await?.unwrap().name,
            "A"
        );
        assert_eq!(service.last_sibling("admin", "A").await?.name, "C");
        assert_eq!(service.node_index("admin", "C").await?, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_move_scenario() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        seed_abc(&service).await?;

        service.move_node("admin", "C", MoveTarget::Index(1)).await?;
        assert_eq!(roots(&service).await?, vec!["C", "A", "B"]);
        assert_single_chain(&service, None).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_scenario() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        seed_abc(&service).await?;

        service.delete_node("admin", "B", true).await?;
        assert_eq!(roots(&service).await?, vec!["A", "C"]);
        assert_eq!(
            service.next_sibling("admin", "A").await?.unwrap().name,
            "C"
        );
        assert_eq!(
            service.prev_sibling("admin", "C").await?.unwrap().name,
            "A"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_insert_after_scenario() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        seed_abc(&service).await?;

        service
            .create_node("admin", "D", None, Some("A"), json!({}))
            .await?;
        assert_eq!(roots(&service).await?, vec!["A", "D", "B", "C"]);
        assert_single_chain(&service, None).await?;

        // Tail insert needs no relinking
        service
            .create_node("admin", "E", None, Some("C"), json!({}))
            .await?;
        assert_eq!(roots(&service).await?, vec!["A", "D", "B", "C", "E"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_head_inserts_reverse_order() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let names = ["N1", "N2", "N3", "N4", "N5", "N6"];
        for name in names.iter().rev() {
            service.create_node("admin", name, None, None, json!({})).await?;
        }
        assert_eq!(roots(&service).await?, names);
        assert_single_chain(&service, None).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_move_to_current_index_is_noop() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        seed_abc(&service).await?;

        let before = service.get_node("admin", "B").await?.unwrap();
        service.move_node("admin", "B", MoveTarget::Index(2)).await?;
        let after = service.get_node("admin", "B").await?.unwrap();

        assert_eq!(roots(&service).await?, vec!["A", "B", "C"]);
        assert_eq!(before.prev_sibling, after.prev_sibling);
        assert_eq!(before.updated_at, after.updated_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_writes_in_the_same_second_bump_updated_at() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        seed_abc(&service).await?;

        let created = service.get_node("admin", "B").await?.unwrap();
        service
            .patch_payload("admin", "B", json!({"hidden": true}))
            .await?;
        let patched = service.get_node("admin", "B").await?.unwrap();
        assert!(patched.updated_at > created.updated_at);
        assert_eq!(patched.created_at, created.created_at);

        service.rename_node("admin", "B", "Beta").await?;
        let renamed = service.get_node("admin", "Beta").await?.unwrap();
        assert!(renamed.updated_at > patched.updated_at);

        service.move_node("admin", "Beta", MoveTarget::Index(1)).await?;
        let moved = service.get_node("admin", "Beta").await?.unwrap();
        assert!(moved.updated_at > renamed.updated_at);
        assert_eq!(moved.id, created.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_every_index_permutation_keeps_one_chain() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let specs: Vec<RouteSpec> = ["A", "B", "C", "D"].iter().map(|n| leaf(n)).collect();
        service.seed_defaults("admin", &specs).await?;

        let mut expected: Vec<String> = roots(&service).await?;
        for name in ["A", "B", "C", "D"] {
            for index in 1..=4 {
                service.move_node("admin", name, MoveTarget::Index(index)).await?;

                let current = expected.iter().position(|n| n == name).unwrap();
                let moved = expected.remove(current);
                expected.insert(index - 1, moved);

                assert_eq!(roots(&service).await?, expected, "{} -> {}", name, index);
                assert_eq!(service.node_index("admin", name).await?, index);
            }
        }
        assert_single_chain(&service, None).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_move_index_out_of_range() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        seed_abc(&service).await?;

        for index in [0, 4] {
            let err = service
                .move_node("admin", "A", MoveTarget::Index(index))
                .await
                .unwrap_err();
            assert!(matches!(err, RouteServiceError::Conflict(_)));
        }
        assert_eq!(roots(&service).await?, vec!["A", "B", "C"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_move_after_reparents() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        seed_project(&service).await?;

        let profile_id = service.get_node("admin", "Profile").await?.unwrap().id;
        service
            .move_node("admin", "Profile", MoveTarget::After("Issues".into()))
            .await?;

        assert_eq!(roots(&service).await?, vec!["Project"]);
        assert_eq!(
            children(&service, "Project").await?,
            vec!["Issues", "Profile", "Wiki", "Files"]
        );

        let profile = service.get_node("admin", "Profile").await?.unwrap();
        assert_eq!(profile.id, profile_id);
        assert_eq!(profile.payload["path"], "/profile");
        assert_single_chain(&service, Some("Project")).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_move_after_self_is_noop() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        seed_abc(&service).await?;

        service
            .move_node("admin", "B", MoveTarget::After("B".into()))
            .await?;
        assert_eq!(roots(&service).await?, vec!["A", "B", "C"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_move_into_own_subtree_is_conflict() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        seed_project(&service).await?;

        let err = service
            .move_node("admin", "Project", MoveTarget::After("Wiki".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, RouteServiceError::Conflict(_)));

        let err = service
            .move_node(
                "admin",
                "Project",
                MoveTarget::Head {
                    parent: Some("Project".into()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RouteServiceError::Conflict(_)));

        assert_eq!(roots(&service).await?, vec!["Project", "Profile"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_move_head_and_tail() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        seed_project(&service).await?;

        service
            .move_node("admin", "Files", MoveTarget::Head { parent: Some("Project".into()) })
            .await?;
        assert_eq!(
            children(&service, "Project").await?,
            vec!["Files", "Issues", "Wiki"]
        );

        service
            .move_node("admin", "Files", MoveTarget::Tail { parent: Some("Project".into()) })
            .await?;
        assert_eq!(
            children(&service, "Project").await?,
            vec!["Issues", "Wiki", "Files"]
        );

        // Already last: nothing changes
        service
            .move_node("admin", "Files", MoveTarget::Tail { parent: Some("Project".into()) })
            .await?;
        assert_eq!(
            children(&service, "Project").await?,
            vec!["Issues", "Wiki", "Files"]
        );

        // Out to the root level, at the end
        service
            .move_node("admin", "Issues", MoveTarget::Tail { parent: None })
            .await?;
        assert_eq!(roots(&service).await?, vec!["Project", "Profile", "Issues"]);
        assert_eq!(children(&service, "Project").await?, vec!["Wiki", "Files"]);

        // Into an empty group
        service
            .move_node("admin", "Files", MoveTarget::Head { parent: Some("Profile".into()) })
            .await?;
        assert_eq!(children(&service, "Profile").await?, vec!["Files"]);
        assert_eq!(children(&service, "Project").await?, vec!["Wiki"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_cascade_and_no_cascade() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        seed_project(&service).await?;

        let err = service
            .delete_node("admin", "Project", false)
            .await
            .unwrap_err();
        assert!(matches!(err, RouteServiceError::Conflict(_)));
        assert_eq!(children(&service, "Project").await?.len(), 3);

        // Leaves can go without cascade
        service.delete_node("admin", "Wiki", false).await?;
        assert_eq!(children(&service, "Project").await?, vec!["Issues", "Files"]);

        service.delete_node("admin", "Project", true).await?;
        assert_eq!(roots(&service).await?, vec!["Profile"]);
        assert!(service.get_node("admin", "Issues").await?.is_none());
        assert!(service.get_node("admin", "Files").await?.is_none());

        let profile = service.get_node("admin", "Profile").await?.unwrap();
        assert!(profile.is_first());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_first_and_last() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        seed_abc(&service).await?;

        service.delete_node("admin", "A", true).await?;
        assert_eq!(roots(&service).await?, vec!["B", "C"]);
        assert!(service.get_node("admin", "B").await?.unwrap().is_first());

        service.delete_node("admin", "C", true).await?;
        assert_eq!(roots(&service).await?, vec!["B"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_under_parent() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        seed_project(&service).await?;

        service
            .create_node("admin", "Board", Some("Project"), Some("Wiki"), json!({}))
            .await?;
        assert_eq!(
            children(&service, "Project").await?,
            vec!["Issues", "Wiki", "Board", "Files"]
        );

        // `after` must be a sibling under the given parent
        let err = service
            .create_node("admin", "Stray", None, Some("Issues"), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, RouteServiceError::Conflict(_)));

        let err = service
            .create_node("admin", "Orphan", Some("Missing"), None, json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, RouteServiceError::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_roles_are_independent() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        seed_abc(&service).await?;
        service
            .seed_defaults("viewer", &[leaf("C"), leaf("A")])
            .await?;

        service.move_node("admin", "A", MoveTarget::Index(3)).await?;

        assert_eq!(roots(&service).await?, vec!["B", "C", "A"]);
        assert_eq!(
            service.sibling_names("viewer", None).await?,
            vec!["C", "A"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_materialize_reseed_round_trip() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        seed_project(&service).await?;
        service
            .move_node("admin", "Files", MoveTarget::Index(1))
            .await?;

        let tree = service.get_tree("admin").await?;
        let specs = tree.to_specs();

        service.seed_defaults("copy", &specs).await?;
        let copy = service.get_tree("copy").await?;

        assert_eq!(tree.outline(), copy.outline());
        assert_eq!(
            tree.routes[0].children[0].payload["path"],
            copy.routes[0].children[0].payload["path"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_get_tree_ui_format() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        seed_project(&service).await?;

        let routes = service.get_tree("admin").await?.to_ui_routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0]["name"], "Project");
        assert_eq!(routes[0]["children"][1]["name"], "Wiki");
        assert!(routes[1].get("children").is_none());
        Ok(())
    }
}
