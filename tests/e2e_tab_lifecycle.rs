use orch_e2e_tests::setup;
use orch_engine::domain::{
    DomainError, SortField, SortOrder, SpaceSettings, TabOptions, TabSearchQuery, TabStatus,
    TabUpdate,
};

#[tokio::test]
async fn test_e2e_create_and_destroy_tab() {
    let env = setup();
    let orchestrator = env.orchestrator();

    let tab = env.open_tab("https://news.example").await;
    assert_eq!(tab.space_id(), orchestrator.default_space_id().unwrap());
    assert_eq!(tab.status(), TabStatus::Loading);
    assert_eq!(tab.history(), &["https://news.example".to_string()]);
    assert!(env.substrate.is_running(&tab.process_id()));
    env.assert_one_process_per_tab().await;

    assert!(orchestrator.destroy_tab(&tab.id()).await.unwrap());

    assert!(matches!(
        orchestrator.get_tab(&tab.id()),
        Err(DomainError::TabNotFound(_))
    ));
    assert!(!env.substrate.is_running(&tab.process_id()));
    assert!(env.processes().list_processes().await.unwrap().is_empty());
    assert_eq!(
        env.event_names(),
        vec![
            "process-created",
            "tab-created",
            "process-destroyed",
            "tab-destroyed"
        ]
    );

    // Second destroy is a no-op
    assert!(!orchestrator.destroy_tab(&tab.id()).await.unwrap());
}

#[tokio::test]
async fn test_e2e_failed_spawn_leaves_no_tab() {
    let env = setup();
    env.substrate.fail_next_spawns(1);

    let result = env
        .orchestrator()
        .create_tab("https://flaky.example", TabOptions::default())
        .await;

    assert!(result.is_err());
    assert_eq!(env.orchestrator().tab_count().unwrap(), 0);
    assert!(env.processes().list_processes().await.unwrap().is_empty());

    env.open_tab("https://flaky.example").await;
    env.assert_one_process_per_tab().await;
}

#[tokio::test]
async fn test_e2e_groups_and_moves_across_spaces() {
    let env = setup();
    let orchestrator = env.orchestrator();
    let work = orchestrator.create_space("Work", None).unwrap();
    let research = orchestrator.create_group(&work.id(), "Research", "blue").unwrap();
    let home = orchestrator.default_space_id().unwrap();

    let grouped = orchestrator
        .create_tab("https://paper.example", TabOptions::in_group(research.id()))
        .await
        .unwrap();
    assert_eq!(grouped.space_id(), work.id());
    assert_eq!(
        orchestrator.get_group(&research.id()).unwrap().tab_ids(),
        &[grouped.id()]
    );

    let loose = env.open_tab("https://mail.example").await;
    assert_eq!(loose.space_id(), home);

    orchestrator
        .move_tab(&loose.id(), Some(research.id()))
        .await
        .unwrap();
    let moved = orchestrator.get_tab(&loose.id()).unwrap();
    assert_eq!(moved.space_id(), work.id());
    assert_eq!(moved.group_id(), Some(research.id()));
    assert_eq!(orchestrator.list_tabs(Some(&work.id())).unwrap().len(), 2);
    assert!(orchestrator.list_tabs(Some(&home)).unwrap().is_empty());

    // Deleting the group ungroups its members but keeps them in the space
    orchestrator.delete_group(&research.id()).unwrap();
    for tab in orchestrator.list_tabs(Some(&work.id())).unwrap() {
        assert_eq!(tab.group_id(), None);
    }
    assert_eq!(env.count_events("tab-moved"), 1);
}

#[tokio::test]
async fn test_e2e_mismatched_group_and_space_rejected() {
    let env = setup();
    let orchestrator = env.orchestrator();
    let work = orchestrator.create_space("Work", None).unwrap();
    let group = orchestrator.create_group(&work.id(), "Docs", "red").unwrap();

    let options = TabOptions {
        space_id: Some(orchestrator.default_space_id().unwrap()),
        group_id: Some(group.id()),
        ..Default::default()
    };
    let err = orchestrator
        .create_tab("https://docs.example", options)
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::InvalidCommand(_)));
    assert_eq!(env.substrate.spawn_count(), 0);
}

#[tokio::test]
async fn test_e2e_delete_space_destroys_its_tabs() {
    let env = setup();
    let orchestrator = env.orchestrator();
    let scratch = orchestrator
        .create_space(
            "Scratch",
            Some(SpaceSettings {
                auto_suspend: false,
                ..Default::default()
            }),
        )
        .unwrap();

    for url in ["https://a.example", "https://b.example"] {
        orchestrator
            .create_tab(url, TabOptions::in_space(scratch.id()))
            .await
            .unwrap();
    }
    let kept = env.open_tab("https://kept.example").await;

    assert_eq!(orchestrator.delete_space(&scratch.id()).await.unwrap(), 2);
    assert!(orchestrator.get_space(&scratch.id()).is_err());
    assert_eq!(orchestrator.tab_count().unwrap(), 1);
    assert!(orchestrator.get_tab(&kept.id()).is_ok());
    env.assert_one_process_per_tab().await;

    let default_space = orchestrator.default_space_id().unwrap();
    assert!(matches!(
        orchestrator.delete_space(&default_space).await,
        Err(DomainError::InvalidCommand(_))
    ));
}

#[tokio::test]
async fn test_e2e_navigation_and_activation() {
    let env = setup();
    let orchestrator = env.orchestrator();
    let first = env.open_tab("https://first.example").await;
    let second = env.open_tab("https://second.example").await;

    let updated = orchestrator
        .update_tab(
            &first.id(),
            TabUpdate {
                url: Some("https://first.example/page".to_string()),
                title: Some("First page".to_string()),
                status: Some(TabStatus::Complete),
            },
        )
        .unwrap();
    assert_eq!(updated.url(), "https://first.example/page");
    assert_eq!(updated.title(), "First page");
    assert_eq!(updated.history().len(), 2);

    env.advance_minutes(5);
    let activated = orchestrator.activate_tab(&second.id()).await.unwrap();
    assert_eq!(activated.last_active(), env.clock_now());
    let space = orchestrator.get_space(&second.space_id()).unwrap();
    assert_eq!(space.active_tab_id(), Some(second.id()));
}

#[tokio::test]
async fn test_e2e_search_ranks_pinned_tabs_first() {
    let env = setup();
    let orchestrator = env.orchestrator();
    let tabs = env.open_tabs(4).await;
    orchestrator.pin_tab(&tabs[0].id()).unwrap();
    orchestrator.suspend_tab(&tabs[3].id()).await.unwrap();

    let results = orchestrator
        .search_tabs_advanced(
            &TabSearchQuery::new()
                .text("site")
                .sort(SortField::Relevance, SortOrder::Descending),
        )
        .unwrap();
    assert_eq!(results.total, 4);
    assert_eq!(results.tabs[0].id(), tabs[0].id());

    let live = orchestrator
        .search_tabs_advanced(&TabSearchQuery::new().suspended(false).page(0, 2))
        .unwrap();
    assert_eq!(live.total, 3);
    assert_eq!(live.tabs.len(), 2);
    assert!(live.tabs.iter().all(|t| !t.is_suspended()));
}
