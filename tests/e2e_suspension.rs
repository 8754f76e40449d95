use orch_e2e_tests::{setup, setup_with_strategy, MB};
use orch_engine::domain::ports::{LifecycleEvent, SuspendReason};
use orch_engine::domain::{
    DomainError, PageState, SpaceSettings, StrategyKind, SuspensionStrategy, TabOptions,
    TabStatus, TabUpdate,
};
use std::time::Duration;

#[tokio::test]
async fn test_e2e_suspend_restore_round_trip() {
    let env = setup();
    let orchestrator = env.orchestrator();
    let tab = env.open_tab("https://article.example").await;

    orchestrator
        .update_tab(
            &tab.id(),
            TabUpdate {
                title: Some("Long read".to_string()),
                status: Some(TabStatus::Complete),
                ..Default::default()
            },
        )
        .unwrap();
    let mut page_state = PageState {
        scroll_y: 1840.0,
        ..Default::default()
    };
    page_state
        .form_state
        .insert("comment".to_string(), "draft".to_string());
    orchestrator
        .update_page_state(&tab.id(), page_state.clone())
        .unwrap();

    assert!(orchestrator.suspend_tab(&tab.id()).await.unwrap());

    let suspended = orchestrator.get_tab(&tab.id()).unwrap();
    assert!(suspended.is_suspended());
    assert_eq!(suspended.status(), TabStatus::Suspended);
    assert!(env.snapshots.contains(&tab.id()));

    let process = env
        .processes()
        .get_process_info(&tab.process_id())
        .await
        .unwrap();
    assert!(process.is_suspended());
    assert_eq!(process.allocation().unwrap().memory_limit, 10 * MB);

    // Suspended tabs reject content updates
    assert!(matches!(
        orchestrator.update_tab(&tab.id(), TabUpdate::default()),
        Err(DomainError::InvalidStateTransition { .. })
    ));
    assert!(!orchestrator.suspend_tab(&tab.id()).await.unwrap());

    assert!(orchestrator.restore_tab(&tab.id()).await.unwrap());

    let restored = orchestrator.get_tab(&tab.id()).unwrap();
    assert!(!restored.is_suspended());
    assert_eq!(restored.status(), TabStatus::Complete);
    assert_eq!(restored.url(), "https://article.example");
    assert_eq!(restored.title(), "Long read");
    assert_eq!(restored.page_state(), &page_state);
    assert!(!env.snapshots.contains(&tab.id()));

    let process = env
        .processes()
        .get_process_info(&tab.process_id())
        .await
        .unwrap();
    assert!(!process.is_suspended());
    assert_eq!(process.allocation().unwrap().memory_limit, 512 * MB);

    assert!(!orchestrator.restore_tab(&tab.id()).await.unwrap());
    assert_eq!(env.count_events("tab-suspended"), 1);
    assert_eq!(env.count_events("tab-restored"), 1);
}

#[tokio::test]
async fn test_e2e_activation_restores_suspended_tab() {
    let env = setup();
    let orchestrator = env.orchestrator();
    let tab = env.open_tab("https://calendar.example").await;
    orchestrator.suspend_tab(&tab.id()).await.unwrap();

    let activated = orchestrator.activate_tab(&tab.id()).await.unwrap();

    assert!(!activated.is_suspended());
    assert_eq!(env.count_events("tab-restored"), 1);
}

#[tokio::test]
async fn test_e2e_lru_suspends_one_of_ten() {
    let env = setup_with_strategy(SuspensionStrategy::new(StrategyKind::Lru));
    let orchestrator = env.orchestrator();
    let tabs = env.open_tabs(10).await;

    let suspended = orchestrator.run_suspension_cycle().await.unwrap();

    assert_eq!(suspended, vec![tabs[0].id()]);
    assert!(orchestrator.get_tab(&tabs[0].id()).unwrap().is_suspended());
    assert_eq!(
        orchestrator
            .list_tabs(None)
            .unwrap()
            .iter()
            .filter(|t| t.is_suspended())
            .count(),
        1
    );

    match env.events.recent_named("tab-suspended").as_slice() {
        [LifecycleEvent::TabSuspended { tab_id, reason }] => {
            assert_eq!(*tab_id, tabs[0].id());
            assert_eq!(*reason, SuspendReason::Strategy(StrategyKind::Lru));
        }
        other => panic!("Unexpected events: {:?}", other),
    }
}

#[tokio::test]
async fn test_e2e_time_based_respects_pins_and_space_settings() {
    let strategy = SuspensionStrategy::new(StrategyKind::TimeBased)
        .with_grace_period(Duration::from_secs(30 * 60));
    let env = setup_with_strategy(strategy);
    let orchestrator = env.orchestrator();

    let quiet = orchestrator
        .create_space(
            "Reference",
            Some(SpaceSettings {
                auto_suspend: false,
                ..Default::default()
            }),
        )
        .unwrap();

    let idle = env.open_tab("https://idle.example").await;
    let pinned = orchestrator
        .create_tab("https://music.example", TabOptions::default().pinned())
        .await
        .unwrap();
    let protected = orchestrator
        .create_tab("https://wiki.example", TabOptions::in_space(quiet.id()))
        .await
        .unwrap();

    env.advance_minutes(45);
    let fresh = env.open_tab("https://fresh.example").await;

    let suspended = orchestrator.run_suspension_cycle().await.unwrap();

    assert_eq!(suspended, vec![idle.id()]);
    for tab in [&pinned, &protected, &fresh] {
        assert!(!orchestrator.get_tab(&tab.id()).unwrap().is_suspended());
    }

    // Already-suspended tabs are not considered again
    env.advance_minutes(45);
    let second = orchestrator.run_suspension_cycle().await.unwrap();
    assert_eq!(second, vec![fresh.id()]);
    assert!(!orchestrator.get_tab(&pinned.id()).unwrap().is_suspended());
}

#[tokio::test]
async fn test_e2e_hybrid_weighs_idle_time_and_memory() {
    let env = setup_with_strategy(SuspensionStrategy::new(StrategyKind::Hybrid));
    let orchestrator = env.orchestrator();
    let stale = env.open_tab("https://stale.example").await;
    let busy = env.open_tab("https://busy.example").await;
    for tab in [&stale, &busy] {
        env.set_process_memory(tab.process_id(), 256 * MB).await;
    }

    env.advance_minutes(60);
    orchestrator.activate_tab(&busy.id()).await.unwrap();

    let suspended = orchestrator.run_suspension_cycle().await.unwrap();

    assert_eq!(suspended, vec![stale.id()]);
    assert!(!orchestrator.get_tab(&busy.id()).unwrap().is_suspended());
}

#[tokio::test]
async fn test_e2e_unpinning_makes_tab_eligible() {
    let env = setup_with_strategy(SuspensionStrategy::new(StrategyKind::Lru));
    let orchestrator = env.orchestrator();
    let tab = orchestrator
        .create_tab("https://chat.example", TabOptions::default().pinned())
        .await
        .unwrap();

    assert!(orchestrator.run_suspension_cycle().await.unwrap().is_empty());

    assert!(orchestrator.unpin_tab(&tab.id()).unwrap());
    assert_eq!(
        orchestrator.run_suspension_cycle().await.unwrap(),
        vec![tab.id()]
    );
    assert_eq!(env.count_events("tab-unpinned"), 1);
}
