mod common;

use std::time::Duration;

use common::{report, test_config, Call, Harness};
use fundboard_proto::overview::{GoldMacro, OverviewSnapshot};
use fundboard_proto::protocol::{Command, FailureKind, LoadStatus, Severity};
use fundboard_proto::report::{AssetKind, FundCode};
use fundboard_sync::{CoreConfig, CoreEvent, DashboardError, Discard};

fn snapshot(price: f64) -> OverviewSnapshot {
    OverviewSnapshot {
        gold_macro: Some(GoldMacro {
            price: Some(price),
            ..GoldMacro::default()
        }),
        ..OverviewSnapshot::default()
    }
}

#[tokio::test]
async fn refresh_auto_selects_canonical_first_report() {
    let mut h = Harness::new();
    h.cmd(Command::Refresh).await.unwrap();
    assert!(h.state().await.catalog.refreshing);

    match h.next_call().await {
        Call::Reports(r) => r
            .send(Ok(vec![
                report("s1.md", FundCode::Silver, "2024-05-02"),
                report("g1.md", FundCode::Gold, "2024-05-02"),
                report("g0.md", FundCode::Gold, "2024-05-01"),
            ]))
            .unwrap(),
        other => panic!("unexpected call {:?}", other),
    }
    h.pump().await;

    let state = h.state().await;
    assert!(!state.catalog.refreshing);
    assert_eq!(state.catalog.reports.len(), 3);
    assert_eq!(state.catalog.expanded_dates, vec!["2024-05-02".to_string()]);
    assert_eq!(state.selection.current.as_ref().unwrap().filename, "g1.md");
    assert_eq!(state.selection.status(), LoadStatus::Loading);

    match h.next_call().await {
        Call::Content(filename, r) => {
            assert_eq!(filename, "g1.md");
            r.send(Ok("# Gold".into())).unwrap();
        }
        other => panic!("unexpected call {:?}", other),
    }
    h.pump().await;

    let state = h.state().await;
    assert_eq!(state.selection.content, "# Gold");
    assert_eq!(state.selection.status(), LoadStatus::Loaded);
}

#[tokio::test]
async fn refresh_keeps_existing_selection() {
    let mut h = Harness::new();
    h.seed(vec![report("g1.md", FundCode::Gold, "2024-05-02")]).await;
    h.seed(vec![
        report("g2.md", FundCode::Gold, "2024-05-03"),
        report("g1.md", FundCode::Gold, "2024-05-02"),
    ])
    .await;

    let state = h.state().await;
    assert_eq!(state.selection.current.unwrap().filename, "g1.md");
    assert_eq!(state.catalog.expanded_dates, vec!["2024-05-03".to_string()]);
    h.assert_no_call();
}

#[tokio::test]
async fn late_content_for_superseded_selection_is_discarded() {
    let mut h = Harness::new();
    let a = report("a.md", FundCode::Gold, "2024-05-02");
    let b = report("b.md", FundCode::Silver, "2024-05-02");
    h.seed(vec![a.clone(), b.clone()]).await;

    h.cmd(Command::Select { report: a }).await.unwrap();
    h.cmd(Command::Select { report: b }).await.unwrap();

    let mut pending_a = None;
    let mut pending_b = None;
    for _ in 0..2 {
        match h.next_call().await {
            Call::Content(f, r) if f == "a.md" => pending_a = Some(r),
            Call::Content(f, r) if f == "b.md" => pending_b = Some(r),
            other => panic!("unexpected call {:?}", other),
        }
    }
    h.discards();

    pending_b.unwrap().send(Ok("B".into())).unwrap();
    h.pump().await;
    pending_a.unwrap().send(Ok("A".into())).unwrap();
    h.pump().await;

    let state = h.state().await;
    assert_eq!(state.selection.current.unwrap().filename, "b.md");
    assert_eq!(state.selection.content, "B");
    assert!(!state.selection.loading);
    assert!(matches!(
        h.discards().as_slice(),
        [Discard::StaleContent { filename, .. }] if filename == "a.md"
    ));
}

#[tokio::test]
async fn select_by_unknown_filename_is_not_found() {
    let mut h = Harness::new();
    h.seed(vec![report("g1.md", FundCode::Gold, "2024-05-02")]).await;

    let err = h
        .cmd(Command::SelectFilename {
            filename: "nope.md".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err, DashboardError::NotFound("nope.md".into()));
    h.assert_no_call();
}

#[tokio::test]
async fn content_failure_keeps_previous_content() {
    let mut h = Harness::new();
    h.seed(vec![
        report("g1.md", FundCode::Gold, "2024-05-02"),
        report("s1.md", FundCode::Silver, "2024-05-02"),
    ])
    .await;

    h.cmd(Command::SelectFilename {
        filename: "s1.md".into(),
    })
    .await
    .unwrap();
    match h.next_call().await {
        Call::Content(_, r) => r
            .send(Err(DashboardError::NotFound("s1.md".into())))
            .unwrap(),
        other => panic!("unexpected call {:?}", other),
    }
    h.pump().await;

    let state = h.state().await;
    assert_eq!(state.selection.content, "initial");
    assert_eq!(state.selection.status(), LoadStatus::Failed);
    assert_eq!(state.selection.error.unwrap().kind, FailureKind::NotFound);
}

#[tokio::test(start_paused = true)]
async fn content_timeout_resolves_as_network_failure() {
    let mut h = Harness::new();
    h.seed(vec![
        report("g1.md", FundCode::Gold, "2024-05-02"),
        report("s1.md", FundCode::Silver, "2024-05-02"),
    ])
    .await;

    h.cmd(Command::SelectFilename {
        filename: "s1.md".into(),
    })
    .await
    .unwrap();
    let _held = match h.next_call().await {
        Call::Content(_, r) => r,
        other => panic!("unexpected call {:?}", other),
    };

    match h.next_event().await {
        CoreEvent::ContentLoaded { result, ticket } => {
            assert_eq!(ticket.filename, "s1.md");
            assert_eq!(result, Err(DashboardError::Timeout(Duration::from_secs(5))));
            h.core
                .handle_event(CoreEvent::ContentLoaded { ticket, result })
                .await;
        }
        other => panic!("unexpected event {:?}", other),
    }

    let state = h.state().await;
    assert!(!state.selection.loading);
    assert_eq!(state.selection.content, "initial");
    assert_eq!(state.selection.error.unwrap().kind, FailureKind::Network);
}

#[tokio::test]
async fn catalog_failure_keeps_previous_catalog() {
    let mut h = Harness::new();
    h.seed(vec![report("g1.md", FundCode::Gold, "2024-05-02")]).await;

    h.cmd(Command::Refresh).await.unwrap();
    match h.next_call().await {
        Call::Reports(r) => r
            .send(Err(DashboardError::Network("connection refused".into())))
            .unwrap(),
        other => panic!("unexpected call {:?}", other),
    }
    h.pump().await;

    let state = h.state().await;
    assert!(!state.catalog.refreshing);
    assert_eq!(state.catalog.reports.len(), 1);
    assert_eq!(state.catalog.last_error.unwrap().kind, FailureKind::Network);
    assert_eq!(state.selection.content, "initial");
}

#[tokio::test]
async fn older_listing_never_overwrites_newer() {
    let mut h = Harness::new();
    h.cmd(Command::Refresh).await.unwrap();
    h.cmd(Command::Refresh).await.unwrap();

    let first = match h.next_call().await {
        Call::Reports(r) => r,
        other => panic!("unexpected call {:?}", other),
    };
    let second = match h.next_call().await {
        Call::Reports(r) => r,
        other => panic!("unexpected call {:?}", other),
    };

    second
        .send(Ok(vec![report("g2.md", FundCode::Gold, "2024-05-03")]))
        .unwrap();
    h.pump().await;
    assert!(h.state().await.catalog.refreshing);

    first
        .send(Ok(vec![report("g1.md", FundCode::Gold, "2024-05-02")]))
        .unwrap();
    h.pump().await;

    let state = h.state().await;
    assert!(!state.catalog.refreshing);
    assert_eq!(state.catalog.reports[0].filename, "g2.md");
    assert!(h
        .discards()
        .contains(&Discard::StaleCatalog { seq: 1, applied: 2 }));
}

#[tokio::test]
async fn one_generation_at_a_time_across_assets() {
    let mut h = Harness::new();
    h.cmd(Command::Generate {
        asset: AssetKind::Gold,
    })
    .await
    .unwrap();

    assert_eq!(
        h.cmd(Command::Generate {
            asset: AssetKind::Silver
        })
        .await,
        Err(DashboardError::Busy(AssetKind::Gold))
    );
    assert_eq!(
        h.cmd(Command::Generate {
            asset: AssetKind::Gold
        })
        .await,
        Err(DashboardError::Busy(AssetKind::Gold))
    );

    let state = h.state().await;
    assert!(state.generation.busy);
    assert_eq!(state.generation.running, Some(AssetKind::Gold));

    let pending = match h.next_call().await {
        Call::Generate(asset, r) => {
            assert_eq!(asset, AssetKind::Gold);
            r
        }
        other => panic!("unexpected call {:?}", other),
    };
    h.assert_no_call();

    pending.send(Ok(())).unwrap();
    h.pump().await;

    let state = h.state().await;
    assert!(!state.generation.busy);
    assert!(state.generation.last_outcome.unwrap().succeeded);
    assert!(state
        .notices
        .iter()
        .any(|n| n.severity == Severity::Success && n.message == "Gold analysis complete"));

    // A finished job refreshes the catalog.
    assert!(matches!(h.next_call().await, Call::Reports(_)));

    h.cmd(Command::Generate {
        asset: AssetKind::Silver,
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn generation_failure_raises_sticky_error_notice() {
    let mut h = Harness::new();
    h.cmd(Command::Generate {
        asset: AssetKind::Silver,
    })
    .await
    .unwrap();
    match h.next_call().await {
        Call::Generate(_, r) => r
            .send(Err(DashboardError::Network("502 Bad Gateway".into())))
            .unwrap(),
        other => panic!("unexpected call {:?}", other),
    }
    h.pump().await;

    let state = h.state().await;
    assert!(!state.generation.busy);
    assert!(!state.generation.last_outcome.unwrap().succeeded);
    let notice = &state.notices[0];
    assert_eq!(notice.severity, Severity::Error);
    assert!(notice.message.starts_with("Silver analysis failed"));
    h.assert_no_call();

    h.core.handle_event(CoreEvent::HousekeepingTick).await;
    assert_eq!(h.state().await.notices.len(), 1);

    let id = notice.id;
    h.cmd(Command::DismissNotice { id }).await.unwrap();
    assert!(h.state().await.notices.is_empty());
}

#[tokio::test]
async fn results_from_stopped_poller_are_ignored() {
    let mut h = Harness::new();
    h.cmd(Command::StartPolling).await.unwrap();
    let state = h.state().await;
    assert!(state.overview.active);
    assert!(state.overview.loading);

    match h.next_call().await {
        Call::Overview(r) => r.send(Ok(snapshot(2350.0))).unwrap(),
        other => panic!("unexpected call {:?}", other),
    }
    let late = h.next_event().await;
    assert!(matches!(late, CoreEvent::OverviewLoaded { epoch: 1, .. }));

    h.cmd(Command::StopPolling).await.unwrap();
    let rev = h.state().await.rev;
    h.discards();

    assert!(h.core.handle_event(late).await);

    let state = h.state().await;
    assert_eq!(state.rev, rev);
    assert!(!state.overview.active);
    assert!(state.overview.snapshot.is_none());
    assert_eq!(h.discards(), vec![Discard::InactivePoller { epoch: 1 }]);
}

#[tokio::test(start_paused = true)]
async fn request_outstanding_at_stop_never_lands() {
    let mut h = Harness::new();
    h.cmd(Command::StartPolling).await.unwrap();
    let pending = match h.next_call().await {
        Call::Overview(r) => r,
        other => panic!("unexpected call {:?}", other),
    };

    h.cmd(Command::StopPolling).await.unwrap();
    let rev = h.state().await.rev;
    h.discards();

    // The poll task is gone, so the response has nowhere to go.
    let _ = pending.send(Ok(snapshot(2350.0)));
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert!(h.events.try_recv().is_err());
    h.assert_no_call();
    let state = h.state().await;
    assert_eq!(state.rev, rev);
    assert!(!state.overview.active);
    assert!(state.overview.snapshot.is_none());
    assert!(h.discards().is_empty());
}

#[tokio::test(start_paused = true)]
async fn overview_polls_never_overlap() {
    let mut h = Harness::with_config(CoreConfig {
        overview_interval: Duration::from_secs(1),
        request_timeout: Duration::from_secs(20),
        ..test_config()
    });
    h.cmd(Command::StartPolling).await.unwrap();
    // Starting twice keeps the running poller.
    h.cmd(Command::StartPolling).await.unwrap();

    let first = match h.next_call().await {
        Call::Overview(r) => r,
        other => panic!("unexpected call {:?}", other),
    };

    // Several intervals pass while the first request is outstanding.
    tokio::time::sleep(Duration::from_secs(4)).await;
    h.assert_no_call();

    first.send(Ok(snapshot(2350.0))).unwrap();
    h.pump().await;
    let state = h.state().await;
    assert!(!state.overview.loading);
    assert_eq!(
        state.overview.snapshot.unwrap().gold_macro.unwrap().price,
        Some(2350.0)
    );

    match h.next_call().await {
        Call::Overview(r) => r
            .send(Err(DashboardError::Network("503".into())))
            .unwrap(),
        other => panic!("unexpected call {:?}", other),
    }
    h.pump().await;

    // A failed tick keeps the last snapshot and records the failure.
    let state = h.state().await;
    assert!(state.overview.snapshot.is_some());
    assert_eq!(state.overview.last_error.unwrap().kind, FailureKind::Network);
    h.assert_no_call();
}

#[tokio::test(start_paused = true)]
async fn manual_overview_refresh_polls_immediately() {
    let mut h = Harness::new();
    h.cmd(Command::StartPolling).await.unwrap();
    match h.next_call().await {
        Call::Overview(r) => r.send(Ok(snapshot(1.0))).unwrap(),
        other => panic!("unexpected call {:?}", other),
    }
    h.pump().await;

    let before = tokio::time::Instant::now();
    h.cmd(Command::RefreshOverview).await.unwrap();
    assert!(h.state().await.overview.loading);
    assert!(matches!(h.next_call().await, Call::Overview(_)));
    assert!(before.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn query_and_date_toggles_are_published() {
    let mut h = Harness::new();
    h.seed(vec![
        report("g2.md", FundCode::Gold, "2024-05-02"),
        report("g1.md", FundCode::Gold, "2024-05-01"),
    ])
    .await;

    h.cmd(Command::SetQuery {
        query: "05-01".into(),
    })
    .await
    .unwrap();
    h.cmd(Command::ToggleDate {
        date: "2024-05-01".into(),
    })
    .await
    .unwrap();
    h.cmd(Command::ToggleDate {
        date: "2024-05-02".into(),
    })
    .await
    .unwrap();

    let state = h.state().await;
    assert_eq!(state.query, "05-01");
    assert_eq!(state.catalog.expanded_dates, vec!["2024-05-01".to_string()]);
}
