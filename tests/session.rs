//! Wallet session lifecycle against an in-memory wallet.

mod common;

use std::sync::Arc;

use afo_market_sdk::prelude::*;
use afo_market_sdk::shared::checksum;
use common::*;

#[tokio::test]
async fn test_concurrent_connect_requests_accounts_once() {
    let h = Harness::new(alice());
    let gate = h.wallet.gate_connect();
    let session = Arc::clone(h.session());

    let first = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.connect().await }
    });

    let wallet = Arc::clone(&h.wallet);
    eventually(|| wallet.account_requests() == 1).await;

    let second = session.connect().await;
    assert_eq!(second.status, ConnectionState::Connecting);

    gate.notify_one();
    let first = within(first).await.unwrap();
    assert!(first.is_connected());
    assert_eq!(first.address, Some(alice()));
    assert_eq!(h.wallet.account_requests(), 1);
    assert_eq!(h.chain.bindings(), 1);
}

#[tokio::test]
async fn test_connect_builds_session() {
    let h = Harness::new(alice());
    let mut events = h.client.events();

    let session = h.client.connect().await;
    assert_eq!(session.status, ConnectionState::Connected);
    assert_eq!(session.chain_id, Some(31337));
    assert_eq!(session.display_name.as_deref(), Some(checksum(&alice()).as_str()));
    assert!(session.error.is_none());
    assert!(session.require_ready().is_ok());

    let events = drain(&mut events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, OutcomeKind::Success);
    assert_eq!(events[0].title, "Wallet Connected");
}

#[tokio::test]
async fn test_display_name_from_reverse_lookup() {
    let h = Harness::new(alice());
    h.wallet.set_name(alice(), "alice.eth");
    let session = h.client.connect().await;
    assert_eq!(session.display_name.as_deref(), Some("alice.eth"));
}

#[tokio::test]
async fn test_no_provider() {
    let client = MarketClient::builder()
        .contract_address(CONTRACT)
        .slot(ProviderSlot::new())
        .build()
        .unwrap();
    let mut events = client.events();

    let session = client.connect().await;
    assert_eq!(session.status, ConnectionState::Error);
    assert_eq!(session.error, Some(MarketError::NoProvider));
    assert!(matches!(
        session.require_ready(),
        Err(MarketError::NotConnected)
    ));

    let events = drain(&mut events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, OutcomeKind::Failure);
    assert_eq!(events[0].title, "No Wallet Found");
}

#[tokio::test]
async fn test_user_rejection() {
    let h = Harness::new(alice());
    h.wallet.reject_requests(true);
    let mut events = h.client.events();

    let session = h.client.connect().await;
    assert_eq!(session.status, ConnectionState::Disconnected);
    assert!(matches!(session.error, Some(MarketError::UserRejected(_))));
    assert!(session.contract.is_none());
    // Connecting, Error, Disconnected
    assert_eq!(session.generation, 3);

    let events = drain(&mut events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, OutcomeKind::Failure);
    assert_eq!(events[0].title, "Connection Failed");
    assert_eq!(events[0].message, "User rejected the request.");

    // A later attempt can succeed.
    h.wallet.reject_requests(false);
    assert!(h.client.connect().await.is_connected());
}

#[tokio::test]
async fn test_auto_connect_is_silent() {
    let h = Harness::new(alice());
    let mut events = h.client.events();
    let session = h.session().auto_connect().await;
    assert!(session.is_connected());
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let h = Harness::connected(alice()).await;
    let mut events = h.client.events();

    h.client.disconnect().await;
    let session = h.session().current();
    assert_eq!(session.status, ConnectionState::Disconnected);
    assert!(session.address.is_none());
    assert!(session.contract.is_none());
    let generation = session.generation;

    let first = drain(&mut events);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].kind, OutcomeKind::Warning);
    assert_eq!(first[0].title, "Wallet Disconnected");

    h.client.disconnect().await;
    assert_eq!(h.session().current().generation, generation);
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn test_account_change_rebuilds_binding() {
    let h = Harness::connected(alice()).await;
    let before = h.session().current();

    h.wallet.set_accounts(vec![bob()]);
    h.session()
        .handle_event(ProviderEvent::AccountsChanged(vec![bob()]))
        .await;

    let after = h.session().current();
    assert_eq!(after.address, Some(bob()));
    assert!(after.generation > before.generation);
    assert_eq!(h.chain.bindings(), 2);
}

#[tokio::test]
async fn test_empty_accounts_disconnects() {
    let h = Harness::connected(alice()).await;
    h.session()
        .handle_event(ProviderEvent::AccountsChanged(vec![]))
        .await;
    assert_eq!(h.session().current().status, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_listener_routes_provider_events() {
    let h = Harness::connected(alice()).await;
    let _listener = h.session().listen().await.unwrap();
    let mut sessions = h.session().subscribe();

    h.wallet.set_chain_id(5);
    h.wallet.emit(ProviderEvent::ChainChanged(5));
    within(sessions.wait_for(|s| s.is_connected() && s.chain_id == Some(5)))
        .await
        .unwrap();

    h.wallet.emit(ProviderEvent::Disconnect);
    within(sessions.wait_for(|s| s.status == ConnectionState::Disconnected))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_watchdog_detects_provider_swap() {
    let h = Harness::connected(alice()).await;
    let _listener = h.session().listen().await.unwrap();
    let mut sessions = h.session().subscribe();

    let replacement = FakeWallet::new(bob());
    h.session().slot().install(replacement.clone()).await;

    within(sessions.wait_for(|s| s.is_connected() && s.address == Some(bob())))
        .await
        .unwrap();
    assert_eq!(replacement.account_requests(), 1);

    // Events now come from the replacement.
    replacement.emit(ProviderEvent::AccountsChanged(vec![]));
    within(sessions.wait_for(|s| s.status == ConnectionState::Disconnected))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_single_listener_per_manager() {
    let h = Harness::new(alice());
    let first = h.session().listen().await;
    assert!(first.is_some());
    assert!(h.session().listen().await.is_none());

    drop(first);
    assert!(h.session().listen().await.is_some());
}
