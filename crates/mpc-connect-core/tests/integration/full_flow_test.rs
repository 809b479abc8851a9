//! Integration tests for the connection façade
//!
//! Tests the complete flows a host drives:
//! 1. Connect a device with its token set
//! 2. Read accounts and balances
//! 3. Sign a message / transfer an asset, polled to completion

use crate::support::*;
use mpc_connect_core::{
    Error, MessageEncoding, OperationStatus, PollCancellation, PollPolicy, TxHash, WalletMetadata,
};
use std::time::Duration;

fn wallet() -> WalletMetadata {
    WalletMetadata::new(DEVICE).with_provider("mpc-provider")
}

fn signing_script() -> ScriptedGateway {
    ScriptedGateway::new().with_statuses([
        OperationStatus::Queued,
        OperationStatus::PendingSignature,
        OperationStatus::Completed,
    ])
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_connect_then_read_balances() {
    let harness = Harness::new(ScriptedGateway::new());
    let service = harness.service(PollPolicy::fixed(10));

    service.connect(DEVICE, &valid_token_set()).await.unwrap();
    let assets = service.get_balances_for(&wallet()).await.unwrap();

    assert_eq!(assets.len(), 2);
    assert_eq!(assets[0].id, "eth-1");
    assert_eq!(assets[1].id, "matic-2");
    for asset in &assets {
        let balance = asset.balance.as_ref().unwrap();
        assert_eq!(balance.formatted, "1.5");
    }
    assert_eq!(harness.gateway.refreshes(), 0);
}

#[tokio::test]
async fn test_accounts_snapshot_is_cached() {
    let harness = Harness::with_tokens(ScriptedGateway::new(), &valid_token_set()).await;
    let service = harness.service(PollPolicy::fixed(10));

    let details = service.accounts_details(&wallet()).await.unwrap();
    assert_eq!(details.first_account.id, "acc-1");
    assert_eq!(details.assets().count(), 2);
    assert!(details.assets().all(|a| a.balance.is_none()));

    service.get_balances_for(&wallet()).await.unwrap();
    service.get_balances_for(&wallet()).await.unwrap();
    assert_eq!(
        ScriptedGateway::count(&harness.gateway.list_accounts_calls),
        1
    );

    service.refresh_accounts_details(&wallet()).await.unwrap();
    assert_eq!(
        ScriptedGateway::count(&harness.gateway.list_accounts_calls),
        2
    );
}

#[tokio::test]
async fn test_wallet_without_accounts() {
    let gateway = ScriptedGateway::new().with_accounts(Vec::new());
    let harness = Harness::with_tokens(gateway, &valid_token_set()).await;
    let service = harness.service(PollPolicy::fixed(10));

    let result = service.get_balances_for(&wallet()).await;

    assert!(matches!(result, Err(Error::AccountNotFound(_))));
}

#[tokio::test]
async fn test_read_with_expired_access_token_refreshes_once() {
    let harness = Harness::with_tokens(ScriptedGateway::new(), &stale_access_set()).await;
    let service = harness.service(PollPolicy::fixed(10));

    service.get_balances_for(&wallet()).await.unwrap();

    assert_eq!(harness.gateway.refreshes(), 1);
    let fresh = harness.gateway.issued()[0].access_token.as_str().to_string();
    assert!(harness.gateway.tokens_seen().iter().all(|t| *t == fresh));
}

#[tokio::test]
async fn test_estimate_network_fee() {
    let harness = Harness::with_tokens(ScriptedGateway::new(), &valid_token_set()).await;
    let service = harness.service(PollPolicy::fixed(10));
    let asset = asset("acc-1", "eth-1", "ETH");

    let estimate = service
        .estimate_network_fee(&wallet(), &asset, "0xdest", "1000")
        .await
        .unwrap();

    assert_eq!(estimate.asset_id, "eth-1");
    assert_eq!(estimate.fee.formatted, "0.000021");
    assert_eq!(ScriptedGateway::count(&harness.gateway.submit_calls), 0);
}

// ============================================================================
// Message Signing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_sign_message_full_flow() {
    let harness = Harness::with_tokens(signing_script(), &valid_token_set()).await;
    let service = harness.service(PollPolicy::fixed(100));
    let asset = asset("acc-1", "eth-1", "ETH");

    let signature = service
        .sign_message(&wallet(), &asset, "hello", MessageEncoding::Utf8, None)
        .await
        .unwrap();

    assert_eq!(signature.as_bytes(), &[0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(
        harness.participant.calls(),
        vec![(DEVICE.to_string(), TRANSACTION_ID.to_string())]
    );
    assert_eq!(ScriptedGateway::count(&harness.gateway.submit_calls), 1);
    assert_eq!(harness.gateway.polls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_sign_message_cancelled_while_waiting() {
    let gateway = ScriptedGateway::new().with_statuses([OperationStatus::Queued]);
    let harness = Harness::with_tokens(gateway, &valid_token_set()).await;
    let service = harness.service(PollPolicy::fixed(100).with_timeouts(60_000, 60_000));
    let asset = asset("acc-1", "eth-1", "ETH");
    let cancel = PollCancellation::new();
    let wallet = wallet();

    let (result, _) = tokio::join!(
        service.sign_message(&wallet, &asset, "0x68656c6c6f", MessageEncoding::Hex, Some(&cancel)),
        async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            cancel.cancel();
        }
    );

    assert!(matches!(result, Err(Error::Cancelled(_))));
    assert!(harness.participant.calls().is_empty());
    assert!(harness.reconnect.calls().is_empty());
}

// ============================================================================
// Asset Transfer
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_transfer_asset_full_flow() {
    let harness = Harness::with_tokens(signing_script(), &stale_access_set()).await;
    let service = harness.service(PollPolicy::fixed(100));
    let asset = asset("acc-2", "matic-2", "MATIC");

    let tx_hash = service
        .transfer_asset(&wallet(), &asset, "0xdest", "1000", None)
        .await
        .unwrap();

    assert_eq!(tx_hash, TxHash(TX_HASH.to_string()));
    assert_eq!(harness.participant.calls().len(), 1);
    assert_eq!(harness.gateway.refreshes(), 1);
    assert_eq!(harness.gateway.idempotency_keys().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transfer_completed_on_submission_skips_cosigning() {
    let gateway = ScriptedGateway::new().with_submit_status(OperationStatus::Completed);
    let harness = Harness::with_tokens(gateway, &valid_token_set()).await;
    let service = harness.service(PollPolicy::fixed(100));
    let asset = asset("acc-1", "eth-1", "ETH");

    let tx_hash = service
        .transfer_asset(&wallet(), &asset, "0xdest", "1000", None)
        .await
        .unwrap();

    assert_eq!(tx_hash.to_string(), TX_HASH);
    assert!(harness.participant.calls().is_empty());
    assert_eq!(harness.gateway.polls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_transfer_failure_is_not_retried() {
    let gateway = ScriptedGateway::new()
        .with_statuses([OperationStatus::Queued, OperationStatus::Failed]);
    let harness = Harness::with_tokens(gateway, &valid_token_set()).await;
    let service = harness.service(PollPolicy::fixed(100));
    let asset = asset("acc-1", "eth-1", "ETH");

    let result = service
        .transfer_asset(&wallet(), &asset, "0xdest", "1000", None)
        .await;

    assert!(matches!(result, Err(Error::OperationFailed { .. })));
    assert_eq!(ScriptedGateway::count(&harness.gateway.submit_calls), 1);
    assert!(harness.participant.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_transfer_timeout_is_not_retried() {
    let gateway = ScriptedGateway::new().with_statuses([OperationStatus::Queued]);
    let harness = Harness::with_tokens(gateway, &valid_token_set()).await;
    let service = harness.service(PollPolicy::fixed(100).with_timeouts(500, 500));
    let asset = asset("acc-1", "eth-1", "ETH");

    let result = service
        .transfer_asset(&wallet(), &asset, "0xdest", "1000", None)
        .await;

    assert!(matches!(result, Err(Error::OperationTimedOut { .. })));
    assert_eq!(ScriptedGateway::count(&harness.gateway.submit_calls), 1);
    assert!(harness.reconnect.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_separate_transfers_use_distinct_idempotency_keys() {
    let gateway = ScriptedGateway::new().with_submit_status(OperationStatus::Completed);
    let harness = Harness::with_tokens(gateway, &valid_token_set()).await;
    let service = harness.service(PollPolicy::fixed(100));
    let asset = asset("acc-1", "eth-1", "ETH");

    for _ in 0..2 {
        service
            .transfer_asset(&wallet(), &asset, "0xdest", "1000", None)
            .await
            .unwrap();
    }

    let keys = harness.gateway.idempotency_keys();
    assert_eq!(keys.len(), 2);
    assert_ne!(keys[0], keys[1]);
}

// ============================================================================
// Disconnect
// ============================================================================

#[tokio::test]
async fn test_disconnect_forgets_credentials() {
    let harness = Harness::with_tokens(ScriptedGateway::new(), &valid_token_set()).await;
    let service = harness.service(PollPolicy::fixed(10));
    service.get_balances_for(&wallet()).await.unwrap();

    service.disconnect(&wallet()).await.unwrap();

    assert_eq!(harness.stored().await, None);
    let result = service.get_balances_for(&wallet()).await;
    assert_eq!(result, Err(Error::NoCredentials(DEVICE.to_string())));
}
