//! Integration tests for the host reconnect callback
//!
//! The host is asked to reconnect only when credentials are missing or every
//! tier has expired. Other failures are returned without a callback.

use crate::support::*;
use mpc_connect_core::{
    ConnectionConfig, Error, MemoryCredentialStorage, MessageEncoding, MpcConnectionService,
    OperationStatus, PollPolicy, ReconnectReason, WalletMetadata,
};
use std::sync::Arc;

#[tokio::test]
async fn test_missing_credentials_ask_to_reconnect() {
    let harness = Harness::new(ScriptedGateway::new());
    let service = harness.service(PollPolicy::fixed(10));

    let result = service.get_balances_for(&WalletMetadata::new(DEVICE)).await;

    assert_eq!(result, Err(Error::NoCredentials(DEVICE.to_string())));
    assert_eq!(
        harness.reconnect.calls(),
        vec![(DEVICE.to_string(), ReconnectReason::NoCredentials)]
    );
    assert_eq!(harness.gateway.network_calls(), 0);
}

#[tokio::test]
async fn test_exhausted_credentials_ask_to_reconnect() {
    let harness = Harness::with_tokens(ScriptedGateway::new(), &exhausted_set()).await;
    let service = harness.service(PollPolicy::fixed(10));
    let asset = asset("acc-1", "eth-1", "ETH");

    let result = service
        .sign_message(
            &WalletMetadata::new(DEVICE),
            &asset,
            "hello",
            MessageEncoding::Utf8,
            None,
        )
        .await;

    assert_eq!(result, Err(Error::AuthExhausted(DEVICE.to_string())));
    assert_eq!(
        harness.reconnect.calls(),
        vec![(DEVICE.to_string(), ReconnectReason::CredentialsExpired)]
    );
    assert_eq!(harness.gateway.network_calls(), 0);
}

#[tokio::test]
async fn test_refresh_failure_does_not_ask_to_reconnect() {
    let gateway =
        ScriptedGateway::new().with_refresh_failure(Error::RefreshFailed("revoked".into()));
    let harness = Harness::with_tokens(gateway, &stale_access_set()).await;
    let service = harness.service(PollPolicy::fixed(10));

    let result = service.get_balances_for(&WalletMetadata::new(DEVICE)).await;

    assert_eq!(result, Err(Error::RefreshFailed("revoked".into())));
    assert!(harness.reconnect.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_operation_failure_does_not_ask_to_reconnect() {
    let gateway = ScriptedGateway::new().with_statuses([OperationStatus::Failed]);
    let harness = Harness::with_tokens(gateway, &valid_token_set()).await;
    let service = harness.service(PollPolicy::fixed(10));
    let asset = asset("acc-1", "eth-1", "ETH");

    let result = service
        .transfer_asset(&WalletMetadata::new(DEVICE), &asset, "0xdest", "5", None)
        .await;

    assert!(matches!(result, Err(Error::OperationFailed { .. })));
    assert!(harness.reconnect.calls().is_empty());
}

#[tokio::test]
async fn test_reconnect_asked_once_per_failed_call() {
    let harness = Harness::with_tokens(ScriptedGateway::new(), &exhausted_set()).await;
    let service = harness.service(PollPolicy::fixed(10));
    let wallet = WalletMetadata::new(DEVICE);

    let _ = service.get_balances_for(&wallet).await;
    let _ = service.accounts_details(&wallet).await;

    assert_eq!(harness.reconnect.calls().len(), 2);
}

#[tokio::test]
async fn test_without_handler_error_is_still_returned() {
    let gateway = Arc::new(ScriptedGateway::new());
    let service = MpcConnectionService::new(
        ConnectionConfig::default(),
        Arc::new(MemoryCredentialStorage::new()),
        gateway.clone(),
        Arc::new(RecordingParticipant::default()),
    );

    let result = service
        .accounts_details(&WalletMetadata::new(DEVICE))
        .await;

    assert_eq!(result, Err(Error::NoCredentials(DEVICE.to_string())));
    assert_eq!(gateway.network_calls(), 0);
}
