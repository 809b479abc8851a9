//! Fuzz tests for provider status decoding
//!
//! Status strings come from the provider verbatim; decoding must never fail
//! and unrecognised values must keep an operation in progress.

use mpc_connect_core::{OperationStatus, RemoteOperation};
use proptest::prelude::*;

// ============================================================================
// Strategies for generating test data
// ============================================================================

/// A known status word with random casing and separators
fn known_status_strategy() -> impl Strategy<Value = (String, OperationStatus)> {
    let words = prop_oneof![
        Just(("queued", OperationStatus::Queued)),
        Just(("pending_signature", OperationStatus::PendingSignature)),
        Just(("signature_required", OperationStatus::SignatureRequired)),
        Just(("completed", OperationStatus::Completed)),
        Just(("rejected", OperationStatus::Failed)),
        Just(("failed", OperationStatus::Failed)),
    ];
    (words, any::<bool>(), any::<bool>()).prop_map(|((word, status), upper, dashes)| {
        let mut value = if upper {
            word.to_uppercase()
        } else {
            word.to_string()
        };
        if dashes {
            value = value.replace('_', "-");
        }
        (value, status)
    })
}

const KNOWN: &[&str] = &[
    "queued",
    "submitted",
    "pendingsignature",
    "signaturerequired",
    "completed",
    "failed",
    "rejected",
    "cancelled",
    "canceled",
    "blocked",
];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Decoding never panics and round-trips through its display form
    #[test]
    fn fuzz_parse_never_panics(value in ".*") {
        let status = OperationStatus::parse(&value);
        prop_assert_eq!(OperationStatus::parse(&status.to_string()), status);
    }

    /// Anything outside the known vocabulary decodes as Unknown
    #[test]
    fn fuzz_unrecognised_is_unknown(value in "[a-z]{1,20}") {
        prop_assume!(!KNOWN.contains(&value.as_str()));
        prop_assert_eq!(OperationStatus::parse(&value), OperationStatus::Unknown);
    }

    /// Casing and separators do not change the decoded status
    #[test]
    fn fuzz_known_status_variants((value, expected) in known_status_strategy()) {
        prop_assert_eq!(OperationStatus::parse(&value), expected);
    }

    /// Unknown statuses are never ready nor terminal
    #[test]
    fn fuzz_unknown_keeps_polling(value in "[A-Z_]{1,16}") {
        let status = OperationStatus::parse(&value);
        if status == OperationStatus::Unknown {
            prop_assert!(!status.is_ready());
            prop_assert!(!status.is_terminal());
        }
    }

    /// Any status string in a provider payload deserializes
    #[test]
    fn fuzz_operation_payload_deserializes(status in "[A-Za-z_ -]{0,24}") {
        let payload = serde_json::json!({ "id": "op-1", "status": status });
        let operation: RemoteOperation = serde_json::from_value(payload).unwrap();
        prop_assert_eq!(operation.status, OperationStatus::parse(&status));
    }
}
