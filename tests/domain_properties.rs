//! Property tests for the credit arithmetic and storage string forms.
//!
//! These tests verify, across generated operation sequences:
//! 1. The balance always equals the signed sum of applied operations
//! 2. Lifetime counters only grow
//! 3. An overdrawing consume leaves the account untouched
//! 4. Storage string forms round-trip

use proptest::prelude::*;

use tallygate::domain::credits::{CreditAccount, CreditTransactionType};
use tallygate::domain::foundation::{Timestamp, UserId};

// =============================================================================
// Strategies
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum LedgerOp {
    Grant(i64),
    Purchase(i64),
    Refund(i64),
    Adjustment(i64),
    Consume(i64),
}

fn ledger_op() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        (1i64..500).prop_map(LedgerOp::Grant),
        (1i64..500).prop_map(LedgerOp::Purchase),
        (1i64..100).prop_map(LedgerOp::Refund),
        (1i64..100).prop_map(LedgerOp::Adjustment),
        (1i64..600).prop_map(LedgerOp::Consume),
    ]
}

fn transaction_type() -> impl Strategy<Value = CreditTransactionType> {
    prop_oneof![
        Just(CreditTransactionType::SubscriptionGrant),
        Just(CreditTransactionType::Purchase),
        Just(CreditTransactionType::Consumption),
        Just(CreditTransactionType::Refund),
        Just(CreditTransactionType::Adjustment),
    ]
}

fn fresh_account() -> CreditAccount {
    CreditAccount::new(UserId::new("prop-user").unwrap())
}

/// Applies one operation; overdrawing consumes are allowed to fail.
fn apply(account: &mut CreditAccount, op: LedgerOp, now: Timestamp) {
    match op {
        LedgerOp::Grant(n) => account
            .apply_credit(n, CreditTransactionType::SubscriptionGrant, now)
            .unwrap(),
        LedgerOp::Purchase(n) => account
            .apply_credit(n, CreditTransactionType::Purchase, now)
            .unwrap(),
        LedgerOp::Refund(n) => account
            .apply_credit(n, CreditTransactionType::Refund, now)
            .unwrap(),
        LedgerOp::Adjustment(n) => account
            .apply_credit(n, CreditTransactionType::Adjustment, now)
            .unwrap(),
        LedgerOp::Consume(n) => {
            let _ = account.try_consume(n, now);
        }
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn balance_equals_signed_sum_of_applied_operations(
        ops in prop::collection::vec(ledger_op(), 0..40),
    ) {
        let mut account = fresh_account();
        let now = Timestamp::now();

        // Refunds and adjustments have no lifetime counter, so track
        // them beside the account.
        let mut refunds = 0i64;
        let mut adjustments = 0i64;

        for &op in &ops {
            apply(&mut account, op, now);
            match op {
                LedgerOp::Refund(n) => refunds += n,
                LedgerOp::Adjustment(n) => adjustments += n,
                _ => {}
            }
            prop_assert!(account.balance >= 0);
        }

        prop_assert_eq!(
            account.balance,
            account.total_granted + account.total_purchased + refunds + adjustments
                - account.total_consumed
        );
    }

    #[test]
    fn lifetime_counters_never_decrease(
        ops in prop::collection::vec(ledger_op(), 1..40),
    ) {
        let mut account = fresh_account();
        let now = Timestamp::now();

        for &op in &ops {
            let granted = account.total_granted;
            let purchased = account.total_purchased;
            let consumed = account.total_consumed;

            apply(&mut account, op, now);

            prop_assert!(account.total_granted >= granted);
            prop_assert!(account.total_purchased >= purchased);
            prop_assert!(account.total_consumed >= consumed);
        }
    }

    #[test]
    fn overdrawing_consume_leaves_account_unchanged(
        balance in 0i64..100,
        attempt in 1i64..200,
    ) {
        prop_assume!(attempt > balance);

        let mut account = fresh_account();
        let now = Timestamp::now();
        if balance > 0 {
            account
                .apply_credit(balance, CreditTransactionType::Purchase, now)
                .unwrap();
        }

        let before = account.clone();
        prop_assert!(account.try_consume(attempt, now).is_err());
        prop_assert_eq!(account, before);
    }

    #[test]
    fn transaction_type_storage_form_round_trips(t in transaction_type()) {
        prop_assert_eq!(CreditTransactionType::parse_str(t.as_str()), Some(t));
    }

    #[test]
    fn arbitrary_strings_do_not_parse_as_transaction_types(s in "[a-z_]{1,24}") {
        prop_assume!(!matches!(
            s.as_str(),
            "subscription_grant" | "purchase" | "consumption" | "refund" | "adjustment"
        ));
        prop_assert_eq!(CreditTransactionType::parse_str(&s), None);
    }

    #[test]
    fn unix_seconds_round_trip(secs in 0i64..4_102_444_800i64) {
        prop_assert_eq!(Timestamp::from_unix_secs(secs).as_unix_secs(), secs);
    }
}
