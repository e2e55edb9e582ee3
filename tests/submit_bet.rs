#![allow(non_snake_case)]
use base_dice::{
    Error,
    client::{
        BET_SUCCESS_NOTICE,
        DiceClient,
        Notice,
    },
    config::ContractStatus,
    game::{
        BetStatus,
        DiceNumber,
        HISTORY_DEPTH,
        RollOutcome,
    },
    test_helpers::{
        Call,
        FakeWallet,
        RollScript,
        inline_config,
    },
};
use ethers::utils::parse_ether;
use proptest::prelude::*;

async fn connected_client(wallet: &FakeWallet) -> DiceClient<FakeWallet> {
    let mut client = DiceClient::new(inline_config(), vec![wallet.clone()]);
    client.connect().await.unwrap();
    client
}

fn four() -> DiceNumber {
    DiceNumber::new(4).unwrap()
}

#[tokio::test]
async fn submit_bet__confirmed_roll_records_completed_entry() {
    // given
    let wallet = FakeWallet::default();
    let mut client = connected_client(&wallet).await;

    // when
    let entry = client.submit_bet(four(), "0.01").await.unwrap();

    // then
    assert_eq!(entry.chosen_number, four());
    assert_eq!(entry.bet_amount, "0.01");
    assert_eq!(entry.status, BetStatus::Completed);
    assert_eq!(entry.timestamp.len(), "12:34:56".len());
    assert!(entry.tx_hash.is_some());
    assert_eq!(client.history().len(), 1);
    assert_eq!(client.history().latest(), Some(&entry));
    let sent = wallet.sent_bets();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chosen_number, four());
    assert_eq!(sent[0].bet_amount_wei, parse_ether("0.01").unwrap());
    assert_eq!(
        client.take_notice(),
        Some(Notice::Success(BET_SUCCESS_NOTICE.to_string()))
    );
    assert_eq!(client.balance(), Some("1.4900"));
}

#[tokio::test]
async fn submit_bet__keeps_outcome_from_receipt() {
    // given
    let wallet = FakeWallet::default();
    let outcome = RollOutcome {
        dice_result: 4,
        won: true,
        payout_wei: parse_ether("0.057").unwrap(),
    };
    wallet.state().roll = RollScript::Confirm(Some(outcome.clone()));
    let mut client = connected_client(&wallet).await;

    // when
    let entry = client.submit_bet(four(), "0.01").await.unwrap();

    // then
    assert_eq!(entry.outcome, Some(outcome));
}

#[tokio::test]
async fn submit_bet__cancelled_by_user_records_failed_entry() {
    // given
    let wallet = FakeWallet::default();
    wallet.state().roll = RollScript::Reject;
    let mut client = connected_client(&wallet).await;

    // when
    let result = client.submit_bet(four(), "0.01").await;

    // then
    assert!(matches!(result, Err(Error::UserRejected)));
    let entry = client.history().latest().unwrap();
    assert_eq!(entry.status, BetStatus::Failed);
    assert_eq!(entry.chosen_number, four());
    assert!(!entry.timestamp.is_empty());
    assert_eq!(
        client.take_notice(),
        Some(Notice::Error("Transaction cancelled".to_string()))
    );
}

#[tokio::test]
async fn submit_bet__revert_reason_is_shown() {
    // given
    let wallet = FakeWallet::default();
    wallet.state().roll = RollScript::Fail("Insufficient house balance".to_string());
    let mut client = connected_client(&wallet).await;

    // when
    let result = client.submit_bet(four(), "0.05").await;

    // then
    assert!(result.is_err());
    assert_eq!(client.history().latest().unwrap().status, BetStatus::Failed);
    assert_eq!(
        client.take_notice(),
        Some(Notice::Error("Error: Insufficient house balance".to_string()))
    );
}

#[tokio::test]
async fn submit_bet__requires_connection() {
    // given
    let wallet = FakeWallet::default();
    let mut client = DiceClient::new(inline_config(), vec![wallet.clone()]);

    // when
    let result = client.submit_bet(four(), "0.01").await;

    // then
    assert!(matches!(result, Err(Error::NotConnected)));
    assert!(client.history().is_empty());
    assert_eq!(
        client.take_notice(),
        Some(Notice::Error("Please connect your wallet first!".to_string()))
    );
    assert!(wallet.calls().is_empty());
}

#[tokio::test]
async fn submit_bet__amount_checked_before_connection() {
    // given
    let wallet = FakeWallet::default();
    let mut client = DiceClient::new(inline_config(), vec![wallet.clone()]);

    // when
    let result = client.submit_bet(four(), "5").await;

    // then
    assert!(matches!(result, Err(Error::InvalidBetAmount { .. })));
    assert_eq!(
        client.take_notice(),
        Some(Notice::Error(
            "Please enter valid bet amount (0.001 - 0.1 ETH)".to_string()
        ))
    );
}

#[tokio::test]
async fn submit_bet__unconfigured_contract_blocks_everything() {
    // given
    let wallet = FakeWallet::default();
    let mut config = inline_config();
    config.contract = ContractStatus::NotConfigured;
    let mut client = DiceClient::new(config, vec![wallet.clone()]);
    client.connect().await.unwrap();

    // when
    let result = client.submit_bet(four(), "0.01").await;

    // then
    assert!(matches!(result, Err(Error::ContractNotConfigured)));
    assert!(wallet.sent_bets().is_empty());
    assert!(client.history().is_empty());
}

#[tokio::test]
async fn submit_bet__two_submissions_send_two_transactions() {
    // given
    let wallet = FakeWallet::default();
    let mut client = connected_client(&wallet).await;

    // when
    let first = client.submit_bet(four(), "0.01").await.unwrap();
    let second = client.submit_bet(four(), "0.01").await.unwrap();

    // then
    assert_eq!(wallet.sent_bets().len(), 2);
    assert_ne!(first.tx_hash, second.tx_hash);
    assert_eq!(client.history().len(), 2);
}

#[tokio::test]
async fn submit_bet__history_keeps_ten_newest() {
    // given
    let wallet = FakeWallet::default();
    let mut client = connected_client(&wallet).await;

    // when
    for i in 0..12u8 {
        let number = DiceNumber::new(i % 6 + 1).unwrap();
        client.submit_bet(number, "0.001").await.unwrap();
    }

    // then
    assert_eq!(client.history().len(), HISTORY_DEPTH);
    assert_eq!(
        client.history().latest().unwrap().chosen_number,
        DiceNumber::new(6).unwrap()
    );
}

proptest! {
    #[test]
    fn submit_bet__out_of_range_amounts_never_reach_the_wallet(
        milli in prop_oneof![0u64..1, 101u64..100_000]
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let wallet = FakeWallet::default();
            let mut client = connected_client(&wallet).await;
            let calls_before = wallet.calls().len();
            let amount = format!("{}", milli as f64 / 1000.0);

            let result = client.submit_bet(four(), &amount).await;

            assert!(matches!(result, Err(Error::InvalidBetAmount { .. })));
            assert_eq!(wallet.calls().len(), calls_before);
            assert!(
                !wallet
                    .calls()
                    .iter()
                    .any(|call| matches!(call, Call::RollDice(_)))
            );
            assert!(client.history().is_empty());
        });
    }
}
