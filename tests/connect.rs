#![allow(non_snake_case)]
use base_dice::{
    Error,
    client::{
        DiceClient,
        NO_WALLET_NOTICE,
        NetworkStatus,
        Notice,
        Session,
    },
    config::ConnectionStrategy,
    game::DiceNumber,
    provider::ProviderKind,
    test_helpers::{
        BASE_SEPOLIA,
        Call,
        FakeWallet,
        inline_config,
        player,
    },
};

#[tokio::test]
async fn connect__authorizes_binds_contract_and_reads_balance() {
    // given
    let wallet = FakeWallet::default();
    let mut client = DiceClient::new(inline_config(), vec![wallet.clone()]);

    // when
    let account = client.connect().await.unwrap();

    // then
    assert_eq!(account, player());
    let session = client.session();
    assert!(session.connected);
    assert_eq!(session.account, Some(player()));
    assert_eq!(session.chain_id, BASE_SEPOLIA);
    assert!(client.is_contract_bound());
    assert!(client.is_subscribed());
    assert_eq!(client.balance(), Some("1.5000"));
    assert_eq!(client.network_status(), NetworkStatus::OnTarget);
    assert_eq!(client.take_notice(), None);
}

#[tokio::test]
async fn connect__rejected_authorization_leaves_session_disconnected() {
    // given
    let wallet = FakeWallet::default();
    wallet.state().authorize = None;
    let mut client = DiceClient::new(inline_config(), vec![wallet.clone()]);

    // when
    let result = client.connect().await;

    // then
    assert!(matches!(result, Err(Error::UserRejected)));
    assert!(!client.session().connected);
    assert_eq!(client.session().account, None);
    assert!(!client.is_contract_bound());
    assert_eq!(
        client.take_notice(),
        Some(Notice::Error(
            "Error connecting wallet: User rejected the request".to_string()
        ))
    );
    assert_eq!(wallet.calls(), vec![Call::RequestAccounts]);
}

#[tokio::test]
async fn connect__fails_without_available_provider() {
    // given
    let wallet = FakeWallet::default();
    wallet.state().available = false;
    let mut client = DiceClient::new(inline_config(), vec![wallet.clone()]);

    // when
    let result = client.connect().await;

    // then
    assert!(matches!(result, Err(Error::NoProviderAvailable)));
    assert!(wallet.calls().is_empty());
    assert_eq!(
        client.take_notice(),
        Some(Notice::Error(NO_WALLET_NOTICE.to_string()))
    );
}

#[tokio::test]
async fn connect__failed_setup_leaves_client_disconnected() {
    // given
    let wallet = FakeWallet::default();
    wallet.state().chain_id_answers = Some(1);
    let mut client = DiceClient::new(inline_config(), vec![wallet.clone()]);

    // when
    let result = client.connect().await;

    // then
    assert!(matches!(result, Err(Error::Transport(_))));
    assert_eq!(client.session(), &Session::default());
    assert!(!client.is_contract_bound());
    assert_eq!(client.view().provider, None);
    assert!(matches!(
        client.take_notice(),
        Some(Notice::Error(text)) if text.starts_with("Error connecting wallet:")
    ));

    // and a bet is refused before anything is sent or recorded
    let bet = client.submit_bet(DiceNumber::default(), "0.01").await;
    assert!(matches!(bet, Err(Error::NotConnected)));
    assert!(client.history().is_empty());
    assert!(wallet.sent_bets().is_empty());
}

#[tokio::test]
async fn connect__injected_only_ignores_pairing_provider() {
    // given
    let injected = FakeWallet::new(ProviderKind::Injected);
    injected.state().available = false;
    let paired = FakeWallet::new(ProviderKind::Pairing);
    let mut client = DiceClient::new(inline_config(), vec![injected, paired.clone()]);

    // when
    let result = client.connect().await;

    // then
    assert!(matches!(result, Err(Error::NoProviderAvailable)));
    assert!(paired.calls().is_empty());
}

#[tokio::test]
async fn connect__falls_back_to_pairing_when_allowed() {
    // given
    let injected = FakeWallet::new(ProviderKind::Injected);
    injected.state().available = false;
    let paired = FakeWallet::new(ProviderKind::Pairing);
    let mut config = inline_config();
    config.strategy = ConnectionStrategy::InjectedWithPairing;
    let mut client = DiceClient::new(config, vec![injected, paired.clone()]);

    // when
    client.connect().await.unwrap();

    // then
    assert_eq!(client.view().provider, Some(ProviderKind::Pairing));
    assert_eq!(paired.calls().first(), Some(&Call::RequestAccounts));
}

#[tokio::test]
async fn connect__prefers_injected_over_pairing() {
    // given
    let paired = FakeWallet::new(ProviderKind::Pairing);
    let injected = FakeWallet::new(ProviderKind::Injected);
    let mut config = inline_config();
    config.strategy = ConnectionStrategy::InjectedWithPairing;
    let mut client = DiceClient::new(config, vec![paired.clone(), injected.clone()]);

    // when
    client.connect().await.unwrap();

    // then
    assert_eq!(client.view().provider, Some(ProviderKind::Injected));
    assert!(paired.calls().is_empty());
}

#[tokio::test]
async fn connect__subscribes_only_once_across_reconnects() {
    // given
    let wallet = FakeWallet::default();
    let mut client = DiceClient::new(inline_config(), vec![wallet.clone()]);

    // when
    client.connect().await.unwrap();
    client.connect().await.unwrap();

    // then
    assert_eq!(wallet.subscriber_count(), 1);
}

#[tokio::test]
async fn connect__without_contract_address_skips_binding() {
    // given
    let wallet = FakeWallet::default();
    let mut config = inline_config();
    config.contract = base_dice::config::ContractStatus::NotConfigured;
    let mut client = DiceClient::new(config, vec![wallet.clone()]);

    // when
    client.connect().await.unwrap();

    // then
    assert!(client.session().connected);
    assert!(!client.is_contract_bound());
    assert!(
        !wallet
            .calls()
            .iter()
            .any(|call| matches!(call, Call::BindContract(..)))
    );
    assert_eq!(client.view().contract, "Not Configured");
}

#[tokio::test]
async fn restore__reuses_authorized_account_without_prompting() {
    // given
    let wallet = FakeWallet::default();
    wallet.state().authorized = vec![player()];
    let mut client = DiceClient::new(inline_config(), vec![wallet.clone()]);

    // when
    let restored = client.restore().await;

    // then
    assert_eq!(restored, Some(player()));
    assert!(client.session().connected);
    assert!(!wallet.calls().contains(&Call::RequestAccounts));
}

#[tokio::test]
async fn restore__stays_disconnected_when_nothing_is_authorized() {
    // given
    let wallet = FakeWallet::default();
    let mut client = DiceClient::new(inline_config(), vec![wallet.clone()]);

    // when
    let restored = client.restore().await;

    // then
    assert_eq!(restored, None);
    assert!(!client.session().connected);
    assert_eq!(wallet.calls(), vec![Call::Accounts]);
}

#[tokio::test]
async fn disconnect__clears_session_binding_and_balance() {
    // given
    let wallet = FakeWallet::default();
    let mut client = DiceClient::new(inline_config(), vec![wallet.clone()]);
    client.connect().await.unwrap();

    // when
    client.disconnect().await.unwrap();

    // then
    assert!(!client.session().connected);
    assert_eq!(client.session().account, None);
    assert!(!client.is_contract_bound());
    assert_eq!(client.balance(), None);
    assert_eq!(client.network_status(), NetworkStatus::Disconnected);
    assert!(client.is_subscribed());
    assert_eq!(wallet.calls().last(), Some(&Call::Disconnect));
}

#[tokio::test]
async fn teardown__unsubscribes_from_wallet_events() {
    // given
    let wallet = FakeWallet::default();
    let mut client = DiceClient::new(inline_config(), vec![wallet.clone()]);
    client.connect().await.unwrap();
    assert_eq!(wallet.subscriber_count(), 1);

    // when
    client.teardown().await.unwrap();

    // then
    assert!(!client.is_subscribed());
    assert_eq!(wallet.subscriber_count(), 0);
}
