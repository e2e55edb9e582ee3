#![allow(non_snake_case)]
use base_dice::{
    Error,
    client::DiceClient,
    game::GameRecord,
    test_helpers::{
        Call,
        FakeWallet,
        inline_config,
        player,
    },
};
use ethers::{
    types::U256,
    utils::parse_ether,
};

fn game(index: u64) -> GameRecord {
    GameRecord {
        index,
        player: player(),
        bet_amount: parse_ether("0.01").unwrap(),
        chosen_number: (index % 6) as u8 + 1,
        dice_result: 3,
        won: index % 6 == 2,
    }
}

#[tokio::test]
async fn load_contract_settings__reads_on_chain_values() {
    // given
    let wallet = FakeWallet::default();
    let mut client = DiceClient::new(inline_config(), vec![wallet.clone()]);
    client.connect().await.unwrap();

    // when
    let settings = client.load_contract_settings().await.unwrap();

    // then
    assert_eq!(settings.min_bet, parse_ether("0.001").unwrap());
    assert_eq!(settings.house_edge, U256::from(5));
    assert_eq!(client.view().settings, Some(settings));
}

#[tokio::test]
async fn load_contract_settings__requires_connection() {
    // given
    let wallet = FakeWallet::default();
    let mut client = DiceClient::new(inline_config(), vec![wallet]);

    // when
    let result = client.load_contract_settings().await;

    // then
    assert!(matches!(result, Err(Error::NotConnected)));
}

#[tokio::test]
async fn recent_games__returns_newest_first_up_to_limit() {
    // given
    let wallet = FakeWallet::default();
    {
        let mut state = wallet.state();
        state.games = (0..5).map(game).collect();
        state.settings.game_count = U256::from(5);
    }
    let mut client = DiceClient::new(inline_config(), vec![wallet.clone()]);
    client.connect().await.unwrap();

    // when
    let games = client.recent_games(3).await.unwrap();

    // then
    let indices: Vec<u64> = games.iter().map(|g| g.index).collect();
    assert_eq!(indices, vec![4, 3, 2]);
    assert!(wallet.calls().contains(&Call::Settings));
    assert!(!wallet.calls().contains(&Call::Game(1)));
}

#[tokio::test]
async fn recent_games__empty_table_reads_nothing() {
    // given
    let wallet = FakeWallet::default();
    let mut client = DiceClient::new(inline_config(), vec![wallet.clone()]);
    client.connect().await.unwrap();

    // when
    let games = client.recent_games(5).await.unwrap();

    // then
    assert!(games.is_empty());
    assert!(
        !wallet
            .calls()
            .iter()
            .any(|call| matches!(call, Call::Game(_)))
    );
}
