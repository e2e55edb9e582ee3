pub mod client;
pub mod config;
pub mod connector;
pub mod contract;
pub mod error;
pub mod game;
pub mod injected;
pub mod pairing;
pub mod provider;
pub mod wallets;

pub mod test_helpers;

pub use error::{
    Error,
    Result,
};

pub mod dice_types {
    use ethers::contract::abigen;

    abigen!(
        DiceGame,
        r#"[
            event GameResult(address indexed player, uint256 betAmount, uint8 chosenNumber, uint8 diceResult, bool won, uint256 payout)
            function getGameCount() external view returns (uint256)
            function games(uint256 index) external view returns (address player, uint256 betAmount, uint8 chosenNumber, uint8 diceResult, bool won)
            function houseEdge() external view returns (uint256)
            function maxBet() external view returns (uint256)
            function minBet() external view returns (uint256)
            function owner() external view returns (address)
            function rollDice(uint8 _chosenNumber) external payable
        ]"#
    );
}
