use crate::{
    Error,
    Result,
    dice_types::GameResultFilter,
};
use chrono::Local;
use ethers::{
    types::{
        Address,
        H256,
        U256,
    },
    utils::parse_ether,
};
use std::{
    collections::VecDeque,
    fmt,
};

pub const HISTORY_DEPTH: usize = 10;

const WEI_PER_BALANCE_UNIT: u64 = 100_000_000_000_000; // 10^14, four decimals
const BALANCE_ROUNDING: u64 = WEI_PER_BALANCE_UNIT / 2;

/// A face of the die the player bets on. Always within `1..=6`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiceNumber(u8);

impl DiceNumber {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&value)
            .then_some(DiceNumber(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = DiceNumber> {
        (Self::MIN..=Self::MAX).map(DiceNumber)
    }

    pub fn next(self) -> Self {
        if self.0 == Self::MAX {
            DiceNumber(Self::MIN)
        } else {
            DiceNumber(self.0 + 1)
        }
    }

    pub fn prev(self) -> Self {
        if self.0 == Self::MIN {
            DiceNumber(Self::MAX)
        } else {
            DiceNumber(self.0 - 1)
        }
    }
}

impl Default for DiceNumber {
    fn default() -> Self {
        DiceNumber(Self::MIN)
    }
}

impl TryFrom<u8> for DiceNumber {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        DiceNumber::new(value).ok_or_else(|| {
            Error::Config(format!(
                "dice number {value} outside {}..={}",
                Self::MIN,
                Self::MAX
            ))
        })
    }
}

impl fmt::Display for DiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingBet {
    pub chosen_number: DiceNumber,
    pub bet_amount_wei: U256,
}

/// Inclusive bet bounds. The display strings are kept as configured so that
/// messages echo what the operator wrote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BetLimits {
    min_wei: U256,
    max_wei: U256,
    min_display: String,
    max_display: String,
}

impl BetLimits {
    pub fn new(min: &str, max: &str) -> Result<Self> {
        let min_wei = parse_ether(min.trim())
            .map_err(|e| Error::Config(format!("invalid MIN_BET '{min}': {e}")))?;
        let max_wei = parse_ether(max.trim())
            .map_err(|e| Error::Config(format!("invalid MAX_BET '{max}': {e}")))?;
        if min_wei > max_wei {
            return Err(Error::Config(format!(
                "MIN_BET {min} is greater than MAX_BET {max}"
            )));
        }
        Ok(Self {
            min_wei,
            max_wei,
            min_display: min.trim().to_string(),
            max_display: max.trim().to_string(),
        })
    }

    pub fn min_wei(&self) -> U256 {
        self.min_wei
    }

    pub fn max_wei(&self) -> U256 {
        self.max_wei
    }

    pub fn min_display(&self) -> &str {
        &self.min_display
    }

    pub fn max_display(&self) -> &str {
        &self.max_display
    }

    /// Parses an amount in ETH and checks it against the bounds.
    pub fn validate(&self, amount: &str) -> Result<U256> {
        let trimmed = amount.trim();
        let wei = if trimmed.is_empty() || trimmed.starts_with('-') {
            None
        } else {
            parse_ether(trimmed).ok()
        };
        match wei {
            Some(wei) if wei >= self.min_wei && wei <= self.max_wei => Ok(wei),
            _ => Err(self.invalid()),
        }
    }

    fn invalid(&self) -> Error {
        Error::InvalidBetAmount {
            min: self.min_display.clone(),
            max: self.max_display.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BetStatus {
    Completed,
    Failed,
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetStatus::Completed => write!(f, "✅ Completed"),
            BetStatus::Failed => write!(f, "❌ Failed"),
        }
    }
}

/// Result reported by the contract's `GameResult` event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RollOutcome {
    pub dice_result: u8,
    pub won: bool,
    pub payout_wei: U256,
}

impl From<GameResultFilter> for RollOutcome {
    fn from(event: GameResultFilter) -> Self {
        Self {
            dice_result: event.dice_result,
            won: event.won,
            payout_wei: event.payout,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BetReceipt {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
    pub outcome: Option<RollOutcome>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub chosen_number: DiceNumber,
    pub bet_amount: String,
    pub status: BetStatus,
    pub timestamp: String,
    pub tx_hash: Option<H256>,
    pub outcome: Option<RollOutcome>,
}

impl HistoryEntry {
    pub fn completed(bet: &PendingBet, amount: &str, receipt: BetReceipt) -> Self {
        Self {
            chosen_number: bet.chosen_number,
            bet_amount: amount.trim().to_string(),
            status: BetStatus::Completed,
            timestamp: local_time_string(),
            tx_hash: Some(receipt.tx_hash),
            outcome: receipt.outcome,
        }
    }

    pub fn failed(chosen_number: DiceNumber, amount: &str) -> Self {
        Self {
            chosen_number,
            bet_amount: amount.trim().to_string(),
            status: BetStatus::Failed,
            timestamp: local_time_string(),
            tx_hash: None,
            outcome: None,
        }
    }
}

/// Most-recent-first list of local bet attempts, capped at [`HISTORY_DEPTH`].
#[derive(Clone, Debug, Default)]
pub struct GameHistory {
    entries: VecDeque<HistoryEntry>,
}

impl GameHistory {
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(HISTORY_DEPTH);
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Values exposed by the contract's read-only accessors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractSettings {
    pub min_bet: U256,
    pub max_bet: U256,
    pub house_edge: U256,
    pub game_count: U256,
    pub owner: Address,
}

/// One row of the contract's `games` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameRecord {
    pub index: u64,
    pub player: Address,
    pub bet_amount: U256,
    pub chosen_number: u8,
    pub dice_result: u8,
    pub won: bool,
}

/// Formats a wei amount as ETH rounded to four decimals.
pub fn format_balance(wei: U256) -> String {
    let units = wei.saturating_add(U256::from(BALANCE_ROUNDING))
        / U256::from(WEI_PER_BALANCE_UNIT);
    let whole = units / U256::from(10_000u64);
    let fraction = (units % U256::from(10_000u64)).as_u64();
    format!("{whole}.{fraction:04}")
}

fn local_time_string() -> String {
    Local::now().format("%H:%M:%S").to_string()
}
