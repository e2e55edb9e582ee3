use crate::{
    Error,
    Result,
    config::{
        ClientConfig,
        ConnectionStrategy,
        StaticConfig,
    },
    game::{
        BetReceipt,
        ContractSettings,
        GameRecord,
        PendingBet,
        RollOutcome,
    },
    provider::{
        DiceContract,
        EventHub,
        ProviderKind,
        Subscription,
        WalletEvent,
        WalletProvider,
    },
};
use ethers::{
    types::{
        Address,
        H256,
        U256,
    },
    utils::parse_ether,
};
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
};

pub const BASE_SEPOLIA: u64 = 84532;
pub const ETHEREUM_MAINNET: u64 = 1;

pub fn player() -> Address {
    Address::from_low_u64_be(0xA11CE)
}

pub fn other_player() -> Address {
    Address::from_low_u64_be(0xB0B)
}

pub fn inline_config() -> ClientConfig {
    ClientConfig::from_static(
        &StaticConfig::inline(),
        ConnectionStrategy::InjectedOnly,
        false,
    )
    .unwrap()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    RequestAccounts,
    Accounts,
    ChainId,
    SwitchChain(u64),
    Balance(Address),
    BindContract(Address, Address),
    RollDice(PendingBet),
    Settings,
    Game(u64),
    Disconnect,
}

/// How the fake answers `rollDice`.
#[derive(Clone, Debug)]
pub enum RollScript {
    Confirm(Option<RollOutcome>),
    Reject,
    Fail(String),
}

#[derive(Debug)]
pub struct FakeState {
    pub available: bool,
    pub authorize: Option<Vec<Address>>,
    pub authorized: Vec<Address>,
    pub chain_id: u64,
    /// `eth_chainId` answers left before the transport goes down. `None` never fails.
    pub chain_id_answers: Option<usize>,
    pub switch_allowed: bool,
    pub balance: U256,
    pub roll: RollScript,
    pub settings: ContractSettings,
    pub games: Vec<GameRecord>,
    pub calls: Vec<Call>,
    pub next_tx: u64,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            available: true,
            authorize: Some(vec![player()]),
            authorized: Vec::new(),
            chain_id: BASE_SEPOLIA,
            chain_id_answers: None,
            switch_allowed: true,
            balance: parse_ether("1.5").unwrap(),
            roll: RollScript::Confirm(None),
            settings: ContractSettings {
                min_bet: parse_ether("0.001").unwrap(),
                max_bet: parse_ether("0.1").unwrap(),
                house_edge: U256::from(5),
                game_count: U256::zero(),
                owner: other_player(),
            },
            games: Vec::new(),
            calls: Vec::new(),
            next_tx: 1,
        }
    }
}

/// Scriptable in-memory wallet. Clones share state, so a test keeps one
/// handle while the client owns another.
#[derive(Clone, Debug)]
pub struct FakeWallet {
    kind: ProviderKind,
    state: Arc<Mutex<FakeState>>,
    events: EventHub,
}

impl Default for FakeWallet {
    fn default() -> Self {
        Self::new(ProviderKind::Injected)
    }
}

impl FakeWallet {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(FakeState::default())),
            events: EventHub::default(),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn sent_bets(&self) -> Vec<PendingBet> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::RollDice(bet) => Some(bet),
                _ => None,
            })
            .collect()
    }

    pub fn emit(&self, event: WalletEvent) {
        self.events.emit(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }
}

impl WalletProvider for FakeWallet {
    type Contract = FakeContract;

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.state().available
    }

    async fn request_accounts(&mut self) -> Result<Vec<Address>> {
        self.record(Call::RequestAccounts);
        let mut state = self.state();
        let accounts = state.authorize.clone().ok_or(Error::UserRejected)?;
        state.authorized = accounts.clone();
        Ok(accounts)
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        self.record(Call::Accounts);
        Ok(self.state().authorized.clone())
    }

    async fn chain_id(&self) -> Result<u64> {
        self.record(Call::ChainId);
        let mut state = self.state();
        match state.chain_id_answers.as_mut() {
            Some(0) => return Err(Error::Transport("rpc down".to_string())),
            Some(left) => *left -= 1,
            None => {}
        }
        Ok(state.chain_id)
    }

    async fn switch_chain(&mut self, chain_id: u64) -> Result<()> {
        self.record(Call::SwitchChain(chain_id));
        let mut state = self.state();
        if !state.switch_allowed {
            return Err(Error::UserRejected);
        }
        state.chain_id = chain_id;
        Ok(())
    }

    async fn balance(&self, account: Address) -> Result<U256> {
        self.record(Call::Balance(account));
        Ok(self.state().balance)
    }

    fn bind_contract(&self, address: Address, account: Address) -> Result<Self::Contract> {
        self.record(Call::BindContract(address, account));
        Ok(FakeContract {
            wallet: self.clone(),
        })
    }

    fn subscribe(&mut self) -> Subscription {
        self.events.subscribe()
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.record(Call::Disconnect);
        self.state().authorized.clear();
        Ok(())
    }
}

pub struct FakeContract {
    wallet: FakeWallet,
}

impl DiceContract for FakeContract {
    async fn roll_dice(&self, bet: &PendingBet) -> Result<BetReceipt> {
        self.wallet.record(Call::RollDice(bet.clone()));
        let mut state = self.wallet.state();
        match state.roll.clone() {
            RollScript::Confirm(outcome) => {
                let tx = state.next_tx;
                state.next_tx += 1;
                state.balance = state.balance.saturating_sub(bet.bet_amount_wei);
                Ok(BetReceipt {
                    tx_hash: H256::from_low_u64_be(tx),
                    block_number: Some(tx),
                    outcome,
                })
            }
            RollScript::Reject => Err(Error::UserRejected),
            RollScript::Fail(reason) => Err(Error::TransactionFailed { reason }),
        }
    }

    async fn settings(&self) -> Result<ContractSettings> {
        self.wallet.record(Call::Settings);
        Ok(self.wallet.state().settings.clone())
    }

    async fn game(&self, index: u64) -> Result<GameRecord> {
        self.wallet.record(Call::Game(index));
        self.wallet
            .state()
            .games
            .iter()
            .find(|game| game.index == index)
            .cloned()
            .ok_or_else(|| Error::TransactionFailed {
                reason: format!("no game at index {index}"),
            })
    }
}
