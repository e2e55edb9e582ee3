use crate::{
    Error,
    Result,
    config::{
        ClientConfig,
        short_address,
    },
    error::bet_failure_message,
    game::{
        ContractSettings,
        DiceNumber,
        GameHistory,
        GameRecord,
        HistoryEntry,
        PendingBet,
        format_balance,
    },
    provider::{
        DiceContract,
        ProviderKind,
        Subscription,
        WalletEvent,
        WalletProvider,
    },
};
use ethers::types::{
    Address,
    U256,
};

pub const BET_SUCCESS_NOTICE: &str = "🎉 Dice rolled successfully! Check your balance.";
pub const NO_WALLET_NOTICE: &str = "No wallet found! Add a keystore under ~/.foundry/keystores \
     (or point --wallet-dir at one), or pair a remote signer with --pair <url>.";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub account: Option<Address>,
    pub chain_id: u64,
    pub connected: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NetworkStatus {
    #[default]
    Disconnected,
    OnTarget,
    WrongNetwork {
        actual: u64,
    },
}

/// A message the UI shows as a blocking modal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Success(text) | Notice::Error(text) => text,
        }
    }
}

/// Read-only view of the client handed to the renderer.
#[derive(Clone, Debug)]
pub struct ClientView {
    pub provider: Option<ProviderKind>,
    pub account: Option<String>,
    pub connected: bool,
    pub chain_id: u64,
    pub network_label: String,
    pub target_chain_id: u64,
    pub network: NetworkStatus,
    pub balance: Option<String>,
    pub contract: String,
    pub contract_configured: bool,
    pub min_bet: String,
    pub max_bet: String,
    pub house_edge: String,
    pub selected: DiceNumber,
    pub history: Vec<HistoryEntry>,
    pub settings: Option<ContractSettings>,
    pub recent_games: Vec<GameRecord>,
}

/// Owns the wallet session and everything derived from it. Providers are kept
/// in preference order.
pub struct DiceClient<P: WalletProvider> {
    config: ClientConfig,
    providers: Vec<P>,
    active: Option<usize>,
    session: Session,
    contract: Option<P::Contract>,
    subscription: Option<(usize, Subscription)>,
    selected: DiceNumber,
    history: GameHistory,
    balance: Option<String>,
    network: NetworkStatus,
    settings: Option<ContractSettings>,
    recent_games: Vec<GameRecord>,
    notice: Option<Notice>,
}

impl<P: WalletProvider> DiceClient<P> {
    pub fn new(config: ClientConfig, providers: Vec<P>) -> Self {
        Self {
            config,
            providers,
            active: None,
            session: Session::default(),
            contract: None,
            subscription: None,
            selected: DiceNumber::default(),
            history: GameHistory::default(),
            balance: None,
            network: NetworkStatus::default(),
            settings: None,
            recent_games: Vec::new(),
            notice: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn history(&self) -> &GameHistory {
        &self.history
    }

    pub fn balance(&self) -> Option<&str> {
        self.balance.as_deref()
    }

    pub fn network_status(&self) -> NetworkStatus {
        self.network
    }

    pub fn is_contract_bound(&self) -> bool {
        self.contract.is_some()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn providers(&self) -> &[P] {
        &self.providers
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn select_number(&mut self, number: DiceNumber) {
        self.selected = number;
    }

    pub fn selected_number(&self) -> DiceNumber {
        self.selected
    }

    /// First usable provider allowed by the strategy, injected before pairing.
    fn pick_provider(&self) -> Option<usize> {
        [ProviderKind::Injected, ProviderKind::Pairing]
            .into_iter()
            .filter(|kind| self.config.strategy.allows(*kind))
            .find_map(|kind| {
                self.providers
                    .iter()
                    .position(|p| p.kind() == kind && p.is_available())
            })
    }

    /// Asks the preferred wallet for authorization and sets the session up.
    pub async fn connect(&mut self) -> Result<Address> {
        let result = self.authorize().await;
        match &result {
            Ok(account) => tracing::info!(?account, "wallet connected"),
            Err(Error::NoProviderAvailable) => {
                tracing::warn!("no wallet provider available");
                self.notice = Some(Notice::Error(NO_WALLET_NOTICE.to_string()));
            }
            Err(err) => {
                tracing::error!(%err, "wallet connection failed");
                self.notice = Some(Notice::Error(format!("Error connecting wallet: {err}")));
            }
        }
        result
    }

    async fn authorize(&mut self) -> Result<Address> {
        let index = self.pick_provider().ok_or(Error::NoProviderAvailable)?;
        let accounts = self.providers[index].request_accounts().await?;
        let account = *accounts.first().ok_or(Error::UserRejected)?;
        let previous = self.active.replace(index);
        if let Err(err) = self.setup(account).await {
            self.active = previous;
            return Err(err);
        }
        Ok(account)
    }

    /// Reconnects without prompting when a wallet still authorizes an account.
    pub async fn restore(&mut self) -> Option<Address> {
        let candidates: Vec<usize> = (0..self.providers.len())
            .filter(|i| {
                let provider = &self.providers[*i];
                self.config.strategy.allows(provider.kind()) && provider.is_available()
            })
            .collect();
        for index in candidates {
            let accounts = match self.providers[index].accounts().await {
                Ok(accounts) => accounts,
                Err(err) => {
                    tracing::warn!(%err, "silent account lookup failed");
                    continue;
                }
            };
            let Some(account) = accounts.first().copied() else {
                continue;
            };
            self.active = Some(index);
            match self.setup(account).await {
                Ok(()) => {
                    tracing::info!(?account, "restored wallet session");
                    return Some(account);
                }
                Err(err) => tracing::warn!(%err, "failed to restore wallet session"),
            }
        }
        None
    }

    /// Establishes the session for `account` on the active provider. Leaves
    /// the client disconnected when any step fails.
    async fn setup(&mut self, account: Address) -> Result<()> {
        let result = self.try_setup(account).await;
        if result.is_err() {
            self.reset();
        }
        result
    }

    async fn try_setup(&mut self, account: Address) -> Result<()> {
        let index = self.active.ok_or(Error::NotConnected)?;
        let chain_id = self.providers[index].chain_id().await?;
        self.session = Session {
            account: Some(account),
            chain_id,
            connected: true,
        };
        self.check_network().await?;
        self.bind_contract()?;
        self.ensure_subscription(index);
        self.refresh_balance().await;
        Ok(())
    }

    fn bind_contract(&mut self) -> Result<()> {
        let (Some(index), Some(account)) = (self.active, self.session.account) else {
            self.contract = None;
            return Ok(());
        };
        self.contract = match self.config.contract.address() {
            Some(address) => Some(self.providers[index].bind_contract(address, account)?),
            None => None,
        };
        Ok(())
    }

    fn ensure_subscription(&mut self, index: usize) {
        if let Some((subscribed, _)) = &self.subscription {
            if *subscribed == index {
                return;
            }
        }
        if let Some((_, previous)) = self.subscription.take() {
            previous.unsubscribe();
        }
        self.subscription = Some((index, self.providers[index].subscribe()));
    }

    /// Compares the wallet's chain with the target and asks it to switch when
    /// they differ. A failed switch is logged and left at that.
    pub async fn check_network(&mut self) -> Result<NetworkStatus> {
        let Some(index) = self.active.filter(|_| self.session.connected) else {
            self.network = NetworkStatus::Disconnected;
            return Ok(self.network);
        };
        let target = self.config.network.chain_id;
        let provider = &mut self.providers[index];
        let mut chain_id = provider.chain_id().await?;
        let mut switched = false;
        if chain_id != target {
            tracing::info!(
                current = chain_id,
                target,
                network = %self.config.network.label,
                "requesting network switch"
            );
            match provider.switch_chain(target).await {
                Ok(()) => {
                    chain_id = provider.chain_id().await?;
                    switched = true;
                }
                Err(err) => tracing::warn!(%err, "failed to switch network"),
            }
        }
        self.session.chain_id = chain_id;
        self.network = if chain_id == target {
            NetworkStatus::OnTarget
        } else {
            NetworkStatus::WrongNetwork { actual: chain_id }
        };
        if switched && self.contract.is_some() {
            self.bind_contract()?;
        }
        Ok(self.network)
    }

    /// Validates, sends `rollDice` and records the attempt in the history.
    pub async fn submit_bet(
        &mut self,
        chosen_number: DiceNumber,
        amount: &str,
    ) -> Result<HistoryEntry> {
        let bet = match self.prepare_bet(chosen_number, amount) {
            Ok(bet) => bet,
            Err(err) => {
                self.notice = Some(Notice::Error(err.to_string()));
                return Err(err);
            }
        };
        tracing::info!(number = %chosen_number, amount, "submitting bet");
        let result = match &self.contract {
            Some(contract) => contract.roll_dice(&bet).await,
            None => Err(Error::NotConnected),
        };
        match result {
            Ok(receipt) => {
                tracing::info!(tx_hash = ?receipt.tx_hash, "bet confirmed");
                let entry = HistoryEntry::completed(&bet, amount, receipt);
                self.history.push(entry.clone());
                self.notice = Some(Notice::Success(BET_SUCCESS_NOTICE.to_string()));
                self.refresh_balance().await;
                Ok(entry)
            }
            Err(err) => {
                tracing::error!(%err, "bet failed");
                self.history
                    .push(HistoryEntry::failed(chosen_number, amount));
                self.notice = Some(Notice::Error(bet_failure_message(&err)));
                Err(err)
            }
        }
    }

    fn prepare_bet(&self, chosen_number: DiceNumber, amount: &str) -> Result<PendingBet> {
        if !self.config.contract.is_configured() {
            return Err(Error::ContractNotConfigured);
        }
        let bet_amount_wei = self.config.limits.validate(amount)?;
        if !self.session.connected || self.session.account.is_none() || self.contract.is_none()
        {
            return Err(Error::NotConnected);
        }
        if self.config.require_target_chain
            && let NetworkStatus::WrongNetwork { actual } = self.network
        {
            return Err(Error::NetworkMismatch {
                expected: self.config.network.chain_id,
                actual,
            });
        }
        Ok(PendingBet {
            chosen_number,
            bet_amount_wei,
        })
    }

    /// Re-reads the native balance. Does nothing while disconnected.
    pub async fn refresh_balance(&mut self) {
        let (Some(index), Some(account)) = (self.active, self.session.account) else {
            return;
        };
        match self.providers[index].balance(account).await {
            Ok(wei) => self.balance = Some(format_balance(wei)),
            Err(err) => tracing::warn!(%err, "failed to refresh balance"),
        }
    }

    pub async fn handle_wallet_event(&mut self, event: WalletEvent) -> Result<()> {
        if self.active.is_none() {
            return Ok(());
        }
        tracing::info!(?event, "wallet event");
        match event {
            WalletEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    self.reset();
                    Ok(())
                }
                Some(account)
                    if self.session.connected && self.session.account == Some(*account) =>
                {
                    Ok(())
                }
                Some(account) => self.setup(*account).await,
            },
            WalletEvent::ChainChanged(chain_id) => {
                if !self.session.connected || chain_id == self.session.chain_id {
                    return Ok(());
                }
                match self.session.account {
                    Some(account) => self.setup(account).await,
                    None => Ok(()),
                }
            }
            WalletEvent::Disconnected => self.disconnect().await,
        }
    }

    /// Applies every wallet event queued since the last call. A failing event
    /// does not stop the ones behind it; the first error is returned at the end.
    pub async fn drain_wallet_events(&mut self) -> Result<usize> {
        let mut events = Vec::new();
        if let Some((_, subscription)) = self.subscription.as_mut() {
            while let Some(event) = subscription.try_recv() {
                events.push(event);
            }
        }
        let count = events.len();
        let mut first_error = None;
        for event in events {
            if let Err(err) = self.handle_wallet_event(event).await {
                tracing::error!(%err, "wallet event failed");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(count),
        }
    }

    /// Drops the session and any persisted pairing. The subscription stays
    /// registered so a later reconnect is still observed.
    pub async fn disconnect(&mut self) -> Result<()> {
        let result = match self.active {
            Some(index) => self.providers[index].disconnect().await,
            None => Ok(()),
        };
        self.reset();
        tracing::info!("wallet disconnected");
        result
    }

    pub async fn teardown(&mut self) -> Result<()> {
        let result = self.disconnect().await;
        if let Some((_, subscription)) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.active = None;
        result
    }

    fn reset(&mut self) {
        self.session = Session::default();
        self.contract = None;
        self.balance = None;
        self.network = NetworkStatus::Disconnected;
        self.settings = None;
        self.recent_games.clear();
    }

    fn bound_contract(&self) -> Result<&P::Contract> {
        if !self.config.contract.is_configured() {
            return Err(Error::ContractNotConfigured);
        }
        self.contract.as_ref().ok_or(Error::NotConnected)
    }

    pub async fn load_contract_settings(&mut self) -> Result<ContractSettings> {
        let settings = self.bound_contract()?.settings().await?;
        tracing::info!(
            games = %settings.game_count,
            owner = ?settings.owner,
            "loaded contract settings"
        );
        self.settings = Some(settings.clone());
        Ok(settings)
    }

    /// The newest `limit` rows of the contract's game table.
    pub async fn recent_games(&mut self, limit: usize) -> Result<Vec<GameRecord>> {
        let count = match &self.settings {
            Some(settings) => settings.game_count,
            None => self.load_contract_settings().await?.game_count,
        };
        let count = count.min(U256::from(u64::MAX)).as_u64();
        let contract = self.bound_contract()?;
        let mut games = Vec::with_capacity(limit.min(count as usize));
        for index in (0..count).rev().take(limit) {
            games.push(contract.game(index).await?);
        }
        self.recent_games = games.clone();
        Ok(games)
    }

    pub fn view(&self) -> ClientView {
        ClientView {
            provider: self.active.map(|i| self.providers[i].kind()),
            account: self.session.account.as_ref().map(short_address),
            connected: self.session.connected,
            chain_id: self.session.chain_id,
            network_label: self.config.network.label.clone(),
            target_chain_id: self.config.network.chain_id,
            network: self.network,
            balance: self.balance.clone(),
            contract: self.config.contract.to_string(),
            contract_configured: self.config.contract.is_configured(),
            min_bet: self.config.limits.min_display().to_string(),
            max_bet: self.config.limits.max_display().to_string(),
            house_edge: self.config.house_edge.clone(),
            selected: self.selected,
            history: self.history.iter().cloned().collect(),
            settings: self.settings.clone(),
            recent_games: self.recent_games.clone(),
        }
    }
}
