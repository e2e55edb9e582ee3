use crate::{
    Error,
    Result,
    contract::ContractProxy,
    error::UNRECOGNIZED_CHAIN_CODE,
    injected::connect_http,
    provider::{
        EventHub,
        ProviderKind,
        Subscription,
        WalletEvent,
        WalletProvider,
    },
};
use chrono::Utc;
use ethers::{
    providers::{
        Http,
        Middleware,
        Provider,
    },
    types::{
        Address,
        U256,
    },
};
use rand::Rng;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
    sync::Arc,
    time::Duration,
};
use tokio::{
    task::JoinHandle,
    time,
};

pub const DEFAULT_PAIRING_STORE: &str = "~/.base-dice/pairing.json";
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(4);

/// The persisted pairing token. Present only while a pairing is active.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingSession {
    pub topic: String,
    pub endpoint: String,
    pub accounts: Vec<Address>,
    pub chain_id: u64,
    pub paired_at: String,
}

impl PairingSession {
    pub fn new(endpoint: impl Into<String>, accounts: Vec<Address>, chain_id: u64) -> Self {
        let mut topic = [0u8; 16];
        rand::rng().fill(&mut topic);
        Self {
            topic: hex::encode(topic),
            endpoint: endpoint.into(),
            accounts,
            chain_id,
            paired_at: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PairingStore {
    path: PathBuf,
}

impl PairingStore {
    pub fn new(path: impl AsRef<str>) -> Self {
        let expanded = shellexpand::tilde(path.as_ref());
        Self {
            path: PathBuf::from(expanded.into_owned()),
        }
    }

    pub fn load(&self) -> Result<Option<PairingSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.path)?;
        if data.is_empty() {
            return Ok(None);
        }
        let session = serde_json::from_slice::<PairingSession>(&data)?;
        Ok(Some(session))
    }

    pub fn save(&self, session: &PairingSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(session)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwitchChainParams {
    chain_id: String,
}

impl SwitchChainParams {
    fn request(chain_id: u64) -> [Self; 1] {
        [Self {
            chain_id: format!("{chain_id:#x}"),
        }]
    }
}

/// A wallet reached through a paired remote signer. The remote side holds the
/// keys and shows its own approval prompts.
pub struct PairedWallet {
    endpoint: Option<String>,
    provider: Option<Provider<Http>>,
    store: PairingStore,
    events: EventHub,
    watcher: Option<JoinHandle<()>>,
    watch_interval: Duration,
}

impl PairedWallet {
    pub fn new(endpoint: Option<String>, store: PairingStore) -> Result<Self> {
        let provider = endpoint.as_deref().map(connect_http).transpose()?;
        Ok(Self {
            endpoint,
            provider,
            store,
            events: EventHub::default(),
            watcher: None,
            watch_interval: DEFAULT_WATCH_INTERVAL,
        })
    }

    /// Reopens the endpoint recorded by a previous pairing when none is given.
    pub fn restore_or_new(endpoint: Option<String>, store: PairingStore) -> Result<Self> {
        let endpoint = match endpoint {
            Some(endpoint) => Some(endpoint),
            None => store.load()?.map(|session| session.endpoint),
        };
        Self::new(endpoint, store)
    }

    pub fn with_watch_interval(mut self, interval: Duration) -> Self {
        self.watch_interval = interval;
        self
    }

    fn provider(&self) -> Result<&Provider<Http>> {
        self.provider.as_ref().ok_or(Error::NoProviderAvailable)
    }

    fn persisted_session(&self) -> Result<Option<PairingSession>> {
        let session = self.store.load()?;
        Ok(session.filter(|s| Some(&s.endpoint) == self.endpoint.as_ref()))
    }

    fn start_watcher(&mut self, accounts: Vec<Address>, chain_id: u64) {
        if self.watcher.as_ref().is_some_and(|w| !w.is_finished()) {
            return;
        }
        let Some(provider) = self.provider.clone() else {
            return;
        };
        self.watcher = Some(tokio::spawn(watch_pairing(
            provider,
            self.events.clone(),
            self.watch_interval,
            accounts,
            chain_id,
        )));
    }

    fn stop_watcher(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

impl WalletProvider for PairedWallet {
    type Contract = ContractProxy<Provider<Http>>;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Pairing
    }

    fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    async fn request_accounts(&mut self) -> Result<Vec<Address>> {
        let provider = self.provider()?.clone();
        let endpoint = self.endpoint.clone().unwrap_or_default();
        let accounts: Vec<Address> = provider.request("eth_requestAccounts", ()).await?;
        if accounts.is_empty() {
            return Err(Error::UserRejected);
        }
        let chain_id = provider.get_chainid().await?.as_u64();
        let session = PairingSession::new(endpoint, accounts.clone(), chain_id);
        self.store.save(&session)?;
        tracing::info!(topic = %session.topic, ?accounts, "pairing established");
        self.start_watcher(accounts.clone(), chain_id);
        Ok(accounts)
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        if self.persisted_session()?.is_none() {
            return Ok(Vec::new());
        }
        let accounts = self.provider()?.get_accounts().await?;
        if accounts.is_empty() {
            tracing::info!("paired wallet no longer authorizes any account");
            self.store.clear()?;
        }
        Ok(accounts)
    }

    async fn chain_id(&self) -> Result<u64> {
        let chain_id = self.provider()?.get_chainid().await?;
        Ok(chain_id.as_u64())
    }

    async fn switch_chain(&mut self, chain_id: u64) -> Result<()> {
        let params = SwitchChainParams::request(chain_id);
        let result: Result<serde_json::Value> = self
            .provider()?
            .request("wallet_switchEthereumChain", params)
            .await
            .map_err(Error::from);
        match result {
            Ok(_) => Ok(()),
            Err(Error::Rpc { code, .. }) if code == UNRECOGNIZED_CHAIN_CODE => {
                Err(Error::UnsupportedChain(chain_id))
            }
            Err(err) => Err(err),
        }
    }

    async fn balance(&self, account: Address) -> Result<U256> {
        let balance = self.provider()?.get_balance(account, None).await?;
        Ok(balance)
    }

    fn bind_contract(&self, address: Address, account: Address) -> Result<Self::Contract> {
        let provider = self.provider()?.clone();
        Ok(ContractProxy::new(address, Arc::new(provider), account, None))
    }

    fn subscribe(&mut self) -> Subscription {
        let subscription = self.events.subscribe();
        if let Ok(Some(session)) = self.persisted_session() {
            self.start_watcher(session.accounts, session.chain_id);
        }
        subscription
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.stop_watcher();
        self.store.clear()
    }
}

impl Drop for PairedWallet {
    fn drop(&mut self) {
        self.stop_watcher();
    }
}

/// Polls the remote signer and turns observed changes into wallet events.
async fn watch_pairing(
    provider: Provider<Http>,
    events: EventHub,
    interval: Duration,
    mut accounts: Vec<Address>,
    mut chain_id: u64,
) {
    let mut ticker = time::interval(interval);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match provider.get_accounts().await.map_err(Error::from) {
            Ok(current) if current != accounts => {
                accounts = current.clone();
                events.emit(WalletEvent::AccountsChanged(current));
            }
            Ok(_) => {}
            Err(err) if err.is_disconnect() => {
                events.emit(WalletEvent::Disconnected);
                return;
            }
            Err(err) => {
                tracing::warn!(%err, "pairing watcher failed to read accounts");
                continue;
            }
        }
        match provider.get_chainid().await {
            Ok(current) if current.as_u64() != chain_id => {
                chain_id = current.as_u64();
                events.emit(WalletEvent::ChainChanged(chain_id));
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(%err, "pairing watcher failed to read chain id"),
        }
    }
}
