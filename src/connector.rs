use crate::{
    Result,
    config::ClientConfig,
    contract::ContractProxy,
    game::{
        BetReceipt,
        ContractSettings,
        GameRecord,
        PendingBet,
    },
    injected::{
        KeystoreWallet,
        SignerClient,
    },
    pairing::{
        PairedWallet,
        PairingStore,
    },
    provider::{
        DiceContract,
        ProviderKind,
        Subscription,
        WalletProvider,
    },
    wallets::{
        self,
        Prompt,
        WalletDescriptor,
    },
};
use ethers::{
    providers::{
        Http,
        Provider,
    },
    types::{
        Address,
        U256,
    },
};
use std::sync::Arc;

/// Where the binary looks for wallets.
#[derive(Clone, Debug, Default)]
pub struct ConnectorOptions {
    pub wallet: Option<String>,
    pub wallet_dir: Option<String>,
    pub pair_endpoint: Option<String>,
    pub pairing_store: Option<String>,
}

/// The concrete wallets the binary can drive, in preference order.
pub enum WalletConnector {
    Keystore(KeystoreWallet),
    Paired(PairedWallet),
}

pub enum ConnectorContract {
    Keystore(ContractProxy<SignerClient>),
    Paired(ContractProxy<Provider<Http>>),
}

/// Builds the provider list for `config.strategy`: the local keystore first,
/// then the paired signer when pairing is allowed.
pub fn discover(
    config: &ClientConfig,
    options: &ConnectorOptions,
    prompt: Arc<dyn Prompt>,
) -> Result<Vec<WalletConnector>> {
    let dir = wallets::resolve_wallet_dir(options.wallet_dir.as_deref())?;
    let descriptor = pick_keystore(&dir, options.wallet.as_deref())?;
    let mut connectors = vec![WalletConnector::Keystore(KeystoreWallet::new(
        descriptor,
        &config.network,
        prompt,
    )?)];

    if config.strategy.allows(ProviderKind::Pairing) {
        let store = PairingStore::new(
            options
                .pairing_store
                .as_deref()
                .unwrap_or(crate::pairing::DEFAULT_PAIRING_STORE),
        );
        let paired = PairedWallet::restore_or_new(options.pair_endpoint.clone(), store)?;
        connectors.push(WalletConnector::Paired(paired));
    }
    Ok(connectors)
}

fn pick_keystore(
    dir: &std::path::Path,
    name: Option<&str>,
) -> Result<Option<WalletDescriptor>> {
    if let Some(name) = name {
        return wallets::find_wallet(dir, name).map(Some);
    }
    let mut found = wallets::list_wallets(dir)?;
    if found.len() > 1 {
        tracing::info!(
            count = found.len(),
            "several keystores found, using the first; pass --wallet to choose"
        );
    }
    Ok((!found.is_empty()).then(|| found.remove(0)))
}

impl WalletProvider for WalletConnector {
    type Contract = ConnectorContract;

    fn kind(&self) -> ProviderKind {
        match self {
            WalletConnector::Keystore(w) => w.kind(),
            WalletConnector::Paired(w) => w.kind(),
        }
    }

    fn is_available(&self) -> bool {
        match self {
            WalletConnector::Keystore(w) => w.is_available(),
            WalletConnector::Paired(w) => w.is_available(),
        }
    }

    async fn request_accounts(&mut self) -> Result<Vec<Address>> {
        match self {
            WalletConnector::Keystore(w) => w.request_accounts().await,
            WalletConnector::Paired(w) => w.request_accounts().await,
        }
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        match self {
            WalletConnector::Keystore(w) => w.accounts().await,
            WalletConnector::Paired(w) => w.accounts().await,
        }
    }

    async fn chain_id(&self) -> Result<u64> {
        match self {
            WalletConnector::Keystore(w) => w.chain_id().await,
            WalletConnector::Paired(w) => w.chain_id().await,
        }
    }

    async fn switch_chain(&mut self, chain_id: u64) -> Result<()> {
        match self {
            WalletConnector::Keystore(w) => w.switch_chain(chain_id).await,
            WalletConnector::Paired(w) => w.switch_chain(chain_id).await,
        }
    }

    async fn balance(&self, account: Address) -> Result<U256> {
        match self {
            WalletConnector::Keystore(w) => w.balance(account).await,
            WalletConnector::Paired(w) => w.balance(account).await,
        }
    }

    fn bind_contract(&self, address: Address, account: Address) -> Result<Self::Contract> {
        match self {
            WalletConnector::Keystore(w) => w
                .bind_contract(address, account)
                .map(ConnectorContract::Keystore),
            WalletConnector::Paired(w) => w
                .bind_contract(address, account)
                .map(ConnectorContract::Paired),
        }
    }

    fn subscribe(&mut self) -> Subscription {
        match self {
            WalletConnector::Keystore(w) => w.subscribe(),
            WalletConnector::Paired(w) => w.subscribe(),
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        match self {
            WalletConnector::Keystore(w) => w.disconnect().await,
            WalletConnector::Paired(w) => w.disconnect().await,
        }
    }
}

impl DiceContract for ConnectorContract {
    async fn roll_dice(&self, bet: &PendingBet) -> Result<BetReceipt> {
        match self {
            ConnectorContract::Keystore(c) => c.roll_dice(bet).await,
            ConnectorContract::Paired(c) => c.roll_dice(bet).await,
        }
    }

    async fn settings(&self) -> Result<ContractSettings> {
        match self {
            ConnectorContract::Keystore(c) => c.settings().await,
            ConnectorContract::Paired(c) => c.settings().await,
        }
    }

    async fn game(&self, index: u64) -> Result<GameRecord> {
        match self {
            ConnectorContract::Keystore(c) => c.game(index).await,
            ConnectorContract::Paired(c) => c.game(index).await,
        }
    }
}
