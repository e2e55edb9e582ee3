use crate::{
    Error,
    Result,
    config::NetworkTarget,
    contract::ContractProxy,
    provider::{
        EventHub,
        ProviderKind,
        Subscription,
        WalletEvent,
        WalletProvider,
    },
    wallets::{
        self,
        Prompt,
        WalletDescriptor,
    },
};
use ethers::{
    middleware::SignerMiddleware,
    providers::{
        Http,
        Middleware,
        Provider,
    },
    signers::{
        LocalWallet,
        Signer,
    },
    types::{
        Address,
        U256,
    },
};
use std::{
    collections::HashMap,
    sync::Arc,
};

pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// A keystore that lives on this machine, unlocked on request and used to
/// sign against a JSON-RPC endpoint. Chain switches re-point the endpoint.
pub struct KeystoreWallet {
    descriptor: Option<WalletDescriptor>,
    endpoints: HashMap<u64, String>,
    provider: Provider<Http>,
    signer: Option<LocalWallet>,
    prompt: Arc<dyn Prompt>,
    events: EventHub,
}

impl KeystoreWallet {
    pub fn new(
        descriptor: Option<WalletDescriptor>,
        network: &NetworkTarget,
        prompt: Arc<dyn Prompt>,
    ) -> Result<Self> {
        let provider = connect_http(&network.rpc_url)?;
        let mut endpoints = HashMap::new();
        endpoints.insert(network.chain_id, network.rpc_url.clone());
        Ok(Self {
            descriptor,
            endpoints,
            provider,
            signer: None,
            prompt,
            events: EventHub::default(),
        })
    }

    /// Registers an RPC endpoint `switch_chain` may move to.
    pub fn with_endpoint(mut self, chain_id: u64, url: impl Into<String>) -> Self {
        self.endpoints.insert(chain_id, url.into());
        self
    }

    fn endpoint_for(&self, chain_id: u64) -> Option<String> {
        self.endpoints.get(&chain_id).cloned().or_else(|| {
            NetworkTarget::for_chain(chain_id).map(|network| network.rpc_url)
        })
    }
}

impl WalletProvider for KeystoreWallet {
    type Contract = ContractProxy<SignerClient>;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Injected
    }

    fn is_available(&self) -> bool {
        self.descriptor
            .as_ref()
            .is_some_and(|descriptor| descriptor.path.is_file())
    }

    async fn request_accounts(&mut self) -> Result<Vec<Address>> {
        let descriptor = self
            .descriptor
            .as_ref()
            .ok_or(Error::NoProviderAvailable)?;
        let chain_id = self.chain_id().await?;
        let signer = wallets::unlock_wallet(descriptor, self.prompt.as_ref())?
            .with_chain_id(chain_id);
        let address = signer.address();
        tracing::info!(wallet = %descriptor.name, ?address, "keystore unlocked");
        self.signer = Some(signer);
        self.events
            .emit(WalletEvent::AccountsChanged(vec![address]));
        Ok(vec![address])
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(self.signer.iter().map(Signer::address).collect())
    }

    async fn chain_id(&self) -> Result<u64> {
        let chain_id = self.provider.get_chainid().await?;
        Ok(chain_id.as_u64())
    }

    async fn switch_chain(&mut self, chain_id: u64) -> Result<()> {
        let url = self
            .endpoint_for(chain_id)
            .ok_or(Error::UnsupportedChain(chain_id))?;
        let provider = connect_http(&url)?;
        let reported = provider.get_chainid().await?.as_u64();
        if reported != chain_id {
            return Err(Error::NetworkMismatch {
                expected: chain_id,
                actual: reported,
            });
        }
        tracing::info!(chain_id, %url, "switched RPC endpoint");
        self.provider = provider;
        self.signer = self.signer.take().map(|s| s.with_chain_id(chain_id));
        self.events.emit(WalletEvent::ChainChanged(chain_id));
        Ok(())
    }

    async fn balance(&self, account: Address) -> Result<U256> {
        let balance = self.provider.get_balance(account, None).await?;
        Ok(balance)
    }

    fn bind_contract(&self, address: Address, account: Address) -> Result<Self::Contract> {
        let signer = self.signer.clone().ok_or(Error::NotConnected)?;
        if signer.address() != account {
            return Err(Error::NotConnected);
        }
        let client = SignerMiddleware::new(self.provider.clone(), signer);
        Ok(ContractProxy::new(
            address,
            Arc::new(client),
            account,
            Some(self.prompt.clone()),
        ))
    }

    fn subscribe(&mut self) -> Subscription {
        self.events.subscribe()
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.signer = None;
        Ok(())
    }
}

pub(crate) fn connect_http(url: &str) -> Result<Provider<Http>> {
    Provider::<Http>::try_from(url)
        .map_err(|e| Error::Config(format!("invalid RPC URL '{url}': {e}")))
}
