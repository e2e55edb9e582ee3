use crate::{
    Result,
    game::{
        BetReceipt,
        ContractSettings,
        GameRecord,
        PendingBet,
    },
};
use ethers::types::{
    Address,
    U256,
};
use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        Mutex,
        atomic::{
            AtomicU64,
            Ordering,
        },
    },
};
use tokio::sync::mpsc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Injected,
    Pairing,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Injected => write!(f, "injected"),
            ProviderKind::Pairing => write!(f, "pairing"),
        }
    }
}

/// Notifications a wallet pushes independently of user actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
    Disconnected,
}

/// The wallet capability the session client drives. Implementations own the
/// transport and any approval prompts.
pub trait WalletProvider {
    type Contract: DiceContract;

    fn kind(&self) -> ProviderKind;

    /// Whether this provider can be offered to the user at all.
    fn is_available(&self) -> bool;

    /// Asks the wallet to authorize accounts, prompting the user if needed.
    fn request_accounts(&mut self) -> impl Future<Output = Result<Vec<Address>>>;

    /// Accounts already authorized, without prompting.
    fn accounts(&self) -> impl Future<Output = Result<Vec<Address>>>;

    fn chain_id(&self) -> impl Future<Output = Result<u64>>;

    fn switch_chain(&mut self, chain_id: u64) -> impl Future<Output = Result<()>>;

    fn balance(&self, account: Address) -> impl Future<Output = Result<U256>>;

    fn bind_contract(&self, address: Address, account: Address) -> Result<Self::Contract>;

    fn subscribe(&mut self) -> Subscription;

    /// Drops authorization and any persisted pairing state.
    fn disconnect(&mut self) -> impl Future<Output = Result<()>>;
}

/// Proxy for the deployed dice contract, bound to one sending account.
pub trait DiceContract {
    /// Sends `rollDice` with the bet attached and waits for one confirmation.
    fn roll_dice(&self, bet: &PendingBet) -> impl Future<Output = Result<BetReceipt>>;

    fn settings(&self) -> impl Future<Output = Result<ContractSettings>>;

    fn game(&self, index: u64) -> impl Future<Output = Result<GameRecord>>;
}

type Subscribers = HashMap<u64, mpsc::UnboundedSender<WalletEvent>>;

/// Fan-out of wallet events to registered subscriptions.
#[derive(Clone, Debug, Default)]
pub struct EventHub {
    subscribers: Arc<Mutex<Subscribers>>,
    next_id: Arc<AtomicU64>,
}

impl EventHub {
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.lock().insert(id, sender);
        Subscription {
            id,
            receiver,
            hub: self.clone(),
        }
    }

    pub fn emit(&self, event: WalletEvent) {
        let mut subscribers = self.lock();
        subscribers.retain(|_, sender| sender.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn remove(&self, id: u64) {
        self.lock().remove(&id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Subscribers> {
        // a poisoned map still holds valid senders
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: mpsc::UnboundedReceiver<WalletEvent>,
    hub: EventHub,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<WalletEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<WalletEvent> {
        self.receiver.try_recv().ok()
    }

    pub fn unsubscribe(self) {
        self.hub.remove(self.id);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.remove(self.id);
    }
}
