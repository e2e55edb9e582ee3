use crate::{
    Error,
    Result,
    game::BetLimits,
    provider::ProviderKind,
};
use ethers::{
    types::Address,
    utils::to_checksum,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    fs,
    path::{
        Path,
        PathBuf,
    },
    str::FromStr,
};

pub const INLINE_CONTRACT_ADDRESS: &str = "0xC2f5a9296d67A45A1d17Aa29934B8a6c4DFE0657";
pub const INLINE_NETWORK: &str = "base-sepolia";
pub const INLINE_MIN_BET: &str = "0.001";
pub const INLINE_MAX_BET: &str = "0.1";
pub const INLINE_HOUSE_EDGE: &str = "5";

/// Marker left in templates until an operator pastes a real address.
pub const PLACEHOLDER_MARKER: &str = "PASTE_YOUR";

struct KnownNetwork {
    name: &'static str,
    label: &'static str,
    chain_id: u64,
    public_rpc: &'static str,
    alchemy_slug: Option<&'static str>,
}

const KNOWN_NETWORKS: [KnownNetwork; 3] = [
    KnownNetwork {
        name: "base-sepolia",
        label: "Base Sepolia",
        chain_id: 84532,
        public_rpc: "https://sepolia.base.org",
        alchemy_slug: Some("base-sepolia"),
    },
    KnownNetwork {
        name: "base",
        label: "Base",
        chain_id: 8453,
        public_rpc: "https://mainnet.base.org",
        alchemy_slug: Some("base-mainnet"),
    },
    KnownNetwork {
        name: "local",
        label: "Local",
        chain_id: 31337,
        public_rpc: "http://localhost:8545",
        alchemy_slug: None,
    },
];

/// On-disk configuration. Keys match the page's `APP_CONFIG` object so an
/// existing `config.js` body can be pasted in as JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StaticConfig {
    pub contract_address: String,
    pub network: String,
    #[serde(default)]
    pub alchemy_api_key: String,
    pub min_bet: String,
    pub max_bet: String,
    pub house_edge: String,
}

impl StaticConfig {
    pub fn inline() -> Self {
        Self {
            contract_address: INLINE_CONTRACT_ADDRESS.to_string(),
            network: INLINE_NETWORK.to_string(),
            alchemy_api_key: String::new(),
            min_bet: INLINE_MIN_BET.to_string(),
            max_bet: INLINE_MAX_BET.to_string(),
            house_edge: INLINE_HOUSE_EDGE.to_string(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = serde_json::from_slice::<StaticConfig>(&data)?;
        Ok(config)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractSource {
    StaticConfig(PathBuf),
    InlineConstant,
}

impl ContractSource {
    pub fn load(&self) -> Result<StaticConfig> {
        match self {
            ContractSource::StaticConfig(path) => StaticConfig::load(path),
            ContractSource::InlineConstant => Ok(StaticConfig::inline()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStrategy {
    #[default]
    InjectedOnly,
    InjectedWithPairing,
}

impl ConnectionStrategy {
    pub fn allows(self, kind: ProviderKind) -> bool {
        match (self, kind) {
            (_, ProviderKind::Injected) => true,
            (ConnectionStrategy::InjectedWithPairing, ProviderKind::Pairing) => true,
            (ConnectionStrategy::InjectedOnly, ProviderKind::Pairing) => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkTarget {
    pub name: String,
    pub label: String,
    pub chain_id: u64,
    pub rpc_url: String,
}

impl NetworkTarget {
    pub fn resolve(name: &str, alchemy_api_key: &str) -> Result<Self> {
        let known = KNOWN_NETWORKS
            .iter()
            .find(|n| n.name == name.trim())
            .ok_or_else(|| Error::Config(format!("unknown NETWORK '{name}'")))?;
        let key = alchemy_api_key.trim();
        let rpc_url = match known.alchemy_slug {
            Some(slug) if !key.is_empty() => {
                format!("https://{slug}.g.alchemy.com/v2/{key}")
            }
            _ => known.public_rpc.to_string(),
        };
        Ok(Self {
            name: known.name.to_string(),
            label: known.label.to_string(),
            chain_id: known.chain_id,
            rpc_url,
        })
    }

    /// Resolves a chain id to one of the networks this client knows an RPC for.
    pub fn for_chain(chain_id: u64) -> Option<Self> {
        KNOWN_NETWORKS
            .iter()
            .find(|n| n.chain_id == chain_id)
            .map(|n| Self {
                name: n.name.to_string(),
                label: n.label.to_string(),
                chain_id: n.chain_id,
                rpc_url: n.public_rpc.to_string(),
            })
    }

    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractStatus {
    Configured(Address),
    NotConfigured,
}

impl ContractStatus {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.contains(PLACEHOLDER_MARKER) {
            return Ok(ContractStatus::NotConfigured);
        }
        let address = Address::from_str(trimmed).map_err(|e| {
            Error::Config(format!("invalid CONTRACT_ADDRESS '{trimmed}': {e}"))
        })?;
        Ok(ContractStatus::Configured(address))
    }

    pub fn address(&self) -> Option<Address> {
        match self {
            ContractStatus::Configured(address) => Some(*address),
            ContractStatus::NotConfigured => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, ContractStatus::Configured(_))
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractStatus::Configured(address) => write!(f, "{}", short_address(address)),
            ContractStatus::NotConfigured => write!(f, "Not Configured"),
        }
    }
}

/// `0xC2f5...0657` style abbreviation of a checksummed address.
pub fn short_address(address: &Address) -> String {
    let full = to_checksum(address, None);
    format!("{}...{}", &full[..6], &full[38..])
}

/// Everything the session client needs to know about its deployment.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub contract: ContractStatus,
    pub network: NetworkTarget,
    pub limits: BetLimits,
    pub house_edge: String,
    pub strategy: ConnectionStrategy,
    /// Refuse to submit bets while connected to a chain other than `network`.
    pub require_target_chain: bool,
}

impl ClientConfig {
    pub fn from_static(
        config: &StaticConfig,
        strategy: ConnectionStrategy,
        require_target_chain: bool,
    ) -> Result<Self> {
        let contract = ContractStatus::parse(&config.contract_address)?;
        if !contract.is_configured() {
            tracing::warn!("contract address not configured; bets are disabled");
        }
        Ok(Self {
            contract,
            network: NetworkTarget::resolve(&config.network, &config.alchemy_api_key)?,
            limits: BetLimits::new(&config.min_bet, &config.max_bet)?,
            house_edge: config.house_edge.trim().to_string(),
            strategy,
            require_target_chain,
        })
    }

    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.network.rpc_url = url.into();
        self
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn static_config__reads_app_config_keys() {
        let raw = r#"{
            "CONTRACT_ADDRESS": "0xC2f5a9296d67A45A1d17Aa29934B8a6c4DFE0657",
            "NETWORK": "base-sepolia",
            "ALCHEMY_API_KEY": "",
            "MIN_BET": "0.001",
            "MAX_BET": "0.1",
            "HOUSE_EDGE": "5"
        }"#;
        let parsed: StaticConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed, StaticConfig::inline());
    }

    #[test]
    fn contract_status__placeholder_is_not_configured() {
        let status = ContractStatus::parse("PASTE_YOUR_CONTRACT_ADDRESS_HERE").unwrap();
        assert_eq!(status, ContractStatus::NotConfigured);
        assert_eq!(status.to_string(), "Not Configured");
        assert_eq!(ContractStatus::parse("  ").unwrap(), ContractStatus::NotConfigured);
    }

    #[test]
    fn contract_status__shortens_checksummed_address() {
        let status = ContractStatus::parse(INLINE_CONTRACT_ADDRESS).unwrap();
        assert_eq!(status.to_string(), "0xC2f5...0657");
    }

    #[test]
    fn contract_status__rejects_malformed_address() {
        assert!(ContractStatus::parse("0x1234").is_err());
    }

    #[test]
    fn network_target__prefers_alchemy_when_key_present() {
        let public = NetworkTarget::resolve("base-sepolia", "").unwrap();
        assert_eq!(public.chain_id, 84532);
        assert_eq!(public.rpc_url, "https://sepolia.base.org");
        assert_eq!(public.chain_id_hex(), "0x14a34");

        let alchemy = NetworkTarget::resolve("base-sepolia", "abc").unwrap();
        assert_eq!(alchemy.rpc_url, "https://base-sepolia.g.alchemy.com/v2/abc");
    }

    #[test]
    fn network_target__unknown_network_is_config_error() {
        assert!(matches!(
            NetworkTarget::resolve("goerli", ""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn strategy__injected_only_excludes_pairing() {
        assert!(ConnectionStrategy::InjectedOnly.allows(ProviderKind::Injected));
        assert!(!ConnectionStrategy::InjectedOnly.allows(ProviderKind::Pairing));
        assert!(ConnectionStrategy::InjectedWithPairing.allows(ProviderKind::Pairing));
    }
}
