use ethers::{
    contract::ContractError,
    providers::{
        JsonRpcError,
        Middleware,
        MiddlewareError,
        ProviderError,
        RpcError,
    },
};

/// EIP-1193 "user rejected request".
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-1193 "unrecognized chain" returned by `wallet_switchEthereumChain`.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;
/// EIP-1193 "disconnected" / "chain disconnected".
pub const DISCONNECTED_CODES: [i64; 2] = [4900, 4901];

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No wallet provider available")]
    NoProviderAvailable,
    #[error("User rejected the request")]
    UserRejected,
    #[error("Please enter valid bet amount ({min} - {max} ETH)")]
    InvalidBetAmount { min: String, max: String },
    #[error("Please connect your wallet first!")]
    NotConnected,
    #[error("Wrong network: expected chain {expected}, connected to {actual}")]
    NetworkMismatch { expected: u64, actual: u64 },
    #[error("{reason}")]
    TransactionFailed { reason: String },
    #[error("Contract not configured. Edit CONTRACT_ADDRESS in your config")]
    ContractNotConfigured,
    #[error("Unrecognized chain {0}")]
    UnsupportedChain(u64),
    #[error("wallet responded with error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("keystore: {0}")]
    Keystore(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn from_rpc(response: &JsonRpcError) -> Self {
        match response.code {
            USER_REJECTED_CODE => Error::UserRejected,
            code => Error::Rpc {
                code,
                message: response.message.clone(),
            },
        }
    }

    /// Maps a failed contract call. Cancellation keeps its own kind, everything
    /// else becomes `TransactionFailed` carrying the most specific reason found.
    pub fn from_contract<M: Middleware>(err: ContractError<M>) -> Self {
        if let Some(reason) = err.decode_revert::<String>() {
            return Error::TransactionFailed { reason };
        }
        let response = err
            .as_middleware_error()
            .and_then(MiddlewareError::as_error_response)
            .or_else(|| {
                err.as_provider_error()
                    .and_then(RpcError::as_error_response)
            });
        match response {
            Some(resp) if resp.code == USER_REJECTED_CODE => Error::UserRejected,
            Some(resp) => Error::TransactionFailed {
                reason: resp.message.clone(),
            },
            None => Error::TransactionFailed {
                reason: err.to_string(),
            },
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Error::UserRejected)
    }

    pub fn is_disconnect(&self) -> bool {
        matches!(self, Error::Rpc { code, .. } if DISCONNECTED_CODES.contains(code))
    }
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        match RpcError::as_error_response(&err) {
            Some(response) => Error::from_rpc(response),
            None => Error::Transport(err.to_string()),
        }
    }
}

/// Text shown to the user when a bet submission fails.
pub fn bet_failure_message(err: &Error) -> String {
    match err {
        Error::UserRejected => String::from("Transaction cancelled"),
        other => format!("Error: {other}"),
    }
}
