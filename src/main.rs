use base_dice::{
    config::{
        ConnectionStrategy,
        ContractSource,
    },
    connector::ConnectorOptions,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use std::path::PathBuf;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod app;
mod ui;

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: base-dice [--config <path>] [--wallet <name>] [--wallet-dir <path>]\n\
         [--pair <url|saved>] [--pairing-store <path>] [--rpc-url <url>]\n\
         [--require-target-chain]\n\
         \n\
         Flags:\n\
           --config <path>         JSON file with CONTRACT_ADDRESS, NETWORK, MIN_BET, ... (defaults to built-in values)\n\
           --wallet <name>         Keystore to play with (defaults to the first one found)\n\
           --wallet-dir <path>     Keystore directory (defaults to ~/.foundry/keystores)\n\
           --pair <url|saved>      Also offer a paired remote signer; `saved` reuses the last pairing\n\
           --pairing-store <path>  Where the pairing session is kept (defaults to {})\n\
           --rpc-url <url>         Override the RPC URL of the configured network\n\
           --require-target-chain  Refuse to bet while the wallet is on another chain",
        base_dice::pairing::DEFAULT_PAIRING_STORE,
    );
    std::process::exit(0);
}

fn parse_cli_args() -> Result<app::AppConfig> {
    let mut args = std::env::args().skip(1);
    let mut config_path: Option<String> = None;
    let mut wallet: Option<String> = None;
    let mut wallet_dir: Option<String> = None;
    let mut pair: Option<String> = None;
    let mut pairing_store: Option<String> = None;
    let mut rpc_url: Option<String> = None;
    let mut require_target_chain = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| eyre!("--config requires a path argument"))?;
                if config_path.is_some() {
                    return Err(eyre!("--config may only be specified once"));
                }
                config_path = Some(path);
            }
            "--wallet" => {
                let name = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet requires a wallet name"))?;
                if wallet.is_some() {
                    return Err(eyre!("--wallet may only be specified once"));
                }
                wallet = Some(name);
            }
            "--wallet-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet-dir requires a path argument"))?;
                if wallet_dir.is_some() {
                    return Err(eyre!("--wallet-dir may only be specified once"));
                }
                wallet_dir = Some(dir);
            }
            "--pair" => {
                let target = args
                    .next()
                    .ok_or_else(|| eyre!("--pair requires a signer URL or `saved`"))?;
                if pair.is_some() {
                    return Err(eyre!("--pair may only be specified once"));
                }
                pair = Some(target);
            }
            "--pairing-store" => {
                let path = args
                    .next()
                    .ok_or_else(|| eyre!("--pairing-store requires a path argument"))?;
                if pairing_store.is_some() {
                    return Err(eyre!("--pairing-store may only be specified once"));
                }
                pairing_store = Some(path);
            }
            "--rpc-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--rpc-url requires a URL argument"))?;
                if rpc_url.is_some() {
                    return Err(eyre!("--rpc-url may only be specified once"));
                }
                rpc_url = Some(url);
            }
            "--require-target-chain" => require_target_chain = true,
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let contract_source = match config_path {
        Some(path) => {
            let expanded = shellexpand::tilde(&path).into_owned();
            ContractSource::StaticConfig(PathBuf::from(expanded))
        }
        None => ContractSource::InlineConstant,
    };
    let strategy = if pair.is_some() {
        ConnectionStrategy::InjectedWithPairing
    } else {
        ConnectionStrategy::InjectedOnly
    };
    let pair_endpoint = pair.filter(|target| target != "saved");

    Ok(app::AppConfig {
        contract_source,
        strategy,
        connectors: ConnectorOptions {
            wallet,
            wallet_dir,
            pair_endpoint,
            pairing_store,
        },
        rpc_url,
        require_target_chain,
    })
}

/// Logs to a daily file under `logs/`. Keep the guard alive until exit or
/// buffered lines are lost.
fn init_tracing() -> WorkerGuard {
    let file_appender = rolling::daily("logs", "base-dice.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    guard
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let app_config = parse_cli_args()?;
    let _log_guard = init_tracing();
    tracing::info!("starting base-dice client");
    app::run_app(app_config).await
}
