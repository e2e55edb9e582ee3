use crate::ui::{
    self,
    UiState,
    UserEvent,
};
use base_dice::{
    client::{
        DiceClient,
        Notice,
    },
    config::{
        ClientConfig,
        ConnectionStrategy,
        ContractSource,
    },
    connector::{
        self,
        ConnectorOptions,
        WalletConnector,
    },
    wallets::Prompt,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use std::{
    sync::Arc,
    time::Duration,
};
use tokio::time;

const TICK: Duration = Duration::from_millis(100);
const RECENT_GAMES: usize = 5;

pub struct AppConfig {
    pub contract_source: ContractSource,
    pub strategy: ConnectionStrategy,
    pub connectors: ConnectorOptions,
    pub rpc_url: Option<String>,
    pub require_target_chain: bool,
}

type Client = DiceClient<WalletConnector>;

pub async fn run_app(config: AppConfig) -> Result<()> {
    let static_config = config
        .contract_source
        .load()
        .wrap_err("loading contract configuration failed")?;
    let mut client_config = ClientConfig::from_static(
        &static_config,
        config.strategy,
        config.require_target_chain,
    )?;
    if let Some(url) = config.rpc_url {
        client_config = client_config.with_rpc_url(url);
    }
    tracing::info!(
        contract = %client_config.contract,
        network = %client_config.network.name,
        strategy = ?client_config.strategy,
        "client configured"
    );

    let mut ui_state = UiState::new(client_config.limits.min_display());
    let prompt: Arc<dyn Prompt> = Arc::new(ui_state.prompt());
    let connectors = connector::discover(&client_config, &config.connectors, prompt)
        .wrap_err("wallet discovery failed")?;
    let mut client = DiceClient::new(client_config, connectors);
    if client.restore().await.is_none() {
        tracing::info!("no wallet session to restore");
    }

    ui::terminal_enter(&mut ui_state)?;
    tracing::info!("UI ready");
    let res = run_loop(&mut client, &mut ui_state).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop(client: &mut Client, ui_state: &mut UiState) -> Result<()> {
    loop {
        if let Err(err) = client.drain_wallet_events().await {
            tracing::error!(%err, "applying wallet event failed");
            client_notice(ui_state, format!("Error: {err}"));
        }
        if let Some(notice) = client.take_notice() {
            ui_state.show_notice(notice);
        }
        ui::draw(ui_state, &client.view()).wrap_err("draw failed")?;

        while let Some(event) = ui::poll_event(ui_state)? {
            if matches!(event, UserEvent::Quit) {
                tracing::info!("quitting");
                return Ok(());
            }
            handle_event(client, ui_state, event).await?;
            if let Some(notice) = client.take_notice() {
                ui_state.show_notice(notice);
            }
            ui::draw(ui_state, &client.view()).wrap_err("draw after input failed")?;
        }

        // lets the pairing watcher run between input polls
        time::sleep(TICK).await;
    }
}

async fn handle_event(
    client: &mut Client,
    ui_state: &mut UiState,
    event: UserEvent,
) -> Result<()> {
    match event {
        UserEvent::Quit | UserEvent::Redraw => {}
        UserEvent::Select(number) => client.select_number(number),
        UserEvent::NextNumber => client.select_number(client.selected_number().next()),
        UserEvent::PrevNumber => client.select_number(client.selected_number().prev()),
        UserEvent::Connect => {
            show_busy(client, ui_state, "Connecting wallet...")?;
            // failures are reported through the client's notice
            let _ = client.connect().await;
        }
        UserEvent::Disconnect => {
            if let Err(err) = client.disconnect().await {
                client_notice(ui_state, format!("Error: {err}"));
            }
        }
        UserEvent::Roll(amount) => {
            let number = client.selected_number();
            show_busy(
                client,
                ui_state,
                format!("Rolling {number} for {amount} ETH... confirm in your wallet"),
            )?;
            let _ = client.submit_bet(number, &amount).await;
        }
        UserEvent::CheckNetwork => {
            show_busy(client, ui_state, "Checking network...")?;
            if let Err(err) = client.check_network().await {
                client_notice(ui_state, format!("Error: {err}"));
            }
        }
        UserEvent::LoadInfo => {
            show_busy(client, ui_state, "Reading contract...")?;
            let result = match client.load_contract_settings().await {
                Ok(_) => client.recent_games(RECENT_GAMES).await.map(|_| ()),
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                tracing::warn!(%err, "contract read failed");
                client_notice(ui_state, format!("Error: {err}"));
            }
        }
    }
    ui_state.set_busy(None);
    Ok(())
}

fn show_busy(client: &Client, ui_state: &mut UiState, message: impl Into<String>) -> Result<()> {
    ui_state.set_busy(Some(message.into()));
    ui::draw(ui_state, &client.view()).wrap_err("draw while busy failed")
}

fn client_notice(ui_state: &mut UiState, message: String) {
    ui_state.show_notice(Notice::Error(message));
}
