use base_dice::{
    client::{
        ClientView,
        NetworkStatus,
        Notice,
    },
    config::short_address,
    game::{
        BetStatus,
        DiceNumber,
        HistoryEntry,
        format_balance,
    },
    wallets::{
        Prompt,
        StdinPrompt,
    },
};
use color_eyre::eyre::Result;
use crossterm::{
    event::{
        self,
        Event,
        KeyCode,
        KeyEvent,
        KeyEventKind,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use itertools::Itertools;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::{
    io::{
        self,
        stdout,
    },
    sync::{
        Arc,
        atomic::{
            AtomicBool,
            Ordering,
        },
    },
};
use unicode_width::UnicodeWidthStr;

pub enum UserEvent {
    Quit,
    Connect,
    Disconnect,
    Select(DiceNumber),
    NextNumber,
    PrevNumber,
    Roll(String),
    CheckNetwork,
    LoadInfo,
    Redraw,
}

#[derive(Debug)]
pub struct UiState {
    mode: Mode,
    bet_amount: String,
    busy: Option<String>,
    terminal: Option<Terminal<CrosstermBackend<io::Stdout>>>,
    needs_clear: Arc<AtomicBool>,
}

impl UiState {
    pub fn new(default_amount: &str) -> Self {
        UiState {
            mode: Mode::Normal,
            bet_amount: default_amount.to_string(),
            busy: None,
            terminal: None,
            needs_clear: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn show_notice(&mut self, notice: Notice) {
        self.mode = Mode::Notice(notice);
    }

    pub fn set_busy(&mut self, message: Option<String>) {
        self.busy = message;
    }

    pub fn prompt(&self) -> SuspendingPrompt {
        SuspendingPrompt {
            needs_clear: self.needs_clear.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    BetModal(String),
    Notice(Notice),
    QuitModal,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enter_screen()?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    leave_screen()?;
    Ok(())
}

fn enter_screen() -> io::Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen
    )
}

fn leave_screen() -> io::Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::LeaveAlternateScreen
    )
}

/// Leaves the alternate screen for the duration of a terminal prompt so the
/// keystore password and transaction approvals can be typed normally.
#[derive(Clone, Debug)]
pub struct SuspendingPrompt {
    needs_clear: Arc<AtomicBool>,
}

impl SuspendingPrompt {
    fn suspended<T>(&self, f: impl FnOnce() -> io::Result<T>) -> io::Result<T> {
        leave_screen()?;
        let result = f();
        enter_screen()?;
        self.needs_clear.store(true, Ordering::Relaxed);
        result
    }
}

impl Prompt for SuspendingPrompt {
    fn password(&self, message: &str) -> io::Result<Option<String>> {
        self.suspended(|| StdinPrompt.password(message))
    }

    fn confirm(&self, message: &str) -> io::Result<bool> {
        self.suspended(|| StdinPrompt.confirm(message))
    }
}

pub fn draw(state: &mut UiState, view: &ClientView) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        if state.needs_clear.swap(false, Ordering::Relaxed) {
            term.clear()?;
        }
        term.draw(|f| ui(f, state, view))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Reads one pending terminal event, if any, without blocking.
pub fn poll_event(state: &mut UiState) -> Result<Option<UserEvent>> {
    if !event::poll(std::time::Duration::ZERO)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(handle_key(state, key)),
        Event::Resize(..) => Ok(Some(UserEvent::Redraw)),
        _ => Ok(None),
    }
}

fn handle_key(state: &mut UiState, key: KeyEvent) -> Option<UserEvent> {
    match &mut state.mode {
        Mode::Notice(_) => {
            state.mode = Mode::Normal;
            Some(UserEvent::Redraw)
        }
        Mode::QuitModal => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::BetModal(input) => match key.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                state.bet_amount = input.trim().to_string();
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Backspace => {
                input.pop();
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                input.push(c);
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::Normal => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                state.mode = Mode::QuitModal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('c') => Some(UserEvent::Connect),
            KeyCode::Char('d') => Some(UserEvent::Disconnect),
            KeyCode::Char('n') => Some(UserEvent::CheckNetwork),
            KeyCode::Char('i') => Some(UserEvent::LoadInfo),
            KeyCode::Char('b') => {
                state.mode = Mode::BetModal(state.bet_amount.clone());
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('r') | KeyCode::Enter => {
                Some(UserEvent::Roll(state.bet_amount.clone()))
            }
            KeyCode::Left | KeyCode::Char('h') => Some(UserEvent::PrevNumber),
            KeyCode::Right | KeyCode::Char('l') => Some(UserEvent::NextNumber),
            KeyCode::Char(c) => c
                .to_digit(10)
                .and_then(|d| DiceNumber::new(d as u8))
                .map(UserEvent::Select),
            _ => None,
        },
    }
}

fn ui(f: &mut Frame, state: &UiState, view: &ClientView) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // wallet + config
            Constraint::Length(5), // number selector
            Constraint::Length(3), // bet amount
            Constraint::Min(6),    // history + contract info
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_top(f, chunks[0], view);
    draw_numbers(f, chunks[1], view);
    draw_bet(f, chunks[2], state, view);
    draw_lower(f, chunks[3], view);
    draw_help(f, chunks[4]);
    draw_modals(f, state);
}

fn draw_top(f: &mut Frame, area: Rect, view: &ClientView) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    draw_wallet_panel(f, cols[0], view);
    draw_config_panel(f, cols[1], view);
}

fn draw_wallet_panel(f: &mut Frame, area: Rect, view: &ClientView) {
    let (account, style) = match &view.account {
        Some(account) if view.connected => {
            (account.clone(), Style::default().fg(Color::Green))
        }
        _ => ("Not connected".to_string(), Style::default().fg(Color::Yellow)),
    };
    let provider = view
        .provider
        .map(|kind| kind.to_string())
        .unwrap_or_else(|| "-".to_string());
    let balance = view
        .balance
        .as_deref()
        .map(|b| format!("{b} ETH"))
        .unwrap_or_else(|| "-".to_string());
    let lines = vec![
        Line::from(vec![Span::raw("Account: "), Span::styled(account, style)]),
        Line::from(format!("Provider: {provider}")),
        Line::from(format!("Balance: {balance}")),
        network_line(view),
    ];
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Wallet"));
    f.render_widget(widget, area);
}

fn network_line(view: &ClientView) -> Line<'static> {
    match view.network {
        NetworkStatus::Disconnected => Line::from("Network: -"),
        NetworkStatus::OnTarget => Line::from(Span::styled(
            format!("Network: {} ({})", view.network_label, view.chain_id),
            Style::default().fg(Color::Green),
        )),
        NetworkStatus::WrongNetwork { actual } => Line::from(Span::styled(
            format!(
                "Network: wrong chain {actual}, expected {} ({})",
                view.network_label, view.target_chain_id
            ),
            Style::default().fg(Color::Red),
        )),
    }
}

fn draw_config_panel(f: &mut Frame, area: Rect, view: &ClientView) {
    let contract_style = if view.contract_configured {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red)
    };
    let lines = vec![
        Line::from(vec![
            Span::raw("Contract: "),
            Span::styled(view.contract.clone(), contract_style),
        ]),
        Line::from(format!(
            "Network: {} ({})",
            view.network_label, view.target_chain_id
        )),
        Line::from(format!("Bet range: {} - {} ETH", view.min_bet, view.max_bet)),
        Line::from(format!("House edge: {}%", view.house_edge)),
    ];
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Config"));
    f.render_widget(widget, area);
}

fn draw_numbers(f: &mut Frame, area: Rect, view: &ClientView) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Pick a number (1-6, ←/→)");
    let inner = block.inner(area);
    f.render_widget(block, area);
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 6); 6])
        .split(inner);
    for (number, cell) in DiceNumber::all().zip(cells.iter()) {
        let selected = number == view.selected;
        let style = if selected {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let widget = Paragraph::new(format!("{} {}", dice_face(number), number))
            .alignment(Alignment::Center)
            .style(style)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(widget, *cell);
    }
}

fn dice_face(number: DiceNumber) -> &'static str {
    match number.get() {
        1 => "⚀",
        2 => "⚁",
        3 => "⚂",
        4 => "⚃",
        5 => "⚄",
        _ => "⚅",
    }
}

fn draw_bet(f: &mut Frame, area: Rect, state: &UiState, view: &ClientView) {
    let text = match &state.busy {
        Some(message) => message.clone(),
        None => format!(
            "Roll {} for {} ETH  (b edit amount, r roll)",
            view.selected, state.bet_amount
        ),
    };
    let style = if state.busy.is_some() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let widget = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Bet"));
    f.render_widget(widget, area);
}

fn draw_lower(f: &mut Frame, area: Rect, view: &ClientView) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    draw_history(f, cols[0], view);
    draw_contract_info(f, cols[1], view);
}

fn draw_history(f: &mut Frame, area: Rect, view: &ClientView) {
    let width = area.width.saturating_sub(2) as usize;
    let lines: Vec<Line> = if view.history.is_empty() {
        vec![Line::from("No games yet")]
    } else {
        view.history
            .iter()
            .map(|entry| {
                let style = match entry.status {
                    BetStatus::Completed => Style::default().fg(Color::Green),
                    BetStatus::Failed => Style::default().fg(Color::Red),
                };
                Line::from(Span::styled(fit(&history_line(entry), width), style))
            })
            .collect()
    };
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Recent games"));
    f.render_widget(widget, area);
}

fn history_line(entry: &HistoryEntry) -> String {
    let mut parts = vec![
        format!("🎲 {}", entry.chosen_number),
        format!("{} ETH", entry.bet_amount),
        entry.status.to_string(),
        entry.timestamp.clone(),
    ];
    if let Some(outcome) = &entry.outcome {
        let verdict = if outcome.won {
            format!("won {}", format_balance(outcome.payout_wei))
        } else {
            "lost".to_string()
        };
        parts.push(format!("rolled {} {verdict}", outcome.dice_result));
    }
    parts.into_iter().join(" | ")
}

fn draw_contract_info(f: &mut Frame, area: Rect, view: &ClientView) {
    let width = area.width.saturating_sub(2) as usize;
    let mut lines = Vec::new();
    match &view.settings {
        None => lines.push(Line::from("Press i to load contract info")),
        Some(settings) => {
            lines.push(Line::from(format!(
                "Min/Max: {} / {} ETH",
                format_balance(settings.min_bet),
                format_balance(settings.max_bet)
            )));
            lines.push(Line::from(format!("House edge: {}%", settings.house_edge)));
            lines.push(Line::from(format!("Games played: {}", settings.game_count)));
            lines.push(Line::from(format!("Owner: {}", short_address(&settings.owner))));
        }
    }
    if !view.recent_games.is_empty() {
        lines.push(Line::from(""));
        for game in &view.recent_games {
            let result = if game.won { "won" } else { "lost" };
            let text = format!(
                "#{} {} bet {} on {}, rolled {} {result}",
                game.index,
                short_address(&game.player),
                format_balance(game.bet_amount),
                game.chosen_number,
                game.dice_result
            );
            lines.push(Line::from(fit(&text, width)));
        }
    }
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Contract"));
    f.render_widget(widget, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new(
        "c connect | d disconnect | 1-6 ←/→ pick | b amount | r roll | n network | i info | q/Esc quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_modals(f: &mut Frame, state: &UiState) {
    match &state.mode {
        Mode::Normal => {}
        Mode::BetModal(input) => {
            let area = centered_rect(40, 25, f.area());
            let block = Block::default().borders(Borders::ALL).title("Bet amount");
            let p = Paragraph::new(format!(
                "Amount (ETH): {input}\nEnter=save Esc=cancel digits/. to edit"
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Notice(notice) => {
            let area = centered_rect(50, 25, f.area());
            let (title, color) = match notice {
                Notice::Success(_) => ("Success", Color::Green),
                Notice::Error(_) => ("Error", Color::Red),
            };
            let block = Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(color));
            let p = Paragraph::new(format!("{}\n\nPress any key", notice.text()))
                .wrap(Wrap { trim: false });
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::QuitModal => {
            let area = centered_rect(30, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Quit");
            let p = Paragraph::new("Quit Base Dice? y/n");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
    }
}

/// Truncates `text` to `width` terminal columns.
fn fit(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    for c in text.chars() {
        let next = format!("{out}{c}");
        if next.width() + 1 > width {
            break;
        }
        out = next;
    }
    out.push('…');
    out
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    vertical[1]
}
