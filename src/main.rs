mod actions;
mod api;
mod cache;
mod categories;
mod chat;
mod colors;
mod config;
mod inbox;
mod models;
mod notify;
mod session;
mod store;
mod tags;
mod ui;

use crate::actions::{Completion, Request};
use crate::api::{HttpMailApi, parse_initial_emails, parse_initial_keywords};
use crate::config::{Config, matches_key};
use crate::inbox::Session;
use crate::models::InitialState;
use crate::store::Store;
use crate::ui::{ComposeField, Confirm, FocusedPanel, UIMode, UIState};
use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DB_URL: &str = "sqlite:tagmail.db?mode=rwc";
const LOG_FILE: &str = "tagmail_debug.log";

#[derive(Debug, Default)]
struct Args {
    debug: bool,
    reset_session: bool,
    snapshot: Option<PathBuf>,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut args = Self::default();
        let mut iter = std::env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--debug" => args.debug = true,
                "--reset-session" => args.reset_session = true,
                "--snapshot" => {
                    let path = iter.next().context("--snapshot needs a path")?;
                    args.snapshot = Some(PathBuf::from(path));
                }
                other => anyhow::bail!("Unknown argument: {}", other),
            }
        }
        Ok(args)
    }
}

fn init_logging(filter: &str) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
        .with_context(|| format!("Failed to open {}", LOG_FILE))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}

/// Initial inbox from a snapshot file if one is configured, otherwise from the home page.
async fn load_initial_state(
    config: &Config,
    snapshot: Option<PathBuf>,
    api: &HttpMailApi,
) -> Result<InitialState> {
    let mut state = match snapshot.or_else(|| config.snapshot.clone()) {
        Some(path) => {
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid snapshot {}", path.display()))?
        }
        None => {
            let html = api
                .bootstrap()
                .await
                .with_context(|| format!("Failed to reach {}", api.url_for("/")))?;
            let emails = parse_initial_emails(&html).unwrap_or_else(|| {
                warn!("Home page carried no initialEmails; starting empty");
                Vec::new()
            });
            // Categories persist server side, so its list beats local defaults.
            let keywords = parse_initial_keywords(&html).unwrap_or_else(|| {
                warn!("Home page carried no keywords; using configured defaults");
                Vec::new()
            });
            InitialState { emails, keywords }
        }
    };
    if state.keywords.is_empty() {
        state.keywords = config.keywords.clone();
    }
    Ok(state)
}

struct App {
    config: Config,
    session: Session,
    ui: UIState<'static>,
    api: Arc<HttpMailApi>,
    store: Store,
    tx: UnboundedSender<Completion>,
}

impl App {
    fn spawn(&self, request: Option<Request>) {
        let Some(request) = request else { return };
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let completion = request.run(&*api).await;
            // The receiver only goes away on shutdown.
            let _ = tx.send(completion);
        });
    }

    fn handle_completion(&mut self, completion: Completion) {
        let sent = matches!(completion, Completion::EmailCreated(Ok(())));
        let outcome = self.session.apply(completion);
        tracing::debug!(?outcome, "completion applied");
        if sent && self.ui.mode == UIMode::Composing {
            self.ui.close_popup();
        }
    }

    /// Returns true when the user asked to quit.
    async fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.ui.mode {
            UIMode::Browsing => return self.handle_browsing_key(key).await,
            UIMode::Composing => self.handle_compose_key(key),
            UIMode::Categories => self.handle_category_key(key),
            UIMode::Chatting => self.handle_chat_key(key),
            UIMode::Searching => self.handle_search_key(key),
            UIMode::Confirming(confirm) => self.handle_confirm_key(key, confirm),
        }
        false
    }

    async fn handle_browsing_key(&mut self, key: KeyEvent) -> bool {
        let bindings = &self.config.keybindings;

        if matches_key(key, &bindings.quit) {
            return true;
        }

        if matches_key(key, &bindings.prev_panel) {
            self.ui.focused_panel = match self.ui.focused_panel {
                FocusedPanel::Details => FocusedPanel::Emails,
                FocusedPanel::Emails | FocusedPanel::Folders => FocusedPanel::Folders,
            };
        } else if matches_key(key, &bindings.next_panel) {
            self.ui.focused_panel = match self.ui.focused_panel {
                FocusedPanel::Folders => FocusedPanel::Emails,
                FocusedPanel::Emails | FocusedPanel::Details => FocusedPanel::Details,
            };
        } else if matches_key(key, &bindings.move_down) {
            self.move_cursor(1);
        } else if matches_key(key, &bindings.move_up) {
            self.move_cursor(-1);
        } else if matches_key(key, &bindings.toggle_check) {
            if let Some(id) = self.session.current {
                self.session.toggle_checked(id);
            }
        } else if matches_key(key, &bindings.select_all) {
            let all = self.session.check_state() == inbox::CheckState::All;
            self.session.set_all_checked(!all);
        } else if matches_key(key, &bindings.classify) {
            let request = self.session.begin_classify_current();
            self.spawn(request);
        } else if matches_key(key, &bindings.classify_batch) {
            let ids = self.session.checked_ids();
            let request = self.session.begin_classify_batch(&ids);
            self.spawn(request);
        } else if matches_key(key, &bindings.untag) {
            let request = self.session.begin_untag();
            self.spawn(request);
        } else if matches_key(key, &bindings.highlight) {
            self.session.toggle_highlight_current();
        } else if matches_key(key, &bindings.delete) {
            if self.session.current.is_some() {
                self.ui.mode = UIMode::Confirming(Confirm::DeleteEmail);
            }
        } else if matches_key(key, &bindings.new_message) {
            self.ui.open_compose();
        } else if matches_key(key, &bindings.chat) {
            if self.session.current.is_some() {
                self.ui.mode = UIMode::Chatting;
            }
        } else if matches_key(key, &bindings.categories) {
            self.ui.mode = UIMode::Categories;
        } else if matches_key(key, &bindings.search) {
            self.ui.mode = UIMode::Searching;
        } else if matches_key(key, &bindings.process_untagged) {
            self.ui.mode = UIMode::Confirming(Confirm::ProcessUntagged);
        } else if matches_key(key, &bindings.toggle_theme) {
            let theme = self.session.toggle_theme();
            if let Err(e) = self.store.save_theme(theme).await {
                warn!("Failed to save theme: {:#}", e);
            }
        }
        false
    }

    fn move_cursor(&mut self, delta: isize) {
        match self.ui.focused_panel {
            FocusedPanel::Folders => {
                let folders = self.session.categories.folders();
                let index = self
                    .session
                    .active_folder()
                    .saturating_add_signed(delta)
                    .min(folders.len());
                let keyword = index
                    .checked_sub(1)
                    .and_then(|i| folders.get(i))
                    .map(|f| f.keyword.clone());
                self.session.set_keyword_filter(keyword.as_deref());
            }
            FocusedPanel::Emails => {
                self.session.move_selection(delta);
                self.ui.detail_scroll = 0;
            }
            FocusedPanel::Details => {
                self.ui.detail_scroll = self.ui.detail_scroll.saturating_add_signed(delta as i16);
            }
        }
    }

    fn handle_compose_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc {
            self.ui.close_popup();
            return;
        }
        if matches_key(key, &self.config.keybindings.send_message) {
            if let Some(cs) = &self.ui.compose_state {
                let request = self.session.begin_create_email(cs.draft());
                self.spawn(request);
            }
            return;
        }
        let Some(cs) = &mut self.ui.compose_state else {
            return;
        };
        match key.code {
            KeyCode::Tab => cs.focused_field = cs.focused_field.next(),
            KeyCode::BackTab => cs.focused_field = cs.focused_field.prev(),
            KeyCode::Enter if cs.focused_field != ComposeField::Content => {
                cs.focused_field = cs.focused_field.next();
            }
            _ => {
                cs.focused_textarea().input(key);
            }
        }
    }

    fn handle_category_key(&mut self, key: KeyEvent) {
        let count = self.session.categories.list_existing().len();
        match key.code {
            KeyCode::Esc => self.ui.mode = UIMode::Browsing,
            KeyCode::Enter => {
                let name = self.ui.take_category_input();
                let request = self.session.begin_add_category(&name);
                self.spawn(request);
            }
            KeyCode::Up => {
                self.ui.category_panel.selected = self.ui.category_panel.selected.saturating_sub(1);
            }
            KeyCode::Down => {
                self.ui.category_panel.selected =
                    (self.ui.category_panel.selected + 1).min(count.saturating_sub(1));
            }
            KeyCode::Delete => {
                let selected = self.ui.category_panel.selected;
                let name = self.session.categories.list_existing().get(selected).cloned();
                if let Some(name) = name {
                    let request = self.session.begin_delete_category(&name);
                    self.spawn(request);
                    self.ui.category_panel.selected = selected.min(count.saturating_sub(2));
                }
            }
            _ => {
                self.ui.category_panel.input.input(key);
            }
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.ui.mode = UIMode::Browsing,
            KeyCode::Enter => {
                let message = self.ui.take_chat_input();
                let request = self.session.begin_chat(&message);
                self.spawn(request);
            }
            KeyCode::PageUp => {
                self.session.chat.follow_tail = false;
                self.ui.chat_scroll = self.ui.chat_scroll.saturating_sub(3);
            }
            KeyCode::PageDown => {
                self.session.chat.follow_tail = false;
                self.ui.chat_scroll = self.ui.chat_scroll.saturating_add(3);
            }
            _ => {
                self.ui.chat_input.input(key);
            }
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.ui.mode = UIMode::Browsing,
            KeyCode::Esc => {
                self.ui.clear_search();
                self.session.set_search("");
                self.ui.mode = UIMode::Browsing;
            }
            _ => {
                self.ui.search_input.input(key);
                self.session.set_search(&self.ui.search_text());
            }
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent, confirm: Confirm) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.ui.mode = UIMode::Browsing;
                match confirm {
                    Confirm::DeleteEmail => {
                        let request = self.session.begin_delete();
                        self.spawn(request);
                    }
                    Confirm::ProcessUntagged => {
                        let url = self.api.url_for("/process-untagged");
                        info!("Opening {}", url);
                        if let Err(e) = open::that(&url) {
                            error!("Failed to open {}: {}", url, e);
                            self.session
                                .notifications
                                .error("Could not open the browser.");
                        }
                    }
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => self.ui.mode = UIMode::Browsing,
            _ => {}
        }
    }

    async fn run<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        rx: &mut UnboundedReceiver<Completion>,
    ) -> Result<()> {
        let mut events = EventStream::new();
        let mut tick = tokio::time::interval(Duration::from_millis(250));

        loop {
            self.session.notifications.prune_expired(Instant::now());
            terminal.draw(|f| ui::render(f, &mut self.session, &mut self.ui))?;

            tokio::select! {
                Some(completion) = rx.recv() => self.handle_completion(completion),
                event = events.next() => match event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key).await {
                            return Ok(());
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(()),
                },
                _ = tick.tick() => {}
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse()?;
    let config = Config::load()?;
    if args.debug {
        init_logging(&config.log_filter)?;
    }

    let ring = session::RingStorage;
    if args.reset_session {
        ring.clear()?;
        println!("Session cleared. Restart without --reset-session to continue.");
        return Ok(());
    }

    let store = Store::new(DB_URL).await?;
    store.run_migrations().await?;
    let theme = store.load_theme().await.unwrap_or_else(|e| {
        warn!("Failed to load theme: {:#}", e);
        Default::default()
    });

    let api = Arc::new(
        HttpMailApi::new(&config.server.base_url, config.server.timeout())
            .context("Failed to build HTTP client")?,
    );
    match ring.load() {
        Ok(Some(cookie)) => api.cookies().seed(&cookie),
        Ok(None) => {}
        Err(e) => warn!("Failed to load saved session: {:#}", e),
    }

    let initial = load_initial_state(&config, args.snapshot, &api).await?;
    let mut session = Session::new(initial, theme);
    session.select_position(0);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut app = App {
        config,
        session,
        ui: UIState::default(),
        api: api.clone(),
        store,
        tx,
    };
    let result = app.run(&mut terminal, &mut rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    if let Some(cookie) = api.cookies().header_value() {
        if let Err(e) = ring.store(&cookie) {
            warn!("Failed to save session: {:#}", e);
        }
    }

    result
}
