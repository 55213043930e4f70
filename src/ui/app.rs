use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyModifiers, MouseButton, MouseEventKind};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use std::collections::HashSet;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use ocstats_core::stats::{load_combined_session_chat, load_session_chat};
use ocstats_core::{ChatMessage, StoragePaths};

use crate::config::Settings;
use crate::monitor::{RefreshMessage, Refresher};
use crate::state::{AppState, ModalState, PanelFocus, SharedState, StatsWindow};

use super::components::{
    DayList, Heatmap, HelpPopup, ModelList, OverviewPanel, SessionDetail, SessionList,
    SessionModal, StatusBar,
};
use super::{Layout, ViewMode};

/// Main application
pub struct App {
    state: SharedState,
    settings: Settings,
    storage: StoragePaths,
    layout: Layout,
    force_tx: Option<mpsc::Sender<()>>,
}

impl App {
    /// Create a new application
    pub fn new(settings: Settings) -> Self {
        let storage = StoragePaths::discover(settings.storage_dir.as_deref());
        let state = AppState::shared(
            StatsWindow::from_days(settings.ui.default_window_days),
            settings.pricing.enabled,
        );

        Self {
            state,
            settings,
            storage,
            layout: Layout::new(),
            force_tx: None,
        }
    }

    /// Run the application
    pub async fn run(&mut self) -> Result<()> {
        install_panic_hook();

        // Setup terminal
        crossterm::terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        crossterm::execute!(
            stdout,
            crossterm::terminal::EnterAlternateScreen,
            crossterm::event::EnableMouseCapture
        )?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Warm the pricing table off the main loop.
        if self.settings.pricing.enabled {
            ocstats_core::pricing::set_cache_ttl_hours(self.settings.pricing.cache_ttl_hours);
            tokio::task::spawn_blocking(ocstats_core::pricing::init_pricing);
        }

        // Start the background refresher
        let refresher = Refresher::new(self.settings.clone(), self.storage.clone());
        let (mut refresh_rx, force_tx) = refresher.start();
        self.force_tx = Some(force_tx);

        let result = self.main_loop(&mut terminal, &mut refresh_rx).await;

        // Restore terminal
        crossterm::terminal::disable_raw_mode()?;
        crossterm::execute!(
            terminal.backend_mut(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::event::DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    async fn main_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        refresh_rx: &mut mpsc::Receiver<RefreshMessage>,
    ) -> Result<()> {
        loop {
            {
                let state = self.state.read();
                if !state.running {
                    break;
                }
            }

            terminal.draw(|frame| {
                let state = self.state.read();
                let areas = self.layout.calculate(frame.area());

                match self.layout.view_mode() {
                    ViewMode::Days => {
                        if let Some(area) = areas.sidebar {
                            DayList::render(frame, area, &state);
                        }
                        if let Some(area) = areas.content_top {
                            SessionList::render(frame, area, &state);
                        }
                        if let Some(area) = areas.content_bottom {
                            SessionDetail::render(frame, area, &state);
                        }
                    }
                    ViewMode::Models => {
                        if let Some(area) = areas.sidebar {
                            ModelList::render(frame, area, &state);
                        }
                        if let Some(area) = areas.content_top {
                            ModelList::render_detail(frame, area, &state);
                        }
                    }
                    ViewMode::Overview => {
                        if let Some(area) = areas.heatmap {
                            Heatmap::render(frame, area, &state);
                        }
                        if let Some(area) = areas.content_top {
                            OverviewPanel::render(frame, area, &state);
                        }
                    }
                }

                StatusBar::render(frame, areas.status_bar, &state, self.layout.view_mode());

                if state.modal.is_some() {
                    let popup_area = self.layout.popup_area(frame.area(), 80, 80);
                    SessionModal::render(frame, popup_area, &state);
                }
                if state.show_help {
                    let popup_area = self.layout.popup_area(frame.area(), 60, 60);
                    HelpPopup::render(frame, popup_area);
                }
            })?;

            {
                let mut state = self.state.write();
                state.tick_spinner();
            }

            if event::poll(Duration::from_millis(50))? {
                match event::read()? {
                    Event::Key(key) => self.handle_key(key.code, key.modifiers)?,
                    Event::Mouse(mouse) => {
                        let size = terminal.size()?;
                        self.handle_mouse(
                            mouse.kind,
                            mouse.column,
                            mouse.row,
                            Rect::new(0, 0, size.width, size.height),
                        );
                    }
                    _ => {}
                }
            }

            while let Ok(msg) = refresh_rx.try_recv() {
                self.handle_refresh_message(msg);
            }
        }

        Ok(())
    }

    fn handle_refresh_message(&mut self, msg: RefreshMessage) {
        match msg {
            RefreshMessage::Loaded(snapshot) => {
                let mut state = self.state.write();
                state.apply_snapshot(snapshot);
                state.clear_error();
            }
            RefreshMessage::Updated(snapshot, affected) => {
                debug!(sessions = affected.len(), "live update");
                {
                    let mut state = self.state.write();
                    state.apply_snapshot(snapshot);
                    state.clear_error();
                }
                self.refresh_modal_transcript(&affected);
            }
            RefreshMessage::Error(error) => {
                self.state.write().set_error(error);
            }
        }
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
            self.state.write().quit();
            return Ok(());
        }

        let (show_help, modal_open) = {
            let state = self.state.read();
            (state.show_help, state.modal.is_some())
        };

        if show_help {
            self.state.write().show_help = false;
            return Ok(());
        }
        if modal_open {
            self.handle_modal_key(code);
            return Ok(());
        }
        self.handle_normal_key(code)
    }

    fn handle_modal_key(&mut self, code: KeyCode) {
        let mut state = self.state.write();
        let Some(modal) = state.modal.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter => {
                state.modal = None;
            }
            KeyCode::Char('j') | KeyCode::Down => {
                modal.scroll = (modal.scroll + 1).min(modal.max_scroll);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                modal.scroll = modal.scroll.saturating_sub(1);
            }
            KeyCode::PageDown => {
                modal.scroll = (modal.scroll + 10).min(modal.max_scroll);
            }
            KeyCode::PageUp => {
                modal.scroll = modal.scroll.saturating_sub(10);
            }
            KeyCode::Char('g') => modal.scroll = 0,
            KeyCode::Char('G') => modal.scroll = modal.max_scroll,
            _ => {}
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode) -> Result<()> {
        let view = self.layout.view_mode();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.state.write().quit(),
            KeyCode::Char('?') => self.state.write().show_help = true,

            KeyCode::Tab => self.layout.cycle_view_mode(),
            KeyCode::Char('1') => self.layout.view_mode = ViewMode::Days,
            KeyCode::Char('2') => self.layout.view_mode = ViewMode::Models,
            KeyCode::Char('3') => self.layout.view_mode = ViewMode::Overview,

            KeyCode::Char('w') => self.state.write().cycle_window(),
            KeyCode::Char('s') => self.state.write().cycle_sort(),
            KeyCode::Char('r') => {
                if let Some(tx) = &self.force_tx {
                    if tx.try_send(()).is_ok() {
                        self.state.write().loading = true;
                    }
                }
            }

            KeyCode::Char('j') | KeyCode::Down => self.navigate(view, 1),
            KeyCode::Char('k') | KeyCode::Up => self.navigate(view, -1),
            KeyCode::Char('h') | KeyCode::Left => self.focus_or_week(view, -7),
            KeyCode::Char('l') | KeyCode::Right => self.focus_or_week(view, 7),

            KeyCode::Enter => {
                if view == ViewMode::Days {
                    self.open_session_modal();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn navigate(&mut self, view: ViewMode, delta: i64) {
        let mut state = self.state.write();
        match view {
            ViewMode::Overview => state.move_heatmap_selection(delta),
            ViewMode::Models => {
                if delta > 0 {
                    state.model_next();
                } else {
                    state.model_previous();
                }
            }
            ViewMode::Days => match state.focus {
                PanelFocus::Sidebar => {
                    if delta > 0 {
                        state.day_next();
                    } else {
                        state.day_previous();
                    }
                }
                PanelFocus::Content => {
                    if delta > 0 {
                        state.session_next();
                    } else {
                        state.session_previous();
                    }
                }
            },
        }
    }

    /// h/l move the heatmap selection a week at a time on the overview,
    /// and switch panel focus everywhere else.
    fn focus_or_week(&mut self, view: ViewMode, delta_days: i64) {
        let mut state = self.state.write();
        if view == ViewMode::Overview {
            state.move_heatmap_selection(delta_days);
        } else {
            state.focus = state.focus.toggle();
        }
    }

    /// Load the transcript for the selected session and open the modal.
    fn open_session_modal(&mut self) {
        let mut state = self.state.write();
        let Some(session) = state.selected_session().cloned() else {
            return;
        };
        let day = state.selected_day().map(str::to_string);

        let (messages, last_ts) = self.load_transcript(&state, &session.id, day.as_deref(), None);
        let max_scroll = SessionModal::line_count(&messages).saturating_sub(5) as u16;
        state.modal = Some(ModalState {
            session_id: session.id.to_string(),
            day,
            messages,
            last_ts,
            scroll: 0,
            max_scroll,
        });
    }

    /// Append messages created after the open transcript's newest timestamp
    /// when a live update touches the modal's session.
    fn refresh_modal_transcript(&mut self, affected: &HashSet<String>) {
        let mut state = self.state.write();
        let Some(modal) = state.modal.as_ref() else {
            return;
        };
        if !affected.contains(&modal.session_id) {
            return;
        }
        let session_id = modal.session_id.clone();
        let day = modal.day.clone();
        let since = modal.last_ts;

        let (new_messages, max_ts) =
            self.load_transcript(&state, &session_id, day.as_deref(), Some(since));
        if new_messages.is_empty() {
            return;
        }
        if let Some(modal) = state.modal.as_mut() {
            modal.messages.extend(new_messages);
            if max_ts > modal.last_ts {
                modal.last_ts = max_ts;
            }
            modal.max_scroll = SessionModal::line_count(&modal.messages).saturating_sub(5) as u16;
        }
    }

    /// Transcript for one session, combined with its subagent children when
    /// it has any.
    fn load_transcript(
        &self,
        state: &AppState,
        session_id: &str,
        day: Option<&str>,
        since_ts: Option<i64>,
    ) -> (Vec<ChatMessage>, i64) {
        match state.children_map.get(session_id) {
            Some(children) if !children.is_empty() => {
                let pairs: Vec<(Box<str>, Box<str>)> = children
                    .iter()
                    .map(|child| {
                        let label: Box<str> = state
                            .session_titles
                            .get(child)
                            .filter(|t| !t.is_empty())
                            .map(|t| t.as_str().into())
                            .unwrap_or_else(|| "subagent".into());
                        (child.clone(), label)
                    })
                    .collect();
                load_combined_session_chat(
                    &self.storage,
                    session_id,
                    &pairs,
                    &state.session_message_files,
                    day,
                    since_ts,
                )
            }
            _ => load_session_chat(
                &self.storage,
                session_id,
                state.session_message_files.get(session_id),
                day,
                since_ts,
            ),
        }
    }

    fn handle_mouse(&mut self, kind: MouseEventKind, x: u16, y: u16, area: Rect) {
        match kind {
            MouseEventKind::ScrollDown => {
                let modal_open = self.state.read().modal.is_some();
                if modal_open {
                    self.handle_modal_key(KeyCode::Down);
                } else {
                    self.navigate(self.layout.view_mode(), 1);
                }
            }
            MouseEventKind::ScrollUp => {
                let modal_open = self.state.read().modal.is_some();
                if modal_open {
                    self.handle_modal_key(KeyCode::Up);
                } else {
                    self.navigate(self.layout.view_mode(), -1);
                }
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if self.layout.view_mode() != ViewMode::Overview {
                    return;
                }
                let areas = self.layout.calculate(area);
                let Some(heatmap_area) = areas.heatmap else {
                    return;
                };
                let mut state = self.state.write();
                if let Some(geo) = Heatmap::geometry(heatmap_area, &state.per_day) {
                    if let Some(day) = geo.day_at(x, y) {
                        state.heatmap_selected_day = Some(day.format("%Y-%m-%d").to_string());
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StatsSnapshot;
    use ocstats_core::StatsCache;

    fn write_message(storage: &std::path::Path, session: &str, msg: &str, created: i64) {
        let dir = storage.join("message").join(session);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(format!("{msg}.json")),
            format!(
                r#"{{"id": "{msg}", "sessionID": "{session}", "role": "user", "time": {{"created": {created}}}}}"#
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_open_modal_appends_messages_from_live_update() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = tmp.path().join("storage");
        let base = 1_760_000_000_000i64;
        write_message(&storage, "ses_a", "msg_1", base);

        let settings = Settings {
            storage_dir: Some(storage.clone()),
            ..Settings::default()
        };
        let mut app = App::new(settings);
        let cache =
            StatsCache::with_cache_path(app.storage.clone(), tmp.path().join("cache.json"))
                .unwrap();
        {
            let mut state = app.state.write();
            state.apply_snapshot(StatsSnapshot::from(cache.load_or_compute()));
        }

        app.open_session_modal();
        {
            let state = app.state.read();
            let modal = state.modal.as_ref().expect("modal open");
            assert_eq!(modal.messages.len(), 1);
            assert_eq!(modal.last_ts, base);
        }

        // A message lands while the modal is open; the update only carries
        // the transcript tail past the stored cutoff.
        write_message(&storage, "ses_a", "msg_2", base + 60_000);
        let update = cache.update_files(vec![storage
            .join("message/ses_a/msg_2.json")
            .to_string_lossy()
            .into_owned()]);
        let affected = update.affected_sessions.clone();
        assert!(affected.contains("ses_a"));
        app.handle_refresh_message(RefreshMessage::Updated(StatsSnapshot::from(update), affected));

        let state = app.state.read();
        let modal = state.modal.as_ref().expect("modal open");
        assert_eq!(modal.messages.len(), 2);
        assert_eq!(modal.last_ts, base + 60_000);
    }

    #[test]
    fn test_update_for_other_session_leaves_modal_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = tmp.path().join("storage");
        let base = 1_760_000_000_000i64;
        write_message(&storage, "ses_a", "msg_1", base);

        let settings = Settings {
            storage_dir: Some(storage.clone()),
            ..Settings::default()
        };
        let mut app = App::new(settings);
        let cache =
            StatsCache::with_cache_path(app.storage.clone(), tmp.path().join("cache.json"))
                .unwrap();
        {
            let mut state = app.state.write();
            state.apply_snapshot(StatsSnapshot::from(cache.load_or_compute()));
        }
        app.open_session_modal();

        write_message(&storage, "ses_b", "msg_9", base + 60_000);
        let update = cache.update_files(vec![storage
            .join("message/ses_b/msg_9.json")
            .to_string_lossy()
            .into_owned()]);
        let affected = update.affected_sessions.clone();
        app.handle_refresh_message(RefreshMessage::Updated(StatsSnapshot::from(update), affected));

        let state = app.state.read();
        let modal = state.modal.as_ref().expect("modal open");
        assert_eq!(modal.messages.len(), 1);
        assert_eq!(modal.last_ts, base);
    }
}

/// Restore the terminal before the default panic output so the message is
/// readable.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(
            io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::event::DisableMouseCapture
        );
        default_hook(info);
    }));
}
