use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use ocstats_core::overview::OverviewStatsCache;
use ocstats_core::{
    ChatMessage, DayStat, ModelUsage, SessionStat, Stats, StatsUpdate, Tokens, ToolUsage, Totals,
};

/// Shared state type alias
pub type SharedState = Arc<RwLock<AppState>>;

/// Stats window for the day list and the aggregate header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatsWindow {
    Days7,
    Days14,
    #[default]
    Days30,
    All,
}

impl StatsWindow {
    /// Get the next window in cycle
    pub fn next(self) -> Self {
        match self {
            StatsWindow::Days7 => StatsWindow::Days14,
            StatsWindow::Days14 => StatsWindow::Days30,
            StatsWindow::Days30 => StatsWindow::All,
            StatsWindow::All => StatsWindow::Days7,
        }
    }

    /// Get display name for the status bar
    pub fn display_name(&self) -> &'static str {
        match self {
            StatsWindow::Days7 => "7d",
            StatsWindow::Days14 => "14d",
            StatsWindow::Days30 => "30d",
            StatsWindow::All => "All",
        }
    }

    /// Window length in days, `None` for the unbounded window
    pub fn days(&self) -> Option<i64> {
        match self {
            StatsWindow::Days7 => Some(7),
            StatsWindow::Days14 => Some(14),
            StatsWindow::Days30 => Some(30),
            StatsWindow::All => None,
        }
    }

    pub fn from_days(days: u16) -> Self {
        match days {
            7 => StatsWindow::Days7,
            14 => StatsWindow::Days14,
            30 => StatsWindow::Days30,
            _ => StatsWindow::All,
        }
    }
}

/// Sort method for the session list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    /// Sort by total tokens (default)
    #[default]
    Tokens,
    /// Sort by cost
    Cost,
    /// Sort by message count
    Messages,
    /// Sort by last activity
    Recent,
}

impl SortBy {
    /// Get the next sort method in cycle
    pub fn next(self) -> Self {
        match self {
            SortBy::Tokens => SortBy::Cost,
            SortBy::Cost => SortBy::Messages,
            SortBy::Messages => SortBy::Recent,
            SortBy::Recent => SortBy::Tokens,
        }
    }

    /// Get display name for the sort method
    pub fn display_name(&self) -> &'static str {
        match self {
            SortBy::Tokens => "Tokens",
            SortBy::Cost => "Cost",
            SortBy::Messages => "Messages",
            SortBy::Recent => "Recent",
        }
    }
}

/// Which panel j/k navigation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelFocus {
    #[default]
    Sidebar,
    Content,
}

impl PanelFocus {
    pub fn toggle(self) -> Self {
        match self {
            PanelFocus::Sidebar => PanelFocus::Content,
            PanelFocus::Content => PanelFocus::Sidebar,
        }
    }
}

/// Spinner frames for the loading animation
pub const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Snapshot of the aggregate maps handed from the refresher to the UI.
pub struct StatsSnapshot {
    pub totals: Totals,
    pub per_day: HashMap<String, DayStat>,
    pub session_titles: HashMap<Box<str>, String>,
    pub model_usage: Vec<ModelUsage>,
    pub session_message_files: HashMap<String, HashSet<PathBuf>>,
    pub parent_map: HashMap<Box<str>, Box<str>>,
    pub children_map: HashMap<Box<str>, Vec<Box<str>>>,
}

impl From<Stats> for StatsSnapshot {
    fn from(s: Stats) -> Self {
        Self {
            totals: s.totals,
            per_day: s.per_day,
            session_titles: s.session_titles,
            model_usage: s.model_usage,
            session_message_files: s.session_message_files,
            parent_map: s.parent_map,
            children_map: s.children_map,
        }
    }
}

impl From<StatsUpdate> for StatsSnapshot {
    fn from(u: StatsUpdate) -> Self {
        Self {
            totals: u.totals,
            per_day: u.per_day,
            session_titles: u.session_titles,
            model_usage: u.model_usage,
            session_message_files: u.session_message_files,
            parent_map: u.parent_map,
            children_map: u.children_map,
        }
    }
}

/// Totals recomputed over the visible day window
#[derive(Debug, Default, Clone)]
pub struct WindowTotals {
    pub days: usize,
    pub sessions: usize,
    pub messages: u64,
    pub prompts: u64,
    pub tokens: Tokens,
    pub cost: f64,
    pub additions: u64,
    pub deletions: u64,
}

/// Session transcript modal
pub struct ModalState {
    pub session_id: String,
    pub day: Option<String>,
    pub messages: Vec<ChatMessage>,
    /// Newest message timestamp in the transcript, the cutoff for
    /// incremental reloads while the modal stays open.
    pub last_ts: i64,
    pub scroll: u16,
    pub max_scroll: u16,
}

/// Application state
pub struct AppState {
    pub totals: Totals,
    pub per_day: HashMap<String, DayStat>,
    pub session_titles: HashMap<Box<str>, String>,
    pub model_usage: Vec<ModelUsage>,
    pub session_message_files: HashMap<String, HashSet<PathBuf>>,
    pub parent_map: HashMap<Box<str>, Box<str>>,
    pub children_map: HashMap<Box<str>, Vec<Box<str>>>,
    pub tool_usage: Vec<ToolUsage>,

    /// Days visible in the active window, newest first
    pub day_list: Vec<String>,
    pub selected_day_index: usize,
    /// Sessions of the selected day, ordered by the active sort
    pub session_list: Vec<Arc<SessionStat>>,
    pub selected_session_index: usize,
    pub selected_model_index: usize,

    pub window: StatsWindow,
    pub sort_by: SortBy,
    pub focus: PanelFocus,
    pub show_help: bool,
    pub modal: Option<ModalState>,
    pub heatmap_selected_day: Option<String>,

    pub error_message: Option<String>,
    pub last_refresh: Option<std::time::Instant>,
    pub loading: bool,
    pub running: bool,
    pub pricing_enabled: bool,
    pub overview_cache: OverviewStatsCache,

    pub spinner_frame: usize,
    last_spinner_update: std::time::Instant,
}

impl AppState {
    pub fn new(window: StatsWindow, pricing_enabled: bool) -> Self {
        Self {
            totals: Totals::default(),
            per_day: HashMap::new(),
            session_titles: HashMap::new(),
            model_usage: Vec::new(),
            session_message_files: HashMap::new(),
            parent_map: HashMap::new(),
            children_map: HashMap::new(),
            tool_usage: Vec::new(),
            day_list: Vec::new(),
            selected_day_index: 0,
            session_list: Vec::new(),
            selected_session_index: 0,
            selected_model_index: 0,
            window,
            sort_by: SortBy::default(),
            focus: PanelFocus::default(),
            show_help: false,
            modal: None,
            heatmap_selected_day: None,
            error_message: None,
            last_refresh: None,
            loading: true,
            running: true,
            pricing_enabled,
            overview_cache: OverviewStatsCache::new(),
            spinner_frame: 0,
            last_spinner_update: std::time::Instant::now(),
        }
    }

    /// Create a shared state
    pub fn shared(window: StatsWindow, pricing_enabled: bool) -> SharedState {
        Arc::new(RwLock::new(Self::new(window, pricing_enabled)))
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Advance the spinner animation frame (time-based, ~150ms per frame)
    pub fn tick_spinner(&mut self) {
        if self.last_spinner_update.elapsed().as_millis() >= 150 {
            self.last_spinner_update = std::time::Instant::now();
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
        }
    }

    pub fn spinner_char(&self) -> char {
        SPINNER_FRAMES[self.spinner_frame]
    }

    pub fn set_error(&mut self, error: String) {
        self.error_message = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    #[inline]
    pub fn selected_day(&self) -> Option<&str> {
        self.day_list.get(self.selected_day_index).map(String::as_str)
    }

    #[inline]
    pub fn selected_session(&self) -> Option<&Arc<SessionStat>> {
        self.session_list.get(self.selected_session_index)
    }

    pub fn selected_model(&self) -> Option<&ModelUsage> {
        self.model_usage.get(self.selected_model_index)
    }

    pub fn session_title(&self, session_id: &str) -> &str {
        self.session_titles
            .get(session_id)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
            .unwrap_or("(untitled)")
    }

    pub fn day_next(&mut self) {
        if self.day_list.is_empty() {
            return;
        }
        self.selected_day_index = (self.selected_day_index + 1).min(self.day_list.len() - 1);
        self.rebuild_session_list(None);
    }

    pub fn day_previous(&mut self) {
        self.selected_day_index = self.selected_day_index.saturating_sub(1);
        self.rebuild_session_list(None);
    }

    pub fn session_next(&mut self) {
        if self.session_list.is_empty() {
            return;
        }
        self.selected_session_index =
            (self.selected_session_index + 1).min(self.session_list.len() - 1);
    }

    pub fn session_previous(&mut self) {
        self.selected_session_index = self.selected_session_index.saturating_sub(1);
    }

    pub fn model_next(&mut self) {
        if self.model_usage.is_empty() {
            return;
        }
        self.selected_model_index = (self.selected_model_index + 1).min(self.model_usage.len() - 1);
    }

    pub fn model_previous(&mut self) {
        self.selected_model_index = self.selected_model_index.saturating_sub(1);
    }

    pub fn cycle_window(&mut self) {
        self.window = self.window.next();
        let prev_day = self.selected_day().map(str::to_string);
        self.rebuild_day_list(prev_day.as_deref());
        self.rebuild_session_list(None);
    }

    pub fn cycle_sort(&mut self) {
        self.sort_by = self.sort_by.next();
        let prev_id = self.selected_session().map(|s| s.id.clone());
        self.rebuild_session_list(prev_id.as_deref());
    }

    /// Move the heatmap selection by whole days, clamped to the data range.
    pub fn move_heatmap_selection(&mut self, delta_days: i64) {
        let Some(max_day) = self.max_data_day() else {
            return;
        };
        let current = self
            .heatmap_selected_day
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .unwrap_or(max_day);
        let min_day = max_day - chrono::Duration::days(364);
        let moved = (current + chrono::Duration::days(delta_days)).clamp(min_day, max_day);
        self.heatmap_selected_day = Some(moved.format("%Y-%m-%d").to_string());
    }

    /// Most recent calendar day present in the data.
    pub fn max_data_day(&self) -> Option<NaiveDate> {
        self.per_day
            .keys()
            .filter_map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .max()
    }

    /// Replace the aggregate snapshot, preserving day and session selection
    /// by key where possible.
    pub fn apply_snapshot(&mut self, snapshot: StatsSnapshot) {
        let prev_day = self.selected_day().map(str::to_string);
        let prev_session = self.selected_session().map(|s| s.id.clone());

        self.totals = snapshot.totals;
        self.per_day = snapshot.per_day;
        self.session_titles = snapshot.session_titles;
        self.model_usage = snapshot.model_usage;
        self.session_message_files = snapshot.session_message_files;
        self.parent_map = snapshot.parent_map;
        self.children_map = snapshot.children_map;

        let mut tool_usage: Vec<ToolUsage> = self
            .totals
            .tools
            .iter()
            .map(|(name, count)| ToolUsage {
                name: name.clone(),
                count: *count,
            })
            .collect();
        tool_usage.sort_unstable_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        self.tool_usage = tool_usage;

        self.rebuild_day_list(prev_day.as_deref());
        self.rebuild_session_list(prev_session.as_deref());

        if self.selected_model_index >= self.model_usage.len() {
            self.selected_model_index = 0;
        }

        self.overview_cache.invalidate();
        self.last_refresh = Some(std::time::Instant::now());
        self.loading = false;
    }

    /// Rebuild the visible day list for the active window, newest first.
    fn rebuild_day_list(&mut self, prev_day: Option<&str>) {
        let cutoff = self.window.days().and_then(|days| {
            self.max_data_day()
                .map(|max| max - chrono::Duration::days(days - 1))
        });

        self.day_list = self
            .per_day
            .keys()
            .filter(|day| match cutoff {
                None => true,
                Some(cut) => NaiveDate::parse_from_str(day, "%Y-%m-%d")
                    .is_ok_and(|d| d >= cut),
            })
            .cloned()
            .collect();
        self.day_list.sort_unstable_by(|a, b| b.cmp(a));

        self.selected_day_index = prev_day
            .and_then(|prev| self.day_list.iter().position(|d| d == prev))
            .unwrap_or(0);
    }

    /// Rebuild the session list for the selected day, ordered by the active
    /// sort.
    fn rebuild_session_list(&mut self, prev_session: Option<&str>) {
        self.session_list = self
            .selected_day()
            .and_then(|d| self.per_day.get(d))
            .map(|stat| stat.sessions.values().cloned().collect())
            .unwrap_or_default();

        match self.sort_by {
            SortBy::Tokens => self
                .session_list
                .sort_unstable_by(|a, b| b.tokens.total().cmp(&a.tokens.total())),
            SortBy::Cost => self
                .session_list
                .sort_unstable_by(|a, b| b.cost.total_cmp(&a.cost)),
            SortBy::Messages => self
                .session_list
                .sort_unstable_by(|a, b| b.messages.cmp(&a.messages)),
            SortBy::Recent => self
                .session_list
                .sort_unstable_by(|a, b| b.last_activity.cmp(&a.last_activity)),
        }

        self.selected_session_index = prev_session
            .and_then(|prev| self.session_list.iter().position(|s| &*s.id == prev))
            .unwrap_or(0);
    }

    /// Aggregate totals over the visible day window.
    pub fn windowed_totals(&self) -> WindowTotals {
        let mut out = WindowTotals {
            days: self.day_list.len(),
            ..WindowTotals::default()
        };
        let mut sessions: HashSet<&str> = HashSet::new();

        for day in &self.day_list {
            let Some(stat) = self.per_day.get(day) else {
                continue;
            };
            out.messages += stat.messages;
            out.prompts += stat.prompts;
            out.cost += stat.cost;
            out.additions += stat.diffs.additions;
            out.deletions += stat.diffs.deletions;
            out.tokens.input += stat.tokens.input;
            out.tokens.output += stat.tokens.output;
            out.tokens.reasoning += stat.tokens.reasoning;
            out.tokens.cache_read += stat.tokens.cache_read;
            out.tokens.cache_write += stat.tokens.cache_write;
            for id in stat.sessions.keys() {
                sessions.insert(id);
            }
        }
        out.sessions = sessions.len();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocstats_core::Stats;
    use pretty_assertions::assert_eq;

    fn day_stat(tokens: u64, cost: f64, sessions: &[&str]) -> DayStat {
        let mut stat = DayStat {
            messages: sessions.len() as u64 * 2,
            cost,
            ..DayStat::default()
        };
        stat.tokens.input = tokens;
        for id in sessions {
            let mut s = SessionStat::new(*id);
            s.tokens.input = tokens;
            s.cost = cost;
            s.last_activity = 1;
            stat.sessions.insert(id.to_string(), Arc::new(s));
        }
        stat
    }

    fn snapshot_with_days(days: &[(&str, DayStat)]) -> StatsSnapshot {
        let mut stats = Stats::default();
        for (day, stat) in days {
            stats.per_day.insert(day.to_string(), stat.clone());
        }
        StatsSnapshot::from(stats)
    }

    #[test]
    fn test_window_cycle() {
        assert_eq!(StatsWindow::Days7.next(), StatsWindow::Days14);
        assert_eq!(StatsWindow::All.next(), StatsWindow::Days7);
        assert_eq!(StatsWindow::Days30.days(), Some(30));
        assert_eq!(StatsWindow::All.days(), None);
    }

    #[test]
    fn test_sort_cycle() {
        assert_eq!(SortBy::Tokens.next(), SortBy::Cost);
        assert_eq!(SortBy::Recent.next(), SortBy::Tokens);
    }

    #[test]
    fn test_apply_snapshot_builds_day_list_descending() {
        let mut state = AppState::new(StatsWindow::All, false);
        state.apply_snapshot(snapshot_with_days(&[
            ("2026-03-01", day_stat(10, 0.1, &["ses_a"])),
            ("2026-03-03", day_stat(30, 0.3, &["ses_b"])),
            ("2026-03-02", day_stat(20, 0.2, &["ses_c"])),
        ]));
        assert_eq!(state.day_list, vec!["2026-03-03", "2026-03-02", "2026-03-01"]);
        assert_eq!(state.selected_day(), Some("2026-03-03"));
        assert!(!state.loading);
    }

    #[test]
    fn test_window_filters_day_list() {
        let mut state = AppState::new(StatsWindow::Days7, false);
        state.apply_snapshot(snapshot_with_days(&[
            ("2026-03-10", day_stat(10, 0.1, &["ses_a"])),
            ("2026-02-01", day_stat(30, 0.3, &["ses_b"])),
        ]));
        assert_eq!(state.day_list, vec!["2026-03-10"]);

        // Cycling to All brings the old day back.
        state.window = StatsWindow::Days30;
        state.cycle_window();
        assert_eq!(state.window, StatsWindow::All);
        assert_eq!(state.day_list.len(), 2);
    }

    #[test]
    fn test_apply_snapshot_preserves_selection() {
        let mut state = AppState::new(StatsWindow::All, false);
        state.apply_snapshot(snapshot_with_days(&[
            ("2026-03-01", day_stat(10, 0.1, &["ses_a"])),
            ("2026-03-02", day_stat(20, 0.2, &["ses_b"])),
        ]));
        state.day_next();
        assert_eq!(state.selected_day(), Some("2026-03-01"));

        state.apply_snapshot(snapshot_with_days(&[
            ("2026-03-01", day_stat(10, 0.1, &["ses_a"])),
            ("2026-03-02", day_stat(20, 0.2, &["ses_b"])),
            ("2026-03-03", day_stat(30, 0.3, &["ses_c"])),
        ]));
        assert_eq!(state.selected_day(), Some("2026-03-01"));
    }

    #[test]
    fn test_session_sort_by_tokens_then_cost() {
        let mut state = AppState::new(StatsWindow::All, false);
        let mut stat = DayStat::default();
        for (id, tokens, cost) in [("ses_a", 10u64, 5.0), ("ses_b", 100, 1.0)] {
            let mut s = SessionStat::new(id);
            s.tokens.input = tokens;
            s.cost = cost;
            stat.sessions.insert(id.to_string(), Arc::new(s));
        }
        state.apply_snapshot(snapshot_with_days(&[("2026-03-01", stat)]));
        assert_eq!(&*state.session_list[0].id, "ses_b");

        state.cycle_sort();
        assert_eq!(state.sort_by, SortBy::Cost);
        assert_eq!(&*state.session_list[0].id, "ses_a");
    }

    #[test]
    fn test_windowed_totals() {
        let mut state = AppState::new(StatsWindow::All, false);
        state.apply_snapshot(snapshot_with_days(&[
            ("2026-03-01", day_stat(10, 0.5, &["ses_a"])),
            ("2026-03-02", day_stat(20, 1.5, &["ses_a", "ses_b"])),
        ]));
        let totals = state.windowed_totals();
        assert_eq!(totals.days, 2);
        assert_eq!(totals.tokens.input, 30);
        assert!((totals.cost - 2.0).abs() < 1e-9);
        // ses_a spans both days but counts once.
        assert_eq!(totals.sessions, 2);
    }

    #[test]
    fn test_move_heatmap_selection_clamps() {
        let mut state = AppState::new(StatsWindow::All, false);
        state.apply_snapshot(snapshot_with_days(&[(
            "2026-03-10",
            day_stat(10, 0.1, &["ses_a"]),
        )]));
        state.move_heatmap_selection(-1);
        assert_eq!(state.heatmap_selected_day.as_deref(), Some("2026-03-09"));
        state.move_heatmap_selection(30);
        assert_eq!(state.heatmap_selected_day.as_deref(), Some("2026-03-10"));
    }
}
