use crate::domain::CallTreeSnapshot;
use crate::infra::{ConfigError, FeedError, LoggingError, Observer};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Feed(#[from] FeedError),
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Tab {
    #[default]
    Functions,
    Logs,
}

impl Tab {
    pub const ALL: [Tab; 2] = [Tab::Functions, Tab::Logs];

    pub fn label(self) -> &'static str {
        match self {
            Self::Functions => "Functions",
            Self::Logs => "Logs",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Functions => Self::Logs,
            Self::Logs => Self::Functions,
        }
    }
}

/// Rows taken by the tab bar and the help line.
pub const CHROME_ROWS: u16 = 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn body_height(self) -> usize {
        self.height.saturating_sub(CHROME_ROWS) as usize
    }
}

/// Content of the active tab, computed off the store and detached from it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TabContent {
    Functions(Arc<CallTreeSnapshot>),
    Logs(Arc<String>),
}

impl TabContent {
    pub fn tab(&self) -> Tab {
        match self {
            Self::Functions(_) => Tab::Functions,
            Self::Logs(_) => Tab::Logs,
        }
    }

    pub fn line_count(&self) -> usize {
        match self {
            Self::Functions(snapshot) => crate::ui::functions_line_count(snapshot),
            Self::Logs(text) => text.lines().count(),
        }
    }
}

pub fn load_content(observer: &Observer, tab: Tab, now: SystemTime) -> TabContent {
    match tab {
        Tab::Functions => TabContent::Functions(Arc::new(observer.snapshot(now))),
        Tab::Logs => TabContent::Logs(Arc::new(observer.logs_text())),
    }
}

#[derive(Clone, Debug)]
pub struct AppModel {
    /// Refresh ticks seen so far; drives the logo blink.
    pub ticks: u64,
    pub spinner_ticks: u64,
    pub active_tab: Tab,
    /// Keep the newest content in view until the user scrolls away.
    pub tail: bool,
    /// Unset until the terminal reports its size.
    pub viewport: Option<Viewport>,
    pub content: Option<TabContent>,
    pub content_lines: usize,
    pub scroll_offset: usize,
}

impl Default for AppModel {
    fn default() -> Self {
        Self::new()
    }
}

impl AppModel {
    pub fn new() -> Self {
        Self {
            ticks: 0,
            spinner_ticks: 0,
            active_tab: Tab::Functions,
            tail: true,
            viewport: None,
            content: None,
            content_lines: 0,
            scroll_offset: 0,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.viewport.is_some()
    }

    pub fn body_height(&self) -> usize {
        self.viewport.map(Viewport::body_height).unwrap_or(0)
    }

    pub fn max_scroll_offset(&self) -> usize {
        self.content_lines.saturating_sub(self.body_height())
    }

    fn settle_scroll(&mut self) {
        let max_offset = self.max_scroll_offset();
        self.scroll_offset = if self.tail {
            max_offset
        } else {
            self.scroll_offset.min(max_offset)
        };
    }

    fn scroll_up(&mut self, lines: usize) {
        self.tail = false;
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    fn scroll_down(&mut self, lines: usize) {
        self.tail = false;
        self.scroll_offset = self
            .scroll_offset
            .saturating_add(lines)
            .min(self.max_scroll_offset());
    }
}

#[derive(Clone, Debug)]
pub enum AppEvent {
    Tick,
    SpinnerTick,
    Key(KeyEvent),
    Resize(u16, u16),
    ContentReady(TabContent),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AppCommand {
    None,
    Quit,
    /// Recompute the active tab's content from the store.
    Refresh,
}

pub fn update(model: AppModel, event: AppEvent) -> (AppModel, AppCommand) {
    match event {
        AppEvent::Tick => {
            let mut model = model;
            model.ticks = model.ticks.wrapping_add(1);
            (model, AppCommand::Refresh)
        }
        AppEvent::SpinnerTick => {
            let mut model = model;
            model.spinner_ticks = model.spinner_ticks.wrapping_add(1);
            (model, AppCommand::None)
        }
        AppEvent::Key(key) => update_on_key(model, key),
        AppEvent::Resize(width, height) => {
            let mut model = model;
            model.viewport = Some(Viewport { width, height });
            model.settle_scroll();
            (model, AppCommand::Refresh)
        }
        AppEvent::ContentReady(content) => update_on_content(model, content),
    }
}

fn update_on_content(model: AppModel, content: TabContent) -> (AppModel, AppCommand) {
    let mut model = model;
    // A refresh that raced a tab switch is stale.
    if content.tab() != model.active_tab {
        return (model, AppCommand::None);
    }
    model.content_lines = content.line_count();
    model.content = Some(content);
    model.settle_scroll();
    (model, AppCommand::None)
}

fn update_on_key(model: AppModel, key: KeyEvent) -> (AppModel, AppCommand) {
    let mut model = model;
    if key.kind == KeyEventKind::Release {
        return (model, AppCommand::None);
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => return (model, AppCommand::Quit),
            KeyCode::Char('u') => {
                let step = half_page_step(model.body_height());
                model.scroll_up(step);
                return (model, AppCommand::None);
            }
            KeyCode::Char('d') => {
                let step = half_page_step(model.body_height());
                model.scroll_down(step);
                return (model, AppCommand::None);
            }
            _ => return (model, AppCommand::None),
        }
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return (model, AppCommand::Quit),
        KeyCode::Tab => {
            model.active_tab = model.active_tab.next();
            model.content = None;
            model.content_lines = 0;
            model.settle_scroll();
            return (model, AppCommand::Refresh);
        }
        KeyCode::Char('t') => {
            model.tail = true;
            model.settle_scroll();
        }
        KeyCode::Up => model.scroll_up(1),
        KeyCode::Down => model.scroll_down(1),
        KeyCode::PageUp => {
            let step = page_step(model.body_height());
            model.scroll_up(step);
        }
        KeyCode::PageDown => {
            let step = page_step(model.body_height());
            model.scroll_down(step);
        }
        KeyCode::Left | KeyCode::Right => model.tail = false,
        _ => {}
    }

    (model, AppCommand::None)
}

fn page_step(body_height: usize) -> usize {
    body_height.max(1)
}

fn half_page_step(body_height: usize) -> usize {
    (body_height / 2).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RequestEvent;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(ch: char) -> AppEvent {
        AppEvent::Key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL))
    }

    fn logs(lines: usize) -> TabContent {
        let text = (0..lines).map(|i| format!("line {i}\n")).collect::<String>();
        TabContent::Logs(Arc::new(text))
    }

    /// A 10-row terminal (8 body rows) on the Logs tab showing `lines` lines.
    fn logs_model(lines: usize) -> AppModel {
        let (model, _) = update(AppModel::new(), key(KeyCode::Tab));
        let (model, _) = update(model, AppEvent::Resize(80, 10));
        let (model, _) = update(model, AppEvent::ContentReady(logs(lines)));
        model
    }

    #[test]
    fn starts_unsized_on_functions_with_tail() {
        let model = AppModel::new();
        assert!(!model.is_ready());
        assert_eq!(model.active_tab, Tab::Functions);
        assert!(model.tail);
    }

    #[test]
    fn quits_on_q_esc_and_ctrl_c() {
        for event in [key(KeyCode::Char('q')), key(KeyCode::Esc), ctrl('c')] {
            let (_, command) = update(AppModel::new(), event);
            assert_eq!(command, AppCommand::Quit);
        }
    }

    #[test]
    fn ignores_key_release() {
        let mut release = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        let (_, command) = update(AppModel::new(), AppEvent::Key(release));
        assert_eq!(command, AppCommand::None);
    }

    #[test]
    fn tab_cycles_and_requests_refresh() {
        let (model, command) = update(AppModel::new(), key(KeyCode::Tab));
        assert_eq!(model.active_tab, Tab::Logs);
        assert_eq!(command, AppCommand::Refresh);
        assert!(model.content.is_none());

        let (model, _) = update(model, key(KeyCode::Tab));
        assert_eq!(model.active_tab, Tab::Functions);
    }

    #[test]
    fn ticks_refresh_and_spinner_ticks_do_not() {
        let (model, command) = update(AppModel::new(), AppEvent::Tick);
        assert_eq!(model.ticks, 1);
        assert_eq!(command, AppCommand::Refresh);

        let (model, command) = update(model, AppEvent::SpinnerTick);
        assert_eq!(model.spinner_ticks, 1);
        assert_eq!(command, AppCommand::None);
    }

    #[test]
    fn first_resize_creates_viewport_and_refreshes() {
        let (model, command) = update(AppModel::new(), AppEvent::Resize(120, 40));
        assert_eq!(command, AppCommand::Refresh);
        assert_eq!(
            model.viewport,
            Some(Viewport {
                width: 120,
                height: 40
            })
        );
        assert_eq!(model.body_height(), 38);

        let (model, _) = update(model, AppEvent::Resize(100, 20));
        assert_eq!(model.body_height(), 18);
    }

    #[test]
    fn tail_pins_offset_to_bottom() {
        let model = logs_model(30);
        assert!(model.tail);
        assert_eq!(model.content_lines, 30);
        assert_eq!(model.scroll_offset, 22);

        let (model, _) = update(model, AppEvent::ContentReady(logs(40)));
        assert_eq!(model.scroll_offset, 32);
    }

    #[test]
    fn scrolling_disengages_tail_and_t_restores_it() {
        let model = logs_model(30);
        let (model, _) = update(model, key(KeyCode::Up));
        assert!(!model.tail);
        assert_eq!(model.scroll_offset, 21);

        let (model, _) = update(model, AppEvent::ContentReady(logs(40)));
        assert_eq!(model.scroll_offset, 21);

        let (model, _) = update(model, key(KeyCode::Char('t')));
        assert!(model.tail);
        assert_eq!(model.scroll_offset, 32);
    }

    #[test]
    fn page_and_half_page_steps_follow_body_height() {
        let model = logs_model(30);
        let (model, _) = update(model, key(KeyCode::PageUp));
        assert_eq!(model.scroll_offset, 14);
        let (model, _) = update(model, ctrl('u'));
        assert_eq!(model.scroll_offset, 10);
        let (model, _) = update(model, ctrl('d'));
        assert_eq!(model.scroll_offset, 14);
        let (model, _) = update(model, key(KeyCode::PageDown));
        assert_eq!(model.scroll_offset, 22);
    }

    #[test]
    fn offset_is_clamped_to_content() {
        let model = logs_model(30);
        let (model, _) = update(model, key(KeyCode::Down));
        assert_eq!(model.scroll_offset, 22);
        assert!(!model.tail);

        let (mut model, _) = update(model, key(KeyCode::PageUp));
        for _ in 0..5 {
            model = update(model, key(KeyCode::PageUp)).0;
        }
        assert_eq!(model.scroll_offset, 0);

        let (model, _) = update(model, AppEvent::ContentReady(logs(3)));
        assert_eq!(model.scroll_offset, 0);
    }

    #[test]
    fn horizontal_keys_only_disengage_tail() {
        let model = logs_model(30);
        let (model, _) = update(model, key(KeyCode::Left));
        assert!(!model.tail);
        assert_eq!(model.scroll_offset, 22);
    }

    #[test]
    fn content_for_an_inactive_tab_is_dropped() {
        let model = logs_model(5);
        let (model, _) = update(
            model,
            AppEvent::ContentReady(TabContent::Functions(Arc::new(CallTreeSnapshot::default()))),
        );
        assert_eq!(model.content.as_ref().map(TabContent::tab), Some(Tab::Logs));
        assert_eq!(model.content_lines, 5);
    }

    #[test]
    fn loads_content_for_each_tab() {
        let observer = Observer::new();
        observer
            .observe_request(&RequestEvent::root("a", "f"))
            .expect("request");
        let _ = observer.write_log(b"hello\n");

        let TabContent::Functions(snapshot) = load_content(&observer, Tab::Functions, SystemTime::now())
        else {
            panic!("expected functions content");
        };
        assert_eq!(snapshot.row_count(), 1);

        let content = load_content(&observer, Tab::Logs, SystemTime::now());
        assert_eq!(content, TabContent::Logs(Arc::new("hello\n".to_string())));
    }
}
