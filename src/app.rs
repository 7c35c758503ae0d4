pub mod actions;
pub mod focus;
pub mod forest;
pub mod refresh;
pub mod search;
pub mod store;
pub mod summary;

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use self::{
    actions::{Action, Launch, parse_nice_increment, parse_signal, renice, send_signal, signal_name},
    focus::FocusTracker,
    forest::{ForestIndex, Viewport},
    refresh::Refresher,
    search::{SearchDirection, SearchState},
    store::{ProcessRecord, ProcessStore},
    summary::SystemSnapshot,
};
use crate::{
    collection::{
        Collector,
        processes::{Pid, Uid},
    },
    constants::{INDENT, MAX_POLL_DURATION},
    options::AppConfig,
    utils::error::{Result, UtopError},
};

const MAX_INPUT_LENGTH: usize = 200;

/// How the processes are laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayMode {
    #[default]
    Tree,
    /// Flat, grouped by process type.
    Type,
}

/// What keys currently do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    Search(SearchState),
    /// Typing the argument of an action on `pid`.
    Prompt {
        action: Action,
        pid: Pid,
        input: String,
    },
    /// Waiting for a yes before running `action` on `pid`.
    Confirm { action: Action, pid: Pid },
    /// An error that has to be acknowledged with a key press.
    Message(String),
}

/// Everything about the UI that isn't process data.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub viewport: Viewport,
    pub mode: InputMode,
    /// The last confirmed search, for next/previous match from normal mode.
    pub last_search: Option<SearchState>,
    pub locked: Option<Pid>,
    /// Columns the command column is scrolled right by.
    pub h_scroll: usize,
    pub frozen: bool,
    pub basename_only: bool,
    pub show_kernel: bool,
    pub display: DisplayMode,
    pub show_info: bool,
    /// A one-off note for the status line, cleared by the next key.
    pub status: Option<String>,
}

impl UiState {
    /// The search to highlight: the one being typed, else the last one.
    pub fn active_search(&self) -> Option<&SearchState> {
        match &self.mode {
            InputMode::Search(search) => Some(search),
            _ => self.last_search.as_ref(),
        }
    }
}

/// What the main loop should do after a key.
#[derive(Debug, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    /// Clear the terminal before the next draw.
    Clear,
    Quit,
    /// Release the terminal, run this to completion, then call [`App::finish_launch`].
    Launch(Launch),
}

/// Builds the index for the current display mode.
fn build_index<'a>(store: &'a ProcessStore, ui: &UiState, current_uid: Uid) -> ForestIndex<'a> {
    match ui.display {
        DisplayMode::Tree => ForestIndex::build(store, ui.show_kernel),
        DisplayMode::Type => ForestIndex::by_type(store, ui.show_kernel, current_uid),
    }
}

pub struct App {
    pub config: AppConfig,
    pub store: ProcessStore,
    pub snapshot: SystemSnapshot,
    pub ui: UiState,
    collector: Box<dyn Collector>,
    refresher: Refresher,
    focus: FocusTracker,
    refresh_requested: bool,
    current_uid: Uid,
    own_pid: Pid,
}

impl App {
    pub fn new(config: AppConfig, collector: Box<dyn Collector>) -> Self {
        // SAFETY: getuid always succeeds.
        let current_uid = unsafe { libc::getuid() };
        let own_pid = std::process::id() as Pid;

        Self::with_identity(config, collector, current_uid, own_pid)
    }

    /// Like [`App::new`], but with the user and pid to treat as our own.
    pub fn with_identity(
        config: AppConfig, collector: Box<dyn Collector>, current_uid: Uid, own_pid: Pid,
    ) -> Self {
        let ui = UiState {
            basename_only: config.basename_only,
            show_kernel: config.show_kernel_threads,
            ..Default::default()
        };
        let refresher = Refresher::new(config.refresh_rate, config.rescan_rate);

        App {
            config,
            store: ProcessStore::new(),
            snapshot: SystemSnapshot::default(),
            ui,
            collector,
            refresher,
            focus: FocusTracker::default(),
            refresh_requested: false,
            current_uid,
            own_pid,
        }
    }

    pub fn current_uid(&self) -> Uid {
        self.current_uid
    }

    pub fn own_pid(&self) -> Pid {
        self.own_pid
    }

    pub fn index(&self) -> ForestIndex<'_> {
        build_index(&self.store, &self.ui, self.current_uid)
    }

    /// The record under the cursor.
    pub fn selected(&self) -> Option<&ProcessRecord> {
        self.index().from_index(self.ui.viewport.cursor)
    }

    /// Fills the store and the summary before the first draw. The summary only counts
    /// what was already known when a cycle started, so this takes two cycles.
    pub fn prime(&mut self, now: Instant) -> Result<()> {
        self.refresh_now(now)?;
        self.refresh_now(now)
    }

    /// How long the loop may wait for input before [`App::update`] has work to do.
    pub fn poll_duration(&self, now: Instant) -> Duration {
        if self.ui.frozen {
            MAX_POLL_DURATION
        } else {
            self.refresher.time_until_due(now).min(MAX_POLL_DURATION)
        }
    }

    /// Refreshes if one is due, returning whether it did.
    pub fn update(&mut self, now: Instant) -> Result<bool> {
        if self.refresh_requested || (!self.ui.frozen && self.refresher.is_due(now)) {
            self.refresh_now(now)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Runs a refresh cycle, keeping the cursor on the same process if it survives it.
    pub fn refresh_now(&mut self, now: Instant) -> Result<()> {
        self.refresh_requested = false;

        let index = build_index(&self.store, &self.ui, self.current_uid);
        self.focus.capture(&index, self.ui.viewport.cursor);

        self.snapshot = self.refresher.refresh(
            now,
            &mut self.store,
            self.collector.as_mut(),
            self.current_uid,
        )?;

        if self.ui.locked.is_some_and(|pid| !self.store.contains(pid)) {
            self.ui.locked = None;
        }

        let index = build_index(&self.store, &self.ui, self.current_uid);
        let total = index.len();
        match self.focus.restore(&index) {
            Some(position) => self.ui.viewport.move_cursor(position, total),
            None => self.ui.viewport.clamp(total),
        }

        // Keep a search preview in step with the new tree.
        if let InputMode::Search(search) = &mut self.ui.mode {
            if let Ok(Some(position)) = search.run(&index) {
                self.ui.viewport.center_on(position);
            }
        }

        Ok(())
    }

    /// Reports how an external tool went, and refreshes on the next update.
    pub fn finish_launch(&mut self, result: Result<()>) {
        if let Err(err) = result {
            self.ui.mode = InputMode::Message(err.to_string());
        }
        self.refresh_requested = true;
    }

    pub fn handle_key_event(&mut self, event: KeyEvent) -> EventResult {
        if event.kind == KeyEventKind::Release {
            return EventResult::Continue;
        }

        self.ui.status = None;

        match std::mem::take(&mut self.ui.mode) {
            InputMode::Normal => self.handle_normal_key(event),
            InputMode::Search(search) => self.handle_search_key(event, search),
            InputMode::Prompt { action, pid, input } => {
                self.handle_prompt_key(event, action, pid, input)
            }
            InputMode::Confirm { action, pid } => {
                if matches!(event.code, KeyCode::Char('y' | 'Y') | KeyCode::Enter) {
                    self.launch(action, pid)
                } else {
                    self.ui.status = Some(format!("{} cancelled", action.name()));
                    EventResult::Continue
                }
            }
            // Any key acknowledges.
            InputMode::Message(_) => EventResult::Continue,
        }
    }

    fn handle_normal_key(&mut self, event: KeyEvent) -> EventResult {
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);

        let index = build_index(&self.store, &self.ui, self.current_uid);
        let total = index.len();
        let selected = index
            .from_index(self.ui.viewport.cursor)
            .map(ProcessRecord::pid);
        let viewport = &mut self.ui.viewport;

        if ctrl {
            match event.code {
                KeyCode::Char('c') => return EventResult::Quit,
                KeyCode::Char('d') => viewport.half_page(true, total),
                KeyCode::Char('u') => viewport.half_page(false, total),
                KeyCode::Char('f') => viewport.page(true, total),
                KeyCode::Char('b') => viewport.page(false, total),
                KeyCode::Char('e') => viewport.scroll_lines(1, total),
                KeyCode::Char('y') => viewport.scroll_lines(-1, total),
                KeyCode::Char('n') | KeyCode::Char('p') => {
                    let forward = event.code == KeyCode::Char('n');
                    match self.ui.last_search.as_mut().map(|s| s.step(forward, &index)) {
                        Some(Ok(Some(position))) => viewport.move_cursor(position, total),
                        Some(Ok(None)) => self.ui.status = Some("no match".to_string()),
                        Some(Err(err)) => self.ui.mode = InputMode::Message(err.to_string()),
                        None => self.ui.status = Some("no previous search".to_string()),
                    }
                }
                KeyCode::Char('k') => {
                    self.ui.locked = match (self.ui.locked, selected) {
                        (Some(locked), Some(pid)) if locked == pid => None,
                        (_, pid) => pid,
                    };
                }
                KeyCode::Char('l') => {
                    self.refresher.force_rescan();
                    self.refresh_requested = true;
                    return EventResult::Clear;
                }
                _ => {}
            }

            return EventResult::Continue;
        }

        match event.code {
            KeyCode::Char('q') => return EventResult::Quit,
            KeyCode::Char('j') | KeyCode::Down => viewport.move_by(1, total),
            KeyCode::Char('k') | KeyCode::Up => viewport.move_by(-1, total),
            KeyCode::Char('g') | KeyCode::Home => viewport.move_cursor(0, total),
            KeyCode::Char('G') | KeyCode::End => {
                viewport.move_cursor(total.saturating_sub(1), total)
            }
            KeyCode::PageDown => viewport.page(true, total),
            KeyCode::PageUp => viewport.page(false, total),
            KeyCode::Char('H') => viewport.first_visible(total),
            KeyCode::Char('M') => viewport.middle_visible(total),
            KeyCode::Char('L') => viewport.last_visible(total),
            KeyCode::Char('h') | KeyCode::Left => {
                self.ui.h_scroll = self.ui.h_scroll.saturating_sub(INDENT.len())
            }
            KeyCode::Char('l') | KeyCode::Right => self.ui.h_scroll += INDENT.len(),
            KeyCode::Char('0') | KeyCode::Char('^') => self.ui.h_scroll = 0,
            KeyCode::Char(c @ ('/' | '?')) => {
                let direction = if c == '/' {
                    SearchDirection::Forward
                } else {
                    SearchDirection::Backward
                };
                self.ui.mode = InputMode::Search(SearchState::new(direction, viewport.top));
            }
            KeyCode::Char('o') => match self.ui.locked {
                Some(pid) => match index.to_index(pid) {
                    Some(position) => viewport.move_cursor(position, total),
                    None => self.ui.status = Some(format!("locked pid {pid} is not shown")),
                },
                None => self.ui.status = Some("no pid is locked".to_string()),
            },
            KeyCode::Char('O') => match index.to_index(self.own_pid) {
                Some(position) => viewport.move_cursor(position, total),
                None => self.ui.status = Some(format!("own pid {} is not shown", self.own_pid)),
            },
            KeyCode::Char('i') => self.ui.show_info = !self.ui.show_info,
            KeyCode::Char('f') => self.ui.frozen = !self.ui.frozen,
            KeyCode::Char('b') => self.ui.basename_only = !self.ui.basename_only,
            KeyCode::Char('t') => {
                self.ui.display = match self.ui.display {
                    DisplayMode::Tree => DisplayMode::Type,
                    DisplayMode::Type => DisplayMode::Tree,
                };
                self.retarget(selected);
            }
            KeyCode::Char(c) => {
                if let Some(action) = Action::from_key(c) {
                    return match selected {
                        Some(pid) => self.start_action(action, pid),
                        None => {
                            self.ui.status = Some("no process selected".to_string());
                            EventResult::Continue
                        }
                    };
                }
            }
            _ => {}
        }

        EventResult::Continue
    }

    /// Puts the cursor back on `pid` after the layout changes.
    fn retarget(&mut self, pid: Option<Pid>) {
        let index = build_index(&self.store, &self.ui, self.current_uid);
        let total = index.len();
        match pid.and_then(|pid| index.to_index(pid)) {
            Some(position) => self.ui.viewport.move_cursor(position, total),
            None => self.ui.viewport.clamp(total),
        }
    }

    fn handle_search_key(&mut self, event: KeyEvent, mut search: SearchState) -> EventResult {
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        let index = build_index(&self.store, &self.ui, self.current_uid);
        let total = index.len();

        let result = match event.code {
            KeyCode::Esc => {
                self.ui.viewport.top = search.saved_top;
                self.ui.viewport.clamp(total);
                return EventResult::Continue;
            }
            KeyCode::Char('c') if ctrl => {
                self.ui.viewport.top = search.saved_top;
                self.ui.viewport.clamp(total);
                return EventResult::Continue;
            }
            KeyCode::Enter => {
                match search.run(&index) {
                    Ok(Some(position)) => {
                        self.ui.viewport.move_cursor(position, total);
                        self.ui.last_search = Some(search);
                    }
                    Ok(None) => {
                        self.ui.viewport.top = search.saved_top;
                        self.ui.viewport.clamp(total);
                        if !search.query.is_empty() {
                            self.ui.status = Some(format!("no match for '{}'", search.query));
                        }
                    }
                    Err(err) => {
                        self.ui.viewport.top = search.saved_top;
                        self.ui.viewport.clamp(total);
                        self.ui.mode = InputMode::Message(err.to_string());
                    }
                }
                return EventResult::Continue;
            }
            KeyCode::Char('n') if ctrl => search.step(true, &index),
            KeyCode::Char('p') if ctrl => search.step(false, &index),
            KeyCode::Char('u') if ctrl => {
                search.clear();
                search.run(&index)
            }
            KeyCode::Backspace => {
                search.pop();
                search.run(&index)
            }
            KeyCode::Char(c) if !ctrl && search.query.len() < MAX_INPUT_LENGTH => {
                search.push(c);
                search.run(&index)
            }
            _ => Ok(search.found.and_then(|pid| index.to_index(pid))),
        };

        match result {
            Ok(Some(position)) => self.ui.viewport.center_on(position),
            Ok(None) => self.ui.viewport.top = search.saved_top,
            Err(err) => self.ui.status = Some(err.to_string()),
        }

        self.ui.mode = InputMode::Search(search);
        EventResult::Continue
    }

    fn handle_prompt_key(
        &mut self, event: KeyEvent, action: Action, pid: Pid, mut input: String,
    ) -> EventResult {
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);

        match event.code {
            KeyCode::Esc => return EventResult::Continue,
            KeyCode::Char('c') if ctrl => return EventResult::Continue,
            KeyCode::Enter => return self.submit(action, pid, &input),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char('u') if ctrl => input.clear(),
            KeyCode::Char(c) if !ctrl && input.len() < MAX_INPUT_LENGTH => input.push(c),
            _ => {}
        }

        self.ui.mode = InputMode::Prompt { action, pid, input };
        EventResult::Continue
    }

    fn start_action(&mut self, action: Action, pid: Pid) -> EventResult {
        if action.prompt().is_some() {
            self.ui.mode = InputMode::Prompt {
                action,
                pid,
                input: String::new(),
            };
            EventResult::Continue
        } else if action.launches_tool() && !self.config.force {
            self.ui.mode = InputMode::Confirm { action, pid };
            EventResult::Continue
        } else {
            self.launch(action, pid)
        }
    }

    /// Runs a prompted action. Failures are shown and must be acknowledged.
    fn submit(&mut self, action: Action, pid: Pid, input: &str) -> EventResult {
        let outcome = match action {
            Action::Signal => parse_signal(input).and_then(|signal| {
                send_signal(pid, signal)?;
                Ok(match signal_name(signal) {
                    Some(name) => format!("sent SIG{name} to {pid}"),
                    None => format!("sent signal {signal} to {pid}"),
                })
            }),
            Action::Renice => parse_nice_increment(input).and_then(|increment| {
                let current = self
                    .store
                    .get(pid)
                    .map(|record| record.nice)
                    .ok_or_else(|| UtopError::action(format!("process {pid} is gone")))?;
                let nice = renice(pid, current, increment)?;
                Ok(format!("reniced {pid} to {nice}"))
            }),
            _ => return self.launch(action, pid),
        };

        match outcome {
            Ok(status) => self.ui.status = Some(status),
            Err(err) => self.ui.mode = InputMode::Message(err.to_string()),
        }

        EventResult::Continue
    }

    fn launch(&mut self, action: Action, pid: Pid) -> EventResult {
        match Launch::for_action(action, &self.config.tools, pid) {
            Some(launch) => EventResult::Launch(launch),
            None => EventResult::Continue,
        }
    }
}
