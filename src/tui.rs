use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::time::{Duration, Instant};

use crate::api::JobsApi;
use crate::controller::{self, TransitionOutcome};
use crate::models::{JobRecord, SearchResultSet, Stage};
use crate::search::{self, SortOrder, FILTERS};
use crate::store::JobCollectionStore;
use crate::views;

const TOAST_TTL: Duration = Duration::from_millis(3000);
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Transient notice line, the terminal stand-in for the original's toasts.
struct Toast {
    text: String,
    error: bool,
    shown: Instant,
}

impl Toast {
    fn info(text: impl Into<String>) -> Self {
        Self { text: text.into(), error: false, shown: Instant::now() }
    }

    fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), error: true, shown: Instant::now() }
    }

    fn expired(&self) -> bool {
        self.shown.elapsed() > TOAST_TTL
    }
}

fn stage_color(stage: Stage) -> Color {
    match stage {
        Stage::Applied => Color::Blue,
        Stage::Inprocess => Color::Yellow,
        Stage::Rejected => Color::Red,
        Stage::Hired => Color::Green,
    }
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

// --- Application board ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoardMode {
    Kanban,
    Table,
    Saved,
}

impl BoardMode {
    fn next(self) -> Self {
        match self {
            BoardMode::Kanban => BoardMode::Table,
            BoardMode::Table => BoardMode::Saved,
            BoardMode::Saved => BoardMode::Kanban,
        }
    }

    fn title(self) -> &'static str {
        match self {
            BoardMode::Kanban => "Board",
            BoardMode::Table => "Table",
            BoardMode::Saved => "Saved",
        }
    }
}

struct BoardState {
    store: JobCollectionStore,
    mode: BoardMode,
    col: usize,
    row: usize,
    toast: Option<Toast>,
}

impl BoardState {
    fn new(store: JobCollectionStore) -> Self {
        Self { store, mode: BoardMode::Kanban, col: 0, row: 0, toast: None }
    }

    /// Records under the cursor's current pane, in collection order.
    fn visible(&self) -> Vec<&JobRecord> {
        match self.mode {
            BoardMode::Kanban => views::by_stage(self.store.jobs(), Stage::ALL[self.col]),
            BoardMode::Table => views::tracked_table(self.store.jobs()),
            BoardMode::Saved => views::saved_only(self.store.jobs()),
        }
    }

    fn selected(&self) -> Option<&JobRecord> {
        self.visible().get(self.row).copied()
    }

    /// The collection just changed shape; keep the cursor inside it.
    fn clamp(&mut self) {
        let len = self.visible().len();
        if self.row >= len {
            self.row = len.saturating_sub(1);
        }
    }

    fn next_row(&mut self) {
        let len = self.visible().len();
        if len > 0 && self.row < len - 1 {
            self.row += 1;
        }
    }

    fn prev_row(&mut self) {
        if self.row > 0 {
            self.row -= 1;
        }
    }

    fn next_col(&mut self) {
        if self.mode == BoardMode::Kanban && self.col < Stage::ALL.len() - 1 {
            self.col += 1;
            self.row = 0;
        }
    }

    fn prev_col(&mut self) {
        if self.mode == BoardMode::Kanban && self.col > 0 {
            self.col -= 1;
            self.row = 0;
        }
    }

    fn expire_toast(&mut self) {
        if self.toast.as_ref().is_some_and(Toast::expired) {
            self.toast = None;
        }
    }
}

pub fn run_board(api: &dyn JobsApi) -> Result<()> {
    let mut store = JobCollectionStore::new();
    store.reload(api)?;

    let mut state = BoardState::new(store);

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = board_loop(&mut terminal, &mut state, api);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn board_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut BoardState,
    api: &dyn JobsApi,
) -> Result<()> {
    loop {
        state.expire_toast();
        terminal.draw(|frame| draw_board(frame, state))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Char('v') => {
                state.mode = state.mode.next();
                state.row = 0;
            }
            KeyCode::Down | KeyCode::Char('j') => state.next_row(),
            KeyCode::Up | KeyCode::Char('k') => state.prev_row(),
            KeyCode::Left | KeyCode::Char('h') => state.prev_col(),
            KeyCode::Right | KeyCode::Char('l') => state.next_col(),
            KeyCode::Char('[') => move_card(state, api, -1),
            KeyCode::Char(']') => move_card(state, api, 1),
            KeyCode::Char(c @ '1'..='4') => {
                let dest = Stage::ALL[c as usize - '1' as usize];
                set_stage(state, api, dest);
            }
            KeyCode::Char('a') => {
                if state.mode == BoardMode::Saved {
                    set_stage(state, api, Stage::Applied);
                }
            }
            KeyCode::Char('d') => delete_selected(state, api),
            KeyCode::Char('r') => match state.store.reload(api) {
                Ok(()) => state.toast = Some(Toast::info("Refreshed")),
                Err(e) => state.toast = Some(Toast::error(format!("{:#}", e))),
            },
            _ => {}
        }
        state.clamp();
    }
    Ok(())
}

/// Keyboard stand-in for dragging a card one column over.
fn move_card(state: &mut BoardState, api: &dyn JobsApi, dir: isize) {
    if state.mode != BoardMode::Kanban {
        return;
    }
    let dest_col = state.col as isize + dir;
    if !(0..Stage::ALL.len() as isize).contains(&dest_col) {
        return;
    }
    let Some(job) = state.selected() else { return };
    let id = job.key().to_string();
    let from = Stage::ALL[state.col];
    let to = Stage::ALL[dest_col as usize];

    match controller::transition(api, &mut state.store, &id, from, to) {
        Ok(TransitionOutcome::Updated) => {
            state.toast = Some(Toast::info("Status updated"));
            state.col = dest_col as usize;
            state.row = 0;
        }
        Ok(TransitionOutcome::Unchanged) => {}
        Err(e) => state.toast = Some(Toast::error(format!("{:#}", e))),
    }
}

/// Stage hotkeys and the saved list's mark-as-applied.
fn set_stage(state: &mut BoardState, api: &dyn JobsApi, dest: Stage) {
    let Some(job) = state.selected() else { return };
    let id = job.key().to_string();

    match controller::request_transition(api, &mut state.store, &id, dest) {
        Ok(TransitionOutcome::Updated) => state.toast = Some(Toast::info("Status updated")),
        Ok(TransitionOutcome::Unchanged) => {}
        Err(e) => state.toast = Some(Toast::error(format!("{:#}", e))),
    }
}

fn delete_selected(state: &mut BoardState, api: &dyn JobsApi) {
    let Some(job) = state.selected() else { return };
    let id = job.key().to_string();
    let saved_only = job.is_saved_only();

    match controller::request_deletion(api, &mut state.store, &id, saved_only) {
        Ok(()) => state.toast = Some(Toast::info("Job removed")),
        Err(e) => state.toast = Some(Toast::error(format!("{:#}", e))),
    }
}

fn draw_board(frame: &mut Frame, state: &BoardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    // Header: server-side summary, never recounted here
    let summary = state.store.summary();
    let header = Paragraph::new(format!(
        " {} | Applied: {}  In Process: {}  Rejected: {}  Hired: {}  Saved: {}",
        state.mode.title(),
        summary.applied,
        summary.inprocess,
        summary.rejected,
        summary.hired,
        summary.saved,
    ))
    .style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(header, chunks[0]);

    match state.mode {
        BoardMode::Kanban => draw_kanban(frame, chunks[1], state),
        BoardMode::Table => draw_table(frame, chunks[1], state),
        BoardMode::Saved => draw_saved(frame, chunks[1], state),
    }

    let help = match state.mode {
        BoardMode::Kanban => " h/l:column  j/k:card  [/]:move card  1-4:set stage  d:delete  v:view  r:refresh  q:quit",
        BoardMode::Table => " j/k:navigate  1-4:set stage  d:delete  v:view  r:refresh  q:quit",
        BoardMode::Saved => " j/k:navigate  a:mark applied  d:delete  v:view  r:refresh  q:quit",
    };
    let footer = match &state.toast {
        Some(toast) => Paragraph::new(format!(" {}", toast.text)).style(
            Style::default()
                .fg(if toast.error { Color::Red } else { Color::Green })
                .add_modifier(Modifier::BOLD),
        ),
        None => Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(footer, chunks[2]);
}

fn draw_kanban(frame: &mut Frame, area: Rect, state: &BoardState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25); 4])
        .split(area);

    for (i, stage) in Stage::ALL.iter().enumerate() {
        let cards = views::by_stage(state.store.jobs(), *stage);
        let items: Vec<ListItem> = cards
            .iter()
            .map(|job| {
                let company = job.company.as_deref().unwrap_or("?");
                ListItem::new(format!("{}\n  {}", clip(&job.title, 28), clip(company, 26)))
            })
            .collect();

        let active = i == state.col;
        let border_style = if active {
            Style::default().fg(stage_color(*stage)).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style)
                    .title(format!(" {} ({}) ", stage.label().to_uppercase(), cards.len())),
            )
            .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

        if active {
            let mut list_state = ListState::default();
            list_state.select((!cards.is_empty()).then_some(state.row));
            frame.render_stateful_widget(list, columns[i], &mut list_state);
        } else {
            frame.render_widget(list, columns[i]);
        }
    }
}

fn draw_table(frame: &mut Frame, area: Rect, state: &BoardState) {
    let tracked = views::tracked_table(state.store.jobs());
    let items: Vec<ListItem> = tracked
        .iter()
        .map(|job| {
            let status = job.status.map(|s| s.label()).unwrap_or("?");
            let company = job.company.as_deref().unwrap_or("?");
            let applied = job.applied_at.as_deref().unwrap_or("-");
            let line = Line::from(vec![
                Span::styled(
                    format!("{:<12}", status),
                    Style::default().fg(job.status.map(stage_color).unwrap_or(Color::Gray)),
                ),
                Span::raw(format!("{:<34}", clip(&job.title, 32))),
                Span::raw(format!("{:<22}", clip(company, 20))),
                Span::raw(clip(applied, 19)),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Applications ({}) ", tracked.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let mut list_state = ListState::default();
    list_state.select((!tracked.is_empty()).then_some(state.row));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn draw_saved(frame: &mut Frame, area: Rect, state: &BoardState) {
    let saved = views::saved_only(state.store.jobs());
    let items: Vec<ListItem> = saved
        .iter()
        .map(|job| {
            let company = job.company.as_deref().unwrap_or("?");
            let saved_at = job.saved_at.as_deref().unwrap_or("-");
            ListItem::new(format!(
                "{} | {}  (saved {})",
                clip(&job.title, 40),
                clip(company, 24),
                clip(saved_at, 19)
            ))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Saved Jobs ({}) ", saved.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let mut list_state = ListState::default();
    list_state.select((!saved.is_empty()).then_some(state.row));
    frame.render_stateful_widget(list, area, &mut list_state);
}

// --- Search result browser ---

struct ResultsState {
    results: SearchResultSet,
    filter: Option<search::Source>,
    sort: SortOrder,
    selected: usize,
    scroll_offset: u16,
    toast: Option<Toast>,
}

impl ResultsState {
    fn new(results: SearchResultSet, filter: Option<search::Source>, sort: SortOrder) -> Self {
        Self {
            results,
            filter,
            sort,
            selected: 0,
            scroll_offset: 0,
            toast: None,
        }
    }

    /// Fresh derivation on every call; the raw result set stays untouched.
    fn visible(&self) -> Vec<JobRecord> {
        search::process(&self.results.jobs, self.filter, self.sort)
    }

    fn current(&self) -> Option<JobRecord> {
        self.visible().into_iter().nth(self.selected)
    }

    fn cycle_filter(&mut self) {
        let pos = FILTERS.iter().position(|f| *f == self.filter).unwrap_or(0);
        self.filter = FILTERS[(pos + 1) % FILTERS.len()];
        self.selected = 0;
        self.scroll_offset = 0;
    }

    fn cycle_sort(&mut self) {
        self.sort = self.sort.next();
        self.selected = 0;
        self.scroll_offset = 0;
    }

    fn expire_toast(&mut self) {
        if self.toast.as_ref().is_some_and(Toast::expired) {
            self.toast = None;
        }
    }
}

pub fn run_results(
    api: &dyn JobsApi,
    results: SearchResultSet,
    filter: Option<search::Source>,
    sort: SortOrder,
) -> Result<()> {
    if results.jobs.is_empty() {
        println!("No jobs found. Try another role.");
        return Ok(());
    }

    let mut state = ResultsState::new(results, filter, sort);

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = results_loop(&mut terminal, &mut state, api);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn results_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut ResultsState,
    api: &dyn JobsApi,
) -> Result<()> {
    loop {
        state.expire_toast();
        terminal.draw(|frame| draw_results(frame, state))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Down | KeyCode::Char('j') => {
                let len = state.visible().len();
                if len > 0 && state.selected < len - 1 {
                    state.selected += 1;
                    state.scroll_offset = 0;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if state.selected > 0 {
                    state.selected -= 1;
                    state.scroll_offset = 0;
                }
            }
            KeyCode::Char('J') | KeyCode::PageDown => {
                state.scroll_offset = state.scroll_offset.saturating_add(3);
            }
            KeyCode::Char('K') | KeyCode::PageUp => {
                state.scroll_offset = state.scroll_offset.saturating_sub(3);
            }
            KeyCode::Char('s') => state.cycle_sort(),
            KeyCode::Char('f') => state.cycle_filter(),
            KeyCode::Char('t') => {
                if let Some(job) = state.current() {
                    state.toast = Some(match api.track(job.key()) {
                        Ok(()) => Toast::info("Application tracked!"),
                        Err(e) => Toast::error(format!("{:#}", e)),
                    });
                }
            }
            KeyCode::Char('b') => {
                if let Some(job) = state.current() {
                    state.toast = Some(match api.save(job.key()) {
                        Ok(()) => Toast::info("Job saved!"),
                        Err(e) => Toast::error(format!("{:#}", e)),
                    });
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn draw_results(frame: &mut Frame, state: &ResultsState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let cache_note = if state.results.from_cache { "  [from cache]" } else { "" };
    let header = Paragraph::new(format!(
        " Search Results: {} jobs{}  |  Sort: {}  Filter: {}",
        state.results.total,
        cache_note,
        state.sort.label(),
        search::filter_label(state.filter),
    ))
    .style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(header, rows[0]);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[1]);

    let visible = state.visible();
    let items: Vec<ListItem> = visible
        .iter()
        .map(|job| {
            let company = job.company.as_deref().unwrap_or("?");
            let score = job
                .ai_score
                .map(|s| format!("{:>3.0}", s))
                .unwrap_or_else(|| "  -".to_string());
            ListItem::new(format!(
                "{} {} | {}",
                score,
                clip(&job.title, 30),
                clip(company, 18)
            ))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Jobs ({}) ", visible.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let mut list_state = ListState::default();
    list_state.select((!visible.is_empty()).then_some(state.selected.min(visible.len().saturating_sub(1))));
    frame.render_stateful_widget(list, panes[0], &mut list_state);

    let detail = build_result_detail(state, &visible);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail_widget, panes[1]);

    let footer = match &state.toast {
        Some(toast) => Paragraph::new(format!(" {}", toast.text)).style(
            Style::default()
                .fg(if toast.error { Color::Red } else { Color::Green })
                .add_modifier(Modifier::BOLD),
        ),
        None => Paragraph::new(
            " j/k:navigate  J/K:scroll  s:sort  f:filter  t:track  b:save  q:quit",
        )
        .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(footer, rows[2]);
}

fn build_result_detail(state: &ResultsState, visible: &[JobRecord]) -> Text<'static> {
    let Some(job) = visible.get(state.selected) else {
        return Text::raw("No job selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        job.title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    if let Some(company) = &job.company {
        lines.push(Line::from(format!("at {}", company)));
    }

    let source = search::classify(job.source.as_deref());
    lines.push(Line::from(Span::styled(
        format!("Source: {}", job.source.as_deref().unwrap_or(source.label())),
        Style::default().fg(Color::Cyan),
    )));
    if let Some(score) = job.ai_score {
        lines.push(Line::from(format!("AI match: {:.0}", score)));
    }
    if let Some(location) = &job.location {
        lines.push(Line::from(format!("Location: {}", location)));
    }
    if let Some(salary) = &job.salary_range {
        lines.push(Line::from(format!("Salary: {}", salary)));
    }
    if let Some(posted) = &job.posted_at {
        lines.push(Line::from(format!("Posted: {}", posted)));
    }
    if let Some(url) = &job.apply_url {
        lines.push(Line::from(format!("Apply: {}", url)));
    }

    lines.push(Line::from(""));
    match &job.description {
        Some(text) => {
            for line in textwrap::fill(text, 72).lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        None => lines.push(Line::from(Span::styled(
            "(No description; open the apply link to read more)",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    if !state.results.ai_tips.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "AI TIPS",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for tip in &state.results.ai_tips {
            let icon = tip.icon.as_deref().unwrap_or("*");
            for (i, line) in textwrap::fill(&tip.tip, 70).lines().enumerate() {
                if i == 0 {
                    lines.push(Line::from(format!("{} {}", icon, line)));
                } else {
                    lines.push(Line::from(format!("  {}", line)));
                }
            }
        }
    }

    Text::from(lines)
}
