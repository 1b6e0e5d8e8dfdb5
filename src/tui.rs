use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap},
};
use std::io::stdout;
use tracing::warn;

use crate::api::{ApiError, SalaryApi};
use crate::engine::{Facet, PagingMode, SalaryFilterEngine};
use crate::format;
use crate::models::SalaryRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
}

struct AppState {
    engine: SalaryFilterEngine,
    selected: usize,
    scroll_offset: u16,
    facet_cursor: usize,
    input: InputMode,
    loading: bool,
    status: Option<String>,
}

impl AppState {
    fn new(page_size: usize) -> Self {
        Self {
            engine: SalaryFilterEngine::new(PagingMode::Window, page_size),
            selected: 0,
            scroll_offset: 0,
            facet_cursor: 0,
            input: InputMode::Normal,
            loading: true,
            status: None,
        }
    }

    fn load(&mut self, fetched: Result<Vec<SalaryRecord>, ApiError>) {
        self.loading = false;
        match fetched {
            Ok(records) => {
                self.status = Some(format!("{} salaries loaded", records.len()));
                self.engine.replace_records(records);
            }
            Err(e) => {
                warn!(error = %e, "could not load salaries");
                self.status = Some(e.to_string());
            }
        }
        self.reset_selection();
    }

    fn visible_len(&self) -> usize {
        self.engine.visible_records().len()
    }

    fn current_record(&self) -> Option<&SalaryRecord> {
        self.engine.visible_records().get(self.selected).copied()
    }

    fn focused_facet(&self) -> Facet {
        Facet::ALL[self.facet_cursor % Facet::ALL.len()]
    }

    fn reset_selection(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    fn next(&mut self) {
        if self.selected + 1 < self.visible_len() {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn cycle_designation(&mut self, forward: bool) {
        let options: Vec<String> = self
            .engine
            .derived_designation_options(true)
            .into_iter()
            .map(str::to_string)
            .collect();
        if options.is_empty() {
            return;
        }
        let current = self.engine.designation().as_str();
        let next = match options.iter().position(|o| o == current) {
            Some(i) if forward => (i + 1) % options.len(),
            Some(i) => (i + options.len() - 1) % options.len(),
            None => 0,
        };
        self.engine.set_designation(options[next].as_str());
        self.reset_selection();
    }

    /// Steps the focused facet through "any", then each observed value.
    fn cycle_facet_value(&mut self) {
        let facet = self.focused_facet();
        let options = self.engine.derived_facet_options(facet);
        let next = match self.engine.facet_filter(facet) {
            None => options.first().cloned(),
            Some(current) => options
                .iter()
                .position(|o| o == current)
                .and_then(|i| options.get(i + 1).cloned()),
        };
        self.engine.set_facet_filter(facet, next.as_deref());
        self.reset_selection();
    }

    fn clear_facets(&mut self) {
        for facet in Facet::ALL {
            self.engine.set_facet_filter(facet, None);
        }
        self.reset_selection();
    }

    /// Leaving search selects the first narrowed option if the current one
    /// no longer matches.
    fn finish_search(&mut self) {
        self.input = InputMode::Normal;
        let options = self.engine.derived_designation_options(true);
        let current = self.engine.designation().as_str();
        if !options.contains(&current) {
            if let Some(first) = options.first().map(|s| s.to_string()) {
                self.engine.set_designation(first);
                self.reset_selection();
            }
        }
    }

    /// Applies one key press. Returns false when the browser should close.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.input == InputMode::Search {
            let mut term = self.engine.search_term().to_string();
            match code {
                KeyCode::Enter | KeyCode::Esc => self.finish_search(),
                KeyCode::Backspace => {
                    term.pop();
                    self.engine.set_search_term(term);
                }
                KeyCode::Char(c) => {
                    term.push(c);
                    self.engine.set_search_term(term);
                }
                _ => {}
            }
            return true;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.prev(),
            KeyCode::Char('J') | KeyCode::PageDown => {
                self.scroll_offset = self.scroll_offset.saturating_add(3)
            }
            KeyCode::Char('K') | KeyCode::PageUp => {
                self.scroll_offset = self.scroll_offset.saturating_sub(3)
            }
            KeyCode::Tab | KeyCode::Right => self.cycle_designation(true),
            KeyCode::BackTab | KeyCode::Left => self.cycle_designation(false),
            KeyCode::Char('/') => self.input = InputMode::Search,
            KeyCode::Char('f') => self.facet_cursor = (self.facet_cursor + 1) % Facet::ALL.len(),
            KeyCode::Char('v') => self.cycle_facet_value(),
            KeyCode::Char('x') => self.clear_facets(),
            KeyCode::Char('s') => self.engine.set_sort(self.engine.sort_key().cycle()),
            KeyCode::Char('m') => self.engine.expand_visible_count(),
            KeyCode::Char('l') => {
                self.engine.collapse_visible_count();
                if self.selected >= self.visible_len() {
                    self.selected = self.visible_len().saturating_sub(1);
                }
            }
            _ => {}
        }
        true
    }
}

pub fn run_browse(api: &SalaryApi, page_size: usize) -> Result<()> {
    let mut state = AppState::new(page_size);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, api);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    api: &SalaryApi,
) -> Result<()> {
    let mut list_state = ListState::default();

    // First frame shows the empty engine while the batch is fetched.
    terminal.draw(|frame| draw(frame, state, &mut list_state))?;
    state.load(api.list_salaries());

    loop {
        list_state.select((state.visible_len() > 0).then_some(state.selected));
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !state.handle_key(key.code) {
                break;
            }
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    // Designation tabs
    let options = state.engine.derived_designation_options(true);
    let current = state.engine.designation().as_str();
    let tabs = Tabs::new(options.iter().map(|o| format::truncate(o, 24)))
        .select(options.iter().position(|o| *o == current).unwrap_or(0))
        .block(Block::default().borders(Borders::ALL).title(" Designations "))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, rows[0]);

    // Query bar
    frame.render_widget(
        Paragraph::new(build_query_line(state))
            .block(Block::default().borders(Borders::ALL).title(" Filters ")),
        rows[1],
    );

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[2]);

    // Left panel: salary list
    let visible = state.engine.visible_records();
    let mut items: Vec<ListItem> = visible
        .iter()
        .map(|record| {
            ListItem::new(format!(
                "{} | {} | {}",
                format::truncate(record.designation.as_deref().unwrap_or("?"), 22),
                format::truncate(record.company_name.as_deref().unwrap_or("?"), 18),
                format::monthly(record.total_monthly)
            ))
        })
        .collect();
    if state.loading {
        items.push(ListItem::new("Loading salaries..."));
    } else if visible.is_empty() {
        items.push(ListItem::new("No salaries match."));
    }

    let total = state.engine.total_match_count();
    let mut title = format!(" Salaries ({}/{}) ", visible.len(), total);
    if state.engine.has_more() {
        title.push_str("[m: more] ");
    }
    if state.engine.can_collapse() {
        title.push_str("[l: less] ");
    }
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, columns[0], list_state);

    // Right panel: salary detail
    let detail = match state.current_record() {
        Some(record) => build_detail(record),
        None => Text::raw(state.status.clone().unwrap_or_default()),
    };
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail_widget, columns[1]);

    let help = match state.input {
        InputMode::Search => " type to narrow designations  enter/esc:done",
        InputMode::Normal => {
            " j/k:move  tab:designation  /:search  f:facet v:value x:clear  s:sort  m/l:more/less  q:quit"
        }
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        rows[3],
    );
}

fn build_query_line(state: &AppState) -> Line<'static> {
    let engine = &state.engine;
    let cursor = if state.input == InputMode::Search { "_" } else { "" };
    let focused = state.focused_facet();
    let focused_value = engine
        .facet_filter(focused)
        .map(|v| format::option_label(focused, v))
        .unwrap_or_else(|| "any".to_string());
    let active: Vec<String> = engine
        .facet_filters()
        .map(|(facet, value)| format!("{}={}", facet.name(), value))
        .collect();
    let summary = engine.summary();

    let mut spans = vec![
        Span::raw(format!("Search: {}{}  ", engine.search_term(), cursor)),
        Span::raw(format!("Sort: {}  ", engine.sort_key().label())),
        Span::styled(
            format!("[{}: {}]  ", focused.label(), focused_value),
            Style::default().fg(Color::Cyan),
        ),
    ];
    if !active.is_empty() {
        spans.push(Span::raw(format!("{}  ", active.join(", "))));
    }
    if let Some(average) = summary.average {
        spans.push(Span::styled(
            format!("avg {}", format::money(average)),
            Style::default().fg(Color::Green),
        ));
    }
    Line::from(spans)
}

fn build_detail(record: &SalaryRecord) -> Text<'static> {
    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        record.designation.clone().unwrap_or_else(|| "Untitled role".to_string()),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    if let Some(company) = &record.company_name {
        lines.push(Line::from(format!("at {}", company)));
    }
    lines.push(Line::from(Span::styled(
        format!("Monthly: {}", format::monthly(record.total_monthly)),
        Style::default().fg(Color::Green),
    )));

    let fields = [
        ("Location", record.location.clone()),
        ("Department", record.department.clone()),
        ("Industry", record.industry.clone()),
        ("Qualification", record.qualification.clone()),
        (
            "Experience",
            record
                .experience
                .map(|y| format::experience_label(&y.to_string())),
        ),
        ("Level", record.experience_level.map(|l| l.as_str().to_string())),
        ("Employment", record.employment_type.as_ref().map(|t| t.as_str().to_string())),
        ("Salary year", record.salary_year.map(|y| y.to_string())),
        ("Min. increment", record.minimum_increment.map(|i| format!("{}%", i))),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            lines.push(Line::from(format!("{}: {}", label, value)));
        }
    }
    lines.push(Line::from(Span::styled(
        format!(
            "Shared by {} on {}",
            record.display_author(),
            format::date(record.created_at)
        ),
        Style::default().fg(Color::DarkGray),
    )));

    if let Some(story) = &record.story {
        lines.push(Line::from(""));
        if let Some(title) = &story.title {
            lines.push(Line::from(Span::styled(
                title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
        }
        if let Some(description) = &story.description {
            for line in textwrap::fill(description, 70).lines() {
                lines.push(Line::from(format!("  {}", line)));
            }
        }
        for (heading, items, color) in [
            ("PROS", &story.pros, Color::Green),
            ("CONS", &story.cons, Color::Red),
        ] {
            if items.is_empty() {
                continue;
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(heading, Style::default().fg(color))));
            for item in items {
                lines.push(Line::from(format!("  - {}", item)));
            }
        }
    }

    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ALL_DESIGNATIONS;
    use ratatui::backend::TestBackend;

    fn record(id: &str, designation: &str, location: &str, pay: u64) -> SalaryRecord {
        let mut r = SalaryRecord::bare(id);
        r.designation = Some(designation.to_string());
        r.company_name = Some("Acme".to_string());
        r.location = Some(location.to_string());
        r.total_monthly = Some(pay);
        r
    }

    fn loaded() -> AppState {
        let mut state = AppState::new(2);
        state.load(Ok(vec![
            record("1", "Software Engineer", "Dhaka", 60000),
            record("2", "Data Analyst", "Dhaka", 45000),
            record("3", "Software Engineer", "Sylhet", 70000),
        ]));
        state
    }

    #[test]
    fn test_starts_empty_until_loaded() {
        let state = AppState::new(6);
        assert!(state.loading);
        assert_eq!(state.visible_len(), 0);

        let state = loaded();
        assert!(!state.loading);
        assert_eq!(state.visible_len(), 2);
    }

    #[test]
    fn test_failed_load_keeps_message() {
        let mut state = AppState::new(6);
        state.load(Err(ApiError::MissingToken));
        assert!(state.status.as_deref().unwrap().contains("not logged in"));
        assert_eq!(state.visible_len(), 0);
    }

    #[test]
    fn test_tab_cycles_designations() {
        let mut state = loaded();
        assert_eq!(state.engine.designation().as_str(), ALL_DESIGNATIONS);

        state.handle_key(KeyCode::Tab);
        assert_eq!(state.engine.designation().as_str(), "Software Engineer");
        assert_eq!(state.engine.total_match_count(), 2);

        state.handle_key(KeyCode::BackTab);
        state.handle_key(KeyCode::BackTab);
        assert_eq!(state.engine.designation().as_str(), "Data Analyst");
    }

    #[test]
    fn test_search_mode_narrows_and_selects() {
        let mut state = loaded();
        state.handle_key(KeyCode::Char('/'));
        for c in "analyst".chars() {
            assert!(state.handle_key(KeyCode::Char(c)));
        }
        assert_eq!(state.engine.search_term(), "analyst");
        state.handle_key(KeyCode::Enter);

        assert_eq!(state.input, InputMode::Normal);
        assert_eq!(state.engine.designation().as_str(), "Data Analyst");
    }

    #[test]
    fn test_facet_value_cycles_back_to_any() {
        let mut state = loaded();
        while state.focused_facet() != Facet::Location {
            state.handle_key(KeyCode::Char('f'));
        }
        state.handle_key(KeyCode::Char('v'));
        assert_eq!(state.engine.facet_filter(Facet::Location), Some("Dhaka"));
        state.handle_key(KeyCode::Char('v'));
        assert_eq!(state.engine.facet_filter(Facet::Location), Some("Sylhet"));
        state.handle_key(KeyCode::Char('v'));
        assert_eq!(state.engine.facet_filter(Facet::Location), None);
    }

    #[test]
    fn test_see_more_and_less() {
        let mut state = loaded();
        state.handle_key(KeyCode::Char('m'));
        assert_eq!(state.visible_len(), 3);
        state.handle_key(KeyCode::Char('j'));
        state.handle_key(KeyCode::Char('j'));
        assert_eq!(state.selected, 2);

        state.handle_key(KeyCode::Char('l'));
        assert_eq!(state.visible_len(), 2);
        assert_eq!(state.selected, 1);
        assert!(!state.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn test_draw_renders_list_and_detail() {
        let state = loaded();
        let mut terminal = Terminal::new(TestBackend::new(140, 30)).unwrap();
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        terminal
            .draw(|frame| draw(frame, &state, &mut list_state))
            .unwrap();

        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("Designations"));
        assert!(screen.contains("60,000"));
        assert!(screen.contains("Software Engineer"));
    }
}
