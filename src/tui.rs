use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate};
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use std::io::stdout;
use tracing::debug;

use crate::calendar::{
    CalendarEvent, CalendarView, DetailMarker, Highlight, Placement, build_grid, mark_applied,
    popover_placement,
};
use crate::dates::{days_left, first_of_month, parse_day};
use crate::db::Database;
use crate::models::{ApplicationRecord, Status};
use crate::projection::upcoming_deadlines;

const CELL_WIDTH: u16 = 8;
const WEEK_HEIGHT: u16 = 2;

struct AppState {
    records: Vec<ApplicationRecord>,
    view: CalendarView,
    cursor: NaiveDate,
    today: NaiveDate,
    deadline_selected: usize,
    confirm: Option<i64>,
    message: Option<String>,
}

impl AppState {
    fn new(records: Vec<ApplicationRecord>, today: NaiveDate) -> Self {
        let mut state = Self {
            records,
            view: CalendarView::new(today),
            cursor: today,
            today,
            deadline_selected: 0,
            confirm: None,
            message: None,
        };
        state.hover();
        state
    }

    fn send(&mut self, event: CalendarEvent) {
        self.view.apply(event, &self.records, self.today);
    }

    fn hover(&mut self) {
        self.send(CalendarEvent::HoverDay(self.cursor));
    }

    fn move_cursor(&mut self, days: i64) {
        self.cursor += Duration::days(days);
        if first_of_month(self.cursor) != self.view.visible_month() {
            self.view.show_month(self.cursor);
        }
        self.hover();
    }

    fn change_month(&mut self, event: CalendarEvent) {
        self.send(event);
        self.cursor = if event == CalendarEvent::JumpToday {
            self.today
        } else {
            self.view.visible_month()
        };
        self.hover();
    }

    fn click(&mut self) {
        if self.view.selected().is_some_and(|d| d.day == self.cursor) {
            self.send(CalendarEvent::Dismiss);
        } else {
            self.send(CalendarEvent::ClickDay(self.cursor));
        }
    }

    fn deadline_ids(&self) -> Vec<i64> {
        upcoming_deadlines(&self.records, usize::MAX)
            .iter()
            .map(|r| r.id)
            .collect()
    }

    fn cycle_deadline(&mut self) {
        let count = self.deadline_ids().len();
        if count > 0 {
            self.deadline_selected = (self.deadline_selected + 1) % count;
        }
    }

    fn mark_selected_applied(&mut self, db: &Database) {
        let Some(id) = self.confirm.take() else { return };
        let mut persist = |id: i64, status: Status| db.update_status(id, status).map(|_| ());
        self.message = match mark_applied(&mut self.records, id, &mut persist) {
            Ok(true) => Some(format!("Marked #{} as applied", id)),
            Ok(false) => Some(format!("Application #{} not found", id)),
            Err(e) => {
                debug!(id, error = %e, "failed to persist status change");
                Some(format!("Failed to update #{}: {}", id, e))
            }
        };
        let count = self.deadline_ids().len();
        self.deadline_selected = self.deadline_selected.min(count.saturating_sub(1));
        self.hover();
    }
}

pub fn run_browse(db: &Database, today: NaiveDate) -> Result<()> {
    let records = db.list()?;
    let mut state = AppState::new(records, today);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, db);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    db: &Database,
) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        list_state.select(Some(state.deadline_selected));
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if state.confirm.is_some() {
                match key.code {
                    KeyCode::Char('y') => state.mark_selected_applied(db),
                    _ => {
                        state.confirm = None;
                        state.message = Some("Cancelled".to_string());
                    }
                }
                continue;
            }
            state.message = None;
            match key.code {
                KeyCode::Char('q') => break,
                KeyCode::Esc => {
                    if state.view.selected().is_some() {
                        state.send(CalendarEvent::Dismiss);
                    } else {
                        break;
                    }
                }
                KeyCode::Left | KeyCode::Char('h') => state.move_cursor(-1),
                KeyCode::Right | KeyCode::Char('l') => state.move_cursor(1),
                KeyCode::Up | KeyCode::Char('k') => state.move_cursor(-7),
                KeyCode::Down | KeyCode::Char('j') => state.move_cursor(7),
                KeyCode::Char('n') | KeyCode::Char('>') => state.change_month(CalendarEvent::NextMonth),
                KeyCode::Char('p') | KeyCode::Char('<') => state.change_month(CalendarEvent::PrevMonth),
                KeyCode::Char('t') => state.change_month(CalendarEvent::JumpToday),
                KeyCode::Enter => state.click(),
                KeyCode::Tab => state.cycle_deadline(),
                KeyCode::Char('a') => {
                    state.confirm = state.deadline_ids().get(state.deadline_selected).copied();
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(7 * CELL_WIDTH + 2), Constraint::Min(30)])
        .split(rows[0]);

    draw_calendar(frame, state, chunks[0]);
    draw_deadlines(frame, state, list_state, chunks[1]);

    let footer = if let Some(id) = state.confirm {
        format!(" Mark #{} as applied? y to confirm, any other key cancels", id)
    } else if let Some(msg) = &state.message {
        format!(" {}", msg)
    } else {
        " hjkl:move  enter:details  esc:close  n/p:month  t:today  tab:next deadline  a:mark applied  q:quit"
            .to_string()
    };
    frame.render_widget(
        Paragraph::new(footer).style(Style::default().fg(Color::DarkGray)),
        rows[1],
    );
}

fn draw_calendar(frame: &mut Frame, state: &AppState, area: Rect) {
    let grid = build_grid(&state.records, state.view.visible_month(), state.today);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", grid.month.format("%B %Y")));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line> = vec![Line::from(
        ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]
            .iter()
            .map(|d| Span::styled(format!(" {:<7}", d), Style::default().fg(Color::DarkGray)))
            .collect::<Vec<_>>(),
    )];

    let blank = || Span::raw(" ".repeat(CELL_WIDTH as usize));
    let mut numbers: Vec<Span> = (0..grid.leading_blanks).map(|_| blank()).collect();
    let mut badges: Vec<Span> = (0..grid.leading_blanks).map(|_| blank()).collect();

    for cell in &grid.cells {
        let mut style = match cell.highlight() {
            Highlight::Deadline => Style::default().fg(Color::LightRed),
            Highlight::Exam => Style::default().fg(Color::Yellow),
            Highlight::Plain => Style::default(),
        };
        if cell.is_today {
            style = style.fg(Color::Magenta).add_modifier(Modifier::BOLD);
        }
        if cell.date == state.cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        numbers.push(Span::styled(format!(" {:>2}     ", cell.date.day()), style));

        let red = cell.deadline_badge().map(|n| format!("●{}", n)).unwrap_or_default();
        let yellow = cell.exam_badge().map(|n| format!("●{}", n)).unwrap_or_default();
        let used = 1 + red.chars().count() + yellow.chars().count() + usize::from(!yellow.is_empty());
        badges.push(Span::raw(" "));
        badges.push(Span::styled(red, Style::default().fg(Color::Red)));
        if !yellow.is_empty() {
            badges.push(Span::raw(" "));
            badges.push(Span::styled(yellow, Style::default().fg(Color::Yellow)));
        }
        badges.push(Span::raw(" ".repeat((CELL_WIDTH as usize).saturating_sub(used))));

        if cell.date.weekday().num_days_from_sunday() == 6 {
            lines.push(Line::from(std::mem::take(&mut numbers)));
            lines.push(Line::from(std::mem::take(&mut badges)));
        }
    }
    if !numbers.is_empty() {
        lines.push(Line::from(numbers));
        lines.push(Line::from(badges));
    }
    frame.render_widget(Paragraph::new(lines), inner);

    if let (Some(detail), Some((row, col))) = (state.view.selected(), grid.position(state.cursor)) {
        let items: Vec<Line> = detail
            .entries
            .iter()
            .map(|entry| match entry.marker {
                DetailMarker::DaysLeft(days) => Line::from(vec![
                    Span::styled(entry.company_name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(format!(" ({}d left)", days), Style::default().fg(Color::Red)),
                ]),
                DetailMarker::Exam => Line::from(vec![
                    Span::styled(entry.company_name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(" [exam]", Style::default().fg(Color::Yellow)),
                ]),
            })
            .collect();

        let width = items
            .iter()
            .map(|l| l.width() as u16 + 2)
            .max()
            .unwrap_or(0)
            .max(16)
            .min(inner.width);
        let height = (items.len() as u16 + 2).min(inner.height);
        let cell_top = inner.y + 1 + row as u16 * WEEK_HEIGHT;
        let cell_bottom = cell_top + WEEK_HEIGHT;
        let y = match popover_placement(cell_bottom, inner.bottom(), height, 0) {
            Placement::Below => cell_bottom,
            Placement::Above => cell_top.saturating_sub(height).max(inner.y),
        };
        let x = (inner.x + col as u16 * CELL_WIDTH).min(inner.right().saturating_sub(width));
        let popover = Rect::new(x, y, width, height);

        frame.render_widget(Clear, popover);
        frame.render_widget(
            Paragraph::new(items).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} ", detail.day.format("%b %-d"))),
            ),
            popover,
        );
    }
}

fn draw_deadlines(frame: &mut Frame, state: &AppState, list_state: &mut ListState, area: Rect) {
    let deadlines = upcoming_deadlines(&state.records, usize::MAX);
    let items: Vec<ListItem> = deadlines
        .iter()
        .map(|r| {
            let due = r.last_date_to_apply.as_deref().and_then(parse_day);
            let left = due.map_or_else(String::new, |d| format!("{}d left", days_left(d, state.today)));
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(r.company_name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw("  "),
                    Span::styled(left, Style::default().fg(Color::Red)),
                ]),
                Line::from(Span::styled(
                    format!("  {} • {}", r.role, r.ctc),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Upcoming deadlines ({}) ", deadlines.len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, list_state);
}
