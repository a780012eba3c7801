use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Wrap};

use obv_terminal::config::AppConfig;
use obv_terminal::export::EXPORT_FILE_NAME;
use obv_terminal::filter::NumericRange;
use obv_terminal::loader::Source;
use obv_terminal::session::Session;
use obv_terminal::state::{AppState, Focus, ListKind, focus_label, list_label};

struct App {
    state: AppState,
    source: Source,
    should_quit: bool,
}

impl App {
    fn new(state: AppState, source: Source) -> Self {
        Self {
            state,
            source,
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.load_error.is_some() {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                KeyCode::Char('r') => {
                    let _ = self.state.load(self.source.clone());
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.state.cycle_focus_next(),
            KeyCode::BackTab => self.state.cycle_focus_prev(),
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('h') | KeyCode::Left | KeyCode::Char('-') => self.state.adjust(-1.0),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Char('+') => self.state.adjust(1.0),
            KeyCode::PageDown => self.state.adjust(10.0),
            KeyCode::PageUp => self.state.adjust(-10.0),
            KeyCode::Char(' ') | KeyCode::Enter => self.state.toggle_current(),
            KeyCode::Char('c') => self.state.clear_current(),
            KeyCode::Char('x') | KeyCode::Char('e') => self.state.export(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            return Ok(());
        }
    };
    let session = Session::new(config);
    let source = std::env::args()
        .nth(1)
        .filter(|arg| !arg.trim().is_empty())
        .map(|arg| Source::Upload(PathBuf::from(arg)))
        .unwrap_or_else(|| session.default_source());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(AppState::new(session), source);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    terminal.draw(|f| render_loading(f, &app.source))?;
    let _ = app.state.load(app.source.clone());

    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        app.state.maybe_clear_export(Instant::now());
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn render_loading(frame: &mut Frame, source: &Source) {
    let msg = Paragraph::new(format!("Loading player stats from {} ...", source.label()))
        .block(Block::default().borders(Borders::ALL).title("OBV Analysis"));
    frame.render_widget(msg, frame.size());
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(4),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    if let Some(err) = app.state.load_error.as_deref() {
        render_load_error(frame, chunks[1], err);
    } else {
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(32), Constraint::Min(1)])
            .split(chunks[1]);
        render_sidebar(frame, body[0], &app.state);
        render_table(frame, body[1], &app.state);
    }

    render_logs(frame, chunks[2], &app.state);

    let footer = Paragraph::new(footer_text(&app.state));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let source = state
        .session
        .active_source()
        .map(|s| s.label())
        .unwrap_or_else(|| "no dataset".to_string());
    format!(
        "OBV ANALYSIS | {} | {} of {} players",
        source,
        state.view.len(),
        state.loaded_rows
    )
}

fn footer_text(state: &AppState) -> String {
    if state.load_error.is_some() {
        return "r Retry | q Quit".to_string();
    }
    if !state.export.message.is_empty() {
        return state.export.message.clone();
    }
    format!(
        "Tab Focus ({}) | ←/→ Adjust | j/k Move | Space Toggle | c Clear | x Export {} | ? Help | q Quit",
        focus_label(state.focus),
        EXPORT_FILE_NAME
    )
}

fn render_load_error(frame: &mut Frame, area: Rect, err: &str) {
    let text = format!("Could not load the dataset.\n\n{err}\n\nPress r to retry or q to quit.");
    let widget = Paragraph::new(text)
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Load error"));
    frame.render_widget(widget, area);
}

fn render_sidebar(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let filters = &state.session.filters;
    render_range(
        frame,
        sections[0],
        "Age",
        &filters.age,
        state.focus,
        (Focus::AgeMin, Focus::AgeMax),
    );
    render_range(
        frame,
        sections[1],
        "Usage",
        &filters.usage,
        state.focus,
        (Focus::UsageMin, Focus::UsageMax),
    );
    render_multi_select(frame, sections[2], state, ListKind::Position);
    render_multi_select(frame, sections[3], state, ListKind::Competition);
    render_multi_select(frame, sections[4], state, ListKind::Team);
}

fn render_range(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    range: &NumericRange,
    focus: Focus,
    (min_focus, max_focus): (Focus, Focus),
) {
    let bound = |label: &str, value: f64, focused: bool| {
        let style = if focused {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::raw(format!("{label:<4}")),
            Span::styled(format!(" {value:>3.0} "), style),
        ])
    };
    let lines = vec![
        bound("Min", range.min, focus == min_focus),
        bound("Max", range.max, focus == max_focus),
    ];
    let border = if focus == min_focus || focus == max_focus {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(title.to_string()),
    );
    frame.render_widget(widget, area);
}

fn render_multi_select(frame: &mut Frame, area: Rect, state: &AppState, kind: ListKind) {
    let options = state.options(kind);
    let selection = state.selection(kind);
    let focused = state.focused_list() == Some(kind);
    let cursor = state.cursor(kind);

    let inner_height = area.height.saturating_sub(2) as usize;
    let (start, end) = visible_range(cursor, options.len(), inner_height);
    let items = options[start..end]
        .iter()
        .enumerate()
        .map(|(i, opt)| {
            let idx = start + i;
            let mark = if selection.contains(opt) { "[x]" } else { "[ ]" };
            let style = if focused && idx == cursor {
                Style::default().fg(Color::White).bg(Color::DarkGray)
            } else {
                Style::default()
            };
            ListItem::new(format!("{mark} {opt}")).style(style)
        })
        .collect::<Vec<_>>();

    let title = if selection.is_active() {
        format!("{} ({})", list_label(kind), selection.values().len())
    } else {
        list_label(kind).to_string()
    };
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(title),
    );
    frame.render_widget(list, area);
}

fn render_table(frame: &mut Frame, area: Rect, state: &AppState) {
    let focused = state.focus == Focus::Table;
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title("Filtered Player Stats");

    let view = &state.view;
    if view.is_empty() {
        let empty = Paragraph::new("No players match these filters")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let widths = view
        .columns()
        .iter()
        .map(|c| Constraint::Min(c.len().clamp(4, 22) as u16))
        .collect::<Vec<_>>();
    let header = Row::new(view.columns().iter().map(|c| Cell::from(c.clone())))
        .style(Style::default().add_modifier(Modifier::BOLD));

    let visible = area.height.saturating_sub(3) as usize;
    let (start, end) = visible_range(state.table_scroll, view.len(), visible);
    let rows = view.rows()[start..end]
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let style = if focused && start + i == state.table_scroll {
                Style::default().fg(Color::White).bg(Color::DarkGray)
            } else {
                Style::default()
            };
            Row::new(row.iter().map(|cell| Cell::from(cell.to_string()))).style(style)
        })
        .collect::<Vec<_>>();

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(block);
    frame.render_widget(table, area);
}

fn render_logs(frame: &mut Frame, area: Rect, state: &AppState) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines = state
        .logs
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|l| {
            let style = if l.starts_with("[WARN]") {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Line::styled(l.clone(), style)
        })
        .collect::<Vec<_>>();
    let widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Console"));
    frame.render_widget(widget, area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup = centered_rect(60, 60, area);
    let text = [
        "Tab / Shift-Tab  move between controls",
        "← / →  or  - / +  adjust the focused bound by 1",
        "PgUp / PgDn      adjust the focused bound by 10",
        "j / k            move in a list or scroll the table",
        "Space / Enter    toggle the option under the cursor",
        "c                clear the focused list",
        "x                export the table to xlsx",
        "?                close help",
        "q                quit",
        "",
        "Picking \"All\" disables a list's filter.",
        "Team options follow the competitions picked.",
    ]
    .join("\n");
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Help")),
        popup,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 || visible == 0 {
        return (0, 0);
    }
    let start = selected.saturating_sub(visible.saturating_sub(1)).min(total);
    let end = (start + visible).min(total);
    (start, end)
}
