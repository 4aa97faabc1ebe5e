use anyhow::Result;
use costume_contest::{Category, Contest, ContestStatus, Leaderboard, Phase};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

const REFRESH_EVERY: Duration = Duration::from_secs(1);
const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];

pub struct App {
    pub contest: Contest,
    pub status: ContestStatus,
    pub boards: Vec<Leaderboard>,
    pub entry_count: i64,
    pub current: Category,
    pub error: Option<String>,
}

impl App {
    pub fn new(contest: Contest) -> Self {
        let status = contest.status();
        let mut app = Self {
            contest,
            status,
            boards: Vec::new(),
            entry_count: 0,
            current: Category::Overall,
            error: None,
        };
        app.refresh();
        app
    }

    /// Re-read phase and leaderboards from the store
    pub fn refresh(&mut self) {
        self.status = self.contest.status();
        let refreshed = self
            .contest
            .results()
            .and_then(|boards| Ok((boards, self.contest.entry_count()?)));

        match refreshed {
            Ok((boards, entry_count)) => {
                self.boards = boards;
                self.entry_count = entry_count;
                self.error = None;
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    pub fn next_category(&mut self) {
        self.current = Category::ALL[(self.current.index() + 1) % Category::ALL.len()];
    }

    pub fn previous_category(&mut self) {
        let len = Category::ALL.len();
        self.current = Category::ALL[(self.current.index() + len - 1) % len];
    }

    pub fn current_board(&self) -> Option<&Leaderboard> {
        self.boards.iter().find(|b| b.category == self.current)
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let mut last_refresh = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = REFRESH_EVERY.saturating_sub(last_refresh.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                    KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => app.next_category(),
                    KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => app.previous_category(),
                    KeyCode::Char('r') => {
                        app.refresh();
                        last_refresh = Instant::now();
                    }
                    KeyCode::Char(c @ '1'..='5') => {
                        let index = c as usize - '1' as usize;
                        app.current = Category::ALL[index];
                    }
                    _ => {}
                }
            }
        }

        if last_refresh.elapsed() >= REFRESH_EVERY {
            app.refresh();
            last_refresh = Instant::now();
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Category tabs
            Constraint::Min(0),    // Podium
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_podium(f, chunks[1], app);
    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, category) in Category::ALL.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *category == app.current {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(category.label(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Entries: {}", app.entry_count),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Rgb(255, 117, 24)))
            .title(" 🎃 Costume Contest "),
    );

    f.render_widget(header, area);
}

fn render_podium(f: &mut Frame, area: Rect, app: &App) {
    let header_cells = ["", "Costume", "Submitted by", "Votes"].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let entries = app.current_board().map(|b| b.entries.as_slice()).unwrap_or_default();

    let rows = entries.iter().enumerate().map(|(i, entry)| {
        let medal = MEDALS.get(i).copied().unwrap_or("");
        Row::new(vec![
            Cell::from(medal),
            Cell::from(truncate(&entry.costume_name, 40)),
            Cell::from(truncate(&entry.submitter_name, 30)),
            Cell::from(entry.votes.to_string()).style(Style::default().fg(Color::Green)),
        ])
        .height(1)
    });

    let title = if entries.is_empty() {
        format!(" {} - no entries yet ", app.current)
    } else {
        format!(" {} ", app.current)
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(42),
            Constraint::Length(32),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    );

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let (phase_text, phase_color, deadline) = match app.status.phase {
        Phase::Submitting => ("SUBMISSIONS OPEN", Color::Green, Some(app.status.submission_end)),
        Phase::Voting => ("VOTING OPEN", Color::Yellow, Some(app.status.voting_end)),
        Phase::Closed => ("CLOSED", Color::Red, None),
    };

    let mut status_spans = vec![Span::styled(
        format!(" {} ", phase_text),
        Style::default().fg(phase_color).add_modifier(Modifier::BOLD),
    )];

    if let Some(deadline) = deadline {
        status_spans.push(Span::raw(format!(
            "until {} ",
            deadline.with_timezone(&chrono::Local).format("%H:%M")
        )));
    }

    if let Some(error) = &app.error {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(error.clone(), Style::default().fg(Color::Red)));
    }

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("Tab/1-5", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Category | "));
    status_spans.push(Span::styled("r", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Refresh | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
