use anyhow::Context;
use crossterm::{
    cursor::{Hide, Show},
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::{
    io::{self, stdout, Stdout},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use falling_blocks::{
    app::{Application, Clock, Flow, InputSource, Renderer},
    config::Config,
    game::{Action, Snapshot},
    grid::CellState,
    piece::TetrominoType,
    source::RandomPieceSource,
};

// ============================================================================
// Visual Constants
// ============================================================================

const CELL_WIDTH: u16 = 2;
const BLOCK_CHAR: &str = "██";
const EMPTY_CHAR: &str = "  ";
const INFO_WIDTH: u16 = 14;

/// Without key-release events a held soft drop ends this long after the
/// last repeat.
const SOFT_DROP_GRACE: Duration = Duration::from_millis(150);

// ============================================================================
// Color Mapping
// ============================================================================

const PALETTE: [Color; 7] = [
    Color::Cyan,
    Color::Magenta,
    Color::Rgb(255, 165, 0),
    Color::Blue,
    Color::Green,
    Color::Red,
    Color::Yellow,
];

fn tetromino_color(t: TetrominoType) -> Color {
    PALETTE[t.color_index() as usize]
}

// ============================================================================
// Clock
// ============================================================================

struct TerminalClock {
    start: Instant,
}

impl TerminalClock {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for TerminalClock {
    fn now_millis(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

// ============================================================================
// Input
// ============================================================================

struct TerminalInput {
    /// Set while soft drop is held; `None` when released.
    soft_drop_until: Option<Instant>,
    reports_release: bool,
}

impl TerminalInput {
    fn new(reports_release: bool) -> Self {
        Self {
            soft_drop_until: None,
            reports_release,
        }
    }

    fn handle_key(&mut self, key: KeyEvent, actions: &mut Vec<Action>) -> Flow {
        let is_soft_drop_key = matches!(
            key.code,
            KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S')
        );

        if key.kind == KeyEventKind::Release {
            if is_soft_drop_key && self.soft_drop_until.take().is_some() {
                actions.push(Action::SoftDropStop);
            }
            return Flow::Continue;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => return Flow::Quit,
            KeyCode::Char('r') | KeyCode::Char('R') => return Flow::Restart,
            KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => {
                actions.push(Action::MoveLeft);
            }
            KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => {
                actions.push(Action::MoveRight);
            }
            KeyCode::Up
            | KeyCode::Char('w')
            | KeyCode::Char('W')
            | KeyCode::Char('x')
            | KeyCode::Char('X') => {
                actions.push(Action::Rotate);
            }
            KeyCode::Char(' ') => {
                actions.push(Action::HardDrop);
            }
            _ if is_soft_drop_key => {
                if self.soft_drop_until.is_none() {
                    actions.push(Action::SoftDropStart);
                }
                self.soft_drop_until = Some(Instant::now() + SOFT_DROP_GRACE);
            }
            _ => {}
        }
        Flow::Continue
    }
}

impl InputSource for TerminalInput {
    fn poll(&mut self, budget: Duration, actions: &mut Vec<Action>) -> io::Result<Flow> {
        let deadline = Instant::now() + budget;
        let mut flow = Flow::Continue;

        loop {
            let timeout = deadline.saturating_duration_since(Instant::now());
            if !event::poll(timeout)? {
                break;
            }
            if let Event::Key(key) = event::read()? {
                match self.handle_key(key, actions) {
                    Flow::Quit => return Ok(Flow::Quit),
                    Flow::Restart => flow = Flow::Restart,
                    Flow::Continue => {}
                }
            }
        }

        if !self.reports_release {
            if let Some(until) = self.soft_drop_until {
                if Instant::now() >= until {
                    self.soft_drop_until = None;
                    actions.push(Action::SoftDropStop);
                }
            }
        }

        Ok(flow)
    }
}

// ============================================================================
// Rendering
// ============================================================================

struct TerminalRenderer {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalRenderer {
    fn new() -> io::Result<Self> {
        Ok(Self {
            terminal: Terminal::new(CrosstermBackend::new(stdout()))?,
        })
    }
}

impl Renderer for TerminalRenderer {
    fn draw(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        self.terminal.draw(|frame| render(frame, snapshot))?;
        Ok(())
    }
}

fn render(frame: &mut Frame, snapshot: &Snapshot) {
    let area = frame.size();

    render_game(frame, snapshot, area);
    if snapshot.game_over {
        render_game_over(frame, snapshot, area);
    }
}

fn render_game(frame: &mut Frame, snapshot: &Snapshot, area: Rect) {
    let grid_display_width = (snapshot.width as u16 * CELL_WIDTH) + 2;
    let grid_display_height = snapshot.height as u16 + 2;
    let total_width = grid_display_width + INFO_WIDTH + 2;
    let total_height = grid_display_height + 3;

    let main_area = centered_rect(total_width, total_height, area);

    let vertical = Layout::vertical([
        Constraint::Length(grid_display_height),
        Constraint::Fill(1),
    ])
    .split(main_area);

    let game_row = vertical[0];

    // [Grid][Info]
    let horizontal = Layout::horizontal([
        Constraint::Length(grid_display_width),
        Constraint::Length(INFO_WIDTH),
    ])
    .split(game_row);

    render_grid(frame, snapshot, horizontal[0]);
    render_info(frame, snapshot, horizontal[1]);

    let controls_area = Rect {
        x: area.x,
        y: game_row.y + game_row.height,
        width: area.width,
        height: 2,
    };

    if controls_area.y + 1 < area.height {
        let controls = Paragraph::new(vec![Line::from(
            "←→/AD: Move | ↑/W/X: Rotate | ↓/S: Soft drop | Space: Drop | R: Restart | Q: Quit",
        )])
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(controls, controls_area);
    }
}

fn render_grid(frame: &mut Frame, snapshot: &Snapshot, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Blocks ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = snapshot
        .composited()
        .into_iter()
        .map(|row| {
            let spans: Vec<Span> = row
                .into_iter()
                .map(|cell| match cell {
                    CellState::Empty => Span::raw(EMPTY_CHAR),
                    CellState::Filled(kind) => {
                        Span::styled(BLOCK_CHAR, Style::default().fg(tetromino_color(kind)))
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_info(frame: &mut Frame, snapshot: &Snapshot, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Info ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled("Score", Style::default().fg(Color::Yellow))),
        Line::from(format!("{}", snapshot.score)),
        Line::from(""),
        Line::from(Span::styled("Lines", Style::default().fg(Color::Cyan))),
        Line::from(format!("{}", snapshot.lines_cleared)),
    ];

    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(paragraph, inner);
}

fn render_game_over(frame: &mut Frame, snapshot: &Snapshot, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("GAME OVER", Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(format!("Score: {}", snapshot.score)),
        Line::from(format!("Lines: {}", snapshot.lines_cleared)),
        Line::from(""),
        Line::from(Span::styled(
            "R: restart | Q: quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Game Over ")
            .title_alignment(Alignment::Center)
            .style(Style::default().bg(Color::Black)),
    );

    let popup_area = centered_rect(24, 10, area);
    frame.render_widget(paragraph, popup_area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let horizontal = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(width.min(area.width)),
        Constraint::Fill(1),
    ])
    .split(area);

    let vertical = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height.min(area.height)),
        Constraint::Fill(1),
    ])
    .split(horizontal[1]);

    vertical[1]
}

// ============================================================================
// Terminal Setup
// ============================================================================

/// Returns whether key-release events were enabled.
fn enter_terminal() -> io::Result<bool> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?.execute(Hide)?;

    let enhanced = supports_keyboard_enhancement().unwrap_or(false);
    if enhanced {
        stdout().execute(PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::REPORT_EVENT_TYPES,
        ))?;
    }
    Ok(enhanced)
}

fn leave_terminal(enhanced: bool) -> io::Result<()> {
    if enhanced {
        stdout().execute(PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    stdout().execute(Show)?.execute(LeaveAlternateScreen)?;
    Ok(())
}

fn create_log_dir(base: &Path) -> anyhow::Result<PathBuf> {
    let log_dir = base.join("falling-blocks");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    Ok(log_dir)
}

fn init_tracing() -> anyhow::Result<WorkerGuard> {
    let log_dir = create_log_dir(&std::env::temp_dir())?;

    // The terminal is in raw mode, so logs go to a file.
    let file_appender = tracing_appender::rolling::never(&log_dir, "falling-blocks.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("falling_blocks=info")),
        )
        .with_ansi(false)
        .init();

    Ok(guard)
}

// ============================================================================
// Main Loop
// ============================================================================

fn main() -> anyhow::Result<()> {
    let _guard = init_tracing()?;

    let config = Config::load().context("failed to load configuration")?;
    tracing::info!(?config, "configuration loaded");

    let enhanced = enter_terminal().context("failed to set up terminal")?;
    let result = TerminalRenderer::new().and_then(|renderer| {
        let mut app = Application::new(
            config,
            Box::new(RandomPieceSource::new()),
            TerminalClock::new(),
            TerminalInput::new(enhanced),
            renderer,
        );
        app.run()?;
        Ok(app.game().score())
    });

    // Always try to restore the terminal, even if the loop failed.
    let restored = leave_terminal(enhanced);
    let score = result.context("game loop failed")?;
    restored.context("failed to restore terminal")?;

    println!("Final score: {score}");
    Ok(())
}
