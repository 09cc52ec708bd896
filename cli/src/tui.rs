//! TUI drawing canvas using ratatui
//!
//! The canvas is a braille grid: each terminal cell holds 2x4 canvas units.
//! Mouse drags draw locally right away; the points are batched and flushed
//! to the room on the render tick.

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers, MouseButton,
        MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Points},
        Block, Borders, List, ListItem, Paragraph,
    },
    Frame, Terminal,
};
use std::collections::HashMap;
use std::io;
use std::time::Instant;

use crate::client::SketchClient;
use crate::latency::{LatencyProbe, PROBE_INTERVAL};
use crate::messages::{self, Composite, Point, ServerMessage, StylePatch, User};
use crate::reconstruct::{ChunkKind, LocalStroke, StrokeContinuityReconstructor};
use crate::sender::{ChunkBuffer, FLUSH_INTERVAL};
use crate::surface::{parse_hex_color, Rgb, Surface};

/// Brush colors cycled with `c`
pub const PALETTE: [&str; 7] = [
    "#FFFFFF", "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD",
];

const MAX_BRUSH_SIZE: f64 = 32.0;

/// Braille dots per terminal cell
const DOTS_X: u16 = 2;
const DOTS_Y: u16 = 4;

/// What a mouse event means for the local stroke
#[derive(Debug, Clone, Copy, PartialEq)]
enum PointerAction {
    Begin(Point),
    /// Press while a stroke is still open: end it, then start over
    Restart(Point),
    Extend(Point),
    Finish,
    Cursor(Point),
    Ignore,
}

/// Releases end the stroke wherever they happen; everything else needs a
/// point on the canvas.
fn pointer_action(kind: MouseEventKind, at: Option<Point>, stroking: bool) -> PointerAction {
    match (kind, at) {
        (MouseEventKind::Up(MouseButton::Left), _) if stroking => PointerAction::Finish,
        (MouseEventKind::Down(MouseButton::Left), Some(p)) if stroking => PointerAction::Restart(p),
        (MouseEventKind::Down(MouseButton::Left), None) if stroking => PointerAction::Finish,
        (MouseEventKind::Down(MouseButton::Left), Some(p)) => PointerAction::Begin(p),
        (MouseEventKind::Drag(MouseButton::Left), Some(p)) if stroking => PointerAction::Extend(p),
        (MouseEventKind::Moved, Some(p)) => PointerAction::Cursor(p),
        _ => PointerAction::Ignore,
    }
}

/// Application state for TUI
struct App {
    /// The WebSocket client
    client: SketchClient,
    /// Room we are drawing in
    room_id: String,
    /// Current room members
    users: Vec<User>,
    /// Everything drawn so far
    surface: Surface,
    /// Continuity state for remote senders
    remote: StrokeContinuityReconstructor,
    /// Our own in-progress stroke
    local: Option<LocalStroke>,
    /// Points waiting for the next flush
    buffer: ChunkBuffer,
    /// Current brush
    style: messages::Style,
    palette_index: usize,
    probe: LatencyProbe,
    last_probe: Option<Instant>,
    /// Canvas area from the last layout
    canvas_area: Rect,
    /// Should quit
    should_quit: bool,
    /// Status message
    status: String,
}

impl App {
    fn new(client: SketchClient, room_id: String, users: Vec<User>, style: messages::Style) -> Self {
        let palette_index = PALETTE
            .iter()
            .position(|c| c.eq_ignore_ascii_case(&style.color))
            .unwrap_or(0);
        Self {
            client,
            room_id,
            users,
            surface: Surface::new(0, 0),
            remote: StrokeContinuityReconstructor::new(),
            local: None,
            buffer: ChunkBuffer::new(FLUSH_INTERVAL, Instant::now()),
            style,
            palette_index,
            probe: LatencyProbe::new(),
            last_probe: None,
            canvas_area: Rect::default(),
            should_quit: false,
            status: "Connected".to_string(),
        }
    }

    fn tool(&self) -> ChunkKind {
        match self.style.composite {
            Composite::Normal => ChunkKind::Stroke,
            Composite::Erase => ChunkKind::Erase,
        }
    }

    fn handle_server_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::RoomInit { room_id, users, .. } => {
                self.room_id = room_id;
                self.users = users;
                self.remote.reset();
                self.surface.clear();
            }
            ServerMessage::UserJoined { id, user, users } => match (users, user) {
                (Some(users), _) => self.users = users,
                (None, Some(user)) => self.users.push(User {
                    id,
                    name: user.name,
                    color: user.color,
                }),
                (None, None) => {}
            },
            ServerMessage::UserLeft { id, users } => match users {
                Some(users) => self.users = users,
                None => self.users.retain(|u| u.id != id),
            },
            ServerMessage::StrokeChunk { by, points, style } => {
                self.remote
                    .apply_chunk(by, &points, &style, ChunkKind::Stroke, &mut self.surface);
            }
            ServerMessage::EraseChunk { by, points, style } => {
                self.remote
                    .apply_chunk(by, &points, &style, ChunkKind::Erase, &mut self.surface);
            }
            ServerMessage::StrokeEnd { by, .. } => self.remote.end_stroke(by),
            ServerMessage::HistoryApply { entries } => {
                self.surface.replay(&entries);
                self.status = format!("History: {} ops", entries.len());
            }
            ServerMessage::PongLatency => {
                self.probe.on_pong(Instant::now());
            }
            ServerMessage::Cursor { .. } => {}
        }
    }

    fn apply_style(&mut self, patch: StylePatch) {
        self.style.apply(patch);
        self.status = format!(
            "{} {} size {}",
            match self.tool() {
                ChunkKind::Stroke => "Pencil",
                ChunkKind::Erase => "Eraser",
            },
            self.style.color,
            self.style.size
        );
    }

    /// Map a terminal cell to canvas units, if it lies inside the canvas
    fn canvas_point(&self, column: u16, row: u16) -> Option<Point> {
        let inner = inner(self.canvas_area);
        if column < inner.x || row < inner.y || column >= inner.right() || row >= inner.bottom() {
            return None;
        }
        Some(Point::new(
            f64::from((column - inner.x) * DOTS_X) + 1.0,
            f64::from((row - inner.y) * DOTS_Y) + 2.0,
        ))
    }

    async fn handle_mouse(&mut self, mouse: MouseEvent) -> Result<()> {
        let at = self.canvas_point(mouse.column, mouse.row);
        match pointer_action(mouse.kind, at, self.local.is_some()) {
            PointerAction::Begin(p) => self.begin_stroke(p),
            PointerAction::Restart(p) => {
                self.finish_stroke().await?;
                self.begin_stroke(p);
            }
            PointerAction::Extend(p) => {
                if let Some(stroke) = self.local.as_mut() {
                    stroke.add_point(p, &mut self.surface);
                    self.buffer.push(p);
                }
            }
            PointerAction::Finish => self.finish_stroke().await?,
            PointerAction::Cursor(p) => self.client.cursor(p).await?,
            PointerAction::Ignore => {}
        }
        Ok(())
    }

    fn begin_stroke(&mut self, p: Point) {
        let mut stroke = LocalStroke::begin(self.style.clone());
        stroke.add_point(p, &mut self.surface);
        self.local = Some(stroke);
        self.buffer.begin(p);
    }

    async fn finish_stroke(&mut self) -> Result<()> {
        let Some(stroke) = self.local.take() else {
            return Ok(());
        };
        if let Some(tail) = self.buffer.finish() {
            self.client
                .send_chunk(tail, stroke.style().clone(), self.tool())
                .await?;
        }
        self.client.end_stroke().await?;
        Ok(())
    }

    /// Periodic work: flush pending points, send a latency probe
    async fn tick(&mut self, now: Instant) -> Result<()> {
        if let Some(stroke) = &self.local {
            if let Some(points) = self.buffer.poll(now) {
                let style = stroke.style().clone();
                self.client.send_chunk(points, style, self.tool()).await?;
            }
        }

        let due = self
            .last_probe
            .map_or(true, |last| now.duration_since(last) >= PROBE_INTERVAL);
        if due {
            self.probe.start(now);
            self.last_probe = Some(now);
            self.client.ping().await?;
        }
        Ok(())
    }

    async fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        match (code, modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Char('q'), _) => {
                self.should_quit = true;
            }
            (KeyCode::Char('p'), _) => self.apply_style(StylePatch::composite(Composite::Normal)),
            (KeyCode::Char('e'), _) => self.apply_style(StylePatch::composite(Composite::Erase)),
            (KeyCode::Char('c'), _) => {
                self.palette_index = (self.palette_index + 1) % PALETTE.len();
                self.apply_style(StylePatch::color(PALETTE[self.palette_index]));
            }
            (KeyCode::Char('+'), _) | (KeyCode::Char('='), _) => {
                let size = (self.style.size + 1.0).min(MAX_BRUSH_SIZE);
                self.apply_style(StylePatch::size(size));
            }
            (KeyCode::Char('-'), _) => {
                let size = (self.style.size - 1.0).max(1.0);
                self.apply_style(StylePatch::size(size));
            }
            (KeyCode::Char('u'), _) => self.client.undo().await?,
            (KeyCode::Char('r'), _) => self.client.redo().await?,
            _ => {}
        }
        Ok(())
    }
}

/// Run the TUI
pub async fn run(
    client: SketchClient,
    room_id: String,
    users: Vec<User>,
    style: messages::Style,
) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(client, room_id, users, style);
    let result = event_loop(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        let size = terminal.size()?;
        let (canvas_area, _, _) = split(Rect::new(0, 0, size.width, size.height));
        app.canvas_area = canvas_area;
        let inner = inner(canvas_area);
        app.surface.resize(
            usize::from(inner.width * DOTS_X),
            usize::from(inner.height * DOTS_Y),
        );

        terminal.draw(|f| draw_ui(f, app))?;

        // Handle events with timeout
        if event::poll(FLUSH_INTERVAL)? {
            match event::read()? {
                Event::Key(key) => app.handle_key(key.code, key.modifiers).await?,
                Event::Mouse(mouse) => app.handle_mouse(mouse).await?,
                _ => {}
            }
        }

        app.tick(Instant::now()).await?;

        // Check for server messages
        while let Some(msg) = app.client.try_recv() {
            app.handle_server_message(msg);
        }

        if app.should_quit {
            app.finish_stroke().await?;
            return Ok(());
        }
    }
}

fn split(area: Rect) -> (Rect, Rect, Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // Canvas and users
            Constraint::Length(1), // Status bar
        ])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(24)])
        .split(rows[0]);
    (columns[0], columns[1], rows[1])
}

fn inner(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(area)
}

fn rgb(color: Rgb) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}

fn draw_ui(f: &mut Frame, app: &App) {
    let (canvas_area, users_area, status_area) = split(f.area());
    draw_canvas(f, app, canvas_area);
    draw_users(f, app, users_area);
    draw_status(f, app, status_area);
}

fn draw_canvas(f: &mut Frame, app: &App, area: Rect) {
    let width = app.surface.width() as f64;
    let height = app.surface.height() as f64;

    let mut by_color: HashMap<Rgb, Vec<(f64, f64)>> = HashMap::new();
    for (x, y, color) in app.surface.iter_painted() {
        by_color
            .entry(color)
            .or_default()
            .push((x as f64 + 0.5, height - (y as f64 + 0.5)));
    }

    let canvas = Canvas::default()
        .block(
            Block::default()
                .title(format!(" Room: {} ", app.room_id))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White)),
        )
        .marker(Marker::Braille)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            for (color, coords) in &by_color {
                ctx.draw(&Points {
                    coords,
                    color: rgb(*color),
                });
            }
        });

    f.render_widget(canvas, area);
}

fn draw_users(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .users
        .iter()
        .map(|user| {
            let color = parse_hex_color(&user.color).map_or(Color::White, rgb);
            let short_id: String = user.id.to_string().chars().take(4).collect();
            ListItem::new(Line::from(vec![
                Span::styled("● ", Style::default().fg(color)),
                Span::raw(user.name.clone()),
                Span::styled(format!(" ({})", short_id), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(format!(" Users ({}) ", app.users.len()))
            .borders(Borders::ALL),
    );
    f.render_widget(list, area);
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let latency = app
        .probe
        .last()
        .map_or_else(|| "-- ms".to_string(), |rtt| format!("{} ms", rtt.as_millis()));
    let brush_color = parse_hex_color(&app.style.color).map_or(Color::White, rgb);
    let tool = match app.tool() {
        ChunkKind::Stroke => "pencil",
        ChunkKind::Erase => "eraser",
    };

    let status = Paragraph::new(Line::from(vec![
        Span::styled(" ■ ", Style::default().fg(brush_color).add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            "{} {} | {} | {} | p/e tool, c color, +/- size, u/r undo/redo, q quit",
            tool, app.style.size, latency, app.status
        )),
    ]))
    .style(Style::default().fg(Color::White).bg(Color::DarkGray));

    f.render_widget(status, area);
}
