// Terminal client for the SignalTrace backend.
// Usage: signaltrace [--url URL] [--file CAPTURE]

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState, Tabs, Wrap},
    Frame, Terminal,
};
use tracing::{error, info};
use uuid::Uuid;

use signaltrace::config::{load_dotenv, ClientConfig};
use signaltrace::debounce::Debouncer;
use signaltrace::flows::FlowsPane;
use signaltrace::model::RequestStatus;
use signaltrace::notify::{Toast, ToastLevel};
use signaltrace::packets::count_caption;
use signaltrace::session::group_thousands;
use signaltrace::stats::{ChartKind, ChartSeries, ProtocolCategory};
use signaltrace::unanswered::UnansweredPane;
use signaltrace::view_state::ActiveView;
use signaltrace::{HttpBackend, Snapshot, ViewCoordinator};

type Coordinator = ViewCoordinator<HttpBackend>;

const EXPORT_FILE: &str = "packets.csv";

#[derive(Parser, Debug)]
#[command(name = "signaltrace", about = "Browse TCAP/MAP/CAP captures decoded by a SignalTrace server")]
struct Args {
    /// Backend base URL (overrides SIGNALTRACE_URL)
    #[arg(long)]
    url: Option<String>,

    /// Capture to upload on start
    #[arg(long, short)]
    file: Option<PathBuf>,

    /// Log file (the terminal is taken by the UI)
    #[arg(long, env = "SIGNALTRACE_LOG", default_value = "signaltrace.log")]
    log: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Main,
    Sidebar,
}

struct ViewerApp {
    coord: Arc<Coordinator>,
    debouncer: Debouncer,
    mode: InputMode,
    focus: Focus,
    search_input: String,
    path_input: String,
    row_cursor: usize,
    facet_cursor: usize,
    flow_cursor: usize,
    unanswered_cursor: usize,
    detail_scroll: u16,
    // Instance of the session the cursors belong to
    seen_session: Option<Uuid>,
    should_quit: bool,
}

impl ViewerApp {
    fn new(coord: Arc<Coordinator>, config: &ClientConfig) -> Self {
        Self {
            coord,
            debouncer: Debouncer::new(config.search_debounce),
            mode: InputMode::Open,
            focus: Focus::Main,
            search_input: String::new(),
            path_input: String::new(),
            row_cursor: 0,
            facet_cursor: 0,
            flow_cursor: 0,
            unanswered_cursor: 0,
            detail_scroll: 0,
            seen_session: None,
            should_quit: false,
        }
    }

    /// Run a coordinator action in the background; the UI picks up its
    /// result from the next snapshot.
    fn spawn<F, Fut>(&self, action: F)
    where
        F: FnOnce(Arc<Coordinator>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(action(self.coord.clone()));
    }

    fn upload(&mut self, path: PathBuf) {
        self.mode = InputMode::Normal;
        self.spawn(move |coord| async move {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            match tokio::fs::read(&path).await {
                Ok(data) => {
                    // Failures are already reported as toasts
                    let _ = coord.upload(&filename, data).await;
                }
                Err(e) => {
                    error!("Failed to read {}: {}", path.display(), e);
                    coord.notify(Toast::error(format!("Cannot read {}: {}", path.display(), e)));
                }
            }
        });
    }

    fn reset_cursors(&mut self) {
        self.row_cursor = 0;
        self.facet_cursor = 0;
        self.flow_cursor = 0;
        self.unanswered_cursor = 0;
        self.detail_scroll = 0;
        self.search_input.clear();
    }

    fn switch_view(&mut self, view: ActiveView) {
        self.focus = Focus::Main;
        self.spawn(move |coord| async move { coord.switch_view(view).await });
    }

    fn load_page(&mut self, page: u64) {
        self.row_cursor = 0;
        self.spawn(move |coord| async move { coord.load_page(page).await });
    }

    fn set_filter(&mut self, proto: String) {
        self.row_cursor = 0;
        self.detail_scroll = 0;
        self.spawn(move |coord| async move { coord.set_filter(&proto).await });
    }

    fn apply_search(&mut self, text: String) {
        self.row_cursor = 0;
        self.detail_scroll = 0;
        self.spawn(move |coord| async move { coord.apply_search(&text).await });
    }

    fn select_frame(&mut self, frame_num: u64) {
        self.detail_scroll = 0;
        self.spawn(move |coord| async move { coord.select_frame(frame_num).await });
    }

    fn jump_to_frame(&mut self, frame_num: u64) {
        self.detail_scroll = 0;
        self.spawn(move |coord| async move { coord.jump_to_frame(frame_num).await });
    }

    fn handle_key(&mut self, code: KeyCode, snap: &Snapshot) {
        if snap.session.is_none() {
            self.handle_open_key(code, snap);
            return;
        }
        match self.mode {
            InputMode::Open => self.handle_open_key(code, snap),
            InputMode::Search => self.handle_search_key(code),
            InputMode::Normal if self.focus == Focus::Sidebar => self.handle_sidebar_key(code, snap),
            InputMode::Normal => self.handle_main_key(code, snap),
        }
    }

    fn handle_open_key(&mut self, code: KeyCode, snap: &Snapshot) {
        match code {
            KeyCode::Enter => {
                let path = self.path_input.trim().to_string();
                if !path.is_empty() {
                    self.upload(PathBuf::from(path));
                }
            }
            KeyCode::Esc => {
                if snap.session.is_some() {
                    self.mode = InputMode::Normal;
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Backspace => {
                self.path_input.pop();
            }
            KeyCode::Char(c) => self.path_input.push(c),
            _ => {}
        }
    }

    fn handle_search_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter => {
                self.debouncer.cancel();
                self.mode = InputMode::Normal;
                self.apply_search(self.search_input.clone());
            }
            KeyCode::Esc => {
                // The abandoned text must not be applied later
                self.debouncer.cancel();
                self.mode = InputMode::Normal;
            }
            KeyCode::Backspace => {
                self.search_input.pop();
                self.debouncer.keystroke(self.search_input.clone());
            }
            KeyCode::Char(c) => {
                self.search_input.push(c);
                self.debouncer.keystroke(self.search_input.clone());
            }
            _ => {}
        }
    }

    fn handle_sidebar_key(&mut self, code: KeyCode, snap: &Snapshot) {
        // Entry 0 is "All Packets"
        let entries = snap.facets.len() + 1;
        match code {
            KeyCode::Up | KeyCode::Char('k') => self.facet_cursor = self.facet_cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.facet_cursor = (self.facet_cursor + 1).min(entries - 1);
            }
            KeyCode::Enter => {
                let proto = match self.facet_cursor {
                    0 => String::new(),
                    i => snap.facets.get(i - 1).map(|f| f.proto.clone()).unwrap_or_default(),
                };
                self.focus = Focus::Main;
                self.set_filter(proto);
            }
            KeyCode::Esc | KeyCode::Char('f') | KeyCode::Tab => self.focus = Focus::Main,
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_main_key(&mut self, code: KeyCode, snap: &Snapshot) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.switch_view(snap.view.view().next()),
            KeyCode::Char('1') => self.switch_view(ActiveView::Packets),
            KeyCode::Char('2') => self.switch_view(ActiveView::Flows),
            KeyCode::Char('3') => self.switch_view(ActiveView::Unanswered),
            KeyCode::Char('4') => self.switch_view(ActiveView::Stats),
            KeyCode::Char('n') => {
                self.debouncer.cancel();
                self.coord.end_session();
                self.path_input.clear();
            }
            KeyCode::Char('o') => self.mode = InputMode::Open,
            _ => match snap.view.view() {
                ActiveView::Packets => self.handle_packets_key(code, snap),
                ActiveView::Flows => self.handle_flows_key(code, snap),
                ActiveView::Unanswered => self.handle_unanswered_key(code, snap),
                ActiveView::Stats => {}
            },
        }
    }

    fn handle_packets_key(&mut self, code: KeyCode, snap: &Snapshot) {
        let rows = snap.table.as_ref().map(|t| t.rows.len()).unwrap_or(0);
        let pagination = snap.table.as_ref().map(|t| t.pagination);
        match code {
            KeyCode::Up | KeyCode::Char('k') => self.row_cursor = self.row_cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.row_cursor = (self.row_cursor + 1).min(rows.saturating_sub(1));
            }
            KeyCode::Enter => {
                let frame = snap
                    .table
                    .as_ref()
                    .and_then(|t| t.rows.get(self.row_cursor))
                    .map(|r| r.frame_num);
                if let Some(frame) = frame {
                    self.select_frame(frame);
                }
            }
            KeyCode::Esc => {
                self.detail_scroll = 0;
                self.coord.close_detail();
            }
            KeyCode::Right | KeyCode::PageDown => {
                if let Some(next) = pagination.and_then(|p| p.next()) {
                    self.load_page(next);
                }
            }
            KeyCode::Left | KeyCode::PageUp => {
                if let Some(prev) = pagination.and_then(|p| p.prev()) {
                    self.load_page(prev);
                }
            }
            KeyCode::Home => self.load_page(0),
            KeyCode::End => {
                if let Some(p) = pagination {
                    self.load_page(p.last());
                }
            }
            KeyCode::Char('J') => self.detail_scroll = self.detail_scroll.saturating_add(1),
            KeyCode::Char('K') => self.detail_scroll = self.detail_scroll.saturating_sub(1),
            KeyCode::Char('/') => {
                self.search_input = snap.view.search().to_string();
                self.mode = InputMode::Search;
            }
            KeyCode::Char('f') => self.focus = Focus::Sidebar,
            KeyCode::Char('e') => {
                if let Err(e) = self.coord.export_page(Path::new(EXPORT_FILE)) {
                    error!("Export failed: {}", e);
                }
            }
            _ => {}
        }
    }

    fn handle_flows_key(&mut self, code: KeyCode, snap: &Snapshot) {
        let arrows: Vec<u64> = match &snap.flows {
            FlowsPane::Ready(flows) => flows
                .iter()
                .flat_map(|f| f.arrows.iter().map(|a| a.frame_num))
                .collect(),
            _ => Vec::new(),
        };
        match code {
            KeyCode::Up | KeyCode::Char('k') => self.flow_cursor = self.flow_cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.flow_cursor = (self.flow_cursor + 1).min(arrows.len().saturating_sub(1));
            }
            KeyCode::Enter => {
                if let Some(frame) = arrows.get(self.flow_cursor).copied() {
                    self.jump_to_frame(frame);
                }
            }
            _ => {}
        }
    }

    fn handle_unanswered_key(&mut self, code: KeyCode, snap: &Snapshot) {
        let frames: Vec<u64> = match &snap.unanswered {
            UnansweredPane::Ready { rows, .. } => rows.iter().map(|r| r.frame_num).collect(),
            _ => Vec::new(),
        };
        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.unanswered_cursor = self.unanswered_cursor.saturating_sub(1)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.unanswered_cursor = (self.unanswered_cursor + 1).min(frames.len().saturating_sub(1));
            }
            KeyCode::Enter => {
                if let Some(frame) = frames.get(self.unanswered_cursor).copied() {
                    self.jump_to_frame(frame);
                }
            }
            _ => {}
        }
    }
}

fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();
    init_logging(&args.log)?;

    // .env is already loaded so that clap sees it too
    let mut config =
        ClientConfig::from_lookup(|key| std::env::var(key).ok()).context("Invalid configuration")?;
    if let Some(url) = args.url {
        config = config.with_base_url(url);
    }
    info!("Starting SignalTrace viewer against {}", config.base_url);

    let backend = HttpBackend::connect(&config).context("Failed to build HTTP client")?;
    let coord = Arc::new(ViewCoordinator::new(backend, &config));
    let mut app = ViewerApp::new(coord, &config);
    if let Some(path) = args.file {
        app.upload(path);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    result
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut ViewerApp) -> Result<()> {
    while !app.should_quit {
        if let Some(text) = app.debouncer.try_settled() {
            app.apply_search(text);
        }

        let snap = app.coord.snapshot();
        let live = snap.session.as_ref().map(|s| s.instance());
        if live != app.seen_session {
            app.seen_session = live;
            app.reset_cursors();
            app.mode = if live.is_some() { InputMode::Normal } else { InputMode::Open };
        }
        terminal.draw(|f| ui(f, app, &snap))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code, &snap);
                }
            }
        }
    }
    Ok(())
}

fn ui(f: &mut Frame, app: &ViewerApp, snap: &Snapshot) {
    if snap.session.is_none() || app.mode == InputMode::Open {
        render_upload_screen(f, app, snap);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header + tabs
            Constraint::Min(0),    // Body
            Constraint::Length(3), // Status
        ])
        .split(f.size());

    render_header(f, chunks[0], snap);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(26), Constraint::Min(0)])
        .split(chunks[1]);
    render_sidebar(f, body[0], app, snap);

    match snap.view.view() {
        ActiveView::Packets => render_packets(f, body[1], app, snap),
        ActiveView::Flows => render_flows(f, body[1], app, snap),
        ActiveView::Unanswered => render_unanswered(f, body[1], app, snap),
        ActiveView::Stats => render_stats(f, body[1], snap),
    }

    render_status(f, chunks[2], app, snap);
}

fn render_upload_screen(f: &mut Frame, app: &ViewerApp, snap: &Snapshot) {
    let area = centered(f.size(), 70, 9);
    let mut lines = vec![
        Line::from(Span::styled(
            "SignalTrace",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from("Capture to upload (.pcap, .pcapng or tshark JSON):"),
        Line::from(Span::styled(
            format!("> {}", app.path_input),
            Style::default().fg(Color::Yellow),
        )),
        Line::from(""),
    ];
    if snap.uploading {
        lines.push(Line::from(Span::styled("Uploading and decoding...", Style::default().fg(Color::Cyan))));
    } else if let Some(toast) = &snap.toast {
        lines.push(Line::from(Span::styled(toast.message.clone(), toast_style(toast))));
    } else {
        lines.push(Line::from("Enter: upload  Esc: back/quit"));
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Open Capture"))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
    f.set_cursor(area.x + 3 + app.path_input.chars().count() as u16, area.y + 3);
}

fn render_header(f: &mut Frame, area: Rect, snap: &Snapshot) {
    let caption = snap
        .session
        .as_ref()
        .map(|s| format!("{}  ·  loaded {}", s.caption(), s.loaded_at().format("%H:%M:%S UTC")))
        .unwrap_or_else(|| "No file loaded".to_string());
    let titles: Vec<Line> = ActiveView::ALL
        .iter()
        .enumerate()
        .map(|(i, v)| Line::from(format!("{} {}", i + 1, v.title())))
        .collect();
    let selected = ActiveView::ALL
        .iter()
        .position(|v| *v == snap.view.view())
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .block(Block::default().borders(Borders::ALL).title(caption))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, area);
}

fn render_sidebar(f: &mut Frame, area: Rect, app: &ViewerApp, snap: &Snapshot) {
    let total = snap.session.as_ref().map(|s| s.total_packets()).unwrap_or(0);
    let active = snap.view.proto();

    let mut items = vec![facet_item("All Packets", total, Color::White, active.is_empty())];
    items.extend(snap.facets.iter().map(|facet| {
        facet_item(
            &facet.label,
            facet.count,
            category_color(facet.category),
            facet.proto.eq_ignore_ascii_case(active),
        )
    }));

    let mut state = ListState::default();
    if app.focus == Focus::Sidebar {
        state.select(Some(app.facet_cursor));
    }
    let border = if app.focus == Focus::Sidebar { Color::Yellow } else { Color::Reset };
    let title = if snap.stats_loading { "Protocols (loading)" } else { "Protocols" };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title).border_style(Style::default().fg(border)))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, area, &mut state);
}

fn facet_item(label: &str, count: u64, color: Color, active: bool) -> ListItem<'static> {
    let mut style = Style::default();
    if active {
        style = style.add_modifier(Modifier::BOLD);
    }
    ListItem::new(Line::from(vec![
        Span::styled("● ", Style::default().fg(color)),
        Span::styled(format!("{:<14}", label), style),
        Span::styled(group_thousands(count), Style::default().fg(Color::DarkGray)),
    ]))
}

fn category_color(category: ProtocolCategory) -> Color {
    match category {
        ProtocolCategory::GsmMap => Color::Magenta,
        ProtocolCategory::Cap => Color::Green,
        ProtocolCategory::Tcap => Color::Cyan,
        ProtocolCategory::Sccp => Color::Yellow,
        ProtocolCategory::M3ua => Color::Blue,
        ProtocolCategory::Other => Color::Gray,
    }
}

fn render_packets(f: &mut Frame, area: Rect, app: &ViewerApp, snap: &Snapshot) {
    let detail_open = snap.view.selected_frame().is_some();
    let columns = if detail_open {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area)
    } else {
        Layout::default()
            .constraints([Constraint::Min(0)])
            .split(area)
    };

    let table_area = match snap.table.as_ref().map(|t| t.pagination) {
        Some(p) if p.visible() => {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(1)])
                .split(columns[0]);
            let nav = format!(
                "{}{}{}",
                if p.has_prev() { "← " } else { "  " },
                p.label(),
                if p.has_next() { " →" } else { "" }
            );
            f.render_widget(Paragraph::new(nav).style(Style::default().fg(Color::DarkGray)), parts[1]);
            parts[0]
        }
        _ => columns[0],
    };

    let mut title = match &snap.table {
        Some(table) => count_caption(table.total, snap.view.proto()),
        None => "Packets".to_string(),
    };
    if !snap.view.search().is_empty() {
        title.push_str(&format!(" matching \"{}\"", snap.view.search()));
    }
    if snap.page_loading {
        title.push_str(" (loading)");
    }

    let rows: Vec<Row> = snap
        .table
        .as_ref()
        .map(|t| {
            t.rows
                .iter()
                .map(|r| {
                    let style = if snap.view.selected_frame() == Some(r.frame_num) {
                        Style::default().fg(Color::Yellow)
                    } else {
                        Style::default()
                    };
                    Row::new(vec![
                        Cell::from(r.frame_num.to_string()),
                        Cell::from(r.time.clone()),
                        Cell::from(r.src.clone()),
                        Cell::from(r.dst.clone()),
                        Cell::from(r.protocol.clone()),
                        Cell::from(r.length.clone()),
                        Cell::from(r.info.clone()),
                    ])
                    .style(style)
                })
                .collect()
        })
        .unwrap_or_default();

    let header = Row::new(vec!["Frame", "Time", "Source", "Destination", "Proto", "Len", "Info"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let widths = [
        Constraint::Length(7),
        Constraint::Length(12),
        Constraint::Length(16),
        Constraint::Length(16),
        Constraint::Length(8),
        Constraint::Length(5),
        Constraint::Min(10),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    if snap.table.as_ref().is_some_and(|t| !t.rows.is_empty()) {
        state.select(Some(app.row_cursor));
    }
    f.render_stateful_widget(table, table_area, &mut state);

    if detail_open {
        render_detail(f, columns[1], app, snap);
    }
}

fn render_detail(f: &mut Frame, area: Rect, app: &ViewerApp, snap: &Snapshot) {
    let Some(detail) = &snap.detail else {
        let text = if snap.detail_loading { "Loading..." } else { "No detail" };
        let empty = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Packet Detail"));
        f.render_widget(empty, area);
        return;
    };

    let bold = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();
    for section in &detail.sections {
        lines.push(Line::from(Span::styled(section.title, bold)));
        for (label, value) in &section.rows {
            lines.push(Line::from(vec![
                Span::styled(format!("  {}: ", label), Style::default().fg(Color::DarkGray)),
                Span::raw(value.clone()),
            ]));
        }
        lines.push(Line::from(""));
    }
    if !detail.layers.is_empty() {
        lines.push(Line::from(Span::styled("Layers", bold)));
        for layer in &detail.layers {
            lines.push(Line::from(format!("  ▸ {}", layer.name)));
            for (name, value) in &layer.fields {
                lines.push(Line::from(vec![
                    Span::styled(format!("      {}: ", name), Style::default().fg(Color::DarkGray)),
                    Span::raw(value.clone()),
                ]));
            }
        }
    }

    let mut title = detail.title.clone();
    if snap.detail_loading {
        title.push_str(" (loading)");
    }
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));
    f.render_widget(paragraph, area);
}

fn render_flows(f: &mut Frame, area: Rect, app: &ViewerApp, snap: &Snapshot) {
    let block = Block::default().borders(Borders::ALL);
    let flows = match &snap.flows {
        FlowsPane::Loading => {
            f.render_widget(Paragraph::new("Loading flows...").block(block.title("Flows")), area);
            return;
        }
        FlowsPane::Failed(msg) => {
            let p = Paragraph::new(format!("Failed to load flows: {}", msg))
                .style(Style::default().fg(Color::Red))
                .block(block.title("Flows"));
            f.render_widget(p, area);
            return;
        }
        FlowsPane::Empty => {
            f.render_widget(Paragraph::new("No TCAP transactions found.").block(block.title("Flows")), area);
            return;
        }
        FlowsPane::Ready(flows) => flows,
    };

    let mut items = Vec::new();
    let mut selected = None;
    let mut arrow_index = 0;
    for flow in flows {
        let dtid = flow.dtid.as_deref().map(|d| format!(" → DTID {}", d)).unwrap_or_default();
        items.push(ListItem::new(Line::from(Span::styled(
            format!("OTID {}{}  ({} messages)", flow.otid, dtid, flow.message_count),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))));
        for arrow in &flow.arrows {
            if arrow_index == app.flow_cursor {
                selected = Some(items.len());
            }
            arrow_index += 1;
            items.push(ListItem::new(format!(
                "  {:>12}  {:>15} ──▶ {:<15}  {}  #{}",
                arrow.time, arrow.from, arrow.to, arrow.label, arrow.frame_num
            )));
        }
    }

    let mut state = ListState::default();
    state.select(selected);
    let list = List::new(items)
        .block(block.title(format!("Flows ({})", flows.len())))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_unanswered(f: &mut Frame, area: Rect, app: &ViewerApp, snap: &Snapshot) {
    let block = Block::default().borders(Borders::ALL);
    let (rows, summary) = match &snap.unanswered {
        UnansweredPane::Loading => {
            f.render_widget(Paragraph::new("Loading...").block(block.title("Unanswered")), area);
            return;
        }
        UnansweredPane::Failed(msg) => {
            let p = Paragraph::new(format!("Failed to load unanswered requests: {}", msg))
                .style(Style::default().fg(Color::Red))
                .block(block.title("Unanswered"));
            f.render_widget(p, area);
            return;
        }
        UnansweredPane::AllAnswered => {
            let p = Paragraph::new("All requests were answered.")
                .style(Style::default().fg(Color::Green))
                .block(block.title("Unanswered"));
            f.render_widget(p, area);
            return;
        }
        UnansweredPane::Ready { rows, summary } => (rows, summary),
    };

    let table_rows: Vec<Row> = rows
        .iter()
        .map(|r| {
            let status_color = match r.status {
                RequestStatus::ErrorResponse => Color::Red,
                RequestStatus::MissingResponse => Color::Yellow,
            };
            Row::new(vec![
                Cell::from(r.frame_num.to_string()),
                Cell::from(r.time.clone()),
                Cell::from(r.src.clone()),
                Cell::from(r.dst.clone()),
                Cell::from(r.operation.clone()),
                Cell::from(r.status_label).style(Style::default().fg(status_color)),
                Cell::from(r.imsi.clone()),
                Cell::from(r.msisdn.clone()),
                Cell::from(r.response_frame.clone()),
            ])
        })
        .collect();

    let header = Row::new(vec!["Frame", "Time", "Source", "Destination", "Operation", "Status", "IMSI", "MSISDN", "Resp"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let widths = [
        Constraint::Length(7),
        Constraint::Length(12),
        Constraint::Length(16),
        Constraint::Length(16),
        Constraint::Min(16),
        Constraint::Length(12),
        Constraint::Length(16),
        Constraint::Length(14),
        Constraint::Length(6),
    ];
    let table = Table::new(table_rows, widths)
        .header(header)
        .block(block.title(summary.clone()))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    state.select(Some(app.unanswered_cursor));
    f.render_stateful_widget(table, area, &mut state);
}

fn render_stats(f: &mut Frame, area: Rect, snap: &Snapshot) {
    if snap.charts.is_empty() {
        let text = if snap.stats_loading { "Loading stats..." } else { "No statistics available" };
        f.render_widget(Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Stats")), area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let cells: Vec<Rect> = rows
        .iter()
        .flat_map(|row| {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(*row)
                .to_vec()
        })
        .collect();

    for (series, cell) in snap.charts.iter().zip(cells) {
        match series.kind {
            ChartKind::Doughnut => render_share_chart(f, cell, series),
            ChartKind::Bar => render_bar_chart(f, cell, series),
        }
    }
}

/// Proportions as labelled percentage bars.
fn render_share_chart(f: &mut Frame, area: Rect, series: &ChartSeries) {
    let total: u64 = series.points.iter().map(|(_, v)| *v).sum();
    let bar_room = area.width.saturating_sub(32) as u64;
    let lines: Vec<Line> = series
        .points
        .iter()
        .map(|(label, value)| {
            let share = if total == 0 { 0.0 } else { *value as f64 / total as f64 };
            let bar = "█".repeat((share * bar_room as f64).round() as usize);
            Line::from(vec![
                Span::raw(format!("{:<14} ", label)),
                Span::styled(bar, Style::default().fg(Color::Cyan)),
                Span::raw(format!(" {:.1}% ({})", share * 100.0, value)),
            ])
        })
        .collect();
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(series.id.title()));
    f.render_widget(paragraph, area);
}

fn render_bar_chart(f: &mut Frame, area: Rect, series: &ChartSeries) {
    let data: Vec<(&str, u64)> = series.points.iter().map(|(l, v)| (l.as_str(), *v)).collect();
    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(series.id.title()))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .max(series.max())
        .bar_style(Style::default().fg(Color::Magenta))
        .value_style(Style::default().fg(Color::White))
        .data(data.as_slice());
    f.render_widget(chart, area);
}

fn render_status(f: &mut Frame, area: Rect, app: &ViewerApp, snap: &Snapshot) {
    let line = if app.mode == InputMode::Search {
        Line::from(vec![
            Span::styled("Search: ", Style::default().fg(Color::Yellow)),
            Span::raw(app.search_input.clone()),
        ])
    } else if let Some(toast) = &snap.toast {
        Line::from(Span::styled(toast.message.clone(), toast_style(toast)))
    } else {
        Line::from(Span::styled(
            "Tab/1-4: views  ↑↓/jk: move  Enter: open  Esc: close  ←→: page  /: search  f: filters  e: export  n: new file  q: quit",
            Style::default().fg(Color::DarkGray),
        ))
    };

    let paragraph = Paragraph::new(line)
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
    if app.mode == InputMode::Search {
        f.set_cursor(area.x + 9 + app.search_input.chars().count() as u16, area.y + 1);
    }
}

fn toast_style(toast: &Toast) -> Style {
    match toast.level {
        ToastLevel::Info => Style::default().fg(Color::Green),
        ToastLevel::Error => Style::default().fg(Color::Red),
        ToastLevel::Actionable => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
