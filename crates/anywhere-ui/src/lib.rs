use anyhow::Result;
use anywhere_backend::ProxyBackend;
use anywhere_core::{ProxyResult, SessionPhase, UiConfig};
use anywhere_session::{Applied, Session, SessionDriver, SessionView};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io;
use std::time::{Duration, Instant};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
const PAGE_LINES: u16 = 10;

/// RAII guard that restores the terminal on drop (including panics).
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = crossterm::execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    }
}

/// What a key press asks the browser to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Insert(char),
    Backspace,
    Submit,
    HighlightNext,
    HighlightPrevious,
    Blur,
    ToggleEnhanced,
    ToggleStrategy,
    Clear,
    ScrollUp,
    ScrollDown,
    Quit,
}

pub fn map_key(key: KeyEvent) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let action = match key.code {
        KeyCode::Char('c') if ctrl => KeyAction::Quit,
        KeyCode::Char('e') if ctrl => KeyAction::ToggleEnhanced,
        KeyCode::Char('t') if ctrl => KeyAction::ToggleStrategy,
        KeyCode::Char('l') if ctrl => KeyAction::Clear,
        KeyCode::Char(_) if ctrl => return None,
        KeyCode::Char(ch) => KeyAction::Insert(ch),
        KeyCode::Backspace => KeyAction::Backspace,
        KeyCode::Enter => KeyAction::Submit,
        KeyCode::Down => KeyAction::HighlightNext,
        KeyCode::Up => KeyAction::HighlightPrevious,
        KeyCode::Esc => KeyAction::Blur,
        KeyCode::PageUp => KeyAction::ScrollUp,
        KeyCode::PageDown => KeyAction::ScrollDown,
        _ => return None,
    };
    Some(action)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// View-only state kept beside the session: scroll, spinner, info line.
#[derive(Debug, Clone)]
pub struct BrowserShell {
    pub info_line: String,
    pub scroll: u16,
    pub stale_dropped: usize,
    pub max_visible: usize,
    tick_ms: u64,
    reduced_motion: bool,
    spinner_tick: usize,
}

impl BrowserShell {
    pub fn new(ui: &UiConfig, max_visible: usize) -> Self {
        Self {
            info_line: " Enter open | Up/Down suggestions | Ctrl+E enhanced | Ctrl+T smart/direct | Ctrl+L clear | Ctrl+C exit".to_string(),
            scroll: 0,
            stale_dropped: 0,
            max_visible: max_visible.max(1),
            tick_ms: ui.tick_ms.max(10),
            reduced_motion: ui.reduced_motion,
            spinner_tick: 0,
        }
    }

    fn spinner(&self) -> &'static str {
        if self.reduced_motion {
            "*"
        } else {
            SPINNER[self.spinner_tick % SPINNER.len()]
        }
    }

    pub fn note_applied(&mut self, applied: Applied) {
        match applied {
            Applied::Content => {
                self.scroll = 0;
                self.info_line = "loaded".to_string();
            }
            Applied::Error => self.info_line = "request failed".to_string(),
            Applied::Stale => self.stale_dropped += 1,
            Applied::Suggestions | Applied::SuggestionsFailed => {}
        }
    }
}

/// Apply one key action to the session. Effects go straight to the driver.
pub fn handle_action<B: ProxyBackend + 'static>(
    session: &mut Session,
    driver: &mut SessionDriver<B>,
    shell: &mut BrowserShell,
    action: KeyAction,
    now: Instant,
) -> Flow {
    match action {
        KeyAction::Quit => return Flow::Quit,
        KeyAction::Insert(ch) => {
            let mut text = session.input().to_string();
            text.push(ch);
            session.focus();
            session.edit(text, now);
        }
        KeyAction::Backspace => {
            let mut text = session.input().to_string();
            if text.pop().is_some() {
                session.focus();
                session.edit(text, now);
            }
        }
        KeyAction::Submit => {
            if session.accept_highlighted() {
                shell.info_line = format!("selected '{}'", session.input());
            } else if let Some(effect) = session.submit() {
                driver.run(effect);
                shell.scroll = 0;
                shell.info_line = format!("opening {}", session.input().trim());
            } else if session.phase() == SessionPhase::Loading {
                shell.info_line = "already loading".to_string();
            } else {
                shell.info_line = "type an address or a search".to_string();
            }
        }
        KeyAction::HighlightNext | KeyAction::HighlightPrevious => {
            if !session.suggestions_visible() && !session.suggestions().is_empty() {
                session.focus();
            }
            if action == KeyAction::HighlightNext {
                session.highlight_next();
            } else {
                session.highlight_previous();
            }
        }
        KeyAction::Blur => session.blur(now),
        KeyAction::ToggleEnhanced => {
            let mode = session.settings().mode.toggled();
            session.set_mode(mode);
            shell.info_line = format!("proxy mode: {mode}");
        }
        KeyAction::ToggleStrategy => {
            let strategy = session.settings().strategy.toggled();
            session.set_strategy(strategy);
            shell.info_line = format!("dispatch: {strategy}");
        }
        KeyAction::Clear => {
            driver.clear(session);
            shell.scroll = 0;
            shell.info_line = "cleared".to_string();
        }
        KeyAction::ScrollUp => shell.scroll = shell.scroll.saturating_sub(PAGE_LINES),
        KeyAction::ScrollDown => shell.scroll = shell.scroll.saturating_add(PAGE_LINES),
    }
    Flow::Continue
}

/// Dropdown rows with the viewport centered on the highlight.
pub fn dropdown_lines(items: &[String], highlighted: Option<usize>, max_lines: usize) -> Vec<String> {
    let total = items.len();
    if total == 0 || max_lines == 0 {
        return Vec::new();
    }
    let show = total.min(max_lines);
    let selected = highlighted.unwrap_or(0).min(total - 1);
    let half = show / 2;
    let start = if selected <= half {
        0
    } else if selected + half >= total {
        total.saturating_sub(show)
    } else {
        selected - half
    };
    let end = (start + show).min(total);

    (start..end)
        .map(|i| {
            let marker = if Some(i) == highlighted { ">" } else { " " };
            format!("{marker} {}", items[i])
        })
        .collect()
}

/// Text for the content pane. Content bodies are shown as received.
pub fn content_lines(result: &ProxyResult) -> Vec<String> {
    match result {
        ProxyResult::Empty => vec![
            "Type a website (reddit.com) or a search (best pizza near me) and press Enter."
                .to_string(),
        ],
        ProxyResult::Loading => vec!["Loading...".to_string()],
        ProxyResult::Content { html, .. } => html.lines().map(ToString::to_string).collect(),
        ProxyResult::Error { message } => vec![format!("Error: {message}")],
    }
}

pub fn render_statusline(view: &SessionView) -> String {
    format!(
        "{} | {} -> {} | mode={} strategy={}",
        view.phase, view.classification, view.endpoint, view.mode, view.strategy
    )
}

/// Keep the tail of `text` that fits in `width` columns.
pub fn tail_to_width(text: &str, width: usize) -> &str {
    if text.width() <= width {
        return text;
    }
    let mut used = 0;
    let mut start = text.len();
    for (idx, ch) in text.char_indices().rev() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        start = idx;
    }
    &text[start..]
}

/// Run the interactive browser until the user quits.
pub fn run_browser<B: ProxyBackend + 'static>(
    session: &mut Session,
    driver: &mut SessionDriver<B>,
    shell: &mut BrowserShell,
) -> Result<()> {
    enable_raw_mode()?;
    let _guard = TerminalGuard;
    crossterm::execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    loop {
        for applied in driver.pump(session) {
            shell.note_applied(applied);
        }
        driver.run_all(session.tick(Instant::now()));
        shell.spinner_tick = shell.spinner_tick.wrapping_add(1);

        let view = session.view();
        terminal.draw(|frame| draw(frame, &view, shell))?;

        if !event::poll(Duration::from_millis(shell.tick_ms))? {
            continue;
        }
        let action = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => map_key(key),
            Event::Paste(pasted) => {
                let text = format!("{}{}", session.input(), pasted.replace(['\r', '\n'], " "));
                session.focus();
                session.edit(text, Instant::now());
                None
            }
            _ => None,
        };
        let Some(action) = action else {
            continue;
        };
        if handle_action(session, driver, shell, action, Instant::now()) == Flow::Quit {
            break;
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, view: &SessionView, shell: &BrowserShell) {
    let area = frame.area();
    if area.width < 10 || area.height < 5 {
        return;
    }
    let rows = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .split(area);
    let (input_area, content_area, status_area) = (rows[0], rows[1], rows[2]);

    let title = format!(" AccessAnywhere [{}] ", view.classification);
    let inner_width = usize::from(input_area.width.saturating_sub(2));
    let shown = tail_to_width(&view.input, inner_width.saturating_sub(1));
    frame.render_widget(
        Paragraph::new(shown.to_string()).block(
            Block::bordered()
                .title(title)
                .border_style(Style::default().fg(Color::Cyan)),
        ),
        input_area,
    );
    let cursor_x = input_area.x + 1 + u16::try_from(shown.width()).unwrap_or(0);
    frame.set_cursor_position((cursor_x, input_area.y + 1));

    let content_style = match &view.result {
        ProxyResult::Error { .. } => Style::default().fg(Color::Red),
        ProxyResult::Empty => Style::default().fg(Color::DarkGray),
        _ => Style::default(),
    };
    let content_title = match &view.result {
        ProxyResult::Content { source_input, .. } => format!(" {source_input} "),
        ProxyResult::Loading => format!(" {} loading ", shell.spinner()),
        _ => String::new(),
    };
    let lines: Vec<Line> = content_lines(&view.result)
        .into_iter()
        .map(Line::from)
        .collect();
    frame.render_widget(
        Paragraph::new(lines)
            .style(content_style)
            .wrap(Wrap { trim: false })
            .scroll((shell.scroll, 0))
            .block(Block::bordered().title(content_title)),
        content_area,
    );

    if view.suggestions_visible {
        draw_dropdown(frame, view, shell, input_area, content_area);
    }

    let mut status = vec![Span::styled(
        render_statusline(view),
        Style::default()
            .fg(Color::Black)
            .bg(Color::Gray)
            .add_modifier(Modifier::BOLD),
    )];
    status.push(Span::raw(format!(" {}", shell.info_line)));
    frame.render_widget(Paragraph::new(Line::from(status)), status_area);
}

fn draw_dropdown(
    frame: &mut Frame,
    view: &SessionView,
    shell: &BrowserShell,
    input_area: Rect,
    content_area: Rect,
) {
    let lines = dropdown_lines(&view.suggestions, view.highlighted, shell.max_visible);
    if lines.is_empty() {
        return;
    }
    let height = u16::try_from(lines.len() + 2)
        .unwrap_or(u16::MAX)
        .min(content_area.height);
    let area = Rect::new(
        input_area.x + 1,
        content_area.y,
        input_area.width.saturating_sub(2),
        height,
    );
    let styled: Vec<Line> = lines
        .into_iter()
        .map(|line| {
            if line.starts_with('>') {
                Line::styled(line, Style::default().add_modifier(Modifier::REVERSED))
            } else {
                Line::raw(line)
            }
        })
        .collect();
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(styled).block(Block::bordered().title(" suggestions ")),
        area,
    );
}
