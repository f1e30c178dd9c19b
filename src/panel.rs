//! Terminal rendition of the timer: question and block rows with gauges, a big block
//! countdown, and modal boxes for the completion and error notifications.

use color_eyre::eyre::{eyre, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{prelude::*, widgets::*};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::session::{format_clock, SessionParams};
use crate::setup::{self, FormMode};
use crate::surface::{Bar, Event, Label, Surface, Wait};
use crate::tui::{TermEvent, Tui};
use crate::APP_VERSION;

// Colour thresholds for the question countdown, in seconds
const COLOR_YELLOW_THRESHOLD: u32 = 10;
const COLOR_RED_THRESHOLD: u32 = 5;

// Below this the panel would be unreadable
const MIN_OPACITY: u8 = 20;

const TEXT_RGB: (u8, u8, u8) = (220, 220, 220);
const DIM_RGB: (u8, u8, u8) = (130, 130, 130);
const QUESTION_RGB: (u8, u8, u8) = (80, 200, 120);
const BLOCK_RGB: (u8, u8, u8) = (80, 140, 230);
const YELLOW_RGB: (u8, u8, u8) = (230, 200, 60);
const RED_RGB: (u8, u8, u8) = (230, 80, 80);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Modal {
  title: &'static str,
  message: String,
  is_error: bool,
}

/// Everything the timer screen shows; redrawn as a whole before each wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
  question_label: String,
  block_label: String,
  total_label: String,
  pause_label: String,
  pause_enabled: bool,
  start_label: String,
  block_seconds: u32,
  question_seconds: Option<u32>,
  block_progress: u32,
  block_max: u32,
  question_progress: u32,
  question_max: u32,
  transparency: u8,
  modal: Option<Modal>,
}

impl Default for Panel {
  fn default() -> Self {
    Self {
      question_label: String::new(),
      block_label: String::new(),
      total_label: String::new(),
      pause_label: String::new(),
      pause_enabled: true,
      start_label: String::new(),
      block_seconds: 0,
      question_seconds: None,
      block_progress: 0,
      block_max: 0,
      question_progress: 0,
      question_max: 0,
      transparency: 100,
      modal: None,
    }
  }
}

impl Panel {
  fn color(&self, rgb: (u8, u8, u8)) -> Color {
    fade(rgb, self.transparency)
  }

  fn ui(&self, f: &mut Frame) {
    let layout = self.layout(f.size());
    f.render_widget(self.title_paragraph(), layout[0]);
    self.render_row(f, layout[1], &self.question_label, self.question_seconds, Bar::Question);
    self.render_row(f, layout[2], &self.block_label, Some(self.block_seconds), Bar::Block);
    self.render_countdown(f, layout[3]);
    f.render_widget(self.help_paragraph(), layout[4]);
    if let Some(modal) = &self.modal {
      self.render_modal(f, modal);
    }
  }

  fn layout(&self, area: Rect) -> Vec<Rect> {
    let layout = Layout::default()
      .direction(Direction::Vertical)
      .constraints(vec![
        Constraint::Length(2), // title and total
        Constraint::Length(3), // question row
        Constraint::Length(3), // block row
        Constraint::Length(9), // big block countdown
        Constraint::Length(2), // help
      ])
      .split(area);

    layout.to_vec()
  }

  fn render_row(&self, f: &mut Frame, area: Rect, label: &str, seconds: Option<u32>, bar: Bar) {
    let columns = Layout::default()
      .direction(Direction::Horizontal)
      .constraints(vec![
        Constraint::Length(26),
        Constraint::Length(8),
        Constraint::Min(10),
      ])
      .split(area);

    let (value, max, bar_rgb) = match bar {
      Bar::Question => (self.question_progress, self.question_max, QUESTION_RGB),
      Bar::Block => (self.block_progress, self.block_max, BLOCK_RGB),
    };
    let clock_rgb = match (bar, seconds) {
      (Bar::Question, Some(s)) if s < COLOR_RED_THRESHOLD => RED_RGB,
      (Bar::Question, Some(s)) if s < COLOR_YELLOW_THRESHOLD => YELLOW_RGB,
      _ => TEXT_RGB,
    };
    let clock = seconds.map(format_clock).unwrap_or_default();

    let text_style = Style::new().fg(self.color(TEXT_RGB));
    f.render_widget(Paragraph::new(format!(" {}", label)).style(text_style), middle_line(columns[0]));
    f.render_widget(Paragraph::new(clock).style(Style::new().fg(self.color(clock_rgb))), middle_line(columns[1]));
    f.render_widget(
      Gauge::default()
        .block(Block::default().borders(Borders::ALL).border_style(Style::new().fg(self.color(DIM_RGB))))
        .gauge_style(Style::new().fg(self.color(bar_rgb)))
        .ratio(progress_ratio(value, max)),
      columns[2],
    );
  }

  fn title_paragraph(&self) -> Paragraph<'_> {
    let title_text = Line::from(vec![
      Span::styled(APP_VERSION, Style::new().fg(self.color(DIM_RGB))),
      "   ".into(),
      Span::styled(self.total_label.as_str(), Style::new().fg(self.color(TEXT_RGB))),
    ]);
    Paragraph::new(title_text)
  }

  fn render_countdown(&self, f: &mut Frame, area: Rect) {
    let style = Style::new().fg(self.color(BLOCK_RGB));
    let clock = format_clock(self.block_seconds);
    let big_text = tui_big_text::BigTextBuilder::default()
      .lines(vec![clock.clone().into()])
      .style(style)
      .build();
    match big_text {
      Ok(big_text) => f.render_widget(big_text, area),
      Err(e) => {
        debug!("Falling back to plain countdown: {}", e);
        f.render_widget(Paragraph::new(clock).style(style).alignment(Alignment::Center), middle_line(area));
      }
    }
  }

  fn help_paragraph(&self) -> Paragraph<'_> {
    let key_style = Style::new().fg(self.color(TEXT_RGB));
    let action_style = Style::new().fg(self.color(DIM_RGB));
    let pause_style = if self.pause_enabled {
      action_style
    } else {
      action_style.add_modifier(Modifier::CROSSED_OUT)
    };
    let help_text = Line::from(vec![
      Span::styled("enter ", key_style),
      Span::styled(self.start_label.to_lowercase(), action_style),
      Span::styled(" : p ", key_style),
      Span::styled(self.pause_label.to_lowercase(), pause_style),
      Span::styled(" : s ", key_style),
      Span::styled("settings", action_style),
      Span::styled(" : q ", key_style),
      Span::styled("cancel", action_style),
    ]);
    Paragraph::new(help_text)
  }

  fn render_modal(&self, f: &mut Frame, modal: &Modal) {
    let area = centered_rect(f.size(), 50, 7);
    let rgb = if modal.is_error { RED_RGB } else { QUESTION_RGB };
    let block = Block::default()
      .title(modal.title)
      .borders(Borders::ALL)
      .border_style(Style::new().fg(Color::Rgb(rgb.0, rgb.1, rgb.2)));
    let text = vec![
      Line::from(modal.message.as_str()),
      Line::from(""),
      Line::from("press enter".dim()),
    ];
    f.render_widget(Clear, area);
    f.render_widget(Paragraph::new(text).alignment(Alignment::Center).wrap(Wrap { trim: true }).block(block), area);
  }
}

/// `Surface` backed by the real terminal.
pub struct TerminalSurface<'a> {
  tui: &'a mut Tui,
  panel: Panel,
}

impl<'a> TerminalSurface<'a> {
  pub fn new(tui: &'a mut Tui) -> Self {
    Self { tui, panel: Panel::default() }
  }

  fn draw(&mut self) -> Result<()> {
    let panel = &self.panel;
    self.tui.draw(|f| panel.ui(f))?;
    Ok(())
  }

  async fn show_modal(&mut self, modal: Modal) -> Result<()> {
    self.panel.modal = Some(modal);
    let result = self.wait_for_acknowledgement().await;
    self.panel.modal = None;
    result
  }

  async fn wait_for_acknowledgement(&mut self) -> Result<()> {
    loop {
      self.draw()?;
      match self.tui.next().await {
        Some(TermEvent::Key(key)) => {
          if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') | KeyCode::Char('q')) {
            return Ok(());
          }
        }
        Some(TermEvent::Resize) => {}
        Some(TermEvent::Error) => return Err(eyre!("Terminal input failed while showing a notification")),
        Some(TermEvent::Closed) | None => return Ok(()),
      }
    }
  }
}

impl<'a> Surface for TerminalSurface<'a> {
  fn configure_progress(&mut self, bar: Bar, max: u32) {
    match bar {
      Bar::Question => self.panel.question_max = max,
      Bar::Block => self.panel.block_max = max,
    }
  }

  fn set_transparency(&mut self, percent: u8) {
    self.panel.transparency = percent;
  }

  fn render_countdown(&mut self, block_seconds: u32, question_seconds: Option<u32>) -> Result<()> {
    self.panel.block_seconds = block_seconds;
    self.panel.question_seconds = question_seconds;
    Ok(())
  }

  fn render_progress(&mut self, bar: Bar, value: u32) -> Result<()> {
    match bar {
      Bar::Question => self.panel.question_progress = value,
      Bar::Block => self.panel.block_progress = value,
    }
    Ok(())
  }

  fn render_label(&mut self, label: Label, text: &str) -> Result<()> {
    let slot = match label {
      Label::Question => &mut self.panel.question_label,
      Label::Block => &mut self.panel.block_label,
      Label::Total => &mut self.panel.total_label,
    };
    *slot = text.to_string();
    Ok(())
  }

  fn set_pause_control_label(&mut self, text: &str) -> Result<()> {
    self.panel.pause_label = text.to_string();
    Ok(())
  }

  fn set_pause_control_enabled(&mut self, enabled: bool) -> Result<()> {
    self.panel.pause_enabled = enabled;
    Ok(())
  }

  fn set_start_control_label(&mut self, text: &str) -> Result<()> {
    self.panel.start_label = text.to_string();
    Ok(())
  }

  async fn edit_settings(&mut self, current: &SessionParams) -> Result<Option<SessionParams>> {
    setup::run(self.tui, current, FormMode::Settings).await
  }

  async fn notify_completion(&mut self, message: &str) -> Result<()> {
    self.show_modal(Modal { title: " Timer Finished ", message: message.to_string(), is_error: false }).await
  }

  async fn notify_error(&mut self, message: &str) -> Result<()> {
    self.show_modal(Modal { title: " Error ", message: message.to_string(), is_error: true }).await
  }

  async fn poll_event(&mut self, wait: Wait) -> Result<Event> {
    if self.tui.is_closed() {
      return Ok(Event::WindowClosed);
    }
    loop {
      self.draw()?;
      match next_event(&mut self.tui.event_rx, wait).await? {
        Polled::Event(event) => return Ok(event),
        Polled::Redraw => {}
      }
    }
  }
}

/// Result of waiting on the terminal for the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polled {
  Event(Event),
  /// The window was resized; redraw, then wait again for the same deadline.
  Redraw,
}

/// Waits for a mapped key or the tick deadline. Unmapped keys are dropped without moving the
/// deadline, so a stream of stray keys cannot hold a tick back.
pub async fn next_event(events: &mut UnboundedReceiver<TermEvent>, wait: Wait) -> Result<Polled> {
  loop {
    let next = match wait {
      Wait::Until(deadline) => {
        tokio::select! {
          event = events.recv() => event,
          _ = tokio::time::sleep_until(deadline) => return Ok(Polled::Event(Event::Tick)),
        }
      }
      Wait::Indefinitely => events.recv().await,
    };
    match next {
      Some(TermEvent::Key(key)) => {
        if let Some(event) = map_key(&key) {
          return Ok(Polled::Event(event));
        }
      }
      Some(TermEvent::Resize) => return Ok(Polled::Redraw),
      Some(TermEvent::Error) => return Err(eyre!("Terminal input failed")),
      Some(TermEvent::Closed) | None => return Ok(Polled::Event(Event::WindowClosed)),
    }
  }
}

/// Keys the timer screen reacts to; everything else is ignored without touching the tick deadline.
pub fn map_key(key: &KeyEvent) -> Option<Event> {
  if key.modifiers.contains(KeyModifiers::CONTROL) {
    return match key.code {
      KeyCode::Char('c') | KeyCode::Char('C') => Some(Event::WindowClosed),
      _ => None,
    };
  }
  match key.code {
    KeyCode::Char('p') | KeyCode::Char('P') | KeyCode::Char(' ') => Some(Event::PauseToggle),
    KeyCode::Enter | KeyCode::Char('t') | KeyCode::Char('T') => Some(Event::StartStop),
    KeyCode::Char('s') | KeyCode::Char('S') => Some(Event::Settings),
    KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Char('x') | KeyCode::Char('X') | KeyCode::Esc => {
      Some(Event::Cancel)
    }
    _ => None,
  }
}

/// Fades a colour toward black; `percent` is the opacity, clamped to `MIN_OPACITY..=100`.
pub fn fade(rgb: (u8, u8, u8), percent: u8) -> Color {
  let pct = percent.clamp(MIN_OPACITY, 100) as u16;
  let scale = |c: u8| ((c as u16 * pct) / 100) as u8;
  Color::Rgb(scale(rgb.0), scale(rgb.1), scale(rgb.2))
}

/// Gauge fill in `0.0..=1.0`. A zero maximum renders empty.
pub fn progress_ratio(value: u32, max: u32) -> f64 {
  if max == 0 {
    return 0.0;
  }
  (value as f64 / max as f64).min(1.0)
}

/// The single text line vertically centred in `area`.
fn middle_line(area: Rect) -> Rect {
  Rect {
    y: area.y + area.height / 2,
    height: area.height.min(1),
    ..area
  }
}

fn centered_rect(area: Rect, percent_x: u16, height: u16) -> Rect {
  let width = (area.width as u32 * percent_x as u32 / 100) as u16;
  let width = width.max(20).min(area.width);
  let height = height.min(area.height);
  Rect {
    x: area.x + (area.width - width) / 2,
    y: area.y + (area.height - height) / 2,
    width,
    height,
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use tokio::sync::mpsc::unbounded_channel;
  use tokio::time::Instant;

  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_map_key_pause() {
    assert_eq!(map_key(&key(KeyCode::Char('p'))), Some(Event::PauseToggle));
    assert_eq!(map_key(&key(KeyCode::Char('P'))), Some(Event::PauseToggle));
    assert_eq!(map_key(&key(KeyCode::Char(' '))), Some(Event::PauseToggle));
  }

  #[test]
  fn test_map_key_cancel() {
    assert_eq!(map_key(&key(KeyCode::Char('q'))), Some(Event::Cancel));
    assert_eq!(map_key(&key(KeyCode::Char('x'))), Some(Event::Cancel));
    assert_eq!(map_key(&key(KeyCode::Esc)), Some(Event::Cancel));
  }

  #[test]
  fn test_map_key_ctrl_c_closes() {
    let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
    assert_eq!(map_key(&ctrl_c), Some(Event::WindowClosed));
    let ctrl_p = KeyEvent::new(KeyCode::Char('p'), KeyModifiers::CONTROL);
    assert_eq!(map_key(&ctrl_p), None);
  }

  #[test]
  fn test_map_key_start_stop_and_settings() {
    assert_eq!(map_key(&key(KeyCode::Enter)), Some(Event::StartStop));
    assert_eq!(map_key(&key(KeyCode::Char('t'))), Some(Event::StartStop));
    assert_eq!(map_key(&key(KeyCode::Char('s'))), Some(Event::Settings));
    assert_eq!(map_key(&key(KeyCode::Char('S'))), Some(Event::Settings));
  }

  #[test]
  fn test_map_key_ignores_others() {
    assert_eq!(map_key(&key(KeyCode::Char('a'))), None);
    assert_eq!(map_key(&key(KeyCode::Tab)), None);
    assert_eq!(map_key(&key(KeyCode::F(1))), None);
  }

  #[test]
  fn test_fade_full_opacity_keeps_colour() {
    assert_eq!(fade((200, 100, 50), 100), Color::Rgb(200, 100, 50));
  }

  #[test]
  fn test_fade_scales_channels() {
    assert_eq!(fade((200, 100, 50), 50), Color::Rgb(100, 50, 25));
    assert_eq!(fade((200, 100, 50), 75), Color::Rgb(150, 75, 37));
  }

  #[test]
  fn test_fade_clamps_to_minimum_opacity() {
    assert_eq!(fade((200, 100, 50), 0), fade((200, 100, 50), MIN_OPACITY));
    assert_eq!(fade((200, 100, 50), 0), Color::Rgb(40, 20, 10));
  }

  #[test]
  fn test_progress_ratio() {
    assert_eq!(progress_ratio(0, 60), 0.0);
    assert_eq!(progress_ratio(30, 60), 0.5);
    assert_eq!(progress_ratio(60, 60), 1.0);
    assert_eq!(progress_ratio(75, 60), 1.0);
  }

  #[test]
  fn test_progress_ratio_zero_max_is_empty() {
    assert_eq!(progress_ratio(5, 0), 0.0);
  }

  #[test]
  fn test_middle_line() {
    assert_eq!(middle_line(Rect::new(5, 10, 20, 3)), Rect::new(5, 11, 20, 1));
    assert_eq!(middle_line(Rect::new(0, 0, 20, 0)), Rect::new(0, 0, 20, 0));
  }

  #[test]
  fn test_centered_rect_fits_area() {
    let area = Rect::new(0, 0, 80, 24);
    let rect = centered_rect(area, 50, 7);
    assert_eq!(rect, Rect::new(20, 8, 40, 7));

    let tiny = Rect::new(0, 0, 10, 4);
    let rect = centered_rect(tiny, 50, 7);
    assert_eq!(rect, Rect::new(0, 0, 10, 4));
  }

  #[test]
  fn test_centered_rect_wide_terminal() {
    let wide = Rect::new(0, 0, 2000, 50);
    assert_eq!(centered_rect(wide, 50, 7), Rect::new(500, 21, 1000, 7));

    let widest = Rect::new(0, 0, u16::MAX, 50);
    assert_eq!(centered_rect(widest, 50, 7).width, u16::MAX / 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_unmapped_key_keeps_tick_deadline() {
    let (tx, mut rx) = unbounded_channel();
    let deadline = Instant::now() + Duration::from_millis(1000);
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(400)).await;
      tx.send(TermEvent::Key(key(KeyCode::Char('a')))).unwrap();
      tokio::time::sleep(Duration::from_millis(400)).await;
      tx.send(TermEvent::Key(key(KeyCode::Tab))).unwrap();
      // Keep the channel open past the deadline
      tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let polled = next_event(&mut rx, Wait::Until(deadline)).await.unwrap();
    assert_eq!(polled, Polled::Event(Event::Tick));
    let now = Instant::now();
    assert!(now >= deadline);
    assert!(now < deadline + Duration::from_millis(10));
  }

  #[tokio::test(start_paused = true)]
  async fn test_mapped_key_returns_before_deadline() {
    let (tx, mut rx) = unbounded_channel();
    let deadline = Instant::now() + Duration::from_millis(1000);
    tx.send(TermEvent::Key(key(KeyCode::Char('a')))).unwrap();
    tx.send(TermEvent::Key(key(KeyCode::Char('p')))).unwrap();

    let polled = next_event(&mut rx, Wait::Until(deadline)).await.unwrap();
    assert_eq!(polled, Polled::Event(Event::PauseToggle));
    assert!(Instant::now() < deadline);
  }

  #[tokio::test]
  async fn test_next_event_terminal_signals() {
    let (tx, mut rx) = unbounded_channel();
    tx.send(TermEvent::Resize).unwrap();
    tx.send(TermEvent::Error).unwrap();
    tx.send(TermEvent::Closed).unwrap();
    assert_eq!(next_event(&mut rx, Wait::Indefinitely).await.unwrap(), Polled::Redraw);
    assert!(next_event(&mut rx, Wait::Indefinitely).await.is_err());
    assert_eq!(next_event(&mut rx, Wait::Indefinitely).await.unwrap(), Polled::Event(Event::WindowClosed));
    drop(tx);
    assert_eq!(next_event(&mut rx, Wait::Indefinitely).await.unwrap(), Polled::Event(Event::WindowClosed));
  }
}
