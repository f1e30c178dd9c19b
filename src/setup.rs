//! Setup form shown before a session, and again as the settings form during one: four
//! whole-number fields, validated on submit. Invalid input keeps the form open with the
//! reason underneath.

use color_eyre::eyre::{eyre, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{prelude::*, widgets::*};
use strum::{Display, EnumIter, IntoEnumIterator};
use thiserror::Error;

use crate::session::SessionParams;
use crate::tui::{TermEvent, Tui};
use crate::APP_VERSION;

pub const DEFAULT_MINUTES_PER_BLOCK: u32 = 30;
pub const DEFAULT_TOTAL_BLOCKS: u32 = 3;
pub const DEFAULT_QUESTIONS_PER_BLOCK: u32 = 5;
pub const DEFAULT_TRANSPARENCY: u8 = 75;

// Upper bounds keep every derived second count inside u32
const MAX_MINUTES_PER_BLOCK: i64 = 24 * 60;
const MAX_TOTAL_BLOCKS: i64 = 100;
const MAX_QUESTIONS_PER_BLOCK: i64 = 10_000;
const MAX_INPUT_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, Display)]
pub enum SetupField {
  #[strum(to_string = "Time per block (minutes)")]
  MinutesPerBlock,
  #[strum(to_string = "Number of blocks")]
  TotalBlocks,
  #[strum(to_string = "Questions per block")]
  QuestionsPerBlock,
  #[strum(to_string = "Transparency (%)")]
  Transparency,
}

impl SetupField {
  /// Inclusive range accepted for the field.
  fn bounds(self) -> (i64, i64) {
    match self {
      SetupField::MinutesPerBlock => (1, MAX_MINUTES_PER_BLOCK),
      SetupField::TotalBlocks => (1, MAX_TOTAL_BLOCKS),
      SetupField::QuestionsPerBlock => (1, MAX_QUESTIONS_PER_BLOCK),
      SetupField::Transparency => (0, 100),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("{field} must be a whole number, got '{input}'")]
  NotANumber { field: SetupField, input: String },
  #[error("{field} must be greater than 0, got {value}")]
  NotPositive { field: SetupField, value: i64 },
  #[error("{field} must be between {min} and {max}, got {value}")]
  OutOfRange { field: SetupField, value: i64, min: i64, max: i64 },
}

/// Whether the form starts a session or edits the running one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display)]
pub enum FormMode {
  #[default]
  #[strum(to_string = "setup")]
  Setup,
  #[strum(to_string = "settings")]
  Settings,
}

impl FormMode {
  fn submit_label(self) -> &'static str {
    match self {
      FormMode::Setup => "start",
      FormMode::Settings => "apply",
    }
  }

  fn cancel_label(self) -> &'static str {
    match self {
      FormMode::Setup => "quit",
      FormMode::Settings => "back",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupAction {
  Continue,
  Submit,
  Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetupForm {
  inputs: Vec<String>,
  focus: usize,
  error: Option<String>,
  mode: FormMode,
}

impl SetupForm {
  pub fn new(defaults: &SessionParams) -> Self {
    let inputs = vec![
      defaults.minutes_per_block.to_string(),
      defaults.total_blocks.to_string(),
      defaults.questions_per_block.to_string(),
      defaults.transparency.to_string(),
    ];
    Self { inputs, focus: 0, error: None, mode: FormMode::Setup }
  }

  pub fn with_mode(mut self, mode: FormMode) -> Self {
    self.mode = mode;
    self
  }

  pub fn mode(&self) -> FormMode {
    self.mode
  }

  pub fn default_params() -> SessionParams {
    SessionParams {
      minutes_per_block: DEFAULT_MINUTES_PER_BLOCK,
      total_blocks: DEFAULT_TOTAL_BLOCKS,
      questions_per_block: DEFAULT_QUESTIONS_PER_BLOCK,
      transparency: DEFAULT_TRANSPARENCY,
    }
  }

  pub fn input(&self, field: SetupField) -> &str {
    &self.inputs[field as usize]
  }

  pub fn set_input(&mut self, field: SetupField, text: &str) {
    self.inputs[field as usize] = text.to_string();
  }

  pub fn focused(&self) -> SetupField {
    SetupField::iter().nth(self.focus).unwrap_or(SetupField::MinutesPerBlock)
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> SetupAction {
    let field_count = self.inputs.len();
    if key.modifiers.contains(KeyModifiers::CONTROL) {
      return match key.code {
        KeyCode::Char('c') | KeyCode::Char('C') => SetupAction::Cancel,
        _ => SetupAction::Continue,
      };
    }
    match key.code {
      KeyCode::Esc => return SetupAction::Cancel,
      KeyCode::Enter => return SetupAction::Submit,
      KeyCode::Tab | KeyCode::Down => self.focus = (self.focus + 1) % field_count,
      KeyCode::BackTab | KeyCode::Up => self.focus = (self.focus + field_count - 1) % field_count,
      KeyCode::Backspace => {
        self.inputs[self.focus].pop();
      }
      KeyCode::Char(c) => {
        if self.inputs[self.focus].len() < MAX_INPUT_LEN {
          self.inputs[self.focus].push(c);
        }
      }
      _ => {}
    }
    SetupAction::Continue
  }

  /// Checks the fields in display order and reports the first problem.
  pub fn validate(&self) -> Result<SessionParams, ValidationError> {
    let minutes_per_block = parse_field(SetupField::MinutesPerBlock, self.input(SetupField::MinutesPerBlock))?;
    let total_blocks = parse_field(SetupField::TotalBlocks, self.input(SetupField::TotalBlocks))?;
    let questions_per_block = parse_field(SetupField::QuestionsPerBlock, self.input(SetupField::QuestionsPerBlock))?;
    let transparency = parse_field(SetupField::Transparency, self.input(SetupField::Transparency))?;
    Ok(SessionParams {
      minutes_per_block: minutes_per_block as u32,
      total_blocks: total_blocks as u32,
      questions_per_block: questions_per_block as u32,
      transparency: transparency as u8,
    })
  }

  /// Validates and, on failure, keeps the message for the next draw.
  pub fn submit(&mut self) -> Option<SessionParams> {
    match self.validate() {
      Ok(params) => {
        self.error = None;
        Some(params)
      }
      Err(e) => {
        warn!("Rejected setup input: {}", e);
        self.error = Some(e.to_string());
        None
      }
    }
  }

  fn ui(&self, f: &mut Frame) {
    let layout = self.layout(f.size());
    f.render_widget(self.title_paragraph(), layout[0]);
    f.render_widget(self.fields_paragraph(), layout[1]);
    f.render_widget(self.error_paragraph(), layout[2]);
    f.render_widget(self.help_paragraph(), layout[3]);
  }

  fn layout(&self, area: Rect) -> Vec<Rect> {
    let layout = Layout::default()
      .direction(Direction::Vertical)
      .constraints(vec![
        Constraint::Length(2), // title
        Constraint::Length(6), // fields
        Constraint::Length(2), // validation message
        Constraint::Length(2), // help
      ])
      .split(area);

    layout.to_vec()
  }

  fn title_paragraph(&self) -> Paragraph<'_> {
    let title_text = Line::from(vec![APP_VERSION.into(), " - ".into(), Span::raw(self.mode.to_string()).dim()]);
    Paragraph::new(title_text).gray()
  }

  fn fields_paragraph(&self) -> Paragraph<'_> {
    let lines: Vec<Line> = SetupField::iter()
      .zip(self.inputs.iter())
      .map(|(field, input)| {
        let focused = field == self.focused();
        let value_style = if focused { Style::new().black().on_gray() } else { Style::new().white() };
        let cursor = if focused { "_" } else { " " };
        Line::from(vec![
          format!("{:<28}", field.to_string()).into(),
          Span::styled(format!(" {}{} ", input, cursor), value_style),
        ])
      })
      .collect();
    Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Exam practice timer "))
  }

  fn error_paragraph(&self) -> Paragraph<'_> {
    let text = self.error.as_deref().unwrap_or_default();
    Paragraph::new(text).red()
  }

  fn help_paragraph(&self) -> Paragraph<'_> {
    let help_text = Line::from(vec![
      "tab ".into(), "next field".dim(),
      " : enter ".into(), self.mode.submit_label().dim(),
      " : esc ".into(), self.mode.cancel_label().dim(),
    ]);
    Paragraph::new(help_text).gray()
  }
}

fn parse_field(field: SetupField, input: &str) -> Result<i64, ValidationError> {
  let value = input.trim().parse::<i64>().map_err(|_| ValidationError::NotANumber {
    field,
    input: input.to_string(),
  })?;
  let (min, max) = field.bounds();
  if min > 0 && value < min {
    return Err(ValidationError::NotPositive { field, value });
  }
  if value < min || value > max {
    return Err(ValidationError::OutOfRange { field, value, min, max });
  }
  Ok(value)
}

/// Runs the form until the user submits valid values (`Some`) or backs out (`None`).
pub async fn run(tui: &mut Tui, defaults: &SessionParams, mode: FormMode) -> Result<Option<SessionParams>> {
  let mut form = SetupForm::new(defaults).with_mode(mode);
  loop {
    tui.draw(|f| form.ui(f))?;
    match tui.next().await {
      Some(TermEvent::Key(key)) => match form.handle_key(key) {
        SetupAction::Submit => {
          if let Some(params) = form.submit() {
            info!("{} accepted: {:?}", form.mode(), params);
            return Ok(Some(params));
          }
        }
        SetupAction::Cancel => {
          info!("{} cancelled", form.mode());
          return Ok(None);
        }
        SetupAction::Continue => {}
      },
      Some(TermEvent::Resize) => {}
      Some(TermEvent::Error) => return Err(eyre!("Terminal input failed during setup")),
      Some(TermEvent::Closed) | None => return Ok(None),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn form_with(minutes: &str, blocks: &str, questions: &str, transparency: &str) -> SetupForm {
    let mut form = SetupForm::new(&SetupForm::default_params());
    form.set_input(SetupField::MinutesPerBlock, minutes);
    form.set_input(SetupField::TotalBlocks, blocks);
    form.set_input(SetupField::QuestionsPerBlock, questions);
    form.set_input(SetupField::Transparency, transparency);
    form
  }

  #[test]
  fn test_defaults_are_prefilled() {
    let form = SetupForm::new(&SetupForm::default_params());
    assert_eq!(form.input(SetupField::MinutesPerBlock), "30");
    assert_eq!(form.input(SetupField::TotalBlocks), "3");
    assert_eq!(form.input(SetupField::QuestionsPerBlock), "5");
    assert_eq!(form.input(SetupField::Transparency), "75");
    assert_eq!(form.focused(), SetupField::MinutesPerBlock);
    assert_eq!(form.validate(), Ok(SetupForm::default_params()));
  }

  #[test]
  fn test_valid_input() {
    let form = form_with("45", "2", " 40 ", "100");
    assert_eq!(form.validate(), Ok(SessionParams {
      minutes_per_block: 45,
      total_blocks: 2,
      questions_per_block: 40,
      transparency: 100,
    }));
  }

  #[test]
  fn test_zero_questions_rejected() {
    let mut form = form_with("1", "1", "0", "75");
    assert_eq!(form.validate(), Err(ValidationError::NotPositive { field: SetupField::QuestionsPerBlock, value: 0 }));
    assert_eq!(form.submit(), None);
    assert_eq!(form.error(), Some("Questions per block must be greater than 0, got 0"));
  }

  #[test]
  fn test_negative_questions_rejected() {
    let form = form_with("1", "1", "-3", "75");
    assert_eq!(form.validate(), Err(ValidationError::NotPositive { field: SetupField::QuestionsPerBlock, value: -3 }));
  }

  #[test]
  fn test_transparency_out_of_range_rejected() {
    let form = form_with("1", "1", "3", "150");
    assert_eq!(form.validate(), Err(ValidationError::OutOfRange {
      field: SetupField::Transparency, value: 150, min: 0, max: 100,
    }));
    let form = form_with("1", "1", "3", "-1");
    assert!(matches!(form.validate(), Err(ValidationError::OutOfRange { field: SetupField::Transparency, .. })));
  }

  #[test]
  fn test_transparency_bounds_accepted() {
    assert_eq!(form_with("1", "1", "3", "0").validate().map(|p| p.transparency), Ok(0));
    assert_eq!(form_with("1", "1", "3", "100").validate().map(|p| p.transparency), Ok(100));
  }

  #[test]
  fn test_non_numeric_rejected() {
    let form = form_with("ten", "1", "3", "75");
    let err = form.validate().unwrap_err();
    assert_eq!(err, ValidationError::NotANumber { field: SetupField::MinutesPerBlock, input: "ten".to_string() });
    assert_eq!(err.to_string(), "Time per block (minutes) must be a whole number, got 'ten'");

    let form = form_with("1", "", "3", "75");
    assert!(matches!(form.validate(), Err(ValidationError::NotANumber { field: SetupField::TotalBlocks, .. })));

    let form = form_with("1", "1", "2.5", "75");
    assert!(matches!(form.validate(), Err(ValidationError::NotANumber { field: SetupField::QuestionsPerBlock, .. })));
  }

  #[test]
  fn test_zero_minutes_and_blocks_rejected() {
    let form = form_with("0", "1", "3", "75");
    assert!(matches!(form.validate(), Err(ValidationError::NotPositive { field: SetupField::MinutesPerBlock, .. })));
    let form = form_with("1", "0", "3", "75");
    assert!(matches!(form.validate(), Err(ValidationError::NotPositive { field: SetupField::TotalBlocks, .. })));
  }

  #[test]
  fn test_upper_bounds_rejected() {
    let form = form_with("1441", "1", "3", "75");
    assert!(matches!(form.validate(), Err(ValidationError::OutOfRange { field: SetupField::MinutesPerBlock, .. })));
    let form = form_with("1", "101", "3", "75");
    assert!(matches!(form.validate(), Err(ValidationError::OutOfRange { field: SetupField::TotalBlocks, .. })));
    let form = form_with("1", "1", "10001", "75");
    assert!(matches!(form.validate(), Err(ValidationError::OutOfRange { field: SetupField::QuestionsPerBlock, .. })));
  }

  #[test]
  fn test_first_invalid_field_reported() {
    let form = form_with("x", "0", "0", "500");
    assert!(matches!(form.validate(), Err(ValidationError::NotANumber { field: SetupField::MinutesPerBlock, .. })));
  }

  #[test]
  fn test_submit_clears_previous_error() {
    let mut form = form_with("1", "1", "0", "75");
    assert_eq!(form.submit(), None);
    assert!(form.error().is_some());
    form.set_input(SetupField::QuestionsPerBlock, "3");
    assert!(form.submit().is_some());
    assert_eq!(form.error(), None);
  }

  #[test]
  fn test_focus_navigation_wraps() {
    let mut form = SetupForm::new(&SetupForm::default_params());
    assert_eq!(form.handle_key(key(KeyCode::Tab)), SetupAction::Continue);
    assert_eq!(form.focused(), SetupField::TotalBlocks);
    form.handle_key(key(KeyCode::Down));
    form.handle_key(key(KeyCode::Down));
    assert_eq!(form.focused(), SetupField::Transparency);
    form.handle_key(key(KeyCode::Tab));
    assert_eq!(form.focused(), SetupField::MinutesPerBlock);
    form.handle_key(key(KeyCode::Up));
    assert_eq!(form.focused(), SetupField::Transparency);
  }

  #[test]
  fn test_typing_edits_focused_field() {
    let mut form = SetupForm::new(&SetupForm::default_params());
    form.handle_key(key(KeyCode::Tab));
    form.handle_key(key(KeyCode::Backspace));
    form.handle_key(key(KeyCode::Char('7')));
    assert_eq!(form.input(SetupField::TotalBlocks), "7");
    assert_eq!(form.input(SetupField::MinutesPerBlock), "30");
  }

  #[test]
  fn test_input_length_is_capped() {
    let mut form = SetupForm::new(&SetupForm::default_params());
    for _ in 0..20 {
      form.handle_key(key(KeyCode::Char('9')));
    }
    assert_eq!(form.input(SetupField::MinutesPerBlock).len(), MAX_INPUT_LEN);
  }

  #[test]
  fn test_submit_and_cancel_keys() {
    let mut form = SetupForm::new(&SetupForm::default_params());
    assert_eq!(form.handle_key(key(KeyCode::Enter)), SetupAction::Submit);
    assert_eq!(form.handle_key(key(KeyCode::Esc)), SetupAction::Cancel);
    let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
    assert_eq!(form.handle_key(ctrl_c), SetupAction::Cancel);
    assert_eq!(form.input(SetupField::MinutesPerBlock), "30");
  }

  #[test]
  fn test_settings_mode_is_prefilled_and_labelled() {
    let current = SessionParams { minutes_per_block: 45, total_blocks: 2, questions_per_block: 9, transparency: 40 };
    let form = SetupForm::new(&current).with_mode(FormMode::Settings);
    assert_eq!(form.mode(), FormMode::Settings);
    assert_eq!(form.mode().to_string(), "settings");
    assert_eq!(form.mode().submit_label(), "apply");
    assert_eq!(form.validate(), Ok(current));
    assert_eq!(SetupForm::new(&current).mode(), FormMode::Setup);
    assert_eq!(FormMode::Setup.submit_label(), "start");
  }
}
