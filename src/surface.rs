//! The display the timer controller drives. The terminal front end in `panel` is one
//! implementation; tests use a scripted one.

use color_eyre::eyre::Result;
use strum::EnumIs;
use tokio::time::Instant;

use crate::session::SessionParams;

/// User input or timer expiry, as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIs)]
pub enum Event {
  Tick,
  PauseToggle,
  StartStop,
  /// Open the settings form over a running session.
  Settings,
  Cancel,
  WindowClosed,
}

/// How long `poll_event` may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
  /// Return `Event::Tick` once the deadline passes if nothing else arrived first.
  Until(Instant),
  Indefinitely,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bar {
  Question,
  Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
  Question,
  Block,
  Total,
}

pub trait Surface {
  /// Sets the maximum a progress bar is filled against. Called before the first render.
  fn configure_progress(&mut self, bar: Bar, max: u32);

  /// Opacity of the panel in percent, 100 being fully opaque.
  fn set_transparency(&mut self, percent: u8);

  fn render_countdown(&mut self, block_seconds: u32, question_seconds: Option<u32>) -> Result<()>;

  fn render_progress(&mut self, bar: Bar, value: u32) -> Result<()>;

  fn render_label(&mut self, label: Label, text: &str) -> Result<()>;

  fn set_pause_control_label(&mut self, text: &str) -> Result<()>;

  /// Greys the pause control out while the session is stopped.
  fn set_pause_control_enabled(&mut self, enabled: bool) -> Result<()>;

  fn set_start_control_label(&mut self, text: &str) -> Result<()>;

  /// Shows the setup form pre-filled with `current`. `None` when the user backs out.
  async fn edit_settings(&mut self, current: &SessionParams) -> Result<Option<SessionParams>>;

  /// Shows a message and waits until the user acknowledges it.
  async fn notify_completion(&mut self, message: &str) -> Result<()>;

  async fn notify_error(&mut self, message: &str) -> Result<()>;

  /// Blocks for the next input event, or until the tick deadline.
  async fn poll_event(&mut self, wait: Wait) -> Result<Event>;
}
