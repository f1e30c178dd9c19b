//! Timer controller: waits for a tick or a key, moves the session on, and pushes the new
//! numbers to the surface. Faults end the session with an error notification.

use std::time::Duration;

use color_eyre::eyre::{Report, Result};
use strum::EnumIs;
use tokio::time::Instant;

use crate::session::{Session, SessionParams, SessionState, TickOutcome};
use crate::surface::{Bar, Event, Label, Surface, Wait};
use crate::TICK_INTERVAL_MS;

pub const COMPLETION_MESSAGE: &str = "All blocks completed!";
const PAUSE_LABEL: &str = "Pause";
const RESUME_LABEL: &str = "Resume";
const START_LABEL: &str = "Start";
const STOP_LABEL: &str = "Stop";

/// How a session left the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIs)]
pub enum SessionEnd {
  Finished,
  Cancelled,
  /// A fault was reported to the user; the session counts as cancelled.
  Faulted,
}

pub struct Controller<'a, S: Surface> {
  surface: &'a mut S,
  params: SessionParams,
  session: Session,
  next_tick: Instant,
  /// Part of the current second still owed when the clock was halted.
  tick_remainder: Duration,
}

fn tick_interval() -> Duration {
  Duration::from_millis(TICK_INTERVAL_MS)
}

impl<'a, S: Surface> Controller<'a, S> {
  pub fn new(surface: &'a mut S, params: &SessionParams) -> Self {
    Self {
      surface,
      params: *params,
      session: Session::new(params),
      next_tick: Instant::now() + tick_interval(),
      tick_remainder: tick_interval(),
    }
  }

  #[cfg(test)]
  fn session(&self) -> &Session {
    &self.session
  }

  pub async fn run(mut self) -> Result<SessionEnd> {
    self.log_start();
    if let Err(e) = self.render_all() {
      return self.fault(e).await;
    }
    self.next_tick = Instant::now() + tick_interval();

    loop {
      let wait = if self.session.state().is_running() {
        Wait::Until(self.next_tick)
      } else {
        Wait::Indefinitely
      };
      let step = match self.surface.poll_event(wait).await {
        Ok(event) => self.handle_event(event).await,
        Err(e) => Err(e),
      };
      if let Err(e) = step {
        return self.fault(e).await;
      }

      match self.session.state() {
        SessionState::Finished => return Ok(SessionEnd::Finished),
        SessionState::Cancelled => return Ok(SessionEnd::Cancelled),
        SessionState::Running | SessionState::Paused | SessionState::Stopped => {}
      }
    }
  }

  fn log_start(&self) {
    info!("Session started: {} x {}s blocks, {} questions each ({}s per question)",
      self.session.total_blocks(), self.session.seconds_per_block(),
      self.session.questions_per_block(), self.session.seconds_per_question());
  }

  async fn handle_event(&mut self, event: Event) -> Result<()> {
    match event {
      Event::Tick => self.tick().await,
      Event::PauseToggle => self.toggle_pause(),
      Event::StartStop => self.toggle_start_stop(),
      Event::Settings => self.open_settings().await,
      Event::Cancel | Event::WindowClosed => {
        info!("Session cancelled ({:?}) with {}s remaining", event, self.session.remaining_total_seconds());
        self.session.cancel();
        Ok(())
      }
    }
  }

  async fn tick(&mut self) -> Result<()> {
    let outcome = self.session.tick();
    if outcome.is_idle() {
      return Ok(());
    }
    self.next_tick += tick_interval();
    self.render_clock()?;

    match outcome {
      TickOutcome::QuestionAdvanced => {
        self.surface.render_label(Label::Question, &self.session.question_label())?;
      }
      TickOutcome::BlockAdvanced => {
        info!("Advanced to block {} of {}", self.session.current_block(), self.session.total_blocks());
        self.surface.render_label(Label::Block, &self.session.block_label())?;
        self.surface.render_label(Label::Question, &self.session.question_label())?;
      }
      TickOutcome::Completed => {
        info!("All {} blocks completed", self.session.total_blocks());
        self.surface.notify_completion(COMPLETION_MESSAGE).await?;
      }
      TickOutcome::Continue | TickOutcome::Idle => {}
    }
    Ok(())
  }

  fn toggle_pause(&mut self) -> Result<()> {
    match self.session.state() {
      SessionState::Running => self.switch_to(SessionState::Paused),
      SessionState::Paused => self.switch_to(SessionState::Running),
      // The pause control is disabled while stopped
      _ => Ok(()),
    }
  }

  fn toggle_start_stop(&mut self) -> Result<()> {
    match self.session.state() {
      SessionState::Stopped => self.switch_to(SessionState::Running),
      SessionState::Running | SessionState::Paused => self.switch_to(SessionState::Stopped),
      _ => Ok(()),
    }
  }

  /// Moves the session between Running, Paused and Stopped. Halting the clock keeps what is
  /// left of the current second, restarting it hands that back.
  fn switch_to(&mut self, target: SessionState) -> Result<()> {
    let was_running = self.session.state().is_running();
    let state = self.session.set_run_state(target);
    let now = Instant::now();
    if was_running && !state.is_running() {
      self.tick_remainder = self.next_tick.saturating_duration_since(now);
    } else if !was_running && state.is_running() {
      self.next_tick = now + self.tick_remainder;
    }
    info!("Session {:?} with {}s remaining", state, self.session.remaining_total_seconds());
    self.render_controls()
  }

  /// Pauses, lets the user edit the parameters, then applies them. A timing change starts a
  /// fresh session in the same run state; a transparency change only restyles the surface.
  async fn open_settings(&mut self) -> Result<()> {
    let before = self.session.state();
    if before.is_running() {
      self.switch_to(SessionState::Paused)?;
    }

    match self.surface.edit_settings(&self.params).await? {
      None => {
        info!("Settings dismissed");
        self.switch_to(before)
      }
      Some(next) if next.timing_differs(&self.params) => {
        info!("Settings changed the timing, restarting: {:?}", next);
        self.params = next;
        self.session = Session::new(&next);
        self.session.set_run_state(before);
        self.tick_remainder = tick_interval();
        self.next_tick = Instant::now() + tick_interval();
        self.log_start();
        self.render_all()
      }
      Some(next) => {
        info!("Transparency set to {}%", next.transparency);
        self.params = next;
        self.surface.set_transparency(next.transparency);
        self.switch_to(before)
      }
    }
  }

  fn render_all(&mut self) -> Result<()> {
    self.surface.set_transparency(self.params.transparency);
    self.surface.configure_progress(Bar::Block, self.session.seconds_per_block());
    self.surface.configure_progress(Bar::Question, self.session.seconds_per_question());
    self.surface.render_label(Label::Question, &self.session.question_label())?;
    self.surface.render_label(Label::Block, &self.session.block_label())?;
    self.render_controls()?;
    self.render_clock()
  }

  fn render_controls(&mut self) -> Result<()> {
    let state = self.session.state();
    self.surface.set_pause_control_label(if state.is_paused() { RESUME_LABEL } else { PAUSE_LABEL })?;
    self.surface.set_pause_control_enabled(!state.is_stopped())?;
    self.surface.set_start_control_label(if state.is_stopped() { START_LABEL } else { STOP_LABEL })
  }

  fn render_clock(&mut self) -> Result<()> {
    let session = &self.session;
    self.surface.render_countdown(session.remaining_block_seconds(), Some(session.remaining_question_seconds()))?;
    self.surface.render_progress(Bar::Block, session.elapsed_block_seconds())?;
    self.surface.render_progress(Bar::Question, session.elapsed_question_seconds())?;
    self.surface.render_label(Label::Total, &session.total_label())
  }

  async fn fault(mut self, e: Report) -> Result<SessionEnd> {
    error!("Session fault: {:?}", e);
    self.session.cancel();
    self.surface.notify_error(&format!("An error occurred: {}", e)).await?;
    Ok(SessionEnd::Faulted)
  }
}
