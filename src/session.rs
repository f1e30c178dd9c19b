//! Countdown state for one practice session: a number of timed blocks, each split evenly
//! into questions. Pure logic, the controller feeds it ticks, pause toggles and start/stop.

use strum::EnumIs;

/// Validated setup values handed from the setup dialog to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionParams {
  pub minutes_per_block: u32,
  pub total_blocks: u32,
  pub questions_per_block: u32,
  pub transparency: u8,
}

impl SessionParams {
  /// True when the block length, block count or question count differ. Transparency alone
  /// does not count, it only restyles the surface.
  pub fn timing_differs(&self, other: &SessionParams) -> bool {
    self.minutes_per_block != other.minutes_per_block
      || self.total_blocks != other.total_blocks
      || self.questions_per_block != other.questions_per_block
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, EnumIs)]
pub enum SessionState {
  #[default]
  Running,
  Paused,
  /// Halted with the start/stop control. Counters are kept, pause has no effect here.
  Stopped,
  Finished,
  Cancelled,
}

/// What a single tick changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIs)]
pub enum TickOutcome {
  /// The session was paused, stopped or over, nothing moved.
  Idle,
  Continue,
  QuestionAdvanced,
  BlockAdvanced,
  Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
  seconds_per_block: u32,
  total_blocks: u32,
  questions_per_block: u32,
  seconds_per_question: u32,
  remaining_total_seconds: u32,
  elapsed_block_seconds: u32,
  elapsed_question_seconds: u32,
  current_question: u32,
  current_block: u32,
  state: SessionState,
}

impl Session {
  pub fn new(params: &SessionParams) -> Self {
    let seconds_per_block = params.minutes_per_block * 60;
    Self {
      seconds_per_block,
      total_blocks: params.total_blocks,
      questions_per_block: params.questions_per_block,
      // Floor division; zero when there are more questions than seconds.
      seconds_per_question: seconds_per_block / params.questions_per_block,
      remaining_total_seconds: seconds_per_block * params.total_blocks,
      elapsed_block_seconds: 0,
      elapsed_question_seconds: 0,
      current_question: 1,
      current_block: 1,
      state: SessionState::Running,
    }
  }

  pub fn tick(&mut self) -> TickOutcome {
    if !self.state.is_running() {
      return TickOutcome::Idle;
    }

    // The last block finishes the session at zero, so a running session always has a second left
    self.remaining_total_seconds -= 1;
    self.elapsed_block_seconds += 1;
    self.elapsed_question_seconds += 1;

    let mut outcome = TickOutcome::Continue;

    if self.elapsed_question_seconds >= self.seconds_per_question
      && self.current_question < self.questions_per_block
    {
      self.current_question += 1;
      self.elapsed_question_seconds = 0;
      outcome = TickOutcome::QuestionAdvanced;
    }

    if self.elapsed_block_seconds >= self.seconds_per_block {
      if self.current_block < self.total_blocks {
        self.elapsed_block_seconds = 0;
        self.elapsed_question_seconds = 0;
        self.current_question = 1;
        self.current_block += 1;
        outcome = TickOutcome::BlockAdvanced;
      } else {
        self.state = SessionState::Finished;
        outcome = TickOutcome::Completed;
      }
    }

    outcome
  }

  /// Flips Running and Paused. Stopped and the terminal states are left alone.
  pub fn toggle_pause(&mut self) -> SessionState {
    match self.state {
      SessionState::Running => self.set_run_state(SessionState::Paused),
      SessionState::Paused => self.set_run_state(SessionState::Running),
      other => other,
    }
  }

  /// Stop halts a running or paused session, start resumes a stopped one unpaused.
  pub fn toggle_start_stop(&mut self) -> SessionState {
    match self.state {
      SessionState::Stopped => self.set_run_state(SessionState::Running),
      SessionState::Running | SessionState::Paused => self.set_run_state(SessionState::Stopped),
      other => other,
    }
  }

  /// Moves between Running, Paused and Stopped. Finished and Cancelled are final, and a
  /// terminal target is refused; use `cancel` for that.
  pub fn set_run_state(&mut self, state: SessionState) -> SessionState {
    let live = |s: SessionState| s.is_running() || s.is_paused() || s.is_stopped();
    if live(self.state) && live(state) {
      self.state = state;
    }
    self.state
  }

  pub fn cancel(&mut self) {
    if !self.state.is_finished() {
      self.state = SessionState::Cancelled;
    }
  }

  pub fn state(&self) -> SessionState {
    self.state
  }

  pub fn seconds_per_block(&self) -> u32 {
    self.seconds_per_block
  }

  pub fn seconds_per_question(&self) -> u32 {
    self.seconds_per_question
  }

  pub fn total_blocks(&self) -> u32 {
    self.total_blocks
  }

  pub fn questions_per_block(&self) -> u32 {
    self.questions_per_block
  }

  pub fn remaining_total_seconds(&self) -> u32 {
    self.remaining_total_seconds
  }

  pub fn elapsed_block_seconds(&self) -> u32 {
    self.elapsed_block_seconds
  }

  pub fn elapsed_question_seconds(&self) -> u32 {
    self.elapsed_question_seconds
  }

  pub fn current_question(&self) -> u32 {
    self.current_question
  }

  pub fn current_block(&self) -> u32 {
    self.current_block
  }

  pub fn remaining_block_seconds(&self) -> u32 {
    self.seconds_per_block.saturating_sub(self.elapsed_block_seconds)
  }

  /// Runs to zero and stays there while the last question of a block soaks up leftover seconds.
  pub fn remaining_question_seconds(&self) -> u32 {
    self.seconds_per_question.saturating_sub(self.elapsed_question_seconds)
  }

  pub fn question_label(&self) -> String {
    format!("Question {} out of {}", self.current_question, self.questions_per_block)
  }

  pub fn block_label(&self) -> String {
    format!("Block {} out of {}", self.current_block, self.total_blocks)
  }

  pub fn total_label(&self) -> String {
    format!("Total {}", format_clock(self.remaining_total_seconds))
  }
}

/// mm:ss, minutes are not wrapped into hours.
pub fn format_clock(seconds: u32) -> String {
  format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
