/////////////////////
/// BLOCKTIMER - exam practice block timer
///
/// Practice time is split into blocks of equal length and each block is divided evenly between
/// its questions. The question counter moves on by itself; when the last block runs out a
/// completion notice is shown.
/// - 'p' or 'space' pauses / resumes
/// - 'enter' or 't' stops / starts the clock, pause is disabled while stopped
/// - 's' opens the settings form over the running session
/// - 'q', 'x' or 'esc' cancels the session
///
pub const APP_VERSION: &str = "BLOCKTIMER V0.1.0";
pub const TICK_INTERVAL_MS: u64 = 1000;       // One tick per second
const LOG_FILE_NAME: &str = "blocktimer.log";

#[macro_use] extern crate log;
extern crate simplelog;
use simplelog::*;
use std::fs::File;

use color_eyre::eyre::Result;
use build_time::build_time_local;

mod controller;
mod panel;
mod session;
mod setup;
mod surface;
mod tui;

use controller::Controller;
use panel::TerminalSurface;
use setup::{FormMode, SetupForm};
use tui::Tui;

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  init_logging();
  info!("Logging for {} initialized (tick interval: {}ms)", APP_VERSION, TICK_INTERVAL_MS);

  let mut tui = Tui::new()?;
  tui.enter()?;

  let mut defaults = SetupForm::default_params();
  loop {
    let Some(params) = setup::run(&mut tui, &defaults, FormMode::Setup).await? else {
      break;
    };
    defaults = params;

    let mut surface = TerminalSurface::new(&mut tui);
    let end = Controller::new(&mut surface, &params).run().await?;
    info!("Session ended: {:?}", end);
    // After a fault the user starts over from setup
    if !end.is_faulted() {
      break;
    }
  }

  tui.exit()?;
  println!("Thanks for using {} (built: {})\n", APP_VERSION, build_time_local!("%Y-%b-%d at %H:%M:%S"));
  Ok(())
}

fn init_logging() {
  let mut loggers: Vec<Box<dyn SharedLogger>> = vec![
    TermLogger::new(LevelFilter::Warn, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
  ];
  match File::create(LOG_FILE_NAME) {
    Ok(log_file) => loggers.push(WriteLogger::new(LevelFilter::Info, Config::default(), log_file)),
    Err(e) => {
      eprintln!("Warning: Could not create log file '{}': {}", LOG_FILE_NAME, e);
      eprintln!("Continuing with terminal logging only.");
    }
  }

  CombinedLogger::init(loggers).unwrap_or_else(|e| {
    eprintln!("Warning: Could not initialize logger: {}", e);
  });
}
