use std::time::Duration;

use color_eyre::eyre::{eyre, Result};
use crossterm::event::{KeyEvent, KeyEventKind};
use futures::{FutureExt, StreamExt};
use ratatui::backend::CrosstermBackend as Backend;

/// Raw input forwarded from the terminal reader task.
#[derive(Clone, Debug)]
pub enum TermEvent {
  Error,
  Closed,
  Resize,
  Key(KeyEvent),
}

pub struct Tui {
  pub terminal: ratatui::Terminal<Backend<std::io::Stderr>>,
  pub task: tokio::task::JoinHandle<()>,
  pub cancellation_token: tokio_util::sync::CancellationToken,
  pub event_rx: tokio::sync::mpsc::UnboundedReceiver<TermEvent>,
  pub event_tx: tokio::sync::mpsc::UnboundedSender<TermEvent>,
  closed: bool,
}

impl Tui {
  pub fn new() -> Result<Tui> {
    let mut terminal = ratatui::Terminal::new(Backend::new(std::io::stderr()))?;
    terminal.clear()?;
    let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
    let cancellation_token = tokio_util::sync::CancellationToken::new();
    let task = tokio::spawn(async {});
    Ok(Self { terminal, task, cancellation_token, event_rx, event_tx, closed: false })
  }

  /// Waits for the next terminal event. Never returns `None` while the Tui is alive since
  /// it holds a sender itself. Once the input stream has closed every call reports `Closed`.
  pub async fn next(&mut self) -> Option<TermEvent> {
    if self.closed {
      return Some(TermEvent::Closed);
    }
    let event = self.event_rx.recv().await;
    if matches!(event, Some(TermEvent::Closed)) {
      self.closed = true;
    }
    event
  }

  pub fn is_closed(&self) -> bool {
    self.closed
  }

  pub fn enter(&mut self) -> Result<()> {
    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(std::io::stderr(), crossterm::terminal::EnterAlternateScreen, crossterm::cursor::Hide)?;
    self.start();
    Ok(())
  }

  pub fn exit(&self) -> Result<()> {
    self.stop()?;
    crossterm::execute!(std::io::stderr(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show)?;
    crossterm::terminal::disable_raw_mode()?;
    Ok(())
  }

  pub fn cancel(&self) {
    self.cancellation_token.cancel();
  }

  pub fn stop(&self) -> Result<()> {
    self.cancel();
    let mut counter = 0;
    while !self.task.is_finished() {
      std::thread::sleep(Duration::from_millis(250));
      counter += 1;
      if counter > 5 {
        self.task.abort();
      }
      if counter > 10 {
        log::error!("Failed to abort input task for unknown reason");
        return Err(eyre!("Unable to abort input task"));
      }
    }
    Ok(())
  }

  /// Spawns the reader task. Ticks are not produced here; callers race `next` against
  /// their own deadline.
  pub fn start(&mut self) {
    self.cancel();
    self.cancellation_token = tokio_util::sync::CancellationToken::new();
    let _cancellation_token = self.cancellation_token.clone();
    let _event_tx = self.event_tx.clone();
    self.task = tokio::spawn(async move {
      let mut reader = crossterm::event::EventStream::new();
      loop {
        let crossterm_event = reader.next().fuse();
        tokio::select! {
          _ = _cancellation_token.cancelled() => {
            break;
          }
          maybe_event = crossterm_event => {
            let event = match maybe_event {
              Some(Ok(crossterm::event::Event::Key(key))) => {
                if key.kind != KeyEventKind::Press {
                  continue;
                }
                TermEvent::Key(key)
              }
              Some(Ok(crossterm::event::Event::Resize(_, _))) => TermEvent::Resize,
              Some(Ok(_)) => continue,
              Some(Err(e)) => {
                log::error!("Terminal input error: {}", e);
                TermEvent::Error
              }
              None => {
                log::info!("Terminal input stream ended");
                let _ = _event_tx.send(TermEvent::Closed);
                break;
              }
            };
            if let Err(e) = _event_tx.send(event) {
              log::error!("Failed to send terminal event: {}", e);
              break;
            }
          },
        }
      }
    });
  }
}

impl std::ops::Deref for Tui {
  type Target = ratatui::Terminal<Backend<std::io::Stderr>>;

  fn deref(&self) -> &Self::Target {
    &self.terminal
  }
}

impl std::ops::DerefMut for Tui {
  fn deref_mut(&mut self) -> &mut Self::Target {
    &mut self.terminal
  }
}

impl Drop for Tui {
  fn drop(&mut self) {
    if let Err(e) = self.exit() {
      eprintln!("Error during cleanup: {}", e);
    }
  }
}
