use crate::controller::{ControllerOutcome, QueueListController, COUNT_HEADER, URL_HEADER};
use crate::errors::JanitorError;
use crate::hotkeys::{action_for_key_event, HotkeyAction};
use crate::logging::append_run_log;
use crate::types::{PurgeNotice, QueueListModel};
use crossterm::cursor::Show;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{Backend, CrosstermBackend, TestBackend};
use ratatui::Terminal;
use serde_json::json;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::mpsc::{Receiver, SyncSender};
use std::time::Duration;

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub trait InputSource {
    /// Waits up to `timeout` for the next bound key. `Ok(None)` means nothing
    /// actionable arrived; the caller redraws and asks again.
    fn next_action(&mut self, timeout: Duration) -> Result<Option<HotkeyAction>, JanitorError>;
}

pub struct CrosstermInput;

impl InputSource for CrosstermInput {
    fn next_action(&mut self, timeout: Duration) -> Result<Option<HotkeyAction>, JanitorError> {
        if !event::poll(timeout).map_err(surface)? {
            return Ok(None);
        }
        match event::read().map_err(surface)? {
            Event::Key(key) => Ok(action_for_key_event(&key)),
            _ => Ok(None),
        }
    }
}

/// Replays a fixed list of actions, then quits.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    actions: VecDeque<HotkeyAction>,
}

impl ScriptedInput {
    pub fn new(actions: impl IntoIterator<Item = HotkeyAction>) -> Self {
        Self {
            actions: actions.into_iter().collect(),
        }
    }
}

impl InputSource for ScriptedInput {
    fn next_action(&mut self, _timeout: Duration) -> Result<Option<HotkeyAction>, JanitorError> {
        Ok(Some(self.actions.pop_front().unwrap_or(HotkeyAction::Quit)))
    }
}

pub fn render_queue_list(
    controller: &QueueListController,
    status: &str,
    width: u16,
    height: u16,
) -> Result<String, JanitorError> {
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).map_err(surface)?;
    terminal
        .draw(|frame| controller.draw(frame, status))
        .map_err(surface)?;

    let buffer = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..height {
        for x in 0..width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    Ok(out)
}

/// Plain two-column table for non-interactive output.
pub fn render_queue_table_lines(queues: &QueueListModel) -> Vec<String> {
    let count_width = COUNT_HEADER.len();
    let mut lines = Vec::with_capacity(queues.len() + 1);
    lines.push(format!("{COUNT_HEADER:<count_width$}  {URL_HEADER}"));
    for queue in queues.iter() {
        lines.push(format!(
            "{:<count_width$}  {}",
            queue.message_count, queue.queue_url
        ));
    }
    lines
}

/// Takes over the terminal until the operator quits. Purge requests go out on
/// `purge_tx`; outcomes arriving on `notices` replace the status line.
pub fn run_interactive_list(
    model: QueueListModel,
    purge_tx: SyncSender<String>,
    notices: Option<Receiver<PurgeNotice>>,
    status: String,
) -> Result<(), JanitorError> {
    let mut controller = QueueListController::new(model, purge_tx);

    let mut guard = TerminalGuard::new(io::stdout());
    guard.enable_raw_mode()?;
    guard.enter_alternate_screen()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout())).map_err(surface)?;

    let result = drive_session(
        &mut terminal,
        &mut controller,
        &mut CrosstermInput,
        notices.as_ref(),
        status,
    );
    drop(terminal);
    let restored = guard.restore();
    result.and(restored)
}

/// Undoes raw mode and the alternate screen on every exit path, including
/// early returns and panics, by restoring on drop.
pub struct TerminalGuard<W: Write> {
    out: W,
    raw_mode: bool,
    alternate_screen: bool,
}

impl<W: Write> TerminalGuard<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            raw_mode: false,
            alternate_screen: false,
        }
    }

    pub fn enable_raw_mode(&mut self) -> Result<(), JanitorError> {
        enable_raw_mode().map_err(surface)?;
        self.raw_mode = true;
        Ok(())
    }

    pub fn enter_alternate_screen(&mut self) -> Result<(), JanitorError> {
        execute!(self.out, EnterAlternateScreen).map_err(surface)?;
        self.alternate_screen = true;
        Ok(())
    }

    /// Restores whatever was entered. Safe to call more than once; the first
    /// error is returned after every step has been attempted.
    pub fn restore(&mut self) -> Result<(), JanitorError> {
        let mut first_error = None;
        if self.alternate_screen {
            self.alternate_screen = false;
            if let Err(error) = execute!(self.out, LeaveAlternateScreen, Show) {
                first_error.get_or_insert(surface(error));
            }
        }
        if self.raw_mode {
            self.raw_mode = false;
            if let Err(error) = disable_raw_mode() {
                first_error.get_or_insert(surface(error));
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<W: Write> Drop for TerminalGuard<W> {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

pub fn drive_session<B: Backend>(
    terminal: &mut Terminal<B>,
    controller: &mut QueueListController,
    input: &mut dyn InputSource,
    notices: Option<&Receiver<PurgeNotice>>,
    mut status: String,
) -> Result<(), JanitorError> {
    append_run_log(
        "info",
        "session.started",
        json!({ "queues": controller.view().rows() }),
    );
    loop {
        if let Some(notices) = notices {
            for notice in notices.try_iter() {
                status = notice.status_line();
            }
        }
        terminal
            .draw(|frame| controller.draw(frame, &status))
            .map_err(surface)?;

        let Some(action) = input.next_action(INPUT_POLL_INTERVAL)? else {
            continue;
        };
        if action == HotkeyAction::Quit {
            break;
        }
        if let ControllerOutcome::PurgeRequested(queue_url) = controller.handle_input(action)? {
            status = format!("purge requested for {queue_url}");
        }
    }
    append_run_log(
        "info",
        "session.ended",
        json!({ "cursor_position": controller.view().cursor_position() }),
    );
    Ok(())
}

fn surface(error: impl std::fmt::Display) -> JanitorError {
    JanitorError::Surface(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::{drive_session, ScriptedInput, TerminalGuard};
    use crate::controller::QueueListController;
    use crate::hotkeys::HotkeyAction;
    use crate::types::{QueueDetails, QueueListModel};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::sync::mpsc;

    #[test]
    fn scripted_session_moves_cursor_and_emits_one_purge() {
        let model = QueueListModel::new(vec![
            QueueDetails::new("q/a", 1),
            QueueDetails::new("q/b", 2),
            QueueDetails::new("q/c", 3),
        ]);
        let (tx, rx) = mpsc::sync_channel(4);
        let mut ctrl = QueueListController::new(model, tx);
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).expect("terminal");
        let mut input = ScriptedInput::new([
            HotkeyAction::CursorDown,
            HotkeyAction::CursorDown,
            HotkeyAction::CursorDown,
            HotkeyAction::CursorUp,
            HotkeyAction::Purge,
        ]);

        drive_session(&mut terminal, &mut ctrl, &mut input, None, String::new()).expect("session");

        assert_eq!(ctrl.view().cursor_position(), 2);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!["q/b".to_string()]);
    }

    const ENTER_ALT: &str = "\x1b[?1049h";
    const LEAVE_ALT: &str = "\x1b[?1049l";

    #[test]
    fn guard_leaves_alternate_screen_when_dropped_early() {
        let mut out = Vec::new();
        {
            let mut guard = TerminalGuard::new(&mut out);
            guard.enter_alternate_screen().expect("enter");
        }
        let written = String::from_utf8(out).expect("utf8");
        assert!(written.starts_with(ENTER_ALT));
        assert!(written.contains(LEAVE_ALT));
    }

    #[test]
    fn guard_restores_terminal_when_session_panics() {
        let mut out = Vec::new();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut guard = TerminalGuard::new(&mut out);
            guard.enter_alternate_screen().expect("enter");
            panic!("draw failed");
        }));
        assert!(outcome.is_err());
        let written = String::from_utf8(out).expect("utf8");
        assert!(written.contains(LEAVE_ALT));
    }

    #[test]
    fn explicit_restore_runs_once() {
        let mut out = Vec::new();
        {
            let mut guard = TerminalGuard::new(&mut out);
            guard.enter_alternate_screen().expect("enter");
            guard.restore().expect("restore");
        }
        let written = String::from_utf8(out).expect("utf8");
        assert_eq!(written.matches(LEAVE_ALT).count(), 1);
    }
}
