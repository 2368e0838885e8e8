use crate::errors::JanitorError;
use crate::hotkeys::{queue_list_controls_legend, HotkeyAction};
use crate::logging::append_run_log;
use crate::types::{QueueDetails, QueueListModel};
use crate::view::QueueListView;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use ratatui::Frame;
use serde_json::json;
use std::sync::mpsc::SyncSender;

pub const COUNT_HEADER: &str = "MESSAGE COUNT";
pub const URL_HEADER: &str = "SQS QUEUE URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerOutcome {
    Moved,
    Ignored,
    PurgeRequested(String),
}

pub struct QueueListController {
    queues: QueueListModel,
    view: QueueListView,
    purge_tx: SyncSender<String>,
}

impl QueueListController {
    pub fn new(queues: QueueListModel, purge_tx: SyncSender<String>) -> Self {
        let mut view = QueueListView::new();
        view.update_queues(&queues);
        Self {
            queues,
            view,
            purge_tx,
        }
    }

    pub fn view(&self) -> &QueueListView {
        &self.view
    }

    pub fn queues(&self) -> &QueueListModel {
        &self.queues
    }

    pub fn current_selection(&self) -> Option<&QueueDetails> {
        if self.view.rows() == 0 {
            return None;
        }
        self.queues.get(self.view.cursor_position() - 1)
    }

    /// Applies one key action. Cursor moves past either end are dropped
    /// silently. Purge requests block while the purge channel is full.
    pub fn handle_input(&mut self, action: HotkeyAction) -> Result<ControllerOutcome, JanitorError> {
        match action {
            HotkeyAction::CursorUp => Ok(match self.view.move_cursor_up() {
                Ok(()) => ControllerOutcome::Moved,
                Err(_) => ControllerOutcome::Ignored,
            }),
            HotkeyAction::CursorDown => Ok(match self.view.move_cursor_down() {
                Ok(()) => ControllerOutcome::Moved,
                Err(_) => ControllerOutcome::Ignored,
            }),
            HotkeyAction::Purge => {
                let Some(selection) = self.current_selection() else {
                    return Ok(ControllerOutcome::Ignored);
                };
                let queue_url = selection.queue_url.clone();
                append_run_log(
                    "info",
                    "purge.requested",
                    json!({
                        "queue_url": queue_url,
                        "message_count": selection.message_count,
                    }),
                );
                self.purge_tx
                    .send(queue_url.clone())
                    .map_err(|_| JanitorError::PurgeChannelClosed)?;
                Ok(ControllerOutcome::PurgeRequested(queue_url))
            }
            HotkeyAction::Quit => Ok(ControllerOutcome::Ignored),
        }
    }

    /// Rebuilds the table from the full model on every call.
    pub fn draw(&self, frame: &mut Frame<'_>, status: &str) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(4)])
            .split(frame.area());

        let header = Row::new(vec![COUNT_HEADER, URL_HEADER])
            .style(Style::default().add_modifier(Modifier::BOLD));
        let rows = self.queues.iter().map(|queue| {
            Row::new(vec![
                Cell::from(queue.message_count.to_string()),
                Cell::from(queue.queue_url.clone()),
            ])
        });
        let url_width = u16::try_from(self.view.columns()).unwrap_or(u16::MAX);
        let widths = [
            Constraint::Length(COUNT_HEADER.len() as u16),
            Constraint::Min(url_width.max(URL_HEADER.len() as u16)),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(2)
            .row_highlight_style(Style::default().bg(Color::White).fg(Color::Black))
            .highlight_symbol("> ")
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Queues ({})", self.view.rows())),
            );

        let mut state = TableState::default();
        if self.view.rows() > 0 {
            state.select(Some(self.view.cursor_position() - 1));
        }
        frame.render_stateful_widget(table, chunks[0], &mut state);

        let footer = Paragraph::new(format!("{}\n{status}", queue_list_controls_legend()))
            .block(Block::default().borders(Borders::ALL).title("Status"));
        frame.render_widget(footer, chunks[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::{ControllerOutcome, QueueListController};
    use crate::errors::JanitorError;
    use crate::hotkeys::HotkeyAction;
    use crate::types::{QueueDetails, QueueListModel};
    use std::sync::mpsc;

    #[test]
    fn purge_on_empty_model_is_ignored() {
        let (tx, rx) = mpsc::sync_channel(1);
        let mut ctrl = QueueListController::new(QueueListModel::default(), tx);
        assert_eq!(ctrl.current_selection(), None);
        assert_eq!(
            ctrl.handle_input(HotkeyAction::Purge),
            Ok(ControllerOutcome::Ignored)
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn purge_with_dropped_consumer_reports_closed_channel() {
        let (tx, rx) = mpsc::sync_channel(1);
        drop(rx);
        let model = QueueListModel::new(vec![QueueDetails::new("q/a", 1)]);
        let mut ctrl = QueueListController::new(model, tx);
        assert_eq!(
            ctrl.handle_input(HotkeyAction::Purge),
            Err(JanitorError::PurgeChannelClosed)
        );
    }
}
