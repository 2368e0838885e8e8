use crate::errors::JanitorError;
use crate::types::QueueDetails;

/// Cursor and layout state for the queue list. `cursor_position` is 1-based
/// and stays within `1..=rows` whenever there are rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueListView {
    cursor_position: usize,
    rows: usize,
    columns: usize,
    contents: String,
}

impl Default for QueueListView {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueListView {
    pub fn new() -> Self {
        Self {
            cursor_position: 1,
            rows: 0,
            columns: 0,
            contents: String::new(),
        }
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn update_queues(&mut self, queues: &[QueueDetails]) {
        self.rows = queues.len();
        self.columns = queues
            .iter()
            .map(|queue| queue.queue_url.chars().count())
            .max()
            .unwrap_or(0);
        self.contents = queues
            .iter()
            .map(|queue| {
                format!(
                    "- url={}; messageCount={}\n",
                    queue.queue_url, queue.message_count
                )
            })
            .collect();

        // A shrunk model would leave the cursor past the last row.
        if self.rows > 0 && self.cursor_position > self.rows {
            self.cursor_position = self.rows;
        }
    }

    pub fn move_cursor_up(&mut self) -> Result<(), JanitorError> {
        if self.cursor_position <= 1 {
            return Err(JanitorError::OutOfRange(format!(
                "cannot move above row {}",
                self.cursor_position
            )));
        }
        self.cursor_position -= 1;
        Ok(())
    }

    pub fn move_cursor_down(&mut self) -> Result<(), JanitorError> {
        if self.cursor_position >= self.rows {
            return Err(JanitorError::OutOfRange(format!(
                "cannot move below row {} of {}",
                self.cursor_position, self.rows
            )));
        }
        self.cursor_position += 1;
        Ok(())
    }
}
