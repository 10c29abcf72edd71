use chrono::{DateTime, Local};

use crate::model::{Operation, Row};

/// Ordered rows plus header, cursor and scroll window for one view.
///
/// Only the UI thread mutates a store, and only through [`TableStore::apply`]
/// or the cursor helpers. Row producers hand over [`Operation`]s instead.
#[derive(Debug, Clone, Default)]
pub struct TableStore {
    header: Vec<String>,
    rows: Vec<Row>,
    selected: usize,
    top_row: usize,
    loading: bool,
    last_update: Option<DateTime<Local>>,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.rows.get(self.selected)
    }

    pub fn top_row(&self) -> usize {
        self.top_row
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn last_update(&self) -> Option<DateTime<Local>> {
        self.last_update
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.id() == id)
    }

    /// Applies a batch in order. The caller observes the store only before
    /// or after the whole batch.
    pub fn apply<I>(&mut self, batch: I)
    where
        I: IntoIterator<Item = Operation>,
    {
        for operation in batch {
            self.apply_one(operation);
        }
        self.last_update = Some(Local::now());
    }

    fn apply_one(&mut self, operation: Operation) {
        match operation {
            Operation::Clear => {
                self.rows.clear();
                self.top_row = 0;
            }
            Operation::SetColumns(columns) => self.header = columns,
            Operation::Added {
                row,
                index,
                sort_by_id,
            } => self.insert(row, index, sort_by_id),
            Operation::Modified(row) => match self.position(row.id()) {
                Some(position) => self.rows[position] = row,
                None => self.insert(row, None, false),
            },
            Operation::Deleted(id) => {
                if let Some(position) = self.position(&id) {
                    self.rows.remove(position);
                }
            }
            Operation::InitStart => self.loading = true,
            Operation::InitFinished => self.loading = false,
        }
        self.clamp_selection();
    }

    fn insert(&mut self, row: Row, index: Option<usize>, sort_by_id: bool) {
        // Watches may replay objects that are already listed; ids stay unique.
        if let Some(position) = self.position(row.id()) {
            self.rows[position] = row;
            return;
        }

        let position = if sort_by_id {
            self.rows
                .partition_point(|existing| existing.id() < row.id())
        } else if let Some(index) = index {
            index.min(self.rows.len())
        } else {
            self.rows.len()
        };
        self.rows.insert(position, row);
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
        self.top_row = self.top_row.min(self.selected);
    }

    /// Moves the cursor by `delta` rows, clamped to the table. Returns true
    /// when the selection changed.
    pub fn move_by(&mut self, delta: isize) -> bool {
        if self.rows.is_empty() {
            return false;
        }
        let max_index = self.rows.len().saturating_sub(1) as isize;
        let next = (self.selected as isize + delta).clamp(0, max_index) as usize;
        self.select(next)
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.rows.len() || index == self.selected {
            return false;
        }
        self.selected = index;
        true
    }

    pub fn select_first(&mut self) -> bool {
        self.select(0)
    }

    pub fn select_last(&mut self) -> bool {
        self.select(self.rows.len().saturating_sub(1))
    }

    /// Shifts the scroll window by the minimal amount so the selection is
    /// inside `[top_row, top_row + viewport)`.
    pub fn ensure_visible(&mut self, viewport: usize) {
        let viewport = viewport.max(1);
        if self.selected < self.top_row {
            self.top_row = self.selected;
        } else if self.selected >= self.top_row + viewport {
            self.top_row = self.selected + 1 - viewport;
        }
        let max_top = self.rows.len().saturating_sub(viewport);
        self.top_row = self.top_row.min(max_top).min(self.selected);
    }

    /// Row index under the `offset`-th visible line of the window.
    pub fn row_at(&self, offset: usize) -> Option<usize> {
        let index = self.top_row + offset;
        (index < self.rows.len()).then_some(index)
    }

    /// Longest rendered width per column, header included. The last column
    /// is unbounded and reported as `None`.
    pub fn column_widths(&self) -> Vec<Option<usize>> {
        let count = self.header.len();
        (0..count)
            .map(|column| {
                if column + 1 == count {
                    return None;
                }
                let header_width = self.header[column].chars().count();
                let widest = self
                    .rows
                    .iter()
                    .filter_map(|row| row.cells().get(column))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0);
                Some(header_width.max(widest).max(1))
            })
            .collect()
    }
}
