use std::time::{Duration, Instant};

use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row as TableRow, Table, TableState};

use crate::input::Action;
use crate::menu::{ActionList, MenuOutcome, RowAction};
use crate::model::{Operation, Row};
use crate::table::TableStore;

const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const PANEL: Color = Color::Rgb(16, 27, 44);
const SELECTED_BG: Color = Color::Rgb(24, 36, 58);
const DOUBLE_CLICK: Duration = Duration::from_millis(400);
// Border line plus the header line.
const BODY_OFFSET: u16 = 2;

/// Optional behaviours a table opts into when it is built.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct Capabilities {
    /// Enter or double-click reports [`TableOutcome::Selected`].
    pub selectable: bool,
    /// Cursor moves report [`TableOutcome::CursorChanged`].
    pub cursor_events: bool,
}

/// Result of feeding one input to a [`ListTable`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TableOutcome {
    Ignored,
    Handled,
    CursorChanged(Row),
    Selected(Row),
    RowAction(RowAction, Row),
}

/// Overrides the default longest-cell column sizing.
pub type ColumnSizer = fn(&TableStore, u16) -> Vec<Constraint>;

pub struct ListTable {
    title: String,
    store: TableStore,
    capabilities: Capabilities,
    actions: Option<ActionList>,
    column_sizer: Option<ColumnSizer>,
    area: Rect,
    menu_area: Option<Rect>,
    viewport: usize,
    last_click: Option<(usize, Instant)>,
}

impl ListTable {
    pub fn new(title: impl Into<String>, capabilities: Capabilities) -> Self {
        Self {
            title: title.into(),
            store: TableStore::new(),
            capabilities,
            actions: None,
            column_sizer: None,
            area: Rect::default(),
            menu_area: None,
            viewport: 10,
            last_click: None,
        }
    }

    pub fn with_actions(mut self, actions: ActionList) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn with_column_sizer(mut self, sizer: ColumnSizer) -> Self {
        self.column_sizer = Some(sizer);
        self
    }

    #[cfg(test)]
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }

    pub fn menu_open(&self) -> bool {
        self.actions.as_ref().is_some_and(ActionList::is_open)
    }

    pub fn contains(&self, column: u16, row: u16) -> bool {
        let inside = |area: Rect| {
            column >= area.x && column < area.right() && row >= area.y && row < area.bottom()
        };
        inside(self.area) || self.menu_area.is_some_and(inside)
    }

    pub fn apply(&mut self, batch: Vec<Operation>) {
        self.store.apply(batch);
        self.store.ensure_visible(self.viewport);
    }

    /// Moves the cursor to the row with `id` without reporting it.
    pub fn select_id(&mut self, id: &str) -> bool {
        let changed = self
            .store
            .position(id)
            .is_some_and(|index| self.store.select(index));
        self.store.ensure_visible(self.viewport);
        changed
    }

    pub fn close_menu(&mut self) {
        if let Some(actions) = self.actions.as_mut() {
            actions.close();
        }
    }

    pub fn handle_action(&mut self, action: Action) -> TableOutcome {
        if let Some(actions) = self.actions.as_mut()
            && actions.is_open()
        {
            return match actions.handle(action) {
                MenuOutcome::Chosen(chosen) => self.row_action(chosen),
                MenuOutcome::Consumed | MenuOutcome::Ignored => TableOutcome::Handled,
            };
        }

        match action {
            Action::Down => self.move_cursor(1),
            Action::Up => self.move_cursor(-1),
            Action::PageDown => self.move_cursor(self.page_step()),
            Action::PageUp => self.move_cursor(-self.page_step()),
            Action::Top => {
                let changed = self.store.select_first();
                self.cursor_outcome(changed)
            }
            Action::Bottom => {
                let changed = self.store.select_last();
                self.cursor_outcome(changed)
            }
            Action::Select if self.capabilities.selectable => self
                .store
                .selected_row()
                .cloned()
                .map(TableOutcome::Selected)
                .unwrap_or(TableOutcome::Ignored),
            Action::ToggleMenu if self.actions.is_some() => {
                if let Some(actions) = self.actions.as_mut() {
                    actions.open();
                }
                TableOutcome::Handled
            }
            other => match self.actions.as_ref().and_then(|actions| actions.dispatch(other)) {
                Some(chosen) => self.row_action(chosen),
                None => TableOutcome::Ignored,
            },
        }
    }

    /// Maps a click at screen coordinates onto the drop-down or a row.
    pub fn handle_click(&mut self, column: u16, row: u16) -> TableOutcome {
        if let Some(menu_area) = self.menu_area
            && self.menu_open()
        {
            let inside_menu = column >= menu_area.x
                && column < menu_area.right()
                && row > menu_area.y
                && row + 1 < menu_area.bottom();
            if !inside_menu {
                if let Some(actions) = self.actions.as_mut() {
                    actions.close();
                }
                return TableOutcome::Handled;
            }
            let line = (row - menu_area.y - 1) as usize;
            return match self.actions.as_mut().and_then(|actions| actions.choose(line)) {
                Some(chosen) => self.row_action(chosen),
                None => TableOutcome::Handled,
            };
        }

        let body_top = self.area.y + BODY_OFFSET;
        if row < body_top || row + 1 >= self.area.bottom() {
            return TableOutcome::Ignored;
        }
        let Some(index) = self.store.row_at((row - body_top) as usize) else {
            return TableOutcome::Ignored;
        };

        let now = Instant::now();
        let double = self
            .last_click
            .is_some_and(|(last, at)| last == index && now.duration_since(at) <= DOUBLE_CLICK);
        self.last_click = Some((index, now));

        if double && self.capabilities.selectable {
            self.last_click = None;
            return self
                .store
                .selected_row()
                .cloned()
                .map(TableOutcome::Selected)
                .unwrap_or(TableOutcome::Ignored);
        }

        let changed = self.store.select(index);
        self.cursor_outcome(changed)
    }

    pub fn scroll(&mut self, delta: isize) -> TableOutcome {
        self.move_cursor(delta)
    }

    fn move_cursor(&mut self, delta: isize) -> TableOutcome {
        let changed = self.store.move_by(delta);
        self.cursor_outcome(changed)
    }

    fn cursor_outcome(&mut self, changed: bool) -> TableOutcome {
        self.store.ensure_visible(self.viewport);
        if !changed {
            return TableOutcome::Handled;
        }
        match self.store.selected_row() {
            Some(row) if self.capabilities.cursor_events => TableOutcome::CursorChanged(row.clone()),
            _ => TableOutcome::Handled,
        }
    }

    fn row_action(&self, action: RowAction) -> TableOutcome {
        match self.store.selected_row() {
            Some(row) => TableOutcome::RowAction(action, row.clone()),
            None => TableOutcome::Ignored,
        }
    }

    fn page_step(&self) -> isize {
        self.viewport.saturating_sub(1).max(1) as isize
    }

    pub fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool) {
        self.area = area;
        self.viewport = area.height.saturating_sub(BODY_OFFSET + 1).max(1) as usize;
        self.store.ensure_visible(self.viewport);

        let constraints = match self.column_sizer {
            Some(sizer) => sizer(&self.store, area.width),
            None => auto_constraints(&self.store),
        };

        let header = TableRow::new(self.store.header().iter().map(|name| {
            Cell::from(name.clone()).style(Style::default().add_modifier(Modifier::BOLD))
        }))
        .height(1)
        .style(Style::default().fg(ACCENT));

        let top = self.store.top_row();
        let rows = self
            .store
            .rows()
            .iter()
            .skip(top)
            .take(self.viewport)
            .map(|row| {
                TableRow::new(
                    row.cells()
                        .iter()
                        .map(|cell| Cell::from(cell.clone()).style(Style::default().fg(Color::White))),
                )
            });

        let mut title = format!("{} ({})", self.title, self.store.len());
        if self.store.loading() {
            title.push_str(" loading…");
        }
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(if focused {
                Style::default().fg(ACCENT)
            } else {
                Style::default().fg(MUTED)
            })
            .style(Style::default().bg(PANEL));

        let table = Table::new(rows, constraints)
            .header(header)
            .block(block)
            .column_spacing(1)
            .row_highlight_style(Style::default().bg(SELECTED_BG).add_modifier(Modifier::BOLD))
            .highlight_symbol("▶ ");

        let mut state = TableState::default();
        if !self.store.is_empty() {
            state.select(Some(self.store.selected() - top));
        }
        frame.render_stateful_widget(table, area, &mut state);

        if area.width > 2 && area.height > 3 {
            let arrow_x = area.right() - 2;
            if top > 0 {
                frame.buffer_mut().set_string(
                    arrow_x,
                    area.y + BODY_OFFSET,
                    "▲",
                    Style::default().fg(Color::White),
                );
            }
            if self.store.len() > top + self.viewport {
                frame.buffer_mut().set_string(
                    arrow_x,
                    area.bottom() - 2,
                    "▼",
                    Style::default().fg(Color::White),
                );
            }
        }

        self.menu_area = None;
        if self.menu_open() {
            self.draw_menu(frame, area);
        }
    }

    fn draw_menu(&mut self, frame: &mut Frame, area: Rect) {
        let Some(actions) = self.actions.as_ref() else {
            return;
        };
        let cursor_line = (self.store.selected() - self.store.top_row()) as u16;
        let height = actions.items().len() as u16 + 2;
        let width = 22u16.min(area.width);
        let mut y = area.y + BODY_OFFSET + cursor_line + 1;
        if y + height > area.bottom() {
            y = area.bottom().saturating_sub(height).max(area.y);
        }
        let menu_area = Rect::new(area.x + 2, y, width, height.min(area.height)).intersection(area);

        let lines = actions
            .items()
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let text = format!(" {:<12}{:>5} ", item.action.label(), item.hint);
                if index == actions.selected() {
                    Line::styled(text, Style::default().fg(Color::Black).bg(ACCENT))
                } else {
                    Line::styled(text, Style::default().fg(Color::White))
                }
            })
            .collect::<Vec<_>>();

        frame.render_widget(Clear, menu_area);
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .title("Actions")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(ACCENT))
                    .style(Style::default().bg(PANEL)),
            ),
            menu_area,
        );
        self.menu_area = Some(menu_area);
    }
}

fn auto_constraints(store: &TableStore) -> Vec<Constraint> {
    let widths = store.column_widths();
    if widths.is_empty() {
        return vec![Constraint::Fill(1)];
    }
    widths
        .into_iter()
        .map(|width| match width {
            Some(width) => Constraint::Length(width as u16),
            None => Constraint::Fill(1),
        })
        .collect()
}
