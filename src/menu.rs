use crate::input::Action;

/// Per-row operations a resource view can offer.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RowAction {
    Describe,
    Edit,
    CopyName,
    Delete,
    Logs,
    PreviousLogs,
    Shell,
}

impl RowAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::Describe => "Describe",
            Self::Edit => "Edit",
            Self::CopyName => "Copy name",
            Self::Delete => "Delete",
            Self::Logs => "Logs",
            Self::PreviousLogs => "Prev logs",
            Self::Shell => "Shell",
        }
    }

    /// Actions that only make sense on a pod row.
    pub fn pod_only(self) -> bool {
        matches!(self, Self::Logs | Self::PreviousLogs | Self::Shell)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ActionItem {
    pub action: RowAction,
    pub hotkey: Action,
    pub hint: &'static str,
}

/// What the action list did with a piece of input.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MenuOutcome {
    Ignored,
    Consumed,
    Chosen(RowAction),
}

/// Hotkeys plus a drop-down menu over the same items. While the drop-down
/// is open it consumes every key.
#[derive(Debug, Clone, Default)]
pub struct ActionList {
    items: Vec<ActionItem>,
    open: bool,
    selected: usize,
}

impl ActionList {
    pub fn new(items: Vec<ActionItem>) -> Self {
        Self {
            items,
            open: false,
            selected: 0,
        }
    }

    pub fn resource_actions() -> Self {
        Self::new(vec![
            ActionItem {
                action: RowAction::Describe,
                hotkey: Action::Char('d'),
                hint: "d",
            },
            ActionItem {
                action: RowAction::Edit,
                hotkey: Action::Char('e'),
                hint: "e",
            },
            ActionItem {
                action: RowAction::CopyName,
                hotkey: Action::Char('c'),
                hint: "c",
            },
            ActionItem {
                action: RowAction::Delete,
                hotkey: Action::Delete,
                hint: "Del",
            },
        ])
    }

    /// The resource actions plus logs and shell.
    pub fn pod_actions() -> Self {
        let mut list = Self::resource_actions();
        list.items.extend([
            ActionItem {
                action: RowAction::Logs,
                hotkey: Action::Char('l'),
                hint: "l",
            },
            ActionItem {
                action: RowAction::PreviousLogs,
                hotkey: Action::Char('L'),
                hint: "L",
            },
            ActionItem {
                action: RowAction::Shell,
                hotkey: Action::Char('x'),
                hint: "x",
            },
        ]);
        list
    }

    pub fn items(&self) -> &[ActionItem] {
        &self.items
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn open(&mut self) {
        if !self.items.is_empty() {
            self.open = true;
            self.selected = 0;
        }
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Hotkey lookup used when the drop-down is closed.
    pub fn dispatch(&self, action: Action) -> Option<RowAction> {
        self.items
            .iter()
            .find(|item| item.hotkey == action)
            .map(|item| item.action)
    }

    /// Input handling while the drop-down is open.
    pub fn handle(&mut self, action: Action) -> MenuOutcome {
        if !self.open {
            return MenuOutcome::Ignored;
        }
        match action {
            Action::Down => {
                self.selected = (self.selected + 1).min(self.items.len().saturating_sub(1));
            }
            Action::Up => self.selected = self.selected.saturating_sub(1),
            Action::Select => {
                self.open = false;
                if let Some(item) = self.items.get(self.selected) {
                    return MenuOutcome::Chosen(item.action);
                }
            }
            Action::Cancel | Action::ToggleMenu => self.open = false,
            other => {
                if let Some(chosen) = self.dispatch(other) {
                    self.open = false;
                    return MenuOutcome::Chosen(chosen);
                }
            }
        }
        MenuOutcome::Consumed
    }

    /// Chooses the item on `line` of the open drop-down.
    pub fn choose(&mut self, line: usize) -> Option<RowAction> {
        let item = self.items.get(line)?;
        self.open = false;
        Some(item.action)
    }
}
