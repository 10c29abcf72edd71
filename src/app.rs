use std::collections::VecDeque;

use ratatui::layout::Constraint;
use tokio::sync::oneshot;
use tracing::debug;

use crate::controller::{ResourceView, ViewContext};
use crate::input::{Action, MouseAction};
use crate::list_table::{Capabilities, ListTable, TableOutcome};
use crate::menu::ActionList;
use crate::model::{NamespaceScope, Operation, ResourceType, Row, TableFormat};
use crate::status::{StatusEvent, StatusLevel, StatusLine};
use crate::table::TableStore;
use crate::watch::{ViewBatch, ViewId};

/// Id of the synthetic "all namespaces" picker row.
pub const ALL_NAMESPACES_ID: &str = "*";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    Confirm,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FocusPane {
    Menu,
    Table,
    Picker,
}

struct PendingConfirm {
    prompt: String,
    reply: oneshot::Sender<bool>,
}

struct NamespacePicker {
    view: ResourceView,
    table: ListTable,
    return_focus: FocusPane,
}

pub struct App {
    running: bool,
    cluster: String,
    context: String,
    scope: NamespaceScope,
    format: TableFormat,
    view_context: ViewContext,
    menu: ListTable,
    view: ResourceView,
    table: ListTable,
    picker: Option<NamespacePicker>,
    next_view_id: ViewId,
    focus: FocusPane,
    show_help: bool,
    status: Option<StatusLine>,
    confirms: VecDeque<PendingConfirm>,
}

impl App {
    pub fn new(
        cluster: String,
        context: String,
        scope: NamespaceScope,
        resource: ResourceType,
        format: TableFormat,
        view_context: ViewContext,
    ) -> Self {
        let mut menu = ListTable::new(
            "Resources",
            Capabilities {
                selectable: true,
                cursor_events: true,
            },
        )
        .with_column_sizer(single_fill_column);
        let mut seed = vec![
            Operation::Clear,
            Operation::SetColumns(vec!["Resource".to_string()]),
        ];
        seed.extend(
            ResourceType::ALL
                .iter()
                .map(|resource| Operation::added(menu_row(*resource))),
        );
        seed.push(Operation::InitFinished);
        menu.apply(seed);
        menu.select_id(resource.plural());

        let first_view_id: ViewId = 1;
        let view = ResourceView::new(
            first_view_id,
            resource,
            scope.clone(),
            format,
            view_context.clone(),
        );
        let table = resource_table(resource, &scope, format);

        Self {
            running: true,
            cluster,
            context,
            scope,
            format,
            view_context,
            menu,
            view,
            table,
            picker: None,
            next_view_id: first_view_id + 1,
            focus: FocusPane::Table,
            show_help: false,
            status: None,
            confirms: VecDeque::new(),
        }
    }

    /// Shows the initial resource view.
    pub fn start(&mut self) {
        self.show_view();
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        if self.confirms.is_empty() {
            InputMode::Normal
        } else {
            InputMode::Confirm
        }
    }

    pub fn focus(&self) -> FocusPane {
        self.focus
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn scope(&self) -> &NamespaceScope {
        &self.scope
    }

    pub fn resource(&self) -> ResourceType {
        self.view.resource()
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    pub fn confirm_prompt(&self) -> Option<&str> {
        self.confirms.front().map(|pending| pending.prompt.as_str())
    }

    pub fn menu_mut(&mut self) -> &mut ListTable {
        &mut self.menu
    }

    pub fn table_mut(&mut self) -> &mut ListTable {
        &mut self.table
    }

    pub fn picker_mut(&mut self) -> Option<&mut ListTable> {
        self.picker.as_mut().map(|picker| &mut picker.table)
    }

    pub fn table(&self) -> &ListTable {
        &self.table
    }

    #[cfg(test)]
    fn view(&self) -> &ResourceView {
        &self.view
    }

    #[cfg(test)]
    fn picker_view(&self) -> Option<&ResourceView> {
        self.picker.as_ref().map(|picker| &picker.view)
    }

    pub fn set_status(&mut self, level: StatusLevel, message: impl Into<String>) {
        self.status = Some(StatusLine::new(level, message));
    }

    pub fn apply_action(&mut self, action: Action) {
        if let Some(pending) = self.confirms.pop_front() {
            let confirmed = matches!(action, Action::ConfirmYes);
            debug!("confirm '{}' answered {confirmed}", pending.prompt);
            let _ = pending.reply.send(confirmed);
            self.status = None;
            return;
        }

        if self.show_help && !matches!(action, Action::ToggleHelp | Action::Quit) {
            self.show_help = false;
            return;
        }

        match action {
            Action::Quit => self.running = false,
            Action::ToggleHelp => self.show_help = !self.show_help,
            Action::Refresh => self.refresh(),
            Action::PickNamespace => self.open_picker(),
            Action::Cancel if self.picker.is_some() && !self.focused_menu_open() => {
                self.close_picker()
            }
            Action::ToggleFocus if self.picker.is_none() && !self.focused_menu_open() => {
                self.focus = match self.focus {
                    FocusPane::Menu => FocusPane::Table,
                    FocusPane::Table | FocusPane::Picker => FocusPane::Menu,
                };
                self.table.close_menu();
            }
            other => self.route(other),
        }
    }

    pub fn apply_mouse(&mut self, action: MouseAction) {
        if self.mode() == InputMode::Confirm || self.show_help {
            return;
        }

        let (column, row, delta) = match action {
            MouseAction::Click { column, row } => (column, row, None),
            MouseAction::ScrollUp { column, row } => (column, row, Some(-1)),
            MouseAction::ScrollDown { column, row } => (column, row, Some(1)),
        };

        if let Some(picker) = self.picker.as_mut() {
            if !picker.table.contains(column, row) {
                return;
            }
            let outcome = match delta {
                Some(delta) => picker.table.scroll(delta),
                None => picker.table.handle_click(column, row),
            };
            self.on_picker_outcome(outcome);
            return;
        }

        let pane = if self.menu.contains(column, row) {
            FocusPane::Menu
        } else if self.table.contains(column, row) {
            FocusPane::Table
        } else {
            return;
        };
        if delta.is_none() {
            self.focus = pane;
        }

        let target = match pane {
            FocusPane::Menu => &mut self.menu,
            _ => &mut self.table,
        };
        let outcome = match delta {
            Some(delta) => target.scroll(delta),
            None => target.handle_click(column, row),
        };
        match pane {
            FocusPane::Menu => self.on_menu_outcome(outcome),
            _ => self.on_table_outcome(outcome),
        }
    }

    /// Applies a batch if it belongs to a live view generation.
    pub fn apply_batch(&mut self, batch: ViewBatch) {
        if batch.view == self.view.id() && batch.generation == self.view.generation() {
            self.table.apply(batch.ops);
            return;
        }
        if let Some(picker) = self.picker.as_mut()
            && batch.view == picker.view.id()
            && batch.generation == picker.view.generation()
        {
            picker.table.apply(batch.ops);
            return;
        }
        debug!(
            "dropping stale batch for view {} generation {}",
            batch.view, batch.generation
        );
    }

    pub fn apply_status(&mut self, event: StatusEvent) {
        match event {
            StatusEvent::Info(message) => self.set_status(StatusLevel::Info, message),
            StatusEvent::Error(message) => self.set_status(StatusLevel::Error, message),
            StatusEvent::Confirm { prompt, reply } => {
                self.set_status(StatusLevel::Prompt, prompt.clone());
                self.confirms.push_back(PendingConfirm { prompt, reply });
            }
        }
    }

    fn focused_menu_open(&self) -> bool {
        self.focus == FocusPane::Table && self.table.menu_open()
    }

    fn route(&mut self, action: Action) {
        match self.focus {
            FocusPane::Menu => {
                let outcome = self.menu.handle_action(action);
                self.on_menu_outcome(outcome);
            }
            FocusPane::Table => {
                let outcome = self.table.handle_action(action);
                self.on_table_outcome(outcome);
            }
            FocusPane::Picker => {
                if let Some(picker) = self.picker.as_mut() {
                    let outcome = picker.table.handle_action(action);
                    self.on_picker_outcome(outcome);
                }
            }
        }
    }

    fn on_menu_outcome(&mut self, outcome: TableOutcome) {
        match outcome {
            TableOutcome::CursorChanged(row) => {
                if let Some(resource) = ResourceType::from_token(row.id()) {
                    self.switch_resource(resource);
                }
            }
            TableOutcome::Selected(row) => {
                if let Some(resource) = ResourceType::from_token(row.id()) {
                    self.switch_resource(resource);
                }
                self.focus = FocusPane::Table;
            }
            _ => {}
        }
    }

    fn on_table_outcome(&mut self, outcome: TableOutcome) {
        if let TableOutcome::RowAction(action, row) = outcome {
            let _ = self.view.run_action(action, row);
        }
    }

    fn on_picker_outcome(&mut self, outcome: TableOutcome) {
        let TableOutcome::Selected(row) = outcome else {
            return;
        };
        let scope = if row.id() == ALL_NAMESPACES_ID {
            NamespaceScope::All
        } else {
            match row.metadata() {
                Some(metadata) => NamespaceScope::Named(metadata.name.clone()),
                None => match row.cells().first() {
                    Some(name) => NamespaceScope::Named(name.clone()),
                    None => return,
                },
            }
        };
        self.close_picker();
        self.switch_namespace(scope);
    }

    fn switch_resource(&mut self, resource: ResourceType) {
        if resource == self.view.resource() {
            return;
        }
        self.view.hide();
        self.view = ResourceView::new(
            self.allocate_view_id(),
            resource,
            self.scope.clone(),
            self.format,
            self.view_context.clone(),
        );
        self.table = resource_table(resource, &self.scope, self.format);
        self.menu.select_id(resource.plural());
        self.show_view();
    }

    fn switch_namespace(&mut self, scope: NamespaceScope) {
        self.set_status(StatusLevel::Info, format!("Namespace: {}", scope.label()));
        self.scope = scope.clone();
        self.view.hide();
        self.view.set_scope(scope);
        self.table
            .set_title(table_title(self.view.resource(), &self.scope));
        self.show_view();
    }

    fn refresh(&mut self) {
        if let Some(picker) = self.picker.as_mut() {
            picker.table.apply(vec![Operation::Clear]);
            picker.view.refresh();
            return;
        }
        self.view.hide();
        self.show_view();
    }

    fn show_view(&mut self) {
        self.table.apply(vec![Operation::Clear]);
        self.view.show();
    }

    fn open_picker(&mut self) {
        if self.picker.is_some() {
            return;
        }
        let all = Row::new(ALL_NAMESPACES_ID, vec!["all namespaces".to_string()]);
        // Each opening gets its own id so batches of a closed picker never match.
        let mut view = ResourceView::new(
            self.allocate_view_id(),
            ResourceType::Namespaces,
            NamespaceScope::All,
            TableFormat::picker(),
            self.view_context.clone(),
        )
        .with_extra_row(0, all);
        view.show();
        self.table.close_menu();
        self.picker = Some(NamespacePicker {
            view,
            table: ListTable::new(
                "Namespaces",
                Capabilities {
                    selectable: true,
                    cursor_events: false,
                },
            ),
            return_focus: self.focus,
        });
        self.focus = FocusPane::Picker;
    }

    fn close_picker(&mut self) {
        if let Some(mut picker) = self.picker.take() {
            picker.view.hide();
            self.focus = picker.return_focus;
        }
    }

    fn allocate_view_id(&mut self) -> ViewId {
        let id = self.next_view_id;
        self.next_view_id += 1;
        id
    }
}

fn single_fill_column(_store: &TableStore, _width: u16) -> Vec<Constraint> {
    vec![Constraint::Fill(1)]
}

fn menu_row(resource: ResourceType) -> Row {
    Row::new(resource.plural(), vec![resource.title().to_string()])
}

fn table_title(resource: ResourceType, scope: &NamespaceScope) -> String {
    if resource.namespaced() {
        format!("{} [{}]", resource.title(), scope.label())
    } else {
        resource.title().to_string()
    }
}

fn resource_table(resource: ResourceType, scope: &NamespaceScope, format: TableFormat) -> ListTable {
    let table = ListTable::new(table_title(resource, scope), Capabilities::default());
    if format.actions && resource == ResourceType::Pods {
        table.with_actions(ActionList::pod_actions())
    } else if format.actions {
        table.with_actions(ActionList::resource_actions())
    } else {
        table
    }
}
