use crate::api::{Clients, Deals, Resource};
use crate::dashboard::{AnalyticsController, DashboardController};
use crate::events::{AppEvent, Worker};
use crate::form::EntityForm;
use crate::gate::{self, GateDecision, Route};
use crate::list::{Dialog, ListController, ListEvent, Mutation, Notice};
use crate::models::{ClientRef, ProfileUpdate, RegisterRequest, User};
use crate::session::Session;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::widgets::TableState;
use std::io;
use tracing::{debug, warn};

const CLIENT_CHOICE_LIMIT: u32 = 100;
// Longest page number the go-to-page prompt takes.
const PAGE_INPUT_MAX: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Form,
    Confirm,
    QuickAdd,
    GoToPage,
    Auth,
}

pub struct AuthField {
    pub label: &'static str,
    pub value: String,
    pub secret: bool,
}

impl AuthField {
    fn text(label: &'static str, value: String) -> Self {
        AuthField {
            label,
            value,
            secret: false,
        }
    }

    fn secret(label: &'static str) -> Self {
        AuthField {
            label,
            value: String::new(),
            secret: true,
        }
    }
}

/// Fields of the login, register, password and profile screens.
#[derive(Default)]
pub struct AuthForm {
    pub fields: Vec<AuthField>,
    pub active: usize,
}

impl AuthForm {
    pub fn for_route(route: Route, user: Option<&User>) -> Self {
        let fields = match route {
            Route::Login => vec![
                AuthField::text("Username", String::new()),
                AuthField::secret("Password"),
            ],
            Route::Register => vec![
                AuthField::text("First name", String::new()),
                AuthField::text("Last name", String::new()),
                AuthField::text("Username", String::new()),
                AuthField::text("Email", String::new()),
                AuthField::secret("Password"),
                AuthField::secret("Confirm password"),
            ],
            Route::ForgotPassword | Route::ResetPassword => {
                vec![AuthField::text("Email", String::new())]
            }
            Route::Profile => {
                let profile = user.map(ProfileUpdate::from).unwrap_or_default();
                vec![
                    AuthField::text("First name", profile.first_name),
                    AuthField::text("Last name", profile.last_name),
                    AuthField::text("Username", profile.username),
                    AuthField::text("Email", profile.email),
                    AuthField::secret("Old password"),
                    AuthField::secret("New password"),
                    AuthField::secret("Confirm password"),
                ]
            }
            _ => Vec::new(),
        };
        AuthForm { fields, active: 0 }
    }

    pub fn value(&self, label: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
            .unwrap_or("")
    }

    fn next(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + 1) % self.fields.len();
        }
    }

    fn previous(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + self.fields.len() - 1) % self.fields.len();
        }
    }

    fn active_value(&mut self) -> Option<&mut String> {
        self.fields.get_mut(self.active).map(|f| &mut f.value)
    }
}

pub struct App {
    pub route: Route,
    /// Where to go after login when the gate bounced a private route.
    pub callback: Option<Route>,
    pub session: Session,
    pub clients: ListController<Clients>,
    pub deals: ListController<Deals>,
    pub dashboard: DashboardController,
    pub analytics: AnalyticsController,
    pub input_mode: InputMode,
    pub clients_table: TableState,
    pub deals_table: TableState,
    pub task_state: TableState,
    pub form_field: usize,
    pub auth_form: AuthForm,
    pub quick_add: String,
    pub page_input: String,
    worker: Worker,
}

impl App {
    pub fn new(session: Session, worker: Worker) -> App {
        App {
            route: Route::Login,
            callback: None,
            session,
            clients: ListController::new(),
            deals: ListController::new(),
            dashboard: DashboardController::default(),
            analytics: AnalyticsController::default(),
            input_mode: InputMode::Auth,
            clients_table: TableState::default(),
            deals_table: TableState::default(),
            task_state: TableState::default(),
            form_field: 0,
            auth_form: AuthForm::for_route(Route::Login, None),
            quick_add: String::new(),
            page_input: String::new(),
            worker,
        }
    }

    pub fn notice(&self) -> Option<&Notice> {
        match self.route {
            Route::Clients => self.clients.notice.as_ref(),
            Route::Deals => self.deals.notice.as_ref(),
            Route::Dashboard => self.dashboard.notice.as_ref(),
            Route::Analytics => self.analytics.notice.as_ref(),
            _ => None,
        }
    }

    fn clear_notice(&mut self) {
        match self.route {
            Route::Clients => self.clients.notice = None,
            Route::Deals => self.deals.notice = None,
            Route::Dashboard => self.dashboard.notice = None,
            Route::Analytics => self.analytics.notice = None,
            _ => {}
        }
    }

    /// Runs the route gate, then mounts whichever screen it allows.
    pub fn navigate(&mut self, route: Route) {
        let decision = gate::check(route, self.session.cookie_token().as_deref());
        if let GateDecision::RedirectToLogin { callback } = decision {
            self.callback = Some(callback);
        }
        let target = decision.target(route);
        debug!(requested = route.path(), target = target.path(), "navigate");

        self.route = target;
        self.session.error = None;
        self.mount();
    }

    fn mount(&mut self) {
        self.input_mode = InputMode::Normal;
        match self.route {
            Route::Dashboard => self.reload_dashboard(),
            Route::Clients => {
                let ticket = self.clients.refresh();
                self.worker.fetch(ticket, AppEvent::Clients);
            }
            Route::Deals => {
                let ticket = self.deals.refresh();
                self.worker.fetch(ticket, AppEvent::Deals);
                self.worker.load_client_choices(CLIENT_CHOICE_LIMIT);
            }
            Route::Analytics => self.reload_analytics(),
            Route::Profile => {
                self.auth_form = AuthForm::for_route(Route::Profile, self.session.user.as_ref());
            }
            public => {
                self.auth_form = AuthForm::for_route(public, None);
                self.input_mode = InputMode::Auth;
            }
        }
    }

    fn reload_dashboard(&mut self) {
        self.dashboard.begin_mount();
        self.worker.load_dashboard();
    }

    fn reload_analytics(&mut self) {
        self.analytics.begin_mount();
        self.worker.load_analytics();
    }

    /// Applies a finished backend call to whichever part of the app sent it.
    pub fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::Clients(event) => apply_list_event(
                &mut self.clients,
                &mut self.clients_table,
                self.route == Route::Clients,
                &mut self.input_mode,
                &self.worker,
                AppEvent::Clients,
                event,
            ),
            AppEvent::Deals(event) => apply_list_event(
                &mut self.deals,
                &mut self.deals_table,
                self.route == Route::Deals,
                &mut self.input_mode,
                &self.worker,
                AppEvent::Deals,
                event,
            ),
            AppEvent::ClientChoices(Ok(page)) => {
                self.deals
                    .form
                    .set_client_choices(page.results.iter().map(ClientRef::from).collect());
                debug!(count = self.deals.form.client_choices().len(), "client choices loaded");
            }
            AppEvent::ClientChoices(Err(err)) => {
                warn!(error = %err, "failed to load client choices")
            }
            AppEvent::DashboardLoaded(data) => {
                self.dashboard.finish_mount(data);
                select_first(&mut self.task_state, self.dashboard.tasks.len());
            }
            AppEvent::TaskToggled(toggle, result) => self.dashboard.finish_toggle(toggle, result),
            AppEvent::TaskAdded(added) => {
                self.dashboard.finish_quick_add(added);
                select_first(&mut self.task_state, self.dashboard.tasks.len());
            }
            AppEvent::AnalyticsLoaded(result) => self.analytics.finish_mount(result),
            AppEvent::LoggedIn(result) => {
                if let Some(home) = self.session.finish_login(self.worker.api(), result) {
                    let target = self.callback.take().unwrap_or(home);
                    self.navigate(target);
                }
            }
            AppEvent::LoggedOut(result) => {
                let route = self.session.finish_logout(self.worker.api(), result);
                self.clients.reset();
                self.deals.reset();
                self.dashboard = DashboardController::default();
                self.analytics = AnalyticsController::default();
                self.callback = None;
                self.navigate(route);
            }
            AppEvent::Registered(result) => {
                if let Some(route) = self.session.finish_register(result) {
                    self.navigate(route);
                }
            }
            AppEvent::ResetRequested(result) => {
                self.session.finish_password_reset(result);
            }
            AppEvent::PasswordChanged(result) => {
                if self.session.finish_change_password(result) {
                    for field in self.auth_form.fields.iter_mut().filter(|f| f.secret) {
                        field.value.clear();
                    }
                }
            }
            AppEvent::ProfileUpdated(result) => {
                self.session.finish_profile_update(result);
            }
        }
    }

    fn step_route(&mut self, forward: bool) {
        let routes = Route::NAVIGATION;
        let current = routes.iter().position(|r| *r == self.route).unwrap_or(0);
        let next = if forward {
            (current + 1) % routes.len()
        } else {
            (current + routes.len() - 1) % routes.len()
        };
        self.navigate(routes[next]);
    }

    fn logout(&mut self) {
        if self.session.loading {
            return;
        }
        self.session.begin_request();
        self.worker.logout();
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> io::Result<bool> {
        match self.input_mode {
            InputMode::Normal => {
                self.clear_notice();
                if self.route.is_public() {
                    return Ok(self.handle_public_key(key));
                }
                match key.code {
                    KeyCode::Char('q') => return Ok(true),
                    KeyCode::Tab => self.step_route(true),
                    KeyCode::BackTab => self.step_route(false),
                    KeyCode::Char('o') => self.logout(),
                    _ => self.handle_screen_key(key),
                }
            }
            InputMode::Search => self.handle_search_key(key),
            InputMode::GoToPage => self.handle_page_key(key),
            InputMode::Form | InputMode::Confirm => match self.route {
                Route::Clients => {
                    let submitted = handle_dialog_key(
                        &mut self.clients,
                        &mut self.input_mode,
                        &mut self.form_field,
                        key,
                    );
                    if let Some(mutation) = submitted {
                        self.worker.save(mutation, AppEvent::Clients);
                    }
                }
                Route::Deals => {
                    let submitted = handle_dialog_key(
                        &mut self.deals,
                        &mut self.input_mode,
                        &mut self.form_field,
                        key,
                    );
                    if let Some(mutation) = submitted {
                        self.worker.save(mutation, AppEvent::Deals);
                    }
                }
                _ => self.input_mode = InputMode::Normal,
            },
            InputMode::QuickAdd => match key.code {
                KeyCode::Enter => {
                    let input = std::mem::take(&mut self.quick_add);
                    if let Some(task) = self.dashboard.begin_quick_add(&input) {
                        self.worker.add_task(task);
                    }
                    self.input_mode = InputMode::Normal;
                }
                KeyCode::Char(c) => self.quick_add.push(c),
                KeyCode::Backspace => {
                    self.quick_add.pop();
                }
                KeyCode::Esc => {
                    self.quick_add.clear();
                    self.input_mode = InputMode::Normal;
                }
                _ => {}
            },
            InputMode::Auth => match key.code {
                KeyCode::Tab | KeyCode::Down => self.auth_form.next(),
                KeyCode::BackTab | KeyCode::Up => self.auth_form.previous(),
                KeyCode::Char(c) => {
                    if let Some(value) = self.auth_form.active_value() {
                        value.push(c);
                    }
                }
                KeyCode::Backspace => {
                    if let Some(value) = self.auth_form.active_value() {
                        value.pop();
                    }
                }
                KeyCode::Enter => self.submit_auth_form(),
                KeyCode::Esc => self.input_mode = InputMode::Normal,
                _ => {}
            },
        }
        Ok(false)
    }

    fn handle_public_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('l') => self.navigate(Route::Login),
            KeyCode::Char('r') => self.navigate(Route::Register),
            KeyCode::Char('f') => self.navigate(Route::ForgotPassword),
            KeyCode::Char('p') => self.navigate(Route::ResetPassword),
            KeyCode::Char('i') | KeyCode::Enter => self.input_mode = InputMode::Auth,
            _ => {}
        }
        false
    }

    fn handle_screen_key(&mut self, key: KeyEvent) {
        match self.route {
            Route::Clients | Route::Deals => match key.code {
                KeyCode::Char(c) if c.is_ascii_digit() => {
                    self.page_input = c.to_string();
                    self.input_mode = InputMode::GoToPage;
                }
                _ if self.route == Route::Clients => handle_list_key(
                    &mut self.clients,
                    &mut self.clients_table,
                    &mut self.input_mode,
                    &mut self.form_field,
                    &self.worker,
                    AppEvent::Clients,
                    key,
                ),
                _ => handle_list_key(
                    &mut self.deals,
                    &mut self.deals_table,
                    &mut self.input_mode,
                    &mut self.form_field,
                    &self.worker,
                    AppEvent::Deals,
                    key,
                ),
            },
            Route::Dashboard => match key.code {
                KeyCode::Char('j') | KeyCode::Down => {
                    select_next(&mut self.task_state, self.dashboard.tasks.len())
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    select_previous(&mut self.task_state, self.dashboard.tasks.len())
                }
                KeyCode::Char(' ') | KeyCode::Char('x') => {
                    let selected = self
                        .task_state
                        .selected()
                        .and_then(|i| self.dashboard.tasks.get(i))
                        .map(|t| (t.id, t.completed));
                    if let Some((id, completed)) = selected {
                        if let Some(toggle) = self.dashboard.begin_toggle(id, !completed) {
                            self.worker.toggle_task(toggle);
                        }
                    }
                }
                KeyCode::Char('a') => {
                    self.quick_add.clear();
                    self.input_mode = InputMode::QuickAdd;
                }
                KeyCode::Char('r') => self.reload_dashboard(),
                _ => {}
            },
            Route::Analytics => match key.code {
                KeyCode::Char('p') => self.analytics.cycle_period(),
                KeyCode::Char('r') => self.reload_analytics(),
                _ => {}
            },
            Route::Profile => {
                if matches!(key.code, KeyCode::Char('i') | KeyCode::Enter) {
                    self.input_mode = InputMode::Auth;
                }
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let query = match self.route {
            Route::Clients => &mut self.clients.search_query,
            Route::Deals => &mut self.deals.search_query,
            _ => {
                self.input_mode = InputMode::Normal;
                return;
            }
        };
        match key.code {
            KeyCode::Char(c) => query.push(c),
            KeyCode::Backspace => {
                query.pop();
            }
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                match self.route {
                    Route::Clients => {
                        let ticket = self.clients.submit_search();
                        self.worker.fetch(ticket, AppEvent::Clients);
                    }
                    Route::Deals => {
                        let ticket = self.deals.submit_search();
                        self.worker.fetch(ticket, AppEvent::Deals);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn handle_page_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if self.page_input.len() < PAGE_INPUT_MAX {
                    self.page_input.push(c);
                }
            }
            KeyCode::Backspace => {
                self.page_input.pop();
            }
            KeyCode::Esc => {
                self.page_input.clear();
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Enter => {
                let input = std::mem::take(&mut self.page_input);
                self.input_mode = InputMode::Normal;
                let Ok(page) = input.parse::<u32>() else {
                    return;
                };
                match self.route {
                    Route::Clients => {
                        if let Some(ticket) = self.clients.go_to_page(page) {
                            self.worker.fetch(ticket, AppEvent::Clients);
                        }
                    }
                    Route::Deals => {
                        if let Some(ticket) = self.deals.go_to_page(page) {
                            self.worker.fetch(ticket, AppEvent::Deals);
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn submit_auth_form(&mut self) {
        if self.session.loading {
            return;
        }
        match self.route {
            Route::Login => {
                let username = self.auth_form.value("Username").to_string();
                let password = self.auth_form.value("Password").to_string();
                self.session.begin_request();
                self.worker.login(username, password);
            }
            Route::Register => {
                let request = RegisterRequest {
                    username: self.auth_form.value("Username").trim().to_string(),
                    email: self.auth_form.value("Email").trim().to_string(),
                    password: self.auth_form.value("Password").to_string(),
                    re_password: self.auth_form.value("Confirm password").to_string(),
                    first_name: self.auth_form.value("First name").trim().to_string(),
                    last_name: self.auth_form.value("Last name").trim().to_string(),
                };
                if self.session.begin_register(&request) {
                    self.worker.register(request);
                }
            }
            Route::ForgotPassword | Route::ResetPassword => {
                let email = self.auth_form.value("Email").to_string();
                self.session.begin_request();
                self.worker.reset_password(email);
            }
            Route::Profile => {
                let old = self.auth_form.value("Old password").to_string();
                let new = self.auth_form.value("New password").to_string();
                let confirm = self.auth_form.value("Confirm password").to_string();
                if !(old.is_empty() && new.is_empty() && confirm.is_empty()) {
                    if self.session.begin_change_password(&new, &confirm) {
                        self.worker.change_password(old, new);
                    }
                } else {
                    let update = ProfileUpdate {
                        username: self.auth_form.value("Username").trim().to_string(),
                        email: self.auth_form.value("Email").trim().to_string(),
                        first_name: self.auth_form.value("First name").trim().to_string(),
                        last_name: self.auth_form.value("Last name").trim().to_string(),
                    };
                    self.session.begin_request();
                    self.worker.update_profile(update);
                }
            }
            _ => {}
        }
    }
}

fn apply_list_event<R: Resource>(
    list: &mut ListController<R>,
    table: &mut TableState,
    on_screen: bool,
    mode: &mut InputMode,
    worker: &Worker,
    wrap: fn(ListEvent<R>) -> AppEvent,
    event: ListEvent<R>,
) {
    let fetched = matches!(event, ListEvent::Fetched(..));
    if let Some(ticket) = list.apply(event) {
        worker.fetch(ticket, wrap);
    }
    // A dropped stale page leaves the newer request loading.
    if fetched && !list.is_loading {
        select_first(table, list.items.len());
    }
    if on_screen && list.dialog.is_none() && matches!(*mode, InputMode::Form | InputMode::Confirm) {
        *mode = InputMode::Normal;
    }
}

fn handle_list_key<R: Resource>(
    list: &mut ListController<R>,
    table: &mut TableState,
    mode: &mut InputMode,
    form_field: &mut usize,
    worker: &Worker,
    wrap: fn(ListEvent<R>) -> AppEvent,
    key: KeyEvent,
) {
    let len = list.items.len();
    let ticket = match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            select_next(table, len);
            None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            select_previous(table, len);
            None
        }
        KeyCode::Char('h') | KeyCode::Left => list.previous_page(),
        KeyCode::Char('l') | KeyCode::Right => list.next_page(),
        KeyCode::Char('r') => Some(list.refresh()),
        KeyCode::Char('/') => {
            *mode = InputMode::Search;
            None
        }
        KeyCode::Char('a') => {
            list.open_create();
            *form_field = 0;
            *mode = InputMode::Form;
            None
        }
        KeyCode::Char('e') | KeyCode::Enter => {
            if let Some(index) = table.selected() {
                list.open_edit(index);
                if list.dialog == Some(Dialog::Edit) {
                    *form_field = 0;
                    *mode = InputMode::Form;
                }
            }
            None
        }
        KeyCode::Char('d') => {
            if let Some(index) = table.selected() {
                list.open_delete(index);
                if list.dialog == Some(Dialog::Delete) {
                    *mode = InputMode::Confirm;
                }
            }
            None
        }
        _ => None,
    };
    if let Some(ticket) = ticket {
        worker.fetch(ticket, wrap);
    }
}

/// Edits the open popup. Returns the save to send when the user confirms.
fn handle_dialog_key<R: Resource>(
    list: &mut ListController<R>,
    mode: &mut InputMode,
    form_field: &mut usize,
    key: KeyEvent,
) -> Option<Mutation<R>> {
    let fields = <R::Form as EntityForm>::FIELDS;
    let mut submitted = None;
    match list.dialog {
        Some(Dialog::Delete) => match key.code {
            KeyCode::Char('y') => submitted = list.begin_submit(),
            KeyCode::Char('n') | KeyCode::Esc => list.close_dialog(),
            _ => {}
        },
        Some(_) => {
            let field = fields[(*form_field).min(fields.len() - 1)];
            let is_choice = <R::Form as EntityForm>::is_choice(field);
            match key.code {
                KeyCode::Tab | KeyCode::Down => *form_field = (*form_field + 1) % fields.len(),
                KeyCode::BackTab | KeyCode::Up => {
                    *form_field = (*form_field + fields.len() - 1) % fields.len()
                }
                KeyCode::Left if is_choice => list.form.cycle(field, false),
                KeyCode::Right if is_choice => list.form.cycle(field, true),
                KeyCode::Char(c) if !is_choice => {
                    let mut value = list.form.value(field);
                    value.push(c);
                    list.form.set_field(field, value);
                }
                KeyCode::Backspace if !is_choice => {
                    let mut value = list.form.value(field);
                    value.pop();
                    list.form.set_field(field, value);
                }
                KeyCode::Enter => submitted = list.begin_submit(),
                KeyCode::Esc => list.close_dialog(),
                _ => {}
            }
        }
        None => {}
    }
    if list.dialog.is_none() {
        *mode = InputMode::Normal;
    }
    submitted
}

fn select_first(state: &mut TableState, len: usize) {
    state.select(if len == 0 { None } else { Some(0) });
}

fn select_next(state: &mut TableState, len: usize) {
    if len == 0 {
        return;
    }
    let i = match state.selected() {
        Some(i) if i >= len - 1 => 0,
        Some(i) => i + 1,
        None => 0,
    };
    state.select(Some(i));
}

fn select_previous(state: &mut TableState, len: usize) {
    if len == 0 {
        return;
    }
    let i = match state.selected() {
        Some(0) | None => len - 1,
        Some(i) => i - 1,
    };
    state.select(Some(i));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::session::MemoryTokenStore;
    use crossterm::event::KeyModifiers;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedReceiver;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_login_form_fields() {
        let form = AuthForm::for_route(Route::Login, None);
        let labels: Vec<_> = form.fields.iter().map(|f| f.label).collect();
        assert_eq!(labels, vec!["Username", "Password"]);
        assert!(form.fields[1].secret);
    }

    #[test]
    fn test_profile_form_prefilled_from_user() {
        let user = User {
            id: 1,
            username: "jdoe".to_string(),
            email: "j@doe.io".to_string(),
            first_name: Some("Jane".to_string()),
            last_name: None,
            is_staff: None,
        };
        let form = AuthForm::for_route(Route::Profile, Some(&user));
        assert_eq!(form.value("Username"), "jdoe");
        assert_eq!(form.value("First name"), "Jane");
        assert_eq!(form.value("Last name"), "");
        assert_eq!(form.value("Old password"), "");
    }

    #[test]
    fn test_auth_form_field_cycling_wraps() {
        let mut form = AuthForm::for_route(Route::Login, None);
        form.previous();
        assert_eq!(form.active, 1);
        form.next();
        assert_eq!(form.active, 0);
    }

    #[test]
    fn test_row_selection_wraps() {
        let mut state = TableState::default();
        select_next(&mut state, 3);
        assert_eq!(state.selected(), Some(0));
        select_previous(&mut state, 3);
        assert_eq!(state.selected(), Some(2));
        select_next(&mut state, 3);
        assert_eq!(state.selected(), Some(0));
        select_first(&mut state, 0);
        assert_eq!(state.selected(), None);
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn logged_out_app(base_url: &str) -> (App, UnboundedReceiver<AppEvent>) {
        let api = Arc::new(ApiClient::new(base_url).unwrap());
        let (worker, events) = Worker::new(api);
        let session = Session::new(
            Arc::new(MemoryTokenStore::default()),
            Arc::new(MemoryTokenStore::default()),
        );
        (App::new(session, worker), events)
    }

    fn logged_in_app(base_url: &str) -> (App, UnboundedReceiver<AppEvent>) {
        let api = Arc::new(ApiClient::new(base_url).unwrap());
        let (worker, events) = Worker::new(api);
        let session = Session::new(
            Arc::new(MemoryTokenStore::with_token("tok")),
            Arc::new(MemoryTokenStore::with_token("tok")),
        );
        (App::new(session, worker), events)
    }

    fn clients_json(first: u64, count: u64) -> serde_json::Value {
        let results: Vec<_> = (first..first + 10)
            .map(|id| {
                json!({
                    "id": id,
                    "name": format!("Client {}", id),
                    "email": format!("c{}@example.com", id),
                    "status": "active",
                    "created_at": "2024-02-01T09:30:00Z"
                })
            })
            .collect();
        json!({ "results": results, "count": count })
    }

    #[test]
    fn test_navigation_without_token_lands_on_login() {
        // Nothing listens here; a login screen never calls the backend on mount.
        let (mut app, mut events) = logged_out_app("http://127.0.0.1:9");

        app.navigate(Route::Deals);

        assert_eq!(app.route, Route::Login);
        assert_eq!(app.callback, Some(Route::Deals));
        assert_eq!(app.input_mode, InputMode::Auth);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_reset_password_is_reachable_from_public_screens() {
        let (mut app, _events) = logged_out_app("http://127.0.0.1:9");
        app.navigate(Route::Login);
        app.input_mode = InputMode::Normal;

        app.handle_input(key(KeyCode::Char('p'))).unwrap();

        assert_eq!(app.route, Route::ResetPassword);
        assert_eq!(app.input_mode, InputMode::Auth);
        let labels: Vec<_> = app.auth_form.fields.iter().map(|f| f.label).collect();
        assert_eq!(labels, vec!["Email"]);
    }

    #[tokio::test]
    async fn test_jump_to_two_digit_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clients/"))
            .and(query_param("page", "12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(clients_json(111, 120)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/clients/"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(clients_json(1, 120)))
            .mount(&server)
            .await;
        let (mut app, mut events) = logged_in_app(&server.uri());

        app.navigate(Route::Clients);
        assert!(app.clients.is_loading);
        app.apply(events.recv().await.unwrap());
        assert_eq!(app.clients.total_pages, 12);

        app.handle_input(key(KeyCode::Char('1'))).unwrap();
        app.handle_input(key(KeyCode::Char('2'))).unwrap();
        assert_eq!(app.input_mode, InputMode::GoToPage);
        assert_eq!(app.page_input, "12");

        app.handle_input(key(KeyCode::Enter)).unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.clients.is_loading);
        app.apply(events.recv().await.unwrap());

        assert_eq!(app.clients.current_page, 12);
        assert!(!app.clients.has_next());
        assert_eq!(app.clients.items.len(), 10);
        assert_eq!(app.clients_table.selected(), Some(0));
    }

    #[test]
    fn test_page_prompt_cancel_and_out_of_range() {
        let (mut app, mut events) = logged_in_app("http://127.0.0.1:9");
        app.route = Route::Clients;
        app.input_mode = InputMode::Normal;
        app.clients.total_pages = 3;

        app.handle_input(key(KeyCode::Char('7'))).unwrap();
        app.handle_input(key(KeyCode::Esc)).unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.page_input, "");

        app.handle_input(key(KeyCode::Char('4'))).unwrap();
        app.handle_input(key(KeyCode::Enter)).unwrap();
        assert!(!app.clients.is_loading);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_login_keeps_login_screen() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;
        let (mut app, mut events) = logged_out_app(&server.uri());
        app.navigate(Route::Login);

        app.handle_input(key(KeyCode::Enter)).unwrap();
        assert!(app.session.loading);
        app.apply(events.recv().await.unwrap());

        assert!(!app.session.loading);
        assert_eq!(app.route, Route::Login);
        assert_eq!(app.session.error.as_deref(), Some("Login failed"));
    }
}
