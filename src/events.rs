//! Backend calls run on spawned tasks and report back to the UI loop as
//! `AppEvent`s, so a slow request never blocks drawing or key handling.

use crate::api::{
    ApiClient, AuthService, Clients, DashboardService, Deals, EntityService, ListQuery, Resource,
};
use crate::dashboard::{DashboardController, DashboardData, TaskAdded, TaskToggle};
use crate::error::ApiError;
use crate::list::{FetchTicket, ListEvent, Mutation};
use crate::models::{
    AnalyticsReport, AuthResponse, Client, NewTask, Page, ProfileUpdate, RegisterRequest, User,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Results sent from background tasks to the UI loop.
pub enum AppEvent {
    Clients(ListEvent<Clients>),
    Deals(ListEvent<Deals>),
    ClientChoices(Result<Page<Client>, ApiError>),
    DashboardLoaded(DashboardData),
    TaskToggled(TaskToggle, Result<(), ApiError>),
    TaskAdded(TaskAdded),
    AnalyticsLoaded(Result<AnalyticsReport, ApiError>),
    LoggedIn(Result<AuthResponse, ApiError>),
    LoggedOut(Result<(), ApiError>),
    Registered(Result<(), ApiError>),
    ResetRequested(Result<(), ApiError>),
    PasswordChanged(Result<(), ApiError>),
    ProfileUpdated(Result<User, ApiError>),
}

/// Spawns backend calls and forwards their results to the UI loop.
#[derive(Clone)]
pub struct Worker {
    api: Arc<ApiClient>,
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl Worker {
    pub fn new(api: Arc<ApiClient>) -> (Worker, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Worker { api, tx }, rx)
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn spawn<F, Fut>(&self, job: F)
    where
        F: FnOnce(Arc<ApiClient>) -> Fut + Send + 'static,
        Fut: Future<Output = AppEvent> + Send + 'static,
    {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = job(api).await;
            if tx.send(event).is_err() {
                debug!("ui loop gone, dropping backend result");
            }
        });
    }

    pub fn fetch<R: Resource>(&self, ticket: FetchTicket, wrap: fn(ListEvent<R>) -> AppEvent) {
        self.spawn(move |api| async move {
            let result = EntityService::<R>::list(api.as_ref(), &ticket.query).await;
            wrap(ListEvent::Fetched(ticket, result))
        });
    }

    pub fn save<R: Resource>(&self, mutation: Mutation<R>, wrap: fn(ListEvent<R>) -> AppEvent) {
        let kind = mutation.kind();
        self.spawn(move |api| async move {
            let result = mutation.send(api.as_ref()).await;
            wrap(ListEvent::Saved(kind, result))
        });
    }

    pub fn load_client_choices(&self, limit: u32) {
        let query = ListQuery::limit(limit);
        self.spawn(move |api| async move {
            AppEvent::ClientChoices(EntityService::<Clients>::list(api.as_ref(), &query).await)
        });
    }

    pub fn load_dashboard(&self) {
        self.spawn(|api| async move {
            AppEvent::DashboardLoaded(DashboardController::load(api.as_ref()).await)
        });
    }

    pub fn toggle_task(&self, toggle: TaskToggle) {
        self.spawn(move |api| async move {
            let result = DashboardController::send_toggle(api.as_ref(), toggle).await;
            AppEvent::TaskToggled(toggle, result)
        });
    }

    pub fn add_task(&self, task: NewTask) {
        self.spawn(move |api| async move {
            AppEvent::TaskAdded(DashboardController::add_task(api.as_ref(), &task).await)
        });
    }

    pub fn load_analytics(&self) {
        self.spawn(|api| async move { AppEvent::AnalyticsLoaded(api.analytics_report().await) });
    }

    pub fn login(&self, username: String, password: String) {
        self.spawn(move |api| async move {
            AppEvent::LoggedIn(api.login(&username, &password).await)
        });
    }

    pub fn logout(&self) {
        self.spawn(|api| async move { AppEvent::LoggedOut(api.logout().await) });
    }

    pub fn register(&self, request: RegisterRequest) {
        self.spawn(move |api| async move { AppEvent::Registered(api.register(&request).await) });
    }

    pub fn reset_password(&self, email: String) {
        self.spawn(move |api| async move {
            AppEvent::ResetRequested(api.reset_password(email.trim()).await)
        });
    }

    pub fn change_password(&self, old_password: String, new_password: String) {
        self.spawn(move |api| async move {
            AppEvent::PasswordChanged(api.change_password(&old_password, &new_password).await)
        });
    }

    pub fn update_profile(&self, update: ProfileUpdate) {
        self.spawn(move |api| async move {
            AppEvent::ProfileUpdated(api.update_profile(&update).await)
        });
    }
}
