use crate::api::DashboardService;
use crate::error::ApiError;
use crate::list::Notice;
use crate::models::{Activity, AnalyticsReport, DashboardSummary, NewTask, Page, SeriesPoint, Task};
use crate::parser::parse_task_input;
use tracing::{info, warn};

pub const RECENT_ACTIVITY_LIMIT: u32 = 4;
pub const UPCOMING_TASK_LIMIT: u32 = 5;

/// Read-only home screen: stat cards, charts, activity feed and the
/// upcoming task list. Nothing is cached; mounting again refetches.
#[derive(Default)]
pub struct DashboardController {
    pub summary: Option<DashboardSummary>,
    pub activities: Vec<Activity>,
    pub tasks: Vec<Task>,
    pub is_loading: bool,
    pub notice: Option<Notice>,
}

/// Everything the dashboard asks for on mount.
pub struct DashboardData {
    pub summary: Result<DashboardSummary, ApiError>,
    pub activities: Result<Page<Activity>, ApiError>,
    pub tasks: Result<Page<Task>, ApiError>,
}

/// Outcome of a quick-add; the task list is only reloaded after a create.
pub struct TaskAdded {
    pub created: Result<Task, ApiError>,
    pub tasks: Option<Result<Page<Task>, ApiError>>,
}

/// Local change made ahead of the backend call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskToggle {
    pub id: u64,
    pub completed: bool,
    previous: bool,
}

impl DashboardController {
    pub fn begin_mount(&mut self) {
        self.is_loading = true;
    }

    pub async fn load<S: DashboardService + ?Sized>(service: &S) -> DashboardData {
        DashboardData {
            summary: service.dashboard_summary().await,
            activities: service.recent_activities(RECENT_ACTIVITY_LIMIT).await,
            tasks: service.upcoming_tasks(UPCOMING_TASK_LIMIT).await,
        }
    }

    pub fn finish_mount(&mut self, data: DashboardData) {
        match data.summary {
            Ok(summary) => self.summary = Some(summary),
            Err(err) => {
                warn!(error = %err, "failed to load dashboard summary");
                self.summary = None;
            }
        }
        match data.activities {
            Ok(page) => self.activities = page.results,
            Err(err) => {
                warn!(error = %err, "failed to load activity");
                self.activities.clear();
            }
        }
        match data.tasks {
            Ok(page) => self.tasks = page.results,
            Err(err) => {
                warn!(error = %err, "failed to load tasks");
                self.tasks.clear();
            }
        }
        self.is_loading = false;
    }

    /// Flips the task locally right away. Returns what has to be sent.
    pub fn begin_toggle(&mut self, id: u64, completed: bool) -> Option<TaskToggle> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        let previous = task.completed;
        task.completed = completed;
        Some(TaskToggle {
            id,
            completed,
            previous,
        })
    }

    pub async fn send_toggle<S: DashboardService + ?Sized>(
        service: &S,
        toggle: TaskToggle,
    ) -> Result<(), ApiError> {
        if toggle.completed {
            service.complete_task(toggle.id).await
        } else {
            service.reopen_task(toggle.id).await
        }
    }

    pub fn finish_toggle(&mut self, toggle: TaskToggle, result: Result<(), ApiError>) {
        if let Err(err) = result {
            warn!(id = toggle.id, error = %err, "task update failed, reverting");
            if let Some(task) = self.tasks.iter_mut().find(|t| t.id == toggle.id) {
                task.completed = toggle.previous;
            }
            self.notice = Some(Notice::error("Failed to update task"));
        }
    }

    pub fn begin_quick_add(&mut self, input: &str) -> Option<NewTask> {
        let parsed = parse_task_input(input);
        if parsed.title.is_empty() {
            self.notice = Some(Notice::error("Task title cannot be empty"));
            return None;
        }
        Some(parsed.into_new_task())
    }

    pub async fn add_task<S: DashboardService + ?Sized>(service: &S, task: &NewTask) -> TaskAdded {
        match service.create_task(task).await {
            Ok(created) => TaskAdded {
                created: Ok(created),
                tasks: Some(service.upcoming_tasks(UPCOMING_TASK_LIMIT).await),
            },
            Err(err) => TaskAdded {
                created: Err(err),
                tasks: None,
            },
        }
    }

    pub fn finish_quick_add(&mut self, added: TaskAdded) {
        match added.created {
            Ok(task) => {
                info!(id = task.id, "task created");
                self.notice = Some(Notice::success("Task created"));
            }
            Err(err) => {
                warn!(error = %err, "task create failed");
                self.notice = Some(Notice::error("Failed to create task"));
            }
        }
        match added.tasks {
            Some(Ok(page)) => self.tasks = page.results,
            Some(Err(err)) => warn!(error = %err, "failed to reload tasks"),
            None => {}
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Period {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

impl Period {
    pub fn next(self) -> Self {
        match self {
            Period::Daily => Period::Weekly,
            Period::Weekly => Period::Monthly,
            Period::Monthly => Period::Daily,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Period::Daily => "Daily",
            Period::Weekly => "Weekly",
            Period::Monthly => "Monthly",
        }
    }
}

#[derive(Default)]
pub struct AnalyticsController {
    pub report: Option<AnalyticsReport>,
    pub period: Period,
    pub is_loading: bool,
    pub notice: Option<Notice>,
}

impl AnalyticsController {
    pub fn begin_mount(&mut self) {
        self.is_loading = true;
    }

    pub fn finish_mount(&mut self, result: Result<AnalyticsReport, ApiError>) {
        match result {
            Ok(report) => self.report = Some(report),
            Err(err) => {
                warn!(error = %err, "failed to load analytics");
                self.notice = Some(Notice::error("Failed to load analytics"));
            }
        }
        self.is_loading = false;
    }

    pub fn cycle_period(&mut self) {
        self.period = self.period.next();
    }

    pub fn revenue(&self) -> &[SeriesPoint] {
        match &self.report {
            Some(report) => match self.period {
                Period::Daily => &report.revenue.daily,
                Period::Weekly => &report.revenue.weekly,
                Period::Monthly => &report.revenue.monthly,
            },
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::NoticeKind;
    use crate::models::Priority;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeDashboard {
        fail: bool,
        sent: Mutex<Vec<(u64, bool)>>,
        created: Mutex<Vec<NewTask>>,
    }

    fn rejected() -> ApiError {
        ApiError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
            body: String::new(),
        }
    }

    fn task(id: u64, completed: bool) -> Task {
        Task {
            id,
            title: format!("Task {}", id),
            due_date: Utc::now(),
            priority: Priority::Medium,
            completed,
        }
    }

    fn summary() -> DashboardSummary {
        DashboardSummary {
            total_revenue: 1000.0,
            revenue_change: 2.0,
            active_customers: 12,
            customers_change: -1.0,
            conversion_rate: 30.0,
            conversion_change: 0.5,
            response_time: 2.5,
            response_time_change: -3.0,
            monthly_revenue: vec![],
            deals_by_stage: vec![],
        }
    }

    #[async_trait]
    impl DashboardService for FakeDashboard {
        async fn dashboard_summary(&self) -> Result<DashboardSummary, ApiError> {
            if self.fail {
                return Err(rejected());
            }
            Ok(summary())
        }

        async fn analytics_report(&self) -> Result<AnalyticsReport, ApiError> {
            Err(rejected())
        }

        async fn recent_activities(&self, _limit: u32) -> Result<Page<Activity>, ApiError> {
            Ok(Page {
                results: vec![],
                count: 0,
            })
        }

        async fn upcoming_tasks(&self, limit: u32) -> Result<Page<Task>, ApiError> {
            if self.fail {
                return Err(rejected());
            }
            let results: Vec<Task> = (1..=limit as u64).map(|id| task(id, false)).collect();
            Ok(Page {
                count: results.len() as u64,
                results,
            })
        }

        async fn complete_task(&self, id: u64) -> Result<(), ApiError> {
            self.sent.lock().unwrap().push((id, true));
            if self.fail {
                return Err(rejected());
            }
            Ok(())
        }

        async fn reopen_task(&self, id: u64) -> Result<(), ApiError> {
            self.sent.lock().unwrap().push((id, false));
            if self.fail {
                return Err(rejected());
            }
            Ok(())
        }

        async fn create_task(&self, new: &NewTask) -> Result<Task, ApiError> {
            self.created.lock().unwrap().push(new.clone());
            Ok(task(42, false))
        }
    }

    async fn mount(dashboard: &mut DashboardController, service: &FakeDashboard) {
        dashboard.begin_mount();
        assert!(dashboard.is_loading);
        let data = DashboardController::load(service).await;
        dashboard.finish_mount(data);
    }

    async fn toggle(
        dashboard: &mut DashboardController,
        service: &FakeDashboard,
        id: u64,
        completed: bool,
    ) {
        if let Some(change) = dashboard.begin_toggle(id, completed) {
            let result = DashboardController::send_toggle(service, change).await;
            dashboard.finish_toggle(change, result);
        }
    }

    async fn quick_add(dashboard: &mut DashboardController, service: &FakeDashboard, input: &str) {
        if let Some(task) = dashboard.begin_quick_add(input) {
            let added = DashboardController::add_task(service, &task).await;
            dashboard.finish_quick_add(added);
        }
    }

    fn controller_with_tasks() -> DashboardController {
        DashboardController {
            tasks: (1..=8).map(|id| task(id, false)).collect(),
            ..DashboardController::default()
        }
    }

    #[tokio::test]
    async fn test_mount_loads_everything() {
        let service = FakeDashboard::default();
        let mut dashboard = DashboardController::default();

        mount(&mut dashboard, &service).await;

        assert_eq!(dashboard.summary, Some(summary()));
        assert_eq!(dashboard.tasks.len(), UPCOMING_TASK_LIMIT as usize);
        assert!(!dashboard.is_loading);
    }

    #[tokio::test]
    async fn test_mount_failure_leaves_no_data() {
        let service = FakeDashboard {
            fail: true,
            ..FakeDashboard::default()
        };
        let mut dashboard = DashboardController::default();

        mount(&mut dashboard, &service).await;

        assert_eq!(dashboard.summary, None);
        assert!(dashboard.tasks.is_empty());
        assert_eq!(dashboard.notice, None);
    }

    #[test]
    fn test_toggle_is_applied_locally_before_backend() {
        let mut dashboard = controller_with_tasks();

        let toggle = dashboard.begin_toggle(7, true).unwrap();

        assert_eq!(toggle.id, 7);
        assert!(dashboard.tasks.iter().find(|t| t.id == 7).unwrap().completed);
        assert!(dashboard
            .tasks
            .iter()
            .filter(|t| t.id != 7)
            .all(|t| !t.completed));
    }

    #[test]
    fn test_toggle_unknown_task_is_noop() {
        let mut dashboard = controller_with_tasks();
        assert_eq!(dashboard.begin_toggle(99, true), None);
    }

    #[tokio::test]
    async fn test_toggle_sends_complete_or_reopen() {
        let service = FakeDashboard::default();
        let mut dashboard = controller_with_tasks();

        toggle(&mut dashboard, &service, 2, true).await;
        toggle(&mut dashboard, &service, 2, false).await;

        assert_eq!(*service.sent.lock().unwrap(), vec![(2, true), (2, false)]);
        assert!(!dashboard.tasks[1].completed);
    }

    #[tokio::test]
    async fn test_failed_toggle_reverts() {
        let service = FakeDashboard {
            fail: true,
            ..FakeDashboard::default()
        };
        let mut dashboard = controller_with_tasks();

        toggle(&mut dashboard, &service, 3, true).await;

        assert!(!dashboard.tasks[2].completed);
        assert_eq!(
            dashboard.notice.as_ref().map(|n| n.kind),
            Some(NoticeKind::Error)
        );
    }

    #[tokio::test]
    async fn test_quick_add_parses_and_reloads() {
        let service = FakeDashboard::default();
        let mut dashboard = DashboardController::default();

        quick_add(&mut dashboard, &service, "Call Acme !high").await;

        let created = service.created.lock().unwrap();
        assert_eq!(created[0].title, "Call Acme");
        assert_eq!(created[0].priority, Priority::High);
        assert_eq!(dashboard.tasks.len(), UPCOMING_TASK_LIMIT as usize);
    }

    #[tokio::test]
    async fn test_quick_add_rejects_empty_title() {
        let service = FakeDashboard::default();
        let mut dashboard = DashboardController::default();

        quick_add(&mut dashboard, &service, "  !high ").await;

        assert!(service.created.lock().unwrap().is_empty());
        assert_eq!(
            dashboard.notice,
            Some(Notice::error("Task title cannot be empty"))
        );
    }

    #[tokio::test]
    async fn test_analytics_failure_sets_notice() {
        let service = FakeDashboard::default();
        let mut analytics = AnalyticsController::default();

        analytics.begin_mount();
        let report = service.analytics_report().await;
        analytics.finish_mount(report);

        assert!(analytics.report.is_none());
        assert!(analytics.revenue().is_empty());
        assert_eq!(
            analytics.notice,
            Some(Notice::error("Failed to load analytics"))
        );
    }

    #[test]
    fn test_period_cycles() {
        let mut analytics = AnalyticsController::default();
        assert_eq!(analytics.period, Period::Monthly);
        analytics.cycle_period();
        assert_eq!(analytics.period, Period::Daily);
    }
}
