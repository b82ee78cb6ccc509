use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Page of records as returned by every list endpoint
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub count: u64,
}

// Client status; unknown values are kept verbatim and rendered as-is
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClientStatus {
    #[default]
    Active,
    Inactive,
    Lead,
    Other(String),
}

impl ClientStatus {
    pub const CHOICES: [ClientStatus; 3] =
        [ClientStatus::Active, ClientStatus::Inactive, ClientStatus::Lead];

    pub fn as_str(&self) -> &str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Inactive => "inactive",
            ClientStatus::Lead => "lead",
            ClientStatus::Other(raw) => raw,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ClientStatus::Active => "Active",
            ClientStatus::Inactive => "Inactive",
            ClientStatus::Lead => "Lead",
            ClientStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for ClientStatus {
    fn from(raw: String) -> Self {
        match raw.to_lowercase().as_str() {
            "active" => ClientStatus::Active,
            "inactive" => ClientStatus::Inactive,
            "lead" => ClientStatus::Lead,
            _ => ClientStatus::Other(raw),
        }
    }
}

impl From<ClientStatus> for String {
    fn from(status: ClientStatus) -> Self {
        status.as_str().to_string()
    }
}

// Client struct
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Client {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company: String,
    pub status: ClientStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct ClientDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub status: ClientStatus,
}

// Deal stage, same passthrough rule as client status
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DealStage {
    #[default]
    Lead,
    Negotiation,
    Proposal,
    Won,
    Lost,
    Other(String),
}

impl DealStage {
    pub const CHOICES: [DealStage; 5] = [
        DealStage::Lead,
        DealStage::Negotiation,
        DealStage::Proposal,
        DealStage::Won,
        DealStage::Lost,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            DealStage::Lead => "lead",
            DealStage::Negotiation => "negotiation",
            DealStage::Proposal => "proposal",
            DealStage::Won => "won",
            DealStage::Lost => "lost",
            DealStage::Other(raw) => raw,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            DealStage::Lead => "Lead",
            DealStage::Negotiation => "Negotiation",
            DealStage::Proposal => "Proposal",
            DealStage::Won => "Won",
            DealStage::Lost => "Lost",
            DealStage::Other(raw) => raw,
        }
    }
}

impl From<String> for DealStage {
    fn from(raw: String) -> Self {
        match raw.to_lowercase().as_str() {
            "lead" => DealStage::Lead,
            "negotiation" => DealStage::Negotiation,
            "proposal" => DealStage::Proposal,
            "won" => DealStage::Won,
            "lost" => DealStage::Lost,
            _ => DealStage::Other(raw),
        }
    }
}

impl From<DealStage> for String {
    fn from(stage: DealStage) -> Self {
        stage.as_str().to_string()
    }
}

// Owning client as embedded in a deal
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ClientRef {
    pub id: u64,
    pub name: String,
}

impl From<&Client> for ClientRef {
    fn from(client: &Client) -> Self {
        ClientRef {
            id: client.id,
            name: client.name.clone(),
        }
    }
}

// Deal struct
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Deal {
    pub id: u64,
    pub title: String,
    pub client: ClientRef,
    pub amount: f64,
    pub stage: DealStage,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct DealDraft {
    pub title: String,
    pub client_id: u64,
    pub amount: f64,
    pub stage: DealStage,
    pub description: String,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

// Task struct
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub due_date: DateTime<Utc>,
    pub priority: Priority,
    pub completed: bool,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct ActivityUser {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

// Activity feed entry
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Activity {
    pub id: u64,
    pub user: ActivityUser,
    pub action: String,
    pub target: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_staff: Option<bool>,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Clone, Serialize, Debug, Default, PartialEq)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub re_password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone, Serialize, Debug, Default, PartialEq)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for ProfileUpdate {
    fn from(user: &User) -> Self {
        ProfileUpdate {
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone().unwrap_or_default(),
            last_name: user.last_name.clone().unwrap_or_default(),
        }
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct SeriesPoint {
    #[serde(alias = "name", alias = "month")]
    pub date: String,
    pub value: f64,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct NamedValue {
    pub name: String,
    pub value: f64,
}

/// Dashboard summary. Every numeric field is required: a backend that omits
/// one produces a decoding error rather than a card showing zero.
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct DashboardSummary {
    pub total_revenue: f64,
    pub revenue_change: f64,
    pub active_customers: u64,
    pub customers_change: f64,
    pub conversion_rate: f64,
    pub conversion_change: f64,
    pub response_time: f64,
    pub response_time_change: f64,
    pub monthly_revenue: Vec<SeriesPoint>,
    pub deals_by_stage: Vec<NamedValue>,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct RevenueSeries {
    pub daily: Vec<SeriesPoint>,
    pub weekly: Vec<SeriesPoint>,
    pub monthly: Vec<SeriesPoint>,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct ClientBreakdown {
    pub total: u64,
    pub new: u64,
    pub active: u64,
    pub inactive: u64,
    #[serde(alias = "bySource")]
    pub by_source: Vec<NamedValue>,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct DealBreakdown {
    pub total: u64,
    pub won: u64,
    pub lost: u64,
    pub pending: u64,
    #[serde(alias = "byStage")]
    pub by_stage: Vec<NamedValue>,
    pub conversion: f64,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct AnalyticsReport {
    pub revenue: RevenueSeries,
    pub clients: ClientBreakdown,
    pub deals: DealBreakdown,
}

pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    // Future timestamps count as just now
    let seconds = now.signed_duration_since(at).num_seconds().max(0) as f64;
    let minutes = (seconds / 60.0).round() as i64;
    let hours = (seconds / 3600.0).round() as i64;
    let days = (seconds / 86400.0).round() as i64;

    if minutes < 60 {
        format!("{} min ago", minutes)
    } else if hours < 24 {
        format!("{} h ago", hours)
    } else if days == 1 {
        "Yesterday".to_string()
    } else {
        at.format("%d.%m.%Y").to_string()
    }
}

pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|part| part.chars().next())
        .collect::<String>()
        .to_uppercase()
}
