use crate::error::ApiError;
use crate::form::{ClientForm, DealForm, EntityForm};
use crate::models::{
    Activity, AnalyticsReport, AuthResponse, Client, ClientDraft, DashboardSummary, Deal,
    DealDraft, NewTask, Page, ProfileUpdate, RegisterRequest, Task, User,
};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::sync::RwLock;
use tracing::{debug, warn};

/// A backend collection that a list screen pages through.
pub trait Resource: Send + Sync + 'static {
    const PATH: &'static str;
    const NOUN: &'static str;
    const PLURAL: &'static str;

    type Record: DeserializeOwned + Clone + Send + Sync + 'static;
    type Draft: Serialize + Send + Sync + 'static;
    type Form: EntityForm<Record = Self::Record, Draft = Self::Draft>;

    fn id(record: &Self::Record) -> u64;
}

pub struct Clients;

impl Resource for Clients {
    const PATH: &'static str = "clients";
    const NOUN: &'static str = "client";
    const PLURAL: &'static str = "clients";

    type Record = Client;
    type Draft = ClientDraft;
    type Form = ClientForm;

    fn id(record: &Client) -> u64 {
        record.id
    }
}

pub struct Deals;

impl Resource for Deals {
    const PATH: &'static str = "deals";
    const NOUN: &'static str = "deal";
    const PLURAL: &'static str = "deals";

    type Record = Deal;
    type Draft = DealDraft;
    type Form = DealForm;

    fn id(record: &Deal) -> u64 {
        record.id
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: u32,
    pub search: Option<String>,
    pub upcoming: bool,
}

impl ListQuery {
    pub fn page(page: u32, limit: u32, search: &str) -> Self {
        let search = search.trim();
        ListQuery {
            page: Some(page),
            limit,
            search: (!search.is_empty()).then(|| search.to_string()),
            upcoming: false,
        }
    }

    pub fn limit(limit: u32) -> Self {
        ListQuery {
            limit,
            ..ListQuery::default()
        }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        params.push(("limit", self.limit.to_string()));
        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        if self.upcoming {
            params.push(("upcoming", "true".to_string()));
        }
        params
    }
}

#[async_trait]
pub trait EntityService<R: Resource>: Send + Sync {
    async fn list(&self, query: &ListQuery) -> Result<Page<R::Record>, ApiError>;
    async fn create(&self, draft: &R::Draft) -> Result<R::Record, ApiError>;
    async fn update(&self, id: u64, draft: &R::Draft) -> Result<R::Record, ApiError>;
    async fn delete(&self, id: u64) -> Result<(), ApiError>;
}

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Sets or clears the bearer token attached to every later request.
    fn use_token(&self, token: Option<String>);
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError>;
    async fn logout(&self) -> Result<(), ApiError>;
    async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError>;
    async fn current_user(&self) -> Result<User, ApiError>;
    async fn reset_password(&self, email: &str) -> Result<(), ApiError>;
    async fn change_password(&self, old_password: &str, new_password: &str)
        -> Result<(), ApiError>;
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError>;
}

#[async_trait]
pub trait DashboardService: Send + Sync {
    async fn dashboard_summary(&self) -> Result<DashboardSummary, ApiError>;
    async fn analytics_report(&self) -> Result<AnalyticsReport, ApiError>;
    async fn recent_activities(&self, limit: u32) -> Result<Page<Activity>, ApiError>;
    async fn upcoming_tasks(&self, limit: u32) -> Result<Page<Task>, ApiError>;
    async fn complete_task(&self, id: u64) -> Result<(), ApiError>;
    async fn reopen_task(&self, id: u64) -> Result<(), ApiError>;
    async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError>;
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let parsed = reqwest::Url::parse(base_url).map_err(|e| ApiError::Url(e.to_string()))?;
        Ok(ApiClient {
            http: reqwest::Client::new(),
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        let token = self.token.read().map(|t| t.clone()).unwrap_or_default();
        match token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let res = builder.send().await?;

        if res.status().is_success() {
            let body = res.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        } else {
            let status = res.status();
            let error_text = res.text().await?;
            warn!(%status, body = %error_text, "backend rejected request");
            Err(ApiError::Status {
                status,
                body: error_text,
            })
        }
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        let res = builder.send().await?;

        if res.status().is_success() {
            Ok(())
        } else {
            let status = res.status();
            let error_text = res.text().await?;
            warn!(%status, body = %error_text, "backend rejected request");
            Err(ApiError::Status {
                status,
                body: error_text,
            })
        }
    }
}

#[async_trait]
impl<R: Resource> EntityService<R> for ApiClient {
    async fn list(&self, query: &ListQuery) -> Result<Page<R::Record>, ApiError> {
        debug!(resource = R::PATH, ?query, "listing");
        let builder = self
            .request(Method::GET, &format!("{}/", R::PATH))
            .query(&query.to_params());
        self.send(builder).await
    }

    async fn create(&self, draft: &R::Draft) -> Result<R::Record, ApiError> {
        let builder = self
            .request(Method::POST, &format!("{}/", R::PATH))
            .json(draft);
        self.send(builder).await
    }

    async fn update(&self, id: u64, draft: &R::Draft) -> Result<R::Record, ApiError> {
        let builder = self
            .request(Method::PATCH, &format!("{}/{}/", R::PATH, id))
            .json(draft);
        self.send(builder).await
    }

    async fn delete(&self, id: u64) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, &format!("{}/{}/", R::PATH, id));
        self.send_empty(builder).await
    }
}

#[async_trait]
impl AuthService for ApiClient {
    fn use_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let builder = self
            .request(Method::POST, "auth/login/")
            .json(&json!({ "username": username, "password": password }));
        self.send(builder).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::POST, "auth/logout/"))
            .await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, "auth/registration/")
            .json(request);
        self.send_empty(builder).await
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        self.send(self.request(Method::GET, "auth/me/")).await
    }

    async fn reset_password(&self, email: &str) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, "password/reset_password/")
            .json(&json!({ "email": email }));
        self.send_empty(builder).await
    }

    async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, "password/change_password/")
            .json(&json!({
                "old_password": old_password,
                "new_password": new_password
            }));
        self.send_empty(builder).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let builder = self
            .request(Method::PATCH, "auth/user_update/")
            .json(update);
        self.send(builder).await
    }
}

#[async_trait]
impl DashboardService for ApiClient {
    async fn dashboard_summary(&self) -> Result<DashboardSummary, ApiError> {
        self.send(self.request(Method::GET, "analytics/dashboard"))
            .await
    }

    async fn analytics_report(&self) -> Result<AnalyticsReport, ApiError> {
        self.send(self.request(Method::GET, "analytics/dashboard"))
            .await
    }

    async fn recent_activities(&self, limit: u32) -> Result<Page<Activity>, ApiError> {
        let builder = self
            .request(Method::GET, "activities/")
            .query(&ListQuery::limit(limit).to_params());
        self.send(builder).await
    }

    async fn upcoming_tasks(&self, limit: u32) -> Result<Page<Task>, ApiError> {
        let query = ListQuery {
            upcoming: true,
            ..ListQuery::limit(limit)
        };
        let builder = self
            .request(Method::GET, "tasks/")
            .query(&query.to_params());
        self.send(builder).await
    }

    async fn complete_task(&self, id: u64) -> Result<(), ApiError> {
        let builder = self.request(Method::POST, &format!("tasks/{}/complete/", id));
        self.send_empty(builder).await
    }

    async fn reopen_task(&self, id: u64) -> Result<(), ApiError> {
        let builder = self
            .request(Method::PATCH, &format!("tasks/{}/", id))
            .json(&json!({ "completed": false }));
        self.send_empty(builder).await
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        let builder = self.request(Method::POST, "tasks/").json(task);
        self.send(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClientStatus, Priority};
    use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_json(id: u64, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "email": format!("{}@example.com", name.to_lowercase()),
            "phone": "",
            "company": name,
            "status": "active",
            "created_at": "2024-02-01T09:30:00Z"
        })
    }

    #[test]
    fn test_empty_search_is_omitted() {
        let params = ListQuery::page(1, 10, "").to_params();
        assert_eq!(
            params,
            vec![("page", "1".to_string()), ("limit", "10".to_string())]
        );
        assert_eq!(ListQuery::page(1, 10, "   ").search, None);
    }

    #[test]
    fn test_search_is_trimmed() {
        let query = ListQuery::page(2, 10, " acme ");
        assert_eq!(query.search.as_deref(), Some("acme"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(ApiClient::new("not a url"), Err(ApiError::Url(_))));
    }

    #[tokio::test]
    async fn test_list_sends_page_and_limit_without_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/clients/"))
            .and(query_param("page", "1"))
            .and(query_param("limit", "10"))
            .and(query_param_is_missing("search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [client_json(1, "Acme"), client_json(2, "Globex")],
                "count": 23
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&format!("{}/api", server.uri())).unwrap();
        let page = EntityService::<Clients>::list(&api, &ListQuery::page(1, 10, ""))
            .await
            .unwrap();

        assert_eq!(page.count, 23);
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].status, ClientStatus::Active);
    }

    #[tokio::test]
    async fn test_list_forwards_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/deals/"))
            .and(query_param("search", "acme"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [],
                "count": 0
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let page = EntityService::<Deals>::list(&api, &ListQuery::page(2, 10, "acme"))
            .await
            .unwrap();
        assert!(page.results.is_empty());
    }

    #[tokio::test]
    async fn test_token_is_sent_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me/"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7,
                "username": "jdoe",
                "email": "j@doe.io"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        api.use_token(Some("secret".to_string()));
        let user = api.current_user().await.unwrap();
        assert_eq!(user.username, "jdoe");
        assert_eq!(user.first_name, None);
    }

    #[tokio::test]
    async fn test_create_posts_draft() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/clients/"))
            .and(body_json(json!({
                "name": "Acme",
                "email": "acme@example.com",
                "phone": "",
                "company": "Acme",
                "status": "lead"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(client_json(5, "Acme")))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let draft = ClientDraft {
            name: "Acme".to_string(),
            email: "acme@example.com".to_string(),
            phone: String::new(),
            company: "Acme".to_string(),
            status: ClientStatus::Lead,
        };
        let created = EntityService::<Clients>::create(&api, &draft).await.unwrap();
        assert_eq!(created.id, 5);
    }

    #[tokio::test]
    async fn test_delete_accepts_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/deals/9/"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        EntityService::<Deals>::delete(&api, 9).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/clients/3/"))
            .respond_with(ResponseTemplate::new(400).set_body_string("email taken"))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let draft = ClientDraft {
            name: "Acme".to_string(),
            email: "dup@example.com".to_string(),
            phone: String::new(),
            company: String::new(),
            status: ClientStatus::Active,
        };
        let err = EntityService::<Clients>::update(&api, 3, &draft)
            .await
            .unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status.as_u16(), 400);
                assert_eq!(body, "email taken");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_summary_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/analytics/dashboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_revenue": 10.0
            })))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let err = api.dashboard_summary().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_upcoming_tasks_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks/"))
            .and(query_param("limit", "5"))
            .and(query_param("upcoming", "true"))
            .and(query_param_is_missing("page"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "id": 1,
                    "title": "Call Acme",
                    "due_date": "2024-06-01T12:00:00Z",
                    "priority": "High",
                    "completed": false
                }],
                "count": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let tasks = api.upcoming_tasks(5).await.unwrap();
        assert_eq!(tasks.results[0].priority, Priority::High);
    }
}
