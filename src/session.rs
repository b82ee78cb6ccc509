use crate::api::AuthService;
use crate::error::{ApiError, FormError, SessionError};
use crate::gate::Route;
use crate::models::{AuthResponse, RegisterRequest, User};
use regex::Regex;
use std::fs;
use std::io;
use std::path::PathBuf;
#[cfg(test)]
use std::sync::Mutex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Somewhere a single authentication token lives between runs.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileTokenStore { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let token = fs::read_to_string(&self.path).ok()?;
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

#[cfg(test)]
impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        MemoryTokenStore {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

#[cfg(test)]
impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    fn save(&self, token: &str) -> io::Result<()> {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.to_string());
        }
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        if let Ok(mut slot) = self.token.lock() {
            *slot = None;
        }
        Ok(())
    }
}

pub fn validate_registration(request: &RegisterRequest) -> Result<(), FormError> {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let email = EMAIL.get_or_init(|| Regex::new(r"\S+@\S+\.\S+").unwrap());

    if request.username.trim().is_empty() {
        return Err(FormError::Required("username"));
    }
    if request.email.trim().is_empty() {
        return Err(FormError::Required("email"));
    }
    if !email.is_match(&request.email) {
        return Err(FormError::InvalidEmail);
    }
    if request.password.is_empty() {
        return Err(FormError::Required("password"));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FormError::PasswordTooShort(MIN_PASSWORD_LEN));
    }
    if request.password != request.re_password {
        return Err(FormError::PasswordMismatch);
    }
    Ok(())
}

/// Authentication state for the whole application.
///
/// Built once in `main` and handed to the app. The token lives in two
/// stores: `local` is read at boot, `cookie` is the mirror consulted by the
/// route gate before every screen change.
pub struct Session {
    local: Arc<dyn TokenStore>,
    cookie: Arc<dyn TokenStore>,
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl Session {
    pub fn new(local: Arc<dyn TokenStore>, cookie: Arc<dyn TokenStore>) -> Self {
        Session {
            local,
            cookie,
            user: None,
            loading: false,
            error: None,
            success: None,
        }
    }

    pub fn cookie_token(&self) -> Option<String> {
        self.cookie.load()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Marks a request as in flight and clears the last message.
    pub fn begin_request(&mut self) {
        self.loading = true;
        self.error = None;
        self.success = None;
    }

    fn store_token(&self, token: &str) -> Result<(), SessionError> {
        self.local.save(token)?;
        self.cookie.save(token)?;
        Ok(())
    }

    fn forget_token<A: AuthService + ?Sized>(&self, auth: &A) {
        auth.use_token(None);
        for store in [&self.local, &self.cookie] {
            if let Err(err) = store.clear() {
                warn!(error = %err, "could not clear stored token");
            }
        }
    }

    /// Restores the previous login, if any. An unusable token is dropped
    /// silently and the user ends up logged out.
    pub async fn boot<A: AuthService + ?Sized>(&mut self, auth: &A) {
        self.loading = true;
        let Some(token) = self.local.load() else {
            debug!("no stored token");
            self.user = None;
            self.loading = false;
            return;
        };

        auth.use_token(Some(token.clone()));
        match auth.current_user().await {
            Ok(user) => {
                info!(user = %user.username, "session restored");
                // Keep the mirror in step with the local copy.
                if let Err(err) = self.cookie.save(&token) {
                    warn!(error = %err, "could not mirror token");
                }
                self.user = Some(user);
            }
            Err(err) => {
                info!(error = %err, "stored token rejected, logging out");
                self.forget_token(auth);
                self.user = None;
            }
        }
        self.loading = false;
    }

    pub fn finish_login<A: AuthService + ?Sized>(
        &mut self,
        auth: &A,
        result: Result<AuthResponse, ApiError>,
    ) -> Option<Route> {
        let result = match result {
            Ok(response) => self
                .store_token(&response.token)
                .map(|()| response),
            Err(err) => Err(err.into()),
        };
        self.loading = false;

        match result {
            Ok(response) => {
                info!(user = %response.user.username, "logged in");
                auth.use_token(Some(response.token));
                self.user = Some(response.user);
                Some(Route::Dashboard)
            }
            Err(err) => {
                warn!(error = %err, "login failed");
                self.error = Some("Login failed".to_string());
                None
            }
        }
    }

    /// The local logout happens whatever the backend said.
    pub fn finish_logout<A: AuthService + ?Sized>(
        &mut self,
        auth: &A,
        result: Result<(), ApiError>,
    ) -> Route {
        if let Err(err) = result {
            warn!(error = %err, "backend logout failed");
        }
        self.forget_token(auth);
        self.user = None;
        self.loading = false;
        info!("logged out");
        Route::Login
    }

    /// Validates locally. Returns false when nothing should be sent.
    pub fn begin_register(&mut self, request: &RegisterRequest) -> bool {
        self.begin_request();
        if let Err(err) = validate_registration(request) {
            self.loading = false;
            self.error = Some(err.to_string());
            return false;
        }
        true
    }

    pub fn finish_register(&mut self, result: Result<(), ApiError>) -> Option<Route> {
        self.loading = false;
        match result {
            Ok(()) => {
                info!("registered");
                self.success = Some("Account created, please sign in".to_string());
                Some(Route::Login)
            }
            Err(err) => {
                warn!(error = %err, "registration failed");
                self.error = Some("Registration failed".to_string());
                None
            }
        }
    }

    pub fn finish_password_reset(&mut self, result: Result<(), ApiError>) -> bool {
        self.loading = false;
        match result {
            Ok(()) => {
                self.success =
                    Some("Password reset instructions were sent to your email".to_string());
                true
            }
            Err(err) => {
                warn!(error = %err, "password reset request failed");
                self.error = Some("Could not send reset instructions".to_string());
                false
            }
        }
    }

    pub fn begin_change_password(&mut self, new_password: &str, confirm_password: &str) -> bool {
        self.begin_request();
        if new_password != confirm_password {
            self.loading = false;
            self.error = Some(FormError::PasswordMismatch.to_string());
            return false;
        }
        true
    }

    pub fn finish_change_password(&mut self, result: Result<(), ApiError>) -> bool {
        self.loading = false;
        match result {
            Ok(()) => {
                self.success = Some("Password changed".to_string());
                true
            }
            Err(err) => {
                warn!(error = %err, "password change failed");
                self.error = Some("Could not change password".to_string());
                false
            }
        }
    }

    pub fn finish_profile_update(&mut self, result: Result<User, ApiError>) -> bool {
        self.loading = false;
        match result {
            Ok(user) => {
                self.user = Some(user);
                self.success = Some("Profile updated".to_string());
                true
            }
            Err(err) => {
                warn!(error = %err, "profile update failed");
                self.error = Some("Could not update profile".to_string());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{check, GateDecision};
    use crate::models::ProfileUpdate;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeAuth {
        reject: bool,
        token: Mutex<Option<String>>,
        user_lookups: AtomicUsize,
    }

    fn user() -> User {
        User {
            id: 1,
            username: "jdoe".to_string(),
            email: "j@doe.io".to_string(),
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            is_staff: None,
        }
    }

    fn rejected() -> ApiError {
        ApiError::Status {
            status: reqwest::StatusCode::UNAUTHORIZED,
            body: "invalid token".to_string(),
        }
    }

    impl FakeAuth {
        fn rejecting() -> Self {
            FakeAuth {
                reject: true,
                ..FakeAuth::default()
            }
        }

        fn token(&self) -> Option<String> {
            self.token.lock().unwrap().clone()
        }

        fn outcome<T>(&self, value: T) -> Result<T, ApiError> {
            if self.reject {
                Err(rejected())
            } else {
                Ok(value)
            }
        }
    }

    #[async_trait]
    impl AuthService for FakeAuth {
        fn use_token(&self, token: Option<String>) {
            *self.token.lock().unwrap() = token;
        }

        async fn login(&self, _username: &str, _password: &str) -> Result<AuthResponse, ApiError> {
            self.outcome(AuthResponse {
                user: user(),
                token: "fresh".to_string(),
            })
        }

        async fn logout(&self) -> Result<(), ApiError> {
            self.outcome(())
        }

        async fn register(&self, _request: &RegisterRequest) -> Result<(), ApiError> {
            self.outcome(())
        }

        async fn current_user(&self) -> Result<User, ApiError> {
            self.user_lookups.fetch_add(1, Ordering::SeqCst);
            self.outcome(user())
        }

        async fn reset_password(&self, _email: &str) -> Result<(), ApiError> {
            self.outcome(())
        }

        async fn change_password(&self, _old: &str, _new: &str) -> Result<(), ApiError> {
            self.outcome(())
        }

        async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
            self.outcome(User {
                first_name: Some(update.first_name.clone()),
                ..user()
            })
        }
    }

    fn stores(token: Option<&str>) -> (Arc<MemoryTokenStore>, Arc<MemoryTokenStore>) {
        match token {
            Some(t) => (
                Arc::new(MemoryTokenStore::with_token(t)),
                Arc::new(MemoryTokenStore::with_token(t)),
            ),
            None => (Arc::default(), Arc::default()),
        }
    }

    fn registration() -> RegisterRequest {
        RegisterRequest {
            username: "jdoe".to_string(),
            email: "j@doe.io".to_string(),
            password: "correct horse".to_string(),
            re_password: "correct horse".to_string(),
            ..RegisterRequest::default()
        }
    }

    #[tokio::test]
    async fn test_boot_without_token_skips_user_lookup() {
        let (local, cookie) = stores(None);
        let auth = FakeAuth::default();
        let mut session = Session::new(local, cookie);

        session.boot(&auth).await;

        assert_eq!(session.user, None);
        assert!(!session.loading);
        assert_eq!(auth.user_lookups.load(Ordering::SeqCst), 0);
        assert_eq!(
            check(Route::Clients, session.cookie_token().as_deref()),
            GateDecision::RedirectToLogin {
                callback: Route::Clients
            }
        );
    }

    #[tokio::test]
    async fn test_boot_with_valid_token_restores_user() {
        let (local, cookie) = stores(Some("tok"));
        let auth = FakeAuth::default();
        let mut session = Session::new(local, cookie);

        session.boot(&auth).await;

        assert_eq!(session.user, Some(user()));
        assert_eq!(auth.token().as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_boot_with_rejected_token_logs_out() {
        let (local, cookie) = stores(Some("expired"));
        let auth = FakeAuth::rejecting();
        let mut session = Session::new(local.clone(), cookie.clone());

        session.boot(&auth).await;

        assert_eq!(session.user, None);
        assert_eq!(session.error, None);
        assert_eq!(local.load(), None);
        assert_eq!(cookie.load(), None);
        assert_eq!(auth.token(), None);
        assert!(matches!(
            check(Route::Dashboard, session.cookie_token().as_deref()),
            GateDecision::RedirectToLogin { .. }
        ));
    }

    #[tokio::test]
    async fn test_login_stores_token_in_both_places() {
        let (local, cookie) = stores(None);
        let auth = FakeAuth::default();
        let mut session = Session::new(local.clone(), cookie.clone());

        session.begin_request();
        let result = auth.login("jdoe", "secret").await;
        let next = session.finish_login(&auth, result);

        assert_eq!(next, Some(Route::Dashboard));
        assert_eq!(local.load().as_deref(), Some("fresh"));
        assert_eq!(cookie.load().as_deref(), Some("fresh"));
        assert_eq!(auth.token().as_deref(), Some("fresh"));
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_failed_login_sets_error() {
        let (local, cookie) = stores(None);
        let auth = FakeAuth::rejecting();
        let mut session = Session::new(local.clone(), cookie);

        session.begin_request();
        let result = auth.login("jdoe", "wrong").await;
        let next = session.finish_login(&auth, result);

        assert_eq!(next, None);
        assert_eq!(session.error.as_deref(), Some("Login failed"));
        assert_eq!(local.load(), None);
        assert!(!session.loading);
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let (local, cookie) = stores(Some("tok"));
        let auth = FakeAuth::default();
        let mut session = Session::new(local.clone(), cookie.clone());
        session.boot(&auth).await;

        let result = auth.logout().await;
        let next = session.finish_logout(&auth, result);

        assert_eq!(next, Route::Login);
        assert_eq!(session.user, None);
        assert_eq!(local.load(), None);
        assert_eq!(cookie.load(), None);
    }

    #[tokio::test]
    async fn test_register_redirects_to_login() {
        let (local, cookie) = stores(None);
        let auth = FakeAuth::default();
        let mut session = Session::new(local, cookie);

        assert!(session.begin_register(&registration()));
        let result = auth.register(&registration()).await;
        let next = session.finish_register(result);

        assert_eq!(next, Some(Route::Login));
        assert_eq!(session.user, None);
    }

    #[test]
    fn test_invalid_registration_is_not_sent() {
        let (local, cookie) = stores(None);
        let mut session = Session::new(local, cookie);
        let mut request = registration();
        request.email = "nope".to_string();

        assert!(!session.begin_register(&request));
        assert!(!session.loading);
        assert_eq!(session.error, Some(FormError::InvalidEmail.to_string()));
    }

    #[tokio::test]
    async fn test_backend_logout_failure_still_logs_out() {
        let (local, cookie) = stores(Some("tok"));
        let auth = FakeAuth::default();
        let mut session = Session::new(local.clone(), cookie.clone());
        session.boot(&auth).await;

        let next = session.finish_logout(&auth, Err(rejected()));

        assert_eq!(next, Route::Login);
        assert_eq!(session.user, None);
        assert_eq!(cookie.load(), None);
        assert_eq!(auth.token(), None);
    }

    #[tokio::test]
    async fn test_change_password_requires_confirmation() {
        let (local, cookie) = stores(Some("tok"));
        let auth = FakeAuth::default();
        let mut session = Session::new(local, cookie);

        assert!(!session.begin_change_password("newpass1", "newpass2"));
        assert_eq!(session.error.as_deref(), Some("passwords do not match"));

        assert!(session.begin_change_password("newpass1", "newpass1"));
        let result = auth.change_password("old", "newpass1").await;
        assert!(session.finish_change_password(result));
        assert_eq!(session.error, None);
        assert_eq!(session.success.as_deref(), Some("Password changed"));
    }

    #[tokio::test]
    async fn test_update_profile_replaces_user() {
        let (local, cookie) = stores(Some("tok"));
        let auth = FakeAuth::default();
        let mut session = Session::new(local, cookie);
        session.boot(&auth).await;

        let update = ProfileUpdate {
            first_name: "Janet".to_string(),
            ..ProfileUpdate::from(&user())
        };
        session.begin_request();
        let result = auth.update_profile(&update).await;
        assert!(session.finish_profile_update(result));
        assert_eq!(session.user.unwrap().display_name(), "Janet Doe");
    }

    #[test]
    fn test_registration_validation() {
        assert_eq!(validate_registration(&registration()), Ok(()));

        let mut bad = registration();
        bad.email = "not-an-email".to_string();
        assert_eq!(validate_registration(&bad), Err(FormError::InvalidEmail));

        let mut bad = registration();
        bad.password = "short".to_string();
        bad.re_password = "short".to_string();
        assert_eq!(
            validate_registration(&bad),
            Err(FormError::PasswordTooShort(MIN_PASSWORD_LEN))
        );

        let mut bad = registration();
        bad.re_password = "different horse".to_string();
        assert_eq!(validate_registration(&bad), Err(FormError::PasswordMismatch));

        let mut bad = registration();
        bad.username.clear();
        assert_eq!(validate_registration(&bad), Err(FormError::Required("username")));
    }

    #[test]
    fn test_file_token_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("token"));

        assert_eq!(store.load(), None);
        store.save("abc").unwrap();
        assert_eq!(store.load().as_deref(), Some("abc"));
        store.clear().unwrap();
        assert_eq!(store.load(), None);
        store.clear().unwrap();
    }
}
