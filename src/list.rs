use crate::api::{EntityService, ListQuery, Resource};
use crate::error::ApiError;
use crate::form::EntityForm;
use crate::models::Page;
use tracing::{debug, info, warn};

pub const PAGE_SIZE: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialog {
    Create,
    Edit,
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// One-line status message shown in the footer until the next action.
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update(u64),
    Delete(u64),
}

/// A validated create, update or delete, ready to send.
pub enum Mutation<R: Resource> {
    Create(R::Draft),
    Update(u64, R::Draft),
    Delete(u64),
}

impl<R: Resource> Mutation<R> {
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::Create(_) => MutationKind::Create,
            Mutation::Update(id, _) => MutationKind::Update(*id),
            Mutation::Delete(id) => MutationKind::Delete(*id),
        }
    }

    pub async fn send<S>(self, service: &S) -> Result<(), ApiError>
    where
        S: EntityService<R> + ?Sized,
    {
        match self {
            Mutation::Create(draft) => service.create(&draft).await.map(|_| ()),
            Mutation::Update(id, draft) => service.update(id, &draft).await.map(|_| ()),
            Mutation::Delete(id) => service.delete(id).await,
        }
    }
}

/// Backend results for one list screen, delivered after the call returns.
pub enum ListEvent<R: Resource> {
    Fetched(FetchTicket, Result<Page<R::Record>, ApiError>),
    Saved(MutationKind, Result<(), ApiError>),
}

/// Identifies one issued list request. Only the newest ticket may apply
/// its result.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchTicket {
    seq: u64,
    pub page: u32,
    pub query: ListQuery,
}

/// Paginated, searchable view over one resource with create/edit/delete
/// popups. Clients and deals both run through this.
pub struct ListController<R: Resource> {
    pub current_page: u32,
    pub search_query: String,
    pub items: Vec<R::Record>,
    pub total_pages: u32,
    pub is_loading: bool,
    pub is_saving: bool,
    pub dialog: Option<Dialog>,
    pub selected: Option<R::Record>,
    pub form: R::Form,
    pub notice: Option<Notice>,
    issued: u64,
}

impl<R: Resource> Default for ListController<R> {
    fn default() -> Self {
        ListController::new()
    }
}

impl<R: Resource> ListController<R> {
    pub fn new() -> Self {
        ListController {
            current_page: 1,
            search_query: String::new(),
            items: Vec::new(),
            total_pages: 0,
            is_loading: false,
            is_saving: false,
            dialog: None,
            selected: None,
            form: R::Form::default(),
            notice: None,
            issued: 0,
        }
    }

    /// Forgets everything on screen. Requests issued before the reset are
    /// still recognised as stale when they land.
    pub fn reset(&mut self) {
        let issued = self.issued;
        *self = ListController::new();
        self.issued = issued;
    }

    pub fn begin_fetch(&mut self, page: u32, search: &str) -> FetchTicket {
        self.issued += 1;
        self.is_loading = true;
        FetchTicket {
            seq: self.issued,
            page,
            query: ListQuery::page(page, PAGE_SIZE, search),
        }
    }

    /// Applies a finished request. Returns false when a newer request was
    /// issued in the meantime and the result was dropped.
    pub fn finish_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Page<R::Record>, ApiError>,
    ) -> bool {
        if ticket.seq != self.issued {
            debug!(
                resource = R::PATH,
                stale = ticket.seq,
                newest = self.issued,
                "dropping stale page"
            );
            return false;
        }
        match result {
            Ok(page) => {
                self.items = page.results;
                self.total_pages = total_pages(page.count, PAGE_SIZE);
                self.current_page = ticket.page;
            }
            Err(err) => {
                warn!(resource = R::PATH, error = %err, "failed to load page");
                self.notice = Some(Notice::error(format!("Failed to load {}", R::PLURAL)));
            }
        }
        self.is_loading = false;
        true
    }

    /// Re-requests the page and search currently on screen.
    pub fn refresh(&mut self) -> FetchTicket {
        let (page, search) = (self.current_page, self.search_query.clone());
        self.begin_fetch(page, &search)
    }

    pub fn submit_search(&mut self) -> FetchTicket {
        let search = self.search_query.clone();
        self.begin_fetch(1, &search)
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn previous_page(&mut self) -> Option<FetchTicket> {
        if !self.has_previous() {
            return None;
        }
        let page = self.current_page - 1;
        self.go_to_page(page)
    }

    pub fn next_page(&mut self) -> Option<FetchTicket> {
        if !self.has_next() {
            return None;
        }
        let page = self.current_page + 1;
        self.go_to_page(page)
    }

    pub fn go_to_page(&mut self, page: u32) -> Option<FetchTicket> {
        if page < 1 || page > self.total_pages {
            return None;
        }
        let search = self.search_query.clone();
        Some(self.begin_fetch(page, &search))
    }

    pub fn page_links(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.total_pages
    }

    pub fn open_create(&mut self) {
        self.form.reset();
        self.selected = None;
        self.dialog = Some(Dialog::Create);
    }

    pub fn open_edit(&mut self, index: usize) {
        if let Some(record) = self.items.get(index).cloned() {
            self.form.load(&record);
            self.selected = Some(record);
            self.dialog = Some(Dialog::Edit);
        }
    }

    pub fn open_delete(&mut self, index: usize) {
        if let Some(record) = self.items.get(index).cloned() {
            self.selected = Some(record);
            self.dialog = Some(Dialog::Delete);
        }
    }

    pub fn close_dialog(&mut self) {
        self.dialog = None;
    }

    fn selected_id(&self) -> Option<u64> {
        self.selected.as_ref().map(R::id)
    }

    fn validated_draft(&mut self) -> Option<R::Draft> {
        match self.form.to_draft() {
            Ok(draft) => Some(draft),
            Err(err) => {
                self.notice = Some(Notice::error(err.to_string()));
                None
            }
        }
    }

    /// Turns the open dialog into the backend call it stands for.
    ///
    /// Returns `None` while a previous submit is still in flight, when no
    /// dialog is open, when edit or delete has no selected record, and when
    /// the form does not validate (the error becomes the notice).
    pub fn begin_submit(&mut self) -> Option<Mutation<R>> {
        if self.is_saving {
            return None;
        }
        let mutation = match self.dialog? {
            Dialog::Create => Mutation::Create(self.validated_draft()?),
            Dialog::Edit => {
                let id = self.selected_id()?;
                Mutation::Update(id, self.validated_draft()?)
            }
            Dialog::Delete => Mutation::Delete(self.selected_id()?),
        };
        self.is_saving = true;
        Some(mutation)
    }

    /// Applies the outcome of a submit. On success the dialog closes and the
    /// returned ticket re-requests the same page and search.
    pub fn finish_submit(
        &mut self,
        kind: MutationKind,
        result: Result<(), ApiError>,
    ) -> Option<FetchTicket> {
        self.is_saving = false;
        let (done, verb) = match kind {
            MutationKind::Create => ("created", "create"),
            MutationKind::Update(_) => ("updated", "update"),
            MutationKind::Delete(_) => ("deleted", "delete"),
        };

        match result {
            Ok(()) => {
                info!(resource = R::PATH, ?kind, "saved");
                self.dialog = None;
                match kind {
                    MutationKind::Create => self.form.reset(),
                    MutationKind::Delete(_) => self.selected = None,
                    MutationKind::Update(_) => {}
                }
                self.notice = Some(Notice::success(format!("{} {}", capitalize(R::NOUN), done)));
                Some(self.refresh())
            }
            Err(err) => {
                warn!(resource = R::PATH, ?kind, error = %err, "save failed");
                self.notice = Some(Notice::error(format!("Failed to {} {}", verb, R::NOUN)));
                None
            }
        }
    }

    pub fn apply(&mut self, event: ListEvent<R>) -> Option<FetchTicket> {
        match event {
            ListEvent::Fetched(ticket, result) => {
                self.finish_fetch(ticket, result);
                None
            }
            ListEvent::Saved(kind, result) => self.finish_submit(kind, result),
        }
    }
}

pub fn total_pages(count: u64, limit: u32) -> u32 {
    count.div_ceil(u64::from(limit)) as u32
}

pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
