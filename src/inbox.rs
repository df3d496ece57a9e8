use crate::actions::{Completion, Request};
use crate::api::ApiError;
use crate::cache::{EmailCache, EmailId, TagNote, Ticket};
use crate::categories::CategoryManager;
use crate::chat::{self, ChatTranscript, PendingReply};
use crate::colors::{ColorAssigner, normalize_category};
use crate::models::{EmailDraft, EmailRecord, InitialState, Theme};
use crate::notify::Notifications;
use tracing::{debug, error, info, warn};

const ALREADY_EXISTS: &str = "Category already exists";
const DOES_NOT_EXIST: &str = "Category does not exist";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailPane {
    Empty,
    Email(EmailId),
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailView {
    pub subject: String,
    pub sender: String,
    pub recipients: String,
    pub date: String,
    pub reply_to: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
}

fn or_fallback(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

impl DetailView {
    fn of(record: &EmailRecord) -> Self {
        let sender = if record.sender_name.trim().is_empty() {
            or_fallback(&record.sender_email, "No Sender")
        } else {
            record.sender_name.clone()
        };
        Self {
            subject: or_fallback(&record.subject, "No Subject"),
            sender,
            recipients: or_fallback(&record.recipients, "No Recipients"),
            date: or_fallback(&record.date, "No Date"),
            reply_to: record.reply_to.clone().filter(|r| !r.trim().is_empty()),
            content: or_fallback(&record.content, "No Content"),
            tags: record.tags.clone(),
        }
    }

    fn deleted() -> Self {
        Self {
            subject: "Email Deleted".to_string(),
            sender: String::new(),
            recipients: String::new(),
            date: String::new(),
            reply_to: None,
            content: "Email has been deleted.".to_string(),
            tags: Vec::new(),
        }
    }
}

/// Classification status shown in the detail pane for the current email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationResult {
    Pending,
    Tagged(Vec<String>),
    NoTags,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyOutcome {
    /// Classification succeeded; the list may be empty.
    Tagged(Vec<String>),
    Failed(String),
    /// The email was deleted or a newer request was issued for it.
    Superseded,
}

impl ClassifyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ClassifyOutcome::Tagged(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Classified(ClassifyOutcome),
    Batch(BatchReport),
    Succeeded,
    Failed,
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    None,
    Partial,
    All,
}

/// Everything the inbox view shows, owned in one place. Created at startup
/// from the initial page state and dropped on exit.
pub struct Session {
    pub cache: EmailCache,
    pub categories: CategoryManager,
    pub colors: ColorAssigner,
    pub notifications: Notifications,
    pub chat: ChatTranscript,
    pub detail: DetailPane,
    pub current: Option<EmailId>,
    pub classification: Option<ClassificationResult>,
    pub theme: Theme,
    search_terms: Vec<String>,
    keyword_filter: Option<String>,
    /// Deletes sent but not yet applied. Server keys are positions, so nothing
    /// position-keyed goes out while this is non-zero.
    deletes_in_flight: usize,
}

impl Session {
    pub fn new(initial: InitialState, theme: Theme) -> Self {
        info!(
            "Session started with {} emails and {} keywords",
            initial.emails.len(),
            initial.keywords.len()
        );
        Self {
            cache: EmailCache::from_records(initial.emails),
            categories: CategoryManager::new(&initial.keywords),
            colors: ColorAssigner::new(),
            notifications: Notifications::default(),
            chat: ChatTranscript::default(),
            detail: DetailPane::Empty,
            current: None,
            classification: None,
            theme,
            search_terms: Vec::new(),
            keyword_filter: None,
            deletes_in_flight: 0,
        }
    }

    // ----- Listing and selection -----

    pub fn set_search(&mut self, query: &str) {
        self.search_terms = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
    }

    pub fn search_query(&self) -> String {
        self.search_terms.join(" ")
    }

    pub fn set_keyword_filter(&mut self, keyword: Option<&str>) {
        self.keyword_filter = keyword.map(normalize_category);
    }

    pub fn keyword_filter(&self) -> Option<&str> {
        self.keyword_filter.as_deref()
    }

    /// Sidebar row of the active filter: 0 is "All mail", folders follow.
    pub fn active_folder(&self) -> usize {
        self.keyword_filter
            .as_deref()
            .and_then(|k| {
                self.categories
                    .folders()
                    .iter()
                    .position(|f| f.keyword == k)
            })
            .map_or(0, |i| i + 1)
    }

    /// Takes the server's keyword list and drops a filter on a keyword it no longer has.
    fn adopt_keywords(&mut self, keywords: &[String]) {
        self.categories.sync_existing(keywords);
        if let Some(filter) = &self.keyword_filter {
            if !self.categories.folders().iter().any(|f| f.keyword == *filter) {
                debug!("Clearing filter on removed keyword '{}'", filter);
                self.keyword_filter = None;
            }
        }
    }

    /// Ids of the emails the list currently shows, in inbox order.
    pub fn visible_ids(&self) -> Vec<EmailId> {
        self.cache
            .iter()
            .filter(|e| self.search_terms.is_empty() || e.record.matches_terms(&self.search_terms))
            .filter(|e| match &self.keyword_filter {
                Some(keyword) => e.record.has_tag(keyword),
                None => true,
            })
            .map(|e| e.id)
            .collect()
    }

    /// Shows `id` in the detail pane. Unknown ids leave everything as is.
    pub fn select_email(&mut self, id: EmailId) -> bool {
        if self.cache.get(id).is_none() {
            error!("Invalid email {}; selection unchanged", id);
            return false;
        }
        debug!("Selecting email {}", id);
        self.current = Some(id);
        self.detail = DetailPane::Email(id);
        self.chat.reset();
        self.classification = None;
        true
    }

    pub fn select_position(&mut self, position: usize) -> bool {
        match self.cache.id_at(position) {
            Some(id) => self.select_email(id),
            None => {
                error!(
                    "Invalid email position {} (inbox holds {})",
                    position,
                    self.cache.len()
                );
                false
            }
        }
    }

    /// Moves the selection within the visible list.
    pub fn move_selection(&mut self, delta: isize) {
        let visible = self.visible_ids();
        if visible.is_empty() {
            return;
        }
        let target = match self
            .current
            .and_then(|id| visible.iter().position(|v| *v == id))
        {
            Some(index) => index
                .saturating_add_signed(delta)
                .min(visible.len() - 1),
            None => 0,
        };
        if self.current != Some(visible[target]) {
            self.select_email(visible[target]);
        }
    }

    pub fn detail_view(&self) -> Option<DetailView> {
        match self.detail {
            DetailPane::Empty => None,
            DetailPane::Deleted => Some(DetailView::deleted()),
            DetailPane::Email(id) => self.cache.get(id).map(|e| DetailView::of(&e.record)),
        }
    }

    // ----- Local-only actions -----

    pub fn toggle_checked(&mut self, id: EmailId) {
        if let Some(entry) = self.cache.get_mut(id) {
            entry.view.checked = !entry.view.checked;
        }
    }

    pub fn set_all_checked(&mut self, checked: bool) {
        let visible = self.visible_ids();
        for entry in self.cache.iter_mut() {
            if visible.contains(&entry.id) {
                entry.view.checked = checked;
            }
        }
    }

    /// State of the "select all" checkbox over the visible list.
    pub fn check_state(&self) -> CheckState {
        let visible = self.visible_ids();
        let checked = self
            .cache
            .iter()
            .filter(|e| visible.contains(&e.id) && e.view.checked)
            .count();
        if checked == 0 {
            CheckState::None
        } else if checked == visible.len() {
            CheckState::All
        } else {
            CheckState::Partial
        }
    }

    pub fn checked_ids(&self) -> Vec<EmailId> {
        self.cache
            .iter()
            .filter(|e| e.view.checked)
            .map(|e| e.id)
            .collect()
    }

    pub fn toggle_highlight_current(&mut self) {
        let Some(entry) = self.current.and_then(|id| self.cache.get_mut(id)) else {
            return;
        };
        entry.view.highlighted = !entry.view.highlighted;
        let message = if entry.view.highlighted {
            "Email highlighted."
        } else {
            "Email unhighlighted."
        };
        self.notifications.info(message);
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    // ----- Requests -----

    fn positions_settled(&mut self) -> bool {
        if self.deletes_in_flight > 0 {
            debug!("{} delete(s) in flight; holding back", self.deletes_in_flight);
            self.notifications
                .warning("Please wait for the pending delete to finish.");
            return false;
        }
        true
    }

    /// Issues a ticket for `id`, superseding anything in flight for it.
    fn issue(&mut self, id: EmailId, classifying: bool) -> Option<Ticket> {
        let ticket = self.cache.issue_ticket(id)?;
        if let Some(entry) = self.cache.get_mut(id) {
            entry.view.classifying = classifying;
        }
        // A superseded classification never reports back.
        if !classifying
            && self.current == Some(id)
            && self.classification == Some(ClassificationResult::Pending)
        {
            self.classification = None;
        }
        Some(ticket)
    }

    pub fn begin_classify(&mut self, id: EmailId) -> Option<Request> {
        if !self.positions_settled() {
            return None;
        }
        match self.issue(id, true) {
            Some(ticket) => {
                debug!("Classifying {} at position {}", id, ticket.position);
                Some(Request::Classify(ticket))
            }
            None => {
                error!("Email item not found for {}", id);
                None
            }
        }
    }

    pub fn begin_classify_current(&mut self) -> Option<Request> {
        let id = self.current?;
        let request = self.begin_classify(id)?;
        self.classification = Some(ClassificationResult::Pending);
        Some(request)
    }

    pub fn finish_classify(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<String>, ApiError>,
    ) -> ClassifyOutcome {
        let Some(entry) = self.cache.redeem(&ticket) else {
            debug!("Discarding classification for {} (superseded)", ticket.id);
            return ClassifyOutcome::Superseded;
        };
        entry.view.classifying = false;

        let outcome = match result {
            Ok(tags) => {
                entry.view.note = if tags.is_empty() {
                    Some(TagNote::NoTags)
                } else {
                    None
                };
                entry.record.tags = tags.clone();
                ClassifyOutcome::Tagged(tags)
            }
            Err(err) => {
                warn!("Classification failed for {}: {}", ticket.id, err);
                let message = match &err {
                    ApiError::Rejected { message } => message
                        .clone()
                        .unwrap_or_else(|| "Classification failed.".to_string()),
                    other => other.to_string(),
                };
                entry.view.note = Some(if err.is_transport() {
                    TagNote::NetworkError
                } else {
                    TagNote::ClassificationFailed
                });
                ClassifyOutcome::Failed(message)
            }
        };

        if self.current == Some(ticket.id)
            && self.classification == Some(ClassificationResult::Pending)
        {
            self.classification = Some(match &outcome {
                ClassifyOutcome::Tagged(tags) if tags.is_empty() => ClassificationResult::NoTags,
                ClassifyOutcome::Tagged(tags) => ClassificationResult::Tagged(tags.clone()),
                ClassifyOutcome::Failed(message) => ClassificationResult::Failed(message.clone()),
                ClassifyOutcome::Superseded => {
                    ClassificationResult::Failed("Failed to classify email.".to_string())
                }
            });
        }
        outcome
    }

    pub fn begin_classify_batch(&mut self, ids: &[EmailId]) -> Option<Request> {
        if ids.is_empty() {
            self.notifications.warning("Please select emails to classify.");
            return None;
        }
        if !self.positions_settled() {
            return None;
        }
        let mut tickets = Vec::with_capacity(ids.len());
        let mut missing = 0;
        for id in ids {
            match self.issue(*id, true) {
                Some(ticket) => tickets.push(ticket),
                None => missing += 1,
            }
        }
        if tickets.is_empty() {
            self.notifications
                .error("Could not find valid email IDs for selected items.");
            return None;
        }
        self.notifications.info(format!(
            "Starting batch classification for {} emails...",
            tickets.len()
        ));
        Some(Request::ClassifyBatch { tickets, missing })
    }

    pub fn finish_batch(
        &mut self,
        results: Vec<(Ticket, Result<Vec<String>, ApiError>)>,
        missing: usize,
    ) -> BatchReport {
        let mut report = BatchReport {
            succeeded: 0,
            failed: missing,
        };
        for (ticket, result) in results {
            if self.finish_classify(ticket, result).is_success() {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(
            "Batch classification: {} succeeded, {} failed",
            report.succeeded, report.failed
        );
        let message = format!(
            "Batch classification complete. {} successful",
            report.succeeded
        );
        if report.failed > 0 {
            self.notifications
                .warning(format!("{}, {} failed.", message, report.failed));
        } else {
            self.notifications.success(message);
        }
        report
    }

    /// Adds the category to the showcase right away; a failed request takes it back out.
    pub fn begin_add_category(&mut self, name: &str) -> Option<Request> {
        let name = normalize_category(name);
        if name.is_empty() {
            return None;
        }
        if self.categories.contains(&name) {
            self.notifications.warning(ALREADY_EXISTS);
            return None;
        }
        self.categories.insert(&name);
        info!("Adding category '{}'", name);
        Some(Request::AddCategory { name })
    }

    pub fn finish_add_category(
        &mut self,
        name: String,
        result: Result<Vec<String>, ApiError>,
    ) -> Outcome {
        match result {
            Ok(keywords) => {
                self.notifications.success("Category added successfully");
                self.adopt_keywords(&keywords);
                Outcome::Succeeded
            }
            Err(err) if err.rejection() == Some(ALREADY_EXISTS) => {
                // Known to the server from an earlier run; keep showing it.
                info!("Category '{}' already defined on the server", name);
                self.notifications.warning(ALREADY_EXISTS);
                Outcome::Failed
            }
            Err(err) => {
                warn!("Adding category '{}' failed: {}", name, err);
                if err.is_transport() {
                    self.notifications.error("Error saving category");
                } else {
                    self.notifications.error("Failed to add category");
                }
                self.categories.remove(&name);
                Outcome::Failed
            }
        }
    }

    /// Removes the category from the showcase right away; a failed request puts it back.
    pub fn begin_delete_category(&mut self, name: &str) -> Option<Request> {
        let name = normalize_category(name);
        let Some(index) = self.categories.remove(&name) else {
            warn!("Cannot delete unknown category '{}'", name);
            return None;
        };
        info!("Deleting category '{}'", name);
        Some(Request::DeleteCategory { name, index })
    }

    pub fn finish_delete_category(
        &mut self,
        name: String,
        index: usize,
        result: Result<Vec<String>, ApiError>,
    ) -> Outcome {
        match result {
            Ok(keywords) => {
                let changed = self.cache.strip_tag(&name);
                debug!("Removed '{}' from {} emails", name, changed);
                self.notifications.success("Category removed");
                self.adopt_keywords(&keywords);
                Outcome::Succeeded
            }
            Err(err) if err.rejection() == Some(DOES_NOT_EXIST) => {
                info!("Category '{}' was not defined on the server", name);
                self.notifications
                    .error(format!("Failed to remove category: {}", DOES_NOT_EXIST));
                Outcome::Failed
            }
            Err(err) => {
                warn!("Deleting category '{}' failed: {}", name, err);
                match err.rejection() {
                    Some(message) => self
                        .notifications
                        .error(format!("Failed to remove category: {}", message)),
                    None => self.notifications.error("Error removing category"),
                }
                self.categories.restore(&name, index);
                Outcome::Failed
            }
        }
    }

    pub fn begin_untag(&mut self) -> Option<Request> {
        let id = self.current?;
        if !self.positions_settled() {
            return None;
        }
        let ticket = self.issue(id, false)?;
        info!("Untagging {}", id);
        Some(Request::Untag(ticket))
    }

    pub fn finish_untag(&mut self, ticket: Ticket, result: Result<(), ApiError>) -> Outcome {
        match result {
            Ok(()) => {
                self.notifications.success("Email untagged.");
                match self.cache.redeem(&ticket) {
                    Some(entry) => {
                        entry.record.tags.clear();
                        entry.view.note = None;
                        Outcome::Succeeded
                    }
                    None => {
                        debug!("Untag of {} superseded", ticket.id);
                        Outcome::Discarded
                    }
                }
            }
            Err(err) => {
                warn!("Untag of {} failed: {}", ticket.id, err);
                match err.rejection() {
                    Some(message) => self
                        .notifications
                        .error(format!("Untag failed: {}", message)),
                    None => self.notifications.error("Error untagging email."),
                }
                Outcome::Failed
            }
        }
    }

    pub fn begin_delete(&mut self) -> Option<Request> {
        let id = self.current?;
        if !self.positions_settled() {
            return None;
        }
        let ticket = self.issue(id, false)?;
        self.deletes_in_flight += 1;
        info!("Deleting {}", id);
        Some(Request::DeleteEmail(ticket))
    }

    pub fn finish_delete(&mut self, ticket: Ticket, result: Result<(), ApiError>) -> Outcome {
        self.deletes_in_flight = self.deletes_in_flight.saturating_sub(1);
        if let Err(err) = result {
            warn!("Delete of {} failed: {}", ticket.id, err);
            match err.rejection() {
                Some(message) => self
                    .notifications
                    .error(format!("Delete failed: {}", message)),
                None => self.notifications.error("Error deleting email."),
            }
            return Outcome::Failed;
        }

        // The server has already dropped it, whatever else was issued since.
        let Some((position, _)) = self.cache.remove(ticket.id) else {
            debug!("{} already gone", ticket.id);
            return Outcome::Discarded;
        };
        self.notifications.success("Email deleted.");

        if self.current == Some(ticket.id) {
            self.current = None;
            self.detail = DetailPane::Deleted;
            self.classification = None;
            self.chat.clear();
            if !self.cache.is_empty() {
                self.select_position(position.min(self.cache.len() - 1));
            }
        }
        Outcome::Succeeded
    }

    pub fn begin_chat(&mut self, message: &str) -> Option<Request> {
        let query = message.trim();
        if query.is_empty() || !self.positions_settled() {
            return None;
        }
        let Some(position) = self.current.and_then(|id| self.cache.position_of(id)) else {
            warn!("Chat message without a selected email");
            return None;
        };
        self.chat.push_user(query);
        let pending = self.chat.push_pending();
        Some(Request::Chat {
            pending,
            query: query.to_string(),
            position,
        })
    }

    pub fn finish_chat(&mut self, pending: PendingReply, result: Result<String, ApiError>) -> Outcome {
        let (text, outcome) = match result {
            Ok(reply) => (reply, Outcome::Succeeded),
            Err(ApiError::Rejected { .. }) => (chat::APOLOGY.to_string(), Outcome::Failed),
            Err(err) => (
                format!("I'm sorry, I encountered an error: {}", err),
                Outcome::Failed,
            ),
        };
        if self.chat.resolve(pending, text) {
            outcome
        } else {
            debug!("Dropping chat reply for a discarded transcript");
            Outcome::Discarded
        }
    }

    pub fn begin_create_email(&mut self, draft: EmailDraft) -> Option<Request> {
        if !draft.is_complete() {
            self.notifications.warning("Please fill in all required fields.");
            return None;
        }
        Some(Request::CreateEmail(draft))
    }

    pub fn finish_create_email(&mut self, result: Result<(), ApiError>) -> Outcome {
        match result {
            Ok(()) => {
                self.notifications.success("Email sent successfully!");
                Outcome::Succeeded
            }
            Err(err) => {
                warn!("Sending email failed: {}", err);
                match err.rejection() {
                    Some(message) => self
                        .notifications
                        .error(format!("Error sending email: {}", message)),
                    None => self
                        .notifications
                        .error("Error communicating with the server."),
                }
                Outcome::Failed
            }
        }
    }

    /// Applies a finished request. Runs on the UI task only.
    pub fn apply(&mut self, completion: Completion) -> Outcome {
        match completion {
            Completion::Classified(ticket, result) => {
                Outcome::Classified(self.finish_classify(ticket, result))
            }
            Completion::BatchClassified { results, missing } => {
                Outcome::Batch(self.finish_batch(results, missing))
            }
            Completion::ChatAnswered(pending, result) => self.finish_chat(pending, result),
            Completion::CategoryAdded { name, result } => self.finish_add_category(name, result),
            Completion::CategoryDeleted {
                name,
                index,
                result,
            } => self.finish_delete_category(name, index, result),
            Completion::Untagged(ticket, result) => self.finish_untag(ticket, result),
            Completion::EmailDeleted(ticket, result) => self.finish_delete(ticket, result),
            Completion::EmailCreated(result) => self.finish_create_email(result),
        }
    }
}
