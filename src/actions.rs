use crate::api::{ApiError, MailApi};
use crate::cache::Ticket;
use crate::chat::PendingReply;
use crate::models::EmailDraft;
use futures::future::join_all;

/// A network call the session has prepared (and optimistically applied,
/// where applicable). Running it never touches the session; the resulting
/// [`Completion`] is handed back to [`crate::inbox::Session::apply`].
#[derive(Debug)]
pub enum Request {
    Classify(Ticket),
    ClassifyBatch { tickets: Vec<Ticket>, missing: usize },
    Chat {
        pending: PendingReply,
        query: String,
        position: usize,
    },
    AddCategory { name: String },
    DeleteCategory { name: String, index: usize },
    Untag(Ticket),
    DeleteEmail(Ticket),
    CreateEmail(EmailDraft),
}

#[derive(Debug)]
pub enum Completion {
    Classified(Ticket, Result<Vec<String>, ApiError>),
    BatchClassified {
        results: Vec<(Ticket, Result<Vec<String>, ApiError>)>,
        missing: usize,
    },
    ChatAnswered(PendingReply, Result<String, ApiError>),
    CategoryAdded {
        name: String,
        result: Result<Vec<String>, ApiError>,
    },
    CategoryDeleted {
        name: String,
        index: usize,
        result: Result<Vec<String>, ApiError>,
    },
    Untagged(Ticket, Result<(), ApiError>),
    EmailDeleted(Ticket, Result<(), ApiError>),
    EmailCreated(Result<(), ApiError>),
}

impl Request {
    pub async fn run(self, api: &dyn MailApi) -> Completion {
        match self {
            Request::Classify(ticket) => {
                Completion::Classified(ticket, api.classify_email(ticket.position).await)
            }
            Request::ClassifyBatch { tickets, missing } => {
                // All-settled: every request runs to completion regardless of its siblings.
                let outcomes =
                    join_all(tickets.iter().map(|t| api.classify_email(t.position))).await;
                Completion::BatchClassified {
                    results: tickets.into_iter().zip(outcomes).collect(),
                    missing,
                }
            }
            Request::Chat {
                pending,
                query,
                position,
            } => Completion::ChatAnswered(pending, api.chat(&query, position).await),
            Request::AddCategory { name } => {
                let result = api.add_category(&name).await;
                Completion::CategoryAdded { name, result }
            }
            Request::DeleteCategory { name, index } => {
                let result = api.delete_category(&name).await;
                Completion::CategoryDeleted {
                    name,
                    index,
                    result,
                }
            }
            Request::Untag(ticket) => {
                Completion::Untagged(ticket, api.untag_email(ticket.position).await)
            }
            Request::DeleteEmail(ticket) => {
                Completion::EmailDeleted(ticket, api.delete_email(ticket.position).await)
            }
            Request::CreateEmail(draft) => Completion::EmailCreated(api.create_email(&draft).await),
        }
    }
}
