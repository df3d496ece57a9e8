use serde::{Deserialize, Serialize};

/// An email as the inbox service renders it into the initial page state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailRecord {
    pub subject: String,
    pub sender_name: String,
    pub sender_email: String,
    pub recipients: String,
    pub date: String,
    pub content: String,
    pub reply_to: Option<String>,
    pub tags: Vec<String>,
}

impl EmailRecord {
    pub fn has_tag(&self, category: &str) -> bool {
        self.tags.iter().any(|t| t.trim().eq_ignore_ascii_case(category))
    }

    /// Case-insensitive match of any search term against subject, content or sender name.
    pub fn matches_terms(&self, terms: &[String]) -> bool {
        let subject = self.subject.to_lowercase();
        let content = self.content.to_lowercase();
        let sender = self.sender_name.to_lowercase();
        terms
            .iter()
            .any(|t| subject.contains(t) || content.contains(t) || sender.contains(t))
    }
}

/// Inbox contents and keyword list the client starts from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialState {
    pub emails: Vec<EmailRecord>,
    pub keywords: Vec<String>,
}

/// Fields of the compose form, posted to `/create-email`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub sender_name: String,
    pub sender_email: String,
    pub recipients: String,
    pub subject: String,
    pub content: String,
}

impl EmailDraft {
    pub fn is_complete(&self) -> bool {
        [
            &self.sender_name,
            &self.sender_email,
            &self.recipients,
            &self.subject,
            &self.content,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct ClassifyRequest {
    pub email_id: usize,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub query: &'a str,
    pub email_id: usize,
}

#[derive(Debug, Serialize)]
pub struct CategoryRequest<'a> {
    pub category: &'a str,
}

/// Every JSON response of the service decodes into this shape; the
/// endpoint decides which of the optional fields it cares about.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiEnvelope {
    pub status: Option<String>,
    pub success: Option<bool>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub tags: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
    pub response: Option<String>,
}

impl ApiEnvelope {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    pub fn failure_message(&self) -> Option<String> {
        self.message.clone().or_else(|| self.error.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub const PREFERENCE_KEY: &'static str = "theme";

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}
