use crate::models::{
    ApiEnvelope, CategoryRequest, ChatRequest, ClassifyRequest, EmailDraft, EmailRecord,
};
use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::client::HttpConnector;
use hyper::header::{CONTENT_TYPE, COOKIE, HeaderMap, SET_COOKIE};
use hyper::{Body, Client, Method, Request};
use hyper_rustls::HttpsConnector;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] hyper::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid request: {0}")]
    Http(#[from] hyper::http::Error),
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{}", .message.as_deref().unwrap_or("Unknown error"))]
    Rejected { message: Option<String> },
}

impl ApiError {
    /// The server answered but said no.
    pub fn rejection(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message } => Some(message.as_deref().unwrap_or("Unknown error")),
            _ => None,
        }
    }

    /// Anything short of a well-formed answer from the server.
    pub fn is_transport(&self) -> bool {
        !matches!(self, ApiError::Rejected { .. })
    }
}

/// The inbox service endpoints. Email keys are the email's current
/// position in the server's list.
#[async_trait]
pub trait MailApi: Send + Sync {
    async fn classify_email(&self, position: usize) -> Result<Vec<String>, ApiError>;
    async fn chat(&self, query: &str, position: usize) -> Result<String, ApiError>;
    async fn add_category(&self, category: &str) -> Result<Vec<String>, ApiError>;
    async fn delete_category(&self, category: &str) -> Result<Vec<String>, ApiError>;
    async fn untag_email(&self, position: usize) -> Result<(), ApiError>;
    async fn delete_email(&self, position: usize) -> Result<(), ApiError>;
    async fn create_email(&self, draft: &EmailDraft) -> Result<(), ApiError>;
}

/// Cookies set by the service, replayed on every request.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<BTreeMap<String, String>>,
}

impl CookieJar {
    /// Seeds the jar from a `Cookie` header value such as `a=1; b=2`.
    pub fn seed(&self, header: &str) {
        let mut cookies = self.cookies.lock().unwrap_or_else(|e| e.into_inner());
        for pair in header.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                if !name.is_empty() {
                    cookies.insert(name.to_string(), value.to_string());
                }
            }
        }
    }

    pub fn absorb(&self, headers: &HeaderMap) {
        let mut cookies = self.cookies.lock().unwrap_or_else(|e| e.into_inner());
        for value in headers.get_all(SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let pair = value.split(';').next().unwrap_or_default();
            if let Some((name, value)) = pair.trim().split_once('=') {
                if value.is_empty() {
                    cookies.remove(name);
                } else {
                    cookies.insert(name.to_string(), value.to_string());
                }
            }
        }
    }

    pub fn header_value(&self) -> Option<String> {
        let cookies = self.cookies.lock().unwrap_or_else(|e| e.into_inner());
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

pub struct HttpMailApi {
    client: Client<HttpsConnector<HttpConnector>>,
    base_url: String,
    timeout: Duration,
    cookies: CookieJar,
}

impl HttpMailApi {
    pub fn new(base_url: &str, timeout: Duration) -> std::io::Result<Self> {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_or_http()
            .enable_http1()
            .build();
        Ok(Self {
            client: Client::builder().build(connector),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            cookies: CookieJar::default(),
        })
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Loads the home page, which also primes the server-side session.
    pub async fn bootstrap(&self) -> Result<String, ApiError> {
        let bytes = self.send(Method::GET, "/", None).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Bytes, ApiError> {
        let mut builder = Request::builder().method(method.clone()).uri(self.url_for(path));
        if let Some(cookie) = self.cookies.header_value() {
            builder = builder.header(COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body))?,
            None => builder.body(Body::empty())?,
        };

        tracing::debug!("{} {}", method, path);
        let exchange = async {
            let response = self.client.request(request).await?;
            let (parts, body) = response.into_parts();
            self.cookies.absorb(&parts.headers);
            let bytes = hyper::body::to_bytes(body).await?;
            tracing::debug!("{} {} -> {}", method, path, parts.status);
            Ok::<_, ApiError>(bytes)
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ApiError::Timeout(self.timeout))?
    }

    async fn call<T: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&T>,
    ) -> Result<ApiEnvelope, ApiError> {
        let body = payload.map(serde_json::to_vec).transpose()?;
        let bytes = self.send(method, path, body).await?;
        let envelope: ApiEnvelope = serde_json::from_slice(&bytes)?;
        Ok(envelope)
    }

    async fn call_expecting_success<T: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&T>,
    ) -> Result<ApiEnvelope, ApiError> {
        let envelope = self.call(method, path, payload).await?;
        if envelope.is_success() {
            Ok(envelope)
        } else {
            let message = envelope.failure_message();
            tracing::warn!("{} rejected: {:?}", path, message);
            Err(ApiError::Rejected { message })
        }
    }
}

#[async_trait]
impl MailApi for HttpMailApi {
    async fn classify_email(&self, position: usize) -> Result<Vec<String>, ApiError> {
        let request = ClassifyRequest { email_id: position };
        let envelope = self
            .call_expecting_success(Method::POST, "/classify-email", Some(&request))
            .await?;
        Ok(envelope.tags.unwrap_or_default())
    }

    async fn chat(&self, query: &str, position: usize) -> Result<String, ApiError> {
        let request = ChatRequest {
            query,
            email_id: position,
        };
        let envelope = self
            .call_expecting_success(Method::POST, "/chat", Some(&request))
            .await?;
        Ok(envelope.response.unwrap_or_default())
    }

    async fn add_category(&self, category: &str) -> Result<Vec<String>, ApiError> {
        let request = CategoryRequest { category };
        let envelope = self
            .call_expecting_success(Method::POST, "/add-category", Some(&request))
            .await?;
        Ok(envelope.keywords.unwrap_or_default())
    }

    async fn delete_category(&self, category: &str) -> Result<Vec<String>, ApiError> {
        let request = CategoryRequest { category };
        let envelope = self
            .call_expecting_success(Method::POST, "/delete-category", Some(&request))
            .await?;
        Ok(envelope.keywords.unwrap_or_default())
    }

    async fn untag_email(&self, position: usize) -> Result<(), ApiError> {
        let path = format!("/untag-email/{}", position);
        self.call_expecting_success::<()>(Method::POST, &path, None)
            .await?;
        Ok(())
    }

    async fn delete_email(&self, position: usize) -> Result<(), ApiError> {
        let path = format!("/delete-email/{}", position);
        self.call_expecting_success::<()>(Method::DELETE, &path, None)
            .await?;
        Ok(())
    }

    async fn create_email(&self, draft: &EmailDraft) -> Result<(), ApiError> {
        let envelope = self
            .call(Method::POST, "/create-email", Some(draft))
            .await?;
        if envelope.success == Some(true) {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                message: envelope.error,
            })
        }
    }
}

fn embedded_array<T: DeserializeOwned>(html: &str, name: &str) -> Option<Vec<T>> {
    let start = html.find(name)?;
    let rest = &html[start..];
    let rest = &rest[rest.find('=')? + 1..];
    let rest = &rest[rest.find('[')?..];
    serde_json::Deserializer::from_str(rest)
        .into_iter::<Vec<T>>()
        .next()?
        .ok()
}

/// Extracts the `initialEmails` array the home page embeds for its scripts.
pub fn parse_initial_emails(html: &str) -> Option<Vec<EmailRecord>> {
    embedded_array(html, "initialEmails")
}

const KEYWORD_LINK: &str = "?keyword=";

/// Keywords the home page was rendered with: an embedded `initialKeywords`
/// array, else the sidebar's `?keyword=` folder links in page order.
pub fn parse_initial_keywords(html: &str) -> Option<Vec<String>> {
    if let Some(keywords) = embedded_array(html, "initialKeywords") {
        return Some(keywords);
    }
    let mut keywords: Vec<String> = Vec::new();
    for (start, _) in html.match_indices(KEYWORD_LINK) {
        let rest = &html[start + KEYWORD_LINK.len()..];
        let end = rest
            .find(|c: char| matches!(c, '"' | '\'' | '&' | '#' | '>') || c.is_whitespace())
            .unwrap_or(rest.len());
        let raw = rest[..end].replace('+', " ");
        let Ok(keyword) = urlencoding::decode(&raw) else {
            tracing::debug!("Skipping undecodable keyword link {:?}", raw);
            continue;
        };
        let keyword = keyword.trim();
        if !keyword.is_empty() && !keywords.iter().any(|k| k == keyword) {
            keywords.push(keyword.to_string());
        }
    }
    (!keywords.is_empty()).then_some(keywords)
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted in-memory stand-in for the inbox service.

    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Failure {
        Rejected,
        Network,
    }

    #[derive(Default)]
    pub struct FakeApi {
        pub calls: Mutex<Vec<String>>,
        tags: HashMap<usize, Vec<String>>,
        failures: HashMap<String, Failure>,
        keywords: Mutex<Vec<String>>,
    }

    impl FakeApi {
        pub fn new(keywords: &[&str]) -> Self {
            Self {
                keywords: Mutex::new(keywords.iter().map(|k| k.to_string()).collect()),
                ..Default::default()
            }
        }

        pub fn with_tags(mut self, position: usize, tags: &[&str]) -> Self {
            self.tags
                .insert(position, tags.iter().map(|t| t.to_string()).collect());
            self
        }

        /// Fails calls whose log line equals `call`, e.g. `classify 5`.
        pub fn failing(mut self, call: &str, failure: Failure) -> Self {
            self.failures.insert(call.to_string(), failure);
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) -> Result<(), ApiError> {
            self.calls.lock().unwrap().push(call.clone());
            match self.failures.get(&call) {
                Some(Failure::Rejected) => Err(ApiError::Rejected {
                    message: Some("scripted rejection".to_string()),
                }),
                Some(Failure::Network) => Err(ApiError::Timeout(Duration::from_secs(30))),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl MailApi for FakeApi {
        async fn classify_email(&self, position: usize) -> Result<Vec<String>, ApiError> {
            self.record(format!("classify {}", position))?;
            tokio::task::yield_now().await;
            Ok(self.tags.get(&position).cloned().unwrap_or_default())
        }

        async fn chat(&self, query: &str, position: usize) -> Result<String, ApiError> {
            self.record(format!("chat {}", position))?;
            Ok(format!("answer to '{}' about {}", query, position))
        }

        async fn add_category(&self, category: &str) -> Result<Vec<String>, ApiError> {
            self.record(format!("add {}", category))?;
            let mut keywords = self.keywords.lock().unwrap();
            if keywords.iter().any(|k| k == category) {
                return Err(ApiError::Rejected {
                    message: Some("Category already exists".to_string()),
                });
            }
            keywords.push(category.to_string());
            Ok(keywords.clone())
        }

        async fn delete_category(&self, category: &str) -> Result<Vec<String>, ApiError> {
            self.record(format!("delete {}", category))?;
            let mut keywords = self.keywords.lock().unwrap();
            if !keywords.iter().any(|k| k == category) {
                return Err(ApiError::Rejected {
                    message: Some("Category does not exist".to_string()),
                });
            }
            keywords.retain(|k| k != category);
            Ok(keywords.clone())
        }

        async fn untag_email(&self, position: usize) -> Result<(), ApiError> {
            self.record(format!("untag {}", position))
        }

        async fn delete_email(&self, position: usize) -> Result<(), ApiError> {
            self.record(format!("delete-email {}", position))
        }

        async fn create_email(&self, draft: &EmailDraft) -> Result<(), ApiError> {
            self.record(format!("create {}", draft.subject))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn cookie_jar_tracks_set_cookie_headers() {
        let jar = CookieJar::default();
        assert_eq!(jar.header_value(), None);

        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("session=abc123; HttpOnly; Path=/"),
        );
        headers.append(SET_COOKIE, HeaderValue::from_static("theme=dark; Path=/"));
        jar.absorb(&headers);
        assert_eq!(jar.header_value().as_deref(), Some("session=abc123; theme=dark"));

        let mut cleared = HeaderMap::new();
        cleared.append(SET_COOKIE, HeaderValue::from_static("theme=; Max-Age=0"));
        jar.absorb(&cleared);
        assert_eq!(jar.header_value().as_deref(), Some("session=abc123"));
    }

    #[test]
    fn cookie_jar_seeds_from_header_value() {
        let jar = CookieJar::default();
        jar.seed("session=xyz; other=1");
        assert_eq!(jar.header_value().as_deref(), Some("other=1; session=xyz"));
    }

    #[test]
    fn parses_embedded_initial_emails() {
        let html = r#"
            <script>
                const initialEmails = [{"subject": "Networking Night", "tags": ["networking"]},
                                       {"subject": "Deadline [extended]"}];
                const other = 1;
            </script>"#;
        let emails = parse_initial_emails(html).unwrap();
        assert_eq!(emails.len(), 2);
        assert_eq!(emails[0].tags, vec!["networking".to_string()]);
        assert_eq!(emails[1].subject, "Deadline [extended]");
    }

    #[test]
    fn missing_initial_emails_yields_none() {
        assert!(parse_initial_emails("<html></html>").is_none());
        assert!(parse_initial_emails("initialEmails = null;").is_none());
    }

    #[test]
    fn keywords_come_from_sidebar_links() {
        let html = r#"
            <a href="/?keyword=networking" class="folder-link">Networking</a>
            <a href="/?keyword=club%20events" class="folder-link">Club events</a>
            <a href="/?keyword=c%2B%2B+club&page=2">C++ club</a>
            <a href="/?keyword=networking">again</a>"#;
        assert_eq!(
            parse_initial_keywords(html).unwrap(),
            vec!["networking", "club events", "c++ club"]
        );
    }

    #[test]
    fn embedded_keyword_array_wins_over_links() {
        let html = r#"<script>const initialKeywords = ["research", "job-fair"];</script>
            <a href="/?keyword=networking">Networking</a>"#;
        assert_eq!(
            parse_initial_keywords(html).unwrap(),
            vec!["research", "job-fair"]
        );
        assert!(parse_initial_keywords("<html></html>").is_none());
    }

    #[test]
    fn rejection_exposes_server_message() {
        let err = ApiError::Rejected {
            message: Some("Category already exists".into()),
        };
        assert_eq!(err.rejection(), Some("Category already exists"));
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "Category already exists");

        let err = ApiError::Rejected { message: None };
        assert_eq!(err.to_string(), "Unknown error");

        let decode = serde_json::from_str::<ApiEnvelope>("<html>").unwrap_err();
        assert!(ApiError::from(decode).is_transport());
    }

    mod over_http {
        use super::*;
        use crate::cache::TagNote;
        use crate::inbox::{ClassifyOutcome, Outcome, Session};
        use crate::models::{InitialState, Theme};
        use hyper::service::{make_service_fn, service_fn};
        use hyper::{Response, Server, StatusCode};
        use std::convert::Infallible;

        async fn canned(request: Request<Body>) -> Result<Response<Body>, Infallible> {
            let (status, body) = match request.uri().path() {
                "/classify-email" => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "<html><h1>Internal Server Error</h1></html>",
                ),
                "/add-category" => (
                    StatusCode::BAD_REQUEST,
                    r#"{"error": "Empty category name"}"#,
                ),
                "/delete-category" => (
                    StatusCode::OK,
                    r#"{"status": "success", "keywords": ["networking"]}"#,
                ),
                _ => (StatusCode::NOT_FOUND, "not found"),
            };
            Ok(Response::builder()
                .status(status)
                .body(Body::from(body))
                .unwrap())
        }

        fn serve() -> HttpMailApi {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.set_nonblocking(true).unwrap();
            let addr = listener.local_addr().unwrap();
            let make_svc =
                make_service_fn(|_conn| async { Ok::<_, Infallible>(service_fn(canned)) });
            tokio::spawn(Server::from_tcp(listener).unwrap().serve(make_svc));
            HttpMailApi::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap()
        }

        #[tokio::test]
        async fn html_error_page_counts_as_network_failure() {
            let api = serve();
            let err = api.classify_email(0).await.unwrap_err();
            assert!(matches!(err, ApiError::Decode(_)));
            assert!(err.is_transport());

            let mut session = Session::new(
                InitialState {
                    emails: vec![EmailRecord::default()],
                    keywords: Vec::new(),
                },
                Theme::Light,
            );
            let id = session.cache.id_at(0).unwrap();
            let request = session.begin_classify(id).unwrap();
            let outcome = session.apply(request.run(&api).await);
            assert!(matches!(
                outcome,
                Outcome::Classified(ClassifyOutcome::Failed(_))
            ));
            let note = session.cache.get(id).unwrap().view.note.unwrap();
            assert_eq!(note, TagNote::NetworkError);
            assert_eq!(note.text(), "Network error.");
        }

        #[tokio::test]
        async fn json_error_body_is_a_rejection_with_its_message() {
            let api = serve();
            let err = api.add_category("").await.unwrap_err();
            assert_eq!(err.rejection(), Some("Empty category name"));
            assert!(!err.is_transport());

            let keywords = api.delete_category("internship").await.unwrap();
            assert_eq!(keywords, vec!["networking".to_string()]);

            let err = api.untag_email(3).await.unwrap_err();
            assert!(matches!(err, ApiError::Decode(_)));
        }
    }
}
