//! LeadScraper HTTP client implementation.

use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;

use leadscraper_core::{
    BlogPost, BlogPostId, BusinessInfo, Lead, MessageDecoder, ScrapeEvent, ScrapeRequest,
    ScrapeResult,
};

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, CreditsResponse, CredentialsRequest, PaymentIntentResponse,
    TransactionsPage, UserProfile,
};

/// LeadScraper API client.
///
/// Holds a cookie store, so the session started by [`login`](Self::login) or
/// [`register`](Self::register) is sent with every later request.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the service (e.g., `"http://localhost:5000"`)
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new client with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty or the HTTP client cannot be
    /// built.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base URL must not be empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .cookie_store(true)
            .build()?;

        Ok(Self { client, base_url })
    }

    // ========================================================================
    // Auth
    // ========================================================================

    /// Create an account and start a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserProfile, ClientError> {
        self.request(
            Method::POST,
            "/api/register",
            Some(&CredentialsRequest { username, password }),
        )
        .await
    }

    /// Log in and start a session.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] for wrong credentials.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserProfile, ClientError> {
        self.request(
            Method::POST,
            "/api/login",
            Some(&CredentialsRequest { username, password }),
        )
        .await
    }

    /// End the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let _: serde_json::Value = self
            .request(Method::POST, "/api/logout", None::<&()>)
            .await?;
        Ok(())
    }

    /// The logged-in user.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] without a session.
    pub async fn user(&self) -> Result<UserProfile, ClientError> {
        self.request(Method::GET, "/api/user", None::<&()>).await
    }

    /// Save billing details.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the details are incomplete.
    pub async fn update_business_info(
        &self,
        info: &BusinessInfo,
    ) -> Result<UserProfile, ClientError> {
        self.request(Method::POST, "/api/business-info", Some(info))
            .await
    }

    // ========================================================================
    // Credits
    // ========================================================================

    /// Adjust the balance and return the new one.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InsufficientCredits`] if the balance would go
    /// negative.
    pub async fn add_credits(&self, amount: i64) -> Result<i64, ClientError> {
        let response: CreditsResponse = self
            .request(
                Method::POST,
                "/api/credits/add",
                Some(&serde_json::json!({ "amount": amount })),
            )
            .await?;
        Ok(response.credits)
    }

    /// One page of credit history.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn transactions(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<TransactionsPage, ClientError> {
        self.request(
            Method::GET,
            &format!("/api/credits/transactions?limit={limit}&offset={offset}"),
            None::<&()>,
        )
        .await
    }

    /// Start a credit purchase with `provider` (`stripe` or `mollie`).
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is not configured (503) or rejects
    /// the payment.
    pub async fn create_payment_intent(
        &self,
        credit_amount: i64,
        provider: &str,
    ) -> Result<PaymentIntentResponse, ClientError> {
        self.request(
            Method::POST,
            "/api/create-payment-intent",
            Some(&serde_json::json!({
                "creditAmount": credit_amount,
                "provider": provider,
            })),
        )
        .await
    }

    // ========================================================================
    // Leads
    // ========================================================================

    /// The user's leads, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn leads(&self) -> Result<Vec<Lead>, ClientError> {
        self.request(Method::GET, "/api/leads", None::<&()>).await
    }

    /// Scrape one lead, paying one credit.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InsufficientCredits`] at zero balance.
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResult, ClientError> {
        let request = ScrapeRequest {
            stream: false,
            ..request.clone()
        };
        self.request(Method::POST, "/api/scrape", Some(&request))
            .await
    }

    /// Scrape one lead and follow its progress.
    ///
    /// `on_event` sees every message as it arrives; all messages are also
    /// returned in order.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InsufficientCredits`] at zero balance, or a
    /// framing error for a malformed message.
    pub async fn scrape_stream<F>(
        &self,
        request: &ScrapeRequest,
        on_event: F,
    ) -> Result<Vec<ScrapeEvent>, ClientError>
    where
        F: FnMut(&ScrapeEvent),
    {
        let request = ScrapeRequest {
            stream: true,
            ..request.clone()
        };
        self.request_stream(Method::POST, "/api/scrape", Some(&request), on_event)
            .await
    }

    // ========================================================================
    // Blog
    // ========================================================================

    /// All blog posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn blog_posts(&self) -> Result<Vec<BlogPost>, ClientError> {
        self.request(Method::GET, "/api/blog-posts", None::<&()>).await
    }

    /// One blog post.
    ///
    /// # Errors
    ///
    /// Returns an API error with status 404 for an unknown post.
    pub async fn blog_post(&self, id: BlogPostId) -> Result<BlogPost, ClientError> {
        self.request(Method::GET, &format!("/api/blog-posts/{id}"), None::<&()>)
            .await
    }

    /// Publish a blog post as the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the post is invalid.
    pub async fn create_blog_post(
        &self,
        title: &str,
        content: &str,
    ) -> Result<BlogPost, ClientError> {
        self.request(
            Method::POST,
            "/api/blog-posts",
            Some(&serde_json::json!({ "title": title, "content": content })),
        )
        .await
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Send a JSON request and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(method, path, body).await?;
        Ok(response.json().await?)
    }

    /// Send a JSON request and read the response as framed messages.
    ///
    /// The body is read incrementally; `on_message` is called once per
    /// complete message, in order. A trailing message without a delimiter is
    /// delivered when the stream ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server returns an error, or
    /// a message is not valid JSON for `T`.
    pub async fn request_stream<B, T, F>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        mut on_message: F,
    ) -> Result<Vec<T>, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
        F: FnMut(&T),
    {
        let response = self.send(method, path, body).await?;

        let mut decoder = MessageDecoder::new();
        let mut messages = Vec::new();
        let mut chunks = response.bytes_stream();

        while let Some(chunk) = chunks.next().await {
            for message in decoder.push::<T>(&chunk?) {
                let message = message?;
                on_message(&message);
                messages.push(message);
            }
        }

        if let Some(message) = decoder.finish::<T>() {
            let message = message?;
            on_message(&message);
            messages.push(message);
        }

        tracing::debug!(path, messages = messages.len(), "Stream finished");
        Ok(messages)
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{path}", self.base_url);
        let mut builder = self.client.request(method, &url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        self.check_status(response).await
    }

    /// Pass successful responses through and convert error bodies.
    async fn check_status(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        // Try to parse error response
        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let code = api_error.error.code.as_str();
                let detail = |key: &str| {
                    api_error
                        .error
                        .details
                        .as_ref()
                        .and_then(|d| d.get(key))
                        .and_then(serde_json::Value::as_i64)
                        .unwrap_or(0)
                };

                // Map specific error codes to typed errors
                match code {
                    "insufficient_credits" => Err(ClientError::InsufficientCredits {
                        balance: detail("balance"),
                        required: detail("required"),
                    }),
                    "unauthorized" => Err(ClientError::Unauthorized),
                    _ => Err(ClientError::Api {
                        code: code.to_string(),
                        message: api_error.error.message,
                        status: status.as_u16(),
                    }),
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self { timeout_seconds: 30 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscraper_core::{encode_message, NewLead, UserId, MESSAGE_DELIMITER};
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user_json() -> serde_json::Value {
        serde_json::json!({
            "id": UserId::generate().to_string(),
            "username": "a@b.de",
            "credits": 0,
            "stripeCustomerId": null,
            "businessInfo": null,
            "createdAt": "2026-01-01T00:00:00Z"
        })
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = ApiClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.base_url, "http://localhost:5000");
    }

    #[test]
    fn empty_base_url_is_rejected() {
        assert!(matches!(
            ApiClient::new("/"),
            Err(ClientError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn session_cookie_is_sent_after_login() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/login"))
            .and(body_partial_json(serde_json::json!({ "username": "a@b.de" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "leadscraper.sid=abc.def; Path=/; HttpOnly")
                    .set_body_json(user_json()),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/user"))
            .and(header("cookie", "leadscraper.sid=abc.def"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        client.login("a@b.de", "pw").await.unwrap();
        let user = client.user().await.unwrap();

        assert_eq!(user.username, "a@b.de");
    }

    #[tokio::test]
    async fn api_errors_are_typed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/scrape"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {
                    "code": "insufficient_credits",
                    "message": "Insufficient credits",
                    "details": { "balance": 0, "required": 1 }
                }
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "code": "unauthorized", "message": "Authentication required" }
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/leads"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();

        assert!(matches!(
            client.scrape(&ScrapeRequest::default()).await,
            Err(ClientError::InsufficientCredits {
                balance: 0,
                required: 1
            })
        ));
        assert!(matches!(client.user().await, Err(ClientError::Unauthorized)));
        assert!(matches!(
            client.leads().await,
            Err(ClientError::Api { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn add_credits_returns_balance() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/credits/add"))
            .and(body_partial_json(serde_json::json!({ "amount": 10 })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "credits": 10 })),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/credits/transactions"))
            .and(query_param("limit", "5"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "transactions": [],
                "limit": 5,
                "offset": 0
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        assert_eq!(client.add_credits(10).await.unwrap(), 10);

        let page = client.transactions(5, 0).await.unwrap();
        assert!(page.transactions.is_empty());
        assert_eq!(page.limit, 5);
    }

    #[tokio::test]
    async fn scrape_stream_delivers_each_message_once_in_order() {
        let server = MockServer::start().await;

        let lead = NewLead::placeholder(None, None, None).into_lead(UserId::generate());
        let events = vec![
            ScrapeEvent::progress("Searching", 10),
            ScrapeEvent::progress("Collecting", 60),
            ScrapeEvent::Complete(ScrapeResult { lead, credits: 4 }),
        ];
        let mut body = Vec::new();
        for event in &events[..2] {
            body.extend(encode_message(event).unwrap());
        }
        // The last message arrives without a trailing delimiter.
        body.extend(serde_json::to_vec(&events[2]).unwrap());

        Mock::given(method("POST"))
            .and(path("/api/scrape"))
            .and(body_partial_json(serde_json::json!({ "stream": true })))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(body, "text/plain; charset=utf-8"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let mut seen = Vec::new();
        let received = client
            .scrape_stream(&ScrapeRequest::default(), |event| seen.push(event.clone()))
            .await
            .unwrap();

        assert_eq!(received, events);
        assert_eq!(seen, events);
    }

    #[tokio::test]
    async fn malformed_stream_message_is_an_error() {
        let server = MockServer::start().await;

        let body = format!("{{\"type\":\"progress\"{MESSAGE_DELIMITER}");
        Mock::given(method("POST"))
            .and(path("/api/scrape"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let result = client
            .scrape_stream(&ScrapeRequest::default(), |_| {})
            .await;

        assert!(matches!(result, Err(ClientError::Framing(_))));
    }
}
