// API client module: a small blocking HTTP client for the CANTAB
// subject web service. Requests are built here and handed to a
// `Transport`, which in production is a reqwest blocking client and in
// tests a scripted stand-in.

use crate::config::ServiceConfig;
use crate::error::CamcogError;
use crate::model::{AccessCodeRecord, QueryResult, SubjectQuery, SubjectRecord};
use reqwest::blocking::{Client, Request, RequestBuilder};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const SUBJECT_LOOKUP_PATH: &str = "/api/subject";
pub const SUBJECT_CREATE_PATH: &str = "/server-webservices/subject";
pub const ACCESS_CODE_PATH: &str = "/server-webservices/subjectLoginInfo";

/// Hosted questionnaire entry point. Fixed, whatever the configured base address.
pub const REDIRECT_BASE: &str = "https://app.cantab.com/subject/index.html";

/// Status and raw body of a response, before any decoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Sends a fully built request and returns the raw response.
pub trait Transport {
    fn execute(&self, request: Request) -> Result<RawResponse, CamcogError>;
}

/// Transport backed by a reqwest blocking client.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        HttpTransport { client }
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: Request) -> Result<RawResponse, CamcogError> {
        let response = self.client.execute(request)?;
        let status = response.status();
        let body = response.bytes()?.to_vec();
        Ok(RawResponse { status, body })
    }
}

/// Client for the remote subject service. Holds the connection settings,
/// a reqwest client used to build requests, and the transport that sends
/// them.
#[derive(Clone)]
pub struct ApiClient<T = HttpTransport> {
    client: Client,
    config: ServiceConfig,
    transport: T,
}

impl ApiClient<HttpTransport> {
    /// Create a client that talks HTTP, applying the configured timeout.
    pub fn new(config: ServiceConfig) -> Result<Self, CamcogError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(ApiClient {
            transport: HttpTransport::new(client.clone()),
            client,
            config,
        })
    }
}

impl<T: Transport> ApiClient<T> {
    /// Create a client that sends its requests through `transport`.
    pub fn with_transport(config: ServiceConfig, transport: T) -> Result<Self, CamcogError> {
        let client = Client::builder().build()?;
        Ok(ApiClient {
            client,
            config,
            transport,
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Look the subject up by study and subject identifier and register it
    /// when the lookup finds nothing. Returns the envelope of whichever call
    /// ran last; a subject that already exists is never registered again.
    pub fn find_or_create_subject(
        &self,
        query: &SubjectQuery,
    ) -> Result<QueryResult<SubjectRecord>, CamcogError> {
        let found = self.lookup_subject(&query.study_id, &query.subject_id)?;
        if !found.records.is_empty() {
            tracing::debug!(subject = %query.subject_id, records = found.records.len(), "subject already registered");
            return Ok(found);
        }
        tracing::info!(subject = %query.subject_id, study = %query.study_id, "registering new subject");
        self.create_subject(query)
    }

    /// Query the subject collection for at most one match.
    pub fn lookup_subject(
        &self,
        study_id: &str,
        subject_id: &str,
    ) -> Result<QueryResult<SubjectRecord>, CamcogError> {
        let request = self.get_request(SUBJECT_LOOKUP_PATH, &subject_filter(study_id, subject_id))?;
        self.send(request, "subject lookup")
    }

    /// Register a subject with status `NEW`. Mutates remote state.
    pub fn create_subject(
        &self,
        query: &SubjectQuery,
    ) -> Result<QueryResult<SubjectRecord>, CamcogError> {
        let request = self.post_request(SUBJECT_CREATE_PATH, &query.create_request())?;
        self.send(request, "subject registration")
    }

    /// Fetch the access code of a subject by its internal identifier. An
    /// absent code is returned as an empty envelope, not created.
    pub fn issue_access_code(
        &self,
        internal_id: &str,
    ) -> Result<QueryResult<AccessCodeRecord>, CamcogError> {
        let request = self.get_request(ACCESS_CODE_PATH, &access_code_filter(internal_id))?;
        self.send(request, "access code")
    }

    pub fn build_redirect_url(&self, subject: &str, access_code: &str) -> String {
        redirect_url(subject, access_code)
    }

    /// Common part of every request: resolved URL, JSON accept header,
    /// user agent and basic authentication.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, CamcogError> {
        let url = self
            .config
            .base_url
            .join(path)
            .map_err(|source| CamcogError::InvalidBaseUrl {
                url: self.config.base_url.to_string(),
                source,
            })?;
        Ok(self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, self.config.user_agent.as_str())
            .basic_auth(&self.config.username, Some(&self.config.password)))
    }

    fn get_request(&self, path: &str, filter: &str) -> Result<Request, CamcogError> {
        let request = self
            .request(Method::GET, path)?
            .query(&[("limit", "1"), ("filter", filter)])
            .build()?;
        Ok(request)
    }

    fn post_request<B: Serialize>(&self, path: &str, body: &B) -> Result<Request, CamcogError> {
        let request = self.request(Method::POST, path)?.json(body).build()?;
        Ok(request)
    }

    fn send<R: DeserializeOwned>(&self, request: Request, what: &'static str) -> Result<R, CamcogError> {
        let method = request.method().clone();
        let path = request.url().path().to_string();
        tracing::debug!(%method, %path, "sending request");
        let response = self.transport.execute(request)?;
        tracing::debug!(%method, %path, status = response.status.as_u16(), "received response");
        decode_response(response, what)
    }
}

/// Lookup filter: `{"study": <study>, "subjectIds": <subject>}` as JSON text.
pub fn subject_filter(study_id: &str, subject_id: &str) -> String {
    serde_json::json!({ "study": study_id, "subjectIds": subject_id }).to_string()
}

/// Access code filter: `{"subject": <internal id>}` as JSON text.
pub fn access_code_filter(internal_id: &str) -> String {
    serde_json::json!({ "subject": internal_id }).to_string()
}

/// Redirect URL for a subject, access code first. Both values are
/// percent-encoded.
pub fn redirect_url(subject: &str, access_code: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("accessCode", access_code)
        .append_pair("subject", subject)
        .finish();
    format!("{REDIRECT_BASE}?{query}")
}

/// Decode a response body, but only for a success status (below 300).
/// Anything else becomes a service error and the body is only used as
/// text for the message.
pub fn decode_response<R: DeserializeOwned>(
    response: RawResponse,
    what: &'static str,
) -> Result<R, CamcogError> {
    if response.status.as_u16() >= 300 {
        let text = String::from_utf8_lossy(&response.body);
        let text = text.trim();
        let message = if text.is_empty() {
            response.status.to_string()
        } else {
            format!("{} - {}", response.status, text)
        };
        return Err(CamcogError::Service {
            status: response.status.as_u16(),
            message,
        });
    }
    serde_json::from_slice(&response.body).map_err(|source| CamcogError::Protocol { what, source })
}
