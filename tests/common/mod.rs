// Shared test helpers: a scripted transport that replays canned responses
// in order and records every request it is given.

#![allow(dead_code)]

use camcog_url::{ApiClient, CamcogError, RawResponse, ServiceConfig, StudySettings, Transport};
use reqwest::blocking::Request;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use url::Url;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
}

impl Recorded {
    pub fn filter(&self) -> Value {
        serde_json::from_str(&self.query["filter"]).expect("filter is JSON")
    }
}

#[derive(Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<RawResponse>>,
    requests: RefCell<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: Value) -> Self {
        self.respond_raw(status, body.to_string().into_bytes())
    }

    pub fn respond_raw(self, status: u16, body: Vec<u8>) -> Self {
        self.responses.borrow_mut().push_back(RawResponse {
            status: StatusCode::from_u16(status).expect("valid status"),
            body,
        });
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.borrow().clone()
    }

    pub fn creates(&self) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == Method::POST)
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.responses.borrow().len()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: Request) -> Result<RawResponse, CamcogError> {
        let body = request
            .body()
            .and_then(|b| b.as_bytes())
            .map(|bytes| serde_json::from_slice(bytes).expect("request body is JSON"));
        let recorded = Recorded {
            method: request.method().clone(),
            path: request.url().path().to_string(),
            query: request.url().query_pairs().into_owned().collect(),
            body,
        };
        let response = self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request {} {}", recorded.method, recorded.path));
        self.requests.borrow_mut().push(recorded);
        Ok(response)
    }
}

pub fn service_config() -> ServiceConfig {
    ServiceConfig {
        base_url: Url::parse("https://connect-demo.int.cantab.com").unwrap(),
        username: "user".into(),
        password: "secret".into(),
        user_agent: "camcog-test/1".into(),
        timeout: None,
    }
}

pub fn client(transport: ScriptedTransport) -> ApiClient<ScriptedTransport> {
    ApiClient::with_transport(service_config(), transport).unwrap()
}

pub fn study() -> StudySettings {
    StudySettings {
        group_def: "G1".into(),
        organisation: "ORG".into(),
        study_id: "ST1".into(),
        site: "SITE".into(),
        study_def: "SD1".into(),
    }
}

pub fn subjects(ids: &[&str]) -> Value {
    let records: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "status": "NEW", "study": "ST1", "subjectIds": ["S1"], "clientId": null}))
        .collect();
    json!({"records": records, "total": ids.len(), "success": true})
}

pub fn access_codes(pairs: &[(&str, &str)]) -> Value {
    let records: Vec<Value> = pairs
        .iter()
        .map(|(code, subject)| json!({"accessCode": code, "subject": subject, "accessCodeCreationDate": 1_600_000_000_000i64}))
        .collect();
    json!({"records": records, "total": pairs.len(), "success": true})
}
