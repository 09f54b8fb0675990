use reqwest::{Client, IntoUrl, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const RECORD_PRIORITY: u16 = 10;
const SUCCESS: &str = "success";

/// Client for the Beget `dns/changeRecords` endpoint.
pub struct BegetProvider {
    endpoint: Url,
    client: Client,

    login: String,
    password: String,
}

impl BegetProvider {
    pub fn new<U: IntoUrl>(
        endpoint: U,
        client: Client,
        login: String,
        password: String,
    ) -> Result<Self, BegetError> {
        Ok(Self {
            endpoint: endpoint.into_url()?,
            client,
            login,
            password,
        })
    }

    pub fn endpoint(&self) -> &Url { &self.endpoint }
}

#[async_trait::async_trait]
impl super::Provider for BegetProvider {
    type Error = BegetError;

    #[tracing::instrument(skip(self))]
    async fn update_record(&self, fqdn: &str, ip: &str) -> Result<(), Self::Error> {
        let data = build_payload(fqdn, ip)?;
        debug!(%data, "sending changeRecords request");

        let response = self.client.get(self.endpoint.clone())
            .query(&[
                ("login", self.login.as_str()),
                ("passwd", self.password.as_str()),
                ("input_format", "json"),
                ("output_format", "json"),
                ("input_data", data.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        validate_response(status, body)
    }
}

#[derive(Debug, Serialize)]
struct ChangeRecords<'a> {
    fqdn: &'a str,
    records: Records<'a>,
}

#[derive(Debug, Serialize)]
struct Records<'a> {
    #[serde(rename = "A")]
    a: [ARecord<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ARecord<'a> {
    priority: u16,
    value: &'a str,
}

/// Serializes the `input_data` parameter that replaces the A record of `fqdn`.
///
/// The output is compact JSON with a fixed field order, so equal inputs always
/// produce identical bytes.
pub fn build_payload(fqdn: &str, ip: &str) -> Result<String, BegetError> {
    let payload = ChangeRecords {
        fqdn,
        records: Records {
            a: [ARecord { priority: RECORD_PRIORITY, value: ip }],
        },
    };

    serde_json::to_string(&payload).map_err(BegetError::Payload)
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    answer: Option<Answer>,
}

#[derive(Debug, Deserialize)]
struct Answer {
    #[serde(default)]
    result: Option<bool>,
}

/// Accepts a response only if it is a 200 whose body reports `"status": "success"`
/// and `answer.result == true`.
pub fn validate_response(status: StatusCode, body: String) -> Result<(), BegetError> {
    if status != StatusCode::OK {
        return Err(BegetError::UnexpectedStatus { status, body });
    }

    let parsed: ApiResponse = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(source) => return Err(BegetError::MalformedResponse { status, body, source }),
    };

    let result = parsed.answer.and_then(|a| a.result);
    if parsed.status == SUCCESS && result == Some(true) {
        Ok(())
    } else {
        Err(BegetError::Rejected { status, body })
    }
}

#[derive(Debug, Error)]
pub enum BegetError {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
    #[error("failed to encode request payload: {0}")]
    Payload(#[source] serde_json::Error),
    #[error("unexpected response code {status}, body: {body:?}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error("malformed response (code {status}): {source}, body: {body:?}")]
    MalformedResponse {
        status: StatusCode,
        body: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("update rejected (code {status}), body: {body:?}")]
    Rejected { status: StatusCode, body: String },
}
