use reqwest::{Client, IntoUrl, Url};
use thiserror::Error;
use tracing::debug;

/// Discovers the public IP by fetching a URL that echoes it back as plain text.
#[derive(Debug)]
pub struct HttpIpSource {
    url: Url,
    client: Client,
}

impl HttpIpSource {
    pub fn new<U: IntoUrl>(url: U, client: Client) -> Result<Self, HttpIpError> {
        Ok(Self {
            url: url.into_url()?,
            client,
        })
    }
}

#[async_trait::async_trait]
impl super::IpSource for HttpIpSource {
    type Error = HttpIpError;

    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn current_ip(&self) -> Result<String, Self::Error> {
        let body = self.client.get(self.url.clone())
            .send()
            .await?
            .bytes()
            .await?;

        let ip = String::from_utf8(body.to_vec())?;
        debug!(%ip, "got address from discovery url");

        Ok(ip)
    }
}

#[derive(Debug, Error)]
pub enum HttpIpError {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
    #[error("discovery response is not valid UTF-8: {0}")]
    NotText(#[from] std::string::FromUtf8Error),
}
