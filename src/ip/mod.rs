pub mod http;

/// Source of the host's current public IP address.
#[cfg_attr(test, mockall::automock(type Error = std::io::Error;))]
#[async_trait::async_trait]
pub trait IpSource {
    type Error: std::error::Error;

    /// Returns the current address exactly as the source reported it.
    async fn current_ip(&self) -> Result<String, Self::Error>;
}
