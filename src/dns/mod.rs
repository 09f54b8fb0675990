pub mod beget;

/// DNS management API that can point a domain's A record at an address.
#[cfg_attr(test, mockall::automock(type Error = std::io::Error;))]
#[async_trait::async_trait]
pub trait Provider {
    type Error: std::error::Error;

    /// Replaces the A record of `fqdn` with `ip`. Returns `Ok` only when the
    /// provider confirmed the change.
    async fn update_record(&self, fqdn: &str, ip: &str) -> Result<(), Self::Error>;
}
