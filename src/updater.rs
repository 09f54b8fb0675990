use std::{
    collections::HashMap,
    fmt::{Debug, Display, Formatter},
    time::Duration,
};
use tokio::{sync::watch, time};
use tracing::{error, info};
use crate::{
    dns::Provider,
    ip::IpSource,
};

/// Counts of what happened to each configured domain during one cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub updated: usize,
    pub up_to_date: usize,
    pub failed: usize,
}

/// Keeps a list of domains pointed at the host's public IP.
///
/// Each domain's last confirmed address lives only in memory, so the first
/// cycle after startup always pushes an update.
#[derive(Debug)]
pub struct Updater<D: Provider, I: IpSource> {
    provider: D,
    ip_source: I,
    domains: Vec<String>,

    update_interval: Duration,

    states: HashMap<String, String>,
}

impl<D: Provider, I: IpSource> Updater<D, I> {
    pub fn new(provider: D, ip_source: I, domains: Vec<String>, update_interval: Duration) -> Self {
        Self {
            provider,
            ip_source,
            domains,
            update_interval,
            states: HashMap::new(),
        }
    }

    /// Last address confirmed by the provider for each domain.
    pub fn states(&self) -> &HashMap<String, String> {
        &self.states
    }

    /// Runs cycles until `shutdown` becomes `true`.
    ///
    /// Shutdown is checked before every cycle and interrupts the wait between
    /// cycles. A cycle already in flight is allowed to finish.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                info!("termination requested");
                break;
            }

            let timeout = time::timeout(self.update_interval, self.update_domains()).await;
            match timeout {
                Ok(Ok(summary)) => {
                    info!(
                        updated = summary.updated,
                        up_to_date = summary.up_to_date,
                        failed = summary.failed,
                        "cycle finished"
                    );
                }
                Ok(Err(e)) => {
                    error!(error = ?e, "domain updating returned an error: {}", e);
                }
                Err(_) => {
                    error!("domain updating timed out");
                }
            }

            // A dropped sender can never request shutdown, so only a received
            // `true` cuts the wait short.
            tokio::select! {
                _ = time::sleep(self.update_interval) => {}
                Ok(_) = shutdown.wait_for(|stop| *stop) => {}
            }
        }
    }

    /// Runs one cycle: discover the IP, then update every domain in order.
    ///
    /// Only a discovery failure aborts the cycle. Provider failures are logged
    /// per domain and leave that domain's state untouched.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn update_domains(&mut self) -> Result<CycleSummary, UpdateError<I>> {
        let ip = self.ip_source.current_ip()
            .await
            .map_err(UpdateError::<I>::IpSourceError)?;
        info!(%ip, "current IP address is {}", ip);

        let mut summary = CycleSummary::default();

        for domain in &self.domains {
            if !needs_update(self.states.get(domain).map(String::as_str), &ip) {
                info!(%domain, "record already up to date");
                summary.up_to_date += 1;
                continue;
            }

            match self.provider.update_record(domain, &ip).await {
                Ok(()) => {
                    info!(%domain, %ip, "record updated");
                    self.states.insert(domain.clone(), ip.clone());
                    summary.updated += 1;
                }
                Err(e) => {
                    error!(%domain, "failed to update record: {}", e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}

/// A domain needs an update when it was never confirmed or was confirmed with
/// a different address.
pub fn needs_update(previous: Option<&str>, ip: &str) -> bool {
    previous != Some(ip)
}

pub enum UpdateError<I: IpSource> {
    IpSourceError(I::Error),
}

impl<I: IpSource> Debug for UpdateError<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateError::IpSourceError(e) => f.debug_tuple("IpSourceError").field(e).finish(),
        }
    }
}

impl<I: IpSource> Display for UpdateError<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateError::IpSourceError(e) => write!(f, "failed to discover IP address: {}", e),
        }
    }
}

impl<I: IpSource> std::error::Error for UpdateError<I> {}
