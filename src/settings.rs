use std::{fmt::{Debug, Formatter}, time::Duration};
use config::{Config, ConfigError, Environment, File};
use serde::{de, Deserialize, Deserializer};

pub const DEFAULT_API_URL: &str = "https://api.beget.com/api/dns/changeRecords";
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Deserialize)]
pub struct Settings {
    #[serde(deserialize_with = "deserialize_domains")]
    pub domains: Vec<String>,
    pub beget_login: String,
    pub beget_passw: String,
    pub get_ip_url: String,

    #[serde(default = "default_api_url")]
    pub beget_api_url: String,
    #[serde(default = "default_update_interval", deserialize_with = "deserialize_interval")]
    pub update_interval: Duration,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_env(Environment::default())
    }

    /// Builds settings from the config files plus the given environment source.
    pub fn from_env(env: Environment) -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("/etc/beget-ddns/config").required(false))
            .add_source(env)
            .build()?;

        cfg.try_deserialize()
    }

    /// Test helper that reads variables from a map instead of the process environment.
    #[cfg(test)]
    pub fn from_map(vars: config::Map<String, String>) -> Result<Self, ConfigError> {
        Self::from_env(Environment::default().source(Some(vars)))
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("domains", &self.domains)
            .field("beget_login", &self.beget_login)
            .field("beget_passw", &"<redacted>")
            .field("get_ip_url", &self.get_ip_url)
            .field("beget_api_url", &self.beget_api_url)
            .field("update_interval", &self.update_interval)
            .finish()
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_owned()
}

fn default_update_interval() -> Duration {
    DEFAULT_UPDATE_INTERVAL
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DomainList {
    Csv(String),
    List(Vec<String>),
}

fn deserialize_domains<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = match DomainList::deserialize(deserializer)? {
        DomainList::Csv(s) => s.split(',').map(ToOwned::to_owned).collect(),
        DomainList::List(l) => l,
    };

    let domains: Vec<String> = raw.iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .map(ToOwned::to_owned)
        .collect();

    if domains.is_empty() {
        Err(de::Error::custom("no domains configured"))
    } else {
        Ok(domains)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Interval {
    Seconds(u64),
    Text(String),
}

/// Accepts a humantime string (`"10m"`, `"90s"`) or a whole number of seconds.
fn deserialize_interval<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    match Interval::deserialize(deserializer)? {
        Interval::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Interval::Text(s) => match s.trim().parse::<u64>() {
            Ok(secs) => Ok(Duration::from_secs(secs)),
            Err(_) => humantime::parse_duration(&s).map_err(|e| {
                de::Error::custom(format!(
                    "invalid update_interval {:?}: {} (use e.g. \"10m\" or a number of seconds)",
                    s, e
                ))
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use config::{FileFormat, Map};
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DOMAINS", "a.example.com,b.example.com"),
            ("BEGET_LOGIN", "user"),
            ("BEGET_PASSW", "secret"),
            ("GET_IP_URL", "https://ip.example.com"),
        ]
    }

    #[test]
    fn loads_required_variables() {
        let settings = Settings::from_map(vars(&required())).unwrap();

        assert_eq!(settings.domains, vec!["a.example.com", "b.example.com"]);
        assert_eq!(settings.beget_login, "user");
        assert_eq!(settings.beget_passw, "secret");
        assert_eq!(settings.get_ip_url, "https://ip.example.com");
        assert_eq!(settings.beget_api_url, DEFAULT_API_URL);
        assert_eq!(settings.update_interval, Duration::from_secs(600));
    }

    #[test]
    fn missing_variable_is_an_error() {
        for missing in ["DOMAINS", "BEGET_LOGIN", "BEGET_PASSW", "GET_IP_URL"] {
            let pairs: Vec<_> = required().into_iter().filter(|(k, _)| *k != missing).collect();
            assert!(Settings::from_map(vars(&pairs)).is_err(), "{} should be required", missing);
        }
    }

    #[test]
    fn domains_keep_order_and_duplicates() {
        let mut pairs = required();
        pairs[0] = ("DOMAINS", " b.example.com, a.example.com,,b.example.com ");

        let settings = Settings::from_map(vars(&pairs)).unwrap();
        assert_eq!(settings.domains, vec!["b.example.com", "a.example.com", "b.example.com"]);
    }

    #[test]
    fn empty_domain_list_is_an_error() {
        let mut pairs = required();
        pairs[0] = ("DOMAINS", " , ");

        assert!(Settings::from_map(vars(&pairs)).is_err());
    }

    #[test]
    fn optional_overrides() {
        let mut pairs = required();
        pairs.push(("UPDATE_INTERVAL", "90s"));
        pairs.push(("BEGET_API_URL", "http://localhost:8080/changeRecords"));

        let settings = Settings::from_map(vars(&pairs)).unwrap();
        assert_eq!(settings.update_interval, Duration::from_secs(90));
        assert_eq!(settings.beget_api_url, "http://localhost:8080/changeRecords");
    }

    #[test]
    fn bad_interval_is_an_error() {
        let mut pairs = required();
        pairs.push(("UPDATE_INTERVAL", "soon"));

        assert!(Settings::from_map(vars(&pairs)).is_err());
    }

    #[test]
    fn interval_as_bare_seconds() {
        let mut pairs = required();
        pairs.push(("UPDATE_INTERVAL", "600"));

        let settings = Settings::from_map(vars(&pairs)).unwrap();
        assert_eq!(settings.update_interval, Duration::from_secs(600));
    }

    #[test]
    fn interval_from_toml_file() {
        let toml = r#"
            domains = ["a.example.com", "b.example.com"]
            beget_login = "user"
            beget_passw = "secret"
            get_ip_url = "https://ip.example.com"
            update_interval = 120
        "#;

        let settings: Settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.domains, vec!["a.example.com", "b.example.com"]);
        assert_eq!(settings.update_interval, Duration::from_secs(120));
    }

    #[test]
    fn debug_redacts_password() {
        let settings = Settings::from_map(vars(&required())).unwrap();
        let out = format!("{:?}", settings);

        assert!(!out.contains("secret"));
        assert!(out.contains("<redacted>"));
    }
}
