use std::time::Duration;

use crate::errors::ProvisionError;

const DELIMITER: &str = "://";

/// Synchronous HTTP client with a hard timeout
pub(crate) struct Downloader {
    agent: ureq::Agent,
    url: String,
}

pub(crate) fn extract_proto_prefix(url: &str) -> Result<&str, ProvisionError> {
    url.split_once(DELIMITER).map_or_else(
        || {
            Err(ProvisionError::ProvisionBug(format!(
                "url {url} is missing delimiter '{DELIMITER}'"
            )))
        },
        |(prefix, _rest_url)| Ok(prefix),
    )
}

impl Downloader {
    pub(crate) fn new(url: &str, timeout: Duration) -> Result<Self, ProvisionError> {
        match extract_proto_prefix(url)? {
            "http" | "https" => {}
            prefix => {
                return Err(ProvisionError::ProvisionBug(format!(
                    "unsupported protocol prefix {prefix}"
                )));
            }
        }

        Ok(Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            url: url.to_string(),
        })
    }

    fn get(&self) -> Result<ureq::Response, ProvisionError> {
        let resp = self.agent.get(&self.url).call().map_err(|err| {
            ProvisionError::Requirement(format!("failed to GET {}: {err}", self.url))
        })?;

        let status = resp.status();
        if !(200..=299).contains(&status) {
            return Err(ProvisionError::Requirement(format!(
                "GET {}: http status {status}",
                self.url
            )));
        }

        Ok(resp)
    }

    /// Succeeds if the host answers at all
    pub(crate) fn reachable(&self) -> Result<(), ProvisionError> {
        self.get().map(|_| ())
    }

    pub(crate) fn get_string(&self) -> Result<String, ProvisionError> {
        self.get()?.into_string().map_err(|err| {
            ProvisionError::Requirement(format!("body from {} is not string: {err}", self.url))
        })
    }
}

#[test]
fn test_extract_proto_prefix() {
    assert_eq!("https", extract_proto_prefix("https://archlinux.org").unwrap());
    assert!(extract_proto_prefix("archlinux.org").is_err());
    assert!(Downloader::new("ftp://example.com", Duration::from_secs(1)).is_err());
    assert!(Downloader::new("http://example.com", Duration::from_secs(1)).is_ok());
}
