//! The external dataset source.

use std::time::Duration;

use serde_json::Value;

use crate::{Error, Result};

/// Where the dataset lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct Source {
  pub url:     String,
  pub timeout: Duration,
}

impl Source {
  pub async fn fetch(&self) -> Result<Vec<Value>> {
    let client = reqwest::Client::builder().timeout(self.timeout).build()?;
    fetch_dataset(&client, &self.url).await
  }
}

/// Fetch the whole dataset in one request.
///
/// A transport error, a non-2xx status or a body that is not a JSON array
/// is fatal for the run.
pub async fn fetch_dataset(client: &reqwest::Client, url: &str) -> Result<Vec<Value>> {
  let response = client.get(url).send().await?;
  let status = response.status();
  if !status.is_success() {
    return Err(Error::SourceStatus { url: url.to_owned(), status: status.as_u16() });
  }

  match response.json::<Value>().await? {
    Value::Array(records) => Ok(records),
    _ => Err(Error::NotAnArray),
  }
}
