//! Thin HTTP wrapper: URL building, envelope decoding, status mapping and
//! cancellation. Resource-specific knowledge lives in [`super::client`].

use reqwest::{Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::{ParseError, Url};

use super::api_types::{ApiEnvelope, ApiErrorBody};
use super::error::ApiError;

/// Shared connection to the REST server.
#[derive(Clone, Debug)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: Url,
}

impl ApiClient {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
    let base_url = Url::parse(base_url)?;
    if base_url.cannot_be_a_base() {
      return Err(ApiError::InvalidUrl(ParseError::RelativeUrlWithCannotBeABaseBase));
    }

    let http = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(concat!("schooladm/", env!("CARGO_PKG_VERSION")))
      .build()?;

    Ok(Self { http, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// `{base}/{segments...}` with each segment percent-encoded.
  pub fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| ApiError::InvalidUrl(ParseError::RelativeUrlWithCannotBeABaseBase))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  /// GET and unwrap `data`.
  pub async fn get<T: DeserializeOwned>(
    &self,
    segments: &[&str],
    query: &[(&str, String)],
    cancel: Option<&CancellationToken>,
  ) -> Result<Option<T>, ApiError> {
    let url = self.url(segments)?;
    debug!(%url, ?query, "GET");
    let req = self.http.get(url).query(query);
    cancellable(cancel, async move { Self::parse(req.send().await?).await }).await
  }

  /// POST a JSON body and unwrap `data`.
  pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    segments: &[&str],
    body: &B,
  ) -> Result<Option<T>, ApiError> {
    let url = self.url(segments)?;
    debug!(%url, "POST");
    Self::parse(self.http.post(url).json(body).send().await?).await
  }

  /// PUT a JSON body and unwrap `data`.
  pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    segments: &[&str],
    body: &B,
  ) -> Result<Option<T>, ApiError> {
    let url = self.url(segments)?;
    debug!(%url, "PUT");
    Self::parse(self.http.put(url).json(body).send().await?).await
  }

  /// DELETE. Any successful body is ignored.
  pub async fn delete(&self, segments: &[&str]) -> Result<(), ApiError> {
    let url = self.url(segments)?;
    debug!(%url, "DELETE");
    let resp = self.http.delete(url).send().await?;
    Self::check(resp).await.map(|_| ())
  }

  /// Map non-2xx statuses to `ApiError`, passing successful responses through.
  async fn check(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }

    let path = resp.url().path().to_string();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
      .ok()
      .and_then(|b| b.message)
      .filter(|m| !m.is_empty())
      .unwrap_or_else(|| {
        if body.trim().is_empty() {
          status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
          body
        }
      });

    Err(match status {
      StatusCode::NOT_FOUND => ApiError::NotFound(format!("{}: {}", path, message)),
      StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ApiError::Validation(message),
      _ => ApiError::Server {
        status: status.as_u16(),
        message,
      },
    })
  }

  /// Decode `{ "data": T }`, mapping HTTP errors to `ApiError`.
  async fn parse<T: DeserializeOwned>(resp: Response) -> Result<Option<T>, ApiError> {
    let resp = Self::check(resp).await?;
    let bytes = resp.bytes().await?;
    if bytes.is_empty() {
      return Ok(None);
    }
    let envelope: ApiEnvelope<T> = serde_json::from_slice(&bytes)
      .map_err(|e| ApiError::Decode(format!("response body: {}", e)))?;
    Ok(envelope.data)
  }
}

/// Run `fut` unless `cancel` fires first.
async fn cancellable<T, F>(cancel: Option<&CancellationToken>, fut: F) -> Result<T, ApiError>
where
  F: Future<Output = Result<T, ApiError>>,
{
  match cancel {
    Some(token) => {
      tokio::select! {
        biased;
        _ = token.cancelled() => Err(ApiError::Cancelled),
        result = fut => result,
      }
    }
    None => fut.await,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client(base: &str) -> ApiClient {
    ApiClient::new(base, Duration::from_secs(5)).unwrap()
  }

  #[test]
  fn test_url_joins_segments() {
    let api = client("http://localhost:3000/api/");
    assert_eq!(
      api.url(&["student", "42"]).unwrap().as_str(),
      "http://localhost:3000/api/student/42"
    );

    let api = client("http://localhost:3000/api");
    assert_eq!(
      api.url(&["register_class"]).unwrap().as_str(),
      "http://localhost:3000/api/register_class"
    );
  }

  #[test]
  fn test_url_encodes_ids() {
    let api = client("http://localhost:3000/");
    assert_eq!(
      api.url(&["school", "a/b"]).unwrap().as_str(),
      "http://localhost:3000/school/a%2Fb"
    );
  }

  #[test]
  fn test_rejects_bad_base() {
    assert!(matches!(
      ApiClient::new("not a url", Duration::from_secs(1)),
      Err(ApiError::InvalidUrl(_))
    ));
    assert!(matches!(
      ApiClient::new("mailto:admin@example.com", Duration::from_secs(1)),
      Err(ApiError::InvalidUrl(_))
    ));
  }

  #[tokio::test]
  async fn test_cancelled_token_wins() {
    let token = CancellationToken::new();
    token.cancel();
    let result: Result<(), ApiError> = cancellable(Some(&token), async {
      tokio::time::sleep(Duration::from_secs(5)).await;
      Ok(())
    })
    .await;
    assert!(matches!(result, Err(ApiError::Cancelled)));
  }
}
