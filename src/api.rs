use std::error::Error;
use std::time::Duration;

use serde_json::Value;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// What a remote call produced. Ordinary HTTP failures are data, not
/// errors: callers branch on the outcome instead of unwinding.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome {
    Success(Value),
    HttpError { status: u16, status_text: String },
}

impl ApiOutcome {
    pub fn into_success(self) -> Option<Value> {
        match self {
            ApiOutcome::Success(value) => Some(value),
            ApiOutcome::HttpError { .. } => None,
        }
    }
}

/// Authenticated access to the bookmark server. `Err` is reserved for
/// truly exceptional conditions (request construction); transport-level
/// failures come back as `HttpError` with status 0.
pub trait RemoteApi: Send + Sync {
    fn call(&self, path: &str, method: Method, data: &Value) -> anyhow::Result<ApiOutcome>;
}

/// User-visible notifications. Error notifications are always shown;
/// whether `success` actually surfaces is decided by the caller that owns
/// the `notifySuccess` option.
pub trait NotificationSink: Send + Sync {
    fn error(&self, message: &str);
    fn success(&self, message: &str);
    fn cache_refreshed(&self, kind: &str);
}

pub struct HttpApi {
    base_url: String,
    token: String,
    client: reqwest::blocking::Client,
}

impl HttpApi {
    pub fn new(base_url: &str, token: &str, timeout_secs: Option<u64>) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
        })
    }
}

fn transport_error_text(error: &reqwest::Error) -> String {
    // reqwest wraps the interesting cause a level or two down
    match error.source() {
        Some(e) => match e.source() {
            Some(e) => e.to_string(),
            None => e.to_string(),
        },
        None => error.to_string(),
    }
}

impl RemoteApi for HttpApi {
    fn call(&self, path: &str, method: Method, data: &Value) -> anyhow::Result<ApiOutcome> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let mut request = match method {
            Method::Get => {
                let mut req = self.client.get(&url);
                if let Some(params) = data.as_object() {
                    let pairs: Vec<(String, String)> = params
                        .iter()
                        .map(|(k, v)| {
                            let value = match v {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            };
                            (k.clone(), value)
                        })
                        .collect();
                    req = req.query(&pairs);
                }
                req
            }
            Method::Post => self.client.post(&url).json(data),
            Method::Delete => self.client.delete(&url),
        };
        request = request.header("Authorization", format!("Token {}", self.token));

        log::debug!("api call: {method:?} {url}");

        let response = match request.send() {
            Ok(r) => r,
            Err(e) => {
                log::warn!("api call failed: {url}: {}", transport_error_text(&e));
                return Ok(ApiOutcome::HttpError {
                    status: 0,
                    status_text: transport_error_text(&e),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Ok(ApiOutcome::HttpError {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
            });
        }

        let body = match response.json::<Value>() {
            Ok(v) => v,
            Err(e) => {
                log::debug!("api response was not JSON: {url}: {e}");
                Value::Null
            }
        };
        Ok(ApiOutcome::Success(body))
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Canned-response API double. Records each call so tests can assert
    /// on fetch counts (cache-hit vs refetch paths).
    pub struct MockApi {
        responses: Mutex<Vec<anyhow::Result<ApiOutcome>>>,
        pub calls: Mutex<Vec<(String, Method)>>,
    }

    impl MockApi {
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn push_success(&self, value: Value) {
            self.responses
                .lock()
                .unwrap()
                .push(Ok(ApiOutcome::Success(value)));
        }

        pub fn push_http_error(&self, status: u16, status_text: &str) {
            self.responses.lock().unwrap().push(Ok(ApiOutcome::HttpError {
                status,
                status_text: status_text.to_string(),
            }));
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl RemoteApi for MockApi {
        fn call(&self, path: &str, method: Method, _data: &Value) -> anyhow::Result<ApiOutcome> {
            self.calls.lock().unwrap().push((path.to_string(), method));
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Ok(ApiOutcome::Success(Value::Array(Vec::new())));
            }
            responses.remove(0)
        }
    }

    /// Notification double counting each category.
    #[derive(Default)]
    pub struct MockNotifications {
        pub errors: Mutex<Vec<String>>,
        pub successes: Mutex<Vec<String>>,
        pub refreshes: Mutex<Vec<String>>,
    }

    impl NotificationSink for MockNotifications {
        fn error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }

        fn success(&self, message: &str) {
            self.successes.lock().unwrap().push(message.to_string());
        }

        fn cache_refreshed(&self, kind: &str) {
            self.refreshes.lock().unwrap().push(kind.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_into_success() {
        assert_eq!(
            ApiOutcome::Success(Value::Bool(true)).into_success(),
            Some(Value::Bool(true))
        );
        assert_eq!(
            ApiOutcome::HttpError {
                status: 404,
                status_text: "Not Found".into()
            }
            .into_success(),
            None
        );
    }

    #[test]
    fn http_api_normalizes_base_url() {
        let api = HttpApi::new("https://demo.example.com/", "token", None).unwrap();
        assert_eq!(api.base_url, "https://demo.example.com");
    }
}
