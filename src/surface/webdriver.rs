//! Minimal W3C WebDriver client for a local chromedriver.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::{SessionSurface, SurfaceError};

/// Key under which WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecc";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct WebDriverSurface {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl WebDriverSurface {
    /// Start a Chrome session with microphone and camera permissions granted.
    pub async fn connect(base_url: &str, browser_args: &[String]) -> Result<Self, SurfaceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let value = send(
            client
                .post(format!("{}/session", base_url))
                .json(&capabilities(browser_args)),
        )
        .await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| SurfaceError::Protocol("new session response has no sessionId".into()))?
            .to_string();

        info!("Browser session {} started via {}", session_id, base_url);

        Ok(Self {
            client,
            base_url,
            session_id,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/session/{}/{}", self.base_url, self.session_id, path)
    }

    async fn find_element(&self, xpath: &str) -> Result<String, SurfaceError> {
        let value = send(
            self.client
                .post(self.endpoint("element"))
                .json(&json!({ "using": "xpath", "value": xpath })),
        )
        .await?;
        element_id(&value)
    }
}

#[async_trait]
impl SessionSurface for WebDriverSurface {
    async fn navigate(&self, url: &str) -> Result<(), SurfaceError> {
        debug!("Navigating to {}", url);
        send(self.client.post(self.endpoint("url")).json(&json!({ "url": url }))).await?;
        Ok(())
    }

    async fn locate(&self, xpath: &str) -> Result<bool, SurfaceError> {
        match self.find_element(xpath).await {
            Ok(_) => Ok(true),
            Err(SurfaceError::NoSuchElement(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn click(&self, xpath: &str) -> Result<(), SurfaceError> {
        let id = self.find_element(xpath).await?;
        send(
            self.client
                .post(self.endpoint(&format!("element/{id}/click")))
                .json(&json!({})),
        )
        .await?;
        Ok(())
    }

    async fn send_keys(&self, xpath: &str, text: &str) -> Result<(), SurfaceError> {
        let id = self.find_element(xpath).await?;
        send(
            self.client
                .post(self.endpoint(&format!("element/{id}/value")))
                .json(&json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn release(&self) -> Result<(), SurfaceError> {
        send(
            self.client
                .delete(format!("{}/session/{}", self.base_url, self.session_id)),
        )
        .await?;
        info!("Browser session {} closed", self.session_id);
        Ok(())
    }
}

fn capabilities(browser_args: &[String]) -> Value {
    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": {
                    "args": browser_args,
                    "prefs": {
                        "profile.default_content_setting_values.media_stream_mic": 1,
                        "profile.default_content_setting_values.media_stream_camera": 1,
                        "profile.default_content_setting_values.geolocation": 0,
                        "profile.default_content_setting_values.notifications": 1
                    }
                }
            }
        }
    })
}

async fn send(request: reqwest::RequestBuilder) -> Result<Value, SurfaceError> {
    let response = request.send().await?;
    let status = response.status();
    let body: Value = response.json().await?;
    unwrap_value(status, body)
}

/// Split a WebDriver response body into its `value` or a typed error.
fn unwrap_value(status: StatusCode, body: Value) -> Result<Value, SurfaceError> {
    let value = match body {
        Value::Object(mut map) => map.remove("value").unwrap_or(Value::Null),
        other => return Err(SurfaceError::Protocol(format!("response is not an object: {other}"))),
    };

    if status.is_success() {
        return Ok(value);
    }

    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let error = field("error");
    let message = field("message");

    if error == "no such element" {
        return Err(SurfaceError::NoSuchElement(message));
    }

    Err(SurfaceError::Driver {
        status: status.as_u16(),
        error,
        message,
    })
}

fn element_id(value: &Value) -> Result<String, SurfaceError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SurfaceError::Protocol(format!("not an element reference: {value}")))
}
