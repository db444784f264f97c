//! CLI Commands

pub mod audit;
pub mod auth;
pub mod config;
pub mod context;
pub mod notes;
pub mod settings;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// API client
pub struct ApiClient {
    pub base_url: String,
    pub token: Option<String>,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            client: reqwest::Client::new(),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, String> {
        self.send::<T, ()>(Method::GET, path, None).await
    }

    /// GET with URL-encoded query parameters
    pub async fn get_query<T: DeserializeOwned, Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> Result<T, String> {
        self.execute(self.request(Method::GET, path).query(query)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, String> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, String> {
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, String> {
        self.send::<T, ()>(Method::DELETE, path, None).await
    }

    async fn send<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, String> {
        let mut req = self.request(method, path);
        if let Some(body) = body {
            req = req.json(body);
        }
        self.execute(req).await
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let req = self.client.request(method, &url);
        match &self.token {
            Some(token) => req.header("Authorization", format!("Bearer {}", token)),
            None => req,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T, String> {
        let resp = req.send().await.map_err(|e| e.to_string())?;
        let status = resp.status();
        let json: serde_json::Value = resp.json().await.map_err(|e| format!("{} ({})", e, status))?;
        unwrap_envelope(json)
    }
}

/// Extract `data` from an API envelope, or the server's error message
fn unwrap_envelope<T: DeserializeOwned>(json: serde_json::Value) -> Result<T, String> {
    if json.get("success").and_then(|s| s.as_bool()) == Some(false) {
        let error = &json["error"];
        let message = error["message"].as_str().unwrap_or("request failed");
        return Err(match error["redirect"].as_str() {
            Some(redirect) => format!("{} (redirect: {})", message, redirect),
            None => message.to_string(),
        });
    }

    match json.get("data") {
        Some(data) => serde_json::from_value(data.clone()).map_err(|e| e.to_string()),
        None => Err("No data in response".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_success() {
        let removed: serde_json::Value =
            unwrap_envelope(json!({"success": true, "data": {"removed": 3}, "error": null})).unwrap();
        assert_eq!(removed["removed"], 3);
    }

    #[test]
    fn test_unwrap_error_with_redirect() {
        let err = unwrap_envelope::<serde_json::Value>(json!({
            "success": false,
            "data": null,
            "error": {"code": "INVALID_TENANT", "message": "invalid tenant SID-9", "redirect": "/unauthorized"}
        }))
        .unwrap_err();
        assert_eq!(err, "invalid tenant SID-9 (redirect: /unauthorized)");
    }

    #[test]
    fn test_unwrap_unit_data() {
        let unit: Result<(), String> = unwrap_envelope(json!({"success": true, "data": null, "error": null}));
        assert!(unit.is_ok());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:8080/", None);
        assert_eq!(client.base_url, "http://localhost:8080");
    }
}
