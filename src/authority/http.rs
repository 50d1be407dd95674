use super::SettingAuthority;
use crate::error::AuthorityError;
use crate::setting::SettingValue;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 설정 조회/기록 요청 본문 형식이다.
#[derive(Debug, Serialize, Deserialize)]
struct ValueEnvelope {
    value: SettingValue,
}

/// HttpAuthority는 REST 엔드포인트를 통해 설정을 읽고 쓰는 실제 구현체이다.
///
/// - `GET {base_url}/settings/{key}` → `{ "value": ... }`
/// - `PUT {base_url}/settings/{key}` ← `{ "value": ... }`
#[derive(Debug, Clone)]
pub struct HttpAuthority {
    /// 공유 HTTP 클라이언트.
    client: Client,
    /// 설정 API 기본 주소.
    base_url: Url,
    /// 요청 제한 시간.
    timeout: Duration,
}

impl HttpAuthority {
    /// 기본 주소와 요청 제한 시간으로 클라이언트를 초기화한다.
    ///
    /// # 매개변수
    /// - `base_url`: 설정 API의 기본 주소.
    /// - `timeout`: 요청별 제한 시간.
    ///
    /// # 반환값
    /// 주소가 잘못되었거나 클라이언트를 만들 수 없으면 오류를 반환한다.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("기본 주소로 사용할 수 없는 URL입니다: {base_url}");
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// 설정 키에 해당하는 엔드포인트 주소를 만든다.
    fn setting_url(&self, key: &str) -> Result<Url, AuthorityError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AuthorityError::Rejected(format!("잘못된 기본 주소: {}", self.base_url)))?
            .pop_if_empty()
            .push("settings")
            .push(key);
        Ok(url)
    }

    fn map_send_error(&self, err: reqwest::Error) -> AuthorityError {
        if err.is_timeout() {
            AuthorityError::Timeout(self.timeout)
        } else {
            AuthorityError::Network(err)
        }
    }
}

#[async_trait]
impl SettingAuthority for HttpAuthority {
    async fn read(&self, key: &str) -> Result<SettingValue, AuthorityError> {
        let url = self.setting_url(key)?;
        tracing::debug!(key, %url, "설정 조회 요청");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| self.map_send_error(err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthorityError::Status(status.as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|err| self.map_send_error(err))?;
        let envelope: ValueEnvelope =
            serde_json::from_str(&body).map_err(|err| AuthorityError::Decode(err.to_string()))?;
        Ok(envelope.value)
    }

    async fn write(&self, key: &str, value: &SettingValue) -> Result<(), AuthorityError> {
        let url = self.setting_url(key)?;
        tracing::debug!(key, %url, %value, "설정 기록 요청");
        let response = self
            .client
            .put(url)
            .json(&ValueEnvelope {
                value: value.clone(),
            })
            .send()
            .await
            .map_err(|err| self.map_send_error(err))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AuthorityError::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn authority_for(server: &MockServer) -> HttpAuthority {
        HttpAuthority::new(&server.url("/api/engines"), Duration::from_secs(5))
            .expect("HTTP 권한자 생성 실패")
    }

    #[tokio::test]
    async fn read_parses_value_envelope() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/engines/settings/flow-feature-enabled");
                then.status(200).json_body(json!({ "value": true }));
            })
            .await;

        let value = authority_for(&server)
            .read("flow-feature-enabled")
            .await
            .expect("조회 실패");
        assert_eq!(value, SettingValue::Bool(true));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn read_rejects_invalid_payload() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/engines/settings/flow-feature-enabled");
                then.status(200).body("not json");
            })
            .await;

        let err = authority_for(&server)
            .read("flow-feature-enabled")
            .await
            .expect_err("잘못된 본문은 실패해야 한다");
        assert!(matches!(err, AuthorityError::Decode(_)));
    }

    #[tokio::test]
    async fn read_maps_server_error_status() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/engines/settings/flow-feature-enabled");
                then.status(500).json_body(json!({ "value": true }));
            })
            .await;

        let err = authority_for(&server)
            .read("flow-feature-enabled")
            .await
            .expect_err("500은 실패해야 한다");
        assert!(matches!(err, AuthorityError::Status(500)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn write_sends_value_and_maps_non_success_status() {
        let server = MockServer::start_async().await;
        let ok = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/api/engines/settings/input-mode")
                    .json_body(json!({ "value": "chat" }));
                then.status(204);
            })
            .await;
        let denied = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/api/engines/settings/flow-feature-enabled");
                then.status(503);
            })
            .await;

        let authority = authority_for(&server);
        authority
            .write("input-mode", &SettingValue::from("chat"))
            .await
            .expect("기록 실패");
        let err = authority
            .write("flow-feature-enabled", &SettingValue::Bool(true))
            .await
            .expect_err("503은 실패해야 한다");
        assert!(matches!(err, AuthorityError::Status(503)));
        ok.assert_async().await;
        denied.assert_async().await;
    }
}
