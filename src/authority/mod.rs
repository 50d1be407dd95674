mod http;
mod memory;

pub use http::HttpAuthority;
pub use memory::InMemoryAuthority;

use crate::config::{AuthorityConfig, AuthorityKind};
use crate::error::AuthorityError;
use crate::setting::SettingValue;
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;

/// 설정 값의 단일 진실 공급원을 추상화한다.
#[async_trait]
pub trait SettingAuthority: Send + Sync {
    /// 설정 값을 조회한다.
    async fn read(&self, key: &str) -> Result<SettingValue, AuthorityError>;

    /// 설정 값을 기록한다. 성공 응답은 본문을 갖지 않는다.
    async fn write(&self, key: &str, value: &SettingValue) -> Result<(), AuthorityError>;
}

/// SettingAuthority를 공유하기 위한 Arc 타입 별칭이다.
pub type SharedAuthority = Arc<dyn SettingAuthority>;

/// 구성 블록을 기반으로 권한자 구현을 생성한다.
pub fn build_authority(config: &AuthorityConfig) -> anyhow::Result<SharedAuthority> {
    match config.kind {
        AuthorityKind::Memory => Ok(Arc::new(InMemoryAuthority::new()) as SharedAuthority),
        AuthorityKind::Http => {
            let base_url = config
                .base_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("http 권한자에는 base_url 값이 필요합니다."))?;
            let authority = HttpAuthority::new(base_url, config.timeout())
                .with_context(|| format!("HTTP 권한자 생성 실패: {base_url}"))?;
            Ok(Arc::new(authority) as SharedAuthority)
        }
    }
}
