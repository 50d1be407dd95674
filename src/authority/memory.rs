use super::SettingAuthority;
use crate::error::AuthorityError;
use crate::setting::SettingValue;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// InMemoryAuthority는 서버 없이 메모리 맵으로 설정을 보관하는 구현이다.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuthority {
    inner: Arc<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    values: Mutex<HashMap<String, SettingValue>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryAuthority {
    /// 비어 있는 권한자를 생성한다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 초기 값을 채운 권한자를 생성한다.
    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, SettingValue)>,
        K: Into<String>,
    {
        let map = values.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            inner: Arc::new(MemoryInner {
                values: Mutex::new(map),
                ..MemoryInner::default()
            }),
        }
    }

    /// 이후 조회 호출을 실패시킬지 설정한다.
    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// 이후 기록 호출을 실패시킬지 설정한다.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// 지금까지 받은 조회 호출 수.
    pub fn read_count(&self) -> usize {
        self.inner.reads.load(Ordering::SeqCst)
    }

    /// 지금까지 받은 기록 호출 수.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// 저장된 값을 직접 확인한다.
    pub async fn stored(&self, key: &str) -> Option<SettingValue> {
        self.inner.values.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl SettingAuthority for InMemoryAuthority {
    async fn read(&self, key: &str) -> Result<SettingValue, AuthorityError> {
        self.inner.reads.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(AuthorityError::Rejected(format!("조회 실패 주입: {key}")));
        }
        self.inner
            .values
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| AuthorityError::Decode(format!("값이 없습니다: {key}")))
    }

    async fn write(&self, key: &str, value: &SettingValue) -> Result<(), AuthorityError> {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(AuthorityError::Rejected(format!("기록 실패 주입: {key}")));
        }
        tracing::debug!(key, %value, "메모리 권한자에 설정 기록");
        self.inner
            .values
            .lock()
            .await
            .insert(key.to_string(), value.clone());
        Ok(())
    }
}
