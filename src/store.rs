use crate::authority::{SharedAuthority, build_authority};
use crate::config::{SettingDefinition, SettingsConfig};
use crate::error::SettingError;
use crate::setting::{Setting, SettingValue};
use crate::toggle::{DEFAULT_REMOTE_TIMEOUT, RemoteBackedToggle};
use futures::future::join_all;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// 여러 화면이 같은 설정 인스턴스를 공유하도록 하는 상태 컨테이너이다.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    /// 키별 설정 정의.
    definitions: HashMap<String, SettingDefinition>,
    /// 공용 원격 권한자.
    authority: SharedAuthority,
    /// 원격 호출 제한 시간.
    timeout: Duration,
    /// 현재 마운트된 설정과 마운트 수.
    mounted: Mutex<HashMap<String, MountEntry>>,
}

struct MountEntry {
    toggle: RemoteBackedToggle,
    mounts: usize,
}

impl StoreInner {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, MountEntry>> {
        self.mounted.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SettingsStore {
    /// 설정 정의 목록과 권한자로 저장소를 만든다.
    pub fn new<I>(definitions: I, authority: SharedAuthority) -> Self
    where
        I: IntoIterator<Item = SettingDefinition>,
    {
        Self::with_timeout(definitions, authority, DEFAULT_REMOTE_TIMEOUT)
    }

    /// 원격 호출 제한 시간을 지정해 저장소를 만든다.
    pub fn with_timeout<I>(definitions: I, authority: SharedAuthority, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = SettingDefinition>,
    {
        let definitions = definitions
            .into_iter()
            .map(|def| (def.key.clone(), def))
            .collect();
        Self {
            inner: Arc::new(StoreInner {
                definitions,
                authority,
                timeout,
                mounted: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// 구성 파일 내용을 기반으로 권한자와 저장소를 함께 구성한다.
    pub fn from_config(config: &SettingsConfig) -> anyhow::Result<Self> {
        let authority = build_authority(&config.authority)?;
        Ok(Self::with_timeout(
            config.settings.iter().cloned(),
            authority,
            config.authority.timeout(),
        ))
    }

    /// 화면이 설정을 사용하기 시작할 때 호출한다.
    ///
    /// 같은 키를 이미 다른 화면이 마운트했다면 그 인스턴스를 공유한다.
    /// 마지막 핸들이 drop되면 인스턴스는 해제되고 저장소에서 제거된다.
    pub fn mount(&self, key: &str) -> Result<MountedSetting, SettingError> {
        let definition = self
            .inner
            .definitions
            .get(key)
            .ok_or_else(|| SettingError::UnknownSetting(key.to_string()))?;
        let mut entries = self.inner.entries();
        let entry = entries.entry(key.to_string()).or_insert_with(|| {
            tracing::debug!(key, "설정 인스턴스 생성");
            MountEntry {
                toggle: RemoteBackedToggle::with_timeout(
                    definition.clone(),
                    self.inner.authority.clone(),
                    self.inner.timeout,
                ),
                mounts: 0,
            }
        });
        entry.mounts += 1;
        Ok(MountedSetting {
            toggle: entry.toggle.clone(),
            store: self.inner.clone(),
        })
    }

    /// 키에 대한 현재 마운트 수.
    pub fn mount_count(&self, key: &str) -> usize {
        self.inner.entries().get(key).map_or(0, |entry| entry.mounts)
    }

    /// 마운트된 모든 설정의 스냅샷.
    pub fn snapshot(&self) -> SettingsSnapshot {
        let settings = self
            .inner
            .entries()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.toggle.snapshot()))
            .collect();
        SettingsSnapshot { settings }
    }

    /// 마운트된 모든 설정을 동시에 조회한다.
    pub async fn hydrate_all(&self) -> Vec<(String, Result<Setting, SettingError>)> {
        let toggles: Vec<RemoteBackedToggle> = self
            .inner
            .entries()
            .values()
            .map(|entry| entry.toggle.clone())
            .collect();
        let results = join_all(toggles.iter().map(|toggle| toggle.hydrate())).await;
        toggles
            .iter()
            .map(|toggle| toggle.key().to_string())
            .zip(results)
            .collect()
    }
}

/// 저장소에 마운트된 설정 핸들이다. drop 시 마운트 수를 줄인다.
pub struct MountedSetting {
    toggle: RemoteBackedToggle,
    store: Arc<StoreInner>,
}

impl Deref for MountedSetting {
    type Target = RemoteBackedToggle;

    fn deref(&self) -> &Self::Target {
        &self.toggle
    }
}

impl Drop for MountedSetting {
    fn drop(&mut self) {
        let mut entries = self.store.entries();
        let key = self.toggle.key();
        let last = match entries.get_mut(key) {
            Some(entry) => {
                entry.mounts = entry.mounts.saturating_sub(1);
                entry.mounts == 0
            }
            None => false,
        };
        if last {
            entries.remove(key);
            self.toggle.dispose();
        }
    }
}

/// 렌더링 시점에 사용하는 확정 설정 값 모음이다.
#[derive(Debug, Clone, Default)]
pub struct SettingsSnapshot {
    settings: HashMap<String, Setting>,
}

impl SettingsSnapshot {
    /// 설정 목록으로 스냅샷을 만든다.
    pub fn from_settings<I>(settings: I) -> Self
    where
        I: IntoIterator<Item = Setting>,
    {
        Self {
            settings: settings
                .into_iter()
                .map(|setting| (setting.key.clone(), setting))
                .collect(),
        }
    }

    /// 키로 설정을 찾는다.
    pub fn get(&self, key: &str) -> Option<&Setting> {
        self.settings.get(key)
    }

    /// 확정된 불리언 값. 없거나 불리언이 아니면 `false`이다.
    pub fn is_enabled(&self, key: &str) -> bool {
        self.get(key)
            .and_then(|setting| setting.value.as_bool())
            .unwrap_or(false)
    }

    /// 확정된 선택지 값.
    pub fn choice(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|setting| match &setting.value {
            SettingValue::Choice(value) => Some(value.as_str()),
            SettingValue::Bool(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::InMemoryAuthority;
    use crate::config::{AuthorityConfig, AuthorityKind};
    use crate::gating::INPUT_MODE_KEY;
    use crate::setting::SyncState;

    const FLOW_KEY: &str = "flow-feature-enabled";

    fn store_with(authority: &InMemoryAuthority) -> SettingsStore {
        SettingsStore::new(
            [
                SettingDefinition::flag(FLOW_KEY, false),
                SettingDefinition::choice(INPUT_MODE_KEY, "dialog", ["dialog", "chat"]),
            ],
            Arc::new(authority.clone()),
        )
    }

    #[tokio::test]
    async fn surfaces_share_one_instance_per_key() {
        let authority = InMemoryAuthority::with_values([(FLOW_KEY, SettingValue::Bool(false))]);
        let store = store_with(&authority);

        let settings_panel = store.mount(FLOW_KEY).expect("마운트 실패");
        let sidebar = store.mount(FLOW_KEY).expect("마운트 실패");
        assert_eq!(store.mount_count(FLOW_KEY), 2);

        settings_panel.hydrate().await.expect("조회 실패");
        sidebar.hydrate().await.expect("조회 실패");
        assert_eq!(authority.read_count(), 1);

        settings_panel.request_change(true).await.expect("기록 실패");
        assert_eq!(sidebar.snapshot().value, SettingValue::Bool(true));
        assert!(store.snapshot().is_enabled(FLOW_KEY));
    }

    #[tokio::test]
    async fn last_unmount_disposes_and_next_mount_rehydrates() {
        let authority = InMemoryAuthority::with_values([(FLOW_KEY, SettingValue::Bool(true))]);
        let store = store_with(&authority);

        let first = store.mount(FLOW_KEY).expect("마운트 실패");
        first.hydrate().await.expect("조회 실패");
        let detached = (*first).clone();
        drop(first);
        assert!(detached.is_disposed());
        assert_eq!(store.mount_count(FLOW_KEY), 0);
        assert!(store.snapshot().get(FLOW_KEY).is_none());

        let again = store.mount(FLOW_KEY).expect("마운트 실패");
        assert_eq!(again.snapshot().sync_state, SyncState::Idle);
        assert!(!again.snapshot().hydrated);
        again.hydrate().await.expect("조회 실패");
        assert_eq!(authority.read_count(), 2);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let store = store_with(&InMemoryAuthority::new());
        assert!(matches!(
            store.mount("missing"),
            Err(SettingError::UnknownSetting(_))
        ));
    }

    #[tokio::test]
    async fn hydrate_all_reports_each_key() {
        let authority = InMemoryAuthority::with_values([
            (FLOW_KEY, SettingValue::Bool(true)),
            (INPUT_MODE_KEY, SettingValue::from("chat")),
        ]);
        let store = store_with(&authority);
        let _flow = store.mount(FLOW_KEY).expect("마운트 실패");
        let _mode = store.mount(INPUT_MODE_KEY).expect("마운트 실패");

        let results = store.hydrate_all().await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, result)| result.is_ok()));
        let snapshot = store.snapshot();
        assert!(snapshot.is_enabled(FLOW_KEY));
        assert_eq!(snapshot.choice(INPUT_MODE_KEY), Some("chat"));
    }

    #[tokio::test]
    async fn from_config_builds_memory_backed_store() {
        let config = SettingsConfig {
            authority: AuthorityConfig {
                kind: AuthorityKind::Memory,
                base_url: None,
                timeout_sec: 5,
            },
            settings: vec![SettingDefinition::flag(FLOW_KEY, false)],
        };
        let store = SettingsStore::from_config(&config).expect("저장소 구성 실패");
        let flow = store.mount(FLOW_KEY).expect("마운트 실패");
        let setting = flow.request_change(true).await.expect("기록 실패");
        assert_eq!(setting.value, SettingValue::Bool(true));
    }
}
