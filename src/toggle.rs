use crate::authority::SharedAuthority;
use crate::config::SettingDefinition;
use crate::error::{AuthorityError, SettingError};
use crate::setting::{ControlState, Setting, SettingValue, SyncState};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;

/// 원격 호출 기본 제한 시간이다.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(15);

/// 원격 권한자가 확정한 값만 커밋하는 설정 동기화기이다.
///
/// 복제본은 같은 상태를 공유한다. 상태 변화는 [`subscribe`](Self::subscribe)로 관찰한다.
#[derive(Clone)]
pub struct RemoteBackedToggle {
    inner: Arc<ToggleInner>,
}

struct ToggleInner {
    /// 설정 정의.
    definition: SettingDefinition,
    /// 원격 권한자.
    authority: SharedAuthority,
    /// 원격 호출 제한 시간.
    timeout: Duration,
    /// 관찰 가능한 설정 상태.
    state: watch::Sender<Setting>,
    /// 초기 조회 결과. 조회는 한 번만 수행한다.
    hydration: Mutex<Option<Result<(), SettingError>>>,
    /// 소유 화면 해제 신호.
    disposed: CancellationToken,
}

/// 변경 요청 접수 결과이다.
enum Admission {
    Started,
    Unchanged(Setting),
    Rejected(SettingError),
}

/// 원격 호출이 끝나기 전에 요청 future가 drop되면 busy 상태를 `Error`로 되돌린다.
struct InFlightGuard<'a> {
    toggle: &'a RemoteBackedToggle,
    armed: bool,
}

impl<'a> InFlightGuard<'a> {
    fn arm(toggle: &'a RemoteBackedToggle) -> Self {
        Self {
            toggle,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let inner = &self.toggle.inner;
        let reverted = inner.state.send_if_modified(|setting| {
            if inner.disposed.is_cancelled() || !setting.is_busy() {
                return false;
            }
            setting.fail(format!(
                "요청이 완료되기 전에 취소되었습니다: {}",
                inner.definition.key
            ));
            true
        });
        if reverted {
            tracing::warn!(key = self.toggle.key(), "진행 중 요청 취소, 이전 값 유지");
        }
    }
}

impl RemoteBackedToggle {
    /// 기본 제한 시간으로 동기화기를 생성한다.
    pub fn new(definition: SettingDefinition, authority: SharedAuthority) -> Self {
        Self::with_timeout(definition, authority, DEFAULT_REMOTE_TIMEOUT)
    }

    /// 원격 호출 제한 시간을 지정해 동기화기를 생성한다.
    pub fn with_timeout(
        definition: SettingDefinition,
        authority: SharedAuthority,
        timeout: Duration,
    ) -> Self {
        let setting = Setting::new(definition.key.clone(), definition.default.clone());
        let (state, _) = watch::channel(setting);
        Self {
            inner: Arc::new(ToggleInner {
                definition,
                authority,
                timeout,
                state,
                hydration: Mutex::new(None),
                disposed: CancellationToken::new(),
            }),
        }
    }

    /// 설정 키를 반환한다.
    pub fn key(&self) -> &str {
        &self.inner.definition.key
    }

    /// 현재 상태 복사본을 반환한다.
    pub fn snapshot(&self) -> Setting {
        self.inner.state.borrow().clone()
    }

    /// 상태 변화를 구독한다.
    pub fn subscribe(&self) -> watch::Receiver<Setting> {
        self.inner.state.subscribe()
    }

    /// 렌더링 계층이 사용할 컨트롤 상태.
    pub fn control_state(&self) -> ControlState {
        self.inner.state.borrow().control_state()
    }

    /// 해제 여부.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.is_cancelled()
    }

    /// 소유 화면이 해제되었음을 표시한다.
    ///
    /// 진행 중인 요청의 결과는 이후 상태에 반영되지 않는다.
    pub fn dispose(&self) {
        // 상태 잠금 안에서 취소해야 결과 반영과 경합하지 않는다.
        self.inner.state.send_if_modified(|_| {
            self.inner.disposed.cancel();
            false
        });
        tracing::debug!(key = self.key(), "설정 동기화기 해제");
    }

    /// 원격 권한자에서 초기 값을 조회한다.
    ///
    /// 동시에 들어온 호출은 하나의 조회로 합쳐지며, 이미 시도한 뒤에는 그 결과를 그대로 돌려준다.
    /// 실패하면 값은 기본값으로 남고 상태는 `Error`가 된다.
    pub async fn hydrate(&self) -> Result<Setting, SettingError> {
        self.ensure_live()?;
        let mut attempt = self.inner.hydration.lock().await;
        if let Some(outcome) = attempt.as_ref() {
            return outcome.clone().map(|()| self.snapshot());
        }
        self.ensure_live()?;

        let key = self.key().to_string();
        let started = self.inner.state.send_if_modified(|setting| {
            if setting.is_busy() {
                return false;
            }
            setting.begin_loading();
            true
        });
        if !started {
            return Err(SettingError::ConcurrentChange { key });
        }
        tracing::info!(key = %key, "설정 초기 조회 시작");

        let guard = InFlightGuard::arm(self);
        let resolution = self.remote(self.inner.authority.read(&key)).await;
        guard.disarm();
        let Some(result) = resolution else {
            return Err(SettingError::Disposed { key });
        };
        let result = result
            .map_err(|err| err.to_string())
            .and_then(|value| self.check_payload(value));

        let mut outcome = Err(SettingError::Disposed { key: key.clone() });
        self.inner.state.send_if_modified(|setting| {
            if self.inner.disposed.is_cancelled() {
                return false;
            }
            match result {
                Ok(value) => {
                    tracing::info!(key = %key, %value, "설정 초기 조회 완료");
                    setting.finish_loading(value);
                    outcome = Ok(setting.clone());
                }
                Err(message) => {
                    let err = SettingError::RemoteRead {
                        key: key.clone(),
                        message,
                    };
                    tracing::warn!(key = %key, error = %err, "설정 초기 조회 실패");
                    setting.fail(err.to_string());
                    outcome = Err(err);
                }
            }
            true
        });

        if !matches!(outcome, Err(SettingError::Disposed { .. })) {
            *attempt = Some(outcome.clone().map(|_| ()));
        }
        outcome
    }

    /// 새 값을 원격에 기록한 뒤 성공했을 때만 커밋한다.
    ///
    /// - 다른 요청이 진행 중이면 네트워크 호출 없이 `ConcurrentChange`로 거부한다.
    /// - 조회가 끝난 `Idle` 상태에서 같은 값을 요청하면 호출 없이 현재 상태를 돌려준다.
    /// - 실패하면 확정 값은 그대로 두고 `Error` 상태가 된다. 자동 재시도는 하지 않는다.
    pub async fn request_change(
        &self,
        requested: impl Into<SettingValue>,
    ) -> Result<Setting, SettingError> {
        let requested = requested.into();
        let key = self.key().to_string();
        self.validate(&requested)?;

        let mut admission = Admission::Rejected(SettingError::Disposed { key: key.clone() });
        self.inner.state.send_if_modified(|setting| {
            if self.inner.disposed.is_cancelled() {
                return false;
            }
            if setting.is_busy() {
                admission = Admission::Rejected(SettingError::ConcurrentChange { key: key.clone() });
                return false;
            }
            if setting.hydrated
                && setting.sync_state == SyncState::Idle
                && setting.value == requested
            {
                admission = Admission::Unchanged(setting.clone());
                return false;
            }
            setting.begin_syncing(requested.clone());
            admission = Admission::Started;
            true
        });
        match admission {
            Admission::Started => {}
            Admission::Unchanged(setting) => {
                tracing::debug!(key = %key, "같은 값 요청, 원격 호출 생략");
                return Ok(setting);
            }
            Admission::Rejected(err) => {
                tracing::debug!(key = %key, error = %err, "변경 요청 거부");
                return Err(err);
            }
        }
        tracing::info!(key = %key, value = %requested, "설정 변경 기록 시작");

        let guard = InFlightGuard::arm(self);
        let resolution = self
            .remote(self.inner.authority.write(&key, &requested))
            .await;
        guard.disarm();
        let Some(result) = resolution else {
            return Err(SettingError::Disposed { key });
        };

        let mut outcome = Err(SettingError::Disposed { key: key.clone() });
        self.inner.state.send_if_modified(|setting| {
            if self.inner.disposed.is_cancelled() {
                return false;
            }
            match result {
                Ok(()) => {
                    tracing::info!(key = %key, value = %requested, "설정 변경 확정");
                    setting.commit(requested);
                    outcome = Ok(setting.clone());
                }
                Err(err) => {
                    let err = SettingError::RemoteWrite {
                        key: key.clone(),
                        message: err.to_string(),
                    };
                    tracing::warn!(key = %key, error = %err, "설정 변경 실패, 이전 값 유지");
                    setting.fail(err.to_string());
                    outcome = Err(err);
                }
            }
            true
        });
        outcome
    }

    fn ensure_live(&self) -> Result<(), SettingError> {
        if self.is_disposed() {
            Err(SettingError::Disposed {
                key: self.key().to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// 요청 값이 정의와 맞는지 확인한다.
    fn validate(&self, requested: &SettingValue) -> Result<(), SettingError> {
        let definition = &self.inner.definition;
        if !requested.same_kind(&definition.default) {
            return Err(SettingError::TypeMismatch {
                key: definition.key.clone(),
            });
        }
        if let Some(choice) = requested.as_choice() {
            if !definition.choices.is_empty() && !definition.choices.iter().any(|c| c == choice) {
                return Err(SettingError::InvalidChoice {
                    key: definition.key.clone(),
                    value: choice.to_string(),
                });
            }
        }
        Ok(())
    }

    /// 조회 응답을 정의에 비추어 검증한다.
    fn check_payload(&self, value: SettingValue) -> Result<SettingValue, String> {
        self.validate(&value)
            .map(|()| value)
            .map_err(|err| format!("잘못된 응답 값: {err}"))
    }

    /// 제한 시간과 해제 신호를 적용해 원격 호출을 기다린다.
    ///
    /// 해제되면 `None`을 반환한다.
    async fn remote<T>(
        &self,
        call: impl Future<Output = Result<T, AuthorityError>>,
    ) -> Option<Result<T, AuthorityError>> {
        let timeout = self.inner.timeout;
        tokio::select! {
            biased;
            _ = self.inner.disposed.cancelled() => None,
            result = tokio::time::timeout(timeout, call) => {
                Some(result.unwrap_or(Err(AuthorityError::Timeout(timeout))))
            }
        }
    }
}

impl std::fmt::Debug for RemoteBackedToggle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBackedToggle")
            .field("setting", &*self.inner.state.borrow())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
