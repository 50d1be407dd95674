use serde::{Deserialize, Serialize};
use std::fmt;

/// 원격 권한자와 주고받는 설정 값이다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// 켜짐/꺼짐 플래그.
    Bool(bool),
    /// 소수의 선택지 중 하나.
    Choice(String),
}

impl SettingValue {
    /// 불리언 값이면 그 값을 반환한다.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(value) => Some(*value),
            SettingValue::Choice(_) => None,
        }
    }

    /// 선택지 값이면 문자열 슬라이스를 반환한다.
    pub fn as_choice(&self) -> Option<&str> {
        match self {
            SettingValue::Bool(_) => None,
            SettingValue::Choice(value) => Some(value.as_str()),
        }
    }

    /// 두 값이 같은 종류인지 확인한다.
    pub fn same_kind(&self, other: &SettingValue) -> bool {
        matches!(
            (self, other),
            (SettingValue::Bool(_), SettingValue::Bool(_))
                | (SettingValue::Choice(_), SettingValue::Choice(_))
        )
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Choice(value.to_string())
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(value) => write!(f, "{value}"),
            SettingValue::Choice(value) => f.write_str(value),
        }
    }
}

/// 설정의 동기화 상태를 표현한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// 대기 상태.
    Idle,
    /// 초기 조회 중.
    Loading,
    /// 변경 요청을 원격에 기록하는 중.
    Syncing,
    /// 마지막 원격 호출이 실패했다.
    Error,
}

/// 원격 권한자가 확정한 값을 기준으로 하는 설정 스냅샷이다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    /// 설정 식별자.
    pub key: String,
    /// 마지막으로 확정된 값. 조회 전에는 호출자가 준 기본값이다.
    pub value: SettingValue,
    /// 조회나 기록 성공으로 원격 권한자가 값을 확정했는지 여부.
    pub hydrated: bool,
    /// `Syncing` 동안 요청된 잠정 값.
    pub pending: Option<SettingValue>,
    /// 현재 동기화 상태.
    pub sync_state: SyncState,
    /// `Error` 상태일 때만 존재하는 오류 메시지.
    pub last_error: Option<String>,
}

impl Setting {
    /// 기본값으로 아직 조회되지 않은 설정을 생성한다.
    pub fn new(key: impl Into<String>, default: SettingValue) -> Self {
        Self {
            key: key.into(),
            value: default,
            hydrated: false,
            pending: None,
            sync_state: SyncState::Idle,
            last_error: None,
        }
    }

    /// 화면에 표시할 값을 반환한다.
    ///
    /// `Syncing` 중에는 잠정 값을, 그 외에는 확정 값을 돌려준다.
    pub fn display_value(&self) -> &SettingValue {
        match (&self.sync_state, &self.pending) {
            (SyncState::Syncing, Some(pending)) => pending,
            _ => &self.value,
        }
    }

    /// 원격 호출이 진행 중인지 확인한다.
    pub fn is_busy(&self) -> bool {
        matches!(self.sync_state, SyncState::Loading | SyncState::Syncing)
    }

    /// 렌더링 계층이 사용할 컨트롤 상태를 계산한다.
    pub fn control_state(&self) -> ControlState {
        ControlState {
            value: self.display_value().clone(),
            disabled: self.is_busy(),
            busy: self.is_busy(),
            error: self.last_error.clone(),
        }
    }

    pub(crate) fn begin_loading(&mut self) {
        self.sync_state = SyncState::Loading;
        self.last_error = None;
    }

    pub(crate) fn finish_loading(&mut self, value: SettingValue) {
        self.value = value;
        self.hydrated = true;
        self.sync_state = SyncState::Idle;
        self.last_error = None;
    }

    pub(crate) fn begin_syncing(&mut self, requested: SettingValue) {
        self.pending = Some(requested);
        self.sync_state = SyncState::Syncing;
    }

    /// 기록 성공도 원격 확정이므로 `hydrated`를 함께 세운다.
    pub(crate) fn commit(&mut self, value: SettingValue) {
        self.value = value;
        self.hydrated = true;
        self.pending = None;
        self.sync_state = SyncState::Idle;
        self.last_error = None;
    }

    /// 실패를 기록한다. 확정 값은 건드리지 않는다.
    pub(crate) fn fail(&mut self, message: String) {
        self.pending = None;
        self.sync_state = SyncState::Error;
        self.last_error = Some(message);
    }
}

/// 스위치나 라디오 그룹이 그대로 그릴 수 있는 파생 상태이다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    /// 컨트롤에 표시할 값.
    pub value: SettingValue,
    /// 입력 비활성화 여부.
    pub disabled: bool,
    /// 진행 표시기 노출 여부.
    pub busy: bool,
    /// 인라인으로 보여줄 오류 메시지.
    pub error: Option<String>,
}

impl ControlState {
    /// 불리언 컨트롤의 체크 여부. 선택지 설정이면 `false`이다.
    pub fn checked(&self) -> bool {
        self.value.as_bool().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_value_prefers_pending_only_while_syncing() {
        let mut setting = Setting::new("flow-feature-enabled", false.into());
        setting.finish_loading(false.into());
        setting.begin_syncing(true.into());
        assert_eq!(setting.display_value(), &SettingValue::Bool(true));
        assert_eq!(setting.value, SettingValue::Bool(false));

        setting.fail("저장 실패".into());
        assert_eq!(setting.display_value(), &SettingValue::Bool(false));
        assert!(setting.pending.is_none());
    }

    #[test]
    fn control_state_is_disabled_while_busy() {
        let mut setting = Setting::new("flow-feature-enabled", false.into());
        setting.begin_loading();
        let control = setting.control_state();
        assert!(control.disabled);
        assert!(control.busy);
        assert!(!control.checked());
    }

    #[test]
    fn setting_value_uses_plain_json_shape() {
        let parsed: SettingValue = serde_json::from_str("true").expect("bool 파싱 실패");
        assert_eq!(parsed, SettingValue::Bool(true));
        let parsed: SettingValue = serde_json::from_str("\"chat\"").expect("문자열 파싱 실패");
        assert_eq!(parsed.as_choice(), Some("chat"));
        assert!(!parsed.same_kind(&SettingValue::Bool(false)));
    }
}
