use crate::setting::SettingValue;
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// 지원하는 권한자 종류를 표현한다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityKind {
    /// 메모리 기반 권한자.
    Memory,
    /// REST 엔드포인트.
    Http,
}

/// 원격 권한자 연결 정의이다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityConfig {
    /// 권한자 종류이다.
    pub kind: AuthorityKind,
    /// 설정 API 기본 주소이다. `${VAR}` 치환을 지원한다.
    pub base_url: Option<String>,
    /// 요청 제한 시간(초 단위).
    #[serde(default = "default_timeout")]
    pub timeout_sec: u64,
}

impl AuthorityConfig {
    /// 원격 호출 제한 시간. 0초는 1초로 올린다.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec.max(1))
    }
}

/// 하나의 원격 설정 정의이다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingDefinition {
    /// 설정 식별자.
    pub key: String,
    /// 조회 전 또는 조회 실패 시 사용할 기본값.
    pub default: SettingValue,
    /// 선택지 설정에서 허용되는 값 목록. 비어 있으면 제한하지 않는다.
    #[serde(default)]
    pub choices: Vec<String>,
}

impl SettingDefinition {
    /// 불리언 설정 정의를 만든다.
    pub fn flag(key: impl Into<String>, default: bool) -> Self {
        Self {
            key: key.into(),
            default: SettingValue::Bool(default),
            choices: Vec::new(),
        }
    }

    /// 선택지 설정 정의를 만든다.
    pub fn choice<I, S>(key: impl Into<String>, default: &str, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            default: SettingValue::from(default),
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }
}

/// 설정 동기화 계층 전체 구성이다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// 권한자 연결 정의.
    pub authority: AuthorityConfig,
    /// 관리할 설정 목록.
    #[serde(default)]
    pub settings: Vec<SettingDefinition>,
}

impl SettingsConfig {
    fn expand(mut self) -> anyhow::Result<Self> {
        if let Some(raw) = self.authority.base_url.take() {
            let expanded = expand_placeholders(&raw)
                .context("base_url 필드의 플레이스홀더를 치환할 수 없습니다.")?;
            self.authority.base_url = Some(expanded);
        }
        Ok(self)
    }
}

fn default_timeout() -> u64 {
    15
}

/// YAML 파일을 읽어 SettingsConfig로 역직렬화한다.
pub fn load_config_from_file(path: &Path) -> anyhow::Result<SettingsConfig> {
    let mut file = File::open(path)
        .with_context(|| format!("설정 파일 열기 실패: {}", path.display()))?;
    load_config_from_reader(&mut file)
}

/// Reader에서 YAML을 읽어 SettingsConfig로 파싱한다.
pub fn load_config_from_reader<R: Read>(reader: &mut R) -> anyhow::Result<SettingsConfig> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    let config: SettingsConfig = serde_yaml::from_str(&buf)?;
    config.expand()
}

/// `${VAR}` 패턴을 환경 변수 값으로 치환한다.
///
/// # 반환값
/// 치환되지 않은 플레이스홀더가 남으면 오류를 반환한다.
pub fn expand_placeholders(template: &str) -> anyhow::Result<String> {
    static PLACEHOLDER: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\$\{([A-Z0-9_]+)\}").expect("정규식 컴파일 실패"));
    let result = PLACEHOLDER.replace_all(template, |caps: &regex::Captures| {
        let key = &caps[1];
        std::env::var(key).unwrap_or_else(|_| format!("${{{key}}}"))
    });
    let result = result.to_string();
    if PLACEHOLDER.is_match(&result) {
        anyhow::bail!("플레이스홀더 치환 실패: {result}");
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
authority:
  kind: http
  base_url: "${ENGINE_SETTINGS_TEST_URL}/api/v1/engines"
settings:
  - key: flow-feature-enabled
    default: false
  - key: input-mode
    default: dialog
    choices: [dialog, chat]
"#;

    #[test]
    fn loads_yaml_and_expands_base_url() {
        // SAFETY: 이 테스트 전용 변수이며 다른 테스트가 읽지 않는다.
        unsafe { std::env::set_var("ENGINE_SETTINGS_TEST_URL", "http://localhost:8000") };
        let config = load_config_from_reader(&mut SAMPLE.as_bytes()).expect("구성 파싱 실패");
        assert_eq!(config.authority.kind, AuthorityKind::Http);
        assert_eq!(config.authority.timeout_sec, 15);
        assert_eq!(
            config.authority.base_url.as_deref(),
            Some("http://localhost:8000/api/v1/engines")
        );
        let [flow, mode] = config.settings.as_slice() else {
            panic!("설정 정의는 두 개여야 한다: {:?}", config.settings);
        };
        assert_eq!(flow.key, "flow-feature-enabled");
        assert_eq!(flow.default, SettingValue::Bool(false));
        assert_eq!(mode.key, "input-mode");
        assert_eq!(mode.default, SettingValue::from("dialog"));
        assert_eq!(mode.choices, vec!["dialog".to_string(), "chat".to_string()]);
    }

    #[test]
    fn zero_timeout_is_raised_to_one_second() {
        let yaml = "authority:\n  kind: memory\n  timeout_sec: 0\n";
        let config = load_config_from_reader(&mut yaml.as_bytes()).expect("구성 파싱 실패");
        assert_eq!(config.authority.timeout(), Duration::from_secs(1));
        assert!(config.settings.is_empty());
    }

    #[test]
    fn unresolved_placeholder_is_an_error() {
        let err = expand_placeholders("${ENGINE_SETTINGS_SURELY_UNSET_VAR}/x")
            .expect_err("치환 실패가 보고되어야 한다");
        assert!(err.to_string().contains("플레이스홀더"));
    }
}
