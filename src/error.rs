use std::time::Duration;

/// 설정 동기화 중 호출자에게 전달되는 오류이다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingError {
    /// 초기 조회에 실패했다.
    #[error("서버에서 설정을 불러오지 못했습니다 ({key}): {message}")]
    RemoteRead { key: String, message: String },
    /// 변경 사항 저장에 실패했다.
    #[error("서버에 설정을 저장하지 못했습니다 ({key}): {message}")]
    RemoteWrite { key: String, message: String },
    /// 이미 진행 중인 원격 요청이 있다.
    #[error("이전 요청이 끝나지 않았습니다: {key}")]
    ConcurrentChange { key: String },
    /// 설정을 소유한 화면이 해제되었다.
    #[error("해제된 설정입니다: {key}")]
    Disposed { key: String },
    /// 정의되지 않은 설정 키이다.
    #[error("정의되지 않은 설정입니다: {0}")]
    UnknownSetting(String),
    /// 값의 종류가 기본값과 다르다.
    #[error("설정 값의 종류가 맞지 않습니다: {key}")]
    TypeMismatch { key: String },
    /// 허용되지 않은 선택지이다.
    #[error("허용되지 않은 선택지입니다 ({key}): {value}")]
    InvalidChoice { key: String, value: String },
}

/// 원격 권한자 호출 실패를 표현한다.
#[derive(Debug, thiserror::Error)]
pub enum AuthorityError {
    /// 네트워크 오류.
    #[error("네트워크 오류: {0}")]
    Network(#[from] reqwest::Error),
    /// 2xx가 아닌 응답.
    #[error("HTTP 상태 코드 {0}")]
    Status(u16),
    /// 응답 본문 해석 실패.
    #[error("응답 해석 실패: {0}")]
    Decode(String),
    /// 제한 시간 초과.
    #[error("시간 초과 ({0:?})")]
    Timeout(Duration),
    /// 권한자가 요청을 거부했다.
    #[error("요청 거부: {0}")]
    Rejected(String),
}
