use tracing_subscriber::EnvFilter;

/// `RUST_LOG`이 없을 때 사용할 기본 필터이다.
const DEFAULT_FILTER: &str = "info";

/// fmt 기반 tracing 구독자를 설치한다.
///
/// 이미 전역 구독자가 있으면 아무 것도 하지 않고 `false`를 반환한다.
pub fn init_tracing() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
