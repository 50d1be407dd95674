//! 워크플로 엔진 기능 설정을 원격 권한자와 동기화하는 라이브러리.
//!
//! 설정 값은 원격 기록이 성공한 뒤에만 커밋되며, 실패하면 이전 확정 값이 유지된다.

pub mod authority;
pub mod config;
pub mod error;
pub mod gating;
pub mod logging;
pub mod setting;
pub mod store;
pub mod toggle;

pub use authority::{HttpAuthority, InMemoryAuthority, SettingAuthority, SharedAuthority, build_authority};
pub use config::{
    AuthorityConfig, AuthorityKind, SettingDefinition, SettingsConfig, load_config_from_file,
    load_config_from_reader,
};
pub use error::{AuthorityError, SettingError};
pub use gating::{
    Capability, FLOW_FEATURE_KEY, INPUT_MODE_KEY, PanelLayout, ToolDescriptor, ToolKind,
    designer_sidebar, hidden_surfaces, panel_layout, visible_items,
};
pub use setting::{ControlState, Setting, SettingValue, SyncState};
pub use store::{MountedSetting, SettingsSnapshot, SettingsStore};
pub use toggle::{DEFAULT_REMOTE_TIMEOUT, RemoteBackedToggle};
