//! 확정된 설정 값으로 노출 여부가 결정되는 UI 구성 요소 목록.

use crate::store::SettingsSnapshot;

/// Flow 기능 전체를 켜고 끄는 설정 키이다.
pub const FLOW_FEATURE_KEY: &str = "flow-feature-enabled";

/// 변수 입력 방식을 고르는 설정 키이다.
pub const INPUT_MODE_KEY: &str = "input-mode";

/// Flow 기능이 꺼졌을 때 숨겨지는 화면 요소이다.
const FLOW_SURFACES: [&str; 3] = ["Execute Flow button", "Flow Panel", "Add Flow button"];

/// 항목 노출 조건이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// 항상 노출.
    Always,
    /// 해당 불리언 설정이 확정적으로 켜져 있을 때만 노출.
    RequiresEnabled(&'static str),
}

impl Capability {
    /// 스냅샷 기준으로 조건을 만족하는지 확인한다.
    pub fn is_met(&self, snapshot: &SettingsSnapshot) -> bool {
        match self {
            Capability::Always => true,
            Capability::RequiresEnabled(key) => snapshot.is_enabled(key),
        }
    }
}

/// 사이드바 항목 종류이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// 클릭 가능한 도구.
    Action,
    /// 구분선.
    Separator,
}

/// 렌더링 계층이 그릴 도구 항목 설명이다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    /// 항목 식별자.
    pub id: &'static str,
    /// 툴팁 문자열. 구분선이면 비어 있다.
    pub tooltip: &'static str,
    /// 항목이 켜진 상태일 때 대신 보여줄 툴팁.
    pub active_tooltip: Option<&'static str>,
    /// 항목 종류.
    pub kind: ToolKind,
    /// 노출 조건.
    pub capability: Capability,
}

impl ToolDescriptor {
    const fn action(id: &'static str, tooltip: &'static str) -> Self {
        Self {
            id,
            tooltip,
            active_tooltip: None,
            kind: ToolKind::Action,
            capability: Capability::Always,
        }
    }

    const fn separator(id: &'static str) -> Self {
        Self {
            id,
            tooltip: "",
            active_tooltip: None,
            kind: ToolKind::Separator,
            capability: Capability::Always,
        }
    }

    const fn requires(mut self, key: &'static str) -> Self {
        self.capability = Capability::RequiresEnabled(key);
        self
    }

    const fn when_active(mut self, tooltip: &'static str) -> Self {
        self.active_tooltip = Some(tooltip);
        self
    }

    /// 패널 열림 같은 항목 상태에 맞는 툴팁을 고른다.
    pub fn tooltip_for(&self, active: bool) -> &'static str {
        match (active, self.active_tooltip) {
            (true, Some(tooltip)) => tooltip,
            _ => self.tooltip,
        }
    }

    /// 구분선 여부.
    pub fn is_separator(&self) -> bool {
        self.kind == ToolKind::Separator
    }
}

/// 워크플로 디자이너 오른쪽 사이드바의 기본 항목 목록이다.
pub fn designer_sidebar() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::action("add-agent", "Add Agent"),
        ToolDescriptor::action("add-task", "Add Task"),
        ToolDescriptor::separator("separator-crew"),
        ToolDescriptor::action("save-crew", "Save Crew"),
        ToolDescriptor::action("open-catalog", "Open Catalog"),
        ToolDescriptor::separator("separator-flow").requires(FLOW_FEATURE_KEY),
        ToolDescriptor::action("add-flow", "Add Flow").requires(FLOW_FEATURE_KEY),
        ToolDescriptor::separator("separator-tools"),
        ToolDescriptor::action("view-logs", "View Assistant Logs"),
        ToolDescriptor::action("toggle-execution-history", "Show Execution History")
            .when_active("Hide Execution History"),
        ToolDescriptor::action("schedules", "Schedules"),
    ]
}

/// 조건을 만족하는 항목만 남기고 앞뒤 및 연속된 구분선을 정리한다.
pub fn visible_items<'a>(
    items: &'a [ToolDescriptor],
    snapshot: &SettingsSnapshot,
) -> Vec<&'a ToolDescriptor> {
    let mut visible: Vec<&ToolDescriptor> = Vec::with_capacity(items.len());
    for item in items.iter().filter(|item| item.capability.is_met(snapshot)) {
        if item.is_separator() && visible.last().is_none_or(|prev| prev.is_separator()) {
            continue;
        }
        visible.push(item);
    }
    if visible.last().is_some_and(|item| item.is_separator()) {
        visible.pop();
    }
    visible
}

/// 캔버스 영역 배치 방식이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelLayout {
    /// Crew 캔버스만 표시.
    Single,
    /// Crew 캔버스와 Flow 캔버스를 나란히 표시.
    Dual,
}

/// Flow 패널 노출 요청과 확정 설정으로 배치 방식을 결정한다.
pub fn panel_layout(flows_visible: bool, snapshot: &SettingsSnapshot) -> PanelLayout {
    if flows_visible && snapshot.is_enabled(FLOW_FEATURE_KEY) {
        PanelLayout::Dual
    } else {
        PanelLayout::Single
    }
}

/// Flow 기능이 꺼져 있어 숨겨진 화면 요소 이름 목록.
pub fn hidden_surfaces(snapshot: &SettingsSnapshot) -> Vec<&'static str> {
    if snapshot.is_enabled(FLOW_FEATURE_KEY) {
        Vec::new()
    } else {
        FLOW_SURFACES.to_vec()
    }
}
