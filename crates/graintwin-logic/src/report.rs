//! Risk report prompt and the report display board.
//!
//! The operator can ask an external text-generation service for a risk
//! report on the current readings. This module renders the readings into
//! the prompt and tracks which response is on screen. The request itself
//! is made by `graintwin-core`.
//!
//! Requests are not cancelled when a new one is issued. Each request
//! carries a sequence number and the board only displays a response
//! that is newer than the one already shown, so a slow early response
//! can never replace a later one.

use crate::environment::EnvironmentState;
use crate::status::{HOT_SPOT_C, MOLD_RISK_HUMIDITY};

/// Shown when the service cannot be reached or rejects the request.
pub const REPORT_FAILURE_TEXT: &str = "错误：无法连接到 AI 分析服务。请检查网络或 API 密钥设置。";
/// Shown when the service answers with no text.
pub const REPORT_EMPTY_TEXT: &str = "分析完成。未发现异常情况。";

/// Render the readings into the report prompt.
pub fn build_prompt(state: &EnvironmentState) -> String {
    let temps = state
        .temperatures
        .iter()
        .map(|t| format!("{:.2}", t))
        .collect::<Vec<_>>()
        .join(", ");
    let pest = match state.pest_position {
        Some(pos) => format!("检测于 X:{:.2}, Y:{:.2}", pos.x, pos.y),
        None => "未发现".to_string(),
    };

    format!(
        "你是一位负责监控粮仓数字孪生系统的资深农业 AI 专家。\n\
         请分析来自 STM32H750 边缘节点的以下实时传感器数据：\n\
         \n\
         - 温度传感器阵列 (底层/中层/顶层): {temps} °C\n\
         - 相对湿度: {humidity:.1} %\n\
         - 害虫计数 (视觉检测): {count}\n\
         - 害虫坐标: {pest}\n\
         \n\
         请提供一份简明的 Markdown 格式状态报告：\n\
         1. 评估霉变风险 (湿度 > {mold}% 为高风险)。\n\
         2. 评估局部高温点风险 (温度 > {hot}°C 为高风险)。\n\
         3. 评估害虫威胁。\n\
         4. 为仓库管理员提供立即采取的行动建议。\n\
         \n\
         请使用专业、干练的中文进行回复。如果检测到风险，请在报告开头突出显示。",
        temps = temps,
        humidity = state.humidity,
        count = state.pest_count,
        pest = pest,
        mold = MOLD_RISK_HUMIDITY,
        hot = HOT_SPOT_C,
    )
}

/// Map a raw service answer to display text.
pub fn normalize_response(text: &str) -> String {
    if text.trim().is_empty() {
        REPORT_EMPTY_TEXT.to_string()
    } else {
        text.to_string()
    }
}

/// Handle for one issued report request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportTicket(pub u64);

/// The report currently on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayedReport {
    pub ticket: ReportTicket,
    pub text: String,
}

/// Tracks issued requests and the report on screen.
#[derive(Debug, Clone, Default)]
pub struct ReportBoard {
    next_seq: u64,
    in_flight: usize,
    newest_accepted: u64,
    displayed: Option<DisplayedReport>,
}

impl ReportBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request. The current report is hidden until an answer lands.
    pub fn issue(&mut self) -> ReportTicket {
        self.next_seq += 1;
        self.in_flight += 1;
        self.displayed = None;
        ReportTicket(self.next_seq)
    }

    /// Record an answer. Returns whether it is now on screen.
    pub fn complete(&mut self, ticket: ReportTicket, text: String) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        if ticket.0 <= self.newest_accepted {
            return false;
        }
        self.newest_accepted = ticket.0;
        self.displayed = Some(DisplayedReport { ticket, text });
        true
    }

    pub fn is_analyzing(&self) -> bool {
        self.in_flight > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn displayed(&self) -> Option<&DisplayedReport> {
        self.displayed.as_ref()
    }

    pub fn text(&self) -> Option<&str> {
        self.displayed.as_ref().map(|r| r.text.as_str())
    }

    /// Close the report panel.
    pub fn dismiss(&mut self) {
        self.displayed = None;
    }
}
