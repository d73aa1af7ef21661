//! # UR Protocol
//!
//! Universal Robots 控制器协议定义（无 IO 依赖）
//!
//! ## 模块
//!
//! - `frame`: 实时接口帧头（长度前缀）解析与构建
//! - `layout`: 字段偏移表（字段名 → 偏移/宽度，可配置）
//! - `feedback`: 遥测消息解码（机器人状态 / 安全状态）
//! - `control`: 点动（jog）指令到 URScript 的编码
//! - `dashboard`: Dashboard 文本指令与应答解析
//! - `modes`: 机器人模式 / 安全模式枚举
//!
//! ## 字节序
//!
//! 协议使用网络字节序（大端）。所有 double 均为 IEEE-754 64 位，
//! 不做字节序自动探测。

pub mod control;
pub mod dashboard;
pub mod feedback;
pub mod frame;
pub mod layout;
pub mod modes;

// 重新导出常用类型
pub use control::{CartesianAxis, Joint, JogCommand, JogMotion, JogSpace};
pub use dashboard::{DASHBOARD_BANNER_PREFIX, DashboardCommand};
pub use feedback::{
    MessageType, RobotStateFeedback, SafetyFeedback, SafetyFlags, TelemetryMessage,
    decode_payload,
};
pub use frame::{DEFAULT_MAX_FRAME_LEN, FRAME_HEADER_LEN, FrameHeader, encode_frame};
pub use layout::{FieldOffset, RobotStateLayout, SafetyLayout, TelemetryLayout};
pub use modes::{RobotMode, SafetyMode};

use thiserror::Error;

/// 六自由度向量（位姿、关节角、速度等）
pub type Vector6 = [f64; 6];

/// 协议错误类型（编码 / 参数校验）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },

    #[error("Invalid axis index: {0} (expected 0..6)")]
    InvalidAxis(usize),

    #[error("Invalid text command: {0}")]
    InvalidText(String),

    #[error("Buffer too short: need {needed} bytes, have {available}")]
    BufferTooShort { needed: usize, available: usize },
}

/// 解码错误类型
///
/// 解码错误只影响单个帧，接收循环记录后继续运行。
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// 帧头声明的长度超过上限（流可能已失步）
    #[error("Oversized frame: declared {declared} bytes, limit {limit}")]
    Oversized { declared: u32, limit: u32 },

    /// 帧头声明的长度不足以包含消息类型字节
    #[error("Undersized frame: declared {declared} bytes")]
    Undersized { declared: u32 },

    /// 载荷为空（缺少消息类型字节）
    #[error("Empty payload")]
    EmptyPayload,
}

/// 从大端字节读取 f64
///
/// 越界时返回 `None`，调用方据此跳过该字段。
pub fn read_f64_be(buf: &[u8], offset: usize) -> Option<f64> {
    let bytes = buf.get(offset..offset.checked_add(8)?)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Some(f64::from_be_bytes(raw))
}

/// 从大端字节读取 i32
pub fn read_i32_be(buf: &[u8], offset: usize) -> Option<i32> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    Some(i32::from_be_bytes(raw))
}

/// 从大端字节读取 N 个连续的 f64
pub fn read_f64_array_be<const N: usize>(buf: &[u8], offset: usize) -> Option<[f64; N]> {
    let end = offset.checked_add(N * 8)?;
    let bytes = buf.get(offset..end)?;
    let mut out = [0.0; N];
    for (value, chunk) in out.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(chunk);
        *value = f64::from_be_bytes(raw);
    }
    Some(out)
}

/// 将 f64 数组按大端写入缓冲区（测试与模拟服务端使用）
///
/// # 错误
/// - `ProtocolError::BufferTooShort`: 缓冲区放不下全部数值，缓冲区保持不变
pub fn write_f64_array_be(buf: &mut [u8], offset: usize, values: &[f64]) -> Result<(), ProtocolError> {
    let needed = values
        .len()
        .checked_mul(8)
        .and_then(|len| offset.checked_add(len))
        .unwrap_or(usize::MAX);
    let available = buf.len();
    let Some(target) = buf.get_mut(offset..needed) else {
        return Err(ProtocolError::BufferTooShort { needed, available });
    };
    for (chunk, value) in target.chunks_exact_mut(8).zip(values) {
        chunk.copy_from_slice(&value.to_be_bytes());
    }
    Ok(())
}
