//! 遥测消息解码
//!
//! 将一个载荷（帧头之后的字节，第 0 字节为消息类型）解码为状态增量。
//! 每个字段独立解析：载荷长度不足或偏移表宽度不匹配时只跳过该字段，
//! 调用方保留该字段的旧值。

use crate::layout::{F64_WIDTH, FieldOffset, TelemetryLayout, VECTOR2_WIDTH, VECTOR6_WIDTH};
use crate::{DecodeError, Vector6, read_f64_array_be, read_f64_be, read_i32_be};
use bilge::prelude::*;
use smallvec::SmallVec;

/// 已知消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive, num_enum::IntoPrimitive)]
#[repr(u8)]
pub enum MessageType {
    /// 机器人状态（位姿、关节、速度）
    RobotState = 16,
    /// 安全状态（模式、急停、保护性停止）
    SafetyState = 20,
}

/// 安全状态位域（status_flags 字节）
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq)]
pub struct SafetyFlags {
    pub emergency_stopped: bool,  // Bit 0: 急停
    pub protective_stopped: bool, // Bit 1: 保护性停止
    pub program_running: bool,    // Bit 2: 程序运行中
    pub reserved: u5,             // Bit 3-7: 保留
}

/// 被跳过的字段名（绝大多数帧为空，内联存储）
pub type SkippedFields = SmallVec<[&'static str; 4]>;

/// 机器人状态消息（type 16）解码结果
///
/// 所有字段均为 `Option`：`None` 表示本帧未携带（或被跳过），应保留旧值。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotStateFeedback {
    pub controller_time: Option<f64>,
    pub joint_angles: Option<Vector6>,
    pub joint_speeds: Option<Vector6>,
    pub joint_currents: Option<Vector6>,
    pub tcp_pose: Option<Vector6>,
    pub tcp_speed: Option<Vector6>,
    pub tcp_force: Option<Vector6>,
    pub digital_inputs: Option<u64>,
    pub joint_temperatures: Option<Vector6>,
    pub execution_time: Option<f64>,
    pub digital_outputs: Option<u64>,
    pub analog_inputs: Option<[f64; 2]>,
    pub analog_outputs: Option<[f64; 2]>,
    /// 因长度不足或宽度不匹配而跳过的字段
    pub skipped: SkippedFields,
}

/// 安全状态消息（type 20）解码结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SafetyFeedback {
    pub robot_mode: Option<i32>,
    pub safety_mode: Option<i32>,
    pub flags: Option<SafetyFlags>,
    /// 已钳制到 [0, 1]
    pub speed_scaling: Option<f64>,
    pub skipped: SkippedFields,
}

/// 解码后的遥测消息
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryMessage {
    RobotState(RobotStateFeedback),
    Safety(SafetyFeedback),
    /// 未识别的消息类型（不视为错误）
    Unrecognized { message_type: u8, len: usize },
}

impl TelemetryMessage {
    /// 原始消息类型字节
    pub fn message_type(&self) -> u8 {
        match self {
            Self::RobotState(_) => MessageType::RobotState.into(),
            Self::Safety(_) => MessageType::SafetyState.into(),
            Self::Unrecognized { message_type, .. } => *message_type,
        }
    }

    /// 被跳过的字段（未识别消息为空）
    pub fn skipped(&self) -> &[&'static str] {
        match self {
            Self::RobotState(msg) => &msg.skipped,
            Self::Safety(msg) => &msg.skipped,
            Self::Unrecognized { .. } => &[],
        }
    }
}

/// 解码一个载荷
///
/// # 错误
/// - `DecodeError::EmptyPayload`: 载荷缺少消息类型字节
///
/// 其他异常（截断、未知类型）都不是错误。
///
/// # 示例
///
/// ```
/// use ur_protocol::{TelemetryLayout, TelemetryMessage, decode_payload, write_f64_array_be};
///
/// let layout = TelemetryLayout::default();
/// let mut payload = vec![0u8; 1060];
/// payload[0] = 16;
/// write_f64_array_be(&mut payload, 445, &[0.1, 0.2, 0.3, 0.0, 0.0, 0.0]).unwrap();
///
/// match decode_payload(&payload, &layout).unwrap() {
///     TelemetryMessage::RobotState(msg) => {
///         assert_eq!(msg.tcp_pose, Some([0.1, 0.2, 0.3, 0.0, 0.0, 0.0]));
///     }
///     other => panic!("unexpected message: {:?}", other),
/// }
/// ```
pub fn decode_payload(
    payload: &[u8],
    layout: &TelemetryLayout,
) -> Result<TelemetryMessage, DecodeError> {
    let Some(&type_byte) = payload.first() else {
        return Err(DecodeError::EmptyPayload);
    };

    let message = match MessageType::try_from(type_byte) {
        Ok(MessageType::RobotState) => {
            TelemetryMessage::RobotState(decode_robot_state(payload, layout))
        },
        Ok(MessageType::SafetyState) => TelemetryMessage::Safety(decode_safety(payload, layout)),
        Err(_) => TelemetryMessage::Unrecognized {
            message_type: type_byte,
            len: payload.len(),
        },
    };
    Ok(message)
}

/// 按偏移表读取单个字段
///
/// - 偏移表未配置该字段：`None`，不记录
/// - 宽度不匹配 / 载荷不足 / 值无效：`None`，记录到 `skipped`
fn read_field<T>(
    payload: &[u8],
    field: Option<FieldOffset>,
    expected_width: usize,
    name: &'static str,
    skipped: &mut SkippedFields,
    read: impl FnOnce(&[u8]) -> Option<T>,
) -> Option<T> {
    let field = field?;
    let value = if field.width == expected_width {
        field.slice(payload).and_then(read)
    } else {
        None
    };
    if value.is_none() {
        skipped.push(name);
    }
    value
}

fn vector6(bytes: &[u8]) -> Option<Vector6> {
    read_f64_array_be::<6>(bytes, 0)
}

fn vector2(bytes: &[u8]) -> Option<[f64; 2]> {
    read_f64_array_be::<2>(bytes, 0)
}

fn scalar(bytes: &[u8]) -> Option<f64> {
    read_f64_be(bytes, 0)
}

/// 控制器以 double 编码位掩码
fn bit_mask(bytes: &[u8]) -> Option<u64> {
    let value = read_f64_be(bytes, 0)?;
    if value.is_finite() && value >= 0.0 && value <= u64::MAX as f64 {
        Some(value as u64)
    } else {
        None
    }
}

fn decode_robot_state(payload: &[u8], layout: &TelemetryLayout) -> RobotStateFeedback {
    let l = &layout.robot_state;
    let mut skipped = SkippedFields::new();
    let s = &mut skipped;

    let controller_time = read_field(payload, l.controller_time, F64_WIDTH, "controller_time", s, scalar);
    let joint_angles = read_field(payload, l.joint_angles, VECTOR6_WIDTH, "joint_angles", s, vector6);
    let joint_speeds = read_field(payload, l.joint_speeds, VECTOR6_WIDTH, "joint_speeds", s, vector6);
    let joint_currents =
        read_field(payload, l.joint_currents, VECTOR6_WIDTH, "joint_currents", s, vector6);
    let tcp_pose = read_field(payload, l.tcp_pose, VECTOR6_WIDTH, "tcp_pose", s, vector6);
    let tcp_speed = read_field(payload, l.tcp_speed, VECTOR6_WIDTH, "tcp_speed", s, vector6);
    let tcp_force = read_field(payload, l.tcp_force, VECTOR6_WIDTH, "tcp_force", s, vector6);
    let digital_inputs = read_field(payload, l.digital_inputs, F64_WIDTH, "digital_inputs", s, bit_mask);
    let joint_temperatures = read_field(
        payload,
        l.joint_temperatures,
        VECTOR6_WIDTH,
        "joint_temperatures",
        s,
        vector6,
    );
    let execution_time = read_field(payload, l.execution_time, F64_WIDTH, "execution_time", s, scalar);
    let digital_outputs =
        read_field(payload, l.digital_outputs, F64_WIDTH, "digital_outputs", s, bit_mask);
    let analog_inputs = read_field(payload, l.analog_inputs, VECTOR2_WIDTH, "analog_inputs", s, vector2);
    let analog_outputs =
        read_field(payload, l.analog_outputs, VECTOR2_WIDTH, "analog_outputs", s, vector2);

    RobotStateFeedback {
        controller_time,
        joint_angles,
        joint_speeds,
        joint_currents,
        tcp_pose,
        tcp_speed,
        tcp_force,
        digital_inputs,
        joint_temperatures,
        execution_time,
        digital_outputs,
        analog_inputs,
        analog_outputs,
        skipped,
    }
}

fn decode_safety(payload: &[u8], layout: &TelemetryLayout) -> SafetyFeedback {
    let l = &layout.safety;
    let mut skipped = SkippedFields::new();
    let s = &mut skipped;

    let robot_mode = read_field(payload, l.robot_mode, 4, "robot_mode", s, |b| read_i32_be(b, 0));
    let safety_mode = read_field(payload, l.safety_mode, 4, "safety_mode", s, |b| read_i32_be(b, 0));
    let flags = read_field(payload, l.status_flags, 1, "status_flags", s, |b| {
        b.first().map(|&byte| SafetyFlags::from(u8::new(byte)))
    });
    // 非有限值跳过，其余钳制到 [0, 1]
    let speed_scaling = read_field(payload, l.speed_scaling, F64_WIDTH, "speed_scaling", s, |b| {
        read_f64_be(b, 0)
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0))
    });

    SafetyFeedback {
        robot_mode,
        safety_mode,
        flags,
        speed_scaling,
        skipped,
    }
}

// ============================================================================
// 编码（模拟控制器 / 测试使用）
// ============================================================================

fn put(payload: &mut Vec<u8>, field: Option<FieldOffset>, bytes: &[u8]) {
    let Some(field) = field else { return };
    let Some(end) = field.offset.checked_add(bytes.len()) else {
        return;
    };
    if payload.len() < end {
        payload.resize(end, 0);
    }
    payload[field.offset..end].copy_from_slice(bytes);
}

fn f64s_to_be(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

impl RobotStateFeedback {
    /// 按偏移表编码为载荷（第 0 字节为消息类型）
    ///
    /// 载荷至少为 `min_len` 字节，不足部分补零；`None` 字段保持为零。
    pub fn encode(&self, layout: &TelemetryLayout, min_len: usize) -> Vec<u8> {
        let l = &layout.robot_state;
        let mut payload = vec![0u8; min_len.max(1)];
        payload[0] = MessageType::RobotState.into();

        let scalars = [
            (l.controller_time, self.controller_time),
            (l.execution_time, self.execution_time),
            (l.digital_inputs, self.digital_inputs.map(|v| v as f64)),
            (l.digital_outputs, self.digital_outputs.map(|v| v as f64)),
        ];
        for (field, value) in scalars {
            if let Some(value) = value {
                put(&mut payload, field, &value.to_be_bytes());
            }
        }

        let vectors = [
            (l.joint_angles, self.joint_angles),
            (l.joint_speeds, self.joint_speeds),
            (l.joint_currents, self.joint_currents),
            (l.tcp_pose, self.tcp_pose),
            (l.tcp_speed, self.tcp_speed),
            (l.tcp_force, self.tcp_force),
            (l.joint_temperatures, self.joint_temperatures),
        ];
        for (field, value) in vectors {
            if let Some(value) = value {
                put(&mut payload, field, &f64s_to_be(&value));
            }
        }

        for (field, value) in [
            (l.analog_inputs, self.analog_inputs),
            (l.analog_outputs, self.analog_outputs),
        ] {
            if let Some(value) = value {
                put(&mut payload, field, &f64s_to_be(&value));
            }
        }

        payload
    }
}

impl SafetyFeedback {
    /// 按偏移表编码为载荷（第 0 字节为消息类型）
    pub fn encode(&self, layout: &TelemetryLayout) -> Vec<u8> {
        let l = &layout.safety;
        let mut payload = vec![MessageType::SafetyState.into()];
        if let Some(mode) = self.robot_mode {
            put(&mut payload, l.robot_mode, &mode.to_be_bytes());
        }
        if let Some(mode) = self.safety_mode {
            put(&mut payload, l.safety_mode, &mode.to_be_bytes());
        }
        if let Some(flags) = self.flags {
            put(&mut payload, l.status_flags, &[u8::from(flags).value()]);
        }
        if let Some(scaling) = self.speed_scaling {
            put(&mut payload, l.speed_scaling, &scaling.to_be_bytes());
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write_f64_array_be;
    use proptest::prelude::*;

    fn robot_state_payload(len: usize) -> Vec<u8> {
        let mut payload = vec![0u8; len];
        payload[0] = 16;
        payload
    }

    fn unwrap_robot_state(message: TelemetryMessage) -> RobotStateFeedback {
        match message {
            TelemetryMessage::RobotState(msg) => msg,
            other => panic!("Expected RobotState, got {:?}", other),
        }
    }

    fn unwrap_safety(message: TelemetryMessage) -> SafetyFeedback {
        match message {
            TelemetryMessage::Safety(msg) => msg,
            other => panic!("Expected Safety, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_empty_payload() {
        let layout = TelemetryLayout::default();
        assert_eq!(decode_payload(&[], &layout), Err(DecodeError::EmptyPayload));
    }

    #[test]
    fn test_decode_robot_state_documented_offsets() {
        let layout = TelemetryLayout::default();
        let mut payload = robot_state_payload(1060);
        let pose = [0.1, 0.2, 0.3, 0.0, 0.0, 0.0];
        let joints = [0.5, -1.2, 1.57, -0.3, 1.0, 3.14];
        write_f64_array_be(&mut payload, 445, &pose).unwrap();
        write_f64_array_be(&mut payload, 253, &joints).unwrap();

        let msg = unwrap_robot_state(decode_payload(&payload, &layout).unwrap());
        assert_eq!(msg.tcp_pose, Some(pose));
        assert_eq!(msg.joint_angles, Some(joints));
        assert!(msg.skipped.is_empty(), "skipped: {:?}", msg.skipped);
    }

    #[test]
    fn test_decode_robot_state_truncated_skips_tail_fields() {
        let layout = TelemetryLayout::default();
        // 足够容纳 joint_angles (253..301)，不足以容纳 tcp_pose (445..493)
        let mut payload = robot_state_payload(400);
        write_f64_array_be(&mut payload, 253, &[1.0; 6]).unwrap();

        let msg = unwrap_robot_state(decode_payload(&payload, &layout).unwrap());
        assert_eq!(msg.joint_angles, Some([1.0; 6]));
        assert_eq!(msg.tcp_pose, None);
        assert!(msg.skipped.contains(&"tcp_pose"));
        assert!(!msg.skipped.contains(&"joint_angles"));
    }

    #[test]
    fn test_decode_robot_state_width_mismatch_is_skipped() {
        let mut layout = TelemetryLayout::default();
        layout.robot_state.tcp_pose = Some(FieldOffset::new(445, 40));
        let payload = robot_state_payload(1060);

        let msg = unwrap_robot_state(decode_payload(&payload, &layout).unwrap());
        assert_eq!(msg.tcp_pose, None);
        assert!(msg.skipped.contains(&"tcp_pose"));
    }

    #[test]
    fn test_decode_unconfigured_field_is_not_reported() {
        let layout = TelemetryLayout::default();
        let payload = robot_state_payload(1060);
        let msg = unwrap_robot_state(decode_payload(&payload, &layout).unwrap());
        assert_eq!(msg.analog_inputs, None);
        assert!(!msg.skipped.contains(&"analog_inputs"));
    }

    #[test]
    fn test_decode_digital_io_bit_mask() {
        let layout = TelemetryLayout::default();
        let mut payload = robot_state_payload(1060);
        payload[685..693].copy_from_slice(&(0b1010_0001u32 as f64).to_be_bytes());
        payload[1045..1053].copy_from_slice(&(-1.0f64).to_be_bytes());

        let msg = unwrap_robot_state(decode_payload(&payload, &layout).unwrap());
        assert_eq!(msg.digital_inputs, Some(0b1010_0001));
        assert_eq!(msg.digital_outputs, None);
        assert!(msg.skipped.contains(&"digital_outputs"));
    }

    #[test]
    fn test_decode_safety_message() {
        let layout = TelemetryLayout::default();
        let mut flags = SafetyFlags::from(u8::new(0));
        flags.set_emergency_stopped(true);
        flags.set_program_running(true);
        let payload = SafetyFeedback {
            robot_mode: Some(7),
            safety_mode: Some(6),
            flags: Some(flags),
            speed_scaling: Some(0.75),
            skipped: SkippedFields::new(),
        }
        .encode(&layout);
        assert_eq!(payload.len(), 18);

        let msg = unwrap_safety(decode_payload(&payload, &layout).unwrap());
        assert_eq!(msg.robot_mode, Some(7));
        assert_eq!(msg.safety_mode, Some(6));
        let decoded = msg.flags.unwrap();
        assert!(decoded.emergency_stopped());
        assert!(!decoded.protective_stopped());
        assert!(decoded.program_running());
        assert_eq!(msg.speed_scaling, Some(0.75));
    }

    #[test]
    fn test_decode_safety_speed_scaling_is_clamped() {
        let layout = TelemetryLayout::default();
        let mut payload = SafetyFeedback {
            speed_scaling: Some(1.7),
            ..Default::default()
        }
        .encode(&layout);
        let msg = unwrap_safety(decode_payload(&payload, &layout).unwrap());
        assert_eq!(msg.speed_scaling, Some(1.0));

        payload[10..18].copy_from_slice(&(-0.5f64).to_be_bytes());
        let msg = unwrap_safety(decode_payload(&payload, &layout).unwrap());
        assert_eq!(msg.speed_scaling, Some(0.0));

        payload[10..18].copy_from_slice(&f64::NAN.to_be_bytes());
        let msg = unwrap_safety(decode_payload(&payload, &layout).unwrap());
        assert_eq!(msg.speed_scaling, None);
        assert!(msg.skipped.contains(&"speed_scaling"));
    }

    #[test]
    fn test_decode_safety_flags_bit_positions() {
        let flags = SafetyFlags::from(u8::new(0b0000_0010));
        assert!(!flags.emergency_stopped());
        assert!(flags.protective_stopped());
        assert!(!flags.program_running());
        assert_eq!(u8::from(flags).value(), 0b0000_0010);
    }

    #[test]
    fn test_decode_unrecognized_type() {
        let layout = TelemetryLayout::default();
        let msg = decode_payload(&[99, 1, 2, 3], &layout).unwrap();
        assert_eq!(
            msg,
            TelemetryMessage::Unrecognized {
                message_type: 99,
                len: 4
            }
        );
        assert_eq!(msg.message_type(), 99);
        assert!(msg.skipped().is_empty());
    }

    #[test]
    fn test_robot_state_encode_decode_all_fields() {
        let mut layout = TelemetryLayout::default();
        layout.robot_state.analog_inputs = Some(FieldOffset::vector2(1053));
        let original = RobotStateFeedback {
            controller_time: Some(12.5),
            joint_angles: Some([0.1, 0.2, 0.3, 0.4, 0.5, 0.6]),
            joint_speeds: Some([0.01; 6]),
            joint_currents: Some([1.5; 6]),
            tcp_pose: Some([0.4, -0.1, 0.6, 3.1, 0.0, 0.0]),
            tcp_speed: Some([0.0; 6]),
            tcp_force: Some([2.0; 6]),
            digital_inputs: Some(5),
            joint_temperatures: Some([36.5; 6]),
            execution_time: Some(3.0),
            digital_outputs: Some(12),
            analog_inputs: Some([0.5, 4.0]),
            analog_outputs: None,
            skipped: SkippedFields::new(),
        };
        let payload = original.encode(&layout, 1060);
        assert_eq!(payload.len(), 1069);
        let decoded = unwrap_robot_state(decode_payload(&payload, &layout).unwrap());
        assert_eq!(decoded, original);
    }

    proptest! {
        /// 任意截断的载荷都不会 panic，且消息类型保持不变
        #[test]
        fn prop_truncated_payload_never_panics(len in 1usize..1100, fill in any::<u8>()) {
            let layout = TelemetryLayout::default();
            let mut payload = vec![fill; len];
            payload[0] = 16;
            let msg = decode_payload(&payload, &layout).unwrap();
            prop_assert_eq!(msg.message_type(), 16);
        }

        /// 任意字节序列都可以安全解码
        #[test]
        fn prop_arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let layout = TelemetryLayout::default();
            let _ = decode_payload(&bytes, &layout);
        }
    }
}
