//! 实时接口帧头
//!
//! 帧格式：
//!
//! ```text
//! +----------------+-----------+--------------------------+
//! | length (u32 BE)| type (u8) | body (length - 5 bytes)  |
//! +----------------+-----------+--------------------------+
//! |<------------------ length (含前缀) ------------------>|
//! ```
//!
//! 长度字段覆盖整个帧（包括 4 字节前缀本身）。

use crate::DecodeError;

/// 帧头长度（字节）
pub const FRAME_HEADER_LEN: usize = 4;

/// 默认帧长度上限（字节）
///
/// 超过上限的帧视为流失步，直接拒绝，不读取其声明的长度。
pub const DEFAULT_MAX_FRAME_LEN: u32 = 10_000;

/// 最小合法帧长度：前缀 + 消息类型字节
const MIN_FRAME_LEN: u32 = FRAME_HEADER_LEN as u32 + 1;

/// 已校验的帧头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// 帧总长度（含 4 字节前缀）
    pub length: u32,
}

impl FrameHeader {
    /// 解析并校验帧头
    ///
    /// # 错误
    /// - `DecodeError::Oversized`: 声明长度超过 `max_frame_len`
    /// - `DecodeError::Undersized`: 声明长度不足以包含消息类型字节
    ///
    /// # 示例
    ///
    /// ```
    /// use ur_protocol::{FrameHeader, DEFAULT_MAX_FRAME_LEN};
    ///
    /// let header = FrameHeader::parse([0x00, 0x00, 0x04, 0x28], DEFAULT_MAX_FRAME_LEN).unwrap();
    /// assert_eq!(header.length, 1064);
    /// assert_eq!(header.payload_len(), 1060);
    /// ```
    pub fn parse(bytes: [u8; FRAME_HEADER_LEN], max_frame_len: u32) -> Result<Self, DecodeError> {
        let length = u32::from_be_bytes(bytes);
        if length > max_frame_len {
            return Err(DecodeError::Oversized {
                declared: length,
                limit: max_frame_len,
            });
        }
        if length < MIN_FRAME_LEN {
            return Err(DecodeError::Undersized { declared: length });
        }
        Ok(Self { length })
    }

    /// 从切片解析（切片长度必须 >= 4）
    pub fn parse_slice(bytes: &[u8], max_frame_len: u32) -> Result<Self, DecodeError> {
        let Some(prefix) = bytes.get(..FRAME_HEADER_LEN) else {
            return Err(DecodeError::Undersized {
                declared: bytes.len() as u32,
            });
        };
        let mut raw = [0u8; FRAME_HEADER_LEN];
        raw.copy_from_slice(prefix);
        Self::parse(raw, max_frame_len)
    }

    /// 帧头之后待读取的字节数
    pub fn payload_len(&self) -> usize {
        self.length as usize - FRAME_HEADER_LEN
    }
}

/// 构建完整帧（长度前缀 + 载荷）
///
/// 载荷第 0 字节应为消息类型。主要用于测试与模拟控制器。
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let length = (payload.len() + FRAME_HEADER_LEN) as u32;
    let mut frame = Vec::with_capacity(length as usize);
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_header() {
        let header = FrameHeader::parse(1064u32.to_be_bytes(), DEFAULT_MAX_FRAME_LEN).unwrap();
        assert_eq!(header.length, 1064);
        assert_eq!(header.payload_len(), 1060);
    }

    #[test]
    fn test_parse_at_limit_is_accepted() {
        let header = FrameHeader::parse(10_000u32.to_be_bytes(), DEFAULT_MAX_FRAME_LEN).unwrap();
        assert_eq!(header.payload_len(), 9_996);
    }

    #[test]
    fn test_parse_oversized_header() {
        let err = FrameHeader::parse(10_001u32.to_be_bytes(), DEFAULT_MAX_FRAME_LEN).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Oversized {
                declared: 10_001,
                limit: 10_000
            }
        );
    }

    #[test]
    fn test_parse_undersized_header() {
        for length in 0..5u32 {
            let err = FrameHeader::parse(length.to_be_bytes(), DEFAULT_MAX_FRAME_LEN).unwrap_err();
            assert_eq!(err, DecodeError::Undersized { declared: length });
        }
    }

    #[test]
    fn test_parse_slice_too_short() {
        assert!(FrameHeader::parse_slice(&[0, 0], DEFAULT_MAX_FRAME_LEN).is_err());
    }

    #[test]
    fn test_encode_frame_prefix_covers_whole_frame() {
        let frame = encode_frame(&[16, 1, 2, 3]);
        assert_eq!(frame.len(), 8);
        let header = FrameHeader::parse_slice(&frame, DEFAULT_MAX_FRAME_LEN).unwrap();
        assert_eq!(header.length as usize, frame.len());
        assert_eq!(&frame[4..], &[16, 1, 2, 3]);
    }
}
