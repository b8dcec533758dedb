//! 媒体类型定义.
//!
//! 对标 FFmpeg 的 `AVMediaType`. 本框架只解码音频,
//! 但容器中仍可能出现其他类型的流, 需要识别并跳过.

use std::fmt;

/// 媒体流类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// 音频流
    Audio,
    /// 视频流
    Video,
    /// 字幕流
    Subtitle,
    /// 数据流
    Data,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Audio => "音频",
            Self::Video => "视频",
            Self::Subtitle => "字幕",
            Self::Data => "数据",
        };
        write!(f, "{name}")
    }
}
