//! 容器格式标识符.
//!
//! 对标 FFmpeg 的输入格式名称, 覆盖常见的纯音频容器.

use std::fmt;

/// 容器格式标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FormatId {
    /// WAV (RIFF WAVE)
    Wav,
    /// AIFF
    Aiff,
    /// FLAC 原生容器
    FlacContainer,
    /// MP3 原生容器 (裸 MPEG Audio)
    Mp3Container,
    /// AAC 原生容器 (ADTS)
    AacAdts,
    /// Ogg
    Ogg,
    /// Matroska (MKA)
    Matroska,
}

impl FormatId {
    /// 获取格式的人类可读名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Aiff => "aiff",
            Self::FlacContainer => "flac",
            Self::Mp3Container => "mp3",
            Self::AacAdts => "aac",
            Self::Ogg => "ogg",
            Self::Matroska => "matroska",
        }
    }

    /// 获取格式常用的文件扩展名
    pub const fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Wav => &["wav", "wave"],
            Self::Aiff => &["aiff", "aif"],
            Self::FlacContainer => &["flac"],
            Self::Mp3Container => &["mp3"],
            Self::AacAdts => &["aac"],
            Self::Ogg => &["ogg", "oga"],
            Self::Matroska => &["mka", "mkv"],
        }
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
