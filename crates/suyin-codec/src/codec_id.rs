//! 编解码器标识符.
//!
//! 对标 FFmpeg 的 `AVCodecID`, 为每种音频编解码算法分配唯一标识.

use std::fmt;

/// 编解码器标识符
///
/// 唯一标识一种音频编解码算法, 与容器格式无关.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    /// 未知编解码器
    None,

    // ========================
    // PCM 族
    // ========================
    /// 无符号 8 位 PCM
    PcmU8,
    /// 有符号 16 位小端 PCM
    PcmS16le,
    /// 有符号 16 位大端 PCM
    PcmS16be,
    /// 有符号 24 位小端 PCM
    PcmS24le,
    /// 有符号 32 位小端 PCM
    PcmS32le,
    /// 32 位浮点小端 PCM
    PcmF32le,
    /// 64 位浮点小端 PCM
    PcmF64le,

    // ========================
    // 有损/无损压缩音频
    // ========================
    /// FLAC (Free Lossless Audio Codec)
    Flac,
    /// MP3 (MPEG Audio Layer III)
    Mp3,
    /// AAC (Advanced Audio Coding)
    Aac,
    /// Vorbis
    Vorbis,
    /// Opus
    Opus,
    /// AC-3 (Dolby Digital)
    Ac3,
    /// E-AC-3 (Dolby Digital Plus)
    Eac3,
}

impl CodecId {
    /// 获取编解码器的人类可读名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::PcmU8 => "pcm_u8",
            Self::PcmS16le => "pcm_s16le",
            Self::PcmS16be => "pcm_s16be",
            Self::PcmS24le => "pcm_s24le",
            Self::PcmS32le => "pcm_s32le",
            Self::PcmF32le => "pcm_f32le",
            Self::PcmF64le => "pcm_f64le",
            Self::Flac => "flac",
            Self::Mp3 => "mp3",
            Self::Aac => "aac",
            Self::Vorbis => "vorbis",
            Self::Opus => "opus",
            Self::Ac3 => "ac3",
            Self::Eac3 => "eac3",
        }
    }

    /// 是否为 PCM 族编解码器
    pub const fn is_pcm(&self) -> bool {
        matches!(
            self,
            Self::PcmU8
                | Self::PcmS16le
                | Self::PcmS16be
                | Self::PcmS24le
                | Self::PcmS32le
                | Self::PcmF32le
                | Self::PcmF64le
        )
    }

    /// 是否支持动态范围压缩 (DRC) 缩放
    ///
    /// 只有 AC-3 族解码器理解 `drc_scale` 选项, 其他解码器忽略它.
    pub const fn has_drc(&self) -> bool {
        matches!(self, Self::Ac3 | Self::Eac3)
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
