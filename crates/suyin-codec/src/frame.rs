//! 解码后的音频帧 (AudioFrame).
//!
//! 对标 FFmpeg 的 `AVFrame`, 表示解码后的原始 PCM 数据.
//! 帧是随机访问引擎的基本单位: 引擎按帧序号寻址,
//! 并以帧的 PCM 负载内容计算摘要.

use suyin_core::{ChannelLayout, Rational, SampleFormat};

/// 音频帧
///
/// 包含解码后的原始音频采样数据.
/// 平面格式: data 中每个 Vec 对应一个声道.
/// 交错格式: data 中只有一个 Vec, 所有声道交替排列.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// 音频采样数据 (平面格式: 每声道一个 Vec; 交错格式: 单个 Vec)
    pub data: Vec<Vec<u8>>,
    /// 本帧包含的采样数 (每声道)
    pub nb_samples: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 采样格式
    pub sample_format: SampleFormat,
    /// 声道布局
    pub channel_layout: ChannelLayout,
    /// 显示时间戳 (PTS)
    pub pts: i64,
    /// 时间基
    pub time_base: Rational,
    /// 帧时长 (以 time_base 为单位)
    pub duration: i64,
}

impl AudioFrame {
    /// 创建空的音频帧
    pub fn new(
        nb_samples: u32,
        sample_rate: u32,
        sample_format: SampleFormat,
        channel_layout: ChannelLayout,
    ) -> Self {
        let plane_count = sample_format.plane_count(channel_layout.channels) as usize;
        Self {
            data: vec![Vec::new(); plane_count],
            nb_samples,
            sample_rate,
            sample_format,
            channel_layout,
            pts: suyin_core::timestamp::NOPTS_VALUE,
            time_base: Rational::UNDEFINED,
            duration: 0,
        }
    }

    /// 是否为平面存储
    pub fn is_planar(&self) -> bool {
        self.sample_format.is_planar()
    }

    /// 单个平面的有效负载字节数
    ///
    /// 平面格式为 bytes_per_sample * nb_samples,
    /// 交错格式为 bytes_per_sample * channels * nb_samples.
    pub fn plane_size(&self) -> usize {
        let per_sample = self.sample_format.bytes_per_sample() as usize * self.nb_samples as usize;
        if self.is_planar() {
            per_sample
        } else {
            per_sample * self.channel_layout.channels as usize
        }
    }

    /// 全部数据平面占用的字节总数, 用于缓存记账
    pub fn payload_size(&self) -> usize {
        self.data.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_帧_平面数量() {
        let f = AudioFrame::new(1024, 48000, SampleFormat::F32p, ChannelLayout::SURROUND_5_1);
        assert_eq!(f.data.len(), 6);
        let f = AudioFrame::new(1024, 48000, SampleFormat::S16, ChannelLayout::SURROUND_5_1);
        assert_eq!(f.data.len(), 1);
    }

    #[test]
    fn test_帧_平面负载大小() {
        let f = AudioFrame::new(100, 44100, SampleFormat::S16, ChannelLayout::STEREO);
        assert_eq!(f.plane_size(), 100 * 2 * 2);
        let f = AudioFrame::new(100, 44100, SampleFormat::S16p, ChannelLayout::STEREO);
        assert_eq!(f.plane_size(), 100 * 2);
    }
}
