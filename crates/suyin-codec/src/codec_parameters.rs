//! 编解码器参数.
//!
//! 对标 FFmpeg 的 `AVCodecParameters`, 描述解码器的配置参数,
//! 通常由解封装器从容器头部提取.

use suyin_core::{ChannelLayout, SampleFormat};

use crate::codec_id::CodecId;

/// 音频编解码器参数
#[derive(Debug, Clone)]
pub struct CodecParameters {
    /// 编解码器标识
    pub codec_id: CodecId,
    /// 额外数据 (如 DecoderSpecificInfo)
    pub extra_data: Vec<u8>,
    /// 码率 (bits/s, 0 表示未知)
    pub bit_rate: u64,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道布局
    pub channel_layout: ChannelLayout,
    /// 采样格式 (None 表示由码流决定)
    pub sample_format: SampleFormat,
    /// 每帧采样数 (0 表示可变)
    pub frame_size: u32,
    /// 原始采样的有效位数 (0 表示未知, 按字节宽度推断)
    pub bits_per_raw_sample: u32,
    /// 编码器引入的前导填充采样数
    pub initial_padding: u32,
}

impl CodecParameters {
    /// 创建指定编解码器的空参数
    pub fn new(codec_id: CodecId) -> Self {
        Self {
            codec_id,
            extra_data: Vec::new(),
            bit_rate: 0,
            sample_rate: 0,
            channel_layout: ChannelLayout::MONO,
            sample_format: SampleFormat::None,
            frame_size: 0,
            bits_per_raw_sample: 0,
            initial_padding: 0,
        }
    }
}
