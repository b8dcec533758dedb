//! 流信息定义.
//!
//! 对标 FFmpeg 的 `AVStream`, 描述容器中的一条流.

use suyin_codec::CodecId;
use suyin_core::{ChannelLayout, MediaType, Rational, SampleFormat};

/// 流信息
///
/// 描述容器格式中的一条流. 引擎只解码音频流,
/// 其余类型的流仅用于编号与跳过.
#[derive(Debug, Clone)]
pub struct Stream {
    /// 流索引 (在容器中的位置, 从 0 开始)
    pub index: usize,
    /// 媒体类型
    pub media_type: MediaType,
    /// 编解码器标识
    pub codec_id: CodecId,
    /// 时间基
    pub time_base: Rational,
    /// 流时长 (以 time_base 为单位, -1 表示未知)
    pub duration: i64,
    /// 起始时间 (以 time_base 为单位)
    pub start_time: i64,
    /// 编解码器私有数据 (extradata)
    pub extra_data: Vec<u8>,
    /// 音频流参数 (非音频流为 None)
    pub audio: Option<AudioStreamParams>,
}

/// 音频流参数
#[derive(Debug, Clone)]
pub struct AudioStreamParams {
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道布局
    pub channel_layout: ChannelLayout,
    /// 采样格式 (None 表示由码流决定)
    pub sample_format: SampleFormat,
    /// 码率 (bps, 0 表示未知)
    pub bit_rate: u64,
    /// 每帧采样数 (0 表示可变, 如 AAC 为 1024)
    pub frame_size: u32,
    /// 原始采样的有效位数 (0 表示未知)
    pub bits_per_raw_sample: u32,
    /// 编码器引入的前导填充采样数
    pub initial_padding: u32,
}

impl Stream {
    /// 是否为音频流
    pub fn is_audio(&self) -> bool {
        self.media_type == MediaType::Audio && self.audio.is_some()
    }
}
