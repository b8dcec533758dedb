//! 测试用合成媒体源.
//!
//! 生成确定性的 S16 交错立体声帧流, 并允许注入各种容器缺陷:
//! seek 落点偏移、PTS 未知前缀、内容完全相同的帧段、不可 seek.
//! 数据包是合法的 PCM 码流, 由内置 PCM 解码器正常解码,
//! 缺陷全部集中在解封装层, 与真实容器的失效方式一致.

use bytes::Bytes;
use suyin_codec::{CodecId, Packet};
use suyin_core::{
    timestamp::NOPTS_VALUE, ChannelLayout, MediaType, Rational, SuError, SuResult,
};
use suyin_format::io::MemoryBackend;
use suyin_format::stream::{AudioStreamParams, Stream};
use suyin_format::{demuxer::SeekFlags, Demuxer, FormatId, IoContext};

use crate::decoder::MediaSource;

/// 合成流配置
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// 总帧数
    pub num_frames: i64,
    /// 基础帧长 (采样)
    pub base_samples: u32,
    /// 帧长是否随序号变化
    pub vary_lengths: bool,
    /// 采样率
    pub sample_rate: u32,
    /// 序号低于此值的帧 PTS 未知
    pub pts_unknown_below: i64,
    /// seek 落点相对目标帧的偏移 (正数越过目标, 负数提前)
    pub seek_bias: i64,
    /// seek 一律失败
    pub unseekable: bool,
    /// `[起, 止)` 区间内的帧内容完全相同
    pub duplicate_range: (i64, i64),
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            num_frames: 400,
            base_samples: 800,
            vary_lengths: true,
            sample_rate: 48000,
            pts_unknown_below: 0,
            seek_bias: 0,
            unseekable: false,
            duplicate_range: (0, 0),
        }
    }
}

impl SyntheticConfig {
    /// 第 i 帧的采样数
    pub fn frame_len(&self, i: i64) -> u32 {
        if self.vary_lengths {
            self.base_samples + (i % 7) as u32 * 16
        } else {
            self.base_samples
        }
    }

    /// 第 i 帧的 S16 交错立体声负载
    pub fn frame_payload(&self, i: i64) -> Vec<u8> {
        let (dup_from, dup_to) = self.duplicate_range;
        // 重复段内所有帧共用同一份内容
        let seed = if i >= dup_from && i < dup_to { dup_from } else { i };

        let len = self.frame_len(i) as i64;
        let mut data = Vec::with_capacity(len as usize * 4);
        for j in 0..len {
            for ch in 0..2i64 {
                let value = (seed * 7919 + j * 31 + ch * 17) % 65536 - 32768;
                data.extend_from_slice(&(value as i16).to_le_bytes());
            }
        }
        data
    }

    /// 每帧首采样的累计偏移
    pub fn frame_starts(&self) -> Vec<i64> {
        let mut starts = Vec::with_capacity(self.num_frames as usize);
        let mut acc = 0i64;
        for i in 0..self.num_frames {
            starts.push(acc);
            acc += i64::from(self.frame_len(i));
        }
        starts
    }

    /// 全部帧负载拼接后的交错参考数据
    pub fn reference_interleaved(&self) -> Vec<u8> {
        let mut data = Vec::new();
        for i in 0..self.num_frames {
            data.extend_from_slice(&self.frame_payload(i));
        }
        data
    }
}

/// 合成解封装器
pub struct SyntheticDemuxer {
    config: SyntheticConfig,
    starts: Vec<i64>,
    streams: Vec<Stream>,
    /// 下一个要产出的帧序号
    cursor: i64,
}

impl SyntheticDemuxer {
    pub fn new(config: SyntheticConfig) -> Self {
        let starts = config.frame_starts();
        let total_samples: i64 = starts.last().copied().unwrap_or(0)
            + config.frame_len(config.num_frames - 1) as i64;
        let stream = Stream {
            index: 0,
            media_type: MediaType::Audio,
            codec_id: CodecId::PcmS16le,
            time_base: Rational::new(1, config.sample_rate as i32),
            duration: total_samples,
            start_time: 0,
            extra_data: Vec::new(),
            audio: Some(AudioStreamParams {
                sample_rate: config.sample_rate,
                channel_layout: ChannelLayout::STEREO,
                sample_format: suyin_core::SampleFormat::None,
                bit_rate: 0,
                frame_size: 0,
                bits_per_raw_sample: 16,
                initial_padding: 0,
            }),
        };
        Self {
            config,
            starts,
            streams: vec![stream],
            cursor: 0,
        }
    }
}

impl Demuxer for SyntheticDemuxer {
    fn format_id(&self) -> FormatId {
        FormatId::Wav
    }

    fn name(&self) -> &str {
        "synthetic"
    }

    fn open(&mut self, _io: &mut IoContext, _options: &[(String, String)]) -> SuResult<()> {
        Ok(())
    }

    fn streams(&self) -> &[Stream] {
        &self.streams
    }

    fn read_packet(&mut self, _io: &mut IoContext) -> SuResult<Packet> {
        let i = self.cursor;
        if i >= self.config.num_frames {
            return Err(SuError::Eof);
        }
        self.cursor += 1;

        let mut pkt = Packet::from_data(Bytes::from(self.config.frame_payload(i)));
        pkt.stream_index = 0;
        pkt.pts = if i < self.config.pts_unknown_below {
            NOPTS_VALUE
        } else {
            self.starts[i as usize]
        };
        pkt.dts = pkt.pts;
        pkt.duration = i64::from(self.config.frame_len(i));
        pkt.time_base = Rational::new(1, self.config.sample_rate as i32);
        pkt.is_keyframe = true;
        Ok(pkt)
    }

    fn seek(
        &mut self,
        _io: &mut IoContext,
        _stream_index: usize,
        timestamp: i64,
        _flags: SeekFlags,
    ) -> SuResult<()> {
        if self.config.unseekable {
            return Err(SuError::Unsupported("合成流配置为不可 seek".into()));
        }
        // 找到目标时间戳所在的帧, 再施加配置的落点偏移
        let exact = match self.starts.partition_point(|&s| s <= timestamp) {
            0 => 0,
            idx => idx as i64 - 1,
        };
        self.cursor = (exact + self.config.seek_bias).clamp(0, self.config.num_frames);
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        let total = self.starts.last().copied().unwrap_or(0)
            + self.config.frame_len(self.config.num_frames - 1) as i64;
        Some(total as f64 / f64::from(self.config.sample_rate))
    }
}

/// 合成媒体源
pub struct MockSource {
    config: SyntheticConfig,
}

impl MockSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config }
    }
}

impl MediaSource for MockSource {
    fn open(&self) -> SuResult<(IoContext, Box<dyn Demuxer>)> {
        let io = IoContext::new(Box::new(MemoryBackend::new()));
        Ok((io, Box::new(SyntheticDemuxer::new(self.config.clone()))))
    }

    fn location(&self) -> &str {
        "synthetic://track"
    }
}
