//! PCM 音频解码器.
//!
//! 将未压缩的 PCM 数据从 Packet 转换为 AudioFrame.
//! 支持 7 种 PCM 变体, 共用解码逻辑.

use log::debug;
use suyin_core::{ChannelLayout, SampleFormat, SuError, SuResult};

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::decoder::{Decoder, DecoderOptions};
use crate::frame::AudioFrame;
use crate::packet::Packet;

/// PCM 格式描述, 描述各 PCM 变体的差异
struct PcmFormatDesc {
    /// 编解码器 ID
    codec_id: CodecId,
    /// 码流中每个样本的字节数
    bytes_per_sample: u32,
    /// 输出的采样格式
    output_format: SampleFormat,
    /// 解码转换函数: 将码流字节转换为输出格式字节
    decode_fn: fn(&[u8], &mut Vec<u8>),
}

/// 直接拷贝
fn decode_copy(src: &[u8], dst: &mut Vec<u8>) {
    dst.extend_from_slice(src);
}

/// S16 大端转小端: 每 2 字节翻转
fn decode_s16be(src: &[u8], dst: &mut Vec<u8>) {
    for chunk in src.chunks_exact(2) {
        dst.push(chunk[1]);
        dst.push(chunk[0]);
    }
}

/// S24LE 符号扩展到 S32: 3 字节 -> 4 字节
fn decode_s24le(src: &[u8], dst: &mut Vec<u8>) {
    for chunk in src.chunks_exact(3) {
        // 高字节的符号位决定扩展字节
        let sign_ext = if chunk[2] & 0x80 != 0 { 0xFF } else { 0x00 };
        dst.push(chunk[0]);
        dst.push(chunk[1]);
        dst.push(chunk[2]);
        dst.push(sign_ext);
    }
}

/// 获取指定 CodecId 的 PCM 格式描述
fn pcm_format_desc(codec_id: CodecId) -> Option<PcmFormatDesc> {
    Some(match codec_id {
        CodecId::PcmU8 => PcmFormatDesc {
            codec_id,
            bytes_per_sample: 1,
            output_format: SampleFormat::U8,
            decode_fn: decode_copy,
        },
        CodecId::PcmS16le => PcmFormatDesc {
            codec_id,
            bytes_per_sample: 2,
            output_format: SampleFormat::S16,
            decode_fn: decode_copy,
        },
        CodecId::PcmS16be => PcmFormatDesc {
            codec_id,
            bytes_per_sample: 2,
            output_format: SampleFormat::S16,
            decode_fn: decode_s16be,
        },
        CodecId::PcmS24le => PcmFormatDesc {
            codec_id,
            bytes_per_sample: 3,
            output_format: SampleFormat::S32,
            decode_fn: decode_s24le,
        },
        CodecId::PcmS32le => PcmFormatDesc {
            codec_id,
            bytes_per_sample: 4,
            output_format: SampleFormat::S32,
            decode_fn: decode_copy,
        },
        CodecId::PcmF32le => PcmFormatDesc {
            codec_id,
            bytes_per_sample: 4,
            output_format: SampleFormat::F32,
            decode_fn: decode_copy,
        },
        CodecId::PcmF64le => PcmFormatDesc {
            codec_id,
            bytes_per_sample: 8,
            output_format: SampleFormat::F64,
            decode_fn: decode_copy,
        },
        _ => return None,
    })
}

/// PCM 音频解码器
pub struct PcmDecoder {
    /// 格式描述
    desc: PcmFormatDesc,
    /// 采样率
    sample_rate: u32,
    /// 声道布局
    channel_layout: ChannelLayout,
    /// 每个样本块的字节数 (每样本字节数 * 声道数)
    block_align: u32,
    /// 已解码帧缓冲
    output_frame: Option<AudioFrame>,
    /// 是否已打开
    opened: bool,
    /// 是否已收到刷新信号
    flushing: bool,
}

impl PcmDecoder {
    /// 创建指定 PCM 变体的解码器工厂函数
    fn create(codec_id: CodecId) -> SuResult<Box<dyn Decoder>> {
        let desc = pcm_format_desc(codec_id)
            .ok_or_else(|| SuError::CodecNotFound(format!("不支持的 PCM 格式: {}", codec_id)))?;
        Ok(Box::new(Self {
            desc,
            sample_rate: 0,
            channel_layout: ChannelLayout::MONO,
            block_align: 0,
            output_frame: None,
            opened: false,
            flushing: false,
        }))
    }

    pub fn new_u8() -> SuResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmU8)
    }

    pub fn new_s16le() -> SuResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmS16le)
    }

    pub fn new_s16be() -> SuResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmS16be)
    }

    pub fn new_s24le() -> SuResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmS24le)
    }

    pub fn new_s32le() -> SuResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmS32le)
    }

    pub fn new_f32le() -> SuResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmF32le)
    }

    pub fn new_f64le() -> SuResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmF64le)
    }
}

impl Decoder for PcmDecoder {
    fn codec_id(&self) -> CodecId {
        self.desc.codec_id
    }

    fn name(&self) -> &str {
        self.desc.codec_id.name()
    }

    fn open(&mut self, params: &CodecParameters, _options: &DecoderOptions) -> SuResult<()> {
        if params.sample_rate == 0 {
            return Err(SuError::InvalidArgument("采样率不能为 0".into()));
        }
        if params.channel_layout.channels == 0 {
            return Err(SuError::InvalidArgument("声道数不能为 0".into()));
        }

        self.sample_rate = params.sample_rate;
        self.channel_layout = params.channel_layout;
        self.block_align = self.desc.bytes_per_sample * params.channel_layout.channels;
        self.output_frame = None;
        self.opened = true;
        self.flushing = false;

        debug!(
            "打开 {} 解码器: {} Hz, {} 声道, 输出格式={}",
            self.name(),
            self.sample_rate,
            self.channel_layout.channels,
            self.desc.output_format,
        );
        Ok(())
    }

    fn send_packet(&mut self, packet: &Packet) -> SuResult<()> {
        if !self.opened {
            return Err(SuError::Codec("解码器未打开, 请先调用 open()".into()));
        }
        if self.output_frame.is_some() {
            return Err(SuError::NeedMoreData);
        }

        // 空包 = flush
        if packet.is_empty() {
            self.flushing = true;
            return Ok(());
        }

        let data_len = packet.data.len() as u32;
        if data_len % self.block_align != 0 {
            return Err(SuError::InvalidData(format!(
                "数据大小 {} 不是 block_align {} 的整数倍",
                data_len, self.block_align,
            )));
        }

        let nb_samples = data_len / self.block_align;
        let mut frame = AudioFrame::new(
            nb_samples,
            self.sample_rate,
            self.desc.output_format,
            self.channel_layout,
        );
        frame.pts = packet.pts;
        frame.time_base = packet.time_base;
        frame.duration = packet.duration;

        // 解码到交错格式 (单平面)
        let output_size = nb_samples as usize
            * self.channel_layout.channels as usize
            * self.desc.output_format.bytes_per_sample() as usize;
        let mut decoded = Vec::with_capacity(output_size);
        (self.desc.decode_fn)(&packet.data, &mut decoded);
        frame.data[0] = decoded;

        self.output_frame = Some(frame);
        Ok(())
    }

    fn receive_frame(&mut self) -> SuResult<AudioFrame> {
        if let Some(frame) = self.output_frame.take() {
            return Ok(frame);
        }
        if self.flushing {
            return Err(SuError::Eof);
        }
        Err(SuError::NeedMoreData)
    }

    fn flush(&mut self) {
        self.output_frame = None;
        self.flushing = false;
    }
}
