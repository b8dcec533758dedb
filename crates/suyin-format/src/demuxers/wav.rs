//! WAV (RIFF WAVE) 解封装器.
//!
//! 支持标准 PCM / IEEE 浮点 WAV 以及 WAVE_FORMAT_EXTENSIBLE 扩展头,
//! 扩展头中的声道掩码会透传给流信息.
//!
//! WAV 文件结构:
//! ```text
//! RIFF header:  "RIFF" + file_size-8 + "WAVE"
//! fmt  chunk:   "fmt " + chunk_size + audio_format + channels + sample_rate
//!              + byte_rate + block_align + bits_per_sample [+ 扩展头]
//! data chunk:   "data" + data_size + PCM samples...
//! ```

use log::{debug, warn};
use suyin_codec::CodecId;
use suyin_core::{ChannelLayout, ChannelMask, MediaType, Rational, SuError, SuResult};

use crate::demuxer::{Demuxer, SeekFlags};
use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::probe::{FormatProbe, ProbeScore, SCORE_EXTENSION, SCORE_MAX};
use crate::stream::{AudioStreamParams, Stream};

/// WAV 整数 PCM 格式码
const WAV_FORMAT_PCM: u16 = 0x0001;
/// WAV IEEE 浮点格式码
const WAV_FORMAT_IEEE_FLOAT: u16 = 0x0003;
/// WAV 扩展头格式码
const WAV_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// 默认每个数据包的采样数
const DEFAULT_PACKET_SAMPLES: u32 = 4096;

/// fmt 块解析结果
struct FmtChunk {
    /// 格式码 (扩展头已解析到实际格式)
    audio_format: u16,
    /// 声道数
    channels: u16,
    /// 采样率
    sample_rate: u32,
    /// 块对齐 (每个采样块的字节数)
    block_align: u16,
    /// 容器位深
    bits_per_sample: u16,
    /// 有效位深 (扩展头提供, 否则等于容器位深)
    valid_bits: u16,
    /// 声道掩码 (扩展头提供)
    channel_mask: Option<u64>,
}

/// WAV 解封装器
pub struct WavDemuxer {
    /// 流信息
    streams: Vec<Stream>,
    /// data 块在文件中的起始偏移
    data_offset: u64,
    /// data 块的大小 (字节)
    data_size: u64,
    /// 当前读取位置 (相对于 data 块起始)
    data_pos: u64,
    /// 每个数据包的采样数
    packet_samples: u32,
    /// 块对齐 (每个采样块的字节数)
    block_align: u16,
    /// 采样率 (用于计算时间戳)
    sample_rate: u32,
}

impl WavDemuxer {
    /// 创建 WAV 解封装器实例 (工厂函数)
    pub fn create() -> SuResult<Box<dyn Demuxer>> {
        Ok(Box::new(Self {
            streams: Vec::new(),
            data_offset: 0,
            data_size: 0,
            data_pos: 0,
            packet_samples: DEFAULT_PACKET_SAMPLES,
            block_align: 0,
            sample_rate: 0,
        }))
    }

    /// 解析透传选项
    fn apply_options(&mut self, options: &[(String, String)]) -> SuResult<()> {
        for (key, value) in options {
            match key.as_str() {
                "packet_samples" => {
                    let parsed: u32 = value.parse().map_err(|_| {
                        SuError::InvalidArgument(format!("packet_samples 取值无效: {value}"))
                    })?;
                    if parsed == 0 {
                        return Err(SuError::InvalidArgument(
                            "packet_samples 不能为 0".into(),
                        ));
                    }
                    self.packet_samples = parsed;
                }
                _ => warn!("忽略未知解封装选项: {key}={value}"),
            }
        }
        Ok(())
    }

    /// 解析 fmt 块
    fn parse_fmt(io: &mut IoContext, chunk_size: u64) -> SuResult<FmtChunk> {
        if chunk_size < 16 {
            return Err(SuError::InvalidData("fmt 块大小不足 16 字节".into()));
        }

        let mut audio_format = io.read_u16_le()?;
        let channels = io.read_u16_le()?;
        let sample_rate = io.read_u32_le()?;
        let _byte_rate = io.read_u32_le()?;
        let block_align = io.read_u16_le()?;
        let bits_per_sample = io.read_u16_le()?;

        let mut consumed = 16u64;
        let mut valid_bits = bits_per_sample;
        let mut channel_mask = None;

        // WAVE_FORMAT_EXTENSIBLE: cbSize(2) + valid_bits(2) + channel_mask(4) + GUID(16)
        if audio_format == WAV_FORMAT_EXTENSIBLE && chunk_size >= 16 + 2 + 22 {
            let cb_size = io.read_u16_le()?;
            consumed += 2;
            if cb_size >= 22 {
                valid_bits = io.read_u16_le()?;
                channel_mask = Some(u64::from(io.read_u32_le()?));
                let guid = io.read_bytes(16)?;
                consumed += 22;
                // GUID 的前 2 字节就是实际格式码
                audio_format = u16::from_le_bytes([guid[0], guid[1]]);
                debug!(
                    "扩展头: 实际格式={:#06X}, 有效位深={}, 声道掩码={:?}",
                    audio_format, valid_bits, channel_mask,
                );
            }
        }

        if chunk_size > consumed {
            io.skip((chunk_size - consumed) as usize)?;
        }

        Ok(FmtChunk {
            audio_format,
            channels,
            sample_rate,
            block_align,
            bits_per_sample,
            valid_bits,
            channel_mask,
        })
    }

    /// 根据 WAV 格式码和位深确定 CodecId
    fn resolve_codec_id(audio_format: u16, bits_per_sample: u16) -> SuResult<CodecId> {
        match audio_format {
            WAV_FORMAT_PCM => match bits_per_sample {
                8 => Ok(CodecId::PcmU8),
                16 => Ok(CodecId::PcmS16le),
                24 => Ok(CodecId::PcmS24le),
                32 => Ok(CodecId::PcmS32le),
                _ => Err(SuError::Unsupported(format!(
                    "不支持的 PCM 位深: {bits_per_sample}"
                ))),
            },
            WAV_FORMAT_IEEE_FLOAT => match bits_per_sample {
                32 => Ok(CodecId::PcmF32le),
                64 => Ok(CodecId::PcmF64le),
                _ => Err(SuError::Unsupported(format!(
                    "不支持的浮点位深: {bits_per_sample}"
                ))),
            },
            _ => Err(SuError::Unsupported(format!(
                "不支持的 WAV 格式码: {audio_format:#06X}"
            ))),
        }
    }

    /// 构建声道布局: 优先使用扩展头掩码, 否则按声道数套用默认布局
    fn resolve_channel_layout(channels: u16, channel_mask: Option<u64>) -> ChannelLayout {
        if let Some(mask) = channel_mask {
            let mask = ChannelMask::from_bits_truncate(mask);
            if mask.bits().count_ones() == u32::from(channels) {
                return ChannelLayout::from_mask(mask);
            }
            warn!(
                "扩展头声道掩码与声道数 {} 不一致, 回退到默认布局",
                channels
            );
        }
        ChannelLayout::from_channels(u32::from(channels))
    }
}

impl Demuxer for WavDemuxer {
    fn format_id(&self) -> FormatId {
        FormatId::Wav
    }

    fn name(&self) -> &str {
        "wav"
    }

    fn open(&mut self, io: &mut IoContext, options: &[(String, String)]) -> SuResult<()> {
        self.apply_options(options)?;

        // 读取 RIFF 头
        let riff_tag = io.read_tag()?;
        if &riff_tag != b"RIFF" {
            return Err(SuError::InvalidData("不是有效的 RIFF 文件".into()));
        }

        let _file_size = io.read_u32_le()?;

        let wave_tag = io.read_tag()?;
        if &wave_tag != b"WAVE" {
            return Err(SuError::InvalidData("不是有效的 WAVE 文件".into()));
        }

        debug!("检测到 RIFF/WAVE 文件");

        // 解析各 chunk, 直到找到 data 块
        let mut fmt: Option<FmtChunk> = None;
        let mut data_found = false;

        while !data_found {
            let chunk_id = match io.read_tag() {
                Ok(tag) => tag,
                Err(SuError::Eof) => break,
                Err(e) => return Err(e),
            };
            let chunk_size = io.read_u32_le()? as u64;

            match &chunk_id {
                b"fmt " => {
                    fmt = Some(Self::parse_fmt(io, chunk_size)?);
                }
                b"data" => {
                    if fmt.is_none() {
                        return Err(SuError::InvalidData("data 块出现在 fmt 块之前".into()));
                    }
                    self.data_offset = io.position()?;
                    self.data_size = chunk_size;
                    data_found = true;
                    debug!("data: offset={}, size={}", self.data_offset, self.data_size);
                }
                _ => {
                    warn!(
                        "跳过未知块: '{}', 大小={}",
                        String::from_utf8_lossy(&chunk_id),
                        chunk_size
                    );
                    io.skip(chunk_size as usize)?;
                }
            }

            // WAV 块要求偶数对齐, 奇数大小需要跳过 1 个填充字节
            // 但 data 块不在此处跳过 (接下来要读取其数据)
            if !data_found && chunk_size % 2 != 0 {
                io.skip(1)?;
            }
        }

        let fmt = fmt.ok_or_else(|| SuError::InvalidData("未找到 fmt 块".into()))?;
        if !data_found {
            return Err(SuError::InvalidData("未找到 data 块".into()));
        }
        if fmt.block_align == 0 {
            return Err(SuError::InvalidData("block_align 为 0".into()));
        }

        // 构建流信息
        let codec_id = Self::resolve_codec_id(fmt.audio_format, fmt.bits_per_sample)?;
        let channel_layout = Self::resolve_channel_layout(fmt.channels, fmt.channel_mask);
        let total_samples = self.data_size / u64::from(fmt.block_align);
        let bit_rate =
            u64::from(fmt.sample_rate) * u64::from(fmt.channels) * u64::from(fmt.bits_per_sample);

        let stream = Stream {
            index: 0,
            media_type: MediaType::Audio,
            codec_id,
            time_base: Rational::new(1, fmt.sample_rate as i32),
            duration: total_samples as i64,
            start_time: 0,
            extra_data: Vec::new(),
            audio: Some(AudioStreamParams {
                sample_rate: fmt.sample_rate,
                channel_layout,
                sample_format: suyin_core::SampleFormat::None,
                bit_rate,
                frame_size: 0,
                bits_per_raw_sample: u32::from(fmt.valid_bits),
                initial_padding: 0,
            }),
        };

        debug!(
            "WAV 打开完成: {} Hz, {} 声道, {} 位, 总采样数={}",
            fmt.sample_rate, fmt.channels, fmt.bits_per_sample, total_samples,
        );

        self.streams = vec![stream];
        self.block_align = fmt.block_align;
        self.sample_rate = fmt.sample_rate;
        self.data_pos = 0;

        Ok(())
    }

    fn streams(&self) -> &[Stream] {
        &self.streams
    }

    fn read_packet(&mut self, io: &mut IoContext) -> SuResult<suyin_codec::Packet> {
        if self.data_pos >= self.data_size {
            return Err(SuError::Eof);
        }

        // 计算本次读取大小 (不超过剩余数据, 对齐到 block_align)
        let ba = u64::from(self.block_align);
        let packet_bytes = ba * u64::from(self.packet_samples);
        let remaining = self.data_size - self.data_pos;
        let read_size = packet_bytes.min(remaining) / ba * ba;

        if read_size == 0 {
            return Err(SuError::Eof);
        }

        let data = io.read_bytes(read_size as usize)?;

        let sample_offset = self.data_pos / ba;
        let nb_samples = read_size / ba;

        let mut pkt = suyin_codec::Packet::from_data(bytes::Bytes::from(data));
        pkt.stream_index = 0;
        pkt.pts = sample_offset as i64;
        pkt.dts = pkt.pts;
        pkt.duration = nb_samples as i64;
        pkt.time_base = Rational::new(1, self.sample_rate as i32);
        pkt.is_keyframe = true;
        pkt.pos = (self.data_offset + self.data_pos) as i64;

        self.data_pos += read_size;

        Ok(pkt)
    }

    fn seek(
        &mut self,
        io: &mut IoContext,
        _stream_index: usize,
        timestamp: i64,
        _flags: SeekFlags,
    ) -> SuResult<()> {
        if !io.is_seekable() {
            return Err(SuError::Unsupported("不支持在非可寻址流上 seek".into()));
        }

        // 时间基为 1/sample_rate, 时间戳即采样偏移; 对齐到 block_align
        let ba = u64::from(self.block_align);
        let byte_offset = (timestamp.max(0) as u64 * ba).min(self.data_size);
        let aligned_offset = byte_offset / ba * ba;

        io.seek(std::io::SeekFrom::Start(self.data_offset + aligned_offset))?;
        self.data_pos = aligned_offset;

        debug!(
            "WAV seek: 目标采样={}, 字节偏移={}",
            timestamp, aligned_offset
        );
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        if self.sample_rate > 0 && self.block_align > 0 {
            let total_samples = self.data_size / u64::from(self.block_align);
            Some(total_samples as f64 / f64::from(self.sample_rate))
        } else {
            None
        }
    }
}

/// WAV 格式探测器
pub struct WavProbe;

impl FormatProbe for WavProbe {
    fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeScore> {
        // 检查 RIFF/WAVE 魔数
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE" {
            return Some(SCORE_MAX);
        }

        // 仅根据扩展名
        if let Some(name) = filename {
            let lower = name.to_ascii_lowercase();
            if FormatId::Wav
                .extensions()
                .iter()
                .any(|ext| lower.ends_with(&format!(".{ext}")))
            {
                return Some(SCORE_EXTENSION);
            }
        }

        None
    }

    fn format_id(&self) -> FormatId {
        FormatId::Wav
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryBackend;

    /// 构建最简单的 WAV 文件数据 (PCM S16LE, 单声道, 44100Hz)
    fn make_simple_wav(pcm_data: &[u8]) -> Vec<u8> {
        make_wav(pcm_data, 1, 44100, 16, None)
    }

    /// 构建 WAV 文件数据, 可选扩展头
    fn make_wav(
        pcm_data: &[u8],
        channels: u16,
        sample_rate: u32,
        bits_per_sample: u16,
        channel_mask: Option<u32>,
    ) -> Vec<u8> {
        let data_size = pcm_data.len() as u32;
        let block_align = channels * (bits_per_sample / 8);
        let byte_rate = sample_rate * u32::from(block_align);
        let extensible = channel_mask.is_some();
        let fmt_size: u32 = if extensible { 40 } else { 16 };
        let file_size = 20 + fmt_size + 8 + data_size;

        let mut buf = Vec::new();
        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");
        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&fmt_size.to_le_bytes());
        let format_code: u16 = if extensible { WAV_FORMAT_EXTENSIBLE } else { 1 };
        buf.extend_from_slice(&format_code.to_le_bytes());
        buf.extend_from_slice(&channels.to_le_bytes());
        buf.extend_from_slice(&sample_rate.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());
        if let Some(mask) = channel_mask {
            buf.extend_from_slice(&22u16.to_le_bytes()); // cbSize
            buf.extend_from_slice(&bits_per_sample.to_le_bytes()); // valid bits
            buf.extend_from_slice(&mask.to_le_bytes());
            // KSDATAFORMAT_SUBTYPE_PCM 的前 2 字节为格式码
            let mut guid = [0u8; 16];
            guid[0] = 0x01;
            buf.extend_from_slice(&guid);
        }
        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        buf.extend_from_slice(pcm_data);
        buf
    }

    fn open_wav(data: Vec<u8>, options: &[(String, String)]) -> (IoContext, Box<dyn Demuxer>) {
        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(data)));
        let mut demuxer = WavDemuxer::create().unwrap();
        demuxer.open(&mut io, options).unwrap();
        (io, demuxer)
    }

    #[test]
    fn test_探测_wav_魔数() {
        let wav = make_simple_wav(&[0; 4]);
        let probe = WavProbe;
        assert_eq!(probe.probe(&wav, None), Some(SCORE_MAX));
    }

    #[test]
    fn test_探测_wav_扩展名() {
        let probe = WavProbe;
        assert_eq!(probe.probe(&[], Some("test.wav")), Some(SCORE_EXTENSION));
        assert_eq!(probe.probe(&[], Some("test.mp3")), None);
    }

    #[test]
    fn test_解封装_基本流信息() {
        // 4 采样的 S16LE 单声道数据 = 8 字节
        let pcm = vec![0x00, 0x01, 0xFF, 0x7F, 0x00, 0x80, 0x01, 0x00];
        let (_io, demuxer) = open_wav(make_simple_wav(&pcm), &[]);

        let streams = demuxer.streams();
        assert_eq!(streams.len(), 1);

        let s = &streams[0];
        assert_eq!(s.media_type, MediaType::Audio);
        assert_eq!(s.codec_id, CodecId::PcmS16le);
        assert_eq!(s.duration, 4); // 8 字节 / 2 block_align = 4 采样
    }

    #[test]
    fn test_解封装_读取数据包() {
        let pcm = vec![0x00, 0x01, 0xFF, 0x7F, 0x00, 0x80, 0x01, 0x00];
        let (mut io, mut demuxer) = open_wav(make_simple_wav(&pcm), &[]);

        let pkt = demuxer.read_packet(&mut io).unwrap();
        assert_eq!(&pkt.data[..], &pcm[..]);
        assert_eq!(pkt.pts, 0);
        assert_eq!(pkt.duration, 4);
        assert!(pkt.is_keyframe);

        // 下一次读取应该返回 EOF
        let err = demuxer.read_packet(&mut io).unwrap_err();
        assert!(matches!(err, SuError::Eof));
    }

    #[test]
    fn test_解封装_packet_samples_选项() {
        let pcm = vec![0u8; 2 * 1024]; // 1024 个 S16 单声道采样
        let options = vec![("packet_samples".to_string(), "256".to_string())];
        let (mut io, mut demuxer) = open_wav(make_simple_wav(&pcm), &options);

        let mut packets = 0;
        loop {
            match demuxer.read_packet(&mut io) {
                Ok(pkt) => {
                    assert_eq!(pkt.duration, 256);
                    packets += 1;
                }
                Err(SuError::Eof) => break,
                Err(e) => panic!("读包失败: {e}"),
            }
        }
        assert_eq!(packets, 4);
    }

    #[test]
    fn test_解封装_无效选项报错() {
        let pcm = vec![0u8; 8];
        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(make_simple_wav(&pcm))));
        let mut demuxer = WavDemuxer::create().unwrap();
        let options = vec![("packet_samples".to_string(), "abc".to_string())];
        let err = demuxer.open(&mut io, &options).unwrap_err();
        assert!(matches!(err, SuError::InvalidArgument(_)));
    }

    #[test]
    fn test_解封装_扩展头声道掩码() {
        // 5.1 声道掩码 = 0x3F
        let pcm = vec![0u8; 6 * 2 * 4];
        let wav = make_wav(&pcm, 6, 48000, 16, Some(0x3F));
        let (_io, demuxer) = open_wav(wav, &[]);

        let s = &demuxer.streams()[0];
        assert_eq!(s.codec_id, CodecId::PcmS16le);
        let audio = s.audio.as_ref().unwrap();
        assert_eq!(audio.channel_layout, ChannelLayout::SURROUND_5_1);
    }

    #[test]
    fn test_解封装_seek_按采样定位() {
        let pcm: Vec<u8> = (0..200u16).flat_map(|v| v.to_le_bytes()).collect();
        let options = vec![("packet_samples".to_string(), "50".to_string())];
        let (mut io, mut demuxer) = open_wav(make_simple_wav(&pcm), &options);

        demuxer.seek(&mut io, 0, 100, SeekFlags::backward()).unwrap();
        let pkt = demuxer.read_packet(&mut io).unwrap();
        assert_eq!(pkt.pts, 100);
        assert_eq!(&pkt.data[..2], &100u16.to_le_bytes());
    }

    #[test]
    fn test_非_riff_文件报错() {
        let bad = b"NOT_RIFF_DATA_HERE".to_vec();
        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(bad)));
        let mut demuxer = WavDemuxer::create().unwrap();
        let err = demuxer.open(&mut io, &[]).unwrap_err();
        assert!(matches!(err, SuError::InvalidData(_)));
    }
}
