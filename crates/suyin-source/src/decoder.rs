//! 线性解码句柄 (C3).
//!
//! `LinearDecoder` 把一个解封装器和一个解码器捆成只进不退的解码游标:
//! 读包、解码、丢帧、seek, 并记住下一个将要产出的帧序号与累计采样位置.
//! seek 之后位置变为未知, 由上层的摘要校验机制重新确定.

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};
use suyin_codec::{AudioFrame, CodecParameters, CodecRegistry, Decoder, DecoderOptions, Packet};
use suyin_core::{timestamp::NOPTS_VALUE, Rational, SuError, SuResult, Timestamp};
use suyin_format::{demuxer::SeekFlags, Demuxer, FormatRegistry, IoContext, Stream};

use crate::source::AudioProperties;

/// seek 之后的未知位置标记
pub const POSITION_UNKNOWN: i64 = i64::MIN;

/// 解码器线程数上限
const MAX_AUTO_THREADS: u32 = 16;

/// 媒体源
///
/// 引擎在 seek 调度过程中会反复打开同一来源 (多个解码槽, 坏 seek 后
/// 换新解码器). 本 trait 把"如何打开"抽象出来, 生产路径走文件与格式
/// 注册表, 测试可以注入行为可控的合成解封装器.
pub trait MediaSource: Send {
    /// 打开容器, 返回 I/O 上下文与已解析头部的解封装器
    fn open(&self) -> SuResult<(IoContext, Box<dyn Demuxer>)>;

    /// 来源的人类可读位置 (日志与默认索引路径使用)
    fn location(&self) -> &str;
}

/// 基于文件路径与格式注册表的媒体源
pub struct FileSource {
    /// 源文件路径
    path: PathBuf,
    /// 路径的字符串形式
    location: String,
    /// 透传的解封装选项
    demux_options: Vec<(String, String)>,
    /// 容器格式注册表
    formats: Arc<FormatRegistry>,
}

impl FileSource {
    /// 创建文件媒体源
    pub fn new(
        path: PathBuf,
        demux_options: Vec<(String, String)>,
        formats: Arc<FormatRegistry>,
    ) -> Self {
        let location = path.to_string_lossy().into_owned();
        Self {
            path,
            location,
            demux_options,
            formats,
        }
    }
}

impl MediaSource for FileSource {
    fn open(&self) -> SuResult<(IoContext, Box<dyn Demuxer>)> {
        let mut io = IoContext::open_read(&self.path)?;
        let demuxer = self
            .formats
            .open_input(&mut io, Some(&self.location), &self.demux_options)?;
        Ok((io, demuxer))
    }

    fn location(&self) -> &str {
        &self.location
    }
}

/// 解码句柄的打开配置
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// 音轨号. 负数按音频流序号自动选择: -1 为第一条音频流,
    /// -2 为第二条, 以此类推
    pub track: i32,
    /// 是否允许流中途变更格式; 为 false 时变更格式的帧被丢弃
    pub variable_format: bool,
    /// 解码线程数, 0 表示取硬件并行度 (上限 16)
    pub threads: u32,
    /// 动态范围压缩缩放 (AC-3 族), 不能为负
    pub drc_scale: f64,
}

/// 首帧确定的输出格式, 用于丢弃中途变更格式的帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameShape {
    sample_format: suyin_core::SampleFormat,
    sample_rate: u32,
    channels: u32,
}

impl FrameShape {
    fn of(frame: &AudioFrame) -> Self {
        Self {
            sample_format: frame.sample_format,
            sample_rate: frame.sample_rate,
            channels: frame.channel_layout.channels,
        }
    }
}

impl std::fmt::Debug for LinearDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearDecoder")
            .field("track", &self.track)
            .field("current_frame", &self.current_frame)
            .field("current_sample", &self.current_sample)
            .field("seeked", &self.seeked)
            .field("alive", &self.alive)
            .field("drop_changed", &self.drop_changed)
            .finish()
    }
}

/// 线性解码句柄
pub struct LinearDecoder {
    io: IoContext,
    demuxer: Box<dyn Demuxer>,
    decoder: Box<dyn Decoder>,
    /// 已解析的音轨号
    track: usize,
    /// 选中流的描述 (打开时克隆)
    stream: Stream,
    /// 下一个将要产出的帧序号
    current_frame: i64,
    /// 下一个将要产出的帧的首采样位置
    current_sample: i64,
    /// 是否执行过 seek
    seeked: bool,
    /// 是否还有帧可解 (解码失败后永久为 false)
    alive: bool,
    /// 解码器满载时暂存待重送的数据包
    pending: Option<Packet>,
    /// 是否丢弃中途变更格式的帧
    drop_changed: bool,
    /// 首帧确定的输出格式
    first_shape: Option<FrameShape>,
}

impl LinearDecoder {
    /// 打开来源并建立解码句柄
    pub fn new(
        source: &dyn MediaSource,
        codecs: &CodecRegistry,
        config: &DecoderConfig,
    ) -> SuResult<Self> {
        if config.drc_scale < 0.0 {
            return Err(SuError::InvalidArgument(format!(
                "drc_scale 不能为负: {}",
                config.drc_scale
            )));
        }

        let (io, demuxer) = source.open()?;

        let track = resolve_track(demuxer.streams(), config.track)?;
        let stream = demuxer.streams()[track].clone();
        let Some(audio) = stream.audio.as_ref() else {
            return Err(SuError::InvalidArgument(format!("流 #{track} 不是音频轨")));
        };

        let mut params = CodecParameters::new(stream.codec_id);
        params.extra_data = stream.extra_data.clone();
        params.bit_rate = audio.bit_rate;
        params.sample_rate = audio.sample_rate;
        params.channel_layout = audio.channel_layout;
        params.sample_format = audio.sample_format;
        params.frame_size = audio.frame_size;
        params.bits_per_raw_sample = audio.bits_per_raw_sample;
        params.initial_padding = audio.initial_padding;

        if config.drc_scale != 1.0 && !stream.codec_id.has_drc() {
            debug!(
                "编解码器 {} 不理解 drc_scale, 该选项只参与索引身份",
                stream.codec_id
            );
        }

        let options = DecoderOptions {
            thread_count: resolve_thread_count(config.threads),
            drc_scale: config.drc_scale,
        };

        let mut decoder = codecs.create_decoder(stream.codec_id)?;
        decoder.open(&params, &options)?;

        debug!(
            "打开 '{}' 音轨 #{}: {} ({} Hz)",
            source.location(),
            track,
            stream.codec_id,
            audio.sample_rate,
        );

        Ok(Self {
            io,
            demuxer,
            decoder,
            track,
            stream,
            current_frame: 0,
            current_sample: 0,
            seeked: false,
            alive: true,
            pending: None,
            drop_changed: !config.variable_format,
            first_shape: None,
        })
    }

    /// 已解析的音轨号
    pub fn track(&self) -> usize {
        self.track
    }

    /// 下一个将要产出的帧序号 (seek 后为 `POSITION_UNKNOWN`)
    pub fn current_frame(&self) -> i64 {
        self.current_frame
    }

    /// 下一个将要产出的帧的首采样位置 (seek 后为 `POSITION_UNKNOWN`)
    pub fn current_sample(&self) -> i64 {
        self.current_sample
    }

    /// 是否执行过 seek
    pub fn has_seeked(&self) -> bool {
        self.seeked
    }

    /// 是否还有帧可解
    pub fn has_more_frames(&self) -> bool {
        self.alive
    }

    /// 上层完成落点辨识后回填已知位置
    pub fn set_position(&mut self, frame: i64, sample: i64) {
        self.current_frame = frame;
        self.current_sample = sample;
    }

    /// 来源总字节数 (未知时为 -1), 供索引进度回调使用
    pub fn source_size(&self) -> i64 {
        self.io.size().map_or(-1, |s| s as i64)
    }

    /// 来源当前字节位置, 供索引进度回调使用
    pub fn source_position(&mut self) -> i64 {
        self.io.position().map_or(-1, |p| p as i64)
    }

    /// 读取属于选中音轨的下一个数据包, 其余流全部丢弃
    fn read_track_packet(&mut self) -> Option<Packet> {
        loop {
            match self.demuxer.read_packet(&mut self.io) {
                Ok(pkt) if pkt.stream_index == self.track => return Some(pkt),
                Ok(_) => continue,
                Err(SuError::Eof) => return None,
                Err(e) => {
                    warn!("读取数据包失败, 视为流结束: {e}");
                    return None;
                }
            }
        }
    }

    /// 解码下一帧, 失败与流尾都返回 None
    fn decode_next(&mut self) -> Option<AudioFrame> {
        loop {
            match self.decoder.receive_frame() {
                Ok(frame) => {
                    let shape = FrameShape::of(&frame);
                    match self.first_shape {
                        None => self.first_shape = Some(shape),
                        Some(first) if self.drop_changed && shape != first => {
                            warn!(
                                "丢弃中途变更格式的帧: {} -> {} ({} Hz -> {} Hz)",
                                first.sample_format,
                                shape.sample_format,
                                first.sample_rate,
                                shape.sample_rate,
                            );
                            continue;
                        }
                        Some(_) => {}
                    }
                    return Some(frame);
                }
                Err(SuError::NeedMoreData) => {
                    let packet = match self.pending.take() {
                        Some(p) => p,
                        // 流尾之后持续送空包驱动解码器吐出缓存帧
                        None => self.read_track_packet().unwrap_or_else(Packet::empty),
                    };
                    match self.decoder.send_packet(&packet) {
                        Ok(()) => {}
                        Err(SuError::NeedMoreData) => self.pending = Some(packet),
                        Err(e) => {
                            warn!("送包解码失败, 视为流结束: {e}");
                            return None;
                        }
                    }
                }
                Err(SuError::Eof) => return None,
                Err(e) => {
                    warn!("解码失败, 视为流结束: {e}");
                    return None;
                }
            }
        }
    }

    /// 产出下一帧并推进游标
    pub fn next_frame(&mut self) -> Option<AudioFrame> {
        if !self.alive {
            return None;
        }
        match self.decode_next() {
            Some(frame) => {
                self.current_frame += 1;
                self.current_sample += i64::from(frame.nb_samples);
                Some(frame)
            }
            None => {
                self.alive = false;
                None
            }
        }
    }

    /// 解码并丢弃 `count` 帧, 返回之后是否仍有帧可解
    pub fn skip_frames(&mut self, count: i64) -> bool {
        for _ in 0..count {
            if !self.alive {
                break;
            }
            match self.decode_next() {
                Some(frame) => {
                    self.current_frame += 1;
                    self.current_sample += i64::from(frame.nb_samples);
                }
                None => {
                    self.alive = false;
                    break;
                }
            }
        }
        self.alive
    }

    /// 按 PTS 向后 seek 到最近的关键帧
    ///
    /// 成功与否都会清空解码器状态并把位置标为未知;
    /// 失败意味着这条流不可 seek.
    pub fn seek(&mut self, pts: i64) -> bool {
        self.seeked = true;
        self.decoder.flush();
        self.pending = None;
        self.current_frame = POSITION_UNKNOWN;
        self.current_sample = POSITION_UNKNOWN;
        self.alive = self
            .demuxer
            .seek(&mut self.io, self.track, pts, SeekFlags::backward())
            .is_ok();
        self.alive
    }

    /// 从首帧读取音频属性
    ///
    /// 只能在游标位于帧 0 时调用, 调用后游标前进到帧 1.
    /// 属性以首帧实际解码结果为准, 容器声明的时长只作为估计,
    /// 索引建成后会被权威值覆盖.
    pub fn read_properties(&mut self) -> SuResult<AudioProperties> {
        debug_assert_eq!(self.current_frame, 0);

        let frame = self
            .next_frame()
            .ok_or_else(|| SuError::Codec("无法解码首帧".into()))?;

        if !frame.channel_layout.is_scatterable() {
            return Err(SuError::Unsupported(
                "不支持 Ambisonics 或自定义声道排列".into(),
            ));
        }

        let bytes_per_sample = frame.sample_format.bytes_per_sample();
        if bytes_per_sample == 0 {
            return Err(SuError::Unsupported("解码器返回零大小采样".into()));
        }

        let audio = self
            .stream
            .audio
            .as_ref()
            .ok_or_else(|| SuError::Internal("音频流参数缺失".into()))?;

        let bits_per_sample = if audio.bits_per_raw_sample != 0 {
            audio.bits_per_raw_sample
        } else {
            // 未声明有效位数时假定全部位都有意义
            bytes_per_sample * 8
        };

        // 按容器声明的时长估算总采样数, 减去编码器前导填充
        let num_samples = if self.stream.duration >= 0 && self.stream.time_base.is_valid() {
            let seconds = self.stream.duration as f64 * self.stream.time_base.to_f64();
            (seconds * f64::from(frame.sample_rate)).round() as i64
                - i64::from(audio.initial_padding)
        } else {
            0
        };

        let start_time = if frame.pts != NOPTS_VALUE {
            Timestamp::new(frame.pts, self.stream.time_base).to_seconds()
        } else {
            0.0
        };

        let channels = frame.channel_layout.channels;
        let channel_layout = suyin_core::ChannelLayout {
            order: suyin_core::ChannelOrder::Native,
            channels,
            mask: frame.channel_layout.resolved_mask(),
        };

        Ok(AudioProperties {
            is_float: frame.sample_format.is_float(),
            bytes_per_sample,
            bits_per_sample,
            sample_rate: frame.sample_rate,
            channels,
            channel_layout,
            num_samples,
            num_frames: 0,
            start_time,
            track: self.track,
        })
    }

    /// 选中流的 PTS 时间基
    pub fn time_base(&self) -> Rational {
        self.stream.time_base
    }
}

/// 解析音轨号: 负数按音频流序号选择
fn resolve_track(streams: &[Stream], hint: i32) -> SuResult<usize> {
    let mut track = hint;
    if track < 0 {
        for (i, stream) in streams.iter().enumerate() {
            if stream.is_audio() {
                if track == -1 {
                    track = i as i32;
                    break;
                }
                track += 1;
            }
        }
    }

    if track < 0 || track as usize >= streams.len() {
        return Err(SuError::StreamNotFound(track.max(0) as usize));
    }
    let track = track as usize;
    if !streams[track].is_audio() {
        return Err(SuError::InvalidArgument(format!("流 #{track} 不是音频轨")));
    }
    Ok(track)
}

/// 解析解码线程数: 0 表示取硬件并行度, 上限 16
fn resolve_thread_count(threads: u32) -> u32 {
    if threads >= 1 {
        threads
    } else {
        let hw = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1);
        hw.min(MAX_AUTO_THREADS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_线程数解析() {
        assert_eq!(resolve_thread_count(4), 4);
        let auto = resolve_thread_count(0);
        assert!(auto >= 1 && auto <= MAX_AUTO_THREADS);
    }
}
