//! 采样精确音频源 (C5 + C6).
//!
//! `AudioSource` 是对外的核心类型: 打开时建立 (或加载) 音轨索引,
//! 之后以帧序号或采样区间提供精确随机访问.
//!
//! seek 调度流程概述:
//! 1. 有解码器已处于 [seek 目标, 请求帧] 区间内时直接线性推进
//! 2. seek 目标落在流起始 100 帧以内时直接线性解码, 避开起始区的容器怪癖
//! 3. 否则 seek 到目标帧之前最近的 PTS 已知帧, 用解码帧的摘要串
//!    对照索引辨识落点; 重复摘要以最多 10 帧的摘要串消歧
//! 4. 落点不存在、越过目标或无法唯一辨识时, 把该 seek 点记为不可用,
//!    向前至少 100 帧重试; 重试次数用尽后永久切换线性解码
//! 5. seek 后的线性解码逐帧核对摘要, 不符同样按 #4 处理

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use suyin_codec::{AudioFrame, CodecRegistry};
use suyin_core::{ChannelLayout, SuError, SuResult};
use suyin_format::{FormatRegistry, IoContext};

use crate::cache::{FrameCache, DEFAULT_MAX_CACHE_BYTES};
use crate::decoder::{DecoderConfig, FileSource, LinearDecoder, MediaSource};
use crate::hash::{frame_digest, FrameHash};
use crate::index::{default_index_path, IndexIdentity, TrackIndex};

/// 解码槽数量上限
pub const MAX_DECODERS: usize = 3;
/// seek 重试次数上限, 超过即永久切换线性解码
const RETRY_SEEK_ATTEMPTS: usize = 3;
/// seek 目标的最小帧序号, 流起始区交给线性解码
const SEEK_TARGET_FLOOR: i64 = 100;
/// 摘要串消歧窗口上限
const MAX_MATCH_WINDOW: usize = 10;
/// 默认 seek 预滚帧数
const DEFAULT_PREROLL: i64 = 20;

/// 音频属性, 打开后不再变化
#[derive(Debug, Clone)]
pub struct AudioProperties {
    /// 采样是否为浮点族
    pub is_float: bool,
    /// 每采样字节数
    pub bytes_per_sample: u32,
    /// 有效位数
    pub bits_per_sample: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道数
    pub channels: u32,
    /// 声道布局
    pub channel_layout: ChannelLayout,
    /// 总采样数 (索引建成后为权威值)
    pub num_samples: i64,
    /// 总帧数
    pub num_frames: i64,
    /// 起始时间 (秒)
    pub start_time: f64,
    /// 已解析的音轨号
    pub track: usize,
}

/// 打开选项
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// 音轨号. 负数按音频流序号自动选择: -1 为第一条音频流
    pub track: i32,
    /// 是否允许流中途变更格式
    pub variable_format: bool,
    /// 解码线程数, 0 表示取硬件并行度 (上限 16)
    pub threads: u32,
    /// 动态范围压缩缩放 (AC-3 族解码器使用)
    pub drc_scale: f64,
    /// 透传的解封装选项
    pub demux_options: Vec<(String, String)>,
    /// 索引缓存文件路径, None 时派生自源文件路径
    pub index_path: Option<PathBuf>,
    /// 帧缓存字节上限
    pub max_cache_bytes: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            track: -1,
            variable_format: false,
            threads: 0,
            drc_scale: 1.0,
            demux_options: Vec::new(),
            index_path: None,
            max_cache_bytes: DEFAULT_MAX_CACHE_BYTES,
        }
    }
}

/// 索引构建进度回调: (音轨号, 当前字节, 总字节).
/// 完成时以 (i64::MAX, i64::MAX) 收尾.
pub type ProgressCallback<'a> = &'a mut dyn FnMut(u32, i64, i64);

/// 采样精确音频源
pub struct AudioSource {
    /// 媒体来源, 解码槽重建时反复打开
    source: Box<dyn MediaSource>,
    /// 解码器注册表
    codecs: CodecRegistry,
    /// 解码句柄的打开配置 (音轨号已解析)
    config: DecoderConfig,
    /// 音频属性
    props: AudioProperties,
    /// 音轨索引, 打开后不可变
    index: TrackIndex,
    /// 解码帧缓存
    cache: FrameCache,
    /// 解码槽
    decoders: [Option<LinearDecoder>; MAX_DECODERS],
    /// 各槽最近一次被选用的序号
    decoder_last_use: [u64; MAX_DECODERS],
    /// 槽选用序号发生器
    decoder_use_seq: u64,
    /// 已证实不可靠的 seek 目标
    bad_seek_targets: HashSet<i64>,
    /// 线性模式闩锁, 一旦置位不再复位
    linear_mode: bool,
    /// seek 预滚帧数
    preroll: i64,
}

impl AudioSource {
    /// 打开文件来源
    pub fn open(
        path: impl AsRef<Path>,
        options: OpenOptions,
        progress: Option<ProgressCallback<'_>>,
    ) -> SuResult<Self> {
        let mut formats = FormatRegistry::new();
        suyin_format::register_all(&mut formats);
        let mut codecs = CodecRegistry::new();
        suyin_codec::register_all(&mut codecs);

        let source = FileSource::new(
            path.as_ref().to_path_buf(),
            options.demux_options.clone(),
            Arc::new(formats),
        );
        Self::open_with(Box::new(source), codecs, options, progress)
    }

    /// 用自定义媒体源与解码器注册表打开
    pub fn open_with(
        source: Box<dyn MediaSource>,
        codecs: CodecRegistry,
        options: OpenOptions,
        mut progress: Option<ProgressCallback<'_>>,
    ) -> SuResult<Self> {
        let mut config = DecoderConfig {
            track: options.track,
            variable_format: options.variable_format,
            threads: options.threads,
            drc_scale: options.drc_scale,
        };

        let mut decoder = LinearDecoder::new(source.as_ref(), &codecs, &config)?;
        let mut props = decoder.read_properties()?;
        let track = decoder.track();
        // 之后重建的解码器绑定同一条音轨
        config.track = track as i32;

        let identity = IndexIdentity {
            track: track as u32,
            variable_format: options.variable_format,
            drc_scale: options.drc_scale,
            demux_options: options.demux_options.clone(),
        };
        let index_path = options
            .index_path
            .clone()
            .unwrap_or_else(|| default_index_path(Path::new(source.location()), track as u32));

        let index = match Self::load_index(&index_path, &identity) {
            Some(index) => index,
            None => {
                let index =
                    Self::index_track(source.as_ref(), &codecs, &config, track, &mut progress)?;
                Self::store_index(&index_path, &index, &identity);
                index
            }
        };

        // 索引是总采样数与总帧数的权威来源, 覆盖容器声明的估计值
        props.num_frames = index.len();
        props.num_samples = index.total_samples();

        let mut decoders: [Option<LinearDecoder>; MAX_DECODERS] = Default::default();
        decoders[0] = Some(decoder);

        Ok(Self {
            source,
            codecs,
            config,
            props,
            index,
            cache: FrameCache::new(options.max_cache_bytes),
            decoders,
            decoder_last_use: [0; MAX_DECODERS],
            decoder_use_seq: 1,
            bad_seek_targets: HashSet::new(),
            linear_mode: false,
            preroll: DEFAULT_PREROLL,
        })
    }

    /// 尝试加载索引缓存, 任何不可用情形都返回 None
    fn load_index(path: &Path, identity: &IndexIdentity) -> Option<TrackIndex> {
        let mut io = match IoContext::open_read(path) {
            Ok(io) => io,
            Err(_) => return None,
        };
        match TrackIndex::read(&mut io, identity) {
            Ok(Some(index)) if !index.is_empty() => {
                debug!("加载索引缓存 '{}': {} 帧", path.display(), index.len());
                Some(index)
            }
            Ok(_) => None,
            Err(e) => {
                debug!("读取索引缓存 '{}' 失败: {e}", path.display());
                None
            }
        }
    }

    /// 写回索引缓存, 失败只记日志
    fn store_index(path: &Path, index: &TrackIndex, identity: &IndexIdentity) {
        let result = IoContext::open_write(path).and_then(|mut io| index.write(&mut io, identity));
        if let Err(e) = result {
            warn!("写入索引缓存 '{}' 失败: {e}", path.display());
        }
    }

    /// 线性解码整条音轨, 为每帧记录 PTS、长度与摘要
    fn index_track(
        source: &dyn MediaSource,
        codecs: &CodecRegistry,
        config: &DecoderConfig,
        track: usize,
        progress: &mut Option<ProgressCallback<'_>>,
    ) -> SuResult<TrackIndex> {
        let mut decoder = LinearDecoder::new(source, codecs, config)?;
        let file_size = if progress.is_some() {
            decoder.source_size()
        } else {
            -1
        };

        let mut index = TrackIndex::new();
        while let Some(frame) = decoder.next_frame() {
            index.push(frame.pts, i64::from(frame.nb_samples), frame_digest(&frame));
            if let Some(cb) = progress.as_mut() {
                cb(track as u32, decoder.source_position(), file_size);
            }
        }
        if let Some(cb) = progress.as_mut() {
            cb(track as u32, i64::MAX, i64::MAX);
        }

        if index.is_empty() {
            return Err(SuError::Index(format!(
                "为 '{}' 音轨 #{} 建立索引失败: 没有解出任何帧",
                source.location(),
                track
            )));
        }
        debug!("索引建立完成: {} 帧, {} 采样", index.len(), index.total_samples());
        Ok(index)
    }

    /// 音频属性
    pub fn properties(&self) -> &AudioProperties {
        &self.props
    }

    /// 已解析的音轨号
    pub fn track(&self) -> usize {
        self.props.track
    }

    /// 音轨索引 (只读)
    pub fn index(&self) -> &TrackIndex {
        &self.index
    }

    /// 更新帧缓存字节上限, 立即执行逐出
    pub fn set_max_cache_size(&mut self, bytes: usize) {
        self.cache.set_max_bytes(bytes);
    }

    /// 更新 seek 预滚帧数 (负值按 0 处理)
    pub fn set_seek_preroll(&mut self, frames: i64) {
        self.preroll = frames.max(0);
    }

    /// 按帧序号取一帧
    ///
    /// 序号越界返回 `Ok(None)`; 无法恢复的摘要不一致同样返回 `Ok(None)`.
    /// `linear` 为 true 时跳过 seek 调度, 直接线性推进.
    pub fn get_frame(&mut self, n: i64, linear: bool) -> SuResult<Option<AudioFrame>> {
        if n < 0 || n >= self.props.num_frames {
            return Ok(None);
        }
        if let Some(frame) = self.cache.get(n) {
            return Ok(Some(frame));
        }
        if linear || self.linear_mode {
            self.get_frame_linear(n, -1, 0, false)
        } else {
            self.get_frame_internal(n)
        }
    }

    /// 永久切换到线性模式: 清空缓存并丢弃全部解码器
    fn set_linear_mode(&mut self) {
        if !self.linear_mode {
            debug!("已永久切换到线性解码模式");
            self.linear_mode = true;
            self.cache.clear();
            for slot in &mut self.decoders {
                *slot = None;
            }
        }
    }

    /// 从 `n - preroll` 向前找最近的可用 seek 目标
    ///
    /// 可用意味着 PTS 已知且未被记为坏 seek 点; 不低于 100 帧的下限
    /// 把流起始区排除在外. 找不到返回 -1.
    fn seek_frame_target(&self, n: i64) -> i64 {
        let mut i = n - self.preroll;
        while i >= SEEK_TARGET_FLOOR {
            let frame = &self.index.frames[i as usize];
            if frame.has_known_pts() && !self.bad_seek_targets.contains(&i) {
                return i;
            }
            i -= 1;
        }
        -1
    }

    /// 选择空槽, 没有空槽时选择最久未用槽
    fn pick_slot(&self) -> usize {
        let mut empty = None;
        let mut least_recent = 0;
        for i in 0..MAX_DECODERS {
            if self.decoders[i].is_none() {
                empty = Some(i);
            }
            if self.decoders[i].is_some()
                && self.decoder_last_use[i] < self.decoder_last_use[least_recent]
            {
                least_recent = i;
            }
        }
        empty.unwrap_or(least_recent)
    }

    fn next_use_seq(&mut self) -> u64 {
        let seq = self.decoder_use_seq;
        self.decoder_use_seq += 1;
        seq
    }

    fn new_decoder(&self) -> SuResult<LinearDecoder> {
        LinearDecoder::new(self.source.as_ref(), &self.codecs, &self.config)
    }

    /// seek 调度入口
    fn get_frame_internal(&mut self, n: i64) -> SuResult<Option<AudioFrame>> {
        if self.linear_mode {
            return self.get_frame_linear(n, -1, 0, false);
        }

        // #2 seek 目标离流起始太近时直接线性解码
        let seek_target = self.seek_frame_target(n);
        if seek_target < SEEK_TARGET_FLOOR {
            return self.get_frame_linear(n, -1, 0, false);
        }

        // #1 已有解码器处于最优区间内, 不需要 seek
        let nearby = self
            .decoders
            .iter()
            .flatten()
            .any(|d| d.current_frame() <= n && d.current_frame() >= seek_target);
        if nearby {
            return self.get_frame_linear(n, -1, 0, false);
        }

        // #3 取一个槽用于 seek, 原位置无关紧要
        let idx = self.pick_slot();
        if self.decoders[idx].is_none() {
            self.decoders[idx] = Some(self.new_decoder()?);
        }
        self.decoder_last_use[idx] = self.next_use_seq();

        self.seek_and_decode(n, seek_target, idx, 0)
    }

    /// 坏 seek 点之后的统一重试路径
    ///
    /// 深度未耗尽时向前至少 100 帧另选目标; 新目标跌破下限就换
    /// 新解码器走线性; 深度耗尽则永久切换线性模式.
    fn retry_seek(
        &mut self,
        n: i64,
        seek_target: i64,
        idx: usize,
        depth: usize,
        force_unseeked_on_latch: bool,
    ) -> SuResult<Option<AudioFrame>> {
        if depth < RETRY_SEEK_ATTEMPTS {
            let next_target = self.seek_frame_target(seek_target - SEEK_TARGET_FLOOR);
            debug!("重试 seek (目标帧 {n}, 新 seek 点 {next_target})");
            if next_target < SEEK_TARGET_FLOOR {
                self.decoders[idx] = None;
                self.get_frame_linear(n, -1, 0, false)
            } else {
                self.seek_and_decode(n, next_target, idx, depth + 1)
            }
        } else {
            debug!("seek 重试次数用尽 (目标帧 {n}, seek 点 {seek_target})");
            self.set_linear_mode();
            self.get_frame_linear(n, -1, 0, force_unseeked_on_latch)
        }
    }

    /// seek 到指定目标并以摘要串辨识落点
    fn seek_and_decode(
        &mut self,
        n: i64,
        seek_target: i64,
        idx: usize,
        depth: usize,
    ) -> SuResult<Option<AudioFrame>> {
        let pts = self.index.frames[seek_target as usize].pts;
        let seek_ok = match self.decoders[idx].as_mut() {
            Some(d) => d.seek(pts),
            None => false,
        };
        if !seek_ok {
            debug!("流不可 seek, 永久切换线性解码 (目标帧 {n})");
            self.set_linear_mode();
            return self.get_frame_linear(n, -1, 0, false);
        }

        // 便宜地烧掉一半预滚
        let half_preroll = self.preroll / 2;
        if half_preroll > 0 {
            if let Some(d) = self.decoders[idx].as_mut() {
                d.skip_frames(half_preroll);
            }
        }

        // 落点辨识缓冲: 已解码帧与它们的摘要
        let mut match_frames: Vec<(AudioFrame, FrameHash)> = Vec::new();

        loop {
            let decoded = match self.decoders[idx].as_mut() {
                Some(d) => d.next_frame(),
                None => None,
            };
            let got_frame = decoded.is_some();

            if !got_frame && match_frames.is_empty() {
                self.bad_seek_targets.insert(seek_target);
                debug!("seek 后解不出任何帧, 记为坏 seek 点 (目标帧 {n}, seek 点 {seek_target})");
                return self.retry_seek(n, seek_target, idx, depth, false);
            }

            if let Some(frame) = decoded {
                let digest = frame_digest(&frame);
                match_frames.push((frame, digest));
            }

            let num_frames = self.index.len();
            let window = match_frames.len() as i64;
            let mut matches: Vec<i64> = Vec::new();
            if got_frame {
                for i in 0..=(num_frames - window) {
                    let hit = (0..window).all(|j| {
                        match_frames[j as usize].1 == self.index.frames[(i + j) as usize].hash
                    });
                    if hit {
                        matches.push(i);
                    }
                }
            } else if window <= num_frames {
                // 解码器已尽, 只可能落在流尾
                let i = num_frames - window;
                let hit = (0..window)
                    .all(|j| match_frames[j as usize].1 == self.index.frames[(i + j) as usize].hash);
                if hit {
                    matches.push(i);
                }
            }

            // #4 没有候选落在目标之前, 或候选无法唯一辨识, 都要重试
            let suitable = matches.iter().any(|&i| i <= n);
            let undeterminable =
                matches.len() > 1 && (!got_frame || match_frames.len() >= MAX_MATCH_WINDOW);

            if !suitable || undeterminable {
                if undeterminable {
                    debug!("seek 落点无法唯一辨识 (目标帧 {n}, seek 点 {seek_target})");
                } else if matches.is_empty() {
                    debug!("seek 落点解出的帧与索引不符 (目标帧 {n}, seek 点 {seek_target})");
                } else {
                    debug!("seek 落点越过目标帧 (目标帧 {n}, seek 点 {seek_target})");
                }
                self.bad_seek_targets.insert(seek_target);
                return self.retry_seek(n, seek_target, idx, depth, false);
            }

            if matches.len() == 1 {
                let matched_n = matches[0];
                if matched_n < SEEK_TARGET_FLOOR {
                    debug!("落点在流起始 {SEEK_TARGET_FLOOR} 帧以内, 不符合预期 (落点 {matched_n})");
                }

                // 落点已知, 回填解码器位置
                let end = matched_n + window;
                let end_sample = if end < num_frames {
                    self.index.frames[end as usize].start
                } else {
                    self.index.total_samples()
                };
                if let Some(d) = self.decoders[idx].as_mut() {
                    d.set_position(end, end_sample);
                }

                // 预滚区间内的帧进缓存, 目标帧留作返回值
                let mut ret = None;
                for (k, (frame, _)) in match_frames.into_iter().enumerate() {
                    let frame_no = matched_n + k as i64;
                    if frame_no >= n - self.preroll {
                        if frame_no == n {
                            ret = Some(frame.clone());
                        }
                        self.cache.insert(frame_no, frame);
                    }
                }
                if ret.is_some() {
                    return Ok(ret);
                }
                // 剩下的路交给线性解码, 带上 seek 点以便后续摘要不符时问责
                return self.get_frame_linear(n, seek_target, 0, false);
            }

            // 多个候选, 再解一帧扩大摘要串继续区分
        }
    }

    /// 线性解码路径
    ///
    /// 选择序号不超过 n 且最接近 n 的解码器 (必要时新建),
    /// 预滚区间外用丢帧快进, 预滚区间内逐帧核对摘要并写缓存.
    fn get_frame_linear(
        &mut self,
        n: i64,
        seek_target: i64,
        depth: usize,
        force_unseeked: bool,
    ) -> SuResult<Option<AudioFrame>> {
        // 选择合适的已有解码器
        let mut chosen: Option<usize> = None;
        for i in 0..MAX_DECODERS {
            if let Some(dec) = &self.decoders[i] {
                if (!force_unseeked || !dec.has_seeked()) && dec.current_frame() <= n {
                    let better = match chosen {
                        None => true,
                        Some(cur) => self.decoders[cur]
                            .as_ref()
                            .is_some_and(|c| c.current_frame() < dec.current_frame()),
                    };
                    if better {
                        chosen = Some(i);
                    }
                }
            }
        }

        let idx = match chosen {
            Some(i) => i,
            None => {
                let slot = self.pick_slot();
                self.decoders[slot] = Some(self.new_decoder()?);
                slot
            }
        };
        self.decoder_last_use[idx] = self.next_use_seq();

        let mut ret: Option<AudioFrame> = None;

        loop {
            let Some(dec) = self.decoders[idx].as_ref() else {
                break;
            };
            let frame_no = dec.current_frame();
            if frame_no > n || !dec.has_more_frames() {
                break;
            }

            if frame_no >= n - self.preroll {
                let decoded = self.decoders[idx].as_mut().and_then(|d| d.next_frame());

                // 最核心的一致性校验: 捕捉 seek 落点辨识成功之后
                // 解码器仍然乱序出帧的情形
                let expected = self.index.frames[frame_no as usize].hash;
                let verified = decoded
                    .as_ref()
                    .is_some_and(|f| frame_digest(f) == expected);

                if !verified {
                    let seeked = self.decoders[idx]
                        .as_ref()
                        .is_some_and(|d| d.has_seeked());
                    if seeked {
                        debug!(
                            "线性解码的帧与索引摘要不符, 记坏 seek 点 (目标帧 {n}, 帧 {frame_no})"
                        );
                        debug_assert!(seek_target >= 0);
                        self.bad_seek_targets.insert(seek_target);
                        return self.retry_seek(n, seek_target, idx, depth, true);
                    }
                    warn!(
                        "未 seek 的线性解码得到与索引不符的帧, 无法恢复; \
                         可尝试删除索引缓存或把线程数设为 1 (目标帧 {n}, 帧 {frame_no})"
                    );
                    return Ok(None);
                }

                if let Some(frame) = decoded {
                    if frame_no == n {
                        ret = Some(frame.clone());
                    }
                    self.cache.insert(frame_no, frame);
                }
            } else if let Some(d) = self.decoders[idx].as_mut() {
                d.skip_frames(n - self.preroll - frame_no);
            }

            // 到达流尾的解码器立即释放槽位
            let exhausted = self.decoders[idx]
                .as_ref()
                .is_none_or(|d| !d.has_more_frames());
            if exhausted {
                self.decoders[idx] = None;
            }
        }

        Ok(ret)
    }

    /// 读取采样区间 `[start, start + count)` 到逐声道输出缓冲区
    ///
    /// 区间可以越过流的两端, 越界部分填零.
    /// 输出缓冲区必须与声道数一致, 且每个至少能容纳 count 个采样.
    pub fn get_planar(
        &mut self,
        output: &mut [&mut [u8]],
        start: i64,
        count: i64,
    ) -> SuResult<()> {
        let channels = self.props.channels as usize;
        let bytes_per_sample = self.props.bytes_per_sample as usize;

        if output.len() != channels {
            return Err(SuError::InvalidArgument(format!(
                "输出缓冲区数量 {} 与声道数 {channels} 不符",
                output.len()
            )));
        }
        if count <= 0 {
            return Ok(());
        }
        let needed = count as usize * bytes_per_sample;
        for (ch, buf) in output.iter().enumerate() {
            if buf.len() < needed {
                return Err(SuError::InvalidArgument(format!(
                    "声道 {ch} 输出缓冲区不足: 需要 {needed} 字节, 实际 {}",
                    buf.len()
                )));
            }
        }

        let mut start = start;
        let mut count = count;
        let mut written = 0usize;

        // 区间头部在流起始之前的部分填零
        if start < 0 {
            let fill = count.min(-start);
            let fill_bytes = fill as usize * bytes_per_sample;
            for buf in output.iter_mut() {
                buf[written..written + fill_bytes].fill(0);
            }
            written += fill_bytes;
            start += fill;
            count -= fill;
        }

        // 区间尾部越过流尾的部分填零; 零区起点是输出游标再往后
        // max(num_samples - start, 0) 个采样处
        let num_samples = self.props.num_samples;
        if start + count > num_samples {
            let fill = (start + count - num_samples).min(count);
            let offset = written + (num_samples - start).max(0) as usize * bytes_per_sample;
            let fill_bytes = fill as usize * bytes_per_sample;
            for buf in output.iter_mut() {
                buf[offset..offset + fill_bytes].fill(0);
            }
            count -= fill;
        }

        if count == 0 {
            return Ok(());
        }

        let Some(range) = self.index.frame_range_for_samples(start, count) else {
            return Ok(());
        };

        let mut frame_start = range.first_sample;
        for i in range.first..=range.last {
            let frame = self.get_frame(i, false)?.ok_or_else(|| {
                SuError::Internal(format!("切片所需的帧 {i} 不可用"))
            })?;
            self.scatter_frame(&frame, frame_start, output, &mut written, &mut start, &mut count)?;
            frame_start += i64::from(frame.nb_samples);
        }

        if count != 0 {
            return Err(SuError::Internal(format!(
                "切片未能提供请求的全部采样, 尚缺 {count}"
            )));
        }
        Ok(())
    }

    /// 测试用: 坏 seek 点集合
    #[cfg(test)]
    pub(crate) fn bad_seek_targets(&self) -> &HashSet<i64> {
        &self.bad_seek_targets
    }

    /// 测试用: 是否已闩锁线性模式
    #[cfg(test)]
    pub(crate) fn is_linear_mode(&self) -> bool {
        self.linear_mode
    }

    /// 测试用: 缓存负载字节数
    #[cfg(test)]
    pub(crate) fn cache_bytes(&self) -> usize {
        self.cache.total_bytes()
    }

    /// 测试用: 缓存是否含指定帧
    #[cfg(test)]
    pub(crate) fn cache_contains(&mut self, n: i64) -> bool {
        self.cache.get(n).is_some()
    }

    /// 把一帧中与 `[start, start + count)` 相交的采样散布到输出缓冲区
    fn scatter_frame(
        &self,
        frame: &AudioFrame,
        frame_start: i64,
        output: &mut [&mut [u8]],
        written: &mut usize,
        start: &mut i64,
        count: &mut i64,
    ) -> SuResult<()> {
        let nb_samples = i64::from(frame.nb_samples);
        if *start < frame_start || *start >= frame_start + nb_samples {
            return Err(SuError::Internal("切片帧与采样区间错位".into()));
        }

        let length = (*count).min(nb_samples - (*start - frame_start));
        if length <= 0 {
            return Ok(());
        }

        let bytes_per_sample = self.props.bytes_per_sample as usize;
        let in_frame = (*start - frame_start) as usize;
        let copy_bytes = length as usize * bytes_per_sample;

        if frame.is_planar() {
            let plane_off = in_frame * bytes_per_sample;
            for (ch, buf) in output.iter_mut().enumerate() {
                buf[*written..*written + copy_bytes]
                    .copy_from_slice(&frame.data[ch][plane_off..plane_off + copy_bytes]);
            }
        } else {
            // 交错存储, 逐采样拆声道
            let channels = frame.channel_layout.channels as usize;
            let src = &frame.data[0][in_frame * channels * bytes_per_sample..];
            for s in 0..length as usize {
                for (ch, buf) in output.iter_mut().enumerate() {
                    let src_off = (s * channels + ch) * bytes_per_sample;
                    let dst_off = *written + s * bytes_per_sample;
                    buf[dst_off..dst_off + bytes_per_sample]
                        .copy_from_slice(&src[src_off..src_off + bytes_per_sample]);
                }
            }
        }

        *written += copy_bytes;
        *start += length;
        *count -= length;
        Ok(())
    }
}
