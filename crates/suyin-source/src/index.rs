//! 音轨索引 (C2).
//!
//! 索引为每个解码帧记录一条 `FrameInfo`, 是随机访问的权威地图:
//! 帧序号是帧对外的唯一标识, 采样区间到帧区间的翻译,
//! 以及 seek 落点的摘要校验都以索引为准.
//!
//! 索引在打开时构建一次, 之后不可变. 缓存文件布局:
//!
//! ```text
//! magic "SYIX" + version (u32)
//! track (u32) + variable_format (u8) + drc_scale (f64 位模式, u64)
//! demux_option_count (u32) + (key, value) 字符串对 × N
//! frame_count (i64)
//! frames[frame_count]: hash[16] + pts (i64) + length (i64)
//! ```
//!
//! `start` 不落盘, 加载时按长度累加重建. 身份字段与调用方的打开
//! 参数逐字节比较, 任何不一致都视为索引不可用并触发重建.

use std::path::{Path, PathBuf};

use log::debug;
use suyin_core::{timestamp::NOPTS_VALUE, SuError, SuResult};
use suyin_format::IoContext;

use crate::hash::FrameHash;

/// 索引缓存文件魔数
const INDEX_MAGIC: &[u8; 4] = b"SYIX";
/// 索引缓存文件版本
const INDEX_VERSION: u32 = 1;
/// 索引缓存文件扩展名
const INDEX_EXTENSION: &str = "syidx";

/// 单帧索引记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    /// 显示时间戳 (流时间基单位), `NOPTS_VALUE` 表示未知
    pub pts: i64,
    /// 本帧首采样的累计采样偏移
    pub start: i64,
    /// 本帧的采样数 (> 0)
    pub length: i64,
    /// 解码负载的内容摘要
    pub hash: FrameHash,
}

/// 索引身份
///
/// 打开参数中影响解码输出的部分. 缓存文件记录构建时的身份,
/// 加载时与当前参数不符即重建 (例如 `drc_scale` 不同会改变
/// 解码出的 PCM, 进而改变全部摘要).
#[derive(Debug, Clone, PartialEq)]
pub struct IndexIdentity {
    /// 已解析的音轨号
    pub track: u32,
    /// 是否允许流中途变更格式
    pub variable_format: bool,
    /// 动态范围压缩缩放
    pub drc_scale: f64,
    /// 透传的解封装选项
    pub demux_options: Vec<(String, String)>,
}

/// 采样区间翻译结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    /// 覆盖区间的首帧序号
    pub first: i64,
    /// 覆盖区间的末帧序号 (含)
    pub last: i64,
    /// 首帧的首采样偏移
    pub first_sample: i64,
}

/// 音轨索引
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackIndex {
    /// 按帧序号排列的密集记录
    pub frames: Vec<FrameInfo>,
}

impl TrackIndex {
    /// 创建空索引
    pub fn new() -> Self {
        Self::default()
    }

    /// 帧数量
    pub fn len(&self) -> i64 {
        self.frames.len() as i64
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// 按帧序号取记录
    pub fn frame(&self, n: i64) -> Option<&FrameInfo> {
        usize::try_from(n).ok().and_then(|i| self.frames.get(i))
    }

    /// 总采样数 (末帧 start + length)
    pub fn total_samples(&self) -> i64 {
        self.frames
            .last()
            .map_or(0, |last| last.start + last.length)
    }

    /// 追加一帧记录, `start` 由累计采样数自动填充
    pub fn push(&mut self, pts: i64, length: i64, hash: FrameHash) {
        let start = self.total_samples();
        self.frames.push(FrameInfo {
            pts,
            start,
            length,
            hash,
        });
    }

    /// 将采样区间 `[start, start + count)` 翻译为覆盖它的帧区间
    ///
    /// 返回的首帧满足 `first_sample <= start < first_sample + length`
    /// (start 为负时首帧为 0). `count <= 0` 或起点超出流尾返回 None.
    pub fn frame_range_for_samples(&self, start: i64, count: i64) -> Option<FrameRange> {
        let num_samples = self.total_samples();
        if count <= 0 || start >= num_samples || self.frames.is_empty() {
            return None;
        }

        let first = if start < 0 { 0 } else { self.frame_at_sample(start)? };

        let end_pos = start + count;
        let last = if end_pos >= num_samples {
            self.len() - 1
        } else {
            self.frame_at_sample(end_pos - 1)?
        };

        Some(FrameRange {
            first,
            last,
            first_sample: self.frames[first as usize].start,
        })
    }

    /// 找到覆盖给定采样位置的帧序号
    fn frame_at_sample(&self, sample: i64) -> Option<i64> {
        // frames 按 start 单调排列, 取最后一个 start <= sample 的帧
        let idx = self.frames.partition_point(|f| f.start <= sample);
        if idx == 0 {
            return None;
        }
        let frame = &self.frames[idx - 1];
        if sample < frame.start + frame.length {
            Some((idx - 1) as i64)
        } else {
            None
        }
    }

    /// 把索引写入缓存文件
    pub fn write(&self, io: &mut IoContext, identity: &IndexIdentity) -> SuResult<()> {
        io.write_tag(INDEX_MAGIC)?;
        io.write_u32_le(INDEX_VERSION)?;
        io.write_u32_le(identity.track)?;
        io.write_u8(identity.variable_format as u8)?;
        io.write_u64_le(identity.drc_scale.to_bits())?;

        io.write_u32_le(identity.demux_options.len() as u32)?;
        for (key, value) in &identity.demux_options {
            io.write_string(key)?;
            io.write_string(value)?;
        }

        io.write_i64_le(self.len())?;
        for frame in &self.frames {
            io.write_all(&frame.hash)?;
            io.write_i64_le(frame.pts)?;
            io.write_i64_le(frame.length)?;
        }
        Ok(())
    }

    /// 从缓存文件读取索引
    ///
    /// 身份不符或文件损坏都返回 `Ok(None)`, 由调用方重建;
    /// 只有底层 I/O 故障才作为错误传播.
    pub fn read(io: &mut IoContext, identity: &IndexIdentity) -> SuResult<Option<Self>> {
        match Self::read_inner(io, identity) {
            Ok(index) => Ok(index),
            Err(SuError::Eof) | Err(SuError::InvalidData(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn read_inner(io: &mut IoContext, identity: &IndexIdentity) -> SuResult<Option<Self>> {
        if &io.read_tag()? != INDEX_MAGIC {
            debug!("索引缓存魔数不符");
            return Ok(None);
        }
        if io.read_u32_le()? != INDEX_VERSION {
            debug!("索引缓存版本不符");
            return Ok(None);
        }
        if io.read_u32_le()? != identity.track {
            debug!("索引缓存音轨号不符");
            return Ok(None);
        }
        if io.read_u8()? != identity.variable_format as u8 {
            debug!("索引缓存 variable_format 不符");
            return Ok(None);
        }
        if io.read_u64_le()? != identity.drc_scale.to_bits() {
            debug!("索引缓存 drc_scale 不符");
            return Ok(None);
        }

        let option_count = io.read_u32_le()? as usize;
        let mut cached_options = Vec::with_capacity(option_count.min(64));
        for _ in 0..option_count {
            let key = io.read_string()?;
            let value = io.read_string()?;
            cached_options.push((key, value));
        }
        if cached_options != identity.demux_options {
            debug!("索引缓存解封装选项不符");
            return Ok(None);
        }

        let frame_count = io.read_i64_le()?;
        if frame_count < 0 {
            return Ok(None);
        }

        let mut index = Self::new();
        index.frames.reserve(frame_count.min(1 << 20) as usize);
        for _ in 0..frame_count {
            let mut hash = [0u8; 16];
            io.read_exact(&mut hash)?;
            let pts = io.read_i64_le()?;
            let length = io.read_i64_le()?;
            if length <= 0 {
                debug!("索引缓存包含非正帧长, 视为损坏");
                return Ok(None);
            }
            index.push(pts, length, hash);
        }
        Ok(Some(index))
    }
}

impl FrameInfo {
    /// PTS 是否已知 (只有 PTS 已知的帧能作为 seek 目标)
    pub fn has_known_pts(&self) -> bool {
        self.pts != NOPTS_VALUE
    }
}

/// 默认索引缓存路径: `<源文件>.<音轨号>.syidx`
pub fn default_index_path(source: &Path, track: u32) -> PathBuf {
    let mut name = source.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{track}.{INDEX_EXTENSION}"));
    source.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use suyin_format::io::MemoryBackend;

    fn make_index(lengths: &[i64]) -> TrackIndex {
        let mut index = TrackIndex::new();
        for (i, &len) in lengths.iter().enumerate() {
            index.push(i as i64 * 1000, len, [i as u8; 16]);
        }
        index
    }

    fn identity() -> IndexIdentity {
        IndexIdentity {
            track: 0,
            variable_format: false,
            drc_scale: 1.0,
            demux_options: vec![("packet_samples".into(), "1024".into())],
        }
    }

    #[test]
    fn test_索引_采样连续性() {
        let index = make_index(&[100, 200, 50]);
        assert_eq!(index.frames[0].start, 0);
        for i in 1..index.frames.len() {
            assert_eq!(
                index.frames[i].start,
                index.frames[i - 1].start + index.frames[i - 1].length
            );
        }
        assert_eq!(index.total_samples(), 350);
    }

    #[test]
    fn test_索引_区间翻译_单帧内() {
        let index = make_index(&[100, 200, 50]);
        let range = index.frame_range_for_samples(120, 30).unwrap();
        assert_eq!(range, FrameRange { first: 1, last: 1, first_sample: 100 });
    }

    #[test]
    fn test_索引_区间翻译_跨帧() {
        let index = make_index(&[100, 200, 50]);
        let range = index.frame_range_for_samples(50, 280).unwrap();
        assert_eq!(range, FrameRange { first: 0, last: 2, first_sample: 0 });
    }

    #[test]
    fn test_索引_区间翻译_帧边界() {
        let index = make_index(&[100, 200, 50]);
        // 恰好从第二帧首采样开始
        let range = index.frame_range_for_samples(100, 200).unwrap();
        assert_eq!(range, FrameRange { first: 1, last: 1, first_sample: 100 });
        // 区间终点恰好是第二帧末采样
        let range = index.frame_range_for_samples(99, 2).unwrap();
        assert_eq!(range, FrameRange { first: 0, last: 1, first_sample: 0 });
    }

    #[test]
    fn test_索引_区间翻译_越界() {
        let index = make_index(&[100, 200, 50]);
        assert!(index.frame_range_for_samples(350, 10).is_none());
        assert!(index.frame_range_for_samples(0, 0).is_none());
        assert!(index.frame_range_for_samples(100, -5).is_none());
        // 起点为负时首帧钳到 0
        let range = index.frame_range_for_samples(-50, 60).unwrap();
        assert_eq!(range.first, 0);
        // 终点越过流尾时末帧钳到最后一帧
        let range = index.frame_range_for_samples(300, 1000).unwrap();
        assert_eq!(range.last, 2);
    }

    #[test]
    fn test_索引_缓存往返() {
        let index = make_index(&[100, 200, 50]);
        let id = identity();

        let mut io = IoContext::new(Box::new(MemoryBackend::new()));
        index.write(&mut io, &id).unwrap();
        io.seek(std::io::SeekFrom::Start(0)).unwrap();

        let loaded = TrackIndex::read(&mut io, &id).unwrap().unwrap();
        assert_eq!(loaded, index);
    }

    #[test]
    fn test_索引_身份不符触发重建() {
        let index = make_index(&[100, 200]);
        let id = identity();

        let mismatches = [
            IndexIdentity { track: 1, ..id.clone() },
            IndexIdentity { variable_format: true, ..id.clone() },
            IndexIdentity { drc_scale: 0.0, ..id.clone() },
            IndexIdentity { demux_options: Vec::new(), ..id.clone() },
        ];

        for other in mismatches {
            let mut io = IoContext::new(Box::new(MemoryBackend::new()));
            index.write(&mut io, &id).unwrap();
            io.seek(std::io::SeekFrom::Start(0)).unwrap();
            assert!(
                TrackIndex::read(&mut io, &other).unwrap().is_none(),
                "身份 {other:?} 不应命中缓存"
            );
        }
    }

    #[test]
    fn test_索引_截断文件视为不可用() {
        let index = make_index(&[100, 200]);
        let id = identity();

        // 写入后读回原始字节, 截掉末尾 10 字节模拟写入中断
        let mut writer = IoContext::new(Box::new(MemoryBackend::new()));
        index.write(&mut writer, &id).unwrap();
        let len = writer.position().unwrap() as usize;
        writer.seek(std::io::SeekFrom::Start(0)).unwrap();
        let mut bytes = vec![0u8; len];
        writer.read_exact(&mut bytes).unwrap();
        bytes.truncate(len - 10);

        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(bytes)));
        assert!(TrackIndex::read(&mut io, &id).unwrap().is_none());
    }

    #[test]
    fn test_索引_默认缓存路径() {
        let path = default_index_path(Path::new("/tmp/音乐/track.wav"), 0);
        assert_eq!(path, PathBuf::from("/tmp/音乐/track.wav.0.syidx"));
    }
}
