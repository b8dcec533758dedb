//! # suyin-source
//!
//! Suyin 采样精确音频随机访问引擎.
//!
//! 容器的 seek 只承诺"大概落在附近", 而本 crate 对外承诺精确:
//! 打开时为整条音轨建立逐帧索引 (PTS、累计采样、内容摘要),
//! 之后无论请求落在哪里, 都通过"seek + 摘要串辨识落点 + 线性校验"
//! 返回与从头解码逐字节一致的结果. seek 被证实不可靠时逐级退化,
//! 最终落到永久线性解码, 正确性始终不受影响.
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use suyin_source::{AudioSource, OpenOptions};
//!
//! let mut source = AudioSource::open("音乐.wav", OpenOptions::default(), None)?;
//! let props = source.properties().clone();
//!
//! // 按帧访问
//! let frame = source.get_frame(1000, false)?;
//!
//! // 按采样区间访问, 越界部分填零
//! let bytes = 4096 * props.bytes_per_sample as usize;
//! let mut planes: Vec<Vec<u8>> = vec![vec![0; bytes]; props.channels as usize];
//! let mut bufs: Vec<&mut [u8]> = planes.iter_mut().map(|p| p.as_mut_slice()).collect();
//! source.get_planar(&mut bufs, -100, 4096)?;
//! # Ok::<(), suyin_core::SuError>(())
//! ```

pub mod cache;
pub mod decoder;
pub mod hash;
pub mod index;
pub mod source;

#[cfg(test)]
mod mock;

// 重导出常用类型
pub use cache::FrameCache;
pub use decoder::{FileSource, LinearDecoder, MediaSource};
pub use hash::{frame_digest, FrameHash};
pub use index::{FrameInfo, FrameRange, IndexIdentity, TrackIndex};
pub use source::{AudioProperties, AudioSource, OpenOptions, ProgressCallback};
