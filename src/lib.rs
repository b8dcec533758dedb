//! # Suyin (溯音)
//!
//! 纯 Rust 实现的采样精确音频随机访问框架.
//!
//! 容器格式的 seek 普遍不精确 (VBR MP3 尤甚), Suyin 在其上提供
//! 确定性的随机访问: 首次打开时为音轨建立逐帧内容摘要索引,
//! 之后按帧序号或采样区间请求, 无论内部经过多少次 seek 与重试,
//! 返回的数据都与从头线性解码逐字节一致.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use suyin::source::{AudioSource, OpenOptions};
//!
//! let mut source = AudioSource::open("music.wav", OpenOptions::default(), None)?;
//! println!("采样率: {} Hz", source.properties().sample_rate);
//! let frame = source.get_frame(0, false)?;
//! # Ok::<(), suyin::core::SuError>(())
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `suyin-core` | 核心类型与错误 |
//! | `suyin-codec` | 解码器框架 |
//! | `suyin-format` | 容器格式框架 |
//! | `suyin-source` | 采样精确随机访问引擎 |

/// 核心类型与错误 (对标 libavutil)
pub use suyin_core as core;

/// 解码器框架 (对标 libavcodec)
pub use suyin_codec as codec;

/// 容器格式框架 (对标 libavformat)
pub use suyin_format as format;

/// 采样精确随机访问引擎
pub use suyin_source as source;

pub mod logging;

/// 获取 Suyin 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已注册所有内置解码器的注册表
pub fn default_codec_registry() -> suyin_codec::CodecRegistry {
    let mut registry = suyin_codec::CodecRegistry::new();
    suyin_codec::register_all(&mut registry);
    registry
}

/// 创建已注册所有内置容器格式的注册表
pub fn default_format_registry() -> suyin_format::FormatRegistry {
    let mut registry = suyin_format::FormatRegistry::new();
    suyin_format::register_all(&mut registry);
    registry
}
