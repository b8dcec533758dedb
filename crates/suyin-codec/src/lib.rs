//! # suyin-codec
//!
//! Suyin 采样精确音频访问框架解码器库, 提供解码器框架与 Packet/Frame 抽象.
//!
//! 本 crate 对标 FFmpeg 的 libavcodec (音频部分), 定义了解码器注册与
//! send/receive 式解码流程的核心抽象.
//!
//! ## 内置解码器
//!
//! - PCM (U8/S16LE/S16BE/S24LE/S32LE/F32LE/F64LE)
//!
//! ## 使用示例
//!
//! ```rust
//! use suyin_codec::{CodecRegistry, CodecId};
//!
//! let mut reg = CodecRegistry::new();
//! suyin_codec::register_all(&mut reg);
//!
//! // 按 CodecId 创建解码器实例
//! let decoder = reg.create_decoder(CodecId::PcmS16le).unwrap();
//! ```

pub mod codec_id;
pub mod codec_parameters;
pub mod decoder;
pub mod decoders;
pub mod frame;
pub mod packet;
pub mod registry;

// 重导出常用类型
pub use codec_id::CodecId;
pub use codec_parameters::CodecParameters;
pub use decoder::{Decoder, DecoderOptions};
pub use frame::AudioFrame;
pub use packet::Packet;
pub use registry::CodecRegistry;

/// 注册所有内置解码器
pub fn register_all(registry: &mut CodecRegistry) {
    decoders::register_all_decoders(registry);
}
