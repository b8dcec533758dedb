//! 帧内容摘要 (C1).
//!
//! 对解码后的 PCM 负载计算 16 字节摘要, 作为帧的唯一身份.
//! seek 校验依赖摘要的两条性质:
//! - 确定性: 同一帧内容的摘要永远相同
//! - 布局无关: 相同 PCM 内容在平面与交错存储下摘要一致
//!
//! 为此按规范顺序喂入数据: 平面格式依次拼接声道 0..n 的平面,
//! 交错格式直接取连续的交错区域. 不掺入任何元数据或填充字节.

use md5::{Digest, Md5};
use suyin_codec::AudioFrame;

/// 帧摘要类型 (16 字节)
pub type FrameHash = [u8; 16];

/// 计算解码帧 PCM 负载的摘要
pub fn frame_digest(frame: &AudioFrame) -> FrameHash {
    let bytes_per_sample = frame.sample_format.bytes_per_sample() as usize;
    let mut hasher = Md5::new();

    if frame.is_planar() {
        let plane_len = bytes_per_sample * frame.nb_samples as usize;
        for plane in frame.data.iter().take(frame.channel_layout.channels as usize) {
            hasher.update(&plane[..plane_len]);
        }
    } else {
        let region_len =
            bytes_per_sample * frame.channel_layout.channels as usize * frame.nb_samples as usize;
        hasher.update(&frame.data[0][..region_len]);
    }

    hasher.finalize().into()
}
