//! 解码帧缓存 (C4).
//!
//! 以帧序号为键的 LRU 缓存, 按解码负载字节数设置上限.
//! 命中即把条目提升到最近使用端并克隆返回;
//! 同一帧序号重复写入时保留较新的解码结果.

use log::trace;
use lru::LruCache;
use suyin_codec::AudioFrame;

/// 默认缓存上限 (1 GiB)
pub const DEFAULT_MAX_CACHE_BYTES: usize = 1024 * 1024 * 1024;

/// 解码帧缓存
pub struct FrameCache {
    /// 帧序号 -> 解码帧, LRU 序
    entries: LruCache<i64, AudioFrame>,
    /// 当前负载字节总数
    total_bytes: usize,
    /// 负载字节上限
    max_bytes: usize,
}

impl FrameCache {
    /// 创建指定字节上限的缓存
    pub fn new(max_bytes: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            total_bytes: 0,
            max_bytes,
        }
    }

    /// 写入一帧
    ///
    /// 同帧序号的旧条目先被移除, 随后从最久未用端逐出直到回到上限以内.
    pub fn insert(&mut self, n: i64, frame: AudioFrame) {
        debug_assert!(n >= 0);
        debug_assert!(frame.nb_samples > 0);

        let size = frame.payload_size();
        if let Some(old) = self.entries.put(n, frame) {
            self.total_bytes -= old.payload_size();
        }
        self.total_bytes += size;
        self.apply_max_size();
    }

    /// 按帧序号取一帧, 命中时提升到最近使用端
    pub fn get(&mut self, n: i64) -> Option<AudioFrame> {
        self.entries.get(&n).cloned()
    }

    /// 清空全部条目
    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_bytes = 0;
    }

    /// 更新字节上限并立即执行逐出
    pub fn set_max_bytes(&mut self, max_bytes: usize) {
        self.max_bytes = max_bytes;
        self.apply_max_size();
    }

    /// 当前负载字节总数
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// 当前条目数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn apply_max_size(&mut self) {
        while self.total_bytes > self.max_bytes {
            match self.entries.pop_lru() {
                Some((n, frame)) => {
                    self.total_bytes -= frame.payload_size();
                    trace!("缓存逐出帧 {n}, 剩余 {} 字节", self.total_bytes);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use suyin_core::{ChannelLayout, SampleFormat};

    fn frame_of_bytes(fill: u8, len: usize) -> AudioFrame {
        let mut frame = AudioFrame::new(
            (len / 2) as u32,
            48000,
            SampleFormat::S16,
            ChannelLayout::MONO,
        );
        frame.data[0] = vec![fill; len];
        frame
    }

    #[test]
    fn test_缓存_字节上限() {
        let mut cache = FrameCache::new(1000);
        for n in 0..10 {
            cache.insert(n, frame_of_bytes(n as u8, 300));
            assert!(cache.total_bytes() <= 1000);
        }
        // 1000 / 300 = 最多 3 条
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_缓存_命中克隆与提升() {
        let mut cache = FrameCache::new(1000);
        cache.insert(0, frame_of_bytes(0xAA, 300));
        cache.insert(1, frame_of_bytes(0xBB, 300));
        cache.insert(2, frame_of_bytes(0xCC, 300));

        // 命中 0 号后它成为最近使用, 下一次逐出的应是 1 号
        let hit = cache.get(0).unwrap();
        assert_eq!(hit.data[0][0], 0xAA);
        cache.insert(3, frame_of_bytes(0xDD, 300));

        assert!(cache.get(1).is_none());
        assert!(cache.get(0).is_some());
        assert!(cache.get(2).is_some());
        assert!(cache.get(3).is_some());
    }

    #[test]
    fn test_缓存_同帧覆盖保留较新() {
        let mut cache = FrameCache::new(1000);
        cache.insert(5, frame_of_bytes(0x01, 300));
        cache.insert(5, frame_of_bytes(0x02, 400));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), 400);
        assert_eq!(cache.get(5).unwrap().data[0][0], 0x02);
    }

    #[test]
    fn test_缓存_收紧上限立即逐出() {
        let mut cache = FrameCache::new(1000);
        cache.insert(0, frame_of_bytes(0, 300));
        cache.insert(1, frame_of_bytes(1, 300));
        cache.insert(2, frame_of_bytes(2, 300));
        assert_eq!(cache.len(), 3);

        cache.set_max_bytes(350);
        assert_eq!(cache.len(), 1);
        assert!(cache.total_bytes() <= 350);
        assert!(cache.get(2).is_some());
    }

    #[test]
    fn test_缓存_清空() {
        let mut cache = FrameCache::new(1000);
        cache.insert(0, frame_of_bytes(0, 100));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.total_bytes(), 0);
        assert!(cache.get(0).is_none());
    }

    #[test]
    fn test_缓存_超大单帧直接逐出自身() {
        let mut cache = FrameCache::new(100);
        cache.insert(0, frame_of_bytes(0, 500));
        assert!(cache.is_empty());
        assert_eq!(cache.total_bytes(), 0);
    }
}
