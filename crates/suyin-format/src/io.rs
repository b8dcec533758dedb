//! I/O 抽象层.
//!
//! 对标 FFmpeg 的 `AVIOContext`, 提供统一的读写接口,
//! 支持文件与内存缓冲区后端. 整数一律按小端定宽编码,
//! 字符串按 u32 长度前缀 + UTF-8 编码, 索引缓存文件也使用这套原语.

use std::io::{self, Read, Seek, Write};
use suyin_core::{SuError, SuResult};

/// I/O 上下文
///
/// 封装底层 I/O 操作, 为解封装器和索引序列化提供统一的数据读写接口.
pub struct IoContext {
    /// 内部 I/O 实现
    inner: Box<dyn IoBackend>,
    /// 读缓冲区
    buffer: Vec<u8>,
    /// 缓冲区中的有效数据长度
    buf_len: usize,
    /// 缓冲区当前读取位置
    buf_pos: usize,
}

/// I/O 后端 trait
///
/// 实现此 trait 以支持不同的 I/O 来源 (文件、内存等).
pub trait IoBackend: Send {
    /// 读取数据到缓冲区
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// 全部写入
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
    /// 定位 (seek)
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64>;
    /// 获取当前位置
    fn position(&mut self) -> io::Result<u64>;
    /// 获取总大小 (如果可知)
    fn size(&self) -> Option<u64>;
    /// 是否支持 seek
    fn is_seekable(&self) -> bool;
}

/// 默认缓冲区大小 (32 KB)
const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// 字符串长度上限, 防止损坏的长度前缀导致超额分配
const MAX_STRING_LEN: u32 = 64 * 1024;

impl IoContext {
    /// 从 I/O 后端创建上下文
    pub fn new(backend: Box<dyn IoBackend>) -> Self {
        Self {
            inner: backend,
            buffer: vec![0u8; DEFAULT_BUFFER_SIZE],
            buf_len: 0,
            buf_pos: 0,
        }
    }

    /// 从文件路径打开 (只读)
    pub fn open_read(path: &std::path::Path) -> SuResult<Self> {
        let file = std::fs::File::open(path)?;
        Ok(Self::new(Box::new(FileBackend::new(file))))
    }

    /// 从文件路径打开 (写入, 截断已有内容)
    pub fn open_write(path: &std::path::Path) -> SuResult<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(FileBackend::new(file))))
    }

    // ========================
    // 读取方法
    // ========================

    /// 读取指定字节数
    pub fn read_exact(&mut self, buf: &mut [u8]) -> SuResult<()> {
        let mut total_read = 0;
        while total_read < buf.len() {
            let buffered = self.buf_len - self.buf_pos;
            if buffered > 0 {
                let to_copy = buffered.min(buf.len() - total_read);
                buf[total_read..total_read + to_copy]
                    .copy_from_slice(&self.buffer[self.buf_pos..self.buf_pos + to_copy]);
                self.buf_pos += to_copy;
                total_read += to_copy;
            } else {
                self.buf_pos = 0;
                self.buf_len = self.inner.read(&mut self.buffer)?;
                if self.buf_len == 0 {
                    return Err(SuError::Eof);
                }
            }
        }
        Ok(())
    }

    /// 读取 1 个字节
    pub fn read_u8(&mut self) -> SuResult<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// 读取 u16 小端
    pub fn read_u16_le(&mut self) -> SuResult<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// 读取 u32 小端
    pub fn read_u32_le(&mut self) -> SuResult<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// 读取 u64 小端
    pub fn read_u64_le(&mut self) -> SuResult<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// 读取 i64 小端
    pub fn read_i64_le(&mut self) -> SuResult<i64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(i64::from_le_bytes(buf))
    }

    /// 读取 4 字节标签 (FourCC)
    pub fn read_tag(&mut self) -> SuResult<[u8; 4]> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// 读取指定数量的字节
    pub fn read_bytes(&mut self, count: usize) -> SuResult<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// 读取长度前缀字符串 (u32 小端长度 + UTF-8 字节)
    pub fn read_string(&mut self) -> SuResult<String> {
        let len = self.read_u32_le()?;
        if len > MAX_STRING_LEN {
            return Err(SuError::InvalidData(format!("字符串长度异常: {len}")));
        }
        let bytes = self.read_bytes(len as usize)?;
        String::from_utf8(bytes).map_err(|_| SuError::InvalidData("字符串不是有效 UTF-8".into()))
    }

    /// 跳过指定字节数
    pub fn skip(&mut self, count: usize) -> SuResult<()> {
        // 先消耗缓冲区中的数据
        let buffered = self.buf_len - self.buf_pos;
        if count <= buffered {
            self.buf_pos += count;
            return Ok(());
        }

        let remaining = count - buffered;
        self.buf_pos = self.buf_len;

        if self.inner.is_seekable() {
            self.inner.seek(io::SeekFrom::Current(remaining as i64))?;
        } else {
            // 逐块丢弃读取的数据
            let mut left = remaining;
            while left > 0 {
                let to_read = left.min(self.buffer.len());
                self.buf_len = self.inner.read(&mut self.buffer[..to_read])?;
                if self.buf_len == 0 {
                    return Err(SuError::Eof);
                }
                left -= self.buf_len;
            }
            self.buf_pos = 0;
            self.buf_len = 0;
        }
        Ok(())
    }

    // ========================
    // 写入方法
    // ========================

    /// 写入全部数据
    pub fn write_all(&mut self, buf: &[u8]) -> SuResult<()> {
        self.inner.write_all(buf)?;
        Ok(())
    }

    /// 写入 u8
    pub fn write_u8(&mut self, v: u8) -> SuResult<()> {
        self.write_all(&[v])
    }

    /// 写入 u16 小端
    pub fn write_u16_le(&mut self, v: u16) -> SuResult<()> {
        self.write_all(&v.to_le_bytes())
    }

    /// 写入 u32 小端
    pub fn write_u32_le(&mut self, v: u32) -> SuResult<()> {
        self.write_all(&v.to_le_bytes())
    }

    /// 写入 u64 小端
    pub fn write_u64_le(&mut self, v: u64) -> SuResult<()> {
        self.write_all(&v.to_le_bytes())
    }

    /// 写入 i64 小端
    pub fn write_i64_le(&mut self, v: i64) -> SuResult<()> {
        self.write_all(&v.to_le_bytes())
    }

    /// 写入 4 字节标签 (FourCC)
    pub fn write_tag(&mut self, tag: &[u8; 4]) -> SuResult<()> {
        self.write_all(tag)
    }

    /// 写入长度前缀字符串 (u32 小端长度 + UTF-8 字节)
    pub fn write_string(&mut self, s: &str) -> SuResult<()> {
        if s.len() as u32 > MAX_STRING_LEN {
            return Err(SuError::InvalidArgument(format!(
                "字符串过长: {} 字节",
                s.len()
            )));
        }
        self.write_u32_le(s.len() as u32)?;
        self.write_all(s.as_bytes())
    }

    // ========================
    // 定位方法
    // ========================

    /// 定位 (seek)
    ///
    /// 注意: seek 会清空读缓冲区.
    pub fn seek(&mut self, pos: io::SeekFrom) -> SuResult<u64> {
        self.buf_pos = 0;
        self.buf_len = 0;
        Ok(self.inner.seek(pos)?)
    }

    /// 获取当前位置
    ///
    /// 考虑读缓冲区中尚未消耗的数据量.
    pub fn position(&mut self) -> SuResult<u64> {
        let raw_pos = self.inner.position()?;
        let buffered = (self.buf_len - self.buf_pos) as u64;
        Ok(raw_pos - buffered)
    }

    /// 是否支持随机访问
    pub fn is_seekable(&self) -> bool {
        self.inner.is_seekable()
    }

    /// 获取总大小
    pub fn size(&self) -> Option<u64> {
        self.inner.size()
    }
}

/// 文件 I/O 后端
struct FileBackend {
    file: std::fs::File,
    size: Option<u64>,
}

impl FileBackend {
    fn new(file: std::fs::File) -> Self {
        let size = file.metadata().ok().map(|m| m.len());
        Self { file, size }
    }
}

impl IoBackend for FileBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.write_all(buf)
    }

    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }

    fn position(&mut self) -> io::Result<u64> {
        self.file.stream_position()
    }

    fn size(&self) -> Option<u64> {
        self.size
    }

    fn is_seekable(&self) -> bool {
        true
    }
}

/// 内存缓冲区 I/O 后端
///
/// 用于测试和内存中处理.
pub struct MemoryBackend {
    /// 数据缓冲区
    data: Vec<u8>,
    /// 当前位置
    pos: usize,
}

impl MemoryBackend {
    /// 从已有数据创建 (用于读取)
    pub fn from_data(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    /// 创建空缓冲区 (用于写入)
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            pos: 0,
        }
    }

    /// 获取内部数据的引用
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 消耗自身, 返回内部数据
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl IoBackend for MemoryBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.data.len().saturating_sub(self.pos);
        let to_read = buf.len().min(available);
        if to_read == 0 {
            return Ok(0);
        }
        buf[..to_read].copy_from_slice(&self.data[self.pos..self.pos + to_read]);
        self.pos += to_read;
        Ok(to_read)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.pos >= self.data.len() {
            self.data.extend_from_slice(buf);
        } else {
            // 覆盖已有数据, 超出部分追加
            let overlap = (self.data.len() - self.pos).min(buf.len());
            self.data[self.pos..self.pos + overlap].copy_from_slice(&buf[..overlap]);
            if buf.len() > overlap {
                self.data.extend_from_slice(&buf[overlap..]);
            }
        }
        self.pos += buf.len();
        Ok(())
    }

    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            io::SeekFrom::Start(offset) => offset as i64,
            io::SeekFrom::End(offset) => self.data.len() as i64 + offset,
            io::SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek 位置不能为负",
            ));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }

    fn position(&mut self) -> io::Result<u64> {
        Ok(self.pos as u64)
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn is_seekable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_整数读写往返() {
        let mut io = IoContext::new(Box::new(MemoryBackend::new()));
        io.write_u8(0xAB).unwrap();
        io.write_u16_le(0x1234).unwrap();
        io.write_u32_le(0xDEADBEEF).unwrap();
        io.write_u64_le(0x0102030405060708).unwrap();
        io.write_i64_le(-42).unwrap();

        io.seek(io::SeekFrom::Start(0)).unwrap();
        assert_eq!(io.read_u8().unwrap(), 0xAB);
        assert_eq!(io.read_u16_le().unwrap(), 0x1234);
        assert_eq!(io.read_u32_le().unwrap(), 0xDEADBEEF);
        assert_eq!(io.read_u64_le().unwrap(), 0x0102030405060708);
        assert_eq!(io.read_i64_le().unwrap(), -42);
    }

    #[test]
    fn test_字符串读写往返() {
        let mut io = IoContext::new(Box::new(MemoryBackend::new()));
        io.write_string("probesize").unwrap();
        io.write_string("溯音").unwrap();
        io.write_string("").unwrap();

        io.seek(io::SeekFrom::Start(0)).unwrap();
        assert_eq!(io.read_string().unwrap(), "probesize");
        assert_eq!(io.read_string().unwrap(), "溯音");
        assert_eq!(io.read_string().unwrap(), "");
    }

    #[test]
    fn test_读到末尾返回_eof() {
        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(vec![1, 2])));
        assert_eq!(io.read_u16_le().unwrap(), 0x0201);
        assert!(matches!(io.read_u8().unwrap_err(), SuError::Eof));
    }

    #[test]
    fn test_跳过与位置() {
        let data: Vec<u8> = (0..100).collect();
        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(data)));
        io.skip(10).unwrap();
        assert_eq!(io.read_u8().unwrap(), 10);
        assert_eq!(io.position().unwrap(), 11);
    }

    #[test]
    fn test_损坏的字符串长度报错() {
        let mut io = IoContext::new(Box::new(MemoryBackend::new()));
        io.write_u32_le(u32::MAX).unwrap();
        io.seek(io::SeekFrom::Start(0)).unwrap();
        assert!(matches!(
            io.read_string().unwrap_err(),
            SuError::InvalidData(_)
        ));
    }
}
