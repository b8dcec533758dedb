//! 统一错误类型定义.
//!
//! 所有 Suyin crate 共用的错误类型, 支持跨模块传播.
//! 可恢复的内部状况 (索引不匹配, seek 不可靠) 不在此列,
//! 它们由引擎内部吸收, 不会传播给调用方.

use thiserror::Error;

/// Suyin 框架统一错误类型
#[derive(Debug, Error)]
pub enum SuError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的格式或操作
    #[error("不支持: {0}")]
    Unsupported(String),

    /// 解码器错误
    #[error("解码器错误: {0}")]
    Codec(String),

    /// 容器格式错误
    #[error("格式错误: {0}")]
    Format(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 数据不足, 需要更多输入
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 未找到指定的解码器
    #[error("未找到解码器: {0}")]
    CodecNotFound(String),

    /// 未找到指定的容器格式
    #[error("未找到容器格式: {0}")]
    FormatNotFound(String),

    /// 未找到指定的流
    #[error("未找到流: 索引 {0}")]
    StreamNotFound(usize),

    /// 建立音轨索引失败
    #[error("索引失败: {0}")]
    Index(String),

    /// 内部一致性错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

/// Suyin 框架统一 Result 类型
pub type SuResult<T> = Result<T, SuError>;
