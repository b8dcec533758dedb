//! 音频声道布局定义.
//!
//! 对标 FFmpeg 的 `AVChannelLayout` / `AV_CH_LAYOUT_*`.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// 声道位掩码, 每个位代表一个扬声器位置
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelMask: u64 {
        /// 前方左声道
        const FRONT_LEFT            = 1 << 0;
        /// 前方右声道
        const FRONT_RIGHT           = 1 << 1;
        /// 前方中央声道
        const FRONT_CENTER          = 1 << 2;
        /// 低频效果 (LFE / 重低音)
        const LOW_FREQUENCY         = 1 << 3;
        /// 后方左声道
        const BACK_LEFT             = 1 << 4;
        /// 后方右声道
        const BACK_RIGHT            = 1 << 5;
        /// 前方中左声道
        const FRONT_LEFT_OF_CENTER  = 1 << 6;
        /// 前方中右声道
        const FRONT_RIGHT_OF_CENTER = 1 << 7;
        /// 后方中央声道
        const BACK_CENTER           = 1 << 8;
        /// 侧方左声道
        const SIDE_LEFT             = 1 << 9;
        /// 侧方右声道
        const SIDE_RIGHT            = 1 << 10;
    }
}

/// 声道排列方式
///
/// 只有原生 (位掩码) 与未指定两种排列能参与采样切片,
/// Ambisonics 与自定义排列在打开阶段即被拒绝.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelOrder {
    /// 原生排列, 声道顺序由位掩码从低位到高位决定
    Native,
    /// 未指定, 按声道数套用默认布局
    Unspecified,
    /// Ambisonics 球谐分量
    Ambisonic,
    /// 自定义排列
    Custom,
}

/// 声道布局
///
/// 描述音频流中声道的数量和排列方式.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelLayout {
    /// 声道排列方式
    pub order: ChannelOrder,
    /// 声道数量
    pub channels: u32,
    /// 声道位掩码 (原生排列使用)
    pub mask: ChannelMask,
}

impl ChannelLayout {
    /// 单声道
    pub const MONO: Self = Self {
        order: ChannelOrder::Native,
        channels: 1,
        mask: ChannelMask::FRONT_CENTER,
    };

    /// 立体声 (左右)
    pub const STEREO: Self = Self {
        order: ChannelOrder::Native,
        channels: 2,
        mask: ChannelMask::FRONT_LEFT.union(ChannelMask::FRONT_RIGHT),
    };

    /// 5.1 环绕声
    pub const SURROUND_5_1: Self = Self {
        order: ChannelOrder::Native,
        channels: 6,
        mask: ChannelMask::FRONT_LEFT
            .union(ChannelMask::FRONT_RIGHT)
            .union(ChannelMask::FRONT_CENTER)
            .union(ChannelMask::LOW_FREQUENCY)
            .union(ChannelMask::BACK_LEFT)
            .union(ChannelMask::BACK_RIGHT),
    };

    /// 根据声道数创建默认布局
    pub fn from_channels(channels: u32) -> Self {
        match channels {
            1 => Self::MONO,
            2 => Self::STEREO,
            6 => Self::SURROUND_5_1,
            n => Self {
                order: ChannelOrder::Unspecified,
                channels: n,
                mask: ChannelMask::empty(),
            },
        }
    }

    /// 根据位掩码创建原生布局
    pub fn from_mask(mask: ChannelMask) -> Self {
        Self {
            order: ChannelOrder::Native,
            channels: mask.bits().count_ones(),
            mask,
        }
    }

    /// 布局是否能参与采样切片 (原生或未指定排列)
    pub const fn is_scatterable(&self) -> bool {
        matches!(self.order, ChannelOrder::Native | ChannelOrder::Unspecified)
    }

    /// 解析为具体的位掩码
    ///
    /// 未指定排列套用与声道数对应的默认布局掩码.
    pub fn resolved_mask(&self) -> ChannelMask {
        match self.order {
            ChannelOrder::Unspecified => Self::from_channels(self.channels).mask,
            _ => self.mask,
        }
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::MONO => write!(f, "mono"),
            Self::STEREO => write!(f, "stereo"),
            Self::SURROUND_5_1 => write!(f, "5.1"),
            _ => write!(f, "{}ch", self.channels),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_声道布局_默认布局() {
        assert_eq!(ChannelLayout::from_channels(2), ChannelLayout::STEREO);
        let l = ChannelLayout::from_channels(4);
        assert_eq!(l.order, ChannelOrder::Unspecified);
        assert_eq!(l.channels, 4);
    }

    #[test]
    fn test_声道布局_从掩码创建() {
        let l = ChannelLayout::from_mask(ChannelMask::FRONT_LEFT | ChannelMask::FRONT_RIGHT);
        assert_eq!(l.channels, 2);
        assert_eq!(l, ChannelLayout::STEREO);
    }

    #[test]
    fn test_声道布局_ambisonic_不可切片() {
        let l = ChannelLayout {
            order: ChannelOrder::Ambisonic,
            channels: 4,
            mask: ChannelMask::empty(),
        };
        assert!(!l.is_scatterable());
        assert!(ChannelLayout::SURROUND_5_1.is_scatterable());
    }

    #[test]
    fn test_声道布局_未指定排列的掩码解析() {
        let l = ChannelLayout {
            order: ChannelOrder::Unspecified,
            channels: 6,
            mask: ChannelMask::empty(),
        };
        assert_eq!(l.resolved_mask(), ChannelLayout::SURROUND_5_1.mask);
    }
}
