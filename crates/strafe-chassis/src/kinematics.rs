//! X-drive 运动学模型
//!
//! 四个全向轮呈 X 形安装，轮序固定为 `[左上, 右上, 左下, 右下]`。
//! 每个轮子的速度是三个分量的有符号和，符号由安装象限决定：
//!
//! | 轮子   | forward | strafe (右) | turn (顺时针) |
//! |--------|---------|-------------|---------------|
//! | 左上   | +       | +           | +             |
//! | 右上   | +       | −           | −             |
//! | 左下   | +       | −           | +             |
//! | 右下   | +       | +           | −             |
//!
//! 三列符号两两正交，因此由四轮速度可以精确还原指令向量
//! （见 [`XDriveMix::unmix`]）。

use std::fmt;

/// 轮子位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wheel {
    /// 左上
    TopLeft,
    /// 右上
    TopRight,
    /// 左下
    BottomLeft,
    /// 右下
    BottomRight,
}

impl Wheel {
    /// 按固定轮序排列的所有轮子
    pub const ALL: [Wheel; 4] = [
        Wheel::TopLeft,
        Wheel::TopRight,
        Wheel::BottomLeft,
        Wheel::BottomRight,
    ];

    /// 在轮序中的下标
    pub const fn index(self) -> usize {
        match self {
            Wheel::TopLeft => 0,
            Wheel::TopRight => 1,
            Wheel::BottomLeft => 2,
            Wheel::BottomRight => 3,
        }
    }

    /// 配置文件中使用的名字
    pub const fn name(self) -> &'static str {
        match self {
            Wheel::TopLeft => "top_left",
            Wheel::TopRight => "top_right",
            Wheel::BottomLeft => "bottom_left",
            Wheel::BottomRight => "bottom_right",
        }
    }

    /// 该轮子的 `[forward, strafe, turn]` 符号
    pub const fn signs(self) -> [f64; 3] {
        SIGNS[self.index()]
    }
}

impl fmt::Display for Wheel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const SIGNS: [[f64; 3]; 4] = [
    [1.0, 1.0, 1.0],
    [1.0, -1.0, -1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, -1.0],
];

/// 底盘指令向量
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct XDriveMix {
    /// 正值向前
    pub forward: f64,
    /// 正值向右
    pub strafe: f64,
    /// 正值顺时针
    pub turn: f64,
}

impl XDriveMix {
    /// 创建指令向量
    pub const fn new(forward: f64, strafe: f64, turn: f64) -> Self {
        Self {
            forward,
            strafe,
            turn,
        }
    }

    /// 各轮分量之和（不钳位）
    pub fn wheel_contributions(&self) -> [f64; 4] {
        Wheel::ALL.map(|wheel| {
            let [f, s, t] = wheel.signs();
            f * self.forward + s * self.strafe + t * self.turn
        })
    }

    /// 各轮速度，钳位到 `[-limit, limit]`
    ///
    /// 每个轮子独立钳位，超出范围时不会等比缩放其他轮子。
    pub fn mix(&self, limit: f64) -> [f64; 4] {
        self.wheel_contributions().map(|v| v.clamp(-limit, limit))
    }

    /// 由四轮量还原指令向量
    ///
    /// 每个分量是 `wheel_i * sign_i` 的平均值。对未钳位的
    /// [`wheel_contributions`](Self::wheel_contributions) 是精确逆运算；
    /// 对编码器增量则给出底盘的平均前进/横移/旋转量。
    pub fn unmix(wheels: [f64; 4]) -> Self {
        let mut sums = [0.0; 3];
        for wheel in Wheel::ALL {
            let value = wheels[wheel.index()];
            for (sum, sign) in sums.iter_mut().zip(wheel.signs()) {
                *sum += value * sign;
            }
        }
        Self::new(sums[0] / 4.0, sums[1] / 4.0, sums[2] / 4.0)
    }
}
