//! # 圆环摆模型参数
//!
//! 定义几何常数、弹簧参数和静态物体的摆放位置。
//! 所有参数在启动时确定，之后不再修改。

use bevy::math::{DQuat, DVec3};
use std::f64::consts::PI;

/// 圆环摆的几何常数
///
/// ## 几何结构
///
/// ```text
///              ___
///          .-'     '-.        圆环（半径R，管半径r）
///        /             \      圆心在 (0, 0, R)
///       |       +       |
///        \             /
///   A ●   '-.  _|_  .-'   ● B
///              |||            中心立柱（高度H）
///           ===========       底座
/// ```
///
/// - 两个摆锤沿圆环滑动，角度偏置分别为 `H0`、`H1`
/// - 弹簧的自然长度为 `l0`、`l1`（沿圆环的弧长）
/// - 质量、刚度和重力只作为文档保留，可视化映射中不使用
#[derive(Debug, Clone, PartialEq)]
pub struct HoopGeometry {
    /// 圆环主半径
    pub major_radius: f64,
    /// 圆环管半径（也是立柱半径）
    pub minor_radius: f64,
    /// 摆臂1的角度偏置
    pub h0: f64,
    /// 摆臂2的角度偏置
    pub h1: f64,
    /// 弹簧1自然长度
    pub l0: f64,
    /// 弹簧2自然长度
    pub l1: f64,
    /// 中心立柱的安装高度
    pub bar_height: f64,
    /// 中心立柱圆柱体的长度
    pub bar_depth: f64,

    pub m0: f64,
    pub m1: f64,
    pub k0: f64,
    pub k1: f64,
    pub gravity: f64,
}

impl Default for HoopGeometry {
    fn default() -> Self {
        Self {
            major_radius: 5.0,
            minor_radius: 0.6,
            h0: PI - 0.1,
            h1: PI + 0.1,
            l0: 5.0 * PI / 2.0,
            l1: 5.0 * PI / 2.0,
            bar_height: 3.5,
            bar_depth: 3.0,
            m0: 100.0,
            m1: 10.0,
            k0: 900.0,
            k1: 300.0,
            gravity: 9.82,
        }
    }
}

impl HoopGeometry {
    /// 摆锤球体半径（略小于管半径）
    pub fn sphere_radius(&self) -> f64 {
        self.minor_radius - 0.1
    }

    /// 圆环圆心
    pub fn hoop_center(&self) -> DVec3 {
        DVec3::new(0.0, 0.0, self.major_radius)
    }
}

/// 弹簧参数
#[derive(Debug, Clone, PartialEq)]
pub struct SpringParams {
    /// 螺旋半径 s
    pub spiral_radius: f64,
    /// 弹簧丝半径 w
    pub wire_radius: f64,
    /// 圈数（u 的取值范围为 `[0, coil_count]`）
    pub coil_count: u32,
    /// u 方向的细分段数
    pub u_steps: usize,
    /// v 方向（管截面）的细分段数
    pub v_steps: usize,
    /// 是否闭合管截面的接缝
    pub wrap_v: bool,
    /// 弹簧高度变化小于该值时不重新采样网格
    pub height_tolerance: f64,
}

impl Default for SpringParams {
    fn default() -> Self {
        Self {
            spiral_radius: 0.25,
            wire_radius: 0.1,
            coil_count: 25,
            u_steps: 200,
            v_steps: 200,
            wrap_v: false,
            height_tolerance: 1e-9,
        }
    }
}

/// 静态物体的位姿和尺寸
///
/// 只在启动时设置一次，之后不再访问。
#[derive(Debug, Clone, PartialEq)]
pub struct StaticPlacement {
    pub position: DVec3,
    pub orientation: DQuat,
    pub scale: DVec3,
}

/// 地面、背景板和底座
#[derive(Debug, Clone, PartialEq)]
pub struct StaticLayout {
    /// 地面和背景板的半边长
    pub plane_half_size: f64,
    pub ground: StaticPlacement,
    pub backdrop: StaticPlacement,
    /// 底座（单位立方体 2x2x2 经缩放）
    pub base_block: StaticPlacement,
}

impl Default for StaticLayout {
    fn default() -> Self {
        Self {
            plane_half_size: 100.0,
            ground: StaticPlacement {
                position: DVec3::new(0.0, 0.0, -3.8),
                orientation: DQuat::IDENTITY,
                scale: DVec3::ONE,
            },
            backdrop: StaticPlacement {
                position: DVec3::new(0.0, 18.0, 0.0),
                orientation: euler_xyz(0.0, PI / 2.0, PI / 2.0),
                scale: DVec3::ONE,
            },
            base_block: StaticPlacement {
                position: DVec3::new(0.0, 0.0, -3.5),
                orientation: DQuat::IDENTITY,
                scale: DVec3::new(3.0, 2.0, 0.3),
            },
        }
    }
}

/// XYZ 欧拉角转四元数
///
/// 先绕X，再绕Y，最后绕Z（均为世界轴）：`q = Rz * Ry * Rx`
pub fn euler_xyz(x: f64, y: f64, z: f64) -> DQuat {
    DQuat::from_rotation_z(z) * DQuat::from_rotation_y(y) * DQuat::from_rotation_x(x)
}
