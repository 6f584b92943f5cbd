//! # 运动学模块
//!
//! 从广义坐标计算各刚体的位置和姿态

use super::model::HoopGeometry;
use super::trajectory::{Sample, Trajectory};
use bevy::math::{DQuat, DVec3};
use std::f64::consts::FRAC_PI_2;

/// 随时间运动的刚体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyKind {
    /// 圆环（torus）
    Hoop,
    /// 中心立柱（cylinder）
    CentralBar,
    /// 摆锤A
    SphereA,
    /// 摆锤B
    SphereB,
}

impl BodyKind {
    pub const ALL: [BodyKind; 4] = [
        BodyKind::Hoop,
        BodyKind::CentralBar,
        BodyKind::SphereA,
        BodyKind::SphereB,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BodyKind::Hoop => "hoop",
            BodyKind::CentralBar => "central_bar",
            BodyKind::SphereA => "sphere_a",
            BodyKind::SphereB => "sphere_b",
        }
    }
}

/// 刚体位姿（世界坐标系，Z轴向上）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyPose {
    pub position: DVec3,
    pub orientation: DQuat,
}

/// 一帧中所有运动刚体的位姿
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoopPose {
    pub hoop: BodyPose,
    pub central_bar: BodyPose,
    pub sphere_a: BodyPose,
    pub sphere_b: BodyPose,
}

impl HoopPose {
    pub fn get(&self, kind: BodyKind) -> BodyPose {
        match kind {
            BodyKind::Hoop => self.hoop,
            BodyKind::CentralBar => self.central_bar,
            BodyKind::SphereA => self.sphere_a,
            BodyKind::SphereB => self.sphere_b,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyKind, BodyPose)> + '_ {
        BodyKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }
}

/// 绕竖直轴（Z）旋转 q2：整个圆环装置的进动
///
/// ```text
/// x' = cos(q2)·x − sin(q2)·y
/// y' = sin(q2)·x + cos(q2)·y
/// z' = z
/// ```
pub fn precess(v: DVec3, q2: f64) -> DVec3 {
    let (sin, cos) = q2.sin_cos();
    DVec3::new(cos * v.x - sin * v.y, sin * v.x + cos * v.y, v.z)
}

/// 圆环上角度为 `angle` 的点（圆环局部坐标系，进动前）
///
/// 圆环位于XZ平面，圆心在 `(0, 0, R)`
fn point_on_hoop(geometry: &HoopGeometry, angle: f64) -> DVec3 {
    let r = geometry.major_radius;
    let (sin, cos) = angle.sin_cos();
    DVec3::new(r * cos, 0.0, r * sin + r)
}

/// 摆锤A在圆环上的角度
pub fn sphere_a_angle(geometry: &HoopGeometry, q1: f64) -> f64 {
    geometry.h0 - geometry.l0 / geometry.major_radius - q1
}

/// 摆锤B在圆环上的角度
pub fn sphere_b_angle(geometry: &HoopGeometry, q3: f64) -> f64 {
    geometry.h1 + geometry.l1 / geometry.major_radius + q3
}

/// 前向运动学：单帧采样 → 所有运动刚体的位姿
///
/// ## 算法流程
///
/// 两级刚体变换：
///
/// 1. **圆环局部放置**：摆锤沿圆环的位置由摆臂伸长坐标决定
///    ```text
///    A = (R·cos(H0 − l0/R − q1), 0, R·sin(H0 − l0/R − q1) + R)
///    B = (R·cos(H1 + l1/R + q3), 0, R·sin(H1 + l1/R + q3) + R)
///    ```
/// 2. **公共进动**：所有运动刚体绕Z轴旋转 q2
///
/// 圆环和立柱的位置固定，只有姿态随 q2 变化。
///
/// 姿态采用"物体自身轴沿Z"的约定：圆环先绕X倾斜π/2使其位于XZ平面，
/// 再绕Z进动。
pub fn pose_from_sample(geometry: &HoopGeometry, sample: &Sample) -> HoopPose {
    let precession = DQuat::from_rotation_z(sample.q2);

    let hoop = BodyPose {
        position: geometry.hoop_center(),
        orientation: precession * DQuat::from_rotation_x(FRAC_PI_2),
    };

    let central_bar = BodyPose {
        position: DVec3::new(0.0, 0.0, -geometry.bar_height / 2.0),
        orientation: precession,
    };

    let sphere_a = BodyPose {
        position: precess(
            point_on_hoop(geometry, sphere_a_angle(geometry, sample.q1)),
            sample.q2,
        ),
        orientation: DQuat::IDENTITY,
    };

    let sphere_b = BodyPose {
        position: precess(
            point_on_hoop(geometry, sphere_b_angle(geometry, sample.q3)),
            sample.q2,
        ),
        orientation: DQuat::IDENTITY,
    };

    HoopPose {
        hoop,
        central_bar,
        sphere_a,
        sphere_b,
    }
}

/// 第 n 帧的位姿，n 越界时取最近的有效帧
pub fn pose(geometry: &HoopGeometry, trajectory: &Trajectory, n: usize) -> HoopPose {
    pose_from_sample(geometry, &trajectory.sample(n))
}
