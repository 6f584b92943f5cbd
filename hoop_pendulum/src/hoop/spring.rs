//! # 弹簧曲面模块
//!
//! 两根弹簧都是沿螺旋线扫掠的圆管，再弯曲贴合到圆环上。
//! 曲面用闭式参数方程 `(u, v) → (x, y, z)` 直接求值。
//!
//! ## 参数方程
//!
//! 直螺旋管（展开后）：
//! ```text
//! α1(u, v) = (h/2π)·u + w·sin(2πv)           轴向
//! α2(u, v) = (s + w·cos(2πv))·cos(2πu)
//! α3(u, v) = (s + w·cos(2πv))·sin(2πu)
//! ```
//! 其中 h 为每圈的螺距（随当前帧变化），s 为螺旋半径，w 为弹簧丝半径。
//!
//! 弯曲到半径为 R 的圆环上（弹簧1，锚定在 H0，另一端连接摆锤A）：
//! ```text
//! β1 = −(R − α3)·cos(−H0 − π + α1/R)
//! β2 = α2
//! β3 =  (R − α3)·sin(−H0 − π + α1/R) + R
//! ```
//! 弹簧2（锚定在 H1，另一端连接摆锤B）：
//! ```text
//! β1 = (R − α3)·cos(H1 − α1/R)
//! β2 = α2
//! β3 = (R − α3)·sin(H1 − α1/R) + R
//! ```
//! 最后与刚体一样绕Z轴进动 q2。
//!
//! u ∈ [0, 圈数]，v ∈ [0, 1]。

use super::kinematics::precess;
use super::model::{HoopGeometry, SpringParams};
use super::trajectory::Sample;
use bevy::math::DVec3;
use std::f64::consts::{PI, TAU};

/// 弹簧编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpringSide {
    /// 弹簧1：H0 → 摆锤A，由 q1 驱动
    First,
    /// 弹簧2：H1 → 摆锤B，由 q3 驱动
    Second,
}

impl SpringSide {
    pub const ALL: [SpringSide; 2] = [SpringSide::First, SpringSide::Second];

    pub fn name(self) -> &'static str {
        match self {
            SpringSide::First => "spring_1",
            SpringSide::Second => "spring_2",
        }
    }
}

/// 当前帧的弹簧螺距
///
/// ```text
/// 弹簧1: h = ((l0/R) + q1)·R·2π / 圈数
/// 弹簧2: h = (−(l1/R) − q3)·R·2π / 圈数
/// ```
///
/// 弹簧2的螺距为负：它沿圆环反方向缠绕。
pub fn spring_height(
    side: SpringSide,
    geometry: &HoopGeometry,
    params: &SpringParams,
    sample: &Sample,
) -> f64 {
    let r = geometry.major_radius;
    let coils = f64::from(params.coil_count);
    match side {
        SpringSide::First => ((geometry.l0 / r) + sample.q1) * r * TAU / coils,
        SpringSide::Second => (-(geometry.l1 / r) - sample.q3) * r * TAU / coils,
    }
}

/// 单帧的弹簧曲面
#[derive(Debug, Clone, PartialEq)]
pub struct SpringSurface {
    pub side: SpringSide,
    /// 螺距 h
    pub height: f64,
    /// 进动角
    pub q2: f64,
    /// 圆环半径 R
    pub major_radius: f64,
    /// 锚定角（H0 或 H1）
    pub anchor: f64,
    pub spiral_radius: f64,
    pub wire_radius: f64,
    /// u 的上限
    pub coil_count: u32,
}

impl SpringSurface {
    pub fn new(
        side: SpringSide,
        geometry: &HoopGeometry,
        params: &SpringParams,
        sample: &Sample,
    ) -> Self {
        let anchor = match side {
            SpringSide::First => geometry.h0,
            SpringSide::Second => geometry.h1,
        };
        Self {
            side,
            height: spring_height(side, geometry, params, sample),
            q2: sample.q2,
            major_radius: geometry.major_radius,
            anchor,
            spiral_radius: params.spiral_radius,
            wire_radius: params.wire_radius,
            coil_count: params.coil_count,
        }
    }

    /// 展开的直螺旋管 (α1, α2, α3)
    pub fn helix(&self, u: f64, v: f64) -> DVec3 {
        let (sin_v, cos_v) = (TAU * v).sin_cos();
        let (sin_u, cos_u) = (TAU * u).sin_cos();
        let ring = self.spiral_radius + self.wire_radius * cos_v;
        DVec3::new(
            self.height / TAU * u + self.wire_radius * sin_v,
            ring * cos_u,
            ring * sin_u,
        )
    }

    /// 弯曲到圆环上的曲面点 β（进动前）
    pub fn local(&self, u: f64, v: f64) -> DVec3 {
        let alpha = self.helix(u, v);
        let r = self.major_radius;
        let radial = r - alpha.z;
        match self.side {
            SpringSide::First => {
                let angle = -self.anchor - PI + alpha.x / r;
                DVec3::new(-radial * angle.cos(), alpha.y, radial * angle.sin() + r)
            }
            SpringSide::Second => {
                let angle = self.anchor - alpha.x / r;
                DVec3::new(radial * angle.cos(), alpha.y, radial * angle.sin() + r)
            }
        }
    }

    /// 世界坐标系中的曲面点（含进动）
    ///
    /// 渲染时网格存 [`Self::local`]，进动交给实体变换，二者等价。
    pub fn world(&self, u: f64, v: f64) -> DVec3 {
        precess(self.local(u, v), self.q2)
    }
}

/// 采样后的弹簧网格
///
/// 网格拓扑（顶点数、索引）只由细分参数决定，与帧无关；
/// 每帧只需要重写顶点位置和法向量。
#[derive(Debug, Clone)]
pub struct SpringMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    u_steps: usize,
    v_steps: usize,
    wrap_v: bool,
}

impl SpringMesh {
    /// 在 `(u, v)` 网格上采样曲面（进动前的局部坐标）
    ///
    /// ## 网格布局
    ///
    /// - u 方向：`u_steps + 1` 行，覆盖 `[0, 圈数]`，两端开口
    /// - v 方向：`wrap_v` 时 `v_steps` 列并首尾相接，否则 `v_steps + 1` 列
    pub fn tessellate(surface: &SpringSurface, params: &SpringParams) -> Self {
        let u_steps = params.u_steps.max(1);
        let v_steps = params.v_steps.max(if params.wrap_v { 3 } else { 1 });
        let columns = if params.wrap_v { v_steps } else { v_steps + 1 };
        let vertex_count = (u_steps + 1) * columns;

        let mut indices = Vec::with_capacity(u_steps * v_steps * 6);
        for i in 0..u_steps {
            for j in 0..v_steps {
                let j_next = if params.wrap_v { (j + 1) % v_steps } else { j + 1 };
                let a = (i * columns + j) as u32;
                let b = ((i + 1) * columns + j) as u32;
                let c = (i * columns + j_next) as u32;
                let d = ((i + 1) * columns + j_next) as u32;
                indices.extend_from_slice(&[a, b, c, b, d, c]);
            }
        }

        let mut mesh = Self {
            positions: vec![[0.0; 3]; vertex_count],
            normals: vec![[0.0; 3]; vertex_count],
            indices,
            u_steps,
            v_steps,
            wrap_v: params.wrap_v,
        };
        mesh.resample(surface);
        mesh
    }

    /// 按新的曲面重写顶点位置和法向量，拓扑不变
    pub fn resample(&mut self, surface: &SpringSurface) {
        let columns = self.columns();
        let u_max = f64::from(surface.coil_count);

        for i in 0..=self.u_steps {
            let u = u_max * i as f64 / self.u_steps as f64;
            for j in 0..columns {
                let v = j as f64 / self.v_steps as f64;
                self.positions[i * columns + j] = surface.local(u, v).as_vec3().to_array();
            }
        }

        self.recompute_normals();
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn columns(&self) -> usize {
        if self.wrap_v {
            self.v_steps
        } else {
            self.v_steps + 1
        }
    }

    /// 面法向量按面积加权累加到顶点，再归一化
    fn recompute_normals(&mut self) {
        let mut accumulated = vec![DVec3::ZERO; self.positions.len()];
        let position = |index: u32| DVec3::from(self.positions[index as usize].map(f64::from));

        for triangle in self.indices.chunks_exact(3) {
            let (a, b, c) = (triangle[0], triangle[1], triangle[2]);
            let face = (position(b) - position(a)).cross(position(c) - position(a));
            for index in [a, b, c] {
                accumulated[index as usize] += face;
            }
        }

        for (normal, sum) in self.normals.iter_mut().zip(accumulated) {
            *normal = sum.try_normalize().unwrap_or(DVec3::Z).as_vec3().to_array();
        }
    }
}

/// 按螺距缓存弹簧网格
///
/// 进动由实体的变换处理，网格本身只依赖螺距 h；
/// h 的变化不超过容差时跳过重新采样。
#[derive(Debug, Clone)]
pub struct SpringCache {
    last_height: Option<f64>,
    tolerance: f64,
}

impl SpringCache {
    pub fn new(tolerance: f64) -> Self {
        Self {
            last_height: None,
            tolerance: tolerance.max(0.0),
        }
    }

    /// 判断给定螺距是否需要重新采样；需要时记录该螺距
    pub fn needs_update(&mut self, height: f64) -> bool {
        let stale = match self.last_height {
            Some(last) => (height - last).abs() > self.tolerance,
            None => true,
        };
        if stale {
            self.last_height = Some(height);
        }
        stale
    }
}
