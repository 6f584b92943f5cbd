//! # Hoop Pendulum Kinematics
//!
//! 圆环双摆系统的可视化核心：读取广义坐标轨迹，并用闭式运动学公式
//! 计算每一帧的刚体位姿和弹簧曲面。
//!
//! ## 核心概念
//!
//! - **广义坐标**: q1、q3 为两根摆臂沿圆环的伸长，q2 为整个圆环绕竖直轴的进动角
//! - **前向运动学**: 先在圆环局部坐标系中放置物体，再统一绕Z轴进动
//! - **弹簧曲面**: 螺旋管参数方程弯曲到圆环上，每帧随螺距重新采样
//!
//! 本模块只依赖 `bevy::math`，不需要窗口或渲染即可测试。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use hoop::*;
//!
//! let trajectory = Trajectory::load("maple_data.txt")?;
//! let geometry = HoopGeometry::default();
//!
//! for n in 0..trajectory.len() {
//!     let pose = pose(&geometry, &trajectory, n);
//!     println!("{:?}", pose.sphere_a.position);
//! }
//! ```

pub mod error;
pub mod kinematics;
pub mod model;
pub mod spring;
pub mod trajectory;

// Re-export commonly used types
pub use kinematics::{pose, pose_from_sample, BodyKind};
pub use model::{HoopGeometry, SpringParams, StaticLayout, StaticPlacement};
pub use spring::{SpringCache, SpringMesh, SpringSide, SpringSurface};
pub use trajectory::{Sample, Trajectory};
