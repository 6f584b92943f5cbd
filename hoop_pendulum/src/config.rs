//! # 命令行配置
//!
//! 解析命令行参数，生成运行时使用的 [`Settings`]。

use crate::hoop::SpringParams;
use bevy::prelude::Resource;
use clap::Parser;
use std::path::PathBuf;

/// Animate a two-pendulum-on-a-hoop trajectory.
#[derive(Debug, Parser)]
#[command(name = "hoop_pendulum")]
#[command(about = "Visualize a two-pendulum-on-a-hoop trajectory", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Whitespace-separated table with columns `t q1 q2 q3 [...]`
    #[arg(default_value = "maple_data.txt")]
    pub data: PathBuf,

    /// Playback rate in frames per second
    #[arg(long, default_value_t = 24.0)]
    pub fps: f64,

    /// Stop at the last frame instead of looping
    #[arg(long)]
    pub no_loop: bool,

    /// Do not draw the springs
    #[arg(long)]
    pub no_springs: bool,

    /// Tessellation steps along both spring parameters
    #[arg(long, default_value_t = 200)]
    pub spring_steps: usize,

    /// Close the seam of the spring tube cross-section
    #[arg(long)]
    pub close_seam: bool,

    /// First frame to show (clamped to the trajectory)
    #[arg(long, default_value_t = 0)]
    pub start_frame: usize,

    /// Print every frame's body positions to stdout and exit
    #[arg(long)]
    pub dump_poses: bool,
}

/// 运行时设置
#[derive(Debug, Clone, Resource)]
pub struct Settings {
    pub fps: f64,
    pub looping: bool,
    pub springs_enabled: bool,
    pub start_frame: usize,
    pub spring: SpringParams,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings {
            fps: if self.fps.is_finite() && self.fps > 0.0 {
                self.fps
            } else {
                24.0
            },
            looping: !self.no_loop,
            springs_enabled: !self.no_springs,
            start_frame: self.start_frame,
            spring: SpringParams {
                u_steps: self.spring_steps.max(1),
                v_steps: self.spring_steps.max(1),
                wrap_v: self.close_seam,
                ..SpringParams::default()
            },
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps: 24.0,
            looping: true,
            springs_enabled: true,
            start_frame: 0,
            spring: SpringParams::default(),
        }
    }
}
