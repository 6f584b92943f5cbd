//! # Hoop Pendulum Visualizer
//!
//! 圆环双摆系统可视化程序
//!
//! 读取上游仿真输出的广义坐标时间序列，用闭式运动学公式逐帧计算圆环、
//! 立柱、两个摆锤的位姿以及两根弹簧的曲面，并用Bevy渲染。
//!
//! ## 模块组织
//!
//! - `hoop`: 轨迹加载与运动学核心（不依赖渲染）
//! - `scene`: Bevy场景适配层
//! - `playback`: 时间轴与帧事件
//! - `config`: 命令行参数
//! - `dump`: 无窗口的位姿导出
//! - `main`: Bevy渲染和主循环

mod config;
mod dump;
mod hoop;
mod playback;
mod scene;

use anyhow::Context;
use bevy::prelude::*;
use clap::Parser;
use config::Cli;
use hoop::{HoopGeometry, Trajectory};
use playback::Timeline;
use scene::{HoopModel, HoopPlugin};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings();

    // 轨迹在创建任何几何体之前一次性读入，格式错误直接退出
    let trajectory = Trajectory::load(&cli.data)
        .with_context(|| format!("failed to load trajectory {}", cli.data.display()))?;
    let geometry = HoopGeometry::default();

    if cli.dump_poses {
        let stdout = std::io::stdout();
        dump::write_poses(&geometry, &settings.spring, &trajectory, stdout.lock())
            .context("failed to write poses")?;
        return Ok(());
    }

    let timeline = Timeline::new(trajectory.len(), settings.fps, settings.looping);

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Hoop Pendulum - Trajectory Playback".to_string(),
                resolution: (1280.0, 720.0).into(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(ClearColor(Color::srgb(0.1, 0.1, 0.15)))
        .insert_resource(HoopModel {
            geometry,
            trajectory,
        })
        .insert_resource(settings)
        .insert_resource(timeline)
        .add_plugins(HoopPlugin::interactive())
        .add_systems(Startup, setup)
        .add_systems(Update, camera_controller)
        .run();

    Ok(())
}

/// 初始化光照和相机
fn setup(mut commands: Commands) {
    commands.spawn((
        DirectionalLight {
            illuminance: 10000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(12.0, -20.0, 25.0).looking_at(Vec3::new(0.0, 0.0, 3.0), Dir3::Z),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 4000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(-15.0, -10.0, 10.0).looking_at(Vec3::new(0.0, 0.0, 3.0), Dir3::Z),
    ));

    // 相机（Z轴向上的坐标系，从背景板对面看向圆环）
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, -28.0, 9.0).looking_at(Vec3::new(0.0, 0.0, 3.0), Dir3::Z),
    ));

    info!("Controls:");
    info!("  Space: play / pause");
    info!("  Left/Right: step one frame, Home/End: first / last frame");
    info!("  S: toggle springs");
    info!("  Shift + Arrow Keys: rotate / zoom camera");
}

/// 相机控制器（按住Shift时生效，方向键留给时间轴）
fn camera_controller(
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut query: Query<&mut Transform, With<Camera3d>>,
) {
    if !keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]) {
        return;
    }

    let target = Vec3::new(0.0, 0.0, 3.0);

    for mut transform in query.iter_mut() {
        let mut rotation_delta: f32 = 0.0;
        let mut zoom_delta: f32 = 0.0;

        if keyboard.pressed(KeyCode::ArrowLeft) {
            rotation_delta -= 1.0;
        }
        if keyboard.pressed(KeyCode::ArrowRight) {
            rotation_delta += 1.0;
        }
        if keyboard.pressed(KeyCode::ArrowUp) {
            zoom_delta -= 1.0;
        }
        if keyboard.pressed(KeyCode::ArrowDown) {
            zoom_delta += 1.0;
        }

        // 绕Z轴旋转（Z轴向上的坐标系）
        if rotation_delta.abs() > 0.01 {
            let rotation = Quat::from_rotation_z(rotation_delta * time.delta_secs());
            transform.translation = rotation * transform.translation;
            transform.look_at(target, Dir3::Z);
        }

        // 缩放
        if zoom_delta.abs() > 0.01 {
            let direction = (transform.translation - target).normalize();
            transform.translation += direction * zoom_delta * time.delta_secs() * 10.0;
        }
    }
}
