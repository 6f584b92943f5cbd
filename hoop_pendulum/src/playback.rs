//! # 时间轴
//!
//! 按帧率推进当前帧，并在帧变化时发送 [`FrameChanged`] 事件。
//!
//! ## 帧状态机
//!
//! ```text
//! Uninitialized → StaticGeometryPlaced → Frame(0) → Frame(n) → ...
//! ```
//!
//! 每个 `Frame(n)` 都从 `Trajectory[n]` 完整重算，不依赖上一帧。

use bevy::log::{info, warn};
use bevy::prelude::*;

/// 帧变化事件，携带新的帧号
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameChanged(pub usize);

/// 当前所处的帧状态
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramePhase {
    #[default]
    Uninitialized,
    StaticGeometryPlaced,
    Frame(usize),
}

/// 播放时间轴
///
/// 帧号从0开始，总帧数等于轨迹长度。
#[derive(Resource, Debug, Clone)]
pub struct Timeline {
    current: usize,
    total: usize,
    fps: f64,
    playing: bool,
    looping: bool,
    accumulator: f64,
    clamp_warned: bool,
}

impl Timeline {
    pub fn new(total: usize, fps: f64, looping: bool) -> Self {
        Self {
            current: 0,
            total: total.max(1),
            fps,
            playing: true,
            looping,
            accumulator: 0.0,
            clamp_warned: false,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// 播放/暂停
    ///
    /// 不循环且停在最后一帧时，重新播放会回到第一帧，此时返回新的帧号。
    pub fn toggle_playing(&mut self) -> Option<usize> {
        self.playing = !self.playing;
        self.accumulator = 0.0;
        let rewind = self.playing && !self.looping && self.current + 1 >= self.total;
        if rewind && self.current != 0 {
            self.current = 0;
            return Some(0);
        }
        None
    }

    /// 推进 `dt` 秒
    ///
    /// 帧号变化时返回新的帧号。不循环时到达最后一帧后自动暂停。
    pub fn tick(&mut self, dt: f64) -> Option<usize> {
        if !self.playing || self.total <= 1 || dt <= 0.0 {
            return None;
        }

        let period = 1.0 / self.fps;
        self.accumulator += dt;
        let steps = (self.accumulator / period).floor();
        if steps < 1.0 {
            return None;
        }
        self.accumulator -= steps * period;

        let previous = self.current;
        let target = self.current as f64 + steps;
        if target < self.total as f64 {
            self.current = target as usize;
        } else if self.looping {
            self.current = (target % self.total as f64) as usize;
        } else {
            self.current = self.total - 1;
            self.playing = false;
            self.accumulator = 0.0;
        }

        (self.current != previous).then_some(self.current)
    }

    /// 跳转到第 n 帧，越界时取最近的有效帧
    pub fn seek(&mut self, n: usize) -> usize {
        if n >= self.total && !self.clamp_warned {
            warn!(
                "Frame {} is outside the trajectory (0..{}), clamping",
                n, self.total
            );
            self.clamp_warned = true;
        }
        self.current = n.min(self.total - 1);
        self.accumulator = 0.0;
        self.current
    }

    /// 前进或后退若干帧
    pub fn step(&mut self, delta: isize) -> usize {
        let target = self.current.saturating_add_signed(delta);
        self.seek(target.min(self.total - 1))
    }
}

/// 按时间推进时间轴
pub fn advance_timeline(
    time: Res<Time>,
    mut timeline: ResMut<Timeline>,
    mut frames: EventWriter<FrameChanged>,
) {
    if let Some(n) = timeline.tick(time.delta_secs_f64()) {
        frames.send(FrameChanged(n));
    }
}

/// 键盘控制播放
///
/// - Space: 播放/暂停
/// - ←/→: 单帧步进（按住Shift时留给相机）
/// - Home/End: 第一帧/最后一帧
pub fn playback_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut timeline: ResMut<Timeline>,
    mut frames: EventWriter<FrameChanged>,
) {
    if keyboard.just_pressed(KeyCode::Space) {
        if let Some(n) = timeline.toggle_playing() {
            frames.send(FrameChanged(n));
        }
        info!(
            "{} at frame {}",
            if timeline.is_playing() { "Playing" } else { "Paused" },
            timeline.current()
        );
    }

    let shifted = keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]);
    let before = timeline.current();
    let mut requested = None;

    if !shifted && keyboard.just_pressed(KeyCode::ArrowLeft) {
        requested = Some(timeline.step(-1));
    }
    if !shifted && keyboard.just_pressed(KeyCode::ArrowRight) {
        requested = Some(timeline.step(1));
    }
    if keyboard.just_pressed(KeyCode::Home) {
        requested = Some(timeline.seek(0));
    }
    if keyboard.just_pressed(KeyCode::End) {
        let last = timeline.total() - 1;
        requested = Some(timeline.seek(last));
    }

    if let Some(n) = requested.filter(|&n| n != before) {
        frames.send(FrameChanged(n));
    }
}
