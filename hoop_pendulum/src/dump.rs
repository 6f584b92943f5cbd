//! # 位姿导出
//!
//! 不打开窗口，直接把每一帧的刚体位置写成文本表格，
//! 便于把运动学映射移植到其他渲染器。

use crate::hoop::{pose, HoopGeometry, Sample, SpringParams, SpringSide, SpringSurface, Trajectory};
use std::io::{self, Write};

/// 逐帧写出位姿
///
/// 每行格式：
/// ```text
/// frame  t  q1 q2 q3  ax ay az  bx by bz  s1x s1y s1z  s2x s2y s2z
/// ```
/// `a`、`b` 为两个摆锤的球心，`s1`、`s2` 为两根弹簧在摆锤一端
/// （`u = 圈数, v = 0`）的曲面点，均为进动后的世界坐标。
/// 圆环和立柱的位置固定，其姿态只由 q2 决定。
pub fn write_poses<W: Write>(
    geometry: &HoopGeometry,
    params: &SpringParams,
    trajectory: &Trajectory,
    mut out: W,
) -> io::Result<()> {
    writeln!(out, "# frame t q1 q2 q3 ax ay az bx by bz s1x s1y s1z s2x s2y s2z")?;

    let rows = trajectory
        .times()
        .iter()
        .zip(trajectory.q1())
        .zip(trajectory.q2())
        .zip(trajectory.q3());
    let u_end = f64::from(params.coil_count);

    for (n, (((&t, &q1), &q2), &q3)) in rows.enumerate() {
        let sample = Sample { t, q1, q2, q3 };
        let bodies = pose(geometry, trajectory, n);
        let a = bodies.sphere_a.position;
        let b = bodies.sphere_b.position;
        let [s1, s2] = SpringSide::ALL
            .map(|side| SpringSurface::new(side, geometry, params, &sample).world(u_end, 0.0));

        writeln!(
            out,
            "{n} {t} {q1} {q2} {q3} {} {} {} {} {} {} {} {} {} {} {} {}",
            a.x, a.y, a.z, b.x, b.y, b.z, s1.x, s1.y, s1.z, s2.x, s2.y, s2.z
        )?;
    }
    out.flush()
}
