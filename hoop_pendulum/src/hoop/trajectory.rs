//! # 轨迹模块
//!
//! 读取上游仿真输出的广义坐标时间序列。
//!
//! ## 文件格式
//!
//! ```text
//! t_0  q1_0  q2_0  q3_0  [u1_0 ... un_0]
//! t_1  q1_1  q2_1  q3_1  [u1_1 ... un_1]
//! ...
//! ```
//!
//! 只使用前4列，其余列（广义速度）被忽略。空白行被跳过。

use super::error::TrajectoryError;
use std::path::Path;

/// 单帧采样
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// 时间 (s)
    pub t: f64,
    /// 摆臂1沿圆环的伸长坐标
    pub q1: f64,
    /// 整个圆环绕竖直轴的转角（进动）
    pub q2: f64,
    /// 摆臂2沿圆环的伸长坐标
    pub q3: f64,
}

/// 广义坐标轨迹
///
/// 按列存储：四个序列长度始终相等，长度 N 即动画总帧数。
/// 加载后不可变。
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    t: Vec<f64>,
    q1: Vec<f64>,
    q2: Vec<f64>,
    q3: Vec<f64>,
}

impl Trajectory {
    /// 从文件加载轨迹
    ///
    /// 文件缺失、为空或任意一行格式错误都会导致整个加载失败。
    /// 加载发生在日志系统初始化之前，摘要由场景启动时输出。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrajectoryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| TrajectoryError::unreadable(path, source))?;
        Self::parse(&text)
    }

    /// 从内存中的文本解析轨迹
    pub fn parse(text: &str) -> Result<Self, TrajectoryError> {
        let mut trajectory = Self {
            t: Vec::new(),
            q1: Vec::new(),
            q2: Vec::new(),
            q3: Vec::new(),
        };

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() < 4 {
                return Err(TrajectoryError::too_few_columns(line_no, fields.len()));
            }

            let mut row = [0.0_f64; 4];
            for (column, (slot, token)) in row.iter_mut().zip(&fields).enumerate() {
                *slot = token
                    .parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| TrajectoryError::bad_number(line_no, column + 1, *token))?;
            }

            trajectory.t.push(row[0]);
            trajectory.q1.push(row[1]);
            trajectory.q2.push(row[2]);
            trajectory.q3.push(row[3]);
        }

        if trajectory.is_empty() {
            return Err(TrajectoryError::Empty);
        }

        Ok(trajectory)
    }

    /// 帧数 N
    pub fn len(&self) -> usize {
        self.t.len()
    }

    /// 是否为空（成功加载的轨迹永远非空）
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// 将任意帧号限制到 `[0, N-1]`
    pub fn clamp_frame(&self, n: usize) -> usize {
        n.min(self.len().saturating_sub(1))
    }

    /// 取第 n 帧的采样，越界时取最近的有效帧
    pub fn sample(&self, n: usize) -> Sample {
        let n = self.clamp_frame(n);
        Sample {
            t: self.t[n],
            q1: self.q1[n],
            q2: self.q2[n],
            q3: self.q3[n],
        }
    }

    /// 首帧和末帧的时间
    pub fn time_span(&self) -> (f64, f64) {
        match (self.t.first(), self.t.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => (0.0, 0.0),
        }
    }

    /// 轨迹覆盖的时间跨度
    pub fn duration(&self) -> f64 {
        let (first, last) = self.time_span();
        last - first
    }

    pub fn times(&self) -> &[f64] {
        &self.t
    }

    pub fn q1(&self) -> &[f64] {
        &self.q1
    }

    pub fn q2(&self) -> &[f64] {
        &self.q2
    }

    pub fn q3(&self) -> &[f64] {
        &self.q3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_equal_lengths() {
        let file = write_temp(
            "0.0 0.1 0.2 0.3 9.0 9.0 9.0\n\
             0.1 0.2 0.3 0.4 9.0 9.0 9.0\n\
             0.2 0.3 0.4 0.5 9.0 9.0 9.0\n",
        );
        let trajectory = Trajectory::load(file.path()).unwrap();

        assert_eq!(trajectory.len(), 3);
        assert_eq!(trajectory.times().len(), 3);
        assert_eq!(trajectory.q1().len(), 3);
        assert_eq!(trajectory.q2().len(), 3);
        assert_eq!(trajectory.q3().len(), 3);

        assert_eq!(trajectory.times(), &[0.0, 0.1, 0.2]);
        assert_eq!(trajectory.q1(), &[0.1, 0.2, 0.3]);
        // 多余的列被忽略
        assert_eq!(trajectory.q3(), &[0.3, 0.4, 0.5]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Trajectory::load("/definitely/not/here/maple_data.txt").unwrap_err();
        assert!(matches!(err, TrajectoryError::Unreadable { .. }));
    }

    #[test]
    fn test_too_few_columns() {
        let err = Trajectory::parse("0 0 0 0\n0 1 2\n").unwrap_err();
        assert!(matches!(
            err,
            TrajectoryError::TooFewColumns { line: 2, found: 3 }
        ));
    }

    #[test]
    fn test_bad_number() {
        let err = Trajectory::parse("0 0 x 0\n").unwrap_err();
        assert!(matches!(
            err,
            TrajectoryError::BadNumber { line: 1, column: 3, .. }
        ));

        let err = Trajectory::parse("0 NaN 0 0\n").unwrap_err();
        assert!(matches!(err, TrajectoryError::BadNumber { column: 2, .. }));
    }

    #[test]
    fn test_bad_extra_column_is_ignored() {
        let trajectory = Trajectory::parse("0 0 0 0 not-a-number\n").unwrap();
        assert_eq!(trajectory.len(), 1);
    }

    #[test]
    fn test_empty_file() {
        assert!(matches!(Trajectory::parse(""), Err(TrajectoryError::Empty)));
        assert!(matches!(
            Trajectory::parse("  \n\t\n"),
            Err(TrajectoryError::Empty)
        ));
    }

    #[test]
    fn test_sample_clamped() {
        let trajectory = Trajectory::parse("0 1 2 3\n1 4 5 6\n").unwrap();

        assert_eq!(trajectory.clamp_frame(0), 0);
        assert_eq!(trajectory.clamp_frame(1), 1);
        assert_eq!(trajectory.clamp_frame(100), 1);

        let last = trajectory.sample(100);
        assert_eq!(
            last,
            Sample {
                t: 1.0,
                q1: 4.0,
                q2: 5.0,
                q3: 6.0
            }
        );
        assert_eq!(trajectory.duration(), 1.0);
    }

    #[test]
    fn test_time_span() {
        let trajectory = Trajectory::parse("0.5 0 0 0\n\n1.0 0 0 0\n2.25 0 0 0\n").unwrap();
        assert_eq!(trajectory.len(), 3);
        assert_eq!(trajectory.time_span(), (0.5, 2.25));
        assert_eq!(trajectory.duration(), 1.75);

        let single = Trajectory::parse("3 0 0 0\n").unwrap();
        assert_eq!(single.time_span(), (3.0, 3.0));
        assert_eq!(single.duration(), 0.0);
    }
}
