use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::format_score;

// 评分方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GradingType {
    #[default]
    Points, // 按分数
    Percent,     // 百分比
    PassFail,    // 通过/不通过
    LetterGrade, // 等级制
}

// 查重报告对学生的可见时机
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportVisibility {
    #[default]
    Immediate,
    AfterGrading,
    AfterDueDate,
    Never,
}

/// 等级制档位：得分率不低于 `min_fraction` 即取该等级
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradingSchemeEntry {
    pub name: String,
    pub min_fraction: f64,
}

/// 默认等级方案
pub fn default_grading_scheme() -> Vec<GradingSchemeEntry> {
    [
        ("A", 0.94),
        ("A-", 0.90),
        ("B+", 0.87),
        ("B", 0.84),
        ("B-", 0.80),
        ("C+", 0.77),
        ("C", 0.74),
        ("C-", 0.70),
        ("D+", 0.67),
        ("D", 0.64),
        ("D-", 0.61),
        ("F", 0.0),
    ]
    .into_iter()
    .map(|(name, min_fraction)| GradingSchemeEntry {
        name: name.to_string(),
        min_fraction,
    })
    .collect()
}

/// 作业（评分策略部分）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    pub id: i64,
    // 所属课程/班级
    pub context_id: i64,
    pub title: String,
    pub points_possible: f64,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub grading_type: GradingType,
    pub grading_scheme: Vec<GradingSchemeEntry>,
    pub due_at: Option<DateTime<Utc>>,
    pub muted: bool,
    pub published: bool,
    // 所属课程是否处于可用状态
    pub context_available: bool,
    pub plagiarism_enabled: bool,
    pub originality_report_visibility: ReportVisibility,
    // 测验作业关联的测验
    pub quiz_id: Option<i64>,
}

impl Default for Assignment {
    fn default() -> Self {
        Self {
            id: 0,
            context_id: 0,
            title: String::new(),
            points_possible: 0.0,
            min_score: None,
            max_score: None,
            grading_type: GradingType::Points,
            grading_scheme: default_grading_scheme(),
            due_at: None,
            muted: false,
            published: true,
            context_available: true,
            plagiarism_enabled: false,
            originality_report_visibility: ReportVisibility::Immediate,
            quiz_id: None,
        }
    }
}

impl Assignment {
    /// 把分数钳制到作业配置的区间内
    pub fn clamp_score(&self, score: f64) -> f64 {
        let mut score = score;
        if let Some(max) = self.max_score
            && score > max
        {
            score = max;
        }
        if let Some(min) = self.min_score
            && score < min
        {
            score = min;
        }
        score
    }

    /// 是否应由分数推导等级
    pub fn derives_grade(&self) -> bool {
        self.points_possible > 0.0 || self.grading_type != GradingType::PassFail
    }

    /// 分数转等级
    pub fn score_to_grade(&self, score: f64) -> String {
        match self.grading_type {
            GradingType::Points => format_score(score),
            GradingType::Percent => {
                if self.points_possible > 0.0 {
                    let percent = (score / self.points_possible * 1000.0).round() / 10.0;
                    format!("{}%", format_score(percent))
                } else {
                    format_score(score)
                }
            }
            GradingType::PassFail => {
                if self.points_possible > 0.0 && score >= self.points_possible {
                    "complete".to_string()
                } else {
                    "incomplete".to_string()
                }
            }
            GradingType::LetterGrade => {
                if self.points_possible <= 0.0 {
                    return format_score(score);
                }
                let fraction = score / self.points_possible;
                self.grading_scheme
                    .iter()
                    .filter(|entry| fraction >= entry.min_fraction)
                    .max_by(|a, b| a.min_fraction.total_cmp(&b.min_fraction))
                    .or_else(|| {
                        self.grading_scheme
                            .iter()
                            .min_by(|a, b| a.min_fraction.total_cmp(&b.min_fraction))
                    })
                    .map(|entry| entry.name.clone())
                    .unwrap_or_else(|| format_score(score))
            }
        }
    }

    /// 等级转分数（手动录入等级时使用）
    pub fn grade_to_score(&self, grade: &str) -> Option<f64> {
        let grade = grade.trim();
        match self.grading_type {
            GradingType::Points => grade.parse::<f64>().ok(),
            GradingType::Percent => grade
                .trim_end_matches('%')
                .parse::<f64>()
                .ok()
                .map(|p| p / 100.0 * self.points_possible),
            GradingType::PassFail => match grade.to_lowercase().as_str() {
                "complete" | "pass" => Some(self.points_possible),
                "incomplete" | "fail" => Some(0.0),
                _ => None,
            },
            GradingType::LetterGrade => self
                .grading_scheme
                .iter()
                .find(|entry| entry.name.eq_ignore_ascii_case(grade))
                .map(|entry| entry.min_fraction * self.points_possible)
                .or_else(|| grade.parse::<f64>().ok()),
        }
    }

    /// 截止时间是否已过
    pub fn is_past_due(&self, at: DateTime<Utc>) -> bool {
        self.due_at.is_some_and(|due| due <= at)
    }
}
