use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// 相似度严重程度分档
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityBucket {
    None,       // 0
    Acceptable, // < 25
    Warning,    // < 50
    Problem,    // < 75
    Failure,    // >= 75
}

impl SimilarityBucket {
    pub fn from_score(similarity_score: f64) -> Self {
        if similarity_score == 0.0 {
            SimilarityBucket::None
        } else if similarity_score < 25.0 {
            SimilarityBucket::Acceptable
        } else if similarity_score < 50.0 {
            SimilarityBucket::Warning
        } else if similarity_score < 75.0 {
            SimilarityBucket::Problem
        } else {
            SimilarityBucket::Failure
        }
    }
}

// 单个资源的查重状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    #[default]
    NotChecked,
    Pending,
    Scored,
    Error,
}

/// 查重服务返回的报告
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SimilarityReport {
    pub similarity_score: f64,
    pub web_overlap: f64,
    pub publication_overlap: f64,
    pub student_overlap: f64,
}

/// 以资源标识（如 `attachment_12`）为键的查重记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PlagiarismAsset {
    pub state: CheckState,
    pub similarity_score: Option<f64>,
    pub web_overlap: Option<f64>,
    pub publication_overlap: Option<f64>,
    pub student_overlap: Option<f64>,
    pub bucket: Option<SimilarityBucket>,
    // 已执行的轮询次数
    pub polls: u32,
    pub error: bool,
}

impl PlagiarismAsset {
    pub fn pending() -> Self {
        Self {
            state: CheckState::Pending,
            ..Default::default()
        }
    }

    pub fn record_report(&mut self, report: &SimilarityReport) {
        self.similarity_score = Some(report.similarity_score);
        self.web_overlap = Some(report.web_overlap);
        self.publication_overlap = Some(report.publication_overlap);
        self.student_overlap = Some(report.student_overlap);
        self.bucket = Some(SimilarityBucket::from_score(report.similarity_score));
        self.state = CheckState::Scored;
    }

    pub fn mark_error(&mut self) {
        self.error = true;
        self.state = CheckState::Error;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PlagiarismData {
    pub last_processed_attempt: Option<i32>,
    pub assets: BTreeMap<String, PlagiarismAsset>,
}

impl PlagiarismData {
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn asset(&self, asset_string: &str) -> Option<&PlagiarismAsset> {
        self.assets.get(asset_string)
    }

    pub fn asset_mut(&mut self, asset_string: &str) -> Option<&mut PlagiarismAsset> {
        self.assets.get_mut(asset_string)
    }
}
