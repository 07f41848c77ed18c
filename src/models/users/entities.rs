use serde::{Deserialize, Serialize};

// 针对提交的操作能力
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Read,
    ReadComments,
    Comment,
    MakeGroupComment,
    ReadGrade,
    Submit,
    Grade,
    ViewPlagiarismReport,
}

impl Capability {
    pub fn all() -> &'static [Capability] {
        &[
            Capability::Read,
            Capability::ReadComments,
            Capability::Comment,
            Capability::MakeGroupComment,
            Capability::ReadGrade,
            Capability::Submit,
            Capability::Grade,
            Capability::ViewPlagiarismReport,
        ]
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Capability::Read => "read",
            Capability::ReadComments => "read_comments",
            Capability::Comment => "comment",
            Capability::MakeGroupComment => "make_group_comment",
            Capability::ReadGrade => "read_grade",
            Capability::Submit => "submit",
            Capability::Grade => "grade",
            Capability::ViewPlagiarismReport => "view_plagiarism_report",
        };
        write!(f, "{s}")
    }
}

/// 发起操作的用户及其在课程中的权限
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i64,
    // 课程层面：可管理成绩（教师/助教）
    pub manage_grades: bool,
    // 课程层面：可查看全部成绩
    pub view_all_grades: bool,
    // 以观察者身份（家长等）关联的学生，仅含有效关联
    pub observed_user_ids: Vec<i64>,
}

impl Actor {
    pub fn student(user_id: i64) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    pub fn grader(user_id: i64) -> Self {
        Self {
            user_id,
            manage_grades: true,
            view_all_grades: true,
            ..Default::default()
        }
    }

    pub fn observer_of(user_id: i64, observed: &[i64]) -> Self {
        Self {
            user_id,
            observed_user_ids: observed.to_vec(),
            ..Default::default()
        }
    }
}
