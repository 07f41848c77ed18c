//! 通知触发条件
//!
//! 保存提交后，对上一快照与新快照逐条判断各类通知是否应当发出。
//! 各条件互相独立，同一次保存可能触发多条通知。

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::models::assignments::entities::Assignment;
use crate::models::notifications::entities::{NotificationEvent, NotificationKind};
use crate::models::submissions::entities::{Submission, SubmissionType, WorkflowState};

/// 作业整体发布成绩后的抑制窗口
pub const BULK_PUBLISH_WINDOW: TimeDelta = TimeDelta::hours(1);

/// 单次保存的广播控制
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastFlags {
    // 程序化保存（如批量导入）不发通知
    pub suppress_broadcast: bool,
    pub group_broadcast: bool,
    pub assignment_just_published: bool,
}

/// 一次保存前后的对照
pub struct Transition<'a> {
    pub previous: Option<&'a Submission>,
    pub current: &'a Submission,
    pub assignment: &'a Assignment,
    pub flags: BroadcastFlags,
    pub now: DateTime<Utc>,
}

impl Transition<'_> {
    fn changed_state_to(&self, state: WorkflowState) -> bool {
        self.current.workflow_state == state
            && self.previous.is_none_or(|p| p.workflow_state != state)
    }

    fn just_created_submitted(&self) -> bool {
        self.previous.is_none() && self.current.workflow_state == WorkflowState::Submitted
    }

    fn submitted_at_changed(&self) -> bool {
        self.previous
            .is_some_and(|p| p.submitted_at != self.current.submitted_at)
    }

    // 在 graded 状态内分数或等级发生变化
    fn changed_in_graded(&self) -> bool {
        self.previous.is_some_and(|p| {
            p.workflow_state == WorkflowState::Graded
                && self.current.workflow_state == WorkflowState::Graded
                && (p.score != self.current.score || p.grade != self.current.grade)
        })
    }

    fn graded_in_last_hour(&self) -> bool {
        self.previous
            .and_then(|p| p.graded_at)
            .is_some_and(|graded_at| graded_at > self.now - BULK_PUBLISH_WINDOW)
    }

    fn submission_time(&self) -> DateTime<Utc> {
        self.current.submitted_at.unwrap_or(self.now)
    }

    fn past_due(&self) -> bool {
        self.assignment.is_past_due(self.submission_time())
    }

    fn broadcast_allowed(&self) -> bool {
        !self.flags.suppress_broadcast && self.assignment.context_available
    }

    fn grade_broadcast_allowed(&self) -> bool {
        self.broadcast_allowed() && !self.assignment.muted && self.assignment.published
    }

    fn submission_event(&self) -> bool {
        self.just_created_submitted()
            || self.changed_state_to(WorkflowState::Submitted)
            || self.submitted_at_changed()
    }

    fn submitted_with_content(&self) -> bool {
        self.current.is_submitted() && self.current.has_submission()
    }
}

/// 截止后提交
pub fn assignment_submitted_late(t: &Transition) -> bool {
    t.broadcast_allowed() && t.submission_event() && t.submitted_with_content() && t.past_due()
}

/// 按时提交，或未截止前重新提交
pub fn assignment_submitted(t: &Transition) -> bool {
    t.broadcast_allowed() && t.submission_event() && t.submitted_with_content() && !t.past_due()
}

/// 重新提交；截止后的重新提交已经发过迟交通知
pub fn assignment_resubmitted(t: &Transition) -> bool {
    t.broadcast_allowed()
        && t.submitted_with_content()
        && t.previous.is_some_and(|p| p.submitted_at.is_some())
        && t.submitted_at_changed()
        && !t.past_due()
}

/// 小组提交的迟交通知，由小组广播路径单独触发
pub fn group_assignment_submitted_late(t: &Transition) -> bool {
    t.broadcast_allowed()
        && t.flags.group_broadcast
        && (t.just_created_submitted() || t.changed_state_to(WorkflowState::Submitted))
        && t.current.workflow_state == WorkflowState::Submitted
        && t.past_due()
}

pub fn submission_graded(t: &Transition) -> bool {
    t.grade_broadcast_allowed()
        && (t.changed_state_to(WorkflowState::Graded)
            || (t.changed_in_graded()
                && !t.flags.assignment_just_published
                && t.graded_in_last_hour()))
}

/// 成绩变更；测验不受批量发布窗口限制
pub fn submission_grade_changed(t: &Transition) -> bool {
    t.grade_broadcast_allowed()
        && t.current.graded_at.is_some()
        && (!t.graded_in_last_hour()
            || t.current.submission_type == Some(SubmissionType::OnlineQuiz))
        && (t.flags.assignment_just_published
            || (t.changed_in_graded() && !t.graded_in_last_hour()))
}

type Predicate = fn(&Transition) -> bool;

const PREDICATES: [(NotificationKind, Predicate); 6] = [
    (
        NotificationKind::AssignmentSubmittedLate,
        assignment_submitted_late,
    ),
    (NotificationKind::AssignmentSubmitted, assignment_submitted),
    (NotificationKind::AssignmentResubmitted, assignment_resubmitted),
    (
        NotificationKind::GroupAssignmentSubmittedLate,
        group_assignment_submitted_late,
    ),
    (NotificationKind::SubmissionGraded, submission_graded),
    (NotificationKind::SubmissionGradeChanged, submission_grade_changed),
];

/// 逐条判断，返回需要发出的通知
pub fn evaluate(transition: &Transition) -> Vec<NotificationEvent> {
    let current = transition.current;
    let events: Vec<NotificationEvent> = PREDICATES
        .iter()
        .filter(|(_, predicate)| predicate(transition))
        .map(|(kind, _)| NotificationEvent {
            kind: *kind,
            recipient: kind.recipient_for(current.user_id, transition.assignment.context_id),
            submission_id: current.id,
            assignment_id: current.assignment_id,
            user_id: current.user_id,
            occurred_at: transition.now,
        })
        .collect();

    if !events.is_empty() {
        debug!(
            "Submission {} raised notifications: {:?}",
            current.id,
            events.iter().map(|e| e.kind.as_str()).collect::<Vec<_>>()
        );
    }
    events
}
