use serde::Deserialize;

/// 添加评论请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddCommentRequest {
    // 为空时默认为提交者本人
    pub author_id: Option<i64>,
    pub comment: Option<String>,
    pub media_comment_id: Option<String>,
    pub media_comment_type: Option<String>,
    #[serde(default)]
    pub attachment_ids: Vec<i64>,
    pub assessment_request_id: Option<i64>,
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default)]
    pub hidden: bool,
    // 小组评论去重键，缺省为当天日期
    pub unique_key: Option<String>,
}
