pub mod validate;

pub use validate::{normalize_url, validate_long_text, validate_url};

/// 分数的字符串形式：整数不带小数部分
pub fn format_score(score: f64) -> String {
    format!("{score}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(100.0), "100");
        assert_eq!(format_score(87.5), "87.5");
        assert_eq!(format_score(0.0), "0");
    }
}
