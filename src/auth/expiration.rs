//! 令牌有效期
//!
//! 数字表示秒；字符串按时间跨度解析，如 `"30m"`、`"1h"`、`"2 days"`。
//! 不带单位的数字字符串按毫秒计，`"60"` 是 60 毫秒而不是 60 秒。

use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 未配置时的默认有效期
pub const DEFAULT_JWT_EXPIRATION: &str = "1h";

const SECOND_MS: f64 = 1000.0;
const MINUTE_MS: f64 = SECOND_MS * 60.0;
const HOUR_MS: f64 = MINUTE_MS * 60.0;
const DAY_MS: f64 = HOUR_MS * 24.0;
const WEEK_MS: f64 = DAY_MS * 7.0;
const YEAR_MS: f64 = DAY_MS * 365.25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JwtExpiration {
    Seconds(u64),
    Span(String),
}

impl Default for JwtExpiration {
    fn default() -> Self {
        JwtExpiration::Span(DEFAULT_JWT_EXPIRATION.to_string())
    }
}

impl fmt::Display for JwtExpiration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JwtExpiration::Seconds(seconds) => write!(f, "{}", seconds),
            JwtExpiration::Span(span) => f.write_str(span),
        }
    }
}

impl JwtExpiration {
    pub fn to_duration(&self) -> Result<Duration, AuthError> {
        match self {
            JwtExpiration::Seconds(seconds) => Ok(Duration::from_secs(*seconds)),
            JwtExpiration::Span(span) => parse_span(span)
                .map(|ms| Duration::from_millis(ms as u64))
                .ok_or_else(|| AuthError::InvalidExpiration { value: span.clone() }),
        }
    }

    /// 加到签发时间上的整秒数，不足一秒的部分舍去
    pub fn whole_seconds(&self) -> Result<i64, AuthError> {
        i64::try_from(self.to_duration()?.as_secs()).map_err(|_| AuthError::InvalidExpiration {
            value: self.to_string(),
        })
    }

    /// 从签发时间算出过期时间，溢出视为无效配置
    pub fn expires_at(&self, issued_at: i64) -> Result<i64, AuthError> {
        issued_at
            .checked_add(self.whole_seconds()?)
            .ok_or_else(|| AuthError::InvalidExpiration {
                value: self.to_string(),
            })
    }
}

/// 解析时间跨度为毫秒
fn parse_span(span: &str) -> Option<f64> {
    let span = span.trim();
    let split = span
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(span.len());
    let (number, unit) = span.split_at(split);
    if number.is_empty() {
        return None;
    }
    let amount: f64 = number.parse().ok()?;

    let multiplier = match unit.trim_start().to_ascii_lowercase().as_str() {
        "" | "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => SECOND_MS,
        "m" | "min" | "mins" | "minute" | "minutes" => MINUTE_MS,
        "h" | "hr" | "hrs" | "hour" | "hours" => HOUR_MS,
        "d" | "day" | "days" => DAY_MS,
        "w" | "week" | "weeks" => WEEK_MS,
        "y" | "yr" | "yrs" | "year" | "years" => YEAR_MS,
        _ => return None,
    };

    let ms = amount * multiplier;
    ms.is_finite().then_some(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(value: &str) -> Result<Duration, AuthError> {
        JwtExpiration::Span(value.to_string()).to_duration()
    }

    #[test]
    fn test_span_units() {
        assert_eq!(span("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(span("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(span("7d").unwrap(), Duration::from_secs(7 * 86400));
        assert_eq!(span("2 days").unwrap(), Duration::from_secs(2 * 86400));
        assert_eq!(span("1.5H").unwrap(), Duration::from_secs(5400));
        assert_eq!(span("1w").unwrap(), Duration::from_secs(604800));
    }

    #[test]
    fn test_bare_number_string_is_milliseconds() {
        assert_eq!(span("60").unwrap(), Duration::from_millis(60));
        assert_eq!(JwtExpiration::Span("60".into()).whole_seconds().unwrap(), 0);
    }

    #[test]
    fn test_numeric_expiration_is_seconds() {
        let expiration: JwtExpiration = serde_json::from_str("3600").unwrap();
        assert_eq!(expiration, JwtExpiration::Seconds(3600));
        assert_eq!(expiration.whole_seconds().unwrap(), 3600);
        assert_eq!(expiration.to_string(), "3600");
    }

    #[test]
    fn test_invalid_spans() {
        for value in ["", "h", "soon", "-5m", "1 fortnight"] {
            assert!(
                matches!(span(value), Err(AuthError::InvalidExpiration { .. })),
                "{} should be rejected",
                value
            );
        }
    }

    #[test]
    fn test_default_is_one_hour() {
        assert_eq!(JwtExpiration::default().to_duration().unwrap(), Duration::from_secs(3600));
        assert_eq!(
            serde_json::to_value(JwtExpiration::default()).unwrap(),
            serde_json::json!("1h")
        );
    }

    #[test]
    fn test_out_of_range_expiration() {
        let too_large = JwtExpiration::Seconds(u64::MAX);
        assert!(matches!(
            too_large.whole_seconds(),
            Err(AuthError::InvalidExpiration { .. })
        ));

        let overflowing = JwtExpiration::Seconds(i64::MAX as u64);
        assert_eq!(overflowing.whole_seconds().unwrap(), i64::MAX);
        assert!(matches!(
            overflowing.expires_at(1_700_000_000),
            Err(AuthError::InvalidExpiration { .. })
        ));

        assert_eq!(JwtExpiration::Seconds(60).expires_at(1_000).unwrap(), 1_060);
    }
}
