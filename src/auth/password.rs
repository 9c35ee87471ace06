//! 密码哈希
//!
//! 存储的哈希是 `bcrypt(hex(sha256(password)))`。先做固定摘要再做加盐哈希
//! 对安全性没有增益，保留它只是为了兼容已有的配置文档。

use crate::error::AuthError;
use sha2::{Digest, Sha256};
use tracing::warn;

pub use bcrypt::DEFAULT_COST;

/// 固定摘要：sha256 的小写十六进制
pub fn digest_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// 生成与登录校验兼容的密码哈希
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    hash_password_with_cost(password, DEFAULT_COST)
}

pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(digest_password(password), cost).map_err(|e| AuthError::Internal {
        error: e.to_string(),
    })
}

/// 校验明文密码；存储的哈希格式错误时按不匹配处理
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match bcrypt::verify(digest_password(password), stored_hash) {
        Ok(matches) => matches,
        Err(e) => {
            warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}
