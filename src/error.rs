use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("System error: {0}")]
    System(String),
}

/// 服务配置与映射目录加载错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error: {error}")]
    ParseError { error: String },

    #[error("Invalid mapping catalog: {reason}")]
    InvalidCatalog { reason: String },
}

/// 应用配置文档的存取错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{reason}")]
    Validation { reason: String },

    #[error("Application is not configured")]
    NotConfigured,

    #[error("Application is already configured")]
    AlreadyConfigured,

    #[error("Failed to persist document {name}: {error}")]
    Persistence { name: String, error: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Username and password are required")]
    InvalidRequest,

    #[error("Authentication is not enabled")]
    AuthDisabled,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Access token required")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("JWT secret not configured")]
    ServerMisconfigured,

    #[error("Invalid JWT expiration: {value}")]
    InvalidExpiration { value: String },

    #[error("Token error: {error}")]
    Internal { error: String },
}

/// 设备或矿池后端的传输错误
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("{url} is unreachable: {error}")]
    Unreachable { url: String, error: String },

    #[error("{url} returned HTTP {status_code}")]
    Status { url: String, status_code: u16 },

    #[error("Invalid response from {url}: {error}")]
    Decode { url: String, error: String },
}

/// 仪表盘 HTTP 客户端错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Invalid dashboard URL {url}: {error}")]
    InvalidUrl { url: String, error: String },

    #[error("{url} is unreachable: {error}")]
    Unreachable { url: String, error: String },

    /// 服务端返回的 `{error}` 响应
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response from {url}: {error}")]
    Decode { url: String, error: String },
}

impl ClientError {
    /// 服务端拒绝时的 HTTP 状态码
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl StoreError {
    pub fn validation(reason: impl Into<String>) -> Self {
        StoreError::Validation { reason: reason.into() }
    }
}

impl TransportError {
    pub fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            TransportError::Status {
                url: url.to_string(),
                status_code: status.as_u16(),
            }
        } else if error.is_decode() {
            TransportError::Decode {
                url: url.to_string(),
                error: error.to_string(),
            }
        } else {
            TransportError::Unreachable {
                url: url.to_string(),
                error: error.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_messages() {
        assert_eq!(AuthError::MissingToken.to_string(), "Access token required");
        assert_eq!(AuthError::InvalidOrExpiredToken.to_string(), "Invalid or expired token");
        assert_eq!(AuthError::ServerMisconfigured.to_string(), "JWT secret not configured");
    }

    #[test]
    fn test_dashboard_error_from_store() {
        let error: DashboardError = StoreError::validation("Application title is required").into();
        assert_eq!(
            error.to_string(),
            "Store error: Application title is required"
        );
    }
}
