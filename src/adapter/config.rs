use std::env;
use std::str::FromStr;
use std::time::Duration;

/// 設定エラー
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// 環境変数を読み取り、未設定ならデフォルト値を使う
fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// 数値の環境変数を読み取る
fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var_or(name, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}", name, e)))
}

/// データベース接続設定を管理する構造体
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// 環境変数から設定を読み取る
    /// 環境変数が設定されていない場合はデフォルト値を使用
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: var_or("DATABASE_HOST", "localhost"),
            port: parse_var("DATABASE_PORT", "3306")?,
            database: var_or("DATABASE_NAME", "ticketing_db"),
            username: var_or("DATABASE_USER", "ticketing_user"),
            password: var_or("DATABASE_PASSWORD", "ticketing_password"),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "10")?,
        })
    }

    /// MySQL接続文字列を生成
    pub fn connection_string(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

/// 使用する決済ゲートウェイ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentGatewayKind {
    /// 決済プロバイダー未接続。すべての請求を拒否する
    #[default]
    Unconfigured,
    /// テスト用トークンだけを受け付ける偽の決済ゲートウェイ（開発用）
    Fake,
}

impl FromStr for PaymentGatewayKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::Unconfigured),
            "fake" => Ok(Self::Fake),
            other => Err(ConfigError::InvalidValue(format!(
                "Invalid PAYMENT_GATEWAY: unknown gateway '{}'",
                other
            ))),
        }
    }
}

/// HTTPサーバーと購入処理の設定
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub payment_timeout: Duration,
    pub payment_gateway: PaymentGatewayKind,
}

impl ServerConfig {
    /// 環境変数から設定を読み取る
    pub fn from_env() -> Result<Self, ConfigError> {
        let payment_timeout_ms: u64 = parse_var("PAYMENT_TIMEOUT_MS", "10000")?;
        if payment_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "Invalid PAYMENT_TIMEOUT_MS: must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bind_address: var_or("SERVER_BIND_ADDRESS", "0.0.0.0:3000"),
            payment_timeout: Duration::from_millis(payment_timeout_ms),
            payment_gateway: var_or("PAYMENT_GATEWAY", "none").parse()?,
        })
    }
}
