use thiserror::Error;
use std::time::Duration;

/// ADB host 协议操作相关的错误类型
#[derive(Debug, Error)]
pub enum ADBError {
    /// 无法连接到 ADB 服务器（端口上没有进程在监听）
    #[error("连接被拒绝: ADB 服务器未在端口 {0} 上监听")]
    ConnectionRefused(u16),

    /// 服务器以 FAIL 响应拒绝了命令，原样携带服务器给出的消息
    #[error("协议失败: {0}")]
    ProtocolFailure(String),

    /// 启动子进程后服务器在限定时间内未变为可达
    #[error("ADB 服务器启动超时 ({elapsed:?})")]
    ServerStartTimeout { elapsed: Duration },

    /// 设备不存在或 transport 绑定失败
    #[error("设备不存在: {0}")]
    DeviceNotFound(String),

    /// 读取空闲时间超过限定值，连接已被拆除
    #[error("命令读取超时 ({duration:?}): {message}")]
    CommandTimeout {
        message: String,
        duration: Duration,
    },

    /// shell 命令以非零退出码结束
    #[error("命令失败 (退出码 {code}): {stderr}")]
    CommandFailed { code: i32, stderr: String },

    /// 命令字节长度超过协议允许的 0xFFFF
    #[error("命令过长: {0} 字节 (上限 65535)")]
    CommandTooLong(usize),

    /// 帧格式错误（响应头或长度字段不合法）
    #[error("响应格式错误: {0}")]
    MalformedResponse(String),

    /// 底层 I/O 错误
    #[error("I/O 错误: {0}")]
    IoError(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),
}

// 为标准错误类型实现 From trait，简化错误处理
impl From<std::io::Error> for ADBError {
    fn from(error: std::io::Error) -> Self {
        ADBError::IoError(error.to_string())
    }
}

impl From<std::str::Utf8Error> for ADBError {
    fn from(error: std::str::Utf8Error) -> Self {
        ADBError::ParseError(format!("UTF-8 解码错误: {}", error))
    }
}

impl From<std::num::ParseIntError> for ADBError {
    fn from(error: std::num::ParseIntError) -> Self {
        ADBError::ParseError(format!("数字解析错误: {}", error))
    }
}

impl From<regex::Error> for ADBError {
    fn from(error: regex::Error) -> Self {
        ADBError::ParseError(format!("正则表达式错误: {}", error))
    }
}

// 添加结果类型别名简化使用
pub type ADBResult<T> = Result<T, ADBError>;
