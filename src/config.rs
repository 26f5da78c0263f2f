use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// ADB 服务器默认监听端口
pub const DEFAULT_PORT: u16 = 5037;

/// ADB host 协议客户端配置结构体
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ADBConfig {
    /// ADB 可执行文件路径（仅用于启动服务器子进程）
    pub server_path: PathBuf,
    /// ADB 服务器监听端口
    pub port: u16,
    /// 建立 TCP 连接的超时（毫秒）
    pub connect_timeout: u64,
    /// 单次读取的空闲超时（毫秒）
    pub read_timeout: u64,
    /// 等待服务器启动完成的总超时（毫秒）
    pub start_timeout: u64,
    /// 启动轮询的初始间隔（毫秒），之后指数退避
    pub poll_interval: u64,
}

impl Default for ADBConfig {
    fn default() -> Self {
        ADBConfig {
            server_path: PathBuf::from("adb"),
            port: DEFAULT_PORT,
            connect_timeout: 2000,
            read_timeout: 5000,
            start_timeout: 3000, // 3秒内服务器应变为可达
            poll_interval: 100,
        }
    }
}

impl ADBConfig {
    pub(crate) fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout)
    }

    pub(crate) fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout)
    }

    pub(crate) fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout)
    }
}

/// ADB 配置构建器
#[derive(Default)]
pub struct ADBConfigBuilder {
    server_path: Option<PathBuf>,
    port: Option<u16>,
    connect_timeout: Option<u64>,
    read_timeout: Option<u64>,
    start_timeout: Option<u64>,
    poll_interval: Option<u64>,
}

impl ADBConfigBuilder {
    /// 设置 ADB 可执行文件路径
    pub fn server_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.server_path = Some(path.into());
        self
    }

    /// 设置服务器端口
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// 设置连接超时（毫秒）
    pub fn connect_timeout(mut self, timeout: u64) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// 设置读取空闲超时（毫秒）
    pub fn read_timeout(mut self, timeout: u64) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// 设置服务器启动总超时（毫秒）
    pub fn start_timeout(mut self, timeout: u64) -> Self {
        self.start_timeout = Some(timeout);
        self
    }

    /// 设置启动轮询初始间隔（毫秒）
    pub fn poll_interval(mut self, interval: u64) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// 构建 ADB 配置
    pub fn build(self) -> ADBConfig {
        let default = ADBConfig::default();

        ADBConfig {
            server_path: self.server_path.unwrap_or(default.server_path),
            port: self.port.unwrap_or(default.port),
            connect_timeout: self.connect_timeout.unwrap_or(default.connect_timeout),
            read_timeout: self.read_timeout.unwrap_or(default.read_timeout),
            start_timeout: self.start_timeout.unwrap_or(default.start_timeout),
            poll_interval: self.poll_interval.unwrap_or(default.poll_interval),
        }
    }
}
