use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::config::ADBConfig;
use crate::error::ADBResult;
use crate::transport::Transport;
use log::{info, trace};

/// ADB 设备状态枚举
///
/// 不同版本的服务器会输出不同的状态标记，未知标记保留在 Other 中而不是报错。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    Online,
    Offline,
    Unauthorized,
    Recovery,
    Sideload,
    Bootloader,
    NoPermissions,
    Other(String),
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceStatus::Online => write!(f, "online"),
            DeviceStatus::Offline => write!(f, "offline"),
            DeviceStatus::Unauthorized => write!(f, "unauthorized"),
            DeviceStatus::Recovery => write!(f, "recovery"),
            DeviceStatus::Sideload => write!(f, "sideload"),
            DeviceStatus::Bootloader => write!(f, "bootloader"),
            DeviceStatus::NoPermissions => write!(f, "no permissions"),
            DeviceStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for DeviceStatus {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "device" | "online" => DeviceStatus::Online,
            "offline" => DeviceStatus::Offline,
            "unauthorized" => DeviceStatus::Unauthorized,
            "recovery" => DeviceStatus::Recovery,
            "sideload" => DeviceStatus::Sideload,
            "bootloader" | "fastboot" => DeviceStatus::Bootloader,
            "no permissions" => DeviceStatus::NoPermissions,
            _ => DeviceStatus::Other(s.to_string()),
        }
    }
}

/// ADB 设备结构体
///
/// 每次枚举产生一组新的快照，跨调用的同一性只由序列号决定。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ADBDevice {
    pub serial: String,
    pub status: DeviceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl ADBDevice {
    /// 创建新设备实例
    pub fn new(serial: &str, status: impl Into<DeviceStatus>) -> Self {
        Self {
            serial: serial.to_string(),
            status: status.into(),
            transport_id: None,
            model: None,
            product: None,
            device: None,
        }
    }

    /// 检查设备是否在线
    pub fn is_online(&self) -> bool {
        self.status == DeviceStatus::Online
    }

    /// 解析 `host:devices-l` 输出中的一行
    ///
    /// 格式为 `serial state key:value ...`，未知的 key:value 属性被忽略。
    /// 空行或缺少状态字段的行返回 None。
    pub(crate) fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let serial = fields.next()?;
        let status = fields.next()?;

        let mut device = ADBDevice::new(serial, status);

        for field in fields {
            match field.split_once(':') {
                Some(("transport_id", value)) => {
                    device.transport_id = value.parse().ok();
                }
                Some(("model", value)) => device.model = Some(value.to_string()),
                Some(("product", value)) => device.product = Some(value.to_string()),
                Some(("device", value)) => device.device = Some(value.to_string()),
                _ => trace!("忽略设备行属性: {}", field),
            }
        }

        Some(device)
    }
}

/// ADB host 协议客户端
///
/// 显式构造的客户端对象，一个实例对应一个服务器端点（主机端口），
/// 可以在测试中针对 stub 服务器创建多个互不干扰的实例。
#[derive(Clone, Debug)]
pub struct ADB {
    pub config: ADBConfig,
    // start/kill 路径的互斥锁：并发 start_server 观察第一次的结果而不是重复拉起子进程
    pub(crate) start_lock: Arc<Mutex<()>>,
    // shell v2 能力探测结果，每个服务器会话探测一次
    pub(crate) shell_v2: Arc<Mutex<Option<bool>>>,
}

impl ADB {
    /// 创建新的 ADB 客户端实例
    pub fn new(config: Option<ADBConfig>) -> Self {
        Self {
            config: config.unwrap_or_default(),
            start_lock: Arc::new(Mutex::new(())),
            shell_v2: Arc::new(Mutex::new(None)),
        }
    }

    /// 打开一条到服务器的新连接
    pub(crate) fn open_transport(&self) -> ADBResult<Transport> {
        Transport::connect(&self.config)
    }

    /// 列出当前连接的设备
    ///
    /// 发送 `host:devices-l` 并解析长度前缀负载；没有设备时返回空列表而不是错误。
    pub fn list_devices(&self) -> ADBResult<Vec<ADBDevice>> {
        let mut transport = self.open_transport()?;
        transport.send_command("host:devices-l")?;
        transport.read_okay()?;
        let payload = transport.read_payload()?;

        let text = String::from_utf8_lossy(&payload);
        trace!("devices-l 负载: {:?}", text);

        let devices: Vec<ADBDevice> = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(ADBDevice::parse_line)
            .collect();

        info!("发现 {} 个 ADB 设备", devices.len());
        Ok(devices)
    }
}
