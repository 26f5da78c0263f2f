use crate::config::ADBConfig;
use crate::error::{ADBError, ADBResult};
use log::{debug, trace};
use std::io::{ErrorKind, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream};
use std::time::Duration;

/// 单次请求读取缓冲区大小
const BUFFER_SIZE: usize = 4096;

/// 协议允许的最大命令字节长度（4 位十六进制）
pub const MAX_COMMAND_LEN: usize = 0xFFFF;

/// 将命令编码为 host 协议请求帧: 4 位十六进制长度 + 命令字节
pub fn encode_request(command: &str) -> ADBResult<Vec<u8>> {
    let len = command.len();
    if len > MAX_COMMAND_LEN {
        return Err(ADBError::CommandTooLong(len));
    }

    let mut request = format!("{:04x}", len).into_bytes();
    request.extend_from_slice(command.as_bytes());
    Ok(request)
}

/// 与本地 ADB 服务器的一次性 host 协议连接
///
/// 每个逻辑请求使用独立连接；socket 随 Transport 被丢弃而关闭，
/// 任何退出路径（成功、协议失败、I/O 错误）都不会泄漏连接。
pub struct Transport {
    stream: TcpStream,
    port: u16,
    read_timeout: Duration,
}

impl Transport {
    /// 连接到本地 ADB 服务器
    ///
    /// 端口上没有监听者时返回 `ConnectionRefused`。
    pub fn connect(config: &ADBConfig) -> ADBResult<Self> {
        let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, config.port));
        trace!("连接 ADB 服务器 {}", addr);

        let stream = TcpStream::connect_timeout(&addr, config.connect_timeout())
            .map_err(|e| match e.kind() {
                ErrorKind::ConnectionRefused => ADBError::ConnectionRefused(config.port),
                _ => ADBError::IoError(e.to_string()),
            })?;

        let read_timeout = config.read_timeout();
        stream.set_read_timeout(Some(read_timeout))?;
        stream.set_write_timeout(Some(read_timeout))?;

        Ok(Self {
            stream,
            port: config.port,
            read_timeout,
        })
    }

    /// 发送一条 host 协议命令
    pub fn send_command(&mut self, command: &str) -> ADBResult<()> {
        let request = encode_request(command)?;
        trace!("发送命令: {:?}", command);
        self.stream.write_all(&request)?;
        Ok(())
    }

    /// 读取 4 字节响应头，OKAY 为成功；FAIL 携带服务器给出的错误消息
    pub fn read_okay(&mut self) -> ADBResult<()> {
        let mut header = [0u8; 4];
        self.read_exact_bytes(&mut header)?;

        match &header {
            b"OKAY" => Ok(()),
            b"FAIL" => {
                let message = self.read_payload()?;
                let message = String::from_utf8_lossy(&message).into_owned();
                debug!("服务器拒绝命令: {}", message);
                Err(ADBError::ProtocolFailure(message))
            }
            other => Err(ADBError::MalformedResponse(format!(
                "期望 OKAY 或 FAIL, 收到 {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    /// 读取 4 位十六进制长度前缀及其后负载
    pub fn read_payload(&mut self) -> ADBResult<Vec<u8>> {
        let len = self.read_hex_length()?;
        let mut payload = vec![0u8; len];
        self.read_exact_bytes(&mut payload)?;
        trace!("收到 {} 字节负载", len);
        Ok(payload)
    }

    /// 持续读取直到对端关闭连接
    ///
    /// 空闲时间超过配置的读取超时则返回 `CommandTimeout`，连接随之拆除。
    pub fn read_until_close(&mut self) -> ADBResult<Vec<u8>> {
        let mut output = Vec::new();
        let mut buffer = [0u8; BUFFER_SIZE];

        loop {
            match self.stream.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => output.extend_from_slice(&buffer[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.map_read_error(e)),
            }
        }

        Ok(output)
    }

    /// 读取一个字节；对端已关闭时返回 None
    ///
    /// shell v2 流在包边界上以 EOF 结束，需要区分 "流结束" 和 "包被截断"。
    pub(crate) fn read_byte_or_eof(&mut self) -> ADBResult<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.stream.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.map_read_error(e)),
            }
        }
    }

    pub(crate) fn read_exact_bytes(&mut self, buf: &mut [u8]) -> ADBResult<()> {
        self.stream
            .read_exact(buf)
            .map_err(|e| self.map_read_error(e))
    }

    fn read_hex_length(&mut self) -> ADBResult<usize> {
        let mut digits = [0u8; 4];
        self.read_exact_bytes(&mut digits)?;

        let text = std::str::from_utf8(&digits)
            .map_err(|_| ADBError::MalformedResponse("长度字段不是 ASCII".to_string()))?;
        usize::from_str_radix(text, 16).map_err(|_| {
            ADBError::MalformedResponse(format!("长度字段不是十六进制: {:?}", text))
        })
    }

    fn map_read_error(&self, e: std::io::Error) -> ADBError {
        match e.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => ADBError::CommandTimeout {
                message: format!("端口 {} 上的读取空闲超时", self.port),
                duration: self.read_timeout,
            },
            ErrorKind::UnexpectedEof => {
                ADBError::MalformedResponse("响应在读取完成前被截断".to_string())
            }
            _ => ADBError::IoError(e.to_string()),
        }
    }
}
