use crate::device::ADB;
use crate::error::ADBResult;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

// pm list packages 输出行: `package:<安装路径>=<包名>`，无 -f 时路径缺失。
// 包名必须是点分的标识符段，不合语法的行被丢弃而不是报错。
static PACKAGE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^package:(?:(.+)=)?([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)$")
        .unwrap()
});

/// 包信息结构体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: String,
    pub install_path: Option<String>,
}

impl PackageInfo {
    /// 解析 `pm list packages` 输出中的一行；不匹配的行返回 None
    pub(crate) fn parse_line(line: &str) -> Option<Self> {
        let caps = PACKAGE_LINE.captures(line.trim())?;
        Some(Self {
            name: caps.get(2)?.as_str().to_string(),
            install_path: caps.get(1).map(|path| path.as_str().to_string()),
        })
    }
}

impl ADB {
    /// 列出设备上已安装的包（含安装路径）
    ///
    /// 执行 `pm list packages -f` 并逐行解析；格式不符的行被跳过。
    /// shell 退出码非零时返回 `CommandFailed`。
    pub fn list_packages(&self, serial: &str) -> ADBResult<Vec<PackageInfo>> {
        let result = self
            .run_shell(serial, "pm list packages -f")?
            .into_checked()?;

        let packages = parse_package_listing(&result.stdout_lossy());
        info!("设备 {} 上发现 {} 个包", serial, packages.len());
        Ok(packages)
    }

    /// 只列出包名（不带安装路径）
    pub fn list_package_names(&self, serial: &str) -> ADBResult<Vec<String>> {
        let result = self.run_shell(serial, "pm list packages")?.into_checked()?;

        Ok(parse_package_listing(&result.stdout_lossy())
            .into_iter()
            .map(|package| package.name)
            .collect())
    }
}

fn parse_package_listing(output: &str) -> Vec<PackageInfo> {
    output
        .lines()
        .filter_map(|line| {
            let parsed = PackageInfo::parse_line(line);
            if parsed.is_none() && !line.trim().is_empty() {
                debug!("跳过格式不符的包行: {:?}", line);
            }
            parsed
        })
        .collect()
}
