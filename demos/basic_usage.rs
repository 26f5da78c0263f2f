use adb_host::prelude::*;

fn main() -> ADBResult<()> {
    // 创建配置
    let config = ADBConfig::default();

    // 创建客户端实例
    let adb = ADB::new(Some(config));

    // 确保服务器在运行（已运行时为幂等空操作）
    let status = adb.start_server(false)?;
    println!("ADB 服务器运行中, 内部版本: {:?}", status.version);

    // 列出连接的设备
    let devices = adb.list_devices()?;
    println!("发现 {} 个设备:", devices.len());

    for device in &devices {
        println!("  序列号: {}, 状态: {}", device.serial, device.status);
        if let Some(model) = &device.model {
            println!("  型号: {}", model);
        }

        if device.is_online() {
            // 列出已安装的包
            let packages = adb.list_packages(&device.serial)?;
            println!("  已安装包数量: {}", packages.len());

            if let Some(package) = packages.first() {
                println!(
                    "  示例包: {} ({})",
                    package.name,
                    package.install_path.as_deref().unwrap_or("路径未知")
                );
            }

            // 列出进程
            let processes = adb.list_processes(&device.serial)?;
            println!("  进程数量: {}", processes.len());

            if let Some(process) = processes.iter().find(|p| p.name.contains('.')) {
                println!("  示例进程: {} (PID {})", process.name, process.pid);
            }
        }
    }

    Ok(())
}
