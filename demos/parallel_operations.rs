use adb_host::prelude::*;

fn main() -> ADBResult<()> {
    let adb = ADB::new(None);
    adb.start_server(false)?;

    // 在所有在线设备上并行列出包
    let results = adb.on_all_online_devices(|serial| adb.list_packages(serial))?;

    for (serial, result) in &results {
        match result {
            Ok(packages) => println!("设备 {}: {} 个包", serial, packages.len()),
            Err(e) => eprintln!("设备 {} 查询失败: {}", serial, e),
        }
    }

    // 在同一批设备上并行执行 shell 命令
    let serials: Vec<&str> = results.keys().map(|s| s.as_str()).collect();
    let outputs = adb.parallel_shell(&serials, "getprop ro.build.version.release");

    for (serial, result) in outputs {
        match result {
            Ok(shell) => println!("设备 {} Android 版本: {}", serial, shell.stdout_lossy().trim()),
            Err(e) => eprintln!("设备 {} 命令失败: {}", serial, e),
        }
    }

    Ok(())
}
