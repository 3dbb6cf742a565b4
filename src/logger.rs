use tracing_subscriber::{EnvFilter, fmt};

/// 初始化日志系统
///
/// 支持通过 RUST_LOG 环境变量控制日志级别
/// 默认级别: info
///
/// 示例:
/// - RUST_LOG=prload=debug prload run
/// - RUST_LOG=trace prload run
pub fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // 压测时日志可能由多个 VU 并发写入，保留 target 以便区分模块
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Logger initialized");
}
