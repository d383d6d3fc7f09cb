//! 失败记录服务 - 业务能力层
//!
//! 只负责“记录被吸收的失败”能力，不关心失败来自哪一层

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

use anyhow::Result;
use tracing::{debug, warn};

/// 失败记录
///
/// 追加写入，调用方不关心结果。
pub trait FailureLog: Send + Sync {
    /// 记录一条失败信息
    ///
    /// - `context`: 出错的 URL 或批次
    /// - `message`: 错误描述
    fn record(&self, context: &str, message: &str);
}

/// 写入文本文件的失败记录
pub struct FileFailureLog {
    path: String,
    lock: Mutex<()>,
}

impl FileFailureLog {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// 写入文件头（覆盖旧文件）
    pub fn init(&self) -> Result<()> {
        let header = format!(
            "{}\n抓取失败日志 - {}\n{}\n\n",
            "=".repeat(60),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            "=".repeat(60)
        );
        fs::write(&self.path, header)?;
        Ok(())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

impl FailureLog for FileFailureLog {
    fn record(&self, context: &str, message: &str) {
        debug!("写入失败日志: {} | {}", context, message);
        let line = format!(
            "[{}] {} | {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            context,
            message
        );
        if let Err(e) = self.append(&line) {
            warn!("无法写入失败日志 {}: {}", self.path, e);
        }
    }
}

/// 保存在内存中的失败记录
#[derive(Default)]
pub struct MemoryFailureLog {
    entries: Mutex<Vec<(String, String)>>,
}

impl MemoryFailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有记录 (context, message)
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl FailureLog for MemoryFailureLog {
    fn record(&self, context: &str, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((context.to_string(), message.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_log_appends_after_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.txt");
        let log = FileFailureLog::new(path.to_string_lossy().to_string());

        log.init().unwrap();
        log.record("https://example.com/a", "超时");
        log.record("https://example.com/b", "404");

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("抓取失败日志"));
        assert!(content.contains("https://example.com/a | 超时"));
        assert!(content.contains("https://example.com/b | 404"));
    }

    #[test]
    fn test_memory_log() {
        let log = MemoryFailureLog::new();
        log.record("batch", "boom");
        assert_eq!(
            log.entries(),
            vec![("batch".to_string(), "boom".to_string())]
        );
    }
}
