//! CSV 导出 - 业务能力层

use std::fs::OpenOptions;

use tracing::info;

use crate::error::{ScrapeError, ScrapeResult};
use crate::models::Deal;

/// CSV 导出器
pub struct CsvExporter {
    path: String,
}

impl CsvExporter {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// 写入全部结果（带表头，覆盖旧文件）
    pub fn write_all(&self, deals: &[Deal]) -> ScrapeResult<()> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| self.error(e))?;
        self.write(csv::WriterBuilder::new().has_headers(true).from_writer(file), deals)?;
        info!("💾 已写入 {} 条记录到 {}", deals.len(), self.path);
        Ok(())
    }

    /// 清空输出文件，增量导出开始前调用
    pub fn reset(&self) -> ScrapeResult<()> {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| self.error(e))?;
        Ok(())
    }

    /// 追加结果，文件为空时先写表头
    pub fn append(&self, deals: &[Deal]) -> ScrapeResult<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.error(e))?;
        let is_empty = file.metadata().map_err(|e| self.error(e))?.len() == 0;
        self.write(
            csv::WriterBuilder::new().has_headers(is_empty).from_writer(file),
            deals,
        )
    }

    fn write(&self, mut writer: csv::Writer<std::fs::File>, deals: &[Deal]) -> ScrapeResult<()> {
        for deal in deals {
            writer.serialize(deal).map_err(|e| self.error(e))?;
        }
        writer.flush().map_err(|e| self.error(e))?;
        Ok(())
    }

    fn error(&self, reason: impl std::fmt::Display) -> ScrapeError {
        ScrapeError::Export {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn deal(id: &str) -> Deal {
        Deal {
            track_id: Some(id.to_string()),
            category: "high-tech".to_string(),
            image_url: String::new(),
            current_temperature: -3.0,
            expiration_date: NaiveDate::from_ymd_opt(2025, 12, 5)
                .unwrap()
                .and_hms_opt(14, 30, 0),
            url: format!("https://www.dealabs.com/bons-plans/{}", id),
            title: "Titre, avec virgule".to_string(),
            price: Some(9.99),
            initial_price: None,
            shipping: None,
            merchant: "Fnac".to_string(),
            description: String::new(),
            comments_count: 2,
        }
    }

    #[test]
    fn test_write_all_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deals.csv");
        let exporter = CsvExporter::new(path.to_string_lossy().to_string());

        exporter.write_all(&[deal("a")]).unwrap();
        exporter.append(&[deal("b")]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("track_id,category,image_url"));
        assert!(lines[1].contains("2025-12-05 14:30:00"));
        assert!(lines[1].contains("\"Titre, avec virgule\""));
        assert!(lines[2].starts_with("b,high-tech"));
    }

    #[test]
    fn test_append_after_reset_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deals.csv");
        std::fs::write(&path, "stale\n").unwrap();
        let exporter = CsvExporter::new(path.to_string_lossy().to_string());

        exporter.reset().unwrap();
        exporter.append(&[deal("a")]).unwrap();
        exporter.append(&[deal("b"), deal("c")]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("track_id,"));
        assert_eq!(lines.iter().filter(|l| l.starts_with("track_id,")).count(), 1);
        assert!(!content.contains("stale"));
    }
}
