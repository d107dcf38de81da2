use crate::history::model::HistoryEntry;
use crate::history::storage::get_storage;
use crate::runner::ChainRunResult;
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

/// 记录一次链运行
///
/// 这是一个 Best-effort 操作，如果写入失败会打印警告，但不会返回错误。
pub fn record_run(run: &ChainRunResult) {
    let entry = HistoryEntry::from_run(Uuid::new_v4().to_string(), Utc::now(), run);

    match get_storage().append(&entry) {
        Ok(()) => debug!("Recorded run {} of chain '{}'", entry.id, entry.chain_name),
        Err(e) => warn!("Failed to save run history: {}", e),
    }
}
