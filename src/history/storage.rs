use super::model::HistoryEntry;
use crate::Result;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

const HISTORY_DIR: &str = ".chainpost";
const HISTORY_FILE: &str = "history.jsonl";
/// 覆盖历史目录的环境变量
pub const HISTORY_DIR_ENV: &str = "CHAINPOST_HISTORY_DIR";
/// 超过该大小时在读取前压缩
const COMPACTION_THRESHOLD_BYTES: u64 = 20 * 1024 * 1024;
/// 压缩后保留的条目数
const MAX_ENTRIES: usize = 10_000;

/// JSON Lines 历史文件
///
/// 写入持有排他锁，读取持有共享锁，多进程同时运行也不会产生半行。
pub struct HistoryStorage {
    file_path: PathBuf,
}

impl Default for HistoryStorage {
    fn default() -> Self {
        let dir = std::env::var(HISTORY_DIR_ENV).unwrap_or_else(|_| HISTORY_DIR.to_string());
        Self::new_with_path(Path::new(&dir).join(HISTORY_FILE))
    }
}

impl HistoryStorage {
    /// 项目本地的历史文件，可通过 `CHAINPOST_HISTORY_DIR` 重定向
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with_path(path: PathBuf) -> Self {
        Self { file_path: path }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// 追加一条记录
    pub fn append(&self, entry: &HistoryEntry) -> Result<()> {
        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        file.lock_exclusive()?;
        file.write_all(line.as_bytes())?;
        // 锁随文件关闭释放
        Ok(())
    }

    /// 全部记录（按时间顺序），文件过大时先压缩
    pub fn list(&self) -> Result<Vec<HistoryEntry>> {
        if !self.file_path.exists() {
            return Ok(Vec::new());
        }

        self.compact_if_needed()?;

        let file = File::open(&self.file_path)?;
        file.lock_shared()?;
        read_entries(&file)
    }

    /// 最近 N 条记录，仍按时间顺序（最旧在前）
    pub fn tail(&self, n: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries = self.list()?;
        let skip = entries.len().saturating_sub(n);
        Ok(entries.split_off(skip))
    }

    fn compact_if_needed(&self) -> Result<()> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.file_path)?;

        if file.metadata()?.len() < COMPACTION_THRESHOLD_BYTES {
            return Ok(());
        }

        file.lock_exclusive()?;
        // 拿到锁之后再检查一次，其他进程可能刚压缩过
        if file.metadata()?.len() < COMPACTION_THRESHOLD_BYTES {
            return Ok(());
        }

        let entries = read_entries(&file)?;
        if entries.len() <= MAX_ENTRIES {
            return Ok(());
        }

        let dropped = entries.len() - MAX_ENTRIES;
        debug!("Compacting {}: dropping {} entries", self.file_path.display(), dropped);

        // 截断后通过同一个句柄重写，保持锁不释放
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        let mut writer = BufWriter::new(&file);
        for entry in &entries[dropped..] {
            serde_json::to_writer(&mut writer, entry)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        info!("History compacted to {} entries", MAX_ENTRIES);
        Ok(())
    }
}

/// 逐行解析，跳过空行和损坏的行
fn read_entries(file: &File) -> Result<Vec<HistoryEntry>> {
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(0))?;

    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(entry) = serde_json::from_str::<HistoryEntry>(&line) {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// 进程级共享实例
pub fn get_storage() -> &'static HistoryStorage {
    static STORAGE: OnceLock<HistoryStorage> = OnceLock::new();
    STORAGE.get_or_init(HistoryStorage::new)
}
