/// 运行历史 - 以 JSON Lines 记录每次链运行的摘要
pub mod model;
pub mod printer;
pub mod recorder;
pub mod storage;

pub use model::{HistoryEntry, StepSnapshot};
pub use printer::list_history;
pub use recorder::record_run;
pub use storage::HistoryStorage;
