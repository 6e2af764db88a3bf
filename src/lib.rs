// 公开导出的模块，供外部使用
pub mod errors;
pub mod models;
pub mod store;

// 主程序与脚本使用，库场景下视为内部模块
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod scrapers;
#[doc(hidden)]
pub mod services;
#[doc(hidden)]
pub mod util;

// 重新导出常用类型，方便使用
pub use config::Config;
pub use errors::{CrawlerError, Result};
pub use models::index::{IndexCode, IndexRecord};
pub use models::market::{ForeignerFlow, MarketRecord, Quote};
pub use models::trigger::{TargetStatus, TriggerEvent, TriggerResponse};
pub use services::BatchRunner;
pub use store::{ArrowStore, MemoryStore, RecordStore};
