pub mod block;
pub mod service;
pub mod state;

pub use block::{AccountScanner, BlockScan, ScanKeys, scan_block};
pub use service::{
    AccountStatus, INFO_LOG_INTERVAL, ScanConfig, ScanContext, ScanService, ScanStatus,
};
pub use state::ScanState;
