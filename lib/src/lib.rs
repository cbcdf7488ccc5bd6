pub mod config;
pub mod driver;
pub mod error;
pub mod log;
pub mod memory;
pub mod observer;
pub mod output_log;
pub mod process;
pub mod process_id;
pub mod scheduler;
pub mod util;
pub mod worker;
pub mod worker_pool;
