pub mod lock_sweeper;

pub use lock_sweeper::spawn_lock_sweep_task;
