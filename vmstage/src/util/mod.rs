mod privilege;
mod process;

pub use privilege::{effective_uid, ensure_root};
pub use process::{is_process_alive, is_same_process, terminate_process};
