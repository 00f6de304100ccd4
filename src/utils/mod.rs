pub mod net;
pub mod spawn;
pub mod storage;
pub mod time;
pub mod timers;
