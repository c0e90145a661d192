//! Process-level plumbing for the binary: logging and signal handling.
pub mod logger;
pub mod shutdown;


pub use logger::init_logging;
pub use shutdown::{
    ShutdownAction, ShutdownReceiver, ShutdownSender, SignalEscalation, setup_signal_handler,
    shutdown_channel,
};
