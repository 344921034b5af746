/// Logs a structured line with timestamp, level, component, pid, tid, and message.
/// Usage:
/// ```rust
/// use log::Level;
/// agent::bridge_log!(Level::Info, "create", "dispatch started");
/// agent::bridge_log!(Level::Warn, "router", "dropped request {}", 7);
/// ```
/// Logs like:
/// [2025-04-25T16:32:10+02:00][DEBUG][create][pid=4568][tid=ThreadId(3)] Your message here
#[macro_export]
macro_rules! bridge_log {
    ($level:expr, $component:expr, $fmt:expr $(, $($arg:tt)+)?) => {
        log::log!(
            $level,
            concat!(
                "[", "{}", "]",          // timestamp
                "[", "{}", "]",          // level via Display
                "[", $component, "]",    // component
                "[pid=", "{}", "]",      // pid
                "[tid=", "{:?}", "] ",   // tid
                $fmt
            ),
            chrono::Local::now().to_rfc3339(),
            $level,
            std::process::id(),
            std::thread::current().id()
            $(, $($arg)+)?
        )
    };
}
