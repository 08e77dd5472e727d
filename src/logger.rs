use std::cell::RefCell;
use std::fs::{File, create_dir_all};
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Log event types, ordered from most detailed to least detailed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogEvent {
    /// One CSV line per cleared auction (valuations, bids, winners, prices)
    Auction,
    /// Bidder registry changes and platform warnings
    Platform,
    /// Per-method experiment summaries
    Experiment,
    /// Scenario checks and comparisons
    Scenario,
    /// Pass/fail results
    Validation,
}

impl LogEvent {
    /// This event and every less detailed one
    /// Warnings and errors are routed to all of them so they are never filtered out
    fn upward(self) -> &'static [LogEvent] {
        static ORDER: [LogEvent; 5] = [
            LogEvent::Auction,
            LogEvent::Platform,
            LogEvent::Experiment,
            LogEvent::Scenario,
            LogEvent::Validation,
        ];
        &ORDER[self as usize..]
    }
}

/// Trait for log receivers that can receive log messages
pub trait LogReceiver {
    /// Check if this receiver should handle the given log event
    fn should_log(&self, event: LogEvent) -> bool;

    fn write(&mut self, s: &str) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

/// Writes to stdout
pub struct ConsoleReceiver {
    enabled_events: Vec<LogEvent>,
}

impl ConsoleReceiver {
    pub fn new(enabled_events: Vec<LogEvent>) -> Box<dyn LogReceiver> {
        Box::new(Self { enabled_events })
    }
}

impl LogReceiver for ConsoleReceiver {
    fn should_log(&self, event: LogEvent) -> bool {
        self.enabled_events.contains(&event)
    }

    fn write(&mut self, s: &str) -> io::Result<()> {
        print!("{}", s);
        io::stdout().flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// Writes to a file, truncating it on creation
pub struct FileReceiver {
    file: File,
    enabled_events: Vec<LogEvent>,
}

impl FileReceiver {
    /// Parent directories are created as needed
    pub fn new(path: &Path, enabled_events: Vec<LogEvent>) -> io::Result<Box<dyn LogReceiver>> {
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Box::new(Self { file, enabled_events }))
    }
}

impl LogReceiver for FileReceiver {
    fn should_log(&self, event: LogEvent) -> bool {
        self.enabled_events.contains(&event)
    }

    fn write(&mut self, s: &str) -> io::Result<()> {
        write!(self.file, "{}", s)?;
        self.file.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Keeps everything in a shared buffer, used by tests to inspect what was logged
pub struct MemoryReceiver {
    buffer: Rc<RefCell<String>>,
    enabled_events: Vec<LogEvent>,
}

impl MemoryReceiver {
    /// Returns the receiver together with a handle to its buffer
    pub fn new(enabled_events: Vec<LogEvent>) -> (Box<dyn LogReceiver>, Rc<RefCell<String>>) {
        let buffer = Rc::new(RefCell::new(String::new()));
        let receiver = Box::new(Self {
            buffer: Rc::clone(&buffer),
            enabled_events,
        });
        (receiver, buffer)
    }
}

impl LogReceiver for MemoryReceiver {
    fn should_log(&self, event: LogEvent) -> bool {
        self.enabled_events.contains(&event)
    }

    fn write(&mut self, s: &str) -> io::Result<()> {
        self.buffer.borrow_mut().push_str(s);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub type ReceiverId = usize;

static RECEIVER_ID_COUNTER: AtomicUsize = AtomicUsize::new(1);

/// Routes messages to every receiver listening for the message's event
pub struct Logger {
    receivers: Vec<(ReceiverId, Box<dyn LogReceiver>)>,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            receivers: Vec::new(),
        }
    }

    /// Add a receiver and return its id for later removal
    pub fn add_receiver(&mut self, receiver: Box<dyn LogReceiver>) -> ReceiverId {
        let id = RECEIVER_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.receivers.push((id, receiver));
        id
    }

    pub fn remove_receiver(&mut self, id: ReceiverId) {
        self.receivers.retain(|(receiver_id, _)| *receiver_id != id);
    }

    pub fn log(&mut self, event: LogEvent, message: &str) -> io::Result<()> {
        for (_, receiver) in &mut self.receivers {
            if receiver.should_log(event) {
                receiver.write(message)?;
            }
        }
        Ok(())
    }

    pub fn logln(&mut self, event: LogEvent, message: &str) -> io::Result<()> {
        self.log(event, &format!("{}\n", message))
    }

    /// Each receiver gets the message at most once, even when it listens to several of the upward events
    fn log_with_prefix(&mut self, event: LogEvent, prefix: &str, message: &str) -> io::Result<()> {
        let events = event.upward();
        let formatted_message = format!("{} {}\n", prefix, message);
        for (_, receiver) in &mut self.receivers {
            if events.iter().any(|&evt| receiver.should_log(evt)) {
                receiver.write(&formatted_message)?;
            }
        }
        Ok(())
    }

    /// Prepends "ERROR" and routes to the event and all less detailed events
    pub fn errln(&mut self, event: LogEvent, message: &str) -> io::Result<()> {
        self.log_with_prefix(event, "ERROR", message)
    }

    /// Prepends "WARNING" and routes to the event and all less detailed events
    pub fn warnln(&mut self, event: LogEvent, message: &str) -> io::Result<()> {
        self.log_with_prefix(event, "WARNING", message)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        for (_, receiver) in &mut self.receivers {
            receiver.flush()?;
        }
        Ok(())
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace characters that are not safe in file names
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

/// Like println! but for the logger
#[macro_export]
macro_rules! logln {
    ($logger:expr, $event:expr, $($arg:tt)*) => {
        {
            let _ = $logger.logln($event, &format!($($arg)*));
        }
    };
}

/// Like print! but for the logger
#[macro_export]
macro_rules! log {
    ($logger:expr, $event:expr, $($arg:tt)*) => {
        {
            let _ = $logger.log($event, &format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! errln {
    ($logger:expr, $event:expr, $($arg:tt)*) => {
        {
            let _ = $logger.errln($event, &format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! warnln {
    ($logger:expr, $event:expr, $($arg:tt)*) => {
        {
            let _ = $logger.warnln($event, &format!($($arg)*));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("share by group"), "share_by_group");
        assert_eq!(sanitize_filename("first/second"), "first_second");
        assert_eq!(sanitize_filename("gsp:2"), "gsp_2");
    }

    #[test]
    fn test_events_are_filtered_per_receiver() {
        let mut logger = Logger::new();
        let (receiver, buffer) = MemoryReceiver::new(vec![LogEvent::Experiment]);
        logger.add_receiver(receiver);
        logln!(logger, LogEvent::Auction, "auction line");
        logln!(logger, LogEvent::Experiment, "experiment line");
        assert_eq!(buffer.borrow().as_str(), "experiment line\n");
    }

    #[test]
    fn test_warnings_propagate_upward_once() {
        let mut logger = Logger::new();
        let (receiver, buffer) = MemoryReceiver::new(vec![LogEvent::Scenario, LogEvent::Validation]);
        logger.add_receiver(receiver);
        warnln!(logger, LogEvent::Platform, "bidder missing");
        assert_eq!(buffer.borrow().as_str(), "WARNING bidder missing\n");

        // Less detailed than Platform, so an Auction-only receiver does not see it
        let mut logger = Logger::new();
        let (receiver, buffer) = MemoryReceiver::new(vec![LogEvent::Auction]);
        logger.add_receiver(receiver);
        errln!(logger, LogEvent::Platform, "boom");
        assert!(buffer.borrow().is_empty());
    }

    #[test]
    fn test_remove_receiver() {
        let mut logger = Logger::new();
        let (receiver, buffer) = MemoryReceiver::new(vec![LogEvent::Validation]);
        let id = logger.add_receiver(receiver);
        logln!(logger, LogEvent::Validation, "one");
        logger.remove_receiver(id);
        logln!(logger, LogEvent::Validation, "two");
        assert_eq!(buffer.borrow().as_str(), "one\n");
    }
}
