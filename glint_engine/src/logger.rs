use ansi_term::Color;
use chrono::Local;
use err_derive::Error;
use log::{error, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fmt::Display;
use std::process;

#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error(display = "Logger already initialized: {}", err)]
    AlreadyInitialized { err: SetLoggerError },
}

pub struct Logger {
    color: bool,
}

impl Logger {
    pub fn init(color: bool) -> Result<(), LoggerInitError> {
        log::set_boxed_logger(Box::new(Logger { color }))
            .map(|()| log::set_max_level(LevelFilter::Debug))
            .map_err(|err| LoggerInitError::AlreadyInitialized { err })
    }
}

impl Log for Logger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let time = Local::now().format("%H:%M:%S");
        let level = record.level();

        if self.color {
            let color = match level {
                Level::Error => Color::Red,
                Level::Warn => Color::Yellow,
                Level::Info => Color::Green,
                Level::Debug => Color::Cyan,
                Level::Trace => Color::White,
            };

            println!(
                "[{}] {} {}",
                time,
                color.paint(level.to_string()),
                record.args()
            );
        } else {
            println!("[{}] {} {}", time, level, record.args());
        }
    }

    fn flush(&self) {}
}

pub trait UnwrapOrLog<T> {
    fn unwrap_or_log(self, label: &str) -> T;
}

impl<T, E: Display> UnwrapOrLog<T> for Result<T, E> {
    fn unwrap_or_log(self, label: &str) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                error!("{}: {}", label, err);
                process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UnwrapOrLog;

    #[test]
    fn unwrap_or_log_passes_ok_through() {
        let result: Result<i32, String> = Ok(17);
        assert_eq!(result.unwrap_or_log("Test"), 17);
    }
}
