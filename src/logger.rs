use crate::{Log, Token};
use std::fmt::{Display, Formatter};

impl<T: Display> Display for Log<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Log::None => Ok(()),
            Log::Default(s) | Log::Success(s) | Log::Result(s) | Log::Verbose(s) => {
                write!(f, "{}", s)
            }
        }
    }
}

impl<T> Log<T> {
    /// Function which return order of the log.
    pub fn order(&self) -> u8 {
        match self {
            Log::None => 0,
            Log::Default(_) => 1,
            Log::Success(_) => 2,
            Log::Result(_) => 3,
            Log::Verbose(_) => 4,
        }
    }
}

impl<T: Display> Log<T> {
    pub fn log_token(&self, token: &Token) {
        #[cfg(debug_assertions)]
        if self.order() >= Log::Success(()).order() {
            println!(
                "[{}; Token]: {:?} {:?} at {}",
                self, token.kind, token.text, token.location
            );
        }
        #[cfg(not(debug_assertions))]
        let _ = token;
    }

    pub fn log_trace(&self, label: &str, detail: std::fmt::Arguments) {
        #[cfg(debug_assertions)]
        if self.order() >= Log::Verbose(()).order() {
            println!("[{}; {}]: {}", self, label, detail);
        }
        #[cfg(not(debug_assertions))]
        let _ = (label, detail);
    }
}
