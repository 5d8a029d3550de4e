//! Level-named façades over [`Agent::append`].

use crate::agent::Agent;
use crate::metadata::MetadataInit;
use crate::record::LogLevel;
use crate::value::Value;

/// Structured logger: a message plus optional per-call metadata.
///
/// Obtained from [`Agent::logger`].
#[derive(Clone, Copy)]
pub struct Logger<'a> {
    agent: &'a Agent,
}

macro_rules! structured_methods {
    ($($level:ident => $plain:ident, $with:ident;)*) => {
        $(
            pub fn $plain(&self, message: impl Into<String>) {
                self.agent.append(LogLevel::$level, message, None);
            }

            pub fn $with(&self, message: impl Into<String>, meta: &MetadataInit) {
                self.agent.append(LogLevel::$level, message, Some(meta));
            }
        )*
    };
}

impl<'a> Logger<'a> {
    pub(crate) fn new(agent: &'a Agent) -> Self {
        Self { agent }
    }

    structured_methods! {
        Log => log, log_with;
        Info => info, info_with;
        Debug => debug, debug_with;
        Warn => warn, warn_with;
        Error => error, error_with;
        Trace => trace, trace_with;
    }
}

/// Console-compatible logger accepting heterogeneous values.
///
/// Every call renders its values with
/// [`stringify_arg_list`](crate::serialize::stringify_arg_list) into a
/// single message. Obtained from [`Agent::console`].
#[derive(Clone, Copy)]
pub struct Console<'a> {
    agent: &'a Agent,
}

macro_rules! console_methods {
    ($($level:ident => $name:ident;)*) => {
        $(
            pub fn $name(&self, values: &[Value]) {
                self.agent.append_values(LogLevel::$level, values);
            }
        )*
    };
}

impl<'a> Console<'a> {
    pub(crate) fn new(agent: &'a Agent) -> Self {
        Self { agent }
    }

    console_methods! {
        Log => log;
        Info => info;
        Debug => debug;
        Warn => warn;
        Error => error;
    }
}
