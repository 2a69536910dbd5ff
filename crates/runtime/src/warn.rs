// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Warning routing.
//!
//! The interpreter delivers warnings as (message, continuation) pairs;
//! pieces accumulate until a non-continuation call completes the message.
//! Complete messages starting with `@` are control directives: `@on` and
//! `@off` toggle printing, any other `@…` is consumed silently. Everything
//! else goes to the diagnostic stream while printing is enabled.

use tracing::warn;

pub struct WarningRouter {
    enabled: bool,
    pending: String,
    sink: Option<Box<dyn FnMut(&str) + Send>>,
}

impl WarningRouter {
    /// Printing starts disabled; `@on` or the host's `-W` switch enables it.
    pub fn new() -> Self {
        Self { enabled: false, pending: String::new(), sink: None }
    }

    /// Router with printing already enabled (the `-W` host option).
    pub fn enabled() -> Self {
        Self { enabled: true, ..Self::new() }
    }

    /// Replace the default diagnostic-stream output with a script-installed
    /// callback.
    pub fn set_sink(&mut self, sink: Box<dyn FnMut(&str) + Send>) {
        self.sink = Some(sink);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Feed one warning piece from the interpreter.
    pub fn warn(&mut self, message: &str, to_be_continued: bool) {
        self.pending.push_str(message);
        if to_be_continued {
            return;
        }
        let complete = std::mem::take(&mut self.pending);
        self.route(&complete);
    }

    fn route(&mut self, message: &str) {
        if let Some(directive) = message.strip_prefix('@') {
            match directive {
                "on" => self.enabled = true,
                "off" => self.enabled = false,
                // Other control directives are recognized but inert.
                _ => {}
            }
            return;
        }
        if !self.enabled {
            return;
        }
        match self.sink.as_mut() {
            Some(sink) => sink(message),
            None => warn!(target: "comexe::script", "{message}"),
        }
    }
}

impl Default for WarningRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "warn_tests.rs"]
mod tests;
