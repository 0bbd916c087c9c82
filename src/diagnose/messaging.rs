// Shared diagnostic sink
//
//  Copyright (C) 2024 wixrs contributors.
//
//  This file is part of wixrs.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Shared, append-only sink for diagnostic messages.
//!
//! A single [`Messaging`] is constructed per build and passed by
//!   reference to every stage.
//! It may be written to concurrently
//!   (e.g. by parallel compilation of many source files);
//!     each [`Message`] is appended atomically.

use super::{Aborted, AnnotatedSpan, Diagnostic, Level, MessageCode};
use crate::span::Span;
use fxhash::FxHashSet;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// A rendered-agnostic diagnostic event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    level: Level,
    code: MessageCode,
    text: String,
    annotations: Vec<AnnotatedSpan>,
}

impl Message {
    pub fn new<S: Into<String>>(
        level: Level,
        code: MessageCode,
        text: S,
        annotations: Vec<AnnotatedSpan>,
    ) -> Self {
        Self {
            level,
            code,
            text: text.into(),
            annotations,
        }
    }

    pub fn from_diagnostic<D: Diagnostic>(diagnostic: &D) -> Self {
        Self::new(
            diagnostic.level(),
            diagnostic.code(),
            diagnostic.to_string(),
            diagnostic.describe(),
        )
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn code(&self) -> MessageCode {
        self.code
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn annotations(&self) -> &[AnnotatedSpan] {
        &self.annotations
    }

    /// The primary location of this message,
    ///   if any.
    pub fn span(&self) -> Option<&Span> {
        self.annotations.iter().find_map(AnnotatedSpan::span)
    }
}

/// User configuration of warning handling.
///
/// Errors can never be suppressed;
///   only warnings are affected by this configuration.
#[derive(Debug, Clone, Default)]
pub struct MessagingConfig {
    suppress_all_warnings: bool,
    warnings_as_errors: bool,
    suppressed: FxHashSet<MessageCode>,
    escalated: FxHashSet<MessageCode>,
}

impl MessagingConfig {
    pub fn set_suppress_all_warnings(&mut self, value: bool) {
        self.suppress_all_warnings = value;
    }

    pub fn set_warnings_as_errors(&mut self, value: bool) {
        self.warnings_as_errors = value;
    }

    /// Suppress the warning identified by `id`.
    ///
    /// `id` is a positive number,
    ///   optionally prefixed with `WIX`.
    pub fn suppress_warning(
        &mut self,
        id: &str,
    ) -> Result<(), MessagingConfigError> {
        self.suppressed.insert(Self::parse_code(id)?);
        Ok(())
    }

    /// Treat the warning identified by `id` as an error.
    pub fn escalate_warning(
        &mut self,
        id: &str,
    ) -> Result<(), MessagingConfigError> {
        self.escalated.insert(Self::parse_code(id)?);
        Ok(())
    }

    fn parse_code(id: &str) -> Result<MessageCode, MessagingConfigError> {
        let trimmed = id.trim();
        let digits = match trimmed.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("wix") => {
                &trimmed[3..]
            }
            _ => trimmed,
        };

        match digits.parse::<u32>() {
            Ok(n) if n > 0 => Ok(MessageCode(n)),
            _ => Err(MessagingConfigError::InvalidWarningId(id.into())),
        }
    }

    /// Level at which a message of the given original level and code is
    ///   recorded,
    ///     or [`None`] if it is suppressed.
    fn effective_level(&self, level: Level, code: MessageCode) -> Option<Level> {
        match level {
            Level::Warning
                if self.suppress_all_warnings
                    || self.suppressed.contains(&code) =>
            {
                None
            }
            Level::Warning
                if self.warnings_as_errors || self.escalated.contains(&code) =>
            {
                Some(Level::Error)
            }
            _ => Some(level),
        }
    }
}

/// Invalid warning handling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagingConfigError {
    #[error(
        "invalid warning id `{0}`; \
           expected a positive number optionally prefixed with `WIX`"
    )]
    InvalidWarningId(String),
}

impl Diagnostic for MessagingConfigError {
    fn code(&self) -> MessageCode {
        MessageCode(1)
    }

    fn describe(&self) -> Vec<AnnotatedSpan> {
        Vec::new()
    }
}

#[derive(Debug, Default)]
struct State {
    messages: Vec<Message>,
    errors: usize,
    warnings: usize,
    last_error: Option<MessageCode>,
}

/// Process-wide diagnostic sink for a single build.
#[derive(Debug, Default)]
pub struct Messaging {
    config: MessagingConfig,
    state: Mutex<State>,
    encountered_error: AtomicBool,
}

impl Messaging {
    pub fn new(config: MessagingConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Record a diagnostic.
    ///
    /// Returns the level at which the diagnostic was recorded,
    ///   or [`None`] if it was suppressed by configuration.
    pub fn emit<D: Diagnostic>(&self, diagnostic: &D) -> Option<Level> {
        self.write(Message::from_diagnostic(diagnostic))
    }

    /// Record a message,
    ///   applying warning configuration.
    pub fn write(&self, mut message: Message) -> Option<Level> {
        let level = self.config.effective_level(message.level, message.code)?;
        message.level = level;

        tracing::trace!(code = %message.code, %level, "{}", message.text);

        let mut state = self.state.lock();

        if level.is_error() {
            state.errors += 1;
            state.last_error = Some(message.code);
            self.encountered_error.store(true, Ordering::SeqCst);
        } else if level == Level::Warning {
            state.warnings += 1;
        }

        state.messages.push(message);

        Some(level)
    }

    /// Whether any error has been recorded since this sink was created.
    pub fn encountered_error(&self) -> bool {
        self.encountered_error.load(Ordering::SeqCst)
    }

    pub fn error_count(&self) -> usize {
        self.state.lock().errors
    }

    pub fn warning_count(&self) -> usize {
        self.state.lock().warnings
    }

    /// Code of the most recently recorded error.
    pub fn last_error_code(&self) -> Option<MessageCode> {
        self.state.lock().last_error
    }

    /// Snapshot of all messages recorded so far,
    ///   in the order in which they were recorded.
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().messages.clone()
    }

    /// Remove and return all messages recorded so far.
    ///
    /// Counters and the error flag are unaffected.
    pub fn take_messages(&self) -> Vec<Message> {
        std::mem::take(&mut self.state.lock().messages)
    }
}

/// Records the errors that a single stage contributes to a shared
///   [`Messaging`].
///
/// The shared error flag cannot be used to decide whether a unit of work
///   failed when other units are being processed concurrently,
///     so each unit counts its own errors.
pub struct StageSink<'m> {
    messaging: &'m Messaging,
    stage: &'static str,
    errors: usize,
}

impl<'m> StageSink<'m> {
    pub fn new(messaging: &'m Messaging, stage: &'static str) -> Self {
        Self {
            messaging,
            stage,
            errors: 0,
        }
    }

    pub fn emit<D: Diagnostic>(&mut self, diagnostic: &D) {
        self.write(Message::from_diagnostic(diagnostic))
    }

    pub fn write(&mut self, message: Message) {
        if let Some(level) = self.messaging.write(message) {
            if level.is_error() {
                self.errors += 1;
            }
        }
    }

    /// Number of errors recorded through this sink.
    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn messaging(&self) -> &'m Messaging {
        self.messaging
    }

    /// Produce `value` if no errors were recorded,
    ///   otherwise [`Aborted`].
    pub fn finish<T>(&self, value: T) -> Result<T, Aborted> {
        match self.errors {
            0 => Ok(value),
            errors => Err(Aborted {
                stage: self.stage,
                errors,
            }),
        }
    }

    /// Halt the stage after a fatal error has been recorded.
    pub fn abort(&self) -> Aborted {
        Aborted {
            stage: self.stage,
            errors: self.errors.max(1),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::diagnose::Annotate;

    #[derive(Debug, Error)]
    #[error("stub {0:?}")]
    struct StubDiagnostic(Level, u32);

    impl Diagnostic for StubDiagnostic {
        fn code(&self) -> MessageCode {
            MessageCode(self.1)
        }

        fn level(&self) -> Level {
            self.0
        }

        fn describe(&self) -> Vec<AnnotatedSpan> {
            Span::new("stub.wxs", self.1).mark_error().into()
        }
    }

    #[test]
    fn records_errors_and_last_code() {
        let sut = Messaging::default();

        assert!(!sut.encountered_error());

        sut.emit(&StubDiagnostic(Level::Error, 10));
        sut.emit(&StubDiagnostic(Level::Warning, 11));
        sut.emit(&StubDiagnostic(Level::Error, 12));

        assert!(sut.encountered_error());
        assert_eq!(2, sut.error_count());
        assert_eq!(1, sut.warning_count());
        assert_eq!(Some(MessageCode(12)), sut.last_error_code());
        assert_eq!(3, sut.messages().len());
        assert_eq!(
            Some(&Span::new("stub.wxs", 10)),
            sut.messages()[0].span()
        );
    }

    #[test]
    fn warnings_never_set_error_flag() {
        let sut = Messaging::default();
        sut.emit(&StubDiagnostic(Level::Warning, 5));

        assert!(!sut.encountered_error());
        assert_eq!(None, sut.last_error_code());
    }

    #[test]
    fn suppressed_warning_is_dropped() {
        let mut config = MessagingConfig::default();
        config.suppress_warning("WIX0005").unwrap();

        let sut = Messaging::new(config);

        assert_eq!(None, sut.emit(&StubDiagnostic(Level::Warning, 5)));
        assert_eq!(
            Some(Level::Warning),
            sut.emit(&StubDiagnostic(Level::Warning, 6))
        );
        assert_eq!(1, sut.messages().len());
    }

    #[test]
    fn errors_cannot_be_suppressed() {
        let mut config = MessagingConfig::default();
        config.set_suppress_all_warnings(true);
        config.suppress_warning("7").unwrap();

        let sut = Messaging::new(config);

        assert_eq!(
            Some(Level::Error),
            sut.emit(&StubDiagnostic(Level::Error, 7))
        );
        assert!(sut.encountered_error());
    }

    #[test]
    fn escalated_warning_becomes_error() {
        let mut config = MessagingConfig::default();
        config.escalate_warning("wix42").unwrap();

        let sut = Messaging::new(config);

        assert_eq!(
            Some(Level::Error),
            sut.emit(&StubDiagnostic(Level::Warning, 42))
        );
        assert!(sut.encountered_error());
        assert_eq!(Some(MessageCode(42)), sut.last_error_code());
    }

    #[test]
    fn all_warnings_as_errors() {
        let mut config = MessagingConfig::default();
        config.set_warnings_as_errors(true);

        let sut = Messaging::new(config);
        sut.emit(&StubDiagnostic(Level::Warning, 3));

        assert_eq!(1, sut.error_count());
    }

    #[test]
    fn invalid_warning_ids_are_rejected() {
        let mut config = MessagingConfig::default();

        for id in ["", "WIX", "abc", "0", "-4", "WIXWIX1"] {
            assert_eq!(
                Err(MessagingConfigError::InvalidWarningId(id.into())),
                config.suppress_warning(id),
                "{id}",
            );
        }
    }

    #[test]
    fn stage_sink_counts_only_its_own_errors() {
        let sut = Messaging::default();
        sut.emit(&StubDiagnostic(Level::Error, 1));

        let mut stage = StageSink::new(&sut, "test");
        assert!(!stage.has_errors());
        assert_eq!(Ok(1), stage.finish(1));

        stage.emit(&StubDiagnostic(Level::Warning, 2));
        assert!(!stage.has_errors());

        stage.emit(&StubDiagnostic(Level::Error, 3));
        assert_eq!(1, stage.errors());
        assert_eq!(2, sut.error_count());
        assert_eq!(
            Err(Aborted {
                stage: "test",
                errors: 1
            }),
            stage.finish(())
        );
    }

    #[test]
    fn concurrent_writes_are_not_lost() {
        let sut = Messaging::default();

        std::thread::scope(|s| {
            for t in 0..4 {
                let sut = &sut;
                s.spawn(move || {
                    for i in 0..100 {
                        sut.emit(&StubDiagnostic(Level::Error, t * 1000 + i));
                    }
                });
            }
        });

        assert_eq!(400, sut.error_count());
        assert_eq!(400, sut.messages().len());
    }
}
