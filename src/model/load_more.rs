//! Load-more state machine
//!
//! The single authority on whether a load-more may start. It is consulted
//! before the resolver runs, so two requests in the same tick cannot both
//! reach the remote store.
//!
//! ```text
//! Idle --requested--> LoadingMore --succeeded(more)--> Idle
//!                                 --succeeded(none)--> Exhausted
//!                                 --failed-----------> Failed --requested--> LoadingMore
//!                                 --cancelled--------> Idle
//! any --reconfigure--> Idle
//! ```
//!
//! A request made while nothing more is available is refused without a
//! transition; only a completed load can exhaust the feed.
//!
//! The machine never retries on its own; leaving `Failed` always takes a new
//! request from the caller.

use serde::Serialize;
use strum::Display;

/// Messages that can be sent to update the load-more machine
///
/// Following Elm conventions, messages are named in past tense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// A caller asked for the next page
    LoadRequested { has_more_items: bool },
    /// The outstanding load-more completed
    LoadSucceeded { has_more_items: bool },
    /// The outstanding load-more failed
    LoadFailed,
    /// The request was accepted but no strategy could serve it
    LoadCancelled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Display)]
pub enum LoadMorePhase {
    #[default]
    Idle,
    LoadingMore,
    /// Terminal for the current filter/search configuration
    Exhausted,
    Failed,
}

/// Why a message was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Rejection {
    AlreadyLoading,
    NothingMoreToLoad,
    NotLoading,
}

impl std::error::Error for Rejection {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadMoreMachine {
    phase: LoadMorePhase,
}

impl LoadMoreMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> LoadMorePhase {
        self.phase
    }

    /// Whether a [`Message::LoadRequested`] would currently be accepted
    pub fn can_load_more(&self, has_more_items: bool) -> bool {
        matches!(self.phase, LoadMorePhase::Idle | LoadMorePhase::Failed) && has_more_items
    }

    /// Return to `Idle`; filters, search, items or the whole feed were replaced
    pub fn reconfigure(&mut self) {
        self.phase = LoadMorePhase::Idle;
    }

    /// Update the machine based on a message
    ///
    /// Returns the phase after the message. A rejected message leaves the
    /// machine untouched.
    pub fn update(&mut self, message: Message) -> Result<LoadMorePhase, Rejection> {
        match (self.phase, message) {
            (LoadMorePhase::LoadingMore, Message::LoadRequested { .. }) => {
                return Err(Rejection::AlreadyLoading);
            }
            (LoadMorePhase::Exhausted, Message::LoadRequested { .. }) => {
                return Err(Rejection::NothingMoreToLoad);
            }
            (
                LoadMorePhase::Idle | LoadMorePhase::Failed,
                Message::LoadRequested { has_more_items },
            ) => {
                if !has_more_items {
                    return Err(Rejection::NothingMoreToLoad);
                }
                self.phase = LoadMorePhase::LoadingMore;
            }
            (LoadMorePhase::LoadingMore, Message::LoadSucceeded { has_more_items }) => {
                self.phase = if has_more_items {
                    LoadMorePhase::Idle
                } else {
                    LoadMorePhase::Exhausted
                };
            }
            (LoadMorePhase::LoadingMore, Message::LoadFailed) => {
                self.phase = LoadMorePhase::Failed;
            }
            (LoadMorePhase::LoadingMore, Message::LoadCancelled) => {
                self.phase = LoadMorePhase::Idle;
            }
            (_, Message::LoadSucceeded { .. } | Message::LoadFailed | Message::LoadCancelled) => {
                return Err(Rejection::NotLoading);
            }
        }
        Ok(self.phase)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::*;

    use super::*;

    fn machine_in(phase: LoadMorePhase) -> LoadMoreMachine {
        LoadMoreMachine { phase }
    }

    #[test]
    fn test_default_is_idle() {
        assert_eq!(LoadMoreMachine::new().phase(), LoadMorePhase::Idle);
    }

    #[rstest]
    #[case(LoadMorePhase::Idle, true, Ok(LoadMorePhase::LoadingMore))]
    #[case(LoadMorePhase::Failed, true, Ok(LoadMorePhase::LoadingMore))]
    #[case(LoadMorePhase::LoadingMore, true, Err(Rejection::AlreadyLoading))]
    #[case(LoadMorePhase::Exhausted, true, Err(Rejection::NothingMoreToLoad))]
    #[case(LoadMorePhase::Idle, false, Err(Rejection::NothingMoreToLoad))]
    #[case(LoadMorePhase::Failed, false, Err(Rejection::NothingMoreToLoad))]
    fn test_load_requested(
        #[case] from: LoadMorePhase,
        #[case] has_more_items: bool,
        #[case] expected: Result<LoadMorePhase, Rejection>,
    ) {
        let mut machine = machine_in(from);
        assert_eq!(machine.can_load_more(has_more_items), expected.is_ok());
        assert_eq!(
            machine.update(Message::LoadRequested { has_more_items }),
            expected
        );
    }

    #[rstest]
    #[case(LoadMorePhase::Idle)]
    #[case(LoadMorePhase::Failed)]
    fn test_request_without_more_items_keeps_phase(#[case] from: LoadMorePhase) {
        let mut machine = machine_in(from);
        assert_eq!(
            machine.update(Message::LoadRequested {
                has_more_items: false,
            }),
            Err(Rejection::NothingMoreToLoad)
        );
        assert_eq!(machine.phase(), from);
        assert!(machine.can_load_more(true));
    }

    #[test]
    fn test_cancelled_request_returns_to_idle() {
        let mut machine = machine_in(LoadMorePhase::LoadingMore);
        assert_eq!(machine.update(Message::LoadCancelled), Ok(LoadMorePhase::Idle));
    }

    #[rstest]
    #[case(true, LoadMorePhase::Idle)]
    #[case(false, LoadMorePhase::Exhausted)]
    fn test_load_succeeded(#[case] has_more_items: bool, #[case] expected: LoadMorePhase) {
        let mut machine = machine_in(LoadMorePhase::LoadingMore);
        assert_eq!(
            machine.update(Message::LoadSucceeded { has_more_items }),
            Ok(expected)
        );
    }

    #[test]
    fn test_failure_then_retry() {
        let mut machine = machine_in(LoadMorePhase::LoadingMore);
        assert_eq!(machine.update(Message::LoadFailed), Ok(LoadMorePhase::Failed));
        assert!(machine.can_load_more(true));
        assert_eq!(
            machine.update(Message::LoadRequested {
                has_more_items: true
            }),
            Ok(LoadMorePhase::LoadingMore)
        );
    }

    #[rstest]
    #[case(LoadMorePhase::Idle)]
    #[case(LoadMorePhase::Exhausted)]
    #[case(LoadMorePhase::Failed)]
    fn test_completion_without_request_is_rejected(#[case] from: LoadMorePhase) {
        let mut machine = machine_in(from);
        assert_eq!(machine.update(Message::LoadFailed), Err(Rejection::NotLoading));
        assert_eq!(machine.update(Message::LoadCancelled), Err(Rejection::NotLoading));
        assert_eq!(
            machine.update(Message::LoadSucceeded {
                has_more_items: true
            }),
            Err(Rejection::NotLoading)
        );
        assert_eq!(machine.phase(), from);
    }

    #[rstest]
    #[case(LoadMorePhase::Idle)]
    #[case(LoadMorePhase::LoadingMore)]
    #[case(LoadMorePhase::Exhausted)]
    #[case(LoadMorePhase::Failed)]
    fn test_configuration_change_returns_to_idle(#[case] from: LoadMorePhase) {
        let mut machine = machine_in(from);
        machine.reconfigure();
        assert_eq!(machine.phase(), LoadMorePhase::Idle);
    }
}
