//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::state::*;
use super::transition::*;
use super::*;
use crate::backend::ChatReply;
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> SessionContext {
    SessionContext::new("patient-1")
}

fn fixed_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
}

fn assistant_entries(state: &LoggingSession) -> u32 {
    u32::try_from(state.transcript.iter().filter(|m| m.is_assistant()).count()).unwrap()
}

fn stage_rank(stage: Stage) -> u8 {
    match stage {
        Stage::InitialInput => 0,
        Stage::Chatting => 1,
        Stage::Saving | Stage::Error => 2,
        Stage::Done => 3,
    }
}

/// Events generated without knowing the state; epochs are bound at apply time
#[derive(Debug, Clone)]
enum Action {
    Begin(String),
    FollowUp(String),
    Reply { text: String, stop: bool },
    Fail { network: bool },
    Save,
    SaveOk,
    SaveFail,
    Reset,
    AutoReset,
    StaleReply,
}

impl Action {
    fn to_event(&self, state: &LoggingSession) -> Event {
        let epoch = state.epoch;
        let at = fixed_time();
        match self {
            Action::Begin(text) => Event::BeginAnalysis {
                text: text.clone(),
                at,
            },
            Action::FollowUp(text) => Event::FollowUp {
                text: text.clone(),
                at,
            },
            Action::Reply { text, stop } => Event::AssistantReply {
                epoch,
                reply: ChatReply {
                    text: text.clone(),
                    should_stop: *stop,
                },
                at,
            },
            Action::Fail { network } => Event::RequestFailed {
                epoch,
                kind: if *network {
                    ErrorKind::Network
                } else {
                    ErrorKind::Server
                },
                message: "request failed".to_string(),
            },
            Action::Save => Event::Save { at },
            Action::SaveOk => Event::SaveComplete {
                epoch,
                entry: state.to_entry("patient-1", at),
            },
            Action::SaveFail => Event::SaveFailed {
                epoch,
                message: "save failed".to_string(),
            },
            Action::Reset => Event::Reset,
            Action::AutoReset => Event::AutoResetElapsed { epoch },
            Action::StaleReply => Event::AssistantReply {
                epoch: epoch.wrapping_add(1),
                reply: ChatReply::new("stale"),
                at,
            },
        }
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-zA-Z ]{1,30}",
        1 => "[ \t\n]{0,4}",
    ]
}

fn arb_nonblank_text() -> impl Strategy<Value = String> {
    "[ ]{0,3}[a-zA-Z0-9][a-zA-Z0-9 ]{0,30}[ \n]{0,3}"
}

fn arb_blank_text() -> impl Strategy<Value = String> {
    "[ \t\n]{0,6}"
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        2 => arb_text().prop_map(Action::Begin),
        3 => arb_text().prop_map(Action::FollowUp),
        4 => ("[a-zA-Z ?]{1,30}", proptest::bool::weighted(0.1))
            .prop_map(|(text, stop)| Action::Reply { text, stop }),
        1 => any::<bool>().prop_map(|network| Action::Fail { network }),
        2 => Just(Action::Save),
        2 => Just(Action::SaveOk),
        1 => Just(Action::SaveFail),
        1 => Just(Action::Reset),
        1 => Just(Action::AutoReset),
        1 => Just(Action::StaleReply),
    ]
}

/// Drive the machine through a sequence, ignoring refused events
fn run(actions: &[Action]) -> Vec<LoggingSession> {
    let mut states = vec![LoggingSession::default()];
    let mut state = LoggingSession::default();
    for action in actions {
        if let Ok(result) = transition(&state, &test_context(), action.to_event(&state)) {
            state = result.new_state;
            states.push(state.clone());
        }
    }
    states
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn begin_with_text_enters_chatting(text in arb_nonblank_text()) {
        let result = transition(
            &LoggingSession::default(),
            &test_context(),
            Event::BeginAnalysis { text: text.clone(), at: fixed_time() },
        ).unwrap();
        prop_assert_eq!(result.new_state.stage, Stage::Chatting);
        prop_assert_eq!(result.new_state.transcript[0].sender, Sender::User);
        prop_assert_eq!(&result.new_state.transcript[0].text, text.trim());
    }

    #[test]
    fn blank_input_never_changes_stage_or_transcript(
        prefix in proptest::collection::vec(arb_action(), 0..20),
        blank in arb_blank_text(),
    ) {
        let state = run(&prefix).pop().unwrap();
        for event in [
            Event::BeginAnalysis { text: blank.clone(), at: fixed_time() },
            Event::FollowUp { text: blank.clone(), at: fixed_time() },
        ] {
            prop_assert!(transition(&state, &test_context(), event).is_err());
        }
    }

    #[test]
    fn turn_count_matches_assistant_entries(actions in proptest::collection::vec(arb_action(), 0..60)) {
        for state in run(&actions) {
            prop_assert_eq!(state.assistant_turn_count, assistant_entries(&state));
        }
    }

    #[test]
    fn transcript_starts_with_complaint(actions in proptest::collection::vec(arb_action(), 0..60)) {
        for state in run(&actions) {
            match state.transcript.first() {
                Some(first) => {
                    prop_assert_eq!(first.sender, Sender::User);
                    prop_assert_eq!(Some(&first.text), state.initial_complaint.as_ref());
                }
                None => prop_assert!(state.initial_complaint.is_none()),
            }
        }
    }

    #[test]
    fn transcript_alternates_until_closing(actions in proptest::collection::vec(arb_action(), 0..60)) {
        for state in run(&actions) {
            let body = match state.transcript.last() {
                Some(last) if last.text == CLOSING_MESSAGE && state.stage != Stage::Chatting => {
                    &state.transcript[..state.transcript.len() - 1]
                }
                _ => &state.transcript[..],
            };
            for pair in body.windows(2) {
                prop_assert_ne!(pair[0].sender, pair[1].sender);
            }
        }
    }

    #[test]
    fn stage_only_moves_forward_without_reset(actions in proptest::collection::vec(arb_action(), 0..60)) {
        let mut state = LoggingSession::default();
        for action in &actions {
            let event = action.to_event(&state);
            let is_reset = matches!(event, Event::Reset | Event::AutoResetElapsed { .. });
            if let Ok(result) = transition(&state, &test_context(), event) {
                if !is_reset {
                    prop_assert!(stage_rank(result.new_state.stage) >= stage_rank(state.stage));
                    prop_assert!(
                        state.stage != Stage::Saving || result.new_state.stage != Stage::Error
                    );
                }
                state = result.new_state;
            }
        }
    }

    #[test]
    fn at_most_one_request_in_flight(actions in proptest::collection::vec(arb_action(), 0..60)) {
        let mut state = LoggingSession::default();
        for action in &actions {
            let result = transition(&state, &test_context(), action.to_event(&state));
            if let Ok(result) = result {
                let requests = result
                    .effects
                    .iter()
                    .filter(|e| matches!(e, Effect::RequestReply { .. } | Effect::PersistSession { .. }))
                    .count();
                prop_assert!(requests <= 1);
                if requests == 1 {
                    prop_assert!(state.pending.is_none());
                    prop_assert!(result.new_state.pending.is_some());
                }
                state = result.new_state;
            }
        }
    }

    #[test]
    fn reset_from_anywhere_is_pristine(actions in proptest::collection::vec(arb_action(), 0..60)) {
        let state = run(&actions).pop().unwrap();
        let result = transition(&state, &test_context(), Event::Reset).unwrap();
        prop_assert!(result.new_state.is_pristine());
        prop_assert_eq!(result.new_state.epoch, state.epoch + 1);
        prop_assert!(result.effects.contains(&Effect::CancelAutoReset));
    }

    #[test]
    fn stale_completions_are_refused(actions in proptest::collection::vec(arb_action(), 0..40)) {
        let state = run(&actions).pop().unwrap();
        let stale = Action::StaleReply.to_event(&state);
        prop_assert!(matches!(
            transition(&state, &test_context(), stale),
            Err(TransitionError::Stale(_))
        ));
    }

    #[test]
    fn saving_follows_exactly_max_replies(
        complaint in arb_nonblank_text(),
        answers in proptest::collection::vec(arb_nonblank_text(), 4),
    ) {
        let mut state = transition(
            &LoggingSession::default(),
            &test_context(),
            Event::BeginAnalysis { text: complaint, at: fixed_time() },
        ).unwrap().new_state;

        for (i, answer) in answers.iter().enumerate() {
            state = transition(&state, &test_context(), Action::Reply {
                text: format!("question {i}"),
                stop: false,
            }.to_event(&state)).unwrap().new_state;

            let replies = u32::try_from(i + 1).unwrap();
            if replies >= MAX_AI_TURNS {
                prop_assert_eq!(state.stage, Stage::Saving);
                prop_assert_eq!(&state.transcript.last().unwrap().text, CLOSING_MESSAGE);
                break;
            }
            prop_assert_eq!(state.stage, Stage::Chatting);
            state = transition(&state, &test_context(), Event::FollowUp {
                text: answer.clone(),
                at: fixed_time(),
            }).unwrap().new_state;
        }
    }
}
