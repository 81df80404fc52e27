//! Optional policy that answers confirmation dialogs automatically.
//!
//! A misbehaving workflow can re-ask the same question forever; the loop
//! guard tracks a signature of the current question and stops auto-answering
//! once it repeats too often inside the time window. Only the current
//! signature is stored, so tracked state stays bounded.

use std::time::Duration;
use tokio::time::Instant;
use weft_types::AskUserDialogState;

#[derive(Debug, Clone)]
pub struct AutoConfirmConfig {
    pub enabled: bool,
    /// Wait before submitting, so a quickly replaced dialog is not answered.
    pub debounce: Duration,
    /// Answer with the first option when no explicit approve option exists.
    /// Off by default: for branching questions the first option is not a
    /// safe choice.
    pub fallback_to_first: bool,
    pub max_repeats: u32,
    pub window: Duration,
}

impl Default for AutoConfirmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            debounce: Duration::from_millis(300),
            fallback_to_first: false,
            max_repeats: 5,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct Signature {
    key: String,
    count: u32,
    first_seen: Instant,
}

#[derive(Debug, Default)]
pub struct AutoConfirm {
    config: AutoConfirmConfig,
    slot: Option<Signature>,
}

impl AutoConfirm {
    pub fn new(config: AutoConfirmConfig) -> Self {
        Self { config, slot: None }
    }

    pub fn config(&self) -> &AutoConfirmConfig {
        &self.config
    }

    /// Pick the option to auto-submit for the open dialog, or `None` when
    /// auto-confirm does not apply (disabled, no suitable option, or the
    /// loop guard tripped). The caller sleeps `config.debounce` before
    /// selecting and submitting.
    pub fn decide(&mut self, dialog: &AskUserDialogState) -> Option<String> {
        self.decide_at(dialog, Instant::now())
    }

    pub fn decide_at(&mut self, dialog: &AskUserDialogState, now: Instant) -> Option<String> {
        if !self.config.enabled || !dialog.is_open {
            return None;
        }

        let option_id = dialog
            .options
            .iter()
            .find(|option| option.id.eq_ignore_ascii_case("approve"))
            .map(|option| option.id.clone())
            .or_else(|| {
                if self.config.fallback_to_first {
                    dialog.options.first().map(|option| option.id.clone())
                } else {
                    None
                }
            })?;

        let key = signature_key(dialog);
        let same_signature = self
            .slot
            .as_ref()
            .is_some_and(|slot| slot.key == key);
        if !same_signature {
            self.slot = Some(Signature {
                key,
                count: 0,
                first_seen: now,
            });
        }
        let Some(slot) = self.slot.as_mut() else {
            return None;
        };
        if now.duration_since(slot.first_seen) > self.config.window {
            slot.count = 0;
            slot.first_seen = now;
        }

        slot.count += 1;
        if slot.count > self.config.max_repeats {
            tracing::warn!(
                question = %dialog.question,
                repeats = slot.count,
                "auto-confirm suppressed, same question keeps repeating"
            );
            return None;
        }
        Some(option_id)
    }
}

fn signature_key(dialog: &AskUserDialogState) -> String {
    let mut ids: Vec<&str> = dialog.options.iter().map(|option| option.id.as_str()).collect();
    ids.sort_unstable();
    format!("{}|{}|{}", dialog.thread_id, dialog.question, ids.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::{AskUserOption, AskUserRequest};

    fn dialog(question: &str) -> AskUserDialogState {
        AskUserDialogState::open(AskUserRequest {
            question: question.to_string(),
            options: vec![
                AskUserOption {
                    id: "approve".to_string(),
                    label: "通过".to_string(),
                    ..Default::default()
                },
                AskUserOption {
                    id: "reject".to_string(),
                    label: "拒绝".to_string(),
                    ..Default::default()
                },
            ],
            thread_id: "t-1".to_string(),
            ..Default::default()
        })
    }

    fn enabled() -> AutoConfirm {
        AutoConfirm::new(AutoConfirmConfig {
            enabled: true,
            ..AutoConfirmConfig::default()
        })
    }

    #[test]
    fn test_disabled_by_default() {
        let mut auto = AutoConfirm::new(AutoConfirmConfig::default());
        assert!(auto.decide(&dialog("ok?")).is_none());
    }

    #[test]
    fn test_picks_approve_option() {
        let mut auto = enabled();
        assert_eq!(auto.decide(&dialog("ok?")).as_deref(), Some("approve"));
    }

    #[test]
    fn test_no_first_option_fallback_unless_opted_in() {
        let mut plain = AskUserDialogState::open(AskUserRequest {
            question: "走哪条路线?".to_string(),
            options: vec![AskUserOption {
                id: "route_a".to_string(),
                label: "A".to_string(),
                ..Default::default()
            }],
            thread_id: "t-1".to_string(),
            ..Default::default()
        });
        plain.is_open = true;

        let mut auto = enabled();
        assert!(auto.decide(&plain).is_none());

        let mut with_fallback = AutoConfirm::new(AutoConfirmConfig {
            enabled: true,
            fallback_to_first: true,
            ..AutoConfirmConfig::default()
        });
        assert_eq!(auto_decide(&mut with_fallback, &plain).as_deref(), Some("route_a"));
    }

    fn auto_decide(auto: &mut AutoConfirm, dialog: &AskUserDialogState) -> Option<String> {
        auto.decide_at(dialog, Instant::now())
    }

    #[test]
    fn test_loop_guard_suppresses_after_max_repeats() {
        let mut auto = enabled();
        let dialog = dialog("重复的问题");
        let now = Instant::now();
        for _ in 0..5 {
            assert!(auto.decide_at(&dialog, now).is_some());
        }
        assert!(auto.decide_at(&dialog, now).is_none());
    }

    #[test]
    fn test_guard_resets_when_window_elapses() {
        let mut auto = enabled();
        let dialog = dialog("重复的问题");
        let start = Instant::now();
        for _ in 0..5 {
            auto.decide_at(&dialog, start);
        }
        assert!(auto.decide_at(&dialog, start).is_none());
        let later = start + Duration::from_secs(61);
        assert!(auto.decide_at(&dialog, later).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_recovers_on_the_paused_clock() {
        // Same as the window test, but driving `decide` through tokio's
        // frozen clock instead of hand-built instants.
        let mut auto = enabled();
        let dialog = dialog("重复的问题");
        for _ in 0..5 {
            assert!(auto.decide(&dialog).is_some());
        }
        assert!(auto.decide(&dialog).is_none());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(auto.decide(&dialog).as_deref(), Some("approve"));
    }

    #[test]
    fn test_guard_resets_on_new_signature() {
        let mut auto = enabled();
        let first = dialog("问题一");
        let now = Instant::now();
        for _ in 0..6 {
            auto.decide_at(&first, now);
        }
        assert!(auto.decide_at(&first, now).is_none());
        assert!(auto.decide_at(&dialog("问题二"), now).is_some());
    }
}
