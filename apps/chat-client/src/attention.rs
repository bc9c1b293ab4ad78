//! Attention tracking and unseen-message escalation.
//!
//! The user is attended iff the interface is both visible and focused.
//! While unattended, messages from other users raise the unseen count,
//! trigger a notification and a sound, and start a title blink that runs
//! until attention returns.

use std::time::Duration;

use chat_common::ChatMessage;
use tokio::time::Instant;

use crate::surface::{Notifier, Permission, Surface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlinkCycle {
    /// Whether the title currently shows the unseen count.
    showing_count: bool,
    next_flip: Instant,
}

#[derive(Debug)]
pub struct AttentionController {
    visible: bool,
    focused: bool,
    unseen: u32,
    blink: Option<BlinkCycle>,
    blink_interval: Duration,
    title: String,
}

impl AttentionController {
    /// Starts attended: a freshly opened interface is visible and focused.
    pub fn new(title: impl Into<String>, blink_interval: Duration) -> Self {
        Self {
            visible: true,
            focused: true,
            unseen: 0,
            blink: None,
            blink_interval,
            title: title.into(),
        }
    }

    pub fn is_attended(&self) -> bool {
        self.visible && self.focused
    }

    pub fn unseen(&self) -> u32 {
        self.unseen
    }

    pub fn is_blinking(&self) -> bool {
        self.blink.is_some()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// When the blink cycle next flips the title, if it is running.
    pub fn blink_deadline(&self) -> Option<Instant> {
        self.blink.map(|b| b.next_flip)
    }

    /// Ask for notification permission once, at startup, if undecided.
    pub fn request_permission_if_undecided(&self, notifier: &dyn Notifier) {
        if notifier.permission() == Permission::Default {
            tracing::debug!("requesting notification permission");
            notifier.request_permission();
        }
    }

    pub fn set_visible(&mut self, visible: bool, surface: &dyn Surface) {
        let was_attended = self.is_attended();
        self.visible = visible;
        self.on_signal(was_attended, surface);
    }

    pub fn set_focused(&mut self, focused: bool, surface: &dyn Surface) {
        let was_attended = self.is_attended();
        self.focused = focused;
        self.on_signal(was_attended, surface);
    }

    /// React to an incoming message. Returns whether it escalated.
    pub fn on_message(
        &mut self,
        msg: &ChatMessage,
        local_username: &str,
        notifier: &dyn Notifier,
        surface: &dyn Surface,
    ) -> bool {
        if self.is_attended() || !msg.is_user_message() || msg.username == local_username {
            return false;
        }

        self.unseen += 1;
        tracing::debug!(unseen = self.unseen, from = %msg.username, "unseen message");

        if notifier.permission() == Permission::Granted {
            let title = match msg.channel.as_deref().filter(|c| !c.is_empty()) {
                Some(channel) => format!("{} in #{}", msg.username, channel),
                None => msg.username.clone(),
            };
            notifier.notify(&title, &msg.content);
        }
        notifier.play_cue();

        match self.blink {
            Some(blink) => {
                if blink.showing_count {
                    surface.set_title(&self.unseen_title());
                }
            }
            None => {
                surface.set_title(&self.unseen_title());
                self.blink = Some(BlinkCycle {
                    showing_count: true,
                    next_flip: Instant::now() + self.blink_interval,
                });
            }
        }
        true
    }

    /// Flip the title. Called by the client loop when the blink deadline
    /// passes.
    pub fn on_blink_tick(&mut self, surface: &dyn Surface) {
        let Some(mut blink) = self.blink else {
            return;
        };
        blink.showing_count = !blink.showing_count;
        blink.next_flip += self.blink_interval;
        self.blink = Some(blink);

        if blink.showing_count {
            surface.set_title(&self.unseen_title());
        } else {
            surface.set_title(&self.title);
        }
    }

    pub fn unseen_title(&self) -> String {
        format!("({}) {}", self.unseen, self.title)
    }

    fn on_signal(&mut self, was_attended: bool, surface: &dyn Surface) {
        if self.is_attended() && !was_attended {
            tracing::debug!(unseen = self.unseen, "attention returned");
            self.unseen = 0;
            if self.blink.take().is_some() {
                surface.set_title(&self.title);
            }
        }
    }
}
