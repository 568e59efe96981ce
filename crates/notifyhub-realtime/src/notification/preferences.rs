//! User notification preferences and partial updates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use notifyhub_core::types::UserId;
use notifyhub_core::{AppError, AppResult};

use super::model::NotificationKind;
use super::quiet_hours::{parse_hhmm, QuietHours};

/// Delivery channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channels {
    pub in_app: bool,
    pub email: bool,
    pub browser_push: bool,
    pub sms: bool,
}

impl Default for Channels {
    fn default() -> Self {
        Self {
            in_app: true,
            email: true,
            browser_push: true,
            sms: false,
        }
    }
}

/// How often notifications are delivered outside the app.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFrequency {
    #[default]
    Immediate,
    Hourly,
    DailyDigest,
}

/// Email digest cadence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestFrequency {
    #[default]
    Daily,
    Weekly,
    Never,
}

/// The single preferences record of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub user_id: UserId,
    pub channels: Channels,
    /// Per-kind switches. A kind without an entry is enabled.
    #[serde(default)]
    pub types: BTreeMap<NotificationKind, bool>,
    #[serde(default)]
    pub quiet_hours: QuietHours,
    #[serde(default)]
    pub frequency: DeliveryFrequency,
    pub sound_enabled: bool,
    /// 0..=100.
    pub sound_volume: u8,
    pub desktop_notifications: bool,
    pub email_digest: bool,
    #[serde(default)]
    pub email_digest_frequency: DigestFrequency,
}

impl NotificationPreferences {
    /// Defaults for a new session.
    pub fn for_user(user_id: UserId) -> Self {
        let types = [
            NotificationKind::NewMessage,
            NotificationKind::BookingRequest,
            NotificationKind::BookingConfirmed,
            NotificationKind::PaymentReceived,
            NotificationKind::PlatformUpdate,
            NotificationKind::SecurityAlert,
        ]
        .into_iter()
        .map(|kind| (kind, true))
        .collect();

        Self {
            user_id,
            channels: Channels::default(),
            types,
            quiet_hours: QuietHours::default(),
            frequency: DeliveryFrequency::Immediate,
            sound_enabled: true,
            sound_volume: 70,
            desktop_notifications: true,
            email_digest: true,
            email_digest_frequency: DigestFrequency::Daily,
        }
    }

    /// Whether a notification of `kind` should be surfaced in the app.
    pub fn allows(&self, kind: NotificationKind) -> bool {
        self.channels.in_app && self.types.get(&kind).copied().unwrap_or(true)
    }

    /// Check invariants of a record received from outside.
    pub fn validate(&self) -> AppResult<()> {
        check_volume(self.sound_volume)
    }

    /// Merge a partial update. Nested objects are merged field by field.
    ///
    /// The update is validated up front; on error nothing changes.
    pub fn apply(&mut self, patch: PreferencesPatch) -> AppResult<()> {
        if let Some(volume) = patch.sound_volume {
            check_volume(volume)?;
        }
        let (start, end) = match &patch.quiet_hours {
            Some(q) => (
                q.start_time.as_deref().map(parse_hhmm).transpose()?,
                q.end_time.as_deref().map(parse_hhmm).transpose()?,
            ),
            None => (None, None),
        };

        if let Some(c) = patch.channels {
            self.channels.in_app = c.in_app.unwrap_or(self.channels.in_app);
            self.channels.email = c.email.unwrap_or(self.channels.email);
            self.channels.browser_push = c.browser_push.unwrap_or(self.channels.browser_push);
            self.channels.sms = c.sms.unwrap_or(self.channels.sms);
        }
        if let Some(types) = patch.types {
            self.types.extend(types);
        }
        if let Some(q) = patch.quiet_hours {
            self.quiet_hours.enabled = q.enabled.unwrap_or(self.quiet_hours.enabled);
        }
        if let Some(start) = start {
            self.quiet_hours.start_time = start;
        }
        if let Some(end) = end {
            self.quiet_hours.end_time = end;
        }
        if let Some(frequency) = patch.frequency {
            self.frequency = frequency;
        }
        if let Some(enabled) = patch.sound_enabled {
            self.sound_enabled = enabled;
        }
        if let Some(volume) = patch.sound_volume {
            self.sound_volume = volume;
        }
        if let Some(desktop) = patch.desktop_notifications {
            self.desktop_notifications = desktop;
        }
        if let Some(digest) = patch.email_digest {
            self.email_digest = digest;
        }
        if let Some(frequency) = patch.email_digest_frequency {
            self.email_digest_frequency = frequency;
        }
        Ok(())
    }
}

fn check_volume(volume: u8) -> AppResult<()> {
    if volume > 100 {
        return Err(AppError::validation(format!(
            "Sound volume must be between 0 and 100, got {volume}"
        )));
    }
    Ok(())
}

/// Partial update to [`Channels`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsPatch {
    pub in_app: Option<bool>,
    pub email: Option<bool>,
    pub browser_push: Option<bool>,
    pub sms: Option<bool>,
}

/// Partial update to [`QuietHours`]; times are `HH:MM`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuietHoursPatch {
    pub enabled: Option<bool>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// Partial update to [`NotificationPreferences`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    pub channels: Option<ChannelsPatch>,
    pub types: Option<BTreeMap<NotificationKind, bool>>,
    pub quiet_hours: Option<QuietHoursPatch>,
    pub frequency: Option<DeliveryFrequency>,
    pub sound_enabled: Option<bool>,
    pub sound_volume: Option<u8>,
    pub desktop_notifications: Option<bool>,
    pub email_digest: Option<bool>,
    pub email_digest_frequency: Option<DigestFrequency>,
}
