//! Accepted onboarding data, plus the lenient draft shapes the wizard posts.
//!
//! Drafts deserialize anything structurally plausible so that validation can
//! report every missing or invalid field at once. Only a validated draft
//! becomes an [`OnboardingSubmission`].

use std::fmt;

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

pub const REQUIRED_TOAST_TYPES: usize = 20;
pub const DEFAULT_TIMEZONE: &str = "America/Indiana/Indianapolis";
pub const DEFAULT_MAX_EMAILS_PER_RUN: u32 = 50;
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// Wire labels, shared by parsing, serialization and the text report.
pub trait Labelled: Sized + Copy + PartialEq + 'static {
    const ALL: &'static [(Self, &'static str)];

    fn label(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(value, _)| *value == self)
            .map(|(_, label)| *label)
            .unwrap_or_default()
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .find(|(_, known)| *known == label.trim())
            .map(|(value, _)| *value)
    }
}

// Declares a closed enum whose serde form is its label in `Labelled::ALL`.
macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl Labelled for $name {
            const ALL: &'static [(Self, &'static str)] = &[$(($name::$variant, $label)),+];
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(Labelled::label(*self))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let label = String::deserialize(deserializer)?;
                <$name as Labelled>::from_label(&label).ok_or_else(|| {
                    de::Error::custom(format!("unrecognized {} \"{}\"", stringify!($name), label))
                })
            }
        }
    };
}

labelled_enum! {
    DomAction {
        AutoReply => "Auto-reply (templated)",
        SummarizeAndNotify => "Summarize and notify",
        RouteToFolder => "Route to folder/label",
        FlagUrgent => "Flag urgent",
        DoNothing => "Do nothing",
    }
}

labelled_enum! {
    UnknownMessageAction {
        AskForClarification => "Ask for clarification",
        SummarizeAndNotify => "Summarize and notify",
        DoNothing => "Do nothing",
    }
}

labelled_enum! {
    ProcessingSchedule {
        Every5Minutes => "Every 5 minutes",
        Every15Minutes => "Every 15 minutes",
        Hourly => "Hourly",
        ManualOnly => "Manual only",
    }
}

labelled_enum! {
    NotificationMethod {
        Email => "Email",
        Slack => "Slack (placeholder)",
        Sms => "SMS (placeholder)",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub organization_name: String,
    pub primary_contact_name: String,
    pub primary_contact_email: String,
    pub phone_optional: Option<String>,
    pub timezone: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxSettings {
    pub provider: Option<String>,
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub username: String,
    pub password: String,
    pub mailbox_folder: String,
}

impl fmt::Debug for MailboxSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxSettings")
            .field("provider", &self.provider)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("username", &self.username)
            .field("password", &"******")
            .field("mailbox_folder", &self.mailbox_folder)
            .finish()
    }
}

/// One classification rule ("toast type").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastType {
    pub category_name: String,
    pub category_description: Option<String>,
    #[serde(rename = "desired_DOM_action")]
    pub desired_dom_action: DomAction,
    pub urgency_level: u8,
    pub examples: Option<String>,
    pub allowed_senders: Option<String>,
    pub blocked_senders: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationalSettings {
    pub processing_schedule: ProcessingSchedule,
    pub max_emails_per_run: u32,
    pub lookback_days_for_initial_run: u32,
    pub notification_email: Option<String>,
    pub notification_methods: Vec<NotificationMethod>,
}

/// A fully validated submission, in wire layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingSubmission {
    pub tenant: Tenant,
    pub imap: MailboxSettings,
    pub imap_test_passed: bool,
    pub imap_consent: bool,
    pub toast_types: Vec<ToastType>,
    pub unknown_message_action: Option<UnknownMessageAction>,
    pub operational: OperationalSettings,
    pub pilot_consent: bool,
}

/// Form inputs arrive either as JSON numbers or as numeric strings.
/// Anything else is kept so it can be reported as invalid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(serde_json::Number),
    Text(String),
    Other(Value),
}

impl LooseNumber {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            LooseNumber::Number(number) => number.as_i64(),
            LooseNumber::Text(text) => text.trim().parse().ok(),
            LooseNumber::Other(_) => None,
        }
    }

    /// Blank strings count as absent.
    pub fn is_blank(&self) -> bool {
        matches!(self, LooseNumber::Text(text) if text.trim().is_empty())
    }
}

/// A value of the wrong JSON type counts as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Like [`lenient`], but a malformed element becomes an empty one instead of
/// discarding the whole list.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .map(|item| serde_json::from_value(item).unwrap_or_default())
                .collect(),
        )),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionRequestDraft {
    #[serde(deserialize_with = "lenient")]
    pub host: Option<String>,
    pub port: Option<LooseNumber>,
    /// Kept raw so a non-boolean is reported instead of rejected.
    pub tls: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    pub username: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub password: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TenantDraft {
    #[serde(deserialize_with = "lenient")]
    pub organization_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub primary_contact_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub primary_contact_email: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub phone_optional: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MailboxDraft {
    #[serde(deserialize_with = "lenient")]
    pub provider: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub host: Option<String>,
    pub port: Option<LooseNumber>,
    #[serde(deserialize_with = "lenient")]
    pub tls: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub username: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub password: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub mailbox_folder: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToastTypeDraft {
    #[serde(deserialize_with = "lenient")]
    pub category_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub category_description: Option<String>,
    #[serde(rename = "desired_DOM_action", deserialize_with = "lenient")]
    pub desired_dom_action: Option<String>,
    pub urgency_level: Option<LooseNumber>,
    #[serde(deserialize_with = "lenient")]
    pub examples: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub allowed_senders: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub blocked_senders: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OperationalDraft {
    #[serde(deserialize_with = "lenient")]
    pub processing_schedule: Option<String>,
    pub max_emails_per_run: Option<LooseNumber>,
    pub lookback_days_for_initial_run: Option<LooseNumber>,
    #[serde(deserialize_with = "lenient")]
    pub notification_email: Option<String>,
    /// Entries are kept raw so a non-string is reported, not dropped.
    #[serde(deserialize_with = "lenient")]
    pub notification_methods: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubmissionDraft {
    #[serde(deserialize_with = "lenient")]
    pub tenant: Option<TenantDraft>,
    #[serde(deserialize_with = "lenient")]
    pub imap: Option<MailboxDraft>,
    #[serde(deserialize_with = "lenient")]
    pub imap_test_passed: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub imap_consent: Option<bool>,
    #[serde(deserialize_with = "lenient_list")]
    pub toast_types: Option<Vec<ToastTypeDraft>>,
    #[serde(deserialize_with = "lenient")]
    pub unknown_message_action: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub operational: Option<OperationalDraft>,
    #[serde(deserialize_with = "lenient")]
    pub pilot_consent: Option<bool>,
}
