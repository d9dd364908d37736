use std::sync::OnceLock;

use regex::Regex;

use crate::imap_probe::{ConnectionRequest, DEFAULT_FOLDER};
use crate::onboarding::submission::*;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Trimmed, non-blank text or nothing.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|text| !text.is_empty())
}

fn port_from(value: &LooseNumber) -> Option<u16> {
    value
        .as_integer()
        .and_then(|port| u16::try_from(port).ok())
        .filter(|port| *port > 0)
}

/// Check a connectivity-test request and build the probe input from it.
pub fn validate_connection_request(
    input: &ConnectionRequestDraft,
) -> Result<ConnectionRequest, Vec<String>> {
    let mut errors = Vec::new();

    let host = present(&input.host);
    if host.is_none() {
        errors.push("IMAP host is required.".to_string());
    }
    let port = input.port.as_ref().and_then(port_from);
    if port.is_none() {
        errors.push("IMAP port must be a valid integer.".to_string());
    }
    let tls = input.tls.as_ref().and_then(serde_json::Value::as_bool);
    if tls.is_none() {
        errors.push("TLS must be a boolean.".to_string());
    }
    let username = present(&input.username);
    if username.is_none() {
        errors.push("Username is required.".to_string());
    }
    // Passwords are taken verbatim, surrounding spaces included.
    let password = input.password.as_deref().filter(|password| !password.is_empty());
    if password.is_none() {
        errors.push("Password is required.".to_string());
    }

    match (host, port, tls, username, password) {
        (Some(host), Some(port), Some(tls), Some(username), Some(password)) if errors.is_empty() => {
            Ok(ConnectionRequest {
                host: host.to_string(),
                port,
                tls,
                username: username.to_string(),
                password: password.to_string(),
                folder: present(&input.folder).unwrap_or(DEFAULT_FOLDER).to_string(),
            })
        }
        _ => Err(errors),
    }
}

/// Accumulates violations while a draft is converted field by field.
#[derive(Default)]
struct Violations(Vec<String>);

impl Violations {
    fn require<'a>(&mut self, value: Option<&'a str>, message: &str) -> &'a str {
        match value {
            Some(text) => text,
            None => {
                self.0.push(message.to_string());
                ""
            }
        }
    }

    fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }
}

fn validate_tenant(draft: &TenantDraft, violations: &mut Violations) -> Tenant {
    let organization_name = violations.require(
        present(&draft.organization_name),
        "Organization name is required.",
    );
    let primary_contact_name = violations.require(
        present(&draft.primary_contact_name),
        "Primary contact name is required.",
    );
    let primary_contact_email = violations.require(
        present(&draft.primary_contact_email).filter(|email| is_valid_email(email)),
        "Valid primary contact email is required.",
    );

    Tenant {
        organization_name: organization_name.to_string(),
        primary_contact_name: primary_contact_name.to_string(),
        primary_contact_email: primary_contact_email.to_string(),
        phone_optional: present(&draft.phone_optional).map(str::to_string),
        timezone: present(&draft.timezone)
            .unwrap_or(DEFAULT_TIMEZONE)
            .to_string(),
    }
}

fn validate_mailbox(draft: &MailboxDraft, violations: &mut Violations) -> MailboxSettings {
    let host = violations.require(present(&draft.host), "IMAP host is required.");

    let port = match draft.port.as_ref().filter(|port| !port.is_blank()) {
        None => {
            violations.push("IMAP port is required.");
            0
        }
        Some(value) => port_from(value).unwrap_or_else(|| {
            violations.push("IMAP port must be a valid integer.");
            0
        }),
    };

    let username = violations.require(present(&draft.username), "IMAP username is required.");
    let password = violations.require(
        draft.password.as_deref().filter(|password| !password.is_empty()),
        "IMAP password is required.",
    );

    MailboxSettings {
        provider: present(&draft.provider).map(str::to_string),
        host: host.to_string(),
        port,
        tls: draft.tls.unwrap_or(false),
        username: username.to_string(),
        password: password.to_string(),
        mailbox_folder: present(&draft.mailbox_folder)
            .unwrap_or(DEFAULT_FOLDER)
            .to_string(),
    }
}

fn validate_toast_type(
    number: usize,
    draft: &ToastTypeDraft,
    violations: &mut Violations,
) -> Option<ToastType> {
    let before = violations.0.len();

    let category_name = present(&draft.category_name);
    if category_name.is_none() {
        violations.push(format!("Toast type #{} is missing a category name.", number));
    }

    let action = match present(&draft.desired_dom_action) {
        None => {
            violations.push(format!("Toast type #{} is missing a desired action.", number));
            None
        }
        Some(label) => {
            let action = DomAction::from_label(label);
            if action.is_none() {
                violations.push(format!(
                    "Toast type #{} has an unrecognized action \"{}\".",
                    number, label
                ));
            }
            action
        }
    };

    let urgency_level = draft
        .urgency_level
        .as_ref()
        .and_then(LooseNumber::as_integer)
        .filter(|level| (1..=5).contains(level))
        .map(|level| level as u8);
    if urgency_level.is_none() {
        violations.push(format!("Toast type #{} must have urgency level 1-5.", number));
    }

    if violations.0.len() != before {
        return None;
    }

    Some(ToastType {
        category_name: category_name?.to_string(),
        category_description: present(&draft.category_description).map(str::to_string),
        desired_dom_action: action?,
        urgency_level: urgency_level?,
        examples: present(&draft.examples).map(str::to_string),
        allowed_senders: present(&draft.allowed_senders).map(str::to_string),
        blocked_senders: present(&draft.blocked_senders).map(str::to_string),
    })
}

fn validate_toast_types(
    drafts: Option<&Vec<ToastTypeDraft>>,
    violations: &mut Violations,
) -> Vec<ToastType> {
    let drafts = match drafts {
        Some(drafts) if drafts.len() == REQUIRED_TOAST_TYPES => drafts,
        _ => {
            violations.push("Exactly 20 toast type classifications are required.");
            return Vec::new();
        }
    };

    drafts
        .iter()
        .enumerate()
        .filter_map(|(index, draft)| validate_toast_type(index + 1, draft, violations))
        .collect()
}

fn validate_unknown_action(
    label: &Option<String>,
    violations: &mut Violations,
) -> Option<UnknownMessageAction> {
    let label = present(label)?;
    let action = UnknownMessageAction::from_label(label);
    if action.is_none() {
        violations.push(format!("Unknown message action \"{}\" is not recognized.", label));
    }
    action
}

fn bounded(
    value: Option<&LooseNumber>,
    range: std::ops::RangeInclusive<i64>,
    default: u32,
    message: &str,
    violations: &mut Violations,
) -> u32 {
    match value.filter(|value| !value.is_blank()) {
        None => default,
        Some(value) => match value.as_integer().filter(|number| range.contains(number)) {
            Some(number) => number as u32,
            None => {
                violations.push(message);
                default
            }
        },
    }
}

fn validate_operational(
    draft: &OperationalDraft,
    violations: &mut Violations,
) -> Option<OperationalSettings> {
    let processing_schedule = match present(&draft.processing_schedule) {
        None => {
            violations.push("Processing schedule is required.");
            None
        }
        Some(label) => {
            let schedule = ProcessingSchedule::from_label(label);
            if schedule.is_none() {
                violations.push(format!("Processing schedule \"{}\" is not recognized.", label));
            }
            schedule
        }
    };

    let max_emails_per_run = bounded(
        draft.max_emails_per_run.as_ref(),
        1..=1000,
        DEFAULT_MAX_EMAILS_PER_RUN,
        "Max emails per run must be between 1 and 1000.",
        violations,
    );
    let lookback_days_for_initial_run = bounded(
        draft.lookback_days_for_initial_run.as_ref(),
        0..=365,
        DEFAULT_LOOKBACK_DAYS,
        "Lookback days must be between 0 and 365.",
        violations,
    );

    let notification_email = present(&draft.notification_email).map(str::to_string);
    if matches!(&notification_email, Some(email) if !is_valid_email(email)) {
        violations.push("Notification email must be a valid email address.");
    }

    let mut notification_methods = Vec::new();
    for entry in draft.notification_methods.iter().flatten() {
        let method = entry.as_str().and_then(NotificationMethod::from_label);
        match method {
            Some(method) if !notification_methods.contains(&method) => {
                notification_methods.push(method)
            }
            Some(_) => {}
            None => {
                let label = entry.as_str().map(str::to_string).unwrap_or_else(|| entry.to_string());
                violations.push(format!("Notification method \"{}\" is not recognized.", label))
            }
        }
    }

    Some(OperationalSettings {
        processing_schedule: processing_schedule?,
        max_emails_per_run,
        lookback_days_for_initial_run,
        notification_email,
        notification_methods,
    })
}

/// Check a full onboarding submission, reporting every violation at once.
pub fn validate_submission(draft: &SubmissionDraft) -> Result<OnboardingSubmission, Vec<String>> {
    let mut violations = Violations::default();

    let tenant = validate_tenant(&draft.tenant.clone().unwrap_or_default(), &mut violations);
    let imap = validate_mailbox(&draft.imap.clone().unwrap_or_default(), &mut violations);

    let imap_test_passed = draft.imap_test_passed.unwrap_or(false);
    if !imap_test_passed {
        violations.push("IMAP connection test must be passed before submitting.");
    }
    let imap_consent = draft.imap_consent.unwrap_or(false);
    if !imap_consent {
        violations.push("IMAP access consent is required.");
    }

    let toast_types = validate_toast_types(draft.toast_types.as_ref(), &mut violations);
    let unknown_message_action =
        validate_unknown_action(&draft.unknown_message_action, &mut violations);
    let operational = validate_operational(
        &draft.operational.clone().unwrap_or_default(),
        &mut violations,
    );

    let pilot_consent = draft.pilot_consent.unwrap_or(false);
    if !pilot_consent {
        violations.push("Pilot system acknowledgement is required.");
    }

    match operational {
        Some(operational) if violations.0.is_empty() => Ok(OnboardingSubmission {
            tenant,
            imap,
            imap_test_passed,
            imap_consent,
            toast_types,
            unknown_message_action,
            operational,
            pilot_consent,
        }),
        _ => Err(violations.0),
    }
}
