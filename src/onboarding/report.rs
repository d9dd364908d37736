//! Renders the two artifacts written per submission: the fixed-layout text
//! report (read by people and by downstream tooling) and the structured
//! JSON record (read by the processing engine).
//!
//! The text report never contains the mailbox password. The JSON record
//! carries it in clear because the processing engine needs it to log in.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};

use crate::onboarding::submission::*;

pub const SCHEMA_VERSION: &str = "1.0";
const REPORT_TEMPLATE: &str = "onboarding_report.txt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub generated_at: String,
    pub schema_version: String,
    pub file_id: String,
}

/// The JSON artifact: metadata followed by the submission itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredRecord {
    #[serde(rename = "_meta")]
    pub meta: RecordMeta,
    #[serde(flatten)]
    pub submission: OnboardingSubmission,
}

#[derive(Serialize)]
struct TenantView<'a> {
    organization_name: &'a str,
    contact_name: &'a str,
    contact_email: &'a str,
    phone: &'a str,
    timezone: &'a str,
}

#[derive(Serialize)]
struct MailboxView<'a> {
    provider: &'a str,
    host: &'a str,
    port: String,
    tls: &'static str,
    username: &'a str,
    mailbox_folder: &'a str,
    test_passed: &'static str,
    consent: &'static str,
}

#[derive(Serialize)]
struct ToastView<'a> {
    number: String,
    category_name: &'a str,
    description: &'a str,
    action: &'static str,
    urgency_level: String,
    examples: Option<&'a str>,
    allowed_senders: Option<&'a str>,
    blocked_senders: Option<&'a str>,
}

#[derive(Serialize)]
struct OperationalView<'a> {
    processing_schedule: &'static str,
    max_emails_per_run: String,
    lookback_days: String,
    notification_email: &'a str,
    notification_methods: String,
    pilot_consent: &'static str,
}

#[derive(Serialize)]
struct ReportView<'a> {
    banner: String,
    rule: String,
    generated_at: &'a str,
    tenant: TenantView<'a>,
    imap: MailboxView<'a>,
    toast_types: Vec<ToastView<'a>>,
    unknown_message_action: &'static str,
    operational: OperationalView<'a>,
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.is_empty())
}

impl<'a> ReportView<'a> {
    fn new(submission: &'a OnboardingSubmission, generated_at: &'a str) -> Self {
        let tenant = &submission.tenant;
        let imap = &submission.imap;
        let operational = &submission.operational;

        let notification_methods = operational
            .notification_methods
            .iter()
            .map(|method| method.label())
            .join(", ");

        ReportView {
            banner: "=".repeat(60),
            rule: "-".repeat(60),
            generated_at,
            tenant: TenantView {
                organization_name: &tenant.organization_name,
                contact_name: &tenant.primary_contact_name,
                contact_email: &tenant.primary_contact_email,
                phone: non_empty(&tenant.phone_optional).unwrap_or("(not provided)"),
                timezone: &tenant.timezone,
            },
            imap: MailboxView {
                provider: non_empty(&imap.provider).unwrap_or("(not specified)"),
                host: &imap.host,
                port: imap.port.to_string(),
                tls: yes_no(imap.tls),
                username: &imap.username,
                mailbox_folder: &imap.mailbox_folder,
                test_passed: yes_no(submission.imap_test_passed),
                consent: if submission.imap_consent {
                    "Yes — user acknowledged mailbox access"
                } else {
                    "No"
                },
            },
            toast_types: submission
                .toast_types
                .iter()
                .enumerate()
                .map(|(index, toast)| ToastView {
                    number: format!("{:02}", index + 1),
                    category_name: &toast.category_name,
                    description: non_empty(&toast.category_description).unwrap_or("(none)"),
                    action: toast.desired_dom_action.label(),
                    urgency_level: toast.urgency_level.to_string(),
                    examples: non_empty(&toast.examples),
                    allowed_senders: non_empty(&toast.allowed_senders),
                    blocked_senders: non_empty(&toast.blocked_senders),
                })
                .collect(),
            unknown_message_action: submission
                .unknown_message_action
                .map(|action| action.label())
                .unwrap_or("(not set)"),
            operational: OperationalView {
                processing_schedule: operational.processing_schedule.label(),
                max_emails_per_run: operational.max_emails_per_run.to_string(),
                lookback_days: operational.lookback_days_for_initial_run.to_string(),
                notification_email: non_empty(&operational.notification_email)
                    .unwrap_or(tenant.primary_contact_email.as_str()),
                notification_methods: if notification_methods.is_empty() {
                    "(none selected)".to_string()
                } else {
                    notification_methods
                },
                pilot_consent: if submission.pilot_consent {
                    "Yes — user acknowledged pilot status"
                } else {
                    "No"
                },
            },
        }
    }
}

pub fn report_templates() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_template(
        REPORT_TEMPLATE,
        include_str!("../../templates/onboarding_report.txt"),
    )?;
    Ok(tera)
}

/// Render the fixed-layout text report. The password is always masked.
pub fn render_text_report(
    submission: &OnboardingSubmission,
    generated_at: &str,
) -> Result<String, tera::Error> {
    let tera = report_templates()?;
    let view = ReportView::new(submission, generated_at);
    let ctx = Context::from_serialize(&view)?;
    let rendered = tera.render(REPORT_TEMPLATE, &ctx)?;
    Ok(rendered.trim_end_matches('\n').to_string())
}

pub fn build_structured_record(
    submission: &OnboardingSubmission,
    generated_at: &str,
    file_id: &str,
) -> StructuredRecord {
    StructuredRecord {
        meta: RecordMeta {
            generated_at: generated_at.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            file_id: file_id.to_string(),
        },
        submission: submission.clone(),
    }
}

pub fn render_structured_record(record: &StructuredRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(record)
}
