use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{Local, SecondsFormat, Utc};
use log::info;
use rand::Rng;
use regex::Regex;
use thiserror::Error;

use crate::onboarding::report::{build_structured_record, render_structured_record, render_text_report};
use crate::onboarding::submission::OnboardingSubmission;

const SHORT_ID_LEN: usize = 8;
const SLUG_MAX_LEN: usize = 40;
const FALLBACK_SLUG: &str = "unknown_org";
// URL and filename safe
const SHORT_ID_ALPHABET: &[u8] =
    b"useandom-26T198340PX75pxJACKVERYMINDBUSHWOLF_GQZbfghjklqvwyzrict";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("could not create output directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not serialize structured record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("could not render text report: {0}")]
    Render(#[from] tera::Error),
}

/// Names of the artifact pair written for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRecord {
    pub file_id: String,
    pub text_file: String,
    pub json_file: String,
}

pub fn generate_short_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SHORT_ID_LEN)
        .map(|_| SHORT_ID_ALPHABET[rng.gen_range(0..SHORT_ID_ALPHABET.len())] as char)
        .collect()
}

// Portable file-name cleanup: illegal and control characters, all-dot names,
// Windows device names and a trailing run of dots or spaces each become `_`.
fn sanitize_file_name(name: &str) -> String {
    let mut safe: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '?' | '<' | '>' | ':' | '*' | '|' | '"' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if !safe.is_empty() && safe.chars().all(|c| c == '.') {
        safe = "_".to_string();
    }
    if windows_reserved_regex().is_match(&safe) {
        safe = "_".to_string();
    }
    let kept = safe.trim_end_matches(|c: char| c == '.' || c == ' ').len();
    if kept < safe.len() {
        safe.truncate(kept);
        safe.push('_');
    }
    safe
}

fn windows_reserved_regex() -> &'static Regex {
    static RESERVED: OnceLock<Regex> = OnceLock::new();
    RESERVED.get_or_init(|| {
        Regex::new(r"(?i)^(con|prn|aux|nul|com[0-9]|lpt[0-9])(\..*)?$")
            .expect("reserved-name pattern is valid")
    })
}

/// Reduce an organization name to `[A-Za-z0-9_-]`, at most 40 characters.
pub fn org_slug(name: &str) -> String {
    let safe = sanitize_file_name(name);
    let mut slug = String::with_capacity(safe.len());
    let mut in_whitespace = false;
    for c in safe.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                slug.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            slug.push(c);
        }
    }
    slug.truncate(SLUG_MAX_LEN);

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// `{YYYYMMDD-HHMMSS}_{slug}_{id}` in local time.
pub fn basename(organization_name: &str, file_id: &str) -> String {
    format!(
        "{}_{}_{}",
        Local::now().format("%Y%m%d-%H%M%S"),
        org_slug(organization_name),
        file_id
    )
}

// Create-new only, owner read/write only
fn write_new_file(path: &Path, contents: &str) -> Result<(), PersistError> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let write_error = |source| PersistError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = options.open(path).map_err(write_error)?;
    file.write_all(contents.as_bytes()).map_err(write_error)?;
    file.sync_all().map_err(write_error)
}

/// Write the text report and the structured record for an accepted
/// submission into `output_dir`.
///
/// The two writes are independent: if the second fails the text report
/// stays behind without its JSON counterpart.
pub fn persist(
    submission: &OnboardingSubmission,
    output_dir: &Path,
) -> Result<PersistedRecord, PersistError> {
    fs::create_dir_all(output_dir).map_err(|source| PersistError::CreateDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let file_id = generate_short_id();
    let base = basename(&submission.tenant.organization_name, &file_id);
    let text_file = format!("{}.txt", base);
    let json_file = format!("{}.json", base);

    let generated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let text = render_text_report(submission, &generated_at)?;
    let record = build_structured_record(submission, &generated_at, &file_id);
    let json = render_structured_record(&record)?;

    write_new_file(&output_dir.join(&text_file), &text)?;
    write_new_file(&output_dir.join(&json_file), &json)?;

    info!(
        "Saved onboarding configuration for {} as {} (id {})",
        submission.tenant.organization_name, base, file_id
    );

    Ok(PersistedRecord {
        file_id,
        text_file,
        json_file,
    })
}
