//! Drafts: what to send and to whom

use std::{fmt, fs, path::Path, path::PathBuf, str::FromStr};

use thiserror::Error;

use crate::domain::mail::{
    fill_placeholders, read_mistagged_utf8, AttachmentError, TemplateError, ValidationError,
};

/// Which recipient list an address goes on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecipientKind {
    /// Primary recipients
    To,

    /// Carbon copy
    Cc,

    /// Blind carbon copy
    Bcc,
}

/// An unknown recipient kind
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown recipient kind \"{0}\", expected to, cc or bcc")]
pub struct UnknownRecipientKind(String);

impl FromStr for RecipientKind {
    type Err = UnknownRecipientKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "to" => Ok(Self::To),
            "cc" => Ok(Self::Cc),
            "bcc" => Ok(Self::Bcc),
            _ => Err(UnknownRecipientKind(s.to_string())),
        }
    }
}

impl fmt::Display for RecipientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::To => "to",
            Self::Cc => "cc",
            Self::Bcc => "bcc",
        };

        write!(f, "{kind}")
    }
}

/// A file read into memory, ready to be attached
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LoadedAttachment {
    pub(crate) filename: String,
    pub(crate) content: Vec<u8>,
}

/// An immutable description of an email, produced by [`DraftBuilder`].
///
/// Sending a draft does not consume or reset it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Draft {
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    subject: String,
    body: String,
    attachments: Vec<PathBuf>,
}

impl Draft {
    /// Start a new draft
    pub fn builder() -> DraftBuilder {
        DraftBuilder::default()
    }

    /// Primary recipients
    pub fn to(&self) -> &[String] {
        &self.to
    }

    /// Carbon copy recipients
    pub fn cc(&self) -> &[String] {
        &self.cc
    }

    /// Blind carbon copy recipients
    pub fn bcc(&self) -> &[String] {
        &self.bcc
    }

    /// All recipients, to then cc then bcc, duplicates kept
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(String::as_str)
    }

    /// The subject line
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The HTML body
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Paths of the files to attach
    pub fn attachments(&self) -> &[PathBuf] {
        &self.attachments
    }

    /// Checks the draft has everything a send needs
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.subject.is_empty() {
            return Err(ValidationError::MissingSubject);
        }

        if self.body.is_empty() {
            return Err(ValidationError::MissingBody);
        }

        Ok(())
    }

    /// Reads every attachment into memory, failing on the first unreadable one
    pub(crate) fn load_attachments(&self) -> Result<Vec<LoadedAttachment>, AttachmentError> {
        self.attachments
            .iter()
            .map(|path| {
                let content = fs::read(path).map_err(|source| AttachmentError {
                    path: path.clone(),
                    source,
                })?;

                Ok(LoadedAttachment {
                    filename: attachment_filename(path),
                    content,
                })
            })
            .collect()
    }
}

/// The name an attachment is declared with: the final path segment
fn attachment_filename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Accumulates recipients, content and attachments for a [`Draft`]
#[derive(Clone, Debug, Default)]
pub struct DraftBuilder {
    draft: Draft,
}

impl DraftBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an address to the list for `kind`.
    ///
    /// Addresses are not checked or deduplicated; the transport reports bad
    /// ones when sending.
    pub fn add_recipient(&mut self, address: impl Into<String>, kind: RecipientKind) -> &mut Self {
        let list = match kind {
            RecipientKind::To => &mut self.draft.to,
            RecipientKind::Cc => &mut self.draft.cc,
            RecipientKind::Bcc => &mut self.draft.bcc,
        };

        list.push(address.into());
        self
    }

    /// Append several addresses in order
    pub fn add_recipients<I, S>(&mut self, addresses: I, kind: RecipientKind) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for address in addresses {
            self.add_recipient(address, kind);
        }

        self
    }

    /// Set the subject, replacing any previous one
    pub fn set_subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.draft.subject = subject.into();
        self
    }

    /// Set the HTML body, replacing any previous one
    pub fn set_body(&mut self, html: impl Into<String>) -> &mut Self {
        self.draft.body = html.into();
        self
    }

    /// Load the body from a template file and fill its placeholders.
    ///
    /// The file goes through [`read_mistagged_utf8`].
    pub fn load_body_from_template<I, K, V>(
        &mut self,
        path: impl AsRef<Path>,
        placeholders: I,
    ) -> Result<&mut Self, TemplateError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let template = read_mistagged_utf8(path.as_ref())?;
        self.draft.body = fill_placeholders(&template, placeholders);

        Ok(self)
    }

    /// Fill placeholders in the body that is already set
    pub fn replace_placeholders<I, K, V>(&mut self, placeholders: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.draft.body = fill_placeholders(&self.draft.body, placeholders);
        self
    }

    /// Register a file to attach. It is read when the draft is sent.
    pub fn add_attachment(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.draft.attachments.push(path.into());
        self
    }

    /// Register several files to attach
    pub fn add_attachments<I, P>(&mut self, paths: I) -> &mut Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for path in paths {
            self.add_attachment(path);
        }

        self
    }

    /// Snapshot the builder into an immutable draft
    pub fn build(&self) -> Draft {
        self.draft.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io::Write};

    use tempfile::{tempdir, NamedTempFile};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn test_add_recipient_routes_by_kind() {
        let draft = Draft::builder()
            .add_recipient("a@example.com", RecipientKind::To)
            .add_recipient("b@example.com", RecipientKind::Cc)
            .add_recipient("c@example.com", RecipientKind::Bcc)
            .build();

        assert_eq!(draft.to(), ["a@example.com"]);
        assert_eq!(draft.cc(), ["b@example.com"]);
        assert_eq!(draft.bcc(), ["c@example.com"]);
    }

    #[test]
    fn test_recipients_are_flattened_in_order_with_duplicates() {
        let draft = Draft::builder()
            .add_recipients(["b@example.com", "a@example.com"], RecipientKind::Bcc)
            .add_recipient("a@example.com", RecipientKind::To)
            .add_recipient("a@example.com", RecipientKind::To)
            .build();

        let recipients: Vec<&str> = draft.recipients().collect();

        assert_eq!(
            recipients,
            [
                "a@example.com",
                "a@example.com",
                "b@example.com",
                "a@example.com"
            ]
        );
    }

    #[test]
    fn test_subject_and_body_overwrite() {
        let draft = Draft::builder()
            .set_subject("first")
            .set_subject("second")
            .set_body("<p>one</p>")
            .set_body("<p>two</p>")
            .build();

        assert_eq!(draft.subject(), "second");
        assert_eq!(draft.body(), "<p>two</p>");
    }

    #[test]
    fn test_built_draft_is_unaffected_by_later_changes() {
        let mut builder = Draft::builder();
        builder.set_subject("before");

        let draft = builder.build();
        builder.set_subject("after");

        assert_eq!(draft.subject(), "before");
    }

    #[test]
    fn test_validate_requires_subject() {
        let draft = Draft::builder().set_body("<p>hi</p>").build();

        assert_eq!(draft.validate(), Err(ValidationError::MissingSubject));
    }

    #[test]
    fn test_validate_requires_body() {
        let draft = Draft::builder().set_subject("hi").build();

        assert_eq!(draft.validate(), Err(ValidationError::MissingBody));
    }

    #[test]
    fn test_load_body_from_template() -> TestResult {
        let mut file = NamedTempFile::new()?;
        write!(file, "Hi {{{{name}}}}")?;

        let placeholders = HashMap::from([("{{name}}", "Ann")]);

        let draft = Draft::builder()
            .load_body_from_template(file.path(), &placeholders)?
            .build();

        assert_eq!(draft.body(), "Hi Ann");

        Ok(())
    }

    #[test]
    fn test_load_body_from_missing_template_keeps_previous_body() {
        let mut builder = Draft::builder();
        builder.set_body("<p>previous</p>");

        let result = builder.load_body_from_template("/no/such/template.html", [("a", "b")]);

        assert!(matches!(result, Err(TemplateError::Unreadable { .. })));
        assert_eq!(builder.build().body(), "<p>previous</p>");
    }

    #[test]
    fn test_replace_placeholders_on_existing_body() {
        let draft = Draft::builder()
            .set_body("<h1>{{company}}</h1>")
            .replace_placeholders([("{{company}}", "Sierra Madre")])
            .build();

        assert_eq!(draft.body(), "<h1>Sierra Madre</h1>");
    }

    #[test]
    fn test_attachments_are_not_read_until_loaded() -> TestResult {
        let dir = tempdir()?;
        let path = dir.path().join("later.txt");

        let draft = Draft::builder().add_attachment(&path).build();
        fs::write(&path, b"written after registering")?;

        let loaded = draft.load_attachments()?;

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].filename, "later.txt");
        assert_eq!(loaded[0].content, b"written after registering");

        Ok(())
    }

    #[test]
    fn test_load_attachments_reports_missing_path() {
        let draft = Draft::builder()
            .add_attachments(["/missing/report.pdf"])
            .build();

        let err = draft.load_attachments().unwrap_err();

        assert_eq!(err.path, PathBuf::from("/missing/report.pdf"));
    }

    #[test]
    fn test_recipient_kind_from_str() {
        assert_eq!("BCC".parse::<RecipientKind>(), Ok(RecipientKind::Bcc));
        assert_eq!(" cc ".parse::<RecipientKind>(), Ok(RecipientKind::Cc));
        assert_eq!("to".parse::<RecipientKind>(), Ok(RecipientKind::To));
        assert!("reply-to".parse::<RecipientKind>().is_err());
    }
}
