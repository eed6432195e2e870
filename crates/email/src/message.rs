use chrono::{DateTime, SecondsFormat};
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};

use crate::error::EmailError;

pub const PDF_MIME: &str = "application/pdf";

/// A leaf MIME part treated as a file.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn is_pdf(&self) -> bool {
        self.content_type == PDF_MIME
    }
}

#[derive(Debug, Clone)]
pub struct ParsedMessage {
    pub subject: String,
    /// RFC 3339 UTC, if the `Date` header was present and readable.
    pub date: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl ParsedMessage {
    pub fn pdf_attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter().filter(|a| a.is_pdf())
    }
}

pub fn parse_message(raw: &[u8]) -> Result<ParsedMessage, EmailError> {
    let mail = mailparse::parse_mail(raw)?;

    let subject = mail.headers.get_first_value("Subject").unwrap_or_default();
    let date = mail
        .headers
        .get_first_value("Date")
        .and_then(|d| mailparse::dateparse(&d).ok())
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true));

    let mut attachments = Vec::new();
    collect_attachments(&mail, &mut attachments)?;

    Ok(ParsedMessage {
        subject,
        date,
        attachments,
    })
}

fn collect_attachments(part: &ParsedMail<'_>, out: &mut Vec<Attachment>) -> Result<(), EmailError> {
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            collect_attachments(sub, out)?;
        }
        return Ok(());
    }

    let disposition = part.get_content_disposition();
    let filename = disposition
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
        .cloned();
    let mimetype = part.ctype.mimetype.to_ascii_lowercase();

    let is_attachment = matches!(disposition.disposition, DispositionType::Attachment)
        || filename.is_some()
        || !(mimetype.starts_with("text/") || mimetype.starts_with("multipart/"));
    if !is_attachment {
        return Ok(());
    }

    let filename = filename.unwrap_or_else(|| format!("attachment-{}", out.len() + 1));
    out.push(Attachment {
        filename,
        content: part.get_body_raw()?,
        content_type: mimetype,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(parts: &[&str]) -> Vec<u8> {
        let mut raw = String::from(
            "From: receipts@example.com\r\n\
             To: me@example.com\r\n\
             Subject: Here is the Receipt\r\n\
             Date: Mon, 15 Jan 2024 10:00:00 +0000\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/mixed; boundary=\"BOUNDARY\"\r\n\r\n",
        );
        for part in parts {
            raw.push_str("--BOUNDARY\r\n");
            raw.push_str(part);
            raw.push_str("\r\n");
        }
        raw.push_str("--BOUNDARY--\r\n");
        raw.into_bytes()
    }

    const BODY: &str = "Content-Type: text/plain\r\n\r\nSee attached.";
    const PDF: &str = "Content-Type: application/pdf; name=\"receipt.pdf\"\r\n\
                       Content-Disposition: attachment; filename=\"receipt.pdf\"\r\n\
                       Content-Transfer-Encoding: 7bit\r\n\r\n\
                       WAL*MART\r\nTOTAL 15.98";
    const IMAGE: &str = "Content-Type: image/png\r\n\
                         Content-Disposition: attachment; filename=\"logo.png\"\r\n\r\n\
                         PNGDATA";

    #[test]
    fn headers_are_read() {
        let parsed = parse_message(&message(&[BODY])).unwrap();
        assert_eq!(parsed.subject, "Here is the Receipt");
        assert_eq!(parsed.date.as_deref(), Some("2024-01-15T10:00:00.000Z"));
        assert!(parsed.attachments.is_empty());
    }

    #[test]
    fn date_is_normalized_to_utc() {
        let raw = b"Subject: x\r\nDate: Mon, 15 Jan 2024 05:00:00 -0500\r\n\r\nbody";
        let parsed = parse_message(raw).unwrap();
        assert_eq!(parsed.date.as_deref(), Some("2024-01-15T10:00:00.000Z"));
    }

    #[test]
    fn missing_headers_are_empty() {
        let parsed = parse_message(b"\r\nplain body").unwrap();
        assert_eq!(parsed.subject, "");
        assert_eq!(parsed.date, None);
    }

    #[test]
    fn only_pdf_attachments_are_receipt_candidates() {
        let parsed = parse_message(&message(&[BODY, PDF, IMAGE])).unwrap();
        assert_eq!(parsed.attachments.len(), 2);

        let pdfs: Vec<&Attachment> = parsed.pdf_attachments().collect();
        assert_eq!(pdfs.len(), 1);
        assert_eq!(pdfs[0].filename, "receipt.pdf");
        let text = String::from_utf8_lossy(&pdfs[0].content);
        assert!(text.contains("WAL*MART"));
        assert!(text.contains("TOTAL 15.98"));
    }

    #[test]
    fn pdf_type_match_is_exact() {
        let odd = "Content-Type: application/x-pdf\r\n\
                   Content-Disposition: attachment; filename=\"r.pdf\"\r\n\r\nWAL*MART";
        let parsed = parse_message(&message(&[odd])).unwrap();
        assert_eq!(parsed.attachments.len(), 1);
        assert_eq!(parsed.pdf_attachments().count(), 0);
    }

    #[test]
    fn pdf_filter_matches_exact_mime_type() {
        let attachment = |content_type: &str| Attachment {
            filename: "receipt.pdf".to_string(),
            content_type: content_type.to_string(),
            content: Vec::new(),
        };
        assert!(attachment("application/pdf").is_pdf());
        assert!(!attachment("Application/PDF").is_pdf());
        assert!(!attachment("application/octet-stream").is_pdf());
    }
}
