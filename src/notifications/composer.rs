use super::EmailMessage;
use crate::traffic::Deviation;
use crate::traffic::models::DEFAULT_HEADER;

/// Link appended to every SMS.
pub const SMS_LINK: &str = "https://www.trafikverket.se/trafikinformation/";
/// Link in the email plaintext fallback.
pub const EMAIL_LINK: &str = "https://trafikinfo.trafikverket.se";
/// Deep link to one deviation on Trafikverket's site.
const DEVIATION_SEARCH_URL: &str = "https://www.trafikverket.se/trafikinformation/sok/?sok=";

/// Substituted details line when the deviation has no message text.
const SMS_FALLBACK_DETAILS: &str = "Se mer information på Trafikverkets hemsida.";
const EMAIL_FALLBACK_BODY: &str = "Se mer info nedan.";

const SMS_BUDGET: usize = 160;
const SMS_HEADER_MAX: usize = 60;
/// Reserved on top of the link for the header line and newlines.
const SMS_LINK_SLACK: usize = 20;

/// Renders the three-line SMS body for a deviation.
///
/// The details line keeps the first two sentences of the message; if header,
/// details and link would overflow the 160-character SMS budget, the details
/// are cut to `160 - len(link) - 20` characters and end in an ellipsis.
/// All counts are characters, not bytes: the texts are Swedish.
pub fn compose_sms(deviation: &Deviation) -> String {
    let header = effective_header(deviation);
    let header = truncate_chars(&header, SMS_HEADER_MAX);

    let short_details = if deviation.message.is_empty() {
        SMS_FALLBACK_DETAILS.to_string()
    } else {
        let sentences: Vec<&str> = deviation.message.split(". ").collect();
        let joined = sentences
            .iter()
            .take(2)
            .copied()
            .collect::<Vec<_>>()
            .join(". ");
        let joined = joined.trim().to_string();

        let max_text_length = SMS_BUDGET - SMS_LINK.chars().count() - SMS_LINK_SLACK;
        if joined.chars().count() > max_text_length {
            let cut = truncate_chars(&joined, max_text_length);
            format!("{}…", cut.trim_end())
        } else {
            joined
        }
    };

    format!("🚧 {header}\n{short_details}\nLäs mer: {SMS_LINK}")
}

/// Renders subject, plaintext fallback and HTML body for a deviation email.
pub fn compose_email(deviation: &Deviation, region_name: &str) -> EmailMessage {
    let header = effective_header(deviation);
    let body = if deviation.message.is_empty() {
        EMAIL_FALLBACK_BODY
    } else {
        deviation.message.as_str()
    };

    let subject = format!("Ny trafikstörning i {region_name}");

    let text = format!("{header}\n\n{body}\n\nLäs mer: {EMAIL_LINK}");

    let html = format!(
        r#"<html>
<body style="font-family:Segoe UI,sans-serif; background:#f7f9fc; padding:1em; color:#333;">
<h2 style="color:#d7263d;">Ny trafikstörning i {region}</h2>
<p><strong>{header}</strong></p>
<p>{body}</p>
<p><a href="{search_url}{dev_id}" target="_blank"
    style="display:inline-block;padding:0.6em 1.2em;background-color:#0d3b66;color:white;text-decoration:none;border-radius:6px;">
    Visa mer information
</a></p>
<p style="font-size:0.9em;color:#666;">Du får detta mail eftersom du prenumererar på trafikstörningar i {region}.</p>
</body>
</html>"#,
        region = html_escape(region_name),
        header = html_escape(&header),
        body = html_escape(body),
        search_url = DEVIATION_SEARCH_URL,
        dev_id = html_escape(&deviation.id),
    );

    EmailMessage { subject, text, html }
}

/// Trimmed header with the documented default when empty. The adapter already
/// substitutes the default for missing upstream fields; this also covers
/// deviations constructed with a blank header.
fn effective_header(deviation: &Deviation) -> String {
    let trimmed = deviation.header.trim();
    if trimmed.is_empty() {
        DEFAULT_HEADER.to_string()
    } else {
        trimmed.to_string()
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn html_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
