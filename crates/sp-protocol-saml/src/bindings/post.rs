//! HTTP-POST Binding implementation.
//!
//! Outbound messages are rendered as a fixed, self-submitting HTML form.
//! Every value placed in the page goes through [`quote_attr`].

use base64::Engine;

use crate::error::SamlResult;

/// Escapes a value for use inside a double- or single-quoted attribute.
///
/// `&` is replaced first; line breaks of any style become `\n`.
#[must_use]
pub fn quote_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('\'', "&apos;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Renders an HTML page that posts `fields` to `action` on load.
#[must_use]
pub fn auto_submit_form(action: &str, fields: &[(String, String)]) -> String {
    let inputs = fields
        .iter()
        .map(|(name, value)| {
            format!(
                r#"<input type="hidden" name="{}" value="{}" />"#,
                quote_attr(name),
                quote_attr(value)
            )
        })
        .collect::<Vec<_>>()
        .join("\r\n");
    let form = format!(r#"<form method="post" action="{}">"#, quote_attr(action));

    [
        "<!DOCTYPE html>",
        "<html>",
        "<head>",
        r#"<meta charset="utf-8">"#,
        r#"<meta http-equiv="x-ua-compatible" content="ie=edge">"#,
        "</head>",
        r#"<body onload="document.forms[0].submit()">"#,
        "<noscript>",
        "<p><strong>Note:</strong> Since your browser does not support JavaScript, you must press the button below once to proceed.</p>",
        "</noscript>",
        form.as_str(),
        inputs.as_str(),
        r#"<input type="submit" value="Submit" />"#,
        "</form>",
        r#"<script>document.forms[0].style.display="none";</script>"#,
        "</body>",
        "</html>",
    ]
    .join("\r\n")
}

/// Decodes a POSTed `SAMLResponse` or `SAMLRequest` value.
pub fn decode_post(encoded: &str) -> SamlResult<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
    Ok(String::from_utf8(bytes)?)
}
