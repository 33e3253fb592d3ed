//! Decode command.

use sp_protocol_saml::bindings::decode_lenient;

/// Prints the XML inside an encoded message. Redirect (deflated) and POST
/// (plain base64) encodings are both accepted; URL-encoded input is
/// decoded first.
pub fn run_decode(message: &str) -> crate::CliResult<()> {
    let message = super::read_argument(message)?;
    println!("{}", decode_lenient(&unescape(&message)?)?);
    Ok(())
}

fn unescape(value: &str) -> crate::CliResult<String> {
    if !value.contains('%') {
        return Ok(value.to_string());
    }
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .map_err(|e| crate::CliError::InvalidArgument(format!("message is not URL-encoded: {e}")))
}
