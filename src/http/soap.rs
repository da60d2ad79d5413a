//! Minimal SOAP 1.2 plumbing for the one legacy inventory endpoint class.
//! Just enough envelope construction and fault sniffing; not a SOAP stack.

/// Wrap a plain XML fragment in a SOAP 1.2 envelope.
pub fn build_envelope(body: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope">"#,
            "<soap:Body>{}</soap:Body>",
            "</soap:Envelope>"
        ),
        body
    )
}

/// Fault detection via substring match on `Fault` elements. The legacy
/// endpoint emits both `<soap:Fault>` and bare `<Fault>` shapes.
pub fn is_soap_fault(response: &str) -> bool {
    response.contains(":Fault>") || response.contains("<Fault>")
}

/// Pull the text content of every occurrence of `<tag>...</tag>` out of a
/// response document, ignoring namespaces on the closing side. Good enough
/// for the flat quantity/warehouse elements the legacy service returns.
pub fn extract_tag_values(xml: &str, tag: &str) -> Vec<String> {
    let open_a = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let mut out = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find(&open_a) {
        let after = &rest[start + open_a.len()..];
        let Some(end) = after.find(&close) else {
            break;
        };
        let value = after[..end].trim();
        if !value.is_empty() {
            out.push(value.to_string());
        }
        rest = &after[end + close.len()..];
    }
    out
}
