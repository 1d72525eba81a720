//! Parsers for CAS validation and proxy responses.
//!
//! Structured documents are read into a small element tree first; element
//! and attribute names are matched on their local part, so the `cas:`
//! prefix (or any other) is irrelevant.

use cas_authn_sdk::{Attributes, ValidationResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::Value;

use super::error::DomainError;

/// CAS 1.0: `yes\n<user>\n` or `no\n\n`.
///
/// The principal is the second line verbatim, minus its line terminator.
///
/// # Errors
///
/// `Rejected` on `no`, `Malformed` on anything else that is not a success.
pub fn parse_legacy(body: &str) -> Result<ValidationResult, DomainError> {
    let mut lines = body.lines();

    match lines.next().map(str::trim) {
        Some("yes") => {
            let principal = lines
                .next()
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| DomainError::malformed("CAS 1.0 success without a principal"))?;
            Ok(ValidationResult::new(principal))
        }
        Some("no") => Err(DomainError::rejected(
            "INVALID_TICKET",
            "ticket rejected by CAS 1.0 validation",
        )),
        _ => Err(DomainError::malformed(format!(
            "not a CAS 1.0 response: {}",
            excerpt(body)
        ))),
    }
}

/// CAS 2.0 / 3.0 XML `serviceResponse`.
///
/// # Errors
///
/// `Rejected` with the server code on `authenticationFailure`,
/// `Malformed` when the document is not a service response.
pub fn parse_xml(body: &str) -> Result<ValidationResult, DomainError> {
    let root = XmlElement::parse(body)?;
    let (outcome, element) = service_response_outcome(&root)?;

    match outcome {
        "authenticationSuccess" => {
            let principal = element
                .child("user")
                .map(XmlElement::text)
                .filter(|u| !u.is_empty())
                .ok_or_else(|| DomainError::malformed("authenticationSuccess without a user"))?;

            let mut result = ValidationResult::new(principal);
            if let Some(attrs) = element.child("attributes") {
                // values are kept exactly as released, whitespace included
                for attr in &attrs.children {
                    result.attributes.push(attr.name.clone(), attr.text.as_str());
                }
            }
            result.pgt_iou = element
                .child("proxyGrantingTicket")
                .map(XmlElement::text)
                .filter(|iou| !iou.is_empty())
                .map(str::to_owned);
            if let Some(proxies) = element.child("proxies") {
                result.proxies = proxies
                    .children_named("proxy")
                    .map(|p| p.text().to_owned())
                    .collect();
            }
            Ok(result)
        }
        "authenticationFailure" => Err(failure(element)?),
        other => Err(DomainError::malformed(format!(
            "unexpected serviceResponse element '{other}'"
        ))),
    }
}

/// CAS 3.0 JSON `serviceResponse` (`format=JSON`).
///
/// # Errors
///
/// Same as [`parse_xml`].
pub fn parse_json(body: &str) -> Result<ValidationResult, DomainError> {
    let doc: Value = serde_json::from_str(body)?;
    let response = doc
        .get("serviceResponse")
        .and_then(Value::as_object)
        .ok_or_else(|| DomainError::malformed("missing serviceResponse object"))?;

    if let Some(success) = response.get("authenticationSuccess") {
        let principal = success
            .get("user")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| DomainError::malformed("authenticationSuccess without a user"))?;

        let mut result = ValidationResult::new(principal);
        if let Some(attrs) = success.get("attributes").and_then(Value::as_object) {
            for (name, value) in attrs {
                push_json_values(&mut result.attributes, name, value);
            }
        }
        result.pgt_iou = success
            .get("proxyGrantingTicket")
            .and_then(Value::as_str)
            .filter(|iou| !iou.is_empty())
            .map(str::to_owned);
        if let Some(proxies) = success.get("proxies").and_then(Value::as_array) {
            result.proxies = proxies
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect();
        }
        return Ok(result);
    }

    if let Some(fail) = response.get("authenticationFailure") {
        let code = fail
            .get("code")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| DomainError::malformed("authenticationFailure without a code"))?;
        let description = fail
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim();
        return Err(DomainError::rejected(code, description));
    }

    Err(DomainError::malformed(
        "serviceResponse carries neither success nor failure",
    ))
}

/// Response of the `/proxy` endpoint: the issued proxy ticket.
///
/// # Errors
///
/// `Rejected` on `proxyFailure`, `Malformed` otherwise.
pub fn parse_proxy_xml(body: &str) -> Result<String, DomainError> {
    let root = XmlElement::parse(body)?;
    let (outcome, element) = service_response_outcome(&root)?;

    match outcome {
        "proxySuccess" => element
            .child("proxyTicket")
            .map(XmlElement::text)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| DomainError::malformed("proxySuccess without a proxyTicket")),
        "proxyFailure" => Err(failure(element)?),
        other => Err(DomainError::malformed(format!(
            "unexpected serviceResponse element '{other}'"
        ))),
    }
}

fn service_response_outcome(root: &XmlElement) -> Result<(&str, &XmlElement), DomainError> {
    if root.name != "serviceResponse" {
        return Err(DomainError::malformed(format!(
            "expected serviceResponse, found '{}'",
            root.name
        )));
    }
    let element = root
        .children
        .first()
        .ok_or_else(|| DomainError::malformed("empty serviceResponse"))?;
    Ok((element.name.as_str(), element))
}

/// Turn a `*Failure` element into the `Rejected` error it describes.
fn failure(element: &XmlElement) -> Result<DomainError, DomainError> {
    let code = element
        .attribute("code")
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| DomainError::malformed(format!("{} without a code", element.name)))?;
    Ok(DomainError::rejected(code, element.text()))
}

fn push_json_values(attrs: &mut Attributes, name: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                push_json_values(attrs, name, item);
            }
        }
        Value::String(s) => attrs.push(name, s.as_str()),
        Value::Null => {}
        other => attrs.push(name, other.to_string()),
    }
}

fn excerpt(body: &str) -> String {
    const MAX: usize = 64;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_owned(),
    }
}

#[derive(Debug, Default)]
struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn parse(body: &str) -> Result<Self, DomainError> {
        let malformed =
            |e: &dyn std::fmt::Display| DomainError::malformed(format!("invalid XML: {e}"));

        let mut reader = Reader::from_str(body);
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event().map_err(|e| malformed(&e))? {
                Event::Start(start) => stack.push(Self::open(&start)?),
                Event::Empty(start) => {
                    let element = Self::open(&start)?;
                    Self::close(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| DomainError::malformed("unbalanced closing tag"))?;
                    Self::close(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| malformed(&e))?;
                    match stack.last_mut() {
                        Some(top) => top.text.push_str(&text),
                        None if text.trim().is_empty() => {}
                        None => {
                            return Err(DomainError::malformed(format!(
                                "text outside of any element: {}",
                                excerpt(&text)
                            )));
                        }
                    }
                }
                Event::CData(data) => {
                    let data = String::from_utf8(data.into_inner().into_owned())
                        .map_err(|e| malformed(&e))?;
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&data);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(DomainError::malformed("unexpected end of document"));
        }
        root.ok_or_else(|| DomainError::malformed(format!("no XML document: {}", excerpt(body))))
    }

    fn open(start: &BytesStart<'_>) -> Result<Self, DomainError> {
        let name = local_name(start.local_name().as_ref())?;
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| DomainError::malformed(format!("invalid attribute: {e}")))?;
            let key = local_name(attr.key.local_name().as_ref())?;
            let value = attr
                .unescape_value()
                .map_err(|e| DomainError::malformed(format!("invalid attribute value: {e}")))?;
            attributes.push((key, value.into_owned()));
        }
        Ok(Self {
            name,
            attributes,
            ..Self::default()
        })
    }

    fn close(
        stack: &mut Vec<XmlElement>,
        root: &mut Option<XmlElement>,
        element: XmlElement,
    ) -> Result<(), DomainError> {
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None if root.is_none() => *root = Some(element),
            None => return Err(DomainError::malformed("more than one root element")),
        }
        Ok(())
    }

    fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn text(&self) -> &str {
        self.text.trim()
    }
}

fn local_name(raw: &[u8]) -> Result<String, DomainError> {
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|e| DomainError::malformed(format!("invalid element name: {e}")))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const SUCCESS_XML: &str = r"<cas:serviceResponse xmlns:cas='http://www.yale.edu/tp/cas'>
    <cas:authenticationSuccess>
        <cas:user>alice</cas:user>
        <cas:attributes>
            <cas:email>alice@example.org</cas:email>
            <cas:memberOf>staff</cas:memberOf>
            <cas:memberOf>admins</cas:memberOf>
            <cas:displayName>Alice &amp; Co</cas:displayName>
        </cas:attributes>
    </cas:authenticationSuccess>
</cas:serviceResponse>";

    const PROXY_SUCCESS_XML: &str = r"<cas:serviceResponse xmlns:cas='http://www.yale.edu/tp/cas'>
    <cas:authenticationSuccess>
        <cas:user>bob</cas:user>
        <cas:proxyGrantingTicket>PGTIOU-1</cas:proxyGrantingTicket>
        <cas:proxies>
            <cas:proxy>https://proxy2.example.org/pgtUrl</cas:proxy>
            <cas:proxy>https://proxy1.example.org/pgtUrl</cas:proxy>
        </cas:proxies>
    </cas:authenticationSuccess>
</cas:serviceResponse>";

    const FAILURE_XML: &str = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
    <cas:authenticationFailure code="INVALID_TICKET">
        Ticket ST-1856339-aA5Yuvrxzpv8Tau1cYQ7 not recognized
    </cas:authenticationFailure>
</cas:serviceResponse>"#;

    #[test]
    fn legacy_success_principal_is_second_line() {
        for (body, expected) in [
            ("yes\nalice\n", "alice"),
            ("yes\r\nbob\r\n", "bob"),
            ("yes\nuser@example.org", "user@example.org"),
            ("yes\n alice \n", " alice "),
            ("  yes \r\n\tbob\r\n", "\tbob"),
        ] {
            let result = parse_legacy(body).unwrap();
            assert_eq!(result.principal, expected);
            assert!(result.attributes.is_empty());
            assert!(result.pgt_iou.is_none());
        }
    }

    #[test]
    fn legacy_failure_is_rejection() {
        let err = parse_legacy("no\n\n").unwrap_err();
        assert!(matches!(err, DomainError::Rejected { code, .. } if code == "INVALID_TICKET"));
    }

    #[test]
    fn legacy_garbage_is_malformed() {
        for body in ["", "maybe\nalice\n", "yes\n\n", "yes\n   \n", SUCCESS_XML] {
            assert!(
                matches!(parse_legacy(body), Err(DomainError::Malformed(_))),
                "{body:?}"
            );
        }
    }

    #[test]
    fn xml_success_with_attributes() {
        let result = parse_xml(SUCCESS_XML).unwrap();
        assert_eq!(result.principal, "alice");
        assert_eq!(result.attributes.len(), 3);
        assert_eq!(result.attributes.first("email"), Some("alice@example.org"));
        assert_eq!(
            result.attributes.get("memberOf"),
            Some(&["staff".to_owned(), "admins".to_owned()][..])
        );
        assert_eq!(result.attributes.first("displayName"), Some("Alice & Co"));
        assert!(result.pgt_iou.is_none());
        assert!(result.proxies.is_empty());
    }

    #[test]
    fn xml_attribute_values_are_not_trimmed() {
        let body = "<cas:serviceResponse xmlns:cas='http://www.yale.edu/tp/cas'>\
            <cas:authenticationSuccess><cas:user> dave </cas:user>\
            <cas:attributes><cas:note>  padded  </cas:note><cas:empty></cas:empty></cas:attributes>\
            </cas:authenticationSuccess></cas:serviceResponse>";
        let result = parse_xml(body).unwrap();

        assert_eq!(result.principal, "dave");
        assert_eq!(result.attributes.first("note"), Some("  padded  "));
        assert_eq!(result.attributes.first("empty"), Some(""));
    }

    #[test]
    fn xml_success_without_prefix() {
        let body = "<serviceResponse><authenticationSuccess><user>carol</user>\
                    </authenticationSuccess></serviceResponse>";
        assert_eq!(parse_xml(body).unwrap().principal, "carol");
    }

    #[test]
    fn xml_proxy_success_carries_iou_and_chain() {
        let result = parse_xml(PROXY_SUCCESS_XML).unwrap();
        assert_eq!(result.principal, "bob");
        assert_eq!(result.pgt_iou.as_deref(), Some("PGTIOU-1"));
        assert_eq!(
            result.proxies,
            vec![
                "https://proxy2.example.org/pgtUrl".to_owned(),
                "https://proxy1.example.org/pgtUrl".to_owned()
            ]
        );
    }

    #[test]
    fn xml_failure_carries_code_and_description() {
        let err = parse_xml(FAILURE_XML).unwrap_err();
        match err {
            DomainError::Rejected { code, description } => {
                assert_eq!(code, "INVALID_TICKET");
                assert_eq!(
                    description,
                    "Ticket ST-1856339-aA5Yuvrxzpv8Tau1cYQ7 not recognized"
                );
            }
            other => panic!("Expected Rejected, got: {other:?}"),
        }
    }

    #[test]
    fn xml_dialect_rejects_legacy_body() {
        for body in ["yes\nalice\n", "no\n\n"] {
            assert!(
                matches!(parse_xml(body), Err(DomainError::Malformed(_))),
                "{body:?}"
            );
        }
    }

    #[test]
    fn xml_structural_problems_are_malformed() {
        for body in [
            "",
            "<html><body>CAS is down</body></html>",
            "<cas:serviceResponse xmlns:cas='x'></cas:serviceResponse>",
            "<cas:serviceResponse xmlns:cas='x'><cas:authenticationSuccess>\
             </cas:authenticationSuccess></cas:serviceResponse>",
            "<cas:serviceResponse xmlns:cas='x'><cas:authenticationFailure>\
             no code</cas:authenticationFailure></cas:serviceResponse>",
            "<cas:serviceResponse xmlns:cas='x'><cas:authenticationSuccess>",
        ] {
            assert!(
                matches!(parse_xml(body), Err(DomainError::Malformed(_))),
                "{body:?}"
            );
        }
    }

    #[test]
    fn json_success_with_attributes() {
        let body = r#"{"serviceResponse":{"authenticationSuccess":{
            "user":"alice",
            "proxyGrantingTicket":"PGTIOU-9",
            "proxies":["https://proxy1.example.org/pgtUrl"],
            "attributes":{
                "email":["alice@example.org"],"uid":"alice","age":[42],"active":true,"empty":null
            }
        }}}"#;
        let result = parse_json(body).unwrap();
        assert_eq!(result.principal, "alice");
        assert_eq!(result.pgt_iou.as_deref(), Some("PGTIOU-9"));
        assert_eq!(result.proxies.len(), 1);
        assert_eq!(result.attributes.first("email"), Some("alice@example.org"));
        assert_eq!(result.attributes.first("uid"), Some("alice"));
        assert_eq!(result.attributes.first("age"), Some("42"));
        assert_eq!(result.attributes.first("active"), Some("true"));
        assert!(!result.attributes.contains("empty"));
    }

    #[test]
    fn json_failure_is_rejection() {
        let body = r#"{"serviceResponse":{"authenticationFailure":{
            "code":"INVALID_TICKET","description":"Ticket ST-1 not recognized"}}}"#;
        let err = parse_json(body).unwrap_err();
        assert!(matches!(err, DomainError::Rejected { code, .. } if code == "INVALID_TICKET"));
    }

    #[test]
    fn json_dialect_rejects_other_bodies() {
        for body in ["yes\nalice\n", SUCCESS_XML, "{}", r#"{"serviceResponse":{}}"#] {
            assert!(
                matches!(parse_json(body), Err(DomainError::Malformed(_))),
                "{body:?}"
            );
        }
    }

    #[test]
    fn proxy_response_success_and_failure() {
        let ok = "<cas:serviceResponse xmlns:cas='x'><cas:proxySuccess>\
                  <cas:proxyTicket>PT-957-ZuucXqTZ1YcJw81T3dxf</cas:proxyTicket>\
                  </cas:proxySuccess></cas:serviceResponse>";
        assert_eq!(parse_proxy_xml(ok).unwrap(), "PT-957-ZuucXqTZ1YcJw81T3dxf");

        let failed = "<cas:serviceResponse xmlns:cas='x'>\
                      <cas:proxyFailure code=\"INVALID_REQUEST\">'pgt' and 'targetService' \
                      parameters are both required</cas:proxyFailure></cas:serviceResponse>";
        let err = parse_proxy_xml(failed).unwrap_err();
        assert!(matches!(err, DomainError::Rejected { code, .. } if code == "INVALID_REQUEST"));
    }
}
