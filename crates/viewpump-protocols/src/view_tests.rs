use super::*;

#[test]
fn test_response_failure_range() {
    assert!(!WebResponse::new("http://a.com/", 200).is_failure());
    assert!(!WebResponse::new("http://a.com/", 304).is_failure());
    assert!(!WebResponse::new("http://a.com/", 399).is_failure());
    assert!(WebResponse::new("http://a.com/", 400).is_failure());
    assert!(WebResponse::new("http://a.com/", 404).is_failure());
    assert!(WebResponse::new("http://a.com/", 199).is_failure());
    assert!(WebResponse::new("http://a.com/", 0).is_failure());
}

#[test]
fn test_response_deserialize() {
    let json = r#"{"uri":"http://a.com/","status":200,"mimeType":"text/html"}"#;
    let response: WebResponse = serde_json::from_str(json).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.mime_type.as_deref(), Some("text/html"));
    assert!(response.headers.is_empty());
}

#[test]
fn test_load_options_serialize() {
    let options = ViewLoadOptions {
        css: Some("body { color: red }".to_string()),
        user_agent: Some("viewpump/1".to_string()),
        width: Some(1024),
        height: None,
    };
    let json = serde_json::to_string(&options).unwrap();
    assert!(json.contains("userAgent"));
    assert!(json.contains("1024"));
    assert!(!json.contains("height"));
}

#[test]
fn test_pdf_options_default() {
    let options = PdfOptions::default();
    assert!(!options.landscape);
    assert!(options.paper.is_none());
}

#[test]
fn test_view_config_roundtrip_keeps_display() {
    let config = ViewConfig {
        webextension: Some(PathBuf::from("/usr/lib/viewpump/ext")),
        event_name: "viewpump1".to_string(),
        display: Some(21),
    };
    let json = serde_json::to_string(&config).unwrap();
    let parsed: ViewConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}
