//! Service binding inspection.
//!
//! The platform hands the bound services to staging as a JSON document in
//! `VCAP_SERVICES`, shaped as `{ "<label>": [ { "tags": [...], "credentials": {...} } ] }`.
//! The document is parsed once into [`ServiceBindingDocument`], which keeps the
//! declaration order of labels, instances and credential keys, so lookups that
//! match more than one binding always resolve to the first one declared.

use serde_json::{Map, Value};
use std::env;
use std::ffi::OsString;

use crate::error::{Error, Result};

/// Environment key the platform uses for service bindings.
pub const VCAP_SERVICES: &str = "VCAP_SERVICES";

/// Lowercased substring a tag must contain for the app to be eligible.
pub const ELIGIBILITY_MARKER: &str = "appinternals";

/// Lowercased substring of the credential key holding the profiler archive URL.
pub const DOWNLOAD_URL_MARKER: &str = "dnprofilerurllinux";

#[derive(Debug, Clone, Default)]
pub struct ServiceBindingDocument {
    services: Vec<ServiceGroup>,
}

/// All instances bound under one service label.
#[derive(Debug, Clone)]
pub struct ServiceGroup {
    pub label: String,
    pub instances: Vec<BindingInstance>,
}

#[derive(Debug, Clone, Default)]
pub struct BindingInstance {
    pub name: Option<String>,
    pub tags: Vec<Value>,
    pub credentials: Map<String, Value>,
}

impl BindingInstance {
    /// True when any string tag contains `marker` after lowercasing.
    /// Non-string tags never match.
    pub fn has_tag_containing(&self, marker: &str) -> bool {
        self.tags.iter().any(|tag| match tag {
            Value::String(tag) => tag.to_lowercase().contains(marker),
            _ => false,
        })
    }
}

impl ServiceBindingDocument {
    pub fn parse(raw: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(raw)
            .map_err(|e| Error::binding_malformed(VCAP_SERVICES, "$", e.to_string()))?;

        let labels = match root {
            Value::Object(labels) => labels,
            other => {
                return Err(Error::binding_malformed(
                    VCAP_SERVICES,
                    "$",
                    format!("expected an object of service labels, found {}", kind(&other)),
                ))
            }
        };

        let mut services = Vec::with_capacity(labels.len());
        for (label, instances) in labels {
            let path = format!("$.{}", label);
            let instances = match instances {
                Value::Array(instances) => instances,
                other => {
                    return Err(Error::binding_malformed(
                        VCAP_SERVICES,
                        path,
                        format!("expected an array of bindings, found {}", kind(&other)),
                    ))
                }
            };

            let instances = instances
                .into_iter()
                .enumerate()
                .map(|(idx, instance)| parse_instance(&format!("{}[{}]", path, idx), instance))
                .collect::<Result<Vec<_>>>()?;

            services.push(ServiceGroup { label, instances });
        }

        Ok(Self { services })
    }

    pub fn services(&self) -> &[ServiceGroup] {
        &self.services
    }

    /// Every instance with its JSON path, in declaration order.
    pub fn instances(&self) -> impl Iterator<Item = (String, &BindingInstance)> {
        self.services.iter().flat_map(|service| {
            service
                .instances
                .iter()
                .enumerate()
                .map(move |(idx, instance)| (format!("$.{}[{}]", service.label, idx), instance))
        })
    }
}

fn parse_instance(path: &str, value: Value) -> Result<BindingInstance> {
    let mut fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(Error::binding_malformed(
                VCAP_SERVICES,
                path,
                format!("expected a binding object, found {}", kind(&other)),
            ))
        }
    };

    let name = match fields.remove("name") {
        Some(Value::String(name)) => Some(name),
        _ => None,
    };

    let tags = match fields.remove("tags") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(tags)) => tags,
        Some(other) => {
            return Err(Error::binding_malformed(
                VCAP_SERVICES,
                format!("{}.tags", path),
                format!("expected an array, found {}", kind(&other)),
            ))
        }
    };

    let credentials = match fields.remove("credentials") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(credentials)) => credentials,
        Some(other) => {
            return Err(Error::binding_malformed(
                VCAP_SERVICES,
                format!("{}.credentials", path),
                format!("expected an object, found {}", kind(&other)),
            ))
        }
    };

    Ok(BindingInstance {
        name,
        tags,
        credentials,
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Answers eligibility and download-location questions about the bound services.
///
/// The raw document is injected rather than read from the process environment,
/// so the inspector is a pure function of its input. It is parsed once, on
/// construction; a malformed document fails every query with the same error.
#[derive(Debug, Clone)]
pub struct BindingInspector {
    document: Result<Option<ServiceBindingDocument>>,
}

impl Default for BindingInspector {
    fn default() -> Self {
        Self::new(None)
    }
}

impl BindingInspector {
    /// `None`, an empty or a whitespace-only value all mean "no bindings".
    pub fn new(raw: Option<String>) -> Self {
        let document = match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => ServiceBindingDocument::parse(raw).map(Some),
        };

        Self { document }
    }

    /// Bytes that are not valid UTF-8 are replaced with U+FFFD rather than
    /// treating the whole value as absent.
    pub fn from_os(raw: Option<OsString>) -> Self {
        Self::new(raw.map(|value| value.to_string_lossy().into_owned()))
    }

    pub fn from_env() -> Self {
        Self::from_os(env::var_os(VCAP_SERVICES))
    }

    fn document(&self) -> Result<Option<&ServiceBindingDocument>> {
        self.document.as_ref().map(Option::as_ref).map_err(|e| e.clone())
    }

    pub fn is_supported(&self) -> Result<bool> {
        let Some(document) = self.document()? else {
            return Ok(false);
        };

        let supported = document
            .instances()
            .any(|(_, instance)| instance.has_tag_containing(ELIGIBILITY_MARKER));
        Ok(supported)
    }

    /// First credential value whose key contains the download URL marker.
    ///
    /// An empty string value is treated the same as a missing key.
    pub fn download_url(&self) -> Result<Option<String>> {
        let Some(document) = self.document()? else {
            return Ok(None);
        };

        let found = document.instances().find_map(|(path, instance)| {
            instance
                .credentials
                .iter()
                .find(|(key, _)| key.to_lowercase().contains(DOWNLOAD_URL_MARKER))
                .map(|(key, value)| (format!("{}.credentials.{}", path, key), value))
        });

        match found {
            None => Ok(None),
            Some((_, Value::String(url))) if url.is_empty() => Ok(None),
            Some((_, Value::String(url))) => Ok(Some(url.clone())),
            Some((path, other)) => Err(Error::binding_type_mismatch(path, "string", kind(other))),
        }
    }

    /// Names (or labels, when unnamed) of the eligible bindings.
    pub fn bound_services(&self) -> Result<Vec<String>> {
        let Some(document) = self.document()? else {
            return Ok(Vec::new());
        };

        let mut names = Vec::new();
        for service in document.services() {
            for instance in &service.instances {
                if instance.has_tag_containing(ELIGIBILITY_MARKER) {
                    names.push(instance.name.clone().unwrap_or_else(|| service.label.clone()));
                }
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    const BOUND: &str = r#"{
      "appinternals": [
        {
          "name": "fan_test",
          "instance_name": "fan_test",
          "binding_name": null,
          "credentials": {
            "SB_version": "10.17.1_BL510",
            "DSA_VERSION": "Agent Version: 10.17.1.510 (BL510)",
            "DNprofilerUrlLinux": "some_random_url"
          },
          "syslog_drain_url": null,
          "volume_mounts": [],
          "label": "appinternals",
          "provider": null,
          "plan": "Riverbed License (Trial or Subscription)",
          "tags": [
            "appinternals"
          ]
        }
      ]
    }"#;

    fn inspector(raw: &str) -> BindingInspector {
        BindingInspector::new(Some(raw.to_string()))
    }

    #[test]
    fn finds_bound_appinternals_service() {
        assert!(inspector(BOUND).is_supported().unwrap());
    }

    #[test]
    fn absent_or_empty_document_is_not_an_error() {
        for raw in [None, Some(String::new()), Some("   ".to_string())] {
            let inspector = BindingInspector::new(raw);
            assert!(!inspector.is_supported().unwrap());
            assert_eq!(inspector.download_url().unwrap(), None);
        }
    }

    #[test]
    fn tag_match_is_case_insensitive_substring_anywhere() {
        let raw = r#"{
          "p-mysql": [{"name": "db", "tags": ["mysql", "relational"], "credentials": {}}],
          "user-provided": [
            {"name": "other", "tags": [], "credentials": {}},
            {"name": "apm", "tags": ["logging", 7, "Riverbed-AppInternals-APM"], "credentials": {}}
          ]
        }"#;

        assert!(inspector(raw).is_supported().unwrap());
        assert_eq!(inspector(raw).bound_services().unwrap(), vec!["apm".to_string()]);
    }

    #[test]
    fn no_matching_tag_is_unsupported() {
        let raw = r#"{
          "appinternals": [{"name": "x", "tags": ["apm"], "credentials": {"appinternals": "yes"}}],
          "elephantsql": [{"tags": null}]
        }"#;

        assert!(!inspector(raw).is_supported().unwrap());
    }

    #[test]
    fn gets_url_from_credentials() {
        assert_eq!(
            inspector(BOUND).download_url().unwrap().as_deref(),
            Some("some_random_url")
        );
    }

    #[test]
    fn missing_url_key_yields_none() {
        let raw = r#"{"appinternals": [{"tags": ["appinternals"], "credentials": {"SB_version": "10.17.1"}}]}"#;

        assert_eq!(inspector(raw).download_url().unwrap(), None);
    }

    #[test]
    fn empty_url_value_yields_none() {
        let raw = r#"{"appinternals": [{"tags": ["appinternals"], "credentials": {"DNprofilerUrlLinux": ""}}]}"#;

        assert_eq!(inspector(raw).download_url().unwrap(), None);
    }

    #[test]
    fn first_declared_url_wins() {
        let raw = r#"{
          "zeta": [{"credentials": {"dnProfilerUrlLinuxMirror": "https://zeta/a.zip"}}],
          "alpha": [
            {"credentials": {"other": 1, "DNPROFILERURLLINUX": "https://alpha/b.zip"}}
          ]
        }"#;

        assert_eq!(
            inspector(raw).download_url().unwrap().as_deref(),
            Some("https://zeta/a.zip")
        );
    }

    #[test]
    fn non_string_url_is_type_mismatch() {
        let raw = r#"{"appinternals": [{"credentials": {"DNprofilerUrlLinux": {"href": "x"}}}]}"#;

        let err = inspector(raw).download_url().unwrap_err();
        assert_eq!(err.code, ErrorCode::BindingTypeMismatch);
        assert_eq!(
            err.details["path"],
            "$.appinternals[0].credentials.DNprofilerUrlLinux"
        );
        assert_eq!(err.details["found"], "object");
    }

    #[test]
    fn malformed_document_fails_both_queries() {
        for raw in ["not json", "[1, 2]", r#"{"appinternals": {"tags": []}}"#] {
            let inspector = inspector(raw);

            let err = inspector.is_supported().unwrap_err();
            assert_eq!(err.code, ErrorCode::BindingMalformedDocument);

            let err = inspector.download_url().unwrap_err();
            assert_eq!(err.code, ErrorCode::BindingMalformedDocument);
        }
    }

    #[test]
    fn wrongly_typed_fields_report_their_path() {
        let raw = r#"{"appinternals": [{"tags": "appinternals"}]}"#;
        let err = inspector(raw).is_supported().unwrap_err();
        assert_eq!(err.details["path"], "$.appinternals[0].tags");

        let raw = r#"{"svc": [{"tags": []}, "oops"]}"#;
        let err = inspector(raw).is_supported().unwrap_err();
        assert_eq!(err.details["path"], "$.svc[1]");

        let raw = r#"{"svc": [{"credentials": ["a"]}]}"#;
        let err = inspector(raw).download_url().unwrap_err();
        assert_eq!(err.details["path"], "$.svc[0].credentials");
    }

    #[test]
    fn document_keeps_declaration_order() {
        let raw = r#"{"b": [{}], "a": [{}, {}]}"#;
        let document = ServiceBindingDocument::parse(raw).unwrap();

        let paths: Vec<String> = document.instances().map(|(path, _)| path).collect();
        assert_eq!(paths, vec!["$.b[0]", "$.a[0]", "$.a[1]"]);
        assert!(ServiceBindingDocument::parse("{}").unwrap().services().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn invalid_utf8_in_environment_value_is_still_inspected() {
        use std::os::unix::ffi::OsStringExt;

        let mut raw = br#"{"appinternals": [{"tags": ["appinternals"#.to_vec();
        raw.push(0xff);
        raw.extend_from_slice(
            br#""], "credentials": {"DNprofilerUrlLinux": "http://broker/a.zip"}}]}"#,
        );
        let inspector = BindingInspector::from_os(Some(OsString::from_vec(raw)));

        assert!(inspector.is_supported().unwrap());
        assert_eq!(inspector.download_url().unwrap().as_deref(), Some("http://broker/a.zip"));
    }

    #[test]
    fn unset_environment_value_means_no_bindings() {
        let inspector = BindingInspector::from_os(None);
        assert!(!inspector.is_supported().unwrap());
        assert!(inspector.bound_services().unwrap().is_empty());
    }
}
