// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `nomad.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::NomadConfig;

    fn client(address: &str, region: Option<&str>) -> NomadClient {
        NomadClient::new(&NomadConfig {
            address: Some(address.to_string()),
            token: None,
            region: region.map(str::to_string),
        })
        .unwrap()
    }

    #[test]
    fn test_list_endpoint_uses_wildcard_namespace() {
        let url = client("http://127.0.0.1:4646", None).endpoint(&["v1", "services"], "*");
        assert_eq!(url.as_str(), "http://127.0.0.1:4646/v1/services?namespace=*");
    }

    #[test]
    fn test_service_endpoint_escapes_name_and_adds_region() {
        let url = client("http://nomad:4646/", Some("eu")).endpoint(
            &["v1", "service", "my svc"],
            "default",
        );
        assert_eq!(
            url.as_str(),
            "http://nomad:4646/v1/service/my%20svc?namespace=default&region=eu"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let url = client("https://proxy.example.com/nomad", None).endpoint(&["v1", "services"], "*");
        assert_eq!(
            url.as_str(),
            "https://proxy.example.com/nomad/v1/services?namespace=*"
        );
    }

    #[test]
    fn test_invalid_address_is_rejected() {
        let result = NomadClient::new(&NomadConfig {
            address: Some("not a url".to_string()),
            token: None,
            region: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_registration_decodes_null_tags() {
        let body = r#"[{"ServiceName":"redis","Namespace":"default","JobID":"cache","Address":"10.0.0.1","Tags":null}]"#;
        let decoded: Vec<ServiceRegistration> = serde_json::from_str(body).unwrap();

        assert_eq!(decoded[0].job_id, "cache");
        assert!(decoded[0].tags.is_none());
    }
}
