// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `record.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::errors::AnnotationError;
    use crate::service::ServiceDescriptor;
    use std::time::Duration;

    fn service(name: &str, namespace: &str, addresses: &[&str], tags: &[&str]) -> ServiceDescriptor {
        let mut svc = ServiceDescriptor::new(
            name,
            namespace,
            "job",
            tags.iter().map(|t| (*t).to_string()).collect(),
        );
        for address in addresses {
            svc.add_address(*address);
        }
        svc
    }

    #[test]
    fn test_synthesize_redis_scenario() {
        let redis = service(
            "redis",
            "default",
            &["10.0.0.1", "10.0.0.2"],
            &[
                "external-dns/hostname=redis.svc.internal",
                "external-dns/ttl=60s",
            ],
        );

        let set = synthesize(&redis, &["svc.internal".to_string()], "team-x").unwrap();

        assert_eq!(set.zone, "svc.internal.");
        assert_eq!(
            set.records,
            vec![
                Record::new(
                    RecordType::A,
                    "redis",
                    "10.0.0.1,10.0.0.2",
                    Duration::from_secs(60)
                ),
                Record::new(
                    RecordType::TXT,
                    "redis",
                    "service=redis namespace=default owner=team-x created-by=nomad-external-dns",
                    Duration::from_secs(60)
                ),
            ]
        );
    }

    #[test]
    fn test_synthesize_ipv6_first_address_yields_aaaa() {
        let svc = service(
            "api",
            "prod",
            &["fd00::1", "10.0.0.1"],
            &["external-dns/hostname=api.example.com"],
        );

        let set = synthesize(&svc, &["example.com".to_string()], "o").unwrap();

        assert_eq!(set.records[0].record_type, RecordType::AAAA);
        assert_eq!(set.records[0].value, "fd00::1,10.0.0.1");
    }

    #[test]
    fn test_synthesize_is_deterministic() {
        let svc = service(
            "api",
            "prod",
            &["10.0.0.1"],
            &["external-dns/hostname=api.example.com"],
        );
        let domains = vec!["example.com".to_string()];

        assert_eq!(
            synthesize(&svc, &domains, "o").unwrap(),
            synthesize(&svc, &domains, "o").unwrap()
        );
    }

    #[test]
    fn test_synthesize_empty_tags() {
        let svc = service("api", "prod", &["10.0.0.1"], &[]);
        let err = synthesize(&svc, &["example.com".to_string()], "o").unwrap_err();
        assert_eq!(err, AnnotationError::EmptyTags);
    }

    #[test]
    fn test_marker_round_trip() {
        let marker = OwnershipMarker::new("redis", "default", "team-x");
        let decoded = OwnershipMarker::parse(&marker.to_string()).unwrap();

        assert_eq!(decoded, marker);
        assert_eq!(decoded.identity_key(), "default_redis");
    }

    #[test]
    fn test_marker_parse_quoted_and_reordered() {
        let decoded = OwnershipMarker::parse(
            "\"owner=team-x created-by=nomad-external-dns namespace=dev service=web\"",
        )
        .unwrap();

        assert_eq!(decoded.service, "web");
        assert_eq!(decoded.namespace, "dev");
        assert_eq!(decoded.owner, "team-x");
        assert_eq!(decoded.identity_key(), "dev_web");
    }

    #[test]
    fn test_marker_parse_requires_service_and_namespace() {
        assert!(OwnershipMarker::parse("owner=team-x created-by=nomad-external-dns").is_none());
        assert!(OwnershipMarker::parse("service= namespace=dev owner=x").is_none());
        assert!(OwnershipMarker::parse("v=spf1 -all").is_none());
    }

    #[test]
    fn test_is_owned_by_matches_exact_token() {
        let value = "service=redis namespace=default owner=team-x created-by=nomad-external-dns";

        assert!(OwnershipMarker::is_owned_by(value, "team-x"));
        assert!(OwnershipMarker::is_owned_by(&format!("\"{value}\""), "team-x"));
        assert!(!OwnershipMarker::is_owned_by(value, "team"));
        assert!(!OwnershipMarker::is_owned_by(value, "team-xy"));
    }

    #[test]
    fn test_group_marker_ignores_foreign_txt() {
        let group = RecordGroup {
            name: "redis".to_string(),
            zone: "svc.internal.".to_string(),
            records: vec![
                Record::new(RecordType::TXT, "redis", "v=spf1 -all", Duration::from_secs(30)),
                Record::new(
                    RecordType::TXT,
                    "redis",
                    "service=redis namespace=default owner=other created-by=nomad-external-dns",
                    Duration::from_secs(30),
                ),
                Record::new(
                    RecordType::TXT,
                    "redis",
                    "service=redis namespace=default owner=team-x created-by=nomad-external-dns",
                    Duration::from_secs(30),
                ),
            ],
        };

        let marker = group.ownership_marker("team-x").unwrap();
        assert_eq!(marker.owner, "team-x");
    }

    #[test]
    fn test_split_values() {
        let a = Record::new(RecordType::A, "x", "10.0.0.1, 10.0.0.2,", Duration::from_secs(1));
        assert_eq!(a.split_values(), vec!["10.0.0.1", "10.0.0.2"]);

        let txt = Record::new(RecordType::TXT, "x", "a,b", Duration::from_secs(1));
        assert_eq!(txt.split_values(), vec!["a,b"]);
    }

    #[test]
    fn test_record_type_from_str() {
        assert_eq!(RecordType::from("a"), RecordType::A);
        assert_eq!(RecordType::from("AAAA"), RecordType::AAAA);
        assert_eq!(RecordType::from("txt"), RecordType::TXT);
        assert_eq!(RecordType::from("CNAME"), RecordType::Other("CNAME".to_string()));
        assert_eq!(RecordType::AAAA.to_string(), "AAAA");
    }

    #[test]
    fn test_relative_name() {
        assert_eq!(relative_name("redis.svc.internal.", "svc.internal."), "redis");
        assert_eq!(relative_name("redis.svc.internal", "svc.internal."), "redis");
        assert_eq!(relative_name("redis", "svc.internal."), "redis");
        assert_eq!(relative_name("a.b.svc.internal", "svc.internal"), "a.b");
        assert_eq!(relative_name("svc.internal.", "svc.internal."), "@");
        assert_eq!(relative_name("@", "svc.internal."), "@");
        assert_eq!(relative_name("xsvc.internal", "svc.internal."), "xsvc.internal");
    }

    #[test]
    fn test_absolute_name() {
        assert_eq!(absolute_name("redis", "svc.internal."), "redis.svc.internal.");
        assert_eq!(absolute_name("@", "svc.internal."), "svc.internal.");
    }
}
