// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::errors::ConfigError;
    use std::io::Write;
    use std::time::Duration;

    const CLOUDFLARE_CONFIG: &str = r#"
[app]
update_interval = "15s"
prune_interval = "45s"
dry_run = true
metrics_addr = "127.0.0.1:9090"
log_format = "json"

[dns]
provider = "cloudflare"
domain_filters = ["svc.example.com", "example.org"]
owner_uuid = "team-x"

[nomad]
address = "http://nomad.service:4646"

[provider.cloudflare]
api_token = "secret"
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn valid_config() -> Config {
        Config::from_toml_str(CLOUDFLARE_CONFIG).unwrap()
    }

    #[test]
    fn test_parse_full_document() {
        let config = valid_config();

        assert_eq!(config.app.update_interval, Duration::from_secs(15));
        assert_eq!(config.app.prune_interval, Duration::from_secs(45));
        assert!(config.app.dry_run);
        assert_eq!(config.app.log_format, LogFormat::Json);
        assert_eq!(
            config.app.metrics_addr,
            Some("127.0.0.1:9090".parse().unwrap())
        );
        assert_eq!(config.domains(), vec!["svc.example.com", "example.org"]);
        assert_eq!(config.nomad.address(), "http://nomad.service:4646");
        assert_eq!(config.provider_kind().unwrap(), ProviderKind::Cloudflare);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_toml_str("").unwrap();

        assert_eq!(config.app.update_interval, Duration::from_secs(30));
        assert_eq!(config.app.prune_interval, Duration::from_secs(60));
        assert_eq!(config.app.log_level, "info");
        assert_eq!(config.app.log_format, LogFormat::Text);
        assert!(!config.app.dry_run);
        assert_eq!(config.provider.route53.max_retries, 3);
        assert_eq!(config.nomad.address(), "http://127.0.0.1:4646");
    }

    #[test]
    fn test_prune_shorter_than_update_is_rejected() {
        let mut config = valid_config();
        config.app.update_interval = Duration::from_secs(60);
        config.app.prune_interval = Duration::from_secs(30);

        assert_eq!(
            config.validate(),
            Err(ConfigError::PruneIntervalTooShort {
                prune: Duration::from_secs(30),
                update: Duration::from_secs(60),
            })
        );
    }

    #[test]
    fn test_equal_intervals_are_accepted() {
        assert!(validate_intervals(Duration::from_secs(30), Duration::from_secs(30)).is_ok());
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let mut config = valid_config();
        config.app.update_interval = Duration::ZERO;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroInterval { .. })
        ));
    }

    #[test]
    fn test_empty_domains_rejected() {
        let mut config = valid_config();
        config.dns.domain_filters = vec![" ".to_string()];

        assert_eq!(config.validate(), Err(ConfigError::NoDomains));
    }

    #[test]
    fn test_empty_owner_rejected() {
        let mut config = valid_config();
        config.dns.owner_uuid = String::new();

        assert_eq!(config.validate(), Err(ConfigError::MissingOwner));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = valid_config();
        config.dns.provider = "powerdns".to_string();

        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownProvider("powerdns".to_string()))
        );
    }

    #[test]
    fn test_route53_requires_credentials() {
        let mut config = valid_config();
        config.dns.provider = "route53".to_string();

        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingCredential {
                provider: "route53".to_string(),
                field: "provider.route53.access_key_id".to_string(),
            })
        );
    }

    #[test]
    fn test_invalid_duration_is_a_parse_error() {
        let err = Config::from_toml_str("[app]\nupdate_interval = \"soon\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overlay_overrides_file() {
        let table: toml::Table = toml::from_str(CLOUDFLARE_CONFIG).unwrap();
        let (config, _) = Config::from_sources(
            table,
            vars(&[
                ("NOMAD_EXTERNAL_DNS_APP__UPDATE_INTERVAL", "5s"),
                ("NOMAD_EXTERNAL_DNS_APP__DRY_RUN", "false"),
                ("NOMAD_EXTERNAL_DNS_DNS__DOMAIN_FILTERS", "a.example, b.example"),
                ("NOMAD_EXTERNAL_DNS_PROVIDER__ROUTE53__MAX_RETRIES", "7"),
                ("UNRELATED_VARIABLE", "ignored"),
            ]),
            no_env,
        )
        .unwrap();

        assert_eq!(config.app.update_interval, Duration::from_secs(5));
        assert!(!config.app.dry_run);
        assert_eq!(config.dns.domain_filters, vec!["a.example", "b.example"]);
        assert_eq!(config.provider.route53.max_retries, 7);
        assert_eq!(config.dns.owner_uuid, "team-x");
    }

    #[test]
    fn test_env_overlay_accepts_toml_array() {
        let (config, _) = Config::from_sources(
            toml::Table::new(),
            vars(&[(
                "NOMAD_EXTERNAL_DNS_DNS__DOMAIN_FILTERS",
                r#"["one.example", "two.example"]"#,
            )]),
            no_env,
        )
        .unwrap();

        assert_eq!(config.dns.domain_filters, vec!["one.example", "two.example"]);
    }

    #[test]
    fn test_standard_env_fills_unset_values_only() {
        let (config, _) = Config::from_sources(
            toml::from_str(CLOUDFLARE_CONFIG).unwrap(),
            Vec::new(),
            |key| match key {
                "NOMAD_ADDR" => Some("http://ignored:4646".to_string()),
                "NOMAD_TOKEN" => Some("acl-token".to_string()),
                "AWS_ACCESS_KEY_ID" => Some("AKID".to_string()),
                _ => None,
            },
        )
        .unwrap();

        assert_eq!(config.nomad.address(), "http://nomad.service:4646");
        assert_eq!(config.nomad.token.as_deref(), Some("acl-token"));
        assert_eq!(config.provider.route53.access_key_id.as_deref(), Some("AKID"));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");

        let err = Config::load(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CLOUDFLARE_CONFIG.as_bytes()).unwrap();

        let (config, notices) = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.dns.owner_uuid, "team-x");
        assert!(!notices
            .iter()
            .any(|n| matches!(n, LoadNotice::MissingDefaultFile { .. })));
    }

    #[test]
    fn test_overlay_notices_are_returned_not_logged() {
        let (config, notices) = Config::from_sources(
            toml::from_str(CLOUDFLARE_CONFIG).unwrap(),
            vars(&[
                ("NOMAD_EXTERNAL_DNS_APP__DRY_RUN", "false"),
                ("NOMAD_EXTERNAL_DNS_APP____BROKEN", "x"),
            ]),
            |key| (key == "NOMAD_TOKEN").then(|| "acl-token".to_string()),
        )
        .unwrap();

        assert!(!config.app.dry_run);
        assert_eq!(
            notices,
            vec![
                LoadNotice::Override {
                    variable: "NOMAD_EXTERNAL_DNS_APP__DRY_RUN".to_string(),
                    key: "app.dry_run".to_string(),
                },
                LoadNotice::Malformed {
                    variable: "NOMAD_EXTERNAL_DNS_APP____BROKEN".to_string(),
                },
                LoadNotice::FromEnvironment {
                    variable: "NOMAD_TOKEN".to_string(),
                },
            ]
        );
    }
}
