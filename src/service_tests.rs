// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `service.rs`

#[cfg(test)]
mod tests {
    use super::super::*;

    fn redis(addresses: &[&str], tags: &[&str]) -> ServiceDescriptor {
        let mut service = ServiceDescriptor::new(
            "redis",
            "default",
            "cache",
            tags.iter().map(|t| (*t).to_string()).collect(),
        );
        for address in addresses {
            service.add_address(*address);
        }
        service
    }

    #[test]
    fn test_identity_key() {
        let service = redis(&["10.0.0.1"], &["a"]);
        assert_eq!(service.identity_key(), "default_redis");
        assert_eq!(identity_key("prod", "api"), "prod_api");
    }

    #[test]
    fn test_add_address_deduplicates_in_first_seen_order() {
        let service = redis(&["10.0.0.2", "10.0.0.1", "10.0.0.2"], &["a"]);
        assert_eq!(service.addresses, vec!["10.0.0.2", "10.0.0.1"]);
    }

    #[test]
    fn test_reordered_addresses_do_not_need_update() {
        let applied = redis(&["10.0.0.1", "10.0.0.2"], &["a", "b"]);
        let current = redis(&["10.0.0.2", "10.0.0.1"], &["b", "a"]);

        assert!(!current.needs_update(&applied));
    }

    #[test]
    fn test_changed_address_set_needs_update() {
        let applied = redis(&["10.0.0.1", "10.0.0.2"], &["a"]);
        let current = redis(&["10.0.0.1", "10.0.0.3"], &["a"]);

        assert!(current.needs_update(&applied));
    }

    #[test]
    fn test_removed_address_needs_update() {
        let applied = redis(&["10.0.0.1", "10.0.0.2"], &["a"]);
        let current = redis(&["10.0.0.1"], &["a"]);

        assert!(current.needs_update(&applied));
    }

    #[test]
    fn test_changed_tags_need_update() {
        let applied = redis(&["10.0.0.1"], &["external-dns/ttl=30s"]);
        let current = redis(&["10.0.0.1"], &["external-dns/ttl=60s"]);

        assert!(current.needs_update(&applied));
    }
}
