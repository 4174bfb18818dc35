use std::collections::HashMap;

use crate::classify::domain::Domain;
use crate::models::{Classification, DomainLabel, DomainOverride, MasterDomainEntry};

/// Snapshot of the master list and user overrides, resolved in precedence order:
/// override for (user, domain), then master entry, then unknown.
#[derive(Debug, Clone, Default)]
pub struct DomainClassifier {
    master: HashMap<Domain, DomainLabel>,
    overrides: HashMap<(String, Domain), DomainLabel>,
}

impl DomainClassifier {
    /// Entries whose domain does not normalize are skipped; they could never match a ping.
    pub fn new(master_list: &[MasterDomainEntry], overrides: &[DomainOverride]) -> Self {
        let master = master_list
            .iter()
            .filter_map(|entry| {
                Domain::parse(&entry.domain)
                    .ok()
                    .map(|domain| (domain, entry.classification))
            })
            .collect();

        let overrides = overrides
            .iter()
            .filter_map(|entry| {
                Domain::parse(&entry.domain)
                    .ok()
                    .map(|domain| ((entry.user_id.clone(), domain), entry.classification))
            })
            .collect();

        Self { master, overrides }
    }

    pub fn classify(&self, user_id: &str, raw_domain: &str) -> Classification {
        match Domain::parse(raw_domain) {
            Ok(domain) => self.classify_domain(user_id, &domain),
            Err(_) => Classification::Unknown,
        }
    }

    pub fn classify_domain(&self, user_id: &str, domain: &Domain) -> Classification {
        if let Some(label) = self.overrides.get(&(user_id.to_string(), domain.clone())) {
            return Classification::from(*label);
        }

        self.master
            .get(domain)
            .map(|label| Classification::from(*label))
            .unwrap_or(Classification::Unknown)
    }

    pub fn master_len(&self) -> usize {
        self.master.len()
    }
}
